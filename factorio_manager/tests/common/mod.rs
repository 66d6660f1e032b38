#![allow(dead_code)]

use std::{
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use factorio_manager::{
    panel::{ChannelMessage, PanelChannel, PanelManager},
    rcon::RemoteConsole,
    state::{CurrentWorld, PanelStore},
    status::StatusProbe,
    PanelError, RconError, ServerStatus,
};
use tokio::sync::Notify;

pub const CHANNEL_ID: u64 = 4242;

#[derive(Debug, Clone)]
pub struct FakeMessage {
    pub id: u64,
    pub own: bool,
    pub has_embed: bool,
    pub buttons: bool,
    pub status: Option<ServerStatus>,
}

#[derive(Default)]
struct Inner {
    messages: Vec<FakeMessage>,
    next_id: u64,
    created: usize,
    deleted: usize,
    edits: usize,
    fetch_error: Option<PanelError>,
    edit_error: Option<PanelError>,
}

/// In-memory chat channel. Messages are kept oldest first.
#[derive(Default)]
pub struct FakeChannel {
    inner: Mutex<Inner>,
}

impl FakeChannel {
    pub fn new() -> Arc<Self> {
        let channel = Self::default();
        channel.inner.lock().unwrap().next_id = 1000;
        Arc::new(channel)
    }

    pub fn post(&self, own: bool, has_embed: bool) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.messages.push(FakeMessage {
            id,
            own,
            has_embed,
            buttons: false,
            status: None,
        });
        id
    }

    /// Simulates someone deleting a message by hand.
    pub fn remove(&self, id: u64) {
        self.inner.lock().unwrap().messages.retain(|m| m.id != id);
    }

    pub fn message(&self, id: u64) -> Option<FakeMessage> {
        self.inner
            .lock()
            .unwrap()
            .messages
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    pub fn ids(&self) -> Vec<u64> {
        self.inner.lock().unwrap().messages.iter().map(|m| m.id).collect()
    }

    /// Bot-authored messages carrying an embed.
    pub fn panels(&self) -> Vec<u64> {
        self.inner
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.own && m.has_embed)
            .map(|m| m.id)
            .collect()
    }

    pub fn created(&self) -> usize {
        self.inner.lock().unwrap().created
    }

    pub fn deleted(&self) -> usize {
        self.inner.lock().unwrap().deleted
    }

    pub fn edits(&self) -> usize {
        self.inner.lock().unwrap().edits
    }

    pub fn fail_fetch(&self, error: Option<PanelError>) {
        self.inner.lock().unwrap().fetch_error = error;
    }

    pub fn fail_edit(&self, error: Option<PanelError>) {
        self.inner.lock().unwrap().edit_error = error;
    }
}

#[async_trait]
impl PanelChannel for FakeChannel {
    fn channel_id(&self) -> u64 {
        CHANNEL_ID
    }

    async fn fetch(&self, message_id: u64) -> Result<(), PanelError> {
        tokio::task::yield_now().await;
        let inner = self.inner.lock().unwrap();
        if let Some(e) = &inner.fetch_error {
            return Err(e.clone());
        }
        inner
            .messages
            .iter()
            .any(|m| m.id == message_id)
            .then_some(())
            .ok_or(PanelError::NotFound)
    }

    async fn recent_messages(&self, limit: u8) -> Result<Vec<ChannelMessage>, PanelError> {
        tokio::task::yield_now().await;
        Ok(self
            .inner
            .lock()
            .unwrap()
            .messages
            .iter()
            .rev()
            .take(limit as usize)
            .map(|m| ChannelMessage {
                id: m.id,
                own: m.own,
                has_embed: m.has_embed,
            })
            .collect())
    }

    async fn delete(&self, message_id: u64) -> Result<(), PanelError> {
        tokio::task::yield_now().await;
        let mut inner = self.inner.lock().unwrap();
        let before = inner.messages.len();
        inner.messages.retain(|m| m.id != message_id);
        if inner.messages.len() == before {
            return Err(PanelError::NotFound);
        }
        inner.deleted += 1;
        Ok(())
    }

    async fn create_panel(&self, status: &ServerStatus) -> Result<u64, PanelError> {
        tokio::task::yield_now().await;
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        inner.created += 1;
        let id = inner.next_id;
        inner.messages.push(FakeMessage {
            id,
            own: true,
            has_embed: true,
            buttons: true,
            status: Some(status.clone()),
        });
        Ok(id)
    }

    async fn edit_panel(&self, message_id: u64, status: &ServerStatus) -> Result<(), PanelError> {
        tokio::task::yield_now().await;
        let mut inner = self.inner.lock().unwrap();
        if let Some(e) = &inner.edit_error {
            return Err(e.clone());
        }
        let msg = inner
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or(PanelError::NotFound)?;
        msg.status = Some(status.clone());
        msg.buttons = true;
        inner.edits += 1;
        Ok(())
    }

    async fn retire_panel(&self, message_id: u64, status: &ServerStatus) -> Result<(), PanelError> {
        let mut inner = self.inner.lock().unwrap();
        let msg = inner
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or(PanelError::NotFound)?;
        msg.status = Some(status.clone());
        msg.buttons = false;
        Ok(())
    }
}

/// Console that answers every command with the same result.
pub struct StaticConsole {
    reply: Result<Option<String>, RconError>,
    calls: AtomicUsize,
}

impl StaticConsole {
    pub fn online(players: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(Some(players.to_owned())),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn offline() -> Arc<Self> {
        Arc::new(Self {
            reply: Err(RconError::new("connection refused")),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteConsole for StaticConsole {
    async fn send(&self, _command: &str, _timeout: Duration) -> Result<Option<String>, RconError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone()
    }
}

/// Console that records lifecycle commands and parks on `/quit` until
/// released. `/players` always succeeds and is not recorded.
#[derive(Default)]
pub struct GatedConsole {
    log: Mutex<Vec<String>>,
    quit_reached: Notify,
    release: Notify,
    fail: Mutex<Option<&'static str>>,
}

impl GatedConsole {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes `command` fail from now on.
    pub fn fail_on(&self, command: &'static str) {
        *self.fail.lock().unwrap() = Some(command);
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub async fn wait_for_quit(&self) {
        self.quit_reached.notified().await;
    }

    pub fn release_quit(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl RemoteConsole for GatedConsole {
    async fn send(&self, command: &str, _timeout: Duration) -> Result<Option<String>, RconError> {
        if command == "/players" {
            return Ok(None);
        }
        self.log.lock().unwrap().push(command.to_owned());
        if *self.fail.lock().unwrap() == Some(command) {
            return Err(RconError::new("connection reset"));
        }
        if command == "/quit" {
            self.quit_reached.notify_one();
            self.release.notified().await;
        }
        Ok(None)
    }
}

pub fn panel_manager(
    channel: Arc<FakeChannel>,
    console: Arc<dyn RemoteConsole>,
    state_file: &Path,
) -> PanelManager {
    let probe = Arc::new(StatusProbe::new(console, CurrentWorld::default()));
    PanelManager::new(channel, probe, PanelStore::new(state_file))
}
