//! The control panel: one status message with lifecycle buttons.
//!
//! [`PanelManager`] is the only component that creates or deletes panel
//! messages. It keeps the invariant that the configured channel holds exactly
//! one panel authored by the bot and that the persisted id points at it.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    error::PanelError,
    state::{PanelHandle, PanelStore},
    status::{ServerStatus, StatusProbe},
};

/// Lookback window of the stray panel scan. Discord caps a history page at 100.
pub const DEFAULT_HISTORY_LIMIT: u8 = 100;

/// A message seen while scanning channel history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMessage {
    pub id: u64,
    /// Authored by the bot itself.
    pub own: bool,
    pub has_embed: bool,
}

impl ChannelMessage {
    pub fn is_panel_candidate(&self) -> bool {
        self.own && self.has_embed
    }
}

/// The chat channel that hosts the panel.
///
/// Rendering the status and the buttons is up to the implementation.
#[async_trait]
pub trait PanelChannel: Send + Sync {
    fn channel_id(&self) -> u64;

    /// `Err(PanelError::NotFound)` when the message is gone.
    async fn fetch(&self, message_id: u64) -> Result<(), PanelError>;

    /// Most recent messages first.
    async fn recent_messages(&self, limit: u8) -> Result<Vec<ChannelMessage>, PanelError>;

    async fn delete(&self, message_id: u64) -> Result<(), PanelError>;

    /// Posts a new panel with status and buttons, returning its id.
    async fn create_panel(&self, status: &ServerStatus) -> Result<u64, PanelError>;

    /// Renders `status` and the buttons into an existing panel.
    async fn edit_panel(&self, message_id: u64, status: &ServerStatus) -> Result<(), PanelError>;

    /// Shows `status` and removes the buttons.
    async fn retire_panel(&self, message_id: u64, status: &ServerStatus)
        -> Result<(), PanelError>;
}

/// What a [`PanelManager::refresh`] call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// No panel is active; nothing was touched.
    NoPanel,
    Updated,
    /// The panel was gone and the handle was cleared.
    Cleared,
    /// The edit failed for another reason; the handle is kept.
    Failed(PanelError),
}

pub struct PanelManager {
    channel: Arc<dyn PanelChannel>,
    probe: Arc<StatusProbe>,
    store: PanelStore,
    history_limit: u8,
    handle: Mutex<PanelHandle>,
}

impl PanelManager {
    pub fn new(channel: Arc<dyn PanelChannel>, probe: Arc<StatusProbe>, store: PanelStore) -> Self {
        let handle = PanelHandle::new(channel.channel_id(), None);
        Self {
            channel,
            probe,
            store,
            history_limit: DEFAULT_HISTORY_LIMIT,
            handle: Mutex::new(handle),
        }
    }

    pub fn with_history_limit(mut self, limit: u8) -> Self {
        self.history_limit = limit.clamp(1, DEFAULT_HISTORY_LIMIT);
        self
    }

    /// Reads the persisted message id into the handle. Call once before the
    /// first reconciliation.
    pub async fn load(&self) -> Result<Option<u64>, crate::error::StateError> {
        let message_id = self.store.load().await?;
        self.handle.lock().await.message_id = message_id;
        tracing::debug!(?message_id, "loaded panel state");
        Ok(message_id)
    }

    /// The probe the panel renders from.
    pub fn probe(&self) -> &Arc<StatusProbe> {
        &self.probe
    }

    pub async fn handle(&self) -> PanelHandle {
        *self.handle.lock().await
    }

    /// Makes sure exactly one panel exists and returns its message id.
    ///
    /// A persisted panel that still exists is adopted and rendered again with
    /// its buttons, without scanning history. Otherwise every bot-authored
    /// embed in recent history is deleted and one fresh panel is posted.
    pub async fn ensure_single_panel(&self) -> Result<u64, PanelError> {
        let mut handle = self.handle.lock().await;

        if let Some(id) = handle.message_id {
            match self.adopt(id).await {
                Ok(()) => {
                    tracing::debug!(message_id = id, "adopted existing panel");
                    return Ok(id);
                }
                Err(PanelError::NotFound) => {
                    tracing::info!(message_id = id, "panel message is gone, recreating");
                    handle.message_id = None;
                }
                Err(e) => return Err(e),
            }
        }

        let history = self.channel.recent_messages(self.history_limit).await?;
        for stray in history.iter().filter(|m| m.is_panel_candidate()) {
            match self.channel.delete(stray.id).await {
                Ok(()) | Err(PanelError::NotFound) => {
                    tracing::info!(message_id = stray.id, "deleted stray panel")
                }
                Err(e) => return Err(e),
            }
        }

        let status = self.probe.get_status().await;
        let id = self.channel.create_panel(&status).await?;
        handle.message_id = Some(id);
        self.persist(Some(id)).await;
        tracing::info!(message_id = id, channel_id = handle.channel_id, "created panel");
        Ok(id)
    }

    /// Edits the active panel in place. Never posts a message.
    pub async fn refresh(&self) -> RefreshOutcome {
        let mut handle = self.handle.lock().await;
        let Some(id) = handle.message_id else {
            return RefreshOutcome::NoPanel;
        };

        let status = self.probe.get_status().await;
        match self.channel.edit_panel(id, &status).await {
            Ok(()) => RefreshOutcome::Updated,
            Err(PanelError::NotFound) => {
                tracing::warn!(message_id = id, "panel message was deleted");
                handle.message_id = None;
                self.persist(None).await;
                RefreshOutcome::Cleared
            }
            Err(e) => {
                tracing::warn!(message_id = id, error = %e, "panel update failed");
                RefreshOutcome::Failed(e)
            }
        }
    }

    /// One cycle of the periodic loop: recreate a missing panel, otherwise
    /// refresh the active one.
    pub async fn tick(&self) {
        if self.handle().await.message_id.is_some() {
            self.refresh().await;
            return;
        }
        if let Err(e) = self.ensure_single_panel().await {
            tracing::error!(error = %e, "panel reconciliation failed");
        }
    }

    /// Strips the buttons on shutdown. The message stays and is adopted again
    /// on the next start.
    pub async fn retire(&self) {
        let handle = self.handle.lock().await;
        let Some(id) = handle.message_id else {
            return;
        };
        let status = self.probe.get_status().await;
        if let Err(e) = self.channel.retire_panel(id, &status).await {
            tracing::warn!(message_id = id, error = %e, "failed to retire panel");
        }
    }

    /// Checks that `id` still exists and renders it again, which brings back
    /// the buttons of a retired panel. Only a fetch error is returned; a
    /// failed render is left to the next refresh.
    async fn adopt(&self, id: u64) -> Result<(), PanelError> {
        self.channel.fetch(id).await?;
        let status = self.probe.get_status().await;
        match self.channel.edit_panel(id, &status).await {
            Err(PanelError::NotFound) => Err(PanelError::NotFound),
            Err(e) => {
                tracing::warn!(message_id = id, error = %e, "failed to render adopted panel");
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    async fn persist(&self, message_id: Option<u64>) {
        if let Err(e) = self.store.persist(message_id).await {
            tracing::error!(error = %e, "failed to persist panel state");
        }
    }
}
