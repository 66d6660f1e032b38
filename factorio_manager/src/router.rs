//! Turns button presses and operator commands into lifecycle actions.
//!
//! Every action goes through the same pipeline: authorize, invoke, translate
//! errors into a short reply, refresh the panel.

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{
    error::{AuthorizationError, LifecycleError, PanelError},
    lifecycle::ServerController,
    panel::PanelManager,
    rcon::commands,
    saves::{self, SaveFile},
};

pub const START_SERVER: &str = "start_server";
pub const MANUAL_SAVE: &str = "manual_save";
pub const STOP_SERVER: &str = "stop_server";

/// The platform caps a select menu at 25 options.
pub const MAX_SAVE_CHOICES: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAction {
    Start,
    Save,
    Stop,
}

impl PanelAction {
    pub fn from_custom_id(id: &str) -> Option<Self> {
        match id {
            START_SERVER => Some(Self::Start),
            MANUAL_SAVE => Some(Self::Save),
            STOP_SERVER => Some(Self::Stop),
            _ => None,
        }
    }

    pub fn custom_id(self) -> &'static str {
        match self {
            Self::Start => START_SERVER,
            Self::Save => MANUAL_SAVE,
            Self::Stop => STOP_SERVER,
        }
    }
}

/// The user behind an interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub user_id: u64,
    pub roles: Vec<u64>,
}

/// Capability check: the requester must hold the operator role.
#[derive(Debug, Clone, Copy)]
pub struct Authorizer {
    operator_role: u64,
}

impl Authorizer {
    pub fn new(operator_role: u64) -> Self {
        Self { operator_role }
    }

    pub fn authorize(&self, requester: &Requester) -> Result<(), AuthorizationError> {
        if requester.roles.contains(&self.operator_role) {
            Ok(())
        } else {
            Err(AuthorizationError)
        }
    }
}

/// Asks the requester to pick one save. `Ok(None)` means they walked away.
#[async_trait]
pub trait SavePicker: Send + Sync {
    async fn pick(&self, saves: &[SaveFile], timeout: Duration) -> Result<Option<String>, PanelError>;
}

/// Result of one routed action, ready to be shown to the requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Denied,
    Busy,
    /// A start found the server answering already.
    AlreadyRunning,
    /// The save selection timed out; nothing was started.
    Abandoned,
    Started { world: String },
    Saved { reply: Option<String> },
    Stopped,
    Restarted { world: String },
    /// An ad-hoc console command went through.
    Sent { reply: Option<String> },
    Failed { message: String },
    Unexpected,
}

impl Outcome {
    pub fn message(&self) -> String {
        match self {
            Self::Denied => "❌ You don't have permission to control the server.".to_owned(),
            Self::Busy => "⏳ Another server operation is already in progress.".to_owned(),
            Self::AlreadyRunning => "🟢 The server is already running.".to_owned(),
            Self::Abandoned => "⌛ No save selected, the server was not started.".to_owned(),
            Self::Started { world } => {
                format!("🚀 Server starting with **{world}**... This may take a minute.")
            }
            Self::Saved { reply } => {
                format!("💾 {}", reply.as_deref().unwrap_or("Game saved successfully!"))
            }
            Self::Stopped => "🛑 Server shutdown initiated.".to_owned(),
            Self::Restarted { world } => format!("🔄 Server restarting with **{world}**."),
            Self::Sent { reply: Some(reply) } => format!("📨 {reply}"),
            Self::Sent { reply: None } => "📨 Command sent.".to_owned(),
            Self::Failed { message } => format!("⚠️ {message}"),
            Self::Unexpected => "⚠️ An unexpected error occurred.".to_owned(),
        }
    }

    /// Whether a lifecycle operation actually ran.
    fn touched_server(&self) -> bool {
        !matches!(
            self,
            Self::Denied | Self::Busy | Self::AlreadyRunning | Self::Abandoned
        )
    }
}

/// Errors an action can end with before translation.
#[derive(Debug)]
enum ActionError {
    Lifecycle(LifecycleError),
    Platform(PanelError),
}

impl From<LifecycleError> for ActionError {
    fn from(e: LifecycleError) -> Self {
        Self::Lifecycle(e)
    }
}

impl From<PanelError> for ActionError {
    fn from(e: PanelError) -> Self {
        Self::Platform(e)
    }
}

pub struct InteractionRouter {
    controller: Arc<ServerController>,
    panel: Arc<PanelManager>,
    authorizer: Authorizer,
    selection_timeout: Duration,
}

impl InteractionRouter {
    pub fn new(
        controller: Arc<ServerController>,
        panel: Arc<PanelManager>,
        authorizer: Authorizer,
        selection_timeout: Duration,
    ) -> Self {
        Self {
            controller,
            panel,
            authorizer,
            selection_timeout,
        }
    }

    pub fn authorizer(&self) -> Authorizer {
        self.authorizer
    }

    /// Dispatches a panel button press.
    pub async fn handle(
        &self,
        action: PanelAction,
        requester: &Requester,
        picker: &dyn SavePicker,
    ) -> Outcome {
        match action {
            PanelAction::Start => self.start(requester, picker).await,
            PanelAction::Save => self.save(requester, None).await,
            PanelAction::Stop => {
                self.guarded(requester, "stop", async {
                    self.controller.stop_server().await?;
                    Ok::<_, ActionError>(Outcome::Stopped)
                })
                .await
            }
        }
    }

    pub async fn start(&self, requester: &Requester, picker: &dyn SavePicker) -> Outcome {
        self.guarded(requester, "start", async {
            if self.controller.is_busy() {
                return Err(LifecycleError::Busy.into());
            }
            if self.panel.probe().is_online().await {
                return Ok(Outcome::AlreadyRunning);
            }
            let save = match self.choose_save(picker).await? {
                Choice::Picked(name) => Some(name),
                Choice::Latest => None,
                Choice::Abandoned => return Ok(Outcome::Abandoned),
            };
            let world = self.controller.start_server(save.as_deref()).await?;
            Ok::<_, ActionError>(Outcome::Started { world })
        })
        .await
    }

    pub async fn save(&self, requester: &Requester, filename: Option<&str>) -> Outcome {
        self.guarded(requester, "save", async {
            let reply = self.controller.save_game(filename).await?;
            Ok::<_, ActionError>(Outcome::Saved { reply })
        })
        .await
    }

    pub async fn restart(&self, requester: &Requester, save: Option<&str>) -> Outcome {
        self.guarded(requester, "restart", async {
            let world = self.controller.restart_server(save).await?;
            Ok::<_, ActionError>(Outcome::Restarted { world })
        })
        .await
    }

    /// Prints `message` in the game chat.
    pub async fn broadcast(&self, requester: &Requester, message: &str) -> Outcome {
        self.console(requester, "broadcast", commands::broadcast(message))
            .await
    }

    pub async fn ban(&self, requester: &Requester, player: &str, reason: &str) -> Outcome {
        self.console(requester, "ban", commands::ban(player, reason))
            .await
    }

    async fn console(&self, requester: &Requester, action: &str, command: String) -> Outcome {
        self.guarded(requester, action, async {
            let reply = self.controller.console_command(&command).await?;
            Ok::<_, ActionError>(Outcome::Sent { reply })
        })
        .await
    }

    /// Check, invoke, translate, refresh.
    async fn guarded<F>(&self, requester: &Requester, action: &str, run: F) -> Outcome
    where
        F: Future<Output = Result<Outcome, ActionError>>,
    {
        if self.authorizer.authorize(requester).is_err() {
            tracing::debug!(user_id = requester.user_id, action, "unauthorized request");
            return Outcome::Denied;
        }

        let outcome = match run.await {
            Ok(outcome) => outcome,
            Err(ActionError::Lifecycle(LifecycleError::Busy)) => Outcome::Busy,
            Err(ActionError::Lifecycle(e)) => {
                tracing::warn!(user_id = requester.user_id, action, error = %e, "server operation failed");
                Outcome::Failed {
                    message: failure_message(&e),
                }
            }
            Err(ActionError::Platform(e)) => {
                tracing::error!(user_id = requester.user_id, action, error = ?e, "unexpected error");
                Outcome::Unexpected
            }
        };

        if outcome.touched_server() {
            self.panel.tick().await;
        }
        outcome
    }

    async fn choose_save(&self, picker: &dyn SavePicker) -> Result<Choice, ActionError> {
        let mut saves = saves::list_saves(self.controller.saves_dir())
            .await
            .map_err(LifecycleError::from)?;
        if saves.len() <= 1 {
            return Ok(Choice::Latest);
        }
        saves.truncate(MAX_SAVE_CHOICES);
        Ok(match picker.pick(&saves, self.selection_timeout).await? {
            Some(name) => Choice::Picked(name),
            None => Choice::Abandoned,
        })
    }
}

/// Short reply for a failed operation. Paths and console errors stay in the
/// log.
fn failure_message(e: &LifecycleError) -> String {
    match e {
        LifecycleError::Busy => "Another server operation is already in progress.".to_owned(),
        LifecycleError::Startup(_) => {
            "The server failed to start. Check that the server and its saves are set up.".to_owned()
        }
        LifecycleError::Shutdown { step, .. } => format!("Shutdown failed at the {step} step."),
        LifecycleError::Save(_) => "Save failed, the server did not respond.".to_owned(),
        LifecycleError::Command(_) => "The server did not accept the command.".to_owned(),
    }
}

enum Choice {
    Picked(String),
    Latest,
    Abandoned,
}
