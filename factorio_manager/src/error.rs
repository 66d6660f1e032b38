//! Error taxonomy shared by every component of the manager.
//!
//! Each layer converts the failures of the layer below it into its own
//! typed error. The status probe is the exception: it never fails and
//! turns [`RconError`] into an offline status instead.

use std::{fmt, io, path::PathBuf};

use thiserror::Error;

/// The one failure kind of the remote console.
///
/// Connection errors, timeouts and malformed replies are deliberately not
/// told apart; callers only need to know the command did not go through.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("remote console command failed: {0}")]
pub struct RconError(pub String);

impl RconError {
    pub fn new(message: impl fmt::Display) -> Self {
        Self(message.to_string())
    }
}

/// The step of a shutdown that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownStep {
    Save,
    Quit,
}

impl fmt::Display for ShutdownStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Save => f.write_str("save"),
            Self::Quit => f.write_str("quit"),
        }
    }
}

/// Failures of start, stop, save, restart and ad-hoc console commands.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Another lifecycle operation holds the gate.
    #[error("another server operation is already in progress")]
    Busy,

    #[error("startup failed: {0}")]
    Startup(String),

    #[error("shutdown failed at the {step} step: {source}")]
    Shutdown {
        step: ShutdownStep,
        #[source]
        source: RconError,
    },

    #[error("save failed: {0}")]
    Save(#[source] RconError),

    #[error("console command failed: {0}")]
    Command(#[source] RconError),
}

/// Failures while talking to the chat channel that hosts the panel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PanelError {
    /// The message (or channel) no longer exists. This is an expected signal
    /// and triggers recreation rather than an error report.
    #[error("panel message not found")]
    NotFound,

    #[error("panel channel {0} is not available")]
    ChannelMissing(u64),

    #[error("chat platform error: {0}")]
    Platform(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("you don't have permission to control the server")]
pub struct AuthorizationError;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("failed to access state file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("state file {} is malformed: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum SaveFileError {
    #[error("save file not found: {0}")]
    NotFound(String),

    #[error("save files must be .zip archives: {0}")]
    NotZip(String),

    #[error("invalid save file name: {0}")]
    InvalidName(String),

    #[error("no save files in {}", .0.display())]
    NoSaves(PathBuf),

    #[error("failed to read saves directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<SaveFileError> for LifecycleError {
    fn from(e: SaveFileError) -> Self {
        Self::Startup(e.to_string())
    }
}
