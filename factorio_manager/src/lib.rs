//! Control of a Factorio server through its remote console, surfaced as a
//! single chat control panel.
//!
//! The crate is platform-agnostic: the chat side is reached through
//! [`panel::PanelChannel`] and [`router::SavePicker`], the server process
//! through [`rcon::RemoteConsole`] and [`lifecycle::Launcher`].

pub mod error;
pub mod lifecycle;
pub mod panel;
pub mod rcon;
pub mod refresh;
pub mod router;
pub mod saves;
pub mod state;
pub mod status;

pub use error::{
    AuthorizationError, LifecycleError, PanelError, RconError, SaveFileError, ShutdownStep,
    StateError,
};
pub use status::ServerStatus;
