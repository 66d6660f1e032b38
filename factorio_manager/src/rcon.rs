//! Remote console channel into the running server.

use std::time::Duration;

use async_trait::async_trait;
use rcon::Connection;
use tokio::net::TcpStream;

use crate::error::RconError;

/// Default timeout of a regular remote console call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout of a liveness check.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// A line-oriented request/response channel into the server process.
///
/// `Ok(None)` means the server accepted the command without a textual reply,
/// which is normal for `/quit` and for most saves.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteConsole: Send + Sync {
    async fn send(&self, command: &str, timeout: Duration) -> Result<Option<String>, RconError>;
}

/// Source RCON client that opens one connection per command.
///
/// No retries happen here.
#[derive(Clone)]
pub struct RconClient {
    address: String,
    password: String,
}

impl RconClient {
    pub fn new(host: &str, port: u16, password: impl Into<String>) -> Self {
        Self {
            address: format!("{host}:{port}"),
            password: password.into(),
        }
    }

    async fn run(&self, command: &str) -> Result<String, rcon::Error> {
        let mut conn = <Connection<TcpStream>>::builder()
            .enable_factorio_quirks(true)
            .connect(self.address.as_str(), &self.password)
            .await?;
        conn.cmd(command).await
    }
}

#[async_trait]
impl RemoteConsole for RconClient {
    async fn send(&self, command: &str, timeout: Duration) -> Result<Option<String>, RconError> {
        tracing::trace!(command, address = %self.address, "rcon send");
        let response = tokio::time::timeout(timeout, self.run(command))
            .await
            .map_err(|_| RconError::new(format!("timed out after {}s", timeout.as_secs_f32())))?
            .map_err(RconError::new)?;
        let response = response.trim();
        Ok((!response.is_empty()).then(|| response.to_owned()))
    }
}

/// Builders for the console commands the bot issues.
pub mod commands {
    pub fn save(name: Option<&str>) -> String {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => format!("/save {name}"),
            None => "/save".to_owned(),
        }
    }

    pub fn quit() -> String {
        "/quit".to_owned()
    }

    pub fn players() -> String {
        "/players".to_owned()
    }

    /// Prints `msg` to every connected player.
    pub fn broadcast(msg: &str) -> String {
        let msg = msg
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n");
        format!("/silent-command game.print(\"{msg}\")")
    }

    pub fn ban(username: &str, reason: &str) -> String {
        format!("/ban {username} {reason}").trim_end().to_owned()
    }

}
