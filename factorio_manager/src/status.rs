//! Point-in-time server status obtained over the remote console.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};

use crate::{
    rcon::{self, commands, RemoteConsole},
    state::CurrentWorld,
};

pub const OFFLINE_WORLD: &str = "Server Offline";
pub const UNKNOWN_WORLD: &str = "Unknown World";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    pub online: bool,
    pub world_name: String,
    /// Connected players in the order the server reported them.
    pub players: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

impl ServerStatus {
    pub fn offline() -> Self {
        Self {
            online: false,
            world_name: OFFLINE_WORLD.to_owned(),
            players: vec![],
            last_updated: Utc::now(),
        }
    }

    pub fn online(world_name: impl Into<String>, players: Vec<String>) -> Self {
        Self {
            online: true,
            world_name: world_name.into(),
            players,
            last_updated: Utc::now(),
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn status_emoji(&self) -> &'static str {
        if self.online {
            "🟢"
        } else {
            "🔴"
        }
    }
}

/// Extracts player names from a `/players` reply.
///
/// Blank lines and separator lines starting with `---` are dropped.
pub fn parse_players(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("---"))
        .map(str::to_owned)
        .collect()
}

pub struct StatusProbe {
    console: Arc<dyn RemoteConsole>,
    world: CurrentWorld,
    /// Supplementary console query used when no start was recorded.
    world_name_command: Option<String>,
    timeout: Duration,
    probe_timeout: Duration,
}

impl StatusProbe {
    pub fn new(console: Arc<dyn RemoteConsole>, world: CurrentWorld) -> Self {
        Self {
            console,
            world,
            world_name_command: None,
            timeout: rcon::DEFAULT_TIMEOUT,
            probe_timeout: rcon::PROBE_TIMEOUT,
        }
    }

    pub fn with_world_name_command(mut self, command: Option<String>) -> Self {
        self.world_name_command = command.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_timeouts(mut self, timeout: Duration, probe_timeout: Duration) -> Self {
        self.timeout = timeout;
        self.probe_timeout = probe_timeout;
        self
    }

    /// Never fails: a console failure yields an offline status.
    pub async fn get_status(&self) -> ServerStatus {
        match self.console.send(&commands::players(), self.timeout).await {
            Ok(raw) => {
                let players = parse_players(raw.as_deref());
                ServerStatus::online(self.world_name().await, players)
            }
            Err(e) => {
                tracing::debug!(error = %e, "server unreachable, reporting offline");
                ServerStatus::offline()
            }
        }
    }

    pub async fn is_online(&self) -> bool {
        self.console
            .send(&commands::players(), self.probe_timeout)
            .await
            .is_ok()
    }

    /// The raw `/players` reply, for display as-is.
    pub async fn players_raw(&self) -> Option<String> {
        self.console
            .send(&commands::players(), self.timeout)
            .await
            .ok()
            .flatten()
    }

    async fn world_name(&self) -> String {
        if let Some(name) = self.world.get() {
            return name;
        }
        if let Some(command) = &self.world_name_command {
            match self.console.send(command, self.timeout).await {
                Ok(Some(name)) if !name.trim().is_empty() => return name.trim().to_owned(),
                Ok(_) => {}
                Err(e) => tracing::debug!(error = %e, "world name query failed"),
            }
        }
        UNKNOWN_WORLD.to_owned()
    }
}
