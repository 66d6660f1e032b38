use std::{path::Path, path::PathBuf, time::Duration};

use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Channel hosting the control panel.
    pub channel_id: u64,
    /// Role required to start, stop and save.
    pub operator_role_id: u64,
    pub rcon_host: String,
    pub rcon_port: u16,
    pub rcon_password: String,
    pub game_port: u16,
    pub server_executable: PathBuf,
    pub saves_dir: PathBuf,
    pub state_file: PathBuf,
    pub log_dir: PathBuf,
    pub status_update_interval_secs: u64,
    pub rcon_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub history_limit: u8,
    pub selection_timeout_secs: u64,
    /// Console command whose reply names the loaded world.
    pub world_name_command: Option<String>,
    pub get_my_ip_url1: String,
    pub get_my_ip_url2: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            channel_id: 0,
            operator_role_id: 0,
            rcon_host: "127.0.0.1".to_owned(),
            rcon_port: 27015,
            rcon_password: String::new(),
            game_port: 34197,
            server_executable: PathBuf::new(),
            saves_dir: PathBuf::from("saves"),
            state_file: PathBuf::from("bot_state.json"),
            log_dir: PathBuf::from("logs"),
            status_update_interval_secs: 25,
            rcon_timeout_secs: 10,
            probe_timeout_secs: 2,
            history_limit: 100,
            selection_timeout_secs: 60,
            world_name_command: None,
            get_my_ip_url1: String::new(),
            get_my_ip_url2: String::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("[settings] can't read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("[settings] {0}")]
    Parse(#[from] toml::de::Error),
    #[error("[settings] Missing `{0}`")]
    Missing(&'static str),
}

impl Settings {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let file = std::fs::read_to_string(path)?;
        Self::from_toml(&file)
    }

    pub fn from_toml(src: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(src)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.channel_id == 0 {
            return Err(SettingsError::Missing("channel_id"));
        }
        if self.operator_role_id == 0 {
            return Err(SettingsError::Missing("operator_role_id"));
        }
        if self.rcon_password.is_empty() {
            return Err(SettingsError::Missing("rcon_password"));
        }
        if self.server_executable.as_os_str().is_empty() {
            return Err(SettingsError::Missing("server_executable"));
        }
        Ok(())
    }

    pub fn status_update_interval(&self) -> Duration {
        Duration::from_secs(self.status_update_interval_secs.max(1))
    }

    pub fn rcon_timeout(&self) -> Duration {
        Duration::from_secs(self.rcon_timeout_secs.max(1))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs.max(1))
    }

    pub fn selection_timeout(&self) -> Duration {
        Duration::from_secs(self.selection_timeout_secs.max(1))
    }
}
