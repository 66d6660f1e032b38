//! State that outlives a single operation.
//!
//! [`PanelStore`] persists the panel message id across restarts and
//! [`CurrentWorld`] remembers which save the last successful start loaded.

use std::{
    path::PathBuf,
    sync::{Arc, RwLock},
};

use serde::{Deserialize, Serialize};

use crate::error::StateError;

/// Location of the one live panel message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelHandle {
    pub channel_id: u64,
    pub message_id: Option<u64>,
}

impl PanelHandle {
    pub fn new(channel_id: u64, message_id: Option<u64>) -> Self {
        Self {
            channel_id,
            message_id,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
struct PersistedState {
    panel_message_id: Option<u64>,
}

/// JSON file holding `{"panel_message_id": ...}`.
#[derive(Debug, Clone)]
pub struct PanelStore {
    path: PathBuf,
}

impl PanelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads the persisted panel message id. A missing file means no panel
    /// was ever created.
    pub async fn load(&self) -> Result<Option<u64>, StateError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StateError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let state: PersistedState =
            serde_json::from_slice(&bytes).map_err(|source| StateError::Json {
                path: self.path.clone(),
                source,
            })?;
        Ok(state.panel_message_id)
    }

    /// Writes through a temp file and renames it into place.
    pub async fn persist(&self, panel_message_id: Option<u64>) -> Result<(), StateError> {
        let json = serde_json::to_vec_pretty(&PersistedState { panel_message_id }).map_err(
            |source| StateError::Json {
                path: self.path.clone(),
                source,
            },
        )?;
        let tmp = self.path.with_extension("json.tmp");
        let io_err = |source: std::io::Error| StateError::Io {
            path: self.path.clone(),
            source,
        };
        tokio::fs::write(&tmp, json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        tracing::debug!(?panel_message_id, path = %self.path.display(), "persisted panel state");
        Ok(())
    }
}

/// Display name of the world loaded by the last successful start.
///
/// The remote console cannot tell which save is loaded, so the controller
/// records it here and the status probe reads it back.
#[derive(Debug, Default, Clone)]
pub struct CurrentWorld(Arc<RwLock<Option<String>>>);

impl CurrentWorld {
    pub fn get(&self) -> Option<String> {
        match self.0.read() {
            Ok(w) => (*w).clone(),
            Err(p) => (*p.into_inner()).clone(),
        }
    }

    pub(crate) fn set(&self, name: impl Into<String>) {
        let name = name.into();
        match self.0.write() {
            Ok(mut w) => *w = Some(name),
            Err(p) => *p.into_inner() = Some(name),
        }
    }

    pub(crate) fn clear(&self) {
        match self.0.write() {
            Ok(mut w) => *w = None,
            Err(p) => *p.into_inner() = None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = PanelStore::new(dir.path().join("bot_state.json"));
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn persisted_id_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot_state.json");
        PanelStore::new(&path).persist(Some(42)).await.unwrap();
        assert_eq!(PanelStore::new(&path).load().await.unwrap(), Some(42));

        PanelStore::new(&path).persist(None).await.unwrap();
        assert_eq!(PanelStore::new(&path).load().await.unwrap(), None);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn reads_hand_written_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot_state.json");
        std::fs::write(&path, r#"{"panel_message_id": 1234567890123}"#).unwrap();
        assert_eq!(
            PanelStore::new(&path).load().await.unwrap(),
            Some(1234567890123)
        );
    }

    #[tokio::test]
    async fn garbage_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot_state.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            PanelStore::new(&path).load().await,
            Err(StateError::Json { .. })
        ));
    }

    #[test]
    fn current_world_set_and_clear() {
        let world = CurrentWorld::default();
        let shared = world.clone();
        world.set("nauvis");
        assert_eq!(shared.get().as_deref(), Some("nauvis"));
        shared.clear();
        assert_eq!(world.get(), None);
    }
}
