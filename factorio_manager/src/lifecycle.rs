//! Start, stop, save and restart of the game server.
//!
//! Every lifecycle operation runs under one gate. A request that finds the gate taken
//! is rejected with [`LifecycleError::Busy`] instead of waiting in line.

use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use tokio::sync::{Mutex, MutexGuard};

use crate::{
    error::{LifecycleError, ShutdownStep},
    rcon::{self, commands, RemoteConsole},
    saves::{self, SaveFile},
    state::CurrentWorld,
};

pub const RESTART_COOLDOWN: Duration = Duration::from_secs(5);

/// Everything needed to launch the server binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub executable: PathBuf,
    pub save_path: PathBuf,
    pub rcon_port: u16,
    pub rcon_password: String,
    pub game_port: u16,
}

impl LaunchRequest {
    pub fn args(&self) -> Vec<String> {
        vec![
            "--start-server".to_owned(),
            self.save_path.display().to_string(),
            "--rcon-port".to_owned(),
            self.rcon_port.to_string(),
            "--rcon-password".to_owned(),
            self.rcon_password.clone(),
            "--port".to_owned(),
            self.game_port.to_string(),
        ]
    }
}

/// Spawns the server process. Implementations must not wait for it.
#[cfg_attr(test, mockall::automock)]
pub trait Launcher: Send + Sync {
    fn launch(&self, request: &LaunchRequest) -> io::Result<()>;
}

/// Launches the server in its own session so it outlives the bot.
#[derive(Debug, Default)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    fn launch(&self, request: &LaunchRequest) -> io::Result<()> {
        let mut cmd = tokio::process::Command::new(&request.executable);
        cmd.args(request.args())
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(false);
        if let Some(dir) = request.executable.parent().filter(|d| !d.as_os_str().is_empty()) {
            cmd.current_dir(dir);
        }

        #[cfg(unix)]
        unsafe {
            cmd.pre_exec(|| {
                if libc::setsid() == -1 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let child = cmd.spawn()?;
        tracing::info!(
            pid = child.id(),
            exec = %request.executable.display(),
            save = %request.save_path.display(),
            "launched server process"
        );
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub executable: PathBuf,
    pub saves_dir: PathBuf,
    pub rcon_port: u16,
    pub rcon_password: String,
    pub game_port: u16,
}

pub struct ServerController {
    console: Arc<dyn RemoteConsole>,
    launcher: Arc<dyn Launcher>,
    world: CurrentWorld,
    config: ServerConfig,
    timeout: Duration,
    restart_cooldown: Duration,
    gate: Mutex<()>,
}

impl ServerController {
    pub fn new(
        console: Arc<dyn RemoteConsole>,
        launcher: Arc<dyn Launcher>,
        world: CurrentWorld,
        config: ServerConfig,
    ) -> Self {
        Self {
            console,
            launcher,
            world,
            config,
            timeout: rcon::DEFAULT_TIMEOUT,
            restart_cooldown: RESTART_COOLDOWN,
            gate: Mutex::new(()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_restart_cooldown(mut self, cooldown: Duration) -> Self {
        self.restart_cooldown = cooldown;
        self
    }

    pub fn saves_dir(&self) -> &Path {
        &self.config.saves_dir
    }

    /// True while a lifecycle operation holds the gate.
    pub fn is_busy(&self) -> bool {
        self.gate.try_lock().is_err()
    }

    fn acquire(&self) -> Result<MutexGuard<'_, ()>, LifecycleError> {
        self.gate.try_lock().map_err(|_| LifecycleError::Busy)
    }

    /// Launches the server with `save` (a file name in the saves directory),
    /// or with the newest save when `None`. Returns the world display name.
    ///
    /// Reachability is not checked; the next status probe will tell.
    pub async fn start_server(&self, save: Option<&str>) -> Result<String, LifecycleError> {
        let _gate = self.acquire()?;
        self.start_locked(save).await
    }

    /// Saves, then quits. A failed save aborts before `/quit` is sent.
    pub async fn stop_server(&self) -> Result<(), LifecycleError> {
        let _gate = self.acquire()?;
        self.stop_locked().await
    }

    /// Returns the server's acknowledgment, if it sent one.
    pub async fn save_game(&self, filename: Option<&str>) -> Result<Option<String>, LifecycleError> {
        let _gate = self.acquire()?;
        let reply = self
            .console
            .send(&commands::save(filename), self.timeout)
            .await
            .map_err(LifecycleError::Save)?;
        tracing::info!(?filename, "game saved");
        Ok(reply)
    }

    /// Sends a one-off console command such as a broadcast or a ban. These
    /// do not change the server's lifecycle and bypass the gate.
    pub async fn console_command(&self, command: &str) -> Result<Option<String>, LifecycleError> {
        let reply = self
            .console
            .send(command, self.timeout)
            .await
            .map_err(LifecycleError::Command)?;
        tracing::info!(command, "console command sent");
        Ok(reply)
    }

    /// Stop, cooldown, start; all under one hold of the gate.
    pub async fn restart_server(&self, save: Option<&str>) -> Result<String, LifecycleError> {
        let _gate = self.acquire()?;
        self.stop_locked().await?;
        tokio::time::sleep(self.restart_cooldown).await;
        self.start_locked(save).await
    }

    async fn start_locked(&self, save: Option<&str>) -> Result<String, LifecycleError> {
        if !tokio::fs::try_exists(&self.config.executable)
            .await
            .unwrap_or(false)
        {
            return Err(LifecycleError::Startup(format!(
                "server executable not found at {}",
                self.config.executable.display()
            )));
        }
        let save: SaveFile = match save {
            Some(name) => saves::resolve_save(&self.config.saves_dir, name).await?,
            None => saves::latest_save(&self.config.saves_dir).await?,
        };
        let request = LaunchRequest {
            executable: self.config.executable.clone(),
            save_path: save.path.clone(),
            rcon_port: self.config.rcon_port,
            rcon_password: self.config.rcon_password.clone(),
            game_port: self.config.game_port,
        };
        self.launcher
            .launch(&request)
            .map_err(|e| LifecycleError::Startup(format!("failed to spawn server: {e}")))?;

        let world = save.world_name().to_owned();
        self.world.set(world.clone());
        tracing::info!(%world, "server starting");
        Ok(world)
    }

    async fn stop_locked(&self) -> Result<(), LifecycleError> {
        self.console
            .send(&commands::save(None), self.timeout)
            .await
            .map_err(|source| LifecycleError::Shutdown {
                step: ShutdownStep::Save,
                source,
            })?;
        self.console
            .send(&commands::quit(), self.timeout)
            .await
            .map_err(|source| LifecycleError::Shutdown {
                step: ShutdownStep::Quit,
                source,
            })?;
        self.world.clear();
        tracing::info!("server shutdown initiated");
        Ok(())
    }
}
