//! Alert sound backends

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::{AlertConfig, AlertError};

/// Audio backend used by the arbiter. `play` may block for the length of
/// the sound; the arbiter keeps the gate busy until it returns, so
/// implementations must return within a bounded time.
pub trait AlertSound: Send + Sync {
    fn play(&self) -> Result<(), AlertError>;
}

const DEFAULT_PLAYBACK_LIMIT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Plays a sound file through an external player program. A player still
/// running after the timeout is killed and the playback reported as failed.
#[derive(Debug, Clone)]
pub struct CommandSound {
    program: String,
    args: Vec<String>,
    path: PathBuf,
    timeout: Duration,
}

impl CommandSound {
    /// Create a backend for `path`; the file must exist
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        path: impl AsRef<Path>,
    ) -> Result<Self, AlertError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(AlertError::MissingSound(path.display().to_string()));
        }
        Ok(Self {
            program: program.into(),
            args,
            path: path.to_path_buf(),
            timeout: DEFAULT_PLAYBACK_LIMIT,
        })
    }

    /// Limit how long one playback may run
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AlertSound for CommandSound {
    fn play(&self) -> Result<(), AlertError> {
        debug!("Playing {} with {}", self.path.display(), self.program);
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&self.path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AlertError::Playback(format!("{}: {}", self.program, e)))?;

        let deadline = Instant::now() + self.timeout;
        loop {
            let polled = child
                .try_wait()
                .map_err(|e| AlertError::Playback(format!("{}: {}", self.program, e)))?;
            match polled {
                Some(status) if status.success() => return Ok(()),
                Some(status) => {
                    return Err(AlertError::Playback(format!(
                        "{} exited with {}",
                        self.program, status
                    )))
                }
                None if Instant::now() >= deadline => break,
                None => std::thread::sleep(POLL_INTERVAL),
            }
        }

        if let Err(e) = child.kill() {
            warn!("Failed to stop {}: {}", self.program, e);
        }
        // Reap the killed player
        let _ = child.wait();
        Err(AlertError::Playback(format!(
            "{} still running after {:.1}s, killed",
            self.program,
            self.timeout.as_secs_f64()
        )))
    }
}

/// Logs alerts without producing sound
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSound;

impl AlertSound for SilentSound {
    fn play(&self) -> Result<(), AlertError> {
        warn!("ALERT (audio disabled)");
        Ok(())
    }
}

/// Build the backend selected by `config`
pub fn from_config(config: &AlertConfig) -> Result<Arc<dyn AlertSound>, AlertError> {
    if !config.audible {
        info!("Audible alerts disabled");
        return Ok(Arc::new(SilentSound));
    }
    let sound = CommandSound::new(
        config.player.clone(),
        config.player_args.clone(),
        &config.sound_path,
    )?
    .with_timeout(config.max_playback());
    info!("Alert sound: {} via {}", sound.path().display(), config.player);
    Ok(Arc::new(sound))
}
