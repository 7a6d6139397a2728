//! Fire-and-forget command execution for key actions.

use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use tracing::{debug, info, warn};

/// Runs the command string bound to a key.
///
/// Implementations must not block the caller on the command's completion.
pub trait CommandLauncher: Send {
    fn launch(&self, command: &str);
}

/// Type alias for boxed trait object.
pub type BoxedLauncher = Box<dyn CommandLauncher>;

/// Launches commands through the platform shell.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellLauncher;

impl ShellLauncher {
    fn command(command: &str) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", command]);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", command]);
            cmd
        }
    }
}

impl CommandLauncher for ShellLauncher {
    fn launch(&self, command: &str) {
        let spawned = Self::command(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                warn!(command, error = %e, "Failed to launch command");
                return;
            }
        };

        info!(command, pid = child.id(), "Launched command");
        let command = command.to_string();
        // Reap the child off the caller's thread
        let reaper = thread::Builder::new()
            .name("sdp-reaper".to_string())
            .spawn(move || match child.wait() {
                Ok(status) if status.success() => debug!(command, "Command finished"),
                Ok(status) => warn!(command, code = ?status.code(), "Command exited with failure"),
                Err(e) => warn!(command, error = %e, "Failed to wait for command"),
            });
        if let Err(e) = reaper {
            warn!(error = %e, "Failed to spawn reaper thread");
        }
    }
}

/// Records commands instead of running them.
///
/// Clones share the record.
#[derive(Debug, Default, Clone)]
pub struct RecordingLauncher {
    launched: Arc<Mutex<Vec<String>>>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands launched so far, oldest first.
    pub fn launched(&self) -> Vec<String> {
        self.launched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CommandLauncher for RecordingLauncher {
    fn launch(&self, command: &str) {
        debug!(command, "Recording command launch");
        self.launched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command.to_string());
    }
}
