//! Worker process supervision

use std::process::{Child, Command, Stdio};

use crate::{Error, Result};

/// Owns the worker process, at most one at a time
#[derive(Debug, Default)]
pub struct ProcessSupervisor {
    child: Option<Child>,
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `command` (program first) with stdout and stderr inherited.
    ///
    /// Returns the process id.
    pub fn start(&mut self, command: &[String]) -> Result<u32> {
        let Some((program, args)) = command.split_first() else {
            return Err(Error::launch(
                "Could not start process: empty command",
                "This is likely a bug in semanaged",
                None,
            ));
        };

        if self.child.is_some() {
            tracing::warn!("A worker process is still running; stopping it first");
            if let Err(e) = self.stop() {
                tracing::warn!(error = %e, "Failed to stop previous worker process");
            }
        }

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                Error::launch(
                    format!("Could not start process {}", program),
                    "Check that the runtime home points at a valid installation",
                    Some(e),
                )
            })?;

        let pid = child.id();
        tracing::info!(pid, "Started worker process");
        self.child = Some(child);
        Ok(pid)
    }

    /// Kill the worker and block until it has exited.
    ///
    /// A no-op when no process is active. The kill request is always issued
    /// before waiting; if the wait itself fails the handle is still released
    /// and the failure is returned.
    pub fn stop(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let pid = child.id();

        if let Ok(Some(status)) = child.try_wait() {
            tracing::debug!(pid, %status, "Worker process had already exited");
            return Ok(());
        }

        if let Err(e) = child.kill() {
            // Raced with a normal exit; the wait below reaps it
            tracing::debug!(pid, error = %e, "Kill request failed");
        }

        match child.wait() {
            Ok(status) => {
                tracing::info!(pid, %status, "Worker process terminated");
                Ok(())
            }
            Err(e) => Err(Error::teardown_interrupted(
                format!(
                    "Interrupted while awaiting worker process {} termination: {}",
                    pid, e
                ),
                "The kill signal was sent; verify the process is gone",
            )),
        }
    }

    /// Whether a worker process is alive
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Process id of the current worker
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            tracing::debug!(pid = child.id(), "Reaping worker process on drop");
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
