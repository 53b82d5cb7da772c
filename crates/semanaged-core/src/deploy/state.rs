//! Deployment lifecycle states

use std::fmt;

/// Where a container is in its deploy/undeploy cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeploymentState {
    /// Nothing deployed
    #[default]
    Idle,
    /// Writing the archive to disk
    Materializing,
    /// Spawning the worker process
    Launching,
    /// Waiting for the worker's management port to open
    AwaitingReady,
    /// Worker reachable; metadata handed to the caller
    Deployed,
    /// The last deploy failed; files and process may still need `undeploy`
    DeployFailed,
    /// Terminating the worker process
    Stopping,
    /// Deleting materialized files
    Cleaning,
}

impl DeploymentState {
    /// Whether a deploy call is in progress
    pub fn is_deploying(self) -> bool {
        matches!(
            self,
            Self::Materializing | Self::Launching | Self::AwaitingReady
        )
    }
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Materializing => "materializing",
            Self::Launching => "launching",
            Self::AwaitingReady => "awaiting-ready",
            Self::Deployed => "deployed",
            Self::DeployFailed => "deploy-failed",
            Self::Stopping => "stopping",
            Self::Cleaning => "cleaning",
        };
        f.write_str(name)
    }
}
