//! Deployment of archives into an out-of-process worker
//!
//! This module provides:
//! - Materialization: writing an archive tree to files and directories on disk
//! - Command assembly: classpath and JVM flags for the worker
//! - Process supervision: spawn, kill and reap the worker
//! - Readiness polling: waiting for the worker's management port
//! - [`ManagedContainer`]: the deploy/undeploy sequence tying these together

mod command;
mod container;
mod materialize;
mod metadata;
mod process;
mod readiness;
mod state;
pub(crate) mod utils;

pub use command::{
    CommandBuilder, DEBUG_AGENT, PATH_LIST_SEPARATOR, SYSTEM_PROPERTY_SWITCH, WORKER_MAIN_CLASS,
    render,
};
pub use container::ManagedContainer;
pub use materialize::{MaterializedFile, MaterializedKind, Materializer};
pub use metadata::{Endpoint, ProtocolContext, ProtocolMetadata};
pub use process::ProcessSupervisor;
pub use readiness::{POLL_INTERVAL, ReadinessProbe};
pub use state::DeploymentState;
