//! semanaged-core - Core library for semanaged
//!
//! This crate manages the lifecycle of an out-of-process JVM test worker:
//! - Archive model (classpath roots, class directories, packaged files)
//! - Materialization of archives onto disk
//! - Worker command assembly, process supervision and readiness polling
//! - Deployment packaging and configuration loading

pub mod archive;
pub mod config;
pub mod deploy;
pub mod error;
pub mod packager;
pub mod properties;

pub use error::{Error, Result};
