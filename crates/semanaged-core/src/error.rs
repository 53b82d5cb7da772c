//! Error types for semanaged

// This warning is a false positive from thiserror macro expansion
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for semanaged operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for semanaged
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Configuration error, raised before any process is spawned
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[help]
        help: String,
    },

    /// Writing the deployment to disk failed
    #[error("Materialization error: {message}")]
    Materialize {
        message: String,
        #[help]
        help: String,
    },

    /// The system properties resource could not be parsed
    #[error("System properties error: {message}")]
    Properties {
        message: String,
        #[help]
        help: String,
    },

    /// The worker process could not be created
    #[error("Launch error: {message}")]
    Launch {
        message: String,
        #[help]
        help: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// The worker never opened its management port
    #[error("Worker process failed to start within {timeout_secs} seconds ({endpoint})")]
    #[diagnostic(help(
        "Check the worker output above; in debug mode the JVM waits for a debugger on port 8787"
    ))]
    ReadinessTimeout {
        /// Address that was probed
        endpoint: String,
        /// Probe budget
        timeout_secs: u64,
    },

    /// Waiting for the worker to exit failed after the kill was requested
    #[error("Teardown interrupted: {message}")]
    TeardownInterrupted {
        message: String,
        #[help]
        help: String,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a materialization error
    pub fn materialize(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Materialize {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a system properties error
    pub fn properties(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Properties {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a launch error, optionally wrapping the OS failure
    pub fn launch(
        message: impl Into<String>,
        help: impl Into<String>,
        source: Option<std::io::Error>,
    ) -> Self {
        Self::Launch {
            message: message.into(),
            help: help.into(),
            source,
        }
    }

    /// Create a readiness timeout error
    pub fn readiness_timeout(endpoint: impl ToString, timeout_secs: u64) -> Self {
        Self::ReadinessTimeout {
            endpoint: endpoint.to_string(),
            timeout_secs,
        }
    }

    /// Create a teardown interrupted error
    pub fn teardown_interrupted(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::TeardownInterrupted {
            message: message.into(),
            help: help.into(),
        }
    }
}
