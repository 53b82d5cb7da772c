//! Endpoint and protocol metadata handed back after a successful deploy

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

/// Address of the worker's management interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Resolve the endpoint to socket addresses
    pub fn socket_addrs(&self) -> io::Result<Vec<SocketAddr>> {
        Ok((self.host.as_str(), self.port).to_socket_addrs()?.collect())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A way of talking to the deployed worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum ProtocolContext {
    /// JMX remote management on the given endpoint
    Jmx(Endpoint),
}

/// Handoff object consumed by whatever talks to the worker after deploy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolMetadata {
    contexts: Vec<ProtocolContext>,
}

impl ProtocolMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(mut self, context: ProtocolContext) -> Self {
        self.contexts.push(context);
        self
    }

    pub fn contexts(&self) -> &[ProtocolContext] {
        &self.contexts
    }

    /// Endpoint of the first JMX context
    pub fn jmx_endpoint(&self) -> Option<&Endpoint> {
        self.contexts.iter().find_map(|context| match context {
            ProtocolContext::Jmx(endpoint) => Some(endpoint),
        })
    }
}
