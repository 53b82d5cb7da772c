//! Readiness polling of the worker's management port

use std::net::TcpStream;
use std::thread;
use std::time::{Duration, Instant};

use super::metadata::Endpoint;

/// Delay between connection attempts
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound for a single connection attempt
const MAX_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);

/// Lower bound for a single connection attempt
const MIN_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(10);

/// Polls an endpoint until it accepts TCP connections or time runs out
#[derive(Debug, Clone)]
pub struct ReadinessProbe {
    endpoint: Endpoint,
    timeout: Duration,
    poll_interval: Duration,
}

impl ReadinessProbe {
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Self {
        Self {
            endpoint,
            timeout,
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Block until a connection succeeds (`true`) or the timeout has
    /// elapsed (`false`). Refused connections and resolution failures are
    /// simply retried.
    pub fn wait_until_ready(&self) -> bool {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let remaining = deadline.saturating_duration_since(Instant::now());
            let attempt_timeout = remaining.clamp(MIN_ATTEMPT_TIMEOUT, MAX_ATTEMPT_TIMEOUT);

            if self.try_connect(attempt_timeout) {
                tracing::debug!(
                    endpoint = %self.endpoint,
                    attempts,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Endpoint is reachable"
                );
                return true;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::debug!(endpoint = %self.endpoint, attempts, "Gave up waiting for endpoint");
                return false;
            }
            thread::sleep(self.poll_interval.min(remaining));
        }
    }

    fn try_connect(&self, timeout: Duration) -> bool {
        let addrs = match self.endpoint.socket_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                tracing::trace!(endpoint = %self.endpoint, error = %e, "Could not resolve endpoint");
                return false;
            }
        };

        addrs
            .iter()
            .any(|addr| TcpStream::connect_timeout(addr, timeout).is_ok())
    }
}
