use std::{net::SocketAddr, time::Duration};

use crate::error::{Error, Result};

pub const DEFAULT_PORT: u16 = 3333;
pub const DEFAULT_MAX_CLIENTS: usize = 5;
pub const DEFAULT_BUFFER_SIZE: usize = 1024;
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_QUIT_COMMAND: &[u8] = b"quit";

/// What the loop does when `accept` fails with anything other than `WouldBlock`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcceptErrorPolicy {
    /// Stop the loop and report [`Error::Accept`].
    Fatal,
    /// Log the failure and keep serving the connections already accepted.
    #[default]
    LogAndContinue,
}

/// Configuration for the server loop.
///
/// Controls the bind address, the size of the slot table, the receive buffer
/// and the readiness-wait timeout. Use [`ServerConfig::builder()`] for
/// ergonomic construction.
///
/// ## Resource Limits
///
/// - `max_clients`: number of slots in the connection table
/// - `backlog`: listen backlog, defaults to `max_clients`
/// - `buffer_size`: upper bound on bytes read per receive
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub address: SocketAddr,
    /// Capacity of the connection table
    pub max_clients: usize,
    /// Listen backlog
    pub backlog: u32,
    /// Size of the receive buffer
    pub buffer_size: usize,
    /// Upper bound on a single readiness wait
    pub poll_timeout: Duration,
    /// Behavior on a non-transient accept failure
    pub accept_error_policy: AcceptErrorPolicy,
    /// Payload prefix that stops the whole server
    pub quit_command: Vec<u8>,
}

impl ServerConfig {
    /// Create a new builder for ServerConfig
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_clients == 0 {
            return Err(Error::Configuration(
                "max_clients must be at least 1".to_string(),
            ));
        }
        if self.buffer_size == 0 {
            return Err(Error::Configuration(
                "buffer_size must be at least 1".to_string(),
            ));
        }
        if self.quit_command.is_empty() {
            return Err(Error::Configuration(
                "quit_command must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_clients: DEFAULT_MAX_CLIENTS,
            backlog: DEFAULT_MAX_CLIENTS as u32,
            buffer_size: DEFAULT_BUFFER_SIZE,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            accept_error_policy: AcceptErrorPolicy::default(),
            quit_command: DEFAULT_QUIT_COMMAND.to_vec(),
        }
    }
}

/// Builder for ServerConfig.
///
/// All fields are optional and fall back to [`ServerConfig::default()`]. When
/// only `max_clients` is set, the backlog follows it.
#[derive(Default)]
pub struct ServerConfigBuilder {
    address: Option<SocketAddr>,
    max_clients: Option<usize>,
    backlog: Option<u32>,
    buffer_size: Option<usize>,
    poll_timeout: Option<Duration>,
    accept_error_policy: Option<AcceptErrorPolicy>,
    quit_command: Option<Vec<u8>>,
}

impl ServerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn address(mut self, address: SocketAddr) -> Self {
        self.address = Some(address);
        self
    }

    pub fn max_clients(mut self, max: usize) -> Self {
        self.max_clients = Some(max);
        self
    }

    pub fn backlog(mut self, backlog: u32) -> Self {
        self.backlog = Some(backlog);
        self
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = Some(size);
        self
    }

    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = Some(timeout);
        self
    }

    pub fn accept_error_policy(mut self, policy: AcceptErrorPolicy) -> Self {
        self.accept_error_policy = Some(policy);
        self
    }

    pub fn quit_command(mut self, command: impl Into<Vec<u8>>) -> Self {
        self.quit_command = Some(command.into());
        self
    }

    pub fn build(self) -> ServerConfig {
        let default = ServerConfig::default();
        let max_clients = self.max_clients.unwrap_or(default.max_clients);
        ServerConfig {
            address: self.address.unwrap_or(default.address),
            max_clients,
            backlog: self
                .backlog
                .unwrap_or_else(|| u32::try_from(max_clients).unwrap_or(u32::MAX)),
            buffer_size: self.buffer_size.unwrap_or(default.buffer_size),
            poll_timeout: self.poll_timeout.unwrap_or(default.poll_timeout),
            accept_error_policy: self
                .accept_error_policy
                .unwrap_or(default.accept_error_policy),
            quit_command: self.quit_command.unwrap_or(default.quit_command),
        }
    }
}
