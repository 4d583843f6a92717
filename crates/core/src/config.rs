//! Client configuration
//!
//! Connection settings for a simulator session. Defaults match a simulator
//! running on the same machine with its stock remote-control port. Values can
//! be overridden from the environment (optionally through a `.env` file).

use std::time::Duration;

use crate::error::BngError;

/// Default simulator host.
pub const DEFAULT_HOST: &str = "localhost";
/// Default simulator remote-control port.
pub const DEFAULT_PORT: u16 = 64256;

/// Connection settings for a simulator session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BngConfig {
    /// Host name or address of the simulator
    pub host: String,
    /// TCP port of the simulator's game channel
    pub port: u16,
    /// Timeout for establishing TCP connections
    pub connect_timeout: Duration,
    /// Read/write timeout for ordinary requests
    pub request_timeout: Duration,
    /// Read timeout while a level is loading
    pub load_timeout: Duration,
}

impl Default for BngConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            load_timeout: Duration::from_secs(600),
        }
    }
}

impl BngConfig {
    /// Configuration for `host:port` with default timeouts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Set the TCP connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the level loading timeout.
    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `BNG_HOST`: simulator host (default: `localhost`)
    /// - `BNG_PORT`: simulator port (default: `64256`)
    /// - `BNG_CONNECT_TIMEOUT_SECS`: connect timeout in seconds (default: 10)
    /// - `BNG_REQUEST_TIMEOUT_SECS`: request timeout in seconds (default: 30)
    /// - `BNG_LOAD_TIMEOUT_SECS`: level load timeout in seconds (default: 600)
    ///
    /// # Errors
    ///
    /// Returns [`BngError::Config`] if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, BngError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`BngError::Config`] if a value cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BngError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("BNG_HOST") {
            if host.trim().is_empty() {
                return Err(BngError::Config("BNG_HOST is empty".to_string()));
            }
            config.host = host.trim().to_string();
        }
        if let Some(port) = lookup("BNG_PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|e| BngError::Config(format!("BNG_PORT '{port}': {e}")))?;
        }
        if let Some(secs) = lookup("BNG_CONNECT_TIMEOUT_SECS") {
            config.connect_timeout = parse_secs("BNG_CONNECT_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = lookup("BNG_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = parse_secs("BNG_REQUEST_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = lookup("BNG_LOAD_TIMEOUT_SECS") {
            config.load_timeout = parse_secs("BNG_LOAD_TIMEOUT_SECS", &secs)?;
        }

        Ok(config)
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration, BngError> {
    let secs: u64 = value
        .trim()
        .parse()
        .map_err(|e| BngError::Config(format!("{key} '{value}': {e}")))?;
    if secs == 0 {
        // A zero read timeout is rejected by the socket API.
        return Err(BngError::Config(format!("{key} must be at least 1 second")));
    }
    Ok(Duration::from_secs(secs))
}
