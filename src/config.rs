//! Configuration management for the FTP server
//!
//! Settings come from an optional TOML file layered under `TINYFTP_*`
//! environment variables, e.g. `TINYFTP_CONTROL_PORT=2121`. Buffer
//! capacities are compile-time constants and are not configured here.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::Credentials;
use crate::error::ServerError;
use crate::server::{ServerOptions, TcpSettings};

/// File read when no `--config` path is given. It may be absent.
pub const DEFAULT_CONFIG_FILE: &str = "ftpd.toml";

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "TINYFTP";

/// Complete server configuration
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// IPv4 address the listeners bind to
    pub bind_address: String,

    /// Port for the FTP control connection
    pub control_port: u16,

    /// Port of the passive data listener
    pub pasv_port: u16,

    /// Public address to advertise in PASV replies, e.g. behind NAT
    pub pasv_address: Option<String>,

    /// Directory exposed as `/`
    pub server_root: String,

    pub username: String,
    pub password: String,

    /// Inactivity allowed after login
    pub idle_timeout_minutes: u32,

    /// Time allowed to send USER and PASS after connecting
    pub auth_timeout_secs: u32,

    /// Bound on connecting to the client in active mode
    pub data_connect_timeout_ms: u64,

    /// Interval between two polls of the session
    pub poll_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            control_port: 2121,
            pasv_port: 55600,
            pasv_address: None,
            server_root: "./ftp_root".to_string(),
            username: "admin".to_string(),
            password: "secret".to_string(),
            idle_timeout_minutes: 5,
            auth_timeout_secs: 10,
            data_connect_timeout_ms: 500,
            poll_interval_ms: 2,
        }
    }
}

impl ServerConfig {
    /// Loads `path` (or the default file, if present) with environment
    /// overrides, then validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let file = path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        let settings = Config::builder()
            .add_source(File::from(file).required(path.is_some()))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.control_port == 0 {
            return Err(config::ConfigError::Message(
                "Control port cannot be 0".into(),
            ));
        }

        if self.control_port == self.pasv_port {
            return Err(config::ConfigError::Message(
                "control_port and pasv_port must differ".into(),
            ));
        }

        if self.username.is_empty() || self.password.is_empty() {
            return Err(config::ConfigError::Message(
                "username and password cannot be empty".into(),
            ));
        }

        if self.server_root.is_empty() {
            return Err(config::ConfigError::Message(
                "server_root cannot be empty".into(),
            ));
        }

        if self.idle_timeout_minutes == 0 || self.auth_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "timeouts must be greater than 0".into(),
            ));
        }

        // Deadlines are compared through a signed 32-bit difference.
        let limit = i32::MAX as u64;
        if u64::from(self.idle_timeout_minutes) * 60 * 1000 > limit {
            return Err(config::ConfigError::Message(format!(
                "idle_timeout_minutes cannot exceed {}",
                limit / (60 * 1000)
            )));
        }
        if u64::from(self.auth_timeout_secs) * 1000 > limit {
            return Err(config::ConfigError::Message(format!(
                "auth_timeout_secs cannot exceed {}",
                limit / 1000
            )));
        }

        if self.poll_interval_ms == 0 {
            return Err(config::ConfigError::Message(
                "poll_interval_ms must be greater than 0".into(),
            ));
        }

        if self.bind_address.parse::<Ipv4Addr>().is_err() {
            return Err(config::ConfigError::Message(format!(
                "bind_address {} is not an IPv4 address",
                self.bind_address
            )));
        }

        if let Some(addr) = &self.pasv_address {
            if addr.parse::<Ipv4Addr>().is_err() {
                return Err(config::ConfigError::Message(format!(
                    "pasv_address {} is not an IPv4 address",
                    addr
                )));
            }
        }

        Ok(())
    }

    /// Get server root as PathBuf
    pub fn server_root_path(&self) -> PathBuf {
        PathBuf::from(&self.server_root)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Session policy for the poll loop.
    pub fn server_options(&self) -> ServerOptions {
        ServerOptions {
            credentials: Credentials {
                username: self.username.clone(),
                password: self.password.clone(),
            },
            idle_timeout_ms: self.idle_timeout_minutes.saturating_mul(60 * 1000),
            auth_timeout_ms: self.auth_timeout_secs.saturating_mul(1000),
        }
    }

    /// Socket settings for the std transport.
    pub fn tcp_settings(&self) -> Result<TcpSettings, ServerError> {
        let parse = |addr: &str| {
            addr.parse::<Ipv4Addr>()
                .map_err(|_| ServerError::InvalidAddress(addr.to_string()))
        };
        Ok(TcpSettings {
            bind_address: parse(&self.bind_address)?,
            control_port: self.control_port,
            pasv_port: self.pasv_port,
            pasv_address: self.pasv_address.as_deref().map(parse).transpose()?,
            data_connect_timeout: Duration::from_millis(self.data_connect_timeout_ms),
        })
    }
}
