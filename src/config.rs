//! Process Configuration
//!
//! Loads the runtime configuration from environment variables before any
//! I/O begins. A missing or malformed variable is fatal: the binary reports
//! it and exits non-zero without binding sockets or spawning threads.
//!
//! ## Variables
//! - `ROLE` (required): `orch` or `worker`.
//! - `PORT` (required): decimal TCP port.
//! - `HOST` (required for `orch`): host the periodic requester targets.
//! - `DEBUG` (optional, default `0`): `1` enables debug-level logging.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is required")]
    Missing(&'static str),
    #[error("environment variable {var} has invalid value {value:?}: {expected}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Which half of the system this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Orchestrator,
    Worker,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub role: Role,
    pub port: u16,
    /// Target host for the orchestrator's periodic requests.
    /// Always `Some` when `role == Role::Orchestrator`.
    pub host: Option<String>,
    pub debug: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let role = match required(&lookup, "ROLE")?.as_str() {
            "orch" => Role::Orchestrator,
            "worker" => Role::Worker,
            other => {
                return Err(ConfigError::Invalid {
                    var: "ROLE",
                    value: other.to_string(),
                    expected: "one of \"orch\", \"worker\"",
                })
            }
        };

        let port_raw = required(&lookup, "PORT")?;
        let port = port_raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
            var: "PORT",
            value: port_raw,
            expected: "a decimal port number",
        })?;

        let host = match role {
            Role::Orchestrator => Some(required(&lookup, "HOST")?),
            Role::Worker => lookup("HOST"),
        };

        let debug = match lookup("DEBUG").as_deref() {
            None | Some("0") => false,
            Some("1") => true,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "DEBUG",
                    value: other.to_string(),
                    expected: "\"0\" or \"1\"",
                })
            }
        };

        Ok(Self {
            role,
            port,
            host,
            debug,
        })
    }
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<String, ConfigError> {
    lookup(key).ok_or(ConfigError::Missing(key))
}
