/// Configuration parsing for the SNI front end.
use serde::Deserialize;
use std::net::IpAddr;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ListenConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub backends: Backends,
}

#[derive(Debug, Deserialize)]
pub struct ListenConfig {
    pub port: u16,
    /// Explicit local addresses. Empty means the wildcard address of both
    /// families.
    #[serde(default)]
    pub listen: Vec<IpAddr>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Size of the single greeting read.
    #[serde(default = "default_read_buffer")]
    pub read_buffer: usize,
    /// 0 disables the timeout.
    #[serde(default = "default_greeting_timeout")]
    pub greeting_timeout_sec: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            read_buffer: default_read_buffer(),
            greeting_timeout_sec: default_greeting_timeout(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ── Backends ─────────────────────────────────────────────────────────

/// Routing destinations, kept as the raw `[backends]` table.
///
/// This crate never interprets the contents; sessions only hand a shared
/// reference to whatever makes the routing decision.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Backends(toml::Table);

impl Backends {
    pub fn new(table: toml::Table) -> Self {
        Self(table)
    }

    pub fn table(&self) -> &toml::Table {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ── Defaults ─────────────────────────────────────────────────────────

fn default_max_connections() -> u32 {
    1024
}
fn default_read_buffer() -> usize {
    8192
}
fn default_greeting_timeout() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".into()
}

// ── Loaders ──────────────────────────────────────────────────────────

pub fn parse_config(content: &str) -> Result<Config, Box<dyn std::error::Error>> {
    let config: Config = toml::from_str(content)?;
    if config.limits.read_buffer == 0 {
        return Err("limits.read_buffer must not be zero".into());
    }
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_defaults() {
        let config = parse_config("[server]\nport = 8443\n").unwrap();
        assert_eq!(config.server.port, 8443);
        assert!(config.server.listen.is_empty());
        assert_eq!(config.limits.read_buffer, 8192);
        assert_eq!(config.limits.greeting_timeout_sec, 30);
        assert_eq!(config.logging.level, "info");
        assert!(config.backends.is_empty());
    }

    #[test]
    fn test_backends_passed_through() {
        let config = parse_config(
            r#"
            [server]
            port = 443
            listen = ["127.0.0.1", "::1"]

            [backends.web]
            hosts = ["example.com", "*.example.com"]
            target = "10.0.0.5:443"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.listen.len(), 2);
        let web = config.backends.table()["web"].as_table().unwrap();
        assert_eq!(web["target"].as_str(), Some("10.0.0.5:443"));
    }

    #[test]
    fn test_zero_read_buffer_rejected() {
        assert!(parse_config("[server]\nport = 1\n[limits]\nread_buffer = 0\n").is_err());
    }

    #[test]
    fn test_port_required() {
        assert!(parse_config("[server]\n").is_err());
    }
}
