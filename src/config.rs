//! Server configuration
//!
//! Parsed from command-line flags with environment variable fallbacks.
//! Every setting has a default so the server starts with no
//! configuration for local development.

use std::time::Duration;

use clap::{Args, Parser};

/// Default listen host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default listen port
pub const DEFAULT_PORT: u16 = 8000;

/// Default maximum inbound line length in bytes
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024;

/// Full server configuration
#[derive(Debug, Clone, Parser)]
#[command(author, version, about)]
pub struct ServerConfig {
    /// Host address to bind to
    #[arg(short = 'H', long, env = "CHAT_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "CHAT_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Longest inbound line accepted, in bytes; longer lines are discarded
    #[arg(long, env = "CHAT_MAX_LINE_LENGTH", default_value_t = DEFAULT_MAX_LINE_LENGTH)]
    pub max_line_length: usize,

    #[command(flatten)]
    pub hub: HubConfig,
}

impl ServerConfig {
    /// `host:port` string for binding the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Chat hub settings
#[derive(Debug, Clone, Args)]
pub struct HubConfig {
    /// Public messages replayed to a session when it joins
    #[arg(long, env = "CHAT_HISTORY_LEN", default_value_t = 20)]
    pub history_len: usize,

    /// Reports that mute a session
    #[arg(
        long,
        env = "CHAT_REPORTS_FOR_BAN",
        default_value_t = 3,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub reports_for_ban: u32,

    /// Seconds a muted session stays muted
    #[arg(long, env = "CHAT_BAN_TIME_SECS", default_value_t = 30)]
    pub ban_time_secs: u64,

    /// Public messages kept in memory
    #[arg(long, env = "CHAT_LOG_CAPACITY", default_value_t = 10_000)]
    pub log_capacity: usize,
}

impl HubConfig {
    pub fn ban_time(&self) -> Duration {
        Duration::from_secs(self.ban_time_secs)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            history_len: 20,
            reports_for_ban: 3,
            ban_time_secs: 30,
            log_capacity: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::try_parse_from(["chat_hub"]).unwrap();
        assert_eq!(config.max_line_length, DEFAULT_MAX_LINE_LENGTH);
        assert_eq!(config.hub.history_len, HubConfig::default().history_len);
        assert_eq!(config.hub.reports_for_ban, 3);
        assert_eq!(config.hub.ban_time(), Duration::from_secs(30));
    }

    #[test]
    fn test_flags_override() {
        let config = ServerConfig::try_parse_from([
            "chat_hub",
            "-H",
            "0.0.0.0",
            "--port",
            "9000",
            "--reports-for-ban",
            "5",
            "--ban-time-secs",
            "60",
        ])
        .unwrap();

        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
        assert_eq!(config.hub.reports_for_ban, 5);
        assert_eq!(config.hub.ban_time(), Duration::from_secs(60));
    }

    #[test]
    fn test_zero_reports_rejected() {
        assert!(ServerConfig::try_parse_from(["chat_hub", "--reports-for-ban", "0"]).is_err());
    }
}
