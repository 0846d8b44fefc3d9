//! Process configuration: environment first, then CLI flags.

use std::env;

use till_ledger::{LedgerConfig, LockWait};

use crate::cli::GlobalArgs;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub ledger: LedgerConfig,

    /// Log filter directive (trace, debug, info, warn, error or a full
    /// `EnvFilter` string)
    pub log_level: String,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig::default(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl RuntimeConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TILL_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `TILL_JSON_LOGS`: Enable JSON logs (default: false)
    /// - everything [`LedgerConfig::from_env`] reads
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            ledger: LedgerConfig::from_lookup(&lookup),

            log_level: lookup("TILL_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or_else(|| "info".to_string()),

            json_logs: lookup("TILL_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),
        }
    }

    /// Apply command-line overrides.
    pub fn with_cli(mut self, args: &GlobalArgs) -> Self {
        if let Some(dir) = &args.data_dir {
            self.ledger = self.ledger.with_data_dir(dir);
        }
        if let Some(ms) = args.lock_timeout_ms {
            self.ledger = self.ledger.with_lock_wait(LockWait::from_millis(ms));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use till_ledger::Role;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::from_lookup(no_env);
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
        assert_eq!(config.ledger, LedgerConfig::default());
    }

    #[test]
    fn test_env_precedence() {
        let config = RuntimeConfig::from_lookup(|key| match key {
            "TILL_LOG_LEVEL" => Some("debug".into()),
            "RUST_LOG" => Some("warn".into()),
            "TILL_JSON_LOGS" => Some("TRUE".into()),
            _ => None,
        });
        assert_eq!(config.log_level, "debug");
        assert!(config.json_logs);

        let config = RuntimeConfig::from_lookup(|key| (key == "RUST_LOG").then(|| "warn".into()));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_cli_overrides_env() {
        let config = RuntimeConfig::from_lookup(|key| match key {
            "TILL_DATA_DIR" => Some("/from/env".into()),
            "TILL_LOCK_TIMEOUT_MS" => Some("100".into()),
            _ => None,
        });
        assert_eq!(config.ledger.data_dir(), Path::new("/from/env"));

        let args = GlobalArgs {
            role: Role::Cashier,
            data_dir: Some(PathBuf::from("/from/cli")),
            lock_timeout_ms: Some(2500),
        };
        let config = config.with_cli(&args);
        assert_eq!(config.ledger.data_dir(), Path::new("/from/cli"));
        assert_eq!(
            config.ledger.lock_wait,
            LockWait::Timeout(Duration::from_millis(2500))
        );
    }
}
