use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

use crate::outbox::DispatcherConfig;
use crate::saga::RecoveryConfig;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    /// PostgreSQL connection URL for accounts, payments, saga log and outbox.
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default)]
    pub recovery: RecoverySettings,
    #[serde(default)]
    pub outbox: OutboxSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecoverySettings {
    pub scan_interval_secs: u64,
    pub stale_threshold_secs: u64,
    pub batch_size: usize,
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            scan_interval_secs: 30,
            stale_threshold_secs: 60,
            batch_size: 100,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutboxSettings {
    pub poll_interval_ms: u64,
    pub resubmit_after_secs: u64,
    pub batch_size: usize,
}

impl Default for OutboxSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            resubmit_after_secs: 60,
            batch_size: 100,
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Self {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .unwrap_or_else(|_| panic!("Failed to read config file: {}", config_path));
        serde_yaml::from_str(&content).expect("Failed to parse config yaml")
    }

    pub fn recovery_config(&self) -> RecoveryConfig {
        RecoveryConfig {
            scan_interval: Duration::from_secs(self.recovery.scan_interval_secs),
            stale_threshold: Duration::from_secs(self.recovery.stale_threshold_secs),
            batch_size: self.recovery.batch_size,
        }
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            poll_interval: Duration::from_millis(self.outbox.poll_interval_ms),
            resubmit_after: Duration::from_secs(self.outbox.resubmit_after_secs),
            batch_size: self.outbox.batch_size,
        }
    }
}
