use std::{collections::HashMap, fs, path::Path, time::Duration};

use tracing::warn;

use crate::{
    dashboard::{DashboardOptions, DEFAULT_CONFIRMATION_LOG_PROBABILITY},
    mesh::DEFAULT_LINK_THRESHOLD,
    runtime::RuntimeOptions,
};

pub const DEFAULT_CONFIG_FILE: &str = "dashboard.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub api_url: String,
    pub tick_interval_ms: u64,
    pub reconnect_delay_ms: u64,
    pub request_timeout_ms: u64,
    pub link_threshold: f64,
    pub confirmation_log_probability: f64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".into(),
            tick_interval_ms: 30,
            reconnect_delay_ms: 1_000,
            request_timeout_ms: 15_000,
            link_threshold: DEFAULT_LINK_THRESHOLD,
            confirmation_log_probability: DEFAULT_CONFIRMATION_LOG_PROBABILITY,
        }
    }
}

impl DashboardConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn dashboard_options(&self) -> DashboardOptions {
        DashboardOptions {
            link_threshold: self.link_threshold,
            confirmation_log_probability: self.confirmation_log_probability,
            seed: None,
        }
    }

    pub fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            dashboard: self.dashboard_options(),
            tick_interval: self.tick_interval(),
            reconnect_delay: self.reconnect_delay(),
            connect_stream: true,
        }
    }
}

/// Defaults, then `dashboard.toml` in the working directory, then the
/// process environment.
pub fn load_config() -> DashboardConfig {
    load_config_from(Path::new(DEFAULT_CONFIG_FILE), |key| std::env::var(key).ok())
}

pub fn load_config_from(
    file: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> DashboardConfig {
    let mut config = DashboardConfig::default();

    if let Ok(raw) = fs::read_to_string(file) {
        match toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            Ok(table) => {
                for (key, value) in table {
                    let value = match value {
                        toml::Value::String(text) => text,
                        other => other.to_string(),
                    };
                    apply_setting(&mut config, &key, &value);
                }
            }
            Err(err) => warn!(file = %file.display(), %err, "ignoring unreadable dashboard config"),
        }
    }

    if let Some(v) = env("MISSION_API_URL") {
        config.api_url = v;
    }
    for (var, key) in [
        ("APP__API_URL", "api_url"),
        ("APP__TICK_INTERVAL_MS", "tick_interval_ms"),
        ("APP__RECONNECT_DELAY_MS", "reconnect_delay_ms"),
        ("APP__REQUEST_TIMEOUT_MS", "request_timeout_ms"),
        ("APP__LINK_THRESHOLD", "link_threshold"),
        ("APP__CONFIRMATION_LOG_PROBABILITY", "confirmation_log_probability"),
    ] {
        if let Some(v) = env(var) {
            apply_setting(&mut config, key, &v);
        }
    }

    config
}

fn apply_setting(config: &mut DashboardConfig, key: &str, value: &str) {
    let value = value.trim();
    let applied = match key {
        "api_url" => {
            config.api_url = value.to_string();
            true
        }
        "tick_interval_ms" => parse_into(value, &mut config.tick_interval_ms),
        "reconnect_delay_ms" => parse_into(value, &mut config.reconnect_delay_ms),
        "request_timeout_ms" => parse_into(value, &mut config.request_timeout_ms),
        "link_threshold" => match value.parse::<f64>() {
            Ok(parsed) if parsed.is_finite() && parsed > 0.0 => {
                config.link_threshold = parsed;
                true
            }
            _ => false,
        },
        "confirmation_log_probability" => match value.parse::<f64>() {
            Ok(parsed) if (0.0..=1.0).contains(&parsed) => {
                config.confirmation_log_probability = parsed;
                true
            }
            _ => false,
        },
        _ => {
            warn!(key, "unknown dashboard setting");
            return;
        }
    };
    if !applied {
        warn!(key, value, "ignoring invalid dashboard setting");
    }
}

fn parse_into(value: &str, slot: &mut u64) -> bool {
    match value.parse() {
        Ok(parsed) => {
            *slot = parsed;
            true
        }
        Err(_) => false,
    }
}
