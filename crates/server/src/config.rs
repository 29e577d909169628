use std::{collections::HashMap, fs, path::Path, time::Duration};

use tracing::warn;

pub const DEFAULT_SETTINGS_FILE: &str = "server.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server_bind: String,
    pub pod_count: usize,
    pub tick_interval_ms: u64,
    pub drift_factor: f64,
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "0.0.0.0:8000".into(),
            pod_count: 15,
            tick_interval_ms: 100,
            drift_factor: 0.1,
            seed: None,
        }
    }
}

impl Settings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the settings file if it parses, then environment overrides.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            Ok(file_cfg) => {
                for (key, value) in file_cfg {
                    let value = match value {
                        toml::Value::String(v) => v,
                        other => other.to_string(),
                    };
                    apply_setting(&mut settings, &key, &value);
                }
            }
            Err(error) => warn!(path = %path.display(), %error, "ignoring unreadable settings file"),
        }
    }

    let overrides = [
        ("SERVER_BIND", "bind_addr"),
        ("APP__BIND_ADDR", "bind_addr"),
        ("APP__POD_COUNT", "pod_count"),
        ("APP__TICK_INTERVAL_MS", "tick_interval_ms"),
        ("APP__DRIFT_FACTOR", "drift_factor"),
        ("APP__SEED", "seed"),
    ];
    for (var, key) in overrides {
        if let Some(value) = env(var) {
            apply_setting(&mut settings, key, &value);
        }
    }

    settings
}

fn apply_setting(settings: &mut Settings, key: &str, value: &str) {
    let value = value.trim();
    let applied = match key {
        "bind_addr" | "server_bind" => {
            settings.server_bind = value.to_string();
            true
        }
        "pod_count" => value
            .parse::<usize>()
            .map(|parsed| settings.pod_count = parsed)
            .is_ok(),
        "tick_interval_ms" => value
            .parse::<u64>()
            .ok()
            .filter(|parsed| *parsed > 0)
            .map(|parsed| settings.tick_interval_ms = parsed)
            .is_some(),
        "drift_factor" => value
            .parse::<f64>()
            .ok()
            .filter(|parsed| *parsed > 0.0 && *parsed <= 1.0)
            .map(|parsed| settings.drift_factor = parsed)
            .is_some(),
        "seed" => value
            .parse::<u64>()
            .map(|parsed| settings.seed = Some(parsed))
            .is_ok(),
        _ => true,
    };

    if !applied {
        warn!(key, value, "ignoring invalid server setting");
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
