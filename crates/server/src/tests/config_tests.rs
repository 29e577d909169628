use super::{load_settings_from, Settings};

use std::{
    collections::HashMap,
    env, fs,
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn missing_file_and_env_yield_defaults() {
    let settings = load_settings_from(Path::new("does-not-exist.toml"), env_from(&[]));
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.server_bind, "0.0.0.0:8000");
    assert_eq!(settings.pod_count, 15);
}

#[test]
fn file_values_apply_and_env_wins() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("mission_server_settings_{suffix}"));
    fs::create_dir_all(&temp_root).expect("temp root");
    let path = temp_root.join("server.toml");
    fs::write(
        &path,
        "bind_addr = \"127.0.0.1:9000\"\npod_count = 4\ndrift_factor = 0.5\n",
    )
    .expect("write settings");

    let settings = load_settings_from(
        &path,
        env_from(&[("APP__BIND_ADDR", "127.0.0.1:9100"), ("APP__SEED", "7")]),
    );
    assert_eq!(settings.server_bind, "127.0.0.1:9100");
    assert_eq!(settings.pod_count, 4);
    assert_eq!(settings.drift_factor, 0.5);
    assert_eq!(settings.seed, Some(7));

    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn invalid_overrides_keep_previous_values() {
    let settings = load_settings_from(
        Path::new("does-not-exist.toml"),
        env_from(&[
            ("APP__POD_COUNT", "many"),
            ("APP__TICK_INTERVAL_MS", "0"),
            ("APP__DRIFT_FACTOR", "1.5"),
        ]),
    );
    assert_eq!(settings.pod_count, 15);
    assert_eq!(settings.tick_interval_ms, 100);
    assert_eq!(settings.drift_factor, 0.1);
}
