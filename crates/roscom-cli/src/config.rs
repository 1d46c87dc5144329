//! Bridge settings – reads/writes `~/.roscom/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use roscom_middleware::{BridgeConfig, DEFAULT_NAMESPACE, DispatchMode};
use serde::{Deserialize, Serialize};

/// Persisted settings stored in `~/.roscom/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Namespace private channels resolve under (`~x` → `/<namespace>/x`).
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Control loop rate: queue drains and live publishes per second.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,

    #[serde(default)]
    pub dispatch: DispatchMode,

    /// How long a PAU pose keeps its override after the last `set_pau`.
    #[serde(default = "default_pau_active_timeout_ms")]
    pub pau_active_timeout_ms: u32,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}
fn default_tick_hz() -> u32 {
    50
}
fn default_pau_active_timeout_ms() -> u32 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            tick_hz: default_tick_hz(),
            dispatch: DispatchMode::default(),
            pau_active_timeout_ms: default_pau_active_timeout_ms(),
        }
    }
}

impl Config {
    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            namespace: self.namespace.clone(),
            dispatch: self.dispatch,
        }
    }

    /// Interval between control loop ticks.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(1) / self.tick_hz.max(1)
    }
}

/// Return the path to `~/.roscom/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".roscom").join("config.toml")
}

/// Load the config from disk with environment overrides applied.
///
/// A missing file yields the defaults.
pub fn load() -> Result<Config, String> {
    let mut cfg = load_from(&config_path())?;
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Load the config stored at `path`, without environment overrides.
pub(crate) fn load_from(path: &Path) -> Result<Config, String> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))
}

/// Apply `ROSCOM_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `ROSCOM_NAMESPACE` | `namespace` |
/// | `ROSCOM_TICK_HZ` | `tick_hz` (ignored unless a positive integer) |
/// | `ROSCOM_DISPATCH` | `dispatch` (`direct` or `queued`) |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("ROSCOM_NAMESPACE") {
        cfg.namespace = v;
    }
    if let Ok(v) = std::env::var("ROSCOM_TICK_HZ")
        && let Ok(hz) = v.parse::<u32>()
        && hz > 0
    {
        cfg.tick_hz = hz;
    }
    if let Ok(v) = std::env::var("ROSCOM_DISPATCH")
        && let Ok(mode) = v.parse::<DispatchMode>()
    {
        cfg.dispatch = mode;
    }
}

/// Save the config to disk, creating `~/.roscom/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_custom_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = Config {
            namespace: "head_rig".to_string(),
            tick_hz: 30,
            dispatch: DispatchMode::Queued,
            pau_active_timeout_ms: 500,
        };
        save_to(&cfg, &path).expect("save");

        let raw = std::fs::read_to_string(&path).expect("read");
        assert!(raw.contains("dispatch = \"queued\""));
        assert_eq!(load_from(&path).expect("load"), cfg);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        let cfg = load_from(&path).expect("no error");
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.namespace, "blender_api");
        assert_eq!(cfg.tick_hz, 50);
        assert_eq!(cfg.pau_active_timeout_ms, 300);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "tick_hz = 10\n").expect("write");
        let cfg = load_from(&path).expect("load");
        assert_eq!(cfg.tick_hz, 10);
        assert_eq!(cfg.dispatch, DispatchMode::Direct);
        assert_eq!(cfg.tick_period(), Duration::from_millis(100));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "dispatch = \"eventually\"\n").expect("write");
        assert!(load_from(&path).is_err());
    }

    #[test]
    fn config_path_points_to_roscom_dir() {
        let p = config_path_for_home("/home/operator");
        assert_eq!(p, PathBuf::from("/home/operator/.roscom/config.toml"));
    }

    #[test]
    fn bridge_config_carries_namespace_and_dispatch() {
        let cfg = Config {
            namespace: "robot".to_string(),
            dispatch: DispatchMode::Queued,
            ..Config::default()
        };
        let bridge = cfg.bridge_config();
        assert_eq!(bridge.namespace, "robot");
        assert_eq!(bridge.dispatch, DispatchMode::Queued);
    }

    #[test]
    fn env_overrides_apply() {
        // SAFETY: these variables are only touched by this test.
        unsafe {
            std::env::set_var("ROSCOM_NAMESPACE", "sophia");
            std::env::set_var("ROSCOM_TICK_HZ", "0");
            std::env::set_var("ROSCOM_DISPATCH", "QUEUED");
        }
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.namespace, "sophia");
        assert_eq!(cfg.tick_hz, 50);
        assert_eq!(cfg.dispatch, DispatchMode::Queued);
        unsafe {
            std::env::remove_var("ROSCOM_NAMESPACE");
            std::env::remove_var("ROSCOM_TICK_HZ");
            std::env::remove_var("ROSCOM_DISPATCH");
        }
    }
}
