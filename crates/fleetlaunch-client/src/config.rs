//! Client configuration – reads/writes `~/.fleetlaunch/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::request::EmptyValuePolicy;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config at {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format {other:?}")),
        }
    }
}

/// Persisted client configuration stored in `~/.fleetlaunch/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// WebSocket URL of the launch service.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Timeout shared by every call, in milliseconds.  Covers the whole
    /// stream for streaming calls.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Whether explicitly empty standalone-start fields are transmitted.
    #[serde(default)]
    pub empty_values: EmptyValuePolicy,
}

fn default_endpoint() -> String {
    "ws://localhost:12321".to_string()
}
fn default_timeout_ms() -> u64 {
    15_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
            log_format: LogFormat::default(),
            empty_values: EmptyValuePolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The configuration file if present, the defaults otherwise, with
    /// environment overrides applied on top.
    pub fn resolve() -> Result<Self, ConfigError> {
        Self::resolve_from(&config_path(), |name| std::env::var(name).ok())
    }

    /// [`resolve`](Self::resolve) with an explicit file and variable lookup.
    pub fn resolve_from(
        path: &Path,
        vars: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut cfg = load_from(path)?.unwrap_or_default();
        apply_overrides(&mut cfg, vars);
        Ok(cfg)
    }
}

/// Return the path to `~/.fleetlaunch/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".fleetlaunch").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<ClientConfig>, ConfigError> {
    load_from(&config_path())
}

/// Load the config from a specific path, without environment overrides.
pub fn load_from(path: &Path) -> Result<Option<ClientConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(cfg))
}

/// Apply `FLEETLAUNCH_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `FLEETLAUNCH_ENDPOINT` | `endpoint` |
/// | `FLEETLAUNCH_TIMEOUT_MS` | `timeout_ms` |
/// | `FLEETLAUNCH_LOG_FORMAT` | `log_format` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut ClientConfig) {
    apply_overrides(cfg, |name| std::env::var(name).ok());
}

/// Apply `FLEETLAUNCH_*` overrides looked up through `vars`.
pub fn apply_overrides(cfg: &mut ClientConfig, vars: impl Fn(&str) -> Option<String>) {
    if let Some(v) = vars("FLEETLAUNCH_ENDPOINT") {
        cfg.endpoint = v;
    }
    if let Some(v) = vars("FLEETLAUNCH_TIMEOUT_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        cfg.timeout_ms = ms;
    }
    if let Some(v) = vars("FLEETLAUNCH_LOG_FORMAT")
        && let Ok(format) = v.parse::<LogFormat>()
    {
        cfg.log_format = format;
    }
}

/// Save the config to disk, creating `~/.fleetlaunch/` if necessary.
pub fn save(cfg: &ClientConfig) -> Result<(), ConfigError> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path, owner-only on Unix.
pub fn save_to(cfg: &ClientConfig, path: &Path) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(write_err)?;
        }
    }
    let raw = toml::to_string_pretty(cfg)?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(write_err)?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.endpoint, "ws://localhost:12321");
        assert_eq!(cfg.timeout(), Duration::from_secs(15));
        assert_eq!(cfg.log_format, LogFormat::Compact);
        assert_eq!(cfg.empty_values, EmptyValuePolicy::OmitEmpty);
    }

    #[test]
    fn roundtrip_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = ClientConfig {
            endpoint: "ws://robot-1:12321".into(),
            timeout_ms: 2_500,
            log_format: LogFormat::Json,
            empty_values: EmptyValuePolicy::Transmit,
        };
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timeout_ms = 500\n").expect("write");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.timeout_ms, 500);
        assert_eq!(loaded.endpoint, "ws://localhost:12321");
    }

    #[test]
    fn unparsable_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timeout_ms = \"soon\"\n").expect("write");

        let err = load_from(&path).expect_err("must fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&ClientConfig::default(), &path).expect("save");

        let file_mode = std::fs::metadata(&path).expect("file metadata").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600, "config file must have 0o600 permissions");
        let dir_mode = std::fs::metadata(path.parent().unwrap())
            .expect("dir metadata")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700, "config directory must have 0o700 permissions");
    }

    #[test]
    fn config_path_points_to_fleetlaunch_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".fleetlaunch"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        }
    }

    #[test]
    fn apply_env_overrides_changes_endpoint() {
        // SAFETY: the only test that touches the process environment.
        unsafe { std::env::set_var("FLEETLAUNCH_ENDPOINT", "ws://robot-host:12321") };
        let mut cfg = ClientConfig::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.endpoint, "ws://robot-host:12321");
        unsafe { std::env::remove_var("FLEETLAUNCH_ENDPOINT") };
    }

    #[test]
    fn overrides_set_timeout_and_ignore_garbage() {
        let mut cfg = ClientConfig::default();
        apply_overrides(&mut cfg, vars(&[("FLEETLAUNCH_TIMEOUT_MS", "750")]));
        assert_eq!(cfg.timeout_ms, 750);

        let mut cfg = ClientConfig::default();
        apply_overrides(&mut cfg, vars(&[("FLEETLAUNCH_TIMEOUT_MS", "fast")]));
        assert_eq!(cfg.timeout_ms, 15_000);
    }

    #[test]
    fn overrides_change_log_format() {
        let mut cfg = ClientConfig::default();
        apply_overrides(&mut cfg, vars(&[("FLEETLAUNCH_LOG_FORMAT", "JSON")]));
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn resolve_layers_env_over_file_over_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "endpoint = \"ws://from-file:1\"\ntimeout_ms = 900\nempty_values = \"transmit\"\n",
        )
        .expect("write");

        let cfg = ClientConfig::resolve_from(
            &path,
            vars(&[("FLEETLAUNCH_TIMEOUT_MS", "1200")]),
        )
        .expect("resolve");
        assert_eq!(cfg.endpoint, "ws://from-file:1");
        assert_eq!(cfg.timeout_ms, 1200, "env wins over file");
        assert_eq!(cfg.empty_values, EmptyValuePolicy::Transmit);
        assert_eq!(cfg.log_format, LogFormat::Compact, "default when neither sets it");
    }

    #[test]
    fn resolve_without_file_uses_defaults_plus_env() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("missing.toml");

        let cfg = ClientConfig::resolve_from(&path, vars(&[("FLEETLAUNCH_LOG_FORMAT", "json")]))
            .expect("resolve");
        assert_eq!(cfg.endpoint, "ws://localhost:12321");
        assert_eq!(cfg.log_format, LogFormat::Json);
    }
}
