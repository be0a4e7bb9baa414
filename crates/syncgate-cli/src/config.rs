//! Configuration resolution for the syncgate binary.
//!
//! Settings come from an optional TOML file (`syncgate.toml` in the working
//! directory, or wherever `--config` points) and a resolution chain:
//! CLI flag > env var > config file > built-in default. The defaults
//! reproduce the fixed CI invocation, so a bare `syncgate <URL>` needs no
//! file at all.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use syncgate_core::config::SyncGateConfig;

/// Config file consulted when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "syncgate.toml";

/// Env var overriding the node binary path (useful in CI, where the binary
/// often lands outside the checkout).
pub const NODE_BINARY_ENV: &str = "SYNCGATE_NODE_BINARY";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub node: NodeSection,
    #[serde(default)]
    pub gate: GateSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct NodeSection {
    /// Path to the node binary.
    pub binary: Option<PathBuf>,
    /// Configuration file passed to the server node.
    pub server_config: Option<PathBuf>,
    /// Configuration file passed to the client node.
    pub client_config: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GateSection {
    /// Monitoring endpoint of the client node.
    pub metrics_url: Option<String>,
    /// Seconds to wait before sampling the metrics.
    pub warmup_secs: Option<u64>,
    /// Minimum state marker for the gate to pass.
    pub marker_threshold: Option<i64>,
}

// -----------------------------------------------------------------------
// Read
// -----------------------------------------------------------------------

/// Load and parse a config file. Errors if it cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(config)
}

// -----------------------------------------------------------------------
// Resolution
// -----------------------------------------------------------------------

/// Command-line values fed into the resolution chain.
#[derive(Debug, Default)]
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub node_binary: Option<PathBuf>,
    pub server_config: Option<PathBuf>,
    pub client_config: Option<PathBuf>,
    pub metrics_url: Option<String>,
    pub warmup_secs: Option<u64>,
    pub threshold: Option<i64>,
}

/// Resolve the gate settings.
///
/// A config file named by `--config` must exist; the default
/// `syncgate.toml` is consulted only when present. Per field the chain is
/// CLI flag > env var (node binary only) > config file > default.
pub fn resolve(overrides: &Overrides) -> Result<SyncGateConfig> {
    let file = match &overrides.config_file {
        Some(path) => load_config(path)?,
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                load_config(default)?
            } else {
                ConfigFile::default()
            }
        }
    };

    let defaults = SyncGateConfig::default();

    // Node binary is the one field with an env override.
    let node_binary = if let Some(path) = &overrides.node_binary {
        path.clone()
    } else if let Ok(env_path) = std::env::var(NODE_BINARY_ENV) {
        PathBuf::from(env_path)
    } else if let Some(path) = file.node.binary {
        path
    } else {
        defaults.node_binary
    };

    Ok(SyncGateConfig {
        node_binary,
        server_config: overrides
            .server_config
            .clone()
            .or(file.node.server_config)
            .unwrap_or(defaults.server_config),
        client_config: overrides
            .client_config
            .clone()
            .or(file.node.client_config)
            .unwrap_or(defaults.client_config),
        metrics_url: overrides
            .metrics_url
            .clone()
            .or(file.gate.metrics_url)
            .unwrap_or(defaults.metrics_url),
        warmup: overrides
            .warmup_secs
            .or(file.gate.warmup_secs)
            .map(Duration::from_secs)
            .unwrap_or(defaults.warmup),
        marker_threshold: overrides
            .threshold
            .or(file.gate.marker_threshold)
            .unwrap_or(defaults.marker_threshold),
    })
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        crate::test_util::lock_env()
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("syncgate.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn resolve_without_file_or_flags_yields_defaults() {
        let _lock = lock_env();
        unsafe { std::env::remove_var(NODE_BINARY_ENV) };

        let config = resolve(&Overrides::default()).unwrap();

        assert_eq!(config.node_binary, PathBuf::from("target/release/papyrus_node"));
        assert_eq!(config.metrics_url, "http://localhost:8082/monitoring/metrics");
        assert_eq!(config.warmup, Duration::from_secs(15));
        assert_eq!(config.marker_threshold, 10);
    }

    #[test]
    fn resolve_reads_values_from_config_file() {
        let _lock = lock_env();
        unsafe { std::env::remove_var(NODE_BINARY_ENV) };

        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            r#"
[node]
binary = "out/papyrus_node"
server_config = "cfg/server.json"

[gate]
warmup_secs = 3
marker_threshold = 25
"#,
        );

        let overrides = Overrides {
            config_file: Some(path),
            ..Overrides::default()
        };
        let config = resolve(&overrides).unwrap();

        assert_eq!(config.node_binary, PathBuf::from("out/papyrus_node"));
        assert_eq!(config.server_config, PathBuf::from("cfg/server.json"));
        // Unset keys fall through to the defaults.
        assert_eq!(config.client_config, PathBuf::from("configs/client_node_config.json"));
        assert_eq!(config.warmup, Duration::from_secs(3));
        assert_eq!(config.marker_threshold, 25);
    }

    #[test]
    fn resolve_flag_overrides_env_and_file() {
        let _lock = lock_env();

        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_config(&tmp, "[node]\nbinary = \"from_file\"\n");

        unsafe { std::env::set_var(NODE_BINARY_ENV, "from_env") };

        let overrides = Overrides {
            config_file: Some(path),
            node_binary: Some(PathBuf::from("from_flag")),
            ..Overrides::default()
        };
        let config = resolve(&overrides).unwrap();

        unsafe { std::env::remove_var(NODE_BINARY_ENV) };

        assert_eq!(config.node_binary, PathBuf::from("from_flag"));
    }

    #[test]
    fn resolve_env_overrides_file() {
        let _lock = lock_env();

        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_config(&tmp, "[node]\nbinary = \"from_file\"\n");

        unsafe { std::env::set_var(NODE_BINARY_ENV, "from_env") };

        let overrides = Overrides {
            config_file: Some(path),
            ..Overrides::default()
        };
        let config = resolve(&overrides);

        unsafe { std::env::remove_var(NODE_BINARY_ENV) };

        assert_eq!(config.unwrap().node_binary, PathBuf::from("from_env"));
    }

    #[test]
    fn explicit_config_flag_must_point_at_a_readable_file() {
        let _lock = lock_env();
        unsafe { std::env::remove_var(NODE_BINARY_ENV) };

        let overrides = Overrides {
            config_file: Some(PathBuf::from("/nonexistent/syncgate.toml")),
            ..Overrides::default()
        };
        let err = resolve(&overrides).unwrap_err();
        assert!(
            format!("{err:#}").contains("failed to read config file"),
            "unexpected error: {err:#}"
        );
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        let _lock = lock_env();
        unsafe { std::env::remove_var(NODE_BINARY_ENV) };

        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_config(&tmp, "[node\nbinary = ");

        let overrides = Overrides {
            config_file: Some(path),
            ..Overrides::default()
        };
        let err = resolve(&overrides).unwrap_err();
        assert!(
            format!("{err:#}").contains("failed to parse config file"),
            "unexpected error: {err:#}"
        );
    }
}
