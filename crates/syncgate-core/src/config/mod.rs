use std::path::PathBuf;
use std::time::Duration;

/// Resolved settings for one gate run.
///
/// The defaults reproduce the fixed CI invocation: release-build node
/// binary, the two checked-in node configuration files, the client's
/// monitoring endpoint on port 8082, a 15-second warmup, and a state marker
/// threshold of 10. Only the client's endpoint is ever sampled; the server
/// node's metrics are not consulted.
#[derive(Debug, Clone)]
pub struct SyncGateConfig {
    /// Path to the node binary launched for both roles.
    pub node_binary: PathBuf,
    /// Configuration file passed to the server node.
    pub server_config: PathBuf,
    /// Configuration file passed to the client node.
    pub client_config: PathBuf,
    /// Monitoring endpoint of the client node.
    pub metrics_url: String,
    /// Pause between launching the nodes and sampling the metrics. A fixed
    /// interval, not a readiness signal.
    pub warmup: Duration,
    /// Minimum state marker value for the gate to pass.
    pub marker_threshold: i64,
}

impl SyncGateConfig {
    /// Node binary used when nothing overrides it, relative to the
    /// repository root.
    pub const DEFAULT_NODE_BINARY: &str = "target/release/papyrus_node";
    /// Checked-in configuration file for the server node.
    pub const DEFAULT_SERVER_CONFIG: &str = "configs/server_node_config.json";
    /// Checked-in configuration file for the client node.
    pub const DEFAULT_CLIENT_CONFIG: &str = "configs/client_node_config.json";
    /// Monitoring endpoint the client node exposes.
    pub const DEFAULT_METRICS_URL: &str = "http://localhost:8082/monitoring/metrics";
    /// Warmup before the single metrics sample.
    pub const DEFAULT_WARMUP: Duration = Duration::from_secs(15);
    /// Minimum state marker for a passing run.
    pub const DEFAULT_MARKER_THRESHOLD: i64 = 10;
}

impl Default for SyncGateConfig {
    fn default() -> Self {
        Self {
            node_binary: PathBuf::from(Self::DEFAULT_NODE_BINARY),
            server_config: PathBuf::from(Self::DEFAULT_SERVER_CONFIG),
            client_config: PathBuf::from(Self::DEFAULT_CLIENT_CONFIG),
            metrics_url: Self::DEFAULT_METRICS_URL.to_owned(),
            warmup: Self::DEFAULT_WARMUP,
            marker_threshold: Self::DEFAULT_MARKER_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_ci_invocation() {
        let cfg = SyncGateConfig::default();
        assert_eq!(cfg.node_binary, PathBuf::from("target/release/papyrus_node"));
        assert_eq!(cfg.server_config, PathBuf::from("configs/server_node_config.json"));
        assert_eq!(cfg.client_config, PathBuf::from("configs/client_node_config.json"));
        assert_eq!(cfg.metrics_url, "http://localhost:8082/monitoring/metrics");
        assert_eq!(cfg.warmup, Duration::from_secs(15));
        assert_eq!(cfg.marker_threshold, 10);
    }
}
