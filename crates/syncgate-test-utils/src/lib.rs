//! Shared test utilities for syncgate integration tests.
//!
//! Provides a fake node binary (a shell script in a temp dir) and a stub
//! monitoring endpoint, so tests can drive the real launcher and runner
//! without a papyrus binary or a live peer-to-peer network.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A fake node binary: an executable shell script in its own temp dir.
///
/// The same script is launched once per node role, so it keys its
/// breadcrumb files by the basename of the `--config_file` argument: a
/// launch with `.../server.json` writes `args_server.txt`,
/// `leader_server.pid`, and `child_server.pid`. The child pid belongs to a
/// background process the script forks, so group termination has a
/// descendant to catch. The script stays alive until the child exits or
/// the group is signalled.
pub struct FakeNode {
    dir: tempfile::TempDir,
    script: PathBuf,
}

impl FakeNode {
    /// Write the fake node script. `hold_secs` is how long it lingers
    /// before exiting on its own.
    pub fn new(hold_secs: u32) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir for fake node");
        let script = dir.path().join("fake_node.sh");

        // Argument order follows the node invocation template:
        // $1 --base_layer.node_url  $2 <url>  $3 --config_file  $4 <path>
        let body = format!(
            r#"#!/bin/sh
dir="$(dirname "$0")"
role="$(basename "$4" .json)"
echo "$@" > "$dir/args_$role.txt"
sleep {hold_secs} &
echo $! > "$dir/child_$role.pid"
echo $$ > "$dir/leader_$role.pid"
wait
"#
        );
        fs::write(&script, body).expect("failed to write fake node script");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&script, fs::Permissions::from_mode(0o755))
                .expect("failed to make fake node script executable");
        }

        Self { dir, script }
    }

    /// Path to the script; hand this to the launcher as the node binary.
    pub fn binary(&self) -> &Path {
        &self.script
    }

    /// Write an empty node configuration file named `<role>.json` next to
    /// the script and return its path.
    pub fn config_for(&self, role: &str) -> PathBuf {
        let path = self.dir.path().join(format!("{role}.json"));
        fs::write(&path, "{}\n").expect("failed to write fake node config");
        path
    }

    /// The argv line recorded by the launch for `role`, if it ran.
    pub fn recorded_args(&self, role: &str) -> Option<String> {
        let raw = fs::read_to_string(self.dir.path().join(format!("args_{role}.txt"))).ok()?;
        Some(raw.trim().to_owned())
    }

    /// Pid of the background child forked by the launch for `role`.
    pub fn child_pid(&self, role: &str) -> Option<i32> {
        self.read_pid(&format!("child_{role}.pid"))
    }

    /// Pid of the script process for `role`.
    pub fn leader_pid(&self, role: &str) -> Option<i32> {
        self.read_pid(&format!("leader_{role}.pid"))
    }

    fn read_pid(&self, name: &str) -> Option<i32> {
        let raw = fs::read_to_string(self.dir.path().join(name)).ok()?;
        raw.trim().parse().ok()
    }
}

/// Whether `pid` refers to a process the kernel still knows about.
///
/// Zombies count as alive; fully reaped processes do not.
#[cfg(unix)]
pub fn pid_alive(pid: i32) -> bool {
    // SAFETY: signal 0 performs permission and existence checks only; no
    // signal is delivered.
    unsafe { libc::kill(pid, 0) == 0 }
}

/// Poll `probe` until it returns `Some`, up to `timeout`.
pub async fn wait_for<T>(timeout: Duration, mut probe: impl FnMut() -> Option<T>) -> Option<T> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(value) = probe() {
            return Some(value);
        }
        if tokio::time::Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

/// A stub monitoring endpoint serving a fixed metrics body.
///
/// Binds an ephemeral port on localhost; the serving task is aborted when
/// the stub is dropped.
pub struct MetricsStub {
    addr: SocketAddr,
    server: JoinHandle<()>,
}

impl MetricsStub {
    /// Serve `body` at `/monitoring/metrics`.
    pub async fn start(body: impl Into<String>) -> Self {
        let body = body.into();
        let app = Router::new().route("/monitoring/metrics", get(move || async move { body }));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind metrics stub");
        let addr = listener.local_addr().expect("metrics stub has no local addr");

        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, server }
    }

    /// Full URL of the stub's metrics endpoint.
    pub fn url(&self) -> String {
        format!("http://{}/monitoring/metrics", self.addr)
    }
}

impl Drop for MetricsStub {
    fn drop(&mut self) {
        self.server.abort();
    }
}
