//! Node process launching and teardown.
//!
//! Each node is spawned as the leader of a fresh process group, so the node
//! and any children it forks can be signalled together. Teardown sends
//! SIGTERM to the whole group; errors from signalling (group already gone)
//! are ignored.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Command construction
// ---------------------------------------------------------------------------

/// A structured node invocation: program plus argument vector.
///
/// Built from the fixed template
/// `<binary> --base_layer.node_url <URL> --config_file <path>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCommand {
    /// Role label for logs and errors ("server" / "client").
    label: String,
    program: PathBuf,
    args: Vec<String>,
}

impl NodeCommand {
    /// Build the invocation for one node role.
    pub fn new(
        label: impl Into<String>,
        binary: &Path,
        base_layer_node_url: &str,
        config_file: &Path,
    ) -> Self {
        Self {
            label: label.into(),
            program: binary.to_path_buf(),
            args: vec![
                "--base_layer.node_url".to_owned(),
                base_layer_node_url.to_owned(),
                "--config_file".to_owned(),
                config_file.display().to_string(),
            ],
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl std::fmt::Display for NodeCommand {
    /// Single-line rendering for logs and launch-failure diagnostics.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Process handles
// ---------------------------------------------------------------------------

/// One launched node process group.
///
/// The handle owns the child exclusively for its whole lifetime. Dropping an
/// unterminated handle tears the group down, so an error between launch and
/// the explicit teardown cannot leak a running node.
#[derive(Debug)]
pub struct NodeHandle {
    label: String,
    pid: u32,
    /// Group id; equals `pid` because the child leads a fresh group.
    pgid: i32,
    /// Rendered launch command, kept for diagnostics.
    command: String,
    child: Child,
    /// Set once the group has been signalled; teardown runs at most once.
    terminated: bool,
}

impl NodeHandle {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn pgid(&self) -> i32 {
        self.pgid
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Check whether the group leader has exited, without blocking.
    ///
    /// Reaps the leader if it has. Members of the group other than the
    /// leader are not visible through the handle.
    pub fn try_wait(&mut self) -> std::io::Result<Option<std::process::ExitStatus>> {
        self.child.try_wait()
    }

    /// Send SIGTERM to the whole process group.
    ///
    /// Runs at most once per handle; later calls, including the one from
    /// `Drop`, are no-ops. Signalling errors are ignored: a group that is
    /// already gone is not an error for the gate.
    pub fn terminate_group(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;

        #[cfg(unix)]
        {
            // SAFETY: pgid is the group id of a child this process spawned.
            let _ = unsafe { libc::killpg(self.pgid, libc::SIGTERM) };
            debug!(
                label = %self.label,
                pid = self.pid,
                pgid = self.pgid,
                "sent SIGTERM to node process group"
            );
        }
        #[cfg(not(unix))]
        {
            // No process groups: best effort on the direct child only.
            let _ = self.child.start_kill();
        }
    }
}

impl Drop for NodeHandle {
    fn drop(&mut self) {
        self.terminate_group();
    }
}

// ---------------------------------------------------------------------------
// Launcher capability
// ---------------------------------------------------------------------------

/// Capability interface for starting node process groups and tearing them
/// down.
///
/// The production implementation is [`ProcessGroupLauncher`]. The trait is
/// object-safe so callers can hold `&dyn Launcher`.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Start the command as the leader of a new process group.
    ///
    /// A failure here is fatal for the run: the returned error carries the
    /// rendered command and the underlying OS error, and callers do not
    /// retry.
    async fn launch(&self, command: &NodeCommand) -> Result<NodeHandle>;

    /// Send SIGTERM to the handle's whole process group.
    ///
    /// Idempotent per handle; signalling errors are ignored.
    fn terminate_all(&self, handle: &mut NodeHandle);
}

// Compile-time assertion: Launcher must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn Launcher) {}
};

/// Launcher that spawns each node as the leader of a fresh process group.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessGroupLauncher;

#[async_trait]
impl Launcher for ProcessGroupLauncher {
    async fn launch(&self, command: &NodeCommand) -> Result<NodeHandle> {
        let mut cmd = Command::new(command.program());
        cmd.args(command.args());

        // Fresh group with the child as leader, so SIGTERM can reach the
        // node and everything it forks in one signal.
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd
            .spawn()
            .with_context(|| format!("failed to start command: {command}"))?;

        let pid = child.id().context("spawned node has no pid")?;

        info!(label = %command.label(), pid, "launched node process group");

        Ok(NodeHandle {
            label: command.label().to_owned(),
            pid,
            pgid: pid as i32,
            command: command.to_string(),
            child,
            terminated: false,
        })
    }

    fn terminate_all(&self, handle: &mut NodeHandle) {
        handle.terminate_group();
    }
}
