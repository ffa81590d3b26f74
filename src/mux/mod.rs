use crate::error::AppError;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Result of asking the backend for its live session list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MuxListing {
    /// Descriptor lines, one per session, in `id: rest-of-line` form.
    Sessions(Vec<String>),
    /// No server is running at all. Zero sessions, not a fault.
    NoServer,
}

/// Thin adapter over the external terminal multiplexer's session
/// primitives. The session core only talks to this trait, so tests can
/// script the external world.
#[async_trait]
pub trait MuxBackend: Send + Sync {
    async fn has_session(&self, name: &str) -> bool;

    /// Creates a detached session running `invocation`, then attaches the
    /// caller interactively. Blocks until the user detaches or the session
    /// exits. Returns false if the name is already taken or the server
    /// cannot be driven.
    async fn create(&self, name: &str, invocation: &str, window: &str) -> bool;

    /// Attaches to an existing session; blocks until detach. False when the
    /// session does not exist.
    async fn attach(&self, name: &str) -> bool;

    async fn detach_current(&self) -> bool;

    /// Kills a named session. "Already gone" counts as success.
    async fn kill(&self, name: &str) -> bool;

    async fn list(&self) -> Result<MuxListing, AppError>;
}

/// Extracts the leading session id from a `list-sessions` descriptor line.
/// Lines whose name is not a plain integer are ignored (foreign sessions).
pub fn parse_session_id(line: &str) -> Option<u32> {
    let (head, _) = line.split_once(':')?;
    head.trim().parse::<u32>().ok()
}

/// tmux-backed implementation.
#[derive(Debug, Default)]
pub struct TmuxBackend;

impl TmuxBackend {
    pub fn new() -> Self {
        Self
    }

    /// Startup gate: a missing tmux binary is fatal to the whole program.
    pub fn ensure_installed() -> Result<(), AppError> {
        which::which("tmux").map(|_| ()).map_err(|_| {
            AppError::MuxError(
                "tmux is not installed. Install it before continuing \
                 (Debian/Ubuntu: sudo apt install tmux, Fedora: sudo dnf install tmux, \
                 Arch: sudo pacman -S tmux)"
                    .to_string(),
            )
        })
    }

    async fn tmux_output(args: &[&str]) -> Result<std::process::Output, AppError> {
        Command::new("tmux")
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| AppError::MuxError(format!("failed to run tmux: {}", e)))
    }

    /// Runs tmux with the terminal inherited, for attach-style commands.
    async fn tmux_interactive(args: &[&str]) -> bool {
        match Command::new("tmux").args(args).status().await {
            Ok(status) => status.success(),
            Err(e) => {
                warn!(error = %e, "Failed to run interactive tmux command");
                false
            }
        }
    }
}

#[async_trait]
impl MuxBackend for TmuxBackend {
    async fn has_session(&self, name: &str) -> bool {
        match Self::tmux_output(&["has-session", "-t", name]).await {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }

    async fn create(&self, name: &str, invocation: &str, window: &str) -> bool {
        if self.has_session(name).await {
            warn!(session = %name, "Refusing to create: session name already exists");
            return false;
        }

        let created = Self::tmux_output(&[
            "new-session",
            "-d",
            "-s",
            name,
            "-n",
            window,
            "-e",
            "TERM=xterm-256color",
            invocation,
        ])
        .await
        .map(|o| o.status.success())
        .unwrap_or(false);

        if !created {
            warn!(session = %name, "tmux new-session failed");
            return false;
        }

        // Interactive niceties; failures here are not fatal to the session.
        let _ = Self::tmux_output(&["set-option", "-t", name, "mouse", "on"]).await;
        let _ = Self::tmux_output(&["set-window-option", "-t", name, "mode-keys", "vi"]).await;

        debug!(session = %name, "Session created, attaching");
        Self::tmux_interactive(&["attach-session", "-t", name]).await
    }

    async fn attach(&self, name: &str) -> bool {
        if !self.has_session(name).await {
            warn!(session = %name, "Cannot attach: session does not exist");
            return false;
        }
        Self::tmux_interactive(&["attach-session", "-t", name]).await
    }

    async fn detach_current(&self) -> bool {
        Self::tmux_output(&["detach-client"])
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    async fn kill(&self, name: &str) -> bool {
        match Self::tmux_output(&["kill-session", "-t", name]).await {
            Ok(output) if output.status.success() => {
                debug!(session = %name, "tmux session killed");
                true
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                if stderr.contains("session not found") || stderr.contains("no server running") {
                    warn!(session = %name, "tmux session already gone");
                    true
                } else {
                    warn!(session = %name, stderr = %stderr.trim(), "Failed to kill tmux session");
                    false
                }
            }
            Err(e) => {
                warn!(session = %name, error = %e, "Failed to kill tmux session");
                false
            }
        }
    }

    async fn list(&self) -> Result<MuxListing, AppError> {
        let output = Self::tmux_output(&["list-sessions"]).await?;
        if output.status.success() {
            let lines = String::from_utf8_lossy(&output.stdout)
                .lines()
                .map(|l| l.to_string())
                .collect();
            return Ok(MuxListing::Sessions(lines));
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("no server running") || stderr.contains("error connecting") {
            return Ok(MuxListing::NoServer);
        }
        Err(AppError::MuxError(format!(
            "list-sessions failed: {}",
            stderr.trim()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_leading_session_id() {
        assert_eq!(
            parse_session_id("3: 1 windows (created Fri May 10 10:00:00 2024)"),
            Some(3)
        );
        assert_eq!(parse_session_id("12: attached"), Some(12));
    }

    #[test]
    fn ignores_non_numeric_session_names() {
        assert_eq!(parse_session_id("work: 2 windows"), None);
        assert_eq!(parse_session_id(""), None);
        assert_eq!(parse_session_id("no colon here"), None);
    }
}
