use crate::error::AppError;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Package managers the framework knows how to drive, in probe priority
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PkgManager {
    Apt,
    Yum,
    Dnf,
    Pacman,
}

impl PkgManager {
    pub const ALL: [PkgManager; 4] = [
        PkgManager::Apt,
        PkgManager::Yum,
        PkgManager::Dnf,
        PkgManager::Pacman,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PkgManager::Apt => "apt",
            PkgManager::Yum => "yum",
            PkgManager::Dnf => "dnf",
            PkgManager::Pacman => "pacman",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|pm| pm.name() == name)
    }

    /// Probes for a known package-manager binary, first hit wins. An
    /// explicit override short-circuits the probe.
    pub fn detect(override_name: Option<&str>) -> Option<Self> {
        if let Some(name) = override_name {
            match Self::from_name(name) {
                Some(pm) => return Some(pm),
                None => warn!(requested = %name, "Unknown package manager override, probing instead"),
            }
        }
        Self::ALL
            .iter()
            .copied()
            .find(|pm| which::which(pm.name()).is_ok())
    }
}

impl std::fmt::Display for PkgManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs a package command sequence via the shell. Execution is sequential
/// and the first failure aborts the rest.
pub async fn run_commands(commands: &[String]) -> Result<(), AppError> {
    for cmd in commands {
        info!(command = %cmd, "Running package command");
        let output = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .stdin(Stdio::inherit())
            .output()
            .await
            .map_err(|e| AppError::PkgCommandFailed(format!("'{}': {}", cmd, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            println!("{}", stdout.trim_end());
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(command = %cmd, status = ?output.status.code(), "Package command failed");
            return Err(AppError::PkgCommandFailed(format!(
                "'{}' exited with {:?}: {}",
                cmd,
                output.status.code(),
                stderr.trim()
            )));
        }
    }
    Ok(())
}
