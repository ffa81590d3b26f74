use anyhow::{Context, Result};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory of the framework; launched tools cd here first.
    pub framework_root: PathBuf,
    /// Directory for per-session log files.
    pub logs_dir: PathBuf,
    pub log_level: String,
    /// Shell dropped into after a tool exits inside its session.
    pub shell: String,
    /// Optional override for the package-manager probe (e.g. "apt").
    pub pkg_manager_override: Option<String>,
}

fn expand_tilde(path_str: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path_str).as_ref())
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let framework_root = match std::env::var("SECFRAME_ROOT") {
            Ok(s) if !s.is_empty() => expand_tilde(&s)
                .canonicalize()
                .context(format!("Failed to canonicalize SECFRAME_ROOT: {}", s))?,
            _ => std::env::current_dir().context("Failed to determine current directory")?,
        };
        if !framework_root.is_dir() {
            anyhow::bail!("SECFRAME_ROOT is not a valid directory: {:?}", framework_root);
        }

        let logs_dir = std::env::var("SECFRAME_LOG_DIR")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|s| expand_tilde(&s))
            .unwrap_or_else(|| framework_root.join("logs"));

        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());

        let shell = std::env::var("SECFRAME_SHELL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "bash".to_string());

        let pkg_manager_override = std::env::var("SECFRAME_PKG_MANAGER")
            .ok()
            .filter(|s| !s.is_empty());

        Ok(Config {
            framework_root,
            logs_dir,
            log_level,
            shell,
            pkg_manager_override,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilde_expansion_keeps_plain_paths() {
        let p = expand_tilde("/tmp/secframe-logs");
        assert_eq!(p, PathBuf::from("/tmp/secframe-logs"));
    }
}
