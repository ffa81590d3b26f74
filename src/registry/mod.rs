pub mod discovery;

use crate::install::pkg::PkgManager;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Sentinel for modules that have no PATH-resolvable primary command
/// (script-based tools).
pub const NO_COMMAND: &str = "";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    Guided,
    Direct,
}

impl LaunchMode {
    pub fn label(&self) -> &'static str {
        match self {
            LaunchMode::Guided => "Guided",
            LaunchMode::Direct => "Direct",
        }
    }
}

/// Structured help payload every module must provide.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HelpInfo {
    pub title: String,
    pub usage: String,
    pub desc: String,
    pub modes: Vec<(String, String)>,
    pub options: Vec<(String, String)>,
    pub examples: Vec<String>,
    pub notes: Vec<String>,
}

/// Plugin contract for one wrapped security tool.
///
/// Every accessor here is part of the required capability set; a module
/// returning incomplete data is rejected at discovery time with a reason,
/// never at runtime.
pub trait ToolModule: Send + Sync {
    /// Unique name (matched case-insensitively).
    fn name(&self) -> &str;

    fn category(&self) -> &str;

    /// Primary command on PATH, or [`NO_COMMAND`] for script-based tools.
    fn command(&self) -> &str;

    fn description(&self) -> &str;

    /// External executables required before the tool is considered installed.
    fn dependencies(&self) -> Vec<String>;

    /// Installed script location for script-based tools.
    fn script_path(&self) -> Option<PathBuf> {
        None
    }

    fn help(&self) -> HelpInfo;

    /// Install command sequence for the given package manager, if supported.
    fn install_commands(&self, manager: PkgManager) -> Option<Vec<String>>;

    fn update_commands(&self, manager: PkgManager) -> Option<Vec<String>>;

    fn remove_commands(&self, manager: PkgManager) -> Option<Vec<String>>;

    /// Entry point executed inside the tool's session for the chosen mode.
    /// `None` means the capability is missing (a discovery-time rejection).
    fn launch_command(&self, mode: LaunchMode, framework_root: &Path) -> Option<String>;

    /// Tool-specific installation check, consulted only when neither the
    /// primary command nor a script path can decide.
    fn verify_install(&self) -> Option<bool> {
        None
    }
}
