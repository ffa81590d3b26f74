pub mod pkg;

use crate::registry::discovery::ModuleEntry;
use crate::registry::{ToolModule, NO_COMMAND};
use std::os::unix::fs::PermissionsExt;
use tracing::{debug, warn};

/// Outcome of an installation probe: the verdict plus an optional
/// human-readable diagnostic for the unhappy or ambiguous paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub installed: bool,
    pub diagnostic: Option<String>,
}

impl CheckOutcome {
    fn installed() -> Self {
        Self {
            installed: true,
            diagnostic: None,
        }
    }

    fn not_installed(diagnostic: impl Into<String>) -> Self {
        Self {
            installed: false,
            diagnostic: Some(diagnostic.into()),
        }
    }
}

/// Memoized installation check. The verdict sticks to the entry until it is
/// explicitly invalidated after an install/update/remove operation.
pub fn check(entry: &ModuleEntry) -> bool {
    if let Some(cached) = entry.cached_installed() {
        return cached;
    }
    let outcome = probe(entry.module().as_ref());
    if let Some(diag) = &outcome.diagnostic {
        debug!(module = %entry.module().name(), %diag, "Installation check");
    }
    entry.set_installed(outcome.installed);
    outcome.installed
}

/// Uncached probe. First decisive strategy wins:
/// declared dependencies gate everything, then the primary command, then the
/// script path (with execute-permission repair), then the module's own
/// verifier. A module with no strategy at all is reported, not guessed.
pub fn probe(module: &dyn ToolModule) -> CheckOutcome {
    for dep in module.dependencies() {
        if which::which(&dep).is_err() {
            return CheckOutcome::not_installed(format!("missing dependency: {}", dep));
        }
    }

    let command = module.command();
    if command != NO_COMMAND {
        if which::which(command).is_ok() {
            return CheckOutcome::installed();
        }
        // Command declared but absent: a script path may still decide.
        if module.script_path().is_none() {
            return CheckOutcome::not_installed(format!("'{}' not found on PATH", command));
        }
    }

    if let Some(script) = module.script_path() {
        match script.parent() {
            Some(parent) if parent.as_os_str().is_empty() || parent.exists() => {}
            _ => {
                return CheckOutcome::not_installed(format!(
                    "script directory missing: {}",
                    script.display()
                ))
            }
        }
        if !script.exists() {
            return CheckOutcome::not_installed(format!("script missing: {}", script.display()));
        }
        return match ensure_executable(&script) {
            Ok(()) => CheckOutcome::installed(),
            Err(e) => {
                warn!(script = %script.display(), error = %e, "Failed to repair script permissions");
                CheckOutcome::not_installed(format!(
                    "script is not executable and chmod failed: {}",
                    e
                ))
            }
        };
    }

    if let Some(verdict) = module.verify_install() {
        return if verdict {
            CheckOutcome::installed()
        } else {
            CheckOutcome::not_installed("tool-specific verification failed")
        };
    }

    CheckOutcome::not_installed("no verification strategy available")
}

fn ensure_executable(path: &std::path::Path) -> std::io::Result<()> {
    let metadata = std::fs::metadata(path)?;
    let mut perms = metadata.permissions();
    if perms.mode() & 0o111 != 0 {
        return Ok(());
    }
    perms.set_mode(perms.mode() | 0o755);
    std::fs::set_permissions(path, perms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::pkg::PkgManager;
    use crate::registry::{HelpInfo, LaunchMode};
    use std::path::{Path, PathBuf};

    struct Probe {
        command: String,
        deps: Vec<String>,
        script: Option<PathBuf>,
        verify: Option<bool>,
    }

    impl Probe {
        fn command_based(command: &str) -> Self {
            Self {
                command: command.to_string(),
                deps: vec![],
                script: None,
                verify: None,
            }
        }

        fn script_based(script: PathBuf) -> Self {
            Self {
                command: NO_COMMAND.to_string(),
                deps: vec![],
                script: Some(script),
                verify: None,
            }
        }
    }

    impl ToolModule for Probe {
        fn name(&self) -> &str {
            "probe"
        }
        fn category(&self) -> &str {
            "Testing"
        }
        fn command(&self) -> &str {
            &self.command
        }
        fn description(&self) -> &str {
            "probe module"
        }
        fn dependencies(&self) -> Vec<String> {
            self.deps.clone()
        }
        fn script_path(&self) -> Option<PathBuf> {
            self.script.clone()
        }
        fn help(&self) -> HelpInfo {
            HelpInfo {
                title: "probe".into(),
                usage: "use probe".into(),
                desc: "probe".into(),
                ..Default::default()
            }
        }
        fn install_commands(&self, _m: PkgManager) -> Option<Vec<String>> {
            Some(vec!["true".into()])
        }
        fn update_commands(&self, _m: PkgManager) -> Option<Vec<String>> {
            None
        }
        fn remove_commands(&self, _m: PkgManager) -> Option<Vec<String>> {
            None
        }
        fn launch_command(&self, _mode: LaunchMode, _root: &Path) -> Option<String> {
            Some("probe".into())
        }
        fn verify_install(&self) -> Option<bool> {
            self.verify
        }
    }

    #[test]
    fn command_on_path_is_installed() {
        // `sh` is present on any host these tests run on.
        let outcome = probe(&Probe::command_based("sh"));
        assert!(outcome.installed);
    }

    #[test]
    fn missing_dependency_gates_even_with_present_command() {
        let mut module = Probe::command_based("sh");
        module.deps = vec!["definitely-not-a-real-binary-xyz".to_string()];
        let outcome = probe(&module);
        assert!(!outcome.installed);
        assert!(outcome.diagnostic.unwrap().contains("missing dependency"));
    }

    #[test]
    fn absent_command_without_script_is_not_installed() {
        let outcome = probe(&Probe::command_based("definitely-not-a-real-binary-xyz"));
        assert!(!outcome.installed);
    }

    #[test]
    fn nonexecutable_script_is_repaired() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("tool.sh");
        std::fs::write(&script, "#!/bin/sh\n").unwrap();
        let mut perms = std::fs::metadata(&script).unwrap().permissions();
        perms.set_mode(0o644);
        std::fs::set_permissions(&script, perms).unwrap();

        let outcome = probe(&Probe::script_based(script.clone()));
        assert!(outcome.installed);
        let mode = std::fs::metadata(&script).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0);
    }

    #[test]
    fn missing_script_is_not_installed() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = probe(&Probe::script_based(dir.path().join("gone.sh")));
        assert!(!outcome.installed);
        assert!(outcome.diagnostic.unwrap().contains("script missing"));
    }

    #[test]
    fn missing_script_directory_is_not_installed() {
        let outcome = probe(&Probe::script_based(PathBuf::from(
            "/definitely/not/a/real/dir/tool.sh",
        )));
        assert!(!outcome.installed);
    }

    #[test]
    fn verifier_decides_when_no_other_strategy() {
        let mut module = Probe::command_based(NO_COMMAND);
        module.verify = Some(true);
        assert!(probe(&module).installed);
        module.verify = Some(false);
        assert!(!probe(&module).installed);
    }

    #[test]
    fn no_strategy_is_surfaced_not_swallowed() {
        let module = Probe::command_based(NO_COMMAND);
        let outcome = probe(&module);
        assert!(!outcome.installed);
        assert!(outcome
            .diagnostic
            .unwrap()
            .contains("no verification strategy"));
    }
}
