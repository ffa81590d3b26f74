use crate::install::pkg::PkgManager;
use crate::registry::{HelpInfo, LaunchMode, ToolModule, NO_COMMAND};
use std::path::{Path, PathBuf};

const SCRIPT_URL: &str = "https://github.com/sPROFFEs/AnonIP/releases/download/English/AnonIP.sh";

/// Script-based anonymization tool: rotates IP/MAC and routes traffic
/// through TOR. Detection is by the installed script plus its runtime
/// dependencies.
pub struct AnonIpModule {
    script_path: PathBuf,
}

impl AnonIpModule {
    pub fn new(framework_root: &Path) -> Self {
        Self {
            script_path: framework_root.join("scripts").join("anonip.sh"),
        }
    }

    fn scripts_dir(&self) -> String {
        self.script_path
            .parent()
            .unwrap_or(Path::new("."))
            .display()
            .to_string()
    }

    fn fetch_commands(&self, install_deps: &str) -> Vec<String> {
        vec![
            install_deps.to_string(),
            format!("mkdir -p '{}'", self.scripts_dir()),
            format!("curl -fsSL -o '{}' {}", self.script_path.display(), SCRIPT_URL),
            format!("chmod +x '{}'", self.script_path.display()),
        ]
    }
}

impl ToolModule for AnonIpModule {
    fn name(&self) -> &str {
        "anonip"
    }

    fn category(&self) -> &str {
        "Anonymity"
    }

    fn command(&self) -> &str {
        NO_COMMAND
    }

    fn description(&self) -> &str {
        "Anonymizes the connection by rotating IP and MAC and routing through TOR"
    }

    fn dependencies(&self) -> Vec<String> {
        vec![
            "tor".to_string(),
            "curl".to_string(),
            "iptables".to_string(),
        ]
    }

    fn script_path(&self) -> Option<PathBuf> {
        Some(self.script_path.clone())
    }

    fn help(&self) -> HelpInfo {
        HelpInfo {
            title: "AnonIP - Connection Anonymizer".into(),
            usage: "use anonip".into(),
            desc: "Rotates IP and MAC addresses and routes traffic through the TOR network."
                .into(),
            modes: vec![
                (
                    "Guided".into(),
                    "Interactive script menu, step by step".into(),
                ),
                (
                    "Direct".into(),
                    "Runs the script with its defaults".into(),
                ),
            ],
            options: vec![],
            examples: vec!["use anonip".into()],
            notes: vec!["Requires root privileges to reconfigure the network stack".into()],
        }
    }

    fn install_commands(&self, manager: PkgManager) -> Option<Vec<String>> {
        let deps = match manager {
            PkgManager::Apt => "sudo apt-get update && sudo apt-get install -y tor curl iptables",
            PkgManager::Yum => "sudo yum install -y tor curl iptables",
            PkgManager::Dnf => "sudo dnf install -y tor curl iptables",
            PkgManager::Pacman => "sudo pacman -Sy --noconfirm tor curl iptables",
        };
        Some(self.fetch_commands(deps))
    }

    fn update_commands(&self, manager: PkgManager) -> Option<Vec<String>> {
        // Re-fetching the script also refreshes the dependency set.
        self.install_commands(manager)
    }

    fn remove_commands(&self, _manager: PkgManager) -> Option<Vec<String>> {
        Some(vec![format!("rm -f '{}'", self.script_path.display())])
    }

    fn launch_command(&self, _mode: LaunchMode, _framework_root: &Path) -> Option<String> {
        // The script carries its own interactive menu; both modes run it.
        Some(format!("sudo '{}'", self.script_path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_lives_under_the_framework_root() {
        let module = AnonIpModule::new(Path::new("/opt/secframe"));
        assert_eq!(
            module.script_path().unwrap(),
            PathBuf::from("/opt/secframe/scripts/anonip.sh")
        );
    }

    #[test]
    fn install_fetches_and_marks_executable() {
        let module = AnonIpModule::new(Path::new("/opt/secframe"));
        let cmds = module.install_commands(PkgManager::Apt).unwrap();
        assert!(cmds.iter().any(|c| c.contains("curl -fsSL")));
        assert!(cmds.iter().any(|c| c.starts_with("chmod +x")));
    }
}
