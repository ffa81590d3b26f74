use crate::install::pkg::PkgManager;
use crate::registry::{HelpInfo, LaunchMode, ToolModule};
use std::path::Path;

/// Network scanner wrapper. Detection is by the `nmap` binary on PATH.
pub struct NmapModule;

impl ToolModule for NmapModule {
    fn name(&self) -> &str {
        "nmap"
    }

    fn category(&self) -> &str {
        "Reconnaissance"
    }

    fn command(&self) -> &str {
        "nmap"
    }

    fn description(&self) -> &str {
        "Network exploration and port scanner"
    }

    fn dependencies(&self) -> Vec<String> {
        vec![]
    }

    fn help(&self) -> HelpInfo {
        HelpInfo {
            title: "Nmap - Network Scanner".into(),
            usage: "use nmap".into(),
            desc: "Scans hosts and networks for open ports, running services and OS fingerprints."
                .into(),
            modes: vec![
                (
                    "Guided".into(),
                    "Prompts for target and scan options step by step".into(),
                ),
                (
                    "Direct".into(),
                    "Drops into a shell session with nmap available".into(),
                ),
            ],
            options: vec![
                ("-sV".into(), "Service and version detection".into()),
                ("-p <ports>".into(), "Port range to scan".into()),
                ("-A".into(), "Aggressive scan (OS detection, scripts)".into()),
            ],
            examples: vec!["use nmap".into(), "nmap -sV -p 1-1000 192.168.1.1".into()],
            notes: vec!["Scanning networks you do not own may be illegal".into()],
        }
    }

    fn install_commands(&self, manager: PkgManager) -> Option<Vec<String>> {
        let cmd = match manager {
            PkgManager::Apt => "sudo apt-get update && sudo apt-get install -y nmap",
            PkgManager::Yum => "sudo yum install -y nmap",
            PkgManager::Dnf => "sudo dnf install -y nmap",
            PkgManager::Pacman => "sudo pacman -S --noconfirm nmap",
        };
        Some(vec![cmd.to_string()])
    }

    fn update_commands(&self, manager: PkgManager) -> Option<Vec<String>> {
        let cmd = match manager {
            PkgManager::Apt => "sudo apt-get update && sudo apt-get install --only-upgrade -y nmap",
            PkgManager::Yum => "sudo yum update -y nmap",
            PkgManager::Dnf => "sudo dnf upgrade -y nmap",
            PkgManager::Pacman => "sudo pacman -Syu --noconfirm nmap",
        };
        Some(vec![cmd.to_string()])
    }

    fn remove_commands(&self, manager: PkgManager) -> Option<Vec<String>> {
        let cmd = match manager {
            PkgManager::Apt => "sudo apt-get remove -y nmap",
            PkgManager::Yum => "sudo yum remove -y nmap",
            PkgManager::Dnf => "sudo dnf remove -y nmap",
            PkgManager::Pacman => "sudo pacman -R --noconfirm nmap",
        };
        Some(vec![cmd.to_string()])
    }

    fn launch_command(&self, mode: LaunchMode, _framework_root: &Path) -> Option<String> {
        match mode {
            LaunchMode::Guided => Some(
                "read -p 'Target host/network: ' target; \
                 read -p 'Extra nmap flags (empty for -sV): ' flags; \
                 nmap ${flags:--sV} \"$target\""
                    .to_string(),
            ),
            LaunchMode::Direct => Some("nmap".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supports_every_known_package_manager() {
        for pm in PkgManager::ALL {
            assert!(NmapModule.install_commands(pm).is_some());
            assert!(NmapModule.update_commands(pm).is_some());
            assert!(NmapModule.remove_commands(pm).is_some());
        }
    }

    #[test]
    fn guided_mode_prompts_for_a_target() {
        let cmd = NmapModule
            .launch_command(LaunchMode::Guided, Path::new("/"))
            .unwrap();
        assert!(cmd.contains("read -p"));
        assert!(cmd.contains("nmap"));
    }
}
