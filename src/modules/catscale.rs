use crate::install::pkg::PkgManager;
use crate::registry::{HelpInfo, LaunchMode, ToolModule, NO_COMMAND};
use std::path::{Path, PathBuf};

const REPO_URL: &str = "https://github.com/FSecureLABS/LinuxCatScale";

/// Linux forensic collection script (Cat-Scale). Installed as a cloned
/// repository under the framework's scripts directory.
pub struct CatScaleModule {
    repo_dir: PathBuf,
}

impl CatScaleModule {
    pub fn new(framework_root: &Path) -> Self {
        Self {
            repo_dir: framework_root.join("scripts").join("LinuxCatScale"),
        }
    }

    fn script(&self) -> PathBuf {
        self.repo_dir.join("Cat-Scale.sh")
    }
}

impl ToolModule for CatScaleModule {
    fn name(&self) -> &str {
        "catscale"
    }

    fn category(&self) -> &str {
        "Forensics"
    }

    fn command(&self) -> &str {
        NO_COMMAND
    }

    fn description(&self) -> &str {
        "Forensic collector for Linux: volatile data, logs, configuration and file hashes"
    }

    fn dependencies(&self) -> Vec<String> {
        vec![
            "tar".to_string(),
            "sha1sum".to_string(),
            "find".to_string(),
            "grep".to_string(),
        ]
    }

    fn script_path(&self) -> Option<PathBuf> {
        Some(self.script())
    }

    fn help(&self) -> HelpInfo {
        HelpInfo {
            title: "Cat-Scale - Linux Forensic Collection".into(),
            usage: "use catscale".into(),
            desc: "Collects volatile data, logs and configuration from a live Linux host and \
                   hashes interesting files into a single evidence archive."
                .into(),
            modes: vec![
                (
                    "Guided".into(),
                    "Prompts for the output directory before collecting".into(),
                ),
                (
                    "Direct".into(),
                    "Runs the collector with its defaults".into(),
                ),
            ],
            options: vec![(
                "-o OUTDIR".into(),
                "Directory the evidence archive is written to".into(),
            )],
            examples: vec!["use catscale".into()],
            notes: vec![
                "The collector produces a compressed archive with the gathered evidence".into(),
            ],
        }
    }

    fn install_commands(&self, manager: PkgManager) -> Option<Vec<String>> {
        let git = match manager {
            PkgManager::Apt => "sudo apt-get update && sudo apt-get install -y git",
            PkgManager::Yum => "sudo yum install -y git",
            PkgManager::Dnf => "sudo dnf install -y git",
            PkgManager::Pacman => "sudo pacman -Sy --noconfirm git",
        };
        Some(vec![
            git.to_string(),
            format!(
                "test -d '{}' || git clone {} '{}'",
                self.repo_dir.display(),
                REPO_URL,
                self.repo_dir.display()
            ),
            format!("chmod +x '{}'", self.script().display()),
        ])
    }

    fn update_commands(&self, _manager: PkgManager) -> Option<Vec<String>> {
        Some(vec![format!("git -C '{}' pull", self.repo_dir.display())])
    }

    fn remove_commands(&self, _manager: PkgManager) -> Option<Vec<String>> {
        Some(vec![format!("rm -rf '{}'", self.repo_dir.display())])
    }

    fn launch_command(&self, mode: LaunchMode, _framework_root: &Path) -> Option<String> {
        let script = self.script();
        match mode {
            LaunchMode::Guided => Some(format!(
                "read -p 'Output directory: ' outdir; sudo '{}' -o \"$outdir\"",
                script.display()
            )),
            LaunchMode::Direct => Some(format!("sudo '{}'", script.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_path_points_into_the_cloned_repo() {
        let module = CatScaleModule::new(Path::new("/opt/secframe"));
        assert_eq!(
            module.script_path().unwrap(),
            PathBuf::from("/opt/secframe/scripts/LinuxCatScale/Cat-Scale.sh")
        );
    }

    #[test]
    fn guided_mode_asks_for_output_directory() {
        let module = CatScaleModule::new(Path::new("/opt/secframe"));
        let cmd = module
            .launch_command(LaunchMode::Guided, Path::new("/opt/secframe"))
            .unwrap();
        assert!(cmd.contains("Output directory"));
        assert!(cmd.contains("Cat-Scale.sh"));
    }
}
