use super::{LaunchMode, ToolModule};
use crate::install::pkg::PkgManager;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// A registered module plus its cached installation state.
///
/// `installed` is tri-state: `None` until first checked, then memoized until
/// explicitly invalidated after an install/update/remove operation.
#[derive(Clone)]
pub struct ModuleEntry {
    module: Arc<dyn ToolModule>,
    installed: Arc<RwLock<Option<bool>>>,
}

impl ModuleEntry {
    pub fn new(module: Arc<dyn ToolModule>) -> Self {
        Self {
            module,
            installed: Arc::new(RwLock::new(None)),
        }
    }

    pub fn module(&self) -> &Arc<dyn ToolModule> {
        &self.module
    }

    pub fn cached_installed(&self) -> Option<bool> {
        *self.installed.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_installed(&self, value: bool) {
        *self.installed.write().unwrap_or_else(|e| e.into_inner()) = Some(value);
    }

    /// Forces the next check to re-probe the system.
    pub fn invalidate_installed(&self) {
        *self.installed.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl std::fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleEntry")
            .field("name", &self.module.name())
            .field("installed", &self.cached_installed())
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Incompatible {
    pub name: String,
    pub reason: String,
}

/// Discovery outcome: which candidates were registered and which were
/// rejected, with the reason for each rejection.
#[derive(Debug, Default, Serialize)]
pub struct CompatReport {
    pub compatible: Vec<String>,
    pub incompatible: Vec<Incompatible>,
}

/// Registry of compatible modules, keyed by lower-cased name.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, ModuleEntry>,
}

impl ModuleRegistry {
    /// Validates and registers every candidate. A candidate failing any part
    /// of the capability contract is rejected and reported; it never aborts
    /// discovery. Name collisions overwrite the earlier registration
    /// (last-registered wins).
    pub fn discover(candidates: Vec<Arc<dyn ToolModule>>) -> (Self, CompatReport) {
        let mut registry = Self::default();
        let mut report = CompatReport::default();

        for candidate in candidates {
            let display_name = if candidate.name().is_empty() {
                "<unnamed>".to_string()
            } else {
                candidate.name().to_string()
            };

            match validate(candidate.as_ref()) {
                Ok(()) => {
                    let key = candidate.name().to_lowercase();
                    if registry.modules.contains_key(&key) {
                        warn!(module = %display_name, "Module name collision, last registration wins");
                    }
                    debug!(module = %display_name, "Module registered");
                    registry
                        .modules
                        .insert(key, ModuleEntry::new(candidate));
                    report.compatible.push(display_name);
                }
                Err(missing) => {
                    let reason = format!("missing capabilities: {}", missing.join(", "));
                    warn!(module = %display_name, %reason, "Module rejected");
                    report.incompatible.push(Incompatible {
                        name: display_name,
                        reason,
                    });
                }
            }
        }

        (registry, report)
    }

    pub fn get(&self, name: &str) -> Option<&ModuleEntry> {
        self.modules.get(&name.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Entries sorted by name for stable listings.
    pub fn entries(&self) -> Vec<&ModuleEntry> {
        let mut entries: Vec<_> = self.modules.values().collect();
        entries.sort_by(|a, b| a.module.name().cmp(b.module.name()));
        entries
    }

    pub fn categories(&self) -> Vec<String> {
        let mut cats: Vec<String> = self
            .modules
            .values()
            .map(|e| e.module.category().to_string())
            .collect();
        cats.sort();
        cats.dedup();
        cats
    }

    pub fn entries_in_category(&self, category: &str) -> Vec<&ModuleEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.module.category().eq_ignore_ascii_case(category))
            .collect()
    }

    /// Case-insensitive substring search over names and descriptions.
    pub fn search(&self, term: &str) -> Vec<&ModuleEntry> {
        let needle = term.to_lowercase();
        self.entries()
            .into_iter()
            .filter(|e| {
                e.module.name().to_lowercase().contains(&needle)
                    || e.module.description().to_lowercase().contains(&needle)
            })
            .collect()
    }
}

/// Checks the full required capability set; returns every missing piece so
/// the operator sees the complete picture at once.
fn validate(module: &dyn ToolModule) -> Result<(), Vec<String>> {
    let mut missing = Vec::new();
    let probe_root = Path::new("/");

    if module.name().trim().is_empty() {
        missing.push("name".to_string());
    }
    if module.category().trim().is_empty() {
        missing.push("category".to_string());
    }
    if module.description().trim().is_empty() {
        missing.push("description".to_string());
    }

    let help = module.help();
    if help.title.trim().is_empty() || help.usage.trim().is_empty() || help.desc.trim().is_empty()
    {
        missing.push("help payload".to_string());
    }

    let has_install = PkgManager::ALL
        .iter()
        .any(|pm| matches!(module.install_commands(*pm), Some(cmds) if !cmds.is_empty()));
    if !has_install {
        missing.push("install commands".to_string());
    }

    if module.launch_command(LaunchMode::Guided, probe_root).is_none() {
        missing.push("run_guided".to_string());
    }
    if module.launch_command(LaunchMode::Direct, probe_root).is_none() {
        missing.push("run_direct".to_string());
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing)
    }
}
