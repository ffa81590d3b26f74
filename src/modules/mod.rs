//! Built-in tool modules. Each wraps one external security utility behind
//! the [`ToolModule`](crate::registry::ToolModule) contract; discovery
//! validates them like any other candidate.

mod anonip;
mod catscale;
mod nmap;

use crate::registry::ToolModule;
use std::path::Path;
use std::sync::Arc;

/// The candidate set handed to discovery at startup.
pub fn builtin(framework_root: &Path) -> Vec<Arc<dyn ToolModule>> {
    vec![
        Arc::new(nmap::NmapModule),
        Arc::new(anonip::AnonIpModule::new(framework_root)),
        Arc::new(catscale::CatScaleModule::new(framework_root)),
    ]
}
