use crate::config::Config;
use crate::error::AppError;
use crate::registry::discovery::ModuleEntry;
use crate::registry::LaunchMode;
use crate::sessions::SessionManager;
use std::path::Path;
use tracing::{info, warn};

/// Builds the opaque payload handed to the mux: run the tool's entry point
/// from the framework root, then drop into an interactive shell so the
/// session stays inspectable after the tool exits.
pub fn build_invocation(entry_point: &str, framework_root: &Path, shell: &str) -> String {
    format!(
        "cd '{}' && {}; exec {} -i",
        framework_root.display(),
        entry_point,
        shell
    )
}

/// Two-phase launch: logical session first (id + log), external
/// materialization second. A failed materialization aborts the logical
/// session so no half-created record lingers.
pub async fn launch_module(
    manager: &mut SessionManager,
    entry: &ModuleEntry,
    mode: LaunchMode,
    config: &Config,
) -> Result<u32, AppError> {
    let module = entry.module();
    let entry_point = module
        .launch_command(mode, &config.framework_root)
        .ok_or_else(|| {
            AppError::LaunchError(format!(
                "{} does not support {} mode",
                module.name(),
                mode.label()
            ))
        })?;

    let id = manager.create_session(module.name()).await?;
    let invocation = build_invocation(&entry_point, &config.framework_root, &config.shell);
    let window = format!("{} - {}", module.name(), mode.label());

    info!(sid = id, module = %module.name(), mode = %mode.label(), "Launching tool session");
    let backend = manager.backend();
    if backend.create(&id.to_string(), &invocation, &window).await {
        manager
            .record_history(id, &format!("tmux session: {}", mode.label()))
            .await;
        Ok(id)
    } else {
        warn!(sid = id, module = %module.name(), "Launch failed, aborting session");
        manager
            .log_to_session(id, "Error: failed to create tmux session")
            .await;
        manager.abort_session(id).await;
        Err(AppError::LaunchError(format!(
            "could not create tmux session for {}",
            module.name()
        )))
    }
}

/// Launches a plain interactive shell session (no tool bound).
pub async fn launch_terminal(
    manager: &mut SessionManager,
    config: &Config,
) -> Result<u32, AppError> {
    let id = manager.create_session("terminal").await?;
    let invocation = format!(
        "cd '{}' && exec {} -i",
        config.framework_root.display(),
        config.shell
    );

    let backend = manager.backend();
    if backend.create(&id.to_string(), &invocation, "terminal").await {
        manager.record_history(id, "interactive terminal").await;
        Ok(id)
    } else {
        manager.abort_session(id).await;
        Err(AppError::LaunchError(
            "could not create terminal session".to_string(),
        ))
    }
}
