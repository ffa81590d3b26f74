mod config;
mod dispatch;
mod error;
mod install;
mod modules;
mod mux;
mod registry;
mod sessions;
mod shell;

use crate::config::Config;
use crate::mux::TmuxBackend;
use crate::registry::discovery::ModuleRegistry;
use crate::sessions::SessionManager;
use crate::shell::Shell;
use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::{filter::EnvFilter, FmtSubscriber};

fn setup_logging(log_level_str: &str) {
    let level = match log_level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("secframe={}", level)));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_level(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Asks the operator whether to continue without any usable module.
fn confirm_continue_without_modules() -> bool {
    print!(
        "{}",
        "[!] No compatible modules were discovered. Continue anyway? (y/N): ".yellow()
    );
    let _ = std::io::stdout().flush();
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    answer.trim().eq_ignore_ascii_case("y")
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().expect("Failed to load configuration.");
    setup_logging(&config.log_level);

    tracing::info!(version = %env!("CARGO_PKG_VERSION"), "Starting secframe");

    // The multiplexer is the substrate for everything; without it there is
    // nothing to manage.
    if let Err(e) = TmuxBackend::ensure_installed() {
        eprintln!("{} {}", "[!]".red(), e);
        std::process::exit(1);
    }

    let candidates = modules::builtin(&config.framework_root);
    let (module_registry, report) = ModuleRegistry::discover(candidates);

    for rejected in &report.incompatible {
        println!(
            "{} Module '{}' rejected: {}",
            "[!]".yellow(),
            rejected.name,
            rejected.reason
        );
    }
    tracing::info!(
        compatible = report.compatible.len(),
        incompatible = report.incompatible.len(),
        "Module discovery finished"
    );
    if let Ok(json) = serde_json::to_string(&report) {
        tracing::debug!(report = %json, "Discovery report");
    }

    if module_registry.is_empty() && !confirm_continue_without_modules() {
        std::process::exit(1);
    }

    let backend = Arc::new(TmuxBackend::new());
    let session_manager = SessionManager::new(backend, config.logs_dir.clone());

    let mut shell = Shell::new(config, module_registry, session_manager)?;
    shell.run().await?;

    tracing::info!("secframe shutdown");
    Ok(())
}
