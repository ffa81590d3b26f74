use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    StdIoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] anyhow::Error),

    #[error("tmux error: {0}")]
    MuxError(String),

    #[error("Session {0} not found")]
    SessionNotFound(u32),

    #[error("Session {0} is not active")]
    SessionInactive(u32),

    #[error("Launch error: {0}")]
    LaunchError(String),

    #[error("No supported package manager found on this system")]
    PkgManagerUnavailable,

    #[error("Package manager '{manager}' not supported by {tool} (supported: {supported})")]
    PkgManagerUnsupported {
        manager: String,
        tool: String,
        supported: String,
    },

    #[error("Package command failed: {0}")]
    PkgCommandFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Readline error: {0}")]
    ReadlineError(#[from] rustyline::error::ReadlineError),

    #[error("Serde JSON error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}
