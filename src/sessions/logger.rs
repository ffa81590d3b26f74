use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::error;

/// Append-only log file owned by exactly one session for its whole life.
/// Header on start, timestamped lines in between, footer with duration on
/// stop. Write failures are reported through tracing, never propagated into
/// session bookkeeping.
pub struct SessionLogger {
    session_id: u32,
    label: String,
    start_time: DateTime<Local>,
    log_path: Option<PathBuf>,
    file: Option<File>,
}

impl SessionLogger {
    pub fn new(session_id: u32, label: impl Into<String>) -> Self {
        Self {
            session_id,
            label: label.into(),
            start_time: Local::now(),
            log_path: None,
            file: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.file.is_some()
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Opens the log file under `logs_dir` and writes the header.
    pub async fn start(&mut self, logs_dir: &Path) {
        if self.file.is_some() {
            return;
        }
        if let Err(e) = tokio::fs::create_dir_all(logs_dir).await {
            error!(path = %logs_dir.display(), error = %e, "Failed to create logs directory");
            return;
        }

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = logs_dir.join(format!("session_{}_{}.log", self.session_id, stamp));
        match OpenOptions::new().create(true).append(true).open(&path).await {
            Ok(file) => {
                self.file = Some(file);
                self.log_path = Some(path);
                let header = format!(
                    "=== Session Started: {} ===\nTool: {}\nSession ID: {}\n",
                    Local::now().format("%Y-%m-%d %H:%M:%S"),
                    self.label,
                    self.session_id
                );
                self.write(&header).await;
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to open session log");
            }
        }
    }

    /// Writes the footer and closes the file. Safe to call when logging was
    /// never started.
    pub async fn stop(&mut self) {
        if self.file.is_none() {
            return;
        }
        let footer = format!(
            "=== Session Ended: {} ===\nDuration: {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            self.duration()
        );
        self.write(&footer).await;
        if let Some(mut file) = self.file.take() {
            let _ = file.flush().await;
        }
    }

    pub async fn log(&mut self, message: &str) {
        let line = format!(
            "{}: {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            message
        );
        self.write(&line).await;
    }

    /// Session age as HH:MM:SS.
    pub fn duration(&self) -> String {
        let elapsed = Local::now().signed_duration_since(self.start_time);
        let secs = elapsed.num_seconds().max(0);
        format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    }

    async fn write(&mut self, text: &str) {
        if let Some(file) = self.file.as_mut() {
            if let Err(e) = file.write_all(text.as_bytes()).await {
                error!(sid = self.session_id, error = %e, "Failed to write session log");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_header_body_and_footer() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = SessionLogger::new(7, "netscan");

        logger.start(dir.path()).await;
        assert!(logger.is_active());
        let path = logger.log_path().unwrap().to_path_buf();
        logger.log("Command: run scan").await;
        logger.stop().await;
        assert!(!logger.is_active());

        let contents = std::fs::read_to_string(path).unwrap();
        assert!(contents.contains("=== Session Started:"));
        assert!(contents.contains("Tool: netscan"));
        assert!(contents.contains("Session ID: 7"));
        assert!(contents.contains("Command: run scan"));
        assert!(contents.contains("=== Session Ended:"));
        assert!(contents.contains("Duration: 00:"));
    }

    #[tokio::test]
    async fn stop_without_start_is_a_no_op() {
        let mut logger = SessionLogger::new(1, "idle");
        logger.stop().await;
        assert!(logger.log_path().is_none());
    }

    #[test]
    fn duration_formats_as_hms() {
        let logger = SessionLogger::new(1, "x");
        let d = logger.duration();
        assert_eq!(d.len(), 8);
        assert!(d.starts_with("00:00:"));
    }
}
