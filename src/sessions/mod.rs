pub mod logger;

use crate::error::AppError;
use crate::mux::{parse_session_id, MuxBackend, MuxListing};
use chrono::{DateTime, Local};
use logger::SessionLogger;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Local>,
    pub command: String,
    pub output: Option<String>,
}

/// One logical unit of launched work, mapped 1:1 onto an external mux
/// session named by this id.
pub struct Session {
    id: u32,
    label: String,
    start_time: DateTime<Local>,
    active: bool,
    last_command: Option<String>,
    history: Vec<HistoryEntry>,
    logger: SessionLogger,
}

impl Session {
    fn new(id: u32, label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            id,
            logger: SessionLogger::new(id, label.clone()),
            label,
            start_time: Local::now(),
            active: true,
            last_command: None,
            history: Vec::new(),
        }
    }

    /// External session name; the mux addresses sessions by this string.
    pub fn name(&self) -> String {
        self.id.to_string()
    }

    pub async fn add_to_history(&mut self, command: &str, output: Option<&str>) {
        self.history.push(HistoryEntry {
            timestamp: Local::now(),
            command: command.to_string(),
            output: output.map(|s| s.to_string()),
        });
        self.last_command = Some(command.to_string());
        self.logger.log(&format!("Command: {}", command)).await;
        if let Some(out) = output {
            self.logger.log(&format!("Output: {}", out)).await;
        }
    }

    pub async fn log(&mut self, message: &str) {
        self.logger.log(message).await;
    }
}

/// Row rendered by `list sessions`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: u32,
    pub label: String,
    pub active: bool,
    pub start_time: String,
    pub duration: String,
    pub last_command: Option<String>,
    pub logging: bool,
}

/// Summary shown before a kill-all confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KillAllSummary {
    pub active: usize,
    pub inactive: usize,
    pub total: usize,
}

/// Owns the logical session table and reconciles it against the external
/// multiplexer, whose state can change underneath us at any time. Every
/// mutating operation reconciles first; cached `active` flags are never
/// trusted across operations.
pub struct SessionManager {
    sessions: BTreeMap<u32, Session>,
    session_count: u32,
    inactive: HashSet<u32>,
    backend: Arc<dyn MuxBackend>,
    logs_dir: PathBuf,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn MuxBackend>, logs_dir: PathBuf) -> Self {
        Self {
            sessions: BTreeMap::new(),
            session_count: 0,
            inactive: HashSet::new(),
            backend,
            logs_dir,
        }
    }

    pub fn backend(&self) -> Arc<dyn MuxBackend> {
        self.backend.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn inactive_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.inactive.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Refreshes logical state from the external session list.
    ///
    /// No server at all is a terminal judgment: every tracked session goes
    /// inactive. Otherwise membership in the live id set decides each
    /// session's flag in both directions, and the id counter advances to the
    /// maximum live id so fresh allocations never collide with sessions that
    /// survived a manager restart. Idempotent; safe to call redundantly.
    #[instrument(skip(self))]
    pub async fn reconcile(&mut self) -> Result<(), AppError> {
        let listing = self.backend.list().await?;
        self.inactive.clear();

        match listing {
            MuxListing::NoServer => {
                debug!("No mux server running, marking all tracked sessions inactive");
                for session in self.sessions.values_mut() {
                    session.active = false;
                    self.inactive.insert(session.id);
                }
            }
            MuxListing::Sessions(lines) => {
                let live: HashSet<u32> = lines.iter().filter_map(|l| parse_session_id(l)).collect();
                for session in self.sessions.values_mut() {
                    if live.contains(&session.id) {
                        session.active = true;
                    } else {
                        session.active = false;
                        self.inactive.insert(session.id);
                    }
                }
                if let Some(max) = live.iter().max() {
                    self.session_count = self.session_count.max(*max);
                }
            }
        }
        Ok(())
    }

    /// Phase one of a launch: allocates the next id, opens the log, and
    /// records the session. The external session is materialized afterwards
    /// by the dispatcher.
    #[instrument(skip(self, label), fields(label = %label))]
    pub async fn create_session(&mut self, label: &str) -> Result<u32, AppError> {
        self.reconcile().await?;
        self.session_count += 1;
        let id = self.session_count;
        let mut session = Session::new(id, label);
        session.logger.start(&self.logs_dir).await;
        self.sessions.insert(id, session);
        info!(sid = id, %label, "New session created");
        Ok(id)
    }

    /// Reconciles, then renders the table. Zero rows is a valid outcome.
    pub async fn list_sessions(&mut self) -> Result<Vec<SessionView>, AppError> {
        self.reconcile().await?;
        Ok(self
            .sessions
            .values()
            .map(|s| SessionView {
                id: s.id,
                label: s.label.clone(),
                active: s.active,
                start_time: s.start_time.format("%Y-%m-%d %H:%M:%S").to_string(),
                duration: s.logger.duration(),
                last_command: s.last_command.clone(),
                logging: s.logger.is_active(),
            })
            .collect())
    }

    /// Removes every session flagged inactive by a fresh reconciliation.
    /// Each removal is independent. Returns the removed ids.
    #[instrument(skip(self))]
    pub async fn clear_sessions(&mut self) -> Result<Vec<u32>, AppError> {
        self.reconcile().await?;
        let mut removed = Vec::new();
        for id in self.inactive_ids() {
            if let Some(mut session) = self.sessions.remove(&id) {
                session.logger.stop().await;
                removed.push(id);
                info!(sid = id, "Removed inactive session");
            }
        }
        self.inactive.clear();
        Ok(removed)
    }

    /// Terminates one session: log footer, best-effort external kill, then
    /// removal. The entry is removed even when the external session was
    /// already gone.
    #[instrument(skip(self))]
    pub async fn kill_session(&mut self, id: u32) -> Result<(), AppError> {
        self.reconcile().await?;
        let mut session = self
            .sessions
            .remove(&id)
            .ok_or(AppError::SessionNotFound(id))?;
        session.active = false;
        session.logger.stop().await;
        if !self.backend.kill(&session.name()).await {
            warn!(sid = id, "External kill reported failure, entry removed anyway");
        }
        self.inactive.remove(&id);
        info!(sid = id, "Session terminated");
        Ok(())
    }

    /// Destroys every tracked session after confirmation. Declining leaves
    /// the table and counter untouched. Per-session teardown errors are
    /// isolated; the table is cleared and the id counter reset regardless.
    pub async fn kill_all_sessions<F>(&mut self, confirm: F) -> Result<bool, AppError>
    where
        F: FnOnce(KillAllSummary) -> bool,
    {
        self.reconcile().await?;
        if self.sessions.is_empty() {
            return Ok(false);
        }

        let active = self.sessions.values().filter(|s| s.active).count();
        let summary = KillAllSummary {
            active,
            inactive: self.sessions.len() - active,
            total: self.sessions.len(),
        };

        if !confirm(summary) {
            info!("Kill-all cancelled by user");
            return Ok(false);
        }

        let ids: Vec<u32> = self.sessions.keys().copied().collect();
        for id in ids {
            if let Some(mut session) = self.sessions.remove(&id) {
                session.logger.stop().await;
                if !self.backend.kill(&session.name()).await {
                    warn!(sid = id, "Kill failed during kill-all, continuing");
                }
            }
        }
        self.sessions.clear();
        self.inactive.clear();
        self.session_count = 0;
        info!("All sessions terminated, id counter reset");
        Ok(true)
    }

    /// Attaches to an active session; blocks until the user detaches. A
    /// failed attach is an error but does not flip the session inactive:
    /// that judgment belongs to the next reconciliation.
    #[instrument(skip(self))]
    pub async fn use_session(&mut self, id: u32) -> Result<(), AppError> {
        self.reconcile().await?;
        let session = self.sessions.get(&id).ok_or(AppError::SessionNotFound(id))?;
        if !session.active {
            return Err(AppError::SessionInactive(id));
        }
        let name = session.name();
        if !self.backend.attach(&name).await {
            return Err(AppError::MuxError(format!(
                "could not attach to session {}",
                id
            )));
        }
        Ok(())
    }

    /// Cleanup for a launch that failed after phase one: marks the session
    /// inactive, closes its log, kills any external remnant, and drops it.
    pub async fn abort_session(&mut self, id: u32) {
        if let Some(mut session) = self.sessions.remove(&id) {
            session.active = false;
            session.logger.stop().await;
            self.backend.kill(&session.name()).await;
            self.inactive.remove(&id);
            warn!(sid = id, "Session aborted after failed launch");
        }
    }

    /// Records a launch event on an existing session.
    pub async fn record_history(&mut self, id: u32, command: &str) {
        if let Some(session) = self.sessions.get_mut(&id) {
            session.add_to_history(command, None).await;
        }
    }

    pub async fn log_to_session(&mut self, id: u32, message: &str) {
        if let Some(session) = self.sessions.get_mut(&id) {
            session.log(message).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Scripted external world: the listing it will report and the calls it
    /// has seen.
    struct MockMux {
        listing: Mutex<Result<MuxListing, String>>,
        killed: Mutex<Vec<String>>,
        attach_ok: bool,
    }

    impl MockMux {
        fn with_listing(listing: MuxListing) -> Arc<Self> {
            Arc::new(Self {
                listing: Mutex::new(Ok(listing)),
                killed: Mutex::new(Vec::new()),
                attach_ok: true,
            })
        }

        fn no_server() -> Arc<Self> {
            Self::with_listing(MuxListing::NoServer)
        }

        fn live(ids: &[u32]) -> Arc<Self> {
            Self::with_listing(MuxListing::Sessions(
                ids.iter().map(|id| format!("{}: 1 windows", id)).collect(),
            ))
        }

        fn set_listing(&self, listing: MuxListing) {
            *self.listing.lock().unwrap() = Ok(listing);
        }

        fn killed(&self) -> Vec<String> {
            self.killed.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl MuxBackend for MockMux {
        async fn has_session(&self, _name: &str) -> bool {
            false
        }
        async fn create(&self, _name: &str, _invocation: &str, _window: &str) -> bool {
            true
        }
        async fn attach(&self, _name: &str) -> bool {
            self.attach_ok
        }
        async fn detach_current(&self) -> bool {
            true
        }
        async fn kill(&self, name: &str) -> bool {
            self.killed.lock().unwrap().push(name.to_string());
            true
        }
        async fn list(&self) -> Result<MuxListing, AppError> {
            self.listing
                .lock()
                .unwrap()
                .clone()
                .map_err(AppError::MuxError)
        }
    }

    fn manager(mux: Arc<MockMux>) -> (SessionManager, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        (
            SessionManager::new(mux, dir.path().to_path_buf()),
            dir,
        )
    }

    #[tokio::test]
    async fn sequential_ids_with_no_server_both_flagged_inactive() {
        let mux = MockMux::no_server();
        let (mut mgr, _dir) = manager(mux);

        let a = mgr.create_session("alpha").await.unwrap();
        let b = mgr.create_session("beta").await.unwrap();
        assert_eq!((a, b), (1, 2));

        mgr.reconcile().await.unwrap();
        assert_eq!(mgr.inactive_ids(), vec![1, 2]);
        assert!(!mgr.sessions[&1].active);
        assert!(!mgr.sessions[&2].active);
    }

    #[tokio::test]
    async fn id_allocation_skips_live_external_ids() {
        // The mux already shows sessions 1..=3 from a previous process life.
        let mux = MockMux::live(&[1, 2, 3]);
        let (mut mgr, _dir) = manager(mux);

        let id = mgr.create_session("alpha").await.unwrap();
        assert_eq!(id, 4);
    }

    #[tokio::test]
    async fn counter_never_rolls_backward() {
        let mux = MockMux::live(&[5]);
        let (mut mgr, _dir) = manager(mux.clone());
        mgr.reconcile().await.unwrap();
        assert_eq!(mgr.session_count, 5);

        mux.set_listing(MuxListing::Sessions(vec!["2: 1 windows".into()]));
        mgr.reconcile().await.unwrap();
        assert_eq!(mgr.session_count, 5);

        let id = mgr.create_session("next").await.unwrap();
        assert_eq!(id, 6);
    }

    #[tokio::test]
    async fn reconcile_is_idempotent() {
        let mux = MockMux::live(&[1]);
        let (mut mgr, _dir) = manager(mux.clone());
        mgr.create_session("alpha").await.unwrap();
        mgr.create_session("beta").await.unwrap();

        mgr.reconcile().await.unwrap();
        let first_inactive = mgr.inactive_ids();
        let first_active: Vec<(u32, bool)> =
            mgr.sessions.values().map(|s| (s.id, s.active)).collect();

        mgr.reconcile().await.unwrap();
        assert_eq!(mgr.inactive_ids(), first_inactive);
        let second_active: Vec<(u32, bool)> =
            mgr.sessions.values().map(|s| (s.id, s.active)).collect();
        assert_eq!(first_active, second_active);
    }

    #[tokio::test]
    async fn reconcile_reactivates_sessions_seen_live_again() {
        let mux = MockMux::live(&[1]);
        let (mut mgr, _dir) = manager(mux.clone());
        mgr.create_session("alpha").await.unwrap();

        mux.set_listing(MuxListing::NoServer);
        mgr.reconcile().await.unwrap();
        assert!(!mgr.sessions[&1].active);

        // Server came back with the session still alive.
        mux.set_listing(MuxListing::Sessions(vec!["1: 1 windows".into()]));
        mgr.reconcile().await.unwrap();
        assert!(mgr.sessions[&1].active);
        assert!(mgr.inactive_ids().is_empty());
    }

    #[tokio::test]
    async fn kill_session_removes_and_stays_removed() {
        let mux = MockMux::live(&[1]);
        let (mut mgr, _dir) = manager(mux.clone());
        mgr.create_session("alpha").await.unwrap();
        assert_eq!(mgr.len(), 1);

        mgr.kill_session(2).await.unwrap();
        assert!(!mgr.contains(2));
        assert_eq!(mux.killed(), vec!["2".to_string()]);

        // A later reconcile must not resurrect the entry even though the
        // backend still reports id 1 live.
        mgr.reconcile().await.unwrap();
        assert!(!mgr.contains(2));
        assert!(mgr.list_sessions().await.unwrap().iter().all(|v| v.id != 2));
    }

    #[tokio::test]
    async fn kill_missing_session_is_an_error() {
        let mux = MockMux::no_server();
        let (mut mgr, _dir) = manager(mux);
        let err = mgr.kill_session(42).await.unwrap_err();
        assert!(matches!(err, AppError::SessionNotFound(42)));
    }

    #[tokio::test]
    async fn declined_kill_all_changes_nothing() {
        let mux = MockMux::live(&[]);
        let (mut mgr, _dir) = manager(mux.clone());
        mgr.create_session("alpha").await.unwrap();
        mgr.create_session("beta").await.unwrap();
        let count_before = mgr.session_count;

        let proceeded = mgr.kill_all_sessions(|_| false).await.unwrap();
        assert!(!proceeded);
        assert_eq!(mgr.len(), 2);
        assert_eq!(mgr.session_count, count_before);
        assert!(mux.killed().is_empty());
    }

    #[tokio::test]
    async fn confirmed_kill_all_clears_table_and_resets_counter() {
        let mux = MockMux::live(&[]);
        let (mut mgr, _dir) = manager(mux.clone());
        mgr.create_session("alpha").await.unwrap();
        mgr.create_session("beta").await.unwrap();

        let mut seen = None;
        let proceeded = mgr
            .kill_all_sessions(|summary| {
                seen = Some(summary);
                true
            })
            .await
            .unwrap();

        assert!(proceeded);
        assert_eq!(seen.unwrap().total, 2);
        assert!(mgr.is_empty());
        assert_eq!(mgr.session_count, 0);
        assert_eq!(mux.killed().len(), 2);

        // Counter reset means ids restart from 1.
        let id = mgr.create_session("fresh").await.unwrap();
        assert_eq!(id, 1);
    }

    #[tokio::test]
    async fn clear_removes_exactly_the_inactive_sessions() {
        let mux = MockMux::live(&[]);
        let (mut mgr, _dir) = manager(mux.clone());
        mgr.create_session("alpha").await.unwrap();
        mgr.create_session("beta").await.unwrap();
        mgr.create_session("gamma").await.unwrap();

        // Only session 2 is still live externally.
        mux.set_listing(MuxListing::Sessions(vec!["2: 1 windows".into()]));
        let removed = mgr.clear_sessions().await.unwrap();

        assert_eq!(removed, vec![1, 3]);
        assert!(mgr.contains(2));
        assert!(mgr.sessions[&2].active);
        assert_eq!(mgr.len(), 1);
    }

    #[tokio::test]
    async fn use_session_requires_active_state() {
        let mux = MockMux::no_server();
        let (mut mgr, _dir) = manager(mux);
        mgr.create_session("alpha").await.unwrap();

        let err = mgr.use_session(1).await.unwrap_err();
        assert!(matches!(err, AppError::SessionInactive(1)));
    }

    #[tokio::test]
    async fn failed_attach_does_not_flip_active_flag() {
        let mux = Arc::new(MockMux {
            listing: Mutex::new(Ok(MuxListing::Sessions(vec!["1: 1 windows".into()]))),
            killed: Mutex::new(Vec::new()),
            attach_ok: false,
        });
        let (mut mgr, _dir) = manager(mux);
        mgr.create_session("alpha").await.unwrap();

        // id 1 is live externally, attach itself fails.
        let err = mgr.use_session(1).await.unwrap_err();
        assert!(matches!(err, AppError::MuxError(_)));
        assert!(mgr.sessions[&1].active);
    }

    #[tokio::test]
    async fn genuine_list_failure_leaves_table_untouched() {
        let mux = MockMux::live(&[]);
        let (mut mgr, _dir) = manager(mux.clone());
        mgr.create_session("alpha").await.unwrap();

        *mux.listing.lock().unwrap() = Err("socket permission denied".to_string());
        assert!(mgr.reconcile().await.is_err());
        assert!(mgr.contains(1));
    }

    #[tokio::test]
    async fn record_history_tracks_last_command() {
        let mux = MockMux::live(&[]);
        let (mut mgr, _dir) = manager(mux);
        let id = mgr.create_session("alpha").await.unwrap();

        let before = Local::now();
        mgr.record_history(id, "nmap -sV 10.0.0.1").await;

        let session = &mgr.sessions[&id];
        assert_eq!(session.last_command.as_deref(), Some("nmap -sV 10.0.0.1"));
        assert_eq!(session.history.len(), 1);
        let entry = &session.history[0];
        assert_eq!(entry.command, "nmap -sV 10.0.0.1");
        assert!(entry.output.is_none());
        assert!(entry.timestamp >= before);
    }

    #[tokio::test]
    async fn abort_session_tears_down_phase_one() {
        let mux = MockMux::live(&[]);
        let (mut mgr, _dir) = manager(mux.clone());
        let id = mgr.create_session("alpha").await.unwrap();

        mgr.abort_session(id).await;
        assert!(!mgr.contains(id));
        assert_eq!(mux.killed(), vec![id.to_string()]);
    }
}
