use crate::gate::{GateOutcome, IngestGate};
use crate::pipeline::IngestRequest;
use crate::report::IngestReport;
use crate::scanner::{has_supported_extension, DEFAULT_EXTENSIONS};
use crate::{IndexerError, Result};
use async_trait::async_trait;
use log::{error, info, warn};
use notify::event::{CreateKind, RemoveKind};
use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(2);
const FS_EVENT_REASON: &str = "fs_event";

/// What the watcher rebuilds when the source directory changes.
#[async_trait]
pub trait ReindexTarget: Send + Sync {
    /// Returns `None` when the run was coalesced into one already queued.
    async fn reindex(&self) -> Result<Option<IngestReport>>;
}

/// Full rebuild of the canonical collection through the shared gate.
pub struct CanonicalReindex {
    gate: Arc<IngestGate>,
    request: IngestRequest,
}

impl CanonicalReindex {
    pub fn new(gate: Arc<IngestGate>, mut request: IngestRequest) -> Self {
        request.reset_first = true;
        Self { gate, request }
    }
}

#[async_trait]
impl ReindexTarget for CanonicalReindex {
    async fn reindex(&self) -> Result<Option<IngestReport>> {
        match self.gate.run(&self.request).await? {
            GateOutcome::Completed(report) => Ok(Some(report)),
            GateOutcome::Coalesced => Ok(None),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub debounce: Duration,
    /// Lowercase extensions that count as document changes
    pub extensions: Vec<String>,
    pub recursive: bool,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            recursive: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatcherState {
    Idle,
    Pending,
    Ingesting,
}

#[derive(Debug, Clone)]
pub struct WatchUpdate {
    pub completed_at: SystemTime,
    pub duration_ms: u64,
    pub reason: String,
    pub success: bool,
    pub report: Option<IngestReport>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatcherHealth {
    pub state: WatcherState,
    pub last_success: Option<SystemTime>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub runs: u64,
    pub last_duration_ms: Option<u64>,
    pub pending_events: usize,
    pub ingesting: bool,
}

impl WatcherHealth {
    const fn initial() -> Self {
        Self {
            state: WatcherState::Idle,
            last_success: None,
            last_error: None,
            consecutive_failures: 0,
            runs: 0,
            last_duration_ms: None,
            pending_events: 0,
            ingesting: false,
        }
    }
}

/// Keeps a collection in sync with a document directory.
///
/// File events are debounced in a single task; a burst of changes yields
/// one rebuild, and changes that land during a rebuild yield exactly one
/// more. Dropping the last handle shuts the loop down; [`Self::stop`]
/// also waits for it to finish.
#[derive(Clone)]
pub struct ReindexWatcher {
    inner: Arc<WatcherInner>,
}

struct WatcherInner {
    command_tx: mpsc::Sender<WatcherCommand>,
    update_tx: broadcast::Sender<WatchUpdate>,
    health_tx: watch::Sender<WatcherHealth>,
    fs_watcher: Mutex<Option<RecommendedWatcher>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

enum WatcherCommand {
    Trigger { reason: String },
    Shutdown,
}

impl ReindexWatcher {
    pub fn start(
        root: &Path,
        target: Arc<dyn ReindexTarget>,
        config: WatcherConfig,
    ) -> Result<Self> {
        let (event_tx, event_rx) = mpsc::channel(1024);
        let fs_watcher = create_fs_watcher(root, event_tx, config.recursive)?;
        info!(
            "Watching {} (debounce {} ms)",
            root.display(),
            config.debounce.as_millis()
        );
        Ok(Self::launch(target, config, event_rx, Some(fs_watcher)))
    }

    fn launch(
        target: Arc<dyn ReindexTarget>,
        config: WatcherConfig,
        event_rx: mpsc::Receiver<notify::Result<Event>>,
        fs_watcher: Option<RecommendedWatcher>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (health_tx, _) = watch::channel(WatcherHealth::initial());
        let (update_tx, _) = broadcast::channel(32);

        let task = spawn_reindex_loop(
            target,
            config,
            event_rx,
            command_rx,
            update_tx.clone(),
            health_tx.clone(),
        );

        Self {
            inner: Arc::new(WatcherInner {
                command_tx,
                update_tx,
                health_tx,
                fs_watcher: Mutex::new(fs_watcher),
                task: Mutex::new(Some(task)),
            }),
        }
    }

    /// Schedule a rebuild without waiting for the debounce window.
    pub async fn trigger(&self, reason: impl Into<String>) -> Result<()> {
        self.inner
            .command_tx
            .send(WatcherCommand::Trigger {
                reason: reason.into(),
            })
            .await
            .map_err(|e| IndexerError::Watcher(format!("failed to send trigger: {e}")))
    }

    #[must_use]
    pub fn subscribe_updates(&self) -> broadcast::Receiver<WatchUpdate> {
        self.inner.update_tx.subscribe()
    }

    #[must_use]
    pub fn health_snapshot(&self) -> WatcherHealth {
        self.inner.health_tx.borrow().clone()
    }

    #[must_use]
    pub fn health_stream(&self) -> watch::Receiver<WatcherHealth> {
        self.inner.health_tx.subscribe()
    }

    /// Stop observing the directory and wait for the loop to exit.
    /// A rebuild already in progress runs to completion first.
    pub async fn stop(&self) {
        let fs_watcher = self
            .inner
            .fs_watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(fs_watcher);

        let _ = self.inner.command_tx.send(WatcherCommand::Shutdown).await;

        let task = self
            .inner
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("Watcher task ended abnormally: {e}");
            }
        }
        info!("Watcher stopped");
    }
}

impl Drop for ReindexWatcher {
    fn drop(&mut self) {
        if Arc::strong_count(&self.inner) == 1 {
            let _ = self.inner.command_tx.try_send(WatcherCommand::Shutdown);
        }
    }
}

fn create_fs_watcher(
    root: &Path,
    sender: mpsc::Sender<notify::Result<Event>>,
    recursive: bool,
) -> Result<RecommendedWatcher> {
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = sender.blocking_send(res);
        },
        NotifyConfig::default(),
    )
    .map_err(|e| IndexerError::Watcher(format!("watcher init failed: {e}")))?;
    let mode = if recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };
    watcher
        .watch(root, mode)
        .map_err(|e| IndexerError::Watcher(format!("failed to watch {}: {e}", root.display())))?;
    Ok(watcher)
}

fn spawn_reindex_loop(
    target: Arc<dyn ReindexTarget>,
    config: WatcherConfig,
    mut event_rx: mpsc::Receiver<notify::Result<Event>>,
    mut command_rx: mpsc::Receiver<WatcherCommand>,
    update_tx: broadcast::Sender<WatchUpdate>,
    health_tx: watch::Sender<WatcherHealth>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut state = DebounceState::new(config.debounce);
        let mut health = WatcherHealth::initial();

        loop {
            let next_deadline = state.next_deadline();

            tokio::select! {
                Some(event) = event_rx.recv() => {
                    if handle_event(&config.extensions, event, &mut state) {
                        health.pending_events = state.pending();
                        health.state = WatcherState::Pending;
                        health_tx.send_replace(health.clone());
                    }
                }
                Some(cmd) = command_rx.recv() => {
                    match cmd {
                        WatcherCommand::Trigger { reason } => {
                            state.force_run(reason);
                            health.pending_events = state.pending();
                            health.state = WatcherState::Pending;
                            health_tx.send_replace(health.clone());
                        }
                        WatcherCommand::Shutdown => break,
                    }
                }
                () = time::sleep_until(next_deadline.unwrap_or_else(Instant::now)),
                    if next_deadline.is_some() =>
                {
                    let reason = state.take_reason().unwrap_or_else(|| FS_EVENT_REASON.to_string());
                    health.ingesting = true;
                    health.state = WatcherState::Ingesting;
                    health.pending_events = 0;
                    health_tx.send_replace(health.clone());

                    let started = Instant::now();
                    let result = target.reindex().await;
                    #[allow(clippy::cast_possible_truncation)]
                    let duration_ms = started.elapsed().as_millis() as u64;

                    health.ingesting = false;
                    health.state = WatcherState::Idle;
                    health.runs += 1;
                    health.last_duration_ms = Some(duration_ms);
                    let update = match result {
                        Ok(report) => {
                            info!("Re-index ({reason}) finished in {duration_ms}ms");
                            health.last_success = Some(SystemTime::now());
                            health.last_error = None;
                            health.consecutive_failures = 0;
                            WatchUpdate {
                                completed_at: SystemTime::now(),
                                duration_ms,
                                reason,
                                success: true,
                                report,
                                error: None,
                            }
                        }
                        Err(err) => {
                            error!("Re-index ({reason}) failed: {err}");
                            health.last_error = Some(err.to_string());
                            health.consecutive_failures += 1;
                            WatchUpdate {
                                completed_at: SystemTime::now(),
                                duration_ms,
                                reason,
                                success: false,
                                report: None,
                                error: Some(err.to_string()),
                            }
                        }
                    };
                    health_tx.send_replace(health.clone());
                    let _ = update_tx.send(update);

                    state.reset();
                }
                else => break,
            }
        }
    })
}

fn handle_event(
    extensions: &[String],
    event: notify::Result<Event>,
    state: &mut DebounceState,
) -> bool {
    match event {
        Ok(evt) => {
            if !is_relevant_event(extensions, &evt) {
                return false;
            }
            state.record_event(evt.paths.len());
            true
        }
        Err(err) => {
            warn!("Watcher error: {err}");
            false
        }
    }
}

fn is_relevant_event(extensions: &[String], event: &Event) -> bool {
    match event.kind {
        EventKind::Access(_)
        | EventKind::Create(CreateKind::Folder)
        | EventKind::Remove(RemoveKind::Folder) => false,
        _ => event
            .paths
            .iter()
            .any(|path| !path.is_dir() && has_supported_extension(path, extensions)),
    }
}

struct DebounceState {
    debounce: Duration,
    dirty: bool,
    pending: usize,
    last_event: Option<Instant>,
    reason: Option<String>,
    force_immediate: bool,
}

impl DebounceState {
    const fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            dirty: false,
            pending: 0,
            last_event: None,
            reason: None,
            force_immediate: false,
        }
    }

    fn record_event(&mut self, count: usize) {
        self.pending += count.max(1);
        self.reason.get_or_insert_with(|| FS_EVENT_REASON.to_string());
        self.last_event = Some(Instant::now());
        self.dirty = true;
    }

    fn force_run(&mut self, reason: String) {
        self.pending += 1;
        self.reason = Some(reason);
        self.force_immediate = true;
        self.dirty = true;
    }

    const fn pending(&self) -> usize {
        self.pending
    }

    fn next_deadline(&self) -> Option<Instant> {
        if !self.dirty {
            return None;
        }
        if self.force_immediate {
            return Some(Instant::now());
        }
        self.last_event.map(|last| last + self.debounce)
    }

    fn take_reason(&mut self) -> Option<String> {
        self.reason.take()
    }

    fn reset(&mut self) {
        self.dirty = false;
        self.pending = 0;
        self.last_event = None;
        self.reason = None;
        self.force_immediate = false;
    }
}
