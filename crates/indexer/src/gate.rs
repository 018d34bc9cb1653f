use crate::error::Result;
use crate::pipeline::{IngestRequest, IngestionPipeline};
use crate::report::IngestReport;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug)]
pub enum GateOutcome {
    Completed(IngestReport),
    /// A follow-up run was already queued; this request was folded into it
    Coalesced,
}

/// Serializes ingestion runs against one pipeline.
///
/// At most one run is active and at most one more is queued behind it.
/// Callers arriving while a follow-up is already queued return
/// [`GateOutcome::Coalesced`] without running.
pub struct IngestGate {
    pipeline: Arc<IngestionPipeline>,
    running: Mutex<()>,
    queued: AtomicBool,
}

impl IngestGate {
    pub fn new(pipeline: Arc<IngestionPipeline>) -> Self {
        Self {
            pipeline,
            running: Mutex::new(()),
            queued: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn pipeline(&self) -> &Arc<IngestionPipeline> {
        &self.pipeline
    }

    pub async fn run(&self, request: &IngestRequest) -> Result<GateOutcome> {
        let _guard = match self.running.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                if self.queued.swap(true, Ordering::SeqCst) {
                    log::debug!("Ingestion already queued; coalescing request");
                    return Ok(GateOutcome::Coalesced);
                }
                let slot = QueuedSlot(&self.queued);
                let guard = self.running.lock().await;
                drop(slot);
                guard
            }
        };
        let report = self.pipeline.run(request).await?;
        Ok(GateOutcome::Completed(report))
    }
}

/// Holds the single queued slot. Dropping it frees the slot, including when
/// the waiting future is cancelled before the running ingestion finishes.
struct QueuedSlot<'a>(&'a AtomicBool);

impl Drop for QueuedSlot<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
