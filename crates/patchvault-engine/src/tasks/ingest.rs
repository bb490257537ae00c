use std::ops::Range;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::Utc;
use flume::{Receiver, Sender};
use patchvault_core::errors::{ExError, ExErrorKind};
use patchvault_core::ingest::{
    merge_patches, IngestItem, MergeOutcome, ProgressHandler, ScaledProgress, WriteGate,
};
use patchvault_core::transport::Transport;
use patchvault_core::{ImportSource, PatchStore, SynthVariant};
use patchvault_core_types::RunId;

use crate::capture::capture_programs;
use crate::file_import::load_file;

/// Share of a capture run's progress spent waiting for the synth
const CAPTURE_SHARE: f64 = 0.5;

/// What one ingestion run reports to the interactive side
#[derive(Debug, Clone)]
pub enum IngestEvent {
    Progress { run_id: RunId, fraction: f64 },
    Finished { run_id: RunId, outcome: MergeOutcome },
    Failed { run_id: RunId, error: ExError },
}

/// Where the items of a run come from
pub enum ItemSource {
    /// Already in memory
    Ready(Vec<IngestItem>),
    /// Read and split on the worker thread
    File {
        path: PathBuf,
        max_buffered_bytes: usize,
    },
    /// Requested from the connected synth on the worker thread
    Capture {
        transport: Arc<dyn Transport>,
        programs: Range<u32>,
        timeout_per_item: Duration,
    },
}

/// Items of one variant from one source
pub struct IngestRequest {
    pub variant: Arc<SynthVariant>,
    pub source: ImportSource,
    pub items: ItemSource,
}

impl IngestRequest {
    pub fn ready(variant: Arc<SynthVariant>, source: ImportSource, items: Vec<IngestItem>) -> Self {
        Self {
            variant,
            source,
            items: ItemSource::Ready(items),
        }
    }

    /// Ingest the sysex file at `path`, read on the worker thread
    pub fn file(variant: Arc<SynthVariant>, path: PathBuf, max_buffered_bytes: usize) -> Self {
        Self {
            variant,
            source: ImportSource::from_file(&path),
            items: ItemSource::File {
                path,
                max_buffered_bytes,
            },
        }
    }

    /// Capture `programs` from the synth, labelled with the current time
    pub fn capture(
        variant: Arc<SynthVariant>,
        transport: Arc<dyn Transport>,
        programs: Range<u32>,
        timeout_per_item: Duration,
    ) -> Self {
        let source = ImportSource::from_capture(variant.name(), Utc::now());
        Self {
            variant,
            source,
            items: ItemSource::Capture {
                transport,
                programs,
                timeout_per_item,
            },
        }
    }
}

/// Items ready for the merge, plus what was lost on the way
#[derive(Default)]
struct Resolved {
    items: Vec<IngestItem>,
    frame_errors: Vec<ExError>,
    /// Progress fraction at which the merge starts
    merge_start: f64,
    aborted: bool,
}

fn resolve_items(
    variant: &SynthVariant,
    items: ItemSource,
    progress: &dyn ProgressHandler,
) -> Result<Resolved, ExError> {
    match items {
        ItemSource::Ready(items) => Ok(Resolved {
            items,
            ..Resolved::default()
        }),
        ItemSource::File {
            path,
            max_buffered_bytes,
        } => {
            let loaded = load_file(variant, &path, max_buffered_bytes)
                .map_err(|e| ExError::from(e).with_op("load_file"))?;
            Ok(Resolved {
                items: loaded.items,
                frame_errors: loaded.frame_errors,
                ..Resolved::default()
            })
        }
        ItemSource::Capture {
            transport,
            programs,
            timeout_per_item,
        } => {
            let capture_progress = ScaledProgress::new(progress, 0.0, CAPTURE_SHARE);
            let captured = capture_programs(
                transport.as_ref(),
                variant,
                programs,
                timeout_per_item,
                &capture_progress,
            )
            .map_err(|e| ExError::from(e).with_op("capture_programs"))?;
            if !captured.missing.is_empty() {
                tracing::warn!(
                    variant = variant.name(),
                    missing = captured.missing.len(),
                    "some programs were not received"
                );
            }
            Ok(Resolved {
                items: captured.messages.into_iter().map(IngestItem::Raw).collect(),
                frame_errors: Vec::new(),
                merge_start: CAPTURE_SHARE,
                aborted: captured.aborted,
            })
        }
    }
}

/// Resolve the request's items and merge them
fn run_ingest(
    request: IngestRequest,
    store: &dyn PatchStore,
    gate: &WriteGate,
    progress: &dyn ProgressHandler,
) -> Result<MergeOutcome, ExError> {
    let resolved = resolve_items(&request.variant, request.items, progress)?;
    if resolved.aborted {
        tracing::info!(variant = request.variant.name(), "ingestion cancelled before merge");
        return Ok(MergeOutcome {
            aborted: true,
            frame_errors: resolved.frame_errors,
            ..MergeOutcome::default()
        });
    }
    let merge_progress =
        ScaledProgress::new(progress, resolved.merge_start, 1.0 - resolved.merge_start);
    let mut outcome = merge_patches(
        &request.variant,
        &request.source,
        resolved.items,
        store,
        gate,
        &merge_progress,
    )?;
    outcome.frame_errors = resolved.frame_errors;
    Ok(outcome)
}

/// Forwards pipeline progress to the channel and reads the cancel flag
struct ChannelProgress {
    run_id: RunId,
    events: Sender<IngestEvent>,
    cancel: Arc<AtomicBool>,
}

impl ProgressHandler for ChannelProgress {
    fn set_progress(&self, fraction: f64) {
        // A dropped receiver only means nobody watches the progress
        let _ = self.events.send(IngestEvent::Progress {
            run_id: self.run_id.clone(),
            fraction,
        });
    }

    fn should_abort(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

/// Handle of a running ingestion
pub struct IngestHandle {
    run_id: RunId,
    cancel: Arc<AtomicBool>,
    events: Receiver<IngestEvent>,
    thread: Option<JoinHandle<()>>,
}

impl IngestHandle {
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Request an abort; honoured at the next item boundary
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn events(&self) -> &Receiver<IngestEvent> {
        &self.events
    }

    /// Block until the run ends
    ///
    /// # Errors
    ///
    /// Returns the pipeline error, or `Internal` when the worker died
    /// without reporting.
    pub fn wait(mut self) -> Result<MergeOutcome, ExError> {
        let result = loop {
            match self.events.recv() {
                Ok(IngestEvent::Progress { .. }) => continue,
                Ok(IngestEvent::Finished { outcome, .. }) => break Ok(outcome),
                Ok(IngestEvent::Failed { error, .. }) => break Err(error),
                Err(flume::RecvError::Disconnected) => {
                    break Err(ExError::new(ExErrorKind::Internal)
                        .with_op("ingest_wait")
                        .with_message(format!("ingestion {} ended without result", self.run_id)))
                }
            }
        };
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        result
    }
}

impl std::fmt::Debug for IngestHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestHandle")
            .field("run_id", &self.run_id)
            .field("cancelled", &self.cancel.load(Ordering::SeqCst))
            .finish()
    }
}

/// Run `request` on a background thread; returns immediately
///
/// # Errors
///
/// Returns `Internal` when the worker thread cannot be spawned.
pub fn spawn_ingest(
    request: IngestRequest,
    store: Arc<dyn PatchStore>,
    gate: Arc<WriteGate>,
) -> Result<IngestHandle, ExError> {
    let run_id = RunId::new();
    let cancel = Arc::new(AtomicBool::new(false));
    let (tx, rx) = flume::unbounded();

    let progress = ChannelProgress {
        run_id: run_id.clone(),
        events: tx.clone(),
        cancel: Arc::clone(&cancel),
    };
    let worker_run_id = run_id.clone();

    let thread = std::thread::Builder::new()
        .name(format!("ingest-{}", request.variant.name()))
        .spawn(move || {
            tracing::debug!(run_id = %worker_run_id, source = %request.source.label, "ingestion started");
            let result = run_ingest(request, store.as_ref(), &gate, &progress);
            let event = match result {
                Ok(outcome) => IngestEvent::Finished {
                    run_id: worker_run_id,
                    outcome,
                },
                Err(error) => IngestEvent::Failed {
                    run_id: worker_run_id,
                    error,
                },
            };
            let _ = tx.send(event);
        })
        .map_err(|e| {
            ExError::new(ExErrorKind::Internal)
                .with_op("spawn_ingest")
                .with_message(e.to_string())
        })?;

    Ok(IngestHandle {
        run_id,
        cancel,
        events: rx,
        thread: Some(thread),
    })
}
