//! The engine ties the store, the variant registry and the transport
//! together for one interactive session.
//!
//! Long running work (ingestion, page queries) starts on a background thread
//! and the calling method returns immediately. Page results are collected on
//! an internal channel and handed out by [`Engine::drain_pages`] only when they
//! still match the session state.

use std::ops::Range;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use flume::{Receiver, Sender};
use patchvault_core::config::PatchVaultConfig;
use patchvault_core::context::{SelectOutcome, SessionContext};
use patchvault_core::errors::{ExError, ExErrorKind, PatchVaultError};
use patchvault_core::ingest::{ProgressHandler, WriteGate};
use patchvault_core::transport::{send_all, Transport};
use patchvault_core::{Fingerprint, MidiChannel, PatchFilter, PatchStore, SynthVariant};
use patchvault_core_types::QueryId;
use patchvault_store::SqlitePatchStore;

use crate::capture::detect_channel;
use crate::registry::VariantRegistry;
use crate::tasks::{
    spawn_ingest, spawn_page_query, IngestHandle, IngestRequest, PageRequest, PageResult,
};

/// How long to wait for each requested program
pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_millis(500);

/// Answer of one variant during auto-detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub variant: String,
    /// `None` when the synth did not answer or could not be asked
    pub channel: Option<MidiChannel>,
}

pub struct Engine {
    store: Arc<dyn PatchStore>,
    gate: Arc<WriteGate>,
    registry: VariantRegistry,
    transport: Option<Arc<dyn Transport>>,
    max_buffered_bytes: usize,
    pages_tx: Sender<PageResult>,
    pages_rx: Receiver<PageResult>,
}

impl Engine {
    pub fn new(
        store: Arc<dyn PatchStore>,
        registry: VariantRegistry,
        max_buffered_bytes: usize,
    ) -> Self {
        let (pages_tx, pages_rx) = flume::unbounded();
        Self {
            store,
            gate: Arc::new(WriteGate::new()),
            registry,
            transport: None,
            max_buffered_bytes,
            pages_tx,
            pages_rx,
        }
    }

    /// Open the SQLite store named by `config` and register the native variants
    ///
    /// # Errors
    ///
    /// Returns `Persistence` or `Io` when the store cannot be opened or
    /// migrated.
    pub fn from_config(config: &PatchVaultConfig) -> Result<Self, ExError> {
        let store = SqlitePatchStore::open(&config.store.path)?;
        tracing::info!(path = %config.store.path.display(), "store opened");
        Ok(Self::new(
            Arc::new(store),
            VariantRegistry::from_config(config),
            config.ingest.max_buffered_bytes,
        ))
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn store(&self) -> &dyn PatchStore {
        self.store.as_ref()
    }

    pub fn registry(&self) -> &VariantRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut VariantRegistry {
        &mut self.registry
    }

    /// # Errors
    ///
    /// Returns `NotFound` for an unknown variant.
    pub fn variant(&self, name: &str) -> Result<Arc<SynthVariant>, ExError> {
        self.registry.get(name)
    }

    fn transport(&self, op: &str) -> Result<&Arc<dyn Transport>, ExError> {
        self.transport.as_ref().ok_or_else(|| {
            ExError::new(ExErrorKind::Transport)
                .with_op(op)
                .with_message("No transport attached")
        })
    }

    /// Read `path` and ingest its patches in the background
    ///
    /// The file is read on the worker thread. A file that cannot be read ends
    /// the run with an `Io` error; frames that cannot be reassembled or
    /// decoded are listed in the outcome's `frame_errors`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown variant, or `Internal` when the
    /// worker cannot be started.
    pub fn load_file(&self, variant: &str, path: &Path) -> Result<IngestHandle, ExError> {
        let variant = self.variant(variant)?;
        let request = IngestRequest::file(variant, path.to_path_buf(), self.max_buffered_bytes);
        spawn_ingest(request, Arc::clone(&self.store), Arc::clone(&self.gate))
    }

    /// Capture `programs` from the connected synth and ingest them in the
    /// background
    ///
    /// # Errors
    ///
    /// Returns `Transport` without a transport, `NotFound` for an unknown
    /// variant, or `Internal` when the worker cannot be started.
    pub fn import_now(
        &self,
        variant: &str,
        programs: Range<u32>,
        timeout_per_item: Duration,
    ) -> Result<IngestHandle, ExError> {
        let transport = Arc::clone(self.transport("import_now")?);
        let variant = self.variant(variant)?;
        let request = IngestRequest::capture(variant, transport, programs, timeout_per_item);
        spawn_ingest(request, Arc::clone(&self.store), Arc::clone(&self.gate))
    }

    /// Ask the synth which channel it listens on
    ///
    /// # Errors
    ///
    /// Returns `Transport` without a transport or when sending fails.
    pub fn detect_device(
        &self,
        variant: &str,
        timeout: Duration,
    ) -> Result<Option<MidiChannel>, ExError> {
        let transport = self.transport("detect_device")?;
        let variant = self.variant(variant)?;
        detect_channel(transport.as_ref(), &variant, timeout)
            .map_err(|e| ExError::from(e).with_op("detect_device"))
    }

    /// Run device detection for every active variant, one after the other
    ///
    /// Channels found are recorded in the registry, so later requests address
    /// the synth on them. A variant that cannot be asked (no output endpoint,
    /// send failure) is logged and reported without a channel; the others
    /// are still tried. `progress` is polled before each variant.
    ///
    /// # Errors
    ///
    /// Returns `Transport` without a transport.
    pub fn auto_detect_all(
        &self,
        timeout: Duration,
        progress: &dyn ProgressHandler,
    ) -> Result<Vec<Detection>, ExError> {
        let transport = self.transport("auto_detect_all")?;
        let active = self.registry.active();
        let mut detections = Vec::with_capacity(active.len());
        for (done, variant) in active.iter().enumerate() {
            if progress.should_abort() {
                tracing::info!(variant = variant.name(), "auto-detection cancelled");
                break;
            }
            let channel = match detect_channel(transport.as_ref(), variant, timeout) {
                Ok(channel) => channel,
                Err(e) => {
                    tracing::warn!(variant = variant.name(), error = %e, "detection skipped");
                    None
                }
            };
            if let Some(channel) = channel {
                self.registry.record_channel(variant.name(), channel)?;
            }
            detections.push(Detection {
                variant: variant.name().to_string(),
                channel,
            });
            progress.set_progress((done + 1) as f64 / active.len() as f64);
        }
        Ok(detections)
    }

    /// Start fetching one page for the session's active variant
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when no variant is active.
    pub fn fetch_page(
        &self,
        ctx: &SessionContext,
        import_source: Option<String>,
        favorites_only: bool,
        skip: usize,
        limit: usize,
    ) -> Result<QueryId, ExError> {
        let tag = ctx.query_tag().ok_or_else(|| {
            ExError::new(ExErrorKind::InvalidInput)
                .with_op("fetch_page")
                .with_message("No active synth selected")
        })?;
        let mut filter = PatchFilter::for_variant(tag.variant.clone());
        filter.import_source = import_source;
        filter.favorites_only = favorites_only;
        let request = PageRequest {
            filter,
            skip,
            limit,
        };
        spawn_page_query(
            Arc::clone(&self.store),
            request,
            tag,
            self.pages_tx.clone(),
        )
    }

    /// Page results that arrived so far and still belong to `ctx`
    pub fn drain_pages(&self, ctx: &SessionContext) -> Vec<PageResult> {
        self.pages_rx
            .try_iter()
            .filter(|result| self.keep(ctx, result))
            .collect()
    }

    /// Wait up to `timeout` for the next page result that belongs to `ctx`
    pub fn recv_page(&self, ctx: &SessionContext, timeout: Duration) -> Option<PageResult> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            let result = self.pages_rx.recv_timeout(remaining).ok()?;
            if self.keep(ctx, &result) {
                return Some(result);
            }
        }
    }

    fn keep(&self, ctx: &SessionContext, result: &PageResult) -> bool {
        let accepted = ctx.accepts(&result.tag);
        if !accepted {
            tracing::debug!(
                query_id = %result.query_id,
                variant = %result.tag.variant,
                generation = result.tag.generation,
                "discarding stale page"
            );
        }
        accepted
    }

    /// Select a stored patch of the active variant and send it to the synth
    ///
    /// Nothing is sent when no transport is attached or the variant has no
    /// output endpoint; the outcome is returned either way.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` without an active variant, `NotFound` when the
    /// patch is not stored, or the codec or transport error.
    pub fn select_patch(
        &self,
        ctx: &mut SessionContext,
        fingerprint: &Fingerprint,
    ) -> Result<SelectOutcome, ExError> {
        let active = ctx.active_variant().map(str::to_string).ok_or_else(|| {
            ExError::new(ExErrorKind::InvalidInput)
                .with_op("select_patch")
                .with_message("No active synth selected")
        })?;
        let variant = self.variant(&active)?;
        let holder = self.store.get(&active, fingerprint)?.ok_or_else(|| {
            ExError::from(PatchVaultError::PatchNotFound {
                variant: active.clone(),
                fingerprint: fingerprint.to_string(),
            })
        })?;

        let outcome = ctx
            .select_patch(&variant, holder)
            .map_err(|e| ExError::from(e).with_op("select_patch"))?;

        match (&self.transport, variant.output.as_deref()) {
            (Some(transport), Some(endpoint)) => {
                send_all(transport.as_ref(), endpoint, outcome.messages())
                    .map_err(|e| ExError::from(e).with_op("select_patch"))?;
            }
            _ => {
                tracing::debug!(variant = variant.name(), "no output attached, selection not sent");
            }
        }
        Ok(outcome)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("transport", &self.transport.is_some())
            .field("max_buffered_bytes", &self.max_buffered_bytes)
            .finish_non_exhaustive()
    }
}
