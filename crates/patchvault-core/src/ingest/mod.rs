//! Merge / ingestion pipeline
//!
//! Reconciles a batch of captured or file-loaded patches against the store.
//! See [`pipeline::merge_patches`].

pub mod pipeline;
pub mod write_gate;

pub use pipeline::merge_patches;
pub use write_gate::{WriteGate, WriteGuard};

use crate::errors::ExError;
use crate::midi::MidiMessage;
use crate::model::{PatchData, PatchHolder};

/// Progress collaborator of a running ingestion
pub trait ProgressHandler: Send + Sync {
    /// Fraction of items processed, `0.0..=1.0`
    fn set_progress(&self, fraction: f64);
    /// Polled at every item boundary
    fn should_abort(&self) -> bool;
}

/// Progress handler that ignores progress and never aborts
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressHandler for NoProgress {
    fn set_progress(&self, _fraction: f64) {}

    fn should_abort(&self) -> bool {
        false
    }
}

/// Reports an inner run's progress as the `[start, start + span]` part of
/// an outer one
pub struct ScaledProgress<'a> {
    inner: &'a dyn ProgressHandler,
    start: f64,
    span: f64,
}

impl<'a> ScaledProgress<'a> {
    pub fn new(inner: &'a dyn ProgressHandler, start: f64, span: f64) -> Self {
        Self { inner, start, span }
    }
}

impl ProgressHandler for ScaledProgress<'_> {
    fn set_progress(&self, fraction: f64) {
        self.inner
            .set_progress(self.start + self.span * fraction.clamp(0.0, 1.0));
    }

    fn should_abort(&self) -> bool {
        self.inner.should_abort()
    }
}

/// One pipeline input
#[derive(Debug, Clone)]
pub enum IngestItem {
    /// Undecoded dump, decoded with the variant's codec
    Raw(MidiMessage),
    Decoded(PatchData),
}

impl From<MidiMessage> for IngestItem {
    fn from(message: MidiMessage) -> Self {
        IngestItem::Raw(message)
    }
}

impl From<PatchData> for IngestItem {
    fn from(data: PatchData) -> Self {
        IngestItem::Decoded(data)
    }
}

/// An item that could not be decoded or fingerprinted
#[derive(Debug, Clone)]
pub struct ItemFailure {
    /// Zero-based position in the input batch
    pub index: usize,
    pub error: ExError,
}

/// Result of one pipeline run
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failures: Vec<ItemFailure>,
    /// Holders written by this run, in input order
    pub affected: Vec<PatchHolder>,
    /// The progress handler requested an abort; nothing was written
    pub aborted: bool,
    /// Stream frames rejected before decoding, e.g. over the buffer limit
    pub frame_errors: Vec<ExError>,
}

impl MergeOutcome {
    pub fn new_or_changed(&self) -> usize {
        self.inserted + self.updated
    }

    pub fn is_empty(&self) -> bool {
        self.affected.is_empty()
    }
}
