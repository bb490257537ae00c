//! PatchVault Core - patch management for heterogeneous hardware synthesizers
//!
//! This crate provides:
//! - The capability model: optional per-synth contracts queried by tag, with
//!   a dispatcher that falls back to safe defaults
//! - Bit-exact sysex codecs for the native variants and the scripted-variant bridge
//! - Fingerprinting for deduplication across imports
//! - The merge/ingestion pipeline against the [`store::PatchStore`] contract
//! - A layer-aware patch diff engine
//! - The session context that replaces "current synth / current patch" globals
//!
//! Persistence engines live outside this crate; only the in-memory store is
//! shipped here.

pub mod capability;
pub mod codec;
pub mod config;
pub mod context;
pub mod diff;
pub mod errors;
pub mod identity;
pub mod ingest;
pub mod logging_facility;
pub mod midi;
pub mod model;
pub mod store;
pub mod transport;
pub mod variants;

// Re-export commonly used types
pub use capability::{CapabilitySet, CapabilityTag};
pub use codec::Synth;
pub use context::{SelectOutcome, SessionContext};
pub use errors::{CapabilityError, ExError, ExErrorKind, PatchVaultError, Result};
pub use identity::fingerprint;
pub use ingest::{
    merge_patches, IngestItem, MergeOutcome, ProgressHandler, ScaledProgress, WriteGate,
};
pub use midi::MidiMessage;
pub use model::{
    BankNumber, DataType, Fingerprint, ImportSource, MidiChannel, PatchData, PatchHolder,
    ProgramNumber,
};
pub use store::{PatchFilter, PatchStore};
pub use variants::SynthVariant;
