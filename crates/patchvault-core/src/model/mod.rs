//! Domain model: patches, their provenance, and wire/display numbering

pub mod import_source;
pub mod numbering;
pub mod patch;

pub use import_source::ImportSource;
pub use numbering::{BankNumber, MidiChannel, ProgramNumber};
pub use patch::{DataType, Fingerprint, LayerSpan, PatchData, PatchHolder};
