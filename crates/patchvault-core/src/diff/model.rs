//! Patch diff output types.
//!
//! Offsets are absolute positions in the decoded patch data, so entries of
//! different layers never overlap.

use serde::{Deserialize, Serialize};

/// What the comparison looks at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffMode {
    /// Every decoded byte, names included
    #[default]
    AllParameters,
    /// Skip parameters that do not affect the sound
    IgnoreNames,
}

/// Location of one difference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffField {
    /// A named parameter of the variant's layout
    Parameter {
        name: String,
        offset: usize,
        len: usize,
    },
    /// Contiguous differing bytes not covered by any parameter; `end` exclusive
    ByteRange { start: usize, end: usize },
}

impl DiffField {
    pub fn start(&self) -> usize {
        match self {
            DiffField::Parameter { offset, .. } => *offset,
            DiffField::ByteRange { start, .. } => *start,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub field: DiffField,
    /// Bytes of patch A; shorter than the field when A ends early
    pub value_a: Vec<u8>,
    pub value_b: Vec<u8>,
}

/// Differences inside one layer, or the whole patch for single-layer patches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDiff {
    pub layer: usize,
    pub title: String,
    /// Ordered by offset
    pub entries: Vec<DiffEntry>,
}

/// Result of comparing two patches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatchDiff {
    /// The patches belong to different variants
    Incomparable { variant_a: String, variant_b: String },
    Compared {
        variant: String,
        mode: DiffMode,
        name_a: String,
        name_b: String,
        layers: Vec<LayerDiff>,
    },
}

impl PatchDiff {
    /// True when compared and no entry was found
    pub fn is_identical(&self) -> bool {
        match self {
            PatchDiff::Incomparable { .. } => false,
            PatchDiff::Compared { layers, .. } => layers.iter().all(|l| l.entries.is_empty()),
        }
    }

    pub fn entry_count(&self) -> usize {
        match self {
            PatchDiff::Incomparable { .. } => 0,
            PatchDiff::Compared { layers, .. } => layers.iter().map(|l| l.entries.len()).sum(),
        }
    }
}
