use crate::model::{ImportSource, ProgramNumber};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Logical kind of a decoded data block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Patch,
    GlobalSettings,
    AlternateTuning,
    /// Variant-specific data type id
    Other(u32),
}

impl DataType {
    /// Numeric id used on storage and by the data file loader
    pub fn id(self) -> u32 {
        match self {
            DataType::Patch => 0,
            DataType::GlobalSettings => 1,
            DataType::AlternateTuning => 2,
            DataType::Other(id) => id,
        }
    }

    pub fn from_id(id: u32) -> Self {
        match id {
            0 => DataType::Patch,
            1 => DataType::GlobalSettings,
            2 => DataType::AlternateTuning,
            other => DataType::Other(other),
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Patch => write!(f, "Patch"),
            DataType::GlobalSettings => write!(f, "Global Settings"),
            DataType::AlternateTuning => write!(f, "Alternate Tuning"),
            DataType::Other(id) => write!(f, "Data type {}", id),
        }
    }
}

/// Byte range of one independently addressable layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSpan {
    pub title: String,
    pub start: usize,
    pub len: usize,
}

impl LayerSpan {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// A decoded data block as it came off the wire
///
/// Built once by a codec and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchData {
    data_type: DataType,
    bytes: Vec<u8>,
    placement: Option<ProgramNumber>,
    name: String,
    layers: Vec<LayerSpan>,
}

impl PatchData {
    pub fn new(data_type: DataType, bytes: Vec<u8>, name: impl Into<String>) -> Self {
        Self {
            data_type,
            bytes,
            placement: None,
            name: name.into(),
            layers: Vec::new(),
        }
    }

    pub fn with_placement(mut self, placement: ProgramNumber) -> Self {
        self.placement = Some(placement);
        self
    }

    pub fn with_layers(mut self, layers: Vec<LayerSpan>) -> Self {
        self.layers = layers;
        self
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn placement(&self) -> Option<ProgramNumber> {
        self.placement
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layers(&self) -> &[LayerSpan] {
        &self.layers
    }
}

/// Hex-encoded SHA-256 identity of a patch
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex digits, enough to tell patches apart in listings
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored patch: decoded data plus the metadata users edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchHolder {
    variant: String,
    fingerprint: Fingerprint,
    patch: PatchData,
    source: ImportSource,
    pub favorite: bool,
    pub categories: BTreeSet<String>,
    pub current_layer: usize,
}

impl PatchHolder {
    pub fn new(
        variant: impl Into<String>,
        fingerprint: Fingerprint,
        patch: PatchData,
        source: ImportSource,
    ) -> Self {
        Self {
            variant: variant.into(),
            fingerprint,
            patch,
            source,
            favorite: false,
            categories: BTreeSet::new(),
            current_layer: 0,
        }
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn patch(&self) -> &PatchData {
        &self.patch
    }

    pub fn source(&self) -> &ImportSource {
        &self.source
    }

    pub fn name(&self) -> &str {
        self.patch.name()
    }

    /// Same identity and metadata, newer data block
    pub(crate) fn with_patch(mut self, patch: PatchData) -> Self {
        self.patch = patch;
        self
    }

    /// Store key `<variant>/<fingerprint>`
    pub fn key(&self) -> String {
        format!("{}/{}", self.variant, self.fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_ids_round_trip() {
        for id in 0..6 {
            assert_eq!(DataType::from_id(id).id(), id);
        }
        assert_eq!(DataType::from_id(2), DataType::AlternateTuning);
    }

    #[test]
    fn test_fingerprint_short() {
        let fp = Fingerprint::from_hex("0123456789abcdef0123");
        assert_eq!(fp.short(), "0123456789ab");
        assert_eq!(Fingerprint::from_hex("ab").short(), "ab");
    }

    #[test]
    fn test_holder_key_and_defaults() {
        let source = ImportSource::from_file("bank.syx");
        let holder = PatchHolder::new(
            "OB-6",
            Fingerprint::from_hex("ff"),
            PatchData::new(DataType::Patch, vec![1, 2, 3], "Lead"),
            source,
        );
        assert_eq!(holder.key(), "OB-6/ff");
        assert!(!holder.favorite);
        assert!(holder.categories.is_empty());
        assert_eq!(holder.current_layer, 0);
        assert_eq!(holder.name(), "Lead");
    }
}
