use crate::capability::CapabilityTag;
use thiserror::Error;

/// Result type alias using PatchVaultError
pub type Result<T> = std::result::Result<T, PatchVaultError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every error that crosses a component boundary is classified into one of
/// these kinds. Each kind maps to a stable code that tests, the CLI and
/// log consumers can match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Wire
    Decode,
    Transport,

    // Variant behaviour
    Capability,
    Incomparable,

    // Validation
    InvalidInput,
    NotFound,

    // Ingestion
    Cancelled,
    Concurrency,

    // Integration/IO
    Persistence,
    Io,
    Serialization,
    Config,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::Decode => "ERR_DECODE",
            ExErrorKind::Transport => "ERR_TRANSPORT",
            ExErrorKind::Capability => "ERR_CAPABILITY",
            ExErrorKind::Incomparable => "ERR_INCOMPARABLE",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::Cancelled => "ERR_CANCELLED",
            ExErrorKind::Concurrency => "ERR_CONCURRENCY",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries the classification plus the context needed to diagnose a failure
/// (operation, variant, item index within a batch, fingerprint) without
/// exposing internal representations to the interactive layer.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    variant: Option<String>,
    item_index: Option<usize>,
    fingerprint: Option<String>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            variant: None,
            item_index: None,
            fingerprint: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add synth variant context
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    /// Add the position of the failing item within its batch
    pub fn with_item_index(mut self, index: usize) -> Self {
        self.item_index = Some(index);
        self
    }

    /// Add fingerprint context
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    pub fn item_index(&self) -> Option<usize> {
        self.item_index
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(variant) = &self.variant {
            write!(f, " (variant: {})", variant)?;
        }
        if let Some(index) = self.item_index {
            write!(f, " (item: {})", index)?;
        }
        if let Some(fingerprint) = &self.fingerprint {
            write!(f, " (fingerprint: {})", fingerprint)?;
        }
        if let Some(source) = &self.source {
            write!(f, " <- {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Failure raised by a capability implementation, native or scripted
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{capability} capability failed: {message}")]
pub struct CapabilityError {
    pub capability: CapabilityTag,
    pub message: String,
}

impl CapabilityError {
    pub fn new(capability: CapabilityTag, message: impl Into<String>) -> Self {
        Self {
            capability,
            message: message.into(),
        }
    }
}

/// Domain error taxonomy for PatchVault operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatchVaultError {
    // ===== Wire =====
    /// Message shape does not match the expected dump signature
    #[error("Cannot decode message for {variant}: {reason}")]
    Decode { variant: String, reason: String },

    /// A fragmented message grew beyond the buffering limit
    #[error("Sysex frame exceeds buffer limit of {limit} bytes")]
    BufferLimitExceeded { limit: usize },

    /// Input ended in the middle of a sysex frame
    #[error("Incomplete sysex frame, {buffered} bytes buffered")]
    IncompleteFrame { buffered: usize },

    /// Hardware I/O failure reported by the transport
    #[error("Transport failure on {endpoint}: {message}")]
    Transport { endpoint: String, message: String },

    // ===== Variant behaviour =====
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// Scripted adaptation call failed or returned an unexpected value
    #[error("Script function {function} failed: {message}")]
    Script { function: String, message: String },

    /// The variant does not handle this data type
    #[error("{variant} does not support data type {data_type}")]
    UnsupportedDataType { variant: String, data_type: u32 },

    /// Patches of different variants cannot be compared
    #[error("Cannot compare a {variant_a} patch with a {variant_b} patch")]
    Incomparable { variant_a: String, variant_b: String },

    // ===== Validation =====
    /// Bank, program or channel number out of range
    #[error("Invalid {kind} number: {value}")]
    InvalidNumber { kind: &'static str, value: i64 },

    #[error("Unknown synth variant: {name}")]
    UnknownVariant { name: String },

    #[error("Patch not found: {variant}/{fingerprint}")]
    PatchNotFound { variant: String, fingerprint: String },

    // ===== Integration =====
    #[error("Store failure: {message}")]
    Store { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

/// Conversion from PatchVaultError to ExError
impl From<PatchVaultError> for ExError {
    fn from(err: PatchVaultError) -> Self {
        match err {
            PatchVaultError::Decode { variant, reason } => ExError::new(ExErrorKind::Decode)
                .with_variant(variant)
                .with_message(reason),

            PatchVaultError::BufferLimitExceeded { limit } => ExError::new(ExErrorKind::Decode)
                .with_message(format!("Sysex frame exceeds buffer limit of {} bytes", limit)),

            PatchVaultError::IncompleteFrame { buffered } => ExError::new(ExErrorKind::Decode)
                .with_message(format!("Incomplete sysex frame, {} bytes buffered", buffered)),

            PatchVaultError::Transport { endpoint, message } => {
                ExError::new(ExErrorKind::Transport)
                    .with_message(format!("{} (endpoint: {})", message, endpoint))
            }

            PatchVaultError::Capability(e) => ExError::new(ExErrorKind::Capability)
                .with_op(e.capability.name())
                .with_message(e.message),

            PatchVaultError::Script { function, message } => {
                ExError::new(ExErrorKind::Capability)
                    .with_op(function)
                    .with_message(message)
            }

            PatchVaultError::UnsupportedDataType { variant, data_type } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_variant(variant)
                    .with_message(format!("Unsupported data type {}", data_type))
            }

            PatchVaultError::Incomparable {
                variant_a,
                variant_b,
            } => ExError::new(ExErrorKind::Incomparable).with_message(format!(
                "Cannot compare a {} patch with a {} patch",
                variant_a, variant_b
            )),

            PatchVaultError::InvalidNumber { kind, value } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_message(format!("Invalid {} number: {}", kind, value))
            }

            PatchVaultError::UnknownVariant { name } => ExError::new(ExErrorKind::NotFound)
                .with_variant(name)
                .with_message("Unknown synth variant"),

            PatchVaultError::PatchNotFound {
                variant,
                fingerprint,
            } => ExError::new(ExErrorKind::NotFound)
                .with_variant(variant)
                .with_fingerprint(fingerprint)
                .with_message("Patch not found"),

            PatchVaultError::Store { message } => {
                ExError::new(ExErrorKind::Persistence).with_message(message)
            }

            PatchVaultError::Config { message } => {
                ExError::new(ExErrorKind::Config).with_message(message)
            }

            PatchVaultError::Io { message } => ExError::new(ExErrorKind::Io).with_message(message),

            PatchVaultError::Serialization { message } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
        }
    }
}

/// Conversion from serde_json::Error to PatchVaultError
impl From<serde_json::Error> for PatchVaultError {
    fn from(err: serde_json::Error) -> Self {
        PatchVaultError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for PatchVaultError {
    fn from(err: std::io::Error) -> Self {
        PatchVaultError::Io {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_codes() {
        let cases = [
            (ExErrorKind::Decode, "ERR_DECODE"),
            (ExErrorKind::Capability, "ERR_CAPABILITY"),
            (ExErrorKind::Persistence, "ERR_PERSISTENCE"),
            (ExErrorKind::Transport, "ERR_TRANSPORT"),
            (ExErrorKind::Incomparable, "ERR_INCOMPARABLE"),
            (ExErrorKind::Cancelled, "ERR_CANCELLED"),
        ];
        for (kind, expected_code) in cases {
            assert_eq!(kind.code(), expected_code, "Wrong code for {:?}", kind);
        }
    }

    #[test]
    fn test_decode_error_carries_variant() {
        let err: ExError = PatchVaultError::Decode {
            variant: "OB-6".into(),
            reason: "bad header".into(),
        }
        .into();
        assert_eq!(err.kind(), ExErrorKind::Decode);
        assert_eq!(err.variant(), Some("OB-6"));
        assert_eq!(err.message(), "bad header");
    }

    #[test]
    fn test_display_includes_item_index_and_source() {
        let inner = ExError::new(ExErrorKind::Decode).with_message("truncated");
        let err = ExError::new(ExErrorKind::Internal)
            .with_op("merge_patches")
            .with_item_index(3)
            .with_source(inner);
        let text = err.to_string();
        assert!(text.starts_with("[ERR_INTERNAL] in operation 'merge_patches'"));
        assert!(text.contains("(item: 3)"));
        assert!(text.contains("<- [ERR_DECODE]: truncated"));
    }

    #[test]
    fn test_capability_error_maps_to_capability_kind() {
        let err: ExError =
            PatchVaultError::from(CapabilityError::new(CapabilityTag::HasBanks, "boom")).into();
        assert_eq!(err.code(), "ERR_CAPABILITY");
        assert_eq!(err.op(), Some("HasBanks"));
    }
}
