//! Canonical schema constants for structured logging and events
//!
//! These constants keep field names identical between the emitting macros
//! and the code that asserts on captured events.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_RUN_ID: &str = "run_id";
pub const FIELD_QUERY_ID: &str = "query_id";

// Domain identifiers
pub const FIELD_VARIANT: &str = "variant";
pub const FIELD_FINGERPRINT: &str = "fingerprint";
pub const FIELD_ITEM_INDEX: &str = "item_index";
pub const FIELD_CAPABILITY: &str = "capability";
pub const FIELD_CALLER: &str = "caller";
pub const FIELD_IMPORT_SOURCE: &str = "import_source";

// Batch sizes
pub const FIELD_ITEMS: &str = "items";
pub const FIELD_INSERTED: &str = "inserted";
pub const FIELD_UPDATED: &str = "updated";
pub const FIELD_SKIPPED: &str = "skipped";
pub const FIELD_FAILED: &str = "failed";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
pub const EVENT_FALLBACK: &str = "fallback";
pub const EVENT_ITEM_FAILED: &str = "item_failed";
pub const EVENT_ABORTED: &str = "aborted";
