//! Logging macros for patch operations
//!
//! Operation records carry `component`, `op` and `event`, so start and end of
//! one merge, store write or query can be paired. Item, abort and fallback
//! records additionally name the synth variant they concern.

/// Log the start of an operation
///
/// ```
/// # use patchvault_core::log_op_start;
/// log_op_start!("merge_patches");
/// log_op_start!("merge_patches", variant = "OB-6", items = 3usize);
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = patchvault_core_types::schema::EVENT_START,
            $($($field)*)?
        )
    };
}

/// Log the successful end of an operation; `duration_ms` is mandatory
///
/// ```
/// # use patchvault_core::log_op_end;
/// log_op_end!("merge_patches", duration_ms = 42u64, inserted = 2usize);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = patchvault_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($($field)*)?
        )
    };
}

/// Log a failed operation with its `ERR_` code
///
/// Accepts anything convertible into `ExError`.
///
/// ```ignore
/// # use patchvault_core::{log_op_error, errors::PatchVaultError};
/// let err = PatchVaultError::Store { message: "disk full".to_string() };
/// log_op_error!("upsert_batch", err, duration_ms = 10u64);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = patchvault_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            message = %ex_err,
            $($($field)*)?
        );
    }};
}

/// Log one batch item or file frame that was dropped from a run
///
/// `$err` is an `&ExError`; the batch keeps going.
#[macro_export]
macro_rules! log_item_failed {
    ($op:expr, $variant:expr, $index:expr, $err:expr) => {{
        let ex_err: &$crate::errors::ExError = $err;
        tracing::warn!(
            component = module_path!(),
            op = $op,
            event = patchvault_core_types::schema::EVENT_ITEM_FAILED,
            variant = $variant,
            item_index = $index,
            err_code = ex_err.code(),
            message = %ex_err,
        );
    }};
}

/// Log a run stopped on request before item `$index`
#[macro_export]
macro_rules! log_run_aborted {
    ($op:expr, $variant:expr, $index:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = patchvault_core_types::schema::EVENT_ABORTED,
            variant = $variant,
            item_index = $index,
        )
    };
}

/// Log a capability answer replaced by its default
///
/// With an error the capability failed and the record is a warning; without
/// one the variant simply lacks the capability.
#[macro_export]
macro_rules! log_capability_fallback {
    ($caller:expr, $variant:expr, $capability:expr) => {
        tracing::debug!(
            caller = $caller,
            variant = $variant,
            capability = $capability,
            event = patchvault_core_types::schema::EVENT_FALLBACK,
            "capability not supported, using default"
        )
    };
    ($caller:expr, $variant:expr, $capability:expr, $err:expr) => {
        tracing::warn!(
            caller = $caller,
            variant = $variant,
            capability = $capability,
            event = patchvault_core_types::schema::EVENT_FALLBACK,
            error = %$err,
            "capability call failed, using default"
        )
    };
}
