//! Engine-level action commands.

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use patchvault_core::config::PatchVaultConfig;
use patchvault_core::errors::ExError;
use patchvault_core::ingest::NoProgress;
use patchvault_core::{log_op_end, log_op_error, log_op_start};
use patchvault_core::{Fingerprint, MidiChannel};

use crate::engine::{Detection, Engine};
use crate::tasks::IngestHandle;

/// Commands that write to the store or talk to a synth.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Ingest every program dump found in a sysex file.
    ImportFile { variant: String, path: PathBuf },
    /// Request programs from the connected synth and ingest them.
    ImportFromSynth {
        variant: String,
        programs: Range<u32>,
        timeout_per_item: Duration,
    },
    SetFavorite {
        variant: String,
        fingerprint: Fingerprint,
        favorite: bool,
    },
    /// Find the channel the synth listens on.
    DetectDevice { variant: String, timeout: Duration },
    /// Detect every active synth; found channels are written to `save_to`
    /// when given.
    AutoDetect {
        timeout: Duration,
        save_to: Option<PathBuf>,
    },
}

/// Result of applying an engine command.
#[derive(Debug)]
pub enum EngineCommandResult {
    /// Ingestion runs in the background; follow it through the handle.
    IngestStarted(IngestHandle),
    FavoriteSet,
    DeviceDetected(Option<MidiChannel>),
    DevicesDetected(Vec<Detection>),
}

fn op_name(cmd: &EngineCommand) -> &'static str {
    match cmd {
        EngineCommand::ImportFile { .. } => "import_file",
        EngineCommand::ImportFromSynth { .. } => "import_from_synth",
        EngineCommand::SetFavorite { .. } => "set_favorite",
        EngineCommand::DetectDevice { .. } => "detect_device",
        EngineCommand::AutoDetect { .. } => "auto_detect",
    }
}

/// Store the channels of `detections` in the configuration file at `path`
fn save_detections(path: &Path, detections: &[Detection]) -> Result<(), ExError> {
    let mut config =
        PatchVaultConfig::load(path).map_err(|e| ExError::from(e).with_op("auto_detect"))?;
    for detection in detections {
        if let Some(channel) = detection.channel {
            config.record_channel(&detection.variant, channel);
        }
    }
    config
        .save(path)
        .map_err(|e| ExError::from(e).with_op("auto_detect"))?;
    tracing::info!(config = %path.display(), "detected channels saved");
    Ok(())
}

/// Apply an engine command.
///
/// Import commands return as soon as the background run has started.
///
/// # Errors
///
/// Returns the error of the underlying engine operation.
pub fn apply_engine_command(
    cmd: EngineCommand,
    engine: &Engine,
) -> Result<EngineCommandResult, ExError> {
    let op = op_name(&cmd);
    log_op_start!(op);
    let start = Instant::now();

    let result = match cmd {
        EngineCommand::ImportFile { variant, path } => engine
            .load_file(&variant, &path)
            .map(EngineCommandResult::IngestStarted),
        EngineCommand::ImportFromSynth {
            variant,
            programs,
            timeout_per_item,
        } => engine
            .import_now(&variant, programs, timeout_per_item)
            .map(EngineCommandResult::IngestStarted),
        EngineCommand::SetFavorite {
            variant,
            fingerprint,
            favorite,
        } => engine
            .variant(&variant)
            .and_then(|v| engine.store().set_favorite(v.name(), &fingerprint, favorite))
            .map(|()| EngineCommandResult::FavoriteSet),
        EngineCommand::DetectDevice { variant, timeout } => engine
            .detect_device(&variant, timeout)
            .map(EngineCommandResult::DeviceDetected),
        EngineCommand::AutoDetect { timeout, save_to } => engine
            .auto_detect_all(timeout, &NoProgress)
            .and_then(|detections| {
                if let Some(path) = &save_to {
                    save_detections(path, &detections)?;
                }
                Ok(EngineCommandResult::DevicesDetected(detections))
            }),
    };

    let elapsed = start.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => {
            log_op_end!(op, duration_ms = elapsed);
        }
        Err(e) => {
            log_op_error!(op, e.clone(), duration_ms = elapsed);
        }
    }
    result
}
