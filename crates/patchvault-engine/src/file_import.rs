//! Reading sysex files into ingestion items

use std::path::Path;

use patchvault_core::codec::assembler::split_frames;
use patchvault_core::errors::{ExError, PatchVaultError, Result};
use patchvault_core::log_item_failed;
use patchvault_core::ingest::IngestItem;
use patchvault_core::{DataType, MidiMessage, SynthVariant};

const OP: &str = "load_file";

/// Frames of one file, ready for the pipeline
#[derive(Debug)]
pub struct LoadedFile {
    pub items: Vec<IngestItem>,
    /// Frames that could not be reassembled or decoded, in file order; the
    /// item index of each is its frame position
    pub frame_errors: Vec<ExError>,
}

/// Split `path` into frames for `variant`
///
/// Variants that load data files decode the frames themselves and only keep
/// program dumps; others hand every complete frame to the pipeline.
///
/// # Errors
///
/// Returns `Io` when the file cannot be read.
pub fn load_file(variant: &SynthVariant, path: &Path, max_buffered_bytes: usize) -> Result<LoadedFile> {
    let bytes = std::fs::read(path).map_err(|e| PatchVaultError::Io {
        message: format!("cannot read {}: {}", path.display(), e),
    })?;
    let file = path.display().to_string();

    let frames: Vec<Result<IngestItem>> = match variant.data_file_load() {
        Some(loader) => {
            let stream = [MidiMessage::new(bytes)];
            loader
                .load_data(&stream, DataType::Patch, max_buffered_bytes)
                .into_iter()
                .map(|loaded| loaded.map(IngestItem::Decoded))
                .collect()
        }
        None => split_frames(&bytes, max_buffered_bytes)
            .into_iter()
            .map(|frame| frame.map(IngestItem::Raw))
            .collect(),
    };

    let mut items = Vec::new();
    let mut frame_errors = Vec::new();
    for (index, frame) in frames.into_iter().enumerate() {
        match frame {
            Ok(item) => items.push(item),
            Err(e) => {
                let error = ExError::from(e)
                    .with_op(OP)
                    .with_variant(variant.name())
                    .with_item_index(index);
                log_item_failed!(OP, variant.name(), index, &error);
                frame_errors.push(error);
            }
        }
    }

    tracing::info!(
        variant = variant.name(),
        file = %file,
        items = items.len(),
        frame_errors = frame_errors.len(),
        "file loaded"
    );
    Ok(LoadedFile {
        items,
        frame_errors,
    })
}
