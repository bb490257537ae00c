//! Live capture from a connected synth
//!
//! An [`InboundCollector`] routes the variant's inbound messages into a
//! channel for as long as it lives. Device detection and program capture
//! send requests through the transport and wait for matching answers.

use std::ops::Range;
use std::time::{Duration, Instant};

use flume::Receiver;
use patchvault_core::capability::dispatch;
use patchvault_core::errors::{PatchVaultError, Result};
use patchvault_core::ingest::ProgressHandler;
use patchvault_core::model::{DataType, MidiChannel};
use patchvault_core::transport::{send_all, HandlerId, Transport};
use patchvault_core::{CapabilityTag, MidiMessage, SynthVariant};

const CALLER: &str = "capture";

/// Inbound messages of one variant, unregistered on drop
///
/// Collectors of the same variant coexist; each sees every message.
pub struct InboundCollector<'a> {
    transport: &'a dyn Transport,
    id: HandlerId,
    messages: Receiver<(String, MidiMessage)>,
}

impl<'a> InboundCollector<'a> {
    pub fn register(transport: &'a dyn Transport, variant: &str) -> Self {
        let (tx, rx) = flume::unbounded();
        let id = transport.register_inbound_handler(
            variant,
            Box::new(move |endpoint: &str, message: &MidiMessage| {
                let _ = tx.send((endpoint.to_string(), message.clone()));
            }),
        );
        Self {
            transport,
            id,
            messages: rx,
        }
    }

    /// Next message arriving before `deadline`
    pub fn next_before(&self, deadline: Instant) -> Option<(String, MidiMessage)> {
        let remaining = deadline.checked_duration_since(Instant::now())?;
        self.messages.recv_timeout(remaining).ok()
    }

    /// Everything received so far
    pub fn drain(&self) -> Vec<MidiMessage> {
        self.messages.try_iter().map(|(_, message)| message).collect()
    }
}

impl Drop for InboundCollector<'_> {
    fn drop(&mut self) {
        self.transport.unregister_inbound_handler(self.id);
    }
}

fn output_of(variant: &SynthVariant) -> Result<&str> {
    variant
        .output
        .as_deref()
        .ok_or_else(|| PatchVaultError::Config {
            message: format!("no output endpoint configured for {}", variant.name()),
        })
}

/// Send the variant's detection messages and wait for a valid answer
///
/// Returns `None` when nothing recognisable arrived within `timeout`.
///
/// # Errors
///
/// Returns `Config` without an output endpoint, or the transport error.
pub fn detect_channel(
    transport: &dyn Transport,
    variant: &SynthVariant,
    timeout: Duration,
) -> Result<Option<MidiChannel>> {
    let endpoint = output_of(variant)?;
    let collector = InboundCollector::register(transport, variant.name());
    let requests = variant.synth().device_detect(variant.channel_or_default())?;
    send_all(transport, endpoint, &requests)?;

    let deadline = Instant::now() + timeout;
    while let Some((_, message)) = collector.next_before(deadline) {
        if let Some(channel) = variant.synth().channel_if_valid_device_response(&message) {
            tracing::info!(
                variant = variant.name(),
                channel = channel.to_one_based(),
                "device detected"
            );
            return Ok(Some(channel));
        }
    }
    tracing::info!(variant = variant.name(), "no device answered");
    Ok(None)
}

/// Programs fetched from the synth
#[derive(Debug, Default)]
pub struct CaptureResult {
    /// Program dumps in request order
    pub messages: Vec<MidiMessage>,
    /// Item numbers that were not answered in time
    pub missing: Vec<u32>,
    /// Stopped early on request; `messages` holds what arrived before
    pub aborted: bool,
}

/// Request each program of `items` and collect the dumps
///
/// `progress` is told the fraction of requests made and is polled before
/// each request, so a cancel never waits out more than one item's timeout.
///
/// # Errors
///
/// Returns `Capability` when the variant cannot request data items,
/// `Config` without an output endpoint, or the transport error.
pub fn capture_programs(
    transport: &dyn Transport,
    variant: &SynthVariant,
    items: Range<u32>,
    timeout_per_item: Duration,
    progress: &dyn ProgressHandler,
) -> Result<CaptureResult> {
    let loader = variant.data_file_load().ok_or_else(|| {
        PatchVaultError::Capability(patchvault_core::CapabilityError::new(
            CapabilityTag::DataFileLoad,
            format!("{} cannot request programs", variant.name()),
        ))
    })?;
    let endpoint = output_of(variant)?;
    let available = loader.number_of_data_items(DataType::Patch)?;
    let items = items.start..items.end.min(available);
    let channel = variant.channel_or_default();
    tracing::debug!(
        variant = variant.name(),
        banks = dispatch::number_of_banks(variant, CALLER),
        first = items.start,
        last = items.end,
        "capturing programs"
    );

    let collector = InboundCollector::register(transport, variant.name());
    let mut result = CaptureResult::default();
    let total = items.len().max(1) as f64;
    for (done, item) in items.enumerate() {
        if progress.should_abort() {
            tracing::info!(variant = variant.name(), item, "capture cancelled");
            result.aborted = true;
            break;
        }
        let requests = loader.request_data_item(item, DataType::Patch, channel)?;
        send_all(transport, endpoint, &requests)?;

        let deadline = Instant::now() + timeout_per_item;
        let answered = loop {
            match collector.next_before(deadline) {
                Some((_, message)) if loader.is_data_file(&message, DataType::Patch) => {
                    break Some(message)
                }
                Some(_) => continue,
                None => break None,
            }
        };
        match answered {
            Some(message) => result.messages.push(message),
            None => {
                tracing::warn!(variant = variant.name(), item, "no answer for program request");
                result.missing.push(item);
            }
        }
        progress.set_progress((done + 1) as f64 / total);
    }
    Ok(result)
}
