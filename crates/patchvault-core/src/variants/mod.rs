//! Synth variants
//!
//! [`SynthVariant`] pairs a codec implementation with the per-installation
//! configuration (active flag, endpoints, channel) and the capability set
//! declared at construction.

pub mod andromeda_a6;
pub mod ob6;
pub mod scripted;

use crate::capability::{
    CapabilitySet, CapabilityTag, DataFileLoad, GlobalSettings, HasBanks, Layer, Masterkeyboard,
    SoundExpander,
};
use crate::codec::Synth;
use crate::errors::{PatchVaultError, Result};
use crate::model::MidiChannel;
use std::sync::Arc;

pub use andromeda_a6::AndromedaA6;
pub use ob6::Ob6;
pub use scripted::{ScriptBridge, ScriptedSynth};

/// One configured synth model
#[derive(Clone)]
pub struct SynthVariant {
    synth: Arc<dyn Synth>,
    declared: CapabilitySet,
    pub active: bool,
    pub input: Option<String>,
    pub output: Option<String>,
    /// Device channel; `None` until configured or detected
    pub channel: Option<MidiChannel>,
}

impl SynthVariant {
    pub fn new(synth: Arc<dyn Synth>) -> Self {
        let declared = declared_capabilities(synth.as_ref());
        Self {
            synth,
            declared,
            active: true,
            input: None,
            output: None,
            channel: None,
        }
    }

    pub fn name(&self) -> &str {
        self.synth.name()
    }

    pub fn synth(&self) -> &dyn Synth {
        self.synth.as_ref()
    }

    pub fn declared(&self) -> &CapabilitySet {
        &self.declared
    }

    pub fn supports(&self, tag: CapabilityTag) -> bool {
        self.declared.contains(tag)
    }

    /// Channel to address the device on, channel 1 when unknown
    pub fn channel_or_default(&self) -> MidiChannel {
        self.channel.unwrap_or_default()
    }

    /// Swap the implementation and recompute the declared set
    ///
    /// The only way the declared capability set changes after construction.
    ///
    /// # Errors
    ///
    /// Returns `Config` when the new implementation reports a different
    /// variant name; store keys depend on it.
    pub fn reconfigure(&mut self, synth: Arc<dyn Synth>) -> Result<()> {
        if synth.name() != self.synth.name() {
            return Err(PatchVaultError::Config {
                message: format!(
                    "cannot reconfigure {} with an implementation of {}",
                    self.synth.name(),
                    synth.name()
                ),
            });
        }
        self.declared = declared_capabilities(synth.as_ref());
        self.synth = synth;
        Ok(())
    }

    pub fn has_banks(&self) -> Option<&dyn HasBanks> {
        if self.supports(CapabilityTag::HasBanks) {
            self.synth.has_banks()
        } else {
            None
        }
    }

    pub fn data_file_load(&self) -> Option<&dyn DataFileLoad> {
        if self.supports(CapabilityTag::DataFileLoad) {
            self.synth.data_file_load()
        } else {
            None
        }
    }

    pub fn layer(&self) -> Option<&dyn Layer> {
        if self.supports(CapabilityTag::Layer) {
            self.synth.layer()
        } else {
            None
        }
    }

    pub fn global_settings(&self) -> Option<&dyn GlobalSettings> {
        if self.supports(CapabilityTag::GlobalSettings) {
            self.synth.global_settings()
        } else {
            None
        }
    }

    pub fn sound_expander(&self) -> Option<&dyn SoundExpander> {
        if self.supports(CapabilityTag::SoundExpander) {
            self.synth.sound_expander()
        } else {
            None
        }
    }

    pub fn masterkeyboard(&self) -> Option<&dyn Masterkeyboard> {
        if self.supports(CapabilityTag::Masterkeyboard) {
            self.synth.masterkeyboard()
        } else {
            None
        }
    }
}

impl std::fmt::Debug for SynthVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthVariant")
            .field("name", &self.name())
            .field("declared", &self.declared)
            .field("active", &self.active)
            .field("input", &self.input)
            .field("output", &self.output)
            .field("channel", &self.channel)
            .finish()
    }
}

fn declared_capabilities(synth: &dyn Synth) -> CapabilitySet {
    CapabilityTag::ALL
        .into_iter()
        .filter(|tag| match tag {
            CapabilityTag::DataFileLoad => synth.data_file_load().is_some(),
            CapabilityTag::HasBanks => synth.has_banks().is_some(),
            CapabilityTag::Layer => synth.layer().is_some(),
            CapabilityTag::GlobalSettings => synth.global_settings().is_some(),
            CapabilityTag::SoundExpander => synth.sound_expander().is_some(),
            CapabilityTag::Masterkeyboard => synth.masterkeyboard().is_some(),
        })
        .collect()
}

/// The variants implemented natively, in display order
pub fn native_variants() -> Vec<SynthVariant> {
    vec![
        SynthVariant::new(Arc::new(Ob6::new())),
        SynthVariant::new(Arc::new(AndromedaA6::new())),
    ]
}

/// Look up a native variant by name, ignoring case
///
/// # Errors
///
/// Returns `UnknownVariant` when no native variant has that name.
pub fn native_variant(name: &str) -> Result<SynthVariant> {
    native_variants()
        .into_iter()
        .find(|v| v.name().eq_ignore_ascii_case(name))
        .ok_or_else(|| PatchVaultError::UnknownVariant {
            name: name.to_string(),
        })
}
