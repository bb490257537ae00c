//! The synth variants known to one engine
//!
//! Lookups hand out `Arc` snapshots. Recording a detected channel swaps in a
//! new snapshot; runs already holding the old one finish with it.

use parking_lot::RwLock;
use patchvault_core::config::PatchVaultConfig;
use patchvault_core::errors::{ExError, ExErrorKind, PatchVaultError};
use patchvault_core::variants::native_variants;
use patchvault_core::{MidiChannel, SynthVariant};
use std::sync::Arc;

/// Variants in display order, native ones first
#[derive(Debug, Default)]
pub struct VariantRegistry {
    variants: RwLock<Vec<Arc<SynthVariant>>>,
}

impl VariantRegistry {
    /// Native variants with the per-synth settings of `config` applied
    pub fn from_config(config: &PatchVaultConfig) -> Self {
        let variants = native_variants()
            .into_iter()
            .map(|mut variant| {
                config.apply_to(&mut variant);
                Arc::new(variant)
            })
            .collect();
        Self {
            variants: RwLock::new(variants),
        }
    }

    /// Add a variant, typically a scripted one
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when a variant of that name is registered.
    pub fn register(&mut self, variant: SynthVariant) -> Result<Arc<SynthVariant>, ExError> {
        if self.find(variant.name()).is_ok() {
            return Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("register_variant")
                .with_variant(variant.name())
                .with_message("A variant with this name is already registered"));
        }
        let variant = Arc::new(variant);
        self.variants.get_mut().push(Arc::clone(&variant));
        Ok(variant)
    }

    fn find(&self, name: &str) -> Result<usize, ExError> {
        self.variants
            .read()
            .iter()
            .position(|v| v.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                PatchVaultError::UnknownVariant {
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// # Errors
    ///
    /// Returns `NotFound` for an unknown name.
    pub fn get(&self, name: &str) -> Result<Arc<SynthVariant>, ExError> {
        let at = self.find(name)?;
        Ok(Arc::clone(&self.variants.read()[at]))
    }

    /// Set the device channel of `name`, e.g. after auto-detection
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown name.
    pub fn record_channel(
        &self,
        name: &str,
        channel: MidiChannel,
    ) -> Result<Arc<SynthVariant>, ExError> {
        let mut variants = self.variants.write();
        let at = variants
            .iter()
            .position(|v| v.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                ExError::from(PatchVaultError::UnknownVariant {
                    name: name.to_string(),
                })
            })?;
        let mut updated = SynthVariant::clone(&variants[at]);
        updated.channel = Some(channel);
        let updated = Arc::new(updated);
        variants[at] = Arc::clone(&updated);
        Ok(updated)
    }

    pub fn all(&self) -> Vec<Arc<SynthVariant>> {
        self.variants.read().clone()
    }

    pub fn active(&self) -> Vec<Arc<SynthVariant>> {
        self.variants
            .read()
            .iter()
            .filter(|v| v.active)
            .cloned()
            .collect()
    }
}
