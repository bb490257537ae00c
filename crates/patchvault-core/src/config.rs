//! `patchvault.toml` configuration
//!
//! ```toml
//! [store]
//! path = "patchvault.db"
//!
//! [logging]
//! profile = "production"
//!
//! [ingest]
//! max_buffered_bytes = 65536
//!
//! [[synths]]
//! name = "OB-6"
//! channel = 1
//! output = "OB-6 USB"
//! ```
//!
//! Every section is optional; a missing file yields the defaults.

use crate::codec::assembler::DEFAULT_MAX_BUFFERED_BYTES;
use crate::errors::{PatchVaultError, Result};
use crate::logging_facility::Profile;
use crate::model::MidiChannel;
use crate::variants::SynthVariant;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "patchvault.toml";
pub const DEFAULT_STORE_PATH: &str = "patchvault.db";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatchVaultConfig {
    pub store: StoreConfig,
    pub logging: LoggingConfig,
    pub ingest: IngestConfig,
    pub synths: Vec<SynthConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub profile: Profile,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            profile: Profile::Development,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Largest sysex frame buffered while reassembling fragments
    pub max_buffered_bytes: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_buffered_bytes: DEFAULT_MAX_BUFFERED_BYTES,
        }
    }
}

/// Per-installation settings of one synth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SynthConfig {
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    /// One-based, as printed on the device
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

fn default_active() -> bool {
    true
}

impl PatchVaultConfig {
    /// # Errors
    ///
    /// Returns `Config` when the text is not valid configuration.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| PatchVaultError::Config {
            message: format!("invalid configuration: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`; a file that does not exist yields the defaults
    ///
    /// # Errors
    ///
    /// Returns `Config` when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| PatchVaultError::Config {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_toml(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.ingest.max_buffered_bytes == 0 {
            return Err(PatchVaultError::Config {
                message: "ingest.max_buffered_bytes must be positive".to_string(),
            });
        }
        for synth in &self.synths {
            if let Some(channel) = synth.channel {
                if MidiChannel::from_one_based(channel).is_none() {
                    return Err(PatchVaultError::Config {
                        message: format!(
                            "synth '{}': channel {} is outside 1..=16",
                            synth.name, channel
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Write the configuration back to `path`
    ///
    /// # Errors
    ///
    /// Returns `Config` when serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string(self).map_err(|e| PatchVaultError::Config {
            message: format!("cannot serialize configuration: {}", e),
        })?;
        std::fs::write(path, text).map_err(|e| PatchVaultError::Config {
            message: format!("cannot write {}: {}", path.display(), e),
        })
    }

    /// Remember the channel `name` was detected on, adding a synth entry if
    /// the synth has none yet
    pub fn record_channel(&mut self, name: &str, channel: MidiChannel) {
        let one_based = Some(channel.to_one_based());
        match self
            .synths
            .iter_mut()
            .find(|s| s.name.eq_ignore_ascii_case(name))
        {
            Some(settings) => settings.channel = one_based,
            None => self.synths.push(SynthConfig {
                name: name.to_string(),
                active: true,
                channel: one_based,
                input: None,
                output: None,
            }),
        }
    }

    pub fn synth(&self, name: &str) -> Option<&SynthConfig> {
        self.synths
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Copy the settings configured for `variant` onto it
    pub fn apply_to(&self, variant: &mut SynthVariant) {
        if let Some(settings) = self.synth(variant.name()) {
            variant.active = settings.active;
            variant.input = settings.input.clone();
            variant.output = settings.output.clone();
            variant.channel = settings.channel.and_then(MidiChannel::from_one_based);
        }
    }
}
