use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Provenance of one ingestion run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSource {
    pub id: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

impl ImportSource {
    /// Source for patches loaded from a file; labelled by file name
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(format!("Imported from file {}", name), Utc::now())
    }

    /// Source for patches captured live from a synth
    pub fn from_capture(synth: &str, at: DateTime<Utc>) -> Self {
        Self::new(
            format!(
                "Imported from {} at {}",
                synth,
                at.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
            at,
        )
    }

    fn new(label: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            label,
            created_at,
        }
    }
}
