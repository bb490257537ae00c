//! Rows to holders and back

use crate::errors::{corrupt_column, Result};
use patchvault_core::model::{
    DataType, Fingerprint, ImportSource, LayerSpan, PatchData, PatchHolder, ProgramNumber,
};
use rusqlite::Row;
use std::collections::BTreeSet;

/// Columns selected by [`PATCH_COLUMNS`], in order
pub(crate) struct PatchRow {
    variant: String,
    fingerprint: String,
    name: String,
    data_type: u32,
    data: Vec<u8>,
    placement: Option<String>,
    layers: String,
    favorite: bool,
    categories: String,
    source_id: String,
    source_label: String,
    source_created_at: i64,
}

pub(crate) const PATCH_COLUMNS: &str = "p.variant, p.fingerprint, p.name, p.data_type, p.data, \
     p.placement, p.layers, p.favorite, p.categories, s.id, s.label, s.created_at";

impl PatchRow {
    pub(crate) fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            variant: row.get(0)?,
            fingerprint: row.get(1)?,
            name: row.get(2)?,
            data_type: row.get(3)?,
            data: row.get(4)?,
            placement: row.get(5)?,
            layers: row.get(6)?,
            favorite: row.get::<_, i64>(7)? != 0,
            categories: row.get(8)?,
            source_id: row.get(9)?,
            source_label: row.get(10)?,
            source_created_at: row.get(11)?,
        })
    }

    pub(crate) fn into_holder(self) -> Result<PatchHolder> {
        let layers: Vec<LayerSpan> =
            serde_json::from_str(&self.layers).map_err(|e| corrupt_column("layers", e))?;
        let placement: Option<ProgramNumber> = self
            .placement
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| corrupt_column("placement", e))?;
        let categories: BTreeSet<String> = serde_json::from_str(&self.categories)
            .map_err(|e| corrupt_column("categories", e))?;

        let mut patch = PatchData::new(DataType::from_id(self.data_type), self.data, self.name)
            .with_layers(layers);
        if let Some(place) = placement {
            patch = patch.with_placement(place);
        }

        let source = ImportSource {
            id: self.source_id,
            label: self.source_label,
            created_at: chrono::DateTime::from_timestamp_millis(self.source_created_at)
                .unwrap_or_default(),
        };

        let mut holder = PatchHolder::new(
            self.variant,
            Fingerprint::from_hex(self.fingerprint),
            patch,
            source,
        );
        holder.favorite = self.favorite;
        holder.categories = categories;
        Ok(holder)
    }
}

/// JSON columns of a holder: `(placement, layers, categories)`
pub(crate) fn json_columns(holder: &PatchHolder) -> Result<(Option<String>, String, String)> {
    let placement = holder
        .patch()
        .placement()
        .map(|p| serde_json::to_string(&p))
        .transpose()
        .map_err(|e| corrupt_column("placement", e))?;
    let layers =
        serde_json::to_string(holder.patch().layers()).map_err(|e| corrupt_column("layers", e))?;
    let categories =
        serde_json::to_string(&holder.categories).map_err(|e| corrupt_column("categories", e))?;
    Ok((placement, layers, categories))
}
