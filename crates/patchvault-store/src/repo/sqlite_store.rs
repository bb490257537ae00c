//! SQLite patch store
//!
//! One connection behind a mutex. `upsert_batch` runs in a single
//! transaction; an existing `(variant, fingerprint)` row keeps its `seq`, so
//! paging order stays insertion order across updates.

use super::hydration::{json_columns, PatchRow, PATCH_COLUMNS};
use crate::db::{self, Location};
use crate::errors::{from_rusqlite, Result};
use crate::migrations::apply_migrations;
use parking_lot::Mutex;
use patchvault_core::errors::{ExError, ExErrorKind};
use patchvault_core::model::{Fingerprint, PatchHolder};
use patchvault_core::store::{PatchFilter, PatchStore};
use patchvault_core::{log_op_end, log_op_error, log_op_start};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

const FILTER_CLAUSE: &str = "p.variant = ?1
     AND (?2 IS NULL OR p.source_id = ?2)
     AND (?3 = 0 OR p.favorite = 1)";

pub struct SqlitePatchStore {
    conn: Mutex<Connection>,
}

impl SqlitePatchStore {
    /// Open (or create) the database at `path` and bring its schema up to date
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut conn = db::connect(Location::File(path.as_ref()))?;
        apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let mut conn = db::connect(Location::Memory)?;
        apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn upsert_tx(tx: &Transaction<'_>, entries: &[PatchHolder]) -> Result<usize> {
        let mut inserted = 0;
        for holder in entries {
            let source = holder.source();
            tx.execute(
                "INSERT OR IGNORE INTO import_sources (id, variant, label, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    source.id,
                    holder.variant(),
                    source.label,
                    source.created_at.timestamp_millis()
                ],
            )
            .map_err(from_rusqlite)?;

            let exists = tx
                .query_row(
                    "SELECT 1 FROM patches WHERE variant = ?1 AND fingerprint = ?2",
                    params![holder.variant(), holder.fingerprint().as_str()],
                    |_| Ok(()),
                )
                .optional()
                .map_err(from_rusqlite)?
                .is_some();

            let (placement, layers, categories) = json_columns(holder)?;
            let patch = holder.patch();
            tx.execute(
                "INSERT INTO patches (variant, fingerprint, name, data_type, data, placement,
                                      layers, source_id, favorite, categories)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(variant, fingerprint) DO UPDATE SET
                    name = excluded.name,
                    data_type = excluded.data_type,
                    data = excluded.data,
                    placement = excluded.placement,
                    layers = excluded.layers,
                    source_id = excluded.source_id,
                    favorite = excluded.favorite,
                    categories = excluded.categories",
                params![
                    holder.variant(),
                    holder.fingerprint().as_str(),
                    patch.name(),
                    patch.data_type().id(),
                    patch.bytes(),
                    placement,
                    layers,
                    source.id,
                    holder.favorite,
                    categories,
                ],
            )
            .map_err(from_rusqlite)?;

            if !exists {
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}

impl PatchStore for SqlitePatchStore {
    fn count(&self, filter: &PatchFilter) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM patches p WHERE {}", FILTER_CLAUSE),
                params![filter.variant, filter.import_source, filter.favorites_only],
                |row| row.get(0),
            )
            .map_err(from_rusqlite)?;
        Ok(count as usize)
    }

    fn paged_fetch(
        &self,
        filter: &PatchFilter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<PatchHolder>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM patches p JOIN import_sources s ON s.id = p.source_id
                 WHERE {} ORDER BY p.seq LIMIT ?4 OFFSET ?5",
                PATCH_COLUMNS, FILTER_CLAUSE
            ))
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map(
                params![
                    filter.variant,
                    filter.import_source,
                    filter.favorites_only,
                    limit as i64,
                    skip as i64
                ],
                PatchRow::read,
            )
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        rows.into_iter().map(PatchRow::into_holder).collect()
    }

    fn list_import_sources(&self, variant: &str) -> Result<BTreeMap<String, String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT label, id FROM import_sources WHERE variant = ?1
                 ORDER BY created_at, rowid",
            )
            .map_err(from_rusqlite)?;
        let pairs = stmt
            .query_map([variant], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<(String, String)>, _>>()
            .map_err(from_rusqlite)?;
        // Later sources win a label collision
        Ok(pairs.into_iter().collect())
    }

    fn upsert_batch(&self, entries: &[PatchHolder]) -> Result<usize> {
        let op = "store_upsert_batch";
        log_op_start!(op, entries = entries.len());
        let start = Instant::now();

        let mut conn = self.conn.lock();
        let result = conn
            .transaction()
            .map_err(from_rusqlite)
            .and_then(|tx| {
                let inserted = Self::upsert_tx(&tx, entries)?;
                tx.commit().map_err(from_rusqlite)?;
                Ok(inserted)
            })
            .map_err(|e| {
                log_op_error!(op, e.clone(), duration_ms = start.elapsed().as_millis() as u64);
                e
            })?;

        log_op_end!(
            op,
            duration_ms = start.elapsed().as_millis() as u64,
            inserted = result
        );
        Ok(result)
    }

    fn get(&self, variant: &str, fingerprint: &Fingerprint) -> Result<Option<PatchHolder>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM patches p JOIN import_sources s ON s.id = p.source_id
                     WHERE p.variant = ?1 AND p.fingerprint = ?2",
                    PATCH_COLUMNS
                ),
                params![variant, fingerprint.as_str()],
                PatchRow::read,
            )
            .optional()
            .map_err(from_rusqlite)?;
        row.map(PatchRow::into_holder).transpose()
    }

    fn set_favorite(&self, variant: &str, fingerprint: &Fingerprint, favorite: bool) -> Result<()> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "UPDATE patches SET favorite = ?3 WHERE variant = ?1 AND fingerprint = ?2",
                params![variant, fingerprint.as_str(), favorite],
            )
            .map_err(from_rusqlite)?;
        if changed == 0 {
            return Err(ExError::new(ExErrorKind::NotFound)
                .with_op("set_favorite")
                .with_variant(variant)
                .with_fingerprint(fingerprint.as_str())
                .with_message("Patch not found"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for SqlitePatchStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlitePatchStore").finish_non_exhaustive()
    }
}
