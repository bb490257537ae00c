//! Library schema migrations, compiled in
//!
//! Ids are numbered and applied in order. The runner stores each migration's
//! checksum, so editing one that a library already ran is caught on open.

use sha2::{Digest, Sha256};

pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

impl Migration {
    /// Hex SHA-256 of the SQL text
    pub fn checksum(&self) -> String {
        hex::encode(Sha256::digest(self.sql.as_bytes()))
    }
}

pub const MIGRATIONS: &[Migration] = &[Migration {
    id: "001_patch_schema",
    sql: include_str!("../../migrations/001_patch_schema.sql"),
}];

/// Schema version of a fully migrated library
pub fn latest_id() -> Option<&'static str> {
    MIGRATIONS.last().map(|m| m.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_strictly_ascending() {
        for pair in MIGRATIONS.windows(2) {
            assert!(pair[0].id < pair[1].id, "{} before {}", pair[0].id, pair[1].id);
        }
        assert_eq!(latest_id(), Some("001_patch_schema"));
    }

    #[test]
    fn test_checksum_follows_sql_text() {
        let patches = Migration {
            id: "x",
            sql: "CREATE TABLE patches (id INTEGER)",
        };
        let renamed = Migration {
            id: "x",
            sql: "CREATE TABLE programs (id INTEGER)",
        };
        assert_eq!(patches.checksum().len(), 64);
        assert_eq!(patches.checksum(), patches.checksum());
        assert_ne!(patches.checksum(), renamed.checksum());
    }
}
