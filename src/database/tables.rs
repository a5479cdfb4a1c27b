//! JSON tuning tables: the embedded set shipped with the crate and optional
//! external tables loaded from a directory.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Database, DatabaseEntry, DatabaseError, VendorGroup};
use crate::types::Precision;

/// On-disk shape of one family's table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyTable {
    pub family: String,
    pub entries: Vec<TableEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableEntry {
    pub precision: Precision,
    pub groups: Vec<VendorGroup>,
}

impl FamilyTable {
    pub fn into_entries(self) -> Vec<DatabaseEntry> {
        let family = self.family;
        self.entries
            .into_iter()
            .map(|e| DatabaseEntry { family: family.clone(), precision: e.precision, groups: e.groups })
            .collect()
    }
}

const EMBEDDED: [(&str, &str); 5] = [
    ("xaxpy.json", include_str!("kernels/xaxpy.json")),
    ("xdot.json", include_str!("kernels/xdot.json")),
    ("xgemv.json", include_str!("kernels/xgemv.json")),
    ("xger.json", include_str!("kernels/xger.json")),
    ("copy.json", include_str!("kernels/copy.json")),
];

/// Parses one table. `origin` only labels errors.
pub fn parse_table(origin: &str, text: &str) -> Result<Vec<DatabaseEntry>, DatabaseError> {
    let table: FamilyTable = serde_json::from_str(text).map_err(|e| DatabaseError::Json {
        origin: origin.to_string(),
        source: Arc::new(e),
    })?;
    Ok(table.into_entries())
}

pub fn embedded_entries() -> Result<Vec<DatabaseEntry>, DatabaseError> {
    let mut out = Vec::new();
    for (name, text) in EMBEDDED {
        out.extend(parse_table(name, text)?);
    }
    Ok(out)
}

/// Reads every `*.json` file of `dir`, in file-name order.
pub fn load_dir(dir: &Path) -> Result<Vec<DatabaseEntry>, DatabaseError> {
    let io_err = |e: std::io::Error| DatabaseError::Io { path: dir.display().to_string(), source: Arc::new(e) };
    let mut paths = Vec::new();
    for item in std::fs::read_dir(dir).map_err(io_err)? {
        let path = item.map_err(io_err)?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut out = Vec::new();
    for path in paths {
        let text = std::fs::read_to_string(&path).map_err(|e| DatabaseError::Io {
            path: path.display().to_string(),
            source: Arc::new(e),
        })?;
        let entries = parse_table(&path.display().to_string(), &text)?;
        log::info!("database: loaded {} entries from {}", entries.len(), path.display());
        out.extend(entries);
    }
    Ok(out)
}

/// Builds a database from the embedded tables, then lets the tables in
/// `external_dir` replace or extend them.
pub fn build(external_dir: Option<&Path>) -> Result<Database, DatabaseError> {
    let mut db = Database::from_entries(embedded_entries()?)?;
    log::info!("database: {} embedded entries", db.len());
    if let Some(dir) = external_dir {
        db.extend_replacing(load_dir(dir)?)?;
        log::info!("database: {} entries after {}", db.len(), dir.display());
    }
    Ok(db)
}
