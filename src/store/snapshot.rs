//! JSON snapshot files: `{"version": N, "tables": {...}}`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{StoreError, Tables};

/// Layout version written into every snapshot.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    tables: &'a Tables,
}

#[derive(Deserialize)]
struct Snapshot {
    version: u32,
    #[serde(default)]
    tables: Tables,
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

pub fn load(path: &Path) -> Result<Tables, StoreError> {
    let content = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    let snapshot: Snapshot = serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
        path: path.to_path_buf(),
        source: e,
    })?;
    if snapshot.version != SCHEMA_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: snapshot.version,
            expected: SCHEMA_VERSION,
        });
    }
    Ok(snapshot.tables)
}

/// Write through a sibling temp file and rename it over `path`.
pub fn save(path: &Path, tables: &Tables) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }
    let body = serde_json::to_vec_pretty(&SnapshotRef {
        version: SCHEMA_VERSION,
        tables,
    })
    .map_err(|e| StoreError::Corrupt {
        path: path.to_path_buf(),
        source: e,
    })?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body).map_err(|e| io_error(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| io_error(path, e))?;
    log::debug!("Saved snapshot to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_other_versions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.json");
        fs::write(&path, r#"{"version": 99, "tables": {}}"#).unwrap();
        assert!(matches!(
            load(&path),
            Err(StoreError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(load(&path), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn empty_tables_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("kuku.json");
        save(&path, &Tables::default()).unwrap();
        let tables = load(&path).unwrap();
        assert!(tables.users.is_empty());
    }
}
