//! Case-insensitive tag set persisted as JSON.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{atomic_write, Result, DATASET_FILENAME};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TagRecord {
    #[serde(rename = "type")]
    kind: String,
    name: String,
}

/// On-disk set of tag names, keyed by `lowercase(name)` so that adding a
/// tag differing only in case is a no-op.
#[derive(Debug)]
pub struct TagDb {
    path: PathBuf,
    items: BTreeMap<String, TagRecord>,
}

impl TagDb {
    /// Opens `<dir>/dataset.json`, creating an empty dataset when absent.
    pub fn load(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(DATASET_FILENAME);
        let items = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            let empty = BTreeMap::new();
            atomic_write(&path, &serde_json::to_string_pretty(&empty)?)?;
            empty
        };
        Ok(Self { path, items })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> Result<()> {
        atomic_write(&self.path, &serde_json::to_string_pretty(&self.items)?)
    }

    /// Adds a tag and persists; returns whether the tag was new.
    pub fn add(&mut self, name: &str) -> Result<bool> {
        let key = name.to_lowercase();
        if self.items.contains_key(&key) {
            return Ok(false);
        }
        self.items.insert(
            key,
            TagRecord {
                kind: "tag".to_string(),
                name: name.to_string(),
            },
        );
        self.save()?;
        debug!(tag = name, "added tag");
        Ok(true)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(&name.to_lowercase())
    }

    /// Original-case names, ordered by their lowercase key.
    pub fn names(&self) -> Vec<String> {
        self.items.values().map(|r| r.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_creates_empty_dataset_file() {
        let dir = tempdir().unwrap();
        let db = TagDb::load(dir.path()).unwrap();
        assert!(db.is_empty());
        assert!(dir.path().join(DATASET_FILENAME).exists());
    }

    #[test]
    fn add_is_case_insensitive() {
        let dir = tempdir().unwrap();
        let mut db = TagDb::load(dir.path()).unwrap();
        assert!(db.add("Holiday").unwrap());
        assert!(!db.add("holiday").unwrap());
        assert!(!db.add("HOLIDAY").unwrap());
        assert_eq!(db.names(), vec!["Holiday".to_string()]);
    }

    #[test]
    fn persists_across_reload() {
        let dir = tempdir().unwrap();
        {
            let mut db = TagDb::load(dir.path()).unwrap();
            db.add("sea").unwrap();
            db.add("Mountain").unwrap();
        }
        let db = TagDb::load(dir.path()).unwrap();
        assert_eq!(db.len(), 2);
        assert!(db.contains("MOUNTAIN"));
    }

    #[test]
    fn dataset_document_shape() {
        let dir = tempdir().unwrap();
        let mut db = TagDb::load(dir.path()).unwrap();
        db.add("Beach").unwrap();
        let raw = std::fs::read_to_string(dir.path().join(DATASET_FILENAME)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["beach"]["type"], "tag");
        assert_eq!(value["beach"]["name"], "Beach");
    }
}
