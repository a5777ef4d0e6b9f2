//! JSON-file-backed item store.
//!
//! The library is an exported array of `{ id, itemType, fields }` objects.
//! Each committed item rewrites the whole file atomically (temp file +
//! rename), so a crash mid-batch leaves either the old or the new library on
//! disk, never a torn one.

use std::collections::BTreeMap;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use citecount_core::store::{LibraryItem, StoreError};

/// Item types that are sub-records rather than bibliographic entries.
const NON_REGULAR_TYPES: &[&str] = &["attachment", "note", "annotation"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: i64,
    #[serde(rename = "itemType")]
    pub item_type: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl ItemRecord {
    pub fn is_regular(&self) -> bool {
        !NON_REGULAR_TYPES.contains(&self.item_type.as_str())
    }
}

/// Shared handle to the on-disk library.
pub struct JsonLibrary {
    path: PathBuf,
    records: Mutex<Vec<ItemRecord>>,
}

impl JsonLibrary {
    pub fn open(path: &Path) -> anyhow::Result<Arc<Self>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))?;
        let records: Vec<ItemRecord> = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("cannot parse {}: {e}", path.display()))?;
        Ok(Arc::new(Self {
            path: path.to_path_buf(),
            records: Mutex::new(records),
        }))
    }

    /// Snapshot of the current records, in library order.
    pub fn records(&self) -> Vec<ItemRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Build orchestrator items. `ids = None` takes the whole library;
    /// otherwise only the listed ids, still in library order.
    pub fn items(self: &Arc<Self>, ids: Option<&[i64]>) -> Vec<Box<dyn LibraryItem>> {
        self.records()
            .into_iter()
            .filter(|r| match ids {
                Some(ids) => ids.contains(&r.id),
                None => true,
            })
            .map(|record| {
                Box::new(JsonItem {
                    record,
                    library: Arc::clone(self),
                }) as Box<dyn LibraryItem>
            })
            .collect()
    }

    fn commit(&self, record: &ItemRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        if let Some(slot) = records.iter_mut().find(|r| r.id == record.id) {
            *slot = record.clone();
        }
        write_atomic(&self.path, &records).map_err(|e| StoreError::Persist {
            id: record.id,
            reason: e.to_string(),
        })
    }
}

fn write_atomic(path: &Path, records: &[ItemRecord]) -> anyhow::Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let mut tmp = tempfile::NamedTempFile::new_in(dir.unwrap_or(Path::new(".")))?;
    serde_json::to_writer_pretty(&mut tmp, records)?;
    tmp.write_all(b"\n")?;
    tmp.persist(path)?;
    Ok(())
}

/// One item bound to its library handle.
pub struct JsonItem {
    record: ItemRecord,
    library: Arc<JsonLibrary>,
}

impl LibraryItem for JsonItem {
    fn id(&self) -> i64 {
        self.record.id
    }

    fn is_regular(&self) -> bool {
        self.record.is_regular()
    }

    fn get_field(&self, name: &str) -> Option<String> {
        self.record.fields.get(name).cloned()
    }

    fn set_field(&mut self, name: &str, value: &str) {
        self.record.fields.insert(name.to_string(), value.to_string());
    }

    fn save_tx<'a>(
        &'a mut self,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(async move { self.library.commit(&self.record) })
    }
}
