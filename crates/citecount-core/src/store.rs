//! The host-owned field store, seen through a trait.
//!
//! Items live in an external library (the CLI's JSON export, a plugin host,
//! a test double); this crate only reads and writes named string fields and
//! asks the store to commit.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("failed to persist item {id}: {reason}")]
    Persist { id: i64, reason: String },
}

/// A bibliographic record with host-managed fields.
///
/// Fields used by this crate: `title`, `DOI`, `url`, `extra`.
pub trait LibraryItem: Send {
    /// Host-assigned id, referenced only for logging.
    fn id(&self) -> i64;

    /// False for attachments, notes, and other non-bibliographic sub-records.
    fn is_regular(&self) -> bool;

    /// Current field text; `None` when the field is absent.
    fn get_field(&self, name: &str) -> Option<String>;

    /// Stage a field value. Not visible to the host until [`save_tx`](Self::save_tx).
    fn set_field(&mut self, name: &str, value: &str);

    /// Commit staged fields transactionally (all-or-nothing).
    fn save_tx<'a>(&'a mut self)
    -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>>;
}

/// In-memory [`LibraryItem`] for tests.
///
/// Tracks commits and can be told to fail on save.
pub struct MemoryItem {
    id: i64,
    regular: bool,
    fields: HashMap<String, String>,
    save_count: usize,
    fail_save: bool,
}

impl MemoryItem {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            regular: true,
            fields: HashMap::new(),
            save_count: 0,
            fail_save: false,
        }
    }

    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }

    /// Mark the item as an attachment/note-like sub-record.
    pub fn non_regular(mut self) -> Self {
        self.regular = false;
        self
    }

    /// Make every `save_tx` fail, simulating a broken store transaction.
    pub fn failing_save(mut self) -> Self {
        self.fail_save = true;
        self
    }

    /// How many commits have succeeded.
    pub fn save_count(&self) -> usize {
        self.save_count
    }
}

impl LibraryItem for MemoryItem {
    fn id(&self) -> i64 {
        self.id
    }

    fn is_regular(&self) -> bool {
        self.regular
    }

    fn get_field(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }

    fn set_field(&mut self, name: &str, value: &str) {
        self.fields.insert(name.to_string(), value.to_string());
    }

    fn save_tx<'a>(
        &'a mut self,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(async move {
            if self.fail_save {
                return Err(StoreError::Persist {
                    id: self.id,
                    reason: "simulated transaction failure".to_string(),
                });
            }
            self.save_count += 1;
            Ok(())
        })
    }
}
