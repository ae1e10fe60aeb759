//! In-process store and blob backends.
//!
//! Used when the application runs from a CSV seed instead of a live sheet,
//! and by tests that need to count writes or inject upload failures.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use risk_map_dataset::RawTable;
use tokio::sync::Mutex;

use crate::{BlobError, BlobStore, StoreError, TabularStore, WriteMode};

/// A worksheet held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: Mutex<RawTable>,
    appends: AtomicUsize,
    reads: AtomicUsize,
    unavailable: bool,
}

impl MemoryStore {
    /// Creates a store holding `table`.
    #[must_use]
    pub fn new(table: RawTable) -> Self {
        Self {
            table: Mutex::new(table),
            ..Self::default()
        }
    }

    /// Creates a store whose every call fails with [`StoreError::Access`].
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Number of successful appends.
    #[must_use]
    pub fn append_count(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }

    /// Number of successful reads.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// A copy of the current contents.
    pub async fn snapshot(&self) -> RawTable {
        self.table.lock().await.clone()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::Access {
                target: "memory".to_string(),
                message: "store marked unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TabularStore for MemoryStore {
    async fn read_all_records(&self) -> Result<RawTable, StoreError> {
        self.check_available()?;
        let table = self.table.lock().await.clone();
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(table)
    }

    async fn append_row(&self, values: &[String], mode: WriteMode) -> Result<(), StoreError> {
        self.check_available()?;
        let mut table = self.table.lock().await;
        let row = values
            .iter()
            .map(|v| {
                if v.is_empty() {
                    serde_json::Value::Null
                } else {
                    serde_json::Value::String(v.clone())
                }
            })
            .collect();
        table.rows.push(row);
        self.appends.fetch_add(1, Ordering::SeqCst);
        log::debug!("Appended row {} to memory store ({mode:?})", table.rows.len());
        Ok(())
    }
}

/// A file held by [`MemoryBlobStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Folder the file was uploaded into.
    pub folder_id: String,
    /// Display name given at upload time.
    pub name: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct BlobState {
    folders: BTreeMap<(String, String), String>,
    files: BTreeMap<String, StoredBlob>,
}

/// Blob storage held in memory. Uploaded files are addressed as
/// `{base_url}/{id}`.
#[derive(Debug)]
pub struct MemoryBlobStore {
    base_url: String,
    state: Mutex<BlobState>,
    fail_marker: Option<String>,
}

impl MemoryBlobStore {
    /// Creates an empty store whose URLs start with `base_url`.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            state: Mutex::new(BlobState::default()),
            fail_marker: None,
        }
    }

    /// Makes uploads whose display name contains `marker` fail with
    /// [`BlobError::Quota`].
    #[must_use]
    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }

    /// Looks up an uploaded file by id.
    pub async fn get(&self, id: &str) -> Option<StoredBlob> {
        self.state.lock().await.files.get(id).cloned()
    }

    /// Number of uploaded files.
    pub async fn file_count(&self) -> usize {
        self.state.lock().await.files.len()
    }

    /// Names of folders created under `parent_id`.
    pub async fn folder_names(&self, parent_id: &str) -> Vec<String> {
        self.state
            .lock()
            .await
            .folders
            .keys()
            .filter(|(parent, _)| parent == parent_id)
            .map(|(_, name)| name.clone())
            .collect()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn ensure_folder(&self, parent_id: &str, name: &str) -> Result<String, BlobError> {
        let mut state = self.state.lock().await;
        let id = state
            .folders
            .entry((parent_id.to_string(), name.to_string()))
            .or_insert_with(|| uuid::Uuid::new_v4().simple().to_string())
            .clone();
        Ok(id)
    }

    async fn upload(
        &self,
        local_path: &Path,
        folder_id: &str,
        display_name: &str,
    ) -> Result<String, BlobError> {
        if let Some(marker) = &self.fail_marker
            && display_name.contains(marker.as_str())
        {
            return Err(BlobError::Quota {
                message: format!("simulated quota failure for {display_name}"),
            });
        }

        let bytes = tokio::fs::read(local_path).await?;
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.state.lock().await.files.insert(
            id.clone(),
            StoredBlob {
                folder_id: folder_id.to_string(),
                name: display_name.to_string(),
                bytes,
            },
        );
        Ok(format!("{}/{id}", self.base_url))
    }
}
