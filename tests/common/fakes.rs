//! In-memory collaborators for driving the pipeline from the outside
//!
//! These mirror the crate's `pub(crate)` unit-test fakes, which integration tests
//! cannot reach. Unreachable clients fail with `ClientUnavailable` and unscripted
//! imports succeed with [`default_results`] in both.

use async_trait::async_trait;
use completed_import::history::HistoryLookup;
use completed_import::import::ImportService;
use completed_import::{
    ClientId, DownloadClient, DownloadClientItem, DownloadId, Error, HistoryRecord,
    ImportDecision, ImportResult, Result,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Download client whose queue the test controls
pub struct ScriptedClient {
    id: ClientId,
    items: Mutex<Vec<DownloadClientItem>>,
    reachable: AtomicBool,
}

impl ScriptedClient {
    pub fn new(id: &str) -> Self {
        Self {
            id: ClientId::new(id),
            items: Mutex::new(Vec::new()),
            reachable: AtomicBool::new(true),
        }
    }

    pub fn report(&self, items: Vec<DownloadClientItem>) {
        *self.items.lock().unwrap() = items;
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }
}

#[async_trait]
impl DownloadClient for ScriptedClient {
    fn id(&self) -> &ClientId {
        &self.id
    }

    fn name(&self) -> &str {
        "scripted"
    }

    async fn get_items(&self) -> Result<Vec<DownloadClientItem>> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(Error::ClientUnavailable {
                client_id: self.id.clone(),
                reason: "connection refused".into(),
            });
        }
        Ok(self.items.lock().unwrap().clone())
    }
}

/// Import engine with per-download scripted results
///
/// Downloads without a script import one `episode.mkv` successfully.
#[derive(Default)]
pub struct ScriptedImporter {
    scripts: Mutex<HashMap<DownloadId, Vec<ImportResult>>>,
    calls: Mutex<Vec<(DownloadId, PathBuf)>>,
}

impl ScriptedImporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, id: &str, results: Vec<ImportResult>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(DownloadId::new(id), results);
    }

    pub fn calls(&self) -> Vec<(DownloadId, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(called, _)| called.as_str() == id)
            .count()
    }
}

#[async_trait]
impl ImportService for ScriptedImporter {
    async fn process_path(
        &self,
        path: &Path,
        item: &DownloadClientItem,
    ) -> Result<Vec<ImportResult>> {
        self.calls
            .lock()
            .unwrap()
            .push((item.download_id.clone(), path.to_path_buf()));

        let scripted = self.scripts.lock().unwrap().get(&item.download_id).cloned();
        Ok(scripted.unwrap_or_else(|| default_results(path)))
    }
}

/// What an unscripted download imports: one approved `episode.mkv` in its folder
///
/// Kept in step with the crate's own unit-test import service.
pub fn default_results(path: &Path) -> Vec<ImportResult> {
    vec![ImportResult::new(ImportDecision::approved(
        path.join("episode.mkv"),
    ))]
}

/// History lookup backed by a map
#[derive(Default)]
pub struct MapHistory {
    records: Mutex<HashMap<DownloadId, HistoryRecord>>,
}

impl MapHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: HistoryRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.download_id.clone(), record);
    }
}

#[async_trait]
impl HistoryLookup for MapHistory {
    async fn most_recent_for_download_id(
        &self,
        download_id: &DownloadId,
    ) -> Result<Option<HistoryRecord>> {
        Ok(self.records.lock().unwrap().get(download_id).cloned())
    }
}
