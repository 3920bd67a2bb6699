//! Shared test helpers: in-memory collaborators and a pipeline wired to them.

use crate::client::{ClientGateway, DownloadClient};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::history::HistoryLookup;
use crate::import::ImportService;
use crate::pipeline::ImportPipeline;
use crate::resolver::MediaResolver;
use crate::types::{
    ClientId, DownloadClientItem, DownloadId, DownloadItemStatus, EpisodeRef, HistoryEventType,
    HistoryRecord, ImportDecision, ImportResult, ResolvedMedia, SeriesRef,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

pub(crate) const CLIENT_ID: &str = "sab";

/// Download client returning whatever the test put in it
pub(crate) struct FakeClient {
    id: ClientId,
    items: Mutex<Vec<DownloadClientItem>>,
    available: AtomicBool,
}

impl FakeClient {
    pub(crate) fn new(id: &str) -> Self {
        Self {
            id: ClientId::new(id),
            items: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }

    pub(crate) fn set_items(&self, items: Vec<DownloadClientItem>) {
        *self.items.lock().unwrap() = items;
    }

    pub(crate) fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

#[async_trait]
impl DownloadClient for FakeClient {
    fn id(&self) -> &ClientId {
        &self.id
    }

    fn name(&self) -> &str {
        "fake"
    }

    async fn get_items(&self) -> Result<Vec<DownloadClientItem>> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(Error::ClientUnavailable {
                client_id: self.id.clone(),
                reason: "connection refused".into(),
            });
        }
        Ok(self.items.lock().unwrap().clone())
    }
}

/// Import service with scripted per-download results
///
/// Unscripted downloads import a single `episode.mkv` successfully. When gated, each
/// call waits for a permit on the gate before returning.
#[derive(Default)]
pub(crate) struct FakeImportService {
    scripted: Mutex<HashMap<DownloadId, Vec<ImportResult>>>,
    failing: Mutex<HashSet<DownloadId>>,
    calls: Mutex<Vec<(DownloadId, PathBuf)>>,
    gate: Option<Arc<Semaphore>>,
    pub(crate) entered: Notify,
}

impl FakeImportService {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub(crate) fn script(&self, id: &str, results: Vec<ImportResult>) {
        self.scripted
            .lock()
            .unwrap()
            .insert(DownloadId::new(id), results);
    }

    pub(crate) fn fail_with_error(&self, id: &str) {
        self.failing.lock().unwrap().insert(DownloadId::new(id));
    }

    pub(crate) fn calls(&self) -> Vec<(DownloadId, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self, id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(called, _)| called.as_str() == id)
            .count()
    }
}

#[async_trait]
impl ImportService for FakeImportService {
    async fn process_path(
        &self,
        path: &Path,
        item: &DownloadClientItem,
    ) -> Result<Vec<ImportResult>> {
        self.calls
            .lock()
            .unwrap()
            .push((item.download_id.clone(), path.to_path_buf()));
        self.entered.notify_one();

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        if self.failing.lock().unwrap().contains(&item.download_id) {
            return Err(Error::Import(format!(
                "path '{}' is not accessible",
                path.display()
            )));
        }

        let scripted = self.scripted.lock().unwrap().get(&item.download_id).cloned();
        Ok(scripted.unwrap_or_else(|| default_results(path)))
    }
}

/// History lookup backed by a map
#[derive(Default)]
pub(crate) struct FakeHistory {
    records: Mutex<HashMap<DownloadId, HistoryRecord>>,
    broken: AtomicBool,
}

impl FakeHistory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_grab(&self, id: &str) {
        self.records
            .lock()
            .unwrap()
            .insert(DownloadId::new(id), grab(id));
    }

    pub(crate) fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::SeqCst);
    }
}

#[async_trait]
impl HistoryLookup for FakeHistory {
    async fn most_recent_for_download_id(
        &self,
        download_id: &DownloadId,
    ) -> Result<Option<HistoryRecord>> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(Error::Other("history store offline".into()));
        }
        Ok(self.records.lock().unwrap().get(download_id).cloned())
    }
}

/// Resolver that knows a fixed set of downloads
#[derive(Default)]
pub(crate) struct FakeResolver {
    known: Mutex<HashMap<DownloadId, ResolvedMedia>>,
    calls: Mutex<Vec<DownloadId>>,
}

impl FakeResolver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn know(&self, id: &str, media: ResolvedMedia) {
        self.known
            .lock()
            .unwrap()
            .insert(DownloadId::new(id), media);
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl MediaResolver for FakeResolver {
    async fn resolve(
        &self,
        item: &DownloadClientItem,
        _grab_history: Option<&HistoryRecord>,
    ) -> Result<Option<ResolvedMedia>> {
        self.calls.lock().unwrap().push(item.download_id.clone());
        Ok(self.known.lock().unwrap().get(&item.download_id).cloned())
    }
}

/// Everything a pipeline test needs to drive and observe
pub(crate) struct TestPipeline {
    pub(crate) pipeline: ImportPipeline,
    pub(crate) client: Arc<FakeClient>,
    pub(crate) importer: Arc<FakeImportService>,
    pub(crate) history: Arc<FakeHistory>,
}

/// Pipeline over one fake client with intake folder `/drop`
pub(crate) fn create_test_pipeline() -> TestPipeline {
    create_test_pipeline_with(test_config(), FakeImportService::new())
}

pub(crate) fn create_test_pipeline_with(
    config: Config,
    importer: FakeImportService,
) -> TestPipeline {
    let client = Arc::new(FakeClient::new(CLIENT_ID));
    let importer = Arc::new(importer);
    let history = Arc::new(FakeHistory::new());

    let gateway = ClientGateway::new(vec![client.clone() as Arc<dyn DownloadClient>]);
    let pipeline = ImportPipeline::new(
        config,
        gateway,
        importer.clone() as Arc<dyn ImportService>,
        history.clone() as Arc<dyn HistoryLookup>,
    )
    .unwrap();

    TestPipeline {
        pipeline,
        client,
        importer,
        history,
    }
}

pub(crate) fn test_config() -> Config {
    let mut config = Config::default();
    config.import.downloaded_episodes_folder = Some(PathBuf::from("/drop"));
    config
}

/// A completed item with category `tv` under a client-specific folder
pub(crate) fn completed(id: &str) -> DownloadClientItem {
    DownloadClientItem {
        download_id: DownloadId::new(id),
        title: format!("Show.S01E01.{id}"),
        category: Some("tv".to_string()),
        status: DownloadItemStatus::Completed,
        output_path: Some(PathBuf::from(format!("/downloads/complete/tv/{id}"))),
        client_id: ClientId::new(CLIENT_ID),
        total_size_bytes: 1_000,
        remaining_size_bytes: 0,
        message: None,
    }
}

/// What an unscripted download imports: one approved `episode.mkv` in its folder
///
/// `tests/common/fakes.rs` carries the same default for integration tests.
pub(crate) fn default_results(path: &Path) -> Vec<ImportResult> {
    success(path.join("episode.mkv"))
}

pub(crate) fn success(path: impl Into<PathBuf>) -> Vec<ImportResult> {
    vec![ImportResult::new(ImportDecision::approved(path))]
}

pub(crate) fn grab(id: &str) -> HistoryRecord {
    HistoryRecord {
        id: 1,
        download_id: DownloadId::new(id),
        event_type: HistoryEventType::Grabbed,
        source_title: format!("Show.S01E01.{id}"),
        series_id: Some(7),
        episode_ids: vec![70],
        date: Utc::now(),
    }
}

pub(crate) fn media() -> ResolvedMedia {
    ResolvedMedia {
        series: SeriesRef {
            id: 7,
            title: "Show".to_string(),
        },
        episodes: vec![EpisodeRef {
            id: 70,
            season_number: 1,
            episode_number: 1,
        }],
    }
}
