//! Test fixtures: items, history records and a wired pipeline

use super::fakes::{MapHistory, ScriptedClient, ScriptedImporter};
use chrono::Utc;
use completed_import::history::HistoryLookup;
use completed_import::import::ImportService;
use completed_import::types::HistoryEventType;
use completed_import::{
    ClientGateway, ClientId, Config, DownloadClient, DownloadClientItem, DownloadId,
    DownloadItemStatus, HistoryRecord, ImportPipeline,
};
use std::path::PathBuf;
use std::sync::Arc;

pub const CLIENT: &str = "sabnzbd";
pub const INTAKE: &str = "/drop";

/// A pipeline over one scripted client, plus handles to its collaborators
pub struct Harness {
    pub pipeline: ImportPipeline,
    pub client: Arc<ScriptedClient>,
    pub importer: Arc<ScriptedImporter>,
    pub history: Arc<MapHistory>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(intake_config())
    }

    pub fn with_config(config: Config) -> Self {
        let client = Arc::new(ScriptedClient::new(CLIENT));
        let importer = Arc::new(ScriptedImporter::new());
        let history = Arc::new(MapHistory::new());

        let pipeline = ImportPipeline::new(
            config,
            ClientGateway::new(vec![client.clone() as Arc<dyn DownloadClient>]),
            importer.clone() as Arc<dyn ImportService>,
            history.clone() as Arc<dyn HistoryLookup>,
        )
        .unwrap();

        Self {
            pipeline,
            client,
            importer,
            history,
        }
    }
}

/// Default config with the intake folder set to [`INTAKE`]
pub fn intake_config() -> Config {
    Config::from_json_str(&format!(
        r#"{{ "import": {{ "downloaded_episodes_folder": "{INTAKE}" }} }}"#
    ))
    .unwrap()
}

/// Builder-style item constructor
pub fn item(id: &str) -> DownloadClientItem {
    DownloadClientItem {
        download_id: DownloadId::new(id),
        title: format!("Series.Title.S02E05.720p.{id}"),
        category: None,
        status: DownloadItemStatus::Completed,
        output_path: Some(PathBuf::from(format!("/downloads/complete/{id}"))),
        client_id: ClientId::new(CLIENT),
        total_size_bytes: 2_000_000,
        remaining_size_bytes: 0,
        message: None,
    }
}

pub fn with_category(mut item: DownloadClientItem, category: &str) -> DownloadClientItem {
    item.category = Some(category.to_string());
    item
}

pub fn with_status(mut item: DownloadClientItem, status: DownloadItemStatus) -> DownloadClientItem {
    item.status = status;
    item
}

pub fn with_output(mut item: DownloadClientItem, path: &str) -> DownloadClientItem {
    item.output_path = Some(PathBuf::from(path));
    item
}

pub fn grabbed(id: &str) -> HistoryRecord {
    HistoryRecord {
        id: 1,
        download_id: DownloadId::new(id),
        event_type: HistoryEventType::Grabbed,
        source_title: format!("Series.Title.S02E05.720p.{id}"),
        series_id: Some(3),
        episode_ids: vec![31],
        date: Utc::now(),
    }
}
