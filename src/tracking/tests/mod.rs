use crate::types::{ClientId, DownloadClientItem, DownloadId, DownloadItemStatus};
use std::path::PathBuf;


/// Completed SABnzbd item with a category, landing in a client subfolder
pub(super) fn completed_item(id: &str) -> DownloadClientItem {
    DownloadClientItem {
        download_id: DownloadId::new(id),
        title: "Drone.S01E01.HDTV".to_string(),
        category: Some("tv".to_string()),
        status: DownloadItemStatus::Completed,
        output_path: Some(PathBuf::from("/downloads/complete/Drone.S01E01.HDTV")),
        client_id: ClientId::new("sab"),
        total_size_bytes: 1_000_000,
        remaining_size_bytes: 0,
        message: None,
    }
}

pub(super) fn with_status(mut item: DownloadClientItem, status: DownloadItemStatus) -> DownloadClientItem {
    item.status = status;
    item
}
