//! Custom test assertions for integration tests

use completed_import::{DownloadId, Event, ImportPipeline, TrackedDownloadState};
use tokio::sync::broadcast;

/// Drain every event currently buffered on `rx`
pub fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// IDs of all `DownloadCompleted` events in `events`
pub fn completed_ids(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::DownloadCompleted { tracked } => Some(tracked.download_id().to_string()),
            _ => None,
        })
        .collect()
}

/// Assert the tracked state of `id`
pub async fn assert_state(pipeline: &ImportPipeline, id: &str, expected: TrackedDownloadState) {
    let tracked = pipeline
        .registry()
        .get(&DownloadId::new(id))
        .await
        .unwrap_or_else(|| panic!("download {id} is not tracked"));
    assert_eq!(
        tracked.state, expected,
        "download {id} is {} but expected {}",
        tracked.state, expected
    );
}
