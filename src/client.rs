//! Download client gateway
//!
//! Concrete client adapters (SABnzbd, NZBGet, qBittorrent, ...) implement the narrow
//! [`DownloadClient`] capability. The [`ClientGateway`] polls every registered
//! client concurrently and returns the combined snapshot. A client that cannot be
//! reached is reported separately and simply contributes no items to the cycle.

use crate::config::Config;
use crate::error::Error;
use crate::types::{ClientId, DownloadClientItem};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Trait for a download client the pipeline can poll
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use completed_import::client::DownloadClient;
/// use completed_import::types::{ClientId, DownloadClientItem};
///
/// struct Idle(ClientId);
///
/// #[async_trait]
/// impl DownloadClient for Idle {
///     fn id(&self) -> &ClientId {
///         &self.0
///     }
///
///     fn name(&self) -> &str {
///         "idle"
///     }
///
///     async fn get_items(&self) -> completed_import::Result<Vec<DownloadClientItem>> {
///         Ok(Vec::new())
///     }
/// }
/// ```
#[async_trait]
pub trait DownloadClient: Send + Sync {
    /// Unique client ID
    fn id(&self) -> &ClientId;

    /// Display name (for logging)
    fn name(&self) -> &str;

    /// List every item the client currently knows about
    ///
    /// # Errors
    ///
    /// Any error means the client is unavailable for this cycle.
    async fn get_items(&self) -> crate::Result<Vec<DownloadClientItem>>;
}

/// Result of polling every registered client once
#[derive(Debug, Default)]
pub struct GatewayPoll {
    /// Items from every client that answered
    pub items: Vec<DownloadClientItem>,
    /// Clients that answered
    pub polled: HashSet<ClientId>,
    /// Clients that could not be polled, with the reason
    pub unavailable: Vec<(ClientId, Error)>,
}

/// Uniform access to all registered download clients
#[derive(Clone, Default)]
pub struct ClientGateway {
    clients: Vec<Arc<dyn DownloadClient>>,
}

impl ClientGateway {
    /// Create a gateway over the given clients
    pub fn new(clients: Vec<Arc<dyn DownloadClient>>) -> Self {
        Self { clients }
    }

    /// Register another client
    pub fn register(&mut self, client: Arc<dyn DownloadClient>) {
        self.clients.push(client);
    }

    /// Number of registered clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether no clients are registered
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Poll every enabled client concurrently
    ///
    /// Items are stamped with the ID of the client that returned them. When a
    /// client has a category configured, only items in that category are kept;
    /// anything else in a shared client is not the application's business.
    pub async fn poll(&self, config: &Config) -> GatewayPoll {
        let enabled: Vec<&Arc<dyn DownloadClient>> = self
            .clients
            .iter()
            .filter(|c| {
                let enabled = config.is_client_enabled(c.id());
                if !enabled {
                    debug!(client_id = %c.id(), "download client disabled, skipping");
                }
                enabled
            })
            .collect();

        let responses =
            futures::future::join_all(enabled.iter().map(|client| client.get_items())).await;

        let mut poll = GatewayPoll::default();

        for (client, response) in enabled.into_iter().zip(responses) {
            let client_id = client.id().clone();

            match response {
                Ok(items) => {
                    let category = config.client_category(&client_id);
                    let before = items.len();

                    poll.items.extend(
                        items
                            .into_iter()
                            .filter(|item| in_category(item, category))
                            .map(|mut item| {
                                item.client_id = client_id.clone();
                                item
                            }),
                    );

                    debug!(
                        client_id = %client_id,
                        client = client.name(),
                        items = before,
                        "polled download client"
                    );
                    poll.polled.insert(client_id);
                }
                Err(e) => {
                    warn!(
                        client_id = %client_id,
                        client = client.name(),
                        error = %e,
                        "download client unavailable, skipping its items this cycle"
                    );
                    let err = match e {
                        Error::ClientUnavailable { .. } => e,
                        other => Error::ClientUnavailable {
                            client_id: client_id.clone(),
                            reason: other.to_string(),
                        },
                    };
                    poll.unavailable.push((client_id, err));
                }
            }
        }

        poll
    }
}

fn in_category(item: &DownloadClientItem, category: Option<&str>) -> bool {
    match category {
        Some(wanted) => item
            .category()
            .is_some_and(|c| c.eq_ignore_ascii_case(wanted)),
        None => true,
    }
}
