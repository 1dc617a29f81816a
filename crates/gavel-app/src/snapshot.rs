// Snapshot loading seam.
//
// The app loop only needs "give me the full read model for this auction";
// the REST client implements it, and tests substitute scripted sources.

use async_trait::async_trait;
use gavel_core::model::Snapshot;

/// Failure to obtain a snapshot or complete a REST call.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch the full read model for `auction_id`.
    async fn load_snapshot(&self, auction_id: &str) -> Result<Snapshot, FetchError>;
}
