//! Remote Media Store Abstractions
//!
//! The signage dashboard delegates all persistence to a hosted backend: an
//! ordered document collection for media records, a single settings document,
//! and a blob store for the files themselves. These traits are the contract
//! the core consumes; `provider-firebase` ships the production adapter and
//! tests use in-memory implementations.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Wire-level media record as stored in the remote collection.
///
/// `order` values among all live documents form a contiguous 0-based
/// permutation; the store itself does not enforce this, the write paths do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDocument {
    /// Backend-assigned document identifier
    pub id: String,
    /// Public URL of the uploaded blob
    pub url: String,
    /// Wire media type: `"image"` or `"video"`
    pub media_type: String,
    /// Original file name as picked by the operator
    pub file_name: String,
    /// Position in the carousel, ascending from 0
    pub order: u32,
    /// Creation timestamp (Unix epoch seconds), when the backend reports one
    pub created_at: Option<i64>,
}

/// Fields for a media document about to be created.
#[derive(Debug, Clone)]
pub struct NewMediaDocument {
    pub url: String,
    pub media_type: String,
    pub file_name: String,
    pub order: u32,
    pub created_at: i64,
}

/// One entry of an atomic order rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAssignment {
    pub id: String,
    pub order: u32,
}

/// The single shared settings document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsDocument {
    pub slide_duration_secs: u32,
}

/// Guard owning a live change subscription.
///
/// Dropping the guard cancels the producing task; the snapshot channel closes
/// shortly after. This gives callers scoped acquisition: subscribe when the
/// dashboard mounts, drop on unmount.
#[derive(Debug)]
pub struct SubscriptionGuard {
    token: CancellationToken,
}

impl SubscriptionGuard {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Cancel the subscription explicitly (dropping does the same).
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// A live stream of ordered collection snapshots plus its lifecycle guard.
///
/// Every event is the FULL ordered result set, not a delta; consumers replace
/// their state wholesale. On subscription failure the producer logs and
/// closes the channel, leaving the consumer with its last known state.
pub struct MediaSubscription {
    snapshots: mpsc::Receiver<Vec<MediaDocument>>,
    guard: SubscriptionGuard,
}

impl MediaSubscription {
    pub fn new(snapshots: mpsc::Receiver<Vec<MediaDocument>>, guard: SubscriptionGuard) -> Self {
        Self { snapshots, guard }
    }

    /// Receive the next snapshot; `None` once the producer has shut down.
    pub async fn recv(&mut self) -> Option<Vec<MediaDocument>> {
        self.snapshots.recv().await
    }

    /// Split into the snapshot channel and the guard so they can live in
    /// different owners (the synchronizer consumes, the facade holds the guard).
    pub fn into_parts(self) -> (mpsc::Receiver<Vec<MediaDocument>>, SubscriptionGuard) {
        (self.snapshots, self.guard)
    }
}

/// Ordered media document collection plus the settings singleton.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Fetch all media documents ordered ascending by `order`.
    async fn list_ordered(&self) -> Result<Vec<MediaDocument>>;

    /// Create one media document, returning it with its assigned id.
    async fn create(&self, doc: NewMediaDocument) -> Result<MediaDocument>;

    /// Apply an order rewrite as ONE atomic batch.
    ///
    /// All assignments commit together or none do; a partial reorder must
    /// never be observable by other readers.
    async fn apply_order(&self, assignments: &[OrderAssignment]) -> Result<()>;

    /// Delete one media document by id.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Open a realtime subscription to the ordered collection.
    ///
    /// The first snapshot reflects current state; subsequent snapshots are
    /// pushed whenever the collection changes. The caller owns the returned
    /// guard and unsubscribes by dropping it.
    async fn subscribe(&self) -> Result<MediaSubscription>;

    /// Read the settings document, `None` if it was never published.
    async fn read_settings(&self) -> Result<Option<SettingsDocument>>;

    /// Merge-write the settings document, creating it lazily if absent.
    ///
    /// Last writer wins; there is no conflict detection.
    async fn publish_settings(&self, settings: SettingsDocument) -> Result<()>;
}

/// Fractional upload progress observer, invoked at chunk boundaries with a
/// value in `[0, 1]`.
pub type ProgressFn = Box<dyn Fn(f64) + Send + Sync>;

/// Blob storage for the media files themselves.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload `data` under `key`, reporting fractional progress along the
    /// way, and return the public URL of the stored object.
    ///
    /// On failure nothing retrievable exists under `key`.
    async fn upload(
        &self,
        key: &str,
        content_type: &str,
        data: Bytes,
        progress: Option<ProgressFn>,
    ) -> Result<String>;

    /// Delete the object a previous upload returned `url` for.
    async fn delete_by_url(&self, url: &str) -> Result<()>;
}
