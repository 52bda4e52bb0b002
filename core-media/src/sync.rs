//! # Media List Synchronizer
//!
//! Maintains the live, ordered view of the remote media collection.
//!
//! ## Overview
//!
//! The synchronizer consumes the snapshot stream a
//! [`MediaStore::subscribe`](bridge_traits::store::MediaStore::subscribe)
//! call produces and keeps two derived views:
//!
//! - the **canonical list**: every media item, ascending by `order`
//! - the **loop list**: the canonical list concatenated with itself, giving
//!   the carousel a duplicate to scroll into before wrapping
//!
//! Every snapshot replaces the canonical list wholesale; there is no
//! incremental patching. Derived views stay empty until the first snapshot
//! lands so nothing downstream does work against the transient pre-load
//! state.
//!
//! A failed or closed subscription is logged and otherwise ignored: the last
//! known state remains visible indefinitely, and recovery means remounting
//! the dashboard.

use crate::models::{build_loop_list, LoopItem, MediaItem};
use bridge_traits::store::MediaDocument;
use core_runtime::events::{CoreEvent, EventBus, MediaEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct SyncState {
    canonical: Vec<MediaItem>,
    loop_list: Vec<LoopItem>,
    /// False until the first snapshot has been applied.
    ready: bool,
}

/// Live, ordered view of all media records.
pub struct MediaListSynchronizer {
    state: Arc<RwLock<SyncState>>,
    event_bus: EventBus,
}

impl MediaListSynchronizer {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            state: Arc::new(RwLock::new(SyncState::default())),
            event_bus,
        }
    }

    /// Clone for background task (shares the same state and bus).
    fn clone_for_task(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            event_bus: self.event_bus.clone(),
        }
    }

    /// Spawn the consumer loop for a snapshot channel.
    ///
    /// The caller keeps the matching [`SubscriptionGuard`]
    /// (`bridge_traits::store::SubscriptionGuard`); once it is dropped the
    /// producer stops, the channel drains, and this task exits.
    pub fn attach(&self, mut snapshots: mpsc::Receiver<Vec<MediaDocument>>) -> JoinHandle<()> {
        let synchronizer = self.clone_for_task();
        tokio::spawn(async move {
            while let Some(snapshot) = snapshots.recv().await {
                synchronizer.apply_snapshot(snapshot).await;
            }
            // Channel closed: either an orderly unsubscribe or a dead
            // listener. Nothing to recover; the UI keeps the last state.
            warn!("media snapshot stream closed; no further updates will be applied");
        })
    }

    /// Replace the canonical list with a fresh ordered snapshot.
    pub async fn apply_snapshot(&self, docs: Vec<MediaDocument>) {
        let mut items: Vec<MediaItem> = docs.iter().map(MediaItem::from_document).collect();
        items.sort_by_key(|item| item.order);

        let count = items.len();
        {
            let mut state = self.state.write().await;
            state.loop_list = build_loop_list(&items);
            state.canonical = items;
            state.ready = true;
        }

        debug!(item_count = count, "applied media snapshot");
        self.event_bus
            .emit(CoreEvent::Media(MediaEvent::SnapshotApplied {
                item_count: count,
            }))
            .ok();

        if count == 0 {
            info!("media collection is empty");
        }
    }

    /// The canonical ordered list; empty before the initial load completes.
    pub async fn canonical(&self) -> Vec<MediaItem> {
        self.state.read().await.canonical.clone()
    }

    /// The duplicated loop list; empty before the initial load completes.
    pub async fn loop_list(&self) -> Vec<LoopItem> {
        let state = self.state.read().await;
        if !state.ready {
            return Vec::new();
        }
        state.loop_list.clone()
    }

    /// Whether the initial snapshot has been applied.
    pub async fn is_ready(&self) -> bool {
        self.state.read().await.ready
    }

    /// Number of items in the canonical list.
    pub async fn len(&self) -> usize {
        self.state.read().await.canonical.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Locate a media item's canonical index by id.
    pub async fn find_index(&self, id: &str) -> Option<usize> {
        self.state
            .read()
            .await
            .canonical
            .iter()
            .position(|item| item.id == id)
    }
}
