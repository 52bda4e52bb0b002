//! # Reorder Coordinator
//!
//! Translates drag-and-drop gestures and delete actions into atomic order
//! rewrites of the remote collection.
//!
//! ## Reordering
//!
//! A drag gesture arrives as two sortable identifiers out of the loop list.
//! Both map back to an underlying record by stripping the positional suffix;
//! when they resolve to the SAME record the drag landed on the duplicated
//! copy of itself and the whole operation is a no-op. Otherwise the
//! coordinator performs the classic remove-and-reinsert on the canonical
//! list and commits `order = index` for every record as one atomic batch -
//! a partial reorder is never observable.
//!
//! ## Deleting
//!
//! Deletion removes the document, renumbers the survivors so `order` stays
//! contiguous from 0 (writing only the records whose position actually
//! changed), then deletes the blob. The renumbering runs before the blob
//! delete so the ordering invariant holds even when the blob store fails.
//!
//! ## Interaction bracketing
//!
//! Both operations suspend the carousel by emitting
//! `InteractionEvent::Started` up front and `InteractionEvent::Ended` a
//! fixed settle delay after the write resolves - success or failure - so the
//! subscription's own snapshot lands before animation resumes.

use crate::error::{MediaError, Result};
use crate::models::{array_move, original_id};
use crate::sync::MediaListSynchronizer;
use bridge_traits::store::{BlobStore, MediaStore, OrderAssignment};
use core_runtime::events::{CoreEvent, EventBus, InteractionEvent, InteractionKind, MediaEvent};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Default pause between a committed write and animation resume.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Coordinates order-mutating operations against the remote store.
pub struct ReorderCoordinator {
    store: Arc<dyn MediaStore>,
    blobs: Arc<dyn BlobStore>,
    synchronizer: Arc<MediaListSynchronizer>,
    event_bus: EventBus,
    settle_delay: Duration,
}

impl ReorderCoordinator {
    pub fn new(
        store: Arc<dyn MediaStore>,
        blobs: Arc<dyn BlobStore>,
        synchronizer: Arc<MediaListSynchronizer>,
        event_bus: EventBus,
        settle_delay: Duration,
    ) -> Self {
        Self {
            store,
            blobs,
            synchronizer,
            event_bus,
            settle_delay,
        }
    }

    /// Commit a drag gesture from one sortable position to another.
    ///
    /// # Errors
    ///
    /// - [`MediaError::NotFound`] when either end of the gesture no longer
    ///   maps to a canonical item (stale gesture against a fresh snapshot)
    /// - [`MediaError::Store`] when the batch write fails; no record was
    ///   updated in that case
    #[instrument(skip(self))]
    pub async fn reorder(&self, source_sortable: &str, dest_sortable: &str) -> Result<()> {
        let source_id = original_id(source_sortable);
        let dest_id = original_id(dest_sortable);

        if source_id == dest_id {
            // The gesture stayed on the same underlying record (possibly its
            // duplicate in the other half of the loop list).
            debug!(id = source_id, "reorder is a no-op");
            return Ok(());
        }

        self.begin_interaction(InteractionKind::Reorder);
        let result = self.reorder_inner(source_id, dest_id).await;
        self.end_interaction_after_settle();
        result
    }

    async fn reorder_inner(&self, source_id: &str, dest_id: &str) -> Result<()> {
        let mut items = self.synchronizer.canonical().await;

        let from = items
            .iter()
            .position(|item| item.id == source_id)
            .ok_or_else(|| MediaError::NotFound {
                id: source_id.to_string(),
            })?;
        let to = items
            .iter()
            .position(|item| item.id == dest_id)
            .ok_or_else(|| MediaError::NotFound {
                id: dest_id.to_string(),
            })?;

        array_move(&mut items, from, to);

        let assignments: Vec<OrderAssignment> = items
            .iter()
            .enumerate()
            .map(|(index, item)| OrderAssignment {
                id: item.id.clone(),
                order: index as u32,
            })
            .collect();

        self.store.apply_order(&assignments).await?;

        info!(id = source_id, from, to, "order batch committed");
        self.event_bus
            .emit(CoreEvent::Media(MediaEvent::Reordered {
                id: source_id.to_string(),
                from,
                to,
            }))
            .ok();
        Ok(())
    }

    /// Delete a media item: document, survivor renumbering, then blob.
    ///
    /// # Errors
    ///
    /// - [`MediaError::NotFound`] when the id is not in the canonical list
    /// - [`MediaError::Store`] when the document delete or renumber batch
    ///   fails
    /// - [`MediaError::Transfer`] when the blob delete fails; the document
    ///   is already gone and survivors are already renumbered
    #[instrument(skip(self))]
    pub async fn remove(&self, id: &str) -> Result<()> {
        self.begin_interaction(InteractionKind::Delete);
        let result = self.remove_inner(id).await;
        self.end_interaction_after_settle();
        result
    }

    async fn remove_inner(&self, id: &str) -> Result<()> {
        let items = self.synchronizer.canonical().await;
        let target = items
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or_else(|| MediaError::NotFound { id: id.to_string() })?;

        self.store.delete(id).await?;

        // Close the gap the deletion left: only survivors whose position
        // changed need a write.
        let assignments: Vec<OrderAssignment> = items
            .iter()
            .filter(|item| item.id != id)
            .enumerate()
            .filter(|(index, item)| item.order as usize != *index)
            .map(|(index, item)| OrderAssignment {
                id: item.id.clone(),
                order: index as u32,
            })
            .collect();

        if !assignments.is_empty() {
            self.store.apply_order(&assignments).await?;
        }

        info!(id, renumbered = assignments.len(), "media item deleted");
        self.event_bus
            .emit(CoreEvent::Media(MediaEvent::Deleted {
                id: id.to_string(),
            }))
            .ok();

        if let Err(err) = self.blobs.delete_by_url(&target.url).await {
            warn!(id, "blob delete failed: {}", err);
            return Err(MediaError::Transfer(err.to_string()));
        }

        Ok(())
    }

    fn begin_interaction(&self, kind: InteractionKind) {
        self.event_bus
            .emit(CoreEvent::Interaction(InteractionEvent::Started { kind }))
            .ok();
    }

    fn end_interaction_after_settle(&self) {
        let bus = self.event_bus.clone();
        let settle = self.settle_delay;
        tokio::spawn(async move {
            tokio::time::sleep(settle).await;
            bus.emit(CoreEvent::Interaction(InteractionEvent::Ended)).ok();
        });
    }
}
