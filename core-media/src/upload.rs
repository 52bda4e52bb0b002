//! # Upload Pipeline
//!
//! Validates a candidate file, streams it to the blob store with progress,
//! and appends the resulting media record.
//!
//! ## Flow
//!
//! 1. **Slot check** - slots fill strictly left to right; only the next
//!    empty slot (`slot == canonical length`) is accepted. Anything else is
//!    rejected synchronously with no state change.
//! 2. **Type check** - the MIME type must match the `image/*` / `video/*`
//!    allow-list.
//! 3. **Transfer** - the bytes stream to the blob store under a
//!    collision-resistant key (`media/{epoch_millis}_{file_name}`), with
//!    fractional progress forwarded to the event bus at chunk boundaries.
//! 4. **Record** - on completion one media document is created pointing at
//!    the blob's public URL, with the precomputed order.
//!
//! A transfer failure aborts the pipeline: the failure is surfaced, the
//! uploading marker is cleared via `UploadEvent::Failed`, and no record is
//! ever created. The carousel interaction bracket closes after the settle
//! delay either way.

use crate::error::{MediaError, Result};
use crate::models::{MediaItem, MediaKind};
use crate::sync::MediaListSynchronizer;
use bridge_traits::store::{BlobStore, MediaStore, NewMediaDocument, ProgressFn};
use bridge_traits::time::Clock;
use core_runtime::events::{CoreEvent, EventBus, InteractionEvent, InteractionKind, UploadEvent};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// A file the operator picked for a slot.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Slot index the operator clicked.
    pub slot: usize,
    /// Original file name.
    pub file_name: String,
    /// MIME type reported by the picker.
    pub content_type: String,
    /// File contents.
    pub data: Bytes,
}

/// Streams uploads into the blob store and appends media records.
pub struct UploadPipeline {
    store: Arc<dyn MediaStore>,
    blobs: Arc<dyn BlobStore>,
    synchronizer: Arc<MediaListSynchronizer>,
    clock: Arc<dyn Clock>,
    event_bus: EventBus,
    settle_delay: Duration,
}

impl UploadPipeline {
    pub fn new(
        store: Arc<dyn MediaStore>,
        blobs: Arc<dyn BlobStore>,
        synchronizer: Arc<MediaListSynchronizer>,
        clock: Arc<dyn Clock>,
        event_bus: EventBus,
        settle_delay: Duration,
    ) -> Self {
        Self {
            store,
            blobs,
            synchronizer,
            clock,
            event_bus,
            settle_delay,
        }
    }

    /// Validate whether `slot` may open the file picker at all.
    ///
    /// Mirrors the dashboard's slot click rule: occupied slots do nothing,
    /// and only the next empty slot is clickable.
    pub async fn validate_slot(&self, slot: usize) -> Result<()> {
        let expected = self.synchronizer.len().await;
        if slot < expected {
            return Err(MediaError::SlotOccupied { slot });
        }
        if slot > expected {
            return Err(MediaError::OutOfOrderSlot { slot, expected });
        }
        Ok(())
    }

    /// Run the full pipeline for one file.
    ///
    /// # Errors
    ///
    /// - [`MediaError::SlotOccupied`] / [`MediaError::OutOfOrderSlot`] /
    ///   [`MediaError::UnsupportedMediaType`] - rejected before any transfer
    /// - [`MediaError::Transfer`] - the blob upload failed; no record exists
    /// - [`MediaError::Store`] - the record create failed after a successful
    ///   transfer
    #[instrument(skip(self, request), fields(file = %request.file_name, slot = request.slot))]
    pub async fn upload(&self, request: UploadRequest) -> Result<MediaItem> {
        // Validation errors are synchronous and change no state, so the
        // carousel is not suspended for them.
        self.validate_slot(request.slot).await?;
        let kind = MediaKind::from_content_type(&request.content_type).ok_or_else(|| {
            MediaError::UnsupportedMediaType {
                content_type: request.content_type.clone(),
            }
        })?;
        let order = request.slot as u32;

        self.event_bus
            .emit(CoreEvent::Interaction(InteractionEvent::Started {
                kind: InteractionKind::Upload,
            }))
            .ok();
        self.event_bus
            .emit(CoreEvent::Upload(UploadEvent::Started {
                slot: request.slot,
                file_name: request.file_name.clone(),
            }))
            .ok();

        let slot = request.slot;
        let result = self.transfer(request, kind, order).await;

        match &result {
            Ok(item) => {
                info!(id = %item.id, order, "upload completed");
                self.event_bus
                    .emit(CoreEvent::Upload(UploadEvent::Completed {
                        id: item.id.clone(),
                        slot,
                    }))
                    .ok();
            }
            Err(err) => {
                warn!("upload aborted: {}", err);
                self.event_bus
                    .emit(CoreEvent::Upload(UploadEvent::Failed {
                        message: err.to_string(),
                    }))
                    .ok();
            }
        }

        let bus = self.event_bus.clone();
        let settle = self.settle_delay;
        tokio::spawn(async move {
            tokio::time::sleep(settle).await;
            bus.emit(CoreEvent::Interaction(InteractionEvent::Ended)).ok();
        });

        result
    }

    async fn transfer(
        &self,
        request: UploadRequest,
        kind: MediaKind,
        order: u32,
    ) -> Result<MediaItem> {
        let key = format!(
            "media/{}_{}",
            self.clock.unix_timestamp_millis(),
            request.file_name
        );

        let bus = self.event_bus.clone();
        let progress: ProgressFn = Box::new(move |fraction| {
            bus.emit(CoreEvent::Upload(UploadEvent::Progress { fraction }))
                .ok();
        });

        let url = self
            .blobs
            .upload(&key, &request.content_type, request.data, Some(progress))
            .await
            .map_err(|err| MediaError::Transfer(err.to_string()))?;

        let doc = self
            .store
            .create(NewMediaDocument {
                url,
                media_type: kind.as_str().to_string(),
                file_name: request.file_name,
                order,
                created_at: self.clock.unix_timestamp(),
            })
            .await?;

        Ok(MediaItem::from_document(&doc))
    }
}

/// Slots shown per preview page.
pub const SLOTS_PER_PAGE: usize = 3;

/// Paging state for the upload slot strip.
///
/// The strip shows [`SLOTS_PER_PAGE`] slots at a time; a page can only be
/// advanced past once every slot on it is filled, keeping the "next empty
/// slot" visible at all times. Pure state, no persistence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotBoard {
    page: usize,
}

impl SlotBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Global slot indices visible on the current page.
    pub fn slot_range(&self) -> std::ops::Range<usize> {
        let start = self.page * SLOTS_PER_PAGE;
        start..start + SLOTS_PER_PAGE
    }

    pub fn can_go_prev(&self) -> bool {
        self.page > 0
    }

    /// Whether the current page is fully filled for a collection of
    /// `item_count` items.
    pub fn can_go_next(&self, item_count: usize) -> bool {
        item_count >= (self.page + 1) * SLOTS_PER_PAGE
    }

    /// Advance one page; returns false (and stays put) while the current
    /// page still has empty slots.
    pub fn try_next(&mut self, item_count: usize) -> bool {
        if self.can_go_next(item_count) {
            self.page += 1;
            true
        } else {
            false
        }
    }

    /// Go back one page; returns false at page 0.
    pub fn try_prev(&mut self) -> bool {
        if self.can_go_prev() {
            self.page -= 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memstore::{InMemoryBlobStore, InMemoryMediaStore};
    use chrono::{DateTime, TimeZone, Utc};
    use core_runtime::events::EventStream;

    const TEST_SETTLE: Duration = Duration::from_millis(20);

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            Utc.timestamp_opt(1_700_000_000, 0).unwrap()
        }
    }

    struct Fixture {
        pipeline: UploadPipeline,
        store: Arc<InMemoryMediaStore>,
        blobs: Arc<InMemoryBlobStore>,
        synchronizer: Arc<MediaListSynchronizer>,
        bus: EventBus,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryMediaStore::new());
        let blobs = Arc::new(InMemoryBlobStore::new());
        let bus = EventBus::new(64);
        let synchronizer = Arc::new(MediaListSynchronizer::new(bus.clone()));
        let pipeline = UploadPipeline::new(
            store.clone(),
            blobs.clone(),
            synchronizer.clone(),
            Arc::new(FixedClock),
            bus.clone(),
            TEST_SETTLE,
        );
        Fixture {
            pipeline,
            store,
            blobs,
            synchronizer,
            bus,
        }
    }

    fn request(slot: usize, file_name: &str, content_type: &str) -> UploadRequest {
        UploadRequest {
            slot,
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            data: Bytes::from_static(b"payload"),
        }
    }

    async fn refresh(f: &Fixture) {
        f.synchronizer
            .apply_snapshot(f.store.list_ordered().await.unwrap())
            .await;
    }

    #[tokio::test]
    async fn test_empty_store_scenario() {
        let f = fixture();
        refresh(&f).await;

        // First upload lands at order 0.
        let first = f
            .pipeline
            .upload(request(0, "a.png", "image/png"))
            .await
            .unwrap();
        assert_eq!(first.order, 0);
        assert_eq!(first.kind, MediaKind::Image);

        // Second upload (after the snapshot catches up) lands at order 1.
        refresh(&f).await;
        let second = f
            .pipeline
            .upload(request(1, "b.mp4", "video/mp4"))
            .await
            .unwrap();
        assert_eq!(second.order, 1);
        assert_eq!(second.kind, MediaKind::Video);

        assert_eq!(f.store.doc_count().await, 2);
    }

    #[tokio::test]
    async fn test_key_is_timestamp_prefixed() {
        let f = fixture();
        refresh(&f).await;

        f.pipeline
            .upload(request(0, "promo.png", "image/png"))
            .await
            .unwrap();

        assert!(f.blobs.contains("media/1700000000000_promo.png").await);
    }

    #[tokio::test]
    async fn test_unsupported_type_creates_nothing() {
        let f = fixture();
        refresh(&f).await;

        let result = f.pipeline.upload(request(0, "doc.pdf", "application/pdf")).await;

        assert!(matches!(
            result,
            Err(MediaError::UnsupportedMediaType { .. })
        ));
        assert_eq!(f.store.doc_count().await, 0);
        assert!(f.blobs.is_empty().await);
    }

    #[tokio::test]
    async fn test_out_of_order_slot_is_rejected() {
        let f = fixture();
        refresh(&f).await;

        assert!(matches!(
            f.pipeline.validate_slot(2).await,
            Err(MediaError::OutOfOrderSlot { slot: 2, expected: 0 })
        ));
        let result = f.pipeline.upload(request(2, "a.png", "image/png")).await;
        assert!(matches!(result, Err(MediaError::OutOfOrderSlot { .. })));
        assert_eq!(f.store.doc_count().await, 0);
    }

    #[tokio::test]
    async fn test_occupied_slot_is_rejected() {
        let f = fixture();
        refresh(&f).await;
        f.pipeline
            .upload(request(0, "a.png", "image/png"))
            .await
            .unwrap();
        refresh(&f).await;

        assert!(matches!(
            f.pipeline.validate_slot(0).await,
            Err(MediaError::SlotOccupied { slot: 0 })
        ));
    }

    #[tokio::test]
    async fn test_progress_reaches_the_bus() {
        let f = fixture();
        refresh(&f).await;
        let mut stream = EventStream::new(f.bus.subscribe())
            .filter(|e| matches!(e, CoreEvent::Upload(UploadEvent::Progress { .. })));

        f.pipeline
            .upload(request(0, "a.png", "image/png"))
            .await
            .unwrap();

        let mut fractions = Vec::new();
        while let Some(Ok(CoreEvent::Upload(UploadEvent::Progress { fraction }))) =
            stream.try_recv()
        {
            fractions.push(fraction);
        }
        assert_eq!(fractions.len(), InMemoryBlobStore::PROGRESS_STEPS);
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*fractions.last().unwrap(), 1.0);
    }

    #[tokio::test]
    async fn test_transfer_failure_creates_no_record() {
        let f = fixture();
        refresh(&f).await;
        f.blobs.set_fail_uploads(true).await;

        let mut stream = EventStream::new(f.bus.subscribe())
            .filter(|e| matches!(e, CoreEvent::Upload(UploadEvent::Failed { .. })));

        let result = f.pipeline.upload(request(0, "a.png", "image/png")).await;

        assert!(matches!(result, Err(MediaError::Transfer(_))));
        assert_eq!(f.store.doc_count().await, 0);
        assert!(matches!(
            stream.recv().await.unwrap(),
            CoreEvent::Upload(UploadEvent::Failed { .. })
        ));
    }

    #[tokio::test]
    async fn test_interaction_bracket_closes_after_failure() {
        let f = fixture();
        refresh(&f).await;
        f.blobs.set_fail_uploads(true).await;

        let mut stream = EventStream::new(f.bus.subscribe())
            .filter(|e| matches!(e, CoreEvent::Interaction(InteractionEvent::Ended)));

        f.pipeline
            .upload(request(0, "a.png", "image/png"))
            .await
            .unwrap_err();

        assert_eq!(
            stream.recv().await.unwrap(),
            CoreEvent::Interaction(InteractionEvent::Ended)
        );
    }

    #[test]
    fn test_slot_board_paging() {
        let mut board = SlotBoard::new();
        assert_eq!(board.slot_range(), 0..3);
        assert!(!board.can_go_prev());

        // Page 0 not yet full.
        assert!(!board.try_next(2));
        assert_eq!(board.page(), 0);

        // Three items fill page 0.
        assert!(board.try_next(3));
        assert_eq!(board.page(), 1);
        assert_eq!(board.slot_range(), 3..6);

        assert!(board.try_prev());
        assert!(!board.try_prev());
        assert_eq!(board.page(), 0);
    }
}
