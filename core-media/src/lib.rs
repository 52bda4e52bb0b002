//! # Core Media
//!
//! The write side of the signage dashboard: the live ordered view of the
//! remote media collection and every operation that mutates it.
//!
//! ## Modules
//!
//! - [`models`] - domain types, loop-list construction, order invariants
//! - [`sync`] - the Media List Synchronizer consuming realtime snapshots
//! - [`ordering`] - drag-and-drop reorder commits and delete/renumber
//! - [`upload`] - the upload pipeline and slot paging
//! - [`settings`] - the shared slide-duration record
//! - [`memstore`] - in-memory backend doubles for tests
//!
//! ## Invariant
//!
//! The `order` fields of all live media records always form a contiguous
//! 0-based permutation. Reorders rewrite the whole permutation atomically;
//! deletes renumber the survivors; uploads append at the end. Nothing else
//! writes `order`.

pub mod error;
pub mod memstore;
pub mod models;
pub mod ordering;
pub mod settings;
pub mod sync;
pub mod upload;

pub use error::{MediaError, Result};
pub use models::{
    build_loop_list, original_id, LoopItem, MediaItem, MediaKind, SlideSettings,
    SLIDE_DURATION_DEFAULT_SECS, SLIDE_DURATION_MAX_SECS, SLIDE_DURATION_MIN_SECS,
};
pub use ordering::{ReorderCoordinator, DEFAULT_SETTLE_DELAY};
pub use settings::SlideDurationPublisher;
pub use sync::MediaListSynchronizer;
pub use upload::{SlotBoard, UploadPipeline, UploadRequest, SLOTS_PER_PAGE};
