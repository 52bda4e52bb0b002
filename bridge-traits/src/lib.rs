//! # Host Bridge Traits
//!
//! Abstraction layer between the signage core and everything outside it.
//!
//! ## Overview
//!
//! The dashboard core owns no persistence and no transport: media records
//! live in a hosted document collection, files in a hosted blob store, and
//! requests travel over whatever HTTP stack the host platform provides. Each
//! trait here represents one of those capabilities so the core can be
//! exercised against in-memory fakes and shipped against real backends.
//!
//! ## Traits
//!
//! - [`MediaStore`](store::MediaStore) - Ordered media collection, settings
//!   singleton, realtime change subscription
//! - [`BlobStore`](store::BlobStore) - Progress-reporting uploads, deletion
//! - [`HttpClient`](http::HttpClient) - Async HTTP transport
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Subscription lifecycle
//!
//! [`MediaStore::subscribe`](store::MediaStore::subscribe) hands back a
//! snapshot stream together with a [`SubscriptionGuard`](store::SubscriptionGuard);
//! the caller keeps the guard for exactly as long as the dashboard view is
//! mounted and drops it to unsubscribe. Producers MUST stop promptly once
//! the guard is gone.
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Adapters should
//! convert backend-specific failures into it with enough context to log, and
//! never panic across the trait boundary.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`; implementations are shared via
//! `Arc` across async tasks.

pub mod error;
pub mod http;
pub mod store;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use store::{
    BlobStore, MediaDocument, MediaStore, MediaSubscription, NewMediaDocument, OrderAssignment,
    ProgressFn, SettingsDocument, SubscriptionGuard,
};
pub use time::{Clock, SystemClock};
