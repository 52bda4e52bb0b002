use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    /// Rejected synchronously before any state change.
    #[error("Unsupported media type: {content_type}. Only images and videos are allowed")]
    UnsupportedMediaType { content_type: String },

    /// Slots fill strictly left to right; only the next empty slot accepts
    /// an upload.
    #[error("Slot {slot} is not the next empty slot (expected {expected}); fill slots left to right")]
    OutOfOrderSlot { slot: usize, expected: usize },

    #[error("Slot {slot} already holds media")]
    SlotOccupied { slot: usize },

    #[error("Slide duration {secs}s is outside the allowed range {min}-{max}s")]
    InvalidSlideDuration { secs: u32, min: u32, max: u32 },

    #[error("Media item not found: {id}")]
    NotFound { id: String },

    /// Document store failure (list, create, batch, delete, settings).
    #[error("Remote store error: {0}")]
    Store(#[from] BridgeError),

    /// Blob transfer failure (upload or delete); the in-flight operation
    /// aborted and persisted records are untouched.
    #[error("Transfer failed: {0}")]
    Transfer(String),
}

pub type Result<T> = std::result::Result<T, MediaError>;
