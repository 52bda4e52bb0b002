//! # Slide-Duration Publisher
//!
//! Reads and publishes the single shared settings record controlling the
//! full-screen viewer's per-slide dwell time (and, cosmetically, the
//! dashboard's preview border timer).
//!
//! One read on mount, one idempotent merge-write per publish. The store
//! lazily allocates the document on first publish; thereafter it is updated
//! in place. There is no conflict detection: concurrent editors silently
//! overwrite each other and every session re-converges through its own
//! reads.

use crate::error::Result;
use crate::models::SlideSettings;
use bridge_traits::store::{MediaStore, SettingsDocument};
use core_runtime::events::{CoreEvent, EventBus, MediaEvent};
use std::sync::Arc;
use tracing::{info, instrument};

/// Read/write access to the shared slide duration.
pub struct SlideDurationPublisher {
    store: Arc<dyn MediaStore>,
    event_bus: EventBus,
}

impl SlideDurationPublisher {
    pub fn new(store: Arc<dyn MediaStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Read the current settings; falls back to the default dwell time when
    /// nothing was ever published.
    pub async fn load(&self) -> Result<SlideSettings> {
        let settings = self
            .store
            .read_settings()
            .await?
            .map(|doc| SlideSettings {
                slide_duration_secs: doc.slide_duration_secs,
            })
            .unwrap_or_default();
        Ok(settings)
    }

    /// Publish a new dwell time. Last writer wins.
    ///
    /// # Errors
    ///
    /// - [`MediaError::InvalidSlideDuration`](crate::MediaError::InvalidSlideDuration)
    ///   when `secs` falls outside the allowed bounds; nothing is written
    /// - [`MediaError::Store`](crate::MediaError::Store) when the write fails
    #[instrument(skip(self))]
    pub async fn publish(&self, secs: u32) -> Result<()> {
        let settings = SlideSettings {
            slide_duration_secs: secs,
        };
        settings.validate()?;

        self.store
            .publish_settings(SettingsDocument {
                slide_duration_secs: secs,
            })
            .await?;

        info!(slide_duration_secs = secs, "slide duration published");
        self.event_bus
            .emit(CoreEvent::Media(MediaEvent::SettingsPublished {
                slide_duration_secs: secs,
            }))
            .ok();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MediaError;
    use crate::memstore::InMemoryMediaStore;
    use crate::models::SLIDE_DURATION_DEFAULT_SECS;
    use core_runtime::events::EventStream;

    fn publisher() -> (SlideDurationPublisher, Arc<InMemoryMediaStore>, EventBus) {
        let store = Arc::new(InMemoryMediaStore::new());
        let bus = EventBus::new(16);
        (
            SlideDurationPublisher::new(store.clone(), bus.clone()),
            store,
            bus,
        )
    }

    #[tokio::test]
    async fn test_load_defaults_when_never_published() {
        let (publisher, _store, _bus) = publisher();
        let settings = publisher.load().await.unwrap();
        assert_eq!(settings.slide_duration_secs, SLIDE_DURATION_DEFAULT_SECS);
    }

    #[tokio::test]
    async fn test_publish_creates_lazily_then_updates() {
        let (publisher, store, _bus) = publisher();

        publisher.publish(10).await.unwrap();
        assert_eq!(
            store.read_settings().await.unwrap(),
            Some(SettingsDocument {
                slide_duration_secs: 10
            })
        );

        publisher.publish(20).await.unwrap();
        assert_eq!(publisher.load().await.unwrap().slide_duration_secs, 20);
    }

    #[tokio::test]
    async fn test_out_of_bounds_duration_writes_nothing() {
        let (publisher, store, _bus) = publisher();

        assert!(matches!(
            publisher.publish(3).await,
            Err(MediaError::InvalidSlideDuration { .. })
        ));
        assert!(matches!(
            publisher.publish(100).await,
            Err(MediaError::InvalidSlideDuration { .. })
        ));
        assert_eq!(store.read_settings().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_publish_emits_event() {
        let (publisher, _store, bus) = publisher();
        let mut stream = EventStream::new(bus.subscribe());

        publisher.publish(15).await.unwrap();

        assert_eq!(
            stream.recv().await.unwrap(),
            CoreEvent::Media(MediaEvent::SettingsPublished {
                slide_duration_secs: 15
            })
        );
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        // Two publishers over the same store: no conflict detection, the
        // later write simply overwrites.
        let store = Arc::new(InMemoryMediaStore::new());
        let bus = EventBus::new(16);
        let first = SlideDurationPublisher::new(store.clone(), bus.clone());
        let second = SlideDurationPublisher::new(store.clone(), bus);

        first.publish(10).await.unwrap();
        second.publish(30).await.unwrap();

        assert_eq!(first.load().await.unwrap().slide_duration_secs, 30);
    }
}
