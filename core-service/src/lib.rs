//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, the remote
//! media/blob stores, the identity gateway, a clock) into the signage core
//! and owns the lifetimes the individual crates deliberately leave to their
//! caller: the realtime subscription guard, the synchronizer's consumer
//! task, and the relay that feeds bus events into the carousel animator.
//!
//! Hosts hold one [`SignageService`] per dashboard session: `sign_in`,
//! `start` when the dashboard mounts, drive `tick` from the render loop,
//! `shutdown` on unmount.

pub mod error;

pub use error::{CoreError, Result};

use bridge_traits::store::{BlobStore, MediaStore, SubscriptionGuard};
use bridge_traits::time::Clock;
use core_auth::{AuthManager, IdentityGateway, Session};
use core_carousel::{AnimatorConfig, AnimatorState, CarouselAnimator, PreviewCycler, SlideshowSequencer};
use core_media::{
    MediaListSynchronizer, ReorderCoordinator, SlideDurationPublisher, UploadPipeline,
    DEFAULT_SETTLE_DELAY,
};
use core_runtime::events::{
    CoreEvent, EventBus, InteractionEvent, MediaEvent, RecvError, DEFAULT_EVENT_BUFFER_SIZE,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Recover the guard even if a panicking holder poisoned the lock; the
/// tick state stays usable either way.
fn lock_ignore_poison<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Aggregated handle to all bridge dependencies the core requires.
pub struct CoreDependencies {
    pub media_store: Arc<dyn MediaStore>,
    pub blob_store: Arc<dyn BlobStore>,
    pub identity: Arc<dyn IdentityGateway>,
    pub clock: Arc<dyn Clock>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit bridge handles.
    pub fn new(
        media_store: Arc<dyn MediaStore>,
        blob_store: Arc<dyn BlobStore>,
        identity: Arc<dyn IdentityGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            media_store,
            blob_store,
            identity,
            clock,
        }
    }
}

/// Service-level tuning.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Pause between a committed write and animation resume.
    pub settle_delay: Duration,
    /// Carousel animation tuning.
    pub animator: AnimatorConfig,
    /// Event bus buffer size.
    pub event_buffer: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            animator: AnimatorConfig::default(),
            event_buffer: DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

/// Background tasks owned by a mounted dashboard.
struct DashboardSession {
    /// Dropping this unsubscribes from the remote store.
    _guard: SubscriptionGuard,
    sync_task: JoinHandle<()>,
    relay_task: JoinHandle<()>,
}

/// Primary façade exposed to host applications.
pub struct SignageService {
    deps: CoreDependencies,
    event_bus: EventBus,
    auth: Arc<AuthManager>,
    synchronizer: Arc<MediaListSynchronizer>,
    reorder: Arc<ReorderCoordinator>,
    upload: Arc<UploadPipeline>,
    settings: Arc<SlideDurationPublisher>,
    animator: Arc<Mutex<CarouselAnimator>>,
    preview: Arc<Mutex<PreviewCycler>>,
    slideshow: Arc<Mutex<SlideshowSequencer>>,
    session: tokio::sync::Mutex<Option<DashboardSession>>,
}

impl SignageService {
    /// Create a new service from the provided dependencies.
    pub fn new(config: ServiceConfig, deps: CoreDependencies) -> Self {
        let event_bus = EventBus::new(config.event_buffer);

        let auth = Arc::new(AuthManager::new(deps.identity.clone(), event_bus.clone()));
        let synchronizer = Arc::new(MediaListSynchronizer::new(event_bus.clone()));
        let reorder = Arc::new(ReorderCoordinator::new(
            deps.media_store.clone(),
            deps.blob_store.clone(),
            synchronizer.clone(),
            event_bus.clone(),
            config.settle_delay,
        ));
        let upload = Arc::new(UploadPipeline::new(
            deps.media_store.clone(),
            deps.blob_store.clone(),
            synchronizer.clone(),
            deps.clock.clone(),
            event_bus.clone(),
            config.settle_delay,
        ));
        let settings = Arc::new(SlideDurationPublisher::new(
            deps.media_store.clone(),
            event_bus.clone(),
        ));

        Self {
            deps,
            event_bus,
            auth,
            synchronizer,
            reorder,
            upload,
            settings,
            animator: Arc::new(Mutex::new(CarouselAnimator::new(config.animator))),
            preview: Arc::new(Mutex::new(PreviewCycler::default())),
            slideshow: Arc::new(Mutex::new(SlideshowSequencer::new())),
            session: tokio::sync::Mutex::new(None),
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Sign an operator in. Required before [`start`](Self::start).
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        Ok(self.auth.sign_in(email, password).await?)
    }

    pub async fn sign_out(&self) {
        self.auth.sign_out().await;
    }

    pub async fn current_session(&self) -> Option<Session> {
        self.auth.current_session().await
    }

    /// Mount the dashboard: open the realtime subscription, start the
    /// synchronizer and the event relay, and load the shared settings.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotAuthenticated`] before a successful sign-in
    /// - [`CoreError::AlreadyStarted`] when the dashboard is already mounted
    /// - [`CoreError::Bridge`] when the subscription cannot be opened
    pub async fn start(&self) -> Result<()> {
        if self.auth.current_session().await.is_none() {
            return Err(CoreError::NotAuthenticated);
        }

        let mut session = self.session.lock().await;
        if session.is_some() {
            return Err(CoreError::AlreadyStarted);
        }

        // Seed the timers with the published dwell time before anything
        // starts counting.
        let settings = self.settings.load().await?;
        {
            let mut preview = lock_ignore_poison(&self.preview);
            preview.set_slide_duration(settings.slide_duration_secs);
        }
        {
            let mut slideshow = lock_ignore_poison(&self.slideshow);
            slideshow.set_slide_duration(settings.slide_duration_secs);
        }

        let subscription = self.deps.media_store.subscribe().await?;
        let (snapshots, guard) = subscription.into_parts();
        let sync_task = self.synchronizer.attach(snapshots);
        let relay_task = self.spawn_relay();

        *session = Some(DashboardSession {
            _guard: guard,
            sync_task,
            relay_task,
        });

        info!("dashboard started");
        Ok(())
    }

    /// Unmount the dashboard: release the subscription and stop the
    /// background tasks. Idempotent.
    pub async fn shutdown(&self) {
        let mut session = self.session.lock().await;
        if let Some(dashboard) = session.take() {
            dashboard.sync_task.abort();
            dashboard.relay_task.abort();
            // The guard drops here, cancelling the store subscription.
            info!("dashboard shut down");
        }
    }

    pub async fn is_started(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Forward bus events into the tick-based carousel state.
    fn spawn_relay(&self) -> JoinHandle<()> {
        let mut receiver = self.event_bus.subscribe();
        let animator = self.animator.clone();
        let preview = self.preview.clone();
        let slideshow = self.slideshow.clone();
        let synchronizer = self.synchronizer.clone();

        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(CoreEvent::Interaction(InteractionEvent::Started { kind })) => {
                        debug!(%kind, "suspending carousel");
                        lock_ignore_poison(&animator).begin_interaction();
                    }
                    Ok(CoreEvent::Interaction(InteractionEvent::Ended)) => {
                        lock_ignore_poison(&animator).resume_looping();
                    }
                    Ok(CoreEvent::Media(MediaEvent::SnapshotApplied { item_count })) => {
                        let kinds = synchronizer
                            .canonical()
                            .await
                            .iter()
                            .map(|item| item.kind)
                            .collect();
                        lock_ignore_poison(&animator).set_item_count(item_count);
                        lock_ignore_poison(&preview).set_item_count(item_count);
                        lock_ignore_poison(&slideshow).set_items(kinds);
                    }
                    Ok(CoreEvent::Media(MediaEvent::SettingsPublished {
                        slide_duration_secs,
                    })) => {
                        lock_ignore_poison(&preview).set_slide_duration(slide_duration_secs);
                        lock_ignore_poison(&slideshow).set_slide_duration(slide_duration_secs);
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(missed)) => {
                        debug!(missed, "event relay lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Advance every tick-based component; call from the host frame loop.
    pub fn tick(&self, dt: Duration) {
        lock_ignore_poison(&self.animator).tick(dt);
        lock_ignore_poison(&self.preview).tick(dt);
        lock_ignore_poison(&self.slideshow).tick(dt);
    }

    /// Current carousel translation in pixels.
    pub fn carousel_offset(&self) -> f64 {
        lock_ignore_poison(&self.animator).offset()
    }

    pub fn animator_state(&self) -> AnimatorState {
        lock_ignore_poison(&self.animator).state()
    }

    /// Index highlighted in the editing preview.
    pub fn preview_index(&self) -> usize {
        lock_ignore_poison(&self.preview).current_index()
    }

    /// Slide shown by the full-screen viewer, `None` while loading.
    pub fn slideshow_index(&self) -> Option<usize> {
        lock_ignore_poison(&self.slideshow).current_index()
    }

    /// The host's video element finished (or failed) the current slide.
    pub fn slideshow_video_ended(&self) {
        lock_ignore_poison(&self.slideshow).video_ended();
    }

    pub fn synchronizer(&self) -> &Arc<MediaListSynchronizer> {
        &self.synchronizer
    }

    pub fn reorder(&self) -> &Arc<ReorderCoordinator> {
        &self.reorder
    }

    pub fn uploads(&self) -> &Arc<UploadPipeline> {
        &self.upload
    }

    pub fn settings(&self) -> &Arc<SlideDurationPublisher> {
        &self.settings
    }
}

/// Build the desktop HTTP client for provider construction.
#[cfg(feature = "desktop-shims")]
pub fn desktop_http_client() -> Result<Arc<dyn bridge_traits::http::HttpClient>> {
    let client = bridge_desktop::ReqwestHttpClient::new()?;
    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::time::SystemClock;
    use bytes::Bytes;
    use core_auth::AuthError;
    use core_media::memstore::{InMemoryBlobStore, InMemoryMediaStore};
    use core_media::UploadRequest;

    struct StubIdentity;

    #[async_trait]
    impl IdentityGateway for StubIdentity {
        async fn sign_in_with_password(
            &self,
            email: &str,
            password: &str,
        ) -> core_auth::Result<Session> {
            if password == "correct" {
                Ok(Session {
                    user_id: "u1".into(),
                    email: email.into(),
                    id_token: "tok".into(),
                    expires_at: None,
                })
            } else {
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    fn service() -> (SignageService, Arc<InMemoryMediaStore>) {
        let store = Arc::new(InMemoryMediaStore::new());
        let deps = CoreDependencies::new(
            store.clone(),
            Arc::new(InMemoryBlobStore::new()),
            Arc::new(StubIdentity),
            Arc::new(SystemClock),
        );
        let config = ServiceConfig {
            settle_delay: Duration::from_millis(20),
            ..ServiceConfig::default()
        };
        (SignageService::new(config, deps), store)
    }

    macro_rules! wait_until {
        ($cond:expr) => {{
            let mut reached = false;
            for _ in 0..200 {
                if $cond {
                    reached = true;
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            assert!(reached, "condition not reached in time: {}", stringify!($cond));
        }};
    }

    #[tokio::test]
    async fn test_start_requires_sign_in() {
        let (service, _store) = service();
        assert!(matches!(
            service.start().await,
            Err(CoreError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let (service, _store) = service();
        service.sign_in("op@example.com", "correct").await.unwrap();

        service.start().await.unwrap();
        assert!(matches!(service.start().await, Err(CoreError::AlreadyStarted)));
        service.shutdown().await;
        assert!(!service.is_started().await);
    }

    #[tokio::test]
    async fn test_bad_credentials_stay_generic() {
        let (service, _store) = service();
        assert!(matches!(
            service.sign_in("op@example.com", "wrong").await,
            Err(CoreError::Auth(AuthError::InvalidCredentials))
        ));
    }

    #[tokio::test]
    async fn test_dashboard_flow_upload_then_reorder() {
        let (service, store) = service();
        service.sign_in("op@example.com", "correct").await.unwrap();
        service.start().await.unwrap();

        // Initial (empty) snapshot arrives through the subscription.
        wait_until!(service.synchronizer().is_ready().await);

        service
            .uploads()
            .upload(UploadRequest {
                slot: 0,
                file_name: "a.png".into(),
                content_type: "image/png".into(),
                data: Bytes::from_static(b"a"),
            })
            .await
            .unwrap();
        wait_until!(service.synchronizer().len().await == 1);

        service
            .uploads()
            .upload(UploadRequest {
                slot: 1,
                file_name: "b.mp4".into(),
                content_type: "video/mp4".into(),
                data: Bytes::from_static(b"b"),
            })
            .await
            .unwrap();
        wait_until!(service.synchronizer().len().await == 2);

        let canonical = service.synchronizer().canonical().await;
        let first = canonical[0].clone();
        let second = canonical[1].clone();

        service
            .reorder()
            .reorder(
                &format!("{}-0", first.id),
                &format!("{}-1", second.id),
            )
            .await
            .unwrap();

        wait_until!({
            let canonical = service.synchronizer().canonical().await;
            canonical.first().map(|item| item.id.as_str()) == Some(second.id.as_str())
        });

        let docs = store.list_ordered().await.unwrap();
        assert_eq!(docs[0].id, second.id);
        assert_eq!(docs[0].order, 0);
        assert_eq!(docs[1].id, first.id);
        assert_eq!(docs[1].order, 1);

        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_relay_suspends_and_resumes_animator() {
        let (service, store) = service();
        store
            .seed(
                "a",
                bridge_traits::store::NewMediaDocument {
                    url: "https://blobs.test/media/1_a.png".into(),
                    media_type: "image".into(),
                    file_name: "a.png".into(),
                    order: 0,
                    created_at: 1_700_000_000,
                },
            )
            .await;

        service.sign_in("op@example.com", "correct").await.unwrap();
        service.start().await.unwrap();
        wait_until!(service.synchronizer().is_ready().await);

        // Emitting the interaction bracket suspends, then resumes.
        service
            .event_bus()
            .emit(CoreEvent::Interaction(InteractionEvent::Started {
                kind: core_runtime::events::InteractionKind::Reorder,
            }))
            .ok();
        wait_until!(service.animator_state() == AnimatorState::Interacting);

        service
            .event_bus()
            .emit(CoreEvent::Interaction(InteractionEvent::Ended))
            .ok();
        wait_until!(service.animator_state() == AnimatorState::Looping);

        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_settings_feed_preview_and_slideshow() {
        let (service, _store) = service();
        service.sign_in("op@example.com", "correct").await.unwrap();
        service.start().await.unwrap();
        wait_until!(service.synchronizer().is_ready().await);

        service.settings().publish(10).await.unwrap();

        // The slideshow becomes ready once it has items AND settings; with
        // an empty canonical list it stays at None.
        assert_eq!(service.slideshow_index(), None);

        service.shutdown().await;
    }
}
