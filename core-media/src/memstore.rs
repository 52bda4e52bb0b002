//! In-memory store implementations.
//!
//! Backend doubles for the bridge traits, used by this crate's tests and by
//! downstream crates (`core-service` wires them in its own tests). Snapshots
//! are pushed to subscribers on every mutation, mimicking the hosted
//! backend's realtime behavior. Not intended for production use.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::store::{
    BlobStore, MediaDocument, MediaStore, MediaSubscription, NewMediaDocument, OrderAssignment,
    ProgressFn, SettingsDocument, SubscriptionGuard,
};
use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

const BLOB_URL_PREFIX: &str = "https://blobs.test/";

#[derive(Default)]
struct StoreState {
    docs: HashMap<String, MediaDocument>,
    settings: Option<SettingsDocument>,
    next_id: u64,
    fail_next_apply_order: bool,
    fail_next_create: bool,
    apply_order_calls: u64,
    watchers: Vec<mpsc::Sender<Vec<MediaDocument>>>,
}

impl StoreState {
    fn ordered(&self) -> Vec<MediaDocument> {
        let mut docs: Vec<MediaDocument> = self.docs.values().cloned().collect();
        docs.sort_by_key(|d| d.order);
        docs
    }

    fn notify(&mut self) {
        let snapshot = self.ordered();
        self.watchers
            .retain(|tx| tx.try_send(snapshot.clone()).is_ok());
    }
}

/// In-memory [`MediaStore`] with fault injection.
#[derive(Default)]
pub struct InMemoryMediaStore {
    state: RwLock<StoreState>,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document under an explicit id, bypassing validation.
    pub async fn seed(&self, id: &str, doc: NewMediaDocument) {
        let mut state = self.state.write().await;
        state.docs.insert(
            id.to_string(),
            MediaDocument {
                id: id.to_string(),
                url: doc.url,
                media_type: doc.media_type,
                file_name: doc.file_name,
                order: doc.order,
                created_at: Some(doc.created_at),
            },
        );
        state.notify();
    }

    /// Make the next `apply_order` call fail before touching any record.
    pub async fn fail_next_apply_order(&self) {
        self.state.write().await.fail_next_apply_order = true;
    }

    /// Make the next `create` call fail.
    pub async fn fail_next_create(&self) {
        self.state.write().await.fail_next_create = true;
    }

    /// Number of successful `apply_order` batches committed so far.
    pub async fn apply_order_calls(&self) -> u64 {
        self.state.read().await.apply_order_calls
    }

    pub async fn doc_count(&self) -> usize {
        self.state.read().await.docs.len()
    }
}

#[async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn list_ordered(&self) -> Result<Vec<MediaDocument>> {
        Ok(self.state.read().await.ordered())
    }

    async fn create(&self, doc: NewMediaDocument) -> Result<MediaDocument> {
        let mut state = self.state.write().await;
        if state.fail_next_create {
            state.fail_next_create = false;
            return Err(BridgeError::OperationFailed(
                "simulated create failure".to_string(),
            ));
        }

        state.next_id += 1;
        let created = MediaDocument {
            id: format!("doc{}", state.next_id),
            url: doc.url,
            media_type: doc.media_type,
            file_name: doc.file_name,
            order: doc.order,
            created_at: Some(doc.created_at),
        };
        state.docs.insert(created.id.clone(), created.clone());
        state.notify();
        Ok(created)
    }

    async fn apply_order(&self, assignments: &[OrderAssignment]) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_next_apply_order {
            state.fail_next_apply_order = false;
            return Err(BridgeError::OperationFailed(
                "simulated mid-batch failure".to_string(),
            ));
        }

        // Validate the whole batch first so a bad id cannot leave a
        // partial write behind.
        for assignment in assignments {
            if !state.docs.contains_key(&assignment.id) {
                return Err(BridgeError::OperationFailed(format!(
                    "unknown document in batch: {}",
                    assignment.id
                )));
            }
        }

        for assignment in assignments {
            if let Some(doc) = state.docs.get_mut(&assignment.id) {
                doc.order = assignment.order;
            }
        }
        state.apply_order_calls += 1;
        state.notify();
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state.docs.remove(id).is_none() {
            return Err(BridgeError::OperationFailed(format!(
                "unknown document: {}",
                id
            )));
        }
        state.notify();
        Ok(())
    }

    async fn subscribe(&self) -> Result<MediaSubscription> {
        let (tx, rx) = mpsc::channel(16);
        {
            let mut state = self.state.write().await;
            // Initial snapshot reflects current state, like onSnapshot.
            tx.try_send(state.ordered()).ok();
            state.watchers.push(tx);
        }
        Ok(MediaSubscription::new(
            rx,
            SubscriptionGuard::new(CancellationToken::new()),
        ))
    }

    async fn read_settings(&self) -> Result<Option<SettingsDocument>> {
        Ok(self.state.read().await.settings)
    }

    async fn publish_settings(&self, settings: SettingsDocument) -> Result<()> {
        self.state.write().await.settings = Some(settings);
        Ok(())
    }
}

/// In-memory [`BlobStore`] with fault injection and chunked progress.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, (String, Bytes)>>,
    fail_uploads: RwLock<bool>,
}

impl InMemoryBlobStore {
    /// Progress is reported in four equal steps per upload.
    pub const PROGRESS_STEPS: usize = 4;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}{}", BLOB_URL_PREFIX, key)
    }

    pub async fn set_fail_uploads(&self, fail: bool) {
        *self.fail_uploads.write().await = fail;
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.blobs.read().await.contains_key(key)
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload(
        &self,
        key: &str,
        content_type: &str,
        data: Bytes,
        progress: Option<ProgressFn>,
    ) -> Result<String> {
        if *self.fail_uploads.read().await {
            return Err(BridgeError::OperationFailed(
                "simulated transfer failure".to_string(),
            ));
        }

        if let Some(report) = &progress {
            for step in 1..=Self::PROGRESS_STEPS {
                report(step as f64 / Self::PROGRESS_STEPS as f64);
            }
        }

        self.blobs
            .write()
            .await
            .insert(key.to_string(), (content_type.to_string(), data));
        Ok(self.url_for(key))
    }

    async fn delete_by_url(&self, url: &str) -> Result<()> {
        let key = url
            .strip_prefix(BLOB_URL_PREFIX)
            .ok_or_else(|| BridgeError::OperationFailed(format!("not a blob url: {}", url)))?;
        if self.blobs.write().await.remove(key).is_none() {
            return Err(BridgeError::OperationFailed(format!(
                "unknown blob: {}",
                key
            )));
        }
        Ok(())
    }
}
