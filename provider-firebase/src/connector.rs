//! Firebase REST connector
//!
//! Implements the `MediaStore`, `BlobStore` and `IdentityGateway` contracts
//! over three Firebase REST surfaces:
//!
//! - **Firestore** for the ordered `media` collection and the `settings`
//!   singleton (`documents:runQuery`, `documents:commit` for the atomic
//!   order batch, `createDocument`, `patch` with a field mask)
//! - **Storage** for the blobs, using the resumable upload protocol so
//!   progress lands on every chunk boundary
//! - **Identity Toolkit** for e-mail/password sign-in
//!
//! # Change subscription
//!
//! Firestore's push listener is a webchannel protocol with no stable REST
//! equivalent, so `subscribe` polls the ordered query and forwards a
//! snapshot only when the result set actually changed. The bridge contract
//! (snapshot stream + guard-owned lifecycle) hides the transport; consumers
//! cannot tell polling from push.
//!
//! # Retry
//!
//! Firestore and delete requests retry 429/5xx with exponential backoff;
//! 4xx never retries, and resumable-upload requests never retry at all (a
//! replay would desync the session offset).

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::store::{
    BlobStore, MediaDocument, MediaStore, MediaSubscription, NewMediaDocument, OrderAssignment,
    ProgressFn, SettingsDocument, SubscriptionGuard,
};
use bytes::Bytes;
use chrono::Utc;
use core_auth::{AuthError, IdentityGateway, Session};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::FirebaseError;
use crate::types::{
    ApiErrorResponse, CollectionSelector, CommitRequest, CommitWrite, DocumentMask,
    FieldReference, FirestoreDocument, QueryOrder, RunQueryRequest, RunQueryResponseElement,
    SignInRequest, SignInResponse, StorageObject, StructuredQuery,
};

/// Firestore API base URL
const FIRESTORE_API_BASE: &str = "https://firestore.googleapis.com/v1";

/// Storage API base URL
const STORAGE_API_BASE: &str = "https://firebasestorage.googleapis.com/v0";

/// Identity Toolkit API base URL
const IDENTITY_API_BASE: &str = "https://identitytoolkit.googleapis.com/v1";

/// Connector configuration: backend identifiers plus transport tuning.
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub project_id: String,
    pub api_key: String,
    pub storage_bucket: String,
    /// Collection holding the ordered media documents.
    pub media_collection: String,
    /// Collection holding the single settings document.
    pub settings_collection: String,
    /// Change-subscription poll cadence.
    pub poll_interval: Duration,
    /// Resumable upload chunk size in bytes.
    pub upload_chunk_bytes: usize,
    /// Maximum attempts for 429/5xx responses.
    pub retry_attempts: u32,
}

impl FirebaseConfig {
    pub fn new(
        project_id: impl Into<String>,
        api_key: impl Into<String>,
        storage_bucket: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            api_key: api_key.into(),
            storage_bucket: storage_bucket.into(),
            media_collection: "media".to_string(),
            settings_collection: "settings".to_string(),
            poll_interval: Duration::from_secs(2),
            upload_chunk_bytes: 256 * 1024,
            retry_attempts: 3,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_upload_chunk_bytes(mut self, bytes: usize) -> Self {
        self.upload_chunk_bytes = bytes;
        self
    }
}

/// Firebase backend connector.
pub struct FirebaseConnector {
    http_client: Arc<dyn HttpClient>,
    config: FirebaseConfig,
    /// Bearer credential; populated by a successful sign-in.
    id_token: Arc<RwLock<Option<String>>>,
}

impl FirebaseConnector {
    pub fn new(http_client: Arc<dyn HttpClient>, config: FirebaseConfig) -> Self {
        Self {
            http_client,
            config,
            id_token: Arc::new(RwLock::new(None)),
        }
    }

    /// Install the bearer token used for authenticated calls.
    ///
    /// A successful [`IdentityGateway::sign_in_with_password`] call does
    /// this automatically.
    pub async fn set_id_token(&self, token: impl Into<String>) {
        let mut current = self.id_token.write().await;
        *current = Some(token.into());
    }

    /// Clone for background task (avoids `Arc<Arc<...>>`)
    fn clone_for_task(&self) -> Self {
        Self {
            http_client: Arc::clone(&self.http_client),
            config: self.config.clone(),
            id_token: Arc::clone(&self.id_token),
        }
    }

    fn documents_base(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            FIRESTORE_API_BASE, self.config.project_id
        )
    }

    /// Full Firestore resource name for a media document.
    fn media_doc_name(&self, id: &str) -> String {
        format!(
            "projects/{}/databases/(default)/documents/{}/{}",
            self.config.project_id, self.config.media_collection, id
        )
    }

    async fn authorize(&self, request: HttpRequest) -> HttpRequest {
        match self.id_token.read().await.as_deref() {
            Some(token) => request.bearer_token(token),
            None => request,
        }
    }

    /// Execute with exponential backoff on 429/5xx and transport errors.
    async fn execute_with_retry(&self, request: HttpRequest) -> Result<HttpResponse> {
        let max_retries = self.config.retry_attempts.max(1);
        let mut attempt = 0;

        loop {
            match self.http_client.execute(request.clone()).await {
                Ok(response) => {
                    let status = response.status;

                    if response.is_success() {
                        return Ok(response);
                    } else if status == 429 || response.is_server_error() {
                        attempt += 1;
                        if attempt >= max_retries {
                            warn!(
                                "request failed after {} attempts: status={}",
                                max_retries, status
                            );
                            return Err(FirebaseError::Api {
                                status_code: status,
                                message: format!("request failed after {} retries", max_retries),
                            }
                            .into());
                        }

                        let backoff_ms = 100u64 * 2u64.pow(attempt);
                        warn!(
                            "request failed (attempt {}/{}): status={}, retrying in {}ms",
                            attempt, max_retries, status, backoff_ms
                        );
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    } else {
                        return Err(FirebaseError::Api {
                            status_code: status,
                            message: Self::error_message(&response),
                        }
                        .into());
                    }
                }
                Err(err) => {
                    attempt += 1;
                    if attempt >= max_retries {
                        warn!("request failed after {} attempts: {}", max_retries, err);
                        return Err(err);
                    }

                    let backoff_ms = 100u64 * 2u64.pow(attempt);
                    warn!(
                        "request failed (attempt {}/{}): {}, retrying in {}ms",
                        attempt, max_retries, err, backoff_ms
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }

    /// Best-effort extraction of the backend's error message.
    fn error_message(response: &HttpResponse) -> String {
        response
            .json::<ApiErrorResponse>()
            .map(|e| e.error.message)
            .unwrap_or_else(|_| String::from_utf8_lossy(&response.body).to_string())
    }

    fn to_media_document(&self, doc: &FirestoreDocument) -> crate::error::Result<MediaDocument> {
        let url = doc
            .string_field("url")
            .ok_or_else(|| {
                FirebaseError::Parse(format!("media document {} missing url", doc.doc_id()))
            })?
            .to_string();
        let order = doc.integer_field("order").ok_or_else(|| {
            FirebaseError::Parse(format!("media document {} missing order", doc.doc_id()))
        })?;

        Ok(MediaDocument {
            id: doc.doc_id().to_string(),
            url,
            media_type: doc.string_field("type").unwrap_or("image").to_string(),
            file_name: doc.string_field("fileName").unwrap_or_default().to_string(),
            order: order.max(0) as u32,
            created_at: doc.timestamp_field("createdAt"),
        })
    }

    /// First document of the settings collection, if any.
    async fn first_settings_document(&self) -> Result<Option<FirestoreDocument>> {
        let request = HttpRequest::new(
            HttpMethod::Post,
            format!("{}:runQuery", self.documents_base()),
        )
        .json(&RunQueryRequest {
            structured_query: StructuredQuery {
                from: vec![CollectionSelector {
                    collection_id: self.config.settings_collection.clone(),
                }],
                order_by: Vec::new(),
                limit: Some(1),
            },
        })?;
        let request = self.authorize(request).await;
        let response = self.execute_with_retry(request).await?;

        let elements: Vec<RunQueryResponseElement> = response.json()?;
        Ok(elements.into_iter().find_map(|e| e.document))
    }

    fn object_path_from_url(url: &str) -> crate::error::Result<&str> {
        let after = url
            .split("/o/")
            .nth(1)
            .ok_or_else(|| FirebaseError::InvalidObjectUrl(url.to_string()))?;
        let path = after.split('?').next().unwrap_or(after);
        if path.is_empty() {
            return Err(FirebaseError::InvalidObjectUrl(url.to_string()));
        }
        Ok(path)
    }
}

#[async_trait]
impl MediaStore for FirebaseConnector {
    #[instrument(skip(self))]
    async fn list_ordered(&self) -> Result<Vec<MediaDocument>> {
        let request = HttpRequest::new(
            HttpMethod::Post,
            format!("{}:runQuery", self.documents_base()),
        )
        .json(&RunQueryRequest {
            structured_query: StructuredQuery {
                from: vec![CollectionSelector {
                    collection_id: self.config.media_collection.clone(),
                }],
                order_by: vec![QueryOrder {
                    field: FieldReference {
                        field_path: "order".to_string(),
                    },
                    direction: "ASCENDING".to_string(),
                }],
                limit: None,
            },
        })?;
        let request = self.authorize(request).await;
        let response = self.execute_with_retry(request).await?;

        let elements: Vec<RunQueryResponseElement> = response.json()?;
        let mut docs = Vec::new();
        for document in elements.into_iter().filter_map(|e| e.document) {
            docs.push(self.to_media_document(&document)?);
        }

        debug!("listed {} media documents", docs.len());
        Ok(docs)
    }

    #[instrument(skip(self, doc), fields(file = %doc.file_name, order = doc.order))]
    async fn create(&self, doc: NewMediaDocument) -> Result<MediaDocument> {
        let body = FirestoreDocument::default()
            .with_string("url", doc.url)
            .with_string("type", doc.media_type)
            .with_string("fileName", doc.file_name)
            .with_integer("order", i64::from(doc.order))
            .with_timestamp("createdAt", doc.created_at);

        let request = HttpRequest::new(
            HttpMethod::Post,
            format!(
                "{}/{}",
                self.documents_base(),
                self.config.media_collection
            ),
        )
        .json(&body)?;
        let request = self.authorize(request).await;
        let response = self.execute_with_retry(request).await?;

        let created: FirestoreDocument = response.json()?;
        let media = self.to_media_document(&created)?;
        info!(id = %media.id, "media document created");
        Ok(media)
    }

    #[instrument(skip(self, assignments), fields(count = assignments.len()))]
    async fn apply_order(&self, assignments: &[OrderAssignment]) -> Result<()> {
        if assignments.is_empty() {
            return Ok(());
        }

        let writes = assignments
            .iter()
            .map(|assignment| CommitWrite {
                update: FirestoreDocument {
                    name: self.media_doc_name(&assignment.id),
                    ..Default::default()
                }
                .with_integer("order", i64::from(assignment.order)),
                update_mask: Some(DocumentMask {
                    field_paths: vec!["order".to_string()],
                }),
            })
            .collect();

        let request = HttpRequest::new(
            HttpMethod::Post,
            format!("{}:commit", self.documents_base()),
        )
        .json(&CommitRequest { writes })?;
        let request = self.authorize(request).await;
        self.execute_with_retry(request).await?;

        info!("committed order batch of {}", assignments.len());
        Ok(())
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn delete(&self, id: &str) -> Result<()> {
        let request = HttpRequest::new(
            HttpMethod::Delete,
            format!(
                "{}/{}/{}",
                self.documents_base(),
                self.config.media_collection,
                id
            ),
        );
        let request = self.authorize(request).await;
        self.execute_with_retry(request).await?;

        info!("media document deleted");
        Ok(())
    }

    async fn subscribe(&self) -> Result<MediaSubscription> {
        let (tx, rx) = mpsc::channel(8);
        let token = CancellationToken::new();
        let guard = SubscriptionGuard::new(token.clone());
        let connector = self.clone_for_task();
        let poll_interval = self.config.poll_interval;

        tokio::spawn(async move {
            let mut last: Option<Vec<MediaDocument>> = None;
            loop {
                match connector.list_ordered().await {
                    Ok(docs) => {
                        if last.as_ref() != Some(&docs) {
                            last = Some(docs.clone());
                            if tx.send(docs).await.is_err() {
                                debug!("snapshot receiver dropped; stopping poll");
                                return;
                            }
                        }
                    }
                    Err(err) => {
                        // Listener failures are logged only; consumers keep
                        // their last known state.
                        error!("media subscription poll failed: {}", err);
                        return;
                    }
                }

                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("media subscription cancelled");
                        return;
                    }
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
        });

        info!(
            "opened media subscription (poll interval {:?})",
            self.config.poll_interval
        );
        Ok(MediaSubscription::new(rx, guard))
    }

    async fn read_settings(&self) -> Result<Option<SettingsDocument>> {
        let settings = self
            .first_settings_document()
            .await?
            .and_then(|doc| doc.integer_field("slideDuration"))
            .map(|secs| SettingsDocument {
                slide_duration_secs: secs.max(0) as u32,
            });
        Ok(settings)
    }

    #[instrument(skip(self), fields(slide_duration_secs = settings.slide_duration_secs))]
    async fn publish_settings(&self, settings: SettingsDocument) -> Result<()> {
        let fields = FirestoreDocument::default()
            .with_integer("slideDuration", i64::from(settings.slide_duration_secs));

        let request = match self.first_settings_document().await? {
            Some(existing) => {
                // Merge-update the existing document in place.
                HttpRequest::new(
                    HttpMethod::Patch,
                    format!(
                        "{}/{}?updateMask.fieldPaths=slideDuration",
                        FIRESTORE_API_BASE, existing.name
                    ),
                )
                .json(&fields)?
            }
            None => {
                // Lazily allocate the document on first publish.
                HttpRequest::new(
                    HttpMethod::Post,
                    format!(
                        "{}/{}",
                        self.documents_base(),
                        self.config.settings_collection
                    ),
                )
                .json(&fields)?
            }
        };
        let request = self.authorize(request).await;
        self.execute_with_retry(request).await?;

        info!("settings published");
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FirebaseConnector {
    #[instrument(skip(self, data, progress), fields(key = %key, bytes = data.len()))]
    async fn upload(
        &self,
        key: &str,
        content_type: &str,
        data: Bytes,
        progress: Option<ProgressFn>,
    ) -> Result<String> {
        // Open the resumable upload session.
        let start_url = format!(
            "{}/b/{}/o?uploadType=resumable&name={}",
            STORAGE_API_BASE,
            self.config.storage_bucket,
            urlencoding::encode(key)
        );
        let metadata = serde_json::json!({ "name": key, "contentType": content_type });
        let request = HttpRequest::new(HttpMethod::Post, start_url)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Type", content_type)
            .json(&metadata)?;
        let request = self.authorize(request).await;
        let response = self.http_client.execute(request).await?;
        if !response.is_success() {
            return Err(FirebaseError::Api {
                status_code: response.status,
                message: Self::error_message(&response),
            }
            .into());
        }
        let session_url = response
            .header("X-Goog-Upload-URL")
            .ok_or_else(|| {
                FirebaseError::UploadProtocol("missing X-Goog-Upload-URL header".to_string())
            })?
            .to_string();

        // Stream the chunks; the last one finalizes the session.
        let total = data.len();
        let chunk_size = self.config.upload_chunk_bytes.max(1);
        let mut offset = 0usize;
        let object: StorageObject;
        loop {
            let end = usize::min(offset + chunk_size, total);
            let last = end == total;
            let command = if last { "upload, finalize" } else { "upload" };

            let request = HttpRequest::new(HttpMethod::Post, session_url.clone())
                .header("X-Goog-Upload-Command", command)
                .header("X-Goog-Upload-Offset", offset.to_string())
                .body(data.slice(offset..end));
            let request = self.authorize(request).await;
            let response = self.http_client.execute(request).await?;
            if !response.is_success() {
                return Err(FirebaseError::Api {
                    status_code: response.status,
                    message: Self::error_message(&response),
                }
                .into());
            }

            if let Some(report) = &progress {
                if total == 0 {
                    report(1.0);
                } else {
                    report(end as f64 / total as f64);
                }
            }

            if last {
                object = response.json()?;
                break;
            }
            offset = end;
        }

        let token = object
            .download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').next())
            .map(str::to_string);
        let mut url = format!(
            "{}/b/{}/o/{}?alt=media",
            STORAGE_API_BASE,
            self.config.storage_bucket,
            urlencoding::encode(key)
        );
        if let Some(token) = token {
            url.push_str("&token=");
            url.push_str(&token);
        }

        info!("blob uploaded");
        Ok(url)
    }

    #[instrument(skip(self), fields(url = %url))]
    async fn delete_by_url(&self, url: &str) -> Result<()> {
        let object_path = Self::object_path_from_url(url)?;
        let request = HttpRequest::new(
            HttpMethod::Delete,
            format!(
                "{}/b/{}/o/{}",
                STORAGE_API_BASE, self.config.storage_bucket, object_path
            ),
        );
        let request = self.authorize(request).await;
        self.execute_with_retry(request).await?;

        info!("blob deleted");
        Ok(())
    }
}

#[async_trait]
impl IdentityGateway for FirebaseConnector {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> core_auth::Result<Session> {
        let url = format!(
            "{}/accounts:signInWithPassword?key={}",
            IDENTITY_API_BASE, self.config.api_key
        );
        let request = HttpRequest::new(HttpMethod::Post, url)
            .json(&SignInRequest {
                email: email.to_string(),
                password: password.to_string(),
                return_secure_token: true,
            })
            .map_err(|e| AuthError::GatewayUnavailable(e.to_string()))?;

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| AuthError::GatewayUnavailable(e.to_string()))?;

        if response.is_client_error() {
            // EMAIL_NOT_FOUND, INVALID_PASSWORD, USER_DISABLED ... the
            // distinction stays at debug level and never reaches the caller.
            debug!(
                "identity toolkit rejected sign-in: {}",
                Self::error_message(&response)
            );
            return Err(AuthError::InvalidCredentials);
        }
        if !response.is_success() {
            return Err(AuthError::GatewayUnavailable(format!(
                "identity backend returned {}",
                response.status
            )));
        }

        let body: SignInResponse = response
            .json()
            .map_err(|e| AuthError::GatewayUnavailable(e.to_string()))?;

        let expires_at = body
            .expires_in
            .as_deref()
            .and_then(|secs| secs.parse::<i64>().ok())
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs));

        self.set_id_token(body.id_token.clone()).await;

        info!(user_id = %body.local_id, "sign-in succeeded");
        Ok(Session {
            user_id: body.local_id,
            email: body.email,
            id_token: body.id_token,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Mutex;

    struct MockHttpClient {
        responses: Mutex<VecDeque<HttpResponse>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl MockHttpClient {
        fn new(responses: Vec<HttpResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        async fn recorded(&self) -> Vec<HttpRequest> {
            self.requests.lock().await.clone()
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.requests.lock().await.push(request);
            self.responses
                .lock()
                .await
                .pop_front()
                .ok_or_else(|| BridgeError::OperationFailed("no scripted response".to_string()))
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn response_with_header(status: u16, body: &str, key: &str, value: &str) -> HttpResponse {
        let mut headers = HashMap::new();
        headers.insert(key.to_string(), value.to_string());
        HttpResponse {
            status,
            headers,
            body: Bytes::from(body.to_string()),
        }
    }

    fn config() -> FirebaseConfig {
        FirebaseConfig::new("demo-project", "api-key", "demo-project.appspot.com")
            .with_poll_interval(Duration::from_millis(10))
    }

    const MEDIA_LIST_BODY: &str = r#"[
        {"document": {"name": "projects/demo-project/databases/(default)/documents/media/m1",
                      "fields": {"url": {"stringValue": "https://firebasestorage.googleapis.com/v0/b/demo-project.appspot.com/o/media%2F1_a.png?alt=media&token=t1"},
                                 "type": {"stringValue": "image"},
                                 "fileName": {"stringValue": "a.png"},
                                 "order": {"integerValue": "0"},
                                 "createdAt": {"timestampValue": "2023-11-14T22:13:20Z"}}}},
        {"document": {"name": "projects/demo-project/databases/(default)/documents/media/m2",
                      "fields": {"url": {"stringValue": "https://blob/m2"},
                                 "type": {"stringValue": "video"},
                                 "fileName": {"stringValue": "b.mp4"},
                                 "order": {"integerValue": "1"}}}}
    ]"#;

    #[tokio::test]
    async fn test_list_ordered_builds_query_and_parses() {
        let http = MockHttpClient::new(vec![response(200, MEDIA_LIST_BODY)]);
        let connector = FirebaseConnector::new(http.clone(), config());
        connector.set_id_token("tok").await;

        let docs = connector.list_ordered().await.unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "m1");
        assert_eq!(docs[0].media_type, "image");
        assert_eq!(docs[0].created_at, Some(1_700_000_000));
        assert_eq!(docs[1].id, "m2");
        assert_eq!(docs[1].order, 1);
        assert_eq!(docs[1].created_at, None);

        let requests = http.recorded().await;
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.ends_with("documents:runQuery"));
        assert_eq!(
            requests[0].headers.get("Authorization"),
            Some(&"Bearer tok".to_string())
        );
        let body = String::from_utf8(requests[0].body.clone().unwrap().to_vec()).unwrap();
        assert!(body.contains("\"collectionId\":\"media\""));
        assert!(body.contains("\"fieldPath\":\"order\""));
    }

    #[tokio::test]
    async fn test_apply_order_commits_one_masked_batch() {
        let http = MockHttpClient::new(vec![response(200, "{}")]);
        let connector = FirebaseConnector::new(http.clone(), config());

        connector
            .apply_order(&[
                OrderAssignment {
                    id: "m1".into(),
                    order: 1,
                },
                OrderAssignment {
                    id: "m2".into(),
                    order: 0,
                },
            ])
            .await
            .unwrap();

        let requests = http.recorded().await;
        assert_eq!(requests.len(), 1, "the whole rewrite is ONE commit");
        assert!(requests[0].url.ends_with("documents:commit"));
        let body = String::from_utf8(requests[0].body.clone().unwrap().to_vec()).unwrap();
        assert!(body.contains("documents/media/m1"));
        assert!(body.contains("documents/media/m2"));
        assert!(body.contains("\"updateMask\":{\"fieldPaths\":[\"order\"]}"));
        assert!(body.contains("\"integerValue\":\"1\""));
    }

    #[tokio::test]
    async fn test_apply_order_empty_sends_nothing() {
        let http = MockHttpClient::new(vec![]);
        let connector = FirebaseConnector::new(http.clone(), config());

        connector.apply_order(&[]).await.unwrap();
        assert!(http.recorded().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_posts_to_collection() {
        let created = r#"{"name": "projects/demo-project/databases/(default)/documents/media/new1",
                          "fields": {"url": {"stringValue": "https://blob/new1"},
                                     "type": {"stringValue": "image"},
                                     "fileName": {"stringValue": "a.png"},
                                     "order": {"integerValue": "0"}}}"#;
        let http = MockHttpClient::new(vec![response(200, created)]);
        let connector = FirebaseConnector::new(http.clone(), config());

        let doc = connector
            .create(NewMediaDocument {
                url: "https://blob/new1".into(),
                media_type: "image".into(),
                file_name: "a.png".into(),
                order: 0,
                created_at: 1_700_000_000,
            })
            .await
            .unwrap();

        assert_eq!(doc.id, "new1");
        let requests = http.recorded().await;
        assert!(requests[0].url.ends_with("documents/media"));
        let body = String::from_utf8(requests[0].body.clone().unwrap().to_vec()).unwrap();
        assert!(body.contains("\"createdAt\""));
        assert!(body.contains("2023-11-14"));
    }

    #[tokio::test]
    async fn test_retry_on_server_error() {
        let http = MockHttpClient::new(vec![response(500, ""), response(200, "[]")]);
        let connector = FirebaseConnector::new(http.clone(), config());

        let docs = connector.list_ordered().await.unwrap();
        assert!(docs.is_empty());
        assert_eq!(http.recorded().await.len(), 2);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let http = MockHttpClient::new(vec![response(
            403,
            r#"{"error": {"message": "PERMISSION_DENIED"}}"#,
        )]);
        let connector = FirebaseConnector::new(http.clone(), config());

        let err = connector.list_ordered().await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::RemoteRejected { status: 403, .. }
        ));
        assert_eq!(http.recorded().await.len(), 1);
    }

    #[tokio::test]
    async fn test_sign_in_collapses_credential_failures() {
        for backend_reason in ["EMAIL_NOT_FOUND", "INVALID_PASSWORD"] {
            let body = format!(r#"{{"error": {{"message": "{}"}}}}"#, backend_reason);
            let http = MockHttpClient::new(vec![response(400, &body)]);
            let connector = FirebaseConnector::new(http, config());

            let err = connector
                .sign_in_with_password("op@example.com", "pw")
                .await
                .unwrap_err();
            assert!(
                matches!(err, AuthError::InvalidCredentials),
                "reason {} must collapse",
                backend_reason
            );
        }
    }

    #[tokio::test]
    async fn test_sign_in_success_installs_token() {
        let sign_in_body =
            r#"{"idToken":"tok","email":"op@example.com","localId":"u1","expiresIn":"3600"}"#;
        let http = MockHttpClient::new(vec![response(200, sign_in_body), response(200, "[]")]);
        let connector = FirebaseConnector::new(http.clone(), config());

        let session = connector
            .sign_in_with_password("op@example.com", "pw")
            .await
            .unwrap();
        assert_eq!(session.user_id, "u1");
        assert!(session.expires_at.is_some());

        // The installed token rides on subsequent store calls.
        connector.list_ordered().await.unwrap();
        let requests = http.recorded().await;
        assert_eq!(
            requests[1].headers.get("Authorization"),
            Some(&"Bearer tok".to_string())
        );
        // The sign-in call itself carries the API key, not a bearer token.
        assert!(requests[0].url.contains("key=api-key"));
    }

    #[tokio::test]
    async fn test_sign_in_outage_is_gateway_unavailable() {
        let http = MockHttpClient::new(vec![response(503, "")]);
        let connector = FirebaseConnector::new(http, config());

        let err = connector
            .sign_in_with_password("op@example.com", "pw")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::GatewayUnavailable(_)));
    }

    #[tokio::test]
    async fn test_upload_chunks_and_reports_progress() {
        let object_body = r#"{"name":"media/1_a.png","contentType":"image/png","downloadTokens":"t1,t2"}"#;
        let http = MockHttpClient::new(vec![
            response_with_header(200, "", "x-goog-upload-url", "https://session.test/u1"),
            response(200, ""),
            response(200, ""),
            response(200, object_body),
        ]);
        let connector = FirebaseConnector::new(
            http.clone(),
            config().with_upload_chunk_bytes(4),
        );

        let fractions = Arc::new(StdMutex::new(Vec::new()));
        let sink = fractions.clone();
        let url = connector
            .upload(
                "media/1_a.png",
                "image/png",
                Bytes::from_static(b"0123456789"),
                Some(Box::new(move |f| sink.lock().unwrap().push(f))),
            )
            .await
            .unwrap();

        assert!(url.contains("media%2F1_a.png"));
        assert!(url.ends_with("&token=t1"), "first download token: {}", url);

        let requests = http.recorded().await;
        assert_eq!(requests.len(), 4);
        assert_eq!(
            requests[0].headers.get("X-Goog-Upload-Command"),
            Some(&"start".to_string())
        );
        assert_eq!(
            requests[1].headers.get("X-Goog-Upload-Offset"),
            Some(&"0".to_string())
        );
        assert_eq!(
            requests[2].headers.get("X-Goog-Upload-Offset"),
            Some(&"4".to_string())
        );
        assert_eq!(
            requests[3].headers.get("X-Goog-Upload-Command"),
            Some(&"upload, finalize".to_string())
        );
        assert_eq!(requests[3].body.as_ref().unwrap().len(), 2);

        let seen = fractions.lock().unwrap().clone();
        assert_eq!(seen, vec![0.4, 0.8, 1.0]);
    }

    #[tokio::test]
    async fn test_upload_failure_mid_chunk_aborts() {
        let http = MockHttpClient::new(vec![
            response_with_header(200, "", "x-goog-upload-url", "https://session.test/u1"),
            response(500, ""),
        ]);
        let connector = FirebaseConnector::new(
            http.clone(),
            config().with_upload_chunk_bytes(4),
        );

        let err = connector
            .upload("media/1_a.png", "image/png", Bytes::from_static(b"0123456789"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::RemoteRejected { status: 500, .. }));
        assert_eq!(http.recorded().await.len(), 2, "no further chunks after a failure");
    }

    #[tokio::test]
    async fn test_delete_by_url_strips_query() {
        let http = MockHttpClient::new(vec![response(200, "")]);
        let connector = FirebaseConnector::new(http.clone(), config());

        connector
            .delete_by_url(
                "https://firebasestorage.googleapis.com/v0/b/demo-project.appspot.com/o/media%2F1_a.png?alt=media&token=t1",
            )
            .await
            .unwrap();

        let requests = http.recorded().await;
        assert!(requests[0].url.ends_with("/o/media%2F1_a.png"));
        assert_eq!(requests[0].method, HttpMethod::Delete);
    }

    #[tokio::test]
    async fn test_delete_by_foreign_url_is_rejected() {
        let http = MockHttpClient::new(vec![]);
        let connector = FirebaseConnector::new(http.clone(), config());

        let err = connector
            .delete_by_url("https://example.com/not-a-storage-url")
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::OperationFailed(_)));
        assert!(http.recorded().await.is_empty());
    }

    #[tokio::test]
    async fn test_read_settings_parses_first_document() {
        let body = r#"[{"document": {"name": "projects/demo-project/databases/(default)/documents/settings/s1",
                                     "fields": {"slideDuration": {"integerValue": "12"}}}}]"#;
        let http = MockHttpClient::new(vec![response(200, body)]);
        let connector = FirebaseConnector::new(http, config());

        let settings = connector.read_settings().await.unwrap();
        assert_eq!(
            settings,
            Some(SettingsDocument {
                slide_duration_secs: 12
            })
        );
    }

    #[tokio::test]
    async fn test_read_settings_none_when_collection_empty() {
        let http = MockHttpClient::new(vec![response(200, r#"[{"readTime": "2024-01-01T00:00:00Z"}]"#)]);
        let connector = FirebaseConnector::new(http, config());

        assert_eq!(connector.read_settings().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_publish_settings_creates_lazily() {
        let http = MockHttpClient::new(vec![
            response(200, r#"[{"readTime": "2024-01-01T00:00:00Z"}]"#),
            response(200, "{}"),
        ]);
        let connector = FirebaseConnector::new(http.clone(), config());

        connector
            .publish_settings(SettingsDocument {
                slide_duration_secs: 10,
            })
            .await
            .unwrap();

        let requests = http.recorded().await;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].method, HttpMethod::Post);
        assert!(requests[1].url.ends_with("documents/settings"));
    }

    #[tokio::test]
    async fn test_publish_settings_patches_existing() {
        let existing = r#"[{"document": {"name": "projects/demo-project/databases/(default)/documents/settings/s1",
                                         "fields": {"slideDuration": {"integerValue": "5"}}}}]"#;
        let http = MockHttpClient::new(vec![response(200, existing), response(200, "{}")]);
        let connector = FirebaseConnector::new(http.clone(), config());

        connector
            .publish_settings(SettingsDocument {
                slide_duration_secs: 30,
            })
            .await
            .unwrap();

        let requests = http.recorded().await;
        assert_eq!(requests[1].method, HttpMethod::Patch);
        assert!(requests[1]
            .url
            .contains("documents/settings/s1?updateMask.fieldPaths=slideDuration"));
        let body = String::from_utf8(requests[1].body.clone().unwrap().to_vec()).unwrap();
        assert!(body.contains("\"integerValue\":\"30\""));
    }

    #[tokio::test]
    async fn test_subscribe_pushes_initial_snapshot_and_dedups() {
        // Two identical polls: only the first may produce a snapshot. The
        // third poll finds no scripted response and shuts the stream down.
        let http = MockHttpClient::new(vec![
            response(200, MEDIA_LIST_BODY),
            response(200, MEDIA_LIST_BODY),
        ]);
        let connector = FirebaseConnector::new(http, config());

        let mut subscription = connector.subscribe().await.unwrap();
        let first = subscription.recv().await.unwrap();
        assert_eq!(first.len(), 2);

        assert_eq!(
            subscription.recv().await,
            None,
            "unchanged polls must not produce snapshots"
        );
    }

    #[tokio::test]
    async fn test_dropping_the_guard_stops_the_poll() {
        let http = MockHttpClient::new(vec![
            response(200, "[]"),
            response(200, "[]"),
            response(200, "[]"),
            response(200, "[]"),
        ]);
        let connector = FirebaseConnector::new(http.clone(), config());

        let subscription = connector.subscribe().await.unwrap();
        let (_rx, guard) = subscription.into_parts();
        tokio::time::sleep(Duration::from_millis(5)).await;
        drop(guard);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let polls = http.recorded().await.len();
        assert!(polls <= 2, "poll kept running after cancel: {} polls", polls);
    }
}
