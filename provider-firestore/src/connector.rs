//! Firestore REST connector
//!
//! Implements `CatalogGateway` for the Cloud Firestore v1 REST API.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
use bridge_traits::time::{Clock, SystemClock};
use core_library::gateway::{is_storage_reference, AssetResolver, CatalogGateway};
use core_library::{LibraryError, Track, TrackDraft, TrackId, TrackPatch};
use core_runtime::config::CoreConfig;
use core_runtime::logging::strip_path;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{FirestoreError, Result};
use crate::types::{
    Document, DocumentFields, ErrorResponse, ListDocumentsResponse, RunQueryRequest,
    RunQueryResponseItem, Value,
};

/// Firestore API base URL
pub const FIRESTORE_API_BASE: &str = "https://firestore.googleapis.com/v1";

/// Documents whose storage references are resolved concurrently
const RESOLVE_CONCURRENCY: usize = 8;

/// Connection settings for [`FirestoreGateway`]
#[derive(Clone)]
pub struct FirestoreSettings {
    pub project_id: String,
    pub api_key: String,
    pub collection: String,
    pub access_token: Option<String>,
    pub page_size: u32,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    /// API root, overridable for the emulator
    pub base_url: String,
}

impl fmt::Debug for FirestoreSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirestoreSettings")
            .field("project_id", &self.project_id)
            .field("api_key", &"<redacted>")
            .field("collection", &self.collection)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("page_size", &self.page_size)
            .field("request_timeout", &self.request_timeout)
            .field("retry", &self.retry)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl FirestoreSettings {
    pub fn new(project_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            api_key: api_key.into(),
            collection: "tracks".to_string(),
            access_token: None,
            page_size: 300,
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            base_url: FIRESTORE_API_BASE.to_string(),
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self {
            project_id: config.project_id.clone(),
            api_key: config.api_key.clone(),
            collection: config.collection.clone(),
            access_token: config.access_token.clone(),
            page_size: config.page_size,
            request_timeout: config.request_timeout(),
            retry: RetryPolicy {
                max_attempts: config.max_retries,
                ..RetryPolicy::default()
            },
            base_url: FIRESTORE_API_BASE.to_string(),
        }
    }

    fn documents_root(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            self.base_url.trim_end_matches('/'),
            self.project_id
        )
    }
}

/// Firestore catalog gateway
///
/// Implements `CatalogGateway` for one Firestore collection.
///
/// # Features
///
/// - Paginated listing (`pageSize`/`pageToken`)
/// - `url` equality lookup through `:runQuery`
/// - Merge writes through `PATCH` with `updateMask`
/// - Storage reference resolution through an optional `AssetResolver`
/// - Exponential backoff for 429 and 5xx responses
///
/// # Example
///
/// ```ignore
/// use provider_firestore::{FirestoreGateway, FirestoreSettings};
///
/// let gateway = FirestoreGateway::new(http_client, FirestoreSettings::from_config(&config))
///     .with_resolver(resolver);
/// let tracks = gateway.fetch_all().await?;
/// ```
pub struct FirestoreGateway {
    http_client: Arc<dyn HttpClient>,
    settings: FirestoreSettings,
    resolver: Option<Arc<dyn AssetResolver>>,
    clock: Arc<dyn Clock>,
}

impl FirestoreGateway {
    pub fn new(http_client: Arc<dyn HttpClient>, settings: FirestoreSettings) -> Self {
        Self {
            http_client,
            settings,
            resolver: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Resolve `gs://` and `/path` values through `resolver` while listing.
    pub fn with_resolver(mut self, resolver: Arc<dyn AssetResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Time source for `createdAt` stamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &FirestoreSettings {
        &self.settings
    }

    // -------------------------------------------------------------------------
    // URLs
    // -------------------------------------------------------------------------

    fn collection_url(&self) -> String {
        format!(
            "{}/{}?key={}",
            self.settings.documents_root(),
            self.settings.collection,
            urlencoding::encode(&self.settings.api_key)
        )
    }

    fn document_url(&self, id: &TrackId) -> String {
        format!(
            "{}/{}/{}?key={}",
            self.settings.documents_root(),
            self.settings.collection,
            urlencoding::encode(id.as_str()),
            urlencoding::encode(&self.settings.api_key)
        )
    }

    fn run_query_url(&self) -> String {
        format!(
            "{}:runQuery?key={}",
            self.settings.documents_root(),
            urlencoding::encode(&self.settings.api_key)
        )
    }

    fn request(&self, method: HttpMethod, url: String) -> HttpRequest {
        let request = HttpRequest::new(method, url)
            .header("Accept", "application/json")
            .timeout(self.settings.request_timeout);

        match &self.settings.access_token {
            Some(token) => request.bearer_token(token.as_str()),
            None => request,
        }
    }

    // -------------------------------------------------------------------------
    // Transport
    // -------------------------------------------------------------------------

    /// Execute a request, retrying throttling, server errors and transport
    /// failures with exponential backoff.
    #[instrument(skip(self, request), fields(method = ?request.method))]
    async fn execute_with_retry(&self, request: HttpRequest) -> Result<HttpResponse> {
        let policy = &self.settings.retry;
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.http_client.execute(request.clone()).await {
                Ok(response) if response.is_success() => {
                    debug!(status = response.status, attempt, "Firestore request succeeded");
                    return Ok(response);
                }
                Ok(response) if response.is_retryable() => {
                    if attempt >= max_attempts {
                        warn!(status = response.status, attempts = attempt, "Firestore retries exhausted");
                        return Err(FirestoreError::RetriesExhausted {
                            attempts: attempt,
                            status_code: response.status,
                        });
                    }
                    let delay = policy.delay_for(attempt);
                    warn!(
                        status = response.status,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Firestore request throttled, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Ok(response) => {
                    let error = api_error(&response);
                    warn!(error = %error, "Firestore request rejected");
                    return Err(error);
                }
                Err(e) => {
                    if attempt >= max_attempts {
                        warn!(error = %e, attempts = attempt, "Firestore request failed");
                        return Err(e.into());
                    }
                    let delay = policy.delay_for(attempt);
                    warn!(error = %e, attempt, "Firestore transport error, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn list_page(&self, page_token: Option<&str>) -> Result<ListDocumentsResponse> {
        let mut url = format!("{}&pageSize={}", self.collection_url(), self.settings.page_size);
        if let Some(token) = page_token {
            url.push_str("&pageToken=");
            url.push_str(&urlencoding::encode(token));
        }

        let response = self.execute_with_retry(self.request(HttpMethod::Get, url)).await?;
        response
            .json::<ListDocumentsResponse>()
            .map_err(|e| FirestoreError::ParseError(e.to_string()))
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.list_page(page_token.as_deref()).await?;
            debug!(page_documents = page.documents.len(), "Fetched catalog page");
            documents.extend(page.documents);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(documents),
            }
        }
    }

    async fn query_first_by_url(&self, url: &str) -> Result<Option<TrackId>> {
        let body = RunQueryRequest::field_equals(&self.settings.collection, "url", Value::string(url), 1);
        let request = self.request(HttpMethod::Post, self.run_query_url()).json(&body)?;
        let response = self.execute_with_retry(request).await?;

        let items: Vec<RunQueryResponseItem> = response
            .json()
            .map_err(|e| FirestoreError::ParseError(e.to_string()))?;

        Ok(items
            .into_iter()
            .filter_map(|item| item.document)
            .map(|doc| TrackId::new(doc.id()))
            .next())
    }

    async fn patch(&self, id: &TrackId, patch: &TrackPatch, must_exist: bool) -> Result<()> {
        let (fields, mask) = patch_fields(patch);
        if mask.is_empty() {
            debug!(id = %id, "Empty patch, nothing to write");
            return Ok(());
        }

        let mut url = self.document_url(id);
        for path in &mask {
            url.push_str("&updateMask.fieldPaths=");
            url.push_str(path);
        }
        if must_exist {
            url.push_str("&currentDocument.exists=true");
        }

        let request = self
            .request(HttpMethod::Patch, url)
            .json(&DocumentFields { fields })?;

        match self.execute_with_retry(request).await {
            Err(FirestoreError::ApiError { status_code: 404, .. }) if must_exist => {
                Err(FirestoreError::DocumentNotFound { id: id.to_string() })
            }
            other => other.map(|_| ()),
        }
    }

    // -------------------------------------------------------------------------
    // Decoding
    // -------------------------------------------------------------------------

    /// Resolve a storage reference, keeping the raw value on failure.
    async fn resolve_reference(&self, raw: String) -> String {
        let Some(resolver) = self.resolver.as_ref() else {
            return raw;
        };
        if !is_storage_reference(&raw) {
            return raw;
        }

        match resolver.resolve(&raw).await {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(object = %strip_path(&raw), error = %e, "Asset resolution failed, keeping stored value");
                raw
            }
        }
    }

    async fn convert_document(&self, document: Document) -> Track {
        let mut track = document_to_track(&document);
        track.url = self.resolve_reference(std::mem::take(&mut track.url)).await;
        track
    }
}

/// Decode a document into a track. Missing or mistyped fields default.
pub fn document_to_track(document: &Document) -> Track {
    let text = |name: &str| {
        document
            .field(name)
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    Track {
        id: TrackId::new(document.id()),
        url: text("url").unwrap_or_default(),
        title: text("title").unwrap_or_default(),
        artist: text("artist").unwrap_or_default(),
        album: text("album"),
        artwork: text("artwork").unwrap_or_default(),
        duration: document.field("duration").and_then(Value::as_f64),
        rating: document.field("rating").and_then(Value::as_i64).unwrap_or(0),
        playlist: document
            .field("playlist")
            .and_then(Value::as_string_array)
            .unwrap_or_default(),
    }
}

/// Encoded fields and update mask for the present fields of a patch.
pub fn patch_fields(patch: &TrackPatch) -> (HashMap<String, Value>, Vec<&'static str>) {
    let mut fields = HashMap::new();
    let mut mask = Vec::new();

    let mut put = |name: &'static str, value: Option<Value>| {
        if let Some(value) = value {
            fields.insert(name.to_string(), value);
            mask.push(name);
        }
    };

    put("url", patch.url.clone().map(Value::string));
    put("title", patch.title.clone().map(Value::string));
    put("artist", patch.artist.clone().map(Value::string));
    put("album", patch.album.clone().map(Value::string));
    put("artwork", patch.artwork.clone().map(Value::string));
    put("duration", patch.duration.map(Value::double));
    put("rating", patch.rating.map(Value::integer));
    put("playlist", patch.playlist.clone().map(Value::string_array));

    (fields, mask)
}

/// Fields of a new document, stamped with the initial annotations.
pub fn draft_fields(draft: &TrackDraft, created_at: &str) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("url".to_string(), Value::string(&draft.url));
    fields.insert("title".to_string(), Value::string(&draft.title));
    fields.insert("artist".to_string(), Value::string(&draft.artist));
    fields.insert("artwork".to_string(), Value::string(&draft.artwork));
    if let Some(album) = &draft.album {
        fields.insert("album".to_string(), Value::string(album));
    }
    if let Some(duration) = draft.duration {
        fields.insert("duration".to_string(), Value::double(duration));
    }
    fields.insert("rating".to_string(), Value::integer(0));
    fields.insert("playlist".to_string(), Value::string_array(Vec::<String>::new()));
    fields.insert("createdAt".to_string(), Value::timestamp(created_at));
    fields
}

fn api_error(response: &HttpResponse) -> FirestoreError {
    let message = response
        .json::<ErrorResponse>()
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| response.text_lossy());

    FirestoreError::ApiError {
        status_code: response.status,
        message,
    }
}

#[async_trait]
impl CatalogGateway for FirestoreGateway {
    #[instrument(skip(self), fields(collection = %self.settings.collection))]
    async fn fetch_all(&self) -> core_library::Result<Vec<Track>> {
        info!("Listing catalog from Firestore");
        let documents = self.list_documents().await?;

        let tracks: Vec<Track> = stream::iter(documents)
            .map(|document| self.convert_document(document))
            .buffered(RESOLVE_CONCURRENCY)
            .collect()
            .await;

        info!(track_count = tracks.len(), "Catalog listed");
        Ok(tracks)
    }

    #[instrument(skip(self))]
    async fn find_id_by_url(&self, url: &str) -> Option<TrackId> {
        match self.query_first_by_url(url).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "Track lookup by URL failed");
                None
            }
        }
    }

    #[instrument(skip(self, patch), fields(id = %id))]
    async fn update(&self, id: &TrackId, patch: &TrackPatch) -> core_library::Result<()> {
        self.patch(id, patch, true).await.map_err(LibraryError::from)
    }

    #[instrument(skip(self, patch), fields(id = %id))]
    async fn upsert(&self, id: &TrackId, patch: &TrackPatch) -> core_library::Result<()> {
        self.patch(id, patch, false).await.map_err(LibraryError::from)
    }

    #[instrument(skip(self, draft), fields(url = %draft.url))]
    async fn create(&self, draft: &TrackDraft) -> core_library::Result<TrackId> {
        draft.validate()?;

        let created_at = self.clock.now_rfc3339();
        let body = DocumentFields {
            fields: draft_fields(draft, &created_at),
        };
        let request = self
            .request(HttpMethod::Post, self.collection_url())
            .json(&body)
            .map_err(FirestoreError::from)?;

        let response = self.execute_with_retry(request).await?;
        let document: Document = response
            .json()
            .map_err(|e| FirestoreError::ParseError(e.to_string()))?;

        if document.id().is_empty() {
            return Err(FirestoreError::ParseError("created document has no name".to_string()).into());
        }

        info!(id = document.id(), "Catalog document created");
        Ok(TrackId::new(document.id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::time::FixedClock;
    use bytes::Bytes;
    use chrono::TimeZone;
    use mockall::mock;
    use mockall::predicate::*;
    use serde_json::json;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    mock! {
        Resolver {}

        #[async_trait]
        impl AssetResolver for Resolver {
            async fn resolve(&self, reference: &str) -> core_library::Result<String>;
        }
    }

    fn settings() -> FirestoreSettings {
        FirestoreSettings {
            retry: RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                use_exponential_backoff: true,
            },
            ..FirestoreSettings::new("music-app", "test-key")
        }
    }

    fn json_response(status: u16, body: serde_json::Value) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn doc(id: &str, fields: serde_json::Value) -> serde_json::Value {
        json!({
            "name": format!("projects/music-app/databases/(default)/documents/tracks/{}", id),
            "fields": fields
        })
    }

    fn gateway(mock: MockHttpClient) -> FirestoreGateway {
        FirestoreGateway::new(Arc::new(mock), settings())
    }

    #[test]
    fn test_settings_from_config() {
        let config = CoreConfig::builder()
            .project_id("music-app")
            .api_key("AIza-secret")
            .storage_bucket("music-app.appspot.com")
            .collection("songs")
            .page_size(50)
            .max_retries(5)
            .build()
            .unwrap();

        let settings = FirestoreSettings::from_config(&config);
        assert_eq!(settings.collection, "songs");
        assert_eq!(settings.page_size, 50);
        assert_eq!(settings.retry.max_attempts, 5);
        assert_eq!(
            settings.documents_root(),
            "https://firestore.googleapis.com/v1/projects/music-app/databases/(default)/documents"
        );
        assert!(!format!("{:?}", settings).contains("AIza-secret"));
    }

    #[test]
    fn test_document_to_track_defaults_missing_fields() {
        let document: Document =
            serde_json::from_value(doc("abc", json!({ "url": { "stringValue": "https://a" } })))
                .unwrap();

        let track = document_to_track(&document);
        assert_eq!(track.id.as_str(), "abc");
        assert_eq!(track.url, "https://a");
        assert_eq!(track.title, "");
        assert_eq!(track.artist, "");
        assert_eq!(track.artwork, "");
        assert_eq!(track.rating, 0);
        assert!(track.playlist.is_empty());
        assert!(track.album.is_none());
        assert!(track.duration.is_none());
    }

    #[test]
    fn test_document_to_track_treats_wrong_types_as_absent() {
        let document: Document = serde_json::from_value(doc(
            "abc",
            json!({
                "title": { "integerValue": "5" },
                "rating": { "stringValue": "1" },
                "playlist": { "stringValue": "Worship" }
            }),
        ))
        .unwrap();

        let track = document_to_track(&document);
        assert_eq!(track.title, "");
        assert_eq!(track.rating, 0);
        assert!(track.playlist.is_empty());
    }

    #[test]
    fn test_patch_fields_only_include_present_values() {
        let (fields, mask) = patch_fields(&TrackPatch::new().rating(1).playlist(vec!["Worship".into()]));
        assert_eq!(mask, vec!["rating", "playlist"]);
        assert_eq!(fields.get("rating"), Some(&Value::integer(1)));
    }

    #[test]
    fn test_draft_fields_stamp_annotations() {
        let draft = TrackDraft::new("https://a", "Oceans").duration(533.0);
        let fields = draft_fields(&draft, "2024-05-01T12:00:00+00:00");

        assert_eq!(fields.get("rating"), Some(&Value::integer(0)));
        assert_eq!(fields.get("playlist").and_then(Value::as_string_array), Some(vec![]));
        assert_eq!(
            fields.get("createdAt"),
            Some(&Value::timestamp("2024-05-01T12:00:00+00:00"))
        );
        assert!(!fields.contains_key("album"));
    }

    #[tokio::test]
    async fn test_fetch_all_follows_page_tokens() {
        let mut mock = MockHttpClient::new();
        let mut seq = mockall::Sequence::new();

        mock.expect_execute()
            .withf(|req| {
                req.method == HttpMethod::Get
                    && req.url.contains("/documents/tracks?key=test-key&pageSize=300")
                    && !req.url.contains("pageToken")
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(json_response(
                    200,
                    json!({
                        "documents": [doc("a", json!({ "url": { "stringValue": "https://a" } }))],
                        "nextPageToken": "page 2"
                    }),
                ))
            });
        mock.expect_execute()
            .withf(|req| req.url.ends_with("&pageToken=page%202"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(json_response(
                    200,
                    json!({ "documents": [doc("b", json!({ "url": { "stringValue": "https://b" } }))] }),
                ))
            });

        let tracks = gateway(mock).fetch_all().await.unwrap();
        let ids: Vec<_> = tracks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_fetch_all_empty_collection() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(json_response(200, json!({}))));

        assert!(gateway(mock).fetch_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_all_resolves_storage_references() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().times(1).returning(|_| {
            Ok(json_response(
                200,
                json!({ "documents": [doc("a", json!({
                    "url": { "stringValue": "gs://music-app.appspot.com/audio/a.mp3" },
                    "artwork": { "stringValue": "/artwork/a.jpg" }
                }))] }),
            ))
        });

        let mut resolver = MockResolver::new();
        resolver
            .expect_resolve()
            .with(eq("gs://music-app.appspot.com/audio/a.mp3"))
            .times(1)
            .returning(|_| Ok("https://storage/audio%2Fa.mp3?alt=media&token=t".to_string()));
        resolver
            .expect_resolve()
            .with(eq("/artwork/a.jpg"))
            .never();

        let tracks = gateway(mock)
            .with_resolver(Arc::new(resolver))
            .fetch_all()
            .await
            .unwrap();

        assert_eq!(tracks[0].url, "https://storage/audio%2Fa.mp3?alt=media&token=t");
        // Artwork is stored as a plain URL and passed through
        assert_eq!(tracks[0].artwork, "/artwork/a.jpg");
    }

    #[tokio::test]
    async fn test_fetch_all_keeps_url_when_resolution_fails() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().times(1).returning(|_| {
            Ok(json_response(
                200,
                json!({ "documents": [
                    doc("a", json!({ "url": { "stringValue": "/audio/missing.mp3" } })),
                    doc("b", json!({ "url": { "stringValue": "https://cdn/b.mp3" } }))
                ] }),
            ))
        });

        let mut resolver = MockResolver::new();
        resolver
            .expect_resolve()
            .with(eq("/audio/missing.mp3"))
            .times(1)
            .returning(|reference| {
                Err(LibraryError::AssetResolutionFailure {
                    reference: reference.to_string(),
                    message: "no download token".to_string(),
                })
            });

        let tracks = gateway(mock)
            .with_resolver(Arc::new(resolver))
            .fetch_all()
            .await
            .unwrap();

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].url, "/audio/missing.mp3");
        assert_eq!(tracks[1].url, "https://cdn/b.mp3");
    }

    #[tokio::test]
    async fn test_fetch_all_retries_transient_status() {
        let mut mock = MockHttpClient::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(json_response(503, json!({}))));
        mock.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(json_response(200, json!({ "documents": [] }))));

        assert!(gateway(mock).fetch_all().await.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_all_gives_up_after_max_attempts() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .times(3)
            .returning(|_| Ok(json_response(429, json!({}))));

        let err = gateway(mock).fetch_all().await.unwrap_err();
        assert!(matches!(err, LibraryError::SyncFailure(msg) if msg.contains("3 attempts")));
    }

    #[tokio::test]
    async fn test_fetch_all_retries_transport_errors() {
        let mut mock = MockHttpClient::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_execute()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Err(BridgeError::Timeout(30)));
        mock.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(json_response(200, json!({ "documents": [] }))));

        assert!(gateway(mock).fetch_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_attempt_policy_surfaces_first_failure() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(json_response(503, json!({}))));

        let mut settings = settings();
        settings.retry.max_attempts = 1;
        let err = FirestoreGateway::new(Arc::new(mock), settings)
            .fetch_all()
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::SyncFailure(msg) if msg.contains("1 attempts")));
    }

    #[tokio::test]
    async fn test_fetch_all_permission_denied_is_sync_failure() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().times(1).returning(|_| {
            Ok(json_response(
                403,
                json!({ "error": { "code": 403, "message": "Missing or insufficient permissions.", "status": "PERMISSION_DENIED" } }),
            ))
        });

        let err = gateway(mock).fetch_all().await.unwrap_err();
        assert!(
            matches!(err, LibraryError::SyncFailure(msg) if msg.contains("insufficient permissions"))
        );
    }

    #[tokio::test]
    async fn test_find_id_by_url_returns_first_document() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .withf(|req| {
                let body: serde_json::Value =
                    serde_json::from_slice(req.body.as_ref().unwrap()).unwrap();
                req.method == HttpMethod::Post
                    && req.url.contains("/documents:runQuery?key=test-key")
                    && body["structuredQuery"]["where"]["fieldFilter"]["value"]["stringValue"]
                        == "https://a"
            })
            .returning(|_| {
                Ok(json_response(
                    200,
                    json!([
                        { "readTime": "2024-05-01T12:00:00Z" },
                        { "document": doc("doc-9", json!({})), "readTime": "2024-05-01T12:00:00Z" }
                    ]),
                ))
            });

        let id = gateway(mock).find_id_by_url("https://a").await;
        assert_eq!(id, Some(TrackId::new("doc-9")));
    }

    #[tokio::test]
    async fn test_find_id_by_url_swallows_errors() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .returning(|_| Err(BridgeError::OperationFailed("offline".to_string())));

        assert_eq!(gateway(mock).find_id_by_url("https://a").await, None);
    }

    #[tokio::test]
    async fn test_update_sends_mask_and_precondition() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .withf(|req| {
                req.method == HttpMethod::Patch
                    && req.url.contains("/documents/tracks/doc-1?key=test-key")
                    && req.url.contains("&updateMask.fieldPaths=rating")
                    && req.url.ends_with("&currentDocument.exists=true")
            })
            .times(1)
            .returning(|_| Ok(json_response(200, doc("doc-1", json!({})))));

        gateway(mock)
            .update(&TrackId::new("doc-1"), &TrackPatch::new().rating(1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_missing_document_fails() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().returning(|_| {
            Ok(json_response(
                404,
                json!({ "error": { "code": 404, "message": "No document to update", "status": "NOT_FOUND" } }),
            ))
        });

        let err = gateway(mock)
            .update(&TrackId::new("ghost"), &TrackPatch::new().title("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::SyncFailure(msg) if msg.contains("ghost")));
    }

    #[tokio::test]
    async fn test_upsert_has_no_precondition() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .withf(|req| req.method == HttpMethod::Patch && !req.url.contains("currentDocument"))
            .times(1)
            .returning(|_| Ok(json_response(200, doc("doc-1", json!({})))));

        gateway(mock)
            .upsert(&TrackId::new("doc-1"), &TrackPatch::new().title("Oceans"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_patch_skips_request() {
        let mock = MockHttpClient::new();
        gateway(mock)
            .upsert(&TrackId::new("doc-1"), &TrackPatch::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_posts_stamped_document() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .withf(|req| {
                let body: serde_json::Value =
                    serde_json::from_slice(req.body.as_ref().unwrap()).unwrap();
                req.method == HttpMethod::Post
                    && req.url.ends_with("/documents/tracks?key=test-key")
                    && body["fields"]["rating"]["integerValue"] == "0"
                    && body["fields"]["createdAt"]["timestampValue"] == "2024-05-01T12:00:00+00:00"
            })
            .times(1)
            .returning(|_| Ok(json_response(200, doc("new-id", json!({})))));

        let clock = FixedClock(chrono::Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        let id = gateway(mock)
            .with_clock(Arc::new(clock))
            .create(&TrackDraft::new("https://a", "Oceans"))
            .await
            .unwrap();

        assert_eq!(id, TrackId::new("new-id"));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_draft() {
        let mock = MockHttpClient::new();
        let err = gateway(mock)
            .create(&TrackDraft::new("", "Oceans"))
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_bearer_token_is_sent_when_configured() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .withf(|req| req.headers.get("Authorization") == Some(&"Bearer ya29.token".to_string()))
            .times(1)
            .returning(|_| Ok(json_response(200, json!({}))));

        let settings = FirestoreSettings {
            access_token: Some("ya29.token".to_string()),
            ..settings()
        };
        FirestoreGateway::new(Arc::new(mock), settings)
            .fetch_all()
            .await
            .unwrap();
    }
}
