//! End-to-end tests for the library service
//!
//! The Firestore-backed service is driven through a routing `HttpClient`
//! that serves canned REST responses, so the full path from configuration
//! through the gateway, the storage resolver and the store is exercised.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bytes::Bytes;
use core_library::{
    CatalogGateway, LibraryError, Result, Track, TrackDraft, TrackId, TrackPatch,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, SyncEvent};
use core_service::{CoreError, LibraryService};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ============================================================================
// Test doubles
// ============================================================================

/// Serves responses by URL substring and records every request.
#[derive(Default)]
struct RoutedHttpClient {
    routes: Vec<(&'static str, u16, serde_json::Value)>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RoutedHttpClient {
    fn route(mut self, fragment: &'static str, status: u16, body: serde_json::Value) -> Self {
        self.routes.push((fragment, status, body));
        self
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for RoutedHttpClient {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());

        self.routes
            .iter()
            .find(|(fragment, _, _)| request.url.contains(fragment))
            .map(|(_, status, body)| HttpResponse {
                status: *status,
                headers: HashMap::new(),
                body: Bytes::from(body.to_string()),
            })
            .ok_or_else(|| BridgeError::OperationFailed(format!("no route for {}", request.url)))
    }
}

/// In-memory catalog keyed by document id.
#[derive(Default)]
struct MemoryGateway {
    documents: Mutex<Vec<Track>>,
}

#[async_trait]
impl CatalogGateway for MemoryGateway {
    async fn fetch_all(&self) -> Result<Vec<Track>> {
        Ok(self.documents.lock().unwrap().clone())
    }

    async fn find_id_by_url(&self, url: &str) -> Option<TrackId> {
        self.documents
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.url == url)
            .map(|t| t.id.clone())
    }

    async fn update(&self, id: &TrackId, patch: &TrackPatch) -> Result<()> {
        let mut documents = self.documents.lock().unwrap();
        let track = documents
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| LibraryError::SyncFailure(format!("Document not found: {}", id)))?;
        if let Some(title) = &patch.title {
            track.title = title.clone();
        }
        Ok(())
    }

    async fn upsert(&self, id: &TrackId, patch: &TrackPatch) -> Result<()> {
        if self.update(id, patch).await.is_err() {
            let url = patch.url.clone().unwrap_or_default();
            let title = patch.title.clone().unwrap_or_default();
            self.documents
                .lock()
                .unwrap()
                .push(Track::new(id.clone(), url).with_title(title));
        }
        Ok(())
    }

    async fn create(&self, draft: &TrackDraft) -> Result<TrackId> {
        let mut documents = self.documents.lock().unwrap();
        let id = TrackId::new(format!("doc-{}", documents.len() + 1));
        documents.push(Track::new(id.clone(), draft.url.clone()).with_title(draft.title.clone()));
        Ok(id)
    }
}

fn config() -> CoreConfig {
    CoreConfig::builder()
        .project_id("music-app")
        .api_key("test-key")
        .storage_bucket("music-app.appspot.com")
        .placeholder_artwork("asset://placeholder.png")
        .build()
        .unwrap()
}

fn firestore_doc(id: &str, fields: serde_json::Value) -> serde_json::Value {
    json!({
        "name": format!("projects/music-app/databases/(default)/documents/tracks/{}", id),
        "fields": fields
    })
}

// ============================================================================
// Firestore-backed service
// ============================================================================

#[tokio::test]
async fn test_bootstrap_syncs_and_resolves_storage_urls() {
    let http = Arc::new(
        RoutedHttpClient::default()
            .route(
                "/documents/tracks?",
                200,
                json!({ "documents": [
                    firestore_doc("a", json!({
                        "url": { "stringValue": "gs://music-app.appspot.com/audio/a.mp3" },
                        "title": { "stringValue": "Oceans" },
                        "artist": { "stringValue": "Hillsong" },
                        "playlist": { "arrayValue": { "values": [{ "stringValue": "Worship" }] } }
                    })),
                    firestore_doc("b", json!({
                        "url": { "stringValue": "https://cdn.example.com/b.mp3" },
                        "title": { "stringValue": "Way Maker" },
                        "rating": { "integerValue": "1" }
                    }))
                ] }),
            )
            .route(
                "/o/audio%2Fa.mp3",
                200,
                json!({ "name": "audio/a.mp3", "downloadTokens": "tok-a" }),
            ),
    );

    let config = CoreConfig {
        http_client: Some(http.clone()),
        ..config()
    };
    let service = LibraryService::bootstrap(config).unwrap();
    service.sync().await;

    let store = service.store();
    assert!(store.error().is_none());
    assert!(!store.is_loading());

    let tracks = store.tracks();
    assert_eq!(tracks.len(), 2);
    assert_eq!(
        tracks[0].url,
        "https://firebasestorage.googleapis.com/v0/b/music-app.appspot.com/o/audio%2Fa.mp3?alt=media&token=tok-a"
    );
    assert_eq!(store.favorites().len(), 1);
    assert_eq!(store.playlists()[0].name, "Worship");

    let methods: Vec<HttpMethod> = http.requests().iter().map(|r| r.method).collect();
    assert_eq!(methods, vec![HttpMethod::Get, HttpMethod::Get]);
}

#[tokio::test]
async fn test_bootstrap_failed_sync_records_error() {
    let http = Arc::new(RoutedHttpClient::default().route(
        "/documents/tracks?",
        403,
        json!({ "error": { "code": 403, "message": "Missing or insufficient permissions.", "status": "PERMISSION_DENIED" } }),
    ));

    let config = CoreConfig {
        http_client: Some(http),
        ..config()
    };
    let service = LibraryService::bootstrap(config).unwrap();
    service.sync().await;

    let store = service.store();
    assert!(store.tracks().is_empty());
    assert!(store.error().unwrap().contains("insufficient permissions"));
    assert!(!store.is_loading());
}

#[test]
fn test_bootstrap_rejects_invalid_config() {
    let config = CoreConfig {
        page_size: 0,
        http_client: Some(Arc::new(RoutedHttpClient::default())),
        ..config()
    };

    assert!(matches!(
        LibraryService::bootstrap(config),
        Err(CoreError::Runtime(_))
    ));
}

// ============================================================================
// Service over an explicit gateway
// ============================================================================

#[tokio::test]
async fn test_sync_publishes_events() {
    let gateway = Arc::new(MemoryGateway::default());
    gateway.create(&TrackDraft::new("https://a", "Oceans")).await.unwrap();

    let service = LibraryService::new(config(), gateway).unwrap();
    let mut events = service
        .subscribe_events()
        .filter(|event| matches!(event, CoreEvent::Sync(_)));

    service.sync().await;

    assert!(matches!(
        events.recv().await.unwrap(),
        CoreEvent::Sync(SyncEvent::Started { .. })
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        CoreEvent::Sync(SyncEvent::Completed { track_count: 1, .. })
    ));
}

#[tokio::test]
async fn test_store_uses_configured_placeholder() {
    let gateway = Arc::new(MemoryGateway::default());
    let service = LibraryService::new(config(), gateway).unwrap();

    assert_eq!(service.store().placeholder_artwork(), "asset://placeholder.png");
}

#[tokio::test]
async fn test_create_track_appears_after_next_sync() {
    let gateway = Arc::new(MemoryGateway::default());
    let service = LibraryService::new(config(), gateway).unwrap();

    let id = service
        .create_track(&TrackDraft::new("https://a", "Oceans"))
        .await
        .unwrap();
    assert!(service.store().tracks().is_empty());

    service.sync().await;
    assert_eq!(service.store().tracks()[0].id, id);
    assert_eq!(service.find_track_id("https://a").await, Some(id));
}

#[tokio::test]
async fn test_create_track_rejects_invalid_draft() {
    let service = LibraryService::new(config(), Arc::new(MemoryGateway::default())).unwrap();

    let err = service
        .create_track(&TrackDraft::new("https://a", "  "))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Library(LibraryError::InvalidInput { ref field, .. }) if field == "title"
    ));
}

#[tokio::test]
async fn test_publish_track_updates_existing_entry() {
    let gateway = Arc::new(MemoryGateway::default());
    let service = LibraryService::new(config(), gateway.clone()).unwrap();

    let first = service
        .publish_track(&TrackDraft::new("https://a", "Oceans"))
        .await
        .unwrap();
    let second = service
        .publish_track(&TrackDraft::new("https://a", "Oceans (Live)"))
        .await
        .unwrap();

    assert_eq!(first, second);
    let documents = gateway.fetch_all().await.unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].title, "Oceans (Live)");
}

#[tokio::test]
async fn test_update_missing_track_surfaces_error() {
    let service = LibraryService::new(config(), Arc::new(MemoryGateway::default())).unwrap();

    let err = service
        .update_track(&TrackId::new("ghost"), &TrackPatch::new().title("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Library(LibraryError::SyncFailure(_))));

    service
        .upsert_track(&TrackId::new("ghost"), &TrackPatch::new().url("https://g").title("x"))
        .await
        .unwrap();
    assert_eq!(
        service.find_track_id("https://g").await,
        Some(TrackId::new("ghost"))
    );
}
