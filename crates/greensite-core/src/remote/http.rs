//! Hosted document store backend
//!
//! REST implementation of [`RemoteBackend`] against the hosted API:
//! document CRUD under `/databases/{db}/collections/{c}/documents`,
//! storage under `/storage/buckets/{b}/files`, provisioning through the
//! admin API (requires the API key), and a websocket realtime channel at
//! `/realtime` that is decoded into [`RemoteEvent`]s.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use super::{
    AttributeSpec, BucketSpec, Collection, EventKind, RemoteBackend, RemoteDocument, RemoteError,
    RemoteEvent, RemoteResult, StoredFile,
};
use crate::config::Config;

/// REST + websocket backend for the hosted document store
pub struct HttpBackend {
    client: reqwest::Client,
    endpoint: String,
    project_id: String,
    database_id: String,
    bucket_id: String,
}

impl HttpBackend {
    /// Build a backend from configuration
    ///
    /// The API key is attached when configured; without it only the
    /// non-admin routes work (document reads/writes, uploads).
    pub fn new(config: &Config) -> RemoteResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Appwrite-Project",
            HeaderValue::from_str(&config.project_id)
                .map_err(|e| RemoteError::Config(format!("invalid project id: {}", e)))?,
        );
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            headers.insert(
                "X-Appwrite-Key",
                HeaderValue::from_str(key)
                    .map_err(|e| RemoteError::Config(format!("invalid api key: {}", e)))?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| RemoteError::Config(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            database_id: config.database_id.clone(),
            bucket_id: config.bucket_id.clone(),
        })
    }

    fn documents_url(&self, collection: Collection) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.endpoint,
            self.database_id,
            collection.id()
        )
    }

    fn realtime_url(&self, collections: &[Collection]) -> String {
        let ws_endpoint = if let Some(rest) = self.endpoint.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else {
            format!("ws://{}", self.endpoint.trim_start_matches("http://"))
        };

        let channels: Vec<String> = collections
            .iter()
            .map(|c| {
                format!(
                    "channels[]=databases.{}.collections.{}.documents",
                    self.database_id,
                    c.id()
                )
            })
            .collect();

        format!(
            "{}/realtime?project={}&{}",
            ws_endpoint,
            self.project_id,
            channels.join("&")
        )
    }

    /// Map a non-success response to a typed error
    async fn error_for(resource: &str, response: reqwest::Response) -> RemoteError {
        let status = response.status();
        let message = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
            .unwrap_or_else(|| status.to_string());

        match status {
            StatusCode::NOT_FOUND => RemoteError::not_found(resource),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Unauthorized(message),
            StatusCode::CONFLICT => RemoteError::AlreadyExists {
                resource: resource.to_string(),
            },
            _ => RemoteError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Extract the flat string attributes from a document body
    ///
    /// Server metadata keys (`$id`, `$createdAt`, ...) are skipped;
    /// non-string values were never written by this app and are ignored.
    fn parse_document(value: &Value) -> RemoteResult<RemoteDocument> {
        let obj = value
            .as_object()
            .ok_or_else(|| RemoteError::Protocol("document body is not an object".to_string()))?;

        let id = obj
            .get("$id")
            .and_then(Value::as_str)
            .ok_or_else(|| RemoteError::Protocol("document body has no $id".to_string()))?;

        let mut fields = BTreeMap::new();
        for (key, val) in obj {
            if key.starts_with('$') {
                continue;
            }
            if let Some(s) = val.as_str() {
                fields.insert(key.clone(), s.to_string());
            }
        }

        Ok(RemoteDocument {
            id: id.to_string(),
            fields,
        })
    }

    fn file_url(&self, file_id: &str) -> String {
        format!(
            "{}/storage/buckets/{}/files/{}/view?project={}",
            self.endpoint, self.bucket_id, file_id, self.project_id
        )
    }
}

#[async_trait]
impl RemoteBackend for HttpBackend {
    async fn get_document(
        &self,
        collection: Collection,
        id: &str,
    ) -> RemoteResult<RemoteDocument> {
        let resource = format!("{}/{}", collection, id);
        let url = format!("{}/{}", self.documents_url(collection), id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_for(&resource, response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RemoteError::Protocol(e.to_string()))?;
        Self::parse_document(&body)
    }

    async fn create_document(
        &self,
        collection: Collection,
        document: &RemoteDocument,
    ) -> RemoteResult<()> {
        let resource = format!("{}/{}", collection, document.id);
        let body = json!({
            "documentId": document.id,
            "data": document.fields,
            "permissions": ["read(\"any\")", "update(\"any\")"],
        });

        let response = self
            .client
            .post(self.documents_url(collection))
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_for(&resource, response).await);
        }
        Ok(())
    }

    async fn update_document(
        &self,
        collection: Collection,
        document: &RemoteDocument,
    ) -> RemoteResult<()> {
        let resource = format!("{}/{}", collection, document.id);
        let url = format!("{}/{}", self.documents_url(collection), document.id);

        let response = self
            .client
            .patch(&url)
            .json(&json!({ "data": document.fields }))
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_for(&resource, response).await);
        }
        Ok(())
    }

    async fn list_documents(
        &self,
        collection: Collection,
        limit: u32,
    ) -> RemoteResult<Vec<RemoteDocument>> {
        let url = format!(
            "{}?queries[]=limit({})",
            self.documents_url(collection),
            limit
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_for(collection.id(), response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RemoteError::Protocol(e.to_string()))?;
        let documents = body
            .get("documents")
            .and_then(Value::as_array)
            .ok_or_else(|| RemoteError::Protocol("list response has no documents".to_string()))?;

        documents.iter().map(Self::parse_document).collect()
    }

    async fn create_collection(
        &self,
        collection: Collection,
        attributes: &[AttributeSpec],
    ) -> RemoteResult<()> {
        let url = format!("{}/databases/{}/collections", self.endpoint, self.database_id);
        let body = json!({
            "collectionId": collection.id(),
            "name": collection.id(),
            "permissions": ["read(\"any\")", "create(\"any\")", "update(\"any\")"],
            "documentSecurity": false,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_for(collection.id(), response).await);
        }

        // Attributes are created one call each
        for attr in attributes {
            let attr_url = format!(
                "{}/databases/{}/collections/{}/attributes/string",
                self.endpoint,
                self.database_id,
                collection.id()
            );
            let response = self
                .client
                .post(&attr_url)
                .json(&json!({
                    "key": attr.key,
                    "size": attr.size,
                    "required": false,
                }))
                .send()
                .await
                .map_err(|e| RemoteError::Network(e.to_string()))?;

            if !response.status().is_success() {
                let resource = format!("{}.{}", collection, attr.key);
                return Err(Self::error_for(&resource, response).await);
            }
            debug!(collection = %collection, attribute = %attr.key, "attribute created");
        }

        Ok(())
    }

    async fn get_bucket(&self) -> RemoteResult<()> {
        let url = format!("{}/storage/buckets/{}", self.endpoint, self.bucket_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_for(&self.bucket_id, response).await);
        }
        Ok(())
    }

    async fn create_bucket(&self, spec: &BucketSpec) -> RemoteResult<()> {
        let url = format!("{}/storage/buckets", self.endpoint);
        let body = json!({
            "bucketId": spec.id,
            "name": spec.name,
            "permissions": spec.permissions,
            "fileSecurity": false,
            "maximumFileSize": spec.max_file_size,
            "allowedFileExtensions": spec.allowed_extensions,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_for(&spec.id, response).await);
        }
        Ok(())
    }

    async fn upload_file(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> RemoteResult<StoredFile> {
        let url = format!("{}/storage/buckets/{}/files", self.endpoint, self.bucket_id);

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(name.to_string())
            .mime_str(content_type)
            .map_err(|e| RemoteError::Config(format!("invalid content type: {}", e)))?;
        let form = reqwest::multipart::Form::new()
            .text("fileId", "unique()")
            .part("file", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let resource = format!("files/{}", name);
            return Err(Self::error_for(&resource, response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RemoteError::Protocol(e.to_string()))?;
        let file_id = body
            .get("$id")
            .and_then(Value::as_str)
            .ok_or_else(|| RemoteError::Protocol("upload response has no $id".to_string()))?;

        Ok(StoredFile {
            public_id: file_id.to_string(),
            url: self.file_url(file_id),
        })
    }

    async fn delete_file(&self, public_id: &str) -> RemoteResult<()> {
        let url = format!(
            "{}/storage/buckets/{}/files/{}",
            self.endpoint, self.bucket_id, public_id
        );

        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let resource = format!("files/{}", public_id);
            return Err(Self::error_for(&resource, response).await);
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        collections: &[Collection],
    ) -> RemoteResult<mpsc::UnboundedReceiver<RemoteEvent>> {
        let url = self.realtime_url(collections);
        debug!(url = %url, "opening realtime channel");

        let (ws_stream, _response) = connect_async(&url)
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let database_id = self.database_id.clone();
        let watched = collections.to_vec();

        tokio::spawn(async move {
            let (_write, mut read) = ws_stream.split();
            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        for event in decode_realtime_events(&text, &database_id, &watched) {
                            if tx.send(event).is_err() {
                                return;
                            }
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "realtime channel error");
                        break;
                    }
                }
            }
            // Dropping tx ends the stream; the bridge handles reconnects
        });

        Ok(rx)
    }
}

/// Decode a realtime envelope into the events the app cares about
///
/// Envelope shape:
/// `{"type":"event","data":{"events":["databases.<db>.collections.<c>.documents.<id>.update",...],
///   "payload":{"$id":"...",...}}}`. Only the event names are trusted;
/// the payload is deliberately ignored (pull-on-notify).
fn decode_realtime_events(
    text: &str,
    database_id: &str,
    watched: &[Collection],
) -> Vec<RemoteEvent> {
    let Ok(envelope) = serde_json::from_str::<Value>(text) else {
        warn!("undecodable realtime message");
        return Vec::new();
    };

    if envelope.get("type").and_then(Value::as_str) != Some("event") {
        return Vec::new();
    }

    let Some(names) = envelope
        .pointer("/data/events")
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    let mut events = Vec::new();
    for name in names.iter().filter_map(Value::as_str) {
        let Some(event) = parse_event_name(name, database_id, watched) else {
            continue;
        };
        if !events.contains(&event) {
            events.push(event);
        }
    }
    events
}

/// Parse `databases.<db>.collections.<c>.documents.<id>.<op>`
fn parse_event_name(name: &str, database_id: &str, watched: &[Collection]) -> Option<RemoteEvent> {
    let parts: Vec<&str> = name.split('.').collect();
    match parts.as_slice() {
        ["databases", db, "collections", coll, "documents", doc_id, op] if *db == database_id => {
            let collection = *watched.iter().find(|c| c.id() == *coll)?;
            let kind = match *op {
                "create" => EventKind::Create,
                "update" => EventKind::Update,
                "delete" => EventKind::Delete,
                _ => return None,
            };
            Some(RemoteEvent {
                collection,
                kind,
                document_id: (*doc_id).to_string(),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> HttpBackend {
        let config = Config {
            endpoint: "https://store.example.com/v1".to_string(),
            project_id: "recycling-site".to_string(),
            database_id: "main".to_string(),
            bucket_id: "media".to_string(),
            ..Config::default()
        };
        HttpBackend::new(&config).unwrap()
    }

    #[test]
    fn test_urls() {
        let backend = backend();
        assert_eq!(
            backend.documents_url(Collection::Settings),
            "https://store.example.com/v1/databases/main/collections/settings/documents"
        );
        assert_eq!(
            backend.file_url("abc"),
            "https://store.example.com/v1/storage/buckets/media/files/abc/view?project=recycling-site"
        );
    }

    #[test]
    fn test_realtime_url_uses_ws_scheme() {
        let backend = backend();
        let url = backend.realtime_url(&[Collection::Settings, Collection::Content]);
        assert!(url.starts_with("wss://store.example.com/v1/realtime?project=recycling-site"));
        assert!(url.contains("channels[]=databases.main.collections.settings.documents"));
        assert!(url.contains("channels[]=databases.main.collections.content.documents"));
    }

    #[test]
    fn test_parse_document_skips_metadata() {
        let body = json!({
            "$id": "main",
            "$createdAt": "2024-03-01T00:00:00Z",
            "siteName": "GreenLoop",
            "users": "[]",
        });
        let doc = HttpBackend::parse_document(&body).unwrap();
        assert_eq!(doc.id, "main");
        assert_eq!(doc.field("siteName"), Some("GreenLoop"));
        assert!(doc.field("$createdAt").is_none());
    }

    #[test]
    fn test_decode_realtime_events() {
        let text = r#"{
            "type": "event",
            "data": {
                "events": [
                    "databases.main.collections.content.documents.main.update",
                    "databases.main.collections.content.documents.main.update",
                    "databases.other.collections.content.documents.main.update"
                ],
                "payload": {"$id": "main"}
            }
        }"#;

        let events =
            decode_realtime_events(text, "main", &[Collection::Settings, Collection::Content]);
        // Duplicates collapsed, foreign database ignored
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].collection, Collection::Content);
        assert_eq!(events[0].kind, EventKind::Update);
        assert_eq!(events[0].document_id, "main");
    }

    #[test]
    fn test_decode_ignores_non_event_messages() {
        let text = r#"{"type":"connected","data":{}}"#;
        assert!(decode_realtime_events(text, "main", &[Collection::Settings]).is_empty());
        assert!(decode_realtime_events("not json", "main", &[Collection::Settings]).is_empty());
    }
}
