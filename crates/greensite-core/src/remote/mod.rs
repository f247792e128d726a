//! Remote document client
//!
//! The marketing site keeps its two singleton documents and its media
//! files in a hosted document store. This module defines the backend
//! seam: a dyn-safe async trait over document CRUD, provisioning, file
//! storage and the realtime push channel.
//!
//! Two implementations ship with the crate:
//! - [`http::HttpBackend`]: the hosted REST + websocket API
//! - [`memory::MemoryBackend`]: in-memory, for tests and local runs

pub mod http;
pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Remote collections watched by the app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Site settings singleton
    Settings,
    /// Content settings singleton
    Content,
    /// Media records (written by setup tooling, not read by the app)
    Media,
}

impl Collection {
    /// All collections the deployment provisions
    pub const ALL: [Collection; 3] = [Collection::Settings, Collection::Content, Collection::Media];

    /// Remote collection id
    pub fn id(&self) -> &'static str {
        match self {
            Collection::Settings => "settings",
            Collection::Content => "content",
            Collection::Media => "media",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// What happened to a remote document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Create,
    Update,
    Delete,
}

/// A push notification from the realtime channel
///
/// Carries no document payload the subscriber should trust; it is a
/// "something changed, go re-fetch" signal only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEvent {
    pub collection: Collection,
    pub kind: EventKind,
    pub document_id: String,
}

/// A document as the remote store sees it: a flat map of string
/// attributes. Nested structures are JSON-encoded strings, handled by
/// [`crate::codec`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteDocument {
    pub id: String,
    pub fields: BTreeMap<String, String>,
}

impl RemoteDocument {
    /// Create an empty document with the given id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Set an attribute, returning self for chaining
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Get an attribute value
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// A string attribute to create on a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSpec {
    pub key: String,
    /// Maximum stored length
    pub size: u32,
}

impl AttributeSpec {
    pub fn new(key: impl Into<String>, size: u32) -> Self {
        Self {
            key: key.into(),
            size,
        }
    }
}

/// Parameters for the single media storage bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSpec {
    pub id: String,
    pub name: String,
    /// Anonymous read/create/update/delete; the site has no per-file
    /// access control.
    pub permissions: Vec<String>,
    pub allowed_extensions: Vec<String>,
    pub max_file_size: u64,
}

impl BucketSpec {
    /// The deployment's media bucket
    pub fn media(bucket_id: impl Into<String>) -> Self {
        Self {
            id: bucket_id.into(),
            name: "Site media".to_string(),
            permissions: ["read", "create", "update", "delete"]
                .iter()
                .map(|p| format!("{}(\"any\")", p))
                .collect(),
            allowed_extensions: ["jpg", "jpeg", "png", "gif", "webp", "svg"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_file_size: 30 * 1024 * 1024,
        }
    }
}

/// Handle to an uploaded storage object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Storage object key, required for deletion
    pub public_id: String,
    /// Public download URL
    pub url: String,
}

/// Errors returned by a remote backend
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Document, collection or file does not exist
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Missing or rejected credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource already exists (provisioning re-runs)
    #[error("Already exists: {resource}")]
    AlreadyExists { resource: String },

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Server replied with something we cannot interpret
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Server-side rejection not covered above
    #[error("Remote API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Backend is missing required configuration
    #[error("Backend configuration error: {0}")]
    Config(String),
}

impl RemoteError {
    /// Not-found constructor with a readable resource path
    pub fn not_found(resource: impl Into<String>) -> Self {
        RemoteError::NotFound {
            resource: resource.into(),
        }
    }
}

/// Result type for remote operations
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Async seam over the hosted document store and object storage.
///
/// Implementations use interior mutability and must be thread-safe; the
/// store, bridge and sequencer all share one backend behind an `Arc`.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Fetch a document by id
    async fn get_document(
        &self,
        collection: Collection,
        id: &str,
    ) -> RemoteResult<RemoteDocument>;

    /// Create a document (id taken from the document)
    async fn create_document(
        &self,
        collection: Collection,
        document: &RemoteDocument,
    ) -> RemoteResult<()>;

    /// Replace a document's attributes
    async fn update_document(
        &self,
        collection: Collection,
        document: &RemoteDocument,
    ) -> RemoteResult<()>;

    /// List documents; `limit == 0` is the cheap existence probe used by
    /// the initialization sequencer
    async fn list_documents(
        &self,
        collection: Collection,
        limit: u32,
    ) -> RemoteResult<Vec<RemoteDocument>>;

    /// Create a collection and its string attributes (admin API)
    async fn create_collection(
        &self,
        collection: Collection,
        attributes: &[AttributeSpec],
    ) -> RemoteResult<()>;

    /// Check that the media bucket exists
    async fn get_bucket(&self) -> RemoteResult<()>;

    /// Create the media bucket (admin API)
    async fn create_bucket(&self, spec: &BucketSpec) -> RemoteResult<()>;

    /// Upload a file to the media bucket
    async fn upload_file(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> RemoteResult<StoredFile>;

    /// Delete a file from the media bucket
    async fn delete_file(&self, public_id: &str) -> RemoteResult<()>;

    /// Open the realtime push channel for the given collections.
    ///
    /// The stream ends when the underlying connection drops; callers
    /// re-subscribe to reconnect.
    async fn subscribe(
        &self,
        collections: &[Collection],
    ) -> RemoteResult<mpsc::UnboundedReceiver<RemoteEvent>>;
}
