//! In-memory backend
//!
//! Same semantics as the hosted store, held in process memory: documents
//! live in per-collection maps, uploads get synthetic object keys, and
//! every document write is broadcast to realtime subscribers. Fault
//! flags let tests exercise the failure paths (persist failures, broken
//! storage deletes, a fully unreachable backend).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{
    AttributeSpec, BucketSpec, Collection, EventKind, RemoteBackend, RemoteDocument, RemoteError,
    RemoteEvent, RemoteResult, StoredFile,
};

#[derive(Default)]
struct State {
    /// Created collections and their documents
    collections: HashMap<Collection, HashMap<String, RemoteDocument>>,
    bucket: bool,
    files: HashMap<String, StoredFile>,
    next_file_id: u64,
    subscribers: Vec<(Vec<Collection>, mpsc::UnboundedSender<RemoteEvent>)>,
}

/// In-memory implementation of [`RemoteBackend`]
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
    fail_updates: AtomicBool,
    fail_file_deletes: AtomicBool,
    offline: AtomicBool,
}

impl MemoryBackend {
    /// Empty backend: no collections, no bucket
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend with all collections and the bucket already created
    pub fn provisioned() -> Self {
        let backend = Self::new();
        {
            let mut state = backend.state.lock().unwrap();
            for collection in Collection::ALL {
                state.collections.insert(collection, HashMap::new());
            }
            state.bucket = true;
        }
        backend
    }

    /// Make every document update fail with a network error
    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Make file deletion fail with a network error
    pub fn set_fail_file_deletes(&self, fail: bool) {
        self.fail_file_deletes.store(fail, Ordering::SeqCst);
    }

    /// Make every call fail, including subscription setup
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of documents in a collection (0 if it doesn't exist)
    pub fn document_count(&self, collection: Collection) -> usize {
        let state = self.state.lock().unwrap();
        state
            .collections
            .get(&collection)
            .map(HashMap::len)
            .unwrap_or(0)
    }

    /// Whether a storage object is still retrievable
    pub fn file_exists(&self, public_id: &str) -> bool {
        self.state.lock().unwrap().files.contains_key(public_id)
    }

    /// Write a document directly, as a concurrent remote writer would,
    /// notifying realtime subscribers
    pub fn put_document_external(&self, collection: Collection, document: RemoteDocument) {
        let mut state = self.state.lock().unwrap();
        let docs = state.collections.entry(collection).or_default();
        let kind = if docs.contains_key(&document.id) {
            EventKind::Update
        } else {
            EventKind::Create
        };
        let id = document.id.clone();
        docs.insert(id.clone(), document);
        Self::notify(&mut state, collection, kind, &id);
    }

    fn check_online(&self) -> RemoteResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Network("backend unreachable".to_string()));
        }
        Ok(())
    }

    fn notify(state: &mut State, collection: Collection, kind: EventKind, id: &str) {
        let event = RemoteEvent {
            collection,
            kind,
            document_id: id.to_string(),
        };
        // Drop subscribers whose receiver is gone
        state.subscribers.retain(|(collections, tx)| {
            if !collections.contains(&collection) {
                return !tx.is_closed();
            }
            tx.send(event.clone()).is_ok()
        });
    }
}

#[async_trait]
impl RemoteBackend for MemoryBackend {
    async fn get_document(
        &self,
        collection: Collection,
        id: &str,
    ) -> RemoteResult<RemoteDocument> {
        self.check_online()?;
        let state = self.state.lock().unwrap();
        state
            .collections
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .cloned()
            .ok_or_else(|| RemoteError::not_found(format!("{}/{}", collection, id)))
    }

    async fn create_document(
        &self,
        collection: Collection,
        document: &RemoteDocument,
    ) -> RemoteResult<()> {
        self.check_online()?;
        let mut state = self.state.lock().unwrap();
        let docs = state
            .collections
            .get_mut(&collection)
            .ok_or_else(|| RemoteError::not_found(collection.id()))?;

        if docs.contains_key(&document.id) {
            return Err(RemoteError::AlreadyExists {
                resource: format!("{}/{}", collection, document.id),
            });
        }
        docs.insert(document.id.clone(), document.clone());
        Self::notify(&mut state, collection, EventKind::Create, &document.id);
        Ok(())
    }

    async fn update_document(
        &self,
        collection: Collection,
        document: &RemoteDocument,
    ) -> RemoteResult<()> {
        self.check_online()?;
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(RemoteError::Network("injected update failure".to_string()));
        }

        let mut state = self.state.lock().unwrap();
        let docs = state
            .collections
            .get_mut(&collection)
            .ok_or_else(|| RemoteError::not_found(collection.id()))?;

        if !docs.contains_key(&document.id) {
            return Err(RemoteError::not_found(format!(
                "{}/{}",
                collection, document.id
            )));
        }
        docs.insert(document.id.clone(), document.clone());
        Self::notify(&mut state, collection, EventKind::Update, &document.id);
        Ok(())
    }

    async fn list_documents(
        &self,
        collection: Collection,
        limit: u32,
    ) -> RemoteResult<Vec<RemoteDocument>> {
        self.check_online()?;
        let state = self.state.lock().unwrap();
        let docs = state
            .collections
            .get(&collection)
            .ok_or_else(|| RemoteError::not_found(collection.id()))?;

        Ok(docs.values().take(limit as usize).cloned().collect())
    }

    async fn create_collection(
        &self,
        collection: Collection,
        _attributes: &[AttributeSpec],
    ) -> RemoteResult<()> {
        self.check_online()?;
        let mut state = self.state.lock().unwrap();
        if state.collections.contains_key(&collection) {
            return Err(RemoteError::AlreadyExists {
                resource: collection.id().to_string(),
            });
        }
        state.collections.insert(collection, HashMap::new());
        Ok(())
    }

    async fn get_bucket(&self) -> RemoteResult<()> {
        self.check_online()?;
        if self.state.lock().unwrap().bucket {
            Ok(())
        } else {
            Err(RemoteError::not_found("bucket"))
        }
    }

    async fn create_bucket(&self, spec: &BucketSpec) -> RemoteResult<()> {
        self.check_online()?;
        let mut state = self.state.lock().unwrap();
        if state.bucket {
            return Err(RemoteError::AlreadyExists {
                resource: spec.id.clone(),
            });
        }
        state.bucket = true;
        Ok(())
    }

    async fn upload_file(
        &self,
        name: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> RemoteResult<StoredFile> {
        self.check_online()?;
        let mut state = self.state.lock().unwrap();
        if !state.bucket {
            return Err(RemoteError::not_found("bucket"));
        }

        state.next_file_id += 1;
        let public_id = format!("file-{}", state.next_file_id);
        let file = StoredFile {
            public_id: public_id.clone(),
            url: format!("memory://media/{}/{}", public_id, name),
        };
        state.files.insert(public_id, file.clone());
        Ok(file)
    }

    async fn delete_file(&self, public_id: &str) -> RemoteResult<()> {
        self.check_online()?;
        if self.fail_file_deletes.load(Ordering::SeqCst) {
            return Err(RemoteError::Network(
                "injected file delete failure".to_string(),
            ));
        }

        let mut state = self.state.lock().unwrap();
        state
            .files
            .remove(public_id)
            .map(|_| ())
            .ok_or_else(|| RemoteError::not_found(format!("files/{}", public_id)))
    }

    async fn subscribe(
        &self,
        collections: &[Collection],
    ) -> RemoteResult<mpsc::UnboundedReceiver<RemoteEvent>> {
        self.check_online()?;
        let (tx, rx) = mpsc::unbounded_channel();
        self.state
            .lock()
            .unwrap()
            .subscribers
            .push((collections.to_vec(), tx));
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_document_crud() {
        let backend = MemoryBackend::provisioned();
        let doc = RemoteDocument::new("main").with_field("siteName", "GreenLoop");

        backend
            .create_document(Collection::Settings, &doc)
            .await
            .unwrap();
        let fetched = backend
            .get_document(Collection::Settings, "main")
            .await
            .unwrap();
        assert_eq!(fetched.field("siteName"), Some("GreenLoop"));

        // Duplicate create is rejected
        let err = backend
            .create_document(Collection::Settings, &doc)
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_unprovisioned_collection_is_not_found() {
        let backend = MemoryBackend::new();
        let err = backend
            .list_documents(Collection::Settings, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::NotFound { .. }));

        backend
            .create_collection(Collection::Settings, &[])
            .await
            .unwrap();
        assert!(backend
            .list_documents(Collection::Settings, 0)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_file_upload_and_delete() {
        let backend = MemoryBackend::provisioned();
        let file = backend
            .upload_file("bins.jpg", vec![1, 2, 3], "image/jpeg")
            .await
            .unwrap();
        assert!(backend.file_exists(&file.public_id));

        backend.delete_file(&file.public_id).await.unwrap();
        assert!(!backend.file_exists(&file.public_id));

        let err = backend.delete_file(&file.public_id).await.unwrap_err();
        assert!(matches!(err, RemoteError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_subscribers_receive_document_events() {
        let backend = MemoryBackend::provisioned();
        let mut rx = backend.subscribe(&[Collection::Content]).await.unwrap();

        // Settings event filtered out, content event delivered
        backend
            .create_document(Collection::Settings, &RemoteDocument::new("main"))
            .await
            .unwrap();
        backend
            .create_document(Collection::Content, &RemoteDocument::new("main"))
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.collection, Collection::Content);
        assert_eq!(event.kind, EventKind::Create);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_offline_fails_everything() {
        let backend = MemoryBackend::provisioned();
        backend.set_offline(true);

        assert!(backend.get_document(Collection::Settings, "main").await.is_err());
        assert!(backend.subscribe(&[Collection::Settings]).await.is_err());

        backend.set_offline(false);
        assert!(backend.subscribe(&[Collection::Settings]).await.is_ok());
    }
}
