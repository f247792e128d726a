//! Initialization sequencer
//!
//! Brings an empty or partially-provisioned remote project to a usable
//! state: collections exist with their attributes, the media bucket
//! exists, and both singleton documents are seeded with defaults. Every
//! step is idempotent, so running the sequence against an
//! already-provisioned project is a no-op.
//!
//! The whole sequence is retried with exponential backoff up to a
//! configured budget; exhausting it lands in a terminal `Degraded` phase
//! that callers observe through the phase channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::codec;
use crate::error::CoreResult;
use crate::models::{ContentSettings, SiteSettings, SINGLETON_ID};
use crate::remote::{AttributeSpec, BucketSpec, Collection, RemoteBackend, RemoteError};
use crate::store::SettingsStore;

/// Where the sequencer currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitPhase {
    Start,
    CollectionsChecking,
    CollectionsReady,
    BucketChecking,
    BucketReady,
    Seeding,
    /// Initial load complete; the bridge may attach now
    Loaded,
    /// Retry budget exhausted
    Degraded,
}

/// Runs the provisioning and seeding sequence
pub struct Initializer {
    backend: Arc<dyn RemoteBackend>,
    bucket_id: String,
    max_retries: u32,
    retry_delay: Duration,
    phase: watch::Sender<InitPhase>,
}

impl Initializer {
    pub fn new(
        backend: Arc<dyn RemoteBackend>,
        bucket_id: impl Into<String>,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Self {
        let (phase, _) = watch::channel(InitPhase::Start);
        Self {
            backend,
            bucket_id: bucket_id.into(),
            max_retries,
            retry_delay,
            phase,
        }
    }

    /// Watch phase transitions
    pub fn phase(&self) -> watch::Receiver<InitPhase> {
        self.phase.subscribe()
    }

    /// Run the full sequence, retrying on failure, then load the store
    ///
    /// On success the phase is `Loaded` and the store holds the remote
    /// copies. On exhaustion the phase is `Degraded` and the last error
    /// is returned.
    pub async fn run(&self, store: &SettingsStore) -> CoreResult<()> {
        let mut delay = self.retry_delay;
        let mut attempt = 0u32;

        loop {
            match self.run_once(store).await {
                Ok(()) => {
                    self.phase.send_replace(InitPhase::Loaded);
                    info!("initialization complete");
                    return Ok(());
                }
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        warn!(max_retries = self.max_retries, error = %e,
                            "initialization retry budget exhausted, degraded");
                        self.phase.send_replace(InitPhase::Degraded);
                        return Err(e);
                    }
                    warn!(attempt, error = %e, "initialization failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }

    async fn run_once(&self, store: &SettingsStore) -> CoreResult<()> {
        self.phase.send_replace(InitPhase::CollectionsChecking);
        self.ensure_collections().await?;
        self.phase.send_replace(InitPhase::CollectionsReady);

        self.phase.send_replace(InitPhase::BucketChecking);
        self.ensure_bucket().await?;
        self.phase.send_replace(InitPhase::BucketReady);

        self.phase.send_replace(InitPhase::Seeding);
        self.seed().await?;

        store.reload_site().await?;
        store.reload_content().await?;
        Ok(())
    }

    /// Create any missing collections (with attributes) and the bucket
    pub async fn provision(&self) -> CoreResult<()> {
        self.ensure_collections().await?;
        self.ensure_bucket().await
    }

    /// Probe each collection with a zero-limit list; create it on miss
    async fn ensure_collections(&self) -> CoreResult<()> {
        for collection in Collection::ALL {
            match self.backend.list_documents(collection, 0).await {
                Ok(_) => {
                    debug!(%collection, "collection present");
                    continue;
                }
                Err(RemoteError::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }

            info!(%collection, "creating collection");
            match self
                .backend
                .create_collection(collection, &attributes_for(collection))
                .await
            {
                // Lost a provisioning race; the other writer finished it
                Ok(()) | Err(RemoteError::AlreadyExists { .. }) => {}
                Err(e) => return Err(e.into()),
            }

            // Re-probe once so a create that silently failed surfaces here
            self.backend.list_documents(collection, 0).await?;
        }
        Ok(())
    }

    async fn ensure_bucket(&self) -> CoreResult<()> {
        match self.backend.get_bucket().await {
            Ok(()) => {
                debug!("bucket present");
                return Ok(());
            }
            Err(RemoteError::NotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }

        info!("creating media bucket");
        let spec = BucketSpec::media(self.bucket_id.clone());
        match self.backend.create_bucket(&spec).await {
            Ok(()) | Err(RemoteError::AlreadyExists { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Create missing singleton documents from defaults
    ///
    /// Existing documents are left untouched, which makes seeding safe to
    /// run any number of times. Returns how many documents were created.
    pub async fn seed(&self) -> CoreResult<u32> {
        let mut created = 0;

        let site_doc = codec::encode_site_settings(&SiteSettings::default())?;
        created += self.seed_document(Collection::Settings, &site_doc).await?;

        let content_doc = codec::encode_content_settings(&ContentSettings::default())?;
        created += self.seed_document(Collection::Content, &content_doc).await?;

        Ok(created)
    }

    async fn seed_document(
        &self,
        collection: Collection,
        document: &crate::remote::RemoteDocument,
    ) -> CoreResult<u32> {
        match self.backend.get_document(collection, SINGLETON_ID).await {
            Ok(_) => {
                debug!(%collection, "singleton present, not overwritten");
                return Ok(0);
            }
            Err(RemoteError::NotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }

        info!(%collection, "seeding singleton document");
        match self.backend.create_document(collection, document).await {
            Ok(()) => Ok(1),
            // Concurrent seeder won the race
            Err(RemoteError::AlreadyExists { .. }) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

/// Attribute manifest for a collection's schema
fn attributes_for(collection: Collection) -> Vec<AttributeSpec> {
    match collection {
        Collection::Settings => codec::site_attributes(),
        Collection::Content => codec::content_attributes(),
        Collection::Media => codec::media_attributes(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::ChangeBus;
    use crate::remote::memory::MemoryBackend;
    use crate::remote::RemoteDocument;
    use tempfile::TempDir;

    fn store_for(backend: &Arc<MemoryBackend>, temp_dir: &TempDir) -> SettingsStore {
        SettingsStore::open(
            Arc::clone(backend) as Arc<dyn RemoteBackend>,
            temp_dir.path().join("snapshot.json"),
            ChangeBus::new(),
        )
    }

    #[tokio::test]
    async fn test_full_run_from_empty_project() {
        let temp_dir = TempDir::new().unwrap();
        let backend = Arc::new(MemoryBackend::new());
        let store = store_for(&backend, &temp_dir);

        let init = Initializer::new(
            Arc::clone(&backend) as Arc<dyn RemoteBackend>,
            "media",
            3,
            Duration::from_millis(10),
        );
        init.run(&store).await.unwrap();

        assert_eq!(*init.phase().borrow(), InitPhase::Loaded);
        assert_eq!(backend.document_count(Collection::Settings), 1);
        assert_eq!(backend.document_count(Collection::Content), 1);
        assert!(backend.get_bucket().await.is_ok());
        assert_eq!(store.site(), SiteSettings::default());
    }

    #[tokio::test]
    async fn test_seeding_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let backend = Arc::new(MemoryBackend::new());
        let store = store_for(&backend, &temp_dir);

        let init = Initializer::new(
            Arc::clone(&backend) as Arc<dyn RemoteBackend>,
            "media",
            3,
            Duration::from_millis(10),
        );
        init.run(&store).await.unwrap();

        let before = backend
            .get_document(Collection::Settings, SINGLETON_ID)
            .await
            .unwrap();

        // Second full run creates nothing and changes nothing
        init.run(&store).await.unwrap();
        assert_eq!(backend.document_count(Collection::Settings), 1);
        assert_eq!(backend.document_count(Collection::Content), 1);

        let after = backend
            .get_document(Collection::Settings, SINGLETON_ID)
            .await
            .unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_existing_documents_survive_seeding() {
        let temp_dir = TempDir::new().unwrap();
        let backend = Arc::new(MemoryBackend::provisioned());

        let mut customized = SiteSettings::default();
        customized.site_name = "Already customized".to_string();
        backend
            .create_document(
                Collection::Settings,
                &codec::encode_site_settings(&customized).unwrap(),
            )
            .await
            .unwrap();

        let store = store_for(&backend, &temp_dir);
        let init = Initializer::new(
            Arc::clone(&backend) as Arc<dyn RemoteBackend>,
            "media",
            3,
            Duration::from_millis(10),
        );
        init.run(&store).await.unwrap();

        assert_eq!(store.site().site_name, "Already customized");
    }

    #[tokio::test]
    async fn test_seed_reports_created_count() {
        let backend = Arc::new(MemoryBackend::provisioned());
        let init = Initializer::new(
            Arc::clone(&backend) as Arc<dyn RemoteBackend>,
            "media",
            3,
            Duration::from_millis(10),
        );

        assert_eq!(init.seed().await.unwrap(), 2);
        assert_eq!(init.seed().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_seed_ignores_unrelated_documents() {
        let backend = Arc::new(MemoryBackend::provisioned());
        backend.put_document_external(
            Collection::Media,
            RemoteDocument::new("img-1").with_field("name", "bins.jpg"),
        );

        let init = Initializer::new(
            Arc::clone(&backend) as Arc<dyn RemoteBackend>,
            "media",
            3,
            Duration::from_millis(10),
        );
        init.seed().await.unwrap();
        assert_eq!(backend.document_count(Collection::Media), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_degraded_after_retry_budget() {
        let temp_dir = TempDir::new().unwrap();
        let backend = Arc::new(MemoryBackend::new());
        backend.set_offline(true);
        let store = store_for(&backend, &temp_dir);

        let init = Initializer::new(
            Arc::clone(&backend) as Arc<dyn RemoteBackend>,
            "media",
            2,
            Duration::from_millis(100),
        );
        let result = init.run(&store).await;

        assert!(result.is_err());
        assert_eq!(*init.phase().borrow(), InitPhase::Degraded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_within_retry_budget() {
        let temp_dir = TempDir::new().unwrap();
        let backend = Arc::new(MemoryBackend::new());
        backend.set_offline(true);
        let store = store_for(&backend, &temp_dir);

        let init = Initializer::new(
            Arc::clone(&backend) as Arc<dyn RemoteBackend>,
            "media",
            5,
            Duration::from_millis(100),
        );

        let backend_clone = Arc::clone(&backend);
        let recover = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            backend_clone.set_offline(false);
        });

        init.run(&store).await.unwrap();
        recover.await.unwrap();
        assert_eq!(*init.phase().borrow(), InitPhase::Loaded);
    }

    #[tokio::test]
    async fn test_provision_tolerates_existing_resources() {
        let backend = Arc::new(MemoryBackend::provisioned());
        let init = Initializer::new(
            Arc::clone(&backend) as Arc<dyn RemoteBackend>,
            "media",
            3,
            Duration::from_millis(10),
        );
        init.provision().await.unwrap();
        assert!(backend.get_bucket().await.is_ok());
    }
}
