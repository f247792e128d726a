//! Local settings store
//!
//! The `SettingsStore` holds the last-known copy of the two singleton
//! documents and coordinates between:
//! - in-memory state (synchronous reads for rendering)
//! - the on-disk snapshot (instant rehydration across restarts)
//! - the remote document store (source of truth, persisted to
//!   asynchronously)
//!
//! ## Update flow
//!
//! Updates are optimistic: the patch is shallow-merged locally and
//! watchers are notified before the remote persist is attempted. The
//! persist runs on a background task; on success the change is announced
//! on the [`ChangeBus`], on failure the document is marked dirty so the
//! divergence is observable through [`SettingsStore::sync_health`]. Local
//! state is never rolled back.
//!
//! Two updates touching disjoint top-level keys never lose each other;
//! updates to the same key race and the last remote completion wins;
//! there is no version check.

use std::sync::{Arc, RwLock};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::bus::{ChangeBus, ChangePayload};
use crate::codec;
use crate::error::{CoreError, CoreResult};
use crate::models::{
    ContentSettings, ContentSettingsPatch, MediaEdit, MediaItem, MediaSection, SiteSettings,
    SiteSettingsPatch, SINGLETON_ID,
};
use crate::remote::{Collection, RemoteBackend};
use crate::snapshot::{Snapshot, SnapshotStore};

/// Which local documents have diverged from the remote store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncHealth {
    /// Site settings were mutated locally but the remote persist failed
    pub site_dirty: bool,
    /// Content settings were mutated locally but the remote persist failed
    pub content_dirty: bool,
}

impl SyncHealth {
    /// True when every local change reached the remote store
    pub fn is_clean(&self) -> bool {
        !self.site_dirty && !self.content_dirty
    }
}

struct StoreState {
    site: SiteSettings,
    content: ContentSettings,
    site_dirty: bool,
    content_dirty: bool,
}

struct StoreInner {
    backend: Arc<dyn RemoteBackend>,
    state: RwLock<StoreState>,
    snapshot: SnapshotStore,
    bus: ChangeBus,
    revision: watch::Sender<u64>,
}

/// Shared handle to the local settings store
///
/// Cheap to clone; clones share state. Constructed once at startup and
/// passed to whatever needs it (no module-level global).
#[derive(Clone)]
pub struct SettingsStore {
    inner: Arc<StoreInner>,
}

impl SettingsStore {
    /// Open the store, rehydrating from the on-disk snapshot when present
    ///
    /// A missing snapshot starts from defaults; an unreadable one is
    /// logged and also starts from defaults (the next reload overwrites
    /// it).
    pub fn open(
        backend: Arc<dyn RemoteBackend>,
        snapshot_path: std::path::PathBuf,
        bus: ChangeBus,
    ) -> Self {
        let snapshot_store = SnapshotStore::new(snapshot_path);
        let snapshot = match snapshot_store.load() {
            Ok(Some(snapshot)) => {
                debug!("rehydrated store from snapshot");
                snapshot
            }
            Ok(None) => Snapshot::default(),
            Err(e) => {
                warn!(error = %e, "unreadable snapshot, starting from defaults");
                Snapshot::default()
            }
        };

        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(StoreInner {
                backend,
                state: RwLock::new(StoreState {
                    site: snapshot.site,
                    content: snapshot.content,
                    site_dirty: false,
                    content_dirty: false,
                }),
                snapshot: snapshot_store,
                bus,
                revision,
            }),
        }
    }

    /// Last-known site settings (may be stale relative to remote)
    pub fn site(&self) -> SiteSettings {
        self.inner.state.read().unwrap().site.clone()
    }

    /// Last-known content settings (may be stale relative to remote)
    pub fn content(&self) -> ContentSettings {
        self.inner.state.read().unwrap().content.clone()
    }

    /// Dirty flags for both documents
    pub fn sync_health(&self) -> SyncHealth {
        let state = self.inner.state.read().unwrap();
        SyncHealth {
            site_dirty: state.site_dirty,
            content_dirty: state.content_dirty,
        }
    }

    /// Revision counter, bumped on every local change or reload
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// The change bus this store publishes to
    pub fn bus(&self) -> &ChangeBus {
        &self.inner.bus
    }

    /// Shallow-merge a patch into the site settings
    ///
    /// Returns after the local mutation; the remote persist continues on
    /// the returned task. With `broadcast`, a successful persist is
    /// announced on the bus.
    pub fn update_site(&self, patch: SiteSettingsPatch, broadcast: bool) -> JoinHandle<()> {
        let merged = {
            let mut state = self.inner.state.write().unwrap();
            patch.apply(&mut state.site);
            state.site_dirty = true;
            state.site.clone()
        };
        self.notify_local();

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let doc = match codec::encode_site_settings(&merged) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(error = %e, "site settings not persisted, kept locally as unsynced");
                    return;
                }
            };

            match inner.backend.update_document(Collection::Settings, &doc).await {
                Ok(()) => {
                    inner.state.write().unwrap().site_dirty = false;
                    if broadcast {
                        inner.bus.publish(ChangePayload::Site(patch), "admin");
                    }
                }
                Err(e) => {
                    warn!(error = %e, "site settings not persisted, kept locally as unsynced");
                }
            }
        })
    }

    /// Shallow-merge a patch into the content settings
    ///
    /// Same contract as [`SettingsStore::update_site`].
    pub fn update_content(&self, patch: ContentSettingsPatch, broadcast: bool) -> JoinHandle<()> {
        let merged = {
            let mut state = self.inner.state.write().unwrap();
            patch.apply(&mut state.content);
            state.content_dirty = true;
            state.content.clone()
        };
        self.notify_local();

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let doc = match codec::encode_content_settings(&merged) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(error = %e, "content settings not persisted, kept locally as unsynced");
                    return;
                }
            };

            match inner.backend.update_document(Collection::Content, &doc).await {
                Ok(()) => {
                    inner.state.write().unwrap().content_dirty = false;
                    if broadcast {
                        inner.bus.publish(ChangePayload::Content(patch), "admin");
                    }
                }
                Err(e) => {
                    warn!(error = %e, "content settings not persisted, kept locally as unsynced");
                }
            }
        })
    }

    /// Replace the local site settings with the remote copy
    pub async fn reload_site(&self) -> CoreResult<()> {
        let doc = self
            .inner
            .backend
            .get_document(Collection::Settings, SINGLETON_ID)
            .await?;
        let settings = codec::decode_site_settings(&doc);

        {
            let mut state = self.inner.state.write().unwrap();
            state.site = settings;
            state.site_dirty = false;
        }
        self.notify_local();
        Ok(())
    }

    /// Replace the local content settings with the remote copy
    pub async fn reload_content(&self) -> CoreResult<()> {
        let doc = self
            .inner
            .backend
            .get_document(Collection::Content, SINGLETON_ID)
            .await?;
        let content = codec::decode_content_settings(&doc);

        {
            let mut state = self.inner.state.write().unwrap();
            state.content = content;
            state.content_dirty = false;
        }
        self.notify_local();
        Ok(())
    }

    // ==================== Media Operations ====================

    /// Upload a file and register it in the media library
    pub async fn upload_media(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
        description: Option<String>,
        in_slider: bool,
    ) -> CoreResult<MediaItem> {
        let file = self
            .inner
            .backend
            .upload_file(name, bytes, content_type)
            .await?;

        let mut item = MediaItem::new(name, file.url, file.public_id);
        item.description = description;
        item.in_media_slider = in_slider;
        if content_type.starts_with("video/") {
            item.kind = crate::models::MediaKind::Video;
        }

        let merged = {
            let mut state = self.inner.state.write().unwrap();
            state.content.media.images.push(item.clone());
            state.content_dirty = true;
            state.content.clone()
        };
        self.notify_local();

        self.persist_content(&merged).await?;
        Ok(item)
    }

    /// Edit a media item's name, description or slider flag
    pub async fn edit_media(&self, id: &str, edit: &MediaEdit) -> CoreResult<()> {
        let merged = {
            let mut state = self.inner.state.write().unwrap();
            let item = state
                .content
                .media
                .images
                .iter_mut()
                .find(|item| item.id == id)
                .ok_or_else(|| CoreError::MediaNotFound(id.to_string()))?;
            edit.apply(item);
            state.content_dirty = true;
            state.content.clone()
        };
        self.notify_local();

        self.persist_content(&merged).await
    }

    /// Delete a media item: storage object first, then the document entry
    ///
    /// A failure after the storage leg leaves the remote document still
    /// listing the item while the file is gone; the local copy has
    /// already dropped it and is marked dirty. There is no compensating
    /// cleanup.
    pub async fn delete_media(&self, id: &str) -> CoreResult<()> {
        let public_id = {
            let state = self.inner.state.read().unwrap();
            state
                .content
                .media
                .images
                .iter()
                .find(|item| item.id == id)
                .map(|item| item.public_id.clone())
                .ok_or_else(|| CoreError::MediaNotFound(id.to_string()))?
        };

        self.inner.backend.delete_file(&public_id).await?;

        let merged = {
            let mut state = self.inner.state.write().unwrap();
            state.content.media.images.retain(|item| item.id != id);
            state.content_dirty = true;
            state.content.clone()
        };
        self.notify_local();

        self.persist_content(&merged).await
    }

    /// Persist a merged content document, clear the dirty flag and
    /// announce the media change on success
    async fn persist_content(&self, merged: &ContentSettings) -> CoreResult<()> {
        let doc = codec::encode_content_settings(merged)?;
        match self
            .inner
            .backend
            .update_document(Collection::Content, &doc)
            .await
        {
            Ok(()) => {
                self.inner.state.write().unwrap().content_dirty = false;
                self.inner.bus.publish(
                    ChangePayload::Content(ContentSettingsPatch {
                        media: Some(MediaSection {
                            images: merged.media.images.clone(),
                        }),
                        ..ContentSettingsPatch::default()
                    }),
                    "admin",
                );
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "content settings not persisted, kept locally as unsynced");
                Err(e.into())
            }
        }
    }

    /// Bump the revision and rewrite the snapshot
    fn notify_local(&self) {
        self.inner.revision.send_modify(|r| *r += 1);

        let snapshot = {
            let state = self.inner.state.read().unwrap();
            Snapshot {
                site: state.site.clone(),
                content: state.content.clone(),
            }
        };
        if let Err(e) = self.inner.snapshot.save(&snapshot) {
            warn!(error = %e, "snapshot not written");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HeroSection;
    use crate::remote::memory::MemoryBackend;
    use tempfile::TempDir;

    /// Provisioned and seeded backend plus a store on top of it
    async fn fixture(temp_dir: &TempDir) -> (Arc<MemoryBackend>, SettingsStore) {
        let backend = Arc::new(MemoryBackend::provisioned());
        backend
            .create_document(
                Collection::Settings,
                &codec::encode_site_settings(&SiteSettings::default()).unwrap(),
            )
            .await
            .unwrap();
        backend
            .create_document(
                Collection::Content,
                &codec::encode_content_settings(&ContentSettings::default()).unwrap(),
            )
            .await
            .unwrap();

        let store = SettingsStore::open(
            Arc::clone(&backend) as Arc<dyn RemoteBackend>,
            temp_dir.path().join("snapshot.json"),
            ChangeBus::new(),
        );
        (backend, store)
    }

    fn site_name_patch(name: &str) -> SiteSettingsPatch {
        SiteSettingsPatch {
            site_name: Some(name.to_string()),
            ..SiteSettingsPatch::default()
        }
    }

    #[tokio::test]
    async fn test_update_is_optimistic() {
        let temp_dir = TempDir::new().unwrap();
        let (_backend, store) = fixture(&temp_dir).await;

        let handle = store.update_site(site_name_patch("GreenLoop"), false);
        // Visible before the remote persist completes
        assert_eq!(store.site().site_name, "GreenLoop");

        handle.await.unwrap();
        assert!(store.sync_health().is_clean());
    }

    #[tokio::test]
    async fn test_disjoint_patches_merge_in_both_orders() {
        for flipped in [false, true] {
            let temp_dir = TempDir::new().unwrap();
            let (_backend, store) = fixture(&temp_dir).await;

            let p1 = site_name_patch("GreenLoop");
            let p2 = SiteSettingsPatch {
                footer_text: Some("New footer".to_string()),
                ..SiteSettingsPatch::default()
            };

            let (first, second) = if flipped { (&p2, &p1) } else { (&p1, &p2) };
            store.update_site(first.clone(), false).await.unwrap();
            store.update_site(second.clone(), false).await.unwrap();

            let mut expected = SiteSettings::default();
            p1.apply(&mut expected);
            p2.apply(&mut expected);
            assert_eq!(store.site(), expected);
        }
    }

    #[tokio::test]
    async fn test_persist_reaches_remote() {
        let temp_dir = TempDir::new().unwrap();
        let (backend, store) = fixture(&temp_dir).await;

        store
            .update_content(
                ContentSettingsPatch {
                    hero: Some(HeroSection {
                        heading: "Zero waste".to_string(),
                        ..HeroSection::default()
                    }),
                    ..ContentSettingsPatch::default()
                },
                false,
            )
            .await
            .unwrap();

        let doc = backend
            .get_document(Collection::Content, SINGLETON_ID)
            .await
            .unwrap();
        let remote = codec::decode_content_settings(&doc);
        assert_eq!(remote.hero.heading, "Zero waste");
    }

    #[tokio::test]
    async fn test_failed_persist_keeps_local_state_and_marks_dirty() {
        let temp_dir = TempDir::new().unwrap();
        let (backend, store) = fixture(&temp_dir).await;
        backend.set_fail_updates(true);

        store.update_site(site_name_patch("Unsynced"), false).await.unwrap();

        // Optimistic-write-wins: local keeps the value, dirty flag set
        assert_eq!(store.site().site_name, "Unsynced");
        assert!(store.sync_health().site_dirty);

        // Remote still has the old value
        let doc = backend
            .get_document(Collection::Settings, SINGLETON_ID)
            .await
            .unwrap();
        assert_eq!(
            codec::decode_site_settings(&doc).site_name,
            SiteSettings::default().site_name
        );

        // A later successful persist clears the flag
        backend.set_fail_updates(false);
        store.update_site(site_name_patch("Synced"), false).await.unwrap();
        assert!(store.sync_health().is_clean());
    }

    #[tokio::test]
    async fn test_successful_persist_broadcasts() {
        let temp_dir = TempDir::new().unwrap();
        let (_backend, store) = fixture(&temp_dir).await;

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let _sub = store.bus().subscribe(move |event| {
            seen_clone.lock().unwrap().push(event.clone());
        });

        store.update_site(site_name_patch("Announced"), true).await.unwrap();

        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, "admin");
        match &events[0].payload {
            ChangePayload::Site(patch) => {
                assert_eq!(patch.site_name.as_deref(), Some("Announced"));
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_broadcast_false_stays_silent() {
        let temp_dir = TempDir::new().unwrap();
        let (_backend, store) = fixture(&temp_dir).await;

        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let _sub = store.bus().subscribe(move |_| {
            count_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        store.update_site(site_name_patch("Quiet"), false).await.unwrap();
        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reload_replaces_local_copy() {
        let temp_dir = TempDir::new().unwrap();
        let (backend, store) = fixture(&temp_dir).await;

        // A remote writer changes the document behind our back
        let mut remote_settings = SiteSettings::default();
        remote_settings.site_name = "Renamed remotely".to_string();
        backend.put_document_external(
            Collection::Settings,
            codec::encode_site_settings(&remote_settings).unwrap(),
        );

        store.reload_site().await.unwrap();
        assert_eq!(store.site().site_name, "Renamed remotely");
    }

    #[tokio::test]
    async fn test_snapshot_rehydration_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let snapshot_path = temp_dir.path().join("snapshot.json");

        {
            let (_backend, store) = fixture(&temp_dir).await;
            store.update_site(site_name_patch("Persisted"), false).await.unwrap();
        }

        // Fresh store over a fresh backend still sees the local copy
        let backend = Arc::new(MemoryBackend::provisioned());
        let store = SettingsStore::open(backend, snapshot_path, ChangeBus::new());
        assert_eq!(store.site().site_name, "Persisted");
    }

    #[tokio::test]
    async fn test_revision_bumps_on_change() {
        let temp_dir = TempDir::new().unwrap();
        let (_backend, store) = fixture(&temp_dir).await;

        let rx = store.watch();
        let before = *rx.borrow();
        store.update_site(site_name_patch("Bumped"), false).await.unwrap();
        assert!(*rx.borrow() > before);
    }

    // ==================== Media ====================

    #[tokio::test]
    async fn test_media_upload_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let (backend, store) = fixture(&temp_dir).await;

        let item = store
            .upload_media("bins.jpg", vec![0xFF, 0xD8], "image/jpeg", None, true)
            .await
            .unwrap();
        assert!(!item.id.is_empty());
        assert!(!item.public_id.is_empty());

        // The remote content document lists the upload
        let doc = backend
            .get_document(Collection::Content, SINGLETON_ID)
            .await
            .unwrap();
        let remote = codec::decode_content_settings(&doc);
        let found = remote
            .media
            .images
            .iter()
            .find(|i| i.id == item.id)
            .expect("uploaded item in remote document");
        assert_eq!(found.name, "bins.jpg");
        assert_eq!(found.url, item.url);
        assert_eq!(found.kind, crate::models::MediaKind::Image);
        assert!(found.in_media_slider);
    }

    #[tokio::test]
    async fn test_media_edit() {
        let temp_dir = TempDir::new().unwrap();
        let (_backend, store) = fixture(&temp_dir).await;

        let item = store
            .upload_media("bins.jpg", vec![1], "image/jpeg", None, false)
            .await
            .unwrap();

        store
            .edit_media(
                &item.id,
                &MediaEdit {
                    description: Some("Sorted bins at the depot".to_string()),
                    in_media_slider: Some(true),
                    ..MediaEdit::default()
                },
            )
            .await
            .unwrap();

        let content = store.content();
        let edited = content.media.images.iter().find(|i| i.id == item.id).unwrap();
        assert_eq!(edited.description.as_deref(), Some("Sorted bins at the depot"));
        assert!(edited.in_media_slider);
    }

    #[tokio::test]
    async fn test_media_delete_removes_both_legs() {
        let temp_dir = TempDir::new().unwrap();
        let (backend, store) = fixture(&temp_dir).await;

        let item = store
            .upload_media("bins.jpg", vec![1], "image/jpeg", None, false)
            .await
            .unwrap();
        assert!(backend.file_exists(&item.public_id));

        store.delete_media(&item.id).await.unwrap();

        // (a) storage object gone
        assert!(!backend.file_exists(&item.public_id));
        // (b) document entry gone, locally and remotely
        assert!(store.content().media.images.is_empty());
        let doc = backend
            .get_document(Collection::Content, SINGLETON_ID)
            .await
            .unwrap();
        assert!(codec::decode_content_settings(&doc).media.images.is_empty());
    }

    #[tokio::test]
    async fn test_media_delete_failure_after_storage_leg() {
        let temp_dir = TempDir::new().unwrap();
        let (backend, store) = fixture(&temp_dir).await;

        let item = store
            .upload_media("bins.jpg", vec![1], "image/jpeg", None, false)
            .await
            .unwrap();

        // Storage leg succeeds, document persist fails
        backend.set_fail_updates(true);
        let err = store.delete_media(&item.id).await.unwrap_err();
        assert!(matches!(err, CoreError::Remote(_)));

        // Documented inconsistency: the file is gone while the remote
        // document still lists it; the local copy dropped it and is dirty
        assert!(!backend.file_exists(&item.public_id));
        let doc = backend
            .get_document(Collection::Content, SINGLETON_ID)
            .await
            .unwrap();
        assert_eq!(codec::decode_content_settings(&doc).media.images.len(), 1);
        assert!(store.content().media.images.is_empty());
        assert!(store.sync_health().content_dirty);
    }

    #[tokio::test]
    async fn test_delete_unknown_media_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let (_backend, store) = fixture(&temp_dir).await;

        let err = store.delete_media("missing").await.unwrap_err();
        assert!(matches!(err, CoreError::MediaNotFound(_)));
    }
}
