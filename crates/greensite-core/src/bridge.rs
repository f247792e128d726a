//! Real-time bridge
//!
//! Connects the remote store's push channel to the local
//! [`SettingsStore`](crate::store::SettingsStore). Notifications are
//! treated as hints only: on every document event the bridge re-fetches
//! the full document through the store's reload path instead of applying
//! the pushed payload (pull-on-notify). The stream is re-opened on
//! failure with a fixed delay, up to a retry budget; exhausting it lands
//! in a terminal `Degraded` state that callers can observe instead of a
//! silently dead channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::remote::{Collection, RemoteBackend, RemoteEvent};
use crate::store::SettingsStore;

/// Connection state of the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeStatus {
    /// First subscription attempt in progress
    Connecting,
    /// Stream open, events flowing
    Connected,
    /// Stream lost, waiting to re-subscribe
    Retrying { attempt: u32 },
    /// Retry budget exhausted; the bridge has given up
    Degraded,
}

/// Handle to a running bridge task
pub struct RealtimeBridge {
    status: watch::Receiver<BridgeStatus>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RealtimeBridge {
    /// Subscribe to `collections` and keep the store in sync
    ///
    /// Must be called after the store's initial load: attaching earlier
    /// would make the bridge react to the seeding writes themselves.
    pub fn spawn(
        store: SettingsStore,
        backend: Arc<dyn RemoteBackend>,
        collections: Vec<Collection>,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Self {
        let (status_tx, status_rx) = watch::channel(BridgeStatus::Connecting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run(
            store,
            backend,
            collections,
            max_retries,
            retry_delay,
            status_tx,
            shutdown_rx,
        ));

        Self {
            status: status_rx,
            shutdown: shutdown_tx,
            task,
        }
    }

    /// Watch the connection state
    pub fn status(&self) -> watch::Receiver<BridgeStatus> {
        self.status.clone()
    }

    pub fn is_connected(&self) -> bool {
        *self.status.borrow() == BridgeStatus::Connected
    }

    /// Signal shutdown and wait for the bridge task to finish
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

async fn run(
    store: SettingsStore,
    backend: Arc<dyn RemoteBackend>,
    collections: Vec<Collection>,
    max_retries: u32,
    retry_delay: Duration,
    status: watch::Sender<BridgeStatus>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut failures = 0u32;

    loop {
        if *shutdown.borrow() {
            return;
        }

        match backend.subscribe(&collections).await {
            Ok(mut events) => {
                info!(?collections, "realtime stream open");
                let _ = status.send(BridgeStatus::Connected);
                failures = 0;

                loop {
                    tokio::select! {
                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                return;
                            }
                        }
                        event = events.recv() => match event {
                            Some(event) => handle_event(&store, &event).await,
                            None => {
                                warn!("realtime stream ended");
                                break;
                            }
                        }
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "realtime subscription failed");
            }
        }

        failures += 1;
        if failures > max_retries {
            warn!(max_retries, "realtime retry budget exhausted, degraded");
            let _ = status.send(BridgeStatus::Degraded);
            return;
        }

        let _ = status.send(BridgeStatus::Retrying { attempt: failures });
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
            _ = tokio::time::sleep(retry_delay) => {}
        }
    }
}

/// Re-fetch the document named by the event; the pushed payload is
/// never applied directly
async fn handle_event(store: &SettingsStore, event: &RemoteEvent) {
    debug!(
        collection = %event.collection,
        kind = ?event.kind,
        document_id = %event.document_id,
        "remote change"
    );

    let result = match event.collection {
        Collection::Settings => store.reload_site().await,
        // Media documents feed the content sections, so both reload content
        Collection::Content | Collection::Media => store.reload_content().await,
    };

    if let Err(e) = result {
        warn!(collection = %event.collection, error = %e, "reload after remote change failed");
    }
}
