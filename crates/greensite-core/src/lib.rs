//! Greensite Core Library
//!
//! This crate provides the content synchronization engine behind the
//! greensite marketing site: two singleton documents (site settings and
//! page content) held in a hosted document store, mirrored into a local
//! store for instant reads, and kept fresh through a realtime channel.
//!
//! # Architecture
//!
//! - **Remote store is the source of truth**: every local change is
//!   persisted back as a full document write; realtime notifications
//!   trigger full re-fetches (pull-on-notify).
//! - **Optimistic local state**: updates apply locally first and persist
//!   in the background; a failed persist marks the document dirty rather
//!   than rolling back.
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let backend: Arc<dyn RemoteBackend> = Arc::new(HttpBackend::new(&config)?);
//! let store = SettingsStore::open(backend.clone(), config.snapshot_path(), ChangeBus::new());
//!
//! let init = Initializer::new(
//!     backend.clone(), config.bucket_id.clone(),
//!     config.init_max_retries, config.retry_delay(),
//! );
//! init.run(&store).await?;
//!
//! let bridge = RealtimeBridge::spawn(
//!     store.clone(), backend, Collection::ALL.to_vec(),
//!     config.bridge_max_retries, config.retry_delay(),
//! );
//! ```
//!
//! # Modules
//!
//! - `store`: local settings store (main entry point)
//! - `models`: site and content data structures, patch types
//! - `codec`: converts typed structs to and from flat-string remote documents
//! - `remote`: backend trait, HTTP and in-memory implementations
//! - `bus`: in-process change broadcast
//! - `bridge`: realtime channel, pull-on-notify
//! - `init`: provisioning and seeding sequencer
//! - `config`: application configuration

pub mod bridge;
pub mod bus;
pub mod codec;
pub mod config;
pub mod error;
pub mod init;
pub mod models;
pub mod remote;
pub mod snapshot;
pub mod store;

pub use bridge::{BridgeStatus, RealtimeBridge};
pub use bus::{ChangeBus, ChangeEvent, ChangePayload, Subscription};
pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use init::{InitPhase, Initializer};
pub use models::{ContentSettings, MediaItem, SiteSettings, SINGLETON_ID};
pub use remote::{Collection, RemoteBackend, RemoteError};
pub use store::{SettingsStore, SyncHealth};
