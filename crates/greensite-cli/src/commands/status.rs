//! Status command handler

use anyhow::Result;

use greensite_core::remote::{RemoteDocument, RemoteError};
use greensite_core::{Collection, RemoteBackend, SINGLETON_ID};

use crate::output::{Output, OutputFormat};

/// Show configuration, remote reachability and sync state
pub async fn run(output: &Output) -> Result<()> {
    let app = super::open()?;
    let config = &app.config;

    let settings_doc = app
        .backend
        .get_document(Collection::Settings, SINGLETON_ID)
        .await;
    let content_doc = app
        .backend
        .get_document(Collection::Content, SINGLETON_ID)
        .await;

    let health = app.store.sync_health();
    let snapshot_exists = config.snapshot_path().exists();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "endpoint": config.endpoint,
                    "project_id": config.project_id,
                    "database_id": config.database_id,
                    "bucket_id": config.bucket_id,
                    "api_key_configured": config.api_key.is_some(),
                    "documents": {
                        "settings": presence(&settings_doc),
                        "content": presence(&content_doc),
                    },
                    "snapshot_exists": snapshot_exists,
                    "dirty": {
                        "site": health.site_dirty,
                        "content": health.content_dirty,
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", if health.is_clean() { "clean" } else { "dirty" });
        }
        OutputFormat::Human => {
            println!("Greensite Status");
            println!("================");
            println!();
            println!("Remote:");
            println!("  Endpoint: {}", config.endpoint);
            println!("  Project:  {}", config.project_id);
            println!("  Database: {}", config.database_id);
            println!("  Bucket:   {}", config.bucket_id);
            println!(
                "  API key:  {}",
                if config.api_key.is_some() {
                    "configured"
                } else {
                    "(not set)"
                }
            );
            println!();
            println!("Documents:");
            println!("  settings: {}", presence(&settings_doc));
            println!("  content:  {}", presence(&content_doc));
            println!();
            println!("Local:");
            println!("  Data dir: {}", config.data_dir.display());
            println!(
                "  Snapshot: {}",
                if snapshot_exists { "present" } else { "missing" }
            );
            println!(
                "  Sync:     {}",
                if health.is_clean() {
                    "clean".to_string()
                } else {
                    format!(
                        "dirty (site: {}, content: {})",
                        health.site_dirty, health.content_dirty
                    )
                }
            );
        }
    }

    Ok(())
}

fn presence(result: &Result<RemoteDocument, RemoteError>) -> &'static str {
    match result {
        Ok(_) => "present",
        Err(RemoteError::NotFound { .. }) => "missing",
        Err(RemoteError::Unauthorized(_)) => "unauthorized",
        Err(_) => "unreachable",
    }
}
