//! Watch command handler

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use greensite_core::{BridgeStatus, Collection, Initializer, RealtimeBridge};

use crate::output::{Output, OutputFormat};

/// Run the initialization sequence, then follow remote changes until
/// interrupted
pub async fn run(output: &Output) -> Result<()> {
    let app = super::open()?;

    let init = Initializer::new(
        Arc::clone(&app.backend),
        app.config.bucket_id.clone(),
        app.config.init_max_retries,
        app.config.retry_delay(),
    );
    init.run(&app.store).await.context("Initialization failed")?;

    let bridge = RealtimeBridge::spawn(
        app.store.clone(),
        app.backend,
        Collection::ALL.to_vec(),
        app.config.bridge_max_retries,
        app.config.retry_delay(),
    );

    output.message("Watching for remote changes. Press Ctrl-C to stop.");

    let mut revisions = app.store.watch();
    let mut status = bridge.status();
    let mut degraded = false;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                let revision = *revisions.borrow();
                match output.format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::json!({
                            "event": "change",
                            "revision": revision,
                            "site_name": app.store.site().site_name,
                        }));
                    }
                    OutputFormat::Human => {
                        println!("change applied (revision {})", revision);
                    }
                    OutputFormat::Quiet => {}
                }
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *status.borrow();
                match state {
                    BridgeStatus::Connected => output.message("realtime: connected"),
                    BridgeStatus::Retrying { attempt } => {
                        output.message(&format!("realtime: retrying (attempt {})", attempt));
                    }
                    BridgeStatus::Degraded => {
                        degraded = true;
                        break;
                    }
                    BridgeStatus::Connecting => {}
                }
            }
        }
    }

    bridge.stop().await;

    if degraded {
        bail!("Realtime channel degraded: retry budget exhausted");
    }
    Ok(())
}
