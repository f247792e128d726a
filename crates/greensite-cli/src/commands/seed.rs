//! Seed command handler

use anyhow::{Context, Result};

use greensite_core::Initializer;

use crate::output::{Output, OutputFormat};

/// Create missing singleton documents with default content
///
/// Safe to run repeatedly: existing documents are never overwritten.
pub async fn run(output: &Output) -> Result<()> {
    let app = super::open()?;
    app.config.require_api_key()?;

    let init = Initializer::new(
        app.backend,
        app.config.bucket_id.clone(),
        app.config.init_max_retries,
        app.config.retry_delay(),
    );
    let created = init.seed().await.context("Seeding failed")?;

    match output.format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "created": created }));
        }
        _ => {
            if created == 0 {
                output.message("All documents already present, nothing to do.");
            } else {
                output.success(&format!("Created {} document(s)", created));
            }
        }
    }
    Ok(())
}
