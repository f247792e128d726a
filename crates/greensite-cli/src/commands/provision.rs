//! Provision command handler

use anyhow::{Context, Result};

use greensite_core::Initializer;

use crate::output::Output;

/// Create missing collections, attributes and the media bucket
pub async fn run(output: &Output) -> Result<()> {
    let app = super::open()?;
    app.config.require_api_key()?;

    let init = Initializer::new(
        app.backend,
        app.config.bucket_id.clone(),
        app.config.init_max_retries,
        app.config.retry_delay(),
    );
    init.provision()
        .await
        .context("Provisioning failed")?;

    output.success("Collections and media bucket ready");
    Ok(())
}
