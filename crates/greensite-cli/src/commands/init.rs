//! Init command handler

use anyhow::{Context, Result};

use greensite_core::{InitPhase, Initializer};

use crate::output::{Output, OutputFormat};

/// Run the full initialization sequence, reporting phase transitions
pub async fn run(output: &Output) -> Result<()> {
    let app = super::open()?;
    app.config.require_api_key()?;

    let init = Initializer::new(
        app.backend,
        app.config.bucket_id.clone(),
        app.config.init_max_retries,
        app.config.retry_delay(),
    );

    let mut phases = init.phase();
    let printer = if output.format == OutputFormat::Human {
        Some(tokio::spawn(async move {
            while phases.changed().await.is_ok() {
                let phase = *phases.borrow();
                println!("  {}", phase_label(phase));
            }
        }))
    } else {
        None
    };

    let result = init.run(&app.store).await;
    drop(init);
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    result.context("Initialization failed")?;

    if output.is_json() {
        println!("{}", serde_json::json!({ "phase": "loaded" }));
    } else {
        output.success("Initialized and loaded");
    }
    Ok(())
}

fn phase_label(phase: InitPhase) -> &'static str {
    match phase {
        InitPhase::Start => "starting",
        InitPhase::CollectionsChecking => "checking collections",
        InitPhase::CollectionsReady => "collections ready",
        InitPhase::BucketChecking => "checking media bucket",
        InitPhase::BucketReady => "media bucket ready",
        InitPhase::Seeding => "seeding documents",
        InitPhase::Loaded => "loaded",
        InitPhase::Degraded => "degraded",
    }
}
