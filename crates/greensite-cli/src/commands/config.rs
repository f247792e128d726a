//! Config command handlers

use anyhow::{bail, Context, Result};

use greensite_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(output: &Output) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "endpoint": config.endpoint,
                    "project_id": config.project_id,
                    "api_key_configured": config.api_key.is_some(),
                    "database_id": config.database_id,
                    "bucket_id": config.bucket_id,
                    "data_dir": config.data_dir,
                    "init_max_retries": config.init_max_retries,
                    "bridge_max_retries": config.bridge_max_retries,
                    "retry_delay_ms": config.retry_delay_ms,
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.endpoint);
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  endpoint:           {}", config.endpoint);
            println!("  project_id:         {}", config.project_id);
            println!(
                "  api_key:            {}",
                if config.api_key.is_some() {
                    "(configured)"
                } else {
                    "(not set)"
                }
            );
            println!("  database_id:        {}", config.database_id);
            println!("  bucket_id:          {}", config.bucket_id);
            println!("  data_dir:           {}", config.data_dir.display());
            println!("  init_max_retries:   {}", config.init_max_retries);
            println!("  bridge_max_retries: {}", config.bridge_max_retries);
            println!("  retry_delay_ms:     {}", config.retry_delay_ms);
            println!();
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String, output: &Output) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;

    match key.as_str() {
        "endpoint" => config.endpoint = value.clone(),
        "project_id" => config.project_id = value.clone(),
        "api_key" => {
            config.api_key = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.clone())
            };
        }
        "database_id" => config.database_id = value.clone(),
        "bucket_id" => config.bucket_id = value.clone(),
        "data_dir" => config.data_dir = value.clone().into(),
        "init_max_retries" => {
            config.init_max_retries = value
                .parse()
                .context("Invalid value for init_max_retries. Use a whole number.")?;
        }
        "bridge_max_retries" => {
            config.bridge_max_retries = value
                .parse()
                .context("Invalid value for bridge_max_retries. Use a whole number.")?;
        }
        "retry_delay_ms" => {
            config.retry_delay_ms = value
                .parse()
                .context("Invalid value for retry_delay_ms. Use a whole number.")?;
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: endpoint, project_id, api_key, database_id, bucket_id, \
                 data_dir, init_max_retries, bridge_max_retries, retry_delay_ms",
                key
            );
        }
    }

    config.save().context("Failed to save configuration")?;

    // Don't echo secrets back
    if key == "api_key" {
        output.success("Set api_key");
    } else {
        output.success(&format!("Set {} = {}", key, value));
    }

    Ok(())
}
