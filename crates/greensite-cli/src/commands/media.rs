//! Media command handlers

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use greensite_core::models::MediaEdit;

use crate::output::Output;

/// Upload a file to the media library
pub async fn upload(
    path: PathBuf,
    description: Option<String>,
    slider: bool,
    output: &Output,
) -> Result<()> {
    let app = super::open()?;
    // Media operations persist the full content document; start from
    // the remote copy so a stale local one isn't written back
    app.store
        .reload_content()
        .await
        .context("Failed to load content document")?;

    let bytes =
        std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("Invalid file name")?;

    let item = app
        .store
        .upload_media(name, bytes, mime_for(&path), description, slider)
        .await
        .context("Upload failed")?;

    output.print_media_item(&item);
    Ok(())
}

/// List media items
pub async fn list(output: &Output) -> Result<()> {
    let app = super::open()?;
    app.store
        .reload_content()
        .await
        .context("Failed to load content document")?;

    output.print_media_items(&app.store.content().media.images);
    Ok(())
}

/// Edit a media item
pub async fn edit(
    id: String,
    name: Option<String>,
    description: Option<String>,
    slider: Option<bool>,
    output: &Output,
) -> Result<()> {
    let app = super::open()?;
    app.store
        .reload_content()
        .await
        .context("Failed to load content document")?;

    let edit = MediaEdit {
        name,
        description,
        in_media_slider: slider,
    };
    app.store
        .edit_media(&id, &edit)
        .await
        .with_context(|| format!("Failed to edit media item {}", id))?;

    output.success(&format!("Updated {}", id));
    Ok(())
}

/// Delete a media item (storage object and gallery entry)
pub async fn delete(id: String, output: &Output) -> Result<()> {
    let app = super::open()?;
    app.store
        .reload_content()
        .await
        .context("Failed to load content document")?;

    app.store
        .delete_media(&id)
        .await
        .with_context(|| format!("Failed to delete media item {}", id))?;

    output.success(&format!("Deleted {}", id));
    Ok(())
}

/// Content type from the file extension
fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        _ => "application/octet-stream",
    }
}
