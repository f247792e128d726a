//! Remote document codec
//!
//! The remote schema is flat: every attribute is a string. Nested
//! structures (social links, users, every content section) travel as
//! JSON-encoded strings inside those attributes. This module is the
//! serialization boundary: everything above it works with typed structs
//! exclusively.
//!
//! Decoding is tolerant: a missing or unparsable attribute falls back to
//! that field's default (logged), so one bad attribute written by an old
//! deployment cannot take the whole document down.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::{CoreError, CoreResult};
use crate::models::{ContentSettings, SiteSettings, SINGLETON_ID};
use crate::remote::{AttributeSpec, RemoteDocument};

/// Size for scalar string attributes
const SCALAR_SIZE: u32 = 1024;
/// Size for JSON-encoded nested attributes
const JSON_SIZE: u32 = 65535;

/// Encode site settings into a flat remote document
pub fn encode_site_settings(settings: &SiteSettings) -> CoreResult<RemoteDocument> {
    let mut doc = RemoteDocument::new(SINGLETON_ID)
        .with_field("siteName", &settings.site_name)
        .with_field("siteDescription", &settings.site_description)
        .with_field("logoUrl", &settings.logo_url)
        .with_field("primaryColor", &settings.primary_color)
        .with_field("footerText", &settings.footer_text)
        .with_field("contactEmail", &settings.contact_email)
        .with_field("contactPhone", &settings.contact_phone)
        .with_field("contactAddress", &settings.contact_address);

    put_json(&mut doc, "socialLinks", &settings.social_links)?;
    put_json(&mut doc, "users", &settings.users)?;
    Ok(doc)
}

/// Decode site settings from a flat remote document
pub fn decode_site_settings(doc: &RemoteDocument) -> SiteSettings {
    let defaults = SiteSettings::default();
    SiteSettings {
        site_name: scalar(doc, "siteName", defaults.site_name),
        site_description: scalar(doc, "siteDescription", defaults.site_description),
        logo_url: scalar(doc, "logoUrl", defaults.logo_url),
        primary_color: scalar(doc, "primaryColor", defaults.primary_color),
        footer_text: scalar(doc, "footerText", defaults.footer_text),
        contact_email: scalar(doc, "contactEmail", defaults.contact_email),
        contact_phone: scalar(doc, "contactPhone", defaults.contact_phone),
        contact_address: scalar(doc, "contactAddress", defaults.contact_address),
        social_links: json_field(doc, "socialLinks", defaults.social_links),
        users: json_field(doc, "users", defaults.users),
    }
}

/// Encode content settings into a flat remote document
pub fn encode_content_settings(content: &ContentSettings) -> CoreResult<RemoteDocument> {
    let mut doc = RemoteDocument::new(SINGLETON_ID);
    put_json(&mut doc, "hero", &content.hero)?;
    put_json(&mut doc, "mission", &content.mission)?;
    put_json(&mut doc, "achievements", &content.achievements)?;
    put_json(&mut doc, "videos", &content.videos)?;
    put_json(&mut doc, "media", &content.media)?;
    put_json(&mut doc, "pages", &content.pages)?;
    put_json(&mut doc, "blog", &content.blog)?;
    Ok(doc)
}

/// Decode content settings from a flat remote document
pub fn decode_content_settings(doc: &RemoteDocument) -> ContentSettings {
    let defaults = ContentSettings::default();
    ContentSettings {
        hero: json_field(doc, "hero", defaults.hero),
        mission: json_field(doc, "mission", defaults.mission),
        achievements: json_field(doc, "achievements", defaults.achievements),
        videos: json_field(doc, "videos", defaults.videos),
        media: json_field(doc, "media", defaults.media),
        pages: json_field(doc, "pages", defaults.pages),
        blog: json_field(doc, "blog", defaults.blog),
    }
}

/// Attributes of the settings collection
pub fn site_attributes() -> Vec<AttributeSpec> {
    vec![
        AttributeSpec::new("siteName", SCALAR_SIZE),
        AttributeSpec::new("siteDescription", SCALAR_SIZE),
        AttributeSpec::new("logoUrl", SCALAR_SIZE),
        AttributeSpec::new("primaryColor", SCALAR_SIZE),
        AttributeSpec::new("footerText", SCALAR_SIZE),
        AttributeSpec::new("contactEmail", SCALAR_SIZE),
        AttributeSpec::new("contactPhone", SCALAR_SIZE),
        AttributeSpec::new("contactAddress", SCALAR_SIZE),
        AttributeSpec::new("socialLinks", JSON_SIZE),
        AttributeSpec::new("users", JSON_SIZE),
    ]
}

/// Attributes of the content collection
pub fn content_attributes() -> Vec<AttributeSpec> {
    ["hero", "mission", "achievements", "videos", "media", "pages", "blog"]
        .iter()
        .map(|key| AttributeSpec::new(*key, JSON_SIZE))
        .collect()
}

/// Attributes of the media collection
///
/// Provisioned for setup parity with older deployments; the running app
/// reads media through the content document instead.
pub fn media_attributes() -> Vec<AttributeSpec> {
    vec![
        AttributeSpec::new("name", SCALAR_SIZE),
        AttributeSpec::new("url", SCALAR_SIZE),
        AttributeSpec::new("publicId", SCALAR_SIZE),
        AttributeSpec::new("uploadedAt", SCALAR_SIZE),
        AttributeSpec::new("inMediaSlider", SCALAR_SIZE),
        AttributeSpec::new("type", SCALAR_SIZE),
        AttributeSpec::new("description", JSON_SIZE),
    ]
}

fn put_json<T: Serialize>(doc: &mut RemoteDocument, key: &str, value: &T) -> CoreResult<()> {
    let encoded = serde_json::to_string(value).map_err(|e| CoreError::codec(key, e))?;
    doc.fields.insert(key.to_string(), encoded);
    Ok(())
}

fn scalar(doc: &RemoteDocument, key: &str, default: String) -> String {
    match doc.field(key) {
        Some(value) => value.to_string(),
        None => {
            warn!(attribute = key, "missing scalar attribute, using default");
            default
        }
    }
}

fn json_field<T: DeserializeOwned>(doc: &RemoteDocument, key: &str, default: T) -> T {
    let Some(raw) = doc.field(key) else {
        warn!(attribute = key, "missing attribute, using default");
        return default;
    };

    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(attribute = key, error = %e, "unparsable attribute, using default");
            default
        }
    }
}
