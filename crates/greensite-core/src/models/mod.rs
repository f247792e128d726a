//! Data models for greensite
//!
//! Typed versions of the two singleton documents the marketing site is
//! rendered from: [`SiteSettings`] and [`ContentSettings`]. Both exist
//! exactly once per deployment under the fixed id [`SINGLETON_ID`] and are
//! only ever updated after first seeding, never deleted.
//!
//! Field names serialize as camelCase to stay compatible with documents
//! written by earlier deployments of the site.

mod content;
mod site;

pub use content::{
    AchievementsSection, BlogPost, ContentSettings, ContentSettingsPatch, HeroSection, MediaEdit,
    MediaItem, MediaKind, MediaSection, MissionSection, Page, PostStatus, Stat, VideoEntry,
    VideoSection,
};
pub use site::{Role, SiteSettings, SiteSettingsPatch, SocialLinks, UserRecord, UserStatus};

/// Fixed id of both singleton documents
pub const SINGLETON_ID: &str = "main";
