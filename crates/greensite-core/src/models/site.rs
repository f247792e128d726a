//! Site settings document
//!
//! Branding, contact details, social links and the admin user list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a site user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
    User,
}

/// Whether a user account is active
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
}

/// A site user as shown in the admin user manager
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Unique identifier
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// Create a new active user
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            email: email.into(),
            role,
            status: UserStatus::Active,
            created_at: Utc::now(),
            last_login: None,
        }
    }
}

/// Social platform links shown in the site footer
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SocialLinks {
    #[serde(default)]
    pub facebook: String,
    #[serde(default)]
    pub twitter: String,
    #[serde(default)]
    pub instagram: String,
    #[serde(default)]
    pub linkedin: String,
}

/// The site settings singleton document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteSettings {
    pub site_name: String,
    pub site_description: String,
    pub logo_url: String,
    pub primary_color: String,
    pub footer_text: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub contact_address: String,
    #[serde(default)]
    pub social_links: SocialLinks,
    #[serde(default)]
    pub users: Vec<UserRecord>,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            site_name: "GreenLoop Recycling".to_string(),
            site_description: "Community recycling services and drop-off points".to_string(),
            logo_url: "/images/logo.svg".to_string(),
            primary_color: "#2e7d32".to_string(),
            footer_text: "© GreenLoop Recycling. Together for a cleaner tomorrow.".to_string(),
            contact_email: "hello@greenloop.example".to_string(),
            contact_phone: "+1 555 010 4200".to_string(),
            contact_address: "12 Circular Way, Marston".to_string(),
            social_links: SocialLinks::default(),
            users: Vec::new(),
        }
    }
}

/// Partial update for [`SiteSettings`]
///
/// Each field is a whole top-level key; `apply` overwrites set keys
/// wholesale (shallow merge). Callers that want to change a single nested
/// value merge the nested object themselves first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteSettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_links: Option<SocialLinks>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<UserRecord>>,
}

impl SiteSettingsPatch {
    /// Shallow-merge this patch into `settings`
    pub fn apply(&self, settings: &mut SiteSettings) {
        if let Some(v) = &self.site_name {
            settings.site_name = v.clone();
        }
        if let Some(v) = &self.site_description {
            settings.site_description = v.clone();
        }
        if let Some(v) = &self.logo_url {
            settings.logo_url = v.clone();
        }
        if let Some(v) = &self.primary_color {
            settings.primary_color = v.clone();
        }
        if let Some(v) = &self.footer_text {
            settings.footer_text = v.clone();
        }
        if let Some(v) = &self.contact_email {
            settings.contact_email = v.clone();
        }
        if let Some(v) = &self.contact_phone {
            settings.contact_phone = v.clone();
        }
        if let Some(v) = &self.contact_address {
            settings.contact_address = v.clone();
        }
        if let Some(v) = &self.social_links {
            settings.social_links = v.clone();
        }
        if let Some(v) = &self.users {
            settings.users = v.clone();
        }
    }

    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
