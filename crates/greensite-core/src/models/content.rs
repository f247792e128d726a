//! Content settings document
//!
//! Everything the public pages render: hero, mission, achievements,
//! videos, the media library, static pages and blog posts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hero banner on the landing page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HeroSection {
    pub heading: String,
    pub subheading: String,
    pub cta_text: String,
    pub cta_link: String,
}

impl Default for HeroSection {
    fn default() -> Self {
        Self {
            heading: "Recycle more. Waste less.".to_string(),
            subheading: "Curbside pickup and drop-off points across the city".to_string(),
            cta_text: "Find a drop-off point".to_string(),
            cta_link: "/locations".to_string(),
        }
    }
}

/// Mission statement with bullet points
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MissionSection {
    pub heading: String,
    pub description: String,
    #[serde(default)]
    pub points: Vec<String>,
}

impl Default for MissionSection {
    fn default() -> Self {
        Self {
            heading: "Our mission".to_string(),
            description: "We keep recyclable material out of landfills.".to_string(),
            points: vec![
                "Door-to-door collection".to_string(),
                "Transparent material tracking".to_string(),
                "Community education".to_string(),
            ],
        }
    }
}

/// A single achievement counter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stat {
    pub value: String,
    pub label: String,
}

/// Achievement counters section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AchievementsSection {
    pub heading: String,
    #[serde(default)]
    pub stats: Vec<Stat>,
}

impl Default for AchievementsSection {
    fn default() -> Self {
        Self {
            heading: "What we've achieved".to_string(),
            stats: vec![
                Stat {
                    value: "12,000t".to_string(),
                    label: "Material recycled".to_string(),
                },
                Stat {
                    value: "40+".to_string(),
                    label: "Drop-off points".to_string(),
                },
            ],
        }
    }
}

/// An embedded video
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoEntry {
    pub title: String,
    pub url: String,
    pub thumbnail: String,
}

/// Video gallery section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoSection {
    pub heading: String,
    #[serde(default)]
    pub videos: Vec<VideoEntry>,
}

impl Default for VideoSection {
    fn default() -> Self {
        Self {
            heading: "See how it works".to_string(),
            videos: Vec::new(),
        }
    }
}

/// Kind of a media library entry
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
}

/// An uploaded media file
///
/// `public_id` is the storage object key and is required to delete the
/// underlying file. `in_media_slider` opts the item into the public
/// rotating slider; absent means excluded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    pub name: String,
    pub url: String,
    pub public_id: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub in_media_slider: bool,
    #[serde(rename = "type", default)]
    pub kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MediaItem {
    /// Create an item for a freshly uploaded file
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        public_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            url: url.into(),
            public_id: public_id.into(),
            uploaded_at: Utc::now(),
            in_media_slider: false,
            kind: MediaKind::Image,
            description: None,
        }
    }
}

/// Fields of a [`MediaItem`] editable from the admin media manager
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaEdit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_media_slider: Option<bool>,
}

impl MediaEdit {
    /// Apply the edit to an item
    pub fn apply(&self, item: &mut MediaItem) {
        if let Some(v) = &self.name {
            item.name = v.clone();
        }
        if let Some(v) = &self.description {
            item.description = Some(v.clone());
        }
        if let Some(v) = self.in_media_slider {
            item.in_media_slider = v;
        }
    }
}

/// Media library section
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaSection {
    #[serde(default)]
    pub images: Vec<MediaItem>,
}

/// A static page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    pub title: String,
    pub path: String,
    pub content: String,
    pub last_updated: DateTime<Utc>,
}

/// Publication state of a blog post
///
/// Legacy documents carry mixed casing ("published"/"Published"); readers
/// accept both spellings, writers always emit the capitalized form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PostStatus {
    #[serde(rename = "Published", alias = "published")]
    Published,
    #[serde(rename = "Draft", alias = "draft")]
    Draft,
}

/// A blog post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub status: PostStatus,
    pub author: String,
    pub date: DateTime<Utc>,
}

/// The content settings singleton document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentSettings {
    #[serde(default)]
    pub hero: HeroSection,
    #[serde(default)]
    pub mission: MissionSection,
    #[serde(default)]
    pub achievements: AchievementsSection,
    #[serde(default)]
    pub videos: VideoSection,
    #[serde(default)]
    pub media: MediaSection,
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub blog: Vec<BlogPost>,
}

impl ContentSettings {
    /// Media items opted into the public rotating slider, in source order
    pub fn slider_images(&self) -> Vec<&MediaItem> {
        self.media
            .images
            .iter()
            .filter(|item| item.in_media_slider)
            .collect()
    }

    /// Blog posts visible on the public site
    pub fn published_posts(&self) -> Vec<&BlogPost> {
        self.blog
            .iter()
            .filter(|post| post.status == PostStatus::Published)
            .collect()
    }
}

/// Partial update for [`ContentSettings`]
///
/// Shallow merge at the top level, same contract as
/// [`super::SiteSettingsPatch`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentSettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero: Option<HeroSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mission: Option<MissionSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub achievements: Option<AchievementsSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub videos: Option<VideoSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<Page>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blog: Option<Vec<BlogPost>>,
}

impl ContentSettingsPatch {
    /// Shallow-merge this patch into `content`
    pub fn apply(&self, content: &mut ContentSettings) {
        if let Some(v) = &self.hero {
            content.hero = v.clone();
        }
        if let Some(v) = &self.mission {
            content.mission = v.clone();
        }
        if let Some(v) = &self.achievements {
            content.achievements = v.clone();
        }
        if let Some(v) = &self.videos {
            content.videos = v.clone();
        }
        if let Some(v) = &self.media {
            content.media = v.clone();
        }
        if let Some(v) = &self.pages {
            content.pages = v.clone();
        }
        if let Some(v) = &self.blog {
            content.blog = v.clone();
        }
    }

    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let content = ContentSettings::default();
        assert_eq!(content.hero.heading, "Recycle more. Waste less.");
        assert_eq!(content.mission.points.len(), 3);
        assert!(content.media.images.is_empty());
        assert!(content.blog.is_empty());
    }

    #[test]
    fn test_media_item_new() {
        let item = MediaItem::new("bins.jpg", "https://cdn.example/bins.jpg", "file-123");
        assert!(!item.id.is_empty());
        assert_eq!(item.public_id, "file-123");
        assert!(!item.in_media_slider);
        assert_eq!(item.kind, MediaKind::Image);
    }

    #[test]
    fn test_media_edit_apply() {
        let mut item = MediaItem::new("bins.jpg", "https://cdn.example/bins.jpg", "file-123");
        let edit = MediaEdit {
            name: Some("sorted-bins.jpg".to_string()),
            in_media_slider: Some(true),
            ..MediaEdit::default()
        };
        edit.apply(&mut item);

        assert_eq!(item.name, "sorted-bins.jpg");
        assert!(item.in_media_slider);
        // Unset fields untouched
        assert!(item.description.is_none());
    }

    #[test]
    fn test_slider_filter_preserves_order() {
        let mut content = ContentSettings::default();
        for (i, flagged) in [true, false, true, true, false].iter().enumerate() {
            let mut item = MediaItem::new(
                format!("img-{}.jpg", i),
                format!("https://cdn.example/img-{}.jpg", i),
                format!("file-{}", i),
            );
            item.in_media_slider = *flagged;
            content.media.images.push(item);
        }

        let slider = content.slider_images();
        assert_eq!(slider.len(), 3);
        let names: Vec<_> = slider.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["img-0.jpg", "img-2.jpg", "img-3.jpg"]);
    }

    #[test]
    fn test_slider_flag_defaults_to_excluded() {
        // An item serialized without the flag is not in the slider
        let json = r#"{
            "id": "a", "name": "old.jpg", "url": "https://cdn.example/old.jpg",
            "publicId": "file-a", "uploadedAt": "2024-03-01T00:00:00Z"
        }"#;
        let item: MediaItem = serde_json::from_str(json).unwrap();
        assert!(!item.in_media_slider);
        assert_eq!(item.kind, MediaKind::Image);
    }

    #[test]
    fn test_post_status_accepts_legacy_casing() {
        let lower: PostStatus = serde_json::from_str("\"published\"").unwrap();
        let upper: PostStatus = serde_json::from_str("\"Published\"").unwrap();
        assert_eq!(lower, PostStatus::Published);
        assert_eq!(upper, PostStatus::Published);

        let draft: PostStatus = serde_json::from_str("\"draft\"").unwrap();
        assert_eq!(draft, PostStatus::Draft);

        // Writers always emit the capitalized form
        assert_eq!(
            serde_json::to_string(&PostStatus::Published).unwrap(),
            "\"Published\""
        );
    }

    #[test]
    fn test_published_posts_filter() {
        let mut content = ContentSettings::default();
        let base = BlogPost {
            id: "1".to_string(),
            title: "Sorting 101".to_string(),
            excerpt: String::new(),
            content: String::new(),
            status: PostStatus::Published,
            author: "Dana".to_string(),
            date: Utc::now(),
        };
        content.blog.push(base.clone());
        content.blog.push(BlogPost {
            id: "2".to_string(),
            status: PostStatus::Draft,
            ..base
        });

        let published = content.published_posts();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].id, "1");
    }

    #[test]
    fn test_patch_apply_disjoint_keys() {
        let mut content = ContentSettings::default();
        let p1 = ContentSettingsPatch {
            hero: Some(HeroSection {
                heading: "New heading".to_string(),
                ..HeroSection::default()
            }),
            ..ContentSettingsPatch::default()
        };
        let p2 = ContentSettingsPatch {
            mission: Some(MissionSection {
                heading: "New mission".to_string(),
                ..MissionSection::default()
            }),
            ..ContentSettingsPatch::default()
        };

        p1.apply(&mut content);
        p2.apply(&mut content);

        assert_eq!(content.hero.heading, "New heading");
        assert_eq!(content.mission.heading, "New mission");
    }

    #[test]
    fn test_media_kind_renamed_to_type() {
        let item = MediaItem::new("clip.mp4", "https://cdn.example/clip.mp4", "file-9");
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"type\":\"image\""));
        assert!(json.contains("\"publicId\""));
        assert!(json.contains("\"inMediaSlider\""));
    }

    #[test]
    fn test_content_round_trip() {
        let mut content = ContentSettings::default();
        content.media.images.push(MediaItem::new(
            "bins.jpg",
            "https://cdn.example/bins.jpg",
            "file-123",
        ));
        content.pages.push(Page {
            id: "about".to_string(),
            title: "About".to_string(),
            path: "/about".to_string(),
            content: "We recycle.".to_string(),
            last_updated: Utc::now(),
        });

        let json = serde_json::to_string(&content).unwrap();
        let parsed: ContentSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, content);
    }
}
