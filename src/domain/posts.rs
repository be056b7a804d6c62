//! Canonical post records built from raw database pages.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{
    Date, OffsetDateTime, format_description::FormatItem, format_description::well_known::Rfc3339,
    macros::format_description,
};
use tracing::debug;

use super::{
    blocks::Block,
    properties::{
        PropertyField, RawProperties, checkbox, date_start, describe_schema, file_url,
        multi_select, normalize, page_cover_url, plain_text, unique_id,
    },
    slug::slugify,
};

const PLAIN_DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// A database page as returned by the source, before normalisation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPage {
    pub id: String,
    #[serde(default)]
    pub created_time: String,
    #[serde(default)]
    pub last_edited_time: String,
    #[serde(default)]
    pub cover: Option<Value>,
    #[serde(default)]
    pub properties: Option<RawProperties>,
}

impl RawPage {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    pub main_tags: Vec<String>,
    pub sub_tags: Vec<String>,
    pub tags: Vec<String>,
    pub created_at: String,
    pub last_edited_at: String,
    pub is_published: bool,
    pub is_featured: bool,
    pub cover_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<Block>>,
}

impl Post {
    /// Attach a fetched block tree.
    pub fn with_content(self, content: Vec<Block>) -> Self {
        Self {
            content: Some(content),
            ..self
        }
    }

    /// Case-insensitive membership test over `tags`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|candidate| {
            candidate == tag || candidate.to_lowercase() == tag.to_lowercase()
        })
    }

    /// Parsed creation time; `None` when the stored string is not a date.
    pub fn created_timestamp(&self) -> Option<OffsetDateTime> {
        parse_timestamp(&self.created_at)
    }
}

/// Map a raw page into a [`Post`]. Pages without a property bag map to an
/// untitled, published post.
pub fn to_post(page: &RawPage) -> Post {
    let empty = RawProperties::new();
    let properties = page.properties.as_ref().unwrap_or(&empty);
    let field = move |field| normalize(properties, field);

    let title = plain_text(field(PropertyField::Title));
    let slug = match plain_text(field(PropertyField::Slug)) {
        explicit if !explicit.trim().is_empty() => explicit.trim().to_string(),
        _ => slugify(&title),
    };
    let summary = Some(plain_text(field(PropertyField::Summary))).filter(|text| !text.is_empty());

    let main_tags = multi_select(field(PropertyField::MainTags));
    let sub_tags = multi_select(field(PropertyField::SubTags));
    let tags = main_tags.iter().chain(sub_tags.iter()).cloned().collect();

    let created_at = property_timestamp(field(PropertyField::CreatedAt))
        .unwrap_or_else(|| page.created_time.clone());
    let last_edited_at = property_timestamp(field(PropertyField::UpdatedAt))
        .unwrap_or_else(|| page.last_edited_time.clone());

    let cover_image = file_url(field(PropertyField::CoverImage))
        .or_else(|| page_cover_url(page.cover.as_ref()));

    Post {
        id: page.id.clone(),
        title,
        slug,
        summary,
        serial: unique_id(field(PropertyField::Id)),
        main_tags,
        sub_tags,
        tags,
        created_at,
        last_edited_at,
        is_published: is_published(properties),
        is_featured: checkbox(field(PropertyField::Featured)),
        cover_image,
        content: None,
    }
}

/// Publication policy. A `releasable` flag decides alone when present
/// (published iff unchecked); otherwise a `published` flag must be checked;
/// with neither the post is public.
pub fn is_published(properties: &RawProperties) -> bool {
    if let Some(releasable) = normalize(properties, PropertyField::Releasable) {
        return !checkbox(Some(releasable));
    }

    if let Some(published) = normalize(properties, PropertyField::Published) {
        return checkbox(Some(published));
    }

    true
}

/// Order posts newest first by `created_at`. Unparsable dates go last and
/// ties keep their incoming order.
pub fn sort_newest_first(posts: &mut [Post]) {
    posts.sort_by_cached_key(|post| std::cmp::Reverse(post.created_timestamp()));
}

/// RFC 3339 timestamp or a bare `YYYY-MM-DD` date (taken as UTC midnight).
pub fn parse_timestamp(value: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(value, &Rfc3339).ok().or_else(|| {
        Date::parse(value, PLAIN_DATE_FORMAT)
            .ok()
            .map(|date| date.midnight().assume_utc())
    })
}

// `date` properties carry a start; `created_time`/`last_edited_time` columns
// carry the timestamp directly.
fn property_timestamp(property: Option<&Value>) -> Option<String> {
    date_start(property).or_else(|| {
        let property = property?;
        let kind = property.get("type").and_then(Value::as_str)?;
        match kind {
            "created_time" | "last_edited_time" => property
                .get(kind)
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        }
    })
}

/// Logs the property schema of the first page it sees, once.
#[derive(Debug, Default)]
pub struct SchemaProbe {
    enabled: bool,
    logged: AtomicBool,
}

impl SchemaProbe {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            logged: AtomicBool::new(false),
        }
    }

    /// Returns `true` when this call emitted the schema log line.
    pub fn observe(&self, page: &RawPage) -> bool {
        if !self.enabled {
            return false;
        }
        let Some(properties) = page.properties.as_ref() else {
            return false;
        };
        if self.logged.swap(true, Ordering::AcqRel) {
            return false;
        }

        debug!(
            target = "notion_blog::domain::posts",
            page_id = %page.id,
            properties = ?describe_schema(properties),
            "database schema"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn page(properties: Value) -> RawPage {
        RawPage::from_value(json!({
            "id": "page-1",
            "created_time": "2024-01-02T03:04:05.000Z",
            "last_edited_time": "2024-02-03T04:05:06.000Z",
            "properties": properties,
        }))
        .expect("raw page")
    }

    fn checkbox_prop(value: bool) -> Value {
        json!({"type": "checkbox", "checkbox": value})
    }

    #[test]
    fn releasable_true_without_published_is_unpublished() {
        let post = to_post(&page(json!({"releasable": checkbox_prop(true)})));
        assert!(!post.is_published);
    }

    #[test]
    fn releasable_false_is_published_even_if_published_is_false() {
        let post = to_post(&page(json!({
            "releasable": checkbox_prop(false),
            "published": checkbox_prop(false),
        })));
        assert!(post.is_published);
    }

    #[test]
    fn published_flag_applies_without_releasable() {
        let published = to_post(&page(json!({"published": checkbox_prop(true)})));
        assert!(published.is_published);

        let draft = to_post(&page(json!({"Published": checkbox_prop(false)})));
        assert!(!draft.is_published);
    }

    #[test]
    fn posts_without_flags_are_published() {
        let post = to_post(&page(json!({})));
        assert!(post.is_published);
    }

    #[test]
    fn tags_are_main_then_sub_without_dedup() {
        let post = to_post(&page(json!({
            "mainTags": {"type": "multi_select", "multi_select": [{"name": "backend"}, {"name": "cs"}]},
            "subTags": {"type": "multi_select", "multi_select": [{"name": "Rust"}, {"name": "cs"}]},
        })));

        assert_eq!(post.main_tags, vec!["backend", "cs"]);
        assert_eq!(post.sub_tags, vec!["Rust", "cs"]);
        assert_eq!(post.tags, vec!["backend", "cs", "Rust", "cs"]);
        assert_eq!(post.tags.len(), post.main_tags.len() + post.sub_tags.len());
    }

    #[test]
    fn slug_prefers_explicit_property() {
        let explicit = to_post(&page(json!({
            "title": {"type": "title", "title": [{"plain_text": "Hello World"}]},
            "slug": {"type": "rich_text", "rich_text": [{"plain_text": "custom-slug"}]},
        })));
        assert_eq!(explicit.slug, "custom-slug");

        let derived = to_post(&page(json!({
            "이름": {"type": "title", "title": [{"plain_text": "러스트 Async 입문"}]},
        })));
        assert_eq!(derived.title, "러스트 Async 입문");
        assert_eq!(derived.slug, "러스트-async-입문");
    }

    #[test]
    fn dates_fall_back_to_page_timestamps() {
        let fallback = to_post(&page(json!({})));
        assert_eq!(fallback.created_at, "2024-01-02T03:04:05.000Z");
        assert_eq!(fallback.last_edited_at, "2024-02-03T04:05:06.000Z");

        let explicit = to_post(&page(json!({
            "createdAt": {"type": "date", "date": {"start": "2023-12-24"}},
            "updatedAt": {"type": "last_edited_time", "last_edited_time": "2024-03-01T00:00:00.000Z"},
        })));
        assert_eq!(explicit.created_at, "2023-12-24");
        assert_eq!(explicit.last_edited_at, "2024-03-01T00:00:00.000Z");
    }

    #[test]
    fn cover_prefers_property_over_page_cover() {
        let mut raw = page(json!({
            "thumbnailUrl": {"type": "files", "files": [{"type": "external", "external": {"url": "https://cdn.example/prop.png"}}]},
        }));
        raw.cover = Some(json!({"type": "external", "external": {"url": "https://cdn.example/page.png"}}));
        assert_eq!(
            to_post(&raw).cover_image.as_deref(),
            Some("https://cdn.example/prop.png")
        );

        raw.properties = Some(RawProperties::new());
        assert_eq!(
            to_post(&raw).cover_image.as_deref(),
            Some("https://cdn.example/page.png")
        );
    }

    #[test]
    fn empty_summary_is_none_and_serial_is_formatted() {
        let post = to_post(&page(json!({
            "summary": {"type": "rich_text", "rich_text": []},
            "ID": {"type": "unique_id", "unique_id": {"prefix": "BLOG", "number": 3}},
            "featured": checkbox_prop(true),
        })));
        assert!(post.summary.is_none());
        assert_eq!(post.serial.as_deref(), Some("BLOG-3"));
        assert!(post.is_featured);
    }

    #[test]
    fn sort_puts_newest_first_and_unparsable_last() {
        let mut posts = ["2024-01-01", "not a date", "2024-06-01T12:00:00Z", "2023-01-01"]
            .into_iter()
            .map(|created| Post {
                created_at: created.to_string(),
                ..to_post(&page(json!({})))
            })
            .collect::<Vec<_>>();

        sort_newest_first(&mut posts);
        let order: Vec<_> = posts.iter().map(|post| post.created_at.as_str()).collect();
        assert_eq!(
            order,
            vec!["2024-06-01T12:00:00Z", "2024-01-01", "2023-01-01", "not a date"]
        );
    }

    #[test]
    fn serialises_camel_case_and_omits_missing_content() {
        let post = to_post(&page(json!({})));
        let json = serde_json::to_value(&post).expect("json");
        assert!(json.get("mainTags").is_some());
        assert!(json.get("isPublished").is_some());
        assert!(json.get("content").is_none());

        let with_content = serde_json::to_value(post.with_content(Vec::new())).expect("json");
        assert_eq!(with_content.get("content"), Some(&json!([])));
    }

    #[test]
    fn has_tag_ignores_case() {
        let post = to_post(&page(json!({
            "subTags": {"type": "multi_select", "multi_select": [{"name": "TypeScript"}]},
        })));
        assert!(post.has_tag("typescript"));
        assert!(!post.has_tag("rust"));
    }

    #[test]
    fn schema_probe_fires_once_when_enabled() {
        let raw = page(json!({"title": {"type": "title", "title": []}}));

        let probe = SchemaProbe::new(true);
        assert!(probe.observe(&raw));
        assert!(!probe.observe(&raw));

        let disabled = SchemaProbe::new(false);
        assert!(!disabled.observe(&raw));
    }
}
