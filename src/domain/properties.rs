//! Normalisation of loosely-typed Notion page properties.
//!
//! A Notion database schema drifts over time: columns get renamed, localised
//! or re-typed. Each logical field therefore owns an ordered list of upstream
//! property names, and lookups take the first candidate that is present and
//! non-empty. Every extractor is total: a missing or wrongly-typed value
//! yields an empty string, an empty list, `false` or `None`.

use serde_json::{Map, Value};

/// A single upstream property value, e.g. `{"type": "checkbox", "checkbox": true}`.
pub type RawProperty = Value;

/// The `properties` bag of a Notion page.
pub type RawProperties = Map<String, Value>;

/// Logical fields the post mapper reads from a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyField {
    Id,
    Title,
    Slug,
    Summary,
    MainTags,
    SubTags,
    CoverImage,
    Releasable,
    Published,
    Featured,
    CreatedAt,
    UpdatedAt,
}

impl PropertyField {
    pub const ALL: [PropertyField; 12] = [
        PropertyField::Id,
        PropertyField::Title,
        PropertyField::Slug,
        PropertyField::Summary,
        PropertyField::MainTags,
        PropertyField::SubTags,
        PropertyField::CoverImage,
        PropertyField::Releasable,
        PropertyField::Published,
        PropertyField::Featured,
        PropertyField::CreatedAt,
        PropertyField::UpdatedAt,
    ];

    /// Upstream property names accepted for this field, most preferred first.
    pub fn candidates(self) -> &'static [&'static str] {
        match self {
            PropertyField::Id => &["ID", "id", "Id"],
            PropertyField::Title => &["title", "Title", "name", "Name", "제목", "이름"],
            PropertyField::Slug => &["slug", "Slug", "URL slug", "슬러그"],
            PropertyField::Summary => &[
                "summary",
                "Summary",
                "description",
                "Description",
                "요약",
                "설명",
            ],
            PropertyField::MainTags => &[
                "mainTags",
                "MainTags",
                "main_tags",
                "category",
                "Category",
                "카테고리",
            ],
            PropertyField::SubTags => &["subTags", "SubTags", "sub_tags", "tags", "Tags", "태그"],
            PropertyField::CoverImage => &[
                "coverImage",
                "cover_image",
                "thumbnailUrl",
                "thumbnail",
                "Thumbnail",
                "썸네일",
            ],
            PropertyField::Releasable => &["releasable", "Releasable"],
            PropertyField::Published => &["published", "Published", "isPublished", "발행"],
            PropertyField::Featured => &["featured", "Featured", "isFeatured", "추천"],
            PropertyField::CreatedAt => &["createdAt", "created_at", "Created", "작성일"],
            PropertyField::UpdatedAt => &["updatedAt", "updated_at", "Updated", "수정일"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PropertyField::Id => "id",
            PropertyField::Title => "title",
            PropertyField::Slug => "slug",
            PropertyField::Summary => "summary",
            PropertyField::MainTags => "mainTags",
            PropertyField::SubTags => "subTags",
            PropertyField::CoverImage => "coverImage",
            PropertyField::Releasable => "releasable",
            PropertyField::Published => "published",
            PropertyField::Featured => "featured",
            PropertyField::CreatedAt => "createdAt",
            PropertyField::UpdatedAt => "updatedAt",
        }
    }
}

/// Return the first present, non-falsy upstream value for `field`.
pub fn normalize(properties: &RawProperties, field: PropertyField) -> Option<&RawProperty> {
    field
        .candidates()
        .iter()
        .filter_map(|name| properties.get(*name))
        .find(|value| is_truthy(value))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::String(text) => !text.is_empty(),
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn type_of(property: &Value) -> Option<&str> {
    property.get("type").and_then(Value::as_str)
}

/// Concatenate the `plain_text` of a rich-text run array.
pub fn join_plain_text(runs: Option<&Value>) -> String {
    runs.and_then(Value::as_array)
        .map(|runs| {
            runs.iter()
                .filter_map(|run| run.get("plain_text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Text of a `title` or `rich_text` property.
pub fn plain_text(property: Option<&RawProperty>) -> String {
    let Some(property) = property else {
        return String::new();
    };

    match type_of(property) {
        Some(kind @ ("title" | "rich_text")) => join_plain_text(property.get(kind)),
        _ => String::new(),
    }
}

/// Option names of a `multi_select` (or single `select`) property.
pub fn multi_select(property: Option<&RawProperty>) -> Vec<String> {
    let Some(property) = property else {
        return Vec::new();
    };

    let option_name = |option: &Value| {
        option
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    match type_of(property) {
        Some("multi_select") => property
            .get("multi_select")
            .and_then(Value::as_array)
            .map(|options| options.iter().filter_map(option_name).collect())
            .unwrap_or_default(),
        Some("select") => property
            .get("select")
            .and_then(option_name)
            .into_iter()
            .collect(),
        _ => Vec::new(),
    }
}

/// Payload of a `checkbox` property; `false` for anything else.
pub fn checkbox(property: Option<&RawProperty>) -> bool {
    property
        .filter(|property| type_of(property) == Some("checkbox"))
        .and_then(|property| property.get("checkbox"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// ISO start date of a `date` property.
pub fn date_start(property: Option<&RawProperty>) -> Option<String> {
    property
        .filter(|property| type_of(property) == Some("date"))
        .and_then(|property| property.get("date"))
        .and_then(|date| date.get("start"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// URL of the first file of a `files` property, or the value of a `url` property.
pub fn file_url(property: Option<&RawProperty>) -> Option<String> {
    let property = property?;

    match type_of(property)? {
        "files" => property
            .get("files")
            .and_then(Value::as_array)
            .and_then(|files| files.first())
            .and_then(hosted_url),
        "url" => property
            .get("url")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

/// `PREFIX-N` (or `N`) for a `unique_id` property.
pub fn unique_id(property: Option<&RawProperty>) -> Option<String> {
    let property = property.filter(|property| type_of(property) == Some("unique_id"))?;
    let payload = property.get("unique_id")?;
    let number = payload.get("number").and_then(Value::as_u64)?;

    match payload.get("prefix").and_then(Value::as_str) {
        Some(prefix) if !prefix.is_empty() => Some(format!("{prefix}-{number}")),
        _ => Some(number.to_string()),
    }
}

/// URL of a page-level `cover` object.
pub fn page_cover_url(cover: Option<&Value>) -> Option<String> {
    cover.and_then(hosted_url)
}

/// Resolve `{type: "external", external: {url}}` or `{type: "file", file: {url}}`.
pub fn hosted_url(value: &Value) -> Option<String> {
    let kind = type_of(value)?;
    match kind {
        "external" | "file" => value
            .get(kind)
            .and_then(|payload| payload.get("url"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

/// One line per property: `name: type`, sorted by property name.
pub fn describe_schema(properties: &RawProperties) -> Vec<String> {
    properties
        .iter()
        .map(|(name, value)| format!("{name}: {}", type_of(value).unwrap_or("unknown")))
        .collect()
}
