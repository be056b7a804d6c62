//! Typed view over Notion block objects.
//!
//! Blocks arrive as JSON objects tagged by `type`, with the payload stored
//! under a key of the same name. [`Block::from_value`] turns one object into
//! a closed [`BlockKind`] while keeping the original JSON so the block can be
//! handed back to API clients unchanged. Parsing never fails: unknown types
//! become [`BlockKind::Unsupported`], objects without a `type` become
//! [`BlockKind::Partial`] and malformed payloads degrade to empty content.

use serde::{Deserialize, Serialize, Serializer, de::DeserializeOwned};
use serde_json::Value;
use tracing::debug;

use super::properties::hosted_url;

/// Block types that may own nested child blocks and are fetched recursively.
pub const CONTAINER_TYPES: [&str; 7] = [
    "callout",
    "toggle",
    "quote",
    "table_of_contents",
    "column_list",
    "column",
    "synced_block",
];

/// Whether blocks of `block_type` get their subtree fetched eagerly.
pub fn is_container_type(block_type: &str) -> bool {
    CONTAINER_TYPES.contains(&block_type)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: String,
    pub kind: BlockKind,
    /// `None`: not a container or not fetched. `Some(vec![])`: fetched and empty.
    pub children: Option<Vec<Block>>,
    raw: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Paragraph(TextBlock),
    Heading1(TextBlock),
    Heading2(TextBlock),
    Heading3(TextBlock),
    BulletedListItem(TextBlock),
    NumberedListItem(TextBlock),
    ToDo(ToDoBlock),
    Toggle(TextBlock),
    Quote(TextBlock),
    Callout(CalloutBlock),
    Code(CodeBlock),
    Divider,
    TableOfContents,
    Table(TableBlock),
    TableRow(TableRowBlock),
    Image(MediaBlock),
    Video(MediaBlock),
    File(MediaBlock),
    Pdf(MediaBlock),
    Bookmark(BookmarkBlock),
    ColumnList,
    Column,
    SyncedBlock,
    /// A recognised object whose `type` this renderer has no rule for.
    Unsupported {
        block_type: String,
    },
    /// An object without a `type` key (Notion's partial block response).
    Partial,
}

/// Rich-text annotation set of one run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
    pub color: String,
}

impl Default for Annotations {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            strikethrough: false,
            underline: false,
            code: false,
            color: "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct RichText {
    pub plain_text: String,
    pub href: Option<String>,
    pub annotations: Annotations,
}

impl RichText {
    pub fn concat(runs: &[RichText]) -> String {
        runs.iter().map(|run| run.plain_text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct TextBlock {
    pub rich_text: Vec<RichText>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct ToDoBlock {
    pub rich_text: Vec<RichText>,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct CodeBlock {
    pub rich_text: Vec<RichText>,
    pub language: Option<String>,
    pub caption: Vec<RichText>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CalloutBlock {
    pub rich_text: Vec<RichText>,
    pub icon: Option<CalloutIcon>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalloutIcon {
    Emoji(String),
    External(String),
    File(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct TableBlock {
    pub table_width: usize,
    pub has_column_header: bool,
    pub has_row_header: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct TableRowBlock {
    pub cells: Vec<Vec<RichText>>,
}

/// Payload shared by image, video, file and pdf blocks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaBlock {
    pub url: Option<String>,
    pub caption: Vec<RichText>,
    pub name: Option<String>,
}

impl MediaBlock {
    /// Caption plain text, `None` when the caption is empty.
    pub fn caption_text(&self) -> Option<String> {
        let text = RichText::concat(&self.caption);
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct BookmarkBlock {
    pub url: String,
    pub caption: Vec<RichText>,
}

impl Block {
    /// Parse one block object. Never fails.
    pub fn from_value(raw: Value) -> Self {
        let id = raw
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let kind = match raw.get("type").and_then(Value::as_str) {
            Some(block_type) => parse_kind(block_type, raw.get(block_type)),
            None => BlockKind::Partial,
        };

        Self {
            id,
            kind,
            children: None,
            raw,
        }
    }

    pub fn from_values(values: Vec<Value>) -> Vec<Self> {
        values.into_iter().map(Self::from_value).collect()
    }

    /// The upstream `type` discriminator, if any.
    pub fn block_type(&self) -> Option<&str> {
        self.raw.get("type").and_then(Value::as_str)
    }

    pub fn is_container(&self) -> bool {
        self.block_type().is_some_and(is_container_type)
    }

    pub fn with_children(mut self, children: Vec<Block>) -> Self {
        self.children = Some(children);
        self
    }

    /// Heading level (1–3) when this block is a heading.
    pub fn heading_level(&self) -> Option<u8> {
        match self.kind {
            BlockKind::Heading1(_) => Some(1),
            BlockKind::Heading2(_) => Some(2),
            BlockKind::Heading3(_) => Some(3),
            _ => None,
        }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

impl Serialize for Block {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match (&self.raw, &self.children) {
            (Value::Object(object), Some(children)) => {
                let mut object = object.clone();
                let children = serde_json::to_value(children).map_err(serde::ser::Error::custom)?;
                object.insert("children".to_string(), children);
                object.serialize(serializer)
            }
            _ => self.raw.serialize(serializer),
        }
    }
}

fn parse_kind(block_type: &str, payload: Option<&Value>) -> BlockKind {
    match block_type {
        "paragraph" => BlockKind::Paragraph(payload_or_default(block_type, payload)),
        "heading_1" => BlockKind::Heading1(payload_or_default(block_type, payload)),
        "heading_2" => BlockKind::Heading2(payload_or_default(block_type, payload)),
        "heading_3" => BlockKind::Heading3(payload_or_default(block_type, payload)),
        "bulleted_list_item" => BlockKind::BulletedListItem(payload_or_default(block_type, payload)),
        "numbered_list_item" => BlockKind::NumberedListItem(payload_or_default(block_type, payload)),
        "to_do" => BlockKind::ToDo(payload_or_default(block_type, payload)),
        "toggle" => BlockKind::Toggle(payload_or_default(block_type, payload)),
        "quote" => BlockKind::Quote(payload_or_default(block_type, payload)),
        "callout" => BlockKind::Callout(parse_callout(payload)),
        "code" => BlockKind::Code(payload_or_default(block_type, payload)),
        "divider" => BlockKind::Divider,
        "table_of_contents" => BlockKind::TableOfContents,
        "table" => BlockKind::Table(payload_or_default(block_type, payload)),
        "table_row" => BlockKind::TableRow(payload_or_default(block_type, payload)),
        "image" => BlockKind::Image(parse_media(payload)),
        "video" => BlockKind::Video(parse_media(payload)),
        "file" => BlockKind::File(parse_media(payload)),
        "pdf" => BlockKind::Pdf(parse_media(payload)),
        "bookmark" => BlockKind::Bookmark(payload_or_default(block_type, payload)),
        "column_list" => BlockKind::ColumnList,
        "column" => BlockKind::Column,
        "synced_block" => BlockKind::SyncedBlock,
        other => BlockKind::Unsupported {
            block_type: other.to_string(),
        },
    }
}

fn payload_or_default<T>(block_type: &str, payload: Option<&Value>) -> T
where
    T: DeserializeOwned + Default,
{
    let Some(payload) = payload else {
        return T::default();
    };

    match T::deserialize(payload) {
        Ok(parsed) => parsed,
        Err(err) => {
            debug!(
                target = "notion_blog::domain::blocks",
                block_type,
                error = %err,
                "malformed block payload, rendering it empty"
            );
            T::default()
        }
    }
}

fn rich_text_field(payload: Option<&Value>, key: &str) -> Vec<RichText> {
    payload
        .and_then(|payload| payload.get(key))
        .map(|runs| payload_or_default("rich_text", Some(runs)))
        .unwrap_or_default()
}

fn parse_callout(payload: Option<&Value>) -> CalloutBlock {
    let icon = payload
        .and_then(|payload| payload.get("icon"))
        .and_then(|icon| match icon.get("type").and_then(Value::as_str)? {
            "emoji" => icon
                .get("emoji")
                .and_then(Value::as_str)
                .map(|emoji| CalloutIcon::Emoji(emoji.to_string())),
            "external" => hosted_url(icon).map(CalloutIcon::External),
            "file" => hosted_url(icon).map(CalloutIcon::File),
            _ => None,
        });

    CalloutBlock {
        rich_text: rich_text_field(payload, "rich_text"),
        icon,
        color: payload
            .and_then(|payload| payload.get("color"))
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

fn parse_media(payload: Option<&Value>) -> MediaBlock {
    MediaBlock {
        url: payload.and_then(hosted_url),
        caption: rich_text_field(payload, "caption"),
        name: payload
            .and_then(|payload| payload.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

/// Plain text of a heading or text-bearing block; empty for other kinds.
pub fn block_plain_text(block: &Block) -> String {
    match &block.kind {
        BlockKind::Paragraph(text)
        | BlockKind::Heading1(text)
        | BlockKind::Heading2(text)
        | BlockKind::Heading3(text)
        | BlockKind::BulletedListItem(text)
        | BlockKind::NumberedListItem(text)
        | BlockKind::Toggle(text)
        | BlockKind::Quote(text) => RichText::concat(&text.rich_text),
        BlockKind::ToDo(todo) => RichText::concat(&todo.rich_text),
        BlockKind::Callout(callout) => RichText::concat(&callout.rich_text),
        BlockKind::Code(code) => RichText::concat(&code.rich_text),
        _ => String::new(),
    }
}
