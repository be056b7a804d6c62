//! Block tree → view tree.
//!
//! Rendering is pure and total: every block produces zero or more
//! [`ViewNode`]s and nothing here performs I/O. Adjacent list items are
//! grouped into list containers, table-of-contents blocks see the whole tree
//! handed to [`render`], and unknown block types become a visible fallback
//! rather than an error.

mod html;

pub use html::render_html;

use url::Url;

use crate::domain::blocks::{
    Annotations, Block, BlockKind, CalloutIcon, MediaBlock, RichText, TableRowBlock,
};

const DEFAULT_CALLOUT_ICON: &str = "💡";

// Matched in order against the icon URL.
const CALLOUT_ICON_HINTS: [(&str, &str); 4] = [
    ("hashtag", "🔗"),
    ("info", "ℹ️"),
    ("warning", "⚠️"),
    ("check", "✅"),
];

const PLAIN_CODE_LANGUAGES: [&str; 3] = ["text", "plaintext", "plain text"];

const LINK_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

/// One styled run of inline text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inline {
    pub text: String,
    pub style: Annotations,
    pub href: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub anchor: String,
    pub level: u8,
    pub text: String,
}

pub type Cells = Vec<Vec<Inline>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bulleted,
    Numbered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewNode {
    Paragraph {
        content: Vec<Inline>,
    },
    Heading {
        level: u8,
        anchor: String,
        content: Vec<Inline>,
    },
    List {
        kind: ListKind,
        items: Vec<ViewNode>,
    },
    ListItem {
        content: Vec<Inline>,
        children: Vec<ViewNode>,
    },
    ToDo {
        checked: bool,
        content: Vec<Inline>,
    },
    Toggle {
        summary: Vec<Inline>,
        children: Vec<ViewNode>,
    },
    Quote {
        content: Vec<Inline>,
        children: Vec<ViewNode>,
    },
    Callout {
        icon: String,
        color: Option<String>,
        content: Vec<Inline>,
        children: Vec<ViewNode>,
    },
    Code {
        language: Option<String>,
        text: String,
        caption: Option<String>,
    },
    Divider,
    TableOfContents {
        entries: Vec<TocEntry>,
    },
    EmptyTableOfContents,
    Table {
        header: Cells,
        rows: Vec<Cells>,
        row_header: bool,
    },
    /// Rows were not attached; the client loads them from `/api/blocks/{id}`.
    DeferredTable {
        block_id: String,
    },
    EmptyTable,
    Image {
        url: String,
        caption: Option<String>,
    },
    Video {
        url: String,
        caption: Option<String>,
    },
    File {
        url: String,
        caption: Option<String>,
        name: Option<String>,
    },
    Pdf {
        url: String,
        caption: Option<String>,
    },
    /// Media whose source is missing or not safe to link; the caption stays.
    MediaUnavailable {
        kind: String,
        caption: Option<String>,
    },
    Bookmark {
        url: String,
        caption: Vec<Inline>,
    },
    Columns {
        columns: Vec<Vec<ViewNode>>,
    },
    /// Transparent container (`column` outside a column list, `synced_block`).
    Group {
        children: Vec<ViewNode>,
    },
    Unsupported {
        block_type: String,
    },
}

/// Render a block tree. Table-of-contents blocks anywhere in the tree list
/// the headings of the whole of `blocks`, including nested children.
pub fn render(blocks: &[Block]) -> Vec<ViewNode> {
    let toc = collect_headings(blocks);
    Renderer { toc: &toc }.render_blocks(blocks)
}

/// Depth-first heading collection over `blocks` and all attached children.
pub fn collect_headings(blocks: &[Block]) -> Vec<TocEntry> {
    let mut entries = Vec::new();
    visit_headings(blocks, &mut entries);
    entries
}

fn visit_headings(blocks: &[Block], entries: &mut Vec<TocEntry>) {
    for block in blocks {
        if let BlockKind::Heading1(text) | BlockKind::Heading2(text) | BlockKind::Heading3(text) =
            &block.kind
        {
            entries.push(TocEntry {
                anchor: block.id.clone(),
                level: block.heading_level().unwrap_or(1),
                text: RichText::concat(&text.rich_text),
            });
        }
        if let Some(children) = &block.children {
            visit_headings(children, entries);
        }
    }
}

/// Icon shown for a callout. Emoji icons are used as-is; external image
/// icons are guessed from their URL.
pub fn callout_icon(icon: Option<&CalloutIcon>) -> String {
    match icon {
        Some(CalloutIcon::Emoji(emoji)) => emoji.clone(),
        Some(CalloutIcon::External(url)) => CALLOUT_ICON_HINTS
            .iter()
            .find(|(hint, _)| url.contains(*hint))
            .map_or(DEFAULT_CALLOUT_ICON, |(_, icon)| *icon)
            .to_string(),
        Some(CalloutIcon::File(_)) | None => DEFAULT_CALLOUT_ICON.to_string(),
    }
}

/// `url` when it may be used as a link or media source: site-relative
/// paths, fragments, and http(s) or mailto URLs.
pub fn safe_url(url: &str) -> Option<&str> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    if url.starts_with('/') || url.starts_with('#') {
        return Some(url);
    }
    Url::parse(url)
        .ok()
        .filter(|parsed| LINK_SCHEMES.contains(&parsed.scheme()))
        .map(|_| url)
}

pub fn inlines(runs: &[RichText]) -> Vec<Inline> {
    runs.iter()
        .map(|run| Inline {
            text: run.plain_text.clone(),
            style: run.annotations.clone(),
            href: run.href.as_deref().and_then(safe_url).map(str::to_string),
        })
        .collect()
}

struct Renderer<'a> {
    toc: &'a [TocEntry],
}

impl Renderer<'_> {
    fn render_blocks(&self, blocks: &[Block]) -> Vec<ViewNode> {
        let mut nodes = Vec::with_capacity(blocks.len());
        let mut pending: Option<(ListKind, Vec<ViewNode>)> = None;

        for block in blocks {
            let list_kind = match block.kind {
                BlockKind::BulletedListItem(_) => Some(ListKind::Bulleted),
                BlockKind::NumberedListItem(_) => Some(ListKind::Numbered),
                _ => None,
            };

            match list_kind {
                Some(kind) => {
                    let item = self.list_item(block);
                    match pending.as_mut() {
                        Some((current, items)) if *current == kind => items.push(item),
                        _ => {
                            flush_list(&mut pending, &mut nodes);
                            pending = Some((kind, vec![item]));
                        }
                    }
                }
                None => {
                    flush_list(&mut pending, &mut nodes);
                    nodes.extend(self.render_block(block));
                }
            }
        }

        flush_list(&mut pending, &mut nodes);
        nodes
    }

    fn children(&self, block: &Block) -> Vec<ViewNode> {
        block
            .children
            .as_deref()
            .map(|children| self.render_blocks(children))
            .unwrap_or_default()
    }

    fn list_item(&self, block: &Block) -> ViewNode {
        let content = match &block.kind {
            BlockKind::BulletedListItem(text) | BlockKind::NumberedListItem(text) => {
                inlines(&text.rich_text)
            }
            _ => Vec::new(),
        };
        ViewNode::ListItem {
            content,
            children: self.children(block),
        }
    }

    fn render_block(&self, block: &Block) -> Option<ViewNode> {
        let node = match &block.kind {
            BlockKind::Paragraph(text) => ViewNode::Paragraph {
                content: inlines(&text.rich_text),
            },
            BlockKind::Heading1(text) | BlockKind::Heading2(text) | BlockKind::Heading3(text) => {
                ViewNode::Heading {
                    level: block.heading_level().unwrap_or(1),
                    anchor: block.id.clone(),
                    content: inlines(&text.rich_text),
                }
            }
            BlockKind::BulletedListItem(_) | BlockKind::NumberedListItem(_) => {
                self.list_item(block)
            }
            BlockKind::ToDo(todo) => ViewNode::ToDo {
                checked: todo.checked,
                content: inlines(&todo.rich_text),
            },
            BlockKind::Toggle(text) => ViewNode::Toggle {
                summary: inlines(&text.rich_text),
                children: self.children(block),
            },
            BlockKind::Quote(text) => ViewNode::Quote {
                content: inlines(&text.rich_text),
                children: self.children(block),
            },
            BlockKind::Callout(callout) => ViewNode::Callout {
                icon: callout_icon(callout.icon.as_ref()),
                color: callout.color.clone().filter(|color| color != "default"),
                content: inlines(&callout.rich_text),
                children: self.children(block),
            },
            BlockKind::Code(code) => {
                let caption = RichText::concat(&code.caption);
                ViewNode::Code {
                    language: code
                        .language
                        .clone()
                        .filter(|language| !is_plain_language(language)),
                    text: RichText::concat(&code.rich_text),
                    caption: (!caption.is_empty()).then_some(caption),
                }
            }
            BlockKind::Divider => ViewNode::Divider,
            BlockKind::TableOfContents if self.toc.is_empty() => ViewNode::EmptyTableOfContents,
            BlockKind::TableOfContents => ViewNode::TableOfContents {
                entries: self.toc.to_vec(),
            },
            BlockKind::Table(table) => match block.children.as_deref() {
                None => ViewNode::DeferredTable {
                    block_id: block.id.clone(),
                },
                Some(rows) => table_node(rows, table.has_row_header),
            },
            // Rows are normally consumed by their table; a stray one renders
            // as a single-row table.
            BlockKind::TableRow(row) => ViewNode::Table {
                header: row_cells(row),
                rows: Vec::new(),
                row_header: false,
            },
            BlockKind::Image(media) => match media_url(media) {
                Some(url) => ViewNode::Image {
                    url,
                    caption: media.caption_text(),
                },
                None => media_unavailable("image", media),
            },
            BlockKind::Video(media) => match media_url(media) {
                Some(url) => ViewNode::Video {
                    url,
                    caption: media.caption_text(),
                },
                None => media_unavailable("video", media),
            },
            BlockKind::File(media) => match media_url(media) {
                Some(url) => ViewNode::File {
                    url,
                    caption: media.caption_text(),
                    name: media.name.clone().filter(|name| !name.is_empty()),
                },
                None => media_unavailable("file", media),
            },
            BlockKind::Pdf(media) => match media_url(media) {
                Some(url) => ViewNode::Pdf {
                    url,
                    caption: media.caption_text(),
                },
                None => media_unavailable("pdf", media),
            },
            BlockKind::Bookmark(bookmark) => ViewNode::Bookmark {
                url: bookmark.url.clone(),
                caption: inlines(&bookmark.caption),
            },
            BlockKind::ColumnList => ViewNode::Columns {
                columns: block
                    .children
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .map(|column| match column.kind {
                        BlockKind::Column => self.children(column),
                        _ => self.render_blocks(std::slice::from_ref(column)),
                    })
                    .collect(),
            },
            BlockKind::Column | BlockKind::SyncedBlock => ViewNode::Group {
                children: self.children(block),
            },
            BlockKind::Unsupported { block_type } => ViewNode::Unsupported {
                block_type: block_type.clone(),
            },
            BlockKind::Partial => return None,
        };

        Some(node)
    }
}

fn is_plain_language(language: &str) -> bool {
    PLAIN_CODE_LANGUAGES
        .iter()
        .any(|plain| plain.eq_ignore_ascii_case(language))
}

fn flush_list(pending: &mut Option<(ListKind, Vec<ViewNode>)>, nodes: &mut Vec<ViewNode>) {
    if let Some((kind, items)) = pending.take() {
        nodes.push(ViewNode::List { kind, items });
    }
}

fn table_node(rows: &[Block], row_header: bool) -> ViewNode {
    let mut rows = rows.iter().filter_map(|row| match &row.kind {
        BlockKind::TableRow(row) => Some(row_cells(row)),
        _ => None,
    });

    match rows.next() {
        None => ViewNode::EmptyTable,
        Some(header) => ViewNode::Table {
            header,
            rows: rows.collect(),
            row_header,
        },
    }
}

fn row_cells(row: &TableRowBlock) -> Cells {
    row.cells.iter().map(|cell| inlines(cell)).collect()
}

fn media_url(media: &MediaBlock) -> Option<String> {
    media.url.as_deref().and_then(safe_url).map(str::to_string)
}

fn media_unavailable(kind: &str, media: &MediaBlock) -> ViewNode {
    ViewNode::MediaUnavailable {
        kind: kind.to_string(),
        caption: media.caption_text(),
    }
}
