use html_escape::{encode_double_quoted_attribute, encode_text};

use super::{Cells, Inline, ListKind, TocEntry, ViewNode, safe_url};

const FILE_LABEL: &str = "File";
const PDF_LABEL: &str = "PDF document";

/// Serialise view nodes to an HTML fragment. All text and attribute values
/// are escaped.
pub fn render_html(nodes: &[ViewNode]) -> String {
    let mut out = String::new();
    write_nodes(&mut out, nodes);
    out
}

fn write_nodes(out: &mut String, nodes: &[ViewNode]) {
    for node in nodes {
        write_node(out, node);
    }
}

fn write_node(out: &mut String, node: &ViewNode) {
    match node {
        ViewNode::Paragraph { content } => {
            out.push_str(r#"<p class="notion-paragraph">"#);
            write_inlines(out, content);
            out.push_str("</p>");
        }
        ViewNode::Heading {
            level,
            anchor,
            content,
        } => {
            let level = (*level).clamp(1, 3);
            out.push_str(&format!(
                r#"<h{level} id="{}" class="notion-heading">"#,
                encode_double_quoted_attribute(anchor)
            ));
            write_inlines(out, content);
            out.push_str(&format!("</h{level}>"));
        }
        ViewNode::List { kind, items } => {
            let tag = match kind {
                ListKind::Bulleted => "ul",
                ListKind::Numbered => "ol",
            };
            out.push_str(&format!(r#"<{tag} class="notion-list">"#));
            write_nodes(out, items);
            out.push_str(&format!("</{tag}>"));
        }
        ViewNode::ListItem { content, children } => {
            out.push_str("<li>");
            write_inlines(out, content);
            write_nodes(out, children);
            out.push_str("</li>");
        }
        ViewNode::ToDo { checked, content } => {
            let (checked_attr, class) = if *checked {
                (" checked", "notion-to-do notion-to-do-checked")
            } else {
                ("", "notion-to-do")
            };
            out.push_str(&format!(
                r#"<div class="{class}"><input type="checkbox" disabled{checked_attr}><span>"#
            ));
            write_inlines(out, content);
            out.push_str("</span></div>");
        }
        ViewNode::Toggle { summary, children } => {
            out.push_str(r#"<details class="notion-toggle"><summary>"#);
            write_inlines(out, summary);
            out.push_str("</summary>");
            write_nodes(out, children);
            out.push_str("</details>");
        }
        ViewNode::Quote { content, children } => {
            out.push_str(r#"<blockquote class="notion-quote">"#);
            write_inlines(out, content);
            write_nodes(out, children);
            out.push_str("</blockquote>");
        }
        ViewNode::Callout {
            icon,
            color,
            content,
            children,
        } => {
            out.push_str(r#"<div class="notion-callout"#);
            if let Some(color) = color {
                out.push_str(&format!(
                    " notion-color-{}",
                    encode_double_quoted_attribute(color)
                ));
            }
            out.push_str(&format!(
                r#""><span class="notion-callout-icon">{}</span><div class="notion-callout-body">"#,
                encode_text(icon)
            ));
            write_inlines(out, content);
            write_nodes(out, children);
            out.push_str("</div></div>");
        }
        ViewNode::Code {
            language,
            text,
            caption,
        } => {
            out.push_str(r#"<figure class="notion-code">"#);
            match language {
                Some(language) => out.push_str(&format!(
                    r#"<div class="notion-code-language">{}</div><pre><code class="language-{}">"#,
                    encode_text(language),
                    encode_double_quoted_attribute(language)
                )),
                None => out.push_str("<pre><code>"),
            }
            out.push_str(&encode_text(text));
            out.push_str("</code></pre>");
            write_caption(out, caption.as_deref());
            out.push_str("</figure>");
        }
        ViewNode::Divider => out.push_str(r#"<hr class="notion-divider">"#),
        ViewNode::TableOfContents { entries } => write_toc(out, entries),
        ViewNode::EmptyTableOfContents => out.push_str(
            r#"<nav class="notion-toc notion-toc-empty"><p>No headings on this page.</p></nav>"#,
        ),
        ViewNode::Table {
            header,
            rows,
            row_header,
        } => write_table(out, header, rows, *row_header),
        ViewNode::DeferredTable { block_id } => out.push_str(&format!(
            r#"<div class="notion-table notion-table-deferred" data-rows-src="/api/blocks/{}"><p>Loading table…</p></div>"#,
            encode_double_quoted_attribute(block_id)
        )),
        ViewNode::EmptyTable => out.push_str(
            r#"<div class="notion-table notion-table-empty"><p>This table is empty.</p></div>"#,
        ),
        ViewNode::Image { url, caption } => {
            out.push_str(&format!(
                r#"<figure class="notion-image"><img src="{}" alt="{}" loading="lazy">"#,
                encode_double_quoted_attribute(url),
                encode_double_quoted_attribute(caption.as_deref().unwrap_or_default())
            ));
            write_caption(out, caption.as_deref());
            out.push_str("</figure>");
        }
        ViewNode::Video { url, caption } => {
            out.push_str(&format!(
                r#"<figure class="notion-video"><video src="{}" controls preload="metadata"></video>"#,
                encode_double_quoted_attribute(url)
            ));
            write_caption(out, caption.as_deref());
            out.push_str("</figure>");
        }
        ViewNode::File { url, caption, name } => {
            let label = caption.as_deref().or(name.as_deref()).unwrap_or(FILE_LABEL);
            out.push_str(&format!(
                r#"<div class="notion-file"><a href="{}" target="_blank" rel="noopener noreferrer">📎 {}</a></div>"#,
                encode_double_quoted_attribute(url),
                encode_text(label)
            ));
        }
        ViewNode::Pdf { url, caption } => {
            let url = encode_double_quoted_attribute(url);
            out.push_str(&format!(
                r#"<figure class="notion-pdf"><iframe src="{url}" title="{}" loading="lazy"></iframe><figcaption><a href="{url}" target="_blank" rel="noopener noreferrer">{}</a></figcaption></figure>"#,
                encode_double_quoted_attribute(caption.as_deref().unwrap_or(PDF_LABEL)),
                encode_text(caption.as_deref().unwrap_or(PDF_LABEL))
            ));
        }
        ViewNode::MediaUnavailable { kind, caption } => {
            out.push_str(&format!(
                r#"<figure class="notion-media-unavailable"><p>{} unavailable</p>"#,
                encode_text(kind)
            ));
            write_caption(out, caption.as_deref());
            out.push_str("</figure>");
        }
        ViewNode::Bookmark { url, caption } => {
            match safe_url(url) {
                Some(href) => out.push_str(&format!(
                    r#"<div class="notion-bookmark"><a href="{}" target="_blank" rel="noopener noreferrer">{}</a>"#,
                    encode_double_quoted_attribute(href),
                    encode_text(url)
                )),
                None => out.push_str(&format!(
                    r#"<div class="notion-bookmark"><span>{}</span>"#,
                    encode_text(url)
                )),
            }
            if !caption.is_empty() {
                out.push_str(r#"<p class="notion-bookmark-caption">"#);
                write_inlines(out, caption);
                out.push_str("</p>");
            }
            out.push_str("</div>");
        }
        ViewNode::Columns { columns } => {
            out.push_str(r#"<div class="notion-columns">"#);
            for column in columns {
                out.push_str(r#"<div class="notion-column">"#);
                write_nodes(out, column);
                out.push_str("</div>");
            }
            out.push_str("</div>");
        }
        ViewNode::Group { children } => write_nodes(out, children),
        ViewNode::Unsupported { block_type } => out.push_str(&format!(
            r#"<div class="notion-unsupported">unsupported block type: {}</div>"#,
            encode_text(block_type)
        )),
    }
}

fn write_inlines(out: &mut String, inlines: &[Inline]) {
    for inline in inlines {
        write_inline(out, inline);
    }
}

fn write_inline(out: &mut String, inline: &Inline) {
    let style = &inline.style;
    let mut closing = Vec::new();

    if let Some(href) = &inline.href {
        out.push_str(&format!(
            r#"<a href="{}" target="_blank" rel="noopener noreferrer">"#,
            encode_double_quoted_attribute(href)
        ));
        closing.push("</a>");
    }
    if style.color != "default" && !style.color.is_empty() {
        out.push_str(&format!(
            r#"<span class="notion-color-{}">"#,
            encode_double_quoted_attribute(&style.color)
        ));
        closing.push("</span>");
    }
    for (enabled, open, close) in [
        (style.bold, "<strong>", "</strong>"),
        (style.italic, "<em>", "</em>"),
        (style.strikethrough, "<s>", "</s>"),
        (style.underline, "<u>", "</u>"),
        (style.code, "<code>", "</code>"),
    ] {
        if enabled {
            out.push_str(open);
            closing.push(close);
        }
    }

    out.push_str(&encode_text(&inline.text));
    for close in closing.into_iter().rev() {
        out.push_str(close);
    }
}

fn write_caption(out: &mut String, caption: Option<&str>) {
    if let Some(caption) = caption {
        out.push_str(&format!("<figcaption>{}</figcaption>", encode_text(caption)));
    }
}

fn write_toc(out: &mut String, entries: &[TocEntry]) {
    out.push_str(r#"<nav class="notion-toc"><ul>"#);
    for entry in entries {
        out.push_str(&format!(
            r##"<li class="notion-toc-level-{}"><a href="#{}">{}</a></li>"##,
            entry.level,
            encode_double_quoted_attribute(&entry.anchor),
            encode_text(&entry.text)
        ));
    }
    out.push_str("</ul></nav>");
}

fn write_table(out: &mut String, header: &Cells, rows: &[Cells], row_header: bool) {
    out.push_str(r#"<div class="notion-table"><table><thead><tr>"#);
    for cell in header {
        out.push_str("<th>");
        write_inlines(out, cell);
        out.push_str("</th>");
    }
    out.push_str("</tr></thead><tbody>");
    for row in rows {
        out.push_str("<tr>");
        for (index, cell) in row.iter().enumerate() {
            let tag = if row_header && index == 0 { "th" } else { "td" };
            out.push_str(&format!("<{tag}>"));
            write_inlines(out, cell);
            out.push_str(&format!("</{tag}>"));
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table></div>");
}
