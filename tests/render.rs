use insta::assert_snapshot;
use serde_json::{Value, json};

use notion_blog::{
    application::render::{ViewNode, render, render_html},
    domain::blocks::Block,
};

fn text_block(id: &str, kind: &str, text: &str) -> Value {
    let mut block = json!({"object": "block", "id": id, "type": kind});
    block[kind] = json!({"rich_text": [{"plain_text": text}]});
    block
}

#[test]
fn page_renders_lists_toc_and_fallbacks() {
    let blocks = Block::from_values(vec![
        text_block("h-intro", "heading_1", "Intro"),
        json!({"object": "block", "id": "toc", "type": "table_of_contents", "table_of_contents": {}}),
        text_block("a", "bulleted_list_item", "a"),
        text_block("b", "bulleted_list_item", "b"),
        text_block("c", "numbered_list_item", "c"),
        json!({
            "object": "block",
            "id": "bye",
            "type": "paragraph",
            "paragraph": {"rich_text": [{"plain_text": "bye & <done>", "annotations": {"bold": true}}]}
        }),
        json!({"object": "block", "id": "x", "type": "unknown_x", "unknown_x": {}}),
        json!({"object": "block", "id": "partial"}),
    ]);

    assert_snapshot!(
        render_html(&render(&blocks)),
        @r##"<h1 id="h-intro" class="notion-heading">Intro</h1><nav class="notion-toc"><ul><li class="notion-toc-level-1"><a href="#h-intro">Intro</a></li></ul></nav><ul class="notion-list"><li>a</li><li>b</li></ul><ol class="notion-list"><li>c</li></ol><p class="notion-paragraph"><strong>bye &amp; &lt;done&gt;</strong></p><div class="notion-unsupported">unsupported block type: unknown_x</div>"##
    );
}

#[test]
fn toc_reaches_headings_inside_fetched_containers() {
    let toggle = Block::from_value(text_block("t", "toggle", "More")).with_children(vec![
        Block::from_value(text_block("h-inner", "heading_2", "Inner")),
    ]);
    let blocks = vec![
        Block::from_value(text_block("h-top", "heading_1", "Top")),
        toggle,
        Block::from_value(json!({"id": "toc", "type": "table_of_contents", "table_of_contents": {}})),
    ];

    let nodes = render(&blocks);
    let Some(ViewNode::TableOfContents { entries }) = nodes.last() else {
        panic!("expected a table of contents, got {nodes:?}");
    };
    let anchors: Vec<&str> = entries.iter().map(|entry| entry.anchor.as_str()).collect();
    assert_eq!(anchors, ["h-top", "h-inner"]);
    assert_eq!(entries[1].level, 2);
}

#[test]
fn unfetched_table_defers_to_block_endpoint() {
    let blocks = Block::from_values(vec![json!({
        "id": "tbl",
        "type": "table",
        "table": {"table_width": 1, "has_column_header": true, "has_row_header": false}
    })]);

    assert_snapshot!(
        render_html(&render(&blocks)),
        @r#"<div class="notion-table notion-table-deferred" data-rows-src="/api/blocks/tbl"><p>Loading table…</p></div>"#
    );
}

#[test]
fn serialised_blocks_keep_children_only_when_fetched() {
    let leaf = Block::from_value(text_block("p", "paragraph", "x"));
    let empty = Block::from_value(text_block("t", "toggle", "y")).with_children(Vec::new());

    let leaf_json = serde_json::to_value(&leaf).expect("json");
    let empty_json = serde_json::to_value(&empty).expect("json");

    assert!(leaf_json.get("children").is_none());
    assert_eq!(empty_json["children"], json!([]));
    assert_eq!(leaf_json["paragraph"]["rich_text"][0]["plain_text"], json!("x"));
}
