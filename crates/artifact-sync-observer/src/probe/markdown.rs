//! Minimal Markdown rendering of message nodes.

use artifact_sync_dom::{Document, NodeData, NodeId};
use once_cell::sync::Lazy;
use regex::Regex;

static EXTRA_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("valid blank line pattern"));

/// Render `node` as Markdown.
///
/// Handles headings, paragraphs, fenced code with a `language-*` class,
/// lists, bold and italic, and `[alt]` placeholders for images. Unknown
/// elements contribute their children.
pub fn render_markdown(doc: &Document, node: NodeId) -> String {
    let raw = render(doc, node);
    EXTRA_BLANK_LINES
        .replace_all(&raw, "\n\n")
        .trim()
        .to_string()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn render_children(doc: &Document, node: NodeId) -> String {
    doc.children(node)
        .iter()
        .map(|&child| render(doc, child))
        .collect()
}

fn render(doc: &Document, node: NodeId) -> String {
    let tag = match doc.data(node) {
        Some(NodeData::Text(text)) => return text.clone(),
        Some(NodeData::Element { tag, .. }) => tag.as_str(),
        None => return String::new(),
    };

    match tag {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag[1..].parse::<usize>().unwrap_or(1);
            format!(
                "\n{} {}\n\n",
                "#".repeat(level),
                collapse_whitespace(&doc.text_content(node))
            )
        }
        "p" => format!("\n{}\n\n", render_children(doc, node).trim()),
        "pre" => {
            let lang = doc
                .descendants(node)
                .into_iter()
                .find(|&d| doc.tag(d) == Some("code"))
                .and_then(|code| {
                    doc.classes(code)
                        .find_map(|c| c.strip_prefix("language-"))
                        .map(str::to_string)
                })
                .unwrap_or_default();
            format!("\n```{}\n{}\n```\n\n", lang, doc.text_content(node).trim())
        }
        "img" => match doc.attribute(node, "alt") {
            Some(alt) if !alt.trim().is_empty() => format!("[{}]", alt.trim()),
            _ => String::new(),
        },
        "ul" | "ol" => {
            let ordered = tag == "ol";
            let mut out = String::from("\n");
            let items = doc
                .element_children(node)
                .filter(|&c| doc.tag(c) == Some("li"));
            for (index, item) in items.enumerate() {
                let text = doc.inner_text(item);
                if ordered {
                    out.push_str(&format!("{}. {}\n", index + 1, text.trim()));
                } else {
                    out.push_str(&format!("- {}\n", text.trim()));
                }
            }
            out.push('\n');
            out
        }
        "strong" | "b" => format!("**{}**", render_children(doc, node)),
        "em" | "i" => format!("*{}*", render_children(doc, node)),
        "br" => "\n".to_string(),
        "script" | "style" | "template" => String::new(),
        _ => render_children(doc, node),
    }
}
