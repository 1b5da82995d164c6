//! File name heuristics for user attachments.

use artifact_sync_dom::{Document, NodeId, Selector};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use super::{MessageKind, Probe};

/// Generic labels that never name a file.
const DENIED_NAMES: &[&str] = &[
    "uploaded image preview",
    "uploaded image",
    "image",
    "attachment",
    "preview",
    "thumbnail",
    "user",
];

/// Longest candidate taken verbatim.
const MAX_NAME_LEN: usize = 50;

const FALLBACK_NAME: &str = "attachment";

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "bmp"];

static FILE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[a-z0-9_\-()\s]+\.(png|jpg|jpeg|webp|gif|bmp|txt|csv|pdf|md|json|js|html|css)\b")
        .expect("valid file name pattern")
});

static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]").expect("valid sanitize pattern"));

static NAME_ELEMENTS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#".file-name, .name, [class*="filename"]"#).expect("valid file name selector")
});

const NAME_ATTRIBUTES: &[&str] = &["title", "aria-label", "data-tooltip"];

/// Name picked for an attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    /// Human readable name as found in the page (or the fallback).
    pub display: String,
    /// `display` restricted to `[A-Za-z0-9._-]`.
    pub safe: String,
}

/// Whether `name` ends in a known image extension.
pub fn is_image_file_name(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(stem, ext)| !stem.is_empty() && IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn is_denied(candidate: &str) -> bool {
    let lower = candidate.to_lowercase();
    DENIED_NAMES
        .iter()
        .any(|bad| lower == *bad || (lower.contains(bad) && !candidate.contains('.')))
}

fn clean_candidate(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let trimmed = match trimmed.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("remove ") => trimmed[7..].trim(),
        _ => trimmed,
    };
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn sanitize(name: &str) -> String {
    let safe = UNSAFE_CHARS.replace_all(name, "_").to_string();
    if safe.chars().count() < 3 {
        FALLBACK_NAME.to_string()
    } else {
        safe
    }
}

/// Raw material for a file name, closest first.
#[derive(Debug)]
struct Candidates {
    /// Attribute values and dedicated name elements.
    labels: Vec<String>,
    /// Rendered text lines around the image; only `name.ext` tokens count.
    text_lines: Vec<String>,
}

impl Probe {
    /// An ancestor whose text belongs to a conversation rather than to the
    /// attachment chip.
    fn is_name_boundary(&self, doc: &Document, node: NodeId) -> bool {
        matches!(doc.tag(node), Some("body" | "main"))
            || self.kind_of(doc, node).is_some()
            || self.find_kind(doc, node, MessageKind::User).is_some()
            || self.find_kind(doc, node, MessageKind::Model).is_some()
    }

    fn filename_candidates(&self, doc: &Document, img: NodeId) -> Candidates {
        let mut labels: Vec<String> = Vec::new();
        let mut text_lines: Vec<String> = Vec::new();
        for attr in NAME_ATTRIBUTES.iter().chain(std::iter::once(&"alt")) {
            if let Some(value) = doc.attribute(img, attr) {
                labels.push(value.to_string());
            }
        }

        for ancestor in doc.ancestors(img).take(self.config.filename_ancestor_depth) {
            if self.is_name_boundary(doc, ancestor) {
                break;
            }
            for attr in NAME_ATTRIBUTES {
                if let Some(value) = doc.attribute(ancestor, attr) {
                    labels.push(value.to_string());
                }
            }
            if let Some(label) = doc.query_selector(ancestor, &NAME_ELEMENTS) {
                labels.push(doc.inner_text(label));
            }
            text_lines.extend(
                doc.inner_text(ancestor)
                    .split(['\n', '\t'])
                    .map(str::to_string),
            );
        }

        Candidates {
            labels: labels.iter().filter_map(|r| clean_candidate(r)).collect(),
            text_lines: text_lines.iter().filter_map(|r| clean_candidate(r)).collect(),
        }
    }

    /// Pick a file name for an attachment image.
    ///
    /// Only the chip around the image is searched; the walk stops at the
    /// enclosing message or conversation. A label containing a `name.ext`
    /// token wins, then a `name.ext` token from the chip text, then the
    /// first short label that is not generic, then `attachment`.
    pub fn resolve_filename(&self, doc: &Document, img: NodeId) -> ResolvedName {
        let Candidates { labels, text_lines } = self.filename_candidates(doc, img);
        trace!(img = %img, ?labels, ?text_lines, "File name candidates");

        let from_label = labels.iter().filter(|c| !is_denied(c)).find_map(|c| {
            FILE_NAME.find(c).map(|m| {
                if c.chars().count() < MAX_NAME_LEN {
                    c.clone()
                } else {
                    m.as_str().trim().to_string()
                }
            })
        });
        let from_text = || {
            text_lines
                .iter()
                .filter_map(|line| FILE_NAME.find(line))
                .map(|m| m.as_str().trim().to_string())
                .find(|token| !is_denied(token) && token.chars().count() <= MAX_NAME_LEN)
        };

        let display = from_label
            .or_else(from_text)
            .or_else(|| {
                labels
                    .iter()
                    .find(|c| !is_denied(c) && c.chars().count() <= MAX_NAME_LEN)
                    .cloned()
            })
            .unwrap_or_else(|| FALLBACK_NAME.to_string());

        let safe = sanitize(&display);
        ResolvedName { display, safe }
    }
}
