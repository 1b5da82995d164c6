//! Conversation title lookup.

use artifact_sync_dom::{Document, Selector};
use once_cell::sync::Lazy;

use super::Probe;

static TITLE_ELEMENTS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"h1[data-test-id="conversation-title"], .conversation-title"#)
        .expect("valid title selector")
});

const FALLBACK_TITLE: &str = "Conversation";

impl Probe {
    /// Title element text, else the document title without the site name,
    /// else `Conversation`.
    pub fn conversation_title(&self, doc: &Document) -> String {
        let from_element = doc
            .query_selector(doc.root(), &TITLE_ELEMENTS)
            .map(|el| doc.inner_text(el).trim().to_string())
            .filter(|t| !t.is_empty());
        if let Some(title) = from_element {
            return title;
        }

        let stripped = self.profile.strip_title_suffix(doc.title());
        if stripped.is_empty() {
            FALLBACK_TITLE.to_string()
        } else {
            stripped
        }
    }
}
