//! Image extraction for attachments and artifacts.

use artifact_sync_dom::{Document, NodeId};
use tracing::debug;

use super::Probe;

/// An `<img>` that passed the size and avatar filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    pub node: NodeId,
    /// The `src` attribute as written in the page.
    pub src: String,
    pub alt: Option<String>,
    pub width: u32,
    pub height: u32,
}

impl Probe {
    /// Images at or below `scope` that are at least `min_size` in both
    /// dimensions and do not look like avatars.
    ///
    /// Missing `width`/`height` attributes count as zero.
    pub fn extract_images(&self, doc: &Document, scope: NodeId, min_size: u32) -> Vec<ImageCandidate> {
        std::iter::once(scope)
            .chain(doc.descendants(scope))
            .filter(|&n| doc.tag(n) == Some("img"))
            .filter_map(|img| self.qualify_image(doc, img, min_size))
            .collect()
    }

    fn qualify_image(&self, doc: &Document, img: NodeId, min_size: u32) -> Option<ImageCandidate> {
        let src = doc.attribute(img, "src").map(str::trim).filter(|s| !s.is_empty())?;
        let width = doc.numeric_attribute(img, "width").unwrap_or(0);
        let height = doc.numeric_attribute(img, "height").unwrap_or(0);
        if width < min_size || height < min_size {
            return None;
        }
        if is_avatar(doc, img, src) {
            debug!(src, "Skipping avatar image");
            return None;
        }
        Some(ImageCandidate {
            node: img,
            src: src.to_string(),
            alt: doc
                .attribute(img, "alt")
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string),
            width,
            height,
        })
    }

    /// Images produced by the assistant inside `response`.
    pub fn extract_artifacts(&self, doc: &Document, response: NodeId) -> Vec<ImageCandidate> {
        self.extract_images(doc, response, self.config.artifact_min_size)
    }

    /// Images the user supplied with `prompt`.
    ///
    /// Scans the prompt, its parent, its previous sibling and the parent's
    /// previous sibling. Images inside a model message are skipped and each
    /// image is reported once.
    pub fn extract_attachments(&self, doc: &Document, prompt: NodeId) -> Vec<ImageCandidate> {
        let parent = doc.parent_element(prompt);
        let scopes = [
            Some(prompt),
            parent,
            doc.previous_element_sibling(prompt),
            parent.and_then(|p| doc.previous_element_sibling(p)),
        ];

        let mut found: Vec<ImageCandidate> = Vec::new();
        for scope in scopes.into_iter().flatten() {
            for image in self.extract_images(doc, scope, self.config.attachment_min_size) {
                if self.inside_model_message(doc, image.node) {
                    continue;
                }
                if found.iter().any(|f| f.node == image.node) {
                    continue;
                }
                found.push(image);
            }
        }
        debug!(count = found.len(), "Attachment vicinity scan finished");
        found
    }
}

fn is_avatar(doc: &Document, img: NodeId, src: &str) -> bool {
    let class = doc.attribute(img, "class").unwrap_or("");
    class.contains("avatar")
        || (src.contains("googleusercontent.com") && src.contains("s64"))
        || doc.attribute(img, "alt") == Some("User")
}
