//! Response search and streaming detection.

use artifact_sync_dom::{Document, NodeId, Selector};
use once_cell::sync::Lazy;
use tracing::debug;

use super::{MessageKind, Probe};

/// Markers inside a response that mean it is still being generated.
static STREAMING_MARKERS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#".result-streaming, [aria-busy="true"], pending-response"#)
        .expect("valid streaming marker selector")
});

/// Page-level marker shown while any response streams.
static STOP_BUTTON: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"[data-testid="stop-button"]"#).expect("valid stop button selector")
});

enum Scan {
    Found(NodeId),
    /// Reached the next user message; nothing later belongs to this turn.
    Stopped,
    Exhausted,
}

impl Probe {
    /// Locate the response paired with `prompt`.
    ///
    /// Tries the prompt's forward siblings, then the forward siblings of each
    /// ancestor up to `main`, then (when enabled) the whole document.
    /// Placeholder tags are kept as a backup and only returned when nothing
    /// stronger exists. Any result is strictly after `prompt` in document
    /// order and precedes the next user message.
    pub fn find_response_for(&self, doc: &Document, prompt: NodeId) -> Option<NodeId> {
        if !doc.is_connected(prompt) {
            return None;
        }
        let mut backup = None;

        match self.scan_forward(doc, prompt, prompt, &mut backup) {
            Scan::Found(node) => {
                debug!(node = %node, "Found response via sibling scan");
                return Some(node);
            }
            Scan::Stopped => return backup,
            Scan::Exhausted => {}
        }

        let mut level = doc.parent_element(prompt);
        for depth in 0..self.config.ancestor_scan_depth {
            let Some(ancestor) = level else { break };
            if doc.tag(ancestor) == Some("main") {
                break;
            }
            match self.scan_forward(doc, prompt, ancestor, &mut backup) {
                Scan::Found(node) => {
                    debug!(node = %node, depth, "Found response via ancestor scan");
                    return Some(node);
                }
                Scan::Stopped => return backup,
                Scan::Exhausted => {}
            }
            level = doc.parent_element(ancestor);
        }

        if self.config.allow_global_scan {
            if let Some(node) = self.global_scan(doc, prompt) {
                debug!(node = %node, "Found response via global scan");
                return Some(node);
            }
        }

        if let Some(node) = backup {
            debug!(node = %node, "Falling back to placeholder response");
        }
        backup
    }

    fn scan_forward(
        &self,
        doc: &Document,
        prompt: NodeId,
        from: NodeId,
        backup: &mut Option<NodeId>,
    ) -> Scan {
        let mut next = doc.next_element_sibling(from);
        let mut seen = 0;
        while let Some(candidate) = next {
            if seen >= self.config.sibling_scan_limit {
                break;
            }
            if self.contains_user_message(doc, candidate) {
                return Scan::Stopped;
            }
            if let Some(found) = self.match_candidate(doc, prompt, candidate, backup) {
                return Scan::Found(found);
            }
            next = doc.next_element_sibling(candidate);
            seen += 1;
        }
        Scan::Exhausted
    }

    fn match_candidate(
        &self,
        doc: &Document,
        prompt: NodeId,
        candidate: NodeId,
        backup: &mut Option<NodeId>,
    ) -> Option<NodeId> {
        if !doc.is_following(prompt, candidate) {
            return None;
        }
        if self.is_placeholder(doc, candidate) {
            backup.get_or_insert(candidate);
        } else if self.is_model_message(doc, candidate) {
            return Some(candidate);
        }

        let descendants = doc.descendants(candidate);
        for strategy in &self.strategies {
            let nested = descendants.iter().copied().find(|&d| {
                strategy.classify(doc, d) == Some(MessageKind::Model)
                    && self.is_model_message(doc, d)
                    && doc.is_following(prompt, d)
            });
            if nested.is_some() {
                return nested;
            }
        }

        if backup.is_none() {
            *backup = descendants
                .iter()
                .copied()
                .find(|&d| self.is_placeholder(doc, d) && doc.is_following(prompt, d));
        }
        None
    }

    /// First strong model message after `prompt` and before the next user message.
    fn global_scan(&self, doc: &Document, prompt: NodeId) -> Option<NodeId> {
        let next_user = self
            .user_messages(doc)
            .into_iter()
            .find(|&u| doc.is_following(prompt, u));
        doc.descendants(doc.root()).into_iter().find(|&n| {
            self.is_model_message(doc, n)
                && doc.is_following(prompt, n)
                && next_user.is_none_or(|u| doc.is_following(n, u))
        })
    }

    /// Whether the response is still being generated.
    ///
    /// True when a streaming marker sits at or below the node, when the
    /// page shows a stop button, or when the text is shorter than the
    /// minimum and there is no qualifying image.
    pub fn is_generating(&self, doc: &Document, response: NodeId) -> bool {
        if doc.find_inclusive(response, &STREAMING_MARKERS).is_some() {
            debug!(node = %response, "Response carries a streaming marker");
            return true;
        }
        if doc.query_selector(doc.root(), &STOP_BUTTON).is_some() {
            debug!("Page shows a stop button");
            return true;
        }
        let text = self.extract_text(doc, response);
        if text.chars().count() < self.config.min_response_chars
            && self.extract_artifacts(doc, response).is_empty()
        {
            debug!(len = text.chars().count(), "Response too short and has no images");
            return true;
        }
        false
    }
}
