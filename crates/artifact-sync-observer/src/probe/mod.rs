//! DOM probe: stateless queries over the current document.
//!
//! Nothing here remembers anything between calls. Every answer is computed
//! from the document as it is now.

mod filename;
mod images;
mod markdown;
mod profile;
mod response;
pub mod strategy;
mod title;

use artifact_sync_dom::{Document, NodeId};
use tracing::trace;

use crate::config::ProbeConfig;

pub use filename::{ResolvedName, is_image_file_name};
pub use images::ImageCandidate;
pub use markdown::render_markdown;
pub use profile::{DEFAULT_CONVERSATION_ID, ProviderProfile};
pub use strategy::{MessageKind, MessageStrategy, PLACEHOLDER_TAGS, default_strategies};

/// Result of classifying an added node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    /// The user message found at or below the node.
    pub user: Option<NodeId>,
    /// The model message found at or below the node.
    pub model: Option<NodeId>,
}

impl Classification {
    pub fn is_user_message(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_model_message(&self) -> bool {
        self.model.is_some()
    }
}

/// Stateless document queries for one provider.
pub struct Probe {
    profile: ProviderProfile,
    config: ProbeConfig,
    strategies: Vec<Box<dyn MessageStrategy>>,
}

impl Probe {
    pub fn new(profile: ProviderProfile, config: ProbeConfig) -> Self {
        Self::with_strategies(profile, config, default_strategies())
    }

    /// Use a custom, ordered strategy list.
    pub fn with_strategies(
        profile: ProviderProfile,
        config: ProbeConfig,
        strategies: Vec<Box<dyn MessageStrategy>>,
    ) -> Self {
        Self {
            profile,
            config,
            strategies,
        }
    }

    pub fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Find the user and model messages at or below `node`.
    ///
    /// For each kind the strategies are tried in priority order; each one
    /// checks `node` first and then its descendants in document order.
    pub fn classify_added_node(&self, doc: &Document, node: NodeId) -> Classification {
        if !doc.is_element(node) {
            return Classification::default();
        }
        let user = self.find_kind(doc, node, MessageKind::User);
        let model = self.find_kind(doc, node, MessageKind::Model);
        if user.is_some() || model.is_some() {
            trace!(node = %node, ?user, ?model, "Classified added node");
        }
        Classification { user, model }
    }

    fn find_kind(&self, doc: &Document, scope: NodeId, kind: MessageKind) -> Option<NodeId> {
        let descendants = doc.descendants(scope);
        for strategy in &self.strategies {
            let found = std::iter::once(scope)
                .chain(descendants.iter().copied())
                .find(|&n| strategy.classify(doc, n) == Some(kind) && self.accepts(doc, n, kind));
            if found.is_some() {
                return found;
            }
        }
        None
    }

    fn accepts(&self, doc: &Document, node: NodeId, kind: MessageKind) -> bool {
        match kind {
            MessageKind::User => self.is_real_user_message(doc, node),
            MessageKind::Model => !self.inside_user_message(doc, node),
        }
    }

    /// The first strategy's verdict on `node` alone.
    pub fn kind_of(&self, doc: &Document, node: NodeId) -> Option<MessageKind> {
        self.strategies
            .iter()
            .find_map(|strategy| strategy.classify(doc, node))
    }

    /// A user message that is not an input area and carries text.
    fn is_real_user_message(&self, doc: &Document, node: NodeId) -> bool {
        !doc.is_editable(node)
            && !doc.ancestors(node).any(|a| doc.is_editable(a))
            && !doc.inner_text(node).trim().is_empty()
    }

    fn inside_user_message(&self, doc: &Document, node: NodeId) -> bool {
        doc.ancestors(node)
            .any(|a| self.kind_of(doc, a) == Some(MessageKind::User))
    }

    /// Whether `node` is a real user message by itself.
    pub fn is_user_message(&self, doc: &Document, node: NodeId) -> bool {
        self.kind_of(doc, node) == Some(MessageKind::User) && self.is_real_user_message(doc, node)
    }

    /// Whether `node` is, or contains, a real user message.
    pub fn contains_user_message(&self, doc: &Document, node: NodeId) -> bool {
        self.find_kind(doc, node, MessageKind::User).is_some()
    }

    /// Strong model message: recognized as model and not a placeholder tag.
    pub fn is_model_message(&self, doc: &Document, node: NodeId) -> bool {
        self.kind_of(doc, node) == Some(MessageKind::Model)
            && !self.is_placeholder(doc, node)
            && !self.inside_user_message(doc, node)
    }

    pub fn is_placeholder(&self, doc: &Document, node: NodeId) -> bool {
        doc.tag(node)
            .map(|tag| PLACEHOLDER_TAGS.contains(&tag))
            .unwrap_or(false)
    }

    /// Whether `node` or one of its ancestors is a model message.
    pub fn inside_model_message(&self, doc: &Document, node: NodeId) -> bool {
        std::iter::once(node)
            .chain(doc.ancestors(node))
            .any(|n| self.kind_of(doc, n) == Some(MessageKind::Model))
    }

    /// All real user messages in the document, in document order.
    pub fn user_messages(&self, doc: &Document) -> Vec<NodeId> {
        doc.descendants(doc.root())
            .into_iter()
            .filter(|&n| self.is_user_message(doc, n))
            .collect()
    }

    /// History filter: false when a real user message strictly follows `candidate`.
    pub fn is_latest_user_message(&self, doc: &Document, candidate: NodeId) -> bool {
        !self
            .user_messages(doc)
            .into_iter()
            .any(|later| later != candidate && doc.is_following(candidate, later))
    }

    /// Normalized text of a prompt node.
    pub fn prompt_text(&self, doc: &Document, node: NodeId) -> String {
        doc.inner_text(node).trim().to_string()
    }

    /// Best-effort Markdown text of a node.
    pub fn extract_text(&self, doc: &Document, node: NodeId) -> String {
        render_markdown(doc, node)
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
