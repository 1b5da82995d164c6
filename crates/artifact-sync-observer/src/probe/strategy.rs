//! Message-kind detection strategies.
//!
//! Each strategy looks at a single element and answers whether it is a user
//! or a model message by one structural signature. The probe tries the
//! strategies in order and the first one that recognizes a node wins.

use artifact_sync_dom::{Document, NodeId};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    User,
    Model,
}

/// One structural signature for message elements.
pub trait MessageStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Classify `node` itself. Descendants are not inspected.
    fn classify(&self, doc: &Document, node: NodeId) -> Option<MessageKind>;
}

/// Tags that stand for a response that has not rendered yet.
pub const PLACEHOLDER_TAGS: &[&str] = &["pending-response", "model-response"];

/// `data-message-author-role="user" | "assistant" | "model"`.
pub struct RoleAttribute;

impl MessageStrategy for RoleAttribute {
    fn name(&self) -> &'static str {
        "role-attribute"
    }

    fn classify(&self, doc: &Document, node: NodeId) -> Option<MessageKind> {
        match doc.attribute(node, "data-message-author-role")? {
            "user" => Some(MessageKind::User),
            "assistant" | "model" => Some(MessageKind::Model),
            _ => None,
        }
    }
}

/// Provider specific marker classes.
pub struct MarkerClass {
    user: Vec<&'static str>,
    model: Vec<&'static str>,
}

impl MarkerClass {
    pub fn new(user: Vec<&'static str>, model: Vec<&'static str>) -> Self {
        Self { user, model }
    }
}

impl Default for MarkerClass {
    fn default() -> Self {
        Self::new(
            vec!["user-query-bubble-with-background"],
            vec!["model-query-bubble", "model-response-text", "message-content"],
        )
    }
}

impl MessageStrategy for MarkerClass {
    fn name(&self) -> &'static str {
        "marker-class"
    }

    fn classify(&self, doc: &Document, node: NodeId) -> Option<MessageKind> {
        if self.user.iter().any(|c| doc.has_class(node, c)) {
            Some(MessageKind::User)
        } else if self.model.iter().any(|c| doc.has_class(node, c)) {
            Some(MessageKind::Model)
        } else {
            None
        }
    }
}

/// Provider custom element tags.
pub struct CustomTag {
    user: Vec<&'static str>,
    model: Vec<&'static str>,
}

impl CustomTag {
    pub fn new(user: Vec<&'static str>, model: Vec<&'static str>) -> Self {
        Self { user, model }
    }
}

impl Default for CustomTag {
    fn default() -> Self {
        Self::new(vec!["user-query"], PLACEHOLDER_TAGS.to_vec())
    }
}

impl MessageStrategy for CustomTag {
    fn name(&self) -> &'static str {
        "custom-tag"
    }

    fn classify(&self, doc: &Document, node: NodeId) -> Option<MessageKind> {
        let tag = doc.tag(node)?;
        if self.user.contains(&tag) {
            Some(MessageKind::User)
        } else if self.model.contains(&tag) {
            Some(MessageKind::Model)
        } else {
            None
        }
    }
}

/// Weak fallback: a rendered `markdown` container is a model message.
pub struct MarkdownContainer;

impl MessageStrategy for MarkdownContainer {
    fn name(&self) -> &'static str {
        "markdown-container"
    }

    fn classify(&self, doc: &Document, node: NodeId) -> Option<MessageKind> {
        doc.has_class(node, "markdown").then_some(MessageKind::Model)
    }
}

/// The built-in strategies in priority order.
pub fn default_strategies() -> Vec<Box<dyn MessageStrategy>> {
    vec![
        Box::new(RoleAttribute),
        Box::new(MarkerClass::default()),
        Box::new(CustomTag::default()),
        Box::new(MarkdownContainer),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(doc: &mut Document, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = doc.create_element(tag);
        for (k, v) in attrs {
            doc.set_attribute(id, k, v).unwrap();
        }
        id
    }

    #[test]
    fn test_role_attribute() {
        let mut doc = Document::new("https://chatgpt.com/c/1", "ChatGPT");
        let user = element(&mut doc, "div", &[("data-message-author-role", "user")]);
        let bot = element(&mut doc, "div", &[("data-message-author-role", "assistant")]);
        let sys = element(&mut doc, "div", &[("data-message-author-role", "system")]);
        assert_eq!(RoleAttribute.classify(&doc, user), Some(MessageKind::User));
        assert_eq!(RoleAttribute.classify(&doc, bot), Some(MessageKind::Model));
        assert_eq!(RoleAttribute.classify(&doc, sys), None);
    }

    #[test]
    fn test_marker_class() {
        let mut doc = Document::new("https://gemini.google.com/app/1", "Gemini");
        let user = element(&mut doc, "div", &[("class", "x user-query-bubble-with-background")]);
        let bot = element(&mut doc, "div", &[("class", "message-content")]);
        let strategy = MarkerClass::default();
        assert_eq!(strategy.classify(&doc, user), Some(MessageKind::User));
        assert_eq!(strategy.classify(&doc, bot), Some(MessageKind::Model));
    }

    #[test]
    fn test_custom_tag() {
        let mut doc = Document::new("https://gemini.google.com/app/1", "Gemini");
        let user = element(&mut doc, "user-query", &[]);
        let pending = element(&mut doc, "pending-response", &[]);
        let div = element(&mut doc, "div", &[]);
        let strategy = CustomTag::default();
        assert_eq!(strategy.classify(&doc, user), Some(MessageKind::User));
        assert_eq!(strategy.classify(&doc, pending), Some(MessageKind::Model));
        assert_eq!(strategy.classify(&doc, div), None);
    }

    #[test]
    fn test_markdown_container() {
        let mut doc = Document::new("https://chatgpt.com/c/1", "ChatGPT");
        let md = element(&mut doc, "div", &[("class", "markdown prose")]);
        assert_eq!(MarkdownContainer.classify(&doc, md), Some(MessageKind::Model));
    }

    #[test]
    fn test_default_order() {
        let names: Vec<_> = default_strategies().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["role-attribute", "marker-class", "custom-tag", "markdown-container"]
        );
    }
}
