//! Declarative element descriptions.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::node::NodeId;

/// Serializable description of an element subtree.
///
/// Used by replay traces and tests to build nodes without a sequence of
/// `create_element` calls. A `key` names the created node so later steps can
/// refer to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementSpec>,
}

impl ElementSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Text placed before any children.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn child(mut self, child: ElementSpec) -> Self {
        self.children.push(child);
        self
    }

    /// An `<img>` with explicit dimensions.
    pub fn img(src: impl Into<String>, width: u32, height: u32) -> Self {
        Self::new("img")
            .attr("src", src)
            .attr("width", width.to_string())
            .attr("height", height.to_string())
    }
}

impl Document {
    /// Build a detached subtree from `spec`, recording keyed nodes in `keys`.
    pub fn instantiate(&mut self, spec: &ElementSpec, keys: &mut HashMap<String, NodeId>) -> NodeId {
        let id = self.create_element(&spec.tag);
        if let Some(key) = &spec.key {
            keys.insert(key.clone(), id);
        }
        // Fresh elements cannot fail attribute writes.
        for (name, value) in &spec.attrs {
            let _ = self.set_attribute(id, name, value);
        }
        if !spec.classes.is_empty() {
            let existing = spec.attrs.get("class").map(String::as_str).unwrap_or("");
            let mut classes: Vec<&str> = existing.split_whitespace().collect();
            classes.extend(spec.classes.iter().map(String::as_str));
            let _ = self.set_attribute(id, "class", &classes.join(" "));
        }
        if let Some(text) = &spec.text {
            let text_node = self.create_text(text.clone());
            let _ = self.append_child(id, text_node);
        }
        for child in &spec.children {
            let child_id = self.instantiate(child, keys);
            let _ = self.append_child(id, child_id);
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instantiate_builds_detached_subtree() {
        let mut doc = Document::new("https://example.com/", "t");
        let mut keys = HashMap::new();
        let spec = ElementSpec::new("div")
            .key("msg")
            .class("model-response-text")
            .attr("data-x", "1")
            .child(ElementSpec::new("p").text("Hello"))
            .child(ElementSpec::img("https://img/cat.png", 150, 150).key("img"));

        let id = doc.instantiate(&spec, &mut keys);
        assert_eq!(keys.get("msg"), Some(&id));
        assert!(!doc.is_connected(id));
        assert!(doc.has_class(id, "model-response-text"));
        assert_eq!(doc.attribute(id, "data-x"), Some("1"));
        assert_eq!(doc.text_content(id), "Hello");
        let img = keys["img"];
        assert_eq!(doc.numeric_attribute(img, "width"), Some(150));
        assert_eq!(doc.parent(img), Some(id));
    }

    #[test]
    fn test_spec_deserializes_with_defaults() {
        let spec: ElementSpec =
            serde_json::from_str(r#"{"tag":"user-query","text":"Draw a cat"}"#).unwrap();
        assert_eq!(spec.tag, "user-query");
        assert_eq!(spec.text.as_deref(), Some("Draw a cat"));
        assert!(spec.children.is_empty());
        assert!(spec.attrs.is_empty());
    }

    #[test]
    fn test_classes_merge_with_class_attr() {
        let mut doc = Document::new("https://example.com/", "t");
        let mut keys = HashMap::new();
        let spec = ElementSpec::new("div").attr("class", "a").class("b");
        let id = doc.instantiate(&spec, &mut keys);
        assert_eq!(doc.attribute(id, "class"), Some("a b"));
    }
}
