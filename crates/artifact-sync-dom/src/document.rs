//! Document arena, tree mutation and queries.

use std::cmp::Ordering;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::trace;

use crate::error::DomError;
use crate::mutation::{MutationBatch, MutationReceiver, MutationRecord};
use crate::node::{Node, NodeData, NodeId};
use crate::selector::Selector;

/// A document shared between the page driver and the observer.
pub type SharedDocument = Arc<RwLock<Document>>;

/// Position of `other` relative to `node`, as in `node.compareDocumentPosition(other)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentPosition {
    Same,
    /// `other` comes before `node` and is not an ancestor.
    Preceding,
    /// `other` comes after `node` and is not a descendant.
    Following,
    /// `other` is an ancestor of `node`.
    Contains,
    /// `other` is a descendant of `node`.
    ContainedBy,
    /// At least one of the nodes is not connected to the document.
    Disconnected,
}

/// Tags rendered as their own line by [`Document::inner_text`].
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "dd", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tr", "ul",
];

/// Tags whose content is never rendered as text.
const SILENT_TAGS: &[&str] = &["script", "style", "template", "noscript"];

/// In-process document.
///
/// Nodes live in an arena and are never freed: removing a node only detaches
/// it, so callers holding a [`NodeId`] can always ask [`Document::is_connected`].
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    body: NodeId,
    url: String,
    title: String,
    pending: Vec<MutationRecord>,
    observers: Vec<mpsc::UnboundedSender<MutationBatch>>,
}

impl Document {
    /// Create a document with an `html > body` skeleton.
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId::from_raw(0),
            body: NodeId::from_raw(0),
            url: url.into(),
            title: title.into(),
            pending: Vec::new(),
            observers: Vec::new(),
        };
        let root = doc.create_element("html");
        let body = doc.create_element("body");
        doc.nodes[body.index()].parent = Some(root);
        doc.nodes[root.index()].children.push(body);
        doc.root = root;
        doc.body = body;
        doc
    }

    /// Wrap the document for sharing between tasks.
    pub fn into_shared(self) -> SharedDocument {
        Arc::new(RwLock::new(self))
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    // ------------------------------------------------------------------
    // Node creation and tree mutation
    // ------------------------------------------------------------------

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
        })
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId::from_raw(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id.index()).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes.get_mut(id.index()).ok_or(DomError::UnknownNode(id))
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_at(parent, child, None)
    }

    /// Insert `child` before `reference`, which must be a child of `parent`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> Result<(), DomError> {
        self.insert_at(parent, child, Some(reference))
    }

    fn insert_at(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        if self.node(parent)?.tag().is_none() {
            return Err(DomError::NotAnElement(parent));
        }
        self.node(child)?;
        if self.contains(child, parent) {
            return Err(DomError::CycleDetected { parent, child });
        }
        if let Some(reference) = reference {
            if self.node(reference)?.parent != Some(parent) {
                return Err(DomError::NotAChild { parent, reference });
            }
        }

        self.detach(child)?;

        let index = match reference {
            Some(reference) => self.nodes[parent.index()]
                .children
                .iter()
                .position(|&c| c == reference)
                .ok_or(DomError::NotAChild { parent, reference })?,
            None => self.nodes[parent.index()].children.len(),
        };
        self.nodes[parent.index()].children.insert(index, child);
        self.nodes[child.index()].parent = Some(parent);

        self.record(parent, vec![child], Vec::new());
        Ok(())
    }

    /// Detach `node` from its parent. Removing a detached node is a no-op.
    pub fn remove(&mut self, node: NodeId) -> Result<(), DomError> {
        self.detach(node)
    }

    fn detach(&mut self, node: NodeId) -> Result<(), DomError> {
        let Some(parent) = self.node(node)?.parent else {
            return Ok(());
        };
        self.nodes[parent.index()].children.retain(|&c| c != node);
        self.nodes[node.index()].parent = None;
        self.record(parent, Vec::new(), vec![node]);
        Ok(())
    }

    /// Replace `old` with `new` at the same position.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), DomError> {
        let parent = self.node(old)?.parent;
        match parent {
            Some(parent) => {
                self.insert_before(parent, new, old)?;
                self.detach(old)
            }
            None => Ok(()),
        }
    }

    /// Replace all children of `node` with a single text node.
    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) -> Result<(), DomError> {
        if self.node(node)?.tag().is_none() {
            return Err(DomError::NotAnElement(node));
        }
        let old_children = std::mem::take(&mut self.node_mut(node)?.children);
        for child in &old_children {
            self.nodes[child.index()].parent = None;
        }
        let text_node = self.create_text(text);
        self.nodes[node.index()].children.push(text_node);
        self.nodes[text_node.index()].parent = Some(node);
        self.record(node, vec![text_node], old_children);
        Ok(())
    }

    /// Set an attribute. Attribute changes are not reported as mutations.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        match &mut self.node_mut(node)?.data {
            NodeData::Element { attributes, .. } => {
                match attributes.iter_mut().find(|(k, _)| k == name) {
                    Some(slot) => slot.1 = value.to_string(),
                    None => attributes.push((name.to_string(), value.to_string())),
                }
                Ok(())
            }
            NodeData::Text(_) => Err(DomError::NotAnElement(node)),
        }
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), DomError> {
        match &mut self.node_mut(node)?.data {
            NodeData::Element { attributes, .. } => {
                attributes.retain(|(k, _)| k != name);
                Ok(())
            }
            NodeData::Text(_) => Err(DomError::NotAnElement(node)),
        }
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) -> Result<(), DomError> {
        if self.has_class(node, class) {
            return Ok(());
        }
        let current = self.attribute(node, "class").unwrap_or("").trim().to_string();
        let updated = if current.is_empty() {
            class.to_string()
        } else {
            format!("{} {}", current, class)
        };
        self.set_attribute(node, "class", &updated)
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) -> Result<(), DomError> {
        let updated: Vec<&str> = self
            .classes(node)
            .filter(|c| *c != class)
            .collect();
        let updated = updated.join(" ");
        self.set_attribute(node, "class", &updated)
    }

    // ------------------------------------------------------------------
    // Mutation delivery
    // ------------------------------------------------------------------

    fn record(&mut self, target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) {
        if self.observers.is_empty() || !self.is_connected(target) {
            return;
        }
        self.pending.push(MutationRecord {
            target,
            added,
            removed,
        });
    }

    /// Subscribe to child-list mutations of the whole document.
    pub fn observe(&mut self) -> MutationReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.push(tx);
        rx
    }

    /// Deliver pending records to every observer as one batch.
    ///
    /// Returns the number of records delivered.
    pub fn flush_mutations(&mut self) -> usize {
        if self.pending.is_empty() {
            return 0;
        }
        let batch = MutationBatch::new(std::mem::take(&mut self.pending));
        let count = batch.records.len();
        self.observers.retain(|tx| tx.send(batch.clone()).is_ok());
        trace!(records = count, observers = self.observers.len(), "Flushed mutation batch");
        count
    }

    /// Take pending records without delivering them.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.pending)
    }

    // ------------------------------------------------------------------
    // Structure queries
    // ------------------------------------------------------------------

    /// Whether `id` exists in this document's arena.
    pub fn exists(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.index()).map(|n| &n.data)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.index()).and_then(|n| n.parent)
    }

    /// Parent, only if it is an element below the root.
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|&p| p != self.root)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.index())
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&c| self.is_element(c))
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|&c| c == id)?;
        siblings[pos + 1..]
            .iter()
            .copied()
            .find(|&c| self.is_element(c))
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|&c| c == id)?;
        siblings[..pos]
            .iter()
            .rev()
            .copied()
            .find(|&c| self.is_element(c))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.tag(id).is_some()
    }

    /// Lowercase tag name of an element.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.index()).and_then(|n| n.tag())
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes.get(id.index()).and_then(|n| n.attribute(name))
    }

    /// Numeric attribute such as an image's `width`; `None` when absent or unparsable.
    pub fn numeric_attribute(&self, id: NodeId, name: &str) -> Option<u32> {
        self.attribute(id, name)
            .and_then(|v| v.trim().trim_end_matches("px").parse::<f64>().ok())
            .map(|v| v.max(0.0) as u32)
    }

    pub fn classes(&self, id: NodeId) -> impl Iterator<Item = &str> + '_ {
        self.attribute(id, "class")
            .unwrap_or("")
            .split_whitespace()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.classes(id).any(|c| c == class)
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// Whether the node is attached to this document's root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        if !self.exists(id) {
            return false;
        }
        id == self.root || self.ancestors(id).any(|a| a == self.root)
    }

    /// Inclusive containment: `ancestor == node` or `ancestor` is above `node`.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor == node || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Element descendants of `id` in document (pre-)order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            if self.is_element(next) {
                out.push(next);
            }
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    fn path_from_root(&self, id: NodeId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            let index = self
                .children(parent)
                .iter()
                .position(|&c| c == current)
                .unwrap_or(0);
            path.push(index);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Position of `other` relative to `node`.
    pub fn compare_position(&self, node: NodeId, other: NodeId) -> DocumentPosition {
        if node == other {
            return DocumentPosition::Same;
        }
        if !self.is_connected(node) || !self.is_connected(other) {
            return DocumentPosition::Disconnected;
        }
        if self.contains(node, other) {
            return DocumentPosition::ContainedBy;
        }
        if self.contains(other, node) {
            return DocumentPosition::Contains;
        }
        match self.path_from_root(other).cmp(&self.path_from_root(node)) {
            Ordering::Greater => DocumentPosition::Following,
            _ => DocumentPosition::Preceding,
        }
    }

    /// `other` is strictly after `node` in document order and not inside it.
    pub fn is_following(&self, node: NodeId, other: NodeId) -> bool {
        self.compare_position(node, other) == DocumentPosition::Following
    }

    // ------------------------------------------------------------------
    // Selectors
    // ------------------------------------------------------------------

    pub fn matches(&self, id: NodeId, selector: &Selector) -> bool {
        match self.nodes.get(id.index()) {
            Some(node) => match node.tag() {
                Some(tag) => selector.matches_with(tag, |name| node.attribute(name)),
                None => false,
            },
            None => false,
        }
    }

    /// First matching descendant of `scope` (the scope itself is not tested).
    pub fn query_selector(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|&d| self.matches(d, selector))
    }

    /// All matching descendants of `scope`, in document order.
    pub fn query_selector_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&d| self.matches(d, selector))
            .collect()
    }

    /// `scope` itself when it matches, otherwise its first matching descendant.
    pub fn find_inclusive(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        if self.matches(scope, selector) {
            Some(scope)
        } else {
            self.query_selector(scope, selector)
        }
    }

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.data(id) {
            Some(NodeData::Text(text)) => out.push_str(text),
            Some(NodeData::Element { .. }) => {
                for &child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
            None => {}
        }
    }

    /// Rendered text approximation: block elements and `<br>` start new
    /// lines, lines are trimmed and empty lines dropped.
    pub fn inner_text(&self, id: NodeId) -> String {
        let mut raw = String::new();
        self.collect_inner_text(id, &mut raw);
        raw.lines()
            .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn collect_inner_text(&self, id: NodeId, out: &mut String) {
        match self.data(id) {
            Some(NodeData::Text(text)) => out.push_str(text),
            Some(NodeData::Element { tag, .. }) => {
                let tag = tag.as_str();
                if SILENT_TAGS.contains(&tag) {
                    return;
                }
                if tag == "br" {
                    out.push('\n');
                    return;
                }
                let block = BLOCK_TAGS.contains(&tag);
                if block {
                    out.push('\n');
                }
                for &child in self.children(id) {
                    self.collect_inner_text(child, out);
                }
                if block {
                    out.push('\n');
                }
            }
            None => {}
        }
    }

    /// Whether the element accepts user input (`contenteditable` or a textbox).
    pub fn is_editable(&self, id: NodeId) -> bool {
        let editable = self
            .attribute(id, "contenteditable")
            .map(|v| v.is_empty() || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        editable
            || self.attribute(id, "role") == Some("textbox")
            || matches!(self.tag(id), Some("textarea") | Some("input"))
    }
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
