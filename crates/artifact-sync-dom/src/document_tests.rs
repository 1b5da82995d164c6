use super::*;
use crate::spec::ElementSpec;
use std::collections::HashMap;

fn doc() -> Document {
    Document::new("https://gemini.google.com/app/abc123", "Chat - Gemini")
}

fn append(doc: &mut Document, parent: NodeId, tag: &str) -> NodeId {
    let id = doc.create_element(tag);
    doc.append_child(parent, id).unwrap();
    id
}

#[test]
fn test_new_document_has_body() {
    let doc = doc();
    assert_eq!(doc.tag(doc.root()), Some("html"));
    assert_eq!(doc.tag(doc.body()), Some("body"));
    assert_eq!(doc.parent(doc.body()), Some(doc.root()));
    assert!(doc.is_connected(doc.body()));
}

#[test]
fn test_create_element_lowercases_tag() {
    let mut doc = doc();
    let id = doc.create_element("USER-QUERY");
    assert_eq!(doc.tag(id), Some("user-query"));
    assert!(!doc.is_connected(id));
}

#[test]
fn test_append_and_remove() {
    let mut doc = doc();
    let body = doc.body();
    let a = append(&mut doc, body, "div");
    let b = append(&mut doc, a, "p");
    assert!(doc.is_connected(b));
    assert!(doc.contains(a, b));
    assert!(doc.contains(a, a));

    doc.remove(a).unwrap();
    assert!(!doc.is_connected(a));
    assert!(!doc.is_connected(b));
    // Detached subtree keeps its shape.
    assert_eq!(doc.parent(b), Some(a));
    // Removing twice is fine.
    doc.remove(a).unwrap();
}

#[test]
fn test_cycle_rejected() {
    let mut doc = doc();
    let body = doc.body();
    let a = append(&mut doc, body, "div");
    let b = append(&mut doc, a, "div");
    let err = doc.append_child(b, a).unwrap_err();
    assert!(matches!(err, DomError::CycleDetected { .. }));
}

#[test]
fn test_text_node_cannot_have_children() {
    let mut doc = doc();
    let text = doc.create_text("hi");
    let div = doc.create_element("div");
    let err = doc.append_child(text, div).unwrap_err();
    assert!(matches!(err, DomError::NotAnElement(_)));
}

#[test]
fn test_insert_before_and_siblings() {
    let mut doc = doc();
    let body = doc.body();
    let a = append(&mut doc, body, "div");
    let c = append(&mut doc, body, "div");
    let b = doc.create_element("div");
    doc.insert_before(body, b, c).unwrap();

    assert_eq!(doc.children(body), &[a, b, c]);
    assert_eq!(doc.next_element_sibling(a), Some(b));
    assert_eq!(doc.previous_element_sibling(c), Some(b));
    assert_eq!(doc.next_element_sibling(c), None);
}

#[test]
fn test_insert_before_requires_child_reference() {
    let mut doc = doc();
    let body = doc.body();
    let a = append(&mut doc, body, "div");
    let nested = append(&mut doc, a, "span");
    let b = doc.create_element("div");
    let err = doc.insert_before(body, b, nested).unwrap_err();
    assert!(matches!(err, DomError::NotAChild { .. }));
}

#[test]
fn test_siblings_skip_text() {
    let mut doc = doc();
    let body = doc.body();
    let a = append(&mut doc, body, "div");
    let t = doc.create_text("  ");
    doc.append_child(body, t).unwrap();
    let b = append(&mut doc, body, "div");
    assert_eq!(doc.next_element_sibling(a), Some(b));
    assert_eq!(doc.element_children(body).count(), 2);
}

#[test]
fn test_compare_position() {
    let mut doc = doc();
    let body = doc.body();
    let first = append(&mut doc, body, "section");
    let inner = append(&mut doc, first, "p");
    let second = append(&mut doc, body, "section");
    let detached = doc.create_element("div");

    assert_eq!(doc.compare_position(first, first), DocumentPosition::Same);
    assert_eq!(doc.compare_position(first, second), DocumentPosition::Following);
    assert_eq!(doc.compare_position(second, first), DocumentPosition::Preceding);
    assert_eq!(doc.compare_position(first, inner), DocumentPosition::ContainedBy);
    assert_eq!(doc.compare_position(inner, first), DocumentPosition::Contains);
    assert_eq!(doc.compare_position(inner, second), DocumentPosition::Following);
    assert_eq!(doc.compare_position(first, detached), DocumentPosition::Disconnected);
    assert!(doc.is_following(inner, second));
    assert!(!doc.is_following(first, inner));
}

#[test]
fn test_descendants_preorder() {
    let mut doc = doc();
    let body = doc.body();
    let a = append(&mut doc, body, "div");
    let a1 = append(&mut doc, a, "p");
    let a2 = append(&mut doc, a, "p");
    let b = append(&mut doc, body, "div");
    assert_eq!(doc.descendants(body), vec![a, a1, a2, b]);
}

#[test]
fn test_query_selector() {
    let mut doc = doc();
    let body = doc.body();
    let a = append(&mut doc, body, "div");
    doc.add_class(a, "markdown").unwrap();
    let b = append(&mut doc, a, "div");
    doc.add_class(b, "markdown").unwrap();
    doc.add_class(b, "prose").unwrap();

    let sel = Selector::parse(".markdown").unwrap();
    assert_eq!(doc.query_selector(body, &sel), Some(a));
    assert_eq!(doc.query_selector(a, &sel), Some(b));
    assert_eq!(doc.query_selector_all(body, &sel), vec![a, b]);
    assert_eq!(doc.find_inclusive(a, &sel), Some(a));
    assert_eq!(doc.attribute(b, "class"), Some("markdown prose"));

    doc.remove_class(b, "markdown").unwrap();
    assert_eq!(doc.query_selector_all(body, &sel), vec![a]);
}

#[test]
fn test_inner_text_blocks() {
    let mut doc = doc();
    let mut keys = HashMap::new();
    let spec = ElementSpec::new("div")
        .child(ElementSpec::new("p").text("First  line"))
        .child(ElementSpec::new("span").text("inline"))
        .child(ElementSpec::new("br"))
        .child(ElementSpec::new("span").text("after break"))
        .child(ElementSpec::new("script").text("ignored()"));
    let id = doc.instantiate(&spec, &mut keys);
    assert_eq!(doc.inner_text(id), "First line\ninline\nafter break");
    assert!(doc.text_content(id).contains("ignored()"));
}

#[test]
fn test_set_text_replaces_children() {
    let mut doc = doc();
    let body = doc.body();
    let div = append(&mut doc, body, "div");
    let old = append(&mut doc, div, "span");
    doc.set_text(div, "fresh").unwrap();
    assert_eq!(doc.text_content(div), "fresh");
    assert!(!doc.is_connected(old));
}

#[test]
fn test_numeric_attribute() {
    let mut doc = doc();
    let img = doc.create_element("img");
    doc.set_attribute(img, "width", "150px").unwrap();
    doc.set_attribute(img, "height", "abc").unwrap();
    assert_eq!(doc.numeric_attribute(img, "width"), Some(150));
    assert_eq!(doc.numeric_attribute(img, "height"), None);
    assert_eq!(doc.numeric_attribute(img, "missing"), None);
}

#[test]
fn test_is_editable() {
    let mut doc = doc();
    let div = doc.create_element("div");
    assert!(!doc.is_editable(div));
    doc.set_attribute(div, "contenteditable", "true").unwrap();
    assert!(doc.is_editable(div));
    let area = doc.create_element("textarea");
    assert!(doc.is_editable(area));
}

#[tokio::test]
async fn test_mutations_are_batched() {
    let mut doc = doc();
    let mut rx = doc.observe();
    let body = doc.body();
    let a = append(&mut doc, body, "div");
    let _ = append(&mut doc, a, "p");

    // Detached subtrees produce no records.
    let detached = doc.create_element("div");
    let _ = append(&mut doc, detached, "p");

    assert_eq!(doc.flush_mutations(), 2);
    let batch = rx.recv().await.unwrap();
    assert_eq!(batch.records.len(), 2);
    assert_eq!(batch.records[0].target, body);
    assert_eq!(batch.added_nodes().next(), Some(a));

    assert_eq!(doc.flush_mutations(), 0);
}

#[tokio::test]
async fn test_closed_observer_is_dropped() {
    let mut doc = doc();
    let rx = doc.observe();
    drop(rx);
    let body = doc.body();
    let _ = append(&mut doc, body, "div");
    // Pending record still counted, but the closed sender is pruned.
    assert_eq!(doc.flush_mutations(), 1);
    let body = doc.body();
    let _ = append(&mut doc, body, "div");
    assert!(doc.take_records().is_empty());
}

#[test]
fn test_no_records_without_observers() {
    let mut doc = doc();
    let body = doc.body();
    let _ = append(&mut doc, body, "div");
    assert!(doc.take_records().is_empty());
}
