//! End-to-end scenarios for the turn observer.
//!
//! Each test drives a live run loop on a paused clock: the page is mutated
//! and flushed, time is advanced with `sleep`, and the emitted payloads are
//! inspected after shutdown.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use artifact_sync_dom::{Document, ElementSpec, NodeId, SharedDocument};
use artifact_sync_observer::{
    CancellationToken, ObserverConfig, ObserverStats, Probe, ProbeConfig, ProviderProfile,
    TurnObserver, dedup_key,
};
use artifact_sync_protocols::{
    KeyValueStore, StoreError, TransportError, TransportMessage, TurnPayload, TurnTransport,
};

// ============================================================================
// Test Helpers
// ============================================================================

const PAGE_URL: &str = "https://gemini.google.com/app/c0ffee";

#[derive(Default)]
struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<TurnPayload>>,
}

impl RecordingTransport {
    fn payloads(&self) -> Vec<TurnPayload> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl TurnTransport for RecordingTransport {
    async fn send(&self, message: TransportMessage) -> Result<(), TransportError> {
        let TransportMessage::SaveTurn(payload) = message;
        self.sent.lock().push(payload);
        Ok(())
    }
}

/// A Gemini-shaped page with a running observer.
struct Page {
    doc: SharedDocument,
    main: NodeId,
    keys: HashMap<String, NodeId>,
    shutdown: CancellationToken,
    task: JoinHandle<ObserverStats>,
}

impl Page {
    async fn open(store: Arc<MemoryStore>, transport: Arc<RecordingTransport>) -> Self {
        let mut doc = Document::new(PAGE_URL, "Pets - Gemini");
        let body = doc.body();
        let main = doc.create_element("main");
        doc.append_child(body, main).unwrap();
        let doc = doc.into_shared();

        let probe = Probe::new(ProviderProfile::gemini(), ProbeConfig::default());
        let (observer, mutations) =
            TurnObserver::attach(doc.clone(), probe, ObserverConfig::default(), store, transport)
                .await
                .unwrap();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(observer.run(mutations, shutdown.clone()));

        Self {
            doc,
            main,
            keys: HashMap::new(),
            shutdown,
            task,
        }
    }

    fn key(&self, key: &str) -> NodeId {
        self.keys[key]
    }

    fn append(&mut self, parent: NodeId, spec: ElementSpec) {
        let mut doc = self.doc.write();
        let node = doc.instantiate(&spec, &mut self.keys);
        doc.append_child(parent, node).unwrap();
        doc.flush_mutations();
    }

    fn prompt(&mut self, prefix: &str, text: &str) {
        let main = self.main;
        self.append(
            main,
            ElementSpec::new("div")
                .key(format!("{prefix}-container"))
                .child(
                    ElementSpec::new("user-query").child(
                        ElementSpec::new("div")
                            .class("user-query-bubble-with-background")
                            .text(text),
                    ),
                ),
        );
    }

    fn response(&mut self, prefix: &str, content: ElementSpec) {
        let container = self.key(&format!("{prefix}-container"));
        self.append(
            container,
            ElementSpec::new("model-response")
                .key(format!("{prefix}-mr"))
                .child(content.key(format!("{prefix}-resp"))),
        );
    }

    fn edit(&self, f: impl FnOnce(&mut Document)) {
        let mut doc = self.doc.write();
        f(&mut doc);
        doc.flush_mutations();
    }

    async fn close(self) -> ObserverStats {
        self.shutdown.cancel();
        self.task.await.unwrap()
    }
}

fn message(text: &str) -> ElementSpec {
    ElementSpec::new("div").class("message-content").text(text)
}

async fn wait(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

// ============================================================================
// Scenarios
// ============================================================================

/// A: no response ever appears; the turn times out and nothing is sent.
#[tokio::test(start_paused = true)]
async fn test_scenario_a_timeout_without_response() {
    let transport = Arc::new(RecordingTransport::default());
    let mut page = Page::open(Arc::new(MemoryStore::default()), transport.clone()).await;

    page.prompt("t1", "Hello");
    wait(59_000).await;
    assert!(transport.payloads().is_empty());
    wait(1_100).await;

    let stats = page.close().await;
    assert_eq!(stats.turns_started, 1);
    assert_eq!(stats.timeouts, 1);
    assert_eq!(stats.emitted, 0);
    assert!(transport.payloads().is_empty());
}

/// B: a streaming response settles into text plus one image.
#[tokio::test(start_paused = true)]
async fn test_scenario_b_streaming_then_complete() {
    let store = Arc::new(MemoryStore::default());
    let transport = Arc::new(RecordingTransport::default());
    let mut page = Page::open(store.clone(), transport.clone()).await;

    page.prompt("t1", "Draw a cat");
    wait(2_000).await;
    page.response(
        "t1",
        ElementSpec::new("div")
            .class("message-content")
            .class("result-streaming"),
    );
    wait(2_000).await;

    let resp = page.key("t1-resp");
    page.edit(|doc| {
        doc.remove_class(resp, "result-streaming").unwrap();
        doc.set_text(resp, "Here's a cat").unwrap();
    });
    page.append(resp, ElementSpec::img("https://lh3.example.com/cat.png", 150, 150));
    wait(10_000).await;

    let stats = page.close().await;
    assert_eq!(stats.emitted, 1);

    let payloads = transport.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].prompt, "Draw a cat");
    assert_eq!(payloads[0].response, "Here's a cat");
    assert_eq!(payloads[0].artifacts.len(), 1);
    assert_eq!(payloads[0].title, "Pets");
    assert_eq!(
        store.get(&dedup_key("c0ffee")).await.unwrap().as_deref(),
        Some("Draw a cat")
    );
}

/// C: the same prompt rendered twice opens a single turn.
#[tokio::test(start_paused = true)]
async fn test_scenario_c_same_prompt_twice() {
    let transport = Arc::new(RecordingTransport::default());
    let mut page = Page::open(Arc::new(MemoryStore::default()), transport.clone()).await;

    page.prompt("t1", "Hello");
    wait(500).await;
    page.prompt("t1-copy", "Hello");
    wait(500).await;
    page.response("t1-copy", message("Hi there"));
    wait(10_000).await;

    let stats = page.close().await;
    assert_eq!(stats.turns_started, 1);
    assert_eq!(transport.payloads().len(), 1);
}

/// D: a fresh observer on the same conversation does not resend a saved prompt.
#[tokio::test(start_paused = true)]
async fn test_scenario_d_dedup_survives_reload() {
    let store = Arc::new(MemoryStore::default());
    let transport = Arc::new(RecordingTransport::default());

    let mut page = Page::open(store.clone(), transport.clone()).await;
    page.prompt("t1", "X");
    page.response("t1", message("Done with X"));
    wait(10_000).await;
    let first = page.close().await;
    assert_eq!(first.emitted, 1);

    // Reload: new document, new observer, same store.
    let mut page = Page::open(store.clone(), transport.clone()).await;
    page.prompt("t1", "X");
    page.response("t1", message("Done with X"));
    wait(10_000).await;
    let second = page.close().await;

    assert_eq!(second.turns_started, 0);
    assert_eq!(second.emitted, 0);
    assert_eq!(transport.payloads().len(), 1);
}

/// E: the bound response is detached before the check and later replaced.
#[tokio::test(start_paused = true)]
async fn test_scenario_e_detached_response_replaced() {
    let transport = Arc::new(RecordingTransport::default());
    let mut page = Page::open(Arc::new(MemoryStore::default()), transport.clone()).await;

    page.prompt("t1", "Hello");
    page.response("t1", message("Draft"));
    wait(1_000).await;
    let stale = page.key("t1-mr");
    page.edit(|doc| doc.remove(stale).unwrap());
    wait(4_000).await;
    assert!(transport.payloads().is_empty());

    page.response("t1", message("Final answer"));
    wait(10_000).await;

    let stats = page.close().await;
    assert_eq!(stats.emitted, 1);
    assert_eq!(transport.payloads()[0].response, "Final answer");
}

/// E, without a replacement: the turn degrades to a timeout.
#[tokio::test(start_paused = true)]
async fn test_scenario_e_detached_response_never_replaced() {
    let transport = Arc::new(RecordingTransport::default());
    let mut page = Page::open(Arc::new(MemoryStore::default()), transport.clone()).await;

    page.prompt("t1", "Hello");
    page.response("t1", message("Draft"));
    wait(1_000).await;
    let stale = page.key("t1-mr");
    page.edit(|doc| doc.remove(stale).unwrap());
    wait(70_000).await;

    let stats = page.close().await;
    assert_eq!(stats.timeouts, 1);
    assert!(transport.payloads().is_empty());
}

// ============================================================================
// Properties
// ============================================================================

/// A streaming marker holds back emission until it disappears, even without
/// further mutations.
#[tokio::test(start_paused = true)]
async fn test_streaming_marker_suppresses_emission() {
    let transport = Arc::new(RecordingTransport::default());
    let mut page = Page::open(Arc::new(MemoryStore::default()), transport.clone()).await;

    page.prompt("t1", "Write a poem");
    page.response(
        "t1",
        ElementSpec::new("div")
            .class("message-content")
            .attr("aria-busy", "true")
            .text("Roses are red"),
    );
    wait(20_000).await;
    assert!(transport.payloads().is_empty());

    let resp = page.key("t1-resp");
    page.edit(|doc| doc.set_attribute(resp, "aria-busy", "false").unwrap());
    wait(1_500).await;

    let stats = page.close().await;
    assert_eq!(stats.emitted, 1);
    assert_eq!(transport.payloads()[0].response, "Roses are red");
}

/// A steady stream of mutations cannot push the check past the wait budget.
#[tokio::test(start_paused = true)]
async fn test_timeout_bound_under_constant_mutations() {
    let transport = Arc::new(RecordingTransport::default());
    let mut page = Page::open(Arc::new(MemoryStore::default()), transport.clone()).await;

    page.prompt("t1", "Hello");
    let container = page.key("t1-container");
    for _ in 0..60 {
        wait(1_000).await;
        page.append(container, ElementSpec::new("span").text("typing"));
    }
    wait(500).await;

    let stats = page.close().await;
    assert_eq!(stats.timeouts, 1);
    assert!(transport.payloads().is_empty());
}

/// Consecutive turns are each emitted once.
#[tokio::test(start_paused = true)]
async fn test_consecutive_turns() {
    let transport = Arc::new(RecordingTransport::default());
    let mut page = Page::open(Arc::new(MemoryStore::default()), transport.clone()).await;

    page.prompt("t1", "First question");
    page.response("t1", message("First answer"));
    wait(5_000).await;
    page.prompt("t2", "Second question");
    page.response("t2", message("Second answer"));
    wait(5_000).await;

    let stats = page.close().await;
    assert_eq!(stats.emitted, 2);
    let prompts: Vec<_> = transport.payloads().into_iter().map(|p| p.prompt).collect();
    assert_eq!(prompts, vec!["First question", "Second question"]);
}
