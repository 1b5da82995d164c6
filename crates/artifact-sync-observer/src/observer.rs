//! The turn observer: mutation listener, completion checks and the run loop.

use std::sync::Arc;

use artifact_sync_dom::{Document, MutationBatch, MutationReceiver, NodeId, SharedDocument};
use artifact_sync_protocols::{KeyValueStore, TurnTransport};
use chrono::Utc;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ObserverConfig;
use crate::dedup::DedupGuard;
use crate::emitter::{TurnContent, TurnEmitter, resolve_url};
use crate::error::ObserverError;
use crate::markers::{self, MarkerRole};
use crate::poller::{CompletionPoller, RetryReason};
use crate::probe::Probe;
use crate::tracker::{PendingMedia, TurnStatus, TurnTracker};

/// Result of one completion check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// No turn is recording.
    Inactive,
    /// Response missing or still generating; another check is armed.
    Retry,
    /// The wait budget ran out; the turn was dropped.
    TimedOut,
    /// The prompt was already saved; nothing was sent.
    Duplicate,
    /// The payload was handed to the transport.
    Emitted,
    /// The transport refused the payload; the turn was dropped.
    TransportFailed,
}

/// Counters kept over the observer's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObserverStats {
    pub turns_started: u64,
    pub emitted: u64,
    pub timeouts: u64,
    pub duplicates: u64,
    pub transport_failures: u64,
}

/// Content captured under the document lock once a response is stable.
struct Capture {
    conversation_id: String,
    response: NodeId,
    content: TurnContent,
}

enum Evaluation {
    NotFound,
    Generating,
    Ready(Capture),
}

/// Watches one page and emits one payload per completed turn.
pub struct TurnObserver {
    document: SharedDocument,
    probe: Probe,
    config: ObserverConfig,
    poller: CompletionPoller,
    tracker: TurnTracker,
    dedup: DedupGuard,
    emitter: TurnEmitter,
    stats: ObserverStats,
}

impl TurnObserver {
    /// Load the dedup record, then subscribe to the document.
    ///
    /// The returned receiver only carries batches flushed after the record
    /// was loaded. A failed load is logged and the observer starts without
    /// a record.
    pub async fn attach(
        document: SharedDocument,
        probe: Probe,
        config: ObserverConfig,
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn TurnTransport>,
    ) -> Result<(Self, MutationReceiver), ObserverError> {
        config.validate()?;

        let conversation_id = {
            let doc = document.read();
            probe.profile().conversation_id(doc.url())
        };
        let dedup = match DedupGuard::load(store.clone(), conversation_id.clone()).await {
            Ok(guard) => guard,
            Err(e) => {
                warn!("Failed to load dedup record for {}: {}", conversation_id, e);
                DedupGuard::new(store, conversation_id.clone())
            }
        };

        let mutations = document.write().observe();
        let source = probe.profile().source();
        info!(
            source = %source,
            conversation = %conversation_id,
            "Observer attached"
        );

        let observer = Self {
            document,
            poller: CompletionPoller::new(&config),
            emitter: TurnEmitter::new(source, transport),
            probe,
            config,
            tracker: TurnTracker::new(),
            dedup,
            stats: ObserverStats::default(),
        };
        Ok((observer, mutations))
    }

    pub fn status(&self) -> TurnStatus {
        self.tracker.status()
    }

    pub fn tracker(&self) -> &TurnTracker {
        &self.tracker
    }

    pub fn dedup(&self) -> &DedupGuard {
        &self.dedup
    }

    pub fn stats(&self) -> ObserverStats {
        self.stats
    }

    pub fn config(&self) -> &ObserverConfig {
        &self.config
    }

    /// Process one mutation batch.
    ///
    /// Classifies each added node, starts or supersedes turns, binds
    /// responses, and re-arms the debounce while recording. Never decides
    /// completion.
    pub fn handle_mutations(&mut self, batch: &MutationBatch) {
        let now = Instant::now();
        let document = Arc::clone(&self.document);
        let mut doc = document.write();

        for node in batch.added_nodes() {
            if !doc.is_connected(node) {
                continue;
            }
            let class = self.probe.classify_added_node(&doc, node);
            if let Some(prompt) = class.user {
                self.offer_prompt(&mut doc, prompt, now);
            }
            if let Some(response) = class.model {
                if self.tracker.is_recording() {
                    self.tracker.observe_response(&self.probe, &doc, response);
                }
            }
        }

        if self.tracker.is_recording() {
            self.tracker.touch(now);
            self.tracker.arm(&self.poller, RetryReason::Debounce, now);
        }
    }

    fn offer_prompt(&mut self, doc: &mut Document, node: NodeId, now: Instant) {
        if !self.probe.is_latest_user_message(doc, node) {
            debug!(node = %node, "Skipping history message");
            return;
        }
        let text = self.probe.prompt_text(doc, node);
        let decision = self
            .tracker
            .offer_prompt(doc, node, text, self.dedup.last_prompt(), now);
        if decision.started() {
            self.stats.turns_started += 1;
            if self.config.highlight_nodes {
                self.apply_marker(doc, node, MarkerRole::Prompt, true);
            }
        }
    }

    fn apply_marker(&self, doc: &mut Document, node: NodeId, role: MarkerRole, clear_first: bool) {
        let result = if clear_first {
            markers::clear_all(doc).and_then(|_| markers::mark(doc, node, role))
        } else {
            markers::mark(doc, node, role)
        };
        if let Err(e) = result {
            debug!("Failed to mark {}: {}", node, e);
        }
    }

    /// Re-evaluate the recording turn.
    pub async fn check_completion(&mut self) -> CheckOutcome {
        let now = Instant::now();
        let Some(started_at) = self
            .tracker
            .current()
            .filter(|t| t.status == TurnStatus::Recording)
            .map(|t| t.started_at)
        else {
            return CheckOutcome::Inactive;
        };

        let evaluation = {
            let document = Arc::clone(&self.document);
            let doc = document.read();
            self.evaluate(&doc)
        };

        match evaluation {
            Evaluation::Ready(capture) => self.save(capture).await,
            Evaluation::NotFound | Evaluation::Generating if self.poller.is_expired(started_at, now) => {
                info!(
                    "Turn timed out after {:?} without a stable response",
                    now.saturating_duration_since(started_at)
                );
                self.stats.timeouts += 1;
                self.finish();
                CheckOutcome::TimedOut
            }
            Evaluation::NotFound | Evaluation::Generating => {
                self.tracker.arm(&self.poller, RetryReason::Poll, now);
                CheckOutcome::Retry
            }
        }
    }

    fn evaluate(&mut self, doc: &Document) -> Evaluation {
        let Some((mut prompt, prompt_text, cached)) = self
            .tracker
            .current()
            .map(|t| (t.prompt, t.prompt_text.clone(), t.response))
        else {
            return Evaluation::NotFound;
        };

        if !doc.is_connected(prompt) {
            let replacement = self
                .probe
                .user_messages(doc)
                .into_iter()
                .rev()
                .find(|&n| self.probe.prompt_text(doc, n) == prompt_text);
            match replacement {
                Some(node) => {
                    self.tracker.rebind_prompt(node);
                    prompt = node;
                }
                None => {
                    debug!("Prompt node detached with no replacement");
                    return Evaluation::NotFound;
                }
            }
        }

        let text = self.probe.prompt_text(doc, prompt);
        if !text.is_empty() && text != prompt_text {
            self.tracker.refresh_prompt_text(text);
        }

        let response = self.resolve_response(doc, prompt, cached);
        self.tracker.bind_response(response);
        let Some(response) = response else {
            debug!(prompt = %prompt, "No response yet");
            return Evaluation::NotFound;
        };

        if self.probe.is_generating(doc, response) {
            return Evaluation::Generating;
        }

        Evaluation::Ready(self.capture(doc, prompt, response))
    }

    /// The cached response when still valid, otherwise a fresh search.
    fn resolve_response(&self, doc: &Document, prompt: NodeId, cached: Option<NodeId>) -> Option<NodeId> {
        let valid = cached.filter(|&r| doc.is_connected(r) && doc.is_following(prompt, r));
        if cached.is_some() && valid.is_none() {
            debug!("Cached response is stale, searching again");
        }
        match valid {
            Some(node) if !self.probe.is_placeholder(doc, node) => Some(node),
            Some(placeholder) => match self.probe.find_response_for(doc, prompt) {
                Some(found) if !self.probe.is_placeholder(doc, found) => Some(found),
                _ => Some(placeholder),
            },
            None => self.probe.find_response_for(doc, prompt),
        }
    }

    fn capture(&self, doc: &Document, prompt: NodeId, response: NodeId) -> Capture {
        let page_url = doc.url();
        let attachments = self
            .probe
            .extract_attachments(doc, prompt)
            .into_iter()
            .map(|image| {
                let name = self.probe.resolve_filename(doc, image.node);
                PendingMedia {
                    source_url: resolve_url(page_url, &image.src),
                    suggested_filename: Some(name.safe),
                    alt_text: name.display,
                }
            })
            .collect();
        let artifacts = self
            .probe
            .extract_artifacts(doc, response)
            .into_iter()
            .map(|image| PendingMedia {
                source_url: resolve_url(page_url, &image.src),
                suggested_filename: None,
                alt_text: image.alt.unwrap_or_default(),
            })
            .collect();

        Capture {
            conversation_id: self.probe.profile().conversation_id(page_url),
            response,
            content: TurnContent {
                title: self.probe.conversation_title(doc),
                prompt: self.probe.prompt_text(doc, prompt),
                response: self.probe.extract_text(doc, response),
                attachments,
                artifacts,
            },
        }
    }

    async fn save(&mut self, capture: Capture) -> CheckOutcome {
        let Capture {
            conversation_id,
            response,
            content,
        } = capture;
        self.tracker
            .set_pending_media(content.attachments.clone(), content.artifacts.clone());
        self.tracker.begin_saving();

        if let Err(e) = self.dedup.switch_to(conversation_id).await {
            warn!("Failed to load dedup record: {}", e);
        }
        if self.is_duplicate(&content.prompt).await {
            info!("Prompt already saved, skipping turn");
            self.stats.duplicates += 1;
            self.finish();
            return CheckOutcome::Duplicate;
        }

        if self.config.highlight_nodes {
            let document = Arc::clone(&self.document);
            let mut doc = document.write();
            self.apply_marker(&mut doc, response, MarkerRole::Response, false);
        }

        let payload = self.emitter.build(&content, Utc::now());
        let outcome = match self.emitter.emit(payload).await {
            Ok(()) => {
                if let Err(e) = self.dedup.save(&content.prompt).await {
                    warn!("Failed to persist dedup record: {}", e);
                }
                self.stats.emitted += 1;
                CheckOutcome::Emitted
            }
            Err(_) => {
                self.stats.transport_failures += 1;
                CheckOutcome::TransportFailed
            }
        };
        self.finish();
        outcome
    }

    async fn is_duplicate(&self, prompt: &str) -> bool {
        if self.dedup.is_duplicate(prompt) {
            return true;
        }
        match self.dedup.is_recorded(prompt).await {
            Ok(recorded) => recorded,
            Err(e) => {
                warn!("Failed to re-read dedup record: {}", e);
                false
            }
        }
    }

    /// Reset to idle and clear markers.
    fn finish(&mut self) {
        self.tracker.reset();
        if self.config.highlight_nodes {
            let document = Arc::clone(&self.document);
            let mut doc = document.write();
            if let Err(e) = markers::clear_all(&mut doc) {
                debug!("Failed to clear markers: {}", e);
            }
        }
    }

    /// Drive the observer until `shutdown` fires.
    ///
    /// Mutation batches and due checks run one at a time on this task. When
    /// the mutation stream closes, the recording turn is still resolved
    /// before returning.
    pub async fn run(mut self, mut mutations: MutationReceiver, shutdown: CancellationToken) -> ObserverStats {
        let mut listening = true;
        loop {
            if !listening && self.tracker.status() == TurnStatus::Idle {
                info!("Mutation stream closed, observer stopping");
                break;
            }
            let deadline = self.tracker.retry_deadline();

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Observer shutting down");
                    break;
                }

                batch = mutations.recv(), if listening => match batch {
                    Some(batch) => self.handle_mutations(&batch),
                    None => listening = false,
                },

                _ = wait_until(deadline) => {
                    if self.tracker.take_due_retry(Instant::now()).is_some() {
                        let outcome = self.check_completion().await;
                        debug!(?outcome, "Completion check finished");
                    }
                }
            }
        }

        self.finish();
        info!(
            started = self.stats.turns_started,
            emitted = self.stats.emitted,
            timeouts = self.stats.timeouts,
            "Observer stopped"
        );
        self.stats
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "observer_tests.rs"]
mod tests;
