//! Turn Tracker - the `Idle -> Recording -> Saving -> Idle` state machine.
//!
//! The tracker holds at most one [`Turn`]. Starting a new turn replaces the
//! current one, so two active turns cannot coexist.

use std::fmt;

use artifact_sync_dom::{Document, NodeId};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::poller::{CompletionPoller, RetryHandle, RetryReason, RetrySlot};
use crate::probe::Probe;

/// Status of the tracked turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    Idle,
    Recording,
    Saving,
}

impl fmt::Display for TurnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Recording => f.write_str("recording"),
            Self::Saving => f.write_str("saving"),
        }
    }
}

/// Media collected for a turn once its response is stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMedia {
    /// Image source resolved against the page address.
    pub source_url: String,
    /// Sanitized name found near an attachment; `None` for artifacts.
    pub suggested_filename: Option<String>,
    pub alt_text: String,
}

/// The in-flight turn.
#[derive(Debug)]
pub struct Turn {
    pub status: TurnStatus,
    pub prompt: NodeId,
    /// Normalized prompt text, refreshed on every check.
    pub prompt_text: String,
    /// Bound response node; dropped when it is detached.
    pub response: Option<NodeId>,
    pub started_at: Instant,
    pub last_activity_at: Instant,
    pub pending_attachments: Vec<PendingMedia>,
    pub pending_artifacts: Vec<PendingMedia>,
    pub retry: RetrySlot,
}

impl Turn {
    fn new(prompt: NodeId, prompt_text: String, now: Instant) -> Self {
        Self {
            status: TurnStatus::Recording,
            prompt,
            prompt_text,
            response: None,
            started_at: now,
            last_activity_at: now,
            pending_attachments: Vec::new(),
            pending_artifacts: Vec::new(),
            retry: RetrySlot::new(),
        }
    }
}

/// What happened to a candidate prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptDecision {
    /// A new turn started from idle.
    Started,
    /// A strictly newer prompt replaced the recording turn.
    Superseded,
    /// A turn is being saved; candidates are ignored.
    Busy,
    /// The candidate is the tracked prompt node.
    SameNode,
    /// The candidate repeats the tracked prompt text.
    SameText,
    /// The candidate does not follow the tracked prompt.
    NotFollowing,
    /// The candidate repeats the last emitted prompt.
    AlreadyEmitted,
}

impl PromptDecision {
    /// Whether the decision opened a new turn.
    pub fn started(&self) -> bool {
        matches!(self, Self::Started | Self::Superseded)
    }
}

/// Owner of the single in-flight turn.
#[derive(Debug, Default)]
pub struct TurnTracker {
    active: Option<Turn>,
}

impl TurnTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> TurnStatus {
        self.active
            .as_ref()
            .map(|t| t.status)
            .unwrap_or(TurnStatus::Idle)
    }

    pub fn is_recording(&self) -> bool {
        self.status() == TurnStatus::Recording
    }

    pub fn current(&self) -> Option<&Turn> {
        self.active.as_ref()
    }

    /// Feed a user message candidate.
    ///
    /// `last_emitted` is the last prompt text saved for this conversation.
    /// While recording, the candidate must strictly follow the tracked prompt
    /// in document order. A detached tracked prompt has no position and
    /// yields to any candidate.
    pub fn offer_prompt(
        &mut self,
        doc: &Document,
        node: NodeId,
        text: String,
        last_emitted: &str,
        now: Instant,
    ) -> PromptDecision {
        if !last_emitted.is_empty() && text == last_emitted {
            debug!(node = %node, "Ignoring prompt that was already saved");
            return PromptDecision::AlreadyEmitted;
        }

        let decision = match &self.active {
            None => PromptDecision::Started,
            Some(turn) if turn.status == TurnStatus::Saving => PromptDecision::Busy,
            Some(turn) if turn.prompt == node => PromptDecision::SameNode,
            Some(turn) if turn.prompt_text == text => PromptDecision::SameText,
            Some(turn) if doc.is_connected(turn.prompt) && !doc.is_following(turn.prompt, node) => {
                PromptDecision::NotFollowing
            }
            Some(_) => PromptDecision::Superseded,
        };

        if decision.started() {
            if let Some(mut previous) = self.active.take() {
                previous.retry.cancel();
                info!(
                    "Superseding turn for prompt {} with {}",
                    previous.prompt, node
                );
            }
            info!(node = %node, prompt_len = text.chars().count(), "Turn recording");
            self.active = Some(Turn::new(node, text, now));
        } else {
            debug!(node = %node, ?decision, "Prompt candidate ignored");
        }
        decision
    }

    /// Bind a model message seen while recording.
    ///
    /// The node must strictly follow the prompt. A placeholder never displaces
    /// a connected strong binding.
    pub fn observe_response(&mut self, probe: &Probe, doc: &Document, node: NodeId) -> bool {
        let Some(turn) = self.active.as_mut() else {
            return false;
        };
        if turn.status != TurnStatus::Recording || !doc.is_following(turn.prompt, node) {
            return false;
        }
        if turn.response == Some(node) {
            return false;
        }
        if let Some(existing) = turn.response {
            let keeps_existing = probe.is_placeholder(doc, node)
                && doc.is_connected(existing)
                && !probe.is_placeholder(doc, existing);
            if keeps_existing {
                return false;
            }
        }
        debug!(node = %node, "Response bound");
        turn.response = Some(node);
        true
    }

    /// Replace the prompt node after a re-render.
    pub fn rebind_prompt(&mut self, node: NodeId) {
        if let Some(turn) = self.active.as_mut() {
            debug!("Prompt rebound from {} to {}", turn.prompt, node);
            turn.prompt = node;
        }
    }

    pub fn refresh_prompt_text(&mut self, text: String) {
        if let Some(turn) = self.active.as_mut() {
            turn.prompt_text = text;
        }
    }

    pub fn bind_response(&mut self, node: Option<NodeId>) {
        if let Some(turn) = self.active.as_mut() {
            turn.response = node;
        }
    }

    pub fn set_pending_media(&mut self, attachments: Vec<PendingMedia>, artifacts: Vec<PendingMedia>) {
        if let Some(turn) = self.active.as_mut() {
            turn.pending_attachments = attachments;
            turn.pending_artifacts = artifacts;
        }
    }

    /// `Recording -> Saving`. Cancels the pending retry.
    pub fn begin_saving(&mut self) -> bool {
        match self.active.as_mut() {
            Some(turn) if turn.status == TurnStatus::Recording => {
                turn.retry.cancel();
                turn.status = TurnStatus::Saving;
                true
            }
            _ => false,
        }
    }

    pub fn touch(&mut self, now: Instant) {
        if let Some(turn) = self.active.as_mut() {
            turn.last_activity_at = now;
        }
    }

    /// Arm the next check while recording.
    pub fn arm(&mut self, poller: &CompletionPoller, reason: RetryReason, now: Instant) -> Option<RetryHandle> {
        let turn = self.active.as_mut().filter(|t| t.status == TurnStatus::Recording)?;
        let handle = match reason {
            RetryReason::Debounce => poller.arm_debounce(&mut turn.retry, turn.started_at, now),
            RetryReason::Poll => poller.arm_poll(&mut turn.retry, turn.started_at, now),
        };
        Some(handle)
    }

    pub fn retry_deadline(&self) -> Option<Instant> {
        self.active.as_ref().and_then(|t| t.retry.deadline())
    }

    pub fn take_due_retry(&mut self, now: Instant) -> Option<RetryHandle> {
        self.active.as_mut().and_then(|t| t.retry.take_due(now))
    }

    /// Back to idle. Cancels the pending retry and returns the dropped turn.
    pub fn reset(&mut self) -> Option<Turn> {
        let mut turn = self.active.take()?;
        turn.retry.cancel();
        debug!(status = %turn.status, "Turn reset");
        Some(turn)
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
