//! Per-provider page conventions.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use artifact_sync_protocols::ChatSource;

/// Conversation id used when the page address carries none.
///
/// Distinct unsaved conversations collide under this id.
pub const DEFAULT_CONVERSATION_ID: &str = "default";

static GEMINI_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/app/([a-zA-Z0-9]+)").expect("valid gemini path pattern"));
static CHATGPT_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/c/([a-zA-Z0-9-]+)").expect("valid chatgpt path pattern"));
static GEMINI_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*[-|\x{2013}]\s*(Gemini|Antigravity)\s*$").expect("valid gemini title pattern")
});
static CHATGPT_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*[-|\x{2013}]\s*ChatGPT\s*$").expect("valid chatgpt title pattern")
});

/// Conventions of one chat provider's page.
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    source: ChatSource,
    conversation_path: &'static Lazy<Regex>,
    title_suffix: &'static Lazy<Regex>,
}

impl ProviderProfile {
    pub fn gemini() -> Self {
        Self {
            source: ChatSource::Gemini,
            conversation_path: &GEMINI_PATH,
            title_suffix: &GEMINI_SUFFIX,
        }
    }

    pub fn chatgpt() -> Self {
        Self {
            source: ChatSource::ChatGpt,
            conversation_path: &CHATGPT_PATH,
            title_suffix: &CHATGPT_SUFFIX,
        }
    }

    pub fn for_source(source: ChatSource) -> Self {
        match source {
            ChatSource::Gemini => Self::gemini(),
            ChatSource::ChatGpt => Self::chatgpt(),
        }
    }

    pub fn source(&self) -> ChatSource {
        self.source
    }

    /// Conversation id from the page address, or [`DEFAULT_CONVERSATION_ID`].
    pub fn conversation_id(&self, page_url: &str) -> String {
        let path = Url::parse(page_url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| page_url.to_string());
        self.conversation_path
            .captures(&path)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| DEFAULT_CONVERSATION_ID.to_string())
    }

    /// Document title without the provider's site name.
    pub fn strip_title_suffix(&self, title: &str) -> String {
        let stripped = self.title_suffix.replace(title, "");
        let stripped = stripped.trim();
        if stripped.eq_ignore_ascii_case(self.source.as_str()) {
            String::new()
        } else {
            stripped.to_string()
        }
    }
}
