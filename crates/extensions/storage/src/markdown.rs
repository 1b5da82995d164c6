//! Markdown log for a saved turn.

use std::fmt::Write;

use artifact_sync_protocols::{MediaEntry, TurnPayload};

/// Folder (relative to the log) holding user-supplied media.
pub const ATTACHMENTS_DIR: &str = "attachments";

/// Folder (relative to the log) holding assistant-produced media.
pub const ARTIFACTS_DIR: &str = "artifacts";

fn media_section(out: &mut String, heading: &str, dir: &str, entries: &[MediaEntry]) {
    if entries.is_empty() {
        return;
    }
    let _ = writeln!(out, "### {}", heading);
    for entry in entries {
        let _ = writeln!(out, "![{}]({}/{})", entry.alt_text, dir, entry.filename);
    }
    out.push('\n');
}

/// Render the Markdown log for `payload`.
pub fn render_turn(payload: &TurnPayload) -> String {
    let mut out = String::new();
    let _ = write!(out, "# Turn: {}\n\n", payload.timestamp);
    let _ = write!(out, "## USER\n{}\n\n", payload.prompt);
    media_section(&mut out, "Attachments", ATTACHMENTS_DIR, &payload.attachments);
    let _ = write!(out, "## AI\n{}\n\n", payload.response);
    media_section(&mut out, "Artifacts", ARTIFACTS_DIR, &payload.artifacts);
    out
}
