use super::*;
use chrono::TimeZone;

#[test]
fn test_timestamp_slug_replaces_separators() {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 20, 30).unwrap();
    let slug = timestamp_slug(at);
    assert_eq!(slug, "2024-05-01T10-20-30-000Z");
    assert!(!slug.contains(':'));
    assert!(!slug.contains('.'));
}

#[test]
fn test_safe_prompt_slug() {
    assert_eq!(safe_prompt_slug("Draw a cat!"), "Draw_a_cat_");
    assert_eq!(safe_prompt_slug("héllo"), "h_llo");
}

#[test]
fn test_safe_prompt_slug_truncates() {
    let long = "a".repeat(100);
    assert_eq!(safe_prompt_slug(&long).len(), PROMPT_SLUG_LEN);
}

#[test]
fn test_chat_source_display() {
    assert_eq!(ChatSource::Gemini.to_string(), "Gemini");
    assert_eq!(ChatSource::ChatGpt.to_string(), "ChatGPT");
}

#[test]
fn test_payload_serializes_camel_case() {
    let payload = TurnPayload {
        source: ChatSource::ChatGpt,
        title: "Cats".to_string(),
        prompt: "Draw a cat".to_string(),
        response: "Here's a cat".to_string(),
        timestamp: "2024-05-01T10-20-30-000Z".to_string(),
        safe_prompt_slug: "Draw_a_cat".to_string(),
        attachments: vec![],
        artifacts: vec![MediaEntry::new(
            "Draw_a_cat_2024-05-01T10-20-30-000Z.png",
            "https://example.com/cat.png",
            "a cat",
        )],
    };

    let json = serde_json::to_value(&payload).unwrap();
    assert_eq!(json["source"], "ChatGPT");
    assert_eq!(json["safePromptSlug"], "Draw_a_cat");
    assert_eq!(json["artifacts"][0]["resolvedUrl"], "https://example.com/cat.png");
    assert_eq!(json["artifacts"][0]["altText"], "a cat");
    assert_eq!(payload.media_count(), 1);

    let back: TurnPayload = serde_json::from_value(json).unwrap();
    assert_eq!(back, payload);
}
