//! Fact extraction from a conversation chunk.
//!
//! Builds the structured-extraction prompt and parses the model's output
//! leniently: schema drift from the external model is an expected,
//! recoverable condition, so anything that fails to parse as a JSON fact
//! array yields zero facts for that chunk.

use serde::Deserialize;

use crate::ingest::Message;

/// System prompt instructing the model to emit a JSON fact array.
pub const EXTRACTION_PROMPT: &str = "\
You are a memory extraction system. Given a conversation snippet, extract discrete facts worth remembering long-term.

For each fact, output a JSON array of objects with these fields:
- \"user_id\": the user identifier (if identifiable), or null
- \"topic\": a short category (e.g., \"preferences\", \"projects\", \"personal\", \"technical\", \"decisions\")
- \"fact\": the specific fact in a clear, standalone sentence
- \"importance\": 1-10 (10 = critical personal info, 1 = trivial)

Rules:
- Only extract facts that would be useful to recall in future conversations
- Do NOT extract: greetings, small talk, bot responses, temporary states, or conversation mechanics
- DO extract: user preferences, decisions, project details, personal info shared voluntarily, technical choices, opinions
- Each fact must stand alone without needing the original conversation context
- If no facts are worth extracting, return an empty array: []

Output ONLY the JSON array, nothing else.";

/// One fact as the model reported it. All fields optional — the parse
/// tolerates whatever schema the model actually produced.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedFact {
    pub user_id: Option<String>,
    pub topic: Option<String>,
    pub fact: Option<String>,
    pub importance: Option<i64>,
}

/// Render a chunk as `[speaker]: content` lines for the extraction prompt.
/// Messages without content are dropped.
pub fn format_chunk(chunk: &[Message]) -> String {
    let mut lines = Vec::with_capacity(chunk.len());
    for msg in chunk {
        if msg.content.is_empty() {
            continue;
        }
        let speaker = msg.name.as_deref().unwrap_or(&msg.role);
        lines.push(format!("[{speaker}]: {}", msg.content));
    }
    lines.join("\n")
}

/// Parse model output into facts.
///
/// Tolerates markdown code fences and stray prose around the array by
/// slicing from the first `[` to the last `]`. A response that still is
/// not a valid JSON array yields an empty list, never an error.
pub fn parse_facts(raw: &str) -> Vec<ExtractedFact> {
    let trimmed = raw.trim();
    let json_str = match (trimmed.find('['), trimmed.rfind(']')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => {
            tracing::warn!("model output contained no JSON array");
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<ExtractedFact>>(json_str) {
        Ok(facts) => facts,
        Err(e) => {
            tracing::warn!(error = %e, "model output was not a fact array");
            tracing::debug!(raw, "unparseable extraction output");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_array() {
        let raw = r#"[
            {"user_id": "u1", "topic": "preferences", "fact": "Prefers dark mode", "importance": 6},
            {"user_id": null, "topic": "projects", "fact": "Is building a parser", "importance": 7}
        ]"#;
        let facts = parse_facts(raw);
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].user_id.as_deref(), Some("u1"));
        assert_eq!(facts[0].fact.as_deref(), Some("Prefers dark mode"));
        assert_eq!(facts[1].importance, Some(7));
    }

    #[test]
    fn parse_empty_array() {
        assert!(parse_facts("[]").is_empty());
    }

    #[test]
    fn parse_markdown_fence() {
        let raw = "```json\n[{\"topic\": \"personal\", \"fact\": \"Lives in Berlin\"}]\n```";
        let facts = parse_facts(raw);
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].fact.as_deref(), Some("Lives in Berlin"));
    }

    #[test]
    fn parse_with_surrounding_prose() {
        let raw = "Here are the facts:\n[{\"topic\": \"t\", \"fact\": \"Uses Rust\"}]\nThat's all.";
        let facts = parse_facts(raw);
        assert_eq!(facts.len(), 1);
    }

    #[test]
    fn parse_garbage_yields_zero_facts() {
        assert!(parse_facts("I could not find any facts, sorry!").is_empty());
        assert!(parse_facts("{\"not\": \"an array\"}").is_empty());
        assert!(parse_facts("[{broken json").is_empty());
        assert!(parse_facts("").is_empty());
    }

    #[test]
    fn parse_tolerates_missing_fields() {
        let facts = parse_facts(r#"[{"fact": "Topic-less fact"}]"#);
        assert_eq!(facts.len(), 1);
        assert!(facts[0].topic.is_none());
        assert!(facts[0].importance.is_none());
    }

    #[test]
    fn format_prefers_name_over_role() {
        let chunk = vec![
            Message {
                role: "user".into(),
                content: "my dog is Max".into(),
                name: Some("alice".into()),
            },
            Message {
                role: "assistant".into(),
                content: "Nice name!".into(),
                name: None,
            },
            Message {
                role: "user".into(),
                content: String::new(),
                name: None,
            },
        ];
        let text = format_chunk(&chunk);
        assert_eq!(text, "[alice]: my dog is Max\n[assistant]: Nice name!");
    }
}
