//! Transcript chunking.
//!
//! Splits an ordered message list into overlapping chunks sized for one
//! extraction call. Token counts are approximated from character counts —
//! the split only needs a stable size estimate, not the target model's
//! exact tokenizer.

use crate::ingest::Message;

/// Approximate characters per model token.
const CHARS_PER_TOKEN: usize = 4;
/// Per-message framing overhead in characters (speaker label, brackets,
/// newline).
const MESSAGE_OVERHEAD: usize = 10;

/// Split messages into chunks of at most `chunk_tokens` approximate tokens,
/// with roughly `overlap_tokens` of trailing context repeated at the start
/// of the next chunk. Chunks always break on message boundaries, so a chunk
/// never starts mid-utterance.
pub fn chunk_messages(
    messages: &[Message],
    chunk_tokens: usize,
    overlap_tokens: usize,
) -> Vec<Vec<Message>> {
    let max_chars = chunk_tokens * CHARS_PER_TOKEN;
    let overlap_chars = overlap_tokens * CHARS_PER_TOKEN;

    let mut chunks: Vec<Vec<Message>> = Vec::new();
    let mut current: Vec<Message> = Vec::new();
    let mut current_size = 0usize;

    for msg in messages {
        let msg_size = msg.content.len() + msg.role.len() + MESSAGE_OVERHEAD;

        if current_size + msg_size > max_chars && !current.is_empty() {
            // Seed the next chunk with whole trailing messages from this
            // one, up to the overlap budget.
            let mut overlap: Vec<Message> = Vec::new();
            let mut overlap_size = 0usize;
            for m in current.iter().rev() {
                let m_size = m.content.len() + MESSAGE_OVERHEAD;
                if overlap_size + m_size > overlap_chars {
                    break;
                }
                overlap.insert(0, m.clone());
                overlap_size += m_size;
            }
            chunks.push(std::mem::take(&mut current));
            current = overlap;
            current_size = overlap_size;
        }

        current.push(msg.clone());
        current_size += msg_size;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(content: &str) -> Message {
        Message {
            role: "user".into(),
            content: content.into(),
            name: None,
        }
    }

    #[test]
    fn short_transcript_is_one_chunk() {
        let messages = vec![msg("hello"), msg("short conversation")];
        let chunks = chunk_messages(&messages, 2048, 256);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 2);
    }

    #[test]
    fn long_transcript_splits_with_overlap() {
        // 40 messages of ~100 chars ≈ 4400 chars; chunk budget of 256
        // tokens = 1024 chars forces several splits.
        let messages: Vec<Message> = (0..40)
            .map(|i| msg(&format!("message number {i} with some padding text {}", "x".repeat(60))))
            .collect();
        let chunks = chunk_messages(&messages, 256, 64);
        assert!(chunks.len() >= 2);

        // The overlap region is non-empty: each chunk after the first
        // starts with the trailing messages of its predecessor.
        for pair in chunks.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            let first_of_next = &next[0].content;
            assert!(
                prev.iter().any(|m| &m.content == first_of_next),
                "chunk should start with overlap from its predecessor"
            );
        }
    }

    #[test]
    fn messages_are_never_split() {
        let messages: Vec<Message> = (0..10).map(|i| msg(&format!("m{i} {}", "y".repeat(200)))).collect();
        let chunks = chunk_messages(&messages, 100, 25);

        let originals: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        for chunk in &chunks {
            for m in chunk {
                assert!(originals.contains(&m.content.as_str()));
            }
        }
    }

    #[test]
    fn every_message_lands_in_some_chunk() {
        let messages: Vec<Message> = (0..25).map(|i| msg(&format!("unique-{i} {}", "z".repeat(80)))).collect();
        let chunks = chunk_messages(&messages, 128, 32);

        for m in &messages {
            assert!(
                chunks.iter().any(|c| c.iter().any(|cm| cm.content == m.content)),
                "message {} missing from all chunks",
                m.content
            );
        }
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk_messages(&[], 2048, 256).is_empty());
    }

    #[test]
    fn oversized_single_message_still_chunks() {
        let messages = vec![msg(&"a".repeat(20_000))];
        let chunks = chunk_messages(&messages, 256, 64);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 1);
    }
}
