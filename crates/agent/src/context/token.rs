//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~4 characters per token, counted in
//! Unicode scalar values so non-ASCII text is not over-charged. No
//! tokenizer is consulted; the estimate only has to be deterministic.

use lumen_core::message::Message;

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up. Empty → 0.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Estimate tokens for a single transcript message.
///
/// Only the text is charged; there is no per-message overhead.
pub fn estimate_message_tokens(message: &Message) -> usize {
    estimate_tokens(&message.text)
}

/// Estimate tokens for a slice of messages.
pub fn estimate_messages_tokens(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn four_chars_is_one_token() {
        assert_eq!(estimate_tokens("test"), 1);
    }

    #[test]
    fn five_chars_rounds_up() {
        assert_eq!(estimate_tokens("hello"), 2);
    }

    #[test]
    fn hundred_chars() {
        let text = "a".repeat(100);
        assert_eq!(estimate_tokens(&text), 25);
    }

    #[test]
    fn counts_characters_not_bytes() {
        // 4 characters, 8 bytes
        assert_eq!(estimate_tokens("éééé"), 1);
    }

    #[test]
    fn message_has_no_overhead() {
        let msg = Message::user("test");
        assert_eq!(estimate_message_tokens(&msg), 1);
    }

    #[test]
    fn multiple_messages() {
        let msgs = vec![Message::user("hello"), Message::assistant("world")];
        assert_eq!(estimate_messages_tokens(&msgs), 4);
    }
}
