//! Context strategy for managing the conversation window.
//!
//! The [`ContextStrategy`] trait handles client-side context compaction.
//! Provider-native truncation is invisible to the strategy, handled by the
//! `LlmProvider` impl internally.

use crate::types::Message;

/// Strategy for managing context window size.
///
/// Implementations: `NoCompaction` (passthrough), `SlidingWindow`
/// (drop oldest messages).
pub trait ContextStrategy: Send + Sync {
    /// Estimate token count for a message list.
    fn token_estimate(&self, messages: &[Message]) -> usize;

    /// Whether compaction should run given the current messages and limit.
    fn should_compact(&self, messages: &[Message], limit: usize) -> bool;

    /// Compact the message list. Returns a shorter list.
    fn compact(&self, messages: Vec<Message>) -> Vec<Message>;
}

/// A no-op context strategy that never compacts.
///
/// Useful for short conversations or when the provider handles
/// truncation natively.
pub struct NoCompaction;

impl ContextStrategy for NoCompaction {
    fn token_estimate(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| m.content.len() / 4).sum()
    }

    fn should_compact(&self, _messages: &[Message], _limit: usize) -> bool {
        false
    }

    fn compact(&self, messages: Vec<Message>) -> Vec<Message> {
        messages
    }
}

/// Drops the oldest messages once the estimated token count exceeds
/// `limit`, always keeping the most recent `keep_last` messages intact so
/// an in-flight tool call/result pair is never split.
pub struct SlidingWindow {
    /// Minimum number of trailing messages to always retain.
    pub keep_last: usize,
}

impl ContextStrategy for SlidingWindow {
    fn token_estimate(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| m.content.len() / 4).sum()
    }

    fn should_compact(&self, messages: &[Message], limit: usize) -> bool {
        self.token_estimate(messages) > limit
    }

    fn compact(&self, messages: Vec<Message>) -> Vec<Message> {
        if messages.len() <= self.keep_last {
            return messages;
        }
        let drop = messages.len() - self.keep_last;
        messages.into_iter().skip(drop).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn msg(text: &str) -> Message {
        Message::new(Role::User, text)
    }

    #[test]
    fn no_compaction_never_compacts() {
        let strategy = NoCompaction;
        let messages = vec![msg("hello")];

        assert!(!strategy.should_compact(&messages, 100));
        let compacted = strategy.compact(messages.clone());
        assert_eq!(compacted.len(), messages.len());
    }

    #[test]
    fn no_compaction_estimates_tokens() {
        let strategy = NoCompaction;
        let messages = vec![msg(&"a".repeat(400))];

        let estimate = strategy.token_estimate(&messages);
        assert_eq!(estimate, 100);
    }

    #[test]
    fn sliding_window_keeps_recent_tail() {
        let strategy = SlidingWindow { keep_last: 2 };
        let messages = vec![msg("one"), msg("two"), msg("three")];

        let compacted = strategy.compact(messages);
        assert_eq!(compacted.len(), 2);
        assert_eq!(compacted[0].content, "two");
        assert_eq!(compacted[1].content, "three");
    }

    #[test]
    fn sliding_window_noop_when_under_keep_last() {
        let strategy = SlidingWindow { keep_last: 5 };
        let messages = vec![msg("one"), msg("two")];

        let compacted = strategy.compact(messages.clone());
        assert_eq!(compacted.len(), messages.len());
    }
}
