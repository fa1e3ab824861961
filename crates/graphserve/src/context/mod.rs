//! Context assembly for the search engines.
//!
//! A context builder turns the loaded index into the data-table text block
//! a prompt embeds, staying inside a token budget.

pub mod global;
pub mod local;

pub use global::{GlobalContextBuilder, GlobalContextParams};
pub use local::{LocalContextBuilder, LocalContextParams};

/// One prior turn of a conversation.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    /// Whether the turn came from the user (as opposed to the assistant).
    pub is_user: bool,
    pub content: String,
}

impl ConversationTurn {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            is_user: true,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            is_user: false,
            content: content.into(),
        }
    }
}

/// Keep at most the last `max_turns` turns, optionally user turns only.
#[must_use]
pub fn trim_history(
    history: &[ConversationTurn],
    max_turns: usize,
    user_turns_only: bool,
) -> Vec<&ConversationTurn> {
    let kept: Vec<&ConversationTurn> = history
        .iter()
        .filter(|t| !user_turns_only || t.is_user)
        .collect();
    let start = kept.len().saturating_sub(max_turns);
    kept[start..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_to_last_user_turns() {
        let history = vec![
            ConversationTurn::user("q1"),
            ConversationTurn::assistant("a1"),
            ConversationTurn::user("q2"),
            ConversationTurn::user("q3"),
        ];
        let kept = trim_history(&history, 2, true);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].content, "q2");
        assert_eq!(kept[1].content, "q3");
    }

    #[test]
    fn keeps_assistant_turns_when_not_user_only() {
        let history = vec![
            ConversationTurn::user("q1"),
            ConversationTurn::assistant("a1"),
        ];
        let kept = trim_history(&history, 5, false);
        assert_eq!(kept.len(), 2);
    }
}
