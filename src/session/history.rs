//! Conversation history: append-only record of (user, bot) turns.

use serde::Serialize;

/// One completed conversational turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub user: String,
    pub bot: String,
}

/// Append-only history for one session.
///
/// Turns are immutable once appended. The history is read context for later
/// prompts; it plays no part in profile merging.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(transparent)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Render the history for a prompt, one `User:`/`Agent:` pair per turn.
    pub fn render_for_prompt(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("User: {}\nAgent: {}", t.user, t.bot))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_pairs_in_order() {
        let mut history = History::new();
        history.push(Turn {
            user: "Hi".to_string(),
            bot: "Hello!".to_string(),
        });
        history.push(Turn {
            user: "I'm from Canada".to_string(),
            bot: "Great!".to_string(),
        });
        assert_eq!(
            history.render_for_prompt(),
            "User: Hi\nAgent: Hello!\nUser: I'm from Canada\nAgent: Great!"
        );
    }

    #[test]
    fn serializes_as_array_of_records() {
        let mut history = History::new();
        history.push(Turn {
            user: "Hi".to_string(),
            bot: "Hello!".to_string(),
        });
        let json = serde_json::to_value(&history).unwrap();
        assert_eq!(json, serde_json::json!([{"user": "Hi", "bot": "Hello!"}]));
    }
}
