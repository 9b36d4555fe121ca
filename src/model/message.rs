use serde::{Deserialize, Serialize};

/// One turn in an NPC conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: String,
    pub text: String,
    pub from_player: bool,
}

impl ChatMessage {
    pub fn player(sender: &str, text: &str) -> Self {
        Self {
            sender: sender.to_string(),
            text: text.to_string(),
            from_player: true,
        }
    }

    pub fn character(sender: &str, text: &str) -> Self {
        Self {
            sender: sender.to_string(),
            text: text.to_string(),
            from_player: false,
        }
    }
}
