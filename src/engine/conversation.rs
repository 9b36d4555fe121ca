//! Chat state for a single character at the current location.

use crate::model::message::ChatMessage;

/// How many trailing messages accompany each reply request.
pub const CONTEXT_TURNS: usize = 5;

/// Placeholder text for a character who has not spoken yet.
pub const THINKING_PLACEHOLDER: &str = "...";

#[derive(Debug, Clone)]
pub struct Conversation {
    npc: String,
    transcript: Vec<ChatMessage>,
    awaiting_reply: bool,
}

impl Conversation {
    /// Opens a chat with `npc`, seeded with their silent opening line.
    pub fn begin(npc: impl Into<String>) -> Self {
        let npc = npc.into();
        let transcript = vec![ChatMessage::character(&npc, THINKING_PLACEHOLDER)];
        Self {
            npc,
            transcript,
            awaiting_reply: false,
        }
    }

    pub fn npc(&self) -> &str {
        &self.npc
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    /// The trailing window sent as context, taken before the player's next
    /// message is echoed into the transcript.
    pub fn context_tail(&self) -> Vec<ChatMessage> {
        let skip = self.transcript.len().saturating_sub(CONTEXT_TURNS);
        self.transcript[skip..].to_vec()
    }

    pub fn push_player(&mut self, name: &str, text: impl Into<String>) {
        self.transcript.push(ChatMessage::player(name, &text.into()));
        self.awaiting_reply = true;
    }

    pub fn push_reply(&mut self, text: impl Into<String>) {
        let turn = ChatMessage::character(&self.npc, &text.into());
        self.transcript.push(turn);
        self.awaiting_reply = false;
    }

    /// Stands in for a reply that never arrived.
    pub fn push_system_filler(&mut self) {
        self.transcript.push(ChatMessage::character("System", THINKING_PLACEHOLDER));
        self.awaiting_reply = false;
    }
}
