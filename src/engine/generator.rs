use std::fmt;

use thiserror::Error;

use crate::model::language::Language;
use crate::model::message::ChatMessage;
use crate::model::profile::{House, PlayerProfile};

/// Interface to the generative backend. Calls are blocking; the runtime runs
/// them on worker threads and feeds the results back to the session.
pub trait ContentGenerator: Send + Sync {
    /// Generates a batch of multiple-choice prompts. Sorting requests return
    /// up to `count` questions without answer keys; quiz requests return a
    /// single keyed question.
    fn generate_choice_set(
        &self,
        request: &ChoiceSetRequest,
        language: Language,
    ) -> Result<Vec<ChoicePrompt>, GeneratorError>;

    /// Reads a finished sorting transcript and names a house.
    fn classify(
        &self,
        profile: &PlayerProfile,
        transcript: &[AnsweredQuestion],
        language: Language,
    ) -> Result<Classification, GeneratorError>;

    /// Produces an in-character reply to the player's latest message.
    fn converse(
        &self,
        context: &ConversationContext,
        tail: &[ChatMessage],
        message: &str,
    ) -> Result<String, GeneratorError>;

    fn render_image(&self, description: &str) -> Result<GeneratedImage, GeneratorError>;

    fn revise_image(
        &self,
        image: &GeneratedImage,
        instruction: &str,
    ) -> Result<GeneratedImage, GeneratorError>;
}

#[derive(Debug, Clone)]
pub enum ChoiceSetRequest {
    Sorting {
        profile: PlayerProfile,
        count: usize,
    },
    Quiz {
        subject: String,
        profile: PlayerProfile,
        seen_prompts: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChoicePrompt {
    pub prompt: String,
    pub options: Vec<String>,
    pub key: Option<AnswerKey>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerKey {
    pub correct_index: usize,
    pub explanation: String,
}

/// One answered sorting question, as handed to `classify`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnsweredQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    pub chosen: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub house: House,
    pub rationale: String,
}

#[derive(Clone, PartialEq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl fmt::Debug for GeneratedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedImage")
            .field("mime", &self.mime)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversationContext {
    pub npc: String,
    pub location_name: String,
    pub profile: PlayerProfile,
    pub language: Language,
}

/// All generator failures are recoverable; the session substitutes fallback
/// content instead of surfacing them to the player.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeneratorError {
    #[error("content request failed: {0}")]
    RequestFailed(String),
    #[error("malformed content response: {0}")]
    InvalidResponse(String),
    #[error("empty content response")]
    EmptyResponse,
}
