use std::time::Duration;

use crate::engine::generator::{
    AnsweredQuestion, ChoicePrompt, Classification, ConversationContext, GeneratedImage,
    GeneratorError,
};
use crate::model::language::Language;
use crate::model::location::Location;
use crate::model::message::ChatMessage;
use crate::model::profile::{House, PlayerProfile};
use crate::model::task::ClassTask;

/// Player intents, as sent by a front-end.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    Start {
        name: String,
        age: u8,
        archetype: String,
        credential: String,
    },
    /// Picks an option for whatever question is currently posed, sorting or
    /// quiz. Ignored when nothing is being asked.
    Answer { index: usize },
    /// Advances past quiz feedback or the quiz summary.
    Continue,
    Move { location_id: String },
    Talk { npc: String },
    Say { text: String },
    LeaveChat,
    ShowVision,
    ReviseVision { instruction: String },
    EnterClass,
    SetLanguage(Language),
    Restart,
}

/// State changes pushed to whoever is rendering the session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StartRejected { reason: String },
    SortingBegan { profile: PlayerProfile },
    SortingQuestion { index: usize, total: usize, prompt: ChoicePrompt },
    SortingDeliberation,
    HouseRevealed { house: House, rationale: String },
    SortingComplete { profile: PlayerProfile },
    EnteredLocation { location: Location },
    ScheduleUpdated { tasks: Vec<ClassTask>, ratio: f32 },
    ConversationUpdated {
        npc: String,
        transcript: Vec<ChatMessage>,
        awaiting_reply: bool,
    },
    ConversationEnded,
    VisionLoading,
    VisionReady { image: GeneratedImage },
    VisionFailed { reason: String },
    ClassBegan { subject: String },
    QuizQuestion { index: usize, total: usize, prompt: ChoicePrompt },
    QuizFeedback {
        correct: bool,
        correct_index: usize,
        explanation: String,
        score: usize,
    },
    QuizSummary { score: usize, total: usize, passed: bool },
    ClassEnded { passed: bool, ratio: f32 },
    LanguageChanged { language: Language },
    SessionReset,
}

/// Everything the session thread can receive on its single inbound queue.
#[derive(Debug)]
pub enum Inbound {
    Command(SessionCommand),
    Fetched {
        slot: Slot,
        token: RequestToken,
        payload: Result<FetchPayload, GeneratorError>,
    },
    DwellElapsed { token: RequestToken },
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum FetchPayload {
    ChoiceSet(Vec<ChoicePrompt>),
    Verdict(Classification),
    Reply(String),
    Image(GeneratedImage),
}

/// One slot per kind of in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Sorting,
    Verdict,
    Quiz,
    Chat,
    Vision,
}

/// Monotonic per-slot token. A response is applied only while its token is
/// still the slot's current one; anything else is stale and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken(pub u64);

/// Side effects the session asks the runtime to perform.
#[derive(Debug)]
pub enum Job {
    Connect { credential: String },
    Disconnect,
    Fetch(FetchJob),
    Dwell { token: RequestToken, delay: Duration },
}

#[derive(Debug)]
pub struct FetchJob {
    pub slot: Slot,
    pub token: RequestToken,
    pub call: GeneratorCall,
}

#[derive(Debug, Clone)]
pub enum GeneratorCall {
    SortingQuestions {
        profile: PlayerProfile,
        count: usize,
        language: Language,
    },
    SortingVerdict {
        profile: PlayerProfile,
        transcript: Vec<AnsweredQuestion>,
        language: Language,
    },
    QuizQuestion {
        subject: String,
        profile: PlayerProfile,
        seen_prompts: Vec<String>,
        language: Language,
    },
    ChatReply {
        context: ConversationContext,
        tail: Vec<ChatMessage>,
        message: String,
    },
    RenderImage { description: String },
    ReviseImage {
        image: GeneratedImage,
        instruction: String,
    },
}
