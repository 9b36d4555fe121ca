//! The session state machine.
//!
//! [`Session::handle`] is the single entry point: every player command,
//! fetched result and timer arrives as an [`Inbound`] value, state changes go
//! out on the event channel, and requested side effects come back as [`Job`]s
//! for the runtime to execute. The session itself never touches the network
//! or the clock, which keeps the whole flow testable without threads.
//!
//! Each kind of in-flight request holds a token from its [`Slot`]. Tokens are
//! single use and every transition that makes a pending request meaningless
//! invalidates the slot, so late results are dropped instead of resurrecting
//! a screen the player already left.

use std::mem;
use std::sync::mpsc::Sender;

use crate::catalog::{self, START_LOCATION};
use crate::engine::classroom::{ClassQuiz, QuizAdvance, QUIZ_LENGTH};
use crate::engine::conversation::Conversation;
use crate::engine::generator::{ConversationContext, GeneratedImage, GeneratorError};
use crate::engine::protocol::{
    FetchJob, FetchPayload, GeneratorCall, Inbound, Job, RequestToken, SessionCommand,
    SessionEvent, Slot,
};
use crate::engine::sorting::{
    self, SortingCeremony, SortingStep, REVEAL_DWELL, SORTING_QUESTION_TARGET,
};
use crate::model::language::Language;
use crate::model::location::Location;
use crate::model::profile::{House, PlayerProfile};
use crate::model::task::Schedule;

pub struct Session {
    language: Language,
    profile: Option<PlayerProfile>,
    locations: Vec<Location>,
    schedule: Schedule,
    phase: Phase,
    slots: RequestSlots,
    events: Sender<SessionEvent>,
}

enum Phase {
    Start,
    Sorting(SortingCeremony),
    Gameplay(Exploration),
    ClassSession {
        suspended: Exploration,
        quiz: ClassQuiz,
    },
}

/// Where the player stands and what the location screen is showing.
struct Exploration {
    location_id: String,
    conversation: Option<Conversation>,
    image: Option<GeneratedImage>,
    vision_loading: bool,
}

impl Exploration {
    fn at(location_id: impl Into<String>) -> Self {
        Self {
            location_id: location_id.into(),
            conversation: None,
            image: None,
            vision_loading: false,
        }
    }
}

#[derive(Default)]
struct SlotState {
    current: u64,
}

impl SlotState {
    fn issue(&mut self) -> RequestToken {
        self.current += 1;
        RequestToken(self.current)
    }

    fn accepts(&self, token: RequestToken) -> bool {
        token.0 != 0 && token.0 == self.current
    }

    fn invalidate(&mut self) {
        self.current += 1;
    }
}

#[derive(Default)]
struct RequestSlots {
    sorting: SlotState,
    verdict: SlotState,
    quiz: SlotState,
    chat: SlotState,
    vision: SlotState,
}

impl RequestSlots {
    fn state(&self, slot: Slot) -> &SlotState {
        match slot {
            Slot::Sorting => &self.sorting,
            Slot::Verdict => &self.verdict,
            Slot::Quiz => &self.quiz,
            Slot::Chat => &self.chat,
            Slot::Vision => &self.vision,
        }
    }

    fn state_mut(&mut self, slot: Slot) -> &mut SlotState {
        match slot {
            Slot::Sorting => &mut self.sorting,
            Slot::Verdict => &mut self.verdict,
            Slot::Quiz => &mut self.quiz,
            Slot::Chat => &mut self.chat,
            Slot::Vision => &mut self.vision,
        }
    }

    fn invalidate_all(&mut self) {
        self.sorting.invalidate();
        self.verdict.invalidate();
        self.quiz.invalidate();
        self.chat.invalidate();
        self.vision.invalidate();
    }
}

impl Session {
    pub fn new(events: Sender<SessionEvent>, language: Language) -> Self {
        Self {
            language,
            profile: None,
            locations: catalog::initial_locations(),
            schedule: catalog::initial_schedule(),
            phase: Phase::Start,
            slots: RequestSlots::default(),
            events,
        }
    }

    pub fn handle(&mut self, inbound: Inbound) -> Vec<Job> {
        match inbound {
            Inbound::Command(command) => self.handle_command(command),
            Inbound::Fetched {
                slot,
                token,
                payload,
            } => self.handle_fetched(slot, token, payload),
            Inbound::DwellElapsed { token } => self.handle_dwell(token),
            Inbound::Shutdown => Vec::new(),
        }
    }

    fn handle_command(&mut self, command: SessionCommand) -> Vec<Job> {
        match command {
            SessionCommand::Start {
                name,
                age,
                archetype,
                credential,
            } => self.start(name, age, archetype, credential),
            SessionCommand::Answer { index } => self.answer(index),
            SessionCommand::Continue => self.continue_class(),
            SessionCommand::Move { location_id } => self.move_to(&location_id),
            SessionCommand::Talk { npc } => self.talk(&npc),
            SessionCommand::Say { text } => self.say(text),
            SessionCommand::LeaveChat => self.leave_chat(),
            SessionCommand::ShowVision => self.show_vision(),
            SessionCommand::ReviseVision { instruction } => self.revise_vision(instruction),
            SessionCommand::EnterClass => self.enter_class(),
            SessionCommand::SetLanguage(language) => self.set_language(language),
            SessionCommand::Restart => self.restart(),
        }
    }

    fn handle_fetched(
        &mut self,
        slot: Slot,
        token: RequestToken,
        payload: Result<FetchPayload, GeneratorError>,
    ) -> Vec<Job> {
        if !self.slots.state(slot).accepts(token) {
            log::debug!("dropping stale {slot:?} result");
            return Vec::new();
        }
        self.slots.state_mut(slot).invalidate();

        match slot {
            Slot::Sorting => self.sorting_questions_arrived(payload),
            Slot::Verdict => self.verdict_arrived(payload),
            Slot::Quiz => self.quiz_question_arrived(payload),
            Slot::Chat => self.chat_reply_arrived(payload),
            Slot::Vision => self.vision_arrived(payload),
        }
    }

    fn start(&mut self, name: String, age: u8, archetype: String, credential: String) -> Vec<Job> {
        if !matches!(self.phase, Phase::Start) {
            log::debug!("start ignored mid-session");
            return Vec::new();
        }
        let name = name.trim().to_string();
        if name.is_empty() {
            let _ = self.events.send(SessionEvent::StartRejected {
                reason: "a student needs a name".to_string(),
            });
            return Vec::new();
        }
        let credential = credential.trim().to_string();
        if credential.is_empty() {
            let _ = self.events.send(SessionEvent::StartRejected {
                reason: "an API key is required to reach the castle".to_string(),
            });
            return Vec::new();
        }

        let profile = PlayerProfile::new(&name, age, &archetype);
        self.profile = Some(profile.clone());
        self.phase = Phase::Sorting(SortingCeremony::new());
        let _ = self.events.send(SessionEvent::SortingBegan {
            profile: profile.clone(),
        });

        let token = self.slots.sorting.issue();
        vec![
            Job::Connect { credential },
            Job::Fetch(FetchJob {
                slot: Slot::Sorting,
                token,
                call: GeneratorCall::SortingQuestions {
                    profile,
                    count: SORTING_QUESTION_TARGET,
                    language: self.language,
                },
            }),
        ]
    }

    fn sorting_questions_arrived(&mut self, payload: Result<FetchPayload, GeneratorError>) -> Vec<Job> {
        let Phase::Sorting(ceremony) = &mut self.phase else {
            return Vec::new();
        };
        let questions = match payload {
            Ok(FetchPayload::ChoiceSet(questions)) => sorting::usable_questions(questions),
            Ok(other) => {
                log::warn!("unexpected sorting payload: {other:?}");
                vec![sorting::fallback_question()]
            }
            Err(err) => {
                log::warn!("sorting questions unavailable: {err}");
                vec![sorting::fallback_question()]
            }
        };
        ceremony.begin_asking(questions);
        if let Some((index, total, prompt)) = ceremony.posed() {
            let _ = self.events.send(SessionEvent::SortingQuestion {
                index,
                total,
                prompt: prompt.clone(),
            });
        }
        Vec::new()
    }

    fn answer(&mut self, option: usize) -> Vec<Job> {
        match &mut self.phase {
            Phase::Sorting(ceremony) => match ceremony.record_answer(option) {
                SortingStep::NextQuestion => {
                    if let Some((index, total, prompt)) = ceremony.posed() {
                        let _ = self.events.send(SessionEvent::SortingQuestion {
                            index,
                            total,
                            prompt: prompt.clone(),
                        });
                    }
                    Vec::new()
                }
                SortingStep::ReadyForVerdict { transcript } => {
                    let _ = self.events.send(SessionEvent::SortingDeliberation);
                    let Some(profile) = self.profile.clone() else {
                        return Vec::new();
                    };
                    let token = self.slots.verdict.issue();
                    vec![Job::Fetch(FetchJob {
                        slot: Slot::Verdict,
                        token,
                        call: GeneratorCall::SortingVerdict {
                            profile,
                            transcript,
                            language: self.language,
                        },
                    })]
                }
                SortingStep::Ignored => {
                    log::debug!("sorting answer ignored");
                    Vec::new()
                }
            },
            Phase::ClassSession { quiz, .. } => {
                match quiz.answer(option) {
                    Some(feedback) => {
                        let _ = self.events.send(SessionEvent::QuizFeedback {
                            correct: feedback.correct,
                            correct_index: feedback.correct_index,
                            explanation: feedback.explanation,
                            score: feedback.score,
                        });
                    }
                    None => log::debug!("quiz answer ignored"),
                }
                Vec::new()
            }
            _ => {
                log::debug!("no question awaiting an answer");
                Vec::new()
            }
        }
    }

    fn verdict_arrived(&mut self, payload: Result<FetchPayload, GeneratorError>) -> Vec<Job> {
        if !matches!(self.phase, Phase::Sorting(_)) {
            return Vec::new();
        }
        match payload {
            Ok(FetchPayload::Verdict(verdict)) => {
                let Phase::Sorting(ceremony) = &mut self.phase else {
                    return Vec::new();
                };
                ceremony.begin_reveal(verdict.house);
                let _ = self.events.send(SessionEvent::HouseRevealed {
                    house: verdict.house,
                    rationale: verdict.rationale,
                });
                // The dwell reuses the verdict slot so a restart cancels it.
                let token = self.slots.verdict.issue();
                vec![Job::Dwell {
                    token,
                    delay: REVEAL_DWELL,
                }]
            }
            Ok(other) => {
                log::warn!("unexpected verdict payload: {other:?}");
                self.finish_sorting(House::Gryffindor)
            }
            Err(err) => {
                log::warn!("sorting verdict unavailable: {err}");
                self.finish_sorting(House::Gryffindor)
            }
        }
    }

    fn handle_dwell(&mut self, token: RequestToken) -> Vec<Job> {
        if !self.slots.verdict.accepts(token) {
            log::debug!("dropping stale reveal timer");
            return Vec::new();
        }
        self.slots.verdict.invalidate();
        let Phase::Sorting(ceremony) = &self.phase else {
            return Vec::new();
        };
        let Some(house) = ceremony.revealed_house() else {
            return Vec::new();
        };
        self.finish_sorting(house)
    }

    fn finish_sorting(&mut self, house: House) -> Vec<Job> {
        let Some(profile) = &mut self.profile else {
            return Vec::new();
        };
        profile.assign_house(house);
        let profile = profile.clone();
        log::info!("{} sorted into {}", profile.name, house);

        self.phase = Phase::Gameplay(Exploration::at(START_LOCATION));
        let _ = self.events.send(SessionEvent::SortingComplete { profile });
        self.publish_location();
        self.publish_schedule();
        Vec::new()
    }

    fn move_to(&mut self, location_id: &str) -> Vec<Job> {
        let Phase::Gameplay(exploration) = &mut self.phase else {
            log::debug!("movement is only possible while exploring");
            return Vec::new();
        };
        let reachable = self
            .locations
            .iter()
            .find(|l| l.id == exploration.location_id)
            .is_some_and(|l| l.is_adjacent_to(location_id));
        if !reachable {
            log::debug!("cannot reach {location_id} from {}", exploration.location_id);
            return Vec::new();
        }

        // Chat and vision belong to the location being left.
        exploration.location_id = location_id.to_string();
        exploration.conversation = None;
        exploration.image = None;
        exploration.vision_loading = false;
        self.slots.chat.invalidate();
        self.slots.vision.invalidate();
        self.publish_location();
        Vec::new()
    }

    fn talk(&mut self, npc: &str) -> Vec<Job> {
        let Phase::Gameplay(exploration) = &mut self.phase else {
            log::debug!("talk ignored outside exploration");
            return Vec::new();
        };
        let present = self
            .locations
            .iter()
            .find(|l| l.id == exploration.location_id)
            .is_some_and(|l| l.npcs.iter().any(|name| name == npc));
        if !present {
            log::debug!("{npc} is not here");
            return Vec::new();
        }

        self.slots.chat.invalidate();
        let conversation = Conversation::begin(npc);
        let _ = self.events.send(conversation_event(&conversation));
        exploration.conversation = Some(conversation);
        Vec::new()
    }

    fn say(&mut self, text: String) -> Vec<Job> {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Vec::new();
        }
        let Some(profile) = self.profile.clone() else {
            return Vec::new();
        };
        let Phase::Gameplay(exploration) = &mut self.phase else {
            log::debug!("say ignored outside exploration");
            return Vec::new();
        };
        let Some(conversation) = exploration.conversation.as_mut() else {
            log::debug!("no conversation in progress");
            return Vec::new();
        };

        // Context is captured before the player's line is echoed.
        let tail = conversation.context_tail();
        conversation.push_player(&profile.name, text.clone());
        let _ = self.events.send(conversation_event(conversation));

        let location_name = self
            .locations
            .iter()
            .find(|l| l.id == exploration.location_id)
            .map(|l| l.name.clone())
            .unwrap_or_default();

        let token = self.slots.chat.issue();
        vec![Job::Fetch(FetchJob {
            slot: Slot::Chat,
            token,
            call: GeneratorCall::ChatReply {
                context: ConversationContext {
                    npc: conversation.npc().to_string(),
                    location_name,
                    profile,
                    language: self.language,
                },
                tail,
                message: text,
            },
        })]
    }

    fn chat_reply_arrived(&mut self, payload: Result<FetchPayload, GeneratorError>) -> Vec<Job> {
        let Phase::Gameplay(exploration) = &mut self.phase else {
            return Vec::new();
        };
        let Some(conversation) = exploration.conversation.as_mut() else {
            return Vec::new();
        };
        match payload {
            Ok(FetchPayload::Reply(reply)) => conversation.push_reply(reply),
            Ok(other) => {
                log::warn!("unexpected chat payload: {other:?}");
                conversation.push_system_filler();
            }
            Err(err) => {
                log::warn!("chat reply unavailable: {err}");
                conversation.push_system_filler();
            }
        }
        let _ = self.events.send(conversation_event(conversation));
        Vec::new()
    }

    fn leave_chat(&mut self) -> Vec<Job> {
        let Phase::Gameplay(exploration) = &mut self.phase else {
            return Vec::new();
        };
        if exploration.conversation.take().is_some() {
            self.slots.chat.invalidate();
            let _ = self.events.send(SessionEvent::ConversationEnded);
        }
        Vec::new()
    }

    fn show_vision(&mut self) -> Vec<Job> {
        let Phase::Gameplay(exploration) = &mut self.phase else {
            log::debug!("visions only come while exploring");
            return Vec::new();
        };
        let Some(description) = self
            .locations
            .iter()
            .find(|l| l.id == exploration.location_id)
            .map(|l| l.description.clone())
        else {
            return Vec::new();
        };

        exploration.vision_loading = true;
        let _ = self.events.send(SessionEvent::VisionLoading);
        let token = self.slots.vision.issue();
        vec![Job::Fetch(FetchJob {
            slot: Slot::Vision,
            token,
            call: GeneratorCall::RenderImage { description },
        })]
    }

    fn revise_vision(&mut self, instruction: String) -> Vec<Job> {
        let instruction = instruction.trim().to_string();
        if instruction.is_empty() {
            return Vec::new();
        }
        let Phase::Gameplay(exploration) = &mut self.phase else {
            log::debug!("visions only come while exploring");
            return Vec::new();
        };
        let Some(image) = exploration.image.clone() else {
            log::debug!("no vision to revise yet");
            return Vec::new();
        };

        exploration.vision_loading = true;
        let _ = self.events.send(SessionEvent::VisionLoading);
        let token = self.slots.vision.issue();
        vec![Job::Fetch(FetchJob {
            slot: Slot::Vision,
            token,
            call: GeneratorCall::ReviseImage { image, instruction },
        })]
    }

    fn vision_arrived(&mut self, payload: Result<FetchPayload, GeneratorError>) -> Vec<Job> {
        let Phase::Gameplay(exploration) = &mut self.phase else {
            return Vec::new();
        };
        exploration.vision_loading = false;
        match payload {
            Ok(FetchPayload::Image(image)) => {
                exploration.image = Some(image.clone());
                let _ = self.events.send(SessionEvent::VisionReady { image });
            }
            Ok(other) => {
                log::warn!("unexpected vision payload: {other:?}");
                let _ = self.events.send(SessionEvent::VisionFailed {
                    reason: "the vision dissolved before it formed".to_string(),
                });
            }
            // The previous image, if any, stays on display.
            Err(err) => {
                log::warn!("vision unavailable: {err}");
                let _ = self.events.send(SessionEvent::VisionFailed {
                    reason: err.to_string(),
                });
            }
        }
        Vec::new()
    }

    fn enter_class(&mut self) -> Vec<Job> {
        let Phase::Gameplay(exploration) = &mut self.phase else {
            log::debug!("classes can only start while exploring");
            return Vec::new();
        };
        let Some(task) = self.schedule.incomplete_at(&exploration.location_id) else {
            log::debug!("no class left to take here");
            return Vec::new();
        };
        let (task_id, subject) = (task.id.clone(), task.subject.clone());
        let Some(profile) = self.profile.clone() else {
            return Vec::new();
        };

        let mut suspended = match mem::replace(&mut self.phase, Phase::Start) {
            Phase::Gameplay(exploration) => exploration,
            other => {
                self.phase = other;
                return Vec::new();
            }
        };
        // Chat and vision do not survive entering a class.
        suspended.conversation = None;
        suspended.image = None;
        suspended.vision_loading = false;
        self.slots.chat.invalidate();
        self.slots.vision.invalidate();

        let quiz = ClassQuiz::new(task_id, &subject);
        self.phase = Phase::ClassSession { suspended, quiz };
        let _ = self.events.send(SessionEvent::ClassBegan {
            subject: subject.clone(),
        });

        let token = self.slots.quiz.issue();
        vec![Job::Fetch(FetchJob {
            slot: Slot::Quiz,
            token,
            call: GeneratorCall::QuizQuestion {
                subject,
                profile,
                seen_prompts: Vec::new(),
                language: self.language,
            },
        })]
    }

    fn quiz_question_arrived(&mut self, payload: Result<FetchPayload, GeneratorError>) -> Vec<Job> {
        let Phase::ClassSession { quiz, .. } = &mut self.phase else {
            return Vec::new();
        };
        let fetched = match payload {
            Ok(FetchPayload::ChoiceSet(mut questions)) => {
                if questions.is_empty() {
                    None
                } else {
                    Some(questions.remove(0))
                }
            }
            Ok(other) => {
                log::warn!("unexpected quiz payload: {other:?}");
                None
            }
            Err(err) => {
                log::warn!("quiz question unavailable: {err}");
                None
            }
        };
        if let Some((index, prompt)) = quiz.receive_question(fetched) {
            let _ = self.events.send(SessionEvent::QuizQuestion {
                index,
                total: QUIZ_LENGTH,
                prompt,
            });
        }
        Vec::new()
    }

    fn continue_class(&mut self) -> Vec<Job> {
        let Phase::ClassSession { quiz, .. } = &mut self.phase else {
            log::debug!("continue ignored outside class");
            return Vec::new();
        };
        match quiz.advance() {
            QuizAdvance::NextQuestion => {
                let Some(profile) = self.profile.clone() else {
                    return Vec::new();
                };
                let token = self.slots.quiz.issue();
                vec![Job::Fetch(FetchJob {
                    slot: Slot::Quiz,
                    token,
                    call: GeneratorCall::QuizQuestion {
                        subject: quiz.subject().to_string(),
                        profile,
                        seen_prompts: quiz.seen_prompts().to_vec(),
                        language: self.language,
                    },
                })]
            }
            QuizAdvance::Summary { score } => {
                let _ = self.events.send(SessionEvent::QuizSummary {
                    score,
                    total: QUIZ_LENGTH,
                    passed: score == QUIZ_LENGTH,
                });
                Vec::new()
            }
            QuizAdvance::Finished { passed, .. } => self.finish_class(passed),
            QuizAdvance::Ignored => {
                log::debug!("nothing to continue past");
                Vec::new()
            }
        }
    }

    fn finish_class(&mut self, passed: bool) -> Vec<Job> {
        let (suspended, quiz) = match mem::replace(&mut self.phase, Phase::Start) {
            Phase::ClassSession { suspended, quiz } => (suspended, quiz),
            other => {
                self.phase = other;
                return Vec::new();
            }
        };
        if passed {
            self.schedule.complete_task(quiz.task_id());
        }
        log::info!(
            "{}: {}/{} ({})",
            quiz.subject(),
            quiz.score(),
            QUIZ_LENGTH,
            if passed { "passed" } else { "failed" }
        );

        self.phase = Phase::Gameplay(suspended);
        let _ = self.events.send(SessionEvent::ClassEnded {
            passed,
            ratio: self.schedule.progress_ratio(),
        });
        self.publish_schedule();
        self.publish_location();
        Vec::new()
    }

    fn set_language(&mut self, language: Language) -> Vec<Job> {
        if self.language == language {
            return Vec::new();
        }
        self.language = language;
        log::info!("language set to {}", language.prompt_name());

        // Re-derive the catalog; completed classes stay completed.
        self.locations = catalog::initial_locations();
        let mut schedule = catalog::initial_schedule();
        schedule.carry_completion(&self.schedule);
        self.schedule = schedule;

        let _ = self.events.send(SessionEvent::LanguageChanged { language });
        self.publish_schedule();
        self.publish_location();
        Vec::new()
    }

    fn restart(&mut self) -> Vec<Job> {
        log::info!("session restarted");
        self.profile = None;
        self.phase = Phase::Start;
        self.locations = catalog::initial_locations();
        self.schedule = catalog::initial_schedule();
        self.slots.invalidate_all();
        let _ = self.events.send(SessionEvent::SessionReset);
        vec![Job::Disconnect]
    }

    fn publish_location(&self) {
        let Phase::Gameplay(exploration) = &self.phase else {
            return;
        };
        if let Some(location) = self.locations.iter().find(|l| l.id == exploration.location_id) {
            let _ = self.events.send(SessionEvent::EnteredLocation {
                location: location.clone(),
            });
        }
    }

    fn publish_schedule(&self) {
        let _ = self.events.send(SessionEvent::ScheduleUpdated {
            tasks: self.schedule.tasks().to_vec(),
            ratio: self.schedule.progress_ratio(),
        });
    }
}

fn conversation_event(conversation: &Conversation) -> SessionEvent {
    SessionEvent::ConversationUpdated {
        npc: conversation.npc().to_string(),
        transcript: conversation.transcript().to_vec(),
        awaiting_reply: conversation.awaiting_reply(),
    }
}
