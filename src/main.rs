//! Terminal front-end. All game logic lives in the engine; this file only
//! turns stdin lines into commands and session events into printed output.

mod catalog;
mod engine;
mod model;

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Parser;
use colored::{ColoredString, Colorize};

use crate::engine::gemini::{GeminiClient, DEFAULT_BASE_URL, IMAGE_MODEL, TEXT_MODEL};
use crate::engine::generator::{ChoicePrompt, ContentGenerator, GeneratedImage};
use crate::engine::protocol::{Inbound, SessionCommand, SessionEvent};
use crate::engine::runtime::{ConnectFn, Runtime};
use crate::engine::session::Session;
use crate::model::language::Language;
use crate::model::location::Location;
use crate::model::profile::{House, PlayerProfile};
use crate::model::task::ClassTask;

#[derive(Parser)]
#[command(
    name = "hexhall",
    version,
    about = "An AI-driven magic school adventure in your terminal"
)]
struct Args {
    /// Gemini API key; falls back to the GEMINI_API_KEY environment variable.
    #[arg(long)]
    api_key: Option<String>,

    /// Language for generated content, as a code or name (en, zh-tw, ja, ...).
    #[arg(long, default_value = "en")]
    language: String,

    /// Override the API endpoint.
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Model used for questions, verdicts and chat.
    #[arg(long, default_value = TEXT_MODEL)]
    text_model: String,

    /// Model used for location visions.
    #[arg(long, default_value = IMAGE_MODEL)]
    image_model: String,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let language = Language::parse(&args.language)
        .ok_or_else(|| anyhow!("unknown language {:?}", args.language))?;
    let api_key = match args.api_key.clone() {
        Some(key) => key,
        None => std::env::var("GEMINI_API_KEY").unwrap_or_default(),
    };

    let (event_tx, event_rx) = mpsc::channel();
    let (inbound_tx, inbound_rx) = mpsc::channel();

    let connect: ConnectFn = {
        let base_url = args.base_url.clone();
        let text_model = args.text_model.clone();
        let image_model = args.image_model.clone();
        Box::new(move |key: &str| -> Arc<dyn ContentGenerator> {
            Arc::new(GeminiClient::new(key, &base_url, &text_model, &image_model))
        })
    };

    let session = Session::new(event_tx, language);
    let runtime = Runtime::new(session, inbound_rx, inbound_tx.clone(), connect);
    let runtime_handle = thread::spawn(move || runtime.run());
    let stdin_rx = spawn_stdin_reader();

    let mut ui = Ui::new(inbound_tx.clone(), api_key);
    ui.greet();

    loop {
        loop {
            match event_rx.try_recv() {
                Ok(event) => ui.render(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    ui.quit = true;
                    break;
                }
            }
        }
        if ui.quit {
            break;
        }
        match stdin_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(line) => ui.dispatch(&line),
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    let _ = inbound_tx.send(Inbound::Shutdown);
    let _ = runtime_handle.join();
    Ok(())
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// What the player is being asked for before the session starts.
enum Enrolment {
    Name,
    Age { name: String },
    Archetype { name: String, age: u8 },
    Done,
}

struct Ui {
    inbound: Sender<Inbound>,
    api_key: String,
    enrolment: Enrolment,
    profile: Option<PlayerProfile>,
    location: Option<Location>,
    tasks: Vec<ClassTask>,
    ratio: f32,
    /// Transcript lines already printed, so updates only show the delta.
    transcript_len: usize,
    vision_count: usize,
    quit: bool,
}

impl Ui {
    fn new(inbound: Sender<Inbound>, api_key: String) -> Self {
        Self {
            inbound,
            api_key,
            enrolment: Enrolment::Name,
            profile: None,
            location: None,
            tasks: Vec::new(),
            ratio: 0.0,
            transcript_len: 0,
            vision_count: 0,
            quit: false,
        }
    }

    fn greet(&self) {
        println!("{}", "HEXHALL".bold());
        println!("A year at the castle, one command at a time. Type 'help' at any point.");
        println!();
        println!("What is your name?");
    }

    fn send(&self, command: SessionCommand) {
        let _ = self.inbound.send(Inbound::Command(command));
    }

    fn dispatch(&mut self, line: &str) {
        let line = line.trim();
        // Quitting works even from the enrolment prompts.
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            self.quit = true;
            return;
        }
        match &self.enrolment {
            Enrolment::Name => {
                if line.is_empty() {
                    println!("What is your name?");
                    return;
                }
                self.enrolment = Enrolment::Age {
                    name: line.to_string(),
                };
                println!("How old are you? [11]");
                return;
            }
            Enrolment::Age { name } => {
                let age = if line.is_empty() {
                    Some(11)
                } else {
                    line.parse::<u8>().ok()
                };
                let Some(age) = age else {
                    println!("Ages are numbers here. How old are you? [11]");
                    return;
                };
                self.enrolment = Enrolment::Archetype {
                    name: name.clone(),
                    age,
                };
                println!("Witch, Wizard or Mage? [Witch]");
                return;
            }
            Enrolment::Archetype { name, age } => {
                let archetype = if line.is_empty() {
                    "Witch".to_string()
                } else {
                    line.to_string()
                };
                let (name, age) = (name.clone(), *age);
                self.enrolment = Enrolment::Done;
                self.send(SessionCommand::Start {
                    name,
                    age,
                    archetype,
                    credential: self.api_key.clone(),
                });
                return;
            }
            Enrolment::Done => {}
        }

        // A bare number answers whatever question is posed.
        if let Ok(n) = line.parse::<usize>() {
            if n >= 1 {
                self.send(SessionCommand::Answer { index: n - 1 });
            } else {
                println!("Options start at 1.");
            }
            return;
        }
        if line.is_empty() {
            self.send(SessionCommand::Continue);
            return;
        }

        let (command, rest) = match line.split_once(' ') {
            Some((head, tail)) => (head, tail.trim()),
            None => (line, ""),
        };
        match (command.to_ascii_lowercase().as_str(), rest) {
            ("quit", _) | ("exit", _) => self.quit = true,
            ("help", _) | ("?", _) => print_help(),
            ("look", _) => self.print_location(),
            ("me", _) => self.print_profile(),
            ("tasks", _) | ("schedule", _) => self.print_tasks(),
            ("continue", _) | ("c", _) => self.send(SessionCommand::Continue),
            ("class", _) => self.send(SessionCommand::EnterClass),
            ("vision", _) | ("image", _) => self.send(SessionCommand::ShowVision),
            ("leave", _) => self.send(SessionCommand::LeaveChat),
            ("restart", _) => self.send(SessionCommand::Restart),
            ("go", "") | ("move", "") => println!("Go where? Check 'look' for exits."),
            ("go", target) | ("move", target) => self.send(SessionCommand::Move {
                location_id: target.to_string(),
            }),
            ("talk", "") => println!("Talk to whom?"),
            ("talk", who) => match self.resolve_npc(who) {
                Some(npc) => self.send(SessionCommand::Talk { npc }),
                None => println!("No one by that name here."),
            },
            ("say", "") => println!("Say what?"),
            ("say", text) => self.send(SessionCommand::Say {
                text: text.to_string(),
            }),
            ("alter", "") => println!("Describe the change you want."),
            ("alter", instruction) => self.send(SessionCommand::ReviseVision {
                instruction: instruction.to_string(),
            }),
            ("answer", n) => match n.parse::<usize>() {
                Ok(n) if n >= 1 => self.send(SessionCommand::Answer { index: n - 1 }),
                _ => println!("Answer with a number, e.g. 'answer 2'."),
            },
            ("lang", "") => println!("Which language? en, zh-tw, ja, ko, es, fr, de."),
            ("lang", code) => match Language::parse(code) {
                Some(language) => self.send(SessionCommand::SetLanguage(language)),
                None => println!("Unknown language. Try: en, zh-tw, ja, ko, es, fr, de."),
            },
            _ => println!("Unknown command. Type 'help'."),
        }
    }

    /// Case-insensitive match against the characters present, preferring an
    /// exact name over a partial one.
    fn resolve_npc(&self, query: &str) -> Option<String> {
        let location = self.location.as_ref()?;
        let query = query.to_ascii_lowercase();
        location
            .npcs
            .iter()
            .find(|npc| npc.to_ascii_lowercase() == query)
            .or_else(|| {
                location
                    .npcs
                    .iter()
                    .find(|npc| npc.to_ascii_lowercase().contains(&query))
            })
            .cloned()
    }

    fn render(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::StartRejected { reason } => {
                println!("{} {}", "The gates stay shut:".red(), reason);
                if self.api_key.is_empty() {
                    println!(
                        "Provide a key with --api-key or the GEMINI_API_KEY environment variable."
                    );
                }
                self.quit = true;
            }
            SessionEvent::SortingBegan { profile } => {
                println!();
                println!(
                    "Welcome, {}. The Sorting Hat is warming up...",
                    profile.name.bold()
                );
                self.profile = Some(profile);
            }
            SessionEvent::SortingQuestion {
                index,
                total,
                prompt,
            } => print_question(index, total, &prompt),
            SessionEvent::SortingDeliberation => {
                println!();
                println!("{}", "The Hat hums and mutters to itself...".italic());
            }
            SessionEvent::HouseRevealed { house, rationale } => {
                println!();
                println!("{} {}", "The Hat cries:".bold(), house_colored(house));
                println!("{}", rationale.italic());
            }
            SessionEvent::SortingComplete { profile } => {
                self.profile = Some(profile);
            }
            SessionEvent::EnteredLocation { location } => {
                self.location = Some(location);
                self.transcript_len = 0;
                self.print_location();
            }
            SessionEvent::ScheduleUpdated { tasks, ratio } => {
                self.tasks = tasks;
                self.ratio = ratio;
            }
            SessionEvent::ConversationUpdated {
                npc,
                transcript,
                awaiting_reply,
            } => {
                for turn in transcript.iter().skip(self.transcript_len) {
                    let name = if turn.from_player {
                        turn.sender.bold()
                    } else {
                        turn.sender.cyan()
                    };
                    println!("{}: {}", name, turn.text);
                }
                self.transcript_len = transcript.len();
                if awaiting_reply {
                    println!("{}", format!("{npc} considers...").dimmed());
                }
            }
            SessionEvent::ConversationEnded => {
                self.transcript_len = 0;
                println!("You step away from the conversation.");
            }
            SessionEvent::VisionLoading => {
                println!("{}", "A vision gathers in the air...".dimmed());
            }
            SessionEvent::VisionReady { image } => self.save_vision(&image),
            SessionEvent::VisionFailed { reason } => {
                println!("{} {}", "The vision fades:".yellow(), reason);
            }
            SessionEvent::ClassBegan { subject } => {
                println!();
                println!("{} {}", "Class begins:".bold(), subject);
                println!("Ten questions stand between you and the credit.");
            }
            SessionEvent::QuizQuestion {
                index,
                total,
                prompt,
            } => print_question(index, total, &prompt),
            SessionEvent::QuizFeedback {
                correct,
                correct_index,
                explanation,
                score,
            } => {
                if correct {
                    println!("{}", "Correct!".green().bold());
                } else {
                    println!(
                        "{} The answer was {}.",
                        "Not quite.".red().bold(),
                        correct_index + 1
                    );
                }
                if !explanation.is_empty() {
                    println!("{}", explanation.italic());
                }
                println!("Score so far: {score}. Press Enter to continue.");
            }
            SessionEvent::QuizSummary {
                score,
                total,
                passed,
            } => {
                println!();
                if passed {
                    println!("{} {score}/{total}.", "Outstanding!".green().bold());
                } else {
                    println!(
                        "{} {score}/{total}. Only a perfect score earns the credit.",
                        "Class over.".yellow()
                    );
                }
                println!("Press Enter to return to the castle.");
            }
            SessionEvent::ClassEnded { passed, ratio } => {
                if passed {
                    println!("{}", "The task is marked complete on your schedule.".green());
                }
                println!("Year progress: {:.0}%", ratio * 100.0);
            }
            SessionEvent::LanguageChanged { language } => {
                println!("The castle now speaks {}.", language.prompt_name());
            }
            SessionEvent::SessionReset => {
                self.profile = None;
                self.location = None;
                self.tasks.clear();
                self.ratio = 0.0;
                self.transcript_len = 0;
                self.enrolment = Enrolment::Name;
                println!();
                println!("The year begins anew. What is your name?");
            }
        }
        io::stdout().flush().ok();
    }

    fn print_location(&self) {
        let Some(location) = &self.location else {
            println!("You are nowhere yet.");
            return;
        };
        println!();
        println!("{}", location.name.bold().underline());
        println!("{}", location.description);
        if !location.npcs.is_empty() {
            println!("Here: {}", location.npcs.join(", "));
        }
        println!("Exits: {}", location.connected_to.join(", "));
        if let Some(task) = self
            .tasks
            .iter()
            .find(|t| t.location_id == location.id && !t.completed)
        {
            println!(
                "{} {}. Type 'class' to attend.",
                "Class on offer:".magenta(),
                task.subject
            );
        }
    }

    fn print_profile(&self) {
        let Some(profile) = &self.profile else {
            println!("Nobody is enrolled yet.");
            return;
        };
        println!(
            "{}, age {}, {} of house {}",
            profile.name.bold(),
            profile.age,
            profile.archetype,
            house_colored(profile.house)
        );
        let stats = &profile.stats;
        println!(
            "Int {} / Cou {} / Amb {} / Loy {}",
            stats.intelligence, stats.courage, stats.ambition, stats.loyalty
        );
    }

    fn print_tasks(&self) {
        if self.tasks.is_empty() {
            println!("The schedule is still blank.");
            return;
        }
        println!();
        println!("{}", "Year One Schedule".bold());
        for task in &self.tasks {
            let mark = if task.completed {
                "x".green()
            } else {
                " ".normal()
            };
            println!("[{}] {}: {}", mark, task.subject, task.description);
        }
        println!("Progress: {:.0}%", self.ratio * 100.0);
    }

    fn save_vision(&mut self, image: &GeneratedImage) {
        self.vision_count += 1;
        let extension = match image.mime.as_str() {
            "image/jpeg" => "jpg",
            _ => "png",
        };
        let path = std::env::temp_dir().join(format!(
            "hexhall-vision-{:02}.{}",
            self.vision_count, extension
        ));
        match std::fs::write(&path, &image.bytes) {
            Ok(()) => println!(
                "{} Saved to {}",
                "The vision settles.".cyan(),
                path.display()
            ),
            Err(err) => println!("The vision could not be kept: {err}"),
        }
    }
}

fn print_question(index: usize, total: usize, prompt: &ChoicePrompt) {
    println!();
    println!("{}", format!("Question {} of {}", index + 1, total).bold());
    println!("{}", prompt.prompt);
    for (i, option) in prompt.options.iter().enumerate() {
        println!("  {}. {}", i + 1, option);
    }
    println!("Answer with a number (1-{}).", prompt.options.len());
}

fn house_colored(house: House) -> ColoredString {
    let name = house.display_name();
    match house {
        House::Gryffindor => name.red().bold(),
        House::Slytherin => name.green().bold(),
        House::Ravenclaw => name.blue().bold(),
        House::Hufflepuff => name.yellow().bold(),
        House::Unsorted => name.dimmed(),
    }
}

fn print_help() {
    println!("Commands:");
    println!("  look                 describe where you are");
    println!("  go <location-id>     move to an adjacent location");
    println!("  talk <name>          start a conversation");
    println!("  say <message>        speak in the conversation");
    println!("  leave                end the conversation");
    println!("  vision               conjure an image of this place");
    println!("  alter <instruction>  revise the current vision");
    println!("  class                attend the class held here");
    println!("  answer <n>           answer the posed question (a bare number works too)");
    println!("  continue             advance past feedback (Enter works too)");
    println!("  tasks                show the year's schedule");
    println!("  me                   show your profile");
    println!("  lang <code>          switch content language (en, zh-tw, ja, ko, es, fr, de)");
    println!("  restart              start the year over");
    println!("  quit                 leave the castle");
}
