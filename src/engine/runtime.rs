//! Drives a [`Session`] on a dedicated thread.
//!
//! The runtime owns the inbound queue. Jobs returned by the session are
//! executed here: generator calls run on short-lived worker threads and feed
//! their results back through the loopback sender, so slow requests never
//! block command handling.

use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread;

use crate::engine::generator::{ChoiceSetRequest, ContentGenerator, GeneratorError};
use crate::engine::protocol::{FetchJob, FetchPayload, GeneratorCall, Inbound, Job};
use crate::engine::session::Session;

/// Builds a generator from the credential carried by [`Job::Connect`].
pub type ConnectFn = Box<dyn Fn(&str) -> Arc<dyn ContentGenerator> + Send>;

pub struct Runtime {
    session: Session,
    inbound: Receiver<Inbound>,
    loopback: Sender<Inbound>,
    connect: ConnectFn,
    generator: Option<Arc<dyn ContentGenerator>>,
}

impl Runtime {
    pub fn new(
        session: Session,
        inbound: Receiver<Inbound>,
        loopback: Sender<Inbound>,
        connect: ConnectFn,
    ) -> Self {
        Self {
            session,
            inbound,
            loopback,
            connect,
            generator: None,
        }
    }

    /// Runs until [`Inbound::Shutdown`] arrives. The loopback sender keeps
    /// the channel alive, so shutdown is explicit rather than by disconnect.
    pub fn run(mut self) {
        while let Ok(inbound) = self.inbound.recv() {
            let shutdown = matches!(inbound, Inbound::Shutdown);
            for job in self.session.handle(inbound) {
                self.execute(job);
            }
            if shutdown {
                break;
            }
        }
        log::debug!("session runtime stopped");
    }

    fn execute(&mut self, job: Job) {
        match job {
            Job::Connect { credential } => {
                self.generator = Some((self.connect)(&credential));
            }
            Job::Disconnect => {
                self.generator = None;
            }
            Job::Dwell { token, delay } => {
                let loopback = self.loopback.clone();
                thread::spawn(move || {
                    thread::sleep(delay);
                    let _ = loopback.send(Inbound::DwellElapsed { token });
                });
            }
            Job::Fetch(fetch) => self.spawn_fetch(fetch),
        }
    }

    fn spawn_fetch(&self, fetch: FetchJob) {
        let FetchJob { slot, token, call } = fetch;
        let Some(generator) = self.generator.clone() else {
            let _ = self.loopback.send(Inbound::Fetched {
                slot,
                token,
                payload: Err(GeneratorError::RequestFailed("no generator connected".into())),
            });
            return;
        };
        let loopback = self.loopback.clone();
        thread::spawn(move || {
            let payload = run_call(generator.as_ref(), call);
            let _ = loopback.send(Inbound::Fetched { slot, token, payload });
        });
    }
}

fn run_call(
    generator: &dyn ContentGenerator,
    call: GeneratorCall,
) -> Result<FetchPayload, GeneratorError> {
    match call {
        GeneratorCall::SortingQuestions {
            profile,
            count,
            language,
        } => generator
            .generate_choice_set(&ChoiceSetRequest::Sorting { profile, count }, language)
            .map(FetchPayload::ChoiceSet),
        GeneratorCall::SortingVerdict {
            profile,
            transcript,
            language,
        } => generator
            .classify(&profile, &transcript, language)
            .map(FetchPayload::Verdict),
        GeneratorCall::QuizQuestion {
            subject,
            profile,
            seen_prompts,
            language,
        } => generator
            .generate_choice_set(
                &ChoiceSetRequest::Quiz {
                    subject,
                    profile,
                    seen_prompts,
                },
                language,
            )
            .map(FetchPayload::ChoiceSet),
        GeneratorCall::ChatReply {
            context,
            tail,
            message,
        } => generator
            .converse(&context, &tail, &message)
            .map(FetchPayload::Reply),
        GeneratorCall::RenderImage { description } => generator
            .render_image(&description)
            .map(FetchPayload::Image),
        GeneratorCall::ReviseImage { image, instruction } => generator
            .revise_image(&image, &instruction)
            .map(FetchPayload::Image),
    }
}
