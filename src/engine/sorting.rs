//! The sorting ceremony: a fixed run of questions, a verdict request, and a
//! dramatic pause before the house is made official.

use std::mem;
use std::time::Duration;

use crate::engine::generator::{AnsweredQuestion, ChoicePrompt};
use crate::model::profile::House;

/// How many questions the ceremony asks for in a single request.
pub const SORTING_QUESTION_TARGET: usize = 10;

/// Pause between announcing the house and handing the player the castle.
pub const REVEAL_DWELL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone)]
pub struct SortingCeremony {
    stage: SortingStage,
}

#[derive(Debug, Clone)]
enum SortingStage {
    /// Waiting for the question set.
    Fetching,
    /// Asking questions; `answers.len()` is the cursor into `questions`.
    Asking {
        questions: Vec<ChoicePrompt>,
        answers: Vec<usize>,
    },
    /// All answers in, waiting on the verdict.
    Classifying,
    /// House announced, dwell timer running.
    Revealing { house: House },
}

/// What a recorded answer means for the ceremony.
#[derive(Debug)]
pub enum SortingStep {
    NextQuestion,
    ReadyForVerdict { transcript: Vec<AnsweredQuestion> },
    Ignored,
}

impl SortingCeremony {
    pub fn new() -> Self {
        Self {
            stage: SortingStage::Fetching,
        }
    }

    /// Moves from fetching to asking. Ignored in any other stage, so a stray
    /// duplicate question set cannot restart a ceremony in progress.
    pub fn begin_asking(&mut self, questions: Vec<ChoicePrompt>) {
        if matches!(self.stage, SortingStage::Fetching) && !questions.is_empty() {
            self.stage = SortingStage::Asking {
                questions,
                answers: Vec::new(),
            };
        }
    }

    /// The question currently awaiting an answer, with its position.
    pub fn posed(&self) -> Option<(usize, usize, &ChoicePrompt)> {
        let SortingStage::Asking { questions, answers } = &self.stage else {
            return None;
        };
        let index = answers.len();
        questions.get(index).map(|q| (index, questions.len(), q))
    }

    pub fn record_answer(&mut self, option: usize) -> SortingStep {
        let SortingStage::Asking { questions, answers } = &mut self.stage else {
            return SortingStep::Ignored;
        };
        let Some(question) = questions.get(answers.len()) else {
            return SortingStep::Ignored;
        };
        if option >= question.options.len() {
            return SortingStep::Ignored;
        }

        answers.push(option);
        if answers.len() < questions.len() {
            return SortingStep::NextQuestion;
        }

        let questions = mem::take(questions);
        let answers = mem::take(answers);
        self.stage = SortingStage::Classifying;

        let transcript = questions
            .into_iter()
            .zip(answers)
            .map(|(question, chosen)| AnsweredQuestion {
                prompt: question.prompt,
                options: question.options,
                chosen,
            })
            .collect();
        SortingStep::ReadyForVerdict { transcript }
    }

    pub fn begin_reveal(&mut self, house: House) {
        self.stage = SortingStage::Revealing { house };
    }

    pub fn revealed_house(&self) -> Option<House> {
        match self.stage {
            SortingStage::Revealing { house } => Some(house),
            _ => None,
        }
    }
}

/// Filters a fetched question set down to usable entries, capped at the
/// ceremony target. An unusable set collapses to the fallback question so the
/// ceremony always has something to ask.
pub fn usable_questions(questions: Vec<ChoicePrompt>) -> Vec<ChoicePrompt> {
    let mut usable: Vec<ChoicePrompt> = questions
        .into_iter()
        .filter(|q| !q.prompt.trim().is_empty() && q.options.iter().any(|o| !o.trim().is_empty()))
        .collect();
    usable.truncate(SORTING_QUESTION_TARGET);
    if usable.is_empty() {
        usable.push(fallback_question());
    }
    usable
}

pub fn fallback_question() -> ChoicePrompt {
    ChoicePrompt {
        prompt: "The Hat clears its throat. Which virtue do you hold highest?".to_string(),
        options: vec![
            "Courage".to_string(),
            "Ambition".to_string(),
            "Wisdom".to_string(),
            "Loyalty".to_string(),
        ],
        key: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(n: usize) -> ChoicePrompt {
        ChoicePrompt {
            prompt: format!("Question {n}"),
            options: vec!["a".into(), "b".into(), "c".into()],
            key: None,
        }
    }

    #[test]
    fn asks_questions_in_order_until_the_last_answer() {
        let mut ceremony = SortingCeremony::new();
        ceremony.begin_asking(vec![question(1), question(2)]);

        let (index, total, posed) = ceremony.posed().unwrap();
        assert_eq!((index, total), (0, 2));
        assert_eq!(posed.prompt, "Question 1");

        assert!(matches!(ceremony.record_answer(0), SortingStep::NextQuestion));
        assert_eq!(ceremony.posed().unwrap().2.prompt, "Question 2");

        let SortingStep::ReadyForVerdict { transcript } = ceremony.record_answer(2) else {
            panic!("second answer should finish the ceremony");
        };
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].chosen, 0);
        assert_eq!(transcript[1].chosen, 2);
        assert!(ceremony.posed().is_none());
    }

    #[test]
    fn out_of_range_answers_are_ignored() {
        let mut ceremony = SortingCeremony::new();
        ceremony.begin_asking(vec![question(1)]);
        assert!(matches!(ceremony.record_answer(9), SortingStep::Ignored));
        assert_eq!(ceremony.posed().unwrap().0, 0);
    }

    #[test]
    fn answers_before_the_questions_arrive_are_ignored() {
        let mut ceremony = SortingCeremony::new();
        assert!(matches!(ceremony.record_answer(0), SortingStep::Ignored));
    }

    #[test]
    fn a_second_question_set_cannot_restart_the_ceremony() {
        let mut ceremony = SortingCeremony::new();
        ceremony.begin_asking(vec![question(1), question(2)]);
        ceremony.record_answer(0);
        ceremony.begin_asking(vec![question(3)]);
        assert_eq!(ceremony.posed().unwrap().2.prompt, "Question 2");
    }

    #[test]
    fn the_reveal_holds_the_house() {
        let mut ceremony = SortingCeremony::new();
        assert_eq!(ceremony.revealed_house(), None);
        ceremony.begin_reveal(House::Hufflepuff);
        assert_eq!(ceremony.revealed_house(), Some(House::Hufflepuff));
    }

    #[test]
    fn oversized_question_sets_are_truncated_to_the_target() {
        let questions: Vec<_> = (0..14).map(question).collect();
        let usable = usable_questions(questions);
        assert_eq!(usable.len(), SORTING_QUESTION_TARGET);
        assert_eq!(usable[0].prompt, "Question 0");
        assert_eq!(usable[9].prompt, "Question 9");
    }

    #[test]
    fn blank_questions_are_dropped() {
        let blank = ChoicePrompt {
            prompt: "  ".into(),
            options: vec!["a".into()],
            key: None,
        };
        let no_options = ChoicePrompt {
            prompt: "Real?".into(),
            options: vec!["  ".into()],
            key: None,
        };
        let usable = usable_questions(vec![blank, question(1), no_options]);
        assert_eq!(usable.len(), 1);
        assert_eq!(usable[0].prompt, "Question 1");
    }

    #[test]
    fn an_empty_set_falls_back_to_the_stock_question() {
        let usable = usable_questions(Vec::new());
        assert_eq!(usable.len(), 1);
        assert_eq!(usable[0].options.len(), 4);
        assert!(usable[0].prompt.contains("virtue"));
    }
}
