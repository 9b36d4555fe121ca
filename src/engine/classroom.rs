//! A class session: a scored run of quiz questions fetched one at a time.

use crate::engine::generator::{AnswerKey, ChoicePrompt};

/// Questions per class. The class is only passed with a perfect score.
pub const QUIZ_LENGTH: usize = 10;

#[derive(Debug, Clone)]
pub struct ClassQuiz {
    task_id: String,
    subject: String,
    stage: QuizStage,
    asked: usize,
    score: usize,
    seen_prompts: Vec<String>,
}

#[derive(Debug, Clone)]
enum QuizStage {
    Fetching,
    /// Invariant: `question.key` is present and in range (see [`sanitize`]).
    Answering { question: ChoicePrompt },
    Feedback,
    Summary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerFeedback {
    pub correct: bool,
    pub correct_index: usize,
    pub explanation: String,
    pub score: usize,
}

#[derive(Debug)]
pub enum QuizAdvance {
    NextQuestion,
    Summary { score: usize },
    Finished { score: usize, passed: bool },
    Ignored,
}

impl ClassQuiz {
    pub fn new(task_id: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            subject: subject.into(),
            stage: QuizStage::Fetching,
            asked: 0,
            score: 0,
            seen_prompts: Vec::new(),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn seen_prompts(&self) -> &[String] {
        &self.seen_prompts
    }

    /// Accepts a fetched question (or its absence) and poses it. Returns the
    /// zero-based question index alongside what was posed, or `None` when the
    /// quiz is not waiting on a question.
    pub fn receive_question(&mut self, fetched: Option<ChoicePrompt>) -> Option<(usize, ChoicePrompt)> {
        if !matches!(self.stage, QuizStage::Fetching) {
            return None;
        }
        let question = sanitize(fetched);
        self.seen_prompts.push(question.prompt.clone());
        self.asked += 1;
        self.stage = QuizStage::Answering {
            question: question.clone(),
        };
        Some((self.asked - 1, question))
    }

    /// Scores a single attempt at the posed question. Later attempts and
    /// out-of-range options return `None`.
    pub fn answer(&mut self, option: usize) -> Option<AnswerFeedback> {
        let QuizStage::Answering { question } = &self.stage else {
            return None;
        };
        if option >= question.options.len() {
            return None;
        }
        let key = question.key.clone().unwrap_or(AnswerKey {
            correct_index: 0,
            explanation: String::new(),
        });

        let correct = option == key.correct_index;
        if correct {
            self.score += 1;
        }
        self.stage = QuizStage::Feedback;
        Some(AnswerFeedback {
            correct,
            correct_index: key.correct_index,
            explanation: key.explanation,
            score: self.score,
        })
    }

    /// Steps past feedback or the summary. The caller decides what to do with
    /// each outcome; `Finished` carries the pass verdict.
    pub fn advance(&mut self) -> QuizAdvance {
        if matches!(self.stage, QuizStage::Feedback) {
            if self.asked < QUIZ_LENGTH {
                self.stage = QuizStage::Fetching;
                return QuizAdvance::NextQuestion;
            }
            self.stage = QuizStage::Summary;
            return QuizAdvance::Summary { score: self.score };
        }
        if matches!(self.stage, QuizStage::Summary) {
            return QuizAdvance::Finished {
                score: self.score,
                passed: self.score == QUIZ_LENGTH,
            };
        }
        QuizAdvance::Ignored
    }
}

fn sanitize(fetched: Option<ChoicePrompt>) -> ChoicePrompt {
    let Some(question) = fetched else {
        return filler_question();
    };
    let usable = !question.prompt.trim().is_empty()
        && !question.options.is_empty()
        && question
            .key
            .as_ref()
            .is_some_and(|key| key.correct_index < question.options.len());
    if usable {
        question
    } else {
        filler_question()
    }
}

/// Shown when a question cannot be fetched, so the class can still proceed.
pub fn filler_question() -> ChoicePrompt {
    ChoicePrompt {
        prompt: "The magical connection seems weak. What should we do?".to_string(),
        options: vec![
            "Try again later".to_string(),
            "Wait".to_string(),
            "Leave".to_string(),
            "Refresh".to_string(),
        ],
        key: Some(AnswerKey {
            correct_index: 0,
            explanation: "Please check your connection or API quota.".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(n: usize, correct_index: usize) -> ChoicePrompt {
        ChoicePrompt {
            prompt: format!("Question {n}"),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            key: Some(AnswerKey {
                correct_index,
                explanation: format!("Because {n}."),
            }),
        }
    }

    fn run_question(quiz: &mut ClassQuiz, n: usize, pick: usize) -> AnswerFeedback {
        quiz.receive_question(Some(question(n, 1))).unwrap();
        quiz.answer(pick).unwrap()
    }

    #[test]
    fn a_perfect_run_passes_the_class() {
        let mut quiz = ClassQuiz::new("c1", "Potions");
        for n in 0..QUIZ_LENGTH {
            let feedback = run_question(&mut quiz, n, 1);
            assert!(feedback.correct);
            if n < QUIZ_LENGTH - 1 {
                assert!(matches!(quiz.advance(), QuizAdvance::NextQuestion));
            }
        }
        assert!(matches!(quiz.advance(), QuizAdvance::Summary { score: 10 }));
        assert!(matches!(
            quiz.advance(),
            QuizAdvance::Finished {
                score: 10,
                passed: true
            }
        ));
    }

    #[test]
    fn a_single_miss_fails_the_class() {
        let mut quiz = ClassQuiz::new("c1", "Potions");
        for n in 0..QUIZ_LENGTH {
            let pick = if n == 3 { 0 } else { 1 };
            let feedback = run_question(&mut quiz, n, pick);
            assert_eq!(feedback.correct, n != 3);
            if n < QUIZ_LENGTH - 1 {
                assert!(matches!(quiz.advance(), QuizAdvance::NextQuestion));
            }
        }
        assert!(matches!(quiz.advance(), QuizAdvance::Summary { score: 9 }));
        assert!(matches!(
            quiz.advance(),
            QuizAdvance::Finished {
                score: 9,
                passed: false
            }
        ));
    }

    #[test]
    fn a_failed_fetch_poses_the_filler_question() {
        let mut quiz = ClassQuiz::new("c2", "Transfiguration");
        let (index, posed) = quiz.receive_question(None).unwrap();
        assert_eq!(index, 0);
        assert!(posed.prompt.contains("magical connection"));
        let feedback = quiz.answer(0).unwrap();
        assert!(feedback.correct);
        assert_eq!(feedback.explanation, "Please check your connection or API quota.");
    }

    #[test]
    fn a_question_without_a_usable_key_becomes_the_filler() {
        let mut quiz = ClassQuiz::new("c2", "Transfiguration");
        let keyless = ChoicePrompt {
            prompt: "Pick one".into(),
            options: vec!["a".into()],
            key: None,
        };
        assert!(quiz.receive_question(Some(keyless)).unwrap().1.prompt.contains("magical"));

        let mut quiz = ClassQuiz::new("c2", "Transfiguration");
        let out_of_range = question(1, 9);
        assert!(quiz.receive_question(Some(out_of_range)).unwrap().1.prompt.contains("magical"));
    }

    #[test]
    fn answers_are_one_shot() {
        let mut quiz = ClassQuiz::new("c3", "Charms");
        quiz.receive_question(Some(question(0, 2))).unwrap();
        assert!(quiz.answer(0).is_some());
        assert!(quiz.answer(2).is_none());
        assert_eq!(quiz.score(), 0);
    }

    #[test]
    fn out_of_range_answers_leave_the_question_open() {
        let mut quiz = ClassQuiz::new("c3", "Charms");
        quiz.receive_question(Some(question(0, 2))).unwrap();
        assert!(quiz.answer(40).is_none());
        assert!(quiz.answer(2).unwrap().correct);
    }

    #[test]
    fn questions_arriving_outside_a_fetch_are_dropped() {
        let mut quiz = ClassQuiz::new("c4", "Herbology");
        quiz.receive_question(Some(question(0, 0))).unwrap();
        assert!(quiz.receive_question(Some(question(1, 0))).is_none());
    }

    #[test]
    fn posed_prompts_accumulate_for_the_avoid_list() {
        let mut quiz = ClassQuiz::new("c1", "Potions");
        for n in 0..3 {
            run_question(&mut quiz, n, 1);
            quiz.advance();
        }
        assert_eq!(
            quiz.seen_prompts(),
            ["Question 0", "Question 1", "Question 2"]
        );
    }
}
