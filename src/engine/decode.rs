//! Decodes structured generator output into engine types.
//!
//! The backend is asked for JSON via a response schema, but replies still
//! arrive as text and occasionally wrapped in markdown code fences. Everything
//! here is defensive: a reply that does not parse becomes a [`GeneratorError`]
//! for the caller to translate into fallback content.

use serde::Deserialize;

use crate::engine::generator::{AnswerKey, ChoicePrompt, Classification, GeneratorError};
use crate::model::profile::House;

#[derive(Deserialize)]
struct SortingQuestionWire {
    question: String,
    options: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuizQuestionWire {
    question: String,
    options: Vec<String>,
    correct_index: usize,
    explanation: String,
}

#[derive(Deserialize)]
struct VerdictWire {
    house: String,
    reasoning: String,
}

/// Strips a surrounding markdown code fence, with or without a language tag.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = inner.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening fence, e.g. ```json.
    match inner.split_once('\n') {
        Some((first, rest)) if !first.trim().is_empty() && !first.trim().contains(' ') => rest.trim(),
        _ => inner.trim(),
    }
}

pub fn sorting_questions(text: &str) -> Result<Vec<ChoicePrompt>, GeneratorError> {
    let wire: Vec<SortingQuestionWire> = serde_json::from_str(strip_code_fences(text))
        .map_err(|err| GeneratorError::InvalidResponse(format!("sorting questions: {err}")))?;

    let questions: Vec<ChoicePrompt> = wire
        .into_iter()
        .filter(|q| !q.question.trim().is_empty() && !q.options.is_empty())
        .map(|q| ChoicePrompt {
            prompt: q.question,
            options: q.options,
            key: None,
        })
        .collect();

    if questions.is_empty() {
        return Err(GeneratorError::EmptyResponse);
    }
    Ok(questions)
}

pub fn quiz_question(text: &str) -> Result<ChoicePrompt, GeneratorError> {
    let wire: QuizQuestionWire = serde_json::from_str(strip_code_fences(text))
        .map_err(|err| GeneratorError::InvalidResponse(format!("quiz question: {err}")))?;

    if wire.question.trim().is_empty() || wire.options.is_empty() {
        return Err(GeneratorError::EmptyResponse);
    }
    if wire.correct_index >= wire.options.len() {
        return Err(GeneratorError::InvalidResponse(format!(
            "correct index {} out of range for {} options",
            wire.correct_index,
            wire.options.len()
        )));
    }

    Ok(ChoicePrompt {
        prompt: wire.question,
        options: wire.options,
        key: Some(AnswerKey {
            correct_index: wire.correct_index,
            explanation: wire.explanation,
        }),
    })
}

pub fn sorting_verdict(text: &str) -> Result<Classification, GeneratorError> {
    let wire: VerdictWire = serde_json::from_str(strip_code_fences(text))
        .map_err(|err| GeneratorError::InvalidResponse(format!("sorting verdict: {err}")))?;

    let house = House::from_label(&wire.house).ok_or_else(|| {
        GeneratorError::InvalidResponse(format!("unknown house {:?}", wire.house))
    })?;

    Ok(Classification {
        house,
        rationale: wire.reasoning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fences_with_and_without_language_tags() {
        assert_eq!(strip_code_fences("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("  [1] "), "[1]");
        assert_eq!(strip_code_fences("```unterminated"), "```unterminated");
    }

    #[test]
    fn decodes_a_sorting_question_list() {
        let text = r#"[
            {"id": 1, "question": "Which path do you take?", "options": ["Left", "Right"]},
            {"id": 2, "question": "", "options": ["skipped"]}
        ]"#;
        let questions = sorting_questions(text).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].prompt, "Which path do you take?");
        assert_eq!(questions[0].options, vec!["Left", "Right"]);
        assert!(questions[0].key.is_none());
    }

    #[test]
    fn an_all_blank_question_list_is_empty() {
        let err = sorting_questions(r#"[{"question": " ", "options": []}]"#).unwrap_err();
        assert_eq!(err, GeneratorError::EmptyResponse);
    }

    #[test]
    fn decodes_a_fenced_quiz_question() {
        let text = "```json\n{\"question\": \"What repels a Dementor?\", \"options\": [\"Expelliarmus\", \"Expecto Patronum\", \"Lumos\", \"Accio\"], \"correctIndex\": 1, \"explanation\": \"The Patronus Charm.\"}\n```";
        let question = quiz_question(text).unwrap();
        assert_eq!(question.prompt, "What repels a Dementor?");
        let key = question.key.unwrap();
        assert_eq!(key.correct_index, 1);
        assert_eq!(key.explanation, "The Patronus Charm.");
    }

    #[test]
    fn rejects_a_quiz_key_outside_the_options() {
        let text = r#"{"question": "Pick", "options": ["a", "b"], "correctIndex": 5, "explanation": "?"}"#;
        assert!(matches!(
            quiz_question(text),
            Err(GeneratorError::InvalidResponse(_))
        ));
    }

    #[test]
    fn decodes_a_sorting_verdict() {
        let text = r#"{"house": "Ravenclaw", "reasoning": "Wit beyond measure."}"#;
        let verdict = sorting_verdict(text).unwrap();
        assert_eq!(verdict.house, House::Ravenclaw);
        assert_eq!(verdict.rationale, "Wit beyond measure.");
    }

    #[test]
    fn rejects_a_house_outside_the_four() {
        let text = r#"{"house": "Ilvermorny", "reasoning": "?"}"#;
        assert!(matches!(
            sorting_verdict(text),
            Err(GeneratorError::InvalidResponse(_))
        ));
    }
}
