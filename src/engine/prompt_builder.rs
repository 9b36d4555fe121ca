//! Builds every prompt sent to the content generator. Intentionally dumb:
//! only text formatting, no networking, no session logic.

use crate::engine::generator::{AnsweredQuestion, ConversationContext};
use crate::model::language::Language;
use crate::model::message::ChatMessage;
use crate::model::profile::PlayerProfile;

pub fn sorting_questions_prompt(profile: &PlayerProfile, count: usize, language: Language) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "Generate {} immersive, multiple-choice questions for the Sorting Hat ceremony in Harry Potter.\n",
        count
    ));
    prompt.push_str(&format!(
        "The user is: {}, Age: {}, Type: {}.\n\n",
        profile.name, profile.age, profile.archetype
    ));
    prompt.push_str(
        "The questions should cover:\n\
1. Magic preferences\n\
2. Ethical dilemmas\n\
3. Personality traits\n\
4. Bloodline/Heritage (imagined)\n\
5. Reaction to danger\n\
6. Academic interests\n\n",
    );
    push_language_rule(&mut prompt, "The questions and options", language);
    prompt.push_str("Return JSON only.\n");

    prompt
}

pub fn sorting_verdict_prompt(
    profile: &PlayerProfile,
    transcript: &[AnsweredQuestion],
    language: Language,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "You are the Sorting Hat. Analyze these answers from a student named {} and sort them into a Hogwarts House.\n\n",
        profile.name
    ));
    prompt.push_str("Student Answers:\n");
    push_transcript(&mut prompt, transcript);
    prompt.push_str("Decide between: Gryffindor, Slytherin, Ravenclaw, Hufflepuff.\n");
    prompt.push_str("Provide a short, rhyming, or cryptic reasoning typical of the Sorting Hat.\n");
    push_language_rule(&mut prompt, "The reasoning", language);

    prompt
}

pub fn quiz_question_prompt(
    subject: &str,
    profile: &PlayerProfile,
    seen_prompts: &[String],
    language: Language,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "Generate a multiple-choice question for the Hogwarts class: {}.\n",
        subject
    ));
    prompt.push_str(&format!(
        "Student: {} ({}).\n\n",
        profile.name,
        profile.house.display_name()
    ));
    prompt.push_str(&format!(
        "The question should test specific lore knowledge or spell usage relevant to {}.\n",
        subject
    ));
    prompt.push_str(
        "Provide 4 distinct options.\n\
Identify the correct option index (0-3).\n\
Provide a brief explanation/feedback for the answer.\n\n",
    );
    push_seen_prompts(&mut prompt, seen_prompts);
    push_language_rule(&mut prompt, "Output", language);

    prompt
}

pub fn chat_reply_prompt(context: &ConversationContext, tail: &[ChatMessage], message: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "Roleplay as {} in the {} at Hogwarts.\n",
        context.npc, context.location_name
    ));
    prompt.push_str(&format!(
        "The player is a student named {} from {} house.\n\n",
        context.profile.name,
        context.profile.house.display_name()
    ));
    prompt.push_str("Context:\n");
    for turn in tail {
        prompt.push_str(&format!("{}: {}\n", turn.sender, turn.text));
    }
    prompt.push_str(&format!("Player: {}\n\n", message));
    prompt.push_str(
        "Keep the response short (under 2 sentences), immersive, and in character.\n\
If it's a ghost, be ghostly. If it's a teacher, be academic.\n",
    );
    push_language_rule(&mut prompt, "The reply", context.language);

    prompt
}

pub fn location_image_prompt(description: &str) -> String {
    format!(
        "Detailed fantasy concept art of a Harry Potter location: {}",
        description
    )
}

fn push_transcript(prompt: &mut String, transcript: &[AnsweredQuestion]) {
    for question in transcript {
        let answer = question
            .options
            .get(question.chosen)
            .map(String::as_str)
            .unwrap_or("(no answer)");
        prompt.push_str(&format!("Q: {}\nA: {}\n\n", question.prompt, answer));
    }
}

fn push_seen_prompts(prompt: &mut String, seen_prompts: &[String]) {
    if seen_prompts.is_empty() {
        return;
    }
    prompt.push_str("Do NOT repeat any of these questions already asked in this class:\n");
    for seen in seen_prompts {
        prompt.push_str(&format!("- {}\n", seen));
    }
    prompt.push('\n');
}

fn push_language_rule(prompt: &mut String, what: &str, language: Language) {
    prompt.push_str(&format!(
        "IMPORTANT: {} MUST be in {}.\n",
        what,
        language.prompt_name()
    ));
}
