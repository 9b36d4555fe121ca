//! Blocking client for the Gemini `generateContent` REST endpoint.
//!
//! Implements [`ContentGenerator`] over two models: a text model that answers
//! with schema-constrained JSON for questions and verdicts, and an image model
//! whose replies carry base64 `inlineData` parts.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::GenericImageView;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::engine::decode;
use crate::engine::generator::{
    AnsweredQuestion, ChoicePrompt, ChoiceSetRequest, Classification, ContentGenerator,
    ConversationContext, GeneratedImage, GeneratorError,
};
use crate::engine::prompt_builder;
use crate::model::language::Language;
use crate::model::message::ChatMessage;
use crate::model::profile::PlayerProfile;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const TEXT_MODEL: &str = "gemini-2.5-flash";
pub const IMAGE_MODEL: &str = "gemini-2.5-flash-image";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

pub struct GeminiClient {
    http: Client,
    api_key: String,
    base_url: String,
    text_model: String,
    image_model: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineBlob,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineBlob {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: String,
}

impl GenerateRequest {
    fn text(prompt: String) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part::Text { text: prompt }],
            }],
            generation_config: None,
        }
    }

    fn structured(prompt: String, schema: serde_json::Value) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part::Text { text: prompt }],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema,
            }),
        }
    }
}

impl GeminiClient {
    pub fn new(api_key: &str, base_url: &str, text_model: &str, image_model: &str) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            text_model: text_model.to_string(),
            image_model: image_model.to_string(),
        }
    }

    fn generate(&self, model: &str, request: &GenerateRequest) -> Result<GenerateResponse, GeneratorError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );
        log::debug!("POST {}/models/{}:generateContent", self.base_url, model);

        let response = self
            .http
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(request)
            .send()
            .map_err(|err| GeneratorError::RequestFailed(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(GeneratorError::RequestFailed(format!("HTTP {status}: {snippet}")));
        }

        response
            .json()
            .map_err(|err| GeneratorError::InvalidResponse(err.to_string()))
    }
}

impl ContentGenerator for GeminiClient {
    fn generate_choice_set(
        &self,
        request: &ChoiceSetRequest,
        language: Language,
    ) -> Result<Vec<ChoicePrompt>, GeneratorError> {
        match request {
            ChoiceSetRequest::Sorting { profile, count } => {
                let prompt = prompt_builder::sorting_questions_prompt(profile, *count, language);
                let response =
                    self.generate(&self.text_model, &GenerateRequest::structured(prompt, sorting_schema()))?;
                let text = collected_text(&response).ok_or(GeneratorError::EmptyResponse)?;
                decode::sorting_questions(&text)
            }
            ChoiceSetRequest::Quiz {
                subject,
                profile,
                seen_prompts,
            } => {
                let prompt =
                    prompt_builder::quiz_question_prompt(subject, profile, seen_prompts, language);
                let response =
                    self.generate(&self.text_model, &GenerateRequest::structured(prompt, quiz_schema()))?;
                let text = collected_text(&response).ok_or(GeneratorError::EmptyResponse)?;
                Ok(vec![decode::quiz_question(&text)?])
            }
        }
    }

    fn classify(
        &self,
        profile: &PlayerProfile,
        transcript: &[AnsweredQuestion],
        language: Language,
    ) -> Result<Classification, GeneratorError> {
        let prompt = prompt_builder::sorting_verdict_prompt(profile, transcript, language);
        let response =
            self.generate(&self.text_model, &GenerateRequest::structured(prompt, verdict_schema()))?;
        let text = collected_text(&response).ok_or(GeneratorError::EmptyResponse)?;
        decode::sorting_verdict(&text)
    }

    fn converse(
        &self,
        context: &ConversationContext,
        tail: &[ChatMessage],
        message: &str,
    ) -> Result<String, GeneratorError> {
        let prompt = prompt_builder::chat_reply_prompt(context, tail, message);
        let response = self.generate(&self.text_model, &GenerateRequest::text(prompt))?;
        // A silent character still answers with an ellipsis.
        Ok(collected_text(&response).unwrap_or_else(|| "...".to_string()))
    }

    fn render_image(&self, description: &str) -> Result<GeneratedImage, GeneratorError> {
        let prompt = prompt_builder::location_image_prompt(description);
        let response = self.generate(&self.image_model, &GenerateRequest::text(prompt))?;
        first_inline_image(&response)
    }

    fn revise_image(
        &self,
        image: &GeneratedImage,
        instruction: &str,
    ) -> Result<GeneratedImage, GeneratorError> {
        let response = self.generate(&self.image_model, &revision_request(image, instruction))?;
        first_inline_image(&response)
    }
}

/// Pairs the current image with the edit instruction, image part first.
fn revision_request(image: &GeneratedImage, instruction: &str) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![
                Part::Inline {
                    inline_data: InlineBlob {
                        mime_type: image.mime.clone(),
                        data: BASE64.encode(&image.bytes),
                    },
                },
                Part::Text {
                    text: instruction.to_string(),
                },
            ],
        }],
        generation_config: None,
    }
}

fn collected_text(response: &GenerateResponse) -> Option<String> {
    let content = response.candidates.first()?.content.as_ref()?;
    let mut text = String::new();
    for part in &content.parts {
        if let Some(chunk) = &part.text {
            text.push_str(chunk);
        }
    }
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

fn first_inline_image(response: &GenerateResponse) -> Result<GeneratedImage, GeneratorError> {
    let parts = response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .map(|content| content.parts.as_slice())
        .unwrap_or(&[]);

    for part in parts {
        let Some(inline) = &part.inline_data else {
            continue;
        };
        let bytes = BASE64
            .decode(inline.data.as_bytes())
            .map_err(|err| GeneratorError::InvalidResponse(format!("inline image: {err}")))?;
        let mime = inline
            .mime_type
            .clone()
            .unwrap_or_else(|| "image/png".to_string());
        return validated_image(bytes, mime);
    }
    Err(GeneratorError::EmptyResponse)
}

/// Refuses payloads the `image` crate cannot decode, so callers never hold
/// bytes they cannot display or re-encode for a revision round.
fn validated_image(bytes: Vec<u8>, mime: String) -> Result<GeneratedImage, GeneratorError> {
    let decoded = image::load_from_memory(&bytes)
        .map_err(|err| GeneratorError::InvalidResponse(format!("undecodable image: {err}")))?;
    let (width, height) = decoded.dimensions();
    log::debug!("generated image {width}x{height} ({mime}, {} bytes)", bytes.len());
    Ok(GeneratedImage { bytes, mime })
}

fn sorting_schema() -> serde_json::Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": { "type": "INTEGER" },
                "question": { "type": "STRING" },
                "options": { "type": "ARRAY", "items": { "type": "STRING" } }
            },
            "required": ["id", "question", "options"]
        }
    })
}

fn verdict_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "house": {
                "type": "STRING",
                "enum": ["Gryffindor", "Slytherin", "Ravenclaw", "Hufflepuff"]
            },
            "reasoning": { "type": "STRING" }
        },
        "required": ["house", "reasoning"]
    })
}

fn quiz_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "question": { "type": "STRING" },
            "options": { "type": "ARRAY", "items": { "type": "STRING" } },
            "correctIndex": { "type": "INTEGER" },
            "explanation": { "type": "STRING" }
        },
        "required": ["question", "options", "correctIndex", "explanation"]
    })
}
