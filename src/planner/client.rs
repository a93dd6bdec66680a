//! Generative-language API client.
//!
//! `GenerativeClient` is the seam the rest of the crate depends on; the
//! Gemini REST implementation lives here and tests substitute fakes.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Request to {model} failed: {message}")]
    Transport { model: String, message: String },
    #[error("{model} returned HTTP {status}: {body}")]
    Status { model: String, status: u16, body: String },
    #[error("Rate limited by {model}")]
    RateLimited { model: String },
    #[error("Unexpected response from {model}: {message}")]
    InvalidResponse { model: String, message: String },
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl ServiceError {
    /// Whether repeating the same request later may succeed
    pub fn is_retriable(&self) -> bool {
        match self {
            ServiceError::Transport { .. } | ServiceError::RateLimited { .. } => true,
            ServiceError::Status { status, .. } => *status >= 500,
            ServiceError::InvalidResponse { .. } | ServiceError::Client(_) => false,
        }
    }
}

/// Base64 payload tagged with its MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    Inline(InlineData),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub model: String,
    pub parts: Vec<Part>,
    pub system_instruction: Option<String>,
    /// Ground answers with Google Maps
    pub maps_grounding: bool,
    /// Ask for spoken audio in this prebuilt voice instead of text
    pub speech_voice: Option<String>,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    pub fn system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateResponse {
    /// All text parts of the first candidate, concatenated
    pub text: Option<String>,
    /// First inline payload of the first candidate
    pub inline_data: Option<InlineData>,
}

#[async_trait]
pub trait GenerativeClient: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, ServiceError>;
}

pub struct GeminiClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Client(e.to_string()))?;

        Ok(Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn build_request_body(request: &GenerateRequest) -> Value {
        let parts: Vec<Value> = request
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => json!({ "text": text }),
                Part::Inline(inline) => json!({
                    "inlineData": { "mimeType": inline.mime_type, "data": inline.data }
                }),
            })
            .collect();

        let mut body = json!({
            "contents": [{ "role": "user", "parts": parts }],
        });

        if let Some(ref system) = request.system_instruction {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }

        if request.maps_grounding {
            body["tools"] = json!([{ "googleMaps": {} }]);
        }

        if let Some(ref voice) = request.speech_voice {
            body["generationConfig"] = json!({
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": voice } }
                }
            });
        }

        body
    }

    fn parse_response(model: &str, resp: &Value) -> Result<GenerateResponse, ServiceError> {
        let candidates = resp.get("candidates").and_then(Value::as_array).ok_or_else(|| {
            let reason = resp
                .pointer("/promptFeedback/blockReason")
                .and_then(Value::as_str)
                .unwrap_or("no candidates");
            ServiceError::InvalidResponse {
                model: model.to_string(),
                message: reason.to_string(),
            }
        })?;

        let parts = candidates
            .first()
            .and_then(|c| c.pointer("/content/parts"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect();

        let inline_data = parts.iter().find_map(|p| {
            let inline = p.get("inlineData")?;
            Some(InlineData {
                mime_type: inline.get("mimeType")?.as_str()?.to_string(),
                data: inline.get("data")?.as_str()?.to_string(),
            })
        });

        Ok(GenerateResponse {
            text: (!text.is_empty()).then_some(text),
            inline_data,
        })
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, ServiceError> {
        let body = Self::build_request_body(&request);
        let url = format!("{}/models/{}:generateContent", self.base_url, request.model);

        debug!("Sending {} part(s) to {}", request.parts.len(), request.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::Transport {
                model: request.model.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ServiceError::RateLimited {
                model: request.model,
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                model: request.model,
                status: status.as_u16(),
                body,
            });
        }

        let resp: Value = response.json().await.map_err(|e| ServiceError::InvalidResponse {
            model: request.model.clone(),
            message: format!("body is not JSON: {}", e),
        })?;

        let parsed = Self::parse_response(&request.model, &resp)?;
        info!(
            "{} answered with {} chars of text{}",
            request.model,
            parsed.text.as_ref().map_or(0, String::len),
            if parsed.inline_data.is_some() { " and inline data" } else { "" }
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_with_image_and_system() {
        let request = GenerateRequest::new("gemini-3-flash-preview")
            .part(Part::Inline(InlineData {
                mime_type: "image/png".to_string(),
                data: "iVBORw0KGgo=".to_string(),
            }))
            .part(Part::text("¿Qué es esto?"))
            .system("Eres un guía");

        let body = GeminiClient::build_request_body(&request);
        let parts = body["contents"][0]["parts"].as_array().unwrap();

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["text"], "¿Qué es esto?");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Eres un guía");
        assert!(body.get("tools").is_none());
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn test_request_body_for_maps_and_speech() {
        let mut request = GenerateRequest::new("gemini-2.5-flash-preview-tts").part(Part::text("Coliseo"));
        request.maps_grounding = true;
        request.speech_voice = Some("Kore".to_string());

        let body = GeminiClient::build_request_body(&request);
        assert!(body["tools"][0].get("googleMaps").is_some());
        assert_eq!(body["generationConfig"]["responseModalities"][0], "AUDIO");
        assert_eq!(
            body["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
            "Kore"
        );
    }

    #[test]
    fn test_parse_text_parts_are_joined() {
        let resp = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hola " }, { "text": "Roma" }] }
            }]
        });

        let parsed = GeminiClient::parse_response("m", &resp).unwrap();
        assert_eq!(parsed.text.as_deref(), Some("Hola Roma"));
        assert!(parsed.inline_data.is_none());
    }

    #[test]
    fn test_parse_inline_audio() {
        let resp = json!({
            "candidates": [{
                "content": { "parts": [{ "inlineData": { "mimeType": "audio/L16;codec=pcm;rate=24000", "data": "AID/fw==" } }] }
            }]
        });

        let parsed = GeminiClient::parse_response("m", &resp).unwrap();
        assert!(parsed.text.is_none());
        assert_eq!(parsed.inline_data.unwrap().data, "AID/fw==");
    }

    #[test]
    fn test_parse_blocked_prompt() {
        let resp = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        match GeminiClient::parse_response("m", &resp) {
            Err(ServiceError::InvalidResponse { message, .. }) => assert_eq!(message, "SAFETY"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_retriable_classification() {
        let server = ServiceError::Status {
            model: "m".into(),
            status: 503,
            body: String::new(),
        };
        let client = ServiceError::Status {
            model: "m".into(),
            status: 400,
            body: String::new(),
        };
        assert!(server.is_retriable());
        assert!(!client.is_retriable());
        assert!(ServiceError::RateLimited { model: "m".into() }.is_retriable());
    }
}
