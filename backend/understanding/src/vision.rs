/// Vision recognition: read the address off a label using a vision LLM.
///
/// Supports OpenAI-compatible chat completion endpoints and Gemini.
use std::time::Instant;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use parcelscan_core::{RecognitionError, RecognitionResult, RecognitionService};
use serde::Deserialize;
use tracing::{debug, info};

use crate::address::extract_address;

/// Confidence assumed when the model names an address but no score.
pub const DEFAULT_TEXT_CONFIDENCE: u32 = 70;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const LABEL_PROMPT: &str = "This photo shows a parcel label. Find the what3words address on it \
(three words joined by dots, usually printed after ///). Reply with JSON only: \
{\"address\": \"word.word.word\", \"confidence\": <0-100>}. \
If there is no what3words address, reply {\"address\": null, \"confidence\": 0}.";

/// Supported vision providers.
#[derive(Debug, Clone)]
pub enum VisionProvider {
    OpenAI { api_key: String, model: String, base_url: String },
    Gemini { api_key: String, model: String, base_url: String },
}

impl VisionProvider {
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::OpenAI {
            api_key: api_key.into(),
            model: "gpt-4o".to_string(),
            base_url: OPENAI_BASE_URL.to_string(),
        }
    }

    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self::Gemini {
            api_key: api_key.into(),
            model: "gemini-2.0-flash".to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, new_model: impl Into<String>) -> Self {
        match &mut self {
            Self::OpenAI { model, .. } | Self::Gemini { model, .. } => *model = new_model.into(),
        }
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        match &mut self {
            Self::OpenAI { base_url, .. } | Self::Gemini { base_url, .. } => {
                *base_url = url.into().trim_end_matches('/').to_string()
            }
        }
        self
    }

    fn name(&self) -> &'static str {
        match self {
            Self::OpenAI { .. } => "openai",
            Self::Gemini { .. } => "gemini",
        }
    }
}

/// Shape of the JSON reply the prompt asks for.
#[derive(Debug, Deserialize)]
struct LabelReply {
    address: Option<String>,
    confidence: Option<f64>,
}

/// Recognizer that delegates to a vision model.
pub struct VisionRecognizer {
    provider: VisionProvider,
    mime_type: String,
    client: reqwest::Client,
}

impl VisionRecognizer {
    pub fn new(provider: VisionProvider) -> Self {
        Self {
            provider,
            mime_type: "image/jpeg".to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// MIME type announced to the model; captures are JPEG unless configured otherwise.
    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = mime.into();
        self
    }

    fn service_error(&self, message: impl Into<String>) -> RecognitionError {
        RecognitionError::Service {
            service: self.provider.name().to_string(),
            message: message.into(),
        }
    }

    async fn describe(&self, b64: &str) -> Result<String, RecognitionError> {
        match &self.provider {
            VisionProvider::OpenAI { api_key, model, base_url } => {
                info!("[Vision] Reading label via OpenAI {}", model);
                let body = serde_json::json!({
                    "model": model,
                    "messages": [{
                        "role": "user",
                        "content": [
                            { "type": "text", "text": LABEL_PROMPT },
                            { "type": "image_url",
                              "image_url": { "url": format!("data:{};base64,{}", self.mime_type, b64) } }
                        ]
                    }],
                    "max_tokens": 128
                });
                let resp = self
                    .client
                    .post(format!("{base_url}/chat/completions"))
                    .bearer_auth(api_key)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| self.service_error(e.to_string()))?;
                if !resp.status().is_success() {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    return Err(self.service_error(format!("{status}: {text}")));
                }
                let json: serde_json::Value =
                    resp.json().await.map_err(|e| self.service_error(e.to_string()))?;
                Ok(json["choices"][0]["message"]["content"]
                    .as_str()
                    .unwrap_or("")
                    .to_string())
            }
            VisionProvider::Gemini { api_key, model, base_url } => {
                info!("[Vision] Reading label via Gemini {}", model);
                let body = serde_json::json!({
                    "contents": [{ "parts": [
                        { "text": LABEL_PROMPT },
                        { "inlineData": { "mimeType": self.mime_type, "data": b64 } }
                    ]}]
                });
                let resp = self
                    .client
                    .post(format!("{base_url}/models/{model}:generateContent"))
                    .query(&[("key", api_key)])
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| self.service_error(e.to_string()))?;
                if !resp.status().is_success() {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    return Err(self.service_error(format!("{status}: {text}")));
                }
                let json: serde_json::Value =
                    resp.json().await.map_err(|e| self.service_error(e.to_string()))?;
                Ok(json["candidates"][0]["content"]["parts"][0]["text"]
                    .as_str()
                    .unwrap_or("")
                    .to_string())
            }
        }
    }
}

/// Turn the model's reply into a result.
///
/// The JSON reply is preferred; if the model ignored the format, any address
/// in the raw text is accepted at [`DEFAULT_TEXT_CONFIDENCE`].
pub fn parse_reply(reply: &str) -> Result<RecognitionResult, RecognitionError> {
    let trimmed = reply
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    if let Ok(parsed) = serde_json::from_str::<LabelReply>(trimmed) {
        let address = parsed
            .address
            .as_deref()
            .and_then(extract_address)
            .ok_or(RecognitionError::NoAddress)?;
        let confidence = parsed
            .confidence
            .map(|c| c.round().clamp(0.0, 100.0) as u32)
            .unwrap_or(DEFAULT_TEXT_CONFIDENCE);
        return Ok(RecognitionResult::new(address, confidence));
    }

    extract_address(reply)
        .map(|address| RecognitionResult::new(address, DEFAULT_TEXT_CONFIDENCE))
        .ok_or(RecognitionError::NoAddress)
}

#[async_trait]
impl RecognitionService for VisionRecognizer {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn recognize(&self, image: &[u8]) -> Result<RecognitionResult, RecognitionError> {
        let started = Instant::now();
        let b64 = STANDARD.encode(image);
        let reply = self.describe(&b64).await?;
        debug!(reply = %reply, "Vision reply");

        let result = parse_reply(&reply)?;
        info!(
            address = %result.address,
            confidence = result.confidence,
            latency_ms = started.elapsed().as_millis() as u64,
            "[Vision] Address recognized"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, routing::post};

    #[test]
    fn parses_json_reply() {
        let result = parse_reply(r#"{"address": "///daring.lion.race", "confidence": 91}"#).unwrap();
        assert_eq!(result, RecognitionResult::new("daring.lion.race", 91));
    }

    #[test]
    fn parses_fenced_json_reply() {
        let reply = "```json\n{\"address\": \"index.home.raft\", \"confidence\": 88.6}\n```";
        assert_eq!(parse_reply(reply).unwrap().confidence, 89);
    }

    #[test]
    fn null_address_is_no_address() {
        let err = parse_reply(r#"{"address": null, "confidence": 0}"#).unwrap_err();
        assert!(matches!(err, RecognitionError::NoAddress));
    }

    #[test]
    fn free_text_reply_falls_back() {
        let result = parse_reply("The label says ///family.open.today.").unwrap();
        assert_eq!(result.address, "family.open.today");
        assert_eq!(result.confidence as u32, DEFAULT_TEXT_CONFIDENCE);
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn recognizes_via_openai_compatible_endpoint() {
        let app = Router::new().route(
            "/chat/completions",
            post(|| async {
                Json(serde_json::json!({
                    "choices": [{ "message": {
                        "content": "{\"address\": \"laptop.green.view\", \"confidence\": 93}"
                    }}]
                }))
            }),
        );
        let base = serve(app).await;
        let recognizer =
            VisionRecognizer::new(VisionProvider::openai("sk-test").with_base_url(base));

        let result = recognizer.recognize(&[0xFF, 0xD8]).await.unwrap();
        assert_eq!(result, RecognitionResult::new("laptop.green.view", 93));
    }

    #[tokio::test]
    async fn http_error_is_service_error() {
        let app = Router::new().route(
            "/chat/completions",
            post(|| async { (axum::http::StatusCode::UNAUTHORIZED, "bad key") }),
        );
        let base = serve(app).await;
        let recognizer =
            VisionRecognizer::new(VisionProvider::openai("sk-wrong").with_base_url(base));

        let err = recognizer.recognize(&[0xFF]).await.unwrap_err();
        assert!(matches!(err, RecognitionError::Service { ref service, .. } if service == "openai"));
    }
}
