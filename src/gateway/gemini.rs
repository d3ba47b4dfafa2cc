//! Gemini REST backend (`models/{model}:generateContent`).
//!
//! One POST per request, authenticated with the `x-goog-api-key` header.
//! Request and response bodies follow the public v1beta JSON shape; only the
//! fields this toolkit reads or writes are modelled.

use super::model::{
    BackendError, ContentPart, GenerationSettings, InlineImage, Modality, ModelBackend,
    ModelRequest, ModelResponse,
};
use crate::config::ToolkitConfig;
use crate::error::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// [`ModelBackend`] speaking the Gemini `generateContent` protocol.
pub struct GeminiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiBackend {
    /// Build a client for `api_key` using the endpoint and timeout in `config`.
    pub fn new(api_key: impl Into<String>, config: &ToolkitConfig) -> Result<Self, ToolError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ToolError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl ModelBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, BackendError> {
        let body = WireRequest::from(request);
        let start = Instant::now();
        let response = self
            .client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::new(transport_message(&e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BackendError::new(e.to_string()).with_status(status.as_u16()))?;
        debug!(
            "gemini {} → HTTP {} in {}ms ({} bytes)",
            request.model,
            status.as_u16(),
            start.elapsed().as_millis(),
            text.len()
        );

        if !status.is_success() {
            let message = serde_json::from_str::<WireErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));
            warn!("gemini error: {}", message);
            return Err(BackendError::new(message).with_status(status.as_u16()));
        }

        let parsed: WireResponse = serde_json::from_str(&text)
            .map_err(|e| BackendError::new(format!("unreadable response: {e}")))?;
        Ok(parsed.into_model_response())
    }
}

fn transport_message(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("could not reach the AI service: {e}")
    } else {
        e.to_string()
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<WireGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct WireContent {
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<WireBlob>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBlob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    response_modalities: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    #[serde(default)]
    content: WireContent,
}

#[derive(Debug, Deserialize)]
struct WireErrorEnvelope {
    error: WireError,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: String,
}

impl From<&ModelRequest> for WireRequest {
    fn from(req: &ModelRequest) -> Self {
        let parts = req
            .parts
            .iter()
            .map(|p| match p {
                ContentPart::Text(t) => WirePart {
                    text: Some(t.clone()),
                    inline_data: None,
                },
                ContentPart::Image(img) => WirePart {
                    text: None,
                    inline_data: Some(WireBlob {
                        mime_type: img.mime_type.clone(),
                        data: img.data.clone(),
                    }),
                },
            })
            .collect();
        Self {
            contents: vec![WireContent { parts }],
            generation_config: generation_config(&req.generation),
        }
    }
}

fn generation_config(g: &GenerationSettings) -> Option<WireGenerationConfig> {
    if *g == GenerationSettings::default() {
        return None;
    }
    Some(WireGenerationConfig {
        temperature: g.temperature,
        top_p: g.top_p,
        top_k: g.top_k,
        response_modalities: g
            .response_modalities
            .iter()
            .map(|m| match m {
                Modality::Image => "IMAGE",
                Modality::Text => "TEXT",
            })
            .collect(),
    })
}

impl WireResponse {
    /// Parts of the first candidate; later candidates are ignored.
    fn into_model_response(self) -> ModelResponse {
        let parts = self
            .candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| match (p.inline_data, p.text) {
                (Some(blob), _) => Some(ContentPart::Image(InlineImage {
                    mime_type: blob.mime_type,
                    data: blob.data,
                })),
                (None, Some(text)) => Some(ContentPart::Text(text)),
                (None, None) => None,
            })
            .collect();
        ModelResponse { parts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn image_request() -> ModelRequest {
        ModelRequest {
            model: "gemini-2.5-flash-image".into(),
            parts: vec![
                ContentPart::image("image/png", "iVBOR"),
                ContentPart::text("Remove the background"),
            ],
            generation: GenerationSettings {
                response_modalities: vec![Modality::Image, Modality::Text],
                ..Default::default()
            },
        }
    }

    #[test]
    fn request_body_uses_camel_case_wire_names() {
        let body = serde_json::to_value(WireRequest::from(&image_request())).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [{
                    "parts": [
                        {"inlineData": {"mimeType": "image/png", "data": "iVBOR"}},
                        {"text": "Remove the background"}
                    ]
                }],
                "generationConfig": {"responseModalities": ["IMAGE", "TEXT"]}
            })
        );
    }

    #[test]
    fn default_generation_settings_are_omitted() {
        let req = ModelRequest {
            model: "m".into(),
            parts: vec![ContentPart::text("hi")],
            generation: GenerationSettings::default(),
        };
        let body = serde_json::to_value(WireRequest::from(&req)).unwrap();
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn response_takes_first_candidate_only() {
        let raw = json!({
            "candidates": [
                {"content": {"parts": [
                    {"text": "Here it is"},
                    {"inlineData": {"mimeType": "image/png", "data": "AAA"}}
                ]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        });
        let resp: WireResponse = serde_json::from_value(raw).unwrap();
        let model = resp.into_model_response();
        assert_eq!(model.text(), "Here it is");
        assert_eq!(model.first_image().map(|i| i.data.as_str()), Some("AAA"));
    }

    #[test]
    fn empty_candidates_give_empty_response() {
        let resp: WireResponse = serde_json::from_value(json!({})).unwrap();
        assert!(resp.into_model_response().parts.is_empty());
    }

    /// Serve one canned HTTP response and hand back the raw request text.
    async fn serve_once(status: &'static str, body: String) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = sock.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let content_length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if buf.len() >= head_end + 4 + content_length {
                        break;
                    }
                }
            }
            let reply = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            sock.write_all(reply.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&buf).to_string()
        });
        (format!("http://{addr}"), handle)
    }

    #[tokio::test]
    async fn posts_to_generate_content_with_key_header() {
        let body = json!({"candidates": [{"content": {"parts": [{"text": "a summary"}]}}]}).to_string();
        let (base, server) = serve_once("200 OK", body).await;
        let config = ToolkitConfig::builder().api_base_url(base).build().unwrap();
        let backend = GeminiBackend::new("k-123", &config).unwrap();

        let req = ModelRequest {
            model: "gemini-2.5-flash".into(),
            parts: vec![ContentPart::text("hello")],
            generation: GenerationSettings::default(),
        };
        let resp = backend.generate(&req).await.unwrap();
        assert_eq!(resp.text(), "a summary");

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /v1beta/models/gemini-2.5-flash:generateContent"));
        assert!(raw.to_ascii_lowercase().contains("x-goog-api-key: k-123"));
    }

    #[tokio::test]
    async fn error_envelope_message_is_surfaced() {
        let body = json!({"error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT"}}).to_string();
        let (base, _server) = serve_once("400 Bad Request", body).await;
        let config = ToolkitConfig::builder().api_base_url(base).build().unwrap();
        let backend = GeminiBackend::new("bad", &config).unwrap();

        let err = backend.generate(&image_request()).await.unwrap_err();
        assert_eq!(err.status, Some(400));
        assert!(err.message.contains("API key not valid"));
    }
}
