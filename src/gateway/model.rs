//! Backend-neutral request/response model for generative AI calls.
//!
//! A request is a model id, an ordered list of content parts and optional
//! generation settings. A response is an ordered list of parts; each part is
//! either text or an inline image, never an untyped blob.

use async_trait::async_trait;
use thiserror::Error;

/// Base64 image plus its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64, no data-URI prefix.
    pub data: String,
}

/// One piece of request or response content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    Image(InlineImage),
}

impl ContentPart {
    pub fn text(s: impl Into<String>) -> Self {
        ContentPart::Text(s.into())
    }

    pub fn image(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        ContentPart::Image(InlineImage {
            mime_type: mime_type.into(),
            data: data.into(),
        })
    }
}

/// Output kinds the caller is willing to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Text,
    Image,
}

/// Sampling and output settings. `None` means the service default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationSettings {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    /// Empty means text only.
    pub response_modalities: Vec<Modality>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub model: String,
    pub parts: Vec<ContentPart>,
    pub generation: GenerationSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelResponse {
    pub parts: Vec<ContentPart>,
}

impl ModelResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![ContentPart::Text(text.into())],
        }
    }

    /// All text parts concatenated, in order.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text(t) => Some(t.as_str()),
                ContentPart::Image(_) => None,
            })
            .collect()
    }

    /// First part carrying an `image/*` payload.
    pub fn first_image(&self) -> Option<&InlineImage> {
        self.parts.iter().find_map(|p| match p {
            ContentPart::Image(img) if img.mime_type.starts_with("image/") => Some(img),
            _ => None,
        })
    }
}

/// Raw backend failure before classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
    /// HTTP status, when the failure came from a response.
    pub status: Option<u16>,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

/// A service that can answer a [`ModelRequest`].
///
/// Implementations perform exactly one remote call per `generate`; retries
/// are not their business.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_image_wins_and_skips_non_images() {
        let resp = ModelResponse {
            parts: vec![
                ContentPart::text("I can't do that, but here you go"),
                ContentPart::image("application/octet-stream", "AAAA"),
                ContentPart::image("image/png", "first"),
                ContentPart::image("image/png", "second"),
            ],
        };
        assert_eq!(resp.first_image().map(|i| i.data.as_str()), Some("first"));
        assert_eq!(resp.text(), "I can't do that, but here you go");
    }

    #[test]
    fn text_concatenates_parts() {
        let resp = ModelResponse {
            parts: vec![ContentPart::text("a,b\n"), ContentPart::text("1,2")],
        };
        assert_eq!(resp.text(), "a,b\n1,2");
        assert!(resp.first_image().is_none());
    }
}
