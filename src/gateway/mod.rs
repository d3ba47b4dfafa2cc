//! AI gateway: typed operations in, classified results out.
//!
//! [`AiGateway::invoke`] owns the whole contract of one AI call:
//!
//! 1. credentials are checked before anything else ([`AiError::MissingCredentials`]);
//! 2. local preconditions (non-empty text, image present, instruction present);
//! 3. exactly one [`ModelBackend::generate`] call, no retries;
//! 4. the response (or failure) is normalised into [`AiOutput`] / [`AiError`].
//!
//! The backend is injected, so tests swap the network for a scripted fake.

pub mod gemini;
pub mod model;
pub mod provider;

pub use gemini::GeminiBackend;
pub use model::{
    BackendError, ContentPart, GenerationSettings, InlineImage, Modality, ModelBackend,
    ModelRequest, ModelResponse,
};
pub use provider::{resolve_provider, ProviderBackend};

use crate::config::ToolkitConfig;
use crate::engine::encode::{from_base64, to_base64};
use crate::error::{AiError, ExpectedOutput, ToolError};
use crate::prompts;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Substrings of a backend failure that mean the key was rejected.
const INVALID_KEY_MARKERS: &[&str] = &["API key not valid", "API_KEY_INVALID"];

/// Target languages offered by the translate tool: `(code, name)`.
pub const LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("ja", "Japanese"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("ru", "Russian"),
    ("zh", "Chinese"),
];

/// Display name for a language code or name.
///
/// Known codes and names (any case) map to the canonical name; anything else
/// is passed through trimmed, so free-form targets such as "Klingon" work.
pub fn language_name(input: &str) -> String {
    let trimmed = input.trim();
    LANGUAGES
        .iter()
        .find(|(code, name)| code.eq_ignore_ascii_case(trimmed) || name.eq_ignore_ascii_case(trimmed))
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// One AI request.
#[derive(Debug, Clone)]
pub enum AiOperation {
    Summarize { text: String },
    Translate { text: String, language: String },
    CorrectGrammar { text: String },
    RemoveBackground { image: Arc<[u8]>, mime: String },
    EditImage { image: Arc<[u8]>, mime: String, instruction: String },
    /// Returns CSV or [`prompts::NO_TABLES_FOUND`] verbatim.
    ExtractTableCsv { image: Arc<[u8]>, mime: String },
}

impl AiOperation {
    pub fn name(&self) -> &'static str {
        match self {
            AiOperation::Summarize { .. } => "summarize",
            AiOperation::Translate { .. } => "translate",
            AiOperation::CorrectGrammar { .. } => "correct",
            AiOperation::RemoveBackground { .. } => "remove-background",
            AiOperation::EditImage { .. } => "edit-image",
            AiOperation::ExtractTableCsv { .. } => "extract-table",
        }
    }

    fn expected(&self) -> ExpectedOutput {
        match self {
            AiOperation::RemoveBackground { .. } | AiOperation::EditImage { .. } => {
                ExpectedOutput::Image
            }
            _ => ExpectedOutput::Text,
        }
    }
}

/// Successful result of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiOutput {
    Text(String),
    Image { mime: String, bytes: Vec<u8> },
}

impl AiOutput {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AiOutput::Text(t) => Some(t),
            AiOutput::Image { .. } => None,
        }
    }
}

/// Explicitly constructed AI client, shared by reference.
pub struct AiGateway {
    backend: Option<Arc<dyn ModelBackend>>,
    text_model: String,
    image_model: String,
}

impl std::fmt::Debug for AiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiGateway")
            .field("backend", &self.backend.as_ref().map(|b| b.name()))
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .finish()
    }
}

impl AiGateway {
    /// Gateway over an explicit backend.
    pub fn new(backend: Arc<dyn ModelBackend>, config: &ToolkitConfig) -> Self {
        Self {
            backend: Some(backend),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
        }
    }

    /// Gateway with no credentials: every call fails with `MissingCredentials`.
    pub fn without_backend(config: &ToolkitConfig) -> Self {
        Self {
            backend: None,
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
        }
    }

    /// Pick the backend `config` asks for.
    ///
    /// An edgequake-llm provider wins when one is configured; otherwise the
    /// Gemini REST backend is used when an API key is present. With neither,
    /// the gateway is built anyway and reports `MissingCredentials` per call.
    pub fn from_config(config: &ToolkitConfig) -> Result<Self, ToolError> {
        if config.uses_llm_provider() {
            let provider = resolve_provider(config)?;
            info!("AI gateway: edgequake-llm provider");
            return Ok(Self::new(Arc::new(ProviderBackend::new(provider)), config));
        }
        match config.api_key.as_deref() {
            Some(key) => {
                info!("AI gateway: Gemini REST ({})", config.api_base_url);
                Ok(Self::new(Arc::new(GeminiBackend::new(key, config)?), config))
            }
            None => {
                warn!("No API key configured; AI tools are unavailable");
                Ok(Self::without_backend(config))
            }
        }
    }

    /// True when a backend is present.
    pub fn has_credentials(&self) -> bool {
        self.backend.is_some()
    }

    /// Run one operation.
    pub async fn invoke(&self, op: &AiOperation) -> Result<AiOutput, AiError> {
        let backend = self.backend.as_ref().ok_or(AiError::MissingCredentials)?;
        check_preconditions(op)?;

        let request = self.build_request(op);
        let start = Instant::now();
        let response = backend
            .generate(&request)
            .await
            .map_err(classify_failure)?;
        debug!(
            "{} via {} answered in {}ms ({} part(s))",
            op.name(),
            backend.name(),
            start.elapsed().as_millis(),
            response.parts.len()
        );
        interpret(op, response)
    }

    fn build_request(&self, op: &AiOperation) -> ModelRequest {
        match op {
            AiOperation::Summarize { text } => {
                let (temperature, top_p, top_k) = prompts::SUMMARY_SAMPLING;
                ModelRequest {
                    model: self.text_model.clone(),
                    parts: vec![ContentPart::text(prompts::summarize_prompt(text))],
                    generation: GenerationSettings {
                        temperature: Some(temperature),
                        top_p: Some(top_p),
                        top_k: Some(top_k),
                        ..Default::default()
                    },
                }
            }
            AiOperation::Translate { text, language } => self.text_request(
                prompts::translate_prompt(text, &language_name(language)),
            ),
            AiOperation::CorrectGrammar { text } => {
                self.text_request(prompts::correct_prompt(text))
            }
            AiOperation::RemoveBackground { image, mime } => {
                self.image_request(image, mime, prompts::REMOVE_BACKGROUND_INSTRUCTION)
            }
            AiOperation::EditImage {
                image,
                mime,
                instruction,
            } => self.image_request(image, mime, instruction.trim()),
            AiOperation::ExtractTableCsv { image, mime } => ModelRequest {
                model: self.text_model.clone(),
                parts: vec![
                    ContentPart::image(mime.as_str(), to_base64(image)),
                    ContentPart::text(prompts::TABLE_EXTRACTION_INSTRUCTION),
                ],
                generation: GenerationSettings::default(),
            },
        }
    }

    fn text_request(&self, prompt: String) -> ModelRequest {
        ModelRequest {
            model: self.text_model.clone(),
            parts: vec![ContentPart::Text(prompt)],
            generation: GenerationSettings::default(),
        }
    }

    fn image_request(&self, image: &[u8], mime: &str, instruction: &str) -> ModelRequest {
        ModelRequest {
            model: self.image_model.clone(),
            parts: vec![
                ContentPart::image(mime, to_base64(image)),
                ContentPart::text(instruction),
            ],
            generation: GenerationSettings {
                response_modalities: vec![Modality::Image, Modality::Text],
                ..Default::default()
            },
        }
    }
}

fn check_preconditions(op: &AiOperation) -> Result<(), AiError> {
    match op {
        AiOperation::Summarize { text }
        | AiOperation::CorrectGrammar { text }
        | AiOperation::Translate { text, .. } => {
            if text.trim().is_empty() {
                return Err(AiError::EmptyInput("Input text"));
            }
        }
        AiOperation::RemoveBackground { image, .. } | AiOperation::ExtractTableCsv { image, .. } => {
            if image.is_empty() {
                return Err(AiError::EmptyInput("Image data"));
            }
        }
        AiOperation::EditImage {
            image, instruction, ..
        } => {
            if image.is_empty() {
                return Err(AiError::EmptyInput("Image data"));
            }
            if instruction.trim().is_empty() {
                return Err(AiError::EmptyInput("Edit instructions"));
            }
        }
    }
    if let AiOperation::Translate { language, .. } = op {
        if language.trim().is_empty() {
            return Err(AiError::EmptyInput("Target language"));
        }
    }
    Ok(())
}

fn classify_failure(e: BackendError) -> AiError {
    if INVALID_KEY_MARKERS.iter().any(|m| e.message.contains(m)) {
        return AiError::InvalidCredentials;
    }
    AiError::TransientFailure { message: e.message }
}

fn interpret(op: &AiOperation, response: ModelResponse) -> Result<AiOutput, AiError> {
    match op.expected() {
        ExpectedOutput::Text => {
            let text = response.text();
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Err(AiError::NoOutputReturned {
                    expected: ExpectedOutput::Text,
                });
            }
            Ok(AiOutput::Text(trimmed.to_string()))
        }
        ExpectedOutput::Image => {
            if let Some(img) = response.first_image() {
                let bytes = from_base64(&img.data).map_err(|e| AiError::TransientFailure {
                    message: format!("returned image could not be decoded: {e}"),
                })?;
                return Ok(AiOutput::Image {
                    mime: img.mime_type.clone(),
                    bytes,
                });
            }
            let text = response.text();
            if prompts::is_refusal(&text) {
                return Err(AiError::ModelRefused {
                    reason: text.trim().to_string(),
                });
            }
            Err(AiError::NoOutputReturned {
                expected: ExpectedOutput::Image,
            })
        }
    }
}
