//! edgequake-llm backend.
//!
//! Routes requests through any [`LLMProvider`] (OpenAI, Anthropic, Ollama,
//! Gemini via the provider factory, ...). Chat completions return text only,
//! so image-output operations always end in `NoOutputReturned` on this
//! backend; text and table operations work as with the REST backend.

use super::model::{BackendError, ContentPart, ModelBackend, ModelRequest, ModelResponse};
use crate::config::ToolkitConfig;
use crate::error::ToolError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Provider name that asks for auto-detection from the environment.
pub const AUTO_PROVIDER: &str = "auto";

/// [`ModelBackend`] wrapping an edgequake-llm provider.
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
}

impl ProviderBackend {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ModelBackend for ProviderBackend {
    fn name(&self) -> &str {
        "edgequake-llm"
    }

    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, BackendError> {
        let messages = vec![build_message(request)];
        let options = CompletionOptions {
            temperature: request.generation.temperature,
            ..Default::default()
        };
        let start = Instant::now();
        match self.provider.chat(&messages, Some(&options)).await {
            Ok(response) => {
                debug!(
                    "{} input tokens, {} output tokens, {:?}",
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                Ok(ModelResponse::from_text(response.content))
            }
            Err(e) => {
                let message = format!("{}", e);
                warn!("provider call failed: {}", message);
                Err(BackendError::new(message))
            }
        }
    }
}

/// One user turn carrying every text part and every image part.
fn build_message(request: &ModelRequest) -> ChatMessage {
    let (text, images) = split_parts(request);
    if images.is_empty() {
        ChatMessage::user(text)
    } else {
        ChatMessage::user_with_images(text, images)
    }
}

/// Text parts joined by a blank line, images in request order.
fn split_parts(request: &ModelRequest) -> (String, Vec<ImageData>) {
    let mut text = String::new();
    let mut images = Vec::new();
    for part in &request.parts {
        match part {
            ContentPart::Text(t) => {
                if !text.is_empty() {
                    text.push_str("\n\n");
                }
                text.push_str(t);
            }
            ContentPart::Image(img) => {
                images.push(ImageData::new(img.data.clone(), img.mime_type.clone()).with_detail("high"))
            }
        }
    }
    (text, images)
}

fn create_provider(name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ToolError> {
    ProviderFactory::create_llm_provider(name, model)
        .map_err(|e| ToolError::InvalidConfig(format!("provider '{name}' is not configured: {e}")))
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) is used as-is.
/// 2. **Named provider** (`config.provider_name`, anything but `"auto"`)
///    is built with `config.text_model`; the factory reads that provider's
///    API key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`),
///    when both are set and non-empty.
/// 4. **Full auto-detection** via [`ProviderFactory::from_env`].
pub fn resolve_provider(config: &ToolkitConfig) -> Result<Arc<dyn LLMProvider>, ToolError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        if name != AUTO_PROVIDER {
            info!("Using provider '{}' with model {}", name, config.text_model);
            return create_provider(name, &config.text_model);
        }
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            info!("Using provider '{}' with model {} from environment", prov, model);
            return create_provider(&prov, &model);
        }
    }

    let (llm_provider, _embedding) = ProviderFactory::from_env().map_err(|e| {
        ToolError::InvalidConfig(format!(
            "no LLM provider could be auto-detected from the environment. \
             Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or name a provider. Error: {e}"
        ))
    })?;
    Ok(llm_provider)
}
