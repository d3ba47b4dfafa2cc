//! Configuration for the conversion toolkit.
//!
//! Every tunable used by the pipeline, the engines and the AI gateway lives
//! in [`ToolkitConfig`], built via [`ToolkitConfigBuilder`]. One struct is
//! shared (cloned) by every component of a session, so two runs with equal
//! configs behave identically.
//!
//! # Credentials
//! The API key is read once, at construction, by [`ToolkitConfig::from_env`].
//! A missing key is *not* a configuration error: tools that never touch the
//! AI gateway (merge, split, QR, ...) work without one, and AI tools report
//! [`crate::error::AiError::MissingCredentials`] before any network call.

use crate::error::ToolError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default Gemini REST endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// Model used for text operations and table extraction.
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
/// Model used for image-output operations.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

/// Toolkit configuration.
///
/// Built via [`ToolkitConfig::builder()`], [`ToolkitConfig::from_env()`] or
/// [`ToolkitConfig::default()`].
///
/// # Example
/// ```rust
/// use convertai::ToolkitConfig;
///
/// let config = ToolkitConfig::builder()
///     .api_key("AIza-test")
///     .jpg_scale(1.5)
///     .build()
///     .unwrap();
/// assert_eq!(config.jpg_quality, 90);
/// ```
#[derive(Clone)]
pub struct ToolkitConfig {
    /// API key for the generative-AI service. `None` means AI tools fail with
    /// `MissingCredentials` before any request is made.
    pub api_key: Option<String>,

    /// Base URL of the Gemini REST API. Default: [`DEFAULT_API_BASE_URL`].
    pub api_base_url: String,

    /// Model for summarize / translate / correct / table extraction.
    pub text_model: String,

    /// Model for background removal and image editing.
    pub image_model: String,

    /// edgequake-llm provider name ("openai", "anthropic", "ollama", ...).
    ///
    /// When set (or when `provider` is set), AI calls go through that provider
    /// instead of the Gemini REST backend. Such providers return text only, so
    /// image-output tools then fail with `NoOutputReturned`.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// HTTP timeout for a single AI request, in seconds. Default: `None`.
    ///
    /// With no timeout an AI call runs until the remote side answers. There
    /// is no cancel operation: a long call can only be abandoned by dropping
    /// the pipeline.
    pub request_timeout_secs: Option<u64>,

    /// Render scale for PDF → JPG. Default: 2.0.
    pub jpg_scale: f32,

    /// JPEG quality (1–100) for PDF → JPG. Default: 90.
    pub jpg_quality: u8,

    /// Render scale for page images sent to table extraction. Default: 1.5.
    pub table_scan_scale: f32,

    /// JPEG quality for table extraction page images. Default: 95.
    pub table_scan_quality: u8,

    /// Progress value set on entering `Processing`. Default: 10.
    pub initial_progress: u8,

    /// Increment of the synthetic progress ticker. Default: 5.
    pub tick_step: u8,

    /// The ticker never moves past this value. Default: 95.
    pub tick_ceiling: u8,

    /// Tick interval for text AI operations, ms. Default: 500.
    pub text_tick_interval_ms: u64,

    /// Tick interval for image AI operations, ms. Default: 800.
    pub image_tick_interval_ms: u64,

    /// QR output side length in pixels, quiet zone included. Default: 300.
    pub qr_size: u32,

    /// QR quiet zone in modules. Default: 2.
    pub qr_margin: u32,

    /// Explicit path to the pdfium shared library. `None` binds the system
    /// library.
    pub pdfium_library_path: Option<PathBuf>,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            provider_name: None,
            provider: None,
            request_timeout_secs: None,
            jpg_scale: 2.0,
            jpg_quality: 90,
            table_scan_scale: 1.5,
            table_scan_quality: 95,
            initial_progress: 10,
            tick_step: 5,
            tick_ceiling: 95,
            text_tick_interval_ms: 500,
            image_tick_interval_ms: 800,
            qr_size: 300,
            qr_margin: 2,
            pdfium_library_path: None,
        }
    }
}

impl fmt::Debug for ToolkitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolkitConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("jpg_scale", &self.jpg_scale)
            .field("jpg_quality", &self.jpg_quality)
            .field("table_scan_scale", &self.table_scan_scale)
            .field("table_scan_quality", &self.table_scan_quality)
            .field("initial_progress", &self.initial_progress)
            .field("tick_step", &self.tick_step)
            .field("tick_ceiling", &self.tick_ceiling)
            .field("qr_size", &self.qr_size)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .finish()
    }
}

impl ToolkitConfig {
    /// Create a new builder for `ToolkitConfig`.
    pub fn builder() -> ToolkitConfigBuilder {
        ToolkitConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults plus credentials and library path from the environment.
    ///
    /// `API_KEY` wins over `GEMINI_API_KEY`; empty values count as unset.
    pub fn from_env() -> Self {
        let api_key = ["API_KEY", "GEMINI_API_KEY"]
            .iter()
            .filter_map(|k| std::env::var(k).ok())
            .find(|v| !v.trim().is_empty());
        let pdfium_library_path = std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from);
        Self {
            api_key,
            pdfium_library_path,
            ..Self::default()
        }
    }

    /// Tick interval for text AI operations.
    pub fn text_tick_interval(&self) -> Duration {
        Duration::from_millis(self.text_tick_interval_ms)
    }

    /// Tick interval for image AI operations.
    pub fn image_tick_interval(&self) -> Duration {
        Duration::from_millis(self.image_tick_interval_ms)
    }

    /// True when AI calls should go through edgequake-llm.
    pub fn uses_llm_provider(&self) -> bool {
        self.provider.is_some() || self.provider_name.is_some()
    }
}

/// Builder for [`ToolkitConfig`].
#[derive(Debug)]
pub struct ToolkitConfigBuilder {
    config: ToolkitConfig,
}

impl ToolkitConfigBuilder {
    /// Start from [`ToolkitConfig::from_env`] instead of plain defaults.
    pub fn from_env() -> Self {
        Self {
            config: ToolkitConfig::from_env(),
        }
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.config.text_model = model.into();
        self
    }

    pub fn image_model(mut self, model: impl Into<String>) -> Self {
        self.config.image_model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn jpg_scale(mut self, scale: f32) -> Self {
        self.config.jpg_scale = scale.clamp(0.25, 8.0);
        self
    }

    pub fn jpg_quality(mut self, q: u8) -> Self {
        self.config.jpg_quality = q.clamp(1, 100);
        self
    }

    pub fn table_scan_scale(mut self, scale: f32) -> Self {
        self.config.table_scan_scale = scale.clamp(0.25, 8.0);
        self
    }

    pub fn table_scan_quality(mut self, q: u8) -> Self {
        self.config.table_scan_quality = q.clamp(1, 100);
        self
    }

    pub fn initial_progress(mut self, p: u8) -> Self {
        self.config.initial_progress = p;
        self
    }

    pub fn tick_step(mut self, step: u8) -> Self {
        self.config.tick_step = step;
        self
    }

    pub fn tick_ceiling(mut self, ceiling: u8) -> Self {
        self.config.tick_ceiling = ceiling;
        self
    }

    pub fn text_tick_interval_ms(mut self, ms: u64) -> Self {
        self.config.text_tick_interval_ms = ms;
        self
    }

    pub fn image_tick_interval_ms(mut self, ms: u64) -> Self {
        self.config.image_tick_interval_ms = ms;
        self
    }

    pub fn qr_size(mut self, px: u32) -> Self {
        self.config.qr_size = px;
        self
    }

    pub fn qr_margin(mut self, modules: u32) -> Self {
        self.config.qr_margin = modules;
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ToolkitConfig, ToolError> {
        let c = &self.config;
        if c.initial_progress > 100 || c.tick_ceiling > 100 {
            return Err(ToolError::InvalidConfig(format!(
                "progress values must be ≤ 100 (initial {}, ceiling {})",
                c.initial_progress, c.tick_ceiling
            )));
        }
        if c.tick_ceiling >= 100 {
            return Err(ToolError::InvalidConfig(
                "tick ceiling must stay below 100".into(),
            ));
        }
        if c.tick_step == 0 {
            return Err(ToolError::InvalidConfig("tick step must be ≥ 1".into()));
        }
        if c.text_tick_interval_ms == 0 || c.image_tick_interval_ms == 0 {
            return Err(ToolError::InvalidConfig(
                "tick intervals must be ≥ 1 ms".into(),
            ));
        }
        if c.qr_size < 21 + 2 * c.qr_margin {
            return Err(ToolError::InvalidConfig(format!(
                "QR size {}px is too small for a {}-module margin",
                c.qr_size, c.qr_margin
            )));
        }
        if c.api_base_url.trim().is_empty() {
            return Err(ToolError::InvalidConfig("API base URL is empty".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = ToolkitConfig::default();
        assert_eq!(c.text_model, "gemini-2.5-flash");
        assert_eq!(c.image_model, "gemini-2.5-flash-image");
        assert_eq!(c.jpg_quality, 90);
        assert_eq!(c.table_scan_quality, 95);
        assert_eq!(c.initial_progress, 10);
        assert_eq!(c.tick_ceiling, 95);
        assert_eq!(c.qr_size, 300);
        assert!(c.request_timeout_secs.is_none());
    }

    #[test]
    fn builder_clamps_quality_and_scale() {
        let c = ToolkitConfig::builder()
            .jpg_quality(0)
            .jpg_scale(100.0)
            .build()
            .unwrap();
        assert_eq!(c.jpg_quality, 1);
        assert_eq!(c.jpg_scale, 8.0);
    }

    #[test]
    fn ceiling_of_100_is_rejected() {
        let err = ToolkitConfig::builder().tick_ceiling(100).build().unwrap_err();
        assert!(matches!(err, ToolError::InvalidConfig(_)));
    }

    #[test]
    fn debug_redacts_key() {
        let c = ToolkitConfig::builder().api_key("super-secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn provider_name_switches_backend() {
        let c = ToolkitConfig::builder().provider_name("ollama").build().unwrap();
        assert!(c.uses_llm_provider());
        assert!(!ToolkitConfig::default().uses_llm_provider());
    }
}
