//! # convertai
//!
//! Document and image conversion tools plus AI-backed text and image
//! operations, behind one generic, observable pipeline.
//!
//! ## Why this crate?
//!
//! Every tool (merge a few PDFs, split out pages, rasterise to JPG, pull
//! tables out with a vision model, strip an image background, ...) follows
//! the same contract: take files, validate them, run one transform, report
//! progress, hand back artifacts. This crate implements that contract once
//! and parameterises it with a static tool table, instead of one state
//! machine per tool.
//!
//! ## Pipeline Overview
//!
//! ```text
//! files
//!  │
//!  ├─ 1. Intake     MIME/extension check, single vs multi-file lists
//!  ├─ 2. Validate   counts, page ranges, required fields (state stays Idle)
//!  ├─ 3. Start      atomic Idle → Processing (re-entry is rejected)
//!  ├─ 4. Transform  pdfium / DOCX / QR engines, or the AI gateway
//!  ├─ 5. Progress   per-page updates or a cancellable ticker
//!  └─ 6. Present    artifact names, summary, atomic save to disk
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use convertai::{Pipeline, SourceFile, ToolJob, ToolkitConfig, present};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API_KEY / GEMINI_API_KEY for AI tools, PDFIUM_LIB_PATH for pdfium
//!     let pipeline = Pipeline::from_config(ToolkitConfig::from_env())?;
//!     let files = vec![
//!         SourceFile::from_path("a.pdf").await?,
//!         SourceFile::from_path("b.pdf").await?,
//!     ];
//!     let artifacts = pipeline.run(&files, &ToolJob::MergePdf).await?;
//!     present::save_artifacts("out".as_ref(), &artifacts).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `convertai` binary (clap + indicatif + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! convertai = { version = "0.1", default-features = false }
//! ```
//!
//! ## AI backends
//!
//! | Backend | Selected when | Image output |
//! |---------|---------------|--------------|
//! | Gemini REST | `API_KEY` / `GEMINI_API_KEY` set | yes |
//! | edgequake-llm provider | `provider` or `provider_name` configured | no (text and tables only) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod intake;
pub mod pipeline;
pub mod present;
pub mod progress;
pub mod prompts;
pub mod state;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use catalog::{resolve, Route, ToolCategory, ToolDescriptor, ToolId, TOOLS};
pub use config::{ToolkitConfig, ToolkitConfigBuilder};
pub use engine::{PdfEngine, PdfiumEngine};
pub use error::{AiError, EngineError, ToolError, ValidationError};
pub use gateway::{AiGateway, AiOperation, AiOutput, ModelBackend};
pub use intake::{AcceptSpec, FileIntake, IntakeMode, IntakeReport, SourceFile};
pub use pipeline::{Pipeline, ToolJob};
pub use progress::{NoopProgressCallback, ProgressCallback, ToolProgressCallback};
pub use state::{Artifact, ProcessState, ProcessStatus};
