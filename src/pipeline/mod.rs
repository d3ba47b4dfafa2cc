//! The tool pipeline: the only stateful component of a session.
//!
//! A [`Pipeline`] owns one [`ProcessState`] and runs one [`ToolJob`] at a
//! time over injected engines and an injected AI gateway.
//!
//! ## Run lifecycle
//!
//! ```text
//! validate ──▶ Idle→Processing ──▶ transform ──▶ Success | Error
//! (local)      (atomic guard)      (engine/AI)   (terminal until reset)
//! ```
//!
//! 1. Local validation (file count and type, page range, required fields).
//!    Failures return [`ToolError::Validation`] and the state stays `Idle`.
//! 2. An atomic `Idle → Processing` transition at `initial_progress`. A
//!    second concurrent `run` gets [`ToolError::Busy`]; a `run` on a finished
//!    session gets [`ToolError::NotIdle`] until [`Pipeline::reset`].
//! 3. The tool transform. Engine work runs in `spawn_blocking` and reports
//!    per-unit progress; AI calls hold a [`ProgressTicker`] guard.
//! 4. `Success` with artifacts, or `Error` with the classified message.
//!
//! ## Cancellation
//!
//! There is none. An outstanding AI call runs until the service answers (or
//! the optional HTTP timeout fires). Dropping the pipeline future stops any
//! ticker, because the ticker is a guard owned by the transform's scope.

pub mod job;
mod transforms;

pub use job::{check_page_range, ToolJob};

use crate::catalog::ToolId;
use crate::config::ToolkitConfig;
use crate::engine::qr::{QrRequest, QrSession};
use crate::engine::{PdfEngine, PdfiumEngine};
use crate::error::{EngineError, ToolError};
use crate::gateway::AiGateway;
use crate::intake::SourceFile;
use crate::progress::{ProgressCallback, StateHandle};
use crate::state::{Artifact, ProcessState, ProcessStatus};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{error, info, warn};

/// One tool session.
pub struct Pipeline {
    config: ToolkitConfig,
    engine: Arc<dyn PdfEngine>,
    gateway: Arc<AiGateway>,
    state: StateHandle,
    qr: Mutex<QrSession>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("status", &self.state.status())
            .field("gateway", &self.gateway)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Pipeline over explicit engines and gateway.
    pub fn new(config: ToolkitConfig, engine: Arc<dyn PdfEngine>, gateway: Arc<AiGateway>) -> Self {
        let qr = Mutex::new(QrSession::new(config.qr_size, config.qr_margin));
        Self {
            config,
            engine,
            gateway,
            state: StateHandle::new(None),
            qr,
        }
    }

    /// Bind pdfium and build the gateway `config` asks for.
    pub fn from_config(config: ToolkitConfig) -> Result<Self, ToolError> {
        let engine = PdfiumEngine::new(config.pdfium_library_path.clone())?;
        let gateway = AiGateway::from_config(&config)?;
        Ok(Self::new(config, Arc::new(engine), Arc::new(gateway)))
    }

    /// As [`Pipeline::from_config`], binding pdfium up front only when
    /// `tool` needs it.
    pub fn for_tool(config: ToolkitConfig, tool: ToolId) -> Result<Self, ToolError> {
        let path = config.pdfium_library_path.clone();
        let engine = if tool.needs_pdf_engine() {
            PdfiumEngine::new(path)?
        } else {
            PdfiumEngine::lazy(path)
        };
        let gateway = AiGateway::from_config(&config)?;
        Ok(Self::new(config, Arc::new(engine), Arc::new(gateway)))
    }

    /// Mirror every state change to `callback`.
    ///
    /// Replaces the state channel, so call it before subscribing.
    pub fn with_callback(mut self, callback: ProgressCallback) -> Self {
        self.state = StateHandle::new(Some(callback));
        self
    }

    pub fn config(&self) -> &ToolkitConfig {
        &self.config
    }

    pub fn gateway(&self) -> &AiGateway {
        &self.gateway
    }

    /// Current state snapshot.
    pub fn state(&self) -> ProcessState {
        self.state.snapshot()
    }

    /// Receiver of every published state.
    pub fn subscribe(&self) -> watch::Receiver<ProcessState> {
        self.state.subscribe()
    }

    /// The state as a `Stream`, starting with the current value.
    pub fn updates(&self) -> WatchStream<ProcessState> {
        WatchStream::new(self.state.subscribe())
    }

    /// Back to `Idle`, discarding artifacts and errors.
    ///
    /// A `Processing` session is reset too. The abandoned run keeps going
    /// until its engine or AI call returns, but none of its progress, ticks
    /// or final transition reach the session again, even after a new run
    /// has started.
    pub fn reset(&self) {
        self.state.reset();
        if let Ok(mut qr) = self.qr.lock() {
            qr.clear();
        }
    }

    /// Run `job` over `files` (in the order given).
    pub async fn run(&self, files: &[SourceFile], job: &ToolJob) -> Result<Vec<Artifact>, ToolError> {
        let tool = job.tool_id();
        if tool.descriptor().is_coming_soon {
            return Err(ToolError::ComingSoon(tool));
        }
        self.ensure_idle()?;
        job.validate(files)?;

        // Split is the one tool whose validation needs the engine.
        if let ToolJob::SplitPdf { start, end } = job {
            match self.page_count(&files[0]).await {
                Ok(total) => check_page_range(*start, *end, total)?,
                Err(e) => {
                    self.state
                        .try_start(tool, self.config.initial_progress)?
                        .fail(&e);
                    return Err(e);
                }
            }
        }

        let run = self.state.try_start(tool, self.config.initial_progress)?;
        info!(
            "▶ {} started ({} input file(s))",
            tool,
            files.len()
        );
        let start = Instant::now();

        match self.transform(files, job, &run).await {
            Ok(artifacts) => {
                info!(
                    "✓ {} finished: {} artifact(s) in {}ms",
                    tool,
                    artifacts.len(),
                    start.elapsed().as_millis()
                );
                if !run.succeed(artifacts.clone()) {
                    warn!("{} finished after a reset; result not published", tool);
                }
                Ok(artifacts)
            }
            Err(e) => {
                error!("✗ {} failed: {}", tool, e);
                if !run.fail(&e) {
                    warn!("{} failed after a reset; error not published", tool);
                }
                Err(e)
            }
        }
    }

    /// Live QR preview: re-encodes only when the parameters changed.
    ///
    /// Does not touch the session state.
    pub fn qr_preview(&self, text: &str, dark: &str, light: &str) -> Result<Arc<[u8]>, ToolError> {
        let req = QrRequest::parse(text, dark, light)?;
        self.qr_png(&req)
    }

    /// Number of real QR encodes this session has performed.
    pub fn qr_encode_count(&self) -> usize {
        self.qr.lock().map(|q| q.encode_count()).unwrap_or(0)
    }

    fn qr_png(&self, req: &QrRequest) -> Result<Arc<[u8]>, ToolError> {
        let mut session = self
            .qr
            .lock()
            .map_err(|_| ToolError::Internal("QR session lock poisoned".into()))?;
        session.update(req)
    }

    fn ensure_idle(&self) -> Result<(), ToolError> {
        match self.state.status() {
            ProcessStatus::Idle => Ok(()),
            ProcessStatus::Processing => Err(ToolError::Busy),
            status => Err(ToolError::NotIdle {
                status: status.to_string(),
            }),
        }
    }

    async fn page_count(&self, file: &SourceFile) -> Result<usize, ToolError> {
        let file = file.clone();
        self.blocking(&self.state, move |engine, _| engine.page_count(file.bytes()))
            .await
    }

    /// Run engine work on the blocking pool with access to `state`.
    async fn blocking<T, F>(&self, state: &StateHandle, work: F) -> Result<T, ToolError>
    where
        F: FnOnce(&dyn PdfEngine, &StateHandle) -> Result<T, EngineError> + Send + 'static,
        T: Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        let state = state.clone();
        tokio::task::spawn_blocking(move || work(engine.as_ref(), &state))
            .await
            .map_err(|e| ToolError::Internal(format!("Engine task panicked: {}", e)))?
            .map_err(ToolError::from)
    }

    fn tool_interval(&self, tool: ToolId) -> std::time::Duration {
        use crate::catalog::ProgressMode;
        match tool.descriptor().progress {
            ProgressMode::TickingImage => self.config.image_tick_interval(),
            _ => self.config.text_tick_interval(),
        }
    }
}
