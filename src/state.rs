//! Process state of one tool session.
//!
//! Within one run the status only moves forward:
//! `Idle → Processing → {Success | Error}`. Only an explicit reset goes back
//! to `Idle`. [`ProcessState::apply`] enforces this; the pipeline never
//! mutates the fields directly.

use std::fmt;
use std::sync::Arc;

/// Coarse status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessStatus {
    #[default]
    Idle,
    Processing,
    Success,
    Error,
}

impl ProcessStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessStatus::Success | ProcessStatus::Error)
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProcessStatus::Idle => "idle",
            ProcessStatus::Processing => "processing",
            ProcessStatus::Success => "success",
            ProcessStatus::Error => "error",
        })
    }
}

/// Output of a successful transform.
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub mime: String,
    pub bytes: Arc<[u8]>,
}

impl Artifact {
    pub fn new(filename: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            filename: filename.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    /// The artifact body as UTF-8 text, if it is text.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("filename", &self.filename)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Classified error as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub message: String,
    /// The user should fix configuration rather than retry.
    pub configuration: bool,
}

/// A state change request.
#[derive(Debug, Clone)]
pub enum Transition {
    Start { progress: u8 },
    Progress(u8),
    Succeed(Vec<Artifact>),
    Fail(ErrorInfo),
    Reset,
}

/// Snapshot of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessState {
    pub status: ProcessStatus,
    /// 0–100.
    pub progress: u8,
    pub error: Option<ErrorInfo>,
    pub artifacts: Vec<Artifact>,
}

impl ProcessState {
    /// Apply a transition. Returns `false` (and leaves the state unchanged)
    /// when the transition is not allowed from the current status.
    pub fn apply(&mut self, t: Transition) -> bool {
        use ProcessStatus::*;
        match (self.status, t) {
            (Idle, Transition::Start { progress }) => {
                self.status = Processing;
                self.progress = progress.min(100);
                self.error = None;
                self.artifacts.clear();
                true
            }
            (Processing, Transition::Progress(p)) => {
                let p = p.min(100);
                let changed = p != self.progress;
                self.progress = p;
                changed
            }
            (Processing, Transition::Succeed(artifacts)) => {
                self.status = Success;
                self.progress = 100;
                self.artifacts = artifacts;
                true
            }
            (Processing, Transition::Fail(info)) => {
                self.status = Error;
                self.error = Some(info);
                true
            }
            (_, Transition::Reset) => {
                let changed = *self != ProcessState::default();
                *self = ProcessState::default();
                changed
            }
            _ => false,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.status == ProcessStatus::Idle
    }
}
