//! Progress reporting: the observer trait, the shared state handle, and the
//! synthetic ticker used while an opaque AI call is outstanding.
//!
//! Every state change of a pipeline goes through a [`StateHandle`], which
//! publishes the new [`ProcessState`] on a `tokio::sync::watch` channel and
//! mirrors it to an optional [`ToolProgressCallback`].
//!
//! # Why both a channel and a callback?
//!
//! The channel gives async consumers the latest snapshot without missing the
//! terminal state. The callback is the least-invasive hook for code that just
//! wants events (a terminal progress bar, a log line) and works from inside
//! `spawn_blocking` engine work, where there is no async context to await on.
//!
//! # Example
//!
//! ```rust
//! use convertai::{ToolProgressCallback, ProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicU8, Ordering}};
//!
//! struct LastPercent(AtomicU8);
//!
//! impl ToolProgressCallback for LastPercent {
//!     fn on_progress(&self, percent: u8) {
//!         self.0.store(percent, Ordering::SeqCst);
//!     }
//! }
//!
//! let cb: ProgressCallback = Arc::new(LastPercent(AtomicU8::new(0)));
//! cb.on_progress(40);
//! ```

use crate::catalog::ToolId;
use crate::error::ToolError;
use crate::state::{Artifact, ErrorInfo, ProcessState, ProcessStatus, Transition};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::trace;

/// Observer of a pipeline run.
///
/// Implementations must be `Send + Sync`: per-page events fire from the
/// blocking thread pool. All methods have default no-op implementations so
/// callers only override what they care about.
pub trait ToolProgressCallback: Send + Sync {
    /// Called once when the run enters `Processing`.
    fn on_run_start(&self, tool: ToolId, initial_progress: u8) {
        let _ = (tool, initial_progress);
    }

    /// Called whenever the progress value changes.
    fn on_progress(&self, percent: u8) {
        let _ = percent;
    }

    /// Called after each unit (file, page) of a per-unit tool.
    ///
    /// # Arguments
    /// * `unit` : 1-indexed unit just finished
    /// * `total`: number of units
    fn on_unit_complete(&self, unit: usize, total: usize) {
        let _ = (unit, total);
    }

    /// Called once on `Success`.
    fn on_run_complete(&self, artifacts: &[Artifact]) {
        let _ = artifacts;
    }

    /// Called once on `Error`.
    fn on_run_error(&self, error: &ErrorInfo) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ToolProgressCallback for NoopProgressCallback {}

/// Shared, cloneable callback handle.
pub type ProgressCallback = Arc<dyn ToolProgressCallback>;

/// `round(done / total * 100)`, 100 for an empty job.
pub fn unit_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done as f64 / total as f64) * 100.0).round().min(100.0) as u8
}

// ── State handle ─────────────────────────────────────────────────────────

/// Thread-safe writer of a session's [`ProcessState`].
///
/// The session handle owned by a pipeline is unbound. [`StateHandle::try_start`]
/// hands out a handle bound to that run; once the session is reset (and
/// possibly restarted), every write through the old run's handle is dropped.
/// Generation checks happen inside the channel's write lock, so a reset and a
/// stale write cannot interleave.
#[derive(Clone)]
pub struct StateHandle {
    tx: Arc<watch::Sender<ProcessState>>,
    callback: Option<ProgressCallback>,
    generation: Arc<AtomicU64>,
    run: Option<u64>,
}

impl StateHandle {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        let (tx, _rx) = watch::channel(ProcessState::default());
        Self {
            tx: Arc::new(tx),
            callback,
            generation: Arc::new(AtomicU64::new(0)),
            run: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ProcessState> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> ProcessState {
        self.tx.borrow().clone()
    }

    pub fn status(&self) -> ProcessStatus {
        self.tx.borrow().status
    }

    /// `false` once the run this handle is bound to has been reset away.
    /// Always `true` for the unbound session handle.
    pub fn is_current(&self) -> bool {
        self.run
            .is_none_or(|run| run == self.generation.load(Ordering::SeqCst))
    }

    /// Atomically move `Idle → Processing` and return a handle bound to the
    /// new run.
    ///
    /// Fails with [`ToolError::Busy`] if a run is in flight and
    /// [`ToolError::NotIdle`] if the session has finished without a reset.
    pub fn try_start(&self, tool: ToolId, initial: u8) -> Result<StateHandle, ToolError> {
        let mut outcome = Err(ProcessStatus::Idle);
        self.tx.send_if_modified(|s| {
            if s.apply(Transition::Start { progress: initial }) {
                outcome = Ok(self.generation.fetch_add(1, Ordering::SeqCst) + 1);
                true
            } else {
                outcome = Err(s.status);
                false
            }
        });
        match outcome {
            Ok(run) => {
                trace!("run {} started", run);
                if let Some(cb) = &self.callback {
                    cb.on_run_start(tool, initial);
                }
                Ok(StateHandle {
                    run: Some(run),
                    ..self.clone()
                })
            }
            Err(ProcessStatus::Processing) => Err(ToolError::Busy),
            Err(status) => Err(ToolError::NotIdle {
                status: status.to_string(),
            }),
        }
    }

    /// Apply `t` if this handle's run is still the live one.
    fn apply(&self, t: Transition) -> bool {
        self.tx.send_if_modified(|s| self.is_current() && s.apply(t))
    }

    /// Set progress. Returns `false` if nothing changed (same value, the
    /// run is no longer `Processing`, or the run was reset away).
    pub fn progress(&self, percent: u8) -> bool {
        let changed = self.apply(Transition::Progress(percent));
        if changed {
            trace!("progress {}%", percent);
            if let Some(cb) = &self.callback {
                cb.on_progress(percent);
            }
        }
        changed
    }

    /// Report unit `done` of `total` finished.
    pub fn unit_done(&self, done: usize, total: usize) {
        if !self.is_current() {
            return;
        }
        self.progress(unit_percent(done, total));
        if let Some(cb) = &self.callback {
            cb.on_unit_complete(done, total);
        }
    }

    /// Returns `false` if the run was no longer live.
    pub fn succeed(&self, artifacts: Vec<Artifact>) -> bool {
        let changed = self.apply(Transition::Succeed(artifacts));
        if changed {
            if let Some(cb) = &self.callback {
                let artifacts = self.tx.borrow().artifacts.clone();
                cb.on_run_complete(&artifacts);
            }
        }
        changed
    }

    /// Returns `false` if the run was no longer live.
    pub fn fail(&self, error: &ToolError) -> bool {
        let info = ErrorInfo {
            message: error.to_string(),
            configuration: error.is_configuration_error(),
        };
        let changed = self.apply(Transition::Fail(info.clone()));
        if changed {
            if let Some(cb) = &self.callback {
                cb.on_run_error(&info);
            }
        }
        changed
    }

    /// Back to `Idle`. Any run started before this call loses its handle.
    pub fn reset(&self) {
        self.tx.send_if_modified(|s| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            s.apply(Transition::Reset)
        });
    }
}

// ── Ticker ───────────────────────────────────────────────────────────────

/// Synthetic progress for a single opaque call.
///
/// Adds `step` every `interval` up to `ceiling` while the run is
/// `Processing`. The background task is aborted when the guard drops, so
/// every exit path of the owning scope stops it. A ticker started from a
/// run-bound handle also exits once that run is reset away.
pub struct ProgressTicker {
    handle: JoinHandle<()>,
}

impl ProgressTicker {
    /// Must be called from within a Tokio runtime.
    pub fn start(state: StateHandle, interval: Duration, step: u8, ceiling: u8) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let snap = state.snapshot();
                if snap.status != ProcessStatus::Processing || !state.is_current() {
                    break;
                }
                if snap.progress >= ceiling {
                    continue;
                }
                state.progress(snap.progress.saturating_add(step).min(ceiling));
            }
        });
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        starts: AtomicUsize,
        units: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        percents: Mutex<Vec<u8>>,
    }

    impl ToolProgressCallback for Recorder {
        fn on_run_start(&self, _tool: ToolId, _initial: u8) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }
        fn on_progress(&self, percent: u8) {
            self.percents.lock().unwrap().push(percent);
        }
        fn on_unit_complete(&self, _unit: usize, _total: usize) {
            self.units.fetch_add(1, Ordering::SeqCst);
        }
        fn on_run_complete(&self, _artifacts: &[Artifact]) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }
        fn on_run_error(&self, _error: &ErrorInfo) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn unit_percent_rounds() {
        assert_eq!(unit_percent(1, 3), 33);
        assert_eq!(unit_percent(2, 3), 67);
        assert_eq!(unit_percent(3, 3), 100);
        assert_eq!(unit_percent(1, 8), 13);
        assert_eq!(unit_percent(0, 0), 100);
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_run_start(ToolId::MergePdf, 10);
        cb.on_progress(50);
        cb.on_unit_complete(1, 2);
        cb.on_run_complete(&[]);
    }

    #[test]
    fn handle_mirrors_transitions_to_callback() {
        let rec = Arc::new(Recorder::default());
        let h = StateHandle::new(Some(rec.clone() as ProgressCallback));
        h.try_start(ToolId::PdfToJpg, 10).unwrap();
        h.unit_done(1, 2);
        h.unit_done(2, 2);
        h.succeed(vec![]);
        assert_eq!(rec.starts.load(Ordering::SeqCst), 1);
        assert_eq!(rec.units.load(Ordering::SeqCst), 2);
        assert_eq!(rec.completes.load(Ordering::SeqCst), 1);
        assert_eq!(*rec.percents.lock().unwrap(), vec![50, 100]);
        assert_eq!(h.snapshot().progress, 100);
    }

    #[test]
    fn second_start_is_busy_then_not_idle() {
        let h = StateHandle::new(None);
        h.try_start(ToolId::Summarize, 10).unwrap();
        assert!(matches!(h.try_start(ToolId::Summarize, 10), Err(ToolError::Busy)));
        h.fail(&ToolError::NoTablesFound);
        assert!(matches!(
            h.try_start(ToolId::Summarize, 10),
            Err(ToolError::NotIdle { .. })
        ));
        h.reset();
        assert!(h.try_start(ToolId::Summarize, 10).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_climbs_to_ceiling_and_stops_on_drop() {
        let h = StateHandle::new(None);
        h.try_start(ToolId::Summarize, 10).unwrap();
        let ticker = ProgressTicker::start(h.clone(), Duration::from_millis(500), 5, 95);

        tokio::time::sleep(Duration::from_millis(1_050)).await;
        assert_eq!(h.snapshot().progress, 20);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(h.snapshot().progress, 95);

        drop(ticker);
        h.succeed(vec![]);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(h.snapshot().progress, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_detaches_the_old_run_and_its_ticker() {
        let rec = Arc::new(Recorder::default());
        let session = StateHandle::new(Some(rec.clone() as ProgressCallback));
        let old = session.try_start(ToolId::Summarize, 10).unwrap();
        let old_ticker = ProgressTicker::start(old.clone(), Duration::from_millis(100), 5, 95);

        session.reset();
        let new = session.try_start(ToolId::Translate, 10).unwrap();
        assert!(!old.is_current());
        assert!(new.is_current());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(old_ticker.is_finished());
        assert_eq!(session.snapshot().progress, 10);

        assert!(!old.progress(80));
        old.unit_done(1, 1);
        assert!(!old.succeed(vec![]));
        assert!(!old.fail(&ToolError::NoTablesFound));
        let snap = session.snapshot();
        assert_eq!(snap.status, ProcessStatus::Processing);
        assert_eq!(snap.progress, 10);
        assert_eq!(rec.units.load(Ordering::SeqCst), 0);
        assert_eq!(rec.errors.load(Ordering::SeqCst), 0);

        assert!(new.succeed(vec![]));
        assert_eq!(rec.completes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_exits_when_run_finishes() {
        let h = StateHandle::new(None);
        h.try_start(ToolId::RemoveBackground, 10).unwrap();
        let ticker = ProgressTicker::start(h.clone(), Duration::from_millis(800), 5, 95);
        h.fail(&ToolError::Internal("x".into()));
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(ticker.is_finished());
    }
}
