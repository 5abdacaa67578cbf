/// Match engine
///
/// Controller for the background match loop. All public methods are called
/// from the consumer's thread; the worker only ever sees an immutable target
/// and a config snapshot per tick.
///
/// ## Lifecycle
///
/// ```text
/// NotRunning ──start──> Running ──stop──> StopRequested ──join──> NotRunning
/// ```
///
/// Replacing the target while running follows stop → swap → reset → restart
/// under the controller lock, so no tick ever sees a half-swapped target.
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Sender};
use parking_lot::{Mutex, RwLock};
use tracing::{error, info};

use crate::capture::FrameSource;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::matching::TargetImage;
use crate::messaging::EventSink;
use crate::state::{LoopState, LoopStateMachine, MatchState};

mod worker;

use worker::{SharedSource, Worker};

struct WorkerHandle {
    stop_tx: Sender<()>,
    thread: thread::JoinHandle<crate::utils::TickStats>,
}

struct Control {
    lifecycle: LoopStateMachine,
    target: Option<TargetImage>,
    worker: Option<WorkerHandle>,
}

struct EngineInner {
    source: SharedSource,
    sink: Arc<dyn EventSink>,
    config: Arc<RwLock<EngineConfig>>,
    match_state: Arc<Mutex<MatchState>>,
    control: Mutex<Control>,
}

/// Continuous screen matcher driving one background worker per session.
///
/// Cheap to clone; clones control the same engine. The worker is stopped
/// when the last handle is dropped.
#[derive(Clone)]
pub struct MatchEngine {
    inner: Arc<EngineInner>,
}

impl MatchEngine {
    pub fn new(source: Box<dyn FrameSource>, sink: Arc<dyn EventSink>) -> Self {
        Self::with_config(source, sink, EngineConfig::default())
    }

    /// Construct with an initial config. An invalid config is replaced by the
    /// defaults and logged; use [`MatchEngine::update_config`] to get the error.
    pub fn with_config(
        source: Box<dyn FrameSource>,
        sink: Arc<dyn EventSink>,
        config: EngineConfig,
    ) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(err) => {
                error!("{err}, falling back to default engine config");
                EngineConfig::default()
            }
        };

        Self {
            inner: Arc::new(EngineInner {
                source: Arc::new(Mutex::new(source)),
                sink,
                config: Arc::new(RwLock::new(config)),
                match_state: Arc::new(Mutex::new(MatchState::Idle)),
                control: Mutex::new(Control {
                    lifecycle: LoopStateMachine::new(),
                    target: None,
                    worker: None,
                }),
            }),
        }
    }

    /// Validate `target` and `config`, then spawn the worker.
    ///
    /// Returns `AlreadyRunning` if a session is active; stop it or use
    /// [`MatchEngine::set_target`] to switch images instead.
    pub fn start(&self, target: TargetImage, config: EngineConfig) -> EngineResult<()> {
        let mut control = self.inner.control.lock();
        if !control.lifecycle.state().is_stopped() {
            return Err(EngineError::AlreadyRunning);
        }

        config.validate()?;
        self.validate_target(&target)?;

        *self.inner.config.write() = config;
        control.target = Some(target);
        *self.inner.match_state.lock() = MatchState::Searching;
        self.spawn_worker(&mut control)
    }

    /// Stop the worker and wait for it to exit.
    ///
    /// Once this returns no further event is delivered for the session and
    /// the worker holds no reference to the target. Stopping a stopped engine
    /// is a no-op. Blocks without a timeout; never call it from an
    /// [`EventSink`] or anything else running on the worker thread.
    pub fn stop(&self) {
        let mut control = self.inner.control.lock();
        self.shutdown_worker(&mut control);
    }

    /// Replace (or clear, with `None`) the target image.
    ///
    /// A running loop is stopped, the target swapped, the transition state
    /// reset and the loop restarted, so a match at the same spot is reported
    /// as a fresh acquisition. An invalid target is rejected before the
    /// running session is touched.
    pub fn set_target(&self, target: Option<TargetImage>) -> EngineResult<()> {
        let mut control = self.inner.control.lock();

        let Some(target) = target else {
            self.shutdown_worker(&mut control);
            control.target = None;
            *self.inner.match_state.lock() = MatchState::Idle;
            info!("Target cleared");
            return Ok(());
        };

        self.validate_target(&target)?;

        let was_running = control.worker.is_some();
        self.shutdown_worker(&mut control);

        info!("Target set: {}x{}", target.width(), target.height());
        control.target = Some(target);
        *self.inner.match_state.lock() = MatchState::Searching;

        if was_running {
            self.spawn_worker(&mut control)?;
        }
        Ok(())
    }

    /// Apply a new config; picked up at the start of the next tick. On error
    /// the previous config stays in effect.
    pub fn update_config(&self, config: EngineConfig) -> EngineResult<()> {
        config.validate()?;
        *self.inner.config.write() = config;
        Ok(())
    }

    pub fn config(&self) -> EngineConfig {
        *self.inner.config.read()
    }

    pub fn loop_state(&self) -> LoopState {
        self.inner.control.lock().lifecycle.state()
    }

    pub fn match_state(&self) -> MatchState {
        *self.inner.match_state.lock()
    }

    pub fn target(&self) -> Option<TargetImage> {
        self.inner.control.lock().target.clone()
    }

    pub fn is_running(&self) -> bool {
        self.loop_state().is_running()
    }

    fn validate_target(&self, target: &TargetImage) -> EngineResult<()> {
        let (width, height) = self.inner.source.lock().extent()?;
        target.ensure_fits(width, height)
    }

    fn spawn_worker(&self, control: &mut Control) -> EngineResult<()> {
        let Some(target) = control.target.clone() else {
            return Err(EngineError::invalid_target("no target loaded"));
        };
        if control.lifecycle.start().is_err() {
            return Err(EngineError::AlreadyRunning);
        }

        let (stop_tx, stop_rx) = bounded(1);
        let worker = Worker::new(
            Arc::clone(&self.inner.source),
            Arc::clone(&self.inner.sink),
            Arc::clone(&self.inner.config),
            Arc::clone(&self.inner.match_state),
            target,
            stop_rx,
        );

        match thread::Builder::new()
            .name("match-worker".to_string())
            .spawn(move || worker.run())
        {
            Ok(thread) => {
                control.worker = Some(WorkerHandle { stop_tx, thread });
                Ok(())
            }
            Err(err) => {
                control.lifecycle.force_stop();
                Err(EngineError::WorkerSpawn(err))
            }
        }
    }

    fn shutdown_worker(&self, control: &mut Control) {
        let Some(handle) = control.worker.take() else {
            return;
        };

        if let Some(ran_for) = control.lifecycle.state().running_duration() {
            info!("Stopping match loop after {:.1?}", ran_for);
        }
        let _ = control.lifecycle.request_stop();
        // Full channel means a stop is already queued
        let _ = handle.stop_tx.try_send(());

        if handle.thread.join().is_err() {
            error!("Match worker panicked");
        }
        if control.lifecycle.mark_stopped().is_err() {
            control.lifecycle.force_stop();
        }

        // The session's edge state died with the worker
        let mut state = self.inner.match_state.lock();
        *state = if control.target.is_some() {
            MatchState::Searching
        } else {
            MatchState::Idle
        };
    }
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        let control = self.control.get_mut();
        if let Some(handle) = control.worker.take() {
            let _ = handle.stop_tx.try_send(());
            let _ = handle.thread.join();
        }
    }
}
