/// Match loop worker
///
/// Runs on its own thread for one session: capture, match, classify, emit,
/// wait. The end-of-tick wait doubles as the stop check.
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::capture::FrameSource;
use crate::config::EngineConfig;
use crate::geometry::{to_logical_rect, LogicalRect};
use crate::matching::{MatchResult, TargetImage, TemplateMatcher, Transition, TransitionTracker};
use crate::messaging::{EventSink, MatchEvent, MatchEventKind};
use crate::state::MatchState;
use crate::utils::{TickStats, TickTiming, Timer};

/// Shortest pause between ticks, even when a tick overran the poll interval.
pub(crate) const MIN_TICK_GAP: Duration = Duration::from_millis(1);

pub(crate) type SharedSource = Arc<Mutex<Box<dyn FrameSource>>>;

enum TickOutcome {
    Completed(TickTiming),
    Skipped,
    Stopped,
}

pub(crate) struct Worker {
    source: SharedSource,
    sink: Arc<dyn EventSink>,
    config: Arc<RwLock<EngineConfig>>,
    match_state: Arc<Mutex<MatchState>>,
    target: TargetImage,
    stop_rx: Receiver<()>,
    matcher: TemplateMatcher,
    tracker: TransitionTracker,
    /// Rect of the latest matched tick, reported again when the match is lost
    last_rect: Option<LogicalRect>,
}

impl Worker {
    pub(crate) fn new(
        source: SharedSource,
        sink: Arc<dyn EventSink>,
        config: Arc<RwLock<EngineConfig>>,
        match_state: Arc<Mutex<MatchState>>,
        target: TargetImage,
        stop_rx: Receiver<()>,
    ) -> Self {
        Self {
            source,
            sink,
            config,
            match_state,
            target,
            stop_rx,
            matcher: TemplateMatcher::new(),
            tracker: TransitionTracker::new(),
            last_rect: None,
        }
    }

    /// Tick until stop is signalled. Returns the session's timing statistics.
    pub(crate) fn run(mut self) -> TickStats {
        info!(
            "Match loop started ({}x{} target)",
            self.target.width(),
            self.target.height()
        );
        let mut stats = TickStats::new();

        loop {
            let tick_timer = Timer::start();
            let config = *self.config.read();

            match self.tick(&config) {
                TickOutcome::Completed(timing) => stats.add(timing),
                TickOutcome::Skipped => stats.add_skipped(),
                TickOutcome::Stopped => break,
            }

            let interval = Duration::from_millis(config.poll_interval_ms);
            let wait = interval
                .saturating_sub(tick_timer.elapsed())
                .max(MIN_TICK_GAP);
            match self.stop_rx.recv_timeout(wait) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        info!("Match loop stopped");
        stats.log_report();
        stats
    }

    fn tick(&mut self, config: &EngineConfig) -> TickOutcome {
        let total_timer = Timer::start();

        let capture_timer = Timer::start();
        let grabbed = self.source.lock().grab_full_screen();
        let frame = match grabbed {
            Ok(frame) => frame,
            Err(err) => {
                warn!("Capture unavailable, skipping tick: {err}");
                return TickOutcome::Skipped;
            }
        };
        let capture_us = capture_timer.elapsed_us();

        let match_timer = Timer::start();
        let result = match self.matcher.match_template(&frame, &self.target) {
            Ok(result) => result,
            Err(err) => {
                warn!("Skipping tick: {err}");
                return TickOutcome::Skipped;
            }
        };
        drop(frame);
        let match_us = match_timer.elapsed_us();

        let rect = match to_logical_rect(&result, config.scale_factor, config.border_width) {
            Ok(rect) => rect,
            Err(err) => {
                warn!("Skipping tick: {err}");
                return TickOutcome::Skipped;
            }
        };

        // A stop that arrived mid-tick wins over emitting stale results
        if self.stop_pending() {
            return TickOutcome::Stopped;
        }

        let transition = self
            .tracker
            .observe(result.confidence, config.threshold_confidence);
        let timing = TickTiming {
            capture_us,
            match_us,
            total_us: total_timer.elapsed_us(),
        };
        log_tick(&result, &timing, config.threshold_confidence);

        if let Some(event) = self.classify(transition, rect, result.confidence) {
            self.sink.deliver(event);
        }

        TickOutcome::Completed(timing)
    }

    fn classify(
        &mut self,
        transition: Transition,
        rect: LogicalRect,
        confidence: f64,
    ) -> Option<MatchEvent> {
        let (state, event) = if transition.entered_match {
            info!(
                "Match acquired at ({}, {}) {}x{}, {:.1}%",
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                confidence * 100.0
            );
            self.last_rect = Some(rect);
            (
                MatchState::Matched,
                Some(MatchEvent::new(MatchEventKind::Acquired, rect, confidence)),
            )
        } else if transition.exited_match {
            info!("Match lost ({:.1}%)", confidence * 100.0);
            let last = self.last_rect.take().unwrap_or(rect);
            (
                MatchState::Searching,
                Some(MatchEvent::new(MatchEventKind::Lost, last, confidence)),
            )
        } else if self.tracker.is_matched() {
            self.last_rect = Some(rect);
            (
                MatchState::Matched,
                Some(MatchEvent::new(MatchEventKind::Updated, rect, confidence)),
            )
        } else {
            (MatchState::Searching, None)
        };

        *self.match_state.lock() = state;
        event
    }

    fn stop_pending(&self) -> bool {
        match self.stop_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => true,
            Err(TryRecvError::Empty) => false,
        }
    }
}

fn log_tick(result: &MatchResult, timing: &TickTiming, threshold: f64) {
    if result.confidence >= threshold {
        debug!(
            "[{:.1}ms, {:.2}%] match at ({}, {}) {}x{}",
            timing.total_ms(),
            result.confidence * 100.0,
            result.x,
            result.y,
            result.width,
            result.height
        );
    } else {
        debug!(
            "[{:.1}ms, {:.2}%] no match",
            timing.total_ms(),
            result.confidence * 100.0
        );
    }
}
