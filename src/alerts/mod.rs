/// Match alerts
///
/// Consumer-side reactions to match events: a notification line and an
/// optional sound when a match is first acquired, plus the overlay placement.
/// Everything here runs on the consumer's thread, never on the match worker.
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, info, warn};

use crate::config::{AppConfig, SoundKind};
use crate::error::AlertError;
use crate::messaging::{MatchEvent, MatchEventKind};
use crate::overlay::OverlayPlacement;

#[cfg(feature = "sound")]
pub mod sound;

#[cfg(feature = "sound")]
pub use sound::SoundAlert;

/// How often [`AlertDispatcher::run`] re-checks the shutdown flag
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// One step of a generated alert tone; a frequency of zero is a rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    pub frequency_hz: f32,
    pub seconds: f32,
}

const fn note(frequency_hz: f32, seconds: f32) -> Note {
    Note {
        frequency_hz,
        seconds,
    }
}

const A4: f32 = 440.0;
const C5: f32 = 523.25;
const F4: f32 = 349.23;

const BEEP: &[Note] = &[note(A4, 0.25)];
const SUCCESS: &[Note] = &[note(A4, 0.1), note(C5, 0.1)];
const ERROR: &[Note] = &[note(A4, 0.1), note(F4, 0.1)];
const MARIO: &[Note] = &[
    note(660.0, 0.1),
    note(660.0, 0.1),
    note(0.0, 0.1),
    note(660.0, 0.1),
    note(0.0, 0.1),
    note(520.0, 0.1),
    note(660.0, 0.1),
    note(0.0, 0.1),
    note(784.0, 0.15),
];

/// Generated notes for a sound kind. Empty for `None` and for `Custom`,
/// which plays a file instead.
pub fn tone_notes(kind: SoundKind) -> &'static [Note] {
    match kind {
        SoundKind::Beep => BEEP,
        SoundKind::Success => SUCCESS,
        SoundKind::Error => ERROR,
        SoundKind::Mario => MARIO,
        SoundKind::None | SoundKind::Custom => &[],
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    /// Only acquisitions notify; updates and losses are overlay-only.
    pub fn for_event(event: &MatchEvent) -> Option<Self> {
        match event.kind {
            MatchEventKind::Acquired => Some(Self {
                title: "Match found".to_string(),
                message: format!("Confidence: {:.1}%", event.confidence * 100.0),
            }),
            MatchEventKind::Updated | MatchEventKind::Lost => None,
        }
    }
}

pub trait Alert {
    fn name(&self) -> &'static str;

    fn fire(&mut self, notification: &Notification) -> Result<(), AlertError>;
}

/// Writes the notification to the log
#[derive(Debug, Default)]
pub struct LogAlert;

impl Alert for LogAlert {
    fn name(&self) -> &'static str {
        "log"
    }

    fn fire(&mut self, notification: &Notification) -> Result<(), AlertError> {
        info!("🔔 {}: {}", notification.title, notification.message);
        Ok(())
    }
}

/// Fans match events out to the configured alerts and keeps the overlay
/// placement current.
#[derive(Default)]
pub struct AlertDispatcher {
    alerts: Vec<Box<dyn Alert>>,
    overlay: OverlayPlacement,
}

impl AlertDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alert(mut self, alert: Box<dyn Alert>) -> Self {
        self.alerts.push(alert);
        self
    }

    /// Build the alert set from persisted settings. A sound device that
    /// fails to open is logged and skipped rather than failing startup.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut dispatcher = Self::new();

        if config.enable_notification {
            dispatcher = dispatcher.with_alert(Box::new(LogAlert));
        }

        if config.enable_sound {
            #[cfg(feature = "sound")]
            {
                match SoundAlert::from_config(config) {
                    Ok(Some(alert)) => dispatcher = dispatcher.with_alert(Box::new(alert)),
                    Ok(None) => {}
                    Err(err) => warn!("Sound alerts disabled: {err}"),
                }
            }

            #[cfg(not(feature = "sound"))]
            {
                debug!("Built without sound support, ignoring sound settings");
            }
        }

        dispatcher
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.len()
    }

    pub fn overlay(&self) -> &OverlayPlacement {
        &self.overlay
    }

    /// Handle one event. Returns how many alerts fired successfully.
    pub fn handle(&mut self, event: &MatchEvent) -> usize {
        if self.overlay.apply(event) {
            debug!("Overlay: {}", event.description());
        }

        let Some(notification) = Notification::for_event(event) else {
            return 0;
        };

        let mut fired = 0;
        for alert in &mut self.alerts {
            match alert.fire(&notification) {
                Ok(()) => fired += 1,
                Err(err) => warn!("{} alert failed: {err}", alert.name()),
            }
        }
        fired
    }

    /// Drain `events` until the sender side disconnects or `shutdown` is
    /// set. Returns the number of events handled.
    pub fn run(&mut self, events: &Receiver<MatchEvent>, shutdown: &AtomicBool) -> usize {
        let mut handled = 0;
        while !shutdown.load(Ordering::SeqCst) {
            match events.recv_timeout(SHUTDOWN_POLL) {
                Ok(event) => {
                    self.handle(&event);
                    handled += 1;
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::LogicalRect;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recording(Rc<RefCell<Vec<Notification>>>);

    impl Alert for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn fire(&mut self, notification: &Notification) -> Result<(), AlertError> {
            self.0.borrow_mut().push(notification.clone());
            Ok(())
        }
    }

    struct Broken;

    impl Alert for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn fire(&mut self, _notification: &Notification) -> Result<(), AlertError> {
            Err(AlertError::NoCustomSound)
        }
    }

    fn event(kind: MatchEventKind, confidence: f64) -> MatchEvent {
        MatchEvent::new(kind, LogicalRect::new(10, 20, 30, 40), confidence)
    }

    #[test]
    fn test_notification_text() {
        let notification =
            Notification::for_event(&event(MatchEventKind::Acquired, 0.9312)).unwrap();
        assert_eq!(notification.title, "Match found");
        assert_eq!(notification.message, "Confidence: 93.1%");

        assert!(Notification::for_event(&event(MatchEventKind::Updated, 0.95)).is_none());
        assert!(Notification::for_event(&event(MatchEventKind::Lost, 0.2)).is_none());
    }

    #[test]
    fn test_mario_tone_has_rests() {
        let notes = tone_notes(SoundKind::Mario);
        let frequencies: Vec<f32> = notes.iter().map(|n| n.frequency_hz).collect();
        assert_eq!(
            frequencies,
            vec![660.0, 660.0, 0.0, 660.0, 0.0, 520.0, 660.0, 0.0, 784.0]
        );

        let total: f32 = notes.iter().map(|n| n.seconds).sum();
        assert!((total - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_file_and_silent_kinds_have_no_notes() {
        assert!(tone_notes(SoundKind::None).is_empty());
        assert!(tone_notes(SoundKind::Custom).is_empty());
        assert_eq!(tone_notes(SoundKind::Beep), &[note(440.0, 0.25)]);
    }

    #[test]
    fn test_only_acquisitions_fire_alerts() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = AlertDispatcher::new().with_alert(Box::new(Recording(seen.clone())));

        assert_eq!(dispatcher.handle(&event(MatchEventKind::Acquired, 0.9)), 1);
        assert_eq!(dispatcher.handle(&event(MatchEventKind::Updated, 0.91)), 0);
        assert_eq!(dispatcher.handle(&event(MatchEventKind::Lost, 0.1)), 0);

        assert_eq!(seen.borrow().len(), 1);
        assert!(!dispatcher.overlay().is_visible());
    }

    #[test]
    fn test_failing_alert_does_not_block_others() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = AlertDispatcher::new()
            .with_alert(Box::new(Broken))
            .with_alert(Box::new(Recording(seen.clone())));

        assert_eq!(dispatcher.handle(&event(MatchEventKind::Acquired, 0.85)), 1);
        assert_eq!(seen.borrow().len(), 1);
        assert!(dispatcher.overlay().is_visible());
    }

    #[test]
    fn test_from_config_respects_notification_toggle() {
        let mut config = AppConfig::default();
        config.enable_sound = false;
        assert_eq!(AlertDispatcher::from_config(&config).alert_count(), 1);

        config.enable_notification = false;
        assert_eq!(AlertDispatcher::from_config(&config).alert_count(), 0);
    }

    #[test]
    fn test_run_drains_until_disconnect() {
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(event(MatchEventKind::Acquired, 0.9)).unwrap();
        tx.send(event(MatchEventKind::Updated, 0.9)).unwrap();
        drop(tx);

        let shutdown = AtomicBool::new(false);
        let mut dispatcher = AlertDispatcher::new();
        assert_eq!(dispatcher.run(&rx, &shutdown), 2);
        assert!(dispatcher.overlay().is_visible());
    }

    #[test]
    fn test_run_returns_on_shutdown() {
        let (_tx, rx) = crossbeam_channel::unbounded::<MatchEvent>();
        let shutdown = AtomicBool::new(true);
        assert_eq!(AlertDispatcher::new().run(&rx, &shutdown), 0);
    }
}
