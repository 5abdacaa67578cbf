/// Matching module
///
/// Everything the match loop runs inside a single tick, minus capture.
///
/// ## Architecture
///
/// ```text
/// Frame ──> TemplateMatcher ──> MatchResult ──> TransitionTracker
///              ▲                                   │
///         TargetImage                        Transition { entered, exited }
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// let target = TargetImage::open("button.png")?;
/// let result = TemplateMatcher::new().match_template(&frame, &target)?;
///
/// let mut tracker = TransitionTracker::new();
/// let transition = tracker.observe(result.confidence, 0.8);
/// if transition.entered_match {
///     // fire the one-shot alert
/// }
/// ```

pub mod matcher;
mod plane;
pub mod target;
pub mod tracker;

pub use matcher::{MatchResult, TemplateMatcher};
pub use target::TargetImage;
pub use tracker::{Transition, TransitionTracker};
