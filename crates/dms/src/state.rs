//! Alertness state tracking

use serde::{Deserialize, Serialize};
use std::fmt;

/// Displayed alertness state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertnessState {
    #[default]
    Awake,
    Drowsy,
    ClosedEyes,
    Yawning,
}

impl AlertnessState {
    /// Label shown to the operator
    pub fn label(&self) -> &'static str {
        match self {
            AlertnessState::Awake => "AWAKE",
            AlertnessState::Drowsy => "DROWSY",
            AlertnessState::ClosedEyes => "CLOSED EYES",
            AlertnessState::Yawning => "YAWNING",
        }
    }

    /// Whether this state can raise an audible alert
    pub fn is_alarming(&self) -> bool {
        matches!(self, AlertnessState::ClosedEyes | AlertnessState::Yawning)
    }
}

impl fmt::Display for AlertnessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One frame's classified signals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signals {
    /// Eyes-closed debouncer is sustained
    pub eyes_sustained: bool,
    /// Yawn debouncer is sustained
    pub yawn_sustained: bool,
    /// Eye ratio lies in the drowsy band (no debounce)
    pub drowsy: bool,
}

/// Pick the label for this frame. Closed eyes outrank yawning, which
/// outranks the drowsy band. A label holds only while its own trigger holds.
pub fn classify(signals: Signals) -> AlertnessState {
    if signals.eyes_sustained {
        AlertnessState::ClosedEyes
    } else if signals.yawn_sustained {
        AlertnessState::Yawning
    } else if signals.drowsy {
        AlertnessState::Drowsy
    } else {
        AlertnessState::Awake
    }
}

/// What changed between two frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionReason {
    EyesClosed,
    EyesReopened,
    YawnStarted,
    YawnEnded,
    EnteredDrowsyBand,
    LeftDrowsyBand,
}

impl TransitionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionReason::EyesClosed => "eyes closed",
            TransitionReason::EyesReopened => "eyes reopened",
            TransitionReason::YawnStarted => "yawn started",
            TransitionReason::YawnEnded => "yawn ended",
            TransitionReason::EnteredDrowsyBand => "entered drowsy band",
            TransitionReason::LeftDrowsyBand => "left drowsy band",
        }
    }
}

/// A label change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: AlertnessState,
    pub to: AlertnessState,
    pub reason: TransitionReason,
}

/// Pure transition step: next label plus the change, if any.
///
/// The reason comes from comparing the previous frame's raw flags with
/// this frame's.
pub fn step(
    prev_state: AlertnessState,
    prev: Signals,
    current: Signals,
) -> (AlertnessState, Option<Transition>) {
    let next = classify(current);
    if next == prev_state {
        return (next, None);
    }

    let reason = if current.eyes_sustained && !prev.eyes_sustained {
        TransitionReason::EyesClosed
    } else if prev.eyes_sustained && !current.eyes_sustained {
        TransitionReason::EyesReopened
    } else if current.yawn_sustained && !prev.yawn_sustained {
        TransitionReason::YawnStarted
    } else if prev.yawn_sustained && !current.yawn_sustained {
        TransitionReason::YawnEnded
    } else if current.drowsy {
        TransitionReason::EnteredDrowsyBand
    } else {
        TransitionReason::LeftDrowsyBand
    };

    (next, Some(Transition { from: prev_state, to: next, reason }))
}

/// Current label plus the previous frame's raw flags
#[derive(Debug, Clone, Default)]
pub struct AlertnessTracker {
    state: AlertnessState,
    last_signals: Signals,
}

impl AlertnessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one frame's signals
    pub fn update(&mut self, signals: Signals) -> Option<Transition> {
        let (next, transition) = step(self.state, self.last_signals, signals);
        self.state = next;
        self.last_signals = signals;
        transition
    }

    pub fn state(&self) -> AlertnessState {
        self.state
    }

    pub fn last_signals(&self) -> Signals {
        self.last_signals
    }

    /// Reset state (on subject change)
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EYES: Signals = Signals { eyes_sustained: true, yawn_sustained: false, drowsy: false };
    const YAWN: Signals = Signals { eyes_sustained: false, yawn_sustained: true, drowsy: false };
    const DROWSY: Signals = Signals { eyes_sustained: false, yawn_sustained: false, drowsy: true };
    const NONE: Signals = Signals { eyes_sustained: false, yawn_sustained: false, drowsy: false };

    #[test]
    fn test_eyes_outrank_yawn() {
        let both = Signals { eyes_sustained: true, yawn_sustained: true, drowsy: false };
        assert_eq!(classify(both), AlertnessState::ClosedEyes);
    }

    #[test]
    fn test_yawn_outranks_drowsy() {
        let both = Signals { yawn_sustained: true, drowsy: true, ..NONE };
        assert_eq!(classify(both), AlertnessState::Yawning);
    }

    #[test]
    fn test_reverts_to_awake_next_frame() {
        let mut tracker = AlertnessTracker::new();
        tracker.update(EYES);
        assert_eq!(tracker.state(), AlertnessState::ClosedEyes);

        let transition = tracker.update(NONE).unwrap();
        assert_eq!(tracker.state(), AlertnessState::Awake);
        assert_eq!(transition.reason, TransitionReason::EyesReopened);

        tracker.update(YAWN);
        let transition = tracker.update(NONE).unwrap();
        assert_eq!(transition.from, AlertnessState::Yawning);
        assert_eq!(transition.reason, TransitionReason::YawnEnded);
    }

    #[test]
    fn test_reopened_eyes_in_drowsy_band() {
        let mut tracker = AlertnessTracker::new();
        tracker.update(EYES);
        let transition = tracker.update(DROWSY).unwrap();
        assert_eq!(transition.to, AlertnessState::Drowsy);
        assert_eq!(transition.reason, TransitionReason::EyesReopened);
    }

    #[test]
    fn test_no_transition_while_unchanged() {
        let mut tracker = AlertnessTracker::new();
        assert!(tracker.update(NONE).is_none());
        assert!(tracker.update(DROWSY).is_some());
        assert!(tracker.update(DROWSY).is_none());
        assert_eq!(
            tracker.update(NONE).map(|t| t.reason),
            Some(TransitionReason::LeftDrowsyBand)
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(AlertnessState::ClosedEyes.to_string(), "CLOSED EYES");
        assert_eq!(AlertnessState::default().label(), "AWAKE");
        assert!(!AlertnessState::Drowsy.is_alarming());
    }
}
