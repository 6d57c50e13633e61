//! Driver Monitoring System (DMS)
//!
//! Per-frame alertness classification from 68-point facial landmarks:
//! - Eye and mouth aspect ratios
//! - Consecutive-frame debouncing of closed eyes and yawning
//! - Alertness label (AWAKE / DROWSY / CLOSED EYES / YAWNING)
//! - Alarm requests through the alerting arbiter

pub mod analysis;
pub mod config;
pub mod debounce;
pub mod detector;
pub mod geometry;
pub mod landmarks;
pub mod state;

pub use analysis::{FaceAnalysis, FrameAnalysis};
pub use config::DmsConfig;
pub use debounce::FrameDebouncer;
pub use detector::{LandmarkDetector, LandmarkReplay, PreparedFrame};
pub use geometry::{eye_aspect_ratio, mouth_aspect_ratio, Point};
pub use landmarks::{EyeRegion, LandmarkSet, MouthRegion, LANDMARK_COUNT};
pub use state::{AlertnessState, AlertnessTracker, Signals, Transition};

use alerting::{AlarmArbiter, AlarmCause, AlarmStats};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Landmark detector loading failed: {0}")]
    DetectorLoad(String),

    #[error("Landmark detection failed: {0}")]
    Detection(String),

    #[error("Expected {expected} landmarks, got {actual}")]
    LandmarkCount { expected: usize, actual: usize },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// One monitoring session: debounce counters, alertness label and alarm
/// gate for a single subject. Fed one frame at a time by the frame loop.
pub struct DmsSession {
    config: DmsConfig,
    eyes_closed: FrameDebouncer,
    yawning: FrameDebouncer,
    tracker: AlertnessTracker,
    arbiter: AlarmArbiter,
    face_absent_frames: u32,
    frames_processed: u64,
}

impl DmsSession {
    /// Create a new session with configuration
    pub fn new(config: DmsConfig, arbiter: AlarmArbiter) -> Result<Self, DmsError> {
        config.validate()?;
        info!(
            "DMS session: EAR < {} for {} frames, MAR > {} for {} frames, drowsy band < {}",
            config.eye_ar_threshold,
            config.eye_ar_consec_frames,
            config.mar_threshold,
            config.yawn_consec_frames,
            config.eye_ar_drowsy_threshold
        );
        Ok(Self {
            eyes_closed: FrameDebouncer::new(config.eye_ar_consec_frames),
            yawning: FrameDebouncer::new(config.yawn_consec_frames),
            tracker: AlertnessTracker::new(),
            arbiter,
            face_absent_frames: 0,
            frames_processed: 0,
            config,
        })
    }

    /// Process the faces detected in one frame captured at `now`
    pub fn process(&mut self, faces: &[LandmarkSet], now: Instant) -> FrameAnalysis {
        self.frames_processed += 1;
        metrics::counter!("dms_frames_processed_total").increment(1);

        let Some(face) = faces.first() else {
            self.face_absent_frames = self.face_absent_frames.saturating_add(1);
            metrics::counter!("dms_frames_without_face_total").increment(1);
            if self.face_absent_frames == self.config.face_absent_warn_frames {
                warn!("No face detected for {} frames", self.face_absent_frames);
            }
            return FrameAnalysis {
                faces_detected: 0,
                face: None,
                state: self.tracker.state(),
                alarm: None,
                face_absent_frames: self.face_absent_frames,
            };
        };

        if self.face_absent_frames >= self.config.face_absent_warn_frames {
            info!("Face reacquired after {} frames", self.face_absent_frames);
        }
        self.face_absent_frames = 0;

        if faces.len() > 1 {
            debug!("{} faces detected, tracking the first", faces.len());
        }

        let (face, alarm) = self.observe_face(face, now);
        FrameAnalysis {
            faces_detected: faces.len(),
            state: face.state,
            face: Some(face),
            alarm,
            face_absent_frames: 0,
        }
    }

    fn observe_face(
        &mut self,
        face: &LandmarkSet,
        now: Instant,
    ) -> (FaceAnalysis, Option<AlarmCause>) {
        let left_eye = face.left_eye();
        let right_eye = face.right_eye();
        let mouth = face.mouth();

        let ear = geometry::binocular_ratio(
            eye_aspect_ratio(&left_eye),
            eye_aspect_ratio(&right_eye),
        );
        let mar = mouth_aspect_ratio(&mouth);

        // A missing ratio means the condition does not hold this frame
        let eyes_closed = ear.is_some_and(|e| e < self.config.eye_ar_threshold);
        let drowsy = ear.is_some_and(|e| self.config.in_drowsy_band(e));
        let yawning = mar.is_some_and(|m| m > self.config.mar_threshold);

        let signals = Signals {
            eyes_sustained: self.eyes_closed.observe(eyes_closed),
            yawn_sustained: self.yawning.observe(yawning),
            drowsy,
        };

        // Both requests go through the arbiter; the interval lets at most one fire
        let mut alarm = None;
        if self.arbiter.maybe_fire(AlarmCause::ClosedEyes, signals.eyes_sustained, now) {
            alarm = Some(AlarmCause::ClosedEyes);
        }
        if self.arbiter.maybe_fire(AlarmCause::Yawning, signals.yawn_sustained, now) {
            alarm = Some(AlarmCause::Yawning);
        }

        if let Some(transition) = self.tracker.update(signals) {
            metrics::counter!("dms_state_transitions_total", "state" => transition.to.label())
                .increment(1);
            info!(
                "State {} -> {} ({})",
                transition.from,
                transition.to,
                transition.reason.as_str()
            );
        }

        if let Some(ear) = ear {
            metrics::gauge!("dms_eye_aspect_ratio").set(ear as f64);
        }
        if let Some(mar) = mar {
            metrics::gauge!("dms_mouth_aspect_ratio").set(mar as f64);
        }

        let analysis = FaceAnalysis {
            left_eye: left_eye.points().to_vec(),
            right_eye: right_eye.points().to_vec(),
            mouth: mouth.points().to_vec(),
            ear,
            mar,
            state: self.tracker.state(),
            eyes_closed_frames: self.eyes_closed.count(),
            yawn_frames: self.yawning.count(),
        };
        (analysis, alarm)
    }

    /// Current alertness label
    pub fn state(&self) -> AlertnessState {
        self.tracker.state()
    }

    /// Frames processed so far (with or without a face)
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Alarm counters
    pub fn alarm_stats(&self) -> AlarmStats {
        self.arbiter.stats()
    }

    pub fn config(&self) -> &DmsConfig {
        &self.config
    }

    /// Reset counters and label (on subject change). The alarm gate is kept
    /// so the minimum interval still holds across the reset.
    pub fn reset_state(&mut self) {
        self.eyes_closed.reset();
        self.yawning.reset();
        self.tracker.reset();
        self.face_absent_frames = 0;
    }
}
