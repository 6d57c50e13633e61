//! Frame loop: acquire, prepare, detect, analyse, render

use std::future::Future;

use alerting::AlarmStats;
use camera_capture::{CameraConfig, FrameSource};
use dms::{DmsSession, LandmarkDetector, PreparedFrame};
use serde::Serialize;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::render::Renderer;
use crate::MonitorError;

/// Totals reported when the loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoopSummary {
    /// Frames analysed
    pub frames: u64,
    /// Frames where at least one face was found
    pub frames_with_face: u64,
    /// Frames dropped on read or detection errors
    pub skipped: u64,
    pub alarms: AlarmStats,
}

enum Step {
    Continue,
    Exhausted,
}

/// Drives a `DmsSession` from a frame source at the configured rate
pub struct FrameLoop<S, D> {
    source: S,
    detector: D,
    session: DmsSession,
    renderers: Vec<Box<dyn Renderer>>,
    camera: CameraConfig,
    consecutive_failures: u32,
    summary: LoopSummary,
}

impl<S: FrameSource, D: LandmarkDetector> FrameLoop<S, D> {
    pub fn new(
        source: S,
        detector: D,
        session: DmsSession,
        renderers: Vec<Box<dyn Renderer>>,
        camera: CameraConfig,
    ) -> Self {
        Self {
            source,
            detector,
            session,
            renderers,
            camera,
            consecutive_failures: 0,
            summary: LoopSummary::default(),
        }
    }

    /// Run until the source is exhausted or `shutdown` completes
    pub async fn run(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<LoopSummary, MonitorError> {
        let mut ticker = tokio::time::interval(self.camera.frame_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!("Frame loop started at {} fps", self.camera.fps);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    if let Step::Exhausted = self.step()? {
                        info!("Frame source exhausted");
                        break;
                    }
                }
            }
        }

        Ok(self.summary())
    }

    /// Totals so far
    pub fn summary(&self) -> LoopSummary {
        LoopSummary {
            alarms: self.session.alarm_stats(),
            ..self.summary
        }
    }

    fn step(&mut self) -> Result<Step, MonitorError> {
        let frame = match self.source.next_frame() {
            Ok(Some(frame)) => {
                self.consecutive_failures = 0;
                frame
            }
            Ok(None) => return Ok(Step::Exhausted),
            Err(e) => {
                self.consecutive_failures += 1;
                self.summary.skipped += 1;
                if self.consecutive_failures > self.camera.max_consecutive_failures {
                    error!(
                        "Giving up after {} consecutive read failures",
                        self.consecutive_failures
                    );
                    return Err(MonitorError::TooManyFailures(self.consecutive_failures));
                }
                warn!("Skipping frame: {}", e);
                return Ok(Step::Continue);
            }
        };

        let frame = frame.fit_within(self.camera.width, self.camera.height);
        let prepared = PreparedFrame::new(&frame);

        let faces = match self.detector.detect(&prepared) {
            Ok(faces) => faces,
            Err(e) => {
                self.summary.skipped += 1;
                warn!("Frame {}: detection failed, skipping: {}", frame.sequence, e);
                return Ok(Step::Continue);
            }
        };

        let analysis = self.session.process(&faces, Instant::now().into_std());
        self.summary.frames += 1;
        if analysis.face_detected() {
            self.summary.frames_with_face += 1;
        }

        for renderer in &mut self.renderers {
            if let Err(e) = renderer.render(&frame, &analysis) {
                warn!("Frame {}: render failed: {}", frame.sequence, e);
            }
        }

        Ok(Step::Continue)
    }
}
