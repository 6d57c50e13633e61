//! Alarm Arbiter Implementation

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::{AlertError, AlertSound};

/// How the alert sound is played relative to the frame loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackMode {
    /// Play on the caller's thread; `maybe_fire` returns after playback
    Blocking,
    /// Play on a dedicated thread; the gate stays busy until it finishes
    #[default]
    Detached,
}

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Minimum time between two alerts (seconds, default: 2.0)
    pub min_alarm_interval_secs: f64,
    /// Alert sound file
    pub sound_path: PathBuf,
    /// External player program used to play `sound_path`
    pub player: String,
    /// Arguments passed to the player before the sound path
    pub player_args: Vec<String>,
    /// Blocking or detached playback
    pub playback: PlaybackMode,
    /// When false, alerts are logged but no sound is played
    pub audible: bool,
    /// Longest a single playback may run before the player is killed (seconds)
    pub max_playback_secs: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            min_alarm_interval_secs: 2.0,
            sound_path: PathBuf::from("Alert.wav"),
            player: "aplay".to_string(),
            player_args: vec!["-q".to_string()],
            playback: PlaybackMode::Detached,
            audible: true,
            max_playback_secs: 5.0,
        }
    }
}

impl AlertConfig {
    /// Minimum alert spacing as a `Duration`
    pub fn min_alarm_interval(&self) -> Duration {
        Duration::from_secs_f64(self.min_alarm_interval_secs.max(0.0))
    }

    /// Playback limit as a `Duration`
    pub fn max_playback(&self) -> Duration {
        Duration::from_secs_f64(self.max_playback_secs.max(0.0))
    }

    /// Check the configuration for values the arbiter cannot honour
    pub fn validate(&self) -> Result<(), AlertError> {
        if !self.min_alarm_interval_secs.is_finite() || self.min_alarm_interval_secs <= 0.0 {
            return Err(AlertError::Config(format!(
                "min_alarm_interval_secs must be positive, got {}",
                self.min_alarm_interval_secs
            )));
        }
        if !self.max_playback_secs.is_finite() || self.max_playback_secs <= 0.0 {
            return Err(AlertError::Config(format!(
                "max_playback_secs must be positive, got {}",
                self.max_playback_secs
            )));
        }
        if self.audible && self.player.trim().is_empty() {
            return Err(AlertError::Config("player must be set when audible".into()));
        }
        Ok(())
    }
}

/// Signal that requested an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmCause {
    ClosedEyes,
    Yawning,
}

impl AlarmCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmCause::ClosedEyes => "closed_eyes",
            AlarmCause::Yawning => "yawning",
        }
    }
}

/// Shared alarm state: last alert time and the busy flag.
///
/// This is the only state shared with the playback thread.
#[derive(Debug, Default)]
pub struct AlarmGate {
    busy: AtomicBool,
    last_alarm: Mutex<Option<Instant>>,
}

impl AlarmGate {
    /// Whether an alert is currently sounding
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Time of the most recent alert, if any
    pub fn last_alarm(&self) -> Option<Instant> {
        *self.last_alarm.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn release(&self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Snapshot of arbiter counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlarmStats {
    pub fired: u64,
    pub suppressed_interval: u64,
    pub suppressed_busy: u64,
    pub playback_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    fired: AtomicU64,
    suppressed_interval: AtomicU64,
    suppressed_busy: AtomicU64,
    playback_failures: Arc<AtomicU64>,
}

/// Why a sustained request did not fire
enum Suppression {
    Interval(Duration),
    Busy,
}

/// Alarm arbiter: spacing and exclusivity for audible alerts
pub struct AlarmArbiter {
    min_interval: Duration,
    playback: PlaybackMode,
    gate: Arc<AlarmGate>,
    sound: Arc<dyn AlertSound>,
    counters: Counters,
}

impl AlarmArbiter {
    /// Create a new arbiter playing `sound`
    pub fn new(config: &AlertConfig, sound: Arc<dyn AlertSound>) -> Self {
        info!(
            "Creating alarm arbiter (interval {:.2}s, {:?} playback)",
            config.min_alarm_interval_secs, config.playback
        );
        Self {
            min_interval: config.min_alarm_interval(),
            playback: config.playback,
            gate: Arc::new(AlarmGate::default()),
            sound,
            counters: Counters::default(),
        }
    }

    /// Request an alert for `cause` at `now`.
    ///
    /// Fires only if `sustained` is true, at least the minimum interval has
    /// passed since the previous alert, and no alert is sounding. A fired
    /// alert consumes the interval even if playback fails.
    pub fn maybe_fire(&self, cause: AlarmCause, sustained: bool, now: Instant) -> bool {
        if !sustained {
            return false;
        }

        match self.acquire(now) {
            Ok(()) => {}
            Err(Suppression::Interval(since)) => {
                self.counters.suppressed_interval.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("dms_alarms_suppressed_total", "reason" => "interval")
                    .increment(1);
                debug!(
                    "Alarm for {} suppressed: {:.2}s since last alarm",
                    cause.as_str(),
                    since.as_secs_f64()
                );
                return false;
            }
            Err(Suppression::Busy) => {
                self.counters.suppressed_busy.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("dms_alarms_suppressed_total", "reason" => "busy").increment(1);
                debug!("Alarm for {} suppressed: alarm already sounding", cause.as_str());
                return false;
            }
        }

        self.counters.fired.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("dms_alarms_fired_total", "cause" => cause.as_str()).increment(1);
        info!("Alarm fired: {}", cause.as_str());

        match self.playback {
            PlaybackMode::Blocking => {
                if let Err(e) = self.sound.play() {
                    record_failure(&self.counters.playback_failures, &e);
                }
                self.gate.release();
            }
            PlaybackMode::Detached => self.play_detached(),
        }

        true
    }

    /// Check the interval and take the busy flag, stamping the alarm time
    fn acquire(&self, now: Instant) -> Result<(), Suppression> {
        let mut last = self.gate.last_alarm.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(previous) = *last {
            let since = now.saturating_duration_since(previous);
            if since < self.min_interval {
                return Err(Suppression::Interval(since));
            }
        }

        if self
            .gate
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Suppression::Busy);
        }

        *last = Some(now);
        Ok(())
    }

    fn play_detached(&self) {
        let gate = Arc::clone(&self.gate);
        let sound = Arc::clone(&self.sound);
        let failures = Arc::clone(&self.counters.playback_failures);

        let spawned = std::thread::Builder::new()
            .name("alarm-playback".into())
            .spawn(move || {
                if let Err(e) = sound.play() {
                    record_failure(&failures, &e);
                }
                gate.release();
            });

        if let Err(e) = spawned {
            record_failure(
                &self.counters.playback_failures,
                &AlertError::Playback(format!("could not start playback thread: {}", e)),
            );
            self.gate.release();
        }
    }

    /// Shared gate (busy flag and last alarm time)
    pub fn gate(&self) -> &AlarmGate {
        &self.gate
    }

    /// Get a snapshot of the arbiter counters
    pub fn stats(&self) -> AlarmStats {
        AlarmStats {
            fired: self.counters.fired.load(Ordering::Relaxed),
            suppressed_interval: self.counters.suppressed_interval.load(Ordering::Relaxed),
            suppressed_busy: self.counters.suppressed_busy.load(Ordering::Relaxed),
            playback_failures: self.counters.playback_failures.load(Ordering::Relaxed),
        }
    }
}

fn record_failure(failures: &AtomicU64, err: &AlertError) {
    failures.fetch_add(1, Ordering::Relaxed);
    metrics::counter!("dms_alarm_playback_failures_total").increment(1);
    error!("Error playing alarm: {}", err);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;

    #[derive(Default)]
    struct CountingSound {
        plays: AtomicUsize,
    }

    impl AlertSound for CountingSound {
        fn play(&self) -> Result<(), AlertError> {
            self.plays.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct BrokenSound;

    impl AlertSound for BrokenSound {
        fn play(&self) -> Result<(), AlertError> {
            Err(AlertError::Playback("no audio device".into()))
        }
    }

    /// Blocks playback until the test releases it
    struct HeldSound {
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl AlertSound for HeldSound {
        fn play(&self) -> Result<(), AlertError> {
            let rx = self.release.lock().unwrap();
            let _ = rx.recv_timeout(Duration::from_secs(5));
            Ok(())
        }
    }

    fn blocking_config() -> AlertConfig {
        AlertConfig {
            playback: PlaybackMode::Blocking,
            ..Default::default()
        }
    }

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_not_sustained_never_fires() {
        let sound = Arc::new(CountingSound::default());
        let arbiter = AlarmArbiter::new(&blocking_config(), sound.clone());

        assert!(!arbiter.maybe_fire(AlarmCause::ClosedEyes, false, Instant::now()));
        assert_eq!(sound.plays.load(Ordering::SeqCst), 0);
        assert!(arbiter.gate().last_alarm().is_none());
    }

    #[test]
    fn test_interval_suppresses_second_alarm() {
        let sound = Arc::new(CountingSound::default());
        let arbiter = AlarmArbiter::new(&blocking_config(), sound.clone());
        let t0 = Instant::now();

        assert!(arbiter.maybe_fire(AlarmCause::ClosedEyes, true, t0));
        assert!(!arbiter.maybe_fire(AlarmCause::ClosedEyes, true, t0 + secs(1.999)));
        assert_eq!(sound.plays.load(Ordering::SeqCst), 1);
        assert_eq!(arbiter.stats().suppressed_interval, 1);
    }

    #[test]
    fn test_spaced_alarms_both_fire() {
        let sound = Arc::new(CountingSound::default());
        let arbiter = AlarmArbiter::new(&blocking_config(), sound.clone());
        let t0 = Instant::now();

        assert!(arbiter.maybe_fire(AlarmCause::Yawning, true, t0));
        assert!(arbiter.maybe_fire(AlarmCause::Yawning, true, t0 + secs(2.0)));
        assert_eq!(sound.plays.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_two_signals_same_tick_fire_once() {
        let sound = Arc::new(CountingSound::default());
        let arbiter = AlarmArbiter::new(&blocking_config(), sound.clone());
        let now = Instant::now();

        let eyes = arbiter.maybe_fire(AlarmCause::ClosedEyes, true, now);
        let yawn = arbiter.maybe_fire(AlarmCause::Yawning, true, now);
        assert!(eyes);
        assert!(!yawn);
        assert_eq!(arbiter.stats().fired, 1);
    }

    #[test]
    fn test_playback_failure_consumes_slot() {
        let arbiter = AlarmArbiter::new(&blocking_config(), Arc::new(BrokenSound));
        let t0 = Instant::now();

        assert!(arbiter.maybe_fire(AlarmCause::ClosedEyes, true, t0));
        assert_eq!(arbiter.gate().last_alarm(), Some(t0));
        assert!(!arbiter.gate().is_busy());
        assert!(!arbiter.maybe_fire(AlarmCause::ClosedEyes, true, t0 + secs(0.5)));

        let stats = arbiter.stats();
        assert_eq!(stats.playback_failures, 1);
        assert_eq!(stats.fired, 1);
    }

    #[test]
    fn test_detached_playback_holds_busy_flag() {
        let (tx, rx) = mpsc::channel();
        let sound = Arc::new(HeldSound { release: Mutex::new(rx) });
        let arbiter = AlarmArbiter::new(&AlertConfig::default(), sound);
        let t0 = Instant::now();

        assert!(arbiter.maybe_fire(AlarmCause::ClosedEyes, true, t0));
        assert!(arbiter.gate().is_busy());

        // Interval has elapsed but the first alarm is still sounding
        assert!(!arbiter.maybe_fire(AlarmCause::Yawning, true, t0 + secs(3.0)));
        assert_eq!(arbiter.stats().suppressed_busy, 1);

        tx.send(()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while arbiter.gate().is_busy() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!arbiter.gate().is_busy());
        assert!(arbiter.maybe_fire(AlarmCause::Yawning, true, t0 + secs(3.0)));
    }

    #[test]
    fn test_config_validation() {
        assert!(AlertConfig::default().validate().is_ok());

        let zero = AlertConfig {
            min_alarm_interval_secs: 0.0,
            ..Default::default()
        };
        assert!(matches!(zero.validate(), Err(AlertError::Config(_))));

        let no_player = AlertConfig {
            player: " ".into(),
            ..Default::default()
        };
        assert!(no_player.validate().is_err());

        let unbounded = AlertConfig {
            max_playback_secs: 0.0,
            ..Default::default()
        };
        assert!(matches!(unbounded.validate(), Err(AlertError::Config(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_hung_player_releases_gate_after_limit() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let sound = crate::CommandSound::new(
            "sh",
            vec!["-c".into(), "sleep 30".into(), "player".into()],
            file.path(),
        )
        .unwrap()
        .with_timeout(Duration::from_millis(200));
        let arbiter = AlarmArbiter::new(&AlertConfig::default(), Arc::new(sound));
        let t0 = Instant::now();

        assert!(arbiter.maybe_fire(AlarmCause::ClosedEyes, true, t0));

        let deadline = Instant::now() + Duration::from_secs(5);
        while arbiter.gate().is_busy() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(!arbiter.gate().is_busy());
        assert_eq!(arbiter.stats().playback_failures, 1);

        // Alerting resumes once the interval has passed
        assert!(arbiter.maybe_fire(AlarmCause::ClosedEyes, true, t0 + secs(3.0)));
        assert_eq!(arbiter.stats().suppressed_busy, 0);
    }

    proptest::proptest! {
        #[test]
        fn fired_alarms_are_spaced_by_interval(
            gaps in proptest::collection::vec(0u64..3000, 1..40)
        ) {
            let arbiter = AlarmArbiter::new(&blocking_config(), Arc::new(CountingSound::default()));
            let t0 = Instant::now();
            let mut now = t0;
            let mut fired_at: Vec<Instant> = Vec::new();
            for gap in gaps {
                now += Duration::from_millis(gap);
                if arbiter.maybe_fire(AlarmCause::ClosedEyes, true, now) {
                    fired_at.push(now);
                }
            }
            for pair in fired_at.windows(2) {
                proptest::prop_assert!(pair[1] - pair[0] >= Duration::from_secs(2));
            }
        }
    }
}
