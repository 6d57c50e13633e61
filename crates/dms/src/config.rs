//! DMS configuration

use serde::{Deserialize, Serialize};

use crate::DmsError;

/// DMS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Eye aspect ratio below which the eyes count as closed
    pub eye_ar_threshold: f32,

    /// Upper bound of the drowsy band (closed threshold is the lower bound)
    pub eye_ar_drowsy_threshold: f32,

    /// Consecutive closed-eye frames before the signal is sustained
    pub eye_ar_consec_frames: u32,

    /// Mouth aspect ratio above which the mouth counts as yawning
    pub mar_threshold: f32,

    /// Consecutive yawning frames before the signal is sustained
    pub yawn_consec_frames: u32,

    /// Frames without a face before a warning is logged
    pub face_absent_warn_frames: u32,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            eye_ar_threshold: 0.18,
            eye_ar_drowsy_threshold: 0.22,
            eye_ar_consec_frames: 8,
            mar_threshold: 0.45,
            yawn_consec_frames: 6,
            face_absent_warn_frames: 30,
        }
    }
}

impl DmsConfig {
    /// Create strict config (earlier detection)
    pub fn strict() -> Self {
        Self {
            eye_ar_threshold: 0.20,
            eye_ar_drowsy_threshold: 0.25,
            eye_ar_consec_frames: 6,
            mar_threshold: 0.40,
            yawn_consec_frames: 4,
            ..Default::default()
        }
    }

    /// Create lenient config (fewer false alarms)
    pub fn lenient() -> Self {
        Self {
            eye_ar_threshold: 0.16,
            eye_ar_drowsy_threshold: 0.20,
            eye_ar_consec_frames: 12,
            mar_threshold: 0.50,
            yawn_consec_frames: 9,
            ..Default::default()
        }
    }

    /// Reject threshold combinations the state machine cannot use
    pub fn validate(&self) -> Result<(), DmsError> {
        let ratios = [
            ("eye_ar_threshold", self.eye_ar_threshold),
            ("eye_ar_drowsy_threshold", self.eye_ar_drowsy_threshold),
            ("mar_threshold", self.mar_threshold),
        ];
        for (name, value) in ratios {
            if !value.is_finite() || value <= 0.0 {
                return Err(DmsError::Config(format!("{} must be positive, got {}", name, value)));
            }
        }
        if self.eye_ar_threshold >= self.eye_ar_drowsy_threshold {
            return Err(DmsError::Config(format!(
                "eye_ar_threshold ({}) must be below eye_ar_drowsy_threshold ({})",
                self.eye_ar_threshold, self.eye_ar_drowsy_threshold
            )));
        }
        if self.eye_ar_consec_frames == 0 || self.yawn_consec_frames == 0 {
            return Err(DmsError::Config("consecutive frame counts must be at least 1".into()));
        }
        Ok(())
    }

    /// Eye ratio strictly inside the drowsy band
    pub fn in_drowsy_band(&self, ear: f32) -> bool {
        ear > self.eye_ar_threshold && ear < self.eye_ar_drowsy_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(DmsConfig::default().validate().is_ok());
        assert!(DmsConfig::strict().validate().is_ok());
        assert!(DmsConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_inverted_band_rejected() {
        let config = DmsConfig {
            eye_ar_threshold: 0.25,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DmsError::Config(_))));
    }

    #[test]
    fn test_zero_frames_rejected() {
        let config = DmsConfig {
            yawn_consec_frames: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_drowsy_band_is_exclusive() {
        let config = DmsConfig::default();
        assert!(!config.in_drowsy_band(0.18));
        assert!(config.in_drowsy_band(0.20));
        assert!(!config.in_drowsy_band(0.22));
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: DmsConfig = serde_json::from_str(r#"{ "mar_threshold": 0.5 }"#).unwrap();
        assert_eq!(config.mar_threshold, 0.5);
        assert_eq!(config.eye_ar_consec_frames, 8);
    }
}
