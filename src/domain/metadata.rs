// ============================================================
// Layer 3 - Run Metadata
// ============================================================
// The audit record written once at the end of a successful
// training run, next to the weights and the class list.
//
// It carries everything needed to:
//   - reproduce the split       (seed, split)
//   - locate the artifact       (model_version)
//   - preprocess like training  (img_size)
// plus how the run ended, for later comparison between runs.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Why the epoch loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Validation accuracy plateaued; best weights were restored
    EarlyStopped,
    /// Validation accuracy reached the configured target
    TargetReached,
    /// Every configured epoch ran
    EpochsExhausted,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StopReason::EarlyStopped    => "early_stopped",
            StopReason::TargetReached   => "target_reached",
            StopReason::EpochsExhausted => "epochs_exhausted",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub model_version: String,
    pub img_size:      u32,
    /// Configured epoch budget (not the number actually run)
    pub epochs:        usize,
    pub batch_size:    usize,
    /// Fraction routed to validation
    pub split:         f64,
    pub seed:          u64,
    /// RFC 3339 UTC completion time, e.g. "2026-10-16T09:30:00.123Z"
    pub saved_at_utc:  String,

    #[serde(default)]
    pub classes:       Vec<String>,
    #[serde(default)]
    pub learning_rate: Option<f64>,
    #[serde(default)]
    pub epochs_run:    Option<usize>,
    #[serde(default)]
    pub stop_reason:   Option<StopReason>,
    #[serde(default)]
    pub best_epoch:    Option<usize>,
    #[serde(default)]
    pub final_val_accuracy: Option<f64>,
}

impl RunMetadata {
    /// Format a timestamp the way metadata files store it.
    pub fn timestamp(at: DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_is_utc_with_z_suffix() {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(RunMetadata::timestamp(at), "2026-01-02T03:04:05.000Z");
    }

    #[test]
    fn test_minimal_record_still_parses() {
        // Records written by older tooling only carry the core fields
        let json = r#"{
            "model_version": "v1", "img_size": 256, "epochs": 10,
            "batch_size": 64, "split": 0.2, "seed": 2022,
            "saved_at_utc": "2026-01-01T00:00:00Z"
        }"#;
        let md: RunMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(md.img_size, 256);
        assert!(md.stop_reason.is_none());
        assert!(md.classes.is_empty());
    }

    #[test]
    fn test_stop_reason_snake_case() {
        let s = serde_json::to_string(&StopReason::TargetReached).unwrap();
        assert_eq!(s, r#""target_reached""#);
        assert_eq!(StopReason::EarlyStopped.to_string(), "early_stopped");
    }
}
