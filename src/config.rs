/// Model configuration
///
/// Every tunable constant of the predictive model lives here. Defaults are
/// used unless `~/.flowsense/config.json` overrides them; missing keys in
/// the file fall back to the defaults.

use crate::error::{FlowsenseError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the data directory under the user's home
pub const DATA_DIR: &str = ".flowsense";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Threshold a fresh model starts with
    pub initial_threshold: f64,
    pub min_threshold: f64,
    pub max_threshold: f64,

    /// Number of most recent feedback records the controller looks at
    pub feedback_window: usize,
    /// Feedback needed in the window before the threshold moves
    pub min_feedback_samples: usize,
    /// Acceptance rate the controller steers towards
    pub target_acceptance: f64,
    /// Threshold change per unit of acceptance error
    pub adjustment_gain: f64,
    /// Errors smaller than this leave the threshold alone
    pub acceptance_deadband: f64,

    /// Hours either side of the queried hour that still count (at half weight)
    pub hour_tolerance: u32,
    /// Half-life used when decaying old interactions
    pub recency_half_life_days: f64,
    /// Executions needed before a workflow's score is trusted fully
    pub min_evidence: usize,
    pub max_predictions: usize,

    pub min_sequence_occurrences: usize,
    pub max_sequence_length: usize,
    /// Assumed duration of an action when the log doesn't carry one
    pub default_action_secs: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            initial_threshold: 0.80,
            min_threshold: 0.50,
            max_threshold: 0.95,
            feedback_window: 20,
            min_feedback_samples: 5,
            target_acceptance: 0.70,
            adjustment_gain: 0.05,
            acceptance_deadband: 0.05,
            hour_tolerance: 1,
            recency_half_life_days: 7.0,
            min_evidence: 5,
            max_predictions: 5,
            min_sequence_occurrences: 3,
            max_sequence_length: 5,
            default_action_secs: 5.0,
        }
    }
}

impl ModelConfig {
    /// Default location of the config file
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| {
            FlowsenseError::Config("Could not determine home directory".to_string())
        })?;
        Ok(home.join(DATA_DIR).join("config.json"))
    }

    /// Load from the default location, or defaults if there is no file
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path()?)
    }

    /// Load from a specific file. A missing file is not an error.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let config: ModelConfig = serde_json::from_str(&raw)?;
        config.validate()?;

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Reject configs the model can't run with
    pub fn validate(&self) -> Result<()> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);

        if !in_unit(self.min_threshold) || !in_unit(self.max_threshold) {
            return Err(FlowsenseError::Config(
                "threshold bounds must be within [0, 1]".to_string(),
            ));
        }
        if self.min_threshold > self.max_threshold {
            return Err(FlowsenseError::Config(format!(
                "min_threshold {} is above max_threshold {}",
                self.min_threshold, self.max_threshold
            )));
        }
        if !in_unit(self.target_acceptance) {
            return Err(FlowsenseError::Config(
                "target_acceptance must be within [0, 1]".to_string(),
            ));
        }
        if self.feedback_window == 0 {
            return Err(FlowsenseError::Config(
                "feedback_window must be at least 1".to_string(),
            ));
        }
        if self.min_feedback_samples > self.feedback_window {
            return Err(FlowsenseError::Config(format!(
                "min_feedback_samples {} exceeds feedback_window {}",
                self.min_feedback_samples, self.feedback_window
            )));
        }
        if self.adjustment_gain <= 0.0 || !self.adjustment_gain.is_finite() {
            return Err(FlowsenseError::Config(
                "adjustment_gain must be positive".to_string(),
            ));
        }
        if !in_unit(self.acceptance_deadband) {
            return Err(FlowsenseError::Config(
                "acceptance_deadband must be within [0, 1]".to_string(),
            ));
        }
        if self.default_action_secs < 0.0 || !self.default_action_secs.is_finite() {
            return Err(FlowsenseError::Config(
                "default_action_secs can't be negative".to_string(),
            ));
        }
        if self.hour_tolerance > 12 {
            return Err(FlowsenseError::Config(
                "hour_tolerance can't exceed 12 hours".to_string(),
            ));
        }
        if self.recency_half_life_days <= 0.0 {
            return Err(FlowsenseError::Config(
                "recency_half_life_days must be positive".to_string(),
            ));
        }
        if self.max_sequence_length < 2 {
            return Err(FlowsenseError::Config(
                "max_sequence_length must be at least 2".to_string(),
            ));
        }

        Ok(())
    }

    /// Initial threshold pulled into the allowed range
    pub fn starting_threshold(&self) -> f64 {
        self.initial_threshold
            .clamp(self.min_threshold, self.max_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = ModelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.starting_threshold(), 0.80);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ModelConfig::load_from(temp.path().join("nope.json")).unwrap();
        assert_eq!(config, ModelConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, r#"{ "initial_threshold": 0.7, "max_predictions": 2 }"#).unwrap();

        let config = ModelConfig::load_from(&path).unwrap();
        assert_eq!(config.initial_threshold, 0.7);
        assert_eq!(config.max_predictions, 2);
        assert_eq!(config.feedback_window, 20);
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let config = ModelConfig {
            min_threshold: 0.9,
            max_threshold: 0.6,
            ..ModelConfig::default()
        };

        match config.validate() {
            Err(FlowsenseError::Config(msg)) => assert!(msg.contains("min_threshold")),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    fn assert_rejected(config: ModelConfig, field: &str) {
        match config.validate() {
            Err(FlowsenseError::Config(msg)) => assert!(msg.contains(field), "{}", msg),
            other => panic!("Expected Config error for {}, got {:?}", field, other),
        }
    }

    #[test]
    fn test_negative_gain_rejected() {
        assert_rejected(
            ModelConfig {
                adjustment_gain: -0.05,
                ..ModelConfig::default()
            },
            "adjustment_gain",
        );
        assert_rejected(
            ModelConfig {
                adjustment_gain: 0.0,
                ..ModelConfig::default()
            },
            "adjustment_gain",
        );
    }

    #[test]
    fn test_deadband_out_of_range_rejected() {
        assert_rejected(
            ModelConfig {
                acceptance_deadband: 1.5,
                ..ModelConfig::default()
            },
            "acceptance_deadband",
        );
        assert_rejected(
            ModelConfig {
                acceptance_deadband: -0.1,
                ..ModelConfig::default()
            },
            "acceptance_deadband",
        );
    }

    #[test]
    fn test_samples_above_window_rejected() {
        assert_rejected(
            ModelConfig {
                min_feedback_samples: 50,
                ..ModelConfig::default()
            },
            "min_feedback_samples",
        );
    }

    #[test]
    fn test_negative_action_secs_rejected() {
        assert_rejected(
            ModelConfig {
                default_action_secs: -5.0,
                ..ModelConfig::default()
            },
            "default_action_secs",
        );
    }

    #[test]
    fn test_inverting_gain_file_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, r#"{ "adjustment_gain": -0.05 }"#).unwrap();

        assert!(matches!(
            ModelConfig::load_from(&path),
            Err(FlowsenseError::Config(_))
        ));
    }

    #[test]
    fn test_starting_threshold_clamped() {
        let config = ModelConfig {
            initial_threshold: 0.99,
            ..ModelConfig::default()
        };
        assert_eq!(config.starting_threshold(), 0.95);
    }
}
