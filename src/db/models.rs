/// Data models for interactions, feedback, and workflows
///
/// Domain types are plain serde structs. The `*Row` types mirror the SQLite
/// tables and convert into domain types on load.

use crate::error::{FlowsenseError, Result};
use crate::intelligence::InteractionContext;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Intent the assistant detected for an interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedIntent {
    pub intent_type: String,
    pub confidence: f64,
}

impl DetectedIntent {
    pub fn new(intent_type: impl Into<String>, confidence: f64) -> Self {
        Self {
            intent_type: intent_type.into(),
            confidence,
        }
    }
}

/// One recorded user interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInteraction {
    pub timestamp: DateTime<Utc>,
    pub intent: DetectedIntent,
    pub workflow_id: Option<String>,
    pub success: bool,
    pub duration_secs: f64,
    /// 1 (bad) to 5 (great)
    pub feedback_rating: Option<u8>,
    pub context: InteractionContext,
}

impl UserInteraction {
    /// Interaction that ran `workflow_id` successfully
    pub fn workflow_run(workflow_id: impl Into<String>, context: InteractionContext) -> Self {
        Self {
            timestamp: Utc::now(),
            intent: DetectedIntent::new("run_workflow", 1.0),
            workflow_id: Some(workflow_id.into()),
            success: true,
            duration_secs: 0.0,
            feedback_rating: None,
            context,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_success(mut self, success: bool) -> Self {
        self.success = success;
        self
    }

    pub fn with_duration(mut self, duration_secs: f64) -> Self {
        self.duration_secs = duration_secs;
        self
    }

    pub fn with_rating(mut self, rating: u8) -> Self {
        self.feedback_rating = Some(rating);
        self
    }

    /// Pull every field into its valid range
    pub fn clamped(mut self) -> Self {
        self.intent.confidence = clamp_unit(self.intent.confidence);
        self.duration_secs = if self.duration_secs.is_finite() {
            self.duration_secs.max(0.0)
        } else {
            0.0
        };
        self.feedback_rating = self.feedback_rating.map(|r| r.clamp(1, 5));
        self.context.hour_of_day = self.context.hour_of_day.min(23);
        self
    }
}

/// Accept/reject signal for a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionFeedback {
    /// Workflow id of the prediction being judged
    pub prediction_id: String,
    pub accepted: bool,
    pub timestamp: DateTime<Utc>,
}

impl PredictionFeedback {
    pub fn new(prediction_id: impl Into<String>, accepted: bool) -> Self {
        Self {
            prediction_id: prediction_id.into(),
            accepted,
            timestamp: Utc::now(),
        }
    }
}

/// Workflow record supplied by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Workflow {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            steps: Vec::new(),
            category: None,
            tags: Vec::new(),
        }
    }
}

/// Row in the `interactions` table
#[derive(Debug, Clone, FromRow)]
pub struct InteractionRow {
    pub id: i64,
    pub timestamp: String, // RFC 3339
    pub intent_type: String,
    pub intent_confidence: f64,
    pub workflow_id: Option<String>,
    pub success: bool,
    pub duration_secs: f64,
    pub feedback_rating: Option<i64>,
    pub context: String, // JSON
}

impl TryFrom<InteractionRow> for UserInteraction {
    type Error = FlowsenseError;

    fn try_from(row: InteractionRow) -> Result<Self> {
        let interaction = UserInteraction {
            timestamp: parse_timestamp(&row.timestamp)?,
            intent: DetectedIntent::new(row.intent_type, row.intent_confidence),
            workflow_id: row.workflow_id,
            success: row.success,
            duration_secs: row.duration_secs,
            feedback_rating: row.feedback_rating.map(|r| r.clamp(1, 5) as u8),
            context: serde_json::from_str(&row.context)?,
        };

        Ok(interaction.clamped())
    }
}

/// Row in the `prediction_feedback` table
#[derive(Debug, Clone, FromRow)]
pub struct FeedbackRow {
    pub id: i64,
    pub prediction_id: String,
    pub accepted: bool,
    pub timestamp: String, // RFC 3339
}

impl TryFrom<FeedbackRow> for PredictionFeedback {
    type Error = FlowsenseError;

    fn try_from(row: FeedbackRow) -> Result<Self> {
        Ok(PredictionFeedback {
            prediction_id: row.prediction_id,
            accepted: row.accepted,
            timestamp: parse_timestamp(&row.timestamp)?,
        })
    }
}

pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_interaction() {
        let mut context = InteractionContext::at_hour(9);
        context.hour_of_day = 31;

        let mut interaction = UserInteraction::workflow_run("deploy", context)
            .with_duration(-4.0)
            .with_rating(9);
        interaction.intent.confidence = 1.7;

        let clamped = interaction.clamped();
        assert_eq!(clamped.intent.confidence, 1.0);
        assert_eq!(clamped.duration_secs, 0.0);
        assert_eq!(clamped.feedback_rating, Some(5));
        assert_eq!(clamped.context.hour_of_day, 23);
    }

    #[test]
    fn test_interaction_row_conversion() {
        let context = InteractionContext::at_hour(14);
        let row = InteractionRow {
            id: 1,
            timestamp: "2026-03-02T14:05:00.000000Z".to_string(),
            intent_type: "run_workflow".to_string(),
            intent_confidence: 0.9,
            workflow_id: Some("standup-notes".to_string()),
            success: false,
            duration_secs: 12.5,
            feedback_rating: Some(0),
            context: serde_json::to_string(&context).unwrap(),
        };

        let interaction = UserInteraction::try_from(row).unwrap();
        assert_eq!(interaction.workflow_id.as_deref(), Some("standup-notes"));
        assert!(!interaction.success);
        assert_eq!(interaction.feedback_rating, Some(1));
        assert_eq!(interaction.context.hour_of_day, 14);
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        let row = FeedbackRow {
            id: 1,
            prediction_id: "deploy".to_string(),
            accepted: true,
            timestamp: "yesterday".to_string(),
        };

        assert!(matches!(
            PredictionFeedback::try_from(row),
            Err(FlowsenseError::Timestamp(_))
        ));
    }

    #[test]
    fn test_workflow_catalog_defaults() {
        let workflow: Workflow =
            serde_json::from_str(r#"{ "id": "ship", "name": "Ship It" }"#).unwrap();
        assert!(workflow.steps.is_empty());
        assert!(workflow.tags.is_empty());
        assert_eq!(workflow.category, None);
    }
}
