/// SQL query functions for database operations
///
/// Interactions and feedback are append-only; there are no update or delete
/// queries.

use crate::db::models::*;
use crate::db::Database;
use crate::error::Result;
use sqlx::Row;

impl Database {
    /// Append an interaction
    ///
    /// # Returns
    /// * `Ok(i64)` - The row ID
    /// * `Err(FlowsenseError)` - If the insert fails
    pub async fn insert_interaction(&self, interaction: &UserInteraction) -> Result<i64> {
        let context_json = serde_json::to_string(&interaction.context)?;

        let result = sqlx::query(
            r#"
            INSERT INTO interactions
                (timestamp, intent_type, intent_confidence, workflow_id, success,
                 duration_secs, feedback_rating, context)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(format_timestamp(&interaction.timestamp))
        .bind(&interaction.intent.intent_type)
        .bind(interaction.intent.confidence)
        .bind(&interaction.workflow_id)
        .bind(interaction.success)
        .bind(interaction.duration_secs)
        .bind(interaction.feedback_rating.map(i64::from))
        .bind(context_json)
        .fetch_one(self.pool())
        .await?;

        Ok(result.get(0))
    }

    /// Load every interaction, oldest first
    pub async fn load_interactions(&self) -> Result<Vec<UserInteraction>> {
        let rows = sqlx::query_as::<_, InteractionRow>("SELECT * FROM interactions ORDER BY id ASC")
            .fetch_all(self.pool())
            .await?;

        rows.into_iter().map(UserInteraction::try_from).collect()
    }

    /// Distinct workflow ids seen in history, most used first
    pub async fn known_workflow_ids(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT workflow_id FROM interactions
            WHERE workflow_id IS NOT NULL
            GROUP BY workflow_id
            ORDER BY COUNT(*) DESC, workflow_id ASC
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }

    /// Append a feedback record
    pub async fn insert_feedback(&self, feedback: &PredictionFeedback) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO prediction_feedback (prediction_id, accepted, timestamp)
            VALUES (?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&feedback.prediction_id)
        .bind(feedback.accepted)
        .bind(format_timestamp(&feedback.timestamp))
        .fetch_one(self.pool())
        .await?;

        Ok(result.get(0))
    }

    /// Load all feedback, oldest first
    pub async fn load_feedback(&self) -> Result<Vec<PredictionFeedback>> {
        let rows = sqlx::query_as::<_, FeedbackRow>(
            "SELECT * FROM prediction_feedback ORDER BY id ASC",
        )
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(PredictionFeedback::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intelligence::InteractionContext;

    #[tokio::test]
    async fn test_insert_and_load_interactions() {
        let db = Database::in_memory().await.unwrap();

        let first = UserInteraction::workflow_run("morning-sync", InteractionContext::at_hour(9));
        let second = UserInteraction::workflow_run("deploy", InteractionContext::at_hour(16))
            .with_success(false)
            .with_duration(42.0);

        let id1 = db.insert_interaction(&first).await.unwrap();
        let id2 = db.insert_interaction(&second).await.unwrap();
        assert!(id2 > id1);

        let loaded = db.load_interactions().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].workflow_id.as_deref(), Some("morning-sync"));
        assert_eq!(loaded[1].duration_secs, 42.0);
        assert!(!loaded[1].success);
        assert_eq!(loaded[1].context.hour_of_day, 16);
    }

    #[tokio::test]
    async fn test_known_ids_most_used_first() {
        let db = Database::in_memory().await.unwrap();

        for _ in 0..3 {
            db.insert_interaction(&UserInteraction::workflow_run(
                "deploy",
                InteractionContext::at_hour(10),
            ))
            .await
            .unwrap();
        }
        db.insert_interaction(&UserInteraction::workflow_run(
            "lint",
            InteractionContext::at_hour(11),
        ))
        .await
        .unwrap();

        let ids = db.known_workflow_ids().await.unwrap();
        assert_eq!(ids, vec!["deploy".to_string(), "lint".to_string()]);
    }

    #[tokio::test]
    async fn test_feedback_round_trip_keeps_order() {
        let db = Database::in_memory().await.unwrap();

        db.insert_feedback(&PredictionFeedback::new("deploy", true))
            .await
            .unwrap();
        db.insert_feedback(&PredictionFeedback::new("lint", false))
            .await
            .unwrap();

        let feedback = db.load_feedback().await.unwrap();
        assert_eq!(feedback.len(), 2);
        assert!(feedback[0].accepted);
        assert_eq!(feedback[1].prediction_id, "lint");

        let stats = db.stats().await.unwrap();
        assert_eq!(stats.total_feedback, 2);
        assert_eq!(stats.accepted_feedback, 1);
    }
}
