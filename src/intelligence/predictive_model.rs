/// Predictive model
///
/// Ranks workflows for a context, explains why, spots repeated action
/// sequences worth automating, and tunes its confidence threshold from
/// accept/reject feedback.
///
/// The threshold and feedback log sit behind one mutex so adjustments
/// apply one at a time. Predictions work off a store snapshot and never
/// block each other.

use crate::config::ModelConfig;
use crate::core::{InteractionStore, RecordedAction};
use crate::db::{Database, PredictionFeedback, UserInteraction, Workflow};
use crate::error::Result;
use crate::intelligence::pattern_analyzer::days_between;
use crate::intelligence::{InteractionContext, PatternAnalyzer, Scorer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

// Signal strength at which a contributing factor gets tagged
const FACTOR_TAG_LEVEL: f64 = 0.5;

// Each step back in the session history costs this much recency
const SESSION_RECENCY_STEP: f64 = 0.1;

/// A workflow suggested for the current context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowPrediction {
    pub workflow_id: String,
    pub workflow_name: String,
    pub confidence: f64,
    pub reasoning: String,
    pub temporal_context: Option<String>,
    pub contextual_factors: Vec<String>,
}

/// A repeated action sequence worth turning into a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationOpportunity {
    pub action_sequence: Vec<String>,
    pub frequency: usize,
    pub confidence: f64,
    pub suggested_workflow_name: String,
    pub estimated_time_saving_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStatistics {
    pub total_feedback: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// Over all feedback ever recorded
    pub acceptance_rate: f64,
    /// Over the trailing window the controller uses
    pub window_acceptance_rate: f64,
    pub confidence_threshold: f64,
    pub interactions_recorded: usize,
}

struct FeedbackState {
    threshold: f64,
    history: Vec<PredictionFeedback>,
    accepted: usize,
}

pub struct PredictiveModel {
    store: InteractionStore,
    analyzer: PatternAnalyzer,
    config: ModelConfig,
    state: Mutex<FeedbackState>,
    db: Option<Arc<Database>>,
}

impl PredictiveModel {
    /// Fresh model over `store`; feedback stays in memory
    pub fn new(store: InteractionStore, config: ModelConfig) -> Self {
        let analyzer = PatternAnalyzer::new(&config);
        let state = FeedbackState {
            threshold: config.starting_threshold(),
            history: Vec::new(),
            accepted: 0,
        };

        Self {
            store,
            analyzer,
            config,
            state: Mutex::new(state),
            db: None,
        }
    }

    /// Fresh model that also persists feedback to `db`
    pub fn with_database(store: InteractionStore, config: ModelConfig, db: Arc<Database>) -> Self {
        Self {
            db: Some(db),
            ..Self::new(store, config)
        }
    }

    /// Rebuild a model by replaying persisted feedback
    ///
    /// The controller is deterministic, so the replayed threshold matches
    /// what the previous process ended with.
    pub async fn restore(
        store: InteractionStore,
        config: ModelConfig,
        db: Arc<Database>,
    ) -> Result<Self> {
        let history = db.load_feedback().await?;
        let model = Self::with_database(store, config, db);

        {
            let mut state = model.state.lock().await;
            for feedback in history {
                model.apply_feedback(&mut state, feedback);
            }
            tracing::info!(
                feedback = state.history.len(),
                threshold = state.threshold,
                "restored predictive model"
            );
        }

        Ok(model)
    }

    pub fn store(&self) -> &InteractionStore {
        &self.store
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Shortcut for `store().save()`
    pub async fn record_interaction(&self, interaction: UserInteraction) -> Result<()> {
        self.store.save(interaction).await
    }

    /// Workflows worth suggesting right now, best first
    ///
    /// Only predictions at or above the current threshold come back. An
    /// empty workflow list gives an empty result. Duplicate ids are scored
    /// once.
    pub async fn predict_workflows(
        &self,
        context: &InteractionContext,
        available_workflows: &[Workflow],
    ) -> Vec<WorkflowPrediction> {
        if available_workflows.is_empty() {
            return Vec::new();
        }

        let threshold = self.confidence_threshold().await;
        let snapshot = self.store.snapshot().await;
        let now = Utc::now();
        let busiest = busiest_workflow_count(&snapshot);

        let mut seen = HashSet::new();
        let mut predictions: Vec<WorkflowPrediction> = available_workflows
            .iter()
            .filter(|workflow| seen.insert(workflow.id.as_str()))
            .map(|workflow| self.score(&snapshot, context, workflow, busiest, now))
            .filter(|prediction| prediction.confidence >= threshold)
            .collect();

        predictions.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.workflow_id.cmp(&b.workflow_id))
        });
        predictions.truncate(self.config.max_predictions);

        tracing::debug!(
            hour = context.hour_of_day,
            candidates = available_workflows.len(),
            returned = predictions.len(),
            threshold,
            "predicted workflows"
        );

        predictions
    }

    /// Score a single workflow without applying the threshold
    pub async fn score_workflow(
        &self,
        context: &InteractionContext,
        workflow: &Workflow,
    ) -> WorkflowPrediction {
        let snapshot = self.store.snapshot().await;
        let busiest = busiest_workflow_count(&snapshot);
        self.score(&snapshot, context, workflow, busiest, Utc::now())
    }

    fn score(
        &self,
        history: &[UserInteraction],
        context: &InteractionContext,
        workflow: &Workflow,
        busiest: usize,
        now: DateTime<Utc>,
    ) -> WorkflowPrediction {
        let runs: Vec<&UserInteraction> = history
            .iter()
            .filter(|i| i.workflow_id.as_deref() == Some(workflow.id.as_str()))
            .collect();

        let affinity =
            self.analyzer
                .temporal_affinity(history, &workflow.id, context.hour_of_day, now);

        let days_since_last = runs
            .iter()
            .map(|i| i.timestamp)
            .max()
            .map(|last| days_between(last, now));
        let history_recency = days_since_last
            .map(|days| Scorer::calculate_recency_weight(days, self.config.recency_half_life_days))
            .unwrap_or(0.0);
        let session_position = context
            .recent_workflows
            .iter()
            .position(|id| id == &workflow.id);
        let session_recency = session_position
            .map(|pos| (1.0 - pos as f64 * SESSION_RECENCY_STEP).max(FACTOR_TAG_LEVEL))
            .unwrap_or(0.0);
        let recency = history_recency.max(session_recency);

        let frequency = Scorer::calculate_frequency_weight(runs.len(), busiest);

        let (matched, total_factors) = context_factors(context, &runs);
        let context_match = Scorer::calculate_context_match(matched, total_factors);

        let evidence = Scorer::calculate_evidence_factor(runs.len(), self.config.min_evidence);
        let confidence = (Scorer::calculate_prediction_score(
            affinity.score,
            recency,
            frequency,
            context_match,
        ) * evidence)
            .clamp(0.0, 1.0);

        let mut factors = Vec::new();
        if affinity.score >= FACTOR_TAG_LEVEL {
            factors.push("temporal_pattern".to_string());
        }
        if history_recency >= FACTOR_TAG_LEVEL {
            factors.push("recent_use".to_string());
        }
        if frequency >= FACTOR_TAG_LEVEL {
            factors.push("frequent_use".to_string());
        }
        if session_position.is_some() {
            factors.push("session_history".to_string());
        }
        if total_factors > 0 && matched > 0 {
            factors.push("context_match".to_string());
        }

        let reasoning = if runs.is_empty() {
            format!("{} has 0 recorded runs", workflow.name)
        } else {
            let share = affinity.near_hour_count as f64 / runs.len() as f64 * 100.0;
            format!(
                "{} was executed {} times near {:02}:00 ({:.0}% of {} runs, {:.0}% successful); last run {:.1} days ago",
                workflow.name,
                affinity.near_hour_count,
                context.hour_of_day,
                share,
                runs.len(),
                affinity.success_rate * 100.0,
                days_since_last.unwrap_or(0.0),
            )
        };

        let temporal_context = affinity.peak_hour.map(|peak| {
            format!(
                "usually runs around {:02}:00 ({} of {} runs), {} on {}",
                peak,
                affinity.peak_hour_count,
                affinity.total_executions,
                context.time_of_day(),
                context.day_of_week,
            )
        });

        WorkflowPrediction {
            workflow_id: workflow.id.clone(),
            workflow_name: workflow.name.clone(),
            confidence,
            reasoning,
            temporal_context,
            contextual_factors: factors,
        }
    }

    /// Repeated action runs worth turning into workflows
    ///
    /// Only opportunities at or above the current threshold come back.
    pub async fn identify_automation_opportunities(
        &self,
        recent_actions: &[RecordedAction],
    ) -> Vec<AutomationOpportunity> {
        let threshold = self.confidence_threshold().await;

        let opportunities: Vec<AutomationOpportunity> = self
            .analyzer
            .detect_repeated_sequences(recent_actions)
            .into_iter()
            .map(|sequence| {
                let confidence =
                    Scorer::calculate_sequence_confidence(sequence.frequency, sequence.actions.len());

                AutomationOpportunity {
                    suggested_workflow_name: suggest_workflow_name(&sequence.actions),
                    action_sequence: sequence.actions,
                    frequency: sequence.frequency,
                    confidence,
                    estimated_time_saving_secs: sequence.estimated_time_saving_secs,
                }
            })
            .filter(|opportunity| opportunity.confidence >= threshold)
            .collect();

        tracing::debug!(
            actions = recent_actions.len(),
            found = opportunities.len(),
            "identified automation opportunities"
        );

        opportunities
    }

    /// Record one accept/reject and let the threshold react
    ///
    /// With a database attached the feedback is written first; if that
    /// fails the threshold is left alone.
    pub async fn record_feedback(&self, feedback: PredictionFeedback) -> Result<()> {
        let mut state = self.state.lock().await;

        if let Some(db) = &self.db {
            db.insert_feedback(&feedback).await?;
        }
        self.apply_feedback(&mut state, feedback);

        Ok(())
    }

    /// Record several feedback records under one lock
    pub async fn record_feedback_batch(&self, batch: Vec<PredictionFeedback>) -> Result<()> {
        let mut state = self.state.lock().await;

        for feedback in batch {
            if let Some(db) = &self.db {
                db.insert_feedback(&feedback).await?;
            }
            self.apply_feedback(&mut state, feedback);
        }

        Ok(())
    }

    pub async fn confidence_threshold(&self) -> f64 {
        self.state.lock().await.threshold
    }

    pub async fn statistics(&self) -> ModelStatistics {
        let interactions_recorded = self.store.len().await;
        let state = self.state.lock().await;

        let total_feedback = state.history.len();
        let acceptance_rate = if total_feedback == 0 {
            0.0
        } else {
            state.accepted as f64 / total_feedback as f64
        };

        ModelStatistics {
            total_feedback,
            accepted: state.accepted,
            rejected: total_feedback - state.accepted,
            acceptance_rate,
            window_acceptance_rate: self.window_acceptance(&state.history).unwrap_or(0.0),
            confidence_threshold: state.threshold,
            interactions_recorded,
        }
    }

    /// Proportional controller on the trailing acceptance rate
    ///
    /// High acceptance lowers the threshold, low acceptance raises it,
    /// always clamped to the configured bounds.
    fn apply_feedback(&self, state: &mut FeedbackState, feedback: PredictionFeedback) {
        if feedback.prediction_id.trim().is_empty() {
            tracing::warn!("feedback without a prediction id, counting it anyway");
        }

        if feedback.accepted {
            state.accepted += 1;
        }
        state.history.push(feedback);

        let window_len = state.history.len().min(self.config.feedback_window);
        if window_len < self.config.min_feedback_samples {
            return;
        }

        let Some(rate) = self.window_acceptance(&state.history) else {
            return;
        };
        let error = rate - self.config.target_acceptance;
        if error.abs() <= self.config.acceptance_deadband {
            return;
        }

        let previous = state.threshold;
        state.threshold = (previous - self.config.adjustment_gain * error)
            .clamp(self.config.min_threshold, self.config.max_threshold);

        if state.threshold != previous {
            tracing::info!(
                from = previous,
                to = state.threshold,
                window_acceptance = rate,
                "adjusted confidence threshold"
            );
        }
    }

    fn window_acceptance(&self, history: &[PredictionFeedback]) -> Option<f64> {
        let window = &history[history.len().saturating_sub(self.config.feedback_window)..];
        if window.is_empty() {
            return None;
        }

        let accepted = window.iter().filter(|f| f.accepted).count();
        Some(accepted as f64 / window.len() as f64)
    }
}

/// Run count of the most used workflow in history
fn busiest_workflow_count(history: &[UserInteraction]) -> usize {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for id in history.iter().filter_map(|i| i.workflow_id.as_deref()) {
        *counts.entry(id).or_insert(0) += 1;
    }
    counts.into_values().max().unwrap_or(0)
}

/// (matched, total) context factors for a workflow
///
/// A factor counts when the query context sets it; it matches when at
/// least half the workflow's runs happened in the same setting.
fn context_factors(context: &InteractionContext, runs: &[&UserInteraction]) -> (usize, usize) {
    let mut matched = 0;
    let mut total = 0;

    let mostly = |hits: usize| !runs.is_empty() && hits * 2 >= runs.len();

    if let Some(app) = &context.active_application {
        total += 1;
        let hits = runs
            .iter()
            .filter(|i| i.context.active_application.as_ref() == Some(app))
            .count();
        if mostly(hits) {
            matched += 1;
        }
    }

    if let Some(project_type) = context.project_type {
        total += 1;
        let hits = runs
            .iter()
            .filter(|i| i.context.project_type == Some(project_type))
            .count();
        if mostly(hits) {
            matched += 1;
        }
    }

    (matched, total)
}

/// Name a workflow after the actions it would replace
///
/// `["git add .", "git commit -m x", "git push"]` becomes
/// "Git add + commit + push".
pub fn suggest_workflow_name(actions: &[String]) -> String {
    let tools: Vec<&str> = actions
        .iter()
        .filter_map(|a| a.split_whitespace().next())
        .collect();

    let Some(first_tool) = tools.first() else {
        return "Untitled workflow".to_string();
    };

    if tools.len() == actions.len() && tools.iter().all(|t| t == first_tool) {
        let verbs: Vec<&str> = actions
            .iter()
            .filter_map(|a| a.split_whitespace().nth(1))
            .filter(|v| !v.starts_with('-'))
            .collect();

        if verbs.len() == actions.len() {
            return format!("{} {}", capitalize(first_tool), verbs.join(" + "));
        }
    }

    let last_tool = tools.last().unwrap_or(first_tool);
    format!(
        "{} to {} ({} steps)",
        capitalize(first_tool),
        last_tool,
        actions.len()
    )
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
