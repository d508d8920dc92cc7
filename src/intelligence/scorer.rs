/// Scoring algorithms for predictions and automation opportunities
///
/// Every function returns a value in [0, 1].

/// Context match used when the query context carries nothing to compare
pub const NEUTRAL_CONTEXT_MATCH: f64 = 0.5;

/// Scorer for calculating confidence scores
pub struct Scorer;

impl Scorer {
    /// Composite confidence for a workflow prediction
    ///
    /// # Arguments
    /// * `temporal_affinity` - How strongly past runs cluster at this hour (0.0-1.0)
    /// * `recency` - How recently it was used (0.0-1.0)
    /// * `frequency` - How often it is used relative to the busiest workflow (0.0-1.0)
    /// * `context_match` - How well it matches the current context (0.0-1.0)
    pub fn calculate_prediction_score(
        temporal_affinity: f64,
        recency: f64,
        frequency: f64,
        context_match: f64,
    ) -> f64 {
        let score = temporal_affinity * 0.45
            + recency * 0.20
            + frequency * 0.25
            + context_match * 0.10;

        score.clamp(0.0, 1.0)
    }

    /// Calculate frequency weight
    ///
    /// # Arguments
    /// * `usage_count` - Number of times used
    /// * `max_count` - Maximum usage count in dataset
    pub fn calculate_frequency_weight(usage_count: usize, max_count: usize) -> f64 {
        if max_count == 0 {
            return 0.0;
        }

        (usage_count as f64 / max_count as f64).clamp(0.0, 1.0)
    }

    /// Calculate recency weight using exponential decay
    ///
    /// # Arguments
    /// * `days_ago` - Number of days since last use
    /// * `half_life_days` - Age at which the weight halves
    pub fn calculate_recency_weight(days_ago: f64, half_life_days: f64) -> f64 {
        let days_ago = days_ago.max(0.0);
        (-days_ago / half_life_days * 2.0_f64.ln()).exp()
    }

    /// Calculate context match score
    ///
    /// # Arguments
    /// * `factors_matched` - Number of context factors that match
    /// * `total_factors` - Total number of context factors
    pub fn calculate_context_match(factors_matched: usize, total_factors: usize) -> f64 {
        if total_factors == 0 {
            return NEUTRAL_CONTEXT_MATCH;
        }

        (factors_matched as f64 / total_factors as f64).clamp(0.0, 1.0)
    }

    /// Discount for workflows with thin history
    pub fn calculate_evidence_factor(executions: usize, min_evidence: usize) -> f64 {
        if min_evidence == 0 {
            return 1.0;
        }

        (executions as f64 / min_evidence as f64).min(1.0)
    }

    /// Confidence that a repeated sequence is worth automating
    ///
    /// Grows with the number of repetitions and with sequence length
    /// (saturating at three steps).
    pub fn calculate_sequence_confidence(frequency: usize, length: usize) -> f64 {
        if frequency == 0 {
            return 0.0;
        }

        let repetition = 1.0 - 1.0 / frequency as f64;
        let coverage = (length as f64 / 3.0).min(1.0);

        (repetition * 0.7 + coverage * 0.3).clamp(0.0, 1.0)
    }
}
