// Turns raw history into signals
//
// Two jobs: how strongly a workflow clusters around an hour of the day,
// and which runs of actions keep repeating in an action log (like
// "git add ." then "git commit" then "git push", over and over).

use crate::config::ModelConfig;
use crate::core::interaction_store::{filter_by_workflow, hour_distance};
use crate::core::RecordedAction;
use crate::db::UserInteraction;
use crate::intelligence::Scorer;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

// Adjacent hours inside the tolerance window count this much
const ADJACENT_HOUR_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct TemporalAffinity {
    /// 0.0-1.0
    pub score: f64,
    /// Executions at the queried hour or inside the tolerance window
    pub near_hour_count: usize,
    pub total_executions: usize,
    pub success_rate: f64,
    pub peak_hour: Option<u32>,
    pub peak_hour_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepeatedSequence {
    pub actions: Vec<String>,
    /// Non-overlapping occurrences
    pub frequency: usize,
    pub average_duration_secs: f64,
    pub estimated_time_saving_secs: f64,
}

pub struct PatternAnalyzer {
    hour_tolerance: u32,
    half_life_days: f64,
    min_occurrences: usize,
    max_sequence_length: usize,
    default_action_secs: f64,
}

impl PatternAnalyzer {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            hour_tolerance: config.hour_tolerance,
            half_life_days: config.recency_half_life_days,
            min_occurrences: config.min_sequence_occurrences.max(2),
            max_sequence_length: config.max_sequence_length.max(2),
            default_action_secs: config.default_action_secs.max(0.0),
        }
    }

    /// How strongly `workflow_id` clusters around `hour`
    ///
    /// Each past run counts 1.0 at the exact hour and 0.5 within the
    /// tolerance window, weighted by recency decay. The resulting fraction
    /// is scaled by `0.5 + 0.5 * success_rate` so a workflow that keeps
    /// failing at 9am isn't pushed at 9am.
    pub fn temporal_affinity(
        &self,
        interactions: &[UserInteraction],
        workflow_id: &str,
        hour: u32,
        now: DateTime<Utc>,
    ) -> TemporalAffinity {
        let mut weighted_total = 0.0;
        let mut weighted_match = 0.0;
        let mut near_hour_count = 0;
        let mut total = 0;
        let mut successes = 0;

        for interaction in filter_by_workflow(interactions, workflow_id) {
            total += 1;
            if interaction.success {
                successes += 1;
            }

            let age_days = days_between(interaction.timestamp, now);
            let weight = Scorer::calculate_recency_weight(age_days, self.half_life_days);
            weighted_total += weight;

            let distance = hour_distance(interaction.context.hour_of_day, hour);
            if distance <= self.hour_tolerance {
                near_hour_count += 1;
                let hour_weight = if distance == 0 { 1.0 } else { ADJACENT_HOUR_WEIGHT };
                weighted_match += weight * hour_weight;
            }
        }

        let distribution = self.hourly_distribution(interactions, workflow_id);
        let peak_hour = peak_hour(&distribution);

        if total == 0 || weighted_total <= 0.0 {
            return TemporalAffinity {
                score: 0.0,
                near_hour_count,
                total_executions: total,
                success_rate: 0.0,
                peak_hour,
                peak_hour_count: 0,
            };
        }

        let success_rate = successes as f64 / total as f64;
        let score = (weighted_match / weighted_total) * (0.5 + 0.5 * success_rate);

        TemporalAffinity {
            score: score.clamp(0.0, 1.0),
            near_hour_count,
            total_executions: total,
            success_rate,
            peak_hour,
            peak_hour_count: peak_hour.map(|h| distribution[h as usize]).unwrap_or(0),
        }
    }

    /// Number of runs of `workflow_id` in each hour of the day
    pub fn hourly_distribution(
        &self,
        interactions: &[UserInteraction],
        workflow_id: &str,
    ) -> [usize; 24] {
        let mut buckets = [0usize; 24];
        for interaction in filter_by_workflow(interactions, workflow_id) {
            buckets[(interaction.context.hour_of_day % 24) as usize] += 1;
        }
        buckets
    }

    /// Find runs of actions that repeat
    ///
    /// Sliding windows of length 2 up to the configured maximum, exact
    /// matches only. Occurrences are counted without overlap. A sequence
    /// that sits inside a longer one repeating at least as often is
    /// dropped, since the longer one already covers it.
    pub fn detect_repeated_sequences(&self, actions: &[RecordedAction]) -> Vec<RepeatedSequence> {
        if actions.len() < 2 * self.min_occurrences {
            return Vec::new();
        }

        let mut found = Vec::new();
        let longest = self.max_sequence_length.min(actions.len() / self.min_occurrences);

        for window_size in 2..=longest {
            let starts = self.occurrence_starts(actions, window_size);

            for (sequence, starts) in starts {
                if starts.len() < self.min_occurrences {
                    continue;
                }

                let average_duration_secs = starts
                    .iter()
                    .map(|&start| self.occurrence_duration(&actions[start..start + window_size]))
                    .sum::<f64>()
                    / starts.len() as f64;
                let frequency = starts.len();

                found.push(RepeatedSequence {
                    actions: sequence.into_iter().map(str::to_string).collect(),
                    frequency,
                    average_duration_secs,
                    estimated_time_saving_secs: (frequency - 1) as f64 * average_duration_secs,
                });
            }
        }

        let mut kept: Vec<RepeatedSequence> = found
            .iter()
            .filter(|candidate| {
                !found.iter().any(|other| {
                    other.actions.len() > candidate.actions.len()
                        && other.frequency >= candidate.frequency
                        && contains_run(&other.actions, &candidate.actions)
                })
            })
            .cloned()
            .collect();

        kept.sort_by(|a, b| {
            b.estimated_time_saving_secs
                .total_cmp(&a.estimated_time_saving_secs)
                .then(b.frequency.cmp(&a.frequency))
                .then_with(|| a.actions.cmp(&b.actions))
        });

        kept
    }

    /// Start indices of each distinct window, skipping overlapping repeats
    fn occurrence_starts<'a>(
        &self,
        actions: &'a [RecordedAction],
        window_size: usize,
    ) -> HashMap<Vec<&'a str>, Vec<usize>> {
        let mut starts: HashMap<Vec<&'a str>, Vec<usize>> = HashMap::new();

        for (start, window) in actions.windows(window_size).enumerate() {
            let key: Vec<&str> = window.iter().map(|a| a.action.as_str()).collect();
            let entry = starts.entry(key).or_default();

            let overlaps = entry
                .last()
                .is_some_and(|&previous| start < previous + window_size);
            if !overlaps {
                entry.push(start);
            }
        }

        starts
    }

    fn occurrence_duration(&self, occurrence: &[RecordedAction]) -> f64 {
        occurrence
            .iter()
            .map(|a| a.duration_secs.unwrap_or(self.default_action_secs))
            .sum()
    }
}

/// Busiest hour, earliest wins ties
pub fn peak_hour(distribution: &[usize; 24]) -> Option<u32> {
    let (hour, &count) = distribution
        .iter()
        .enumerate()
        .rev()
        .max_by_key(|(_, count)| **count)?;

    (count > 0).then_some(hour as u32)
}

pub(crate) fn days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    ((later - earlier).num_seconds() as f64 / 86_400.0).max(0.0)
}

fn contains_run(haystack: &[String], needle: &[String]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
