//! Adherence scoring over a finished session log.
//!
//! `overall = 0.7 * completion + 0.3 * timing`, where completion is the share of
//! steps done and timing is the mean per-step score against target durations.

use serde::{Deserialize, Serialize};

use crate::model::{Step, StepEvent};

const COMPLETION_WEIGHT: f64 = 0.7;
const TIMING_WEIGHT: f64 = 0.3;

/// Ratio of actual to target duration that still earns full timing credit.
const FULL_CREDIT_RATIO: f64 = 1.2;
/// Ratio beyond which a step earns no timing credit.
const ZERO_CREDIT_RATIO: f64 = 2.0;

/// Whether any step was completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdherenceOutcome {
    Scored,
    NoStepsCompleted,
}

/// Final scores for a session. Percentages are rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdherenceReport {
    pub outcome: AdherenceOutcome,
    pub overall_adherence: f64,
    pub completion_adherence: f64,
    pub timing_adherence: f64,
    pub completed_steps: usize,
    pub total_steps: usize,
    pub total_time_secs: f64,
    pub target_total_time_secs: u64,
    pub step_details: Vec<StepEvent>,
}

impl AdherenceReport {
    #[must_use]
    pub fn is_scored(&self) -> bool {
        self.outcome == AdherenceOutcome::Scored
    }
}

/// Timing credit for one step, 0..=100.
///
/// Full credit up to 20% over target, `100 - (ratio - 1) * 100` up to twice the
/// target, nothing beyond.
#[must_use]
pub fn timing_score(elapsed_secs: f64, target_secs: u32) -> f64 {
    if target_secs == 0 {
        return 0.0;
    }
    let ratio = elapsed_secs / f64::from(target_secs);
    if ratio <= FULL_CREDIT_RATIO {
        100.0
    } else if ratio <= ZERO_CREDIT_RATIO {
        (100.0 - (ratio - 1.0) * 100.0).max(0.0)
    } else {
        0.0
    }
}

/// Scores a session log against its step definitions.
#[must_use]
pub fn calculate(events: &[StepEvent], steps: &[Step], total_time_secs: f64) -> AdherenceReport {
    let total_steps = steps.len();
    let target_total_time_secs = steps
        .iter()
        .map(|s| u64::from(s.target_duration_secs()))
        .sum();

    if events.is_empty() {
        return AdherenceReport {
            outcome: AdherenceOutcome::NoStepsCompleted,
            overall_adherence: 0.0,
            completion_adherence: 0.0,
            timing_adherence: 0.0,
            completed_steps: 0,
            total_steps,
            total_time_secs: round2(total_time_secs),
            target_total_time_secs,
            step_details: Vec::new(),
        };
    }

    let completed_steps = events.len();
    let completion = if total_steps == 0 {
        0.0
    } else {
        100.0 * completed_steps as f64 / total_steps as f64
    };

    let timing = events
        .iter()
        .map(|e| timing_score(e.elapsed_secs, e.target_duration_secs))
        .sum::<f64>()
        / completed_steps as f64;

    let overall = COMPLETION_WEIGHT * completion + TIMING_WEIGHT * timing;

    AdherenceReport {
        outcome: AdherenceOutcome::Scored,
        overall_adherence: round2(overall),
        completion_adherence: round2(completion),
        timing_adherence: round2(timing),
        completed_steps,
        total_steps,
        total_time_secs: round2(total_time_secs),
        target_total_time_secs,
        step_details: events.to_vec(),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
