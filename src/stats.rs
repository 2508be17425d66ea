//! Read-time aggregation over persisted challenge history.
//!
//! Pure functions: filter to a plan, then count completions, sum attempts,
//! average defined scores, and measure the trailing success streak.

use serde::{Deserialize, Serialize};

use crate::domain::ChallengeHistoryEntry;

/// Per-plan statistics served to the UI.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStats {
  pub completed: u32,
  pub total: u32,
  pub average_score: u32,
  pub total_attempts: u32,
  pub streak: u32,
}

/// Whole-history statistics kept in the stored progress document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredStats {
  pub total_challenges: u32,
  pub completed_challenges: u32,
  pub total_attempts: u32,
  pub average_score: u32,
}

pub fn plan_stats(history: &[ChallengeHistoryEntry], plan_id: &str) -> PlanStats {
  let entries: Vec<&ChallengeHistoryEntry> =
    history.iter().filter(|e| e.plan_id == plan_id).collect();

  let completed = entries
    .iter()
    .filter(|e| e.evaluation.as_ref().is_some_and(|ev| ev.success))
    .count() as u32;
  let total_attempts = entries.iter().map(|e| e.attempts).sum();

  // Trailing streak: walk backward from the most recent entry and stop at
  // the first failed or unevaluated one.
  let streak = entries
    .iter()
    .rev()
    .take_while(|e| e.evaluation.as_ref().is_some_and(|ev| ev.success))
    .count() as u32;

  PlanStats {
    completed,
    total: entries.len() as u32,
    average_score: average_score(entries.iter().copied()),
    total_attempts,
    streak,
  }
}

pub fn overall_stats(history: &[ChallengeHistoryEntry]) -> StoredStats {
  StoredStats {
    total_challenges: history.len() as u32,
    completed_challenges: history
      .iter()
      .filter(|e| e.evaluation.as_ref().is_some_and(|ev| ev.success))
      .count() as u32,
    total_attempts: history.iter().map(|e| e.attempts).sum(),
    average_score: average_score(history.iter()),
  }
}

/// Rounded mean of the defined evaluation scores; 0 when none exist.
fn average_score<'a>(entries: impl Iterator<Item = &'a ChallengeHistoryEntry>) -> u32 {
  let scores: Vec<u32> = entries
    .filter_map(|e| e.evaluation.as_ref().map(|ev| ev.score as u32))
    .collect();
  if scores.is_empty() {
    return 0;
  }
  let sum: u32 = scores.iter().sum();
  (sum as f64 / scores.len() as f64).round() as u32
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Challenge, Difficulty, Evaluation};
  use chrono::Utc;

  fn entry(plan_id: &str, evaluation: Option<(bool, u8)>, attempts: u32) -> ChallengeHistoryEntry {
    ChallengeHistoryEntry {
      challenge: Challenge {
        id: format!("c-{}", uuid::Uuid::new_v4()),
        title: "t".into(),
        description: "d".into(),
        language: "JavaScript".into(),
        difficulty: Difficulty::Beginner,
        acceptance_criteria: vec!["works".into()],
        hints: vec![],
        example_input: None,
        example_output: None,
        concepts: vec![],
        estimated_time_minutes: 30,
      },
      code: "code".into(),
      evaluation: evaluation.map(|(success, score)| Evaluation {
        success,
        score,
        feedback: String::new(),
        suggestions: vec![],
      }),
      attempts,
      saved_at: Utc::now(),
      completed_at: None,
      plan_id: plan_id.into(),
    }
  }

  #[test]
  fn stats_only_count_the_requested_plan() {
    let history = vec![
      entry("A", Some((true, 80)), 1),
      entry("A", Some((false, 40)), 3),
      entry("B", Some((true, 100)), 1),
    ];
    let stats = plan_stats(&history, "A");
    assert_eq!(
      stats,
      PlanStats { completed: 1, total: 2, average_score: 60, total_attempts: 4, streak: 0 }
    );
  }

  #[test]
  fn average_is_zero_without_evaluations() {
    let history = vec![entry("A", None, 2)];
    let stats = plan_stats(&history, "A");
    assert_eq!(stats.average_score, 0);
    assert_eq!(stats.completed, 0);
    assert_eq!(stats.total_attempts, 2);
  }

  #[test]
  fn streak_counts_trailing_successes_only() {
    let history = vec![
      entry("A", Some((true, 90)), 1),
      entry("A", Some((false, 30)), 1),
      entry("A", Some((true, 70)), 1),
      entry("A", Some((true, 85)), 1),
    ];
    assert_eq!(plan_stats(&history, "A").streak, 2);

    let broken = vec![entry("A", Some((true, 90)), 1), entry("A", None, 1)];
    assert_eq!(plan_stats(&broken, "A").streak, 0);
  }

  #[test]
  fn overall_stats_span_every_plan() {
    let history = vec![
      entry("A", Some((true, 80)), 2),
      entry("B", Some((true, 100)), 1),
    ];
    let stats = overall_stats(&history);
    assert_eq!(stats.total_challenges, 2);
    assert_eq!(stats.completed_challenges, 2);
    assert_eq!(stats.total_attempts, 3);
    assert_eq!(stats.average_score, 90);
  }
}
