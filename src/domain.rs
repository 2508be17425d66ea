//! Domain models used by the backend: difficulty tiers, challenges,
//! evaluations, learning plans, and challenge history.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three difficulty tiers. Both a user's declared base level and a
/// challenge's target difficulty are always one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  Beginner,
  Intermediate,
  Advanced,
}

impl Difficulty {
  pub fn as_str(&self) -> &'static str {
    match self {
      Difficulty::Beginner => "beginner",
      Difficulty::Intermediate => "intermediate",
      Difficulty::Advanced => "advanced",
    }
  }

  /// Lenient parse for model-echoed tier names. Unknown input maps to None.
  pub fn parse(s: &str) -> Option<Self> {
    match s.trim().to_lowercase().as_str() {
      "beginner" => Some(Difficulty::Beginner),
      "intermediate" => Some(Difficulty::Intermediate),
      "advanced" => Some(Difficulty::Advanced),
      _ => None,
    }
  }
}

impl Default for Difficulty {
  fn default() -> Self { Difficulty::Beginner }
}

impl fmt::Display for Difficulty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Where a served challenge came from. Lets callers tell a fresh AI
/// generation apart from a cache hit or a static fallback template.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChallengeOrigin {
  Cache,
  Generated { model: String },
  Fallback { reason: String },
}

impl ChallengeOrigin {
  pub fn label(&self) -> &'static str {
    match self {
      ChallengeOrigin::Cache => "cache",
      ChallengeOrigin::Generated { .. } => "generated",
      ChallengeOrigin::Fallback { .. } => "fallback",
    }
  }
}

/// A single practice problem. Immutable once created; history entries
/// embed a snapshot rather than referencing it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
  pub id: String,
  pub title: String,
  pub description: String,
  pub language: String,
  pub difficulty: Difficulty,
  pub acceptance_criteria: Vec<String>,
  pub hints: Vec<String>,
  #[serde(default)] pub example_input: Option<String>,
  #[serde(default)] pub example_output: Option<String>,
  pub concepts: Vec<String>,
  pub estimated_time_minutes: u32,
}

/// AI-produced judgment of submitted code. Score is always defined;
/// a structurally failed evaluation yields the pessimistic default.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
  pub success: bool,
  pub score: u8,
  pub feedback: String,
  pub suggestions: Vec<String>,
}

/// One user attempt at a challenge. Unique per (challenge id, plan id):
/// a resubmission updates the entry in place and bumps `attempts`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeHistoryEntry {
  pub challenge: Challenge,
  pub code: String,
  #[serde(default)] pub evaluation: Option<Evaluation>,
  pub attempts: u32,
  pub saved_at: DateTime<Utc>,
  #[serde(default)] pub completed_at: Option<DateTime<Utc>>,
  pub plan_id: String,
}

/// An external learning resource attached to a plan module.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModuleResource {
  #[serde(rename = "type")] pub kind: String,
  pub title: String,
  pub url: String,
}

/// One module of a learning plan's outline.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanModule {
  pub id: String,
  pub title: String,
  pub description: String,
  pub resource: ModuleResource,
  pub outcomes: Vec<String>,
  pub estimated_time_hours: f64,
}

/// The first exercise a plan proposes, kept as a lightweight stub.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartingChallenge {
  pub title: String,
  pub description: String,
  pub language: String,
  pub acceptance_criteria: Vec<String>,
}

/// A user's enrollment in a goal/track. At most five per user; exactly
/// one is current at a time.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPlan {
  pub id: String,
  pub goal: String,
  pub level: Difficulty,
  pub language: String,
  pub rationale: String,
  pub modules: Vec<PlanModule>,
  pub total_estimated_hours: f64,
  pub starting_challenge: StartingChallenge,
  pub created_at: DateTime<Utc>,
}
