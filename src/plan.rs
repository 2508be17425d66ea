//! Learning-plan generation: one AI call, field-level normalization,
//! resource validation, and persistence.
//!
//! Unlike challenge generation there is no static fallback here: a plan is
//! personal to the goal, so a failed generation surfaces as an error.

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{
  Difficulty, LearningPlan, ModuleResource, PlanModule, StartingChallenge,
};
use crate::groq::{AiError, RawModule, RawPlan, RawStartingChallenge};
use crate::state::AppState;
use crate::store::StoreError;
use crate::url_validator::validate_plan_resources;

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
  #[error("a learning goal is required (e.g. 'back-end with Node.js')")]
  MissingGoal,
  #[error("the AI planner is not configured")]
  AiUnavailable,
  #[error("plan generation failed: {0}")]
  Generation(#[from] AiError),
  #[error(transparent)]
  Store(#[from] StoreError),
}

/// Generate, normalize, validate and save a new plan; it becomes the
/// user's current plan. Existing challenge history is preserved.
#[instrument(level = "info", skip(state, goal, experience), fields(%user, goal_len = goal.len()))]
pub async fn create_plan(
  state: &AppState,
  user: &str,
  goal: &str,
  experience: &str,
) -> Result<LearningPlan, PlanError> {
  let goal = goal.trim();
  if goal.is_empty() {
    return Err(PlanError::MissingGoal);
  }
  let groq = state.groq.as_ref().ok_or(PlanError::AiUnavailable)?;

  let raw = groq.generate_plan(&state.prompts, goal, experience).await?;
  let plan = normalize_plan(raw, goal);

  info!(target: "plan", plan_id = %plan.id, modules = plan.modules.len(), "Validating plan resources");
  let plan = validate_plan_resources(&state.http, plan).await;

  let plan = state.store.save_plan(user, plan).await?;
  info!(target: "plan", plan_id = %plan.id, modules = plan.modules.len(), level = %plan.level, "Plan created");
  Ok(plan)
}

/// Force the generated outline into canonical shape: defaulted module
/// fields, modules without a resource URL dropped, total hours recomputed,
/// and a starting challenge stub guaranteed.
fn normalize_plan(raw: RawPlan, requested_goal: &str) -> LearningPlan {
  let modules: Vec<PlanModule> = raw
    .modules
    .unwrap_or_default()
    .into_iter()
    .filter_map(normalize_module)
    .collect();

  let starting_challenge = raw
    .starting_challenge
    .map(normalize_starting_challenge)
    .unwrap_or_else(default_starting_challenge);

  let language = if starting_challenge.language.trim().is_empty() {
    "generic".to_string()
  } else {
    starting_challenge.language.clone()
  };

  LearningPlan {
    id: format!("plan-{}", Uuid::new_v4()),
    goal: raw.goal.filter(|g| !g.trim().is_empty()).unwrap_or_else(|| requested_goal.to_string()),
    level: raw.level.as_deref().and_then(Difficulty::parse).unwrap_or_default(),
    language,
    rationale: raw
      .rationale
      .filter(|r| !r.trim().is_empty())
      .unwrap_or_else(|| "Plan generated automatically from the goal.".into()),
    total_estimated_hours: modules.iter().map(|m| m.estimated_time_hours).sum(),
    modules,
    starting_challenge,
    created_at: Utc::now(),
  }
}

fn normalize_module(raw: RawModule) -> Option<PlanModule> {
  // Only modules with a usable resource URL survive; no fabricated links.
  let resource = raw.resource?;
  let url = resource.url.filter(|u| !u.trim().is_empty())?;

  Some(PlanModule {
    id: raw.id.filter(|s| !s.trim().is_empty()).unwrap_or_else(|| Uuid::new_v4().to_string()),
    title: raw.title.filter(|s| !s.trim().is_empty()).unwrap_or_else(|| "Module".into()),
    description: raw.description.unwrap_or_default(),
    resource: ModuleResource {
      kind: resource.kind.filter(|s| !s.trim().is_empty()).unwrap_or_else(|| "article".into()),
      title: resource.title.filter(|s| !s.trim().is_empty()).unwrap_or_else(|| "Resource".into()),
      url,
    },
    outcomes: match raw.outcomes {
      Some(v) if !v.is_empty() => v,
      _ => vec!["Learning outcome".into()],
    },
    estimated_time_hours: raw
      .estimated_time_hours
      .filter(|h| h.is_finite() && *h > 0.0)
      .unwrap_or(2.0),
  })
}

fn normalize_starting_challenge(raw: RawStartingChallenge) -> StartingChallenge {
  let default = default_starting_challenge();
  StartingChallenge {
    title: raw.title.filter(|s| !s.trim().is_empty()).unwrap_or(default.title),
    description: raw.description.filter(|s| !s.trim().is_empty()).unwrap_or(default.description),
    language: raw.language.filter(|s| !s.trim().is_empty()).unwrap_or(default.language),
    acceptance_criteria: match raw.acceptance_criteria {
      Some(v) if !v.is_empty() => v,
      _ => default.acceptance_criteria,
    },
  }
}

fn default_starting_challenge() -> StartingChallenge {
  StartingChallenge {
    title: "Starting challenge".into(),
    description: "Implement a basic solution using the fundamental concepts.".into(),
    language: "generic".into(),
    acceptance_criteria: vec![
      "Works correctly".into(),
      "Clean, commented code".into(),
      "Includes basic documentation".into(),
    ],
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::groq::RawResource;

  fn raw_module(title: &str, url: Option<&str>, hours: Option<f64>) -> RawModule {
    RawModule {
      id: None,
      title: Some(title.into()),
      description: Some("desc".into()),
      resource: url.map(|u| RawResource {
        kind: Some("article".into()),
        title: Some(format!("{title} resource")),
        url: Some(u.into()),
      }),
      outcomes: None,
      estimated_time_hours: hours,
    }
  }

  #[test]
  fn modules_without_a_resource_url_are_dropped() {
    let raw = RawPlan {
      goal: Some("learn PHP".into()),
      level: Some("intermediate".into()),
      modules: Some(vec![
        raw_module("Kept", Some("https://www.php.net/manual"), Some(3.0)),
        raw_module("No resource", None, Some(4.0)),
        raw_module("Blank url", Some("   "), Some(5.0)),
      ]),
      ..RawPlan::default()
    };

    let plan = normalize_plan(raw, "learn PHP");
    assert_eq!(plan.modules.len(), 1);
    assert_eq!(plan.modules[0].title, "Kept");
    assert_eq!(plan.level, Difficulty::Intermediate);
    // Total hours reflect only the surviving modules.
    assert_eq!(plan.total_estimated_hours, 3.0);
    assert_eq!(plan.modules[0].outcomes, vec!["Learning outcome".to_string()]);
  }

  #[test]
  fn missing_fields_get_defaults() {
    let plan = normalize_plan(RawPlan::default(), "analysis with Python");
    assert_eq!(plan.goal, "analysis with Python");
    assert_eq!(plan.level, Difficulty::Beginner);
    assert_eq!(plan.language, "generic");
    assert!(plan.modules.is_empty());
    assert_eq!(plan.total_estimated_hours, 0.0);
    assert_eq!(plan.starting_challenge.title, "Starting challenge");
    assert!(plan.id.starts_with("plan-"));
  }

  #[test]
  fn plan_language_follows_the_starting_challenge() {
    let raw = RawPlan {
      starting_challenge: Some(RawStartingChallenge {
        title: Some("First steps".into()),
        description: None,
        language: Some("Python".into()),
        acceptance_criteria: None,
      }),
      ..RawPlan::default()
    };
    let plan = normalize_plan(raw, "learn Python");
    assert_eq!(plan.language, "Python");
    assert_eq!(plan.starting_challenge.title, "First steps");
  }
}
