//! Challenge orchestration: difficulty resolution, cache lookup, AI
//! generation with model fallback, normalization, and code evaluation.
//!
//! Generation never surfaces transient failures: a rate-limited or failed
//! call degrades to the static template bank and the outcome's origin says
//! so. Only a missing current plan is an error.

use chrono::Utc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::domain::{
  Challenge, ChallengeHistoryEntry, ChallengeOrigin, Difficulty, Evaluation, LearningPlan,
};
use crate::fallback::{fallback_challenge, generic_acceptance_criteria, generic_hints};
use crate::groq::{GenerationRequest, PriorChallenge, RawChallenge, RawEvaluation};
use crate::progression::resolve_difficulty;
use crate::state::AppState;
use crate::stats::{plan_stats, PlanStats};
use crate::util::fill_template;

#[derive(Debug, thiserror::Error)]
pub enum ChallengeError {
  #[error("no learning plan configured")]
  NoActivePlan,
  #[error("code must not be empty")]
  EmptyCode,
}

/// A served challenge together with where it came from.
#[derive(Debug)]
pub struct ChallengeOutcome {
  pub challenge: Challenge,
  pub origin: ChallengeOrigin,
}

/// Evaluation of one submission plus the refreshed per-plan stats.
#[derive(Debug)]
pub struct SubmissionResult {
  pub evaluation: Evaluation,
  pub stats: PlanStats,
}

// Orchestration steps. Modeled explicitly so the cache-hit, generation and
// fallback transitions stay independently readable and testable.
enum Step {
  CacheLookup,
  Generate,
  FallBack(String),
  Done(Challenge, ChallengeOrigin),
}

/// Serve the challenge at `index` for the user's current plan: resolve the
/// target difficulty, try the cache, otherwise generate (or fall back to a
/// template), then cache the result.
#[instrument(level = "info", skip(state), fields(%user, index))]
pub async fn get_or_generate(
  state: &AppState,
  user: &str,
  index: u32,
) -> Result<ChallengeOutcome, ChallengeError> {
  let plan = state.store.current_plan(user).await.ok_or(ChallengeError::NoActivePlan)?;
  let target = resolve_difficulty(index, plan.level);

  let mut step = Step::CacheLookup;
  loop {
    step = match step {
      Step::CacheLookup => {
        let cached = state.cache.read().await.get(&plan.id, index);
        match cached {
          Some(ch) => Step::Done(ch, ChallengeOrigin::Cache),
          None if state.groq.is_some() => Step::Generate,
          None => Step::FallBack("ai_disabled".into()),
        }
      }

      Step::Generate => match &state.groq {
        None => Step::FallBack("ai_disabled".into()),
        Some(groq) => {
          let history = state.store.plan_history(user, &plan.id).await;
          let request = build_generation_request(state, &plan, target, index, &history);
          match groq.generate_challenge(&state.prompts, &request).await {
            Ok((raw, model)) => {
              let challenge = normalize_challenge(raw, &plan, target, index);
              Step::Done(challenge, ChallengeOrigin::Generated { model })
            }
            Err(e) => {
              error!(target: "challenge", plan_id = %plan.id, index, error = %e, "Generation failed; using template fallback");
              let reason = if e.is_rate_limit() { "rate_limited" } else { "generation_failed" };
              Step::FallBack(reason.into())
            }
          }
        }
      },

      Step::FallBack(reason) => {
        let challenge = fallback_challenge(index, &plan.language, target, &state.fallbacks);
        Step::Done(challenge, ChallengeOrigin::Fallback { reason })
      }

      Step::Done(challenge, origin) => {
        if !matches!(origin, ChallengeOrigin::Cache) {
          state.cache.write().await.set(&plan.id, index, challenge.clone());
        }
        info!(
          target: "challenge",
          plan_id = %plan.id,
          index,
          id = %challenge.id,
          difficulty = %challenge.difficulty,
          origin = origin.label(),
          "Challenge served"
        );
        return Ok(ChallengeOutcome { challenge, origin });
      }
    };
  }
}

/// Evaluate submitted code and persist the attempt. The evaluator always
/// produces a usable Evaluation: structural or transport failures become
/// the pessimistic default rather than errors.
#[instrument(level = "info", skip(state, challenge, code), fields(%user, challenge_id = %challenge.id, code_len = code.len()))]
pub async fn submit_code(
  state: &AppState,
  user: &str,
  challenge: Challenge,
  code: String,
) -> Result<SubmissionResult, ChallengeError> {
  if code.trim().is_empty() {
    return Err(ChallengeError::EmptyCode);
  }
  let plan = state.store.current_plan(user).await.ok_or(ChallengeError::NoActivePlan)?;

  let evaluation = match &state.groq {
    Some(groq) => match groq.evaluate_code(&state.prompts, &challenge, &code).await {
      Ok(raw) => normalize_evaluation(raw),
      Err(e) => {
        error!(target: "challenge", id = %challenge.id, error = %e, "Evaluation failed; reporting pessimistic default");
        pessimistic_evaluation()
      }
    },
    None => pessimistic_evaluation(),
  };

  let now = Utc::now();
  let entry = ChallengeHistoryEntry {
    challenge,
    code,
    evaluation: Some(evaluation.clone()),
    attempts: 1, // the store assigns the real count on upsert
    saved_at: now,
    completed_at: evaluation.success.then_some(now),
    plan_id: plan.id.clone(),
  };
  state.store.record_attempt(user, entry).await;

  let history = state.store.plan_history(user, &plan.id).await;
  let stats = plan_stats(&history, &plan.id);
  info!(
    target: "challenge",
    plan_id = %plan.id,
    success = evaluation.success,
    score = evaluation.score,
    "Submission evaluated"
  );
  Ok(SubmissionResult { evaluation, stats })
}

/// Context for the generation call: plan facts, the resolved target tier,
/// and up to the 3 prior challenges (titles + concepts only) so the model
/// steers away from repetition.
fn build_generation_request(
  state: &AppState,
  plan: &LearningPlan,
  target: Difficulty,
  index: u32,
  history: &[ChallengeHistoryEntry],
) -> GenerationRequest {
  let previous_challenges: Vec<PriorChallenge> = history
    .iter()
    .take(index as usize)
    .rev()
    .take(3)
    .rev()
    .map(|e| PriorChallenge {
      title: e.challenge.title.clone(),
      concepts: e.challenge.concepts.clone(),
    })
    .collect();

  let number = (index + 1).to_string();
  let instructions = fill_template(
    &state.prompts.challenge_instructions_template,
    &[
      ("goal", plan.goal.as_str()),
      ("base_level", plan.level.as_str()),
      ("target_difficulty", target.as_str()),
      ("language", plan.language.as_str()),
      ("challenge_number", number.as_str()),
    ],
  );

  GenerationRequest {
    goal: plan.goal.clone(),
    level: plan.level,
    language: plan.language.clone(),
    target_difficulty: target,
    challenge_number: index + 1,
    previous_challenges,
    instructions,
  }
}

/// Force the generated challenge into canonical shape. The model's echoed
/// language and difficulty are never trusted; missing fields get generic
/// defaults.
fn normalize_challenge(
  raw: RawChallenge,
  plan: &LearningPlan,
  target: Difficulty,
  index: u32,
) -> Challenge {
  let number = index + 1;
  Challenge {
    id: non_empty(raw.id).unwrap_or_else(|| format!("challenge-{}-{}", number, Uuid::new_v4())),
    title: non_empty(raw.title).unwrap_or_else(|| format!("Challenge {number}")),
    description: non_empty(raw.description).unwrap_or_else(|| "Description not available.".into()),
    language: plan.language.clone(),
    difficulty: target,
    acceptance_criteria: default_if_empty(raw.acceptance_criteria, generic_acceptance_criteria),
    hints: default_if_empty(raw.hints, generic_hints),
    example_input: raw.example_input,
    example_output: raw.example_output,
    concepts: default_if_empty(raw.concepts, || vec!["fundamentals".into()]),
    estimated_time_minutes: raw
      .estimated_time_minutes
      .filter(|m| m.is_finite() && *m >= 1.0)
      .map(|m| m.round() as u32)
      .unwrap_or(30),
  }
}

fn normalize_evaluation(raw: RawEvaluation) -> Evaluation {
  Evaluation {
    success: raw.success.unwrap_or(false),
    score: raw
      .score
      .filter(|s| s.is_finite())
      .map(|s| s.clamp(0.0, 100.0).round() as u8)
      .unwrap_or(0),
    feedback: non_empty(raw.feedback).unwrap_or_else(|| "No feedback could be generated.".into()),
    suggestions: default_if_empty(raw.suggestions, || vec!["Try again".into()]),
  }
}

fn pessimistic_evaluation() -> Evaluation {
  Evaluation {
    success: false,
    score: 0,
    feedback: "The evaluation could not be processed. Please try again.".into(),
    suggestions: vec!["Check that your code is complete and well formatted".into()],
  }
}

fn non_empty(value: Option<String>) -> Option<String> {
  value.filter(|s| !s.trim().is_empty())
}

fn default_if_empty(value: Option<Vec<String>>, default: impl FnOnce() -> Vec<String>) -> Vec<String> {
  match value {
    Some(v) if !v.is_empty() => v,
    _ => default(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::StartingChallenge;

  fn plan(id: &str, level: Difficulty, language: &str) -> LearningPlan {
    LearningPlan {
      id: id.into(),
      goal: format!("learn {language}"),
      level,
      language: language.into(),
      rationale: String::new(),
      modules: vec![],
      total_estimated_hours: 0.0,
      starting_challenge: StartingChallenge {
        title: "Starting challenge".into(),
        description: String::new(),
        language: language.into(),
        acceptance_criteria: vec![],
      },
      created_at: Utc::now(),
    }
  }

  #[tokio::test]
  async fn missing_plan_is_a_fatal_precondition() {
    let state = AppState::for_tests();
    assert!(matches!(
      get_or_generate(&state, "u", 0).await,
      Err(ChallengeError::NoActivePlan)
    ));
  }

  #[tokio::test]
  async fn first_three_challenges_are_beginner_even_for_advanced_plans() {
    let state = AppState::for_tests();
    state.store.save_plan("u", plan("p1", Difficulty::Advanced, "JavaScript")).await.unwrap();

    let outcome = get_or_generate(&state, "u", 0).await.unwrap();
    assert_eq!(outcome.challenge.difficulty, Difficulty::Beginner);
    assert_eq!(outcome.challenge.language, "JavaScript");
  }

  #[tokio::test]
  async fn second_call_hits_the_cache_with_an_identical_challenge() {
    let state = AppState::for_tests();
    state.store.save_plan("u", plan("p1", Difficulty::Beginner, "Python")).await.unwrap();

    let first = get_or_generate(&state, "u", 2).await.unwrap();
    assert!(matches!(first.origin, ChallengeOrigin::Fallback { .. }));

    let second = get_or_generate(&state, "u", 2).await.unwrap();
    assert_eq!(second.origin, ChallengeOrigin::Cache);
    assert_eq!(second.challenge.id, first.challenge.id);
    assert_eq!(second.challenge.title, first.challenge.title);
  }

  #[tokio::test]
  async fn submission_without_an_evaluator_degrades_pessimistically() {
    let state = AppState::for_tests();
    state.store.save_plan("u", plan("p1", Difficulty::Beginner, "Python")).await.unwrap();

    let served = get_or_generate(&state, "u", 0).await.unwrap().challenge;
    let result = submit_code(&state, "u", served.clone(), "print('hi')".into()).await.unwrap();
    assert!(!result.evaluation.success);
    assert_eq!(result.evaluation.score, 0);
    assert_eq!(result.stats.total, 1);
    assert_eq!(result.stats.total_attempts, 1);

    // Resubmitting the same challenge updates the entry in place.
    let again = submit_code(&state, "u", served, "print('hi again')".into()).await.unwrap();
    assert_eq!(again.stats.total, 1);
    assert_eq!(again.stats.total_attempts, 2);
  }

  #[tokio::test]
  async fn empty_code_is_rejected() {
    let state = AppState::for_tests();
    state.store.save_plan("u", plan("p1", Difficulty::Beginner, "Python")).await.unwrap();
    let served = get_or_generate(&state, "u", 0).await.unwrap().challenge;
    assert!(matches!(
      submit_code(&state, "u", served, "   ".into()).await,
      Err(ChallengeError::EmptyCode)
    ));
  }

  #[test]
  fn normalization_never_trusts_the_echoed_language_or_difficulty() {
    let raw = RawChallenge {
      language: Some("Python".into()),
      difficulty: Some("advanced".into()),
      title: Some("Loops".into()),
      ..RawChallenge::default()
    };
    let plan = plan("p1", Difficulty::Beginner, "JavaScript");
    let ch = normalize_challenge(raw, &plan, Difficulty::Beginner, 0);
    assert_eq!(ch.language, "JavaScript");
    assert_eq!(ch.difficulty, Difficulty::Beginner);
    assert!(!ch.acceptance_criteria.is_empty());
    assert!(!ch.hints.is_empty());
    assert_eq!(ch.estimated_time_minutes, 30);
    assert!(ch.id.starts_with("challenge-1-"));
  }

  #[test]
  fn generation_context_carries_at_most_three_prior_challenges() {
    let state = AppState::for_tests();
    let plan = plan("p1", Difficulty::Beginner, "Python");
    let history: Vec<ChallengeHistoryEntry> = (0..5)
      .map(|i| ChallengeHistoryEntry {
        challenge: Challenge {
          id: format!("c{i}"),
          title: format!("Challenge {i}"),
          description: String::new(),
          language: "Python".into(),
          difficulty: Difficulty::Beginner,
          acceptance_criteria: vec![],
          hints: vec![],
          example_input: None,
          example_output: None,
          concepts: vec![format!("concept-{i}")],
          estimated_time_minutes: 30,
        },
        code: String::new(),
        evaluation: None,
        attempts: 1,
        saved_at: Utc::now(),
        completed_at: None,
        plan_id: "p1".into(),
      })
      .collect();

    let request = build_generation_request(&state, &plan, Difficulty::Beginner, 5, &history);
    let titles: Vec<&str> = request.previous_challenges.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Challenge 2", "Challenge 3", "Challenge 4"]);
    assert_eq!(request.challenge_number, 6);
    assert!(request.instructions.contains("challenge number 6"));
    assert!(request.instructions.contains("Python"));
  }
}
