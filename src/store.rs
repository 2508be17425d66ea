//! Per-user progress store: plans, current plan, challenge history, stats.
//!
//! Process-local stand-in for the persistence collaborator. Each user owns
//! one document shaped like `{ learning_plan: { plans, currentPlan },
//! challenge_history, stats }`; every operation is a read-modify-write of
//! that document. Creating or switching plans PRESERVES existing history;
//! entries stay tagged with their plan id so they can be filtered per plan.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::domain::{ChallengeHistoryEntry, LearningPlan};
use crate::stats::{overall_stats, StoredStats};

/// A user holds at most this many plans simultaneously.
pub const MAX_PLANS: usize = 5;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StoreError {
    #[error("you have reached the limit of {MAX_PLANS} learning plans; delete one before creating another")]
    PlanLimit,
    #[error("plan not found: {0}")]
    UnknownPlan(String),
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPlanData {
    pub plans: Vec<LearningPlan>,
    pub current_plan: Option<LearningPlan>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct UserProgress {
    pub learning_plan: LearningPlanData,
    pub challenge_history: Vec<ChallengeHistoryEntry>,
    pub stats: StoredStats,
}

#[derive(Clone, Default)]
pub struct ProgressStore {
    users: Arc<RwLock<HashMap<String, UserProgress>>>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full progress document for the user (empty document if unknown).
    #[instrument(level = "debug", skip(self), fields(%user))]
    pub async fn progress(&self, user: &str) -> UserProgress {
        self.users.read().await.get(user).cloned().unwrap_or_default()
    }

    #[instrument(level = "debug", skip(self), fields(%user))]
    pub async fn current_plan(&self, user: &str) -> Option<LearningPlan> {
        self.users
            .read()
            .await
            .get(user)
            .and_then(|p| p.learning_plan.current_plan.clone())
    }

    /// History entries belonging to one plan, oldest first.
    #[instrument(level = "debug", skip(self), fields(%user, %plan_id))]
    pub async fn plan_history(&self, user: &str, plan_id: &str) -> Vec<ChallengeHistoryEntry> {
        self.users
            .read()
            .await
            .get(user)
            .map(|p| {
                p.challenge_history
                    .iter()
                    .filter(|e| e.plan_id == plan_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Append a plan and make it current. Fails past the plan limit.
    /// Existing history is kept untouched.
    #[instrument(level = "info", skip(self, plan), fields(%user, plan_id = %plan.id))]
    pub async fn save_plan(&self, user: &str, plan: LearningPlan) -> Result<LearningPlan, StoreError> {
        let mut users = self.users.write().await;
        let progress = users.entry(user.to_string()).or_default();

        if progress.learning_plan.plans.len() >= MAX_PLANS {
            warn!(target: "plan", %user, count = progress.learning_plan.plans.len(), "Plan limit reached");
            return Err(StoreError::PlanLimit);
        }

        progress.learning_plan.plans.push(plan.clone());
        progress.learning_plan.current_plan = Some(plan.clone());
        info!(target: "plan", %user, plan_id = %plan.id, plans = progress.learning_plan.plans.len(), "Plan saved");
        Ok(plan)
    }

    /// Make an existing plan the current one.
    #[instrument(level = "info", skip(self), fields(%user, %plan_id))]
    pub async fn switch_plan(&self, user: &str, plan_id: &str) -> Result<LearningPlan, StoreError> {
        let mut users = self.users.write().await;
        let progress = users.entry(user.to_string()).or_default();

        let plan = progress
            .learning_plan
            .plans
            .iter()
            .find(|p| p.id == plan_id)
            .cloned()
            .ok_or_else(|| StoreError::UnknownPlan(plan_id.to_string()))?;

        progress.learning_plan.current_plan = Some(plan.clone());
        info!(target: "plan", %user, %plan_id, "Switched current plan");
        Ok(plan)
    }

    /// Delete a plan, cascading deletion of its history entries. If the
    /// deleted plan was current, the most recently created survivor (if
    /// any) becomes current.
    #[instrument(level = "info", skip(self), fields(%user, %plan_id))]
    pub async fn delete_plan(&self, user: &str, plan_id: &str) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let progress = users.entry(user.to_string()).or_default();

        let before = progress.learning_plan.plans.len();
        progress.learning_plan.plans.retain(|p| p.id != plan_id);
        if progress.learning_plan.plans.len() == before {
            return Err(StoreError::UnknownPlan(plan_id.to_string()));
        }

        progress.challenge_history.retain(|e| e.plan_id != plan_id);
        if progress
            .learning_plan
            .current_plan
            .as_ref()
            .is_some_and(|p| p.id == plan_id)
        {
            progress.learning_plan.current_plan = progress.learning_plan.plans.last().cloned();
        }
        progress.stats = overall_stats(&progress.challenge_history);
        info!(target: "plan", %user, %plan_id, remaining = progress.learning_plan.plans.len(), "Plan deleted");
        Ok(())
    }

    /// Wipe every plan and the whole history for the user.
    #[instrument(level = "info", skip(self), fields(%user))]
    pub async fn clear_plans(&self, user: &str) {
        let mut users = self.users.write().await;
        let progress = users.entry(user.to_string()).or_default();
        progress.learning_plan = LearningPlanData::default();
        progress.challenge_history.clear();
        progress.stats = StoredStats::default();
        info!(target: "plan", %user, "All plans cleared");
    }

    /// Upsert a history entry keyed by (challenge id, plan id): a repeat
    /// submission replaces the entry and bumps its attempt count. Stored
    /// stats are recomputed over the whole history.
    #[instrument(level = "info", skip(self, entry), fields(%user, challenge_id = %entry.challenge.id, plan_id = %entry.plan_id))]
    pub async fn record_attempt(&self, user: &str, mut entry: ChallengeHistoryEntry) -> StoredStats {
        let mut users = self.users.write().await;
        let progress = users.entry(user.to_string()).or_default();

        let existing = progress
            .challenge_history
            .iter_mut()
            .find(|e| e.challenge.id == entry.challenge.id && e.plan_id == entry.plan_id);

        match existing {
            Some(slot) => {
                entry.attempts = slot.attempts + 1;
                *slot = entry;
            }
            None => {
                entry.attempts = 1;
                progress.challenge_history.push(entry);
            }
        }

        progress.stats = overall_stats(&progress.challenge_history);
        info!(
            target: "challenge",
            %user,
            total = progress.challenge_history.len(),
            completed = progress.stats.completed_challenges,
            "History entry recorded"
        );
        progress.stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Challenge, Difficulty, Evaluation, StartingChallenge};
    use chrono::Utc;

    fn plan(id: &str) -> LearningPlan {
        LearningPlan {
            id: id.into(),
            goal: "learn JavaScript".into(),
            level: Difficulty::Beginner,
            language: "JavaScript".into(),
            rationale: String::new(),
            modules: vec![],
            total_estimated_hours: 0.0,
            starting_challenge: StartingChallenge {
                title: "Starting challenge".into(),
                description: String::new(),
                language: "JavaScript".into(),
                acceptance_criteria: vec![],
            },
            created_at: Utc::now(),
        }
    }

    fn entry(challenge_id: &str, plan_id: &str, success: bool) -> ChallengeHistoryEntry {
        ChallengeHistoryEntry {
            challenge: Challenge {
                id: challenge_id.into(),
                title: "t".into(),
                description: "d".into(),
                language: "JavaScript".into(),
                difficulty: Difficulty::Beginner,
                acceptance_criteria: vec![],
                hints: vec![],
                example_input: None,
                example_output: None,
                concepts: vec![],
                estimated_time_minutes: 30,
            },
            code: "code".into(),
            evaluation: Some(Evaluation { success, score: 70, feedback: String::new(), suggestions: vec![] }),
            attempts: 1,
            saved_at: Utc::now(),
            completed_at: None,
            plan_id: plan_id.into(),
        }
    }

    #[tokio::test]
    async fn resubmission_bumps_attempts_instead_of_duplicating() {
        let store = ProgressStore::new();
        store.record_attempt("u", entry("c1", "p1", false)).await;
        let stats = store.record_attempt("u", entry("c1", "p1", true)).await;

        let history = store.plan_history("u", "p1").await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].attempts, 2);
        assert_eq!(stats.total_attempts, 2);

        // Same challenge id under another plan is a separate entry.
        store.record_attempt("u", entry("c1", "p2", true)).await;
        assert_eq!(store.plan_history("u", "p2").await.len(), 1);
        assert_eq!(store.plan_history("u", "p1").await.len(), 1);
    }

    #[tokio::test]
    async fn plan_limit_is_enforced() {
        let store = ProgressStore::new();
        for i in 0..MAX_PLANS {
            store.save_plan("u", plan(&format!("p{i}"))).await.unwrap();
        }
        assert_eq!(store.save_plan("u", plan("p5")).await.unwrap_err(), StoreError::PlanLimit);
    }

    #[tokio::test]
    async fn saving_a_plan_preserves_history() {
        let store = ProgressStore::new();
        store.save_plan("u", plan("p1")).await.unwrap();
        store.record_attempt("u", entry("c1", "p1", true)).await;

        store.save_plan("u", plan("p2")).await.unwrap();
        assert_eq!(store.current_plan("u").await.map(|p| p.id), Some("p2".into()));
        assert_eq!(store.plan_history("u", "p1").await.len(), 1);
    }

    #[tokio::test]
    async fn deleting_a_plan_cascades_to_its_history() {
        let store = ProgressStore::new();
        store.save_plan("u", plan("p1")).await.unwrap();
        store.save_plan("u", plan("p2")).await.unwrap();
        store.record_attempt("u", entry("c1", "p1", true)).await;
        store.record_attempt("u", entry("c2", "p2", true)).await;

        store.delete_plan("u", "p2").await.unwrap();
        assert!(store.plan_history("u", "p2").await.is_empty());
        assert_eq!(store.plan_history("u", "p1").await.len(), 1);
        // The survivor gets promoted to current.
        assert_eq!(store.current_plan("u").await.map(|p| p.id), Some("p1".into()));

        assert_eq!(
            store.delete_plan("u", "nope").await.unwrap_err(),
            StoreError::UnknownPlan("nope".into())
        );
    }

    #[tokio::test]
    async fn clearing_plans_empties_the_document() {
        let store = ProgressStore::new();
        store.save_plan("u", plan("p1")).await.unwrap();
        store.record_attempt("u", entry("c1", "p1", true)).await;

        store.clear_plans("u").await;
        let progress = store.progress("u").await;
        assert!(progress.learning_plan.plans.is_empty());
        assert!(progress.learning_plan.current_plan.is_none());
        assert!(progress.challenge_history.is_empty());
        assert_eq!(progress.stats, StoredStats::default());
    }
}
