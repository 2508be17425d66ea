//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{Challenge, ChallengeHistoryEntry, ChallengeOrigin, Evaluation, LearningPlan};
use crate::stats::PlanStats;

//
// Challenge endpoints
//

#[derive(Debug, Deserialize)]
pub struct ChallengeQuery {
    #[serde(default)]
    pub index: Option<u32>,
}

#[derive(Serialize)]
pub struct ChallengeOut {
    pub challenge: Challenge,
    pub origin: ChallengeOrigin,
    pub index: u32,
}

#[derive(Deserialize)]
pub struct SubmitIn {
    pub challenge: Challenge,
    pub code: String,
}

#[derive(Serialize)]
pub struct SubmitOut {
    pub evaluation: Evaluation,
    pub stats: PlanStats,
}

//
// Stats / history
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    #[serde(default)]
    pub plan_id: Option<String>,
}

#[derive(Serialize)]
pub struct HistoryOut {
    pub entries: Vec<ChallengeHistoryEntry>,
}

//
// Plan endpoints
//

#[derive(Deserialize)]
pub struct PlanIn {
    pub goal: String,
    #[serde(default)]
    pub experience: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanOut {
    pub success: bool,
    pub plan: LearningPlan,
    pub plans_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlansOut {
    pub plans: Vec<LearningPlan>,
    pub current_plan: Option<LearningPlan>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchIn {
    pub plan_id: String,
}

#[derive(Serialize)]
pub struct SwitchOut {
    pub success: bool,
    pub plan: LearningPlan,
}

//
// Generic envelopes
//

#[derive(Serialize)]
pub struct OkOut {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
