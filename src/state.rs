//! Application state: progress store, challenge cache, Groq client, prompts.
//!
//! This module owns:
//!   - the per-user progress store (plans + history + stats)
//!   - the bounded per-plan challenge cache
//!   - the prompts struct (from TOML or defaults) and extra fallback bank
//!   - the optional Groq client and the plain HTTP client for URL probes
//!
//! Construction is explicit so tests can build isolated instances with
//! their own cache/store and without a Groq key.

use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::cache::{ChallengeCache, DEFAULT_CAPACITY, DEFAULT_TTL};
use crate::config::{load_agent_config_from_env, FallbackCfg, Prompts};
use crate::groq::Groq;
use crate::store::{ProgressStore, StoreError};

pub struct AppState {
    pub store: ProgressStore,
    pub cache: RwLock<ChallengeCache>,
    pub groq: Option<Groq>,
    pub http: reqwest::Client,
    pub prompts: Prompts,
    pub fallbacks: Vec<FallbackCfg>,
}

impl AppState {
    pub fn new(
        prompts: Prompts,
        fallbacks: Vec<FallbackCfg>,
        groq: Option<Groq>,
        cache: ChallengeCache,
        store: ProgressStore,
    ) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; SkillPilot/1.0)")
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { store, cache: RwLock::new(cache), groq, http, prompts, fallbacks }
    }

    /// Build state from env: load config, init the Groq client, and set up
    /// the default cache bounds.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Self {
        let cfg = load_agent_config_from_env();
        let (prompts, fallbacks) = cfg
            .map(|c| (c.prompts, c.fallbacks))
            .unwrap_or_else(|| (Prompts::default(), Vec::new()));

        let groq = Groq::from_env();
        match &groq {
            Some(g) => info!(
                target: "skillpilot_backend",
                base_url = %g.base_url,
                primary_model = %g.primary_model,
                fallback_model = %g.fallback_model,
                "Groq enabled."
            ),
            None => info!(
                target: "skillpilot_backend",
                "Groq disabled (no GROQ_API_KEY). Serving fallback challenges only."
            ),
        }

        Self::new(
            prompts,
            fallbacks,
            groq,
            ChallengeCache::new(DEFAULT_CAPACITY, DEFAULT_TTL),
            ProgressStore::new(),
        )
    }

    /// Delete a plan and evict its cached challenges.
    #[instrument(level = "info", skip(self), fields(%user, %plan_id))]
    pub async fn delete_plan(&self, user: &str, plan_id: &str) -> Result<(), StoreError> {
        self.store.delete_plan(user, plan_id).await?;
        self.cache.write().await.clear_plan(plan_id);
        Ok(())
    }

    /// Wipe the user's plans/history and evict every affected cache entry.
    #[instrument(level = "info", skip(self), fields(%user))]
    pub async fn clear_plans(&self, user: &str) {
        let plan_ids: Vec<String> = self
            .store
            .progress(user)
            .await
            .learning_plan
            .plans
            .iter()
            .map(|p| p.id.clone())
            .collect();

        self.store.clear_plans(user).await;
        let mut cache = self.cache.write().await;
        for plan_id in &plan_ids {
            cache.clear_plan(plan_id);
        }
    }
}

#[cfg(test)]
impl AppState {
    /// Isolated state for tests: default prompts, no Groq client.
    pub fn for_tests() -> Self {
        Self::new(
            Prompts::default(),
            Vec::new(),
            None,
            ChallengeCache::new(DEFAULT_CAPACITY, DEFAULT_TTL),
            ProgressStore::new(),
        )
    }
}
