//! Loading agent configuration (prompts + optional fallback bank) from TOML.
//!
//! See `AgentConfig` and `Prompts` for the expected schema.

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::Difficulty;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
    #[serde(default)]
    pub prompts: Prompts,
    #[serde(default)]
    pub fallbacks: Vec<FallbackCfg>,
}

/// Extra fallback challenge template accepted in TOML configuration.
/// Consulted before the built-in bank for the matching (language, difficulty).
#[derive(Clone, Debug, Deserialize)]
pub struct FallbackCfg {
    pub language: String,
    pub difficulty: Difficulty,
    pub title: String,
    pub description: String,
    #[serde(default)] pub concepts: Vec<String>,
    #[serde(default)] pub example_input: Option<String>,
    #[serde(default)] pub example_output: Option<String>,
}

/// Prompts used by the Groq client. Defaults are sensible for programming
/// challenges; override them in TOML to tune tone/structure.
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
    pub challenge_system: String,
    pub challenge_instructions_template: String,
    pub evaluation_system: String,
    pub plan_system: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            challenge_system: r#"You are an expert programming-challenge generator for SkillPilot.
You produce PROGRESSIVE, SPECIFIC challenges for the requested technology.

CRITICAL RULES:
- Generate challenges EXCLUSIVELY for the requested technology/language.
- Challenges must be PROGRESSIVE: each one harder than the one before.
- Match the requested difficulty (beginner/intermediate/advanced).
- NEVER mix different technologies.

RESPOND EXCLUSIVELY IN JSON with this EXACT structure:

{
  "challenge": {
    "id": "string-uuid",
    "title": "string",
    "description": "detailed description of the problem to solve",
    "language": "string (must match the requested technology)",
    "difficulty": "beginner|intermediate|advanced",
    "acceptanceCriteria": ["criterion1", "criterion2", "criterion3"],
    "hints": ["hint1", "hint2"],
    "exampleInput": "string (optional)",
    "exampleOutput": "string (optional)",
    "concepts": ["concept1", "concept2", "concept3"],
    "estimatedTimeMinutes": number
  }
}

CHALLENGE TYPES PER TIER:

BEGINNER:
- Basic syntax, variables, data types
- Simple conditionals (if/else)
- Basic loops (for, while)
- Simple functions
- Basic arithmetic

INTERMEDIATE:
- Data structures (arrays, objects, lists, maps)
- Functions with several parameters
- Advanced string handling
- Basic sorting algorithms
- Validation and error handling

ADVANCED:
- Complex algorithms (recursion, divide and conquer)
- Advanced data structures
- Performance optimization
- Design patterns
- Architecture and best practices

IMPORTANT:
- Every challenge needs a practical context.
- Include example input and output when relevant.
- Acceptance criteria must be specific and verifiable.
- Hints should guide without giving the full answer away."#.into(),

            challenge_instructions_template: r#"Generate challenge number {challenge_number} for someone learning {goal}.

Context:
- User's base level: {base_level}
- Target difficulty for this challenge: {target_difficulty}
- Language/technology: {language}
- Challenge number: {challenge_number}

The challenge must:
1. Be specific to {language}
2. Have {target_difficulty} difficulty
3. Build on the previous challenges
4. Cover concepts relevant to {goal}
5. Be practical and realistic

Do NOT repeat earlier challenges; be creative but relevant."#.into(),

            evaluation_system: r#"You are an expert code evaluator. Evaluate the code against the given
challenge and respond ONLY with valid JSON of this structure:
{
  "success": boolean,
  "score": number (0-100),
  "feedback": "string with detailed feedback",
  "suggestions": ["array", "of", "specific", "suggestions"]
}

Evaluation criteria:
- Does it satisfy the acceptance criteria?
- Is it syntactically correct?
- Does it follow best practices?
- Is it readable and well structured?
- Does it handle edge cases appropriately?

Be constructive but honest in your evaluation."#.into(),

            plan_system: r#"You are SkillPilot. You generate a PERSONALIZED study plan for the
specific language or technology the user asks for.
Generate content EXCLUSIVELY about the requested technology. NEVER mix
different technologies.

IMPORTANT: URLs must be REAL and working. Do NOT use generic or example
URLs; provide specific tutorials, documentation and resources that exist.

RESPOND EXCLUSIVELY IN JSON with this EXACT shape:

{
  "goal": "string",
  "level": "beginner|intermediate|advanced",
  "rationale": "string",
  "modules": [
    {
      "id": "string-uuid-or-slug",
      "title": "string",
      "description": "string",
      "resource": { "type": "video|article|guide", "title": "string", "url": "https://..." },
      "outcomes": ["string", "string"],
      "estimatedTimeHours": 2
    }
  ],
  "totalEstimatedHours": 10,
  "startingChallenge": {
    "title": "string",
    "description": "string",
    "language": "string",
    "acceptanceCriteria": ["string", "string"]
  }
}

RULES:
- If the user asks for PHP, EVERY resource must be about PHP (never JavaScript).
- Prefer official documentation and recognized tutorials (php.net,
  docs.python.org, developer.mozilla.org, nodejs.org, realpython.com, ...).
- Return EXACTLY 4 or 5 modules.
- Adjust the level from the declared experience.
- The "language" field must match the requested technology.
- No text outside the JSON."#.into(),
        }
    }
}

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
    let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
    match std::fs::read_to_string(&path) {
        Ok(s) => match toml::from_str::<AgentConfig>(&s) {
            Ok(cfg) => {
                info!(target: "skillpilot_backend", %path, "Loaded agent config (TOML)");
                Some(cfg)
            }
            Err(e) => {
                error!(target: "skillpilot_backend", %path, error = %e, "Failed to parse TOML config");
                None
            }
        },
        Err(e) => {
            error!(target: "skillpilot_backend", %path, error = %e, "Failed to read TOML config file");
            None
        }
    }
}
