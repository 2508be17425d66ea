//! Static fallback challenges used when AI generation is unavailable.
//!
//! The built-in bank is keyed by (language, difficulty) and guarantees the
//! app stays useful without a Groq key or when the API is down. TOML config
//! may add templates that take precedence for their (language, difficulty).

use uuid::Uuid;

use crate::config::FallbackCfg;
use crate::domain::{Challenge, Difficulty};

struct FallbackTemplate {
  title: &'static str,
  description: &'static str,
  concepts: &'static [&'static str],
  example_input: Option<&'static str>,
  example_output: Option<&'static str>,
}

const JS_BEGINNER: FallbackTemplate = FallbackTemplate {
  title: "Simple Sum Function",
  description: "Write a function that takes two numbers as parameters and returns their sum.",
  concepts: &["functions", "parameters", "return"],
  example_input: Some("sum(5, 3)"),
  example_output: Some("8"),
};

const JS_INTERMEDIATE: FallbackTemplate = FallbackTemplate {
  title: "Filter an Array",
  description: "Write a function that filters an array of numbers and returns only the even ones.",
  concepts: &["arrays", "filter", "arrow functions"],
  example_input: Some("[1, 2, 3, 4, 5, 6]"),
  example_output: Some("[2, 4, 6]"),
};

const JS_ADVANCED: FallbackTemplate = FallbackTemplate {
  title: "Implement QuickSort",
  description: "Implement the QuickSort algorithm to sort an array of numbers.",
  concepts: &["recursion", "algorithms", "divide and conquer"],
  example_input: Some("[64, 34, 25, 12, 22, 11, 90]"),
  example_output: Some("[11, 12, 22, 25, 34, 64, 90]"),
};

const PY_BEGINNER: FallbackTemplate = FallbackTemplate {
  title: "Greeting Function",
  description: "Write a function that takes a name as a parameter and returns a personalized greeting.",
  concepts: &["functions", "strings", "f-strings"],
  example_input: Some("greet('Ana')"),
  example_output: Some("'Hello Ana, welcome!'"),
};

const PY_INTERMEDIATE: FallbackTemplate = FallbackTemplate {
  title: "Word Counter",
  description: "Write a function that counts how often each word appears in a text.",
  concepts: &["dictionaries", "split", "loops"],
  example_input: Some("'the cat chased the mouse'"),
  example_output: Some("{'the': 2, 'cat': 1, 'chased': 1, 'mouse': 1}"),
};

const PY_ADVANCED: FallbackTemplate = FallbackTemplate {
  title: "Binary Search Tree Class",
  description: "Implement a binary search tree class with insert, search and traverse methods.",
  concepts: &["classes", "recursion", "data structures"],
  example_input: Some("tree.insert(5); tree.search(5)"),
  example_output: Some("True"),
};

fn builtin_template(language: &str, difficulty: Difficulty) -> &'static FallbackTemplate {
  use Difficulty::*;
  match (language.trim().to_lowercase().as_str(), difficulty) {
    ("javascript" | "js" | "node.js" | "nodejs", Intermediate) => &JS_INTERMEDIATE,
    ("javascript" | "js" | "node.js" | "nodejs", Advanced) => &JS_ADVANCED,
    ("python", Beginner) => &PY_BEGINNER,
    ("python", Intermediate) => &PY_INTERMEDIATE,
    ("python", Advanced) => &PY_ADVANCED,
    // Unknown languages get the generic JavaScript/beginner template.
    _ => &JS_BEGINNER,
  }
}

pub fn generic_acceptance_criteria() -> Vec<String> {
  vec![
    "The code runs without errors".into(),
    "It meets the stated requirements".into(),
    "The code is clean and commented".into(),
  ]
}

pub fn generic_hints() -> Vec<String> {
  vec![
    "Read the problem statement carefully".into(),
    "Test your code against the provided examples".into(),
    "Consider edge cases such as empty inputs".into(),
  ]
}

/// Deterministic fallback challenge for (language, difficulty).
/// Config-supplied templates win over the built-in bank.
pub fn fallback_challenge(
  index: u32,
  language: &str,
  difficulty: Difficulty,
  extra: &[FallbackCfg],
) -> Challenge {
  let base = Challenge {
    id: format!("fallback-{}-{}", index, Uuid::new_v4()),
    title: String::new(),
    description: String::new(),
    language: language.to_string(),
    difficulty,
    acceptance_criteria: generic_acceptance_criteria(),
    hints: generic_hints(),
    example_input: None,
    example_output: None,
    concepts: Vec::new(),
    estimated_time_minutes: 30,
  };

  if let Some(cfg) = extra
    .iter()
    .find(|c| c.language.eq_ignore_ascii_case(language) && c.difficulty == difficulty)
  {
    return Challenge {
      title: cfg.title.clone(),
      description: cfg.description.clone(),
      concepts: if cfg.concepts.is_empty() { vec!["fundamentals".into()] } else { cfg.concepts.clone() },
      example_input: cfg.example_input.clone(),
      example_output: cfg.example_output.clone(),
      ..base
    };
  }

  let tpl = builtin_template(language, difficulty);
  Challenge {
    title: tpl.title.to_string(),
    description: tpl.description.to_string(),
    concepts: tpl.concepts.iter().map(|c| (*c).to_string()).collect(),
    example_input: tpl.example_input.map(str::to_string),
    example_output: tpl.example_output.map(str::to_string),
    ..base
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn keeps_the_requested_language_and_difficulty() {
    let ch = fallback_challenge(4, "Python", Difficulty::Intermediate, &[]);
    assert_eq!(ch.language, "Python");
    assert_eq!(ch.difficulty, Difficulty::Intermediate);
    assert_eq!(ch.title, "Word Counter");
    assert!(!ch.acceptance_criteria.is_empty());
  }

  #[test]
  fn unknown_language_defaults_to_javascript_beginner() {
    let ch = fallback_challenge(0, "COBOL", Difficulty::Advanced, &[]);
    assert_eq!(ch.language, "COBOL");
    assert_eq!(ch.title, "Simple Sum Function");
  }

  #[test]
  fn config_templates_take_precedence() {
    let extra = vec![FallbackCfg {
      language: "python".into(),
      difficulty: Difficulty::Beginner,
      title: "Custom Starter".into(),
      description: "From the TOML bank.".into(),
      concepts: vec![],
      example_input: None,
      example_output: None,
    }];
    let ch = fallback_challenge(0, "Python", Difficulty::Beginner, &extra);
    assert_eq!(ch.title, "Custom Starter");
    assert_eq!(ch.concepts, vec!["fundamentals".to_string()]);
  }
}
