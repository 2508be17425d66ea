//! Liveness and relevance checks for plan resource links.
//!
//! Generated plans routinely include dead or off-topic links. Every module
//! resource gets a HEAD probe (8s budget) and a technology check: a resource
//! that clearly names a different technology than the plan asked for is
//! dropped, never patched with a fabricated replacement.

use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::domain::{LearningPlan, ModuleResource};

// Ordered: first match wins, so "javascript" is detected before "java"
// can shadow it.
const TECH_KEYWORDS: &[(&str, &[&str])] = &[
  ("php", &["php", "laravel", "symfony", "composer"]),
  ("python", &["python", "django", "flask", "realpython"]),
  ("javascript", &["javascript", "node.js", "nodejs", "npm", "ecmascript"]),
  ("java", &["java"]),
  ("csharp", &["c#", "csharp", ".net"]),
];

/// The known technology a text is about, if any.
pub fn detect_technology(topic: &str) -> Option<&'static str> {
  let lower = topic.to_lowercase();
  TECH_KEYWORDS
    .iter()
    .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
    .map(|(tech, _)| *tech)
}

/// True when the resource's title/url names a known technology that is not
/// the one the plan asked for.
fn names_other_technology(resource: &ModuleResource, requested: &str) -> bool {
  let text = format!("{} {}", resource.title, resource.url);
  match detect_technology(&text) {
    Some(found) => found != requested,
    None => false,
  }
}

/// HEAD-probe a URL. Anything under HTTP 400 counts as live; transport
/// errors and timeouts count as dead.
#[instrument(level = "info", skip(client))]
pub async fn validate_url(client: &reqwest::Client, url: &str) -> bool {
  if reqwest::Url::parse(url).is_err() {
    warn!(target: "plan", %url, "Resource URL failed to parse");
    return false;
  }

  match client
    .head(url)
    .timeout(Duration::from_secs(8))
    .send()
    .await
  {
    Ok(res) => {
      let ok = res.status().as_u16() < 400;
      info!(target: "plan", %url, status = res.status().as_u16(), ok, "URL probe");
      ok
    }
    Err(e) => {
      warn!(target: "plan", %url, error = %e, "URL probe failed");
      false
    }
  }
}

/// Keep only the modules whose resource is on-topic and reachable, then
/// recompute the plan's total hours from the survivors.
#[instrument(level = "info", skip(client, plan), fields(modules = plan.modules.len()))]
pub async fn validate_plan_resources(client: &reqwest::Client, mut plan: LearningPlan) -> LearningPlan {
  let requested = detect_technology(&format!("{} {}", plan.goal, plan.language));

  let mut kept = Vec::with_capacity(plan.modules.len());
  for module in plan.modules {
    if let Some(tech) = requested {
      if names_other_technology(&module.resource, tech) {
        warn!(target: "plan", module = %module.title, url = %module.resource.url, %tech, "Dropping off-topic resource");
        continue;
      }
    }
    if !validate_url(client, &module.resource.url).await {
      warn!(target: "plan", module = %module.title, url = %module.resource.url, "Dropping module with dead resource");
      continue;
    }
    kept.push(module);
  }

  info!(target: "plan", kept = kept.len(), "Resource validation complete");
  plan.total_estimated_hours = kept.iter().map(|m| m.estimated_time_hours).sum();
  plan.modules = kept;
  plan
}

#[cfg(test)]
mod tests {
  use super::*;

  fn resource(title: &str, url: &str) -> ModuleResource {
    ModuleResource { kind: "article".into(), title: title.into(), url: url.into() }
  }

  #[test]
  fn detects_the_requested_technology() {
    assert_eq!(detect_technology("back-end with PHP"), Some("php"));
    assert_eq!(detect_technology("data analysis with Python"), Some("python"));
    // "javascript" wins over the embedded "java" substring.
    assert_eq!(detect_technology("Modern JavaScript"), Some("javascript"));
    assert_eq!(detect_technology("knitting for beginners"), None);
  }

  #[test]
  fn flags_resources_about_another_technology() {
    let js = resource("JavaScript Guide", "https://developer.mozilla.org/docs/Web/JavaScript");
    assert!(names_other_technology(&js, "php"));
    assert!(!names_other_technology(&js, "javascript"));

    let neutral = resource("Programming basics", "https://example.org/basics");
    assert!(!names_other_technology(&neutral, "php"));
  }
}
