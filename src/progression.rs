//! Difficulty progression: maps a challenge's sequence index and the
//! plan's declared base level to the target tier for that challenge.
//!
//! Deterministic and total for every non-negative index. The first three
//! challenges are an onboarding ramp at beginner regardless of base level;
//! after that the tier climbs in bands, faster for higher base levels.

use crate::domain::Difficulty;

pub fn resolve_difficulty(index: u32, base: Difficulty) -> Difficulty {
  use Difficulty::*;

  match index {
    // Onboarding ramp: everyone starts at beginner.
    0..=2 => Beginner,
    3..=6 => match base {
      Advanced => Intermediate,
      Intermediate if index >= 5 => Intermediate,
      _ => Beginner,
    },
    _ => match base {
      Beginner if index >= 10 => Intermediate,
      Beginner => Beginner,
      Intermediate if index >= 10 => Advanced,
      Intermediate => Intermediate,
      Advanced => Advanced,
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use Difficulty::*;

  #[test]
  fn onboarding_ramp_ignores_base_level() {
    for index in 0..3 {
      for base in [Beginner, Intermediate, Advanced] {
        assert_eq!(resolve_difficulty(index, base), Beginner, "index {index}, base {base}");
      }
    }
  }

  #[test]
  fn middle_band_depends_on_base_level() {
    for index in 3..7 {
      assert_eq!(resolve_difficulty(index, Beginner), Beginner);
      assert_eq!(resolve_difficulty(index, Advanced), Intermediate);
    }
    assert_eq!(resolve_difficulty(3, Intermediate), Beginner);
    assert_eq!(resolve_difficulty(4, Intermediate), Beginner);
    assert_eq!(resolve_difficulty(5, Intermediate), Intermediate);
    assert_eq!(resolve_difficulty(6, Intermediate), Intermediate);
  }

  #[test]
  fn beginner_graduates_at_ten() {
    assert_eq!(resolve_difficulty(9, Beginner), Beginner);
    assert_eq!(resolve_difficulty(10, Beginner), Intermediate);
    assert_eq!(resolve_difficulty(25, Beginner), Intermediate);
  }

  #[test]
  fn intermediate_graduates_at_ten() {
    assert_eq!(resolve_difficulty(7, Intermediate), Intermediate);
    assert_eq!(resolve_difficulty(9, Intermediate), Intermediate);
    assert_eq!(resolve_difficulty(10, Intermediate), Advanced);
  }

  #[test]
  fn advanced_stays_advanced_past_the_ramp() {
    for index in 7..40 {
      assert_eq!(resolve_difficulty(index, Advanced), Advanced);
    }
  }
}
