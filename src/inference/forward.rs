//! Forward chaining: naive fixpoint saturation.
//!
//! Each pass matches every rule premise against every known fact and
//! collects ground conclusions not yet known. The pass's results are merged
//! into the fact set before the next pass. Saturation stops when a pass adds
//! nothing or the pass limit is reached.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::knowledge_base::{validate_fact, KbState};
use crate::substitution::Substitution;
use crate::term::Predicate;
use crate::unify::unify_predicates;

/// Outcome of one saturation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Saturation {
    /// Ground facts newly added by this run.
    pub derived: BTreeSet<Predicate>,
    /// Passes performed, including the final empty one.
    pub passes: usize,
    /// False when the pass limit stopped saturation early.
    pub reached_fixpoint: bool,
}

impl Saturation {
    /// Returns true if nothing new was derived.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.derived.is_empty()
    }
}

/// One pass: every conclusion derivable in a single rule step from the
/// current state that is not already known.
fn derive_once(state: &KbState) -> BTreeSet<Predicate> {
    let mut fresh = BTreeSet::new();
    let known = state.facts.keys().chain(state.temporal.iter());
    let known: Vec<&Predicate> = known.collect();
    for rule in &state.rules {
        for fact in &known {
            let Some(s) = unify_predicates(rule.premise(), fact, &Substitution::new()) else {
                continue;
            };
            let conclusion = s.apply(rule.conclusion());
            if state.contains_fact(&conclusion) || fresh.contains(&conclusion) {
                continue;
            }
            if let Err(e) = validate_fact(&conclusion) {
                tracing::debug!(rule = %rule, error = %e, "forward: conclusion skipped");
                continue;
            }
            fresh.insert(conclusion);
        }
    }
    fresh
}

/// Saturates the state under its rules, at most `max_passes` passes.
pub(crate) fn saturate(state: &mut KbState, max_passes: usize) -> Saturation {
    let mut result = Saturation::default();
    while result.passes < max_passes {
        result.passes += 1;
        let fresh = derive_once(state);
        if fresh.is_empty() {
            result.reached_fixpoint = true;
            return result;
        }
        for fact in fresh {
            state.insert_fact(fact.clone(), None);
            state.derived.insert(fact.clone());
            result.derived.insert(fact);
        }
    }
    tracing::warn!(passes = result.passes, "forward: pass limit reached before fixpoint");
    result
}
