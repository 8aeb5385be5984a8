//! Temporal ordering over `HappensAt` facts.

use crate::knowledge_base::KbSnapshot;
use crate::rule::TemporalQuery;
use crate::substitution::Substitution;
use crate::term::{Predicate, Term};
use crate::unify::unify_predicates;

/// Timestamp of the first recorded event matching the pattern.
///
/// Partially instantiated patterns match any stored event they unify with.
/// Facts whose time does not parse as an integer are skipped.
#[must_use]
pub fn timestamp_of(temporal_facts: &[Predicate], event: &Predicate) -> Option<i64> {
    temporal_facts.iter().find_map(|fact| match fact.terms() {
        [Term::Predicate(stored), Term::Constant(time)] => {
            unify_predicates(stored, event, &Substitution::new())?;
            time.as_integer()
        }
        _ => None,
    })
}

/// Evaluates an ordering query. Undecided (a missing timestamp) is false.
pub(crate) fn evaluate(kb: &KbSnapshot, query: &TemporalQuery) -> bool {
    let first = timestamp_of(&kb.temporal_facts, &query.first);
    let second = timestamp_of(&kb.temporal_facts, &query.second);
    match (first, second) {
        (Some(a), Some(b)) => query.operator.holds(a, b),
        _ => {
            tracing::debug!(query = %query, "temporal: missing timestamp");
            false
        }
    }
}
