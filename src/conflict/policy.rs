//! Resolution policy.
//!
//! Policies are pure (no I/O) so a resolution can be reproduced given the
//! same conflicts.

use serde::{Deserialize, Serialize};

use crate::certainty::Certainty;
use crate::conflict::types::{Conflict, ConflictKind, ResolutionAction, ResolutionStrategy};
use crate::knowledge_base::DefaultException;

/// Resolver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Candidates below this certainty are rejected before any conflict check.
    pub min_certainty: f32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { min_certainty: 0.8 }
    }
}

/// Which side of a direct contradiction survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContradictionDecision {
    /// The candidate is strictly more certain.
    KeepCandidate,
    /// The stored fact is strictly more certain.
    KeepExisting,
    /// Equal certainty: neither survives.
    Tie,
}

/// Compares certainties. Only a strict difference picks a winner.
#[must_use]
pub fn decide_contradiction(candidate: Certainty, existing: Certainty) -> ContradictionDecision {
    if candidate.value() > existing.value() {
        ContradictionDecision::KeepCandidate
    } else if candidate.value() < existing.value() {
        ContradictionDecision::KeepExisting
    } else {
        ContradictionDecision::Tie
    }
}

/// Plans the resolution of a set of conflicts, in order.
#[must_use]
pub fn plan(conflicts: &[Conflict]) -> ResolutionStrategy {
    let mut strategy = ResolutionStrategy::default();
    for conflict in conflicts {
        let candidate = &conflict.candidate;
        let certainty = conflict.candidate_certainty;
        match &conflict.kind {
            ConflictKind::DirectContradiction {
                existing,
                existing_certainty,
            } => match decide_contradiction(certainty, *existing_certainty) {
                ContradictionDecision::KeepCandidate => {
                    strategy.actions.push(ResolutionAction::RetractFact {
                        fact: existing.clone(),
                    });
                    strategy.reasoning.push(format!(
                        "retract {existing} (certainty {existing_certainty}) in favor of {candidate} (certainty {certainty})"
                    ));
                }
                ContradictionDecision::KeepExisting => {
                    strategy.actions.push(ResolutionAction::RejectCandidate {
                        fact: candidate.clone(),
                    });
                    strategy.reasoning.push(format!(
                        "reject {candidate} (certainty {certainty}): {existing} is more certain ({existing_certainty})"
                    ));
                }
                ContradictionDecision::Tie => {
                    strategy.actions.push(ResolutionAction::RetractFact {
                        fact: existing.clone(),
                    });
                    strategy.actions.push(ResolutionAction::RejectCandidate {
                        fact: candidate.clone(),
                    });
                    strategy.actions.push(ResolutionAction::ManualReview {
                        conflict: conflict.id,
                        facts: vec![candidate.clone(), existing.clone()],
                    });
                    strategy.reasoning.push(format!(
                        "retract both {candidate} and {existing}: equal certainty {certainty}, flagged for review"
                    ));
                }
            },
            ConflictKind::DefaultViolation { rule, premise, .. } => {
                let exception = DefaultException {
                    rule: rule.clone(),
                    excluded: premise.clone(),
                };
                strategy
                    .reasoning
                    .push(format!("add exception {exception} so {candidate} stands"));
                strategy.actions.push(ResolutionAction::AddException { exception });
            }
        }
    }
    strategy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::DefaultRule;
    use crate::term::{Predicate, Term};

    fn c(v: f32) -> Certainty {
        Certainty::new(v).unwrap()
    }

    fn unary(name: &str, arg: &str) -> Predicate {
        Predicate::new(name, [Term::constant(arg)])
    }

    fn contradiction(candidate: f32, existing: f32) -> Conflict {
        Conflict::new(
            unary("Flies", "Tux"),
            c(candidate),
            ConflictKind::DirectContradiction {
                existing: unary("NotFlies", "Tux"),
                existing_certainty: c(existing),
            },
        )
    }

    #[test]
    fn strict_certainty_picks_winner() {
        assert_eq!(decide_contradiction(c(0.9), c(0.8)), ContradictionDecision::KeepCandidate);
        assert_eq!(decide_contradiction(c(0.7), c(0.8)), ContradictionDecision::KeepExisting);
        assert_eq!(decide_contradiction(c(0.8), c(0.8)), ContradictionDecision::Tie);
    }

    #[test]
    fn higher_candidate_retracts_existing() {
        let s = plan(&[contradiction(0.95, 0.85)]);
        assert_eq!(
            s.actions,
            vec![ResolutionAction::RetractFact {
                fact: unary("NotFlies", "Tux")
            }]
        );
        assert!(!s.requires_review());
    }

    #[test]
    fn lower_candidate_is_rejected() {
        let s = plan(&[contradiction(0.8, 0.9)]);
        assert!(s.rejects(&unary("Flies", "Tux")));
        assert_eq!(s.actions.len(), 1);
    }

    #[test]
    fn tie_retracts_both_and_flags_review() {
        let s = plan(&[contradiction(0.9, 0.9)]);
        assert!(s.rejects(&unary("Flies", "Tux")));
        assert!(s.actions.contains(&ResolutionAction::RetractFact {
            fact: unary("NotFlies", "Tux")
        }));
        assert!(s.requires_review());
    }

    #[test]
    fn default_violation_adds_exception() {
        let rule = DefaultRule::new(
            Predicate::new("Bird", [Term::var("x")]),
            Predicate::new("Flies", [Term::var("x")]),
        );
        let conflict = Conflict::new(
            unary("NotFlies", "Tux"),
            c(0.9),
            ConflictKind::DefaultViolation {
                rule: rule.clone(),
                premise: unary("Bird", "Tux"),
                expected: unary("Flies", "Tux"),
            },
        );
        let s = plan(&[conflict]);
        assert_eq!(
            s.actions,
            vec![ResolutionAction::AddException {
                exception: DefaultException {
                    rule,
                    excluded: unary("Bird", "Tux"),
                }
            }]
        );
    }

    #[test]
    fn default_threshold() {
        assert!((ResolverConfig::default().min_certainty - 0.8).abs() < f32::EPSILON);
    }
}
