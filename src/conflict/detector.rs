//! Structural conflict detection.
//!
//! Detection is pure: it reads a [`KbSnapshot`] and returns conflicts. It
//! never consults rules beyond the default rule being checked, so a premise
//! only counts when it is a stored fact.

use crate::certainty::Certainty;
use crate::conflict::types::{Conflict, ConflictKind};
use crate::knowledge_base::KbSnapshot;
use crate::rule::DefaultRule;
use crate::substitution::Substitution;
use crate::term::{Predicate, Term};
use crate::unify::{unify_predicates, unify_variable};

/// Finds the stored premise instance and the conclusion the default rule
/// would draw for the candidate's entity, if that conclusion differs from
/// the candidate.
///
/// The candidate matches the rule when its positive form has the positive
/// form of the conclusion's name and arity, so `Flies(Tux)` is checked
/// against both `~> Flies(x)` and `~> NotFlies(x)`. Conclusion arguments
/// that are variables are bound positionally from the candidate.
#[must_use]
pub fn default_violation(
    kb: &KbSnapshot,
    rule: &DefaultRule,
    candidate: &Predicate,
) -> Option<(Predicate, Predicate)> {
    let positive = candidate.positive();
    let conclusion = rule.conclusion();
    let target = conclusion.positive();
    if positive.name() != target.name() || positive.arity() != target.arity() {
        return None;
    }

    // Negation only renames, so argument positions line up.
    let mut bound = Substitution::new();
    for (pattern, value) in conclusion.terms().iter().zip(positive.terms()) {
        if let Term::Variable(var) = pattern {
            bound = unify_variable(var, value, &bound)?;
        }
    }

    let pattern = bound.apply(rule.premise());
    let (premise, bound) = kb.fact_predicates().find_map(|fact| {
        unify_predicates(&pattern, fact, &bound)
            .filter(|_| !kb.is_excepted(rule, fact))
            .map(|s| (fact.clone(), s))
    })?;

    let expected = bound.apply(conclusion);
    if !expected.is_ground() || &expected == candidate {
        return None;
    }
    Some((premise, expected))
}

/// Checks one candidate: a direct contradiction first, then every default
/// rule it violates.
#[must_use]
pub fn detect(kb: &KbSnapshot, candidate: &Predicate, certainty: Certainty) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    let negation = candidate.negated();
    if let Some(existing) = kb.facts.iter().find(|f| f.predicate == negation) {
        conflicts.push(Conflict::new(
            candidate.clone(),
            certainty,
            ConflictKind::DirectContradiction {
                existing: existing.predicate.clone(),
                existing_certainty: existing.certainty(),
            },
        ));
    }

    for rule in &kb.default_rules {
        if let Some((premise, expected)) = default_violation(kb, rule, candidate) {
            conflicts.push(Conflict::new(
                candidate.clone(),
                certainty,
                ConflictKind::DefaultViolation {
                    rule: rule.clone(),
                    premise,
                    expected,
                },
            ));
        }
    }
    conflicts
}

/// Checks every stored fact. Each contradictory pair is reported once, with
/// the positive fact as candidate. All contradictions precede all default
/// violations.
#[must_use]
pub fn detect_all(kb: &KbSnapshot) -> Vec<Conflict> {
    let mut contradictions = Vec::new();
    let mut violations = Vec::new();
    for fact in &kb.facts {
        for conflict in detect(kb, &fact.predicate, fact.certainty()) {
            if !conflict.is_contradiction() {
                violations.push(conflict);
            } else if !fact.predicate.is_negated() {
                contradictions.push(conflict);
            }
        }
    }
    contradictions.extend(violations);
    contradictions
}
