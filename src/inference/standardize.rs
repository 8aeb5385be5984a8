//! Standardizing variables apart.
//!
//! Every rule application renames the rule's variables to fresh names so two
//! uses of the same rule (sibling branches, or a rule recursing into itself)
//! never share bindings. Fresh names are `<name>#<generation>`; `#` cannot
//! appear in a parsed identifier, so they never collide with user variables.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::rule::{DefaultRule, Rule};
use crate::substitution::Substitution;
use crate::term::{Predicate, Term, Variable};

/// Allocates rule-renaming generations from an atomic counter.
///
/// Each engine owns its own renamer, so independent engines never interfere
/// and concurrent proofs on one engine never draw the same generation.
#[derive(Debug, Default)]
pub struct VariableRenamer {
    counter: AtomicU64,
}

impl VariableRenamer {
    /// Creates a renamer starting at generation 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of generations handed out so far.
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }

    fn next_generation(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn renaming<'a>(&self, predicates: impl IntoIterator<Item = &'a Predicate>) -> Substitution {
        let generation = self.next_generation();
        let mut renaming = Substitution::new();
        for p in predicates {
            for var in p.variables() {
                if renaming.contains(&var) {
                    continue;
                }
                let fresh = Variable::new(format!("{}#{generation}", var.name()));
                renaming = renaming.bind(var, Term::Variable(fresh));
            }
        }
        renaming
    }

    /// Returns a copy of the rule with every variable renamed apart.
    #[must_use]
    pub fn standardize_rule(&self, rule: &Rule) -> Rule {
        let renaming = self.renaming([rule.premise(), rule.conclusion()]);
        Rule::new(renaming.apply(rule.premise()), renaming.apply(rule.conclusion()))
    }

    /// Returns a copy of the default rule with every variable renamed apart.
    #[must_use]
    pub fn standardize_default(&self, rule: &DefaultRule) -> DefaultRule {
        let renaming = self.renaming([rule.premise(), rule.conclusion()]);
        rule.with_parts(renaming.apply(rule.premise()), renaming.apply(rule.conclusion()))
    }
}
