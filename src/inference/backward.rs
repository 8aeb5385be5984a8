//! Backward chaining: goal-directed, depth-first proof search.
//!
//! The search runs over a [`KbSnapshot`], never the live knowledge base, and
//! is bounded by a depth limit and a unification step budget. A branch that
//! hits either bound reports `Exhausted` instead of recursing forever on a
//! cyclic rule set.

use std::collections::BTreeSet;

use crate::inference::standardize::VariableRenamer;
use crate::inference::EngineConfig;
use crate::knowledge_base::KbSnapshot;
use crate::rule::HAPPENS_AT;
use crate::substitution::Substitution;
use crate::term::Predicate;
use crate::unify::unify_predicates;

/// Result of one search branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Search {
    /// Proved under the returned substitution.
    Proved(Substitution),
    /// Every alternative was tried and none proved the goal.
    Failed,
    /// The search budget ran out before a proof was found.
    Exhausted,
}

/// Every proof of a goal found within budget.
#[derive(Debug, Clone, Default)]
pub(crate) struct Solutions {
    /// One substitution per proof, in search order.
    pub(crate) found: Vec<Substitution>,
    /// True if some branch ran out of budget.
    pub(crate) cut_off: bool,
}

/// Depth and step limits for a single query.
#[derive(Debug, Clone)]
pub(crate) struct Budget {
    max_depth: usize,
    max_steps: usize,
    steps: usize,
}

impl Budget {
    pub(crate) const fn new(config: &EngineConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            max_steps: config.max_steps,
            steps: 0,
        }
    }

    /// Consumes one unification step. False once the budget is spent.
    fn tick(&mut self) -> bool {
        if self.steps >= self.max_steps {
            return false;
        }
        self.steps += 1;
        true
    }

    pub(crate) const fn steps(&self) -> usize {
        self.steps
    }
}

/// State of one query's proof search.
pub(crate) struct ProofSearch<'a> {
    pub(crate) kb: &'a KbSnapshot,
    pub(crate) renamer: &'a VariableRenamer,
    pub(crate) budget: Budget,
    pub(crate) derived: BTreeSet<Predicate>,
}

impl<'a> ProofSearch<'a> {
    pub(crate) fn new(kb: &'a KbSnapshot, renamer: &'a VariableRenamer, config: &EngineConfig) -> Self {
        Self {
            kb,
            renamer,
            budget: Budget::new(config),
            derived: BTreeSet::new(),
        }
    }

    /// Full backward step: stored facts first, then rules.
    pub(crate) fn ask(&mut self, query: &Predicate, subst: &Substitution, depth: usize) -> Search {
        match self.match_facts(query, subst) {
            Search::Failed => self.chain_rules(query, subst, depth),
            found => found,
        }
    }

    /// Stored facts a query can match: `HappensAt` goals search the temporal
    /// sequence.
    fn candidates(&self, query: &Predicate) -> Box<dyn Iterator<Item = &'a Predicate> + 'a> {
        let kb = self.kb;
        if query.name() == HAPPENS_AT {
            Box::new(kb.temporal_facts.iter())
        } else {
            Box::new(kb.fact_predicates())
        }
    }

    /// Tries to unify the query with a stored fact.
    pub(crate) fn match_facts(&mut self, query: &Predicate, subst: &Substitution) -> Search {
        for fact in self.candidates(query) {
            if !self.budget.tick() {
                return Search::Exhausted;
            }
            if let Some(s) = unify_predicates(fact, query, subst) {
                return Search::Proved(s);
            }
        }
        Search::Failed
    }

    /// Tries every standard rule whose conclusion unifies with the query,
    /// proving its premise recursively.
    pub(crate) fn chain_rules(&mut self, query: &Predicate, subst: &Substitution, depth: usize) -> Search {
        if depth >= self.budget.max_depth {
            tracing::debug!(goal = %query, depth, "backward: depth limit reached");
            return Search::Exhausted;
        }
        let kb = self.kb;
        let mut cut_off = false;
        for original in &kb.rules {
            if !self.budget.tick() {
                return Search::Exhausted;
            }
            let rule = self.renamer.standardize_rule(original);
            let Some(bound) = unify_predicates(rule.conclusion(), query, subst) else {
                continue;
            };
            let premise = bound.apply(rule.premise());
            match self.ask(&premise, &bound, depth + 1) {
                Search::Proved(proof) => {
                    tracing::trace!(goal = %query, rule = %original, "backward: rule fired");
                    self.record(proof.apply(query));
                    return Search::Proved(proof);
                }
                Search::Exhausted => cut_off = true,
                Search::Failed => {}
            }
        }
        if cut_off {
            Search::Exhausted
        } else {
            Search::Failed
        }
    }

    /// Enumerates every proof of the query: each matching fact, then each
    /// proof of each applicable rule's premise.
    pub(crate) fn solve(&mut self, query: &Predicate, subst: &Substitution, depth: usize) -> Solutions {
        let mut out = Solutions::default();
        self.collect(query, subst, depth, &mut out);
        out
    }

    fn collect(&mut self, query: &Predicate, subst: &Substitution, depth: usize, out: &mut Solutions) {
        for fact in self.candidates(query) {
            if !self.budget.tick() {
                out.cut_off = true;
                return;
            }
            if let Some(s) = unify_predicates(fact, query, subst) {
                out.found.push(s);
            }
        }
        if depth >= self.budget.max_depth {
            out.cut_off = true;
            return;
        }
        let kb = self.kb;
        for original in &kb.rules {
            if !self.budget.tick() {
                out.cut_off = true;
                return;
            }
            let rule = self.renamer.standardize_rule(original);
            let Some(bound) = unify_predicates(rule.conclusion(), query, subst) else {
                continue;
            };
            let premise = bound.apply(rule.premise());
            let inner = self.solve(&premise, &bound, depth + 1);
            out.cut_off |= inner.cut_off;
            for proof in inner.found {
                self.record(proof.apply(query));
                out.found.push(proof);
            }
        }
    }

    pub(crate) fn record(&mut self, fact: Predicate) {
        if fact.is_ground() {
            self.derived.insert(fact);
        }
    }
}
