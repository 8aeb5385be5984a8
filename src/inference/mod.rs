//! Inference over a shared knowledge base.
//!
//! Queries run in this order: stored facts, standard rules (backward
//! chaining), then default rules with negation as failure. Temporal ordering
//! queries are answered from `HappensAt` facts only. Saturation (forward
//! chaining) is a separate, explicit operation.
//!
//! Every query runs on a snapshot taken when it starts, under an explicit
//! depth and step budget. A search that runs out of budget reports
//! [`ProofOutcome::Exhausted`] rather than looping.

mod backward;
mod defaults;
mod forward;
mod standardize;
mod temporal;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::LogicResult;
use crate::knowledge_base::KnowledgeBase;
use crate::rule::{Query, TemporalQuery};
use crate::substitution::Substitution;
use crate::term::{Predicate, Term};

use backward::{ProofSearch, Search};

pub use forward::Saturation;
pub use standardize::VariableRenamer;
pub use temporal::timestamp_of;

/// Search limits for the inference engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum rule-chaining depth for one query.
    pub max_depth: usize,

    /// Maximum unification attempts for one query.
    pub max_steps: usize,

    /// Maximum passes for one saturation run.
    pub max_saturation_passes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_steps: 10_000,
            max_saturation_passes: 256,
        }
    }
}

/// Three-valued result of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofOutcome {
    /// The goal holds.
    Proved,
    /// Every alternative failed; under the closed world the goal is false.
    NotProved,
    /// The search budget ran out before a proof was found.
    Exhausted,
}

impl ProofOutcome {
    fn from_search(search: &Search) -> Self {
        match search {
            Search::Proved(_) => Self::Proved,
            Search::Failed => Self::NotProved,
            Search::Exhausted => Self::Exhausted,
        }
    }
}

impl fmt::Display for ProofOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Proved => "proved",
            Self::NotProved => "not_proved",
            Self::Exhausted => "exhausted",
        };
        f.write_str(s)
    }
}

/// Which mechanism answered a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reasoning {
    /// Matched a stored fact.
    Fact,
    /// Proved through standard rules.
    Rule,
    /// Concluded by a default rule.
    Default,
    /// Decided from event timestamps.
    Temporal,
    /// Nothing proved the query.
    None,
}

/// Answer to a single query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryAnswer {
    /// Whether the query holds.
    pub outcome: ProofOutcome,

    /// How the outcome was reached.
    pub reasoning: Reasoning,

    /// Bindings for the query's own variables when proved.
    pub bindings: Substitution,

    /// Ground facts derived while answering.
    pub derived: BTreeSet<Predicate>,

    /// Unification steps spent.
    pub steps: usize,
}

impl QueryAnswer {
    /// Returns true if the query was proved.
    #[must_use]
    pub fn is_true(&self) -> bool {
        self.outcome == ProofOutcome::Proved
    }

    fn temporal(holds: bool) -> Self {
        Self {
            outcome: if holds {
                ProofOutcome::Proved
            } else {
                ProofOutcome::NotProved
            },
            reasoning: if holds { Reasoning::Temporal } else { Reasoning::None },
            bindings: Substitution::new(),
            derived: BTreeSet::new(),
            steps: 0,
        }
    }
}

/// Restricts a proof substitution to the goal's variables, fully resolved.
fn answer_bindings(goal: &Predicate, proof: &Substitution) -> Substitution {
    goal.variables().into_iter().fold(Substitution::new(), |acc, var| {
        let value = proof.apply_term(&Term::Variable(var.clone()));
        acc.bind(var, value)
    })
}

/// Backward, default, temporal and forward reasoning over one knowledge base.
///
/// Cheap to share behind an `Arc`: queries take snapshots and the renamer is
/// atomic, so concurrent queries never block each other.
#[derive(Debug)]
pub struct InferenceEngine {
    kb: Arc<KnowledgeBase>,
    config: EngineConfig,
    renamer: VariableRenamer,
}

impl InferenceEngine {
    /// Creates an engine with default limits.
    #[must_use]
    pub fn new(kb: Arc<KnowledgeBase>) -> Self {
        Self::with_config(kb, EngineConfig::default())
    }

    /// Creates an engine with explicit limits.
    #[must_use]
    pub fn with_config(kb: Arc<KnowledgeBase>, config: EngineConfig) -> Self {
        Self {
            kb,
            config,
            renamer: VariableRenamer::new(),
        }
    }

    /// The knowledge base this engine reasons over.
    #[must_use]
    pub fn knowledge_base(&self) -> &Arc<KnowledgeBase> {
        &self.kb
    }

    /// The engine's limits.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Proves a goal by facts, then rules, then default rules.
    ///
    /// Ground facts proven along the way are recorded as derived in the
    /// knowledge base.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the knowledge base lock is poisoned.
    pub fn prove(&self, goal: &Predicate) -> LogicResult<QueryAnswer> {
        self.run(goal, true)
    }

    /// Proves a goal by facts and standard rules only.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the knowledge base lock is poisoned.
    pub fn prove_monotonic(&self, goal: &Predicate) -> LogicResult<QueryAnswer> {
        self.run(goal, false)
    }

    fn run(&self, goal: &Predicate, use_defaults: bool) -> LogicResult<QueryAnswer> {
        let snapshot = self.kb.snapshot()?;
        let mut search = ProofSearch::new(&snapshot, &self.renamer, &self.config);
        let empty = Substitution::new();

        let mut reasoning = Reasoning::Fact;
        let mut result = search.match_facts(goal, &empty);
        if result == Search::Failed {
            reasoning = Reasoning::Rule;
            result = search.chain_rules(goal, &empty, 0);
        }
        if use_defaults && !matches!(result, Search::Proved(_)) {
            let cut_off = result == Search::Exhausted;
            reasoning = Reasoning::Default;
            result = match search.ask_default(goal) {
                Search::Failed if cut_off => Search::Exhausted,
                other => other,
            };
        }

        let outcome = ProofOutcome::from_search(&result);
        let bindings = match &result {
            Search::Proved(proof) => answer_bindings(goal, proof),
            _ => {
                reasoning = Reasoning::None;
                Substitution::new()
            }
        };
        let steps = search.budget.steps();
        let derived = search.derived;
        self.kb.record_derived(derived.iter().cloned())?;

        match outcome {
            ProofOutcome::Exhausted => {
                tracing::warn!(goal = %goal, steps, "inference: search budget exhausted");
            }
            _ => {
                tracing::info!(goal = %goal, %outcome, ?reasoning, steps, "inference: query answered");
            }
        }
        Ok(QueryAnswer {
            outcome,
            reasoning,
            bindings,
            derived,
            steps,
        })
    }

    /// Decides an ordering between two timestamped events.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the knowledge base lock is poisoned.
    pub fn temporal_query(&self, query: &TemporalQuery) -> LogicResult<QueryAnswer> {
        let snapshot = self.kb.snapshot()?;
        let holds = temporal::evaluate(&snapshot, query);
        tracing::info!(query = %query, holds, "inference: temporal query answered");
        Ok(QueryAnswer::temporal(holds))
    }

    /// Answers any query shape.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the knowledge base lock is poisoned.
    pub fn query(&self, query: &Query) -> LogicResult<QueryAnswer> {
        match query {
            Query::Goal { goal } => self.prove(goal),
            Query::Temporal { query } => self.temporal_query(query),
        }
    }

    /// Applies standard rules to the stored facts until nothing new follows,
    /// merging the results into the knowledge base.
    ///
    /// The write lock is held for the whole run.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the knowledge base lock is poisoned.
    pub fn saturate(&self) -> LogicResult<Saturation> {
        let max_passes = self.config.max_saturation_passes;
        let result = self
            .kb
            .write("inference.saturate", |state| forward::saturate(state, max_passes))?;
        tracing::info!(
            derived = result.derived.len(),
            passes = result.passes,
            fixpoint = result.reached_fixpoint,
            "inference: saturation finished"
        );
        Ok(result)
    }
}
