//! The in-process reasoning API.
//!
//! A [`Reasoner`] owns one knowledge base and wires the inference engine and
//! conflict resolver to it. Text entry points use the convention in
//! [`crate::parse`].

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::certainty::{Annotation, Certainty};
use crate::conflict::{
    CheckedAssertion, ConflictResolver, ConsistencyReport, CorrectionReport, FactValidation,
    ResolutionRecord, ResolverConfig, ResolverStatus, SweepReport,
};
use crate::error::LogicResult;
use crate::inference::{EngineConfig, InferenceEngine, QueryAnswer, Saturation};
use crate::knowledge_base::{KnowledgeBase, Statistics};
use crate::parse::{parse_default_rule, parse_predicate, parse_query, parse_rule};
use crate::rule::{DefaultRule, Query, Rule};
use crate::runtime::{QueryRuntime, RuntimeConfig};
use crate::term::Predicate;

/// Settings for every component of a [`Reasoner`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReasonerConfig {
    /// Search limits.
    pub engine: EngineConfig,
    /// Conflict resolution settings.
    pub resolver: ResolverConfig,
}

/// What a line of text told the reasoner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Told {
    /// A fact; true if it was new.
    Fact(bool),
    /// A standard rule.
    Rule,
    /// A default rule.
    DefaultRule,
}

/// Knowledge base, inference engine and conflict resolver in one place.
///
/// # Examples
///
/// ```
/// use kyrologic::Reasoner;
///
/// let reasoner = Reasoner::new();
/// reasoner.tell("Human(Socrates)").unwrap();
/// reasoner.tell("Human(x) -> Mortal(x)").unwrap();
///
/// assert!(reasoner.ask("Mortal(Socrates)").unwrap().is_true());
/// assert!(!reasoner.ask("Mortal(Plato)").unwrap().is_true());
/// ```
#[derive(Debug)]
pub struct Reasoner {
    kb: Arc<KnowledgeBase>,
    engine: Arc<InferenceEngine>,
    resolver: ConflictResolver,
}

impl Default for Reasoner {
    fn default() -> Self {
        Self::new()
    }
}

impl Reasoner {
    /// Creates a reasoner over an empty knowledge base.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Arc::new(KnowledgeBase::new()), ReasonerConfig::default())
    }

    /// Creates a reasoner over an existing knowledge base.
    #[must_use]
    pub fn with_config(kb: Arc<KnowledgeBase>, config: ReasonerConfig) -> Self {
        let engine = Arc::new(InferenceEngine::with_config(Arc::clone(&kb), config.engine));
        let resolver = ConflictResolver::with_config(Arc::clone(&kb), config.resolver);
        Self { kb, engine, resolver }
    }

    /// The shared knowledge base.
    #[must_use]
    pub fn knowledge_base(&self) -> &Arc<KnowledgeBase> {
        &self.kb
    }

    /// The inference engine.
    #[must_use]
    pub fn engine(&self) -> &Arc<InferenceEngine> {
        &self.engine
    }

    /// The conflict resolver.
    #[must_use]
    pub const fn resolver(&self) -> &ConflictResolver {
        &self.resolver
    }

    /// Adds a ground fact. Returns true if it was new.
    ///
    /// # Errors
    ///
    /// Returns a validation error for non-ground or malformed temporal facts.
    pub fn add_fact(&self, fact: Predicate) -> LogicResult<bool> {
        self.kb.add_fact(fact)
    }

    /// Adds a ground fact with certainty and source.
    ///
    /// # Errors
    ///
    /// Returns a validation error for non-ground or malformed temporal facts.
    pub fn add_annotated_fact(&self, fact: Predicate, annotation: Annotation) -> LogicResult<bool> {
        self.kb.add_annotated_fact(fact, annotation)
    }

    /// Appends a standard rule.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the lock is poisoned.
    pub fn add_rule(&self, rule: Rule) -> LogicResult<()> {
        self.kb.add_rule(rule)
    }

    /// Appends a default rule.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the lock is poisoned.
    pub fn add_default_rule(&self, rule: DefaultRule) -> LogicResult<()> {
        self.kb.add_default_rule(rule)
    }

    /// Adds a fact, rule (`->`) or default rule (`~>`) written as text.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation error for malformed text.
    pub fn tell(&self, text: &str) -> LogicResult<Told> {
        if text.contains("~>") {
            self.add_default_rule(parse_default_rule(text)?)?;
            Ok(Told::DefaultRule)
        } else if text.contains("->") {
            self.add_rule(parse_rule(text)?)?;
            Ok(Told::Rule)
        } else {
            self.add_fact(parse_predicate(text)?).map(Told::Fact)
        }
    }

    /// Answers a goal or temporal query.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the lock is poisoned.
    pub fn query(&self, query: impl Into<Query>) -> LogicResult<QueryAnswer> {
        self.engine.query(&query.into())
    }

    /// Answers a query written as text.
    ///
    /// # Errors
    ///
    /// Returns a parse error for malformed text.
    pub fn ask(&self, text: &str) -> LogicResult<QueryAnswer> {
        self.engine.query(&parse_query(text)?)
    }

    /// Forward-chains to a fixpoint.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the lock is poisoned.
    pub fn saturate(&self) -> LogicResult<Saturation> {
        self.engine.saturate()
    }

    /// All ordinary facts.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the lock is poisoned.
    pub fn get_all_facts(&self) -> LogicResult<BTreeSet<Predicate>> {
        self.kb.facts()
    }

    /// Counts of facts, rules, default rules, derived facts and exceptions.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the lock is poisoned.
    pub fn get_statistics(&self) -> LogicResult<Statistics> {
        self.kb.statistics()
    }

    /// See [`ConflictResolver::check_consistency`].
    ///
    /// # Errors
    ///
    /// Returns an internal error if a lock is poisoned.
    pub fn check_consistency(&self, candidate: &Predicate, certainty: Certainty) -> LogicResult<ConsistencyReport> {
        self.resolver.check_consistency(candidate, certainty)
    }

    /// See [`ConflictResolver::resolve_conflict`].
    ///
    /// # Errors
    ///
    /// Returns an internal error if a lock is poisoned.
    pub fn resolve_conflict(&self, report: &ConsistencyReport) -> LogicResult<Option<ResolutionRecord>> {
        self.resolver.resolve_conflict(report)
    }

    /// See [`ConflictResolver::validate_new_fact`].
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed candidates.
    pub fn validate_new_fact(&self, candidate: &Predicate, certainty: Certainty) -> LogicResult<FactValidation> {
        self.resolver.validate_new_fact(candidate, certainty)
    }

    /// See [`ConflictResolver::assert_checked`].
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed candidates.
    pub fn assert_checked(&self, candidate: Predicate, annotation: Annotation) -> LogicResult<CheckedAssertion> {
        self.resolver.assert_checked(candidate, annotation)
    }

    /// See [`ConflictResolver::sweep`].
    ///
    /// # Errors
    ///
    /// Returns an internal error if a lock is poisoned.
    pub fn sweep(&self) -> LogicResult<SweepReport> {
        self.resolver.sweep()
    }

    /// See [`ConflictResolver::auto_correct`].
    ///
    /// # Errors
    ///
    /// Returns an internal error if a lock is poisoned.
    pub fn auto_correct(&self) -> LogicResult<CorrectionReport> {
        self.resolver.auto_correct()
    }

    /// See [`ConflictResolver::status`].
    ///
    /// # Errors
    ///
    /// Returns an internal error if a lock is poisoned.
    pub fn resolver_status(&self) -> LogicResult<ResolverStatus> {
        self.resolver.status()
    }

    /// Starts a worker-pool runtime sharing this reasoner's engine.
    ///
    /// # Errors
    ///
    /// Returns `WorkerSpawn` if a worker thread cannot be started.
    pub fn start_runtime(&self, config: RuntimeConfig) -> LogicResult<QueryRuntime> {
        QueryRuntime::new(Arc::clone(&self.engine), config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tell_dispatches_on_arrow() {
        let r = Reasoner::new();
        assert_eq!(r.tell("Bird(Tweety)").unwrap(), Told::Fact(true));
        assert_eq!(r.tell("Bird(Tweety)").unwrap(), Told::Fact(false));
        assert_eq!(r.tell("Penguin(x) -> Bird(x)").unwrap(), Told::Rule);
        assert_eq!(r.tell("Bird(x) ~> Flies(x)").unwrap(), Told::DefaultRule);
        let stats = r.get_statistics().unwrap();
        assert_eq!((stats.facts, stats.rules, stats.default_rules), (1, 1, 1));
    }

    #[test]
    fn tell_rejects_non_ground_fact() {
        let r = Reasoner::new();
        assert!(r.tell("Bird(x)").unwrap_err().is_validation());
    }

    #[test]
    fn ask_routes_temporal_text() {
        let r = Reasoner::new();
        r.tell("HappensAt(Login(UserA), 100)").unwrap();
        r.tell("HappensAt(Logout(UserA), 200)").unwrap();
        assert!(r.ask("Before(Login(UserA), Logout(UserA))").unwrap().is_true());
        assert!(!r.ask("After(Login(UserA), Logout(UserA))").unwrap().is_true());
    }
}
