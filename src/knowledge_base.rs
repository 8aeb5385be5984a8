//! Thread-safe in-memory knowledge base.
//!
//! Holds ground facts (a set), standard rules and default rules (ordered,
//! append-only), timestamped `HappensAt` facts (ordered, append-only),
//! facts derived by inference, and default-rule exceptions. No inference
//! logic lives here.
//!
//! All state sits behind a single `RwLock`. Readers receive cloned
//! snapshots, never live views; every mutation takes the write lock.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::certainty::{Annotation, Certainty};
use crate::error::{LogicError, LogicResult, ValidationError};
use crate::rule::{DefaultRule, Rule, HAPPENS_AT};
use crate::term::{Predicate, Term};

fn lock_err(context: &'static str) -> LogicError {
    LogicError::internal(format!("poisoned lock: {context}"))
}

/// Checks that a predicate may be stored as a fact.
///
/// # Errors
///
/// - `EmptyName` if the fact or any nested predicate has an empty name.
/// - `NonGroundFact` if any variable appears in the term tree.
/// - `MalformedTemporalFact` if a `HappensAt` fact is not
///   `HappensAt(<event predicate>, <integer constant>)`.
pub fn validate_fact(fact: &Predicate) -> Result<(), ValidationError> {
    if has_empty_name(fact) {
        return Err(ValidationError::EmptyName);
    }
    if !fact.is_ground() {
        return Err(ValidationError::NonGroundFact {
            fact: fact.to_string(),
        });
    }
    if fact.name() != HAPPENS_AT {
        return Ok(());
    }
    let malformed = |reason: &str| ValidationError::MalformedTemporalFact {
        fact: fact.to_string(),
        reason: reason.to_string(),
    };
    match fact.terms() {
        [Term::Predicate(_), Term::Constant(time)] => {
            if time.as_integer().is_none() {
                return Err(malformed("time must be an integer constant"));
            }
            Ok(())
        }
        [_, _] => Err(malformed("expected an event predicate and a time constant")),
        _ => Err(malformed("expected exactly two terms")),
    }
}

fn has_empty_name(predicate: &Predicate) -> bool {
    predicate.name().is_empty()
        || predicate.terms().iter().any(|term| match term {
            Term::Predicate(inner) => has_empty_name(inner),
            _ => false,
        })
}

/// A scoped exception to a default rule: the rule does not fire for the
/// excluded premise instance, and stays in force for everything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DefaultException {
    /// The default rule being scoped.
    pub rule: DefaultRule,

    /// Ground premise instance for which the rule no longer fires.
    pub excluded: Predicate,
}

impl fmt::Display for DefaultException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NOT {} for [{}]", self.excluded, self.rule)
    }
}

/// A stored fact together with its optional provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFact {
    /// The ground predicate.
    pub predicate: Predicate,

    /// Certainty and source, if the fact was asserted with them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Annotation>,
}

impl StoredFact {
    /// Certainty used when weighing this fact; unannotated facts are certain.
    #[must_use]
    pub fn certainty(&self) -> Certainty {
        self.annotation
            .as_ref()
            .map_or_else(Certainty::certain, |a| a.certainty)
    }
}

/// Counts of everything the knowledge base holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    /// Ordinary ground facts.
    pub facts: usize,
    /// `HappensAt` facts.
    pub temporal_facts: usize,
    /// Standard rules.
    pub rules: usize,
    /// Default rules.
    pub default_rules: usize,
    /// Facts recorded as derived by inference.
    pub derived_facts: usize,
    /// Default-rule exceptions.
    pub exceptions: usize,
}

/// Point-in-time copy of the knowledge base.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KbSnapshot {
    /// Ordinary facts in canonical order.
    pub facts: Vec<StoredFact>,
    /// `HappensAt` facts in insertion order.
    pub temporal_facts: Vec<Predicate>,
    /// Standard rules in insertion order.
    pub rules: Vec<Rule>,
    /// Default rules in insertion order.
    pub default_rules: Vec<DefaultRule>,
    /// Derived facts in canonical order.
    pub derived_facts: Vec<Predicate>,
    /// Default-rule exceptions in insertion order.
    pub exceptions: Vec<DefaultException>,
}

impl KbSnapshot {
    /// Iterates the ordinary fact predicates.
    pub fn fact_predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.facts.iter().map(|f| &f.predicate)
    }

    /// Returns true if the default rule has an exception for this instance.
    #[must_use]
    pub fn is_excepted(&self, rule: &DefaultRule, instance: &Predicate) -> bool {
        self.exceptions
            .iter()
            .any(|e| &e.rule == rule && &e.excluded == instance)
    }
}

#[derive(Debug, Default)]
pub(crate) struct KbState {
    pub(crate) facts: BTreeMap<Predicate, Option<Annotation>>,
    pub(crate) temporal: Vec<Predicate>,
    pub(crate) rules: Vec<Rule>,
    pub(crate) default_rules: Vec<DefaultRule>,
    pub(crate) derived: BTreeSet<Predicate>,
    pub(crate) exceptions: Vec<DefaultException>,
}

impl KbState {
    /// Inserts an already validated fact. Returns true if it was new.
    pub(crate) fn insert_fact(&mut self, fact: Predicate, annotation: Option<Annotation>) -> bool {
        if fact.name() == HAPPENS_AT {
            if self.temporal.contains(&fact) {
                return false;
            }
            self.temporal.push(fact);
            return true;
        }
        match self.facts.get_mut(&fact) {
            Some(existing) => {
                if annotation.is_some() {
                    *existing = annotation;
                }
                false
            }
            None => {
                self.facts.insert(fact, annotation);
                true
            }
        }
    }

    pub(crate) fn contains_fact(&self, fact: &Predicate) -> bool {
        if fact.name() == HAPPENS_AT {
            self.temporal.contains(fact)
        } else {
            self.facts.contains_key(fact)
        }
    }

    pub(crate) fn remove_fact(&mut self, fact: &Predicate) -> bool {
        let removed = if fact.name() == HAPPENS_AT {
            let before = self.temporal.len();
            self.temporal.retain(|f| f != fact);
            before != self.temporal.len()
        } else {
            self.facts.remove(fact).is_some()
        };
        self.derived.remove(fact);
        removed
    }

    pub(crate) fn snapshot(&self) -> KbSnapshot {
        KbSnapshot {
            facts: self
                .facts
                .iter()
                .map(|(p, a)| StoredFact {
                    predicate: p.clone(),
                    annotation: a.clone(),
                })
                .collect(),
            temporal_facts: self.temporal.clone(),
            rules: self.rules.clone(),
            default_rules: self.default_rules.clone(),
            derived_facts: self.derived.iter().cloned().collect(),
            exceptions: self.exceptions.clone(),
        }
    }
}

/// The knowledge base shared by the inference engine and conflict resolver.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    state: RwLock<KbState>,
}

impl KnowledgeBase {
    /// Creates an empty knowledge base.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a knowledge base from a snapshot, revalidating every fact.
    ///
    /// # Errors
    ///
    /// Returns a validation error if any fact in the snapshot is malformed.
    pub fn from_snapshot(snapshot: KbSnapshot) -> LogicResult<Self> {
        let kb = Self::new();
        kb.write("kb.from_snapshot", |state| -> LogicResult<()> {
            for fact in snapshot.facts {
                validate_fact(&fact.predicate)?;
                state.insert_fact(fact.predicate, fact.annotation);
            }
            for fact in snapshot.temporal_facts {
                validate_fact(&fact)?;
                state.insert_fact(fact, None);
            }
            for fact in snapshot.derived_facts {
                validate_fact(&fact)?;
                state.derived.insert(fact);
            }
            state.rules = snapshot.rules;
            state.default_rules = snapshot.default_rules;
            state.exceptions = snapshot.exceptions;
            Ok(())
        })??;
        Ok(kb)
    }

    pub(crate) fn read<R>(&self, context: &'static str, f: impl FnOnce(&KbState) -> R) -> LogicResult<R> {
        let state = self.state.read().map_err(|_| lock_err(context))?;
        Ok(f(&state))
    }

    pub(crate) fn write<R>(&self, context: &'static str, f: impl FnOnce(&mut KbState) -> R) -> LogicResult<R> {
        let mut state = self.state.write().map_err(|_| lock_err(context))?;
        Ok(f(&mut state))
    }

    /// Adds a ground fact. `HappensAt` facts go to the temporal sequence.
    ///
    /// Re-adding an identical fact is a no-op. Returns true if it was new.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty names, non-ground facts or
    /// malformed temporal facts.
    pub fn add_fact(&self, fact: Predicate) -> LogicResult<bool> {
        validate_fact(&fact)?;
        let rendered = fact.to_string();
        let inserted = self.write("kb.add_fact", |state| state.insert_fact(fact, None))?;
        tracing::debug!(fact = %rendered, inserted, "kb: fact stored");
        Ok(inserted)
    }

    /// Adds a ground fact with provenance, updating the annotation if the
    /// fact already exists. Returns true if the fact was new.
    ///
    /// `HappensAt` facts go to the temporal sequence, which stores no
    /// annotations: the fact is kept and the annotation is discarded.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty names, non-ground facts or
    /// malformed temporal facts.
    pub fn add_annotated_fact(&self, fact: Predicate, annotation: Annotation) -> LogicResult<bool> {
        validate_fact(&fact)?;
        let rendered = fact.to_string();
        let certainty = annotation.certainty;
        if fact.name() == HAPPENS_AT {
            tracing::debug!(fact = %rendered, "kb: temporal fact stored without annotation");
        }
        let inserted = self.write("kb.add_annotated_fact", |state| {
            state.insert_fact(fact, Some(annotation))
        })?;
        tracing::debug!(fact = %rendered, certainty = %certainty, inserted, "kb: annotated fact stored");
        Ok(inserted)
    }

    /// Appends a standard rule.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the lock is poisoned.
    pub fn add_rule(&self, rule: Rule) -> LogicResult<()> {
        tracing::debug!(rule = %rule, "kb: rule stored");
        self.write("kb.add_rule", |state| state.rules.push(rule))
    }

    /// Appends a default rule.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the lock is poisoned.
    pub fn add_default_rule(&self, rule: DefaultRule) -> LogicResult<()> {
        tracing::debug!(rule = %rule, "kb: default rule stored");
        self.write("kb.add_default_rule", |state| state.default_rules.push(rule))
    }

    /// Records an exception to a default rule. Returns true if it was new.
    ///
    /// # Errors
    ///
    /// Returns `NonGroundFact` if the excluded instance is not ground.
    pub fn add_exception(&self, exception: DefaultException) -> LogicResult<bool> {
        if !exception.excluded.is_ground() {
            return Err(ValidationError::NonGroundFact {
                fact: exception.excluded.to_string(),
            }
            .into());
        }
        let rendered = exception.to_string();
        let inserted = self.write("kb.add_exception", |state| {
            if state.exceptions.contains(&exception) {
                false
            } else {
                state.exceptions.push(exception);
                true
            }
        })?;
        tracing::debug!(exception = %rendered, inserted, "kb: exception stored");
        Ok(inserted)
    }

    /// Removes a fact (ordinary or temporal) and any derived copy of it.
    /// Returns true if the fact was stored.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the lock is poisoned.
    pub fn retract_fact(&self, fact: &Predicate) -> LogicResult<bool> {
        let removed = self.write("kb.retract_fact", |state| state.remove_fact(fact))?;
        tracing::debug!(fact = %fact, removed, "kb: fact retracted");
        Ok(removed)
    }

    /// Records facts as derived. Non-ground predicates are ignored.
    /// Returns how many were new.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the lock is poisoned.
    pub fn record_derived<I>(&self, facts: I) -> LogicResult<usize>
    where
        I: IntoIterator<Item = Predicate>,
    {
        self.write("kb.record_derived", |state| {
            facts
                .into_iter()
                .filter(Predicate::is_ground)
                .filter(|f| state.derived.insert(f.clone()))
                .count()
        })
    }

    /// Returns true if the fact is stored (ordinary or temporal).
    ///
    /// # Errors
    ///
    /// Returns an internal error if the lock is poisoned.
    pub fn contains_fact(&self, fact: &Predicate) -> LogicResult<bool> {
        self.read("kb.contains_fact", |state| state.contains_fact(fact))
    }

    /// Returns the annotation of a stored fact, if it has one.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the lock is poisoned.
    pub fn annotation(&self, fact: &Predicate) -> LogicResult<Option<Annotation>> {
        self.read("kb.annotation", |state| state.facts.get(fact).cloned().flatten())
    }

    /// Copy of all ordinary facts.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the lock is poisoned.
    pub fn facts(&self) -> LogicResult<BTreeSet<Predicate>> {
        self.read("kb.facts", |state| state.facts.keys().cloned().collect())
    }

    /// Copy of all `HappensAt` facts in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the lock is poisoned.
    pub fn temporal_facts(&self) -> LogicResult<Vec<Predicate>> {
        self.read("kb.temporal_facts", |state| state.temporal.clone())
    }

    /// Copy of the standard rules.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the lock is poisoned.
    pub fn rules(&self) -> LogicResult<Vec<Rule>> {
        self.read("kb.rules", |state| state.rules.clone())
    }

    /// Copy of the default rules.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the lock is poisoned.
    pub fn default_rules(&self) -> LogicResult<Vec<DefaultRule>> {
        self.read("kb.default_rules", |state| state.default_rules.clone())
    }

    /// Copy of the derived facts.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the lock is poisoned.
    pub fn derived_facts(&self) -> LogicResult<BTreeSet<Predicate>> {
        self.read("kb.derived_facts", |state| state.derived.clone())
    }

    /// Copy of the default-rule exceptions.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the lock is poisoned.
    pub fn exceptions(&self) -> LogicResult<Vec<DefaultException>> {
        self.read("kb.exceptions", |state| state.exceptions.clone())
    }

    /// Consistent copy of everything.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the lock is poisoned.
    pub fn snapshot(&self) -> LogicResult<KbSnapshot> {
        self.read("kb.snapshot", KbState::snapshot)
    }

    /// Current counts.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the lock is poisoned.
    pub fn statistics(&self) -> LogicResult<Statistics> {
        self.read("kb.statistics", |state| Statistics {
            facts: state.facts.len(),
            temporal_facts: state.temporal.len(),
            rules: state.rules.len(),
            default_rules: state.default_rules.len(),
            derived_facts: state.derived.len(),
            exceptions: state.exceptions.len(),
        })
    }
}
