//! Certainty-weighted conflict resolver.
//!
//! Entry points:
//! - [`ConflictResolver::validate_new_fact`] / [`ConflictResolver::assert_checked`]:
//!   the pre-insertion gate.
//! - [`ConflictResolver::sweep`] / [`ConflictResolver::auto_correct`]: the
//!   periodic audit over stored facts.
//!
//! Every applied resolution is appended to an audit history.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::certainty::{Annotation, Certainty};
use crate::conflict::detector::{detect, detect_all};
use crate::conflict::policy::{plan, ResolverConfig};
use crate::conflict::types::{
    CheckedAssertion, Conflict, ConsistencyReport, CorrectionReport, FactValidation,
    ResolutionAction, ResolutionId, ResolutionRecord, ResolutionStrategy, ResolverStatus,
    SweepReport,
};
use crate::error::{LogicError, LogicResult};
use crate::knowledge_base::{validate_fact, KbState, KnowledgeBase};
use crate::term::Predicate;

fn lock_err(context: &'static str) -> LogicError {
    LogicError::internal(format!("poisoned lock: {context}"))
}

/// Applies a strategy to the locked state. Returns one line per change.
fn apply(state: &mut KbState, strategy: &ResolutionStrategy) -> Vec<String> {
    let mut applied = Vec::new();
    for action in &strategy.actions {
        match action {
            ResolutionAction::RetractFact { fact } => {
                if state.remove_fact(fact) {
                    applied.push(format!("retracted {fact}"));
                }
            }
            ResolutionAction::RejectCandidate { fact } => {
                if state.remove_fact(fact) {
                    applied.push(format!("retracted {fact}"));
                }
            }
            ResolutionAction::ManualReview { conflict, facts } => {
                tracing::warn!(%conflict, facts = facts.len(), "conflict: flagged for manual review");
            }
            ResolutionAction::AddException { exception } => {
                if !state.exceptions.contains(exception) {
                    applied.push(format!("added exception {exception}"));
                    state.exceptions.push(exception.clone());
                }
            }
        }
    }
    applied
}

/// Detects and resolves conflicts against a shared knowledge base.
#[derive(Debug)]
pub struct ConflictResolver {
    kb: Arc<KnowledgeBase>,
    config: ResolverConfig,
    history: RwLock<Vec<ResolutionRecord>>,
    last_sweep: RwLock<Option<DateTime<Utc>>>,
}

impl ConflictResolver {
    /// Creates a resolver with default settings.
    #[must_use]
    pub fn new(kb: Arc<KnowledgeBase>) -> Self {
        Self::with_config(kb, ResolverConfig::default())
    }

    /// Creates a resolver with explicit settings.
    #[must_use]
    pub fn with_config(kb: Arc<KnowledgeBase>, config: ResolverConfig) -> Self {
        Self {
            kb,
            config,
            history: RwLock::new(Vec::new()),
            last_sweep: RwLock::new(None),
        }
    }

    /// The resolver's settings.
    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Reports every conflict the candidate would create and how they would
    /// be resolved. Nothing is changed.
    ///
    /// # Errors
    ///
    /// Returns an internal error if a lock is poisoned.
    pub fn check_consistency(&self, candidate: &Predicate, certainty: Certainty) -> LogicResult<ConsistencyReport> {
        let snapshot = self.kb.snapshot()?;
        let conflicts = detect(&snapshot, candidate, certainty);
        if !conflicts.is_empty() {
            tracing::warn!(candidate = %candidate, conflicts = conflicts.len(), "conflict: candidate is inconsistent");
        }
        let strategy = plan(&conflicts);
        Ok(ConsistencyReport {
            candidate: candidate.clone(),
            certainty,
            conflicts,
            strategy,
        })
    }

    /// Applies a report's strategy and records it. Returns `None` when the
    /// report has no conflicts.
    ///
    /// # Errors
    ///
    /// Returns an internal error if a lock is poisoned.
    pub fn resolve_conflict(&self, report: &ConsistencyReport) -> LogicResult<Option<ResolutionRecord>> {
        if !report.has_conflicts() {
            return Ok(None);
        }
        let applied = self
            .kb
            .write("resolver.resolve_conflict", |state| apply(state, &report.strategy))?;
        self.record(report.conflicts.clone(), report.strategy.clone(), applied)
            .map(Some)
    }

    /// Checks a candidate before insertion.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a non-ground or malformed candidate,
    /// or an internal error if a lock is poisoned.
    pub fn validate_new_fact(&self, candidate: &Predicate, certainty: Certainty) -> LogicResult<FactValidation> {
        validate_fact(candidate)?;
        if let Some(rejected) = self.below_threshold(certainty) {
            tracing::warn!(candidate = %candidate, %certainty, "conflict: certainty below threshold");
            return Ok(rejected);
        }
        let report = self.check_consistency(candidate, certainty)?;
        if report.has_conflicts() {
            Ok(FactValidation::Conflicting { report })
        } else {
            tracing::debug!(candidate = %candidate, "conflict: candidate is consistent");
            Ok(FactValidation::Consistent)
        }
    }

    /// Gated insertion: resolves any conflicts the candidate creates, then
    /// stores it unless the resolution rejected it. Detection, resolution
    /// and insertion happen under one write lock.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a non-ground or malformed candidate,
    /// or an internal error if a lock is poisoned.
    pub fn assert_checked(&self, candidate: Predicate, annotation: Annotation) -> LogicResult<CheckedAssertion> {
        validate_fact(&candidate)?;
        let certainty = annotation.certainty;
        if let Some(validation) = self.below_threshold(certainty) {
            return Ok(CheckedAssertion {
                inserted: false,
                validation,
                resolution: None,
            });
        }

        let (conflicts, strategy, applied, inserted) = self.kb.write("resolver.assert_checked", |state| {
            let snapshot = state.snapshot();
            let conflicts = detect(&snapshot, &candidate, certainty);
            let strategy = plan(&conflicts);
            let applied = apply(state, &strategy);
            let inserted = !strategy.rejects(&candidate) && state.insert_fact(candidate.clone(), Some(annotation));
            (conflicts, strategy, applied, inserted)
        })?;
        tracing::info!(candidate = %candidate, inserted, conflicts = conflicts.len(), "conflict: gated insertion");

        if conflicts.is_empty() {
            return Ok(CheckedAssertion {
                inserted,
                validation: FactValidation::Consistent,
                resolution: None,
            });
        }
        let report = ConsistencyReport {
            candidate,
            certainty,
            conflicts: conflicts.clone(),
            strategy: strategy.clone(),
        };
        let resolution = self.record(conflicts, strategy, applied)?;
        Ok(CheckedAssertion {
            inserted,
            validation: FactValidation::Conflicting { report },
            resolution: Some(resolution),
        })
    }

    /// Audits every stored fact without changing anything.
    ///
    /// # Errors
    ///
    /// Returns an internal error if a lock is poisoned.
    pub fn sweep(&self) -> LogicResult<SweepReport> {
        let snapshot = self.kb.snapshot()?;
        let report = SweepReport {
            checked_at: Utc::now(),
            facts_checked: snapshot.facts.len(),
            inconsistencies: detect_all(&snapshot),
        };
        self.mark_swept(report.checked_at)?;
        tracing::info!(
            facts = report.facts_checked,
            inconsistencies = report.inconsistencies.len(),
            "conflict: sweep finished"
        );
        Ok(report)
    }

    /// Sweeps and resolves everything found.
    ///
    /// Direct contradictions are resolved first. Default violations are then
    /// resolved only for facts that survived.
    ///
    /// # Errors
    ///
    /// Returns an internal error if a lock is poisoned.
    pub fn auto_correct(&self) -> LogicResult<CorrectionReport> {
        let (sweep, strategy, applied) = self.kb.write("resolver.auto_correct", |state| {
            let snapshot = state.snapshot();
            let sweep = SweepReport {
                checked_at: Utc::now(),
                facts_checked: snapshot.facts.len(),
                inconsistencies: detect_all(&snapshot),
            };
            let (contradictions, violations): (Vec<Conflict>, Vec<Conflict>) = sweep
                .inconsistencies
                .iter()
                .cloned()
                .partition(Conflict::is_contradiction);

            let mut strategy = plan(&contradictions);
            let mut applied = apply(state, &strategy);

            let surviving: Vec<Conflict> = violations
                .into_iter()
                .filter(|c| state.contains_fact(&c.candidate))
                .collect();
            let second = plan(&surviving);
            applied.extend(apply(state, &second));
            strategy.extend(second);
            (sweep, strategy, applied)
        })?;
        self.mark_swept(sweep.checked_at)?;

        if !sweep.has_inconsistencies() {
            tracing::info!(facts = sweep.facts_checked, "conflict: no corrections needed");
            return Ok(CorrectionReport {
                sweep,
                resolution: None,
            });
        }
        let record = self.record(sweep.inconsistencies.clone(), strategy, applied)?;
        tracing::info!(corrections = record.applied.len(), "conflict: auto-correction finished");
        Ok(CorrectionReport {
            sweep,
            resolution: Some(record),
        })
    }

    /// Copy of the resolution history, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an internal error if a lock is poisoned.
    pub fn resolution_history(&self) -> LogicResult<Vec<ResolutionRecord>> {
        let history = self.history.read().map_err(|_| lock_err("resolver.history"))?;
        Ok(history.clone())
    }

    /// Counts describing the resolver's state.
    ///
    /// # Errors
    ///
    /// Returns an internal error if a lock is poisoned.
    pub fn status(&self) -> LogicResult<ResolverStatus> {
        let stats = self.kb.statistics()?;
        let history = self.history.read().map_err(|_| lock_err("resolver.status"))?;
        let last_sweep = *self.last_sweep.read().map_err(|_| lock_err("resolver.status"))?;
        Ok(ResolverStatus {
            default_rules: stats.default_rules,
            exceptions: stats.exceptions,
            resolutions: history.len(),
            corrections: history.iter().map(|r| r.applied.len()).sum(),
            last_sweep,
        })
    }

    fn below_threshold(&self, certainty: Certainty) -> Option<FactValidation> {
        (certainty.value() < self.config.min_certainty).then(|| FactValidation::BelowThreshold {
            certainty,
            threshold: self.config.min_certainty,
        })
    }

    fn mark_swept(&self, at: DateTime<Utc>) -> LogicResult<()> {
        let mut last = self.last_sweep.write().map_err(|_| lock_err("resolver.last_sweep"))?;
        *last = Some(at);
        Ok(())
    }

    fn record(
        &self,
        conflicts: Vec<Conflict>,
        strategy: ResolutionStrategy,
        applied: Vec<String>,
    ) -> LogicResult<ResolutionRecord> {
        let record = ResolutionRecord {
            id: ResolutionId::new(),
            conflicts,
            strategy,
            applied,
            resolved_at: Utc::now(),
        };
        for line in &record.strategy.reasoning {
            tracing::debug!(resolution = %record.id, "{line}");
        }
        let mut history = self.history.write().map_err(|_| lock_err("resolver.record"))?;
        history.push(record.clone());
        Ok(record)
    }
}
