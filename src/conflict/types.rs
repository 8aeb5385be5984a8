//! Conflict types for tracking contradictions.
//!
//! Conflicts are explicit objects, not hidden errors. A detected conflict
//! names the candidate fact, what it clashes with, and how severe the clash
//! is. Resolutions are recorded separately and never edited afterwards.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::certainty::Certainty;
use crate::knowledge_base::DefaultException;
use crate::rule::DefaultRule;
use crate::term::Predicate;

/// Unique identifier for a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConflictId(Uuid);

impl ConflictId {
    /// Creates a new random conflict ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConflictId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConflictId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a resolution record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolutionId(Uuid);

impl ResolutionId {
    /// Creates a new random resolution ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ResolutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResolutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How severe a conflict is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The candidate clashes with a default assumption.
    Medium,
    /// The candidate and a stored fact cannot both hold.
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// What the candidate clashes with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConflictKind {
    /// The candidate's structural negation is already stored.
    DirectContradiction {
        /// The stored, negated fact.
        existing: Predicate,
        /// Its certainty.
        existing_certainty: Certainty,
    },

    /// A default rule whose premise holds for the same entity implies a
    /// different conclusion than the candidate.
    DefaultViolation {
        /// The violated default rule.
        rule: DefaultRule,
        /// Stored fact satisfying the rule's premise.
        premise: Predicate,
        /// Conclusion the rule would have drawn.
        expected: Predicate,
    },
}

impl ConflictKind {
    /// The severity implied by this kind of conflict.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::DirectContradiction { .. } => Severity::High,
            Self::DefaultViolation { .. } => Severity::Medium,
        }
    }

    /// Short stable name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::DirectContradiction { .. } => "direct_contradiction",
            Self::DefaultViolation { .. } => "default_violation",
        }
    }
}

/// A detected conflict between a candidate fact and the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    /// Unique identifier for this conflict.
    pub id: ConflictId,

    /// The fact being checked.
    pub candidate: Predicate,

    /// Certainty of the candidate.
    pub candidate_certainty: Certainty,

    /// What it conflicts with.
    pub kind: ConflictKind,

    /// How severe the conflict is.
    pub severity: Severity,

    /// When the conflict was detected.
    pub detected_at: DateTime<Utc>,
}

impl Conflict {
    /// Creates a conflict detected now.
    #[must_use]
    pub fn new(candidate: Predicate, candidate_certainty: Certainty, kind: ConflictKind) -> Self {
        Self {
            id: ConflictId::new(),
            candidate,
            candidate_certainty,
            severity: kind.severity(),
            kind,
            detected_at: Utc::now(),
        }
    }

    /// Returns true for direct contradictions.
    #[must_use]
    pub const fn is_contradiction(&self) -> bool {
        matches!(self.kind, ConflictKind::DirectContradiction { .. })
    }
}

impl PartialEq for Conflict {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Conflict {}

impl std::hash::Hash for Conflict {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Human-readable feedback describing the conflict.
impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ConflictKind::DirectContradiction { existing, .. } => write!(
                f,
                "contradiction between {} and {}: both cannot hold; revise the reasoning that produced them",
                self.candidate, existing
            ),
            ConflictKind::DefaultViolation { rule, expected, .. } => write!(
                f,
                "default rule [{rule}] expected {expected} but found {}; either this is a genuine exception or the reasoning is wrong",
                self.candidate
            ),
        }
    }
}

/// One step of a resolution strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolutionAction {
    /// Remove a stored fact that lost on certainty.
    RetractFact {
        /// The fact to remove.
        fact: Predicate,
    },

    /// The candidate lost: it is not inserted, and removed if stored.
    RejectCandidate {
        /// The candidate.
        fact: Predicate,
    },

    /// Surface the conflict for a human decision.
    ManualReview {
        /// The conflict needing review.
        conflict: ConflictId,
        /// Facts involved.
        facts: Vec<Predicate>,
    },

    /// Scope a default rule so it no longer fires for one entity.
    AddException {
        /// The exception to record.
        exception: DefaultException,
    },
}

impl fmt::Display for ResolutionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RetractFact { fact } => write!(f, "retract {fact}"),
            Self::RejectCandidate { fact } => write!(f, "reject {fact}"),
            Self::ManualReview { conflict, facts } => {
                write!(f, "manual review of conflict {conflict} (")?;
                for (i, fact) in facts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{fact}")?;
                }
                f.write_str(")")
            }
            Self::AddException { exception } => write!(f, "add exception {exception}"),
        }
    }
}

/// The deterministic plan for a set of conflicts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionStrategy {
    /// Actions to apply, in order.
    pub actions: Vec<ResolutionAction>,

    /// One explanation line per decision.
    pub reasoning: Vec<String>,
}

impl ResolutionStrategy {
    /// Returns true if any action asks for a human decision.
    #[must_use]
    pub fn requires_review(&self) -> bool {
        self.actions
            .iter()
            .any(|a| matches!(a, ResolutionAction::ManualReview { .. }))
    }

    /// Returns true if the candidate is rejected by this plan.
    #[must_use]
    pub fn rejects(&self, candidate: &Predicate) -> bool {
        self.actions
            .iter()
            .any(|a| matches!(a, ResolutionAction::RejectCandidate { fact } if fact == candidate))
    }

    pub(crate) fn extend(&mut self, other: Self) {
        self.actions.extend(other.actions);
        self.reasoning.extend(other.reasoning);
    }
}

/// Result of checking one candidate against the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyReport {
    /// The fact checked.
    pub candidate: Predicate,

    /// Its certainty.
    pub certainty: Certainty,

    /// Conflicts found, contradictions first.
    pub conflicts: Vec<Conflict>,

    /// How the conflicts would be resolved.
    pub strategy: ResolutionStrategy,
}

impl ConsistencyReport {
    /// Returns true if any conflict was found.
    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Outcome of the pre-insertion check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FactValidation {
    /// The candidate is consistent with the knowledge base.
    Consistent,

    /// The candidate's certainty is below the configured threshold.
    BelowThreshold {
        /// The candidate's certainty.
        certainty: Certainty,
        /// The configured minimum.
        threshold: f32,
    },

    /// The candidate would create conflicts.
    Conflicting {
        /// Conflicts and proposed strategy.
        report: ConsistencyReport,
    },
}

impl FactValidation {
    /// Returns true if the candidate can be inserted as is.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Consistent)
    }
}

/// Audit entry for one applied resolution. Never modified once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionRecord {
    /// Unique identifier.
    pub id: ResolutionId,

    /// The conflicts that were resolved.
    pub conflicts: Vec<Conflict>,

    /// The plan that was applied.
    pub strategy: ResolutionStrategy,

    /// Actions that changed the knowledge base.
    pub applied: Vec<String>,

    /// When the resolution was applied.
    pub resolved_at: DateTime<Utc>,
}

impl ResolutionRecord {
    /// Returns true if the resolution left something for manual review.
    #[must_use]
    pub fn requires_review(&self) -> bool {
        self.strategy.requires_review()
    }
}

/// Result of a full consistency sweep over stored facts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    /// When the sweep ran.
    pub checked_at: DateTime<Utc>,

    /// Number of stored facts examined.
    pub facts_checked: usize,

    /// Inconsistencies found, contradictions first.
    pub inconsistencies: Vec<Conflict>,
}

impl SweepReport {
    /// Returns true if anything was found.
    #[must_use]
    pub fn has_inconsistencies(&self) -> bool {
        !self.inconsistencies.is_empty()
    }
}

/// Outcome of [`auto_correct`](crate::conflict::ConflictResolver::auto_correct).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionReport {
    /// The sweep that drove the correction.
    pub sweep: SweepReport,

    /// The applied resolution, if anything needed correcting.
    pub resolution: Option<ResolutionRecord>,
}

impl CorrectionReport {
    /// Number of knowledge base changes made.
    #[must_use]
    pub fn corrections(&self) -> usize {
        self.resolution.as_ref().map_or(0, |r| r.applied.len())
    }
}

/// Outcome of a gated insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckedAssertion {
    /// Whether the candidate was stored.
    pub inserted: bool,

    /// The consistency check that preceded insertion.
    pub validation: FactValidation,

    /// The resolution applied, if there were conflicts.
    pub resolution: Option<ResolutionRecord>,
}

/// Snapshot of the resolver's bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverStatus {
    /// Default rules in the knowledge base.
    pub default_rules: usize,
    /// Default-rule exceptions recorded.
    pub exceptions: usize,
    /// Resolution records in the history.
    pub resolutions: usize,
    /// Total knowledge base changes made by resolutions.
    pub corrections: usize,
    /// When the last sweep ran.
    pub last_sweep: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Term;

    fn unary(name: &str, arg: &str) -> Predicate {
        Predicate::new(name, [Term::constant(arg)])
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(ConflictId::new(), ConflictId::new());
        assert_ne!(ResolutionId::new(), ResolutionId::new());
    }

    #[test]
    fn severity_follows_kind() {
        let c = Conflict::new(
            unary("Flies", "Tux"),
            Certainty::certain(),
            ConflictKind::DirectContradiction {
                existing: unary("NotFlies", "Tux"),
                existing_certainty: Certainty::certain(),
            },
        );
        assert_eq!(c.severity, Severity::High);
        assert!(c.is_contradiction());
        assert!(Severity::High > Severity::Medium);
    }

    #[test]
    fn feedback_names_both_facts() {
        let c = Conflict::new(
            unary("Flies", "Tux"),
            Certainty::certain(),
            ConflictKind::DirectContradiction {
                existing: unary("NotFlies", "Tux"),
                existing_certainty: Certainty::certain(),
            },
        );
        let text = c.to_string();
        assert!(text.contains("Flies(Tux)"));
        assert!(text.contains("NotFlies(Tux)"));
    }

    #[test]
    fn strategy_flags() {
        let candidate = unary("Flies", "Tux");
        let strategy = ResolutionStrategy {
            actions: vec![
                ResolutionAction::RejectCandidate {
                    fact: candidate.clone(),
                },
                ResolutionAction::ManualReview {
                    conflict: ConflictId::new(),
                    facts: vec![candidate.clone()],
                },
            ],
            reasoning: vec![],
        };
        assert!(strategy.rejects(&candidate));
        assert!(strategy.requires_review());
        assert!(!ResolutionStrategy::default().requires_review());
    }

    #[test]
    fn conflict_serialization() {
        let c = Conflict::new(
            unary("Flies", "Tux"),
            Certainty::new(0.9).unwrap(),
            ConflictKind::DirectContradiction {
                existing: unary("NotFlies", "Tux"),
                existing_certainty: Certainty::certain(),
            },
        );
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("direct_contradiction"));
        let back: Conflict = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, c.id);
    }
}
