//! Conflict detection and certainty-weighted resolution.
//!
//! Conflicts are explicit objects tracking contradictions and their
//! resolution.

pub mod detector;
pub mod policy;
pub mod resolver;
pub mod types;

pub use policy::{decide_contradiction, ContradictionDecision, ResolverConfig};
pub use resolver::ConflictResolver;
pub use types::{
    CheckedAssertion, Conflict, ConflictId, ConflictKind, ConsistencyReport, CorrectionReport,
    FactValidation, ResolutionAction, ResolutionId, ResolutionRecord, ResolutionStrategy,
    ResolverStatus, Severity, SweepReport,
};
