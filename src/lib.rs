//! # KyroLogic - symbolic reasoning over a shared knowledge base
//!
//! KyroLogic stores typed logical facts and rules and answers queries by
//! unification-based search.
//!
//! ## Core Concepts
//!
//! - **Term / Predicate**: immutable values; a ground predicate is a fact
//! - **Rule / DefaultRule**: `premise -> conclusion` and "normally"
//!   `premise ~> conclusion`
//! - **InferenceEngine**: backward chaining, default reasoning with negation
//!   as failure, temporal ordering over `HappensAt` facts, and forward
//!   saturation, all under an explicit search budget
//! - **ConflictResolver**: certainty-weighted resolution of contradictory
//!   facts and default-rule violations, with an audit history
//!
//! ## Usage
//!
//! ```rust
//! use kyrologic::{Reasoner, Term, Predicate, DefaultRule};
//!
//! let reasoner = Reasoner::new();
//! reasoner.tell("Penguin(Tux)").unwrap();
//! reasoner.tell("NotFlies(Tux)").unwrap();
//! reasoner.tell("Bird(Tweety)").unwrap();
//! reasoner.tell("Penguin(x) -> Bird(x)").unwrap();
//! reasoner
//!     .add_default_rule(DefaultRule::new(
//!         Predicate::new("Bird", [Term::var("x")]),
//!         Predicate::new("Flies", [Term::var("x")]),
//!     ))
//!     .unwrap();
//!
//! assert!(reasoner.ask("Flies(Tweety)").unwrap().is_true());
//! assert!(!reasoner.ask("Flies(Tux)").unwrap().is_true());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod certainty;
pub mod error;
pub mod rule;
pub mod substitution;
pub mod term;
pub mod unify;

// Storage and reasoning
pub mod conflict;
pub mod inference;
pub mod knowledge_base;
pub mod parse;
pub mod reasoner;
pub mod runtime;

// Re-export primary types at crate root for convenience
pub use certainty::{Annotation, Certainty};
pub use conflict::{
    CheckedAssertion, Conflict, ConflictId, ConflictKind, ConflictResolver, ConsistencyReport,
    CorrectionReport, FactValidation, ResolutionAction, ResolutionRecord, ResolutionStrategy,
    ResolverConfig, ResolverStatus, Severity, SweepReport,
};
pub use error::{ExecutionError, LogicError, LogicResult, ValidationError};
pub use inference::{
    EngineConfig, InferenceEngine, ProofOutcome, QueryAnswer, Reasoning, Saturation, VariableRenamer,
};
pub use knowledge_base::{DefaultException, KbSnapshot, KnowledgeBase, Statistics, StoredFact};
pub use parse::{parse_default_rule, parse_predicate, parse_query, parse_rule, parse_term};
pub use reasoner::{Reasoner, ReasonerConfig, Told};
pub use rule::{happens_at, DefaultRule, Query, Rule, TemporalOperator, TemporalQuery, HAPPENS_AT};
pub use runtime::{DefaultRouter, ExecutionPath, QueryHandle, QueryRouter, QueryRuntime, RuntimeConfig};
pub use substitution::Substitution;
pub use term::{Constant, Predicate, Term, Variable};
pub use unify::{unify, unify_predicates};
