//! Rules and query shapes.
//!
//! A [`Rule`] is a monotonic implication `premise -> conclusion`. A
//! [`DefaultRule`] has the same shape but reads "normally": it concludes
//! unless the negated conclusion can be proven. Temporal queries are never
//! stored; they only describe what to ask.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::certainty::Certainty;
use crate::term::{Constant, Predicate, Term};

/// Name of the predicate that timestamps an event: `HappensAt(event, time)`.
pub const HAPPENS_AT: &str = "HappensAt";

/// Builds a `HappensAt(event, time)` fact.
#[must_use]
pub fn happens_at(event: Predicate, time: i64) -> Predicate {
    Predicate::new(
        HAPPENS_AT,
        [Term::Predicate(event), Term::Constant(Constant::new(time.to_string()))],
    )
}

/// Monotonic implication: whenever the premise holds, so does the conclusion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    premise: Predicate,
    conclusion: Predicate,
}

impl Rule {
    /// Creates a rule.
    #[must_use]
    pub const fn new(premise: Predicate, conclusion: Predicate) -> Self {
        Self { premise, conclusion }
    }

    /// The rule's premise.
    #[must_use]
    pub const fn premise(&self) -> &Predicate {
        &self.premise
    }

    /// The rule's conclusion.
    #[must_use]
    pub const fn conclusion(&self) -> &Predicate {
        &self.conclusion
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.premise, self.conclusion)
    }
}

/// Default ("normally true") rule: if the premise holds and the negation of
/// the instantiated conclusion cannot be proven, conclude it.
///
/// Priority settles competing defaults: a default does not fire while a
/// default for the contrary conclusion applies with equal or higher
/// priority. Equal priorities block each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DefaultRule {
    premise: Predicate,
    conclusion: Predicate,
    #[serde(default)]
    priority: Certainty,
}

impl DefaultRule {
    /// Creates a default rule with full priority.
    #[must_use]
    pub const fn new(premise: Predicate, conclusion: Predicate) -> Self {
        Self {
            premise,
            conclusion,
            priority: Certainty::certain(),
        }
    }

    /// Sets the rule's priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Certainty) -> Self {
        self.priority = priority;
        self
    }

    /// The rule's premise.
    #[must_use]
    pub const fn premise(&self) -> &Predicate {
        &self.premise
    }

    /// The rule's conclusion.
    #[must_use]
    pub const fn conclusion(&self) -> &Predicate {
        &self.conclusion
    }

    /// The rule's priority against competing defaults.
    #[must_use]
    pub const fn priority(&self) -> Certainty {
        self.priority
    }

    /// Same rule over different premise and conclusion, keeping the priority.
    pub(crate) fn with_parts(&self, premise: Predicate, conclusion: Predicate) -> Self {
        Self {
            premise,
            conclusion,
            priority: self.priority,
        }
    }
}

/// Full-priority rules render as `P ~> C`, others as `P ~> C @ 0.6`.
impl fmt::Display for DefaultRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~> {}", self.premise, self.conclusion)?;
        if self.priority != Certainty::certain() {
            write!(f, " @ {}", self.priority.value())?;
        }
        Ok(())
    }
}

/// Ordering operator for temporal queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalOperator {
    /// First event strictly precedes the second.
    Before,
    /// First event strictly follows the second.
    After,
}

impl TemporalOperator {
    /// Parses the operator from its predicate name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Before" => Some(Self::Before),
            "After" => Some(Self::After),
            _ => None,
        }
    }

    /// The predicate name of this operator.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Before => "Before",
            Self::After => "After",
        }
    }

    /// Evaluates the operator over two timestamps. Equal times never hold.
    #[must_use]
    pub const fn holds(self, first: i64, second: i64) -> bool {
        match self {
            Self::Before => first < second,
            Self::After => first > second,
        }
    }
}

impl fmt::Display for TemporalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An ordering question about two (possibly partially instantiated) events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemporalQuery {
    /// The ordering operator.
    pub operator: TemporalOperator,
    /// Event on the left of the operator.
    pub first: Predicate,
    /// Event on the right of the operator.
    pub second: Predicate,
}

impl TemporalQuery {
    /// `first` happens before `second`.
    #[must_use]
    pub const fn before(first: Predicate, second: Predicate) -> Self {
        Self {
            operator: TemporalOperator::Before,
            first,
            second,
        }
    }

    /// `first` happens after `second`.
    #[must_use]
    pub const fn after(first: Predicate, second: Predicate) -> Self {
        Self {
            operator: TemporalOperator::After,
            first,
            second,
        }
    }

    /// Recognizes `Before(A, B)` / `After(A, B)` where both arguments are
    /// predicates.
    #[must_use]
    pub fn from_predicate(p: &Predicate) -> Option<Self> {
        let operator = TemporalOperator::from_name(p.name())?;
        match p.terms() {
            [Term::Predicate(first), Term::Predicate(second)] => Some(Self {
                operator,
                first: first.clone(),
                second: second.clone(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for TemporalQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {})", self.operator, self.first, self.second)
    }
}

/// Anything the reasoner can be asked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Query {
    /// Prove an ordinary predicate.
    Goal {
        /// The goal to prove.
        goal: Predicate,
    },
    /// Decide an ordering between two timestamped events.
    Temporal {
        /// The ordering question.
        query: TemporalQuery,
    },
}

impl Query {
    /// Returns true for temporal ordering queries.
    #[must_use]
    pub const fn is_temporal(&self) -> bool {
        matches!(self, Self::Temporal { .. })
    }
}

impl From<Predicate> for Query {
    fn from(p: Predicate) -> Self {
        match TemporalQuery::from_predicate(&p) {
            Some(query) => Self::Temporal { query },
            None => Self::Goal { goal: p },
        }
    }
}

impl From<TemporalQuery> for Query {
    fn from(query: TemporalQuery) -> Self {
        Self::Temporal { query }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Goal { goal } => goal.fmt(f),
            Self::Temporal { query } => query.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unary(name: &str, arg: Term) -> Predicate {
        Predicate::new(name, [arg])
    }

    #[test]
    fn rules_render_with_their_arrow() {
        let r = Rule::new(unary("Human", Term::var("x")), unary("Mortal", Term::var("x")));
        let d = DefaultRule::new(unary("Bird", Term::var("x")), unary("Flies", Term::var("x")));
        assert_eq!(r.to_string(), "Human(x) -> Mortal(x)");
        assert_eq!(d.to_string(), "Bird(x) ~> Flies(x)");
        let weak = d.with_priority(Certainty::new(0.6).unwrap());
        assert_eq!(weak.to_string(), "Bird(x) ~> Flies(x) @ 0.6");
    }

    #[test]
    fn happens_at_builds_timestamped_fact() {
        let fact = happens_at(unary("Login", Term::constant("UserA")), 100);
        assert_eq!(fact.to_string(), "HappensAt(Login(UserA), 100)");
    }

    #[test]
    fn operator_semantics_exclude_equal_times() {
        assert!(TemporalOperator::Before.holds(100, 200));
        assert!(!TemporalOperator::Before.holds(200, 200));
        assert!(TemporalOperator::After.holds(200, 100));
        assert!(!TemporalOperator::After.holds(100, 100));
    }

    #[test]
    fn ordering_predicates_become_temporal_queries() {
        let login = unary("Login", Term::constant("UserA"));
        let logout = unary("Logout", Term::constant("UserA"));
        let p = Predicate::new(
            "Before",
            [Term::Predicate(login.clone()), Term::Predicate(logout.clone())],
        );
        assert_eq!(Query::from(p), Query::from(TemporalQuery::before(login, logout)));
    }

    #[test]
    fn ordering_names_with_constant_args_stay_goals() {
        let p = Predicate::new("Before", [Term::constant("A"), Term::constant("B")]);
        assert!(!Query::from(p).is_temporal());
    }
}
