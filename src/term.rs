//! Term model: variables, constants and predicates.
//!
//! All term types are immutable values with structural equality. A
//! [`Predicate`] may nest inside another predicate's arguments, which is how
//! temporal facts such as `HappensAt(Login(UserA), 100)` are represented.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name prefix that marks the structural negation of a predicate.
pub const NEGATION_PREFIX: &str = "Not";

/// A logical variable. Two variables are equal iff their names are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variable(String);

impl Variable {
    /// Creates a variable with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the variable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An atomic, globally meaningful value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Constant(String);

impl Constant {
    /// Creates a constant with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the constant name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Interprets the constant as an integer, if it parses as one.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        self.0.trim().parse().ok()
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A term: a variable, a constant or a (possibly nested) predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Term {
    /// A logical variable.
    Variable(Variable),
    /// An atomic constant.
    Constant(Constant),
    /// A compound term.
    Predicate(Predicate),
}

impl Term {
    /// Shorthand for a variable term.
    #[must_use]
    pub fn var(name: impl Into<String>) -> Self {
        Self::Variable(Variable::new(name))
    }

    /// Shorthand for a constant term.
    #[must_use]
    pub fn constant(name: impl Into<String>) -> Self {
        Self::Constant(Constant::new(name))
    }

    /// Returns true if no variable appears anywhere in this term.
    #[must_use]
    pub fn is_ground(&self) -> bool {
        match self {
            Self::Variable(_) => false,
            Self::Constant(_) => true,
            Self::Predicate(p) => p.is_ground(),
        }
    }

    /// Returns true if this is a compound term.
    #[must_use]
    pub const fn is_compound(&self) -> bool {
        matches!(self, Self::Predicate(_))
    }

    /// Returns the variable, if this term is one.
    #[must_use]
    pub const fn as_variable(&self) -> Option<&Variable> {
        match self {
            Self::Variable(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the constant, if this term is one.
    #[must_use]
    pub const fn as_constant(&self) -> Option<&Constant> {
        match self {
            Self::Constant(c) => Some(c),
            _ => None,
        }
    }

    /// Returns the predicate, if this term is one.
    #[must_use]
    pub const fn as_predicate(&self) -> Option<&Predicate> {
        match self {
            Self::Predicate(p) => Some(p),
            _ => None,
        }
    }

    pub(crate) fn collect_variables(&self, out: &mut BTreeSet<Variable>) {
        match self {
            Self::Variable(v) => {
                out.insert(v.clone());
            }
            Self::Constant(_) => {}
            Self::Predicate(p) => {
                for t in &p.terms {
                    t.collect_variables(out);
                }
            }
        }
    }
}

impl From<Variable> for Term {
    fn from(v: Variable) -> Self {
        Self::Variable(v)
    }
}

impl From<Constant> for Term {
    fn from(c: Constant) -> Self {
        Self::Constant(c)
    }
}

impl From<Predicate> for Term {
    fn from(p: Predicate) -> Self {
        Self::Predicate(p)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable(v) => v.fmt(f),
            Self::Constant(c) => c.fmt(f),
            Self::Predicate(p) => p.fmt(f),
        }
    }
}

/// A named, ordered tuple of terms. Zero terms makes a propositional atom.
///
/// # Examples
///
/// ```
/// use kyrologic::{Predicate, Term};
///
/// let fact = Predicate::new("Human", [Term::constant("Socrates")]);
/// assert!(fact.is_ground());
/// assert_eq!(fact.to_string(), "Human(Socrates)");
/// assert_eq!(fact.negated().to_string(), "NotHuman(Socrates)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Predicate {
    name: String,
    terms: Vec<Term>,
}

impl Predicate {
    /// Creates a predicate from a name and its arguments.
    #[must_use]
    pub fn new(name: impl Into<String>, terms: impl IntoIterator<Item = Term>) -> Self {
        Self {
            name: name.into(),
            terms: terms.into_iter().collect(),
        }
    }

    /// Creates a propositional atom (a predicate with no arguments).
    #[must_use]
    pub fn atom(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// Returns the predicate name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the arguments in order.
    #[must_use]
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Returns the number of arguments.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.terms.len()
    }

    /// Returns true if no variable appears anywhere in the term tree.
    #[must_use]
    pub fn is_ground(&self) -> bool {
        self.terms.iter().all(Term::is_ground)
    }

    /// Returns every distinct variable in the term tree.
    #[must_use]
    pub fn variables(&self) -> BTreeSet<Variable> {
        let mut out = BTreeSet::new();
        for t in &self.terms {
            t.collect_variables(&mut out);
        }
        out
    }

    /// Returns true if the name carries the negation prefix.
    #[must_use]
    pub fn is_negated(&self) -> bool {
        strip_negation(&self.name).is_some()
    }

    /// Returns the structural negation: `P(args)` becomes `NotP(args)` and
    /// `NotP(args)` becomes `P(args)`.
    #[must_use]
    pub fn negated(&self) -> Self {
        let name = match strip_negation(&self.name) {
            Some(positive) => positive.to_string(),
            None => format!("{NEGATION_PREFIX}{}", self.name),
        };
        Self {
            name,
            terms: self.terms.clone(),
        }
    }

    /// Returns the positive form: the predicate itself, or its negation when
    /// the name is negated.
    #[must_use]
    pub fn positive(&self) -> Self {
        if self.is_negated() {
            self.negated()
        } else {
            self.clone()
        }
    }

    /// Builds a new predicate with the same name and the given arguments.
    pub(crate) fn with_terms(&self, terms: Vec<Term>) -> Self {
        Self {
            name: self.name.clone(),
            terms,
        }
    }
}

// "Nothing" is not the negation of "hing".
fn strip_negation(name: &str) -> Option<&str> {
    let rest = name.strip_prefix(NEGATION_PREFIX)?;
    rest.chars().next().filter(|c| c.is_uppercase()).map(|_| rest)
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.terms.is_empty() {
            return Ok(());
        }
        f.write_str("(")?;
        for (i, t) in self.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{t}")?;
        }
        f.write_str(")")
    }
}
