//! Substitutions: variable bindings representing a partial proof state.
//!
//! A [`Substitution`] is a value. Extending it returns a new substitution and
//! leaves the original untouched, so a substitution handed to a caller (or to
//! a sibling proof branch) never changes underneath it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::term::{Predicate, Term, Variable};

/// Mapping from variables to terms. Keys are unique.
///
/// Bindings are only created through [`unify`](crate::unify::unify), which
/// enforces the occurs check; a substitution therefore never binds a
/// variable to a term containing that variable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Substitution {
    bindings: BTreeMap<Variable, Term>,
}

impl Substitution {
    /// Creates an empty substitution.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bound variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Returns the term bound directly to `var`, if any.
    #[must_use]
    pub fn get(&self, var: &Variable) -> Option<&Term> {
        self.bindings.get(var)
    }

    /// Returns true if `var` is bound.
    #[must_use]
    pub fn contains(&self, var: &Variable) -> bool {
        self.bindings.contains_key(var)
    }

    /// Iterates over the direct bindings in variable order.
    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &Term)> {
        self.bindings.iter()
    }

    /// Returns a new substitution extended with `var -> term`.
    pub(crate) fn bind(&self, var: Variable, term: Term) -> Self {
        let mut bindings = self.bindings.clone();
        bindings.insert(var, term);
        Self { bindings }
    }

    /// Follows variable-to-variable bindings until reaching an unbound
    /// variable or a non-variable term. Does not descend into compounds.
    #[must_use]
    pub fn walk<'a>(&'a self, term: &'a Term) -> &'a Term {
        let mut current = term;
        while let Term::Variable(v) = current {
            match self.bindings.get(v) {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }

    /// Applies the substitution to every variable in the term tree.
    #[must_use]
    pub fn apply_term(&self, term: &Term) -> Term {
        match self.walk(term) {
            Term::Predicate(p) => Term::Predicate(self.apply(p)),
            resolved => resolved.clone(),
        }
    }

    /// Applies the substitution to every argument of the predicate.
    #[must_use]
    pub fn apply(&self, predicate: &Predicate) -> Predicate {
        if self.is_empty() {
            return predicate.clone();
        }
        predicate.with_terms(predicate.terms().iter().map(|t| self.apply_term(t)).collect())
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (v, t)) in self.bindings.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{v}/{t}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_is_copy_on_write() {
        let empty = Substitution::new();
        let one = empty.bind(Variable::new("x"), Term::constant("A"));
        assert!(empty.is_empty());
        assert_eq!(one.len(), 1);
        assert_eq!(one.get(&Variable::new("x")), Some(&Term::constant("A")));
    }

    #[test]
    fn walk_follows_variable_chains() {
        let s = Substitution::new()
            .bind(Variable::new("x"), Term::var("y"))
            .bind(Variable::new("y"), Term::constant("B"));
        assert_eq!(s.walk(&Term::var("x")), &Term::constant("B"));
        assert_eq!(s.walk(&Term::var("z")), &Term::var("z"));
    }

    #[test]
    fn apply_resolves_nested_terms() {
        let s = Substitution::new()
            .bind(Variable::new("u"), Term::constant("UserA"))
            .bind(Variable::new("t"), Term::constant("100"));
        let p = Predicate::new(
            "HappensAt",
            [
                Term::Predicate(Predicate::new("Login", [Term::var("u")])),
                Term::var("t"),
            ],
        );
        assert_eq!(s.apply(&p).to_string(), "HappensAt(Login(UserA), 100)");
    }

    #[test]
    fn display_lists_bindings() {
        let s = Substitution::new().bind(Variable::new("x"), Term::constant("Socrates"));
        assert_eq!(s.to_string(), "{x/Socrates}");
    }
}
