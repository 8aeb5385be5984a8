//! Syntactic unification with occurs check.
//!
//! Failure is a value (`None`), not an error: the proof search threads it
//! through every branch. Chaining with `and_then` (or `?` inside a function
//! returning `Option`) gives the short-circuit on a failed substitution.

use crate::substitution::Substitution;
use crate::term::{Predicate, Term, Variable};

/// Computes the most general substitution extending `subst` that makes `x`
/// and `y` syntactically identical.
///
/// The input substitution is never modified.
///
/// # Examples
///
/// ```
/// use kyrologic::{unify, Predicate, Substitution, Term};
///
/// let pattern = Term::Predicate(Predicate::new("Mortal", [Term::var("x")]));
/// let fact = Term::Predicate(Predicate::new("Mortal", [Term::constant("Socrates")]));
///
/// let s = unify(&pattern, &fact, &Substitution::new()).unwrap();
/// assert_eq!(s.to_string(), "{x/Socrates}");
/// ```
#[must_use]
pub fn unify(x: &Term, y: &Term, subst: &Substitution) -> Option<Substitution> {
    if x == y {
        return Some(subst.clone());
    }
    match (x, y) {
        (Term::Variable(v), _) => unify_variable(v, y, subst),
        (_, Term::Variable(v)) => unify_variable(v, x, subst),
        (Term::Predicate(a), Term::Predicate(b)) => unify_predicates(a, b, subst),
        _ => None,
    }
}

/// Unifies two predicates: names and arities must match, then arguments are
/// unified left to right, stopping at the first failure.
#[must_use]
pub fn unify_predicates(a: &Predicate, b: &Predicate, subst: &Substitution) -> Option<Substitution> {
    if a.name() != b.name() || a.arity() != b.arity() {
        return None;
    }
    a.terms()
        .iter()
        .zip(b.terms())
        .try_fold(subst.clone(), |s, (x, y)| unify(x, y, &s))
}

/// Binds `var` to `x`, resolving existing bindings first.
#[must_use]
pub fn unify_variable(var: &Variable, x: &Term, subst: &Substitution) -> Option<Substitution> {
    if let Some(bound) = subst.get(var) {
        return unify(bound, x, subst);
    }
    let resolved = subst.walk(x);
    if let Term::Variable(other) = resolved {
        if other == var {
            return Some(subst.clone());
        }
    }
    if resolved.is_compound() && occurs(var, resolved, subst) {
        return None;
    }
    Some(subst.bind(var.clone(), x.clone()))
}

/// Returns true if `var` appears in `term` once bindings are followed.
#[must_use]
pub fn occurs(var: &Variable, term: &Term, subst: &Substitution) -> bool {
    match subst.walk(term) {
        Term::Variable(v) => v == var,
        Term::Constant(_) => false,
        Term::Predicate(p) => p.terms().iter().any(|t| occurs(var, t, subst)),
    }
}
