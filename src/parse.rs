//! Text convention for terms, rules and queries.
//!
//! - `Mortal(Socrates)` is a predicate; `Rain` is a propositional atom.
//! - Inside arguments, a lowercase-initial identifier is a variable and
//!   anything else a constant: `Parent(x, Alice)`.
//! - Arguments may nest: `HappensAt(Login(UserA), 100)`.
//! - Rules are `A -> B`, default rules `A ~> B` with an optional priority
//!   suffix: `Bird(x) ~> Flies(x) @ 0.9`.
//!
//! `Display` output of every type parses back to the same value.

use std::sync::OnceLock;

use regex::Regex;

use crate::certainty::Certainty;
use crate::error::{LogicError, LogicResult, ValidationError};
use crate::rule::{DefaultRule, Query, Rule};
use crate::term::{Predicate, Term};

static IDENTIFIER: OnceLock<Option<Regex>> = OnceLock::new();

fn identifier_regex() -> LogicResult<&'static Regex> {
    IDENTIFIER
        .get_or_init(|| Regex::new(r"^(?:[A-Za-z_][A-Za-z0-9_]*|-?[0-9]+)$").ok())
        .as_ref()
        .ok_or_else(|| LogicError::internal("identifier regex failed to compile"))
}

/// Returns true if `name` is a valid identifier: letters, digits and `_`
/// starting with a letter or `_`, or an optionally signed integer.
///
/// # Errors
///
/// Returns an internal error if the identifier pattern cannot be compiled.
pub fn is_identifier(name: &str) -> LogicResult<bool> {
    Ok(identifier_regex()?.is_match(name))
}

fn is_variable_name(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_lowercase)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    const fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn error(&self, reason: impl Into<String>) -> LogicError {
        ValidationError::Parse {
            input: self.input.to_string(),
            offset: self.pos,
            reason: reason.into(),
        }
        .into()
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.rest().chars().next()
    }

    fn expect(&mut self, c: char) -> LogicResult<()> {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            Ok(())
        } else {
            Err(self.error(format!("expected '{c}'")))
        }
    }

    fn identifier(&mut self) -> LogicResult<&'a str> {
        self.skip_whitespace();
        let rest = self.rest();
        let len = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | ','))
            .unwrap_or(rest.len());
        let name = &rest[..len];
        if name.is_empty() {
            return Err(self.error("expected an identifier"));
        }
        if !is_identifier(name)? {
            return Err(ValidationError::InvalidIdentifier {
                name: name.to_string(),
            }
            .into());
        }
        self.pos += len;
        Ok(name)
    }

    fn term(&mut self) -> LogicResult<Term> {
        let name = self.identifier()?;
        if self.peek() != Some('(') {
            return Ok(if is_variable_name(name) {
                Term::var(name)
            } else {
                Term::constant(name)
            });
        }
        self.expect('(')?;
        let mut args = Vec::new();
        if self.peek() == Some(')') {
            self.expect(')')?;
            return Ok(Term::Predicate(Predicate::atom(name)));
        }
        loop {
            args.push(self.term()?);
            match self.peek() {
                Some(',') => self.expect(',')?,
                Some(')') => {
                    self.expect(')')?;
                    break;
                }
                _ => return Err(self.error("expected ',' or ')'")),
            }
        }
        Ok(Term::Predicate(Predicate::new(name, args)))
    }

    fn finish(&mut self) -> LogicResult<()> {
        if self.peek().is_some() {
            return Err(self.error("unexpected trailing input"));
        }
        Ok(())
    }
}

/// Parses a single term.
///
/// # Errors
///
/// Returns `ValidationError::Parse` or `InvalidIdentifier` on malformed text.
pub fn parse_term(text: &str) -> LogicResult<Term> {
    let mut parser = Parser::new(text);
    let term = parser.term()?;
    parser.finish()?;
    Ok(term)
}

/// Parses a predicate. A bare uppercase identifier is an atom.
///
/// # Errors
///
/// Returns `ValidationError::Parse` or `InvalidIdentifier` on malformed
/// text, including a bare variable.
pub fn parse_predicate(text: &str) -> LogicResult<Predicate> {
    let mut parser = Parser::new(text);
    let term = parser.term()?;
    parser.finish()?;
    match term {
        Term::Predicate(p) => Ok(p),
        Term::Constant(c) => Ok(Predicate::atom(c.name())),
        Term::Variable(v) => Err(ValidationError::Parse {
            input: text.to_string(),
            offset: 0,
            reason: format!("expected a predicate, found variable '{v}'"),
        }
        .into()),
    }
}

fn split_arrow<'t>(text: &'t str, arrow: &str) -> LogicResult<(&'t str, &'t str)> {
    text.split_once(arrow).ok_or_else(|| {
        ValidationError::Parse {
            input: text.to_string(),
            offset: text.len(),
            reason: format!("expected '{arrow}'"),
        }
        .into()
    })
}

/// Parses `premise -> conclusion`.
///
/// # Errors
///
/// Returns `ValidationError::Parse` on malformed text.
pub fn parse_rule(text: &str) -> LogicResult<Rule> {
    let (premise, conclusion) = split_arrow(text, "->")?;
    Ok(Rule::new(parse_predicate(premise)?, parse_predicate(conclusion)?))
}

/// Parses `premise ~> conclusion`, optionally followed by `@ priority`.
///
/// # Errors
///
/// Returns `ValidationError::Parse` on malformed text, or
/// `CertaintyOutOfRange` for a priority outside `[0, 1]`.
pub fn parse_default_rule(text: &str) -> LogicResult<DefaultRule> {
    let (premise, rest) = split_arrow(text, "~>")?;
    let rule = match rest.split_once('@') {
        None => DefaultRule::new(parse_predicate(premise)?, parse_predicate(rest)?),
        Some((conclusion, priority)) => {
            let value: f32 = priority.trim().parse().map_err(|_| ValidationError::Parse {
                input: text.to_string(),
                offset: text.len() - priority.len(),
                reason: format!("expected a priority, found '{}'", priority.trim()),
            })?;
            DefaultRule::new(parse_predicate(premise)?, parse_predicate(conclusion)?)
                .with_priority(Certainty::new(value)?)
        }
    };
    Ok(rule)
}

/// Parses a query. `Before(A, B)` and `After(A, B)` with predicate
/// arguments become temporal queries.
///
/// # Errors
///
/// Returns `ValidationError::Parse` on malformed text.
pub fn parse_query(text: &str) -> LogicResult<Query> {
    parse_predicate(text).map(Query::from)
}
