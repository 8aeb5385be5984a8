//! Non-monotonic reasoning over default rules.
//!
//! A default `P(x) ~> C(x)` concludes `C(a)` when `P(a)` is provable by
//! ordinary backward chaining and `NotC(a)` is not (negation as failure).
//! Every proof of the premise is tried in turn, so an open goal finds the
//! entities the default is not blocked for.
//!
//! A default does not fire for an excepted premise instance, nor while a
//! competing default for the contrary conclusion applies with equal or
//! higher priority.

use crate::certainty::Certainty;
use crate::inference::backward::{ProofSearch, Search};
use crate::substitution::Substitution;
use crate::term::Predicate;
use crate::unify::unify_predicates;

impl ProofSearch<'_> {
    /// Tries every default rule whose conclusion unifies with the goal.
    pub(crate) fn ask_default(&mut self, goal: &Predicate) -> Search {
        let kb = self.kb;
        let mut cut_off = false;
        for original in &kb.default_rules {
            let rule = self.renamer.standardize_default(original);
            let Some(bound) = unify_predicates(rule.conclusion(), goal, &Substitution::new()) else {
                continue;
            };
            let premise = bound.apply(rule.premise());
            let proofs = self.solve(&premise, &bound, 1);
            cut_off |= proofs.cut_off;

            for proof in proofs.found {
                if kb.is_excepted(original, &proof.apply(rule.premise())) {
                    tracing::debug!(goal = %goal, rule = %original, "defaults: excepted instance");
                    continue;
                }

                let conclusion = proof.apply(rule.conclusion());
                let contrary = conclusion.negated();
                match self.ask(&contrary, &Substitution::new(), 1) {
                    Search::Failed => {}
                    Search::Proved(_) => {
                        tracing::debug!(goal = %goal, contrary = %contrary, "defaults: blocked by contrary evidence");
                        continue;
                    }
                    Search::Exhausted => {
                        cut_off = true;
                        continue;
                    }
                }
                match self.competing_default(&contrary, original.priority()) {
                    Search::Failed => {}
                    Search::Proved(_) => {
                        tracing::debug!(goal = %goal, contrary = %contrary, "defaults: blocked by competing default");
                        continue;
                    }
                    Search::Exhausted => {
                        cut_off = true;
                        continue;
                    }
                }

                tracing::trace!(goal = %goal, rule = %original, "defaults: default applied");
                self.record(conclusion);
                return Search::Proved(proof);
            }
        }
        if cut_off {
            Search::Exhausted
        } else {
            Search::Failed
        }
    }

    /// Proved if some default with at least `priority` concludes `contrary`
    /// from a provable, non-excepted premise instance.
    fn competing_default(&mut self, contrary: &Predicate, priority: Certainty) -> Search {
        let kb = self.kb;
        let mut cut_off = false;
        for original in kb.default_rules.iter().filter(|r| r.priority() >= priority) {
            let rule = self.renamer.standardize_default(original);
            let Some(bound) = unify_predicates(rule.conclusion(), contrary, &Substitution::new()) else {
                continue;
            };
            let premise = bound.apply(rule.premise());
            let proofs = self.solve(&premise, &bound, 1);
            cut_off |= proofs.cut_off;
            if let Some(proof) = proofs
                .found
                .into_iter()
                .find(|p| !kb.is_excepted(original, &p.apply(rule.premise())))
            {
                return Search::Proved(proof);
            }
        }
        if cut_off {
            Search::Exhausted
        } else {
            Search::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::certainty::Certainty;
    use crate::inference::backward::{ProofSearch, Search};
    use crate::inference::standardize::VariableRenamer;
    use crate::inference::EngineConfig;
    use crate::knowledge_base::{DefaultException, KbSnapshot, StoredFact};
    use crate::rule::{DefaultRule, Rule};
    use crate::substitution::Substitution;
    use crate::term::{Predicate, Term};

    fn unary(name: &str, arg: &str) -> Predicate {
        Predicate::new(name, [Term::constant(arg)])
    }

    fn bird_flies() -> DefaultRule {
        DefaultRule::new(
            Predicate::new("Bird", [Term::var("x")]),
            Predicate::new("Flies", [Term::var("x")]),
        )
    }

    fn snapshot(facts: &[Predicate]) -> KbSnapshot {
        KbSnapshot {
            facts: facts
                .iter()
                .cloned()
                .map(|predicate| StoredFact {
                    predicate,
                    annotation: None,
                })
                .collect(),
            rules: vec![Rule::new(
                Predicate::new("Penguin", [Term::var("x")]),
                Predicate::new("Bird", [Term::var("x")]),
            )],
            default_rules: vec![bird_flies()],
            ..KbSnapshot::default()
        }
    }

    fn run(kb: &KbSnapshot, goal: &Predicate) -> (Search, usize) {
        let renamer = VariableRenamer::new();
        let mut search = ProofSearch::new(kb, &renamer, &EngineConfig::default());
        let result = search.ask_default(goal);
        (result, search.derived.len())
    }

    #[test]
    fn default_fires_without_contrary_evidence() {
        let kb = snapshot(&[unary("Bird", "Tweety")]);
        let (result, derived) = run(&kb, &unary("Flies", "Tweety"));
        assert!(matches!(result, Search::Proved(_)));
        assert_eq!(derived, 1);
    }

    #[test]
    fn contrary_fact_blocks_default() {
        let kb = snapshot(&[unary("Penguin", "Tux"), unary("NotFlies", "Tux")]);
        let (result, _) = run(&kb, &unary("Flies", "Tux"));
        assert_eq!(result, Search::Failed);
    }

    #[test]
    fn unprovable_premise_does_not_fire() {
        let kb = snapshot(&[unary("Fish", "Nemo")]);
        let (result, derived) = run(&kb, &unary("Flies", "Nemo"));
        assert_eq!(result, Search::Failed);
        assert_eq!(derived, 0);
    }

    #[test]
    fn exception_scopes_default_to_other_entities() {
        let mut kb = snapshot(&[unary("Bird", "Tweety"), unary("Bird", "Pingu")]);
        kb.exceptions.push(DefaultException {
            rule: bird_flies(),
            excluded: unary("Bird", "Pingu"),
        });
        assert_eq!(run(&kb, &unary("Flies", "Pingu")).0, Search::Failed);
        assert!(matches!(run(&kb, &unary("Flies", "Tweety")).0, Search::Proved(_)));
    }

    fn penguin_not_flies() -> DefaultRule {
        DefaultRule::new(
            Predicate::new("Penguin", [Term::var("x")]),
            Predicate::new("NotFlies", [Term::var("x")]),
        )
    }

    fn with_defaults(facts: &[Predicate], defaults: Vec<DefaultRule>) -> KbSnapshot {
        KbSnapshot {
            default_rules: defaults,
            ..snapshot(facts)
        }
    }

    #[test]
    fn equal_priority_defaults_block_each_other() {
        let kb = with_defaults(&[unary("Penguin", "Tux")], vec![bird_flies(), penguin_not_flies()]);
        assert_eq!(run(&kb, &unary("Flies", "Tux")).0, Search::Failed);
        assert_eq!(run(&kb, &unary("NotFlies", "Tux")).0, Search::Failed);
    }

    #[test]
    fn higher_priority_default_wins() {
        let weak = bird_flies().with_priority(Certainty::new(0.6).unwrap());
        let strong = penguin_not_flies().with_priority(Certainty::new(0.9).unwrap());
        let kb = with_defaults(&[unary("Penguin", "Tux"), unary("Bird", "Tweety")], vec![weak, strong]);
        assert_eq!(run(&kb, &unary("Flies", "Tux")).0, Search::Failed);
        assert!(matches!(run(&kb, &unary("NotFlies", "Tux")).0, Search::Proved(_)));
        // No competitor applies to a plain bird.
        assert!(matches!(run(&kb, &unary("Flies", "Tweety")).0, Search::Proved(_)));
    }

    #[test]
    fn excepted_competitor_does_not_block() {
        let mut kb = with_defaults(&[unary("Penguin", "Tux")], vec![bird_flies(), penguin_not_flies()]);
        kb.exceptions.push(DefaultException {
            rule: penguin_not_flies(),
            excluded: unary("Penguin", "Tux"),
        });
        assert!(matches!(run(&kb, &unary("Flies", "Tux")).0, Search::Proved(_)));
    }

    #[test]
    fn open_goal_tries_every_premise_instance() {
        let kb = snapshot(&[unary("Bird", "Alpha"), unary("NotFlies", "Alpha"), unary("Bird", "Beta")]);
        let goal = Predicate::new("Flies", [Term::var("who")]);
        let Search::Proved(proof) = run(&kb, &goal).0 else {
            panic!("expected a proof for Beta");
        };
        assert_eq!(proof.apply(&goal), unary("Flies", "Beta"));
        assert_ne!(proof, Substitution::new());
    }
}
