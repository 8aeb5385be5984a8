use std::collections::BTreeSet;
use std::sync::Arc;

use kyrologic::{
    happens_at, unify, DefaultRule, EngineConfig, InferenceEngine, KnowledgeBase, Predicate,
    ProofOutcome, Query, Reasoner, ReasonerConfig, Reasoning, Rule, Substitution, TemporalQuery,
    Term,
};

fn unary(name: &str, arg: Term) -> Predicate {
    Predicate::new(name, [arg])
}

fn c(name: &str) -> Term {
    Term::constant(name)
}

fn bird_flies() -> DefaultRule {
    DefaultRule::new(unary("Bird", Term::var("x")), unary("Flies", Term::var("x")))
}

#[test]
fn unification_is_symmetric() {
    let pairs = [
        (
            Term::Predicate(Predicate::new("Knows", [Term::var("x"), c("Bob")])),
            Term::Predicate(Predicate::new("Knows", [c("Alice"), Term::var("y")])),
        ),
        (Term::var("x"), c("Alice")),
        (
            Term::Predicate(Predicate::new("P", [Term::var("x"), Term::var("x")])),
            Term::Predicate(Predicate::new("P", [c("A"), c("B")])),
        ),
    ];
    for (x, y) in pairs {
        let xy = unify(&x, &y, &Substitution::new());
        let yx = unify(&y, &x, &Substitution::new());
        assert_eq!(xy.is_some(), yx.is_some());
        if let (Some(a), Some(b)) = (xy, yx) {
            assert_eq!(a.apply_term(&x), b.apply_term(&x));
            assert_eq!(a.apply_term(&y), b.apply_term(&y));
        }
    }
}

#[test]
fn occurs_check_rejects_cyclic_binding() {
    let x = Term::var("x");
    let fx = Term::Predicate(Predicate::new("f", [Term::var("x")]));
    assert!(unify(&x, &fx, &Substitution::new()).is_none());
    assert!(unify(&fx, &x, &Substitution::new()).is_none());
}

#[test]
fn backward_chaining_is_sound() {
    let reasoner = Reasoner::new();
    reasoner.add_fact(unary("Human", c("Socrates"))).unwrap();
    reasoner
        .add_rule(Rule::new(unary("Human", Term::var("x")), unary("Mortal", Term::var("x"))))
        .unwrap();

    let yes = reasoner.query(unary("Mortal", c("Socrates"))).unwrap();
    assert!(yes.is_true());
    assert_eq!(yes.reasoning, Reasoning::Rule);

    let no = reasoner.query(unary("Mortal", c("Plato"))).unwrap();
    assert_eq!(no.outcome, ProofOutcome::NotProved);

    let stats = reasoner.get_statistics().unwrap();
    assert_eq!(stats.derived_facts, 1);
    assert_eq!(stats.facts, 1);
}

#[test]
fn default_reasoning_with_override() {
    let reasoner = Reasoner::new();
    reasoner.add_fact(unary("Bird", c("Tweety"))).unwrap();
    reasoner.add_default_rule(bird_flies()).unwrap();
    let tweety = reasoner.query(unary("Flies", c("Tweety"))).unwrap();
    assert!(tweety.is_true());
    assert_eq!(tweety.reasoning, Reasoning::Default);

    let reasoner = Reasoner::new();
    reasoner.add_fact(unary("Penguin", c("Tux"))).unwrap();
    reasoner.add_fact(unary("NotFlies", c("Tux"))).unwrap();
    reasoner
        .add_rule(Rule::new(unary("Penguin", Term::var("x")), unary("Bird", Term::var("x"))))
        .unwrap();
    reasoner.add_default_rule(bird_flies()).unwrap();
    assert!(!reasoner.query(unary("Flies", c("Tux"))).unwrap().is_true());
    assert!(reasoner.query(unary("Bird", c("Tux"))).unwrap().is_true());
}

#[test]
fn temporal_ordering() {
    let reasoner = Reasoner::new();
    let login = unary("Login", c("UserA"));
    let logout = unary("Logout", c("UserA"));
    reasoner.add_fact(happens_at(login.clone(), 100)).unwrap();
    reasoner.add_fact(happens_at(logout.clone(), 200)).unwrap();

    let before = Predicate::new(
        "Before",
        [Term::Predicate(login.clone()), Term::Predicate(logout.clone())],
    );
    let answer = reasoner.query(before).unwrap();
    assert!(answer.is_true());
    assert_eq!(answer.reasoning, Reasoning::Temporal);

    assert!(reasoner
        .query(TemporalQuery::after(logout.clone(), login.clone()))
        .unwrap()
        .is_true());
    assert!(!reasoner.query(TemporalQuery::after(login, logout)).unwrap().is_true());

    // Unknown events are undecided, which reads as false.
    let unknown = TemporalQuery::before(unary("Login", c("UserZ")), unary("Logout", c("UserA")));
    assert!(!reasoner.query(unknown).unwrap().is_true());
}

#[test]
fn temporal_facts_are_kept_apart_from_facts() {
    let reasoner = Reasoner::new();
    reasoner.add_fact(happens_at(unary("Login", c("UserA")), 100)).unwrap();
    assert!(reasoner.get_all_facts().unwrap().is_empty());
    assert_eq!(reasoner.get_statistics().unwrap().temporal_facts, 1);

    // Goals over HappensAt itself search the temporal sequence.
    let goal = Predicate::new(
        "HappensAt",
        [Term::Predicate(unary("Login", Term::var("who"))), Term::var("t")],
    );
    let answer = reasoner.query(goal).unwrap();
    assert!(answer.is_true());
    assert_eq!(answer.bindings.to_string(), "{t/100, who/UserA}");
}

#[test]
fn saturation_reaches_fixpoint() {
    let reasoner = Reasoner::new();
    reasoner.tell("Parent(Alice, Bob)").unwrap();
    reasoner.tell("Parent(Bob, Carol)").unwrap();
    reasoner.tell("Parent(x, y) -> Ancestor(x, y)").unwrap();
    reasoner.tell("Ancestor(x, y) -> Related(y, x)").unwrap();

    let first = reasoner.saturate().unwrap();
    assert!(first.reached_fixpoint);
    let expected: BTreeSet<String> = [
        "Ancestor(Alice, Bob)",
        "Ancestor(Bob, Carol)",
        "Related(Bob, Alice)",
        "Related(Carol, Bob)",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    let got: BTreeSet<String> = first.derived.iter().map(ToString::to_string).collect();
    assert_eq!(got, expected);

    let second = reasoner.saturate().unwrap();
    assert!(second.is_empty());
    assert_eq!(reasoner.get_all_facts().unwrap().len(), 6);
}

#[test]
fn recursive_rules_terminate_with_exhausted() {
    let kb = Arc::new(KnowledgeBase::new());
    kb.add_fact(Predicate::new("Edge", [c("A"), c("B")])).unwrap();
    kb.add_rule(Rule::new(
        Predicate::new("Path", [Term::var("x"), Term::var("y")]),
        Predicate::new("Path", [Term::var("y"), Term::var("x")]),
    ))
    .unwrap();
    let engine = InferenceEngine::with_config(
        kb,
        EngineConfig {
            max_depth: 32,
            max_steps: 1_000,
            ..EngineConfig::default()
        },
    );
    let answer = engine
        .query(&Query::from(Predicate::new("Path", [c("A"), c("C")])))
        .unwrap();
    assert_eq!(answer.outcome, ProofOutcome::Exhausted);
}

#[test]
fn standardizing_apart_keeps_branches_independent() {
    // Both uses of the rule need different bindings for x.
    let reasoner = Reasoner::new();
    reasoner.tell("Human(Socrates)").unwrap();
    reasoner.tell("Human(Plato)").unwrap();
    reasoner.tell("Human(x) -> Mortal(x)").unwrap();
    reasoner.tell("Mortal(x) -> Finite(x)").unwrap();

    assert!(reasoner.ask("Finite(Socrates)").unwrap().is_true());
    assert!(reasoner.ask("Finite(Plato)").unwrap().is_true());
    let open = reasoner.ask("Finite(who)").unwrap();
    assert_eq!(open.bindings.to_string(), "{who/Plato}");
}

#[test]
fn concurrent_queries_share_one_engine() {
    let reasoner = Arc::new(Reasoner::with_config(
        Arc::new(KnowledgeBase::new()),
        ReasonerConfig::default(),
    ));
    for i in 0..20 {
        reasoner.add_fact(unary("Human", c(&format!("H{i}")))).unwrap();
    }
    reasoner.tell("Human(x) -> Mortal(x)").unwrap();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let reasoner = Arc::clone(&reasoner);
            std::thread::spawn(move || {
                (0..20)
                    .filter(|i| i % 4 == t)
                    .all(|i| reasoner.query(unary("Mortal", c(&format!("H{i}")))).unwrap().is_true())
            })
        })
        .collect();
    for h in handles {
        assert!(h.join().unwrap());
    }
    assert_eq!(reasoner.get_statistics().unwrap().derived_facts, 20);
}

#[test]
fn competing_defaults_respect_priority() {
    let reasoner = Reasoner::new();
    reasoner.tell("Penguin(Tux)").unwrap();
    reasoner.tell("Bird(Tweety)").unwrap();
    reasoner.tell("Penguin(x) -> Bird(x)").unwrap();
    reasoner.tell("Bird(x) ~> Flies(x)").unwrap();
    reasoner.tell("Penguin(x) ~> NotFlies(x)").unwrap();

    // Equal priorities cancel out.
    assert!(!reasoner.ask("Flies(Tux)").unwrap().is_true());
    assert!(!reasoner.ask("NotFlies(Tux)").unwrap().is_true());
    assert!(reasoner.ask("Flies(Tweety)").unwrap().is_true());

    let reasoner = Reasoner::new();
    reasoner.tell("Penguin(Tux)").unwrap();
    reasoner.tell("Penguin(x) -> Bird(x)").unwrap();
    reasoner.tell("Bird(x) ~> Flies(x) @ 0.6").unwrap();
    reasoner.tell("Penguin(x) ~> NotFlies(x) @ 0.9").unwrap();
    assert!(!reasoner.ask("Flies(Tux)").unwrap().is_true());
    let answer = reasoner.ask("NotFlies(Tux)").unwrap();
    assert!(answer.is_true());
    assert_eq!(answer.reasoning, Reasoning::Default);
}

#[test]
fn open_default_goal_skips_blocked_entities() {
    let reasoner = Reasoner::new();
    reasoner.tell("Bird(Alpha)").unwrap();
    reasoner.tell("NotFlies(Alpha)").unwrap();
    reasoner.tell("Bird(Beta)").unwrap();
    reasoner.add_default_rule(bird_flies()).unwrap();

    let answer = reasoner.ask("Flies(who)").unwrap();
    assert!(answer.is_true());
    assert_eq!(answer.reasoning, Reasoning::Default);
    assert_eq!(answer.bindings.to_string(), "{who/Beta}");
}
