use kyrologic::{
    Annotation, Certainty, ConflictKind, FactValidation, Predicate, Reasoner, ResolutionAction,
    Term,
};

fn unary(name: &str, arg: &str) -> Predicate {
    Predicate::new(name, [Term::constant(arg)])
}

fn sure(value: f32) -> Annotation {
    Annotation::from_value(value, "observer").unwrap()
}

fn birds() -> Reasoner {
    let reasoner = Reasoner::new();
    reasoner.tell("Bird(Tux)").unwrap();
    reasoner.tell("Bird(Tweety)").unwrap();
    reasoner.tell("Bird(x) ~> Flies(x)").unwrap();
    reasoner
}

#[test]
fn more_certain_candidate_retracts_existing() {
    let reasoner = birds();
    reasoner
        .add_annotated_fact(unary("NotFlies", "Tux"), sure(0.85))
        .unwrap();

    let outcome = reasoner
        .assert_checked(unary("Flies", "Tux"), sure(0.95))
        .unwrap();
    assert!(outcome.inserted);
    let record = outcome.resolution.unwrap();
    assert!(record.strategy.actions.contains(&ResolutionAction::RetractFact {
        fact: unary("NotFlies", "Tux")
    }));

    let facts = reasoner.get_all_facts().unwrap();
    assert!(facts.contains(&unary("Flies", "Tux")));
    assert!(!facts.contains(&unary("NotFlies", "Tux")));
}

#[test]
fn less_certain_candidate_is_rejected() {
    let reasoner = birds();
    reasoner
        .add_annotated_fact(unary("NotFlies", "Tux"), sure(0.95))
        .unwrap();

    let outcome = reasoner
        .assert_checked(unary("Flies", "Tux"), sure(0.85))
        .unwrap();
    assert!(!outcome.inserted);
    let facts = reasoner.get_all_facts().unwrap();
    assert!(facts.contains(&unary("NotFlies", "Tux")));
    assert!(!facts.contains(&unary("Flies", "Tux")));
}

#[test]
fn equal_certainty_retracts_both_and_flags_review() {
    let reasoner = birds();
    reasoner
        .add_annotated_fact(unary("NotFlies", "Tux"), sure(0.9))
        .unwrap();

    let outcome = reasoner
        .assert_checked(unary("Flies", "Tux"), sure(0.9))
        .unwrap();
    assert!(!outcome.inserted);
    assert!(outcome.resolution.unwrap().requires_review());

    let facts = reasoner.get_all_facts().unwrap();
    assert!(!facts.contains(&unary("NotFlies", "Tux")));
    assert!(!facts.contains(&unary("Flies", "Tux")));
}

#[test]
fn resolution_is_deterministic() {
    // The same inputs always produce the same plan.
    let plans: Vec<Vec<String>> = (0..3)
        .map(|_| {
            let reasoner = birds();
            reasoner
                .add_annotated_fact(unary("NotFlies", "Tux"), sure(0.85))
                .unwrap();
            let report = reasoner
                .check_consistency(&unary("Flies", "Tux"), Certainty::new(0.95).unwrap())
                .unwrap();
            report.strategy.actions.iter().map(ToString::to_string).collect()
        })
        .collect();
    assert_eq!(plans[0], plans[1]);
    assert_eq!(plans[1], plans[2]);
}

#[test]
fn default_violation_becomes_an_exception() {
    let reasoner = birds();
    assert!(reasoner.ask("Flies(Tux)").unwrap().is_true());

    let validation = reasoner
        .validate_new_fact(&unary("NotFlies", "Tux"), Certainty::new(0.9).unwrap())
        .unwrap();
    let FactValidation::Conflicting { report } = validation else {
        panic!("expected a default violation");
    };
    assert!(matches!(
        &report.conflicts[0].kind,
        ConflictKind::DefaultViolation { expected, .. } if *expected == unary("Flies", "Tux")
    ));

    let record = reasoner.resolve_conflict(&report).unwrap().unwrap();
    assert_eq!(record.applied.len(), 1);
    assert_eq!(reasoner.knowledge_base().exceptions().unwrap().len(), 1);

    // The rule is scoped away from Tux only.
    assert!(!reasoner.ask("Flies(Tux)").unwrap().is_true());
    assert!(reasoner.ask("Flies(Tweety)").unwrap().is_true());

    // With the exception in place the fact is consistent.
    let outcome = reasoner
        .assert_checked(unary("NotFlies", "Tux"), sure(0.9))
        .unwrap();
    assert!(outcome.inserted);
    assert!(outcome.validation.is_valid());
}

#[test]
fn low_certainty_is_rejected_before_detection() {
    let reasoner = birds();
    let outcome = reasoner
        .assert_checked(unary("NotFlies", "Tweety"), sure(0.5))
        .unwrap();
    assert!(!outcome.inserted);
    assert!(matches!(outcome.validation, FactValidation::BelowThreshold { .. }));
    assert!(reasoner.resolver().resolution_history().unwrap().is_empty());
}

#[test]
fn non_ground_candidate_is_a_validation_error() {
    let reasoner = birds();
    let err = reasoner
        .assert_checked(Predicate::new("Flies", [Term::var("x")]), sure(0.9))
        .unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn auto_correct_resolves_contradictions_before_violations() {
    let reasoner = birds();
    reasoner
        .add_annotated_fact(unary("Flies", "Tux"), sure(0.95))
        .unwrap();
    reasoner
        .add_annotated_fact(unary("NotFlies", "Tux"), sure(0.7))
        .unwrap();

    let sweep = reasoner.sweep().unwrap();
    assert!(sweep.inconsistencies[0].is_contradiction());
    assert_eq!(sweep.inconsistencies.len(), 2);

    let report = reasoner.auto_correct().unwrap();
    // NotFlies(Tux) loses the contradiction, so its default violation needs
    // no exception.
    assert_eq!(report.corrections(), 1);
    assert!(reasoner.knowledge_base().exceptions().unwrap().is_empty());
    assert!(!reasoner
        .get_all_facts()
        .unwrap()
        .contains(&unary("NotFlies", "Tux")));

    assert!(!reasoner.sweep().unwrap().has_inconsistencies());
    let again = reasoner.auto_correct().unwrap();
    assert_eq!(again.corrections(), 0);
    assert!(again.resolution.is_none());
}

#[test]
fn status_tracks_history() {
    let reasoner = birds();
    let empty = reasoner.resolver_status().unwrap();
    assert_eq!(empty.resolutions, 0);
    assert!(empty.last_sweep.is_none());

    reasoner
        .assert_checked(unary("NotFlies", "Tux"), sure(0.9))
        .unwrap();
    reasoner.sweep().unwrap();

    let status = reasoner.resolver_status().unwrap();
    assert_eq!(status.default_rules, 1);
    assert_eq!(status.exceptions, 1);
    assert_eq!(status.resolutions, 1);
    assert_eq!(status.corrections, 1);
    assert!(status.last_sweep.is_some());
    assert_eq!(reasoner.resolver().resolution_history().unwrap().len(), 1);
}
