use std::sync::Arc;
use std::time::Duration;

use kyrologic::{
    happens_at, ExecutionPath, Predicate, ProofOutcome, Query, QueryRouter, QueryRuntime,
    Reasoner, RuntimeConfig, TemporalQuery, Term,
};

fn unary(name: &str, arg: &str) -> Predicate {
    Predicate::new(name, [Term::constant(arg)])
}

fn reasoner() -> Reasoner {
    let reasoner = Reasoner::new();
    for i in 0..50 {
        reasoner.add_fact(unary("Human", &format!("H{i}"))).unwrap();
    }
    reasoner.tell("Human(x) -> Mortal(x)").unwrap();
    reasoner
        .add_fact(happens_at(unary("Login", "UserA"), 100))
        .unwrap();
    reasoner
        .add_fact(happens_at(unary("Logout", "UserA"), 200))
        .unwrap();
    reasoner
}

#[test]
fn runtime_routes_and_answers() {
    let reasoner = reasoner();
    let runtime = reasoner.start_runtime(RuntimeConfig::default()).unwrap();

    let goal = runtime.submit(unary("Mortal", "H7")).unwrap();
    assert_eq!(goal.path(), ExecutionPath::Search);
    assert!(goal.join().unwrap().is_true());

    let temporal = runtime
        .submit(TemporalQuery::before(unary("Login", "UserA"), unary("Logout", "UserA")))
        .unwrap();
    assert_eq!(temporal.path(), ExecutionPath::Lookup);
    assert!(temporal.join_timeout(Duration::from_secs(5)).unwrap().is_true());

    let missing = runtime.query(unary("Mortal", "Zeus")).unwrap();
    assert_eq!(missing.outcome, ProofOutcome::NotProved);
}

#[test]
fn many_submissions_complete() {
    let reasoner = reasoner();
    let runtime = reasoner
        .start_runtime(RuntimeConfig {
            lookup_workers: 1,
            search_workers: 4,
            queue_capacity: 128,
        })
        .unwrap();

    let handles: Vec<_> = (0..50)
        .map(|i| runtime.submit(unary("Mortal", &format!("H{i}"))).unwrap())
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap().is_true());
    }
    assert_eq!(reasoner.get_statistics().unwrap().derived_facts, 50);
}

#[test]
fn runtime_is_shared_across_threads() {
    let reasoner = reasoner();
    let runtime = Arc::new(reasoner.start_runtime(RuntimeConfig::default()).unwrap());

    let threads: Vec<_> = (0..4)
        .map(|t| {
            let runtime = Arc::clone(&runtime);
            std::thread::spawn(move || {
                (0..10).all(|i| {
                    runtime
                        .query(unary("Mortal", &format!("H{}", t * 10 + i)))
                        .unwrap()
                        .is_true()
                })
            })
        })
        .collect();
    for t in threads {
        assert!(t.join().unwrap());
    }
}

struct EverythingSearches;

impl QueryRouter for EverythingSearches {
    fn route(&self, _query: &Query) -> ExecutionPath {
        ExecutionPath::Search
    }
}

#[test]
fn custom_router_selects_pool() {
    let reasoner = reasoner();
    let runtime = QueryRuntime::with_router(
        Arc::clone(reasoner.engine()),
        EverythingSearches,
        RuntimeConfig::default(),
    )
    .unwrap();

    let handle = runtime
        .submit(TemporalQuery::after(unary("Logout", "UserA"), unary("Login", "UserA")))
        .unwrap();
    assert_eq!(handle.path(), ExecutionPath::Search);
    assert!(handle.join().unwrap().is_true());
}
