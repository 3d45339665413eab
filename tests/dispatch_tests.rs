//! Dispatcher tests against an instrumented engine: result independence from worker count,
//! exactly-once delivery, partial failure, cancellation, edge cases.

use anyhow::{Result, bail};
use homsearch::pipeline::{
    CancelToken, Dispatcher, SearchContext, SearchOpts, concurrency_from_jobs, resolve_concurrency,
};
use homsearch::{Domain, Hit, HitCollection, ScoringEngine, SearchError};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug)]
struct TestQuery {
    name: String,
    /// Added to every score; lets two queries with the same name compete on the same key.
    boost: f32,
}

fn q(name: &str) -> TestQuery {
    TestQuery {
        name: name.to_string(),
        boost: 0.0,
    }
}

fn queries(names: &[&str]) -> Vec<TestQuery> {
    names.iter().map(|n| q(n)).collect()
}

/// Deterministic engine: one hit per target whose score depends on the query and target bytes.
#[derive(Default)]
struct TestEngine {
    calls: AtomicUsize,
    per_query: Mutex<HashMap<String, usize>>,
    fail_on: HashSet<String>,
    panic_on: HashSet<String>,
    /// Queries whose `query_name` panics.
    unnamed: HashSet<String>,
    cancel_on: Option<(String, CancelToken)>,
}

impl TestEngine {
    fn failing(names: &[&str]) -> Self {
        Self {
            fail_on: names.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn score_of(query: &str, target: &str) -> f32 {
    let sum: u32 = query.bytes().chain(target.bytes()).map(u32::from).sum();
    (sum % 97) as f32
}

impl ScoringEngine for TestEngine {
    type Query = TestQuery;
    type Target = String;
    type Scratch = Vec<f32>;

    fn new_scratch(&self) -> Vec<f32> {
        Vec::new()
    }

    fn query_name(&self, query: &TestQuery) -> String {
        if self.unnamed.contains(&query.name) {
            panic!("no name for {}", query.name);
        }
        query.name.clone()
    }

    fn search(
        &self,
        scratch: &mut Vec<f32>,
        query: &TestQuery,
        targets: &[String],
        hits: &mut HitCollection,
    ) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .per_query
            .lock()
            .unwrap()
            .entry(query.name.clone())
            .or_default() += 1;
        if let Some((name, token)) = &self.cancel_on
            && *name == query.name
        {
            token.cancel();
        }
        scratch.clear();
        for target in targets {
            let score = score_of(&query.name, target) + query.boost;
            scratch.push(score);
            hits.insert(Hit {
                query: query.name.clone(),
                target: target.clone(),
                score,
                evalue: 1.0 / (1.0 + score as f64),
                domains: vec![Domain {
                    query_from: 1,
                    query_to: query.name.len(),
                    target_from: 1,
                    target_to: target.len(),
                    score,
                    evalue: 1.0 / (1.0 + score as f64),
                }],
            });
            // Partial write before failing: must not reach the final result.
            if self.fail_on.contains(&query.name) {
                bail!("malformed query {}", query.name);
            }
            if self.panic_on.contains(&query.name) {
                panic!("engine blew up on {}", query.name);
            }
        }
        Ok(())
    }
}

fn corpus() -> Vec<String> {
    ["alpha", "beta", "gamma", "delta", "epsilon"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn many_queries(n: usize) -> Vec<TestQuery> {
    (0..n).map(|i| q(&format!("query{i:03}"))).collect()
}

/// Run each query alone through the engine with an empty accumulator and combine the results.
fn single_query_union(names: &[&str], targets: &[String]) -> HitCollection {
    let engine = TestEngine::default();
    let mut ctx = SearchContext::new(&engine);
    HitCollection::merge_all(
        names
            .iter()
            .map(|n| ctx.search(&q(n), targets).unwrap()),
    )
}

// --- concurrency resolution ---

#[test]
fn test_resolve_concurrency() {
    assert_eq!(resolve_concurrency(Some(3)).unwrap(), 3);
    assert!(resolve_concurrency(None).unwrap() >= 1);
    assert!(matches!(
        resolve_concurrency(Some(0)),
        Err(SearchError::ConcurrencyConfig { requested: 0 })
    ));
}

#[test]
fn test_concurrency_from_jobs() {
    assert_eq!(concurrency_from_jobs(0).unwrap(), None);
    assert_eq!(concurrency_from_jobs(4).unwrap(), Some(4));
    assert!(matches!(
        concurrency_from_jobs(-2),
        Err(SearchError::ConcurrencyConfig { requested: -2 })
    ));
}

#[test]
fn test_zero_concurrency_rejected_before_any_work() {
    let engine = TestEngine::default();
    let err = Dispatcher::new(&engine)
        .search(queries(&["a", "b"]), &corpus(), Some(0))
        .unwrap_err();
    assert!(matches!(err, SearchError::ConcurrencyConfig { .. }));
    assert_eq!(engine.calls(), 0);
}

// --- results ---

#[test]
fn test_four_queries_two_workers_equals_single_query_union() {
    let names = ["q1", "q2", "q3", "q4"];
    let targets = corpus();
    let engine = TestEngine::default();
    let hits = Dispatcher::new(&engine)
        .search(queries(&names), &targets, Some(2))
        .unwrap();
    assert_eq!(hits, single_query_union(&names, &targets));
    assert_eq!(hits.len(), 4 * targets.len());
    assert_eq!(hits.stats().queries_searched, 4);
}

#[test]
fn test_result_independent_of_worker_count() {
    let targets = corpus();
    let baseline = Dispatcher::new(&TestEngine::default())
        .search(many_queries(40), &targets, Some(1))
        .unwrap();
    for n in [2, 3, 4, 8, 16] {
        let hits = Dispatcher::new(&TestEngine::default())
            .search(many_queries(40), &targets, Some(n))
            .unwrap();
        assert_eq!(hits, baseline, "concurrency {n} changed the result");
    }
}

#[test]
fn test_duplicate_keys_resolved_by_precedence_for_any_worker_count() {
    let targets = corpus();
    let input = || {
        (0..10).map(|i| TestQuery {
            name: "shared".to_string(),
            boost: i as f32,
        })
    };
    let baseline = Dispatcher::new(&TestEngine::default())
        .search(input(), &targets, Some(1))
        .unwrap();
    for n in [2, 5] {
        let hits = Dispatcher::new(&TestEngine::default())
            .search(input(), &targets, Some(n))
            .unwrap();
        assert_eq!(hits, baseline);
    }
    for t in &targets {
        let h = baseline.get("shared", t).unwrap();
        assert_eq!(h.score, score_of("shared", t) + 9.0);
    }
}

#[test]
fn test_each_query_searched_exactly_once() {
    const M: usize = 64;
    for n in [1, 3, 7] {
        let engine = TestEngine::default();
        Dispatcher::new(&engine)
            .search(many_queries(M), &corpus(), Some(n))
            .unwrap();
        assert_eq!(engine.calls(), M);
        let per_query = engine.per_query.lock().unwrap();
        assert_eq!(per_query.len(), M);
        assert!(per_query.values().all(|&c| c == 1));
    }
}

#[test]
fn test_empty_queries_returns_empty_collection() {
    for n in [1, 4] {
        let engine = TestEngine::default();
        let hits = Dispatcher::new(&engine)
            .search(Vec::new(), &corpus(), Some(n))
            .unwrap();
        assert!(hits.is_empty());
        assert_eq!(engine.calls(), 0);
    }
}

#[test]
fn test_more_workers_than_queries() {
    let engine = TestEngine::default();
    let hits = Dispatcher::new(&engine)
        .search(queries(&["only"]), &corpus(), Some(12))
        .unwrap();
    assert_eq!(hits.len(), corpus().len());
    assert_eq!(engine.calls(), 1);
}

#[test]
fn test_autodetected_concurrency() {
    let engine = TestEngine::default();
    let hits = Dispatcher::new(&engine)
        .search(many_queries(10), &corpus(), None)
        .unwrap();
    assert_eq!(hits.stats().queries_searched, 10);
}

#[test]
fn test_empty_corpus() {
    let engine = TestEngine::default();
    let hits = Dispatcher::new(&engine)
        .search(queries(&["a", "b"]), &[], Some(2))
        .unwrap();
    assert!(hits.is_empty());
    assert_eq!(hits.stats().queries_searched, 2);
    assert_eq!(hits.stats().targets_searched, 0);
}

// --- failures ---

#[test]
fn test_engine_failure_reports_query_and_keeps_other_hits() {
    let targets = corpus();
    let engine = TestEngine::failing(&["bad"]);
    let err = Dispatcher::new(&engine)
        .search(queries(&["ok1", "bad", "ok2"]), &targets, Some(2))
        .unwrap_err();

    let failures = err.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].index, 1);
    assert_eq!(failures[0].query, "bad");
    assert!(format!("{:#}", failures[0].error).contains("malformed query bad"));
    assert!(err.to_string().contains("bad"));

    let hits = err.into_partial_hits().unwrap();
    assert_eq!(hits, single_query_union(&["ok1", "ok2"], &targets));
    // The hit written before the failure was discarded.
    assert!(hits.iter().all(|h| h.query != "bad"));
    assert_eq!(engine.calls(), 3);
}

#[test]
fn test_failure_message_counts_all_queries() {
    let engine = TestEngine::failing(&["bad"]);
    let err = Dispatcher::new(&engine)
        .search(queries(&["a", "bad", "c"]), &corpus(), Some(2))
        .unwrap_err();
    assert!(err.to_string().starts_with("1 of 3 queries failed"));
    let stats = err.partial_hits().unwrap().stats();
    assert_eq!(stats.queries_searched, 2);
    assert_eq!(stats.targets_searched, 2 * corpus().len());
}

#[test]
fn test_panicking_query_name_is_still_a_query_failure() {
    let engine = TestEngine {
        fail_on: ["bad".to_string()].into_iter().collect(),
        unnamed: ["bad".to_string()].into_iter().collect(),
        ..TestEngine::default()
    };
    let err = Dispatcher::new(&engine)
        .search(queries(&["a", "bad", "c"]), &corpus(), Some(2))
        .unwrap_err();
    assert!(matches!(err, SearchError::EngineFailures { .. }));
    assert_eq!(err.failures()[0].index, 1);
    assert_eq!(err.failures()[0].query, "<query #1>");
    assert_eq!(err.partial_hits().unwrap().stats().queries_searched, 2);
}

#[test]
fn test_every_query_failing_does_not_deadlock() {
    let engine = TestEngine::failing(&["a", "b", "c", "d"]);
    let err = Dispatcher::new(&engine)
        .search(queries(&["a", "b", "c", "d"]), &corpus(), Some(2))
        .unwrap_err();
    let indices: Vec<usize> = err.failures().iter().map(|f| f.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert!(err.partial_hits().unwrap().is_empty());
}

#[test]
fn test_engine_panic_is_captured_as_failure() {
    let engine = TestEngine {
        panic_on: ["boom".to_string()].into_iter().collect(),
        ..TestEngine::default()
    };
    let err = Dispatcher::new(&engine)
        .search(queries(&["a", "boom", "b", "c"]), &corpus(), Some(1))
        .unwrap_err();
    let failures = err.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].query, "boom");
    assert!(failures[0].error.to_string().contains("panicked"));
    // The single worker survived the panic and searched the rest.
    assert_eq!(err.partial_hits().unwrap().stats().queries_searched, 3);
}

// --- cancellation and progress ---

#[test]
fn test_cancellation_skips_remaining_and_keeps_partial_hits() {
    let token = CancelToken::new();
    let engine = TestEngine {
        cancel_on: Some(("stop".to_string(), token.clone())),
        ..TestEngine::default()
    };
    let opts = SearchOpts {
        concurrency: Some(1),
        cancel: Some(token),
        on_progress: None,
    };
    let err = Dispatcher::new(&engine)
        .search_with(queries(&["a", "stop", "b", "c"]), &corpus(), &opts)
        .unwrap_err();
    let SearchError::Cancelled { skipped, hits } = err else {
        panic!("expected cancellation");
    };
    let skipped: Vec<(usize, &str)> = skipped.iter().map(|s| (s.index, s.query.as_str())).collect();
    assert_eq!(skipped, vec![(2, "b"), (3, "c")]);
    assert_eq!(hits.stats().queries_searched, 2);
    assert_eq!(engine.calls(), 2);
}

#[test]
fn test_cancelled_before_start_searches_nothing() {
    let token = CancelToken::new();
    token.cancel();
    let engine = TestEngine::default();
    let opts = SearchOpts {
        concurrency: Some(3),
        cancel: Some(token),
        on_progress: None,
    };
    let err = Dispatcher::new(&engine)
        .search_with(many_queries(5), &corpus(), &opts)
        .unwrap_err();
    assert!(matches!(err, SearchError::Cancelled { ref skipped, .. } if skipped.len() == 5));
    assert_eq!(engine.calls(), 0);
}

#[test]
fn test_progress_called_once_per_query() {
    let settled = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&settled);
    let opts = SearchOpts {
        concurrency: Some(4),
        cancel: None,
        on_progress: Some(Arc::new(move |n| {
            counter.fetch_add(n, Ordering::SeqCst);
        })),
    };
    let engine = TestEngine::failing(&["query003"]);
    let _ = Dispatcher::new(&engine).search_with(many_queries(25), &corpus(), &opts);
    assert_eq!(settled.load(Ordering::SeqCst), 25);
}

#[test]
fn test_worker_dying_outside_engine_is_protocol_error() {
    let opts = SearchOpts {
        concurrency: Some(2),
        cancel: None,
        on_progress: Some(Arc::new(|n: usize| {
            if n > 0 {
                panic!("progress sink failed");
            }
        })),
    };
    let engine = TestEngine::default();
    let err = Dispatcher::new(&engine)
        .search_with(many_queries(5), &corpus(), &opts)
        .unwrap_err();
    let SearchError::QueueProtocol(msg) = err else {
        panic!("expected a queue protocol error, got {err:?}");
    };
    assert!(msg.contains("panicked outside the scoring engine"));
}

#[test]
fn test_streamed_queries_from_lazy_iterator() {
    let engine = TestEngine::default();
    let lazy = (0..30).map(|i| q(&format!("lazy{i}")));
    let hits = Dispatcher::new(&engine)
        .search(lazy, &corpus(), Some(3))
        .unwrap();
    assert_eq!(hits.stats().queries_searched, 30);
    assert_eq!(engine.calls(), 30);
}
