//! Workers recording into a shared tree from separate threads.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::begun_recorder;
use probar_recorder::{NodeMeta, RecorderConfig};
use std::collections::BTreeSet;
use std::sync::{Arc, Barrier};
use std::thread;

const ITERATIONS: usize = 200;

#[test]
fn test_two_workers_add_tests_to_same_suite() {
    for _ in 0..ITERATIONS {
        let (recorder, _) = begun_recorder(RecorderConfig::default());
        let suite = recorder.add_suite(NodeMeta::new("shared")).unwrap();
        let barrier = Arc::new(Barrier::new(2));

        let workers: Vec<_> = ["worker_a", "worker_b"]
            .into_iter()
            .map(|name| {
                let suite = suite.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let test = suite.add_test(NodeMeta::new(name)).unwrap();
                    test.pass().unwrap();
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        suite.close().unwrap();

        let report = recorder.finish().unwrap();
        let tests = &report.suites[0].tests;
        assert_eq!(tests.len(), 2);
        let names: BTreeSet<&str> = tests.iter().map(|t| t.name()).collect();
        assert_eq!(names, BTreeSet::from(["worker_a", "worker_b"]));
    }
}

#[test]
fn test_parallel_appends_to_one_step_lose_nothing() {
    const WORKERS: usize = 8;
    const PER_WORKER: usize = 100;

    let (recorder, _) = begun_recorder(RecorderConfig::default());
    let suite = recorder.add_suite(NodeMeta::new("s")).unwrap();
    let test = suite.add_test(NodeMeta::new("t")).unwrap();
    let step = test.add_step("shared step").unwrap();

    let workers: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let step = step.clone();
            thread::spawn(move || {
                for i in 0..PER_WORKER {
                    step.check(format!("{worker}:{i}"), true).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    step.close().unwrap();
    test.pass().unwrap();
    suite.close().unwrap();

    let report = recorder.finish().unwrap();
    let entries = &report.suites[0].tests[0].steps[0].entries;
    assert_eq!(entries.len(), WORKERS * PER_WORKER);

    // Each worker's own entries stay in the order it issued them.
    for worker in 0..WORKERS {
        let prefix = format!("{worker}:");
        let own: Vec<usize> = entries
            .iter()
            .filter_map(|entry| match entry {
                probar_recorder::StepEntry::Check { description, .. } => description
                    .strip_prefix(&prefix)
                    .and_then(|i| i.parse().ok()),
                _ => None,
            })
            .collect();
        assert_eq!(own, (0..PER_WORKER).collect::<Vec<_>>());
    }
}

#[test]
fn test_disjoint_subtrees_in_parallel() {
    let (recorder, _) = begun_recorder(RecorderConfig::default());
    let workers: Vec<_> = (0..4)
        .map(|i| {
            let recorder = recorder.clone();
            thread::spawn(move || {
                let suite = recorder.add_suite(NodeMeta::new(format!("suite_{i}"))).unwrap();
                for t in 0..25 {
                    let test = suite.add_test(NodeMeta::new(format!("test_{t}"))).unwrap();
                    let step = test.add_step("work").unwrap();
                    step.check("ok", true).unwrap();
                    step.close().unwrap();
                    test.pass().unwrap();
                }
                suite.close().unwrap();
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let report = recorder.finish().unwrap();
    assert_eq!(report.suites.len(), 4);
    assert_eq!(report.all_tests().len(), 100);
    for suite in &report.suites {
        let names: Vec<String> = suite.tests.iter().map(|t| t.meta.name.clone()).collect();
        let expected: Vec<String> = (0..25).map(|t| format!("test_{t}")).collect();
        assert_eq!(names, expected);
    }
    assert!(report.is_successful());
}
