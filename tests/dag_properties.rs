// tests/dag_properties.rs

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;

use sitedag::dag::TaskRegistry;
use sitedag::engine::Runner;
use sitedag_test_utils::fake_executor::FakeExecutor;
use sitedag_test_utils::recording::{ActionLog, recording_action};

/// Random DAG as `deps[i]` = prerequisites of `task_i`.
///
/// Acyclic by construction: task N may only depend on tasks 0..N-1.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, potential)| {
                    let deps: HashSet<usize> = if i == 0 {
                        HashSet::new()
                    } else {
                        potential.into_iter().map(|d| d % i).collect()
                    };
                    let mut deps: Vec<usize> = deps.into_iter().collect();
                    deps.sort_unstable();
                    deps
                })
                .collect()
        })
    })
}

fn name(i: usize) -> String {
    format!("task_{i}")
}

/// Transitive prerequisite closure of `target`, including itself.
fn closure(deps: &[Vec<usize>], target: usize) -> HashSet<usize> {
    let mut seen = HashSet::new();
    let mut stack = vec![target];
    while let Some(t) = stack.pop() {
        if seen.insert(t) {
            stack.extend(deps[t].iter().copied());
        }
    }
    seen
}

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
        .block_on(f)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_prerequisite_runs_exactly_once_and_before_its_dependents(
        deps in dag_strategy(12),
        target_seed in any::<usize>(),
    ) {
        let target = target_seed % deps.len();
        let log = ActionLog::new();
        let mut registry = TaskRegistry::new();
        for (i, ds) in deps.iter().enumerate() {
            let ds: Vec<String> = ds.iter().map(|&d| name(d)).collect();
            let ds: Vec<&str> = ds.iter().map(String::as_str).collect();
            registry.register(&name(i), &ds, Some(recording_action(&log, &name(i))));
        }
        prop_assert!(registry.validate().is_ok());

        block_on(Runner::new(registry).run(&name(target))).unwrap();

        let events = log.events();
        let expected = closure(&deps, target);
        prop_assert_eq!(events.len(), expected.len());

        let position: HashMap<&str, usize> =
            events.iter().enumerate().map(|(i, e)| (e.as_str(), i)).collect();
        prop_assert_eq!(position.len(), events.len(), "a task ran twice: {:?}", events);

        for &t in &expected {
            let t_name = name(t);
            let t_pos = position[t_name.as_str()];
            for &d in &deps[t] {
                let d_name = name(d);
                prop_assert!(position[d_name.as_str()] < t_pos, "{} ran after {}", d_name, t_name);
            }
        }
    }

    #[test]
    fn fake_executor_dispatches_each_task_of_the_closure_once(
        deps in dag_strategy(12),
    ) {
        let target = deps.len() - 1;
        let mut registry = TaskRegistry::new();
        for (i, ds) in deps.iter().enumerate() {
            let ds: Vec<String> = ds.iter().map(|&d| name(d)).collect();
            let ds: Vec<&str> = ds.iter().map(String::as_str).collect();
            registry.register(&name(i), &ds, None);
        }
        let executor = FakeExecutor::new();

        block_on(Runner::with_executor(registry, executor.clone()).run(&name(target))).unwrap();

        let dispatched = executor.executed();
        let unique: HashSet<&String> = dispatched.iter().collect();
        prop_assert_eq!(unique.len(), dispatched.len());
        prop_assert_eq!(dispatched.len(), closure(&deps, target).len());
        let target_name = name(target);
        prop_assert_eq!(dispatched.last(), Some(&target_name));
    }
}
