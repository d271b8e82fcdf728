//! Property tests over random acyclic target graphs.

use std::collections::BTreeSet;
use std::sync::Arc;

use kiln_classpath::{ClasspathEngine, ClasspathResult, ResolveRequest, Scope};
use kiln_graph::{DependencyGraph, Label, MemoryRuntime, OutputJars, StoreSnapshot, TargetMetadata};
use proptest::prelude::*;

const TARGETS: usize = 10;
const PACKAGES: usize = 3;

/// Targets share a handful of packages so test rules have siblings.
fn label(i: usize) -> Label {
    Label::parse(&format!("//p{}:t{i}", i % PACKAGES)).unwrap()
}

/// Edges only point from higher to lower indices, so the graph is acyclic.
/// Several targets share a jar to exercise deduplication.
fn arb_targets() -> impl Strategy<Value = Vec<(Vec<usize>, Vec<usize>, usize, bool)>> {
    prop::collection::vec(
        (
            prop::collection::vec(0..TARGETS, 0..4),
            prop::collection::vec(0..TARGETS, 0..3),
            0..(TARGETS - 3),
            any::<bool>(),
        ),
        TARGETS,
    )
}

fn build(shape: &[(Vec<usize>, Vec<usize>, usize, bool)]) -> (ClasspathEngine, DependencyGraph, StoreSnapshot) {
    let runtime = Arc::new(MemoryRuntime::new());
    let targets: Vec<TargetMetadata> = shape
        .iter()
        .enumerate()
        .map(|(i, (deps, runtime_deps, jar, is_test))| {
            let jar = format!("out/lib{jar}.jar");
            runtime.touch(&jar);
            let below = |edges: &Vec<usize>| -> Vec<Label> {
                edges.iter().filter(|&&d| d < i).map(|&d| label(d)).collect()
            };
            let kind = if *is_test { "java_test" } else { "java_library" };
            TargetMetadata::builder(label(i), kind)
                .deps(below(deps))
                .runtime_deps(below(runtime_deps))
                .outputs(OutputJars::new(jar))
                .build()
        })
        .collect();

    let store = StoreSnapshot::from_targets(targets);
    let graph = DependencyGraph::build(&store);
    (ClasspathEngine::builder().runtime(runtime).build(), graph, store)
}

fn main_closure(store: &StoreSnapshot, root: &Label) -> BTreeSet<Label> {
    let mut seen = BTreeSet::from([root.clone()]);
    let mut stack = vec![root.clone()];
    while let Some(label) = stack.pop() {
        for dep in store.get(&label).unwrap().deps() {
            if seen.insert(dep.clone()) {
                stack.push(dep.clone());
            }
        }
    }
    seen
}

fn resolve_with(
    engine: &ClasspathEngine,
    graph: &DependencyGraph,
    store: &StoreSnapshot,
    i: usize,
    test_scope: bool,
) -> ClasspathResult {
    engine
        .resolve(&ResolveRequest::new(label(i)).with_test_scope(test_scope), graph, store)
        .into_result()
        .unwrap()
}

fn resolve(engine: &ClasspathEngine, graph: &DependencyGraph, store: &StoreSnapshot, i: usize) -> ClasspathResult {
    resolve_with(engine, graph, store, i, true)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn no_jar_appears_twice(shape in arb_targets()) {
        let (engine, graph, store) = build(&shape);
        for i in 0..TARGETS {
            let result = resolve(&engine, &graph, &store, i);
            let keys: BTreeSet<_> = result.entries.iter().map(|e| e.key()).collect();
            prop_assert_eq!(keys.len(), result.entries.len());
            prop_assert!(result.is_complete);
        }
    }

    #[test]
    fn entries_are_grouped_by_scope(shape in arb_targets()) {
        let (engine, graph, store) = build(&shape);
        for i in 0..TARGETS {
            let scopes: Vec<Scope> = resolve(&engine, &graph, &store, i)
                .entries
                .iter()
                .map(|e| e.scope())
                .collect();
            prop_assert!(scopes.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn compile_closure_jars_are_main(shape in arb_targets()) {
        let (engine, graph, store) = build(&shape);
        for i in 0..TARGETS {
            let root = label(i);
            let result = resolve(&engine, &graph, &store, i);
            for member in main_closure(&store, &root) {
                let jar = store.get(&member).unwrap().outputs().primary_jar.clone().unwrap();
                let entry = result
                    .entries
                    .iter()
                    .find(|e| e.jar_path() == Some(jar.as_path()))
                    .unwrap();
                prop_assert_eq!(entry.scope(), Scope::Main);
            }
        }
    }

    #[test]
    fn resolution_is_deterministic(shape in arb_targets()) {
        let (engine, graph, store) = build(&shape);
        let (other_engine, other_graph, other_store) = build(&shape);
        for i in 0..TARGETS {
            prop_assert_eq!(
                resolve(&engine, &graph, &store, i),
                resolve(&other_engine, &other_graph, &other_store, i)
            );
        }
    }

    #[test]
    fn test_scope_only_adds_test_entries(shape in arb_targets()) {
        let (engine, graph, store) = build(&shape);
        for i in 0..TARGETS {
            let without = resolve_with(&engine, &graph, &store, i, false);
            let with = resolve(&engine, &graph, &store, i);
            prop_assert_eq!(&with.entries[..without.entries.len()], &without.entries[..]);
            prop_assert!(with.entries[without.entries.len()..]
                .iter()
                .all(|e| e.scope() == Scope::Test));
        }
    }
}
