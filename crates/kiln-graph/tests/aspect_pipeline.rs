//! Aspect output on disk through store, graph and package order.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use kiln_graph::{
    CancellationToken, DependencyGraph, Label, MetadataStore, NativeRuntime, OrderOutcome,
    PackageOrderResolver, PackageTree,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "app/server.kiln-build.json",
        r#"{"label": "//app:server", "kind": "java_binary",
            "deps": ["//lib/core:core", "//lib/http:http"],
            "runtime_deps": ["@maven//:logback"]}"#,
    );
    write(
        root,
        "lib/core/core.bzljavasdk-build.json",
        r#"{"label": "//lib/core:core", "kind": "java_library",
            "jars": [{"jar": "bazel-bin/lib/core/libcore.jar"}]}"#,
    );
    write(
        root,
        "lib/http/http.bzleclipse-build.json",
        r#"{"label": "//lib/http:http", "kind": "java_library",
            "dependencies": [{"target": {"label": "//lib/core"}}]}"#,
    );
    write(
        root,
        "lib/http/http_test.kiln-build.json",
        r#"{"label": "//lib/http:http_test", "kind": "java_test",
            "deps": [":not-a-label:"]}"#,
    );
    write(root, "lib/http/README.md", "not metadata");
    dir
}

fn load(dir: &TempDir) -> MetadataStore {
    let store = MetadataStore::new();
    let report = store.load_dir(dir.path(), Arc::new(NativeRuntime::new()));
    assert_eq!(report.parsed, 3);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].path().ends_with("lib/http/http_test.kiln-build.json"));
    store
}

#[test]
fn loads_all_metadata_flavours_and_skips_malformed() {
    let dir = workspace();
    let store = load(&dir);

    let labels: Vec<String> = store.all_labels().into_iter().map(String::from).collect();
    assert_eq!(labels, vec!["//app:server", "//lib/core:core", "//lib/http:http"]);
    assert_eq!(store.for_package("lib/http").len(), 1);
}

#[test]
fn graph_exposes_roots_and_external_leaves() {
    let dir = workspace();
    let store = load(&dir);
    let graph = DependencyGraph::build(&store.snapshot());

    let roots: Vec<_> = graph.roots().map(Label::as_str).collect();
    assert_eq!(roots, vec!["//app:server"]);
    let external: Vec<_> = graph.external_leaves().map(Label::as_str).collect();
    assert_eq!(external, vec!["@maven//:logback"]);
    assert!(graph.is_dependency(
        &Label::parse("//app:server").unwrap(),
        &Label::parse("//lib/core:core").unwrap()
    ));
    assert!(graph.to_dot().contains("\"//lib/http:http\" -> \"//lib/core:core\";"));
}

#[test]
fn orders_packages_leaf_first() {
    let dir = workspace();
    let store = load(&dir);
    let snapshot = store.snapshot();
    let graph = DependencyGraph::build(&snapshot);
    let tree = PackageTree::from_store(&snapshot);

    let report = PackageOrderResolver::new()
        .compute_order(&tree, "", &graph, None)
        .unwrap()
        .into_report()
        .unwrap();
    assert_eq!(report.order, vec!["lib/core", "lib/http", "app"]);
    assert!(report.cycles.is_empty());

    let scope = BTreeSet::from(["app".to_string(), "lib/core".to_string()]);
    let scoped = PackageOrderResolver::new()
        .compute_order(&tree, "", &graph, Some(&scope))
        .unwrap()
        .into_report()
        .unwrap();
    assert_eq!(scoped.order, vec!["lib/core", "app"]);

    let lib_only = PackageOrderResolver::new()
        .compute_order(&tree, "lib", &graph, None)
        .unwrap()
        .into_report()
        .unwrap();
    assert_eq!(lib_only.order, vec!["lib/core", "lib/http"]);
}

#[test]
fn cancelled_order_reports_cancellation() {
    let dir = workspace();
    let store = load(&dir);
    let snapshot = store.snapshot();
    let token = CancellationToken::new();
    token.cancel();

    let outcome = PackageOrderResolver::new()
        .with_cancellation(token)
        .compute_order(
            &PackageTree::from_store(&snapshot),
            "",
            &DependencyGraph::build(&snapshot),
            None,
        )
        .unwrap();
    assert_eq!(outcome, OrderOutcome::Cancelled);
}
