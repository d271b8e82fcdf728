//! Implicit test-runner dependencies.
//!
//! `java_test` targets run under a test runner that the build tool puts on
//! the classpath without it appearing in the target's deps (it drags in JUnit,
//! Hamcrest and friends). Workspaces built with `--explicit_java_test_deps`
//! opt out of that, and then nothing is injected.

use std::path::{Path, PathBuf};

use kiln_graph::{Runtime, RuleKind};

/// Where the test runner's interface jar is materialised under `bazel-bin`.
pub const TEST_RUNNER_DIR: &str = "external/bazel_tools/tools/jdk/_ijar/TestRunner";

/// File name of the test runner's interface jar.
pub const TEST_RUNNER_JAR: &str = "Runner_deploy-ijar.jar";

const SEARCH_DEPTH: usize = 5;

/// Locate the test runner jar below `bazel_bin`.
pub fn find_test_runner_jar(runtime: &dyn Runtime, bazel_bin: &Path) -> Option<PathBuf> {
    let runner_dir = bazel_bin.join(TEST_RUNNER_DIR);
    let files = match runtime.walk_files(&runner_dir, SEARCH_DEPTH) {
        Ok(files) => files,
        Err(err) => {
            tracing::debug!(dir = %runner_dir.display(), error = %err, "cannot search for test runner");
            return None;
        }
    };

    let found = files.into_iter().find(|path| {
        path.file_name()
            .is_some_and(|name| name == TEST_RUNNER_JAR)
    });
    if found.is_none() {
        tracing::debug!(dir = %runner_dir.display(), "no implicit test runner jar found");
    }
    found
}

/// Jars the test runner adds to a target of `kind`.
pub fn implicit_test_jars(
    runtime: &dyn Runtime,
    bazel_bin: &Path,
    kind: &RuleKind,
    explicit_java_test_deps: bool,
) -> Vec<PathBuf> {
    if *kind != RuleKind::JavaTest || explicit_java_test_deps {
        return Vec::new();
    }
    find_test_runner_jar(runtime, bazel_bin).into_iter().collect()
}
