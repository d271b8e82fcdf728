//! Test classpaths from params files.
//!
//! For every `java_test` the build tool writes a
//! `<name>_deploy.jar-0.params` file next to its outputs. Among other
//! arguments it lists the jars of the test's runtime classpath:
//!
//! ```text
//! --output
//! bazel-out/k8-fastbuild/bin/svc/FooTest_deploy.jar
//! --sources
//! bazel-out/k8-fastbuild/bin/svc/FooTest.jar,//svc:FooTest
//! bazel-out/k8-fastbuild/bin/tools/junit/libjunit.jar,//tools/junit:junit
//! ```
//!
//! Jar paths are relative to the execution root.

use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use kiln_graph::{Label, Runtime};

/// Suffix of the params file describing a test's deploy jar.
pub const DEPLOY_PARAMS_SUFFIX: &str = "_deploy.jar-0.params";

/// Suffix of the params file describing a test's source deploy jar.
pub const SOURCE_DEPLOY_PARAMS_SUFFIX: &str = "_deploy-src.jar-0.params";

/// Expected location of the params file for a test label.
pub fn params_file_for(bazel_bin: &Path, label: &Label, source: bool) -> PathBuf {
    let suffix = if source {
        SOURCE_DEPLOY_PARAMS_SUFFIX
    } else {
        DEPLOY_PARAMS_SUFFIX
    };
    bazel_bin
        .join(label.package())
        .join(format!("{}{suffix}", label.name()))
}

/// Jar paths listed under `--output` and `--sources`, in file order.
pub fn parse_test_params(text: &str) -> Vec<String> {
    let mut jars = Vec::new();
    let mut collecting = false;

    for line in text.lines() {
        let line = line.trim_end();
        if line.starts_with("--") {
            collecting = line.starts_with("--output") || line.starts_with("--sources");
            continue;
        }
        if !collecting {
            continue;
        }
        let jar = line.split(',').next().unwrap_or_default();
        if jar.ends_with(".jar") {
            jars.push(jar.to_string());
        }
    }
    jars
}

/// Merge the jars of several params files, first occurrence wins.
///
/// Unreadable files are logged and skipped. With `exclude_deploy_jars`, the
/// bulky `_deploy.jar` outputs are left out.
pub fn aggregate_test_jars(
    runtime: &dyn Runtime,
    files: &[PathBuf],
    exclude_deploy_jars: bool,
) -> Vec<String> {
    let mut jars: IndexSet<String> = IndexSet::new();

    for file in files {
        let text = match runtime.read_file(file) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) => {
                tracing::warn!(path = %file.display(), error = %err, "failed to read test params file");
                continue;
            }
        };
        for jar in parse_test_params(&text) {
            if exclude_deploy_jars && jar.ends_with("_deploy.jar") {
                continue;
            }
            jars.insert(jar);
        }
    }
    jars.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_graph::MemoryRuntime;
    use pretty_assertions::assert_eq;

    const FOO_PARAMS: &str = "\
--main_advice_classpath
bazel-out/bin/ignored.jar
--output
bazel-out/bin/svc/FooTest_deploy.jar
--sources
bazel-out/bin/svc/FooTest.jar,//svc:FooTest
bazel-out/bin/tools/junit/libjunit.jar,//tools/junit:junit
bazel-out/bin/svc/data.txt,//svc:data
--build_target
//svc:FooTest
";

    const BAR_PARAMS: &str = "\
--output
bazel-out/bin/svc/BarTest_deploy.jar
--sources
bazel-out/bin/tools/junit/libjunit.jar,//tools/junit:junit
bazel-out/bin/svc/BarTest.jar,//svc:BarTest
";

    #[test]
    fn parses_output_and_sources_sections() {
        assert_eq!(
            parse_test_params(FOO_PARAMS),
            vec![
                "bazel-out/bin/svc/FooTest_deploy.jar",
                "bazel-out/bin/svc/FooTest.jar",
                "bazel-out/bin/tools/junit/libjunit.jar",
            ]
        );
        assert!(parse_test_params("").is_empty());
    }

    #[test]
    fn aggregates_in_order_without_duplicates() {
        let runtime = MemoryRuntime::new();
        runtime.add_file("bin/svc/FooTest_deploy.jar-0.params", FOO_PARAMS);
        runtime.add_file("bin/svc/BarTest_deploy.jar-0.params", BAR_PARAMS);
        let files = vec![
            PathBuf::from("bin/svc/FooTest_deploy.jar-0.params"),
            PathBuf::from("bin/svc/missing_deploy.jar-0.params"),
            PathBuf::from("bin/svc/BarTest_deploy.jar-0.params"),
        ];

        assert_eq!(
            aggregate_test_jars(&runtime, &files, true),
            vec![
                "bazel-out/bin/svc/FooTest.jar",
                "bazel-out/bin/tools/junit/libjunit.jar",
                "bazel-out/bin/svc/BarTest.jar",
            ]
        );
        assert_eq!(aggregate_test_jars(&runtime, &files, false).len(), 5);
    }

    #[test]
    fn params_file_location() {
        let label = Label::parse("//svc/api:FooTest").unwrap();
        assert_eq!(
            params_file_for(Path::new("bazel-bin"), &label, false),
            PathBuf::from("bazel-bin/svc/api/FooTest_deploy.jar-0.params")
        );
        assert_eq!(
            params_file_for(Path::new("bazel-bin"), &label, true),
            PathBuf::from("bazel-bin/svc/api/FooTest_deploy-src.jar-0.params")
        );
    }
}
