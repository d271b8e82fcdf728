//! Source jar lookup for jars the aspect did not pair with sources.
//!
//! Compilation outputs follow a few naming conventions: header and interface
//! jars (`-hjar.jar`, `-ijar.jar`) stand in for the real jar, annotation
//! processing prefixes the file name with `processed_` or `header_`, and the
//! sources sit next to the jar as `-src.jar` or `-sources.jar`.

use std::path::{Path, PathBuf};

use kiln_graph::Runtime;

const STRIPPED_PREFIXES: &[&str] = &["processed_", "header_"];
const INTERFACE_SUFFIXES: &[&str] = &["-hjar.jar", "-ijar.jar"];
const SOURCE_SUFFIXES: &[&str] = &["-src.jar", "-sources.jar"];

/// Candidate source jars for `jar`, in lookup order. Empty for files that
/// are not jars or are already source jars.
pub fn source_jar_candidates(jar: &Path) -> Vec<PathBuf> {
    let Some(file_name) = jar.file_name().and_then(|name| name.to_str()) else {
        return Vec::new();
    };
    if !file_name.ends_with(".jar") || SOURCE_SUFFIXES.iter().any(|s| file_name.ends_with(s)) {
        return Vec::new();
    }

    let mut name = file_name;
    for prefix in STRIPPED_PREFIXES {
        if let Some(stripped) = name.strip_prefix(prefix) {
            name = stripped;
        }
    }
    let stem = INTERFACE_SUFFIXES
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .or_else(|| name.strip_suffix(".jar"))
        .unwrap_or(name);
    if stem.is_empty() {
        return Vec::new();
    }

    let dir = jar.parent().unwrap_or(Path::new(""));
    SOURCE_SUFFIXES
        .iter()
        .map(|suffix| dir.join(format!("{stem}{suffix}")))
        .collect()
}

/// The first candidate source jar that exists. Failure is silent.
pub fn find_source_jar(runtime: &dyn Runtime, jar: &Path) -> Option<PathBuf> {
    source_jar_candidates(jar)
        .into_iter()
        .find(|candidate| runtime.is_file(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_graph::MemoryRuntime;
    use pretty_assertions::assert_eq;

    fn candidates(jar: &str) -> Vec<String> {
        source_jar_candidates(Path::new(jar))
            .into_iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn plain_jar_candidates() {
        assert_eq!(
            candidates("out/lib/libcore.jar"),
            vec!["out/lib/libcore-src.jar", "out/lib/libcore-sources.jar"]
        );
    }

    #[test]
    fn interface_and_prefixed_jars_map_to_real_stem() {
        assert_eq!(candidates("out/libcore-hjar.jar")[0], "out/libcore-src.jar");
        assert_eq!(candidates("out/libcore-ijar.jar")[0], "out/libcore-src.jar");
        assert_eq!(candidates("out/processed_libcore.jar")[0], "out/libcore-src.jar");
        assert_eq!(candidates("out/header_libcore-hjar.jar")[0], "out/libcore-src.jar");
    }

    #[test]
    fn non_jars_and_source_jars_have_no_candidates() {
        assert!(candidates("out/libcore-src.jar").is_empty());
        assert!(candidates("out/guava-sources.jar").is_empty());
        assert!(candidates("out/README.md").is_empty());
        assert!(candidates("out/-hjar.jar").is_empty());
    }

    #[test]
    fn finds_first_existing_candidate() {
        let runtime = MemoryRuntime::new();
        runtime.touch("ext/guava-33.0-sources.jar");

        assert_eq!(
            find_source_jar(&runtime, Path::new("ext/guava-33.0.jar")),
            Some(PathBuf::from("ext/guava-33.0-sources.jar"))
        );
        assert_eq!(find_source_jar(&runtime, Path::new("ext/other.jar")), None);

        runtime.touch("ext/guava-33.0-src.jar");
        assert_eq!(
            find_source_jar(&runtime, Path::new("ext/guava-33.0.jar")),
            Some(PathBuf::from("ext/guava-33.0-src.jar"))
        );
    }
}
