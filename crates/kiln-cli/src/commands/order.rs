//! `kiln order`: leaf-first package order.

use std::collections::BTreeSet;
use std::path::{Component, Path};

use kiln_graph::{CyclePolicy, DependencyGraph, OrderReport, PackageOrderResolver, PackageTree};
use serde::Serialize;

use crate::cli::{OrderArgs, OutputFormat};
use crate::commands::{Workspace, write_stdout};
use crate::error::CliError;
use crate::ui;

#[derive(Serialize)]
struct OrderJson<'a> {
    root: &'a str,
    order: &'a [String],
    cycles: Vec<CycleJson<'a>>,
}

#[derive(Serialize)]
struct CycleJson<'a> {
    cycle: &'a [String],
    broken_at: &'a str,
}

/// Execute the order command.
///
/// A cycle only fails the command under `--strict` or `order.strict`;
/// otherwise each broken cycle is reported as a warning.
pub fn execute(args: OrderArgs, workspace: &Workspace) -> anyhow::Result<()> {
    let snapshot = workspace.load_snapshot(&args.source)?;
    let graph = DependencyGraph::build(&snapshot);
    let tree = PackageTree::from_store(&snapshot);

    let policy = if args.strict || workspace.config().order.strict {
        CyclePolicy::Strict
    } else {
        CyclePolicy::Lenient
    };
    let root = args
        .root
        .as_deref()
        .map(|dir| root_package(dir, workspace.config().workspace_root()))
        .unwrap_or_default();
    let scope: Option<BTreeSet<String>> =
        (!args.scopes.is_empty()).then(|| args.scopes.iter().cloned().collect());

    let report = PackageOrderResolver::new()
        .with_policy(policy)
        .compute_order(&tree, &root, &graph, scope.as_ref())
        .map_err(CliError::from)?
        .into_report()
        .ok_or(CliError::Cancelled)?;

    for cycle in &report.cycles {
        ui::warning(&cycle.to_string());
    }
    write_stdout(&render(&root, &report, args.format)?)?;
    ui::success(&format!("Ordered {}", ui::plural(report.order.len(), "package")));
    Ok(())
}

/// Turn `--root` into a package path. Paths inside the workspace root are
/// made relative to it; `//`, `.` and trailing slashes are dropped.
fn root_package(dir: &Path, workspace_root: &Path) -> String {
    let relative = dir.strip_prefix(workspace_root).unwrap_or(dir);
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn render(root: &str, report: &OrderReport, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Text => Ok(report
            .order
            .iter()
            .map(|package| format!("//{package}\n"))
            .collect()),
        OutputFormat::Json => serde_json::to_string_pretty(&OrderJson {
            root,
            order: &report.order,
            cycles: report
                .cycles
                .iter()
                .map(|cycle| CycleJson {
                    cycle: &cycle.cycle,
                    broken_at: &cycle.broken_at,
                })
                .collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_graph::CycleDetected;
    use pretty_assertions::assert_eq;

    fn report() -> OrderReport {
        OrderReport {
            order: vec!["a".to_string(), "b".to_string()],
            cycles: vec![CycleDetected {
                cycle: vec!["a".to_string(), "b".to_string(), "a".to_string()],
                broken_at: "a".to_string(),
            }],
        }
    }

    #[test]
    fn root_flag_becomes_package_path() {
        let ws = Path::new("/ws");
        assert_eq!(root_package(Path::new("services/api/"), ws), "services/api");
        assert_eq!(root_package(Path::new("./services"), ws), "services");
        assert_eq!(root_package(Path::new("//services"), ws), "services");
        assert_eq!(root_package(Path::new("/ws/services/db"), ws), "services/db");
        assert_eq!(root_package(Path::new("/ws"), ws), "");
    }

    #[test]
    fn text_lists_one_package_per_line() {
        assert_eq!(render("", &report(), OutputFormat::Text).unwrap(), "//a\n//b\n");
    }

    #[test]
    fn json_carries_cycles() {
        let json = render("", &report(), OutputFormat::Json).unwrap();
        insta::assert_snapshot!(json, @r#"
        {
          "root": "",
          "order": [
            "a",
            "b"
          ],
          "cycles": [
            {
              "cycle": [
                "a",
                "b",
                "a"
              ],
              "broken_at": "a"
            }
          ]
        }
        "#);
    }
}
