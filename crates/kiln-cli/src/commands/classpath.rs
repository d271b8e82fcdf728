//! `kiln classpath`: resolve the classpath of one or more targets.

use kiln_classpath::{ClasspathDocument, ClasspathResult, ResolveOutcome, requests_for};
use kiln_graph::Label;
use serde_json::{Map, Value};

use crate::cli::{ClasspathArgs, OutputFormat};
use crate::commands::workspace::parse_labels;
use crate::commands::{Workspace, write_stdout};
use crate::error::CliError;
use crate::ui;

/// Execute the classpath command.
///
/// Labels are resolved in parallel. An incomplete result is still printed;
/// its diagnostics go to stderr as warnings.
pub fn execute(args: ClasspathArgs, workspace: &Workspace) -> anyhow::Result<()> {
    let labels = parse_labels(&args.labels)?;
    let implicit = workspace.implicit_runtime_deps(&args.implicit)?;
    let include_test_scope = args.test || workspace.config().include_test_scope;

    let context = workspace.context(&args.source, !args.no_cache)?;
    let mut outcomes = context.resolve_all(&requests_for(&labels, include_test_scope, &implicit));

    let mut results = Vec::with_capacity(labels.len());
    for label in labels {
        let result = outcomes
            .remove(&label)
            .and_then(ResolveOutcome::into_result)
            .ok_or(CliError::Cancelled)?;
        warn_if_incomplete(&label, &result);
        results.push((label, result));
    }

    write_stdout(&render(&results, args.format)?)
}

fn warn_if_incomplete(label: &Label, result: &ClasspathResult) {
    if result.is_complete {
        return;
    }
    ui::warning(&format!(
        "Classpath of {label} is incomplete ({})",
        ui::plural(result.diagnostics.len(), "problem")
    ));
    for diagnostic in &result.diagnostics {
        ui::warning(&format!("  {diagnostic}"));
    }
}

/// One target renders bare; several are keyed (JSON) or headed (text) by
/// label.
fn render(results: &[(Label, ClasspathResult)], format: OutputFormat) -> serde_json::Result<String> {
    match (format, results) {
        (OutputFormat::Text, [(_, result)]) => Ok(render_entries(result, "")),
        (OutputFormat::Text, _) => Ok(results
            .iter()
            .map(|(label, result)| format!("{label}:\n{}", render_entries(result, "  ")))
            .collect()),
        (OutputFormat::Json, [(_, result)]) => ClasspathDocument::from(result).to_json(),
        (OutputFormat::Json, _) => {
            let mut documents = Map::new();
            for (label, result) in results {
                documents.insert(
                    label.to_string(),
                    serde_json::to_value(ClasspathDocument::from(result))?,
                );
            }
            serde_json::to_string_pretty(&Value::Object(documents))
        }
    }
}

fn render_entries(result: &ClasspathResult, indent: &str) -> String {
    result
        .entries
        .iter()
        .map(|entry| format!("{indent}{entry}\n"))
        .collect()
}
