//! `kiln params`: jars listed in test deploy-jar params files.

use kiln_classpath::aggregate_test_jars;

use crate::cli::ParamsArgs;
use crate::commands::{Workspace, write_stdout};
use crate::error::CliError;
use crate::ui;

/// Execute the params command.
///
/// Every file must exist up front; the jars are printed one per line,
/// first occurrence wins.
pub fn execute(args: ParamsArgs, workspace: &Workspace) -> anyhow::Result<()> {
    if let Some(missing) = args
        .files
        .iter()
        .find(|file| !workspace.runtime().is_file(file))
    {
        return Err(CliError::FileNotFound(missing.clone()).into());
    }

    let jars = aggregate_test_jars(workspace.runtime(), &args.files, args.exclude_deploy);
    if jars.is_empty() {
        ui::warning("No jars listed in the given params files");
    }
    write_stdout(&jars.iter().map(|jar| format!("{jar}\n")).collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_config::KilnConfig;
    use kiln_graph::MemoryRuntime;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[test]
    fn missing_file_fails_before_reading() {
        let runtime = Arc::new(MemoryRuntime::new());
        runtime.add_file("/ws/a_deploy.jar-0.params", "--sources\nout/a.jar,//:a\n");
        let workspace = Workspace::with_runtime(KilnConfig::default(), runtime);

        let args = ParamsArgs {
            files: vec![
                PathBuf::from("/ws/a_deploy.jar-0.params"),
                PathBuf::from("/ws/b_deploy.jar-0.params"),
            ],
            exclude_deploy: false,
        };
        let err = execute(args, &workspace).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::FileNotFound(path)) if path.ends_with("b_deploy.jar-0.params")
        ));
    }
}
