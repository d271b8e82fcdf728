//! kiln CLI entry point.
//!
//! Parses arguments, loads `kiln.toml`, initialises logging and dispatches to
//! the requested command.

use clap::Parser;
use kiln_cli::{cli, commands, error, logger, ui};
use miette::Result;

fn main() -> Result<()> {
    let args = cli::Cli::parse();

    // Config comes first so `settings.log_level` can seed the logger.
    let config = commands::load_config(&args).map_err(error::cli_error_to_miette)?;

    logger::init_logger(
        args.verbose,
        args.quiet,
        args.no_color,
        config.settings.log_level.as_deref(),
    );
    ui::init_colors(args.no_color, args.quiet);
    commands::configure_thread_pool(config.settings.parallel_jobs);

    commands::execute(args.command, config).map_err(error::to_miette)
}
