//! Styled status messages on stderr.
//!
//! Command output goes to stdout untouched so it can be piped; everything
//! addressed to a human goes through here.

use std::sync::atomic::{AtomicBool, Ordering};

use console::style;

static QUIET: AtomicBool = AtomicBool::new(false);

/// Whether colors should be used, honouring `NO_COLOR` and `FORCE_COLOR`
/// before falling back to terminal detection.
pub fn should_use_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::user_attended_stderr()
}

/// Apply `--no-color` and `--quiet`. Call once, early in `main`.
pub fn init_colors(no_color: bool, quiet: bool) {
    let colors = !no_color && should_use_color();
    console::set_colors_enabled(colors);
    console::set_colors_enabled_stderr(colors);
    QUIET.store(quiet, Ordering::Relaxed);
}

fn quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

pub fn success(message: &str) {
    if !quiet() {
        eprintln!("{} {}", style("✓").green().bold(), message);
    }
}

pub fn info(message: &str) {
    if !quiet() {
        eprintln!("{} {}", style("ℹ").blue().bold(), message);
    }
}

pub fn warning(message: &str) {
    if !quiet() {
        eprintln!("{} {}", style("⚠").yellow().bold(), style(message).yellow());
    }
}

/// `1 target`, `3 targets`.
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
