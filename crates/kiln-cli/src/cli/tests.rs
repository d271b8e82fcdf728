use clap::{CommandFactory, Parser};

use super::*;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("kiln").chain(args.iter().copied())).unwrap()
}

#[test]
fn definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn order_flags() {
    let cli = parse(&[
        "order", "--root", "services", "--scope", "services/api", "--scope", "services/db",
        "--strict", "--format", "json",
    ]);
    let Command::Order(args) = cli.command else {
        panic!("expected order");
    };
    assert_eq!(args.root.as_deref(), Some(std::path::Path::new("services")));
    assert_eq!(args.scopes, vec!["services/api", "services/db"]);
    assert!(args.strict);
    assert_eq!(args.format, OutputFormat::Json);
}

#[test]
fn classpath_takes_several_labels_and_implicit_deps() {
    let cli = parse(&[
        "classpath", "//a:lib", "//b:lib", "--test", "--implicit", "//rt:agent", "--no-cache",
    ]);
    let Command::Classpath(args) = cli.command else {
        panic!("expected classpath");
    };
    assert_eq!(args.labels, vec!["//a:lib", "//b:lib"]);
    assert_eq!(args.implicit, vec!["//rt:agent"]);
    assert!(args.test && args.no_cache);
    assert_eq!(args.format, OutputFormat::Text);
}

#[test]
fn classpath_requires_a_label() {
    assert!(Cli::try_parse_from(["kiln", "classpath"]).is_err());
}

#[test]
fn global_flags_after_subcommand() {
    let cli = parse(&["graph", "--roots", "-v", "--profile", "ci", "-C", "/ws"]);
    assert!(cli.verbose);
    assert_eq!(cli.profile.as_deref(), Some("ci"));
    assert_eq!(cli.cwd.as_deref(), Some(std::path::Path::new("/ws")));
    let Command::Graph(args) = cli.command else {
        panic!("expected graph");
    };
    assert!(args.roots);
    assert_eq!(args.format, GraphFormat::Dot);
}

#[test]
fn verbose_conflicts_with_quiet() {
    assert!(Cli::try_parse_from(["kiln", "-v", "-q", "graph"]).is_err());
}
