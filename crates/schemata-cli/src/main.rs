//! # schemata CLI entry point
//!
//! Parses command-line arguments, installs the tracing subscriber and
//! dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use schemata_cli::check::{run_check, CheckArgs};
use schemata_cli::transform::{run_expand, run_flatten, TransformArgs};

/// Schemata — runtime schema binding and validation.
#[derive(Parser, Debug)]
#[command(name = "schemata", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bind a JSON document to a schema and validate it.
    Check(CheckArgs),

    /// Expand a flat map of dotted/bracket paths into a nested document.
    Expand(TransformArgs),

    /// Flatten a nested document into dotted/bracket paths.
    Flatten(TransformArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let result = match cli.command {
        Commands::Check(args) => run_check(&args),
        Commands::Expand(args) => run_expand(&args),
        Commands::Flatten(args) => run_flatten(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}

/// `RUST_LOG` wins over the verbosity flags. Logs go to stderr so stdout
/// stays machine-readable.
fn init_tracing(verbose: u8, json: bool) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn cli_parse_check() {
        let cli = Cli::try_parse_from([
            "schemata",
            "check",
            "--schemas",
            "defs.yaml",
            "--type",
            "Person",
            "--input",
            "doc.json",
            "--view",
            "public",
            "--partial",
        ])
        .unwrap();
        let Commands::Check(args) = cli.command else {
            panic!("expected check");
        };
        assert_eq!(args.schemas, PathBuf::from("defs.yaml"));
        assert_eq!(args.type_name, "Person");
        assert_eq!(args.input, Some(PathBuf::from("doc.json")));
        assert_eq!(args.view.as_deref(), Some("public"));
        assert!(args.partial);
        assert!(!args.flat);
    }

    #[test]
    fn cli_parse_check_requires_schemas_and_type() {
        assert!(Cli::try_parse_from(["schemata", "check", "--type", "Person"]).is_err());
        assert!(Cli::try_parse_from(["schemata", "check", "--schemas", "defs.yaml"]).is_err());
    }

    #[test]
    fn cli_parse_transforms() {
        let cli = Cli::try_parse_from(["schemata", "expand", "flat.json"]).unwrap();
        assert!(matches!(cli.command, Commands::Expand(ref args) if args.input == Some(PathBuf::from("flat.json"))));
        let cli = Cli::try_parse_from(["schemata", "flatten"]).unwrap();
        assert!(matches!(cli.command, Commands::Flatten(ref args) if args.input.is_none()));
    }

    #[test]
    fn cli_parse_global_flags() {
        let cli = Cli::try_parse_from(["schemata", "-vv", "flatten", "--log-json"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.log_json);
    }

    #[test]
    fn cli_parse_no_subcommand_errors() {
        assert!(Cli::try_parse_from(["schemata"]).is_err());
    }
}
