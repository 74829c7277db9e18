mod cmd;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::ProjectArgs;
use output::print_error;

/// kiln - incremental build graph runner
#[derive(Parser)]
#[command(name = kiln_lib::consts::APP_NAME)]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true, env = "KILN_VERBOSE")]
  verbose: bool,

  #[command(flatten)]
  project: ProjectArgs,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build a target and everything it depends on
  Build {
    /// Name of the target to build
    target: String,
  },

  /// List the targets declared in the manifest
  Targets,

  /// Remove the build directory
  Clean {
    /// Remove the build directories of every mode, platform and define set
    #[arg(long)]
    all: bool,
  },
}

fn init_tracing(verbose: bool) {
  let filter = EnvFilter::try_from_env("KILN_LOG").unwrap_or_else(|_| {
    if verbose {
      EnvFilter::new("kiln=debug,kiln_lib=debug")
    } else {
      EnvFilter::new("warn")
    }
  });

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let result = match cli.command {
    Commands::Build { target } => cmd::cmd_build(&cli.project, &target),
    Commands::Targets => cmd::cmd_targets(&cli.project),
    Commands::Clean { all } => cmd::cmd_clean(&cli.project, all),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{e:#}"));
      ExitCode::FAILURE
    }
  }
}
