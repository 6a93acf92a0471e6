mod build;
mod changelog;
mod commands;
mod core;
mod hosting;
mod release;
#[cfg(test)]
mod testing;
mod ui;
mod utils;

use clap::{ArgAction, Parser, Subcommand};
use core::error::{CutError, print_error};
use release::version::BumpFlags;
use tracing_subscriber::EnvFilter;

/// Cut GitHub releases from Cargo projects
#[derive(Parser)]
#[command(name = "cargo")]
#[command(bin_name = "cargo")]
#[command(styles = get_styles())]
enum CargoCli {
  Cut(CutCli),
}

#[derive(Parser)]
#[command(name = "cut")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct CutCli {
  /// More diagnostics on stderr (-v debug, -vv trace); RUST_LOG overrides
  #[arg(short, long, global = true, action = ArgAction::Count)]
  verbose: u8,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Bump the version, write the changelog, tag and publish a GitHub release
  Release {
    /// Bump the patch version (default)
    #[arg(long)]
    patch: bool,
    /// Bump the minor version
    #[arg(long)]
    minor: bool,
    /// Bump the major version
    #[arg(long)]
    major: bool,
    /// Text prefixed to the published release notes
    #[arg(long)]
    comment: Option<String>,
    /// Release mode: direct (push to the default branch) or indirect (via pull request)
    #[arg(long)]
    mode: Option<String>,
    /// Check the repository and print the plan without changing anything
    #[arg(long)]
    dry_run: bool,
  },

  /// Show the current version and the next patch/minor/major candidates
  Semver {
    /// Output in JSON format
    #[arg(long)]
    json: bool,
  },
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn main() {
  let CargoCli::Cut(cli) = CargoCli::parse();
  init_tracing(cli.verbose);

  let result = match cli.command {
    Commands::Release {
      patch,
      minor,
      major,
      comment,
      mode,
      dry_run,
    } => commands::run_release(commands::ReleaseArgs {
      flags: BumpFlags { major, minor, patch },
      comment,
      mode,
      dry_run,
    }),
    Commands::Semver { json } => commands::run_semver(json),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

/// Diagnostics go to stderr so stdout stays clean for progress lines and JSON
fn init_tracing(verbose: u8) {
  let default_level = match verbose {
    0 => "warn",
    1 => "debug",
    _ => "trace",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();
}

fn handle_error(err: CutError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
