use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::builder::FalseyValueParser;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use xbuild_lib::{Builder, Compile, HostApp, Platform};

mod cmd;
mod output;
mod signal;

use output::{OutputFormat, print_error};

/// xbuild - build custom Caddy and k6 binaries with plugins
///
/// Without a subcommand, builds the host application with the Go module in
/// the current directory plugged in and runs it with the given arguments.
#[derive(Parser)]
#[command(name = "xbuild")]
#[command(author, version, about, long_about)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(flatten)]
  settings: Settings,

  #[command(subcommand)]
  command: Option<Commands>,
}

/// Build settings shared by every command. Each can also come from the
/// environment.
#[derive(Args, Debug, Clone)]
pub struct Settings {
  /// Host application to build (caddy or k6)
  #[arg(long, env = "XBUILD_HOST", default_value = "caddy", global = true)]
  pub host: HostApp,

  /// Build from this core module instead of the host's default (e.g. a fork)
  #[arg(long, env = "XBUILD_CORE_MODULE", global = true)]
  pub core_module: Option<String>,

  /// Build with the race detector (enables cgo)
  #[arg(long, env = "XBUILD_RACE_DETECTOR", value_parser = FalseyValueParser::new(), global = true)]
  pub race_detector: bool,

  /// Prepare the build module but do not compile
  #[arg(long, env = "XBUILD_SKIP_BUILD", value_parser = FalseyValueParser::new(), global = true)]
  pub skip_build: bool,

  /// Leave temporary folders and dev binaries on disk
  #[arg(long, env = "XBUILD_SKIP_CLEANUP", value_parser = FalseyValueParser::new(), global = true)]
  pub skip_cleanup: bool,

  /// Keep debug symbols and disable optimizations
  #[arg(long, env = "XBUILD_DEBUG", value_parser = FalseyValueParser::new(), global = true)]
  pub debug: bool,

  /// Extra flags for go build-family commands (replaces the default release flags)
  #[arg(long, env = "XBUILD_GO_BUILD_FLAGS", global = true)]
  pub build_flags: Option<String>,

  /// Extra flags for go mod commands
  #[arg(long, env = "XBUILD_GO_MOD_FLAGS", global = true)]
  pub mod_flags: Option<String>,

  /// The go executable to use
  #[arg(long = "go", env = "XBUILD_WHICH_GO", global = true)]
  pub go: Option<String>,

  /// Grant the dev binary permission to bind low ports (runs sudo setcap)
  #[arg(long, env = "XBUILD_SETCAP", value_parser = FalseyValueParser::new(), global = true)]
  pub setcap: bool,

  /// Time limit for fetching dependencies (e.g. 5m)
  #[arg(long, env = "XBUILD_TIMEOUT_GET", value_parser = humantime::parse_duration, global = true)]
  pub timeout_get: Option<Duration>,

  /// Time limit for the whole build (e.g. 10m)
  #[arg(long, env = "XBUILD_TIMEOUT_BUILD", value_parser = humantime::parse_duration, global = true)]
  pub timeout_build: Option<Duration>,

  /// Enable cgo
  #[arg(long, env = "CGO_ENABLED", value_parser = FalseyValueParser::new(), global = true)]
  pub cgo: bool,

  /// Target operating system; the host's when unset
  #[arg(long, env = "GOOS", global = true)]
  pub os: Option<String>,

  /// Target architecture; the host's when unset
  #[arg(long, env = "GOARCH", global = true)]
  pub arch: Option<String>,

  /// Target ARM variant
  #[arg(long, env = "GOARM", global = true)]
  pub arm: Option<String>,
}

impl Settings {
  /// A builder carrying these settings, without plugins.
  pub fn to_builder(&self) -> Builder {
    Builder {
      compile: Compile {
        platform: Platform {
          os: self.os.clone().unwrap_or_default(),
          arch: self.arch.clone().unwrap_or_default(),
          arm: self.arm.clone().unwrap_or_default(),
        },
        cgo: self.cgo,
      },
      host: self.host,
      core_module: self.core_module.clone(),
      timeout_get: self.timeout_get,
      timeout_build: self.timeout_build,
      race_detector: self.race_detector,
      skip_cleanup: self.skip_cleanup,
      skip_build: self.skip_build,
      debug: self.debug,
      build_flags: self.build_flags.clone().unwrap_or_default(),
      mod_flags: self.mod_flags.clone().unwrap_or_default(),
      go: self.go.clone(),
      ..Builder::new(self.host)
    }
  }

  /// The core version from the host's version variable, if set.
  pub fn env_core_version(&self) -> Option<String> {
    std::env::var(self.host.version_env()).ok().filter(|v| !v.is_empty())
  }
}

#[derive(Subcommand)]
enum Commands {
  /// Compile a custom binary
  Build(BuildArgs),

  /// Build with the current module plugged in and run it
  Dev {
    /// Arguments passed to the built binary
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
  },

  /// List the targets the Go toolchain can build for
  Platforms {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
  },

  /// Print the xbuild version
  Version,

  #[command(external_subcommand)]
  External(Vec<String>),
}

#[derive(Args, Debug)]
pub struct BuildArgs {
  /// Core version: a tag like v2.8.4, a branch, a commit, or latest.
  /// Defaults to $CADDY_VERSION or $K6_VERSION.
  pub version: Option<String>,

  /// Output file (default: ./caddy or ./k6)
  #[arg(short, long)]
  pub output: Option<PathBuf>,

  /// Plugin to include, optionally pinned and/or replaced
  #[arg(long = "with", value_name = "MODULE[@VERSION][=REPLACEMENT]")]
  pub with: Vec<String>,

  /// Like --with, but only writes a replace directive
  #[arg(long, value_name = "MODULE[@VERSION]=REPLACEMENT")]
  pub replace: Vec<String>,

  /// Directory to embed into Caddy, optionally under an alias
  #[arg(long, value_name = "[ALIAS:]DIR")]
  pub embed: Vec<String>,

  /// Read the build description from a JSON file instead of the settings;
  /// --with, --replace and --embed add to it
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,
}

fn init_tracing(verbose: bool) {
  let filter = if verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
  };
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
    Some(Commands::Build(args)) => cmd::cmd_build(&cli.settings, args),
    Some(Commands::Dev { args }) => cmd::cmd_dev(&cli.settings, args),
    Some(Commands::External(args)) => cmd::cmd_dev(&cli.settings, args),
    Some(Commands::Platforms { output }) => cmd::cmd_platforms(&cli.settings, output),
    Some(Commands::Version) => cmd::cmd_version(),
    None => cmd::cmd_dev(&cli.settings, Vec::new()),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&format!("{err:#}"));
      ExitCode::FAILURE
    }
  }
}
