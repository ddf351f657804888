//! vadd CLI application
//!
//! Runs elementwise vector addition on an OpenCL device, verifies the
//! result on the host, and reports the outcome.

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use tracing::{debug, error};

use vadd_cli::commands::{print_failure, DevicesCommand, KernelCommand, RunCommand};
use vadd_cli::exit::{EXIT_CONFIG_FAIL, EXIT_PIPELINE_FAIL};
use vadd_common::{ConfigBuilder, ConfigError, DeviceClass, VaddConfig, VaddError};

/// vadd - OpenCL vector addition with host-side verification
#[derive(Parser)]
#[command(name = "vadd")]
#[command(about = "OpenCL vector addition with host-side verification")]
#[command(long_about = r#"
vadd compiles a vector-add kernel for an OpenCL device, runs c = a + b over
two random vectors, and checks every element on the host.

Examples:
  # Run on the default device
  vadd

  # Prefer a GPU and a longer vector
  vadd --device gpu run --length 1048576

  # Run on the built-in CPU reference device
  vadd run --runtime reference

  # List devices
  vadd devices
"#)]
#[command(version)]
struct Cli {
    /// Configuration file path (defaults to ./vadd.toml if present)
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Device class (default, cpu, gpu, accelerator, all)
    #[arg(short, long, value_name = "CLASS", global = true)]
    device: Option<DeviceClass>,

    /// Log level or filter directive (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    /// Log format (compact, pretty, json)
    #[arg(long, value_name = "FORMAT", global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline once (default)
    Run(RunCommand),

    /// List platforms and devices
    #[command(alias = "list")]
    Devices(DevicesCommand),

    /// Print the embedded kernel source
    Kernel(KernelCommand),
}

fn main() {
    let cli = Cli::parse();

    let config = match load_configuration(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {e}", style("Error:").red().bold());
            std::process::exit(EXIT_CONFIG_FAIL);
        }
    };

    if let Err(e) = setup_logging(&config) {
        eprintln!("{} {e:#}", style("Error:").red().bold());
        std::process::exit(EXIT_CONFIG_FAIL);
    }

    let command = cli.command.unwrap_or_else(|| Commands::Run(RunCommand::default()));
    let result = match command {
        Commands::Run(cmd) => cmd.execute(&config),
        Commands::Devices(cmd) => cmd.execute(config.device),
        Commands::Kernel(cmd) => cmd.execute(),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            // `print_failure` is the user-facing report for pipeline errors.
            match e.downcast_ref::<VaddError>() {
                Some(err) => {
                    debug!(step = %err.step(), "command failed: {err}");
                    print_failure(err);
                }
                None => {
                    error!("Command failed: {}", e);

                    // Show error chain
                    let mut source = e.source();
                    while let Some(err) = source {
                        error!("  Caused by: {}", err);
                        source = err.source();
                    }
                    eprintln!("{} {e:#}", style("Error:").red().bold());
                }
            }
            std::process::exit(EXIT_PIPELINE_FAIL);
        }
    }
}

/// Load configuration from file and environment, then apply CLI flags
fn load_configuration(cli: &Cli) -> Result<VaddConfig, ConfigError> {
    let run = match &cli.command {
        Some(Commands::Run(run)) => Some(run),
        _ => None,
    };

    ConfigBuilder::discover(cli.config.as_deref())?
        .device(cli.device)
        .log_level(cli.log_level.clone())
        .log_format(cli.log_format.clone())
        .length(run.and_then(|r| r.length))
        .seed(run.and_then(|r| r.seed))
        .tolerance(run.and_then(|r| r.tolerance))
        .build_options(run.and_then(|r| r.build_options.clone()))
        .strict(run.and_then(|r| r.strict.then_some(true)))
        .build()
}

/// Setup logging based on configuration
///
/// Logs go to stderr; stdout carries only the report.
fn setup_logging(config: &VaddConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match config.logging.format.as_str() {
        "json" => {
            subscriber.json().with_timer(tracing_subscriber::fmt::time::uptime()).init();
        }
        "pretty" => {
            subscriber.pretty().init();
        }
        _ => {
            subscriber.compact().init();
        }
    }

    Ok(())
}
