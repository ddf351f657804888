//! Run the vector-add pipeline

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use tracing::info;

use super::{OutputFormat, RuntimeKind};
use crate::exit::{EXIT_SUCCESS, EXIT_VERIFY_FAIL};
use vadd_common::{VaddConfig, VaddError};
use vadd_opencl::{
    run_on_session, ComputeRuntime, HostVectors, ReferenceRuntime, RunOptions, RunReport,
    VaddSession,
};

/// Host conditions the reference runtime can reproduce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Simulation {
    /// No OpenCL platform installed
    NoPlatforms,
    /// A device that adds 0.5 to every result
    FaultyDevice,
}

/// Compute c = a + b on a device and verify it on the host
#[derive(Debug, Clone, Default, Args)]
pub struct RunCommand {
    /// Number of elements per vector
    #[arg(long, value_name = "N")]
    pub length: Option<usize>,

    /// Seed for the random inputs
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Largest accepted |a + b - c|
    #[arg(long, value_name = "TOL")]
    pub tolerance: Option<f64>,

    /// Compute runtime
    #[arg(long, value_enum, default_value_t = RuntimeKind::default())]
    pub runtime: RuntimeKind,

    /// Exit with status 3 if any element fails verification
    #[arg(long)]
    pub strict: bool,

    /// Options passed to the device compiler
    #[arg(long, value_name = "OPTIONS", allow_hyphen_values = true)]
    pub build_options: Option<String>,

    /// Build this OpenCL C file instead of the embedded kernel
    #[arg(long, value_name = "PATH")]
    pub kernel_file: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output_format: OutputFormat,

    /// Reference runtime only: reproduce a host condition
    #[arg(long, value_enum, value_name = "CONDITION")]
    pub simulate: Option<Simulation>,
}

impl RunCommand {
    /// Run once and return the process exit code.
    pub fn execute(&self, config: &VaddConfig) -> Result<i32> {
        let mut options = RunOptions::from(config);
        if let Some(path) = &self.kernel_file {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read kernel source {}", path.display()))?;
            options.kernel_source = Some(source);
        }
        let vectors = HostVectors::random(config.length, config.seed);
        info!(length = config.length, seed = config.seed, runtime = ?self.runtime, "starting run");

        let report = match self.runtime {
            #[cfg(feature = "opencl")]
            RuntimeKind::Opencl => {
                if self.simulate.is_some() {
                    tracing::warn!("--simulate only applies to the reference runtime; ignoring");
                }
                self.run_with(&vadd_opencl::OpenClRuntime::new(), &options, &vectors)?
            }
            RuntimeKind::Reference => {
                self.run_with(&self.reference_runtime(), &options, &vectors)?
            }
        };

        self.print_report(&report)?;

        if config.strict && !report.verification.all_correct() {
            return Ok(EXIT_VERIFY_FAIL);
        }
        Ok(EXIT_SUCCESS)
    }

    fn reference_runtime(&self) -> ReferenceRuntime {
        match self.simulate {
            None => ReferenceRuntime::new(),
            Some(Simulation::NoPlatforms) => ReferenceRuntime::without_platforms(),
            Some(Simulation::FaultyDevice) => ReferenceRuntime::new().with_output_offset(0.5),
        }
    }

    fn run_with<R: ComputeRuntime>(
        &self,
        runtime: &R,
        options: &RunOptions,
        vectors: &HostVectors,
    ) -> Result<RunReport, VaddError> {
        let session = VaddSession::open(runtime, options.device)?;
        if self.output_format == OutputFormat::Text {
            println!("Using device: {}", session.device_name());
        }
        run_on_session(&session, options, vectors)
    }

    fn print_report(&self, report: &RunReport) -> Result<()> {
        match self.output_format {
            OutputFormat::Text => {
                for mismatch in &report.verification.mismatches {
                    println!("{mismatch}");
                }
                println!("{}", report.verification.summary());
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(report)?);
            }
        }
        Ok(())
    }
}
