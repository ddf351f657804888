//! CLI command implementations

pub mod devices;
pub mod kernel;
pub mod run;

pub use devices::DevicesCommand;
pub use kernel::KernelCommand;
pub use run::RunCommand;

use clap::ValueEnum;
use console::style;
use vadd_common::VaddError;

/// Which compute runtime executes the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RuntimeKind {
    /// System OpenCL implementation
    #[cfg(feature = "opencl")]
    Opencl,
    /// Built-in CPU reference device
    Reference,
}

impl Default for RuntimeKind {
    #[cfg(feature = "opencl")]
    fn default() -> Self {
        Self::Opencl
    }

    #[cfg(not(feature = "opencl"))]
    fn default() -> Self {
        Self::Reference
    }
}

/// Report format on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print a pipeline failure: a step/status line on stderr, and verbatim
/// device output on stdout.
pub fn print_failure(err: &VaddError) {
    let prefix = style("Error:").red().bold();
    match err {
        VaddError::NoPlatform => println!("{err}"),
        VaddError::CompileFailed { status, log } => {
            eprintln!("{prefix} Failed to build program executable!\n{status}");
            println!("{log}");
        }
        other => match other.status() {
            Some(status) => eprintln!("{prefix} {} failed: {status}", other.step()),
            None => eprintln!("{prefix} {other}"),
        },
    }
}
