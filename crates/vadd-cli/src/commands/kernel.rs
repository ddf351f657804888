//! Print the embedded kernel

use anyhow::Result;
use clap::Args;

use crate::exit::EXIT_SUCCESS;
use vadd_opencl::kernels::{VADD_ENTRY, VADD_SRC};

/// Print the OpenCL C source the pipeline compiles
#[derive(Debug, Clone, Default, Args)]
pub struct KernelCommand {
    /// Print only the entry point name
    #[arg(long)]
    pub entry: bool,
}

impl KernelCommand {
    pub fn execute(&self) -> Result<i32> {
        if self.entry {
            println!("{VADD_ENTRY}");
        } else {
            print!("{VADD_SRC}");
        }
        Ok(EXIT_SUCCESS)
    }
}
