//! Embedded OpenCL C kernel sources.
//!
//! Sources are compiled at runtime by the device compiler of whichever
//! platform the locator selects.

/// Elementwise vector addition.
pub const VADD_SRC: &str = include_str!("vadd.cl");

/// Entry point defined by [`VADD_SRC`].
pub const VADD_ENTRY: &str = "vadd";

/// Kernel argument slots of `vadd`, in signature order.
pub const VADD_SLOT_A: u32 = 0;
pub const VADD_SLOT_B: u32 = 1;
pub const VADD_SLOT_C: u32 = 2;
