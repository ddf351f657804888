//! Device, memory and transfer enums shared across the workspace.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Device class preference used when searching platforms for a device.
///
/// Mirrors the OpenCL `cl_device_type` bitfield values the locator passes
/// to `clGetDeviceIDs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    /// Whatever the platform reports as its default device.
    #[default]
    Default,
    Cpu,
    Gpu,
    Accelerator,
    /// Any device at all.
    All,
}

impl DeviceClass {
    /// Raw `cl_device_type` bits for this class.
    pub const fn cl_bits(self) -> u64 {
        match self {
            Self::Default => 1 << 0,
            Self::Cpu => 1 << 1,
            Self::Gpu => 1 << 2,
            Self::Accelerator => 1 << 3,
            Self::All => 0xFFFF_FFFF,
        }
    }

    /// Whether a concrete device of class `device` satisfies this preference.
    ///
    /// `Default` and `All` accept any device; the concrete classes accept
    /// only themselves.
    pub fn accepts(self, device: DeviceClass) -> bool {
        match self {
            Self::Default | Self::All => true,
            wanted => wanted == device,
        }
    }

    pub const ALL: &'static [DeviceClass] =
        &[Self::Default, Self::Cpu, Self::Gpu, Self::Accelerator, Self::All];
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Default => "default",
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
            Self::Accelerator => "accelerator",
            Self::All => "all",
        };
        f.write_str(s)
    }
}

impl FromStr for DeviceClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" | "auto" => Ok(Self::Default),
            "cpu" => Ok(Self::Cpu),
            "gpu" => Ok(Self::Gpu),
            "accelerator" | "acc" => Ok(Self::Accelerator),
            "all" | "any" => Ok(Self::All),
            other => Err(format!(
                "unknown device class '{other}' (expected default, cpu, gpu, accelerator or all)"
            )),
        }
    }
}

/// Access intent of a device buffer, from the kernel's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemAccess {
    ReadOnly,
    WriteOnly,
}

impl MemAccess {
    /// Raw `cl_mem_flags` bits.
    pub const fn cl_flags(self) -> u64 {
        match self {
            Self::ReadOnly => 1 << 2,
            Self::WriteOnly => 1 << 1,
        }
    }
}

impl fmt::Display for MemAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => write!(f, "read-only"),
            Self::WriteOnly => write!(f, "write-only"),
        }
    }
}

/// Direction of a host/device copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferDirection {
    HostToDevice,
    DeviceToHost,
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostToDevice => write!(f, "host-to-device"),
            Self::DeviceToHost => write!(f, "device-to-host"),
        }
    }
}
