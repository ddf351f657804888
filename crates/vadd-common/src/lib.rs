//! Common types, status codes and configuration for vadd-rs
//!
//! This crate holds everything the device pipeline and the CLI agree on:
//! OpenCL status-code naming, the pipeline error taxonomy, device and
//! memory enums, and the layered run configuration.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ConfigBuilder, ConfigError, LoggingConfig, VaddConfig};
pub use error::{status_name, ClStatus, Result, Step, VaddError};
pub use types::{DeviceClass, MemAccess, TransferDirection};
