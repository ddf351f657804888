//! vadd CLI library
//!
//! This library exposes internal modules for testing purposes.

pub mod commands;
pub mod exit;
