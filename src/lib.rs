//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-runtime`, `core-metadata`, `core-service`). Host
//! shells (HTTP front-end, command line) can depend on `mmc-workspace` and
//! enable the documented features without wiring each crate individually.

#[cfg(feature = "metadata")]
pub use core_metadata as metadata;

#[cfg(feature = "service")]
pub use core_runtime as runtime;
#[cfg(feature = "service")]
pub use core_service as service;
