//! Rustle Conda - idempotent conda package management
//!
//! This crate provides an Ansible-compatible `conda` execution module. It
//! drives the conda command line with `--json`, isolates the result object
//! from conda's progress chatter, and installs or removes a package only when
//! its current state differs from the requested one.

pub mod modules;

pub use modules::core::{CondaArgs, CondaModule};
pub use modules::{
    CondaError, ExecutionContext, ExecutionModule, ModuleArgs, ModuleError, ModuleRegistry,
    ModuleResult,
};
