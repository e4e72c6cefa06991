//! Core execution modules

pub mod conda;

pub use conda::{CondaArgs, CondaModule};
