//! Host-facing system integrations

pub mod package_managers;
