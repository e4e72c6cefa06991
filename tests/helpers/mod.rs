//! Shared fixtures for conda tests

#![allow(dead_code)]

use async_trait::async_trait;
use rustle_conda::modules::system::package_managers::{
    CommandExecutor, ProcessOptions, ProcessOutput,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::io;
use std::sync::Mutex;

/// Replays canned process outputs in order and records every command line.
#[derive(Default)]
pub struct ScriptedExecutor {
    responses: Mutex<VecDeque<ProcessOutput>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        self.responses.lock().unwrap().push_back(ProcessOutput {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
        self
    }

    pub fn respond_json(self, value: Value) -> Self {
        self.respond(0, value.to_string(), "")
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call(&self, index: usize) -> Vec<String> {
        self.calls()[index].clone()
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn run(&self, argv: &[String], _options: &ProcessOptions) -> io::Result<ProcessOutput> {
        self.calls.lock().unwrap().push(argv.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "no scripted response left"))
    }
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn already_installed() -> Value {
    serde_json::json!({
        "message": "All requested packages already installed.",
        "success": true
    })
}

pub fn planned_actions(package: &str) -> Value {
    serde_json::json!({
        "actions": {"LINK": [format!("{package}-1.0-py_0")], "PREFIX": "/opt/conda"},
        "success": true
    })
}

pub fn package_not_found(package: &str) -> Value {
    serde_json::json!({
        "error": format!("PackageNotFoundError: {package}"),
        "exception_name": "PackageNotFoundError",
        "message": format!("Package not found: '{package}'")
    })
}
