//! Package manager implementations

use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use tokio::process::Command;

use crate::modules::interface::ExecutionContext;

pub mod conda;

pub use conda::{CondaConfig, CondaRunner, DesiredState, PackageRequest, PackageSpec, Reconciler};

/// Captured result of one finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Where and with which extra environment a command runs
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    pub working_directory: Option<PathBuf>,
    pub environment: HashMap<String, String>,
}

impl From<&ExecutionContext> for ProcessOptions {
    fn from(context: &ExecutionContext) -> Self {
        Self {
            working_directory: Some(context.working_directory.clone()),
            environment: context.environment.clone(),
        }
    }
}

/// Runs a command line to completion and captures its output
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn run(&self, argv: &[String], options: &ProcessOptions) -> io::Result<ProcessOutput>;
}

/// Executes commands as local child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioCommandExecutor;

#[async_trait]
impl CommandExecutor for TokioCommandExecutor {
    async fn run(&self, argv: &[String], options: &ProcessOptions) -> io::Result<ProcessOutput> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Empty command"))?;

        let mut cmd = Command::new(program);
        cmd.args(args);

        if let Some(dir) = &options.working_directory {
            cmd.current_dir(dir);
        }
        for (key, value) in &options.environment {
            cmd.env(key, value);
        }

        let output = cmd.output().await?;

        Ok(ProcessOutput {
            // Killed by a signal
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_command_is_rejected() {
        let result = TokioCommandExecutor
            .run(&[], &ProcessOptions::default())
            .await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::InvalidInput);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_exit_code_and_streams() {
        let argv: Vec<String> = ["sh", "-c", "echo out; echo err >&2; exit 3"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let output = TokioCommandExecutor
            .run(&argv, &ProcessOptions::default())
            .await
            .unwrap();

        assert_eq!(output.exit_code, 3);
        assert!(!output.success());
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_applies_environment() {
        let argv: Vec<String> = ["sh", "-c", "printf %s \"$CONDA_TEST_VALUE\""]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let options = ProcessOptions {
            working_directory: None,
            environment: [("CONDA_TEST_VALUE".to_string(), "42".to_string())].into(),
        };
        let output = TokioCommandExecutor.run(&argv, &options).await.unwrap();
        assert_eq!(output.stdout, "42");
    }
}
