use serde_json::{Map, Value};
use thiserror::Error;

use crate::modules::system::package_managers::conda::install_target;

/// Errors that can occur during module operations
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("Module not found: {name}")]
    ModuleNotFound { name: String },

    #[error("Invalid arguments: {message}")]
    InvalidArgs { message: String },

    #[error("Unsupported platform: {0:?}")]
    UnsupportedPlatform(crate::modules::interface::Platform),

    #[error("Module execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Conda(#[from] CondaError),
}

/// Errors that can occur during module argument validation
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required argument: {arg}")]
    MissingRequiredArg { arg: String },

    #[error("Invalid argument value: {arg} = {value} - {reason}")]
    InvalidArgValue {
        arg: String,
        value: String,
        reason: String,
    },
}

/// Module execution error
pub type ModuleExecutionError = ModuleError;

/// Conda specific errors
#[derive(Error, Debug, Clone)]
pub enum CondaError {
    /// The request contradicts itself and no command was issued.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("could not find conda executable{}", describe_location(.path.as_deref()))]
    ExecutableNotFound { path: Option<String> },

    /// Conda exited non-zero or printed nothing that could be parsed.
    #[error("{}", describe_tool_error(.command, .message.as_deref(), .stdout, .stderr))]
    ToolExecution {
        command: Vec<String>,
        message: Option<String>,
        output: Option<Map<String, Value>>,
        stdout: String,
        stderr: String,
    },

    #[error("Conda package \"{}\" not found", install_target(.name, .version.as_deref()))]
    PackageNotFound {
        name: String,
        version: Option<String>,
    },

    /// Conda succeeded but its JSON matched none of the known result shapes.
    #[error("{}", describe_unexpected_output(.output.as_ref(), .stderr))]
    UnexpectedOutput {
        output: Option<Map<String, Value>>,
        stderr: String,
    },

    #[error("Failed to spawn {}: {error}", .command.join(" "))]
    Spawn { command: Vec<String>, error: String },
}

impl CondaError {
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        CondaError::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Parsed conda output attached to the error, if any.
    pub fn output(&self) -> Option<&Map<String, Value>> {
        match self {
            CondaError::ToolExecution { output, .. }
            | CondaError::UnexpectedOutput { output, .. } => output.as_ref(),
            _ => None,
        }
    }
}

fn describe_location(path: Option<&str>) -> String {
    path.map(|p| format!(" at {p}")).unwrap_or_default()
}

fn describe_tool_error(
    command: &[String],
    message: Option<&str>,
    stdout: &str,
    stderr: &str,
) -> String {
    let mut description = format!("Error running command: {}.", command.join(" "));
    if let Some(message) = message {
        description.push_str(&format!(" Error: {message}."));
    } else if !stdout.trim().is_empty() {
        description.push_str(&format!(" stdout: {stdout}."));
    }
    if !stderr.trim().is_empty() {
        description.push_str(&format!(" stderr: {stderr}."));
    }
    description
}

fn describe_unexpected_output(output: Option<&Map<String, Value>>, stderr: &str) -> String {
    let output = output
        .map(|o| Value::Object(o.clone()).to_string())
        .unwrap_or_else(|| "null".to_string());
    let mut description = format!(
        "Unexpected output from Conda (may be due to a change in Conda's output format): \
         \"{output}\"."
    );
    if !stderr.trim().is_empty() {
        description.push_str(&format!(" stderr: {stderr}"));
    }
    description
}

impl From<serde_json::Error> for ModuleError {
    fn from(err: serde_json::Error) -> Self {
        ModuleError::InvalidArgs {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn command() -> Vec<String> {
        ["conda", "install", "--json", "numpy"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_tool_error_prefers_message_over_stdout() {
        let err = CondaError::ToolExecution {
            command: command(),
            message: Some("boom".to_string()),
            output: None,
            stdout: "{\"message\": \"boom\"}".to_string(),
            stderr: String::new(),
        };
        assert_eq!(
            err.to_string(),
            "Error running command: conda install --json numpy. Error: boom."
        );
    }

    #[test]
    fn test_tool_error_shows_raw_stdio_without_message() {
        let err = CondaError::ToolExecution {
            command: command(),
            message: None,
            output: None,
            stdout: "garbage".to_string(),
            stderr: "bad things".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("stdout: garbage."));
        assert!(text.contains("stderr: bad things."));
    }

    #[test]
    fn test_package_not_found_names_install_target() {
        let err = CondaError::PackageNotFound {
            name: "scipy".to_string(),
            version: Some("0.14".to_string()),
        };
        assert_eq!(err.to_string(), "Conda package \"scipy=0.14\" not found");
    }

    #[test]
    fn test_unexpected_output_embeds_json() {
        let output = json!({"success": true});
        let err = CondaError::UnexpectedOutput {
            output: output.as_object().cloned(),
            stderr: String::new(),
        };
        assert!(err.to_string().contains("{\"success\":true}"));
        assert!(err.output().is_some());
    }
}
