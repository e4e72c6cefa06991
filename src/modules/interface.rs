//! Module interface traits and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::modules::error::{ModuleExecutionError, ValidationError};

/// Unified interface for all execution modules
#[async_trait]
pub trait ExecutionModule: Send + Sync {
    /// Module name (e.g., "conda")
    fn name(&self) -> &'static str;

    /// Module version
    fn version(&self) -> &'static str;

    /// Supported platforms
    fn supported_platforms(&self) -> &[Platform];

    /// Execute the module with given arguments
    async fn execute(
        &self,
        args: &ModuleArgs,
        context: &ExecutionContext,
    ) -> Result<ModuleResult, ModuleExecutionError>;

    /// Validate module arguments before execution
    fn validate_args(&self, args: &ModuleArgs) -> Result<(), ValidationError>;

    /// Report what the module would change without mutating the host
    async fn check_mode(
        &self,
        args: &ModuleArgs,
        context: &ExecutionContext,
    ) -> Result<ModuleResult, ModuleExecutionError>;

    /// Get module documentation
    fn documentation(&self) -> ModuleDocumentation;
}

/// Module execution arguments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleArgs {
    pub args: HashMap<String, serde_json::Value>,
}

impl ModuleArgs {
    /// Build arguments from a JSON object; any other value yields no arguments.
    pub fn from_json(value: serde_json::Value) -> Self {
        let args = match value {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            _ => HashMap::new(),
        };
        Self { args }
    }

    /// All arguments as one JSON object, ready for `serde_json::from_value`.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.args
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

/// Module execution context
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub host_info: HostInfo,
    pub working_directory: PathBuf,
    /// Variables added on top of the inherited process environment
    pub environment: HashMap<String, String>,
    pub check_mode: bool,
}

impl ExecutionContext {
    /// Context for running against the local host from the current directory.
    pub fn local(check_mode: bool) -> Self {
        Self {
            host_info: HostInfo::detect(),
            working_directory: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            environment: HashMap::new(),
            check_mode,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HostInfo {
    pub hostname: String,
    pub platform: Platform,
    pub architecture: String,
}

impl HostInfo {
    pub fn detect() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string());

        let platform = if cfg!(target_os = "macos") {
            Platform::MacOS
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "freebsd") {
            Platform::FreeBSD
        } else {
            Platform::Linux
        };

        Self {
            hostname,
            platform,
            architecture: std::env::consts::ARCH.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Linux,
    MacOS,
    Windows,
    FreeBSD,
}

/// Module execution result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleResult {
    pub changed: bool,
    pub failed: bool,
    pub msg: Option<String>,
    /// Raw standard error of the mutating command
    pub stderr: Option<String>,
    pub results: HashMap<String, serde_json::Value>,
}

impl ModuleResult {
    pub fn unchanged(msg: impl Into<String>) -> Self {
        Self {
            msg: Some(msg.into()),
            ..Default::default()
        }
    }

    pub fn changed(msg: impl Into<String>) -> Self {
        Self {
            changed: true,
            msg: Some(msg.into()),
            ..Default::default()
        }
    }
}

/// Module documentation
#[derive(Debug, Clone)]
pub struct ModuleDocumentation {
    pub description: String,
    pub arguments: Vec<ArgumentSpec>,
    pub examples: Vec<String>,
    pub return_values: Vec<ReturnValueSpec>,
}

#[derive(Debug, Clone)]
pub struct ArgumentSpec {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub argument_type: String,
    pub default: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReturnValueSpec {
    pub name: String,
    pub description: String,
    pub returned: String,
    pub value_type: String,
}
