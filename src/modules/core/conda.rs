//! Conda module - manages Python packages via conda

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use crate::modules::{
    error::{CondaError, ModuleExecutionError, ValidationError},
    interface::{
        ArgumentSpec, ExecutionContext, ExecutionModule, ModuleArgs, ModuleDocumentation,
        ModuleResult, Platform, ReturnValueSpec,
    },
    system::package_managers::{
        conda::{command::split_words, locate_conda, Reconciliation},
        CommandExecutor, CondaConfig, CondaRunner, DesiredState, PackageRequest, PackageSpec,
        ProcessOptions, Reconciler, TokioCommandExecutor,
    },
};

/// Arguments accepted by the conda module
#[derive(Debug, Clone, Deserialize)]
pub struct CondaArgs {
    pub name: String,
    #[serde(default, deserialize_with = "optional_text")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "state_or_default")]
    pub state: DesiredState,
    #[serde(default, deserialize_with = "word_list")]
    pub channels: Vec<String>,
    #[serde(default)]
    pub executable: Option<PathBuf>,
    #[serde(default, deserialize_with = "word_list")]
    pub extra_args: Vec<String>,
}

impl CondaArgs {
    pub fn request(&self) -> Result<PackageRequest, CondaError> {
        let package = PackageSpec::new(self.name.clone(), self.version.clone())?;
        PackageRequest::new(package, self.state)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(serde_json::Number),
}

/// Versions written as YAML numbers (`version: 0.14`) arrive as JSON numbers.
fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<TextOrNumber>::deserialize(deserializer)?;
    Ok(value
        .map(|v| match v {
            TextOrNumber::Text(s) => s.trim().to_string(),
            TextOrNumber::Number(n) => n.to_string(),
        })
        .filter(|s| !s.is_empty()))
}

/// An explicit `state: null` means the default state.
fn state_or_default<'de, D>(deserializer: D) -> Result<DesiredState, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<DesiredState>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Words {
    Text(String),
    List(Vec<String>),
}

/// Whitespace-delimited string, or an explicit list of tokens.
fn word_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Words>::deserialize(deserializer)? {
        Some(Words::Text(text)) => split_words(&text),
        Some(Words::List(items)) => items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect(),
        None => Vec::new(),
    })
}

/// Conda module - installs, upgrades and removes conda packages
pub struct CondaModule {
    executor: Arc<dyn CommandExecutor>,
}

impl Default for CondaModule {
    fn default() -> Self {
        Self::new()
    }
}

impl CondaModule {
    pub fn new() -> Self {
        Self::with_executor(Arc::new(TokioCommandExecutor))
    }

    pub fn with_executor(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    fn parse_args(&self, args: &ModuleArgs) -> Result<CondaArgs, ModuleExecutionError> {
        serde_json::from_value(args.to_value()).map_err(|e| ModuleExecutionError::InvalidArgs {
            message: e.to_string(),
        })
    }

    async fn run(
        &self,
        args: &ModuleArgs,
        context: &ExecutionContext,
        check_mode: bool,
    ) -> Result<ModuleResult, ModuleExecutionError> {
        let conda_args = self.parse_args(args)?;
        let request = conda_args.request()?;

        let config = CondaConfig::new(locate_conda(conda_args.executable.as_deref())?)
            .with_channels(conda_args.channels)
            .with_extra_args(conda_args.extra_args);
        let options = ProcessOptions::from(context);

        let runner = CondaRunner::new(self.executor.as_ref(), &config, &options);
        let reconciliation = Reconciler::new(runner, check_mode)
            .reconcile(&request)
            .await?;

        Ok(to_module_result(&request, reconciliation, check_mode))
    }
}

fn to_module_result(
    request: &PackageRequest,
    reconciliation: Reconciliation,
    check_mode: bool,
) -> ModuleResult {
    let package = request.package();
    match reconciliation {
        Reconciliation::Unchanged => {
            ModuleResult::unchanged(format!("Package {package} is already installed"))
        }
        Reconciliation::AlreadyAbsent => {
            ModuleResult::unchanged(format!("Package {} is already absent", package.name()))
        }
        Reconciliation::Installed { package, output } => {
            let verb = if check_mode { "would be installed" } else { "installed" };
            let mut result = ModuleResult::changed(format!("Package {package} {verb}"));
            result.results.insert("name".to_string(), json!(package.name()));
            result.results.insert("version".to_string(), json!(package.version()));
            result.results.insert("output".to_string(), json!(output.output));
            result.results.insert("error".to_string(), json!(output.stderr));
            result.stderr = Some(output.stderr);
            result
        }
        Reconciliation::Removed { package, output } => {
            let verb = if check_mode { "would be removed" } else { "removed" };
            let mut result = ModuleResult::changed(format!("Package {} {verb}", package.name()));
            result.results.insert("output".to_string(), json!(output.output));
            result.results.insert("error".to_string(), json!(output.stderr));
            result.stderr = Some(output.stderr);
            result
        }
    }
}

#[async_trait]
impl ExecutionModule for CondaModule {
    fn name(&self) -> &'static str {
        "conda"
    }

    fn version(&self) -> &'static str {
        "1.0.0"
    }

    fn supported_platforms(&self) -> &[Platform] {
        &[
            Platform::Linux,
            Platform::MacOS,
            Platform::Windows,
            Platform::FreeBSD,
        ]
    }

    async fn execute(
        &self,
        args: &ModuleArgs,
        context: &ExecutionContext,
    ) -> Result<ModuleResult, ModuleExecutionError> {
        self.run(args, context, context.check_mode).await
    }

    fn validate_args(&self, args: &ModuleArgs) -> Result<(), ValidationError> {
        if !args.args.contains_key("name") {
            return Err(ValidationError::MissingRequiredArg {
                arg: "name".to_string(),
            });
        }

        let conda_args = self
            .parse_args(args)
            .map_err(|e| ValidationError::InvalidArgValue {
                arg: "args".to_string(),
                value: args.to_value().to_string(),
                reason: e.to_string(),
            })?;

        conda_args
            .request()
            .map_err(|e| ValidationError::InvalidArgValue {
                arg: "name".to_string(),
                value: conda_args.name.clone(),
                reason: e.to_string(),
            })?;

        Ok(())
    }

    async fn check_mode(
        &self,
        args: &ModuleArgs,
        context: &ExecutionContext,
    ) -> Result<ModuleResult, ModuleExecutionError> {
        // Conda can dry-run everything, so check mode still talks to conda.
        self.run(args, context, true).await
    }

    fn documentation(&self) -> ModuleDocumentation {
        ModuleDocumentation {
            description: "Manage Python libraries via conda. Can install, update, and remove \
                          packages. Requires conda to already be installed."
                .to_string(),
            arguments: vec![
                ArgumentSpec {
                    name: "name".to_string(),
                    description: "The name of a Python library to install".to_string(),
                    required: true,
                    argument_type: "str".to_string(),
                    default: None,
                },
                ArgumentSpec {
                    name: "version".to_string(),
                    description: "A specific version of a library to install".to_string(),
                    required: false,
                    argument_type: "str".to_string(),
                    default: None,
                },
                ArgumentSpec {
                    name: "state".to_string(),
                    description:
                        "State in which to leave the Python package (present, absent, latest)"
                            .to_string(),
                    required: false,
                    argument_type: "str".to_string(),
                    default: Some("present".to_string()),
                },
                ArgumentSpec {
                    name: "channels".to_string(),
                    description: "Extra channels to use when installing packages".to_string(),
                    required: false,
                    argument_type: "str or list".to_string(),
                    default: None,
                },
                ArgumentSpec {
                    name: "executable".to_string(),
                    description: "Full path to the conda executable".to_string(),
                    required: false,
                    argument_type: "path".to_string(),
                    default: None,
                },
                ArgumentSpec {
                    name: "extra_args".to_string(),
                    description: "Extra arguments passed to conda".to_string(),
                    required: false,
                    argument_type: "str or list".to_string(),
                    default: None,
                },
            ],
            examples: vec![
                r#"conda:
    name: numpy
    state: latest"#
                    .to_string(),
                r#"conda:
    name: scipy
    version: "0.14""#
                    .to_string(),
                r#"conda:
    name: matplotlib
    state: absent"#
                    .to_string(),
            ],
            return_values: vec![
                ReturnValueSpec {
                    name: "output".to_string(),
                    description: "Parsed JSON result of the conda command".to_string(),
                    returned: "changed".to_string(),
                    value_type: "dict".to_string(),
                },
                ReturnValueSpec {
                    name: "error".to_string(),
                    description: "Raw standard error of the install or remove command"
                        .to_string(),
                    returned: "changed".to_string(),
                    value_type: "str".to_string(),
                },
                ReturnValueSpec {
                    name: "stderr".to_string(),
                    description: "Standard error from conda".to_string(),
                    returned: "changed".to_string(),
                    value_type: "str".to_string(),
                },
                ReturnValueSpec {
                    name: "msg".to_string(),
                    description: "A short description of what happened".to_string(),
                    returned: "always".to_string(),
                    value_type: "str".to_string(),
                },
            ],
        }
    }
}
