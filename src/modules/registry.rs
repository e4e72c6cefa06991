//! Central registry for all execution modules

use crate::modules::{
    error::ModuleExecutionError,
    interface::{ExecutionContext, ExecutionModule, ModuleArgs, ModuleResult},
};
use std::collections::HashMap;
use tracing::debug;

/// Central registry for all execution modules
pub struct ModuleRegistry {
    modules: HashMap<String, Box<dyn ExecutionModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Create a registry with all core modules pre-registered
    pub fn with_core_modules() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(crate::modules::core::CondaModule::new()));
        registry
    }

    pub fn register(&mut self, module: Box<dyn ExecutionModule>) {
        self.modules.insert(module.name().to_string(), module);
    }

    pub fn get_module(&self, name: &str) -> Option<&dyn ExecutionModule> {
        self.modules.get(name).map(|m| m.as_ref())
    }

    pub fn list_modules(&self) -> Vec<&str> {
        self.modules.keys().map(|s| s.as_str()).collect()
    }

    pub async fn execute_module(
        &self,
        module_name: &str,
        args: &ModuleArgs,
        context: &ExecutionContext,
    ) -> Result<ModuleResult, ModuleExecutionError> {
        let module = self
            .get_module(module_name)
            .ok_or_else(|| ModuleExecutionError::ModuleNotFound {
                name: module_name.to_string(),
            })?;

        if !module
            .supported_platforms()
            .contains(&context.host_info.platform)
        {
            return Err(ModuleExecutionError::UnsupportedPlatform(
                context.host_info.platform.clone(),
            ));
        }

        module.validate_args(args)?;

        debug!(
            module = module_name,
            host = %context.host_info.hostname,
            arch = %context.host_info.architecture,
            check_mode = context.check_mode,
            "Executing module"
        );

        if context.check_mode {
            module.check_mode(args, context).await
        } else {
            module.execute(args, context).await
        }
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
