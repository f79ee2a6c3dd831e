//! High-level debatebot SDK: plugin registry and built-in plugins.

use debatebot_core::{
    Arguments, ExecutionRequest, ExecutionResult, FunctionSpec, Helper, Plugin, PluginError,
};
use debatebot_schema::validate_arguments;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

struct Entry {
    plugin: Arc<dyn Plugin>,
    spec: FunctionSpec,
}

/// Routes function calls to plugins by function name.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
    functions: HashMap<String, Entry>,
    order: Vec<String>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every built-in plugin enabled at compile time. The debate
    /// status plugin reads its store credentials from the environment.
    pub fn from_env() -> Result<Self, PluginError> {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "debate-status")]
        registry.register(Arc::new(
            debatebot_plugin_debate_status::DebateStatusPlugin::from_env()?,
        ))?;
        #[cfg(feature = "new-entry")]
        registry.register(Arc::new(debatebot_plugin_new_entry::NewEntryPlugin::new()?))?;
        Ok(registry)
    }

    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<&mut Self, PluginError> {
        let specs = plugin.spec();
        for spec in &specs {
            if self.functions.contains_key(&spec.name) {
                return Err(PluginError::Configuration(format!(
                    "function `{}` from `{}` is already registered",
                    spec.name,
                    plugin.source_name()
                )));
            }
        }
        for spec in specs {
            debug!(source = plugin.source_name(), function = %spec.name, "registering function");
            self.order.push(spec.name.clone());
            self.functions.insert(
                spec.name.clone(),
                Entry {
                    plugin: Arc::clone(&plugin),
                    spec,
                },
            );
        }
        self.plugins.push(plugin);
        Ok(self)
    }

    pub fn specs(&self) -> Vec<FunctionSpec> {
        self.order
            .iter()
            .filter_map(|name| self.functions.get(name))
            .map(|entry| entry.spec.clone())
            .collect()
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.source_name()).collect()
    }

    pub fn plugin_for(&self, function_name: &str) -> Option<&Arc<dyn Plugin>> {
        self.functions.get(function_name).map(|entry| &entry.plugin)
    }

    /// Validates `arguments` against the function's declared parameters and
    /// hands the call to the owning plugin.
    pub async fn execute(
        &self,
        function_name: &str,
        helper: &dyn Helper,
        arguments: Arguments,
    ) -> Result<ExecutionResult, PluginError> {
        let entry = self
            .functions
            .get(function_name)
            .ok_or_else(|| PluginError::UnknownFunction(function_name.to_string()))?;
        validate_arguments(&entry.spec.parameters, &arguments)
            .map_err(|e| PluginError::InvalidArguments(e.to_string()))?;
        entry.plugin.execute(function_name, helper, arguments).await
    }

    pub async fn execute_request(
        &self,
        helper: &dyn Helper,
        request: ExecutionRequest,
    ) -> Result<ExecutionResult, PluginError> {
        self.execute(&request.function_name, helper, request.arguments)
            .await
    }
}

pub use debatebot_core;
pub use debatebot_schema;

#[cfg(feature = "debate-status")]
pub use debatebot_plugin_debate_status;
#[cfg(feature = "new-entry")]
pub use debatebot_plugin_new_entry;
