use crate::{CapabilitySpec, ExecutionRequest, ExecutionResult, Plugin, PluginError, PluginHelper};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

struct Entry {
    spec: CapabilitySpec,
    plugin: Arc<dyn Plugin>,
}

/// Registry mapping capability names to the plugins that serve them.
///
/// The registry is responsible for:
/// - Validating capability specs at registration
/// - Keeping capability names unique across plugins
/// - Checking required arguments before dispatch
/// - Providing capability specs to the LLM
#[derive(Default)]
pub struct PluginRegistry {
    capabilities: HashMap<String, Entry>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every capability a plugin exposes.
    ///
    /// Nothing is registered if any spec is invalid or any name is taken.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), PluginError> {
        let specs = plugin.specs();

        let mut seen = Vec::with_capacity(specs.len());
        for spec in &specs {
            spec.validate()?;
            if self.capabilities.contains_key(&spec.name) || seen.contains(&spec.name.as_str()) {
                return Err(PluginError::DuplicateCapability(spec.name.clone()));
            }
            seen.push(spec.name.as_str());
        }

        for spec in specs {
            info!(capability = %spec.name, source = plugin.source_name(), "Registered capability");
            self.capabilities.insert(
                spec.name.clone(),
                Entry {
                    spec,
                    plugin: plugin.clone(),
                },
            );
        }

        Ok(())
    }

    /// Get the plugin serving a capability.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Plugin>> {
        self.capabilities.get(name).map(|entry| &entry.plugin)
    }

    pub fn source_of(&self, name: &str) -> Option<&str> {
        self.capabilities.get(name).map(|entry| entry.plugin.source_name())
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// All capability specs, ordered by name.
    pub fn specs(&self) -> Vec<&CapabilitySpec> {
        let mut specs: Vec<_> = self.capabilities.values().map(|entry| &entry.spec).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    /// Dispatch a request to the plugin that owns the capability.
    ///
    /// Missing required arguments are reported as an error result without
    /// calling the plugin.
    pub async fn execute(
        &self,
        request: ExecutionRequest,
        helper: &PluginHelper,
    ) -> Result<ExecutionResult, PluginError> {
        let entry = self
            .capabilities
            .get(&request.function_name)
            .ok_or_else(|| PluginError::UnknownCapability(request.function_name.clone()))?;

        for name in entry.spec.required_arguments() {
            if is_missing(request.arguments.get(name)) {
                debug!(capability = %request.function_name, argument = name, "Missing required argument");
                return Ok(ExecutionResult::error(format!(
                    "{} parameter is required.",
                    capitalize(name)
                )));
            }
        }

        info!(capability = %request.function_name, "Executing capability");
        let result = entry
            .plugin
            .execute(&request.function_name, helper, request.arguments)
            .await;
        debug!(capability = %request.function_name, is_error = result.is_error(), "Capability finished");

        Ok(result)
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}
