use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::ExecutionResult;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Capability already registered: {0}")]
    DuplicateCapability(String),

    #[error("Invalid spec for {name}: {reason}")]
    InvalidSpec { name: String, reason: String },

    #[error("Unknown capability: {0}")]
    UnknownCapability(String),
}

pub type Result<T> = std::result::Result<T, PluginError>;

/// Description of a single callable capability.
///
/// This is what gets presented to the language model: `parameters` is a
/// JSON-schema object describing the arguments `execute` expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilitySpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl CapabilitySpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Names listed under the schema's `required` key.
    pub fn required_arguments(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(Value::as_array)
            .map(|required| required.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Check that `parameters` is an object schema and that every required
    /// argument is a declared property.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| PluginError::InvalidSpec {
            name: self.name.clone(),
            reason,
        };

        if self.name.is_empty() {
            return Err(invalid("name must not be empty".to_string()));
        }

        if self.parameters.get("type").and_then(Value::as_str) != Some("object") {
            return Err(invalid("parameters must be an object schema".to_string()));
        }

        let properties = self
            .parameters
            .get("properties")
            .and_then(Value::as_object)
            .ok_or_else(|| invalid("parameters has no properties".to_string()))?;

        if let Some(required) = self.parameters.get("required") {
            let required = required
                .as_array()
                .ok_or_else(|| invalid("required must be an array".to_string()))?;
            for entry in required {
                let key = entry
                    .as_str()
                    .ok_or_else(|| invalid(format!("required entry {} is not a string", entry)))?;
                if !properties.contains_key(key) {
                    return Err(invalid(format!("required argument '{}' is not declared", key)));
                }
            }
        }

        Ok(())
    }
}

/// A single call from the host into a capability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub function_name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ExecutionRequest {
    pub fn new(function_name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            function_name: function_name.into(),
            arguments,
        }
    }

    /// Build a request from a JSON value. Anything that is not an object is
    /// treated as an empty argument list.
    pub fn from_json(function_name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(function_name, arguments)
    }
}

/// Integration handle the host passes into every `execute` call.
///
/// Plugins may use it to share session state with one another. Neither of the
/// built-in plugins touches it today.
#[derive(Clone, Default)]
pub struct PluginHelper {
    session_id: Option<String>,
    state: Arc<RwLock<Map<String, Value>>>,
}

impl PluginHelper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            state: Arc::default(),
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        self.state.read().await.get(key).cloned()
    }

    pub async fn set(&self, key: impl Into<String>, value: Value) {
        self.state.write().await.insert(key.into(), value);
    }
}

impl fmt::Debug for PluginHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginHelper")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

/// Core trait that all plugins must implement.
///
/// From the LLM's perspective each capability returned by [`Plugin::specs`]
/// is a "tool" it can call during a conversation.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Human-readable provenance label, usually the upstream service name.
    fn source_name(&self) -> &str;

    /// Capabilities this plugin exposes. Called once at registration and
    /// must return the same thing every time.
    fn specs(&self) -> Vec<CapabilitySpec>;

    /// Run the capability named `function_name`.
    ///
    /// Implementations must not panic; every failure is reported through the
    /// returned [`ExecutionResult`].
    async fn execute(
        &self,
        function_name: &str,
        helper: &PluginHelper,
        arguments: Map<String, Value>,
    ) -> ExecutionResult;
}
