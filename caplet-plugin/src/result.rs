use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

/// Outcome of a capability call.
///
/// On the wire each variant keeps the envelope hosts already understand:
///
/// - `Success` → `{"status": "success", "data": ...}`
/// - `Error` → `{"status": "error", "message": ...}`
/// - `Artifact` → `{"direct_result": {"kind", "format", "value"}}`
/// - `Text` → `{"result": ...}`
///
/// Hosts that receive raw JSON should go through [`ExecutionResult::from_value`]
/// instead of checking keys themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Envelope", from = "Value")]
pub enum ExecutionResult {
    Success { data: Value },
    Error { message: String },
    /// The value is a deliverable (e.g. a file path), not text to narrate.
    Artifact(DirectResult),
    /// Plain result string used by plugins that predate the other envelopes.
    Text(String),
}

/// Payload of a direct-result envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectResult {
    pub kind: String,
    pub format: String,
    pub value: Value,
}

impl DirectResult {
    pub fn file_path(path: impl AsRef<Path>) -> Self {
        Self {
            kind: "file".to_string(),
            format: "path".to_string(),
            value: Value::String(path.as_ref().to_string_lossy().into_owned()),
        }
    }
}

impl ExecutionResult {
    pub fn success(data: Value) -> Self {
        Self::Success { data }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn text(result: impl Into<String>) -> Self {
        Self::Text(result.into())
    }

    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::Artifact(DirectResult::file_path(path))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Path of a file artifact, if this result is one.
    pub fn file_path(&self) -> Option<&str> {
        match self {
            Self::Artifact(direct) if direct.kind == "file" && direct.format == "path" => {
                direct.value.as_str()
            }
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(Envelope::from(self.clone())).unwrap_or(Value::Null)
    }

    /// Interpret a raw plugin reply.
    ///
    /// Keys are checked in the order `status`, `direct_result`, `result`.
    /// Anything that matches none of them becomes an error result.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self::error("Plugin returned a non-object result");
        };

        if let Some(status) = map.remove("status") {
            return match status.as_str() {
                Some("success") => Self::success(map.remove("data").unwrap_or(Value::Null)),
                _ => Self::error(message_of(&map)),
            };
        }

        if let Some(direct) = map.remove("direct_result") {
            return match serde_json::from_value::<DirectResult>(direct) {
                Ok(direct) => Self::Artifact(direct),
                Err(e) => Self::error(format!("Malformed direct_result: {}", e)),
            };
        }

        match map.remove("result") {
            Some(Value::String(result)) => Self::Text(result),
            Some(other) => Self::Text(other.to_string()),
            None => Self::error("Unrecognized plugin result"),
        }
    }
}

fn message_of(map: &Map<String, Value>) -> String {
    map.get("message")
        .and_then(Value::as_str)
        .unwrap_or("Unknown error")
        .to_string()
}

impl From<Value> for ExecutionResult {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum Envelope {
    Status(StatusEnvelope),
    Direct { direct_result: DirectResult },
    Legacy { result: String },
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum StatusEnvelope {
    Success { data: Value },
    Error { message: String },
}

impl From<ExecutionResult> for Envelope {
    fn from(result: ExecutionResult) -> Self {
        match result {
            ExecutionResult::Success { data } => Self::Status(StatusEnvelope::Success { data }),
            ExecutionResult::Error { message } => Self::Status(StatusEnvelope::Error { message }),
            ExecutionResult::Artifact(direct_result) => Self::Direct { direct_result },
            ExecutionResult::Text(result) => Self::Legacy { result },
        }
    }
}
