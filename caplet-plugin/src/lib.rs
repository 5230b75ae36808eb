//! Plugin contract for caplet.
//!
//! A plugin advertises one or more capabilities (name, description and a
//! JSON-schema for its parameters) and executes them on behalf of a host
//! agent. Execution never fails from the host's point of view: every fault is
//! reported back as an [`ExecutionResult`].

mod plugin;
mod registry;
mod result;

pub use plugin::{CapabilitySpec, ExecutionRequest, Plugin, PluginError, PluginHelper, Result};
pub use registry::PluginRegistry;
pub use result::{DirectResult, ExecutionResult};
