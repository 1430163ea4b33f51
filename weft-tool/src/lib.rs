#![deny(missing_docs)]
//! # weft-tool — tool interface and registry
//!
//! Defines [`ToolDyn`], the object-safe trait every tool implements (local
//! function, connector action, or a call that must be dispatched to a
//! remote executor), and [`ToolRegistry`] for looking tools up by name.
//!
//! Most tools complete synchronously and return [`ToolOutcome::Completed`].
//! A tool backed by a remote executor instead returns
//! [`ToolOutcome::Blocked`] with the [`RequestId`] the gateway assigned to
//! the dispatch — the agent loop persists that ID in its checkpoint and
//! resumes the session when the gateway's result store reports the request
//! finished, rather than holding the session's task open for an
//! arbitrarily long remote round trip.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use weft_core::{ErrorCode, RequestId};

/// Errors from tool operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ToolError {
    /// The requested tool was not found in the registry.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// Tool execution failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// The input provided to the tool was invalid.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The tool call was rejected by policy (shell command not on the
    /// allowlist, connector action not granted to this org, ...).
    #[error("denied: {0}")]
    Denied(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ErrorCode for ToolError {
    fn code(&self) -> &'static str {
        match self {
            ToolError::NotFound(_) => "TOOL_NOT_FOUND",
            ToolError::ExecutionFailed(_) => "TOOL_EXECUTION_FAILED",
            ToolError::InvalidInput(_) => "TOOL_INVALID_INPUT",
            ToolError::Denied(_) => "TOOL_DENIED",
            ToolError::Other(_) => "TOOL_OTHER",
        }
    }
}

/// The result of a tool call.
#[derive(Debug, Clone)]
pub enum ToolOutcome {
    /// The tool ran to completion and produced a result immediately.
    Completed(serde_json::Value),
    /// The tool's effect was handed off to a remote executor; the caller
    /// must wait for the gateway to resolve `request_id` before the agent
    /// loop can continue.
    Blocked {
        /// The gateway dispatch request tracking this call.
        request_id: RequestId,
    },
}

/// Object-safe trait for tool implementations.
///
/// Any tool source (local function, connector action, remote executor
/// dispatch) implements this trait. Tools are stored as `Arc<dyn ToolDyn>`
/// in [`ToolRegistry`].
pub trait ToolDyn: Send + Sync {
    /// The tool's unique name, as referenced in `allowedTools` and by the
    /// model (e.g. `"shell.run"`, `"connector.github.create_issue"`).
    fn name(&self) -> &str;

    /// Human-readable description of what the tool does.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's input parameters.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given input.
    fn call(
        &self,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<ToolOutcome, ToolError>> + Send + '_>>;
}

/// Registry of tools available to an agent session.
///
/// Holds tools as `Arc<dyn ToolDyn>` keyed by name. The agent loop uses
/// this to look up and execute tools requested by the model, and to build
/// the tool schema list sent with each completion request.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolDyn>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Overwrites any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn ToolDyn>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolDyn>> {
        self.tools.get(name)
    }

    /// Iterate over all registered tools.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ToolDyn>> {
        self.tools.values()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Restrict this registry to the given allowlist, returning a new
    /// registry containing only the named tools that existed in this one.
    ///
    /// Used to build the effective tool set for an `AgentSession` from its
    /// `allowedTools` config without mutating the shared base registry.
    pub fn restrict_to(&self, allowed: &[String]) -> ToolRegistry {
        let mut restricted = ToolRegistry::new();
        for name in allowed {
            if let Some(tool) = self.tools.get(name) {
                restricted.register(tool.clone());
            }
        }
        restricted
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn _assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn tool_dyn_is_object_safe() {
        _assert_send_sync::<Arc<dyn ToolDyn>>();
    }

    #[test]
    fn tool_error_display() {
        assert_eq!(
            ToolError::NotFound("bash".into()).to_string(),
            "tool not found: bash"
        );
        assert_eq!(
            ToolError::Denied("shell.run not in allowlist".into()).to_string(),
            "denied: shell.run not in allowlist"
        );
    }

    struct EchoTool;

    impl ToolDyn for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes input back"
        }
        fn input_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }
        fn call(
            &self,
            input: serde_json::Value,
        ) -> Pin<Box<dyn Future<Output = Result<ToolOutcome, ToolError>> + Send + '_>> {
            Box::pin(async move { Ok(ToolOutcome::Completed(json!({"echoed": input}))) })
        }
    }

    struct RemoteTool;

    impl ToolDyn for RemoteTool {
        fn name(&self) -> &str {
            "connector.github.create_issue"
        }
        fn description(&self) -> &str {
            "Creates an issue via a remote executor"
        }
        fn input_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }
        fn call(
            &self,
            _input: serde_json::Value,
        ) -> Pin<Box<dyn Future<Output = Result<ToolOutcome, ToolError>> + Send + '_>> {
            Box::pin(async move {
                Ok(ToolOutcome::Blocked {
                    request_id: RequestId::new("req_1"),
                })
            })
        }
    }

    #[test]
    fn registry_add_and_get() {
        let mut reg = ToolRegistry::new();
        assert!(reg.is_empty());

        reg.register(Arc::new(EchoTool));
        assert_eq!(reg.len(), 1);
        assert!(reg.get("echo").is_some());
        assert!(reg.get("nonexistent").is_none());
    }

    #[test]
    fn registry_restrict_to_drops_unlisted_tools() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        reg.register(Arc::new(RemoteTool));

        let restricted = reg.restrict_to(&["echo".to_string()]);
        assert_eq!(restricted.len(), 1);
        assert!(restricted.get("echo").is_some());
        assert!(restricted.get("connector.github.create_issue").is_none());
    }

    #[tokio::test]
    async fn registry_call_tool_completes() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));

        let tool = reg.get("echo").unwrap();
        let outcome = tool.call(json!({"msg": "hello"})).await.unwrap();
        match outcome {
            ToolOutcome::Completed(value) => assert_eq!(value, json!({"echoed": {"msg": "hello"}})),
            ToolOutcome::Blocked { .. } => panic!("expected Completed"),
        }
    }

    #[tokio::test]
    async fn registry_call_tool_blocks_on_remote_dispatch() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(RemoteTool));

        let tool = reg.get("connector.github.create_issue").unwrap();
        let outcome = tool.call(json!({})).await.unwrap();
        assert!(matches!(outcome, ToolOutcome::Blocked { .. }));
    }
}
