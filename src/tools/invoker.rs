//! Tool invocation capability handed to a participant.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::arguments::ToolArguments;
use super::tool::{Tool, ToolContext};
use crate::error::ParleyError;
use crate::provider::ToolDefinition;

/// Fixed set of tools a participant may call.
///
/// The set of names is decided when the invoker is built and never changes
/// afterwards; calls naming anything else are rejected.
#[derive(Clone, Default)]
pub struct ToolInvoker {
    tools: BTreeMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolInvoker {
    /// An invoker with no tools.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Declare the tool set. Two tools sharing a name is a configuration error.
    pub fn new(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Result<Self, ParleyError> {
        let mut invoker = Self::default();
        for tool in tools {
            let name = tool.name().to_string();
            if invoker.tools.contains_key(&name) {
                return Err(ParleyError::Configuration(format!(
                    "Tool '{name}' declared more than once"
                )));
            }
            invoker.order.push(name.clone());
            invoker.tools.insert(name, tool);
        }
        Ok(invoker)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Declared tool names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool schemas in the form sent to the provider.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition())
            .collect()
    }

    /// Invoke a declared tool.
    pub async fn invoke(
        &self,
        name: &str,
        args: &ToolArguments,
        ctx: &ToolContext,
    ) -> Result<serde_json::Value, ParleyError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ParleyError::ToolExecution {
                tool_name: name.to_string(),
                message: "Tool is not declared for this participant".into(),
            })?;
        tracing::debug!(tool = name, caller = ?ctx.caller, "invoking tool");
        tool.call(args, ctx).await
    }

    /// Invoke with serialisable arguments and deserialise the result.
    pub async fn invoke_typed<A, R>(
        &self,
        name: &str,
        args: &A,
        ctx: &ToolContext,
    ) -> Result<R, ParleyError>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let args = ToolArguments::new(serde_json::to_value(args)?);
        let value = self.invoke(name, &args, ctx).await?;
        serde_json::from_value(value).map_err(|e| ParleyError::ToolExecution {
            tool_name: name.to_string(),
            message: format!("Unexpected result shape: {e}"),
        })
    }
}

impl std::fmt::Debug for ToolInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolInvoker")
            .field("tools", &self.order)
            .finish()
    }
}
