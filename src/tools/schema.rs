//! Argument schemas advertised to the model.

use serde::{Deserialize, Serialize};
use strum::Display;

/// JSON type of a single tool argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

/// JSON Schema describing a tool's arguments. Always an object schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolSchema(serde_json::Value);

impl ToolSchema {
    /// A tool that takes no arguments.
    pub fn empty() -> Self {
        Self::object().build()
    }

    pub fn object() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Wrap a schema received from elsewhere (an MCP server, a config file).
    ///
    /// Anything that is not a JSON object is replaced by the empty schema,
    /// since Chat Completions rejects non-object parameter schemas.
    pub fn from_value(value: serde_json::Value) -> Self {
        if value.is_object() {
            Self(value)
        } else {
            Self::empty()
        }
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Names listed under `required`.
    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.0
            .get("required")
            .and_then(|r| r.as_array())
            .into_iter()
            .flatten()
            .filter_map(|name| name.as_str())
    }
}

/// Builds an object schema one property at a time.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    properties: serde_json::Map<String, serde_json::Value>,
    required: Vec<String>,
}

impl SchemaBuilder {
    pub fn required(mut self, name: impl Into<String>, kind: ParamKind, description: &str) -> Self {
        let name = name.into();
        self.required.push(name.clone());
        self.property(name, kind, description)
    }

    pub fn optional(self, name: impl Into<String>, kind: ParamKind, description: &str) -> Self {
        self.property(name.into(), kind, description)
    }

    fn property(mut self, name: String, kind: ParamKind, description: &str) -> Self {
        self.properties.insert(
            name,
            serde_json::json!({ "type": kind.to_string(), "description": description }),
        );
        self
    }

    pub fn build(self) -> ToolSchema {
        ToolSchema(serde_json::json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        }))
    }
}
