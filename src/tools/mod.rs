//! Tool system: the `Tool` trait, closure tools, argument schemas, typed
//! arguments and the per-participant invoker.

pub mod arguments;
pub mod invoker;
pub mod schema;
pub mod tool;

pub use arguments::ToolArguments;
pub use invoker::ToolInvoker;
pub use schema::{ParamKind, SchemaBuilder, ToolSchema};
pub use tool::{FnTool, Tool, ToolContext};
