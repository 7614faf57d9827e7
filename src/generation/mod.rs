//! Text generation over a completion client, with tool execution.

pub mod text;

pub use text::{generate_text, GenerateOptions, GenerateTextResult, GenerationStep};
