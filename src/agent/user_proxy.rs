//! Human-in-the-loop participant.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::ParleyError;
use crate::team::{Participant, Reply, Transcript};

/// Source of human replies.
#[async_trait]
pub trait HumanInput: Send + Sync {
    /// Show `prompt` and return one line of input without the trailing newline.
    async fn read_line(&self, prompt: &str) -> Result<String, ParleyError>;
}

/// Reads replies from the process's standard input.
pub struct StdinInput {
    reader: Mutex<BufReader<Stdin>>,
}

impl StdinInput {
    pub fn new() -> Self {
        Self {
            reader: Mutex::new(BufReader::new(tokio::io::stdin())),
        }
    }
}

impl Default for StdinInput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HumanInput for StdinInput {
    async fn read_line(&self, prompt: &str) -> Result<String, ParleyError> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.flush().await?;

        let mut line = String::new();
        let read = self.reader.lock().await.read_line(&mut line).await?;
        if read == 0 {
            return Err(ParleyError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "standard input closed",
            )));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// A participant whose turns are typed by a person.
pub struct UserProxyAgent {
    name: String,
    description: String,
    prompt: String,
    input: Arc<dyn HumanInput>,
}

impl UserProxyAgent {
    /// User proxy reading from stdin.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_input(name, Arc::new(StdinInput::new()))
    }

    pub fn with_input(name: impl Into<String>, input: Arc<dyn HumanInput>) -> Self {
        Self {
            name: name.into(),
            description: "A human user".into(),
            prompt: "Enter your response: ".into(),
            input,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

#[async_trait]
impl Participant for UserProxyAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn reply(
        &self,
        _transcript: &Transcript,
        cancel: &CancellationToken,
    ) -> Result<Reply, ParleyError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(ParleyError::Cancelled),
            line = self.input.read_line(&self.prompt) => Ok(Reply::text(line?)),
        }
    }
}
