//! The boundary to an external text-generation service.
//!
//! Consumers receive a [`TextGenerator`] explicitly instead of reaching for a
//! process-wide client, so they can be exercised against a fake in tests.

use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::thread;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::GeneratorConfig;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("no generator command configured")]
    NotConfigured,

    #[error("failed to start generator `{program}`: {source}")]
    Spawn { program: String, source: io::Error },

    #[error("generator I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("generator exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("generator returned an empty response")]
    EmptyResponse,

    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One message of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub model: String,
    pub turns: Vec<Turn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
    /// JSON schema the response must conform to; plain text when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

impl GenerationRequest {
    /// A single-turn request.
    pub fn prompt(model: &str, text: impl Into<String>) -> Self {
        Self::conversation(model, vec![Turn::user(text)])
    }

    pub fn conversation(model: &str, turns: Vec<Turn>) -> Self {
        Self {
            model: model.to_string(),
            turns,
            system_instruction: None,
            response_schema: None,
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }
}

/// Something that turns a request into generated text.
pub trait TextGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

impl<G: TextGenerator + ?Sized> TextGenerator for &G {
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        (**self).generate(request)
    }
}

impl<G: TextGenerator + ?Sized> TextGenerator for Box<G> {
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        (**self).generate(request)
    }
}

/// Runs an external program per request: the request is written to its stdin
/// as JSON and its stdout is the response text.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
}

impl CommandGenerator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Result<Self, GenerationError> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or(GenerationError::NotConfigured)?;
        Ok(Self::new(program.clone(), args.to_vec()))
    }
}

impl TextGenerator for CommandGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let payload = serde_json::to_vec(request)?;
        debug!(program = %self.program, bytes = payload.len(), "running generator");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| GenerationError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Feed stdin from its own thread so a child that writes while it reads
        // cannot fill the stdout pipe and stall both sides.
        let stdin = child.stdin.take();
        let (output, written) = thread::scope(|scope| {
            let writer = scope.spawn(|| match stdin {
                Some(mut stdin) => stdin.write_all(&payload),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")));
            (output, written)
        });
        match written {
            Ok(()) => {}
            // The program may exit without reading its input; its status decides.
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                debug!(program = %self.program, "generator closed stdin early");
            }
            Err(e) => return Err(e.into()),
        }
        let output = output?;
        if !output.status.success() {
            return Err(GenerationError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(text)
    }
}
