pub mod gemini;
pub mod parse;
pub mod prompt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use gemini::GeminiClient;
pub use parse::{parse, AnalysisResult, ChartPoint, ParseError, ParseErrorKind, Summary};

/// A web reference the model attached to its answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub uri: String,
    pub title: String,
}

impl Citation {
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.uri
        } else {
            &self.title
        }
    }
}

/// Raw output of one grounded generation call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    pub text: String,
    pub citations: Vec<Citation>,
}

/// The external call itself failed. The model's text never reaches this type.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("API key not configured")]
    NotConfigured,
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unreadable response envelope: {0}")]
    Envelope(String),
}

/// Search-grounded text generation. Each call is a fresh context with no history.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Generation, TransportError>;
}
