//! Generative-AI service integration
//!
//! The model client performs the single outbound generation call; the text
//! service provides best-effort enrichment (spelling correction, current
//! facts) used while building prompts.

pub mod gemini;
pub mod mime;
pub mod mock;

pub use gemini::{GeminiModelClient, GeminiTextService};
pub use mock::{MockModelClient, MockTextService};

use crate::builder::PromptPayload;
use crate::Result;
use async_trait::async_trait;

/// Status and body of a model response, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Single-shot call to a generative model.
///
/// Transport failures and timeouts surface as `Error::ExternalService`; any
/// HTTP response, successful or not, is returned for the normalizer.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, payload: &PromptPayload) -> Result<RawResponse>;
}

/// Best-effort auxiliary text calls. `None` means the enrichment is unavailable.
#[async_trait]
pub trait TextService: Send + Sync {
    async fn correct_text(&self, text: &str) -> Option<String>;
    async fn extract_facts(&self, topic: &str) -> Option<String>;
}
