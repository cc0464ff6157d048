use super::{ModelClient, RawResponse, TextService};
use crate::builder::PromptPayload;
use crate::{Error, Result};
use async_trait::async_trait;
use base64::Engine as _;
use std::sync::{Arc, Mutex};

/// Tiny valid PNG returned by default image responses.
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
    0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1 pixel
    0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49, 0x44,
    0x41, // IDAT chunk
    0x54, 0x08, 0x99, 0x63, 0xF8, 0xCF, 0xC0, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0xE2, 0x25,
    0x00, 0xBC, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, // IEND chunk
    0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Build a successful Gemini-shaped body with optional text and image parts.
pub fn gemini_body(text: Option<&str>, image: Option<(&[u8], &str)>) -> String {
    let mut parts = Vec::new();
    if let Some(text) = text {
        parts.push(serde_json::json!({ "text": text }));
    }
    if let Some((bytes, mime_type)) = image {
        parts.push(serde_json::json!({
            "inlineData": {
                "mimeType": mime_type,
                "data": base64::engine::general_purpose::STANDARD.encode(bytes),
            }
        }));
    }
    serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": parts },
            "finishReason": "STOP"
        }]
    })
    .to_string()
}

#[derive(Clone)]
pub struct MockModelClient {
    responses: Arc<Mutex<Vec<Result<RawResponse>>>>,
    payloads: Arc<Mutex<Vec<PromptPayload>>>,
}

impl MockModelClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            payloads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_response(self, response: RawResponse) -> Self {
        self.responses.lock().unwrap().push(Ok(response));
        self
    }

    pub fn with_transport_failure(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push(Err(Error::ExternalService(message.to_string())));
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }

    pub fn payloads(&self) -> Vec<PromptPayload> {
        self.payloads.lock().unwrap().clone()
    }
}

impl Default for MockModelClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn generate(&self, payload: &PromptPayload) -> Result<RawResponse> {
        self.payloads.lock().unwrap().push(payload.clone());

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            // Default mock response
            return Ok(RawResponse::new(
                200,
                gemini_body(Some("Here you go"), Some((TINY_PNG, "image/png"))),
            ));
        }
        if responses.len() == 1 {
            return match &responses[0] {
                Ok(response) => Ok(response.clone()),
                Err(e) => Err(Error::ExternalService(e.to_string())),
            };
        }
        responses.remove(0)
    }
}

#[derive(Clone, Default)]
pub struct MockTextService {
    correction: Option<String>,
    facts: Option<String>,
    corrections_requested: Arc<Mutex<Vec<String>>>,
    fact_topics_requested: Arc<Mutex<Vec<String>>>,
}

impl MockTextService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_correction(mut self, corrected: &str) -> Self {
        self.correction = Some(corrected.to_string());
        self
    }

    pub fn with_facts(mut self, facts: &str) -> Self {
        self.facts = Some(facts.to_string());
        self
    }

    pub fn corrections_requested(&self) -> Vec<String> {
        self.corrections_requested.lock().unwrap().clone()
    }

    pub fn fact_topics_requested(&self) -> Vec<String> {
        self.fact_topics_requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextService for MockTextService {
    async fn correct_text(&self, text: &str) -> Option<String> {
        self.corrections_requested
            .lock()
            .unwrap()
            .push(text.to_string());
        self.correction.clone()
    }

    async fn extract_facts(&self, topic: &str) -> Option<String> {
        self.fact_topics_requested
            .lock()
            .unwrap()
            .push(topic.to_string());
        self.facts.clone()
    }
}
