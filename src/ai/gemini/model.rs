use super::client::GeminiHttpClient;
use super::types::{Content, GenerateContentRequest, GenerationConfig, InlineData, Part};
use crate::ai::{ModelClient, RawResponse};
use crate::builder::{ModelChoice, PromptPayload};
use crate::request::OutputKind;
use crate::Result;
use async_trait::async_trait;
use base64::Engine as _;
use std::time::Duration;

const CHAT_TIMEOUT: Duration = Duration::from_secs(60);
const IMAGE_TIMEOUT: Duration = Duration::from_secs(120);

/// Model ids used for each kind of payload.
#[derive(Debug, Clone)]
pub struct GeminiModels {
    pub chat: String,
    pub image: String,
    pub hq_image: String,
}

pub struct GeminiModelClient {
    http: GeminiHttpClient,
    models: GeminiModels,
}

impl GeminiModelClient {
    pub fn new(api_key: String, models: GeminiModels) -> Self {
        Self::new_with_client(api_key, models, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, models: GeminiModels, client: reqwest::Client) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(api_key, IMAGE_TIMEOUT, client),
            models,
        }
    }

    fn model_for<'a>(&'a self, payload: &'a PromptPayload) -> &'a str {
        match (&payload.model, payload.output) {
            (ModelChoice::Named(model), _) => model,
            (ModelChoice::HighQualityImage, _) => &self.models.hq_image,
            (ModelChoice::Default, OutputKind::Text) => &self.models.chat,
            (ModelChoice::Default, OutputKind::Image) => &self.models.image,
        }
    }

    /// Translate a payload into the Gemini wire request.
    ///
    /// Attachments come first, then the instruction, then the directive.
    pub fn to_request(payload: &PromptPayload) -> GenerateContentRequest {
        let mut parts: Vec<Part> = payload
            .attachments
            .iter()
            .map(|attachment| Part::InlineData {
                inline_data: InlineData {
                    mime_type: Some(attachment.mime_type.clone()),
                    data: Some(base64::engine::general_purpose::STANDARD.encode(&attachment.data)),
                },
            })
            .collect();
        parts.extend(payload.text_segments().into_iter().map(|text| Part::Text {
            text: text.to_string(),
        }));

        let generation_config = match payload.output {
            OutputKind::Text => GenerationConfig {
                temperature: Some(0.4),
                max_output_tokens: Some(8192),
                ..Default::default()
            },
            OutputKind::Image => GenerationConfig {
                response_modalities: Some(vec!["TEXT".to_string(), "IMAGE".to_string()]),
                ..Default::default()
            },
        };

        GenerateContentRequest {
            system_instruction: payload.system_instruction.as_ref().map(|text| Content {
                role: None,
                parts: vec![Part::Text { text: text.clone() }],
            }),
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: Some(generation_config),
            tools: None,
        }
    }
}

#[cfg(test)]
super::impl_with_gemini_base_url!(GeminiModelClient);

#[async_trait]
impl ModelClient for GeminiModelClient {
    async fn generate(&self, payload: &PromptPayload) -> Result<RawResponse> {
        let model = self.model_for(payload);
        let request = Self::to_request(payload);
        let timeout = match payload.output {
            OutputKind::Text => CHAT_TIMEOUT,
            OutputKind::Image => IMAGE_TIMEOUT,
        };
        self.http
            .generate_content_within(model, &request, timeout)
            .await
    }
}
