use super::client::GeminiHttpClient;
use super::types::{Content, GenerateContentRequest, GenerationConfig, GoogleSearch, Part, Tool};
use crate::ai::TextService;
use crate::normalizer;
use crate::prompts;
use crate::request::OutputKind;
use async_trait::async_trait;
use std::time::Duration;

/// Auxiliary text calls against a small Gemini text model.
///
/// Every failure is logged and reported as `None`.
pub struct GeminiTextService {
    http: GeminiHttpClient,
    model: String,
}

impl GeminiTextService {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, model: String, client: reqwest::Client) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(api_key, Duration::from_secs(30), client),
            model,
        }
    }

    async fn ask(&self, task: &str, prompt: String, tools: Option<Vec<Tool>>) -> Option<String> {
        let request = GenerateContentRequest {
            system_instruction: None,
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::Text { text: prompt }],
            }],
            generation_config: Some(GenerationConfig {
                temperature: Some(0.0),
                max_output_tokens: Some(1024),
                ..Default::default()
            }),
            tools,
        };

        let raw = match self.http.generate_content(&self.model, &request).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("{} unavailable: {}", task, e);
                return None;
            }
        };

        match normalizer::normalize(&raw, OutputKind::Text) {
            Ok(result) if !result.text.is_empty() => Some(result.text),
            Ok(_) => {
                tracing::warn!("{} returned no text", task);
                None
            }
            Err(e) => {
                tracing::warn!("{} failed: {}", task, e);
                None
            }
        }
    }
}

#[cfg(test)]
super::impl_with_gemini_base_url!(GeminiTextService);

/// Drop wrapping quotes a model sometimes adds around a corrected phrase.
fn strip_wrapping_quotes(text: &str) -> &str {
    let text = text.trim();
    for (open, close) in [('"', '"'), ('«', '»'), ('“', '”')] {
        if let Some(inner) = text
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            return inner.trim();
        }
    }
    text
}

#[async_trait]
impl TextService for GeminiTextService {
    async fn correct_text(&self, text: &str) -> Option<String> {
        let prompt = prompts::render(prompts::CORRECT_TEXT, &[("text", text)]);
        let corrected = self.ask("Text correction", prompt, None).await?;
        let corrected = strip_wrapping_quotes(&corrected);
        (!corrected.is_empty()).then(|| corrected.to_string())
    }

    async fn extract_facts(&self, topic: &str) -> Option<String> {
        let prompt = prompts::render(prompts::EXTRACT_FACTS, &[("topic", topic)]);
        let tools = vec![Tool {
            google_search: GoogleSearch::default(),
        }];
        self.ask("Fact lookup", prompt, Some(tools)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::gemini::test_support;
    use wiremock::matchers::body_string_contains;
    use wiremock::{MockServer, ResponseTemplate};

    const DEFAULT_MODEL: &str = "gemini-2.5-flash";

    fn make_client(server: &MockServer) -> GeminiTextService {
        GeminiTextService::new("key".to_string(), DEFAULT_MODEL.to_string())
            .with_base_url(server.uri())
    }

    fn text_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        })
    }

    #[test]
    fn test_strip_wrapping_quotes() {
        assert_eq!(strip_wrapping_quotes("\"Hello World\""), "Hello World");
        assert_eq!(strip_wrapping_quotes("«Привет»"), "Привет");
        assert_eq!(strip_wrapping_quotes("Say \"hi\""), "Say \"hi\"");
    }

    #[tokio::test]
    async fn test_correct_text_returns_model_answer() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .and(body_string_contains("Helo Wrld"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_body("\"Hello World\"\n")))
            .expect(1)
            .mount(&server)
            .await;

        let corrected = make_client(&server).correct_text("Helo Wrld").await;
        assert_eq!(corrected.as_deref(), Some("Hello World"));
    }

    #[tokio::test]
    async fn test_extract_facts_enables_search_tool() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .and(body_string_contains("googleSearch"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_body("- 42 GW installed")))
            .expect(1)
            .mount(&server)
            .await;

        let facts = make_client(&server).extract_facts("solar power").await;
        assert_eq!(facts.as_deref(), Some("- 42 GW installed"));
    }

    #[tokio::test]
    async fn test_failures_become_none() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
            .mount(&server)
            .await;

        let client = make_client(&server);
        assert_eq!(client.correct_text("Helo").await, None);
        assert_eq!(client.extract_facts("tea").await, None);
    }

    #[tokio::test]
    async fn test_blank_answer_becomes_none() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200).set_body_json(text_body("   ")))
            .mount(&server)
            .await;

        assert_eq!(make_client(&server).correct_text("Helo").await, None);
    }
}
