//! Response normalization.
//!
//! Turns a raw `generateContent` response into a [`ModelResult`] or one of the
//! upstream error kinds: `ExternalService` for transport-level problems,
//! `GenerationRejected` when the model declined, `MissingImage` when an image
//! mode got no image back.

use crate::ai::gemini::types::{ErrorResponse, GenerateContentResponse, Part};
use crate::ai::RawResponse;
use crate::models::{GeneratedImage, ModelResult, DEFAULT_MIME_TYPE};
use crate::request::OutputKind;
use crate::{Error, Result};
use base64::Engine as _;

/// Longest body excerpt carried in an error message.
pub const SNIPPET_CHARS: usize = 300;

/// Finish reasons that still count as a usable completion.
const ACCEPTED_FINISH_REASONS: &[&str] = &["STOP", "MAX_TOKENS"];

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.starts_with('<') {
        return "upstream returned HTML instead of JSON (the model may be unavailable or the URL is wrong)"
            .to_string();
    }
    trimmed.chars().take(SNIPPET_CHARS).collect()
}

fn failure_message(raw: &RawResponse) -> String {
    if let Ok(ErrorResponse {
        error: Some(error), ..
    }) = serde_json::from_str::<ErrorResponse>(&raw.body)
    {
        if let Some(message) = error.message.filter(|m| !m.trim().is_empty()) {
            return message;
        }
    }
    match snippet(&raw.body) {
        s if s.is_empty() => format!("HTTP {}", raw.status),
        s => s,
    }
}

/// Normalize a raw model response for a request expecting `output`.
pub fn normalize(raw: &RawResponse, output: OutputKind) -> Result<ModelResult> {
    if !raw.is_success() {
        return Err(Error::ExternalService(failure_message(raw)));
    }

    if raw.body.trim().is_empty() {
        return Err(Error::ExternalService("empty response body".to_string()));
    }

    let response: GenerateContentResponse = serde_json::from_str(&raw.body).map_err(|e| {
        tracing::error!("Failed to parse Gemini response: {}", e);
        Error::ExternalService(snippet(&raw.body))
    })?;

    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.clone())
    {
        tracing::warn!("Prompt blocked by the model: {}", reason);
        return Err(Error::GenerationRejected(reason));
    }

    let candidate = response.candidates.first();

    if let Some(reason) = candidate.and_then(|c| c.finish_reason.as_deref()) {
        if !ACCEPTED_FINISH_REASONS.contains(&reason) {
            tracing::warn!("Generation stopped with finish reason {}", reason);
            return Err(Error::GenerationRejected(reason.to_string()));
        }
    }

    let parts = candidate
        .and_then(|c| c.content.as_ref())
        .map(|content| content.parts.as_slice())
        .unwrap_or_default();

    let mut text = String::new();
    let mut image: Option<GeneratedImage> = None;
    for part in parts {
        match part {
            Part::Text { text: fragment } => text.push_str(fragment),
            Part::InlineData { inline_data } if image.is_none() => {
                let Some(data) = inline_data.data.as_deref().filter(|d| !d.is_empty()) else {
                    continue;
                };
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(data)
                    .map_err(|e| {
                        Error::ExternalService(format!("Malformed inline image data: {}", e))
                    })?;
                let mime_type = inline_data
                    .mime_type
                    .clone()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
                image = Some(GeneratedImage { bytes, mime_type });
            }
            Part::InlineData { .. } | Part::Other(_) => {}
        }
    }

    if output == OutputKind::Image && image.is_none() {
        return Err(Error::MissingImage);
    }

    Ok(ModelResult {
        text: text.trim().to_string(),
        image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::mock::gemini_body;
    use serde_json::json;

    fn ok(body: serde_json::Value) -> RawResponse {
        RawResponse::new(200, body.to_string())
    }

    #[test]
    fn test_text_fragments_are_concatenated_and_trimmed() {
        let raw = ok(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "  Hello, " }, { "text": "world!\n" }] },
                "finishReason": "STOP"
            }]
        }));

        let result = normalize(&raw, OutputKind::Text).unwrap();
        assert_eq!(result.text, "Hello, world!");
        assert_eq!(result.image, None);
    }

    #[test]
    fn test_image_bytes_round_trip_with_default_mime() {
        let bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x01, 0x02];
        use base64::Engine as _;
        let raw = ok(json!({
            "candidates": [{
                "content": { "parts": [{
                    "inlineData": {
                        "data": base64::engine::general_purpose::STANDARD.encode(&bytes)
                    }
                }] }
            }]
        }));

        let result = normalize(&raw, OutputKind::Image).unwrap();
        let image = result.image.unwrap();
        assert_eq!(image.bytes, bytes);
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(result.text, "");
    }

    #[test]
    fn test_first_image_wins() {
        let raw = ok(json!({
            "candidates": [{
                "content": { "parts": [
                    { "inlineData": { "mimeType": "image/jpeg", "data": "/9j/" } },
                    { "text": "caption" },
                    { "inlineData": { "mimeType": "image/png", "data": "iVBORw==" } }
                ] },
                "finishReason": "STOP"
            }]
        }));

        let result = normalize(&raw, OutputKind::Image).unwrap();
        let image = result.image.unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.bytes, vec![0xFF, 0xD8, 0xFF]);
        assert_eq!(result.text, "caption");
    }

    #[test]
    fn test_safety_finish_reason_is_rejected() {
        let raw = ok(json!({
            "candidates": [{ "content": { "parts": [] }, "finishReason": "SAFETY" }]
        }));

        let err = normalize(&raw, OutputKind::Image).unwrap_err();
        assert!(matches!(err, Error::GenerationRejected(ref reason) if reason == "SAFETY"));
    }

    #[test]
    fn test_max_tokens_is_accepted() {
        let raw = ok(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "partial answer" }] },
                "finishReason": "MAX_TOKENS"
            }]
        }));

        assert_eq!(
            normalize(&raw, OutputKind::Text).unwrap().text,
            "partial answer"
        );
    }

    #[test]
    fn test_prompt_block_reason_is_rejected() {
        let raw = ok(json!({ "promptFeedback": { "blockReason": "PROHIBITED_CONTENT" } }));

        let err = normalize(&raw, OutputKind::Text).unwrap_err();
        assert!(matches!(err, Error::GenerationRejected(ref reason) if reason == "PROHIBITED_CONTENT"));
    }

    #[test]
    fn test_missing_image_for_image_mode() {
        let raw = RawResponse::new(200, gemini_body(Some("I cannot draw that"), None));

        let err = normalize(&raw, OutputKind::Image).unwrap_err();
        assert!(matches!(err, Error::MissingImage));
    }

    #[test]
    fn test_empty_chat_answer_is_success() {
        let raw = ok(json!({ "candidates": [{ "content": { "parts": [] }, "finishReason": "STOP" }] }));

        let result = normalize(&raw, OutputKind::Text).unwrap();
        assert_eq!(result.text, "");
    }

    #[test]
    fn test_error_status_uses_error_message() {
        let raw = RawResponse::new(
            400,
            json!({ "error": { "code": 400, "message": "API key not valid" } }).to_string(),
        );

        let err = normalize(&raw, OutputKind::Text).unwrap_err();
        assert!(matches!(err, Error::ExternalService(ref m) if m == "API key not valid"));
    }

    #[test]
    fn test_error_status_without_body_reports_status() {
        let err = normalize(&RawResponse::new(503, ""), OutputKind::Text).unwrap_err();
        assert!(matches!(err, Error::ExternalService(ref m) if m == "HTTP 503"));
    }

    #[test]
    fn test_unparseable_body_is_truncated() {
        let body = "x".repeat(1000);
        let err = normalize(&RawResponse::new(200, body), OutputKind::Text).unwrap_err();
        match err {
            Error::ExternalService(message) => assert_eq!(message.len(), SNIPPET_CHARS),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_html_body_is_described() {
        let err = normalize(
            &RawResponse::new(502, "<html><body>Bad Gateway</body></html>"),
            OutputKind::Text,
        )
        .unwrap_err();
        assert!(err.to_string().contains("HTML instead of JSON"));
    }

    #[test]
    fn test_invalid_base64_is_external_service_error() {
        let raw = ok(json!({
            "candidates": [{
                "content": { "parts": [{ "inlineData": { "mimeType": "image/png", "data": "!!!" } }] }
            }]
        }));

        let err = normalize(&raw, OutputKind::Image).unwrap_err();
        assert!(matches!(err, Error::ExternalService(_)));
    }
}
