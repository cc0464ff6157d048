use super::error::ApiError;
use super::AppState;
use crate::ai::mime::resolve_image_mime;
use crate::app::GenerationOutcome;
use crate::gallery::GalleryEntry;
use crate::request::{
    ChatRequest, GenerationRequest, ImageQuality, TextToImageRequest, ThermalRequest,
};
use crate::Error;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

type ApiResult<T> = std::result::Result<T, ApiError>;

fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| Error::Validation(rejection.body_text()).into())
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub image: String,
    pub mime_type: String,
    pub text: Option<String>,
    pub gallery_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_used: Option<String>,
}

impl ImageResponse {
    fn from_outcome(outcome: GenerationOutcome, with_prompt: bool) -> ApiResult<Self> {
        let image = outcome.result.image.ok_or(Error::MissingImage)?;
        let text = outcome.result.text;
        Ok(Self {
            image: base64::engine::general_purpose::STANDARD.encode(&image.bytes),
            mime_type: image.mime_type,
            text: (!text.is_empty()).then_some(text),
            gallery_id: outcome.gallery_id,
            prompt_used: with_prompt.then_some(outcome.prompt_used),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SimpleGenerateBody {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub optimizations: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryUpload {
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Gallery entry as listed to the browser.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItemView {
    pub id: String,
    pub url: String,
    pub mime_type: String,
    pub text: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    pub password: String,
}

fn base_url(headers: &HeaderMap) -> String {
    let Some(host) = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .filter(|h| !h.is_empty())
    else {
        return String::new();
    };
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("https");
    format!("{}://{}", proto, host)
}

fn gallery_views(headers: &HeaderMap, entries: Vec<GalleryEntry>) -> Vec<GalleryItemView> {
    let base = base_url(headers);
    entries
        .into_iter()
        .map(|entry| GalleryItemView {
            url: format!("{}/api/gallery/{}/image", base, entry.id),
            id: entry.id,
            mime_type: entry.mime_type,
            text: entry.caption,
            created_at: entry.created_at,
        })
        .collect()
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<ChatResponse>> {
    let request = body(payload)?;
    let outcome = state.app.generate(GenerationRequest::Chat(request)).await?;
    Ok(Json(ChatResponse {
        text: outcome.result.text,
    }))
}

pub async fn generate(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SimpleGenerateBody>, JsonRejection>,
) -> ApiResult<Json<ImageResponse>> {
    let SimpleGenerateBody {
        query,
        optimizations,
    } = body(payload)?;
    let request = GenerationRequest::TextToImage(TextToImageRequest {
        prompt: query,
        refinements: optimizations,
        quality: Some(ImageQuality::High),
        ..Default::default()
    });
    let outcome = state.app.generate(request).await?;
    Ok(Json(ImageResponse::from_outcome(outcome, false)?))
}

pub async fn pro(
    State(state): State<AppState>,
    payload: std::result::Result<Json<GenerationRequest>, JsonRejection>,
) -> ApiResult<Json<ImageResponse>> {
    let request = body(payload)?;
    if let GenerationRequest::Chat(_) = request {
        return Err(Error::Validation("Chat requests go to /api/chat.".to_string()).into());
    }
    let outcome = state.app.generate(request).await?;
    Ok(Json(ImageResponse::from_outcome(outcome, false)?))
}

pub async fn thermal(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ThermalRequest>, JsonRejection>,
) -> ApiResult<Json<ImageResponse>> {
    let request = body(payload)?;
    let outcome = state
        .app
        .generate(GenerationRequest::Thermal(request))
        .await?;
    Ok(Json(ImageResponse::from_outcome(outcome, true)?))
}

pub async fn gallery_list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<GalleryItemView>>> {
    match state.app.gallery_list().await {
        Ok(entries) => Ok(Json(gallery_views(&headers, entries))),
        Err(Error::StoreUnavailable(reason)) => {
            tracing::warn!("Gallery unavailable, listing nothing: {}", reason);
            Ok(Json(Vec::new()))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn gallery_append(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<GalleryUpload>, JsonRejection>,
) -> ApiResult<Json<Vec<GalleryItemView>>> {
    let upload = body(payload)?;
    if upload.image.trim().is_empty() {
        return Err(Error::Validation("The image field (base64) is required.".to_string()).into());
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(upload.image.trim())
        .map_err(|e| Error::Validation(format!("The image field is not valid base64: {}", e)))?;
    let mime_type = resolve_image_mime(upload.mime_type.as_deref(), &bytes);

    let entries = state
        .app
        .gallery_append(bytes, mime_type, upload.text)
        .await?;
    Ok(Json(gallery_views(&headers, entries)))
}

pub async fn gallery_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let item = state.app.gallery_get(&id).await?;
    let content_type = HeaderValue::from_str(&item.mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static("public, max-age=86400"),
            ),
        ],
        item.image_bytes,
    )
        .into_response())
}

pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginBody>, JsonRejection>,
) -> Response {
    if !state.gate.is_enabled() {
        return Json(json!({ "ok": true })).into_response();
    }

    let password = payload.map(|Json(b)| b.password).unwrap_or_default();
    if !state.gate.check_password(&password) {
        tracing::warn!("Rejected login attempt");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "ok": false, "error": "Wrong password" })),
        )
            .into_response();
    }

    let mut response = Json(json!({ "ok": true })).into_response();
    if let Some(cookie) = state.gate.login_cookie() {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}

pub async fn logout(State(state): State<AppState>) -> Response {
    let mut response = Json(json!({ "ok": true })).into_response();
    response
        .headers_mut()
        .append(header::SET_COOKIE, state.gate.logout_cookie());
    response
}

pub async fn status(State(state): State<AppState>, headers: HeaderMap) -> Json<serde_json::Value> {
    Json(json!({
        "ok": state.gate.is_authenticated(&headers),
        "authRequired": state.gate.is_enabled(),
    }))
}
