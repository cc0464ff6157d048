use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use base64::Engine as _;
use chrono::{Duration, Utc};
use nanphoto::{
    ai::{
        mock::{gemini_body, TINY_PNG},
        MockModelClient, MockTextService, RawResponse,
    },
    app::{App, AppServices},
    auth::SessionGate,
    builder::{assemble, build_payload, Enrichment},
    cdn::{CdnService, MockCdnClient},
    gallery::{BlobGallery, GalleryItem, GalleryStore, MemoryGallery},
    normalizer::normalize,
    request::{
        AspectRatio, EditPreset, EditRequest, GenerationRequest, ImageStyle, OutputKind,
        TextRenderingRequest, TextToImageRequest,
    },
    server::{router, AppState},
    Error,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn png_b64() -> String {
    base64::engine::general_purpose::STANDARD.encode(TINY_PNG)
}

fn post_json(uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::HOST, "localhost:3000")
        .header("x-forwarded-proto", "http");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .header(header::HOST, "localhost:3000")
        .header("x-forwarded-proto", "http");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

async fn call(state: &AppState, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn call_json(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = call(state, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_full_workflow_with_blob_gallery() {
    let cdn = MockCdnClient::new();
    let model = MockModelClient::new();
    let model_probe = model.clone();
    let state = AppState::new(
        App::with_services(AppServices {
            model: Box::new(model),
            text: Box::new(MockTextService::new()),
            gallery: Some(Arc::new(BlobGallery::new(cdn.clone(), 2))),
        }),
        SessionGate::new(None),
    );

    let mut ids = Vec::new();
    for prompt in ["a red fox", "a blue whale", "a green frog"] {
        let (status, body) = call_json(
            &state,
            post_json(
                "/api/pro",
                json!({ "mode": "text-to-image", "prompt": prompt, "style": "anime" }),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        ids.push(body["galleryId"].as_str().unwrap().to_string());
    }
    assert_eq!(model_probe.get_call_count(), 3);

    // Capacity 2: the fox is evicted, newest first
    let (status, body) = call_json(&state, get("/api/gallery", None)).await;
    assert_eq!(status, StatusCode::OK);
    let listed: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap())
        .collect();
    assert_eq!(listed, vec![ids[2].as_str(), ids[1].as_str()]);
    assert_eq!(body[0]["text"], "a green frog");
    assert_eq!(
        body[0]["url"],
        format!("http://localhost:3000/api/gallery/{}/image", ids[2])
    );

    let files = cdn.get_files();
    assert!(!files.contains_key(&format!("gallery/{}", ids[0])));
    assert!(files.contains_key("gallery/index.json"));

    let (status, bytes) = call(&state, get(&format!("/api/gallery/{}/image", ids[1]), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, TINY_PNG);

    let (status, _) = call(&state, get(&format!("/api/gallery/{}/image", ids[0]), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_password_protected_session() {
    let state = AppState::new(
        App::with_services(AppServices {
            model: Box::new(MockModelClient::new()),
            text: Box::new(MockTextService::new()),
            gallery: Some(Arc::new(MemoryGallery::new(40))),
        }),
        SessionGate::new(Some("open sesame".to_string())),
    );

    let (status, body) = call_json(&state, get("/api/auth/status", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": false, "authRequired": true }));

    let (status, _) = call_json(
        &state,
        post_json("/api/generate", json!({ "query": "a cat" }), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let response = router(state.clone())
        .oneshot(post_json(
            "/api/auth/login",
            json!({ "password": "open sesame" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .to_string();
    let cookie = set_cookie.split(';').next().unwrap().to_string();

    let (status, body) = call_json(&state, get("/api/auth/status", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let (status, body) = call_json(
        &state,
        post_json("/api/generate", json!({ "query": "a cat" }), Some(&cookie)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["image"], png_b64());
}

#[tokio::test]
async fn test_upstream_errors_map_to_502() {
    let model = MockModelClient::new().with_response(RawResponse::new(
        429,
        json!({ "error": { "code": 429, "message": "Resource has been exhausted" } }).to_string(),
    ));
    let state = AppState::new(
        App::with_services(AppServices {
            model: Box::new(model),
            text: Box::new(MockTextService::new()),
            gallery: None,
        }),
        SessionGate::new(None),
    );

    let (status, body) = call_json(
        &state,
        post_json("/api/chat", json!({ "query": "hello" }), None),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Resource has been exhausted"));
}

#[tokio::test]
async fn test_missing_image_is_reported() {
    let model = MockModelClient::new()
        .with_response(RawResponse::new(200, gemini_body(Some("I can't draw that."), None)));
    let gallery = Arc::new(MemoryGallery::new(40));
    let state = AppState::new(
        App::with_services(AppServices {
            model: Box::new(model),
            text: Box::new(MockTextService::new()),
            gallery: Some(gallery.clone()),
        }),
        SessionGate::new(None),
    );

    let (status, _) = call_json(
        &state,
        post_json(
            "/api/pro",
            json!({
                "mode": "edit",
                "image": { "data": png_b64() },
                "preset": "change-colors",
                "details": "make it teal"
            }),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(gallery.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_anime_square_prompt_ends_with_directive() {
    let request = GenerationRequest::TextToImage(TextToImageRequest {
        prompt: "a cat".to_string(),
        style: Some(ImageStyle::Anime),
        aspect_ratio: Some(AspectRatio::Square),
        ..Default::default()
    });

    let payload = build_payload(&request, &MockTextService::new()).await;
    let text = payload.full_text();

    assert!(payload.instruction.contains("anime"));
    assert!(payload.instruction.contains("1:1"));
    assert!(payload.instruction.contains("a cat"));
    assert!(text.ends_with(payload.directive.as_deref().unwrap()));
    assert!(text.contains("STRICT RULE"));
}

#[test]
fn test_remove_object_preset_substitutes_details() {
    let request = GenerationRequest::Edit(EditRequest {
        image: None,
        preset: Some(EditPreset::RemoveObject),
        details: "the red car".to_string(),
    });

    let payload = assemble(&request, &Enrichment::default());

    assert!(payload.instruction.starts_with("Remove the red car from the image"));
    assert!(!payload.instruction.contains("{{details}}"));
}

#[test]
fn test_safety_stop_is_rejected() {
    let raw = RawResponse::new(
        200,
        r#"{"candidates":[{"content":{"parts":[]},"finishReason":"SAFETY"}]}"#,
    );

    let err = normalize(&raw, OutputKind::Image).unwrap_err();
    assert!(matches!(err, Error::GenerationRejected(ref reason) if reason == "SAFETY"));
}

#[tokio::test]
async fn test_capacity_two_keeps_two_newest() {
    let now = Utc::now();
    let a = GalleryItem::with_timestamp(vec![1], "image/png", Some("A".into()), now);
    let b = GalleryItem::with_timestamp(vec![2], "image/png", Some("B".into()), now + Duration::seconds(1));
    let c = GalleryItem::with_timestamp(vec![3], "image/png", Some("C".into()), now + Duration::seconds(2));

    let stores: Vec<Box<dyn GalleryStore>> = vec![
        Box::new(MemoryGallery::new(2)),
        Box::new(BlobGallery::new(MockCdnClient::new(), 2)),
    ];
    for store in stores {
        store.append(a.clone()).await.unwrap();
        store.append(b.clone()).await.unwrap();
        let entries = store.append(c.clone()).await.unwrap();

        let captions: Vec<_> = entries.iter().filter_map(|e| e.caption.as_deref()).collect();
        assert_eq!(captions, vec!["C", "B"]);
        assert!(matches!(store.get(&a.id).await, Err(Error::NotFound(_))));
        assert_eq!(store.capacity(), 2);
    }
}

#[tokio::test]
async fn test_misspelled_exact_text_is_corrected() {
    let text = MockTextService::new().with_correction("Hello World");
    let request = GenerationRequest::TextRendering(TextRenderingRequest {
        exact_text: "Helo Wrld".to_string(),
        ..Default::default()
    });

    let payload = build_payload(&request, &text).await;

    assert!(payload.full_text().contains("\"Hello World\""));
    assert!(!payload.full_text().contains("Helo Wrld"));
    assert_eq!(text.corrections_requested(), vec!["Helo Wrld".to_string()]);
}

#[tokio::test]
async fn test_gallery_survives_store_reopen() {
    let cdn = MockCdnClient::new();
    let item = GalleryItem::new(TINY_PNG.to_vec(), "image/png", Some("kept".to_string()));

    BlobGallery::new(cdn.clone(), 5)
        .append(item.clone())
        .await
        .unwrap();

    let reopened = BlobGallery::new(cdn.clone(), 5);
    assert_eq!(reopened.get(&item.id).await.unwrap(), item);
    assert!(cdn.read_file("gallery/index.json").await.unwrap().is_some());
}
