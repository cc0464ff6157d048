//! Generation orchestration: validate, build the prompt, call the model,
//! normalize the answer and keep successful images in the gallery.

use crate::ai::gemini::model::GeminiModels;
use crate::ai::{GeminiModelClient, GeminiTextService, ModelClient, TextService};
use crate::builder;
use crate::cdn::CdnClient;
use crate::gallery::{BlobGallery, GalleryEntry, GalleryItem, GalleryStore, MemoryGallery};
use crate::models::{Config, GalleryBackend, ModelResult};
use crate::normalizer;
use crate::request::{GenerationRequest, OutputKind};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of one generation call.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub result: ModelResult,
    /// Set when the image was stored in the gallery.
    pub gallery_id: Option<String>,
    /// Full prompt text sent to the model.
    pub prompt_used: String,
}

pub struct App {
    model: Box<dyn ModelClient>,
    text: Box<dyn TextService>,
    gallery: Option<Arc<dyn GalleryStore>>,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub model: Box<dyn ModelClient>,
    pub text: Box<dyn TextService>,
    pub gallery: Option<Arc<dyn GalleryStore>>,
}

impl App {
    pub fn with_services(services: AppServices) -> Self {
        Self {
            model: services.model,
            text: services.text,
            gallery: services.gallery,
        }
    }

    /// Construct an app from environment configuration (`Config::from_env`).
    pub async fn from_config(config: &Config) -> Result<Self> {
        // Reuse one HTTP connection pool across Gemini clients.
        let http_client = reqwest::Client::new();

        info!(
            "Gemini models: chat={}, image={}, hq_image={}, aux={}",
            config.chat_model, config.image_model, config.hq_image_model, config.aux_model
        );

        let model = GeminiModelClient::new_with_client(
            config.gemini_api_key.clone(),
            GeminiModels {
                chat: config.chat_model.clone(),
                image: config.image_model.clone(),
                hq_image: config.hq_image_model.clone(),
            },
            http_client.clone(),
        );
        let text = GeminiTextService::new_with_client(
            config.gemini_api_key.clone(),
            config.aux_model.clone(),
            http_client,
        );

        let gallery: Option<Arc<dyn GalleryStore>> = match config.gallery_backend {
            GalleryBackend::Memory => {
                info!("Gallery: in-memory (capacity {})", config.gallery_capacity);
                Some(Arc::new(MemoryGallery::new(config.gallery_capacity)))
            }
            GalleryBackend::Spaces => {
                let (Some(access_key_id), Some(secret_access_key)) = (
                    config.cdn_access_key_id.clone(),
                    config.cdn_secret_access_key.clone(),
                ) else {
                    return Err(Error::Config(
                        "Spaces gallery requires CDN credentials".to_string(),
                    ));
                };
                let cdn = CdnClient::new(
                    access_key_id,
                    secret_access_key,
                    config.cdn_endpoint.clone(),
                    config.cdn_bucket.clone(),
                )
                .await?;
                info!("Gallery: Spaces (capacity {})", config.gallery_capacity);
                Some(Arc::new(BlobGallery::new(cdn, config.gallery_capacity)))
            }
            GalleryBackend::Disabled => {
                info!("Gallery disabled");
                None
            }
        };

        Ok(Self::with_services(AppServices {
            model: Box::new(model),
            text: Box::new(text),
            gallery,
        }))
    }

    /// Run one request through the pipeline.
    ///
    /// Image results are appended to the gallery on a best-effort basis: a
    /// storage failure is logged and leaves `gallery_id` empty.
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationOutcome> {
        request.validate()?;
        info!("Generating {} request", request.mode());

        let payload = builder::build_payload(&request, self.text.as_ref()).await;
        let raw = self.model.generate(&payload).await?;
        let result = normalizer::normalize(&raw, payload.output).map_err(|e| {
            warn!("[{}] Generation failed: {}", request.mode(), e);
            e
        })?;

        let prompt_used = payload.full_text();

        let gallery_id = match (&result.image, payload.output) {
            (Some(image), OutputKind::Image) => {
                let caption = match &request {
                    GenerationRequest::Thermal(_) => Some(payload.instruction.clone()),
                    other => other.caption(),
                };
                self.remember(GalleryItem::new(
                    image.bytes.clone(),
                    image.mime_type.clone(),
                    caption,
                ))
                .await
            }
            _ => None,
        };

        Ok(GenerationOutcome {
            result,
            gallery_id,
            prompt_used,
        })
    }

    async fn remember(&self, item: GalleryItem) -> Option<String> {
        let gallery = self.gallery.as_ref()?;
        let id = item.id.clone();
        match gallery.append(item).await {
            Ok(entries) if entries.iter().any(|entry| entry.id == id) => {
                info!("Stored {} in gallery", id);
                Some(id)
            }
            Ok(_) => {
                warn!("Generated image {} was older than every gallery item and was evicted", id);
                None
            }
            Err(e) => {
                warn!("Could not store generated image in gallery: {}", e);
                None
            }
        }
    }

    fn gallery(&self) -> Result<&Arc<dyn GalleryStore>> {
        self.gallery
            .as_ref()
            .ok_or_else(|| Error::StoreUnavailable("gallery storage is not configured".to_string()))
    }

    pub async fn gallery_list(&self) -> Result<Vec<GalleryEntry>> {
        self.gallery()?.list().await
    }

    /// Store an image supplied by the user. Returns the listing afterwards.
    pub async fn gallery_append(
        &self,
        image_bytes: Vec<u8>,
        mime_type: String,
        caption: Option<String>,
    ) -> Result<Vec<GalleryEntry>> {
        let gallery = self.gallery()?;
        if image_bytes.is_empty() {
            return Err(Error::Validation("An image is required.".to_string()));
        }
        gallery
            .append(GalleryItem::new(image_bytes, mime_type, caption))
            .await
    }

    pub async fn gallery_get(&self, id: &str) -> Result<GalleryItem> {
        self.gallery()?.get(id).await
    }
}
