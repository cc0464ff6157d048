//! Data models and structures
//!
//! Defines the attachment and result shapes shared by the generation
//! pipeline, plus environment configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIME_TYPE: &str = "image/png";
pub const DEFAULT_GALLERY_CAPACITY: usize = 40;

/// Base64 (de)serialization for raw byte fields.
pub(crate) mod base64_bytes {
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(serde::de::Error::custom)
    }
}

fn default_mime_type() -> String {
    DEFAULT_MIME_TYPE.to_string()
}

/// An uploaded image sent to the model alongside the instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAttachment {
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
}

impl ImageAttachment {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }
}

/// Image bytes extracted from a model response.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Normalized model output.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResult {
    pub text: String,
    pub image: Option<GeneratedImage>,
}

// Configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalleryBackend {
    Memory,
    Spaces,
    Disabled,
}

impl GalleryBackend {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "spaces" | "s3" => Ok(Self::Spaces),
            "none" | "disabled" | "off" => Ok(Self::Disabled),
            other => Err(Error::Config(format!(
                "Unknown GALLERY_BACKEND '{}'. Expected memory, spaces, or none",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub chat_model: String,
    pub image_model: String,
    pub hq_image_model: String,
    pub aux_model: String,
    pub password: Option<String>,
    pub gallery_backend: GalleryBackend,
    pub gallery_capacity: usize,
    pub cdn_access_key_id: Option<String>,
    pub cdn_secret_access_key: Option<String>,
    pub cdn_endpoint: String,
    pub cdn_bucket: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let or_default = |key: &str, default: &str| {
            non_empty(key).unwrap_or_else(|| default.to_string())
        };

        let gemini_api_key = non_empty("GEMINI_API_KEY")
            .ok_or_else(|| Error::Config("GEMINI_API_KEY not set".to_string()))?;

        let gallery_backend = match non_empty("GALLERY_BACKEND") {
            Some(value) => GalleryBackend::parse(&value)?,
            None => GalleryBackend::Memory,
        };

        let gallery_capacity = match non_empty("GALLERY_CAPACITY") {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|capacity| *capacity > 0)
                .ok_or_else(|| {
                    Error::Config(format!(
                        "GALLERY_CAPACITY must be a positive integer, got '{}'",
                        value
                    ))
                })?,
            None => DEFAULT_GALLERY_CAPACITY,
        };

        let cdn_access_key_id = non_empty("CDN_ACCESS_KEY_ID");
        let cdn_secret_access_key = non_empty("CDN_SECRET_ACCESS_KEY");
        if gallery_backend == GalleryBackend::Spaces
            && (cdn_access_key_id.is_none() || cdn_secret_access_key.is_none())
        {
            return Err(Error::Config(
                "GALLERY_BACKEND=spaces requires CDN_ACCESS_KEY_ID and CDN_SECRET_ACCESS_KEY"
                    .to_string(),
            ));
        }

        Ok(Self {
            gemini_api_key,
            chat_model: or_default("CHAT_MODEL", "gemini-2.5-flash"),
            image_model: or_default("IMAGE_MODEL", "gemini-2.0-flash-exp"),
            hq_image_model: or_default("HQ_IMAGE_MODEL", "gemini-2.5-flash-image"),
            aux_model: or_default("AUX_MODEL", "gemini-2.5-flash"),
            password: non_empty("NANPHOTO_PASSWORD"),
            gallery_backend,
            gallery_capacity,
            cdn_access_key_id,
            cdn_secret_access_key,
            cdn_endpoint: or_default("CDN_ENDPOINT", "https://nyc3.digitaloceanspaces.com"),
            cdn_bucket: or_default("CDN_BUCKET", "nanphoto"),
        })
    }
}
