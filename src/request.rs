//! Generation requests, one variant per mode.
//!
//! Option enums carry an `Unknown` catch-all so unrecognized values from the
//! UI deserialize cleanly and contribute nothing to the prompt.

use crate::models::ImageAttachment;
use crate::{Error, Result};
use serde::Deserialize;

pub const MAX_REFERENCE_IMAGES: usize = 3;
pub const DEFAULT_STRENGTH: u32 = 80;

/// Whether a mode is answered with text or must produce an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Text,
    Image,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum GenerationRequest {
    Chat(ChatRequest),
    TextToImage(TextToImageRequest),
    ImageToImage(ImageToImageRequest),
    Edit(EditRequest),
    Infographic(InfographicRequest),
    TextRendering(TextRenderingRequest),
    Thermal(ThermalRequest),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextToImageRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub style: Option<ImageStyle>,
    #[serde(default)]
    pub aspect_ratio: Option<AspectRatio>,
    #[serde(default)]
    pub refinements: Vec<String>,
    #[serde(default)]
    pub quality: Option<ImageQuality>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageToImageRequest {
    #[serde(default)]
    pub images: Vec<ImageAttachment>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default = "default_strength")]
    pub strength: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    pub image: Option<ImageAttachment>,
    #[serde(default)]
    pub preset: Option<EditPreset>,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfographicRequest {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub metrics: String,
    #[serde(default)]
    pub style: Option<InfographicStyle>,
    #[serde(default)]
    pub use_fact_lookup: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRenderingRequest {
    #[serde(default)]
    pub exact_text: String,
    #[serde(default)]
    pub text_style: Option<TextStyle>,
    #[serde(default)]
    pub language: Option<Language>,
    #[serde(default)]
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThermalRequest {
    pub image: Option<ImageAttachment>,
    #[serde(default)]
    pub category: Option<ThermalCategory>,
    #[serde(default)]
    pub style: Option<ThermalStyle>,
    #[serde(default)]
    pub detail_level: Option<DetailLevel>,
    #[serde(default)]
    pub outline_thickness: Option<OutlineThickness>,
    #[serde(default = "default_true")]
    pub background_removal: bool,
    #[serde(default)]
    pub paper_size: Option<PaperSize>,
}

fn default_strength() -> u32 {
    DEFAULT_STRENGTH
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageStyle {
    Photorealistic,
    Anime,
    ConceptArt,
    OilPainting,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "4:3")]
    Classic,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageQuality {
    Standard,
    High,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EditPreset {
    ReplaceBackground,
    RemoveObject,
    ChangeColors,
    AddObject,
    ChangeStyle,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InfographicStyle {
    Editorial,
    Technical,
    HandDrawn,
    Minimalist,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextStyle {
    Bold,
    Calligraphy,
    Neon,
    #[serde(rename = "3d")]
    ThreeD,
    Handwritten,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ru,
    En,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThermalCategory {
    Portrait,
    Objects,
    Logos,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThermalStyle {
    LineArt,
    Stencil,
    Stamp,
    Halftone,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetailLevel {
    Simplified,
    Medium,
    Detailed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutlineThickness {
    Thin,
    Medium,
    Bold,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PaperSize {
    #[serde(rename = "58mm")]
    Mm58,
    #[serde(rename = "80mm")]
    Mm80,
    #[serde(other)]
    Unknown,
}

fn require(value: &str, message: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(message.to_string()));
    }
    Ok(())
}

fn require_image(image: &Option<ImageAttachment>, message: &str) -> Result<()> {
    match image {
        Some(attachment) if !attachment.data.is_empty() => Ok(()),
        _ => Err(Error::Validation(message.to_string())),
    }
}

impl GenerationRequest {
    /// Stable mode name, as used in the `mode` tag.
    pub fn mode(&self) -> &'static str {
        match self {
            GenerationRequest::Chat(_) => "chat",
            GenerationRequest::TextToImage(_) => "text-to-image",
            GenerationRequest::ImageToImage(_) => "image-to-image",
            GenerationRequest::Edit(_) => "edit",
            GenerationRequest::Infographic(_) => "infographic",
            GenerationRequest::TextRendering(_) => "text-rendering",
            GenerationRequest::Thermal(_) => "thermal",
        }
    }

    pub fn output(&self) -> OutputKind {
        match self {
            GenerationRequest::Chat(_) => OutputKind::Text,
            _ => OutputKind::Image,
        }
    }

    /// Reject requests whose required fields are missing or blank.
    pub fn validate(&self) -> Result<()> {
        match self {
            GenerationRequest::Chat(req) => require(&req.query, "A query is required."),
            GenerationRequest::TextToImage(req) => require(&req.prompt, "A prompt is required."),
            GenerationRequest::ImageToImage(req) => {
                let references = req.images.iter().filter(|i| !i.data.is_empty()).count();
                if references == 0 {
                    return Err(Error::Validation(
                        "At least one reference image is required.".to_string(),
                    ));
                }
                if req.images.len() > MAX_REFERENCE_IMAGES {
                    return Err(Error::Validation(format!(
                        "At most {} reference images are supported.",
                        MAX_REFERENCE_IMAGES
                    )));
                }
                require(&req.prompt, "A description is required.")
            }
            GenerationRequest::Edit(req) => {
                require_image(&req.image, "An image to edit is required.")?;
                if req.preset.is_none() && req.details.trim().is_empty() {
                    return Err(Error::Validation(
                        "An edit type or edit details are required.".to_string(),
                    ));
                }
                Ok(())
            }
            GenerationRequest::Infographic(req) => {
                require(&req.topic, "An infographic topic is required.")
            }
            GenerationRequest::TextRendering(req) => {
                require(&req.exact_text, "The text to render is required.")
            }
            GenerationRequest::Thermal(req) => {
                require_image(&req.image, "An image to convert is required.")
            }
        }
    }

    /// Short human label stored next to a generated artifact.
    pub fn caption(&self) -> Option<String> {
        let label = match self {
            GenerationRequest::Chat(_) | GenerationRequest::Thermal(_) => return None,
            GenerationRequest::TextToImage(req) => req.prompt.trim(),
            GenerationRequest::ImageToImage(req) => req.prompt.trim(),
            GenerationRequest::Edit(req) => req.details.trim(),
            GenerationRequest::Infographic(req) => req.topic.trim(),
            GenerationRequest::TextRendering(req) => req.exact_text.trim(),
        };
        (!label.is_empty()).then(|| label.to_string())
    }
}
