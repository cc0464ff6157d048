//! Prompt templates and the per-option clause tables.

use crate::request::{
    AspectRatio, DetailLevel, EditPreset, ImageStyle, InfographicStyle, Language,
    OutlineThickness, PaperSize, TextStyle, ThermalCategory, ThermalStyle,
};

pub const CHAT_SYSTEM: &str = include_str!("../data/prompts/chat_system.txt");
pub const THERMAL_BASE: &str = include_str!("../data/prompts/thermal_base.txt");
pub const NO_EXTRA_TEXT: &str = include_str!("../data/prompts/no_extra_text.txt");
pub const EXACT_TEXT: &str = include_str!("../data/prompts/exact_text.txt");
pub const TEXT_RENDERING: &str = include_str!("../data/prompts/text_rendering.txt");
pub const CORRECT_TEXT: &str = include_str!("../data/prompts/correct_text.txt");
pub const EXTRACT_FACTS: &str = include_str!("../data/prompts/extract_facts.txt");

pub const SINGLE_REFERENCE: &str =
    "Using this reference image, create: {{prompt}}, coherent result, high quality. Reference influence: {{strength}}%.";
pub const MULTI_REFERENCE: &str =
    "Combine the style of image 1 with the composition of image 2, create: {{prompt}}, seamless blend, coherent result, high quality. Reference influence strength: {{strength}}%.";

pub const EDIT_FALLBACK: &str = "Edit this image as requested.";

pub const INFOGRAPHIC_LAYOUT: &str = "Compress information into visual format, clear typography, data visualization with charts and icons, organized layout, professional design, high readability.";

/// Replace `{{key}}` placeholders in a template string.
///
/// Substituted values are inserted as-is and never scanned for placeholders.
/// Unknown placeholders are left in place.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let value = after.find("}}").and_then(|end| {
            let key = &after[..end];
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, end))
        });
        match value {
            Some((value, end)) => {
                result.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                result.push_str("{{");
                rest = after;
            }
        }
    }
    result.push_str(rest);
    result
}

pub fn image_style_hint(style: ImageStyle) -> Option<&'static str> {
    match style {
        ImageStyle::Photorealistic => Some("photorealistic, high quality photo"),
        ImageStyle::Anime => Some("anime style"),
        ImageStyle::ConceptArt => Some("concept art style"),
        ImageStyle::OilPainting => Some("oil painting style"),
        ImageStyle::Unknown => None,
    }
}

pub fn aspect_ratio_hint(ratio: AspectRatio) -> Option<&'static str> {
    match ratio {
        AspectRatio::Square => Some("square, 1:1 aspect ratio"),
        AspectRatio::Landscape => Some("wide landscape, 16:9"),
        AspectRatio::Portrait => Some("portrait, 9:16"),
        AspectRatio::Classic => Some("4:3 aspect ratio"),
        AspectRatio::Unknown => None,
    }
}

/// Edit template and the detail text substituted when the user gave none.
pub fn edit_template(preset: EditPreset) -> Option<(&'static str, &'static str)> {
    match preset {
        EditPreset::ReplaceBackground => Some((
            "Replace the background with {{details}}, keep the main subject unchanged, seamless integration, natural lighting match",
            "a new background",
        )),
        EditPreset::RemoveObject => Some((
            "Remove {{details}} from the image, inpaint the area naturally, seamless reconstruction, no traces left",
            "the selected object",
        )),
        EditPreset::ChangeColors => Some((
            "Change {{details}} to new colors, maintain original lighting and shadows, natural color transition, photorealistic result",
            "colors as described",
        )),
        EditPreset::AddObject => Some((
            "Add {{details}} to the image, natural placement, consistent lighting and perspective",
            "the described object",
        )),
        EditPreset::ChangeStyle => Some((
            "Change the style of the image: {{details}}, coherent result, high quality",
            "apply the new style",
        )),
        EditPreset::Unknown => None,
    }
}

pub fn infographic_style(style: InfographicStyle) -> Option<&'static str> {
    match style {
        InfographicStyle::Editorial => Some("editorial"),
        InfographicStyle::Technical => Some("technical diagram"),
        InfographicStyle::HandDrawn => Some("hand-drawn"),
        InfographicStyle::Minimalist => Some("minimalist"),
        InfographicStyle::Unknown => None,
    }
}

pub fn text_style(style: TextStyle) -> Option<&'static str> {
    match style {
        TextStyle::Bold => Some("bold"),
        TextStyle::Calligraphy => Some("calligraphy"),
        TextStyle::Neon => Some("neon"),
        TextStyle::ThreeD => Some("3D"),
        TextStyle::Handwritten => Some("handwritten"),
        TextStyle::Unknown => None,
    }
}

pub fn language_name(language: Option<Language>) -> &'static str {
    match language {
        Some(Language::Ru) => "Russian",
        _ => "English",
    }
}

pub fn thermal_category(category: ThermalCategory) -> Option<&'static str> {
    match category {
        ThermalCategory::Portrait => Some(
            "Focus on face and shoulders, clear facial features, portrait-optimized line art.",
        ),
        ThermalCategory::Objects => Some("Product or object focus, clear edges, no background."),
        ThermalCategory::Logos => Some("Icon or logo style, simple shapes, minimal lines."),
        ThermalCategory::Unknown => None,
    }
}

pub fn thermal_style(style: ThermalStyle) -> Option<&'static str> {
    match style {
        ThermalStyle::LineArt => Some("Use clean line art style."),
        ThermalStyle::Stencil => Some("Use stencil style, bold cut-out look."),
        ThermalStyle::Stamp => Some("Use stamp style, rubber stamp aesthetic."),
        ThermalStyle::Halftone => Some("Use halftone/dotted style where appropriate."),
        ThermalStyle::Unknown => None,
    }
}

pub fn thermal_detail(level: DetailLevel) -> Option<&'static str> {
    match level {
        DetailLevel::Simplified => Some("Simplified details, minimal lines."),
        DetailLevel::Medium => Some("Medium level of detail."),
        DetailLevel::Detailed => Some("Detailed, intricate lines."),
        DetailLevel::Unknown => None,
    }
}

pub fn thermal_outline(thickness: OutlineThickness) -> Option<&'static str> {
    match thickness {
        OutlineThickness::Thin => Some("Thin outlines."),
        OutlineThickness::Medium => Some("Medium thickness outlines."),
        OutlineThickness::Bold => Some("Thick bold black outlines."),
        OutlineThickness::Unknown => None,
    }
}

pub const THERMAL_BACKGROUND_REMOVAL: &str = "Remove all background. Clean white background only.";

pub fn thermal_paper(size: PaperSize) -> Option<&'static str> {
    match size {
        PaperSize::Mm58 => Some("Optimized for 58mm thermal paper width."),
        PaperSize::Mm80 => Some("Optimized for 80mm thermal paper width."),
        PaperSize::Unknown => None,
    }
}
