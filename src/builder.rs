//! Prompt construction.
//!
//! [`build_payload`] gathers the best-effort enrichment for a request and then
//! hands it to [`assemble`], which is pure: the same request and the same
//! enrichment always produce the same [`PromptPayload`].

use crate::ai::TextService;
use crate::models::ImageAttachment;
use crate::prompts;
use crate::request::{
    ChatRequest, EditRequest, GenerationRequest, ImageQuality, ImageToImageRequest,
    InfographicRequest, OutputKind, TextRenderingRequest, TextToImageRequest, ThermalRequest,
};

/// Chat models a caller may pick explicitly.
pub const CHAT_MODELS: &[&str] = &["gemini-2.5-flash", "gemini-3-flash-preview"];

/// Whole words that suggest the image should carry literal text.
const TEXT_TRIGGER_WORDS: &[&str] = &[
    "caption", "sign", "quote", "title", "label", "text", "says", "written", "slogan", "banner",
];

/// Stems matched at a word start, with any ending.
const TEXT_TRIGGER_STEMS: &[&str] = &[
    "inscri",
    "lettering",
    "подпис",
    "надпис",
    "текст на",
    "с текстом",
    "написан",
    "цитат",
    "лозунг",
];

/// Connectors stripped between a trigger word and the literal it introduces.
const LITERAL_CONNECTORS: &[&str] = &[
    "that says",
    "which says",
    "that reads",
    "with the words",
    "with the text",
    "with words",
    "saying",
    "says",
    "reading",
    "reads",
    "with",
    "of",
    "со словами",
    "с текстом",
];

const QUOTE_PAIRS: &[(char, char)] = &[
    ('"', '"'),
    ('«', '»'),
    ('“', '”'),
    ('„', '“'),
    ('\'', '\''),
];

/// Which model the client should use for a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelChoice {
    /// The client's default for the payload's output kind.
    Default,
    /// An explicitly requested, allow-listed model id.
    Named(String),
    /// The dedicated high-quality image model.
    HighQualityImage,
}

/// Fully assembled input for the model.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptPayload {
    pub model: ModelChoice,
    pub system_instruction: Option<String>,
    pub attachments: Vec<ImageAttachment>,
    pub instruction: String,
    /// Trailing constraint sent as its own text segment, always last.
    pub directive: Option<String>,
    pub output: OutputKind,
}

impl PromptPayload {
    fn text(instruction: String) -> Self {
        Self {
            model: ModelChoice::Default,
            system_instruction: None,
            attachments: Vec::new(),
            instruction,
            directive: None,
            output: OutputKind::Text,
        }
    }

    fn image(instruction: String, directive: String) -> Self {
        Self {
            model: ModelChoice::Default,
            system_instruction: None,
            attachments: Vec::new(),
            instruction,
            directive: Some(directive),
            output: OutputKind::Image,
        }
    }

    /// Text segments in the order they are sent.
    pub fn text_segments(&self) -> Vec<&str> {
        let mut segments = vec![self.instruction.as_str()];
        if let Some(directive) = &self.directive {
            segments.push(directive.as_str());
        }
        segments
    }

    /// The instruction and directive as one string.
    pub fn full_text(&self) -> String {
        self.text_segments().join("\n\n")
    }
}

/// Outcomes of the auxiliary calls made before assembly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    pub corrected_text: Option<String>,
    pub facts: Option<String>,
}

/// Run the enrichment a request needs, then assemble its payload.
pub async fn build_payload(request: &GenerationRequest, text: &dyn TextService) -> PromptPayload {
    let enrichment = enrich(request, text).await;
    assemble(request, &enrichment)
}

/// Call the auxiliary text service where a mode asks for it.
///
/// Failures and blank answers leave the corresponding field empty.
pub async fn enrich(request: &GenerationRequest, text: &dyn TextService) -> Enrichment {
    let mut enrichment = Enrichment::default();
    match request {
        GenerationRequest::TextToImage(req) => {
            if let Some(literal) = find_literal_text(&req.prompt) {
                enrichment.corrected_text = non_blank(text.correct_text(&literal).await);
            }
        }
        GenerationRequest::TextRendering(req) => {
            enrichment.corrected_text = non_blank(text.correct_text(req.exact_text.trim()).await);
        }
        GenerationRequest::Infographic(req) if req.use_fact_lookup => {
            enrichment.facts = non_blank(text.extract_facts(req.topic.trim()).await);
        }
        _ => {}
    }
    if enrichment.corrected_text.is_none() && enrichment.facts.is_none() {
        tracing::debug!("No enrichment applied for {} request", request.mode());
    }
    enrichment
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Build the payload for a request from already-gathered enrichment.
pub fn assemble(request: &GenerationRequest, enrichment: &Enrichment) -> PromptPayload {
    match request {
        GenerationRequest::Chat(req) => chat(req),
        GenerationRequest::TextToImage(req) => text_to_image(req, enrichment),
        GenerationRequest::ImageToImage(req) => image_to_image(req),
        GenerationRequest::Edit(req) => edit(req),
        GenerationRequest::Infographic(req) => infographic(req, enrichment),
        GenerationRequest::TextRendering(req) => text_rendering(req, enrichment),
        GenerationRequest::Thermal(req) => thermal(req),
    }
}

fn chat(req: &ChatRequest) -> PromptPayload {
    let mut payload = PromptPayload::text(req.query.trim().to_string());
    payload.system_instruction = Some(prompts::CHAT_SYSTEM.to_string());
    if let Some(model) = req
        .model
        .as_deref()
        .map(str::trim)
        .filter(|m| CHAT_MODELS.contains(m))
    {
        payload.model = ModelChoice::Named(model.to_string());
    }
    payload
}

fn exact_text_directive(text: &str) -> String {
    prompts::render(prompts::EXACT_TEXT, &[("text", text)])
}

fn text_to_image(req: &TextToImageRequest, enrichment: &Enrichment) -> PromptPayload {
    let mut clauses: Vec<String> = Vec::new();
    if let Some(hint) = req.style.and_then(prompts::image_style_hint) {
        clauses.push(hint.to_string());
    }
    if let Some(hint) = req.aspect_ratio.and_then(prompts::aspect_ratio_hint) {
        clauses.push(hint.to_string());
    }
    let refinements: Vec<&str> = req
        .refinements
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .collect();
    if !refinements.is_empty() {
        clauses.push(format!("Refinements: {}", refinements.join(", ")));
    }
    clauses.push(req.prompt.trim().to_string());

    let directive = match find_literal_text(&req.prompt) {
        Some(literal) => {
            let text = enrichment.corrected_text.as_deref().unwrap_or(&literal);
            exact_text_directive(text)
        }
        None => prompts::NO_EXTRA_TEXT.to_string(),
    };

    let mut payload = PromptPayload::image(clauses.join(". "), directive);
    if req.quality == Some(ImageQuality::High) {
        payload.model = ModelChoice::HighQualityImage;
    }
    payload
}

fn image_to_image(req: &ImageToImageRequest) -> PromptPayload {
    let attachments: Vec<ImageAttachment> = req
        .images
        .iter()
        .filter(|image| !image.data.is_empty())
        .take(crate::request::MAX_REFERENCE_IMAGES)
        .cloned()
        .collect();

    let template = if attachments.len() >= 2 {
        prompts::MULTI_REFERENCE
    } else {
        prompts::SINGLE_REFERENCE
    };
    let strength = req.strength.min(100).to_string();
    let instruction = prompts::render(
        template,
        &[("prompt", req.prompt.trim()), ("strength", &strength)],
    );

    let mut payload = PromptPayload::image(instruction, prompts::NO_EXTRA_TEXT.to_string());
    payload.attachments = attachments;
    payload
}

fn edit(req: &EditRequest) -> PromptPayload {
    let details = req.details.trim();
    let instruction = match req.preset.and_then(prompts::edit_template) {
        Some((template, default_details)) => {
            let details = if details.is_empty() {
                default_details
            } else {
                details
            };
            prompts::render(template, &[("details", details)])
        }
        None if !details.is_empty() => details.to_string(),
        None => prompts::EDIT_FALLBACK.to_string(),
    };

    let mut payload = PromptPayload::image(instruction, prompts::NO_EXTRA_TEXT.to_string());
    payload.attachments = req.image.iter().cloned().collect();
    payload
}

fn infographic(req: &InfographicRequest, enrichment: &Enrichment) -> PromptPayload {
    let mut instruction = format!("Create an infographic about {}.", req.topic.trim());
    let metrics = req.metrics.trim();
    if !metrics.is_empty() {
        instruction.push_str(&format!(" Include key data and metrics: {}.", metrics));
    }
    if let Some(facts) = &enrichment.facts {
        instruction.push_str(&format!(
            "\n\nCurrent facts to visualize:\n{}\n\n",
            facts
        ));
    } else {
        instruction.push(' ');
    }
    let style = req
        .style
        .and_then(prompts::infographic_style)
        .unwrap_or("editorial");
    instruction.push_str(&format!("Style: {}. {}", style, prompts::INFOGRAPHIC_LAYOUT));

    PromptPayload::image(instruction, prompts::NO_EXTRA_TEXT.to_string())
}

fn text_rendering(req: &TextRenderingRequest, enrichment: &Enrichment) -> PromptPayload {
    let text = enrichment
        .corrected_text
        .as_deref()
        .unwrap_or_else(|| req.exact_text.trim());
    let style = req.text_style.and_then(prompts::text_style).unwrap_or("bold");
    let context = match req.context.trim() {
        "" => "clean background",
        context => context,
    };
    let instruction = prompts::render(
        prompts::TEXT_RENDERING,
        &[
            ("text", text),
            ("style", style),
            ("language", prompts::language_name(req.language)),
            ("context", context),
        ],
    );

    PromptPayload::image(instruction, exact_text_directive(text))
}

/// The thermal instruction, also reported back to the caller as the prompt used.
pub fn thermal_instruction(req: &ThermalRequest) -> String {
    let mut parts: Vec<&str> = vec![prompts::THERMAL_BASE];
    parts.extend(req.category.and_then(prompts::thermal_category));
    parts.extend(req.style.and_then(prompts::thermal_style));
    parts.extend(req.detail_level.and_then(prompts::thermal_detail));
    parts.extend(req.outline_thickness.and_then(prompts::thermal_outline));
    if req.background_removal {
        parts.push(prompts::THERMAL_BACKGROUND_REMOVAL);
    }
    parts.extend(req.paper_size.and_then(prompts::thermal_paper));
    parts.join(" ")
}

fn thermal(req: &ThermalRequest) -> PromptPayload {
    let mut payload =
        PromptPayload::image(thermal_instruction(req), prompts::NO_EXTRA_TEXT.to_string());
    payload.attachments = req.image.iter().cloned().collect();
    payload
}

/// Lowercased characters paired with their byte offsets in the source.
fn fold(input: &str) -> Vec<(usize, char)> {
    input
        .char_indices()
        .map(|(i, c)| (i, c.to_lowercase().next().unwrap_or(c)))
        .collect()
}

fn matches_at(folded: &[(usize, char)], at: usize, needle: &str) -> bool {
    let mut idx = at;
    for expected in needle.chars() {
        match folded.get(idx) {
            Some((_, c)) if *c == expected => idx += 1,
            _ => return false,
        }
    }
    true
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Index (in `folded`) just past the first trigger, if any.
fn find_trigger(folded: &[(usize, char)]) -> Option<usize> {
    for start in 0..folded.len() {
        if start > 0 && is_word_char(folded[start - 1].1) {
            continue;
        }
        for word in TEXT_TRIGGER_WORDS {
            if !matches_at(folded, start, word) {
                continue;
            }
            let mut end = start + word.chars().count();
            if folded.get(end).map(|(_, c)| *c) == Some('s') {
                end += 1;
            }
            if folded.get(end).map_or(true, |(_, c)| !is_word_char(*c)) {
                return Some(end);
            }
        }
        for stem in TEXT_TRIGGER_STEMS {
            if matches_at(folded, start, stem) {
                let mut end = start + stem.chars().count();
                while folded.get(end).is_some_and(|(_, c)| is_word_char(*c)) {
                    end += 1;
                }
                return Some(end);
            }
        }
    }
    None
}

/// Apostrophes inside words ("cat's") never open or close a span.
fn find_quote(input: &str, quote: char, closing: bool) -> Option<usize> {
    if quote != '\'' {
        return input.find(quote);
    }
    input
        .char_indices()
        .filter(|(_, c)| *c == quote)
        .map(|(i, _)| i)
        .find(|&i| {
            let neighbour = if closing {
                input[i + 1..].chars().next()
            } else {
                input[..i].chars().next_back()
            };
            neighbour.map_or(true, |c| !c.is_alphanumeric())
        })
}

fn first_quoted_span(input: &str) -> Option<&str> {
    let mut best: Option<(usize, char, char)> = None;
    for (open, close) in QUOTE_PAIRS {
        if let Some(pos) = find_quote(input, *open, false) {
            if best.map_or(true, |(b, _, _)| pos < b) {
                best = Some((pos, *open, *close));
            }
        }
    }
    let (pos, open, close) = best?;
    let rest = &input[pos + open.len_utf8()..];
    let end = find_quote(rest, close, true)?;
    let span = rest[..end].trim();
    (!span.is_empty()).then_some(span)
}

fn strip_connectors(mut rest: &str) -> &str {
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || ":-–—,".contains(c));
        let folded = rest.to_lowercase();
        let connector = LITERAL_CONNECTORS.iter().find(|connector| {
            folded.starts_with(*connector)
                && folded[connector.len()..]
                    .chars()
                    .next()
                    .map_or(true, |c| !is_word_char(c))
        });
        match connector {
            // Connectors are lowercase-stable, so byte lengths line up.
            Some(connector) if rest.is_char_boundary(connector.len()) => {
                rest = &rest[connector.len()..];
            }
            _ => return rest,
        }
    }
}

/// Literal text a text-to-image prompt asks to be drawn, if any.
///
/// Only prompts containing a trigger phrase qualify. The first quoted span
/// wins; otherwise the words after the trigger up to the end of the sentence.
pub fn find_literal_text(prompt: &str) -> Option<String> {
    let folded = fold(prompt);
    let trigger_end = find_trigger(&folded)?;

    if let Some(span) = first_quoted_span(prompt) {
        return Some(span.to_string());
    }

    let offset = folded
        .get(trigger_end)
        .map_or(prompt.len(), |(offset, _)| *offset);
    let rest = strip_connectors(&prompt[offset..]);
    let literal = rest
        .split(['.', '!', '?', '\n'])
        .next()
        .unwrap_or("")
        .trim();
    (!literal.is_empty()).then(|| literal.to_string())
}
