//! Caption classification.
//!
//! A caption is the short text a user attaches to an image or video. Its
//! first word picks the effect; whatever is not a known command is treated as
//! free text and rendered as a title.

use std::fmt;

/// Words that introduce a big-text caption. The rest of the caption is the text.
const BIG_TEXT_COMMANDS: [&str; 3] = ["big", "bigtext", "grande"];

/// The effect selected by a caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Overlay the configured logo.
    Logo,
    /// Overlay the configured watermark.
    Watermark,
    /// Large centered text; `text` may be empty.
    BigText { text: String },
    /// Reframe with the crop edition layout.
    Recorte,
    /// Reframe with the blurred-background edition layout.
    Blur,
    /// Free text, rendered as a title.
    Text { text: String },
    /// No caption.
    Unknown,
}

impl Effect {
    /// Short name used in suggested filenames and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Logo => "logo",
            Self::Watermark => "watermark",
            Self::BigText { .. } => "bigtext",
            Self::Recorte => "recorte",
            Self::Blur => "blur",
            Self::Text { .. } => "text",
            Self::Unknown => "unknown",
        }
    }

    /// Text to render, if the effect draws any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::BigText { text } | Self::Text { text } if !text.trim().is_empty() => Some(text.trim()),
            _ => None,
        }
    }

    /// Edition mode name for reframing effects.
    pub fn edition_mode(&self) -> Option<&'static str> {
        match self {
            Self::Recorte => Some("recorte"),
            Self::Blur => Some("blur"),
            _ => None,
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Classifies a caption into an [`Effect`].
///
/// Matching is case-insensitive on the trimmed caption; the text carried by
/// `BigText` and `Text` keeps its original case.
///
/// ```rust
/// use portada_core::caption::{Effect, classify};
///
/// assert_eq!(classify(Some(" LOGO ")), Effect::Logo);
/// assert_eq!(classify(Some("big Hola Mundo")), Effect::BigText { text: "Hola Mundo".into() });
/// assert_eq!(classify(None), Effect::Unknown);
/// ```
pub fn classify(caption: Option<&str>) -> Effect {
    let raw = caption.unwrap_or_default().trim();
    if raw.is_empty() {
        return Effect::Unknown;
    }

    let lowered = raw.to_lowercase();

    match lowered.as_str() {
        "logo" => return Effect::Logo,
        "watermark" | "marca" => return Effect::Watermark,
        _ => {}
    }

    let (command, rest) = match raw.split_once(char::is_whitespace) {
        Some((head, tail)) => (head.to_lowercase(), tail.trim()),
        None => (lowered.clone(), ""),
    };

    if BIG_TEXT_COMMANDS.contains(&command.as_str()) {
        return Effect::BigText { text: rest.to_string() };
    }
    if lowered.starts_with("recorte") {
        return Effect::Recorte;
    }
    if lowered.starts_with("blur") {
        return Effect::Blur;
    }

    Effect::Text { text: raw.to_string() }
}
