//! Inbound webhook payloads.
//!
//! Only the first message of the first change of the first entry is read;
//! every field is optional so unexpected shapes degrade to "nothing to do".

use std::sync::LazyLock;

use portada_core::MediaKind;
use regex::Regex;
use serde::Deserialize;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://[^\s]+").unwrap());

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WebhookPayload {
    pub entry: Vec<Entry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Entry {
    pub changes: Vec<Change>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Change {
    pub value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChangeValue {
    pub contacts: Vec<Contact>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Contact {
    pub wa_id: String,
    pub profile: Option<Profile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Message {
    pub from: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<TextBody>,
    pub image: Option<MediaBody>,
    pub video: Option<MediaBody>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MediaBody {
    pub id: String,
    pub mime_type: Option<String>,
    pub caption: Option<String>,
}

/// What the sender asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Link { url: String, effect: Option<String> },
    Text(String),
    Media { kind: MediaKind, media_id: String, caption: Option<String> },
    Unsupported(String),
}

/// The one message a webhook call acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub from: String,
    pub name: Option<String>,
    pub content: Content,
}

impl WebhookPayload {
    /// Extracts the first message, or `None` for status updates and empty calls.
    pub fn first_message(&self) -> Option<Inbound> {
        let value = &self.entry.first()?.changes.first()?.value;
        let message = value.messages.first()?;
        if message.from.is_empty() {
            return None;
        }

        let name = value
            .contacts
            .iter()
            .find(|c| c.wa_id == message.from)
            .or(value.contacts.first())
            .and_then(|c| c.profile.as_ref())
            .map(|p| p.name.clone())
            .filter(|n| !n.is_empty());

        Some(Inbound { from: message.from.clone(), name, content: message.content() })
    }
}

impl Message {
    pub fn content(&self) -> Content {
        match self.kind.as_str() {
            "text" => classify_text(self.text.as_ref().map(|t| t.body.as_str()).unwrap_or_default()),
            "image" => media(MediaKind::Image, self.image.as_ref()),
            "video" => media(MediaKind::Video, self.video.as_ref()),
            other => Content::Unsupported(other.to_string()),
        }
    }
}

fn media(kind: MediaKind, body: Option<&MediaBody>) -> Content {
    match body.filter(|b| !b.id.is_empty()) {
        Some(body) => Content::Media {
            kind,
            media_id: body.id.clone(),
            caption: body.caption.clone().filter(|c| !c.trim().is_empty()),
        },
        None => Content::Unsupported(format!("{:?} without id", kind).to_lowercase()),
    }
}

/// A text with a URL is a link request; the token after the URL picks the effect.
pub fn classify_text(body: &str) -> Content {
    let Some(found) = URL_RE.find(body) else {
        return Content::Text(body.trim().to_string());
    };

    let effect = body[found.end()..].split_whitespace().next().map(str::to_lowercase);
    Content::Link { url: found.as_str().to_string(), effect }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(message: serde_json::Value) -> WebhookPayload {
        serde_json::from_value(json!({
            "object": "whatsapp_business_account",
            "entry": [{ "changes": [{ "value": {
                "contacts": [{ "wa_id": "5215550001111", "profile": { "name": "Ana" } }],
                "messages": [message]
            }}]}]
        }))
        .unwrap()
    }

    #[test]
    fn test_image_message() {
        let inbound = payload(json!({
            "from": "5215550001111", "id": "wamid.1", "type": "image",
            "image": { "id": "media-1", "mime_type": "image/jpeg", "caption": "logo" }
        }))
        .first_message()
        .unwrap();

        assert_eq!(inbound.from, "5215550001111");
        assert_eq!(inbound.name.as_deref(), Some("Ana"));
        assert_eq!(
            inbound.content,
            Content::Media { kind: MediaKind::Image, media_id: "media-1".into(), caption: Some("logo".into()) }
        );
    }

    #[test]
    fn test_video_without_caption() {
        let inbound = payload(json!({
            "from": "5215550001111", "type": "video", "video": { "id": "media-2", "caption": "  " }
        }))
        .first_message()
        .unwrap();

        assert_eq!(inbound.content, Content::Media { kind: MediaKind::Video, media_id: "media-2".into(), caption: None });
    }

    #[test]
    fn test_link_with_effect() {
        assert_eq!(
            classify_text("https://articulo7.example/nota-1 Blur"),
            Content::Link { url: "https://articulo7.example/nota-1".into(), effect: Some("blur".into()) }
        );
        assert_eq!(
            classify_text("mira http://a.example/x"),
            Content::Link { url: "http://a.example/x".into(), effect: None }
        );
    }

    #[test]
    fn test_plain_text_and_unsupported() {
        assert_eq!(classify_text(" hola "), Content::Text("hola".into()));

        let inbound = payload(json!({ "from": "1", "type": "sticker" })).first_message().unwrap();
        assert_eq!(inbound.content, Content::Unsupported("sticker".into()));
    }

    #[test]
    fn test_status_update_is_ignored() {
        let status: WebhookPayload = serde_json::from_value(json!({
            "entry": [{ "changes": [{ "value": { "statuses": [{ "id": "wamid.1", "status": "read" }] } }] }]
        }))
        .unwrap();
        assert!(status.first_message().is_none());
        assert!(WebhookPayload::default().first_message().is_none());
    }
}
