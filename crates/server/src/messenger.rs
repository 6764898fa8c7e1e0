//! WhatsApp Cloud API client.
//!
//! Handlers talk to the API through the [`Messenger`] trait so tests can swap
//! in a recording implementation.

use async_trait::async_trait;
use portada_core::WhatsAppConfig;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};

use crate::error::MessengerError;

pub type Result<T> = std::result::Result<T, MessengerError>;

#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, to: &str, body: &str) -> Result<()>;

    /// Uploads a file and returns its media id.
    async fn upload_media(&self, bytes: Vec<u8>, filename: &str, mime: &str) -> Result<String>;

    async fn send_image(&self, to: &str, media_id: &str) -> Result<()>;

    async fn send_video(&self, to: &str, media_id: &str) -> Result<()>;

    /// Resolves a media id into a short-lived download URL.
    async fn get_media_url(&self, media_id: &str) -> Result<String>;

    async fn download_media(&self, url: &str) -> Result<Vec<u8>>;
}

/// Graph API implementation of [`Messenger`].
pub struct GraphClient {
    api_url: String,
    phone_number_id: String,
    access_token: String,
    client: reqwest::Client,
}

impl GraphClient {
    pub fn new(config: &WhatsAppConfig) -> Self {
        Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            phone_number_id: config.phone_number_id.clone(),
            access_token: config.access_token.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.api_url)
    }

    /// Passes 2xx responses through; anything else is logged and returned as an error.
    async fn check(operation: &'static str, resp: reqwest::Response) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        tracing::warn!(operation, status = ?status, body = %body, "WhatsApp API call failed");
        Err(MessengerError::Status { operation, status: status.as_u16(), body })
    }

    async fn send_message(&self, operation: &'static str, message: Value) -> Result<()> {
        let resp = self
            .client
            .post(self.url(&format!("{}/messages", self.phone_number_id)))
            .bearer_auth(&self.access_token)
            .json(&message)
            .send()
            .await?;
        Self::check(operation, resp).await?;
        Ok(())
    }

    async fn send_media(&self, to: &str, kind: &'static str, media_id: &str) -> Result<()> {
        let mut message = json!({ "messaging_product": "whatsapp", "to": to, "type": kind });
        message[kind] = json!({ "id": media_id });
        self.send_message(kind, message).await
    }
}

#[async_trait]
impl Messenger for GraphClient {
    async fn send_text(&self, to: &str, body: &str) -> Result<()> {
        self.send_message(
            "text",
            json!({
                "messaging_product": "whatsapp",
                "to": to,
                "type": "text",
                "text": { "body": body }
            }),
        )
        .await
    }

    async fn upload_media(&self, bytes: Vec<u8>, filename: &str, mime: &str) -> Result<String> {
        let part = Part::bytes(bytes).file_name(filename.to_string()).mime_str(mime)?;
        let form = Form::new()
            .text("messaging_product", "whatsapp")
            .text("type", mime.to_string())
            .part("file", part);

        let resp = self
            .client
            .post(self.url(&format!("{}/media", self.phone_number_id)))
            .bearer_auth(&self.access_token)
            .multipart(form)
            .send()
            .await?;
        let body: Value = Self::check("upload", resp).await?.json().await?;

        tracing::debug!(filename, mime, "uploaded media");
        string_field(&body, "upload", "id")
    }

    async fn send_image(&self, to: &str, media_id: &str) -> Result<()> {
        self.send_media(to, "image", media_id).await
    }

    async fn send_video(&self, to: &str, media_id: &str) -> Result<()> {
        self.send_media(to, "video", media_id).await
    }

    async fn get_media_url(&self, media_id: &str) -> Result<String> {
        let resp = self.client.get(self.url(media_id)).bearer_auth(&self.access_token).send().await?;
        let body: Value = Self::check("media_url", resp).await?.json().await?;
        string_field(&body, "media_url", "url")
    }

    async fn download_media(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.client.get(url).bearer_auth(&self.access_token).send().await?;
        let bytes = Self::check("download", resp).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

fn string_field(body: &Value, operation: &'static str, field: &'static str) -> Result<String> {
    body.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(MessengerError::MissingField { operation, field })
}
