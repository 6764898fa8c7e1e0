//! Turns one inbound message into replies.
//!
//! Image work runs on the blocking pool; everything else is awaited inline so
//! a webhook call returns once the sender has their result.

use std::path::PathBuf;
use std::sync::Arc;

use portada_core::{
    FetchConfig, MediaKind, Rendered, Settings, fetch_link_source, load_editions, process_media_with_editions,
    render_editions, select_editions,
};
use tracing::{error, info, warn};

use crate::error::HandlerError;
use crate::messenger::Messenger;
use crate::payload::{Content, Inbound};

pub const HELP_TEXT: &str = "Envíame una imagen o video con una leyenda (logo, marca, big <texto>, recorte, blur) \
o el enlace de una nota para generar su portada.";

pub const UNSUPPORTED_TEXT: &str = "Ese tipo de mensaje no está soportado. Envía una imagen, un video o un enlace.";

/// Shared state for the webhook routes.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub editions_dir: PathBuf,
    pub fetch: FetchConfig,
    pub verify_token: String,
    pub messenger: Arc<dyn Messenger>,
}

/// Answers `inbound`, replying with a short message on failure.
pub async fn handle_inbound(state: &AppState, inbound: Inbound) {
    let to = inbound.from.as_str();
    info!(from = to, name = ?inbound.name, content = ?inbound.content, "inbound message");

    let result = match inbound.content {
        Content::Media { kind, media_id, caption } => handle_media(state, to, kind, &media_id, caption).await,
        Content::Link { url, effect } => handle_link(state, to, &url, effect.as_deref()).await,
        Content::Text(_) => {
            reply(state, to, HELP_TEXT).await;
            Ok(())
        }
        Content::Unsupported(kind) => {
            warn!(from = to, kind = %kind, "unsupported message type");
            reply(state, to, UNSUPPORTED_TEXT).await;
            Ok(())
        }
    };

    if let Err(e) = result {
        error!(from = to, error = %e, "could not answer message");
        reply(state, to, e.user_message()).await;
    }
}

async fn reply(state: &AppState, to: &str, body: &str) {
    if let Err(e) = state.messenger.send_text(to, body).await {
        warn!(to, error = %e, "could not send reply");
    }
}

async fn handle_media(
    state: &AppState,
    to: &str,
    kind: MediaKind,
    media_id: &str,
    caption: Option<String>,
) -> Result<(), HandlerError> {
    let noun = match kind {
        MediaKind::Image => "tu imagen",
        MediaKind::Video => "tu video",
    };
    reply(state, to, &format!("Procesando {noun}…")).await;

    let url = state.messenger.get_media_url(media_id).await.map_err(HandlerError::MediaUrl)?;
    let bytes = state.messenger.download_media(&url).await.map_err(HandlerError::Download)?;

    let settings = Arc::clone(&state.settings);
    let editions_dir = state.editions_dir.clone();
    let rendered = tokio::task::spawn_blocking(move || {
        let editions = load_editions(&settings, &editions_dir);
        process_media_with_editions(&bytes, caption.as_deref(), &settings, &editions)
    })
    .await?
    .map_err(HandlerError::Process)?;

    deliver(state, to, rendered).await
}

async fn deliver(state: &AppState, to: &str, rendered: Rendered) -> Result<(), HandlerError> {
    let mime = rendered.mime();
    let media_id = state
        .messenger
        .upload_media(rendered.bytes, &rendered.filename, mime)
        .await
        .map_err(HandlerError::Upload)?;

    match rendered.kind {
        MediaKind::Image => state.messenger.send_image(to, &media_id).await,
        MediaKind::Video => state.messenger.send_video(to, &media_id).await,
    }
    .map_err(HandlerError::Send)?;

    info!(to, filename = %rendered.filename, "result sent");
    Ok(())
}

async fn handle_link(state: &AppState, to: &str, url: &str, effect: Option<&str>) -> Result<(), HandlerError> {
    reply(state, to, "Procesando tu enlace…").await;

    let editions =
        select_editions(&state.settings, &state.editions_dir, effect).map_err(HandlerError::Editions)?;
    let source = fetch_link_source(url, &state.settings, &state.fetch).await.map_err(HandlerError::Link)?;

    let renditions = tokio::task::spawn_blocking(move || render_editions(&source, &editions)).await?;
    if renditions.is_empty() {
        return Err(HandlerError::NoRenditions);
    }

    for rendition in renditions {
        let media_id = state
            .messenger
            .upload_media(rendition.bytes, &rendition.filename, rendition.format.mime())
            .await
            .map_err(HandlerError::Upload)?;
        state.messenger.send_image(to, &media_id).await.map_err(HandlerError::Send)?;
        info!(to, variant = %rendition.variant, "edition sent");
    }
    Ok(())
}
