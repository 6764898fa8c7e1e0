//! Error types for the webhook service.

/// Failures talking to the messaging API.
#[derive(Debug, thiserror::Error)]
pub enum MessengerError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{operation} returned {status}: {body}")]
    Status { operation: &'static str, status: u16, body: String },

    #[error("Response of {operation} is missing `{field}`")]
    MissingField { operation: &'static str, field: &'static str },
}

/// Failures while answering one inbound message.
///
/// Each variant maps to the short reply sent back to the user.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("could not resolve media: {0}")]
    MediaUrl(#[source] MessengerError),

    #[error("could not download media: {0}")]
    Download(#[source] MessengerError),

    #[error("could not process media: {0}")]
    Process(#[source] portada_core::PortadaError),

    #[error("could not read link: {0}")]
    Link(#[source] portada_core::PortadaError),

    #[error("no edition matches: {0}")]
    Editions(#[source] portada_core::PortadaError),

    #[error("no edition could be rendered")]
    NoRenditions,

    #[error("could not upload result: {0}")]
    Upload(#[source] MessengerError),

    #[error("could not send result: {0}")]
    Send(#[source] MessengerError),

    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl HandlerError {
    /// Reply shown to the sender.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MediaUrl(_) | Self::Download(_) => "No pude descargar tu archivo. Intenta enviarlo de nuevo.",
            Self::Process(_) | Self::Join(_) => "No pude procesar tu archivo.",
            Self::Link(_) => "No pude leer ese enlace. Revisa que la nota tenga título e imagen.",
            Self::Editions(_) => "No hay una edición para ese efecto. Usa recorte o blur.",
            Self::NoRenditions => "No pude generar la portada de ese enlace.",
            Self::Upload(_) | Self::Send(_) => "No pude enviarte el resultado.",
        }
    }
}
