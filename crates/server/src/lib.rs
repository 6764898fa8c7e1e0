//! Portada webhook service.
//!
//! Receives WhatsApp Cloud API webhooks, renders the requested graphic with
//! `portada-core` and sends it back to the sender.

pub mod error;
pub mod handlers;
pub mod messenger;
pub mod payload;
pub mod routes;
pub mod startup;

pub use handlers::AppState;
pub use messenger::{GraphClient, Messenger};
pub use routes::app;
pub use startup::load_settings;
