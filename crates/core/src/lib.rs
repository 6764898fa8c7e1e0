pub mod caption;
pub mod config;
pub mod editions;
pub mod error;
#[cfg(feature = "fetch")]
pub mod fetch;
pub mod link;
pub mod media;
pub mod parse;
pub mod processors;
pub mod universal;

pub use caption::{Effect, classify};
pub use config::{
    Align, BigTextConfig, LoggingConfig, LogoConfig, OutputConfig, OutputFormat, Position, ServerConfig, Settings,
    SettingsBuilder, SourceConfig, WatermarkConfig, WhatsAppConfig,
};
pub use editions::{EditionConfig, LinkSource, Rendition, load_editions, render_edition, render_editions, select_editions};
#[cfg(feature = "fetch")]
pub use editions::{fetch_link_source, generate_all_from_link, generate_from_link};
pub use error::{PortadaError, Result};
#[cfg(feature = "fetch")]
pub use fetch::{FetchConfig, fetch_bytes, fetch_url};
pub use link::{LinkMetadata, extract_metadata};
#[cfg(feature = "fetch")]
pub use link::{resolve_image_url, scrape};
pub use media::{MediaKind, is_video};
pub use parse::Document;
pub use universal::{Rendered, process_media, process_media_with_editions};
