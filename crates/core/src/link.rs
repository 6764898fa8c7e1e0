//! Open Graph scraping for news links.
//!
//! A link is reduced to a title, a lead image URL and a category label. The
//! category comes from `article:section` unless the source is configured to
//! always use its default label.

use serde::Serialize;

use crate::config::SourceConfig;
use crate::parse::Document;

#[cfg(feature = "fetch")]
use crate::fetch::{FetchConfig, fetch_url};
#[cfg(feature = "fetch")]
use tracing::{info, warn};
#[cfg(feature = "fetch")]
use url::Url;

/// Metadata extracted from a link.
///
/// When the page could not be fetched, `title` and `image_url` are `None`,
/// `category` holds the default label and `error` describes the failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkMetadata {
    pub title: Option<String>,
    pub image_url: Option<String>,
    pub category: String,
    pub error: Option<String>,
}

impl LinkMetadata {
    /// The fallback returned when a link cannot be scraped.
    pub fn failed(source: &SourceConfig, message: impl Into<String>) -> Self {
        Self { title: None, image_url: None, category: source.default_category.clone(), error: Some(message.into()) }
    }
}

/// Extracts link metadata from an HTML page.
///
/// Title priority: `og:title`, `twitter:title`, then `<title>`.
pub fn extract_metadata(html: &str, source: &SourceConfig) -> LinkMetadata {
    let doc = Document::parse(html);

    let title = doc
        .meta_content("og:title")
        .or_else(|| doc.meta_content("twitter:title"))
        .or_else(|| doc.title());
    let image_url = doc.meta_content("og:image");

    let category = if source.use_static_category {
        source.default_category.clone()
    } else {
        doc.meta_content("article:section").unwrap_or_else(|| source.default_category.clone())
    };

    LinkMetadata { title, image_url, category, error: None }
}

/// Fetches `url` and extracts its metadata. Never fails: fetch errors yield
/// [`LinkMetadata::failed`].
#[cfg(feature = "fetch")]
pub async fn scrape(url: &str, source: &SourceConfig, fetch: &FetchConfig) -> LinkMetadata {
    match fetch_url(url, fetch).await {
        Ok(html) => {
            let mut metadata = extract_metadata(&html, source);
            metadata.image_url = metadata.image_url.map(|image| resolve_image_url(&image, url));
            info!(url, title = ?metadata.title, category = %metadata.category, "scraped link");
            metadata
        }
        Err(e) => {
            warn!(url, error = %e, "failed to fetch link");
            LinkMetadata::failed(source, format!("Error al descargar: {}", e))
        }
    }
}

/// Resolves a possibly relative image reference against the page it came
/// from. References that cannot be joined are returned unchanged.
#[cfg(feature = "fetch")]
pub fn resolve_image_url(image: &str, page_url: &str) -> String {
    match Url::parse(page_url).and_then(|base| base.join(image)) {
        Ok(resolved) => resolved.into(),
        Err(_) => image.to_string(),
    }
}
