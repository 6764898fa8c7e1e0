//! HTML parsing for link pages.
//!
//! This module provides the [`Document`] and [`Element`] types for parsing
//! HTML and reading `<meta>` tags with CSS selectors.
//!
//! # Example
//!
//! ```rust
//! use portada_core::parse::Document;
//!
//! let html = r#"<html><head><meta property="og:title" content="Titular"></head></html>"#;
//! let doc = Document::parse(html);
//! assert_eq!(doc.meta_content("og:title"), Some("Titular".to_string()));
//! ```

use scraper::{Html, Selector};

use crate::{PortadaError, Result};

/// A parsed HTML document.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses HTML from a string. Malformed markup is recovered, never rejected.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html) }
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`PortadaError::HtmlParseError`] if the selector is invalid.
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel =
            Selector::parse(selector).map_err(|e| PortadaError::HtmlParseError(format!("Invalid selector: {}", e)))?;

        Ok(self.html.select(&sel).map(|el| Element { element: el }).collect())
    }

    /// Gets the trimmed content of the `<title>` element, if non-empty.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.html
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Gets the trimmed `content` of `<meta name=..>` or `<meta property=..>`.
    ///
    /// `name` is tried first; empty values are treated as absent.
    pub fn meta_content(&self, key: &str) -> Option<String> {
        ["name", "property"].iter().find_map(|attr| {
            let selector = format!("meta[{}=\"{}\"]", attr, key);
            self.select(&selector)
                .ok()?
                .iter()
                .filter_map(|el| el.attr("content"))
                .map(str::trim)
                .find(|content| !content.is_empty())
                .map(str::to_string)
        })
    }
}

/// A wrapper around scraper's ElementRef.
#[derive(Clone, Debug)]
pub struct Element<'a> {
    element: scraper::ElementRef<'a>,
}

impl<'a> Element<'a> {
    /// Gets the text content of this element.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.element.value().attr(name)
    }
}
