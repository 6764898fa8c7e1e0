//! Layered JSON configuration.
//!
//! Settings are plain JSON documents merged on top of each other:
//! `defaults.json`, then `settings.json`, then (for link renditions) one
//! edition file, then a handful of environment variables. Processors read
//! typed sections out of the merged document; a key with a broken value is
//! logged and replaced by its default.
//!
//! # Example
//!
//! ```rust
//! use portada_core::config::{LogoConfig, Settings};
//! use serde_json::json;
//!
//! let settings = Settings::from_value(json!({ "logo": { "logo_margin": 8 } }));
//! let logo: LogoConfig = settings.section("logo");
//! assert_eq!(logo.logo_margin, 8);
//! assert_eq!(logo.logo_scale_ratio, 0.2);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{PortadaError, Result};

/// Default category label used when a page exposes none.
pub const DEFAULT_CATEGORY: &str = "ARTÍCULO 7";

/// Environment variables that override keys of the `whatsapp` section.
pub const ENV_OVERRIDES: [(&str, &str); 3] = [
    ("WHATSAPP_TOKEN", "access_token"),
    ("WHATSAPP_PHONE_ID", "phone_number_id"),
    ("WHATSAPP_VERIFY_TOKEN", "verify_token"),
];

/// Reads a JSON document from disk.
pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Value> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(PortadaError::FileNotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Recursively merges `overlay` on top of `base`.
///
/// Objects merge key by key; any other value in `overlay` replaces the one
/// in `base`, including arrays.
pub fn merge_values(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in overlay_map {
                let next = match merged.get(key) {
                    Some(existing) if existing.is_object() && value.is_object() => merge_values(existing, value),
                    _ => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        (_, overlay) => overlay.clone(),
    }
}

/// A merged configuration document.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    value: Value,
}

impl Default for Settings {
    fn default() -> Self {
        Self { value: Value::Object(Map::new()) }
    }
}

impl Settings {
    /// Creates empty settings; every section falls back to its defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing JSON value. Non-object values are replaced by an empty object.
    pub fn from_value(value: Value) -> Self {
        if value.is_object() { Self { value } } else { Self::default() }
    }

    /// Loads `defaults` and merges `settings` over it.
    ///
    /// Missing files are skipped; unreadable or malformed files are logged
    /// and skipped, so this never fails.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(defaults: P, settings: Q) -> Self {
        SettingsBuilder::new().layer(defaults).layer(settings).build()
    }

    /// Starts a [`SettingsBuilder`].
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::new()
    }

    /// Returns a copy with `overlay` merged on top.
    pub fn merged(&self, overlay: &Value) -> Settings {
        Settings::from_value(merge_values(&self.value, overlay))
    }

    /// Returns a copy with the JSON file at `path` merged on top.
    pub fn with_override<P: AsRef<Path>>(&self, path: P) -> Result<Settings> {
        let overlay = load_json(path)?;
        Ok(self.merged(&overlay))
    }

    /// Applies the `WHATSAPP_*` environment variables to the `whatsapp` section.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Applies `whatsapp` overrides using an arbitrary variable lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(root) = self.value.as_object_mut() else {
            return;
        };

        let whatsapp = root
            .entry("whatsapp")
            .or_insert_with(|| Value::Object(Map::new()));
        if !whatsapp.is_object() {
            *whatsapp = Value::Object(Map::new());
        }

        if let Some(section) = whatsapp.as_object_mut() {
            for (variable, key) in ENV_OVERRIDES {
                if let Some(value) = lookup(variable).filter(|v| !v.is_empty()) {
                    section.insert(key.to_string(), Value::String(value));
                }
            }
        }
    }

    /// Reads a typed section, falling back to `T::default()`.
    ///
    /// A missing key is silent. A key whose value does not fit `T` is logged
    /// and replaced by its default; its valid siblings are kept.
    pub fn section<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.value.get(key) {
            None | Some(Value::Null) => T::default(),
            Some(value) => parse_lenient(value, key),
        }
    }

    /// Reads the whole document as a typed value, falling back to `T::default()`
    /// key by key.
    pub fn root<T: DeserializeOwned + Default>(&self) -> T {
        parse_lenient(&self.value, "<root>")
    }

    /// Gets a raw top-level value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.value.get(key)
    }

    /// Sets a raw top-level value.
    pub fn insert(&mut self, key: &str, value: Value) {
        if let Some(root) = self.value.as_object_mut() {
            root.insert(key.to_string(), value);
        }
    }

    /// Gets the underlying JSON document.
    pub fn as_value(&self) -> &Value {
        &self.value
    }
}

/// Deserializes `value` into `T`, dropping the keys that do not fit.
///
/// Relies on `T` filling absent fields from `#[serde(default)]`.
fn parse_lenient<T: DeserializeOwned + Default>(value: &Value, section: &str) -> T {
    let error = match serde_json::from_value(value.clone()) {
        Ok(parsed) => return parsed,
        Err(e) => e,
    };

    let Some(fields) = value.as_object() else {
        warn!(section, error = %error, "invalid configuration section, using defaults");
        return T::default();
    };

    let mut accepted = Map::new();
    for (name, field) in fields {
        accepted.insert(name.clone(), field.clone());
        if let Err(e) = serde_json::from_value::<T>(Value::Object(accepted.clone())) {
            warn!(section, key = %name, error = %e, "invalid configuration key, using default");
            accepted.remove(name);
        }
    }
    serde_json::from_value(Value::Object(accepted)).unwrap_or_default()
}

/// Builder for [`Settings`] from an ordered list of files.
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    layers: Vec<PathBuf>,
    env_overrides: bool,
}

impl SettingsBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file layer; later layers win.
    pub fn layer<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.layers.push(path.as_ref().to_path_buf());
        self
    }

    /// Apply `WHATSAPP_*` environment overrides after all layers.
    pub fn env_overrides(mut self, enabled: bool) -> Self {
        self.env_overrides = enabled;
        self
    }

    /// Build the merged settings
    pub fn build(self) -> Settings {
        let mut value = Value::Object(Map::new());

        for path in &self.layers {
            if !path.exists() {
                debug!(path = %path.display(), "configuration layer not present");
                continue;
            }
            match load_json(path) {
                Ok(layer) if layer.is_object() => value = merge_values(&value, &layer),
                Ok(_) => warn!(path = %path.display(), "configuration layer is not a JSON object, skipping"),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to load configuration layer"),
            }
        }

        let mut settings = Settings::from_value(value);
        if self.env_overrides {
            settings.apply_env_overrides();
        }
        settings
    }
}

/// Where an overlay sits on the base image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum Position {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    Center,
}

impl From<String> for Position {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "top-left" => Self::TopLeft,
            "top-right" => Self::TopRight,
            "bottom-left" => Self::BottomLeft,
            "bottom-right" => Self::BottomRight,
            _ => Self::Center,
        }
    }
}

/// Horizontal alignment of big text lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum Align {
    Left,
    #[default]
    Center,
    Right,
}

impl From<String> for Align {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "left" => Self::Left,
            "right" => Self::Right,
            _ => Self::Center,
        }
    }
}

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
}

impl OutputFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    /// MIME type for uploads.
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

impl From<String> for OutputFormat {
    fn from(value: String) -> Self {
        match value.trim().to_uppercase().as_str() {
            "PNG" => Self::Png,
            _ => Self::Jpeg,
        }
    }
}

/// `logo` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogoConfig {
    pub logo_file: PathBuf,
    pub logo_position: Position,
    /// Logo height relative to the base image height.
    pub logo_scale_ratio: f32,
    pub logo_margin: u32,
}

impl Default for LogoConfig {
    fn default() -> Self {
        Self {
            logo_file: PathBuf::from("assets/overlays/logo.png"),
            logo_position: Position::BottomRight,
            logo_scale_ratio: 0.2,
            logo_margin: 20,
        }
    }
}

/// `watermark` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    pub watermark_file: PathBuf,
    pub watermark_opacity: f32,
    pub watermark_tile: bool,
    /// Watermark width relative to the base image width.
    pub watermark_scale_ratio: f32,
    /// Gap between tiles, in pixels.
    pub watermark_gap: u32,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            watermark_file: PathBuf::from("assets/overlays/watermark.png"),
            watermark_opacity: 0.3,
            watermark_tile: false,
            watermark_scale_ratio: 0.25,
            watermark_gap: 50,
        }
    }
}

/// `bigtext` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BigTextConfig {
    pub font: PathBuf,
    #[serde(alias = "font_size", alias = "bigtext_font_size")]
    pub size: f32,
    pub color: [u8; 3],
    pub stroke_color: [u8; 3],
    pub stroke_width: u32,
    pub align: Align,
    pub margin_x: u32,
    pub margin_y: u32,
    pub max_width_ratio: f32,
    pub line_spacing: u32,
}

impl Default for BigTextConfig {
    fn default() -> Self {
        Self {
            font: PathBuf::from("assets/fonts/DejaVuSans-Bold.ttf"),
            size: 96.0,
            color: [255, 255, 255],
            stroke_color: [0, 0, 0],
            stroke_width: 3,
            align: Align::Center,
            margin_x: 50,
            margin_y: 50,
            max_width_ratio: 0.9,
            line_spacing: 10,
        }
    }
}

/// `output` section, shared by media processing and editions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { format: OutputFormat::Jpeg, width: 1080, height: 1350 }
    }
}

/// Top-level keys that drive link scraping.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub default_category: String,
    pub use_static_category: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self { default_category: DEFAULT_CATEGORY.to_string(), use_static_category: false }
    }
}

/// `logging` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

/// `whatsapp` section. Credentials usually arrive through [`ENV_OVERRIDES`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WhatsAppConfig {
    pub access_token: String,
    pub phone_number_id: String,
    pub verify_token: String,
    pub api_url: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            phone_number_id: String::new(),
            verify_token: String::new(),
            api_url: "https://graph.facebook.com/v17.0".to_string(),
        }
    }
}

impl WhatsAppConfig {
    /// Names of the credentials that are still empty.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        [
            ("access_token", &self.access_token),
            ("phone_number_id", &self.phone_number_id),
            ("verify_token", &self.verify_token),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// `server` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub editions_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            debug: false,
            editions_dir: PathBuf::from("configs/articulo7/editions"),
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_whatsapp_missing_credentials() {
        let settings = Settings::from_value(json!({ "whatsapp": { "access_token": "tok" } }));
        let whatsapp: WhatsAppConfig = settings.section("whatsapp");
        assert_eq!(whatsapp.api_url, "https://graph.facebook.com/v17.0");
        assert_eq!(whatsapp.missing_credentials(), vec!["phone_number_id", "verify_token"]);
    }

    #[test]
    fn test_server_defaults() {
        let server: ServerConfig = Settings::new().section("server");
        assert_eq!(server.addr(), "0.0.0.0:8000");
    }

    #[test]
    fn test_merge_nested_objects() {
        let base = json!({ "logo": { "logo_margin": 20, "logo_position": "top-left" }, "keep": 1 });
        let overlay = json!({ "logo": { "logo_margin": 5 } });
        let merged = merge_values(&base, &overlay);

        assert_eq!(merged["logo"]["logo_margin"], 5);
        assert_eq!(merged["logo"]["logo_position"], "top-left");
        assert_eq!(merged["keep"], 1);
    }

    #[test]
    fn test_merge_replaces_non_objects() {
        let base = json!({ "color": [1, 2, 3], "logo": { "a": 1 } });
        let overlay = json!({ "color": [9], "logo": "off" });
        let merged = merge_values(&base, &overlay);

        assert_eq!(merged["color"], json!([9]));
        assert_eq!(merged["logo"], "off");
    }

    #[test]
    fn test_load_layers_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let defaults = temp_dir.path().join("defaults.json");
        let settings = temp_dir.path().join("settings.json");

        fs::write(&defaults, r#"{"watermark": {"watermark_opacity": 0.3, "watermark_tile": true}}"#).unwrap();
        fs::write(&settings, r#"{"watermark": {"watermark_opacity": 0.8}}"#).unwrap();

        let loaded = Settings::load(&defaults, &settings);
        let watermark: WatermarkConfig = loaded.section("watermark");

        assert_eq!(watermark.watermark_opacity, 0.8);
        assert!(watermark.watermark_tile);
    }

    #[test]
    fn test_load_skips_missing_and_broken_files() {
        let temp_dir = TempDir::new().unwrap();
        let broken = temp_dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();

        let loaded = Settings::load(temp_dir.path().join("absent.json"), &broken);
        assert_eq!(loaded, Settings::new());
    }

    #[test]
    fn test_invalid_key_keeps_valid_siblings() {
        let settings = Settings::from_value(json!({ "logo": { "logo_margin": "wide", "logo_position": "top-left" } }));
        let logo: LogoConfig = settings.section("logo");
        assert_eq!(logo.logo_position, Position::TopLeft);
        assert_eq!(logo.logo_margin, 20);
        assert_eq!(logo.logo_scale_ratio, 0.2);
    }

    #[test]
    fn test_invalid_section_shape_falls_back_to_defaults() {
        let settings = Settings::from_value(json!({ "logo": "top-left", "watermark": [1, 2] }));
        assert_eq!(settings.section::<LogoConfig>("logo"), LogoConfig::default());
        assert_eq!(settings.section::<WatermarkConfig>("watermark"), WatermarkConfig::default());
    }

    #[test]
    fn test_root_keeps_valid_keys() {
        let settings = Settings::from_value(json!({ "default_category": "NOTAS", "use_static_category": "yes" }));
        let source: SourceConfig = settings.root();
        assert_eq!(source.default_category, "NOTAS");
        assert!(!source.use_static_category);
    }

    #[test]
    fn test_bigtext_font_size_aliases() {
        let settings = Settings::from_value(json!({ "bigtext": { "font_size": 42 } }));
        let big: BigTextConfig = settings.section("bigtext");
        assert_eq!(big.size, 42.0);

        let settings = Settings::from_value(json!({ "bigtext": { "bigtext_font_size": 64 } }));
        let big: BigTextConfig = settings.section("bigtext");
        assert_eq!(big.size, 64.0);
    }

    #[test]
    fn test_position_parsing() {
        assert_eq!(Position::from("Top-Left".to_string()), Position::TopLeft);
        assert_eq!(Position::from("bottom-right".to_string()), Position::BottomRight);
        assert_eq!(Position::from("middle".to_string()), Position::Center);
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(OutputFormat::from("png".to_string()), OutputFormat::Png);
        assert_eq!(OutputFormat::from("JPEG".to_string()), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::from("webp".to_string()), OutputFormat::Jpeg);
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::from_value(json!({ "whatsapp": { "access_token": "file", "api_url": "x" } }));
        settings.apply_overrides_from(|name| match name {
            "WHATSAPP_TOKEN" => Some("env-token".to_string()),
            "WHATSAPP_PHONE_ID" => Some(String::new()),
            _ => None,
        });

        let whatsapp = settings.get("whatsapp").unwrap();
        assert_eq!(whatsapp["access_token"], "env-token");
        assert_eq!(whatsapp["api_url"], "x");
        assert!(whatsapp.get("phone_number_id").is_none());
    }

    #[test]
    fn test_source_config_from_root() {
        let settings = Settings::from_value(json!({ "use_static_category": true, "logo": {} }));
        let source: SourceConfig = settings.root();
        assert!(source.use_static_category);
        assert_eq!(source.default_category, DEFAULT_CATEGORY);
    }

    #[test]
    fn test_with_override_missing_file() {
        let result = Settings::new().with_override("/nonexistent/edition.json");
        assert!(matches!(result, Err(PortadaError::FileNotFound(_))));
    }
}
