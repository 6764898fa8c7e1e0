//! Process startup helpers.

use std::path::Path;

use portada_core::Settings;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Loads the layered settings with `WHATSAPP_*` overrides, reporting broken
/// layers on stderr.
///
/// The real subscriber depends on these settings, so loading runs under a
/// temporary warn-level one.
pub fn load_settings(defaults: &Path, overrides: &Path) -> Settings {
    load_settings_with(defaults, overrides, std::io::stderr)
}

/// [`load_settings`] writing its warnings to `writer`.
pub fn load_settings_with<W>(defaults: &Path, overrides: &Path, writer: W) -> Settings
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn"))
        .with_target(false)
        .with_writer(writer)
        .finish();

    tracing::subscriber::with_default(bootstrap, || {
        Settings::builder().layer(defaults).layer(overrides).env_overrides(true).build()
    })
}
