use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, bail};
use clap::{ArgGroup, Parser};
use owo_colors::OwoColorize;
use portada_core::universal::ORIGINAL_VIDEO_NAME;
use portada_core::{
    FetchConfig, MediaKind, Settings, classify, generate_all_from_link, load_editions, process_media_with_editions,
};
use tracing_subscriber::EnvFilter;

mod echo;

use echo::{Reporter, format_size, warning};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Render branded graphics from a news link, an image or a video
#[derive(Parser, Debug)]
#[command(name = "portada")]
#[command(author = "Portada Contributors")]
#[command(version)]
#[command(about = "Render branded graphics from news links, images and videos", long_about = None)]
#[command(group(ArgGroup::new("input").required(true).args(["link", "image", "video"])))]
struct Args {
    /// News article URL; renders one graphic per edition
    #[arg(long, value_name = "URL")]
    link: Option<String>,

    /// Image file to process with the caption
    #[arg(long, value_name = "FILE")]
    image: Option<PathBuf>,

    /// Video file to process with the caption
    #[arg(long, value_name = "FILE")]
    video: Option<PathBuf>,

    /// Caption selecting the effect (logo, watermark, big <text>, recorte, blur, or free text)
    #[arg(short, long, value_name = "TEXT")]
    caption: Option<String>,

    /// Only render link editions whose mode matches (e.g. recorte, blur)
    #[arg(short, long, value_name = "MODE")]
    effect: Option<String>,

    /// Output file; link editions are written as <stem>-<variant><ext>
    #[arg(short, long, default_value = "output.jpg", value_name = "FILE")]
    output: PathBuf,

    /// Directory holding edition JSON files
    #[arg(long, default_value = "configs/articulo7/editions", value_name = "DIR")]
    editions_dir: PathBuf,

    /// Defaults configuration file
    #[arg(long, default_value = "configs/defaults.json", value_name = "FILE")]
    defaults: PathBuf,

    /// Settings file merged over the defaults
    #[arg(long, default_value = "configs/settings.json", value_name = "FILE")]
    settings: PathBuf,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "warn", value_name = "FILTER")]
    log: String,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "15", value_name = "SECS")]
    timeout: u64,

    /// Skip TLS certificate verification when fetching links
    #[arg(long)]
    insecure: bool,

    /// Print progress and timings
    #[arg(short, long)]
    verbose: bool,
}

/// Path for one link edition: `<stem>-<variant><ext>` next to `output`.
fn edition_path(output: &Path, variant: &str, default_ext: &str) -> PathBuf {
    let stem = output.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "output".into());
    let ext = output
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| default_ext.to_string());
    output.with_file_name(format!("{}-{}.{}", stem, variant, ext))
}

/// Path for a processed image or video; videos always end in `.mp4`.
fn media_path(output: &Path, kind: MediaKind) -> PathBuf {
    match kind {
        MediaKind::Video => output.with_extension("mp4"),
        MediaKind::Image => output.to_path_buf(),
    }
}

fn write_output(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("Failed to write to file: {}", path.display()))
}

async fn run_link(url: &str, args: &Args, settings: &Settings, report: &mut Reporter) -> anyhow::Result<Vec<PathBuf>> {
    report.step(1, format!("Rendering editions for {}", url.underline()));
    report.detail("editions", args.editions_dir.display());

    let fetch = FetchConfig { timeout: args.timeout, accept_invalid_certs: args.insecure, ..Default::default() };

    let started = Instant::now();
    let renditions = generate_all_from_link(url, settings, &args.editions_dir, args.effect.as_deref(), &fetch)
        .await
        .context("Failed to generate editions from link")?;
    report.record("render", started);

    if renditions.is_empty() {
        bail!("No edition could be rendered for {}", url);
    }

    report.step(2, format!("Writing {} edition(s)", renditions.len()));
    let mut written = Vec::with_capacity(renditions.len());
    for rendition in renditions {
        let path = edition_path(&args.output, &rendition.variant, rendition.format.extension());
        write_output(&path, &rendition.bytes)?;
        report.written(&path, rendition.bytes.len());
        written.push(path);
    }
    Ok(written)
}

fn run_media(input: &Path, args: &Args, settings: &Settings, report: &mut Reporter) -> anyhow::Result<Vec<PathBuf>> {
    report.step(1, format!("Processing {}", input.display()));

    let bytes = fs::read(input).with_context(|| format!("Failed to read file: {}", input.display()))?;
    report.detail("size", format_size(bytes.len()));
    report.detail("effect", classify(args.caption.as_deref()));

    let editions = load_editions(settings, &args.editions_dir);

    let started = Instant::now();
    let rendered = process_media_with_editions(&bytes, args.caption.as_deref(), settings, &editions)
        .with_context(|| format!("Failed to process {}", input.display()))?;
    report.record("process", started);

    if rendered.filename == ORIGINAL_VIDEO_NAME {
        warning("Video overlay failed; writing the original video");
    }

    let path = media_path(&args.output, rendered.kind);
    report.step(2, "Writing output");
    write_output(&path, &rendered.bytes)?;
    report.written(&path, rendered.bytes.len());
    Ok(vec![path])
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut report = Reporter::new(args.verbose, 2);
    report.banner(&args.defaults, &args.settings);

    let settings = Settings::load(&args.defaults, &args.settings);

    let written = if let Some(url) = args.link.as_deref() {
        run_link(url, &args, &settings, &mut report).await?
    } else if let Some(path) = args.image.as_deref().or(args.video.as_deref()) {
        run_media(path, &args, &settings, &mut report)?
    } else {
        bail!("Provide one of --link, --image or --video");
    };

    for path in &written {
        println!("{}", path.display());
    }
    report.finish(written.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edition_path_keeps_extension() {
        assert_eq!(
            edition_path(Path::new("out/portada.png"), "blur", "jpg"),
            PathBuf::from("out/portada-blur.png")
        );
    }

    #[test]
    fn test_edition_path_falls_back_to_format() {
        assert_eq!(edition_path(Path::new("portada"), "recorte", "jpg"), PathBuf::from("portada-recorte.jpg"));
    }

    #[test]
    fn test_media_path_for_video() {
        assert_eq!(media_path(Path::new("clip.jpg"), MediaKind::Video), PathBuf::from("clip.mp4"));
        assert_eq!(media_path(Path::new("foto.png"), MediaKind::Image), PathBuf::from("foto.png"));
    }

    #[test]
    fn test_args_require_input() {
        assert!(Args::try_parse_from(["portada", "--caption", "logo"]).is_err());
        assert!(Args::try_parse_from(["portada", "--image", "a.png", "--video", "b.mp4"]).is_err());
        let args = Args::try_parse_from(["portada", "--image", "a.png"]).unwrap();
        assert_eq!(args.output, PathBuf::from("output.jpg"));
        assert_eq!(args.timeout, 15);
    }

    #[test]
    fn test_effect_accepts_any_edition_mode() {
        let args = Args::try_parse_from(["portada", "--link", "https://example.com", "-e", "estirado"]).unwrap();
        assert_eq!(args.effect.as_deref(), Some("estirado"));
    }
}
