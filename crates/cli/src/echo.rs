use std::path::Path;
use std::time::{Duration, Instant};

use owo_colors::OwoColorize;

use crate::VERSION;

/// Progress output on stderr; everything but warnings and the final line is
/// shown only in verbose mode.
pub struct Reporter {
    verbose: bool,
    steps: usize,
    started: Instant,
    timings: Vec<(&'static str, Duration)>,
}

impl Reporter {
    pub fn new(verbose: bool, steps: usize) -> Self {
        Self { verbose, steps, started: Instant::now(), timings: Vec::new() }
    }

    pub fn banner(&self, defaults: &Path, settings: &Path) {
        if !self.verbose {
            return;
        }
        eprintln!("\n{} {}", "Portada".bold().bright_blue(), format!("v{VERSION}").dimmed());
        eprintln!("{}", "Graphics for images, videos and news links".dimmed());
        eprintln!(
            "{} {} {} {}\n",
            "ℹ".blue(),
            "Configuration:".bright_blue(),
            defaults.display().bright_white(),
            format!("+ {}", settings.display()).bright_white()
        );
    }

    pub fn step(&self, n: usize, message: impl std::fmt::Display) {
        if self.verbose {
            eprintln!("{} {}", format!("({n}/{})", self.steps).dimmed(), message.bright_cyan());
        }
    }

    pub fn detail(&self, label: &str, value: impl std::fmt::Display) {
        if self.verbose {
            eprintln!("    {:<9} {}", label.dimmed(), value.bright_white());
        }
    }

    pub fn written(&self, path: &Path, bytes: usize) {
        if self.verbose {
            eprintln!("    {} {} {}", "→".dimmed(), path.display().bright_white(), format_size(bytes).dimmed());
        }
    }

    /// Records how long the phase that began at `since` took.
    pub fn record(&mut self, label: &'static str, since: Instant) {
        self.timings.push((label, since.elapsed()));
    }

    /// Prints the timing table (verbose) and the closing success line.
    pub fn finish(&self, files: usize) {
        if self.verbose {
            eprintln!("\n{}", "─".repeat(40).dimmed());
            for (label, duration) in &self.timings {
                eprintln!("    {:<9} {}", label.dimmed(), format_duration(*duration));
            }
            eprintln!("    {:<9} {}", "total".bold(), format_duration(self.started.elapsed()));
            eprintln!("{}", "─".repeat(40).dimmed());
        }
        eprintln!("{} {}", "✓".green(), format!("{files} file(s) written").bright_green());
    }
}

pub fn warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Milliseconds, colored by how slow the phase was.
fn format_duration(duration: Duration) -> String {
    let ms = duration.as_secs_f64() * 1000.0;
    let text = format!("{ms:>9.1} ms");
    match ms {
        ms if ms < 500.0 => text.dimmed().to_string(),
        ms if ms < 3000.0 => text.bright_yellow().to_string(),
        _ => text.bright_red().to_string(),
    }
}

/// Human-readable byte count.
pub fn format_size(bytes: usize) -> String {
    match bytes {
        b if b >= 1 << 20 => format!("{:.1} MB", b as f64 / (1 << 20) as f64),
        b if b >= 1 << 10 => format!("{:.1} KB", b as f64 / (1 << 10) as f64),
        b => format!("{b} B"),
    }
}
