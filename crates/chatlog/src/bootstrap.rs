use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Initialise the global `tracing` subscriber.
///
/// `log_level` is mapped to a [`tracing_subscriber::EnvFilter`] directive.
/// Falls back to `"warn"` if the level string is not recognised. Output goes
/// to stderr so reports on stdout stay clean.
pub fn setup_logging(log_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(level_directive(log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let subscriber = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .init();

    Ok(())
}

/// Map conventional level names onto tracing's lowercase directives.
fn level_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_lowercase(),
    }
}

// ── Archive discovery ──────────────────────────────────────────────────────────

/// Locate the export archive the user asked for.
///
/// Checks the following paths in order and returns the first that exists:
/// 1. `requested` as given (relative to the current directory)
/// 2. the platform download directory joined with `requested`
/// 3. `~/Downloads/` joined with `requested`
///
/// Absolute paths are only checked as given. Returns `None` when nothing
/// matches.
pub fn discover_archive_path(requested: &Path) -> Option<PathBuf> {
    if requested.exists() {
        return Some(requested.to_path_buf());
    }
    if requested.is_absolute() {
        return None;
    }

    let mut candidates = Vec::new();
    if let Some(downloads) = dirs::download_dir() {
        candidates.push(downloads.join(requested));
    }
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join("Downloads").join(requested));
    }
    candidates.into_iter().find(|p| p.exists())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
