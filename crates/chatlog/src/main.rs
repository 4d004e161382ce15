mod bootstrap;
mod report;

use anyhow::{Context, Result};
use chatlog_core::settings::Settings;
use chatlog_data::loader::load_package;

use crate::report::ReportOptions;

fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("chatlog v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "View: {}, Sort: {}, Granularity: {}, Timezone: {}",
        settings.view,
        settings.sort,
        settings.granularity,
        settings.timezone
    );

    let archive = bootstrap::discover_archive_path(&settings.archive).with_context(|| {
        format!(
            "export archive {} not found (also checked ~/Downloads)",
            settings.archive.display()
        )
    })?;

    let opts = ReportOptions {
        top: settings.top as usize,
        by_characters: settings.sort_by_characters(),
        granularity: settings.granularity()?,
        tz: settings.timezone_handler()?,
    };

    tracing::info!("Reading {}", archive.display());
    let index = load_package(&archive)
        .with_context(|| format!("failed to load {}", archive.display()))?;

    let output = report::render_view(&settings.view, &index, &opts)?;
    print!("{}", output);

    Ok(())
}
