use clap::Parser;
use std::path::PathBuf;

use crate::error::{ArchiveError, Result};
use crate::time_utils::{self, Granularity, TimezoneHandler};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Statistics over a personal chat-export archive
#[derive(Parser, Debug, Clone)]
#[command(
    name = "chatlog",
    about = "Statistics over a personal chat-export archive",
    version
)]
pub struct Settings {
    /// Export archive (zip bundle or extracted directory)
    #[arg(default_value = "package.zip")]
    pub archive: PathBuf,

    /// Report to print
    #[arg(long, default_value = "summary", value_parser = ["summary", "dms", "channels", "words", "timeline", "all"])]
    pub view: String,

    /// Number of rows in ranked tables
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub top: u32,

    /// Column ranked tables are ordered by
    #[arg(long, default_value = "messages", value_parser = ["messages", "characters"])]
    pub sort: String,

    /// Bucket size for the timeline view
    #[arg(long, default_value = "year", value_parser = ["day", "month", "year"])]
    pub granularity: String,

    /// Timezone for timestamps and timeline buckets (auto-detected if not specified)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// Logging level
    #[arg(long, default_value = "WARNING", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments and resolve `"auto"` values.
    pub fn load() -> Self {
        Self::load_from_args(std::env::args_os().collect())
    }

    /// Same as [`Settings::load`] but with an explicit argument list.
    pub fn load_from_args(args: Vec<std::ffi::OsString>) -> Self {
        Self::resolve_auto_values(Settings::parse_from(args))
    }

    /// Resolve the `"auto"` timezone and apply the `--debug` flag.
    fn resolve_auto_values(mut settings: Settings) -> Settings {
        if settings.timezone == "auto" {
            settings.timezone = time_utils::get_system_timezone();
        }
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    pub fn granularity(&self) -> Result<Granularity> {
        self.granularity.parse()
    }

    /// Handler for the configured timezone; unknown names are a config error.
    pub fn timezone_handler(&self) -> Result<TimezoneHandler> {
        if !TimezoneHandler::validate_timezone(&self.timezone) {
            return Err(ArchiveError::Config(format!(
                "unknown timezone \"{}\"",
                self.timezone
            )));
        }
        Ok(TimezoneHandler::new(&self.timezone))
    }

    /// `true` when ranked tables should be ordered by character count.
    pub fn sort_by_characters(&self) -> bool {
        self.sort == "characters"
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(["chatlog"]);

        assert_eq!(settings.archive, PathBuf::from("package.zip"));
        assert_eq!(settings.view, "summary");
        assert_eq!(settings.top, 10);
        assert_eq!(settings.sort, "messages");
        assert_eq!(settings.granularity, "year");
        assert_eq!(settings.timezone, "auto");
        assert_eq!(settings.log_level, "WARNING");
        assert!(!settings.debug);
    }

    #[test]
    fn test_settings_cli_archive_and_view() {
        let settings = Settings::parse_from(["chatlog", "/tmp/export", "--view", "dms"]);
        assert_eq!(settings.archive, PathBuf::from("/tmp/export"));
        assert_eq!(settings.view, "dms");
    }

    #[test]
    fn test_settings_rejects_unknown_view() {
        let result = Settings::try_parse_from(["chatlog", "--view", "plot"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_top_range() {
        assert!(Settings::try_parse_from(["chatlog", "--top", "0"]).is_err());
        let settings = Settings::parse_from(["chatlog", "--top", "25"]);
        assert_eq!(settings.top, 25);
    }

    #[test]
    fn test_load_resolves_auto_timezone() {
        let settings = Settings::load_from_args(vec!["chatlog".into()]);
        assert_ne!(settings.timezone, "auto");
        assert!(!settings.timezone.is_empty());
    }

    #[test]
    fn test_load_keeps_explicit_timezone() {
        let settings = Settings::load_from_args(vec![
            "chatlog".into(),
            "--timezone".into(),
            "Europe/Berlin".into(),
        ]);
        assert_eq!(settings.timezone, "Europe/Berlin");
        assert!(settings.timezone_handler().is_ok());
    }

    #[test]
    fn test_invalid_timezone_is_config_error() {
        let settings = Settings::load_from_args(vec![
            "chatlog".into(),
            "--timezone".into(),
            "Mars/Olympus".into(),
        ]);
        assert!(matches!(
            settings.timezone_handler(),
            Err(ArchiveError::Config(_))
        ));
    }

    #[test]
    fn test_debug_overrides_log_level() {
        let settings = Settings::load_from_args(vec!["chatlog".into(), "--debug".into()]);
        assert_eq!(settings.log_level, "DEBUG");
    }

    #[test]
    fn test_granularity_and_sort_accessors() {
        let settings = Settings::parse_from([
            "chatlog",
            "--granularity",
            "month",
            "--sort",
            "characters",
        ]);
        assert_eq!(settings.granularity().unwrap(), Granularity::Month);
        assert!(settings.sort_by_characters());
    }
}
