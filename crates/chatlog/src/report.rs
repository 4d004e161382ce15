//! Plain-text reports printed to stdout.
//!
//! Every renderer returns a `String` so views can be composed and tested
//! without capturing stdout.

use chatlog_core::error::{ArchiveError, Result};
use chatlog_core::formatting::{
    format_count, format_number, pad_display, percentage, truncate_display,
};
use chatlog_core::index::{ChannelStats, Index};
use chatlog_core::models::{Message, DM_NAME_PREFIX};
use chatlog_core::time_utils::{Granularity, TimezoneHandler};
use chatlog_data::timeseries::{ChannelSeries, TimelineAggregator};

const LABEL_WIDTH: usize = 28;
const CONTENTS_WIDTH: usize = 60;

/// Options shared by every view.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub top: usize,
    pub by_characters: bool,
    pub granularity: Granularity,
    pub tz: TimezoneHandler,
}

/// Render the view named `view`; `"all"` joins every view.
pub fn render_view(view: &str, index: &Index, opts: &ReportOptions) -> Result<String> {
    match view {
        "summary" => render_summary(index, &opts.tz),
        "dms" => Ok(render_ranked(&index.channel_stats(), true, opts)),
        "channels" => Ok(render_ranked(&index.channel_stats(), false, opts)),
        "words" => Ok(render_words(&index.word_frequency(), opts.top)),
        "timeline" => {
            let aggregator = TimelineAggregator::new(opts.granularity, opts.tz);
            let series = aggregator.by_channel(index)?;
            Ok(render_timeline(&series, opts.top))
        }
        "all" => {
            let mut sections = Vec::new();
            for name in ["summary", "dms", "channels", "words", "timeline"] {
                sections.push(render_view(name, index, opts)?);
            }
            Ok(sections.join("\n"))
        }
        other => Err(ArchiveError::Config(format!("unknown view \"{}\"", other))),
    }
}

// ── Summary ───────────────────────────────────────────────────────────────────

pub fn render_summary(index: &Index, tz: &TimezoneHandler) -> Result<String> {
    let total = index.total_messages();
    let dm_messages: usize = index
        .channel_stats()
        .iter()
        .filter(|s| s.is_direct_message)
        .map(|s| s.message_count)
        .sum();

    let mut out = String::from("Archive summary\n");
    push_field(&mut out, "Servers", &format_count(index.server_count()));
    push_field(&mut out, "Channels", &format_count(index.channel_count()));
    push_field(&mut out, "Messages", &format_count(total));
    push_field(&mut out, "Characters", &format_count(index.total_characters()));
    push_field(
        &mut out,
        "In DMs",
        &format!(
            "{}%",
            format_number(percentage(dm_messages as f64, total as f64, 1), 1)
        ),
    );

    match (index.first_message(), index.last_message()) {
        (Some(first), Some(last)) => {
            push_field(&mut out, "First message", &message_line(first, index, tz)?);
            push_field(&mut out, "Last message", &message_line(last, index, tz)?);
        }
        _ => push_field(&mut out, "First message", "none loaded"),
    }
    Ok(out)
}

fn push_field(out: &mut String, name: &str, value: &str) {
    out.push_str(&format!("  {} {}\n", pad_display(name, 14), value));
}

/// `timestamp  [channel]  contents`, the timestamp in local time.
fn message_line(message: &Message, index: &Index, tz: &TimezoneHandler) -> Result<String> {
    let channel = message.channel(index)?;
    let contents = match message.contents.as_deref() {
        Some(text) if !text.is_empty() => {
            truncate_display(&text.replace('\n', " "), CONTENTS_WIDTH)
        }
        _ => "(no text)".to_string(),
    };
    Ok(format!(
        "{}  [{}]  {}",
        tz.format_display(message.timestamp),
        channel_label(&channel.display_name()),
        contents
    ))
}

// ── Ranked tables ─────────────────────────────────────────────────────────────

/// DMs (`direct == true`) or other channels, largest first.
///
/// Each row reads `rank. label - characters / messages = ratio`. Ties keep
/// channel-id order.
pub fn render_ranked(stats: &[ChannelStats], direct: bool, opts: &ReportOptions) -> String {
    let mut rows: Vec<&ChannelStats> = stats
        .iter()
        .filter(|s| s.is_direct_message == direct)
        .collect();
    if opts.by_characters {
        rows.sort_by(|a, b| b.character_count.cmp(&a.character_count));
    } else {
        rows.sort_by(|a, b| b.message_count.cmp(&a.message_count));
    }
    rows.truncate(opts.top);

    let title = if direct { "Direct messages" } else { "Channels" };
    let mut out = format!("{} (top {})\n", title, opts.top);
    if rows.is_empty() {
        out.push_str("  none\n");
        return out;
    }

    for (rank, row) in rows.iter().enumerate() {
        out.push_str(&format!(
            "{:>4}. {} - {} / {} = {}\n",
            rank + 1,
            pad_display(channel_label(&row.label), LABEL_WIDTH),
            format_count(row.character_count),
            format_count(row.message_count),
            format_number(row.characters_per_message(), 2)
        ));
    }
    out
}

/// Drop the exporter's DM prefix so only the other party remains.
fn channel_label(label: &str) -> &str {
    label.strip_prefix(DM_NAME_PREFIX).unwrap_or(label)
}

// ── Words ─────────────────────────────────────────────────────────────────────

pub fn render_words(frequency: &[(String, usize)], top: usize) -> String {
    let mut out = format!("Top words (top {})\n", top);
    if frequency.is_empty() {
        out.push_str("  none\n");
        return out;
    }
    for (rank, (word, count)) in frequency.iter().take(top).enumerate() {
        out.push_str(&format!(
            "{:>4}. {} {:>10}\n",
            rank + 1,
            pad_display(word, 20),
            format_count(*count)
        ));
    }
    out
}

// ── Timeline ──────────────────────────────────────────────────────────────────

/// Messages per period for the `top` busiest channels, plus a totals row
/// over every channel.
pub fn render_timeline(series: &[ChannelSeries], top: usize) -> String {
    let keys = TimelineAggregator::period_keys(series);
    if keys.is_empty() {
        return "Timeline\n  none\n".to_string();
    }

    let col = keys.iter().map(|k| k.len()).max().unwrap_or(0).max(8);
    let mut busiest: Vec<&ChannelSeries> = series.iter().collect();
    busiest.sort_by(|a, b| b.total_messages().cmp(&a.total_messages()));
    busiest.truncate(top);

    let mut out = String::from("Timeline\n");
    out.push_str(&format!("  {}", pad_display("Channel", LABEL_WIDTH)));
    for key in &keys {
        out.push_str(&format!(" {:>col$}", key, col = col));
    }
    out.push('\n');

    for s in &busiest {
        out.push_str(&format!("  {}", pad_display(channel_label(&s.label), LABEL_WIDTH)));
        for key in &keys {
            out.push_str(&format!(" {:>col$}", format_count(s.messages_in(key)), col = col));
        }
        out.push('\n');
    }

    out.push_str(&format!("  {}", pad_display("TOTAL", LABEL_WIDTH)));
    for key in &keys {
        let sum: usize = series.iter().map(|s| s.messages_in(key)).sum();
        out.push_str(&format!(" {:>col$}", format_count(sum), col = col));
    }
    out.push('\n');
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
