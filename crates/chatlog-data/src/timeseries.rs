//! Message activity grouped into calendar periods.
//!
//! Periods are keyed by strings such as `"2021"`, `"2021-03"` or
//! `"2021-03-04"` computed in the caller's timezone, so keys sort
//! chronologically as plain strings.

use std::collections::BTreeMap;

use chatlog_core::error::Result;
use chatlog_core::index::Index;
use chatlog_core::models::Message;
use chatlog_core::text::char_length;
use chatlog_core::time_utils::{Granularity, TimezoneHandler};

// ── PeriodStats ───────────────────────────────────────────────────────────────

/// Activity within one period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodStats {
    pub period_key: String,
    pub messages: usize,
    /// Characters of message text; null contents count as zero.
    pub characters: usize,
}

impl PeriodStats {
    fn new(period_key: impl Into<String>) -> Self {
        Self {
            period_key: period_key.into(),
            messages: 0,
            characters: 0,
        }
    }

    fn add_message(&mut self, message: &Message) {
        self.messages += 1;
        self.characters += message.contents.as_deref().map_or(0, char_length);
    }
}

// ── ChannelSeries ─────────────────────────────────────────────────────────────

/// One channel's activity, periods in ascending order.
#[derive(Debug, Clone)]
pub struct ChannelSeries {
    pub channel_id: u64,
    pub label: String,
    pub periods: Vec<PeriodStats>,
}

impl ChannelSeries {
    /// Message count for `period_key`, `0` when the channel was silent.
    pub fn messages_in(&self, period_key: &str) -> usize {
        self.periods
            .iter()
            .find(|p| p.period_key == period_key)
            .map_or(0, |p| p.messages)
    }

    pub fn total_messages(&self) -> usize {
        self.periods.iter().map(|p| p.messages).sum()
    }
}

// ── TimelineAggregator ────────────────────────────────────────────────────────

/// Groups messages into calendar periods.
pub struct TimelineAggregator {
    granularity: Granularity,
    tz: TimezoneHandler,
}

impl TimelineAggregator {
    pub fn new(granularity: Granularity, tz: TimezoneHandler) -> Self {
        Self { granularity, tz }
    }

    /// All messages of the index bucketed together.
    ///
    /// Returns periods sorted by key (ascending); silent periods are absent.
    pub fn aggregate(&self, index: &Index) -> Vec<PeriodStats> {
        let mut map: BTreeMap<String, PeriodStats> = BTreeMap::new();
        for message in index.messages() {
            self.bucket(&mut map, message);
        }
        map.into_values().collect()
    }

    /// One series per channel that has messages, ordered by channel id.
    ///
    /// Each message is attributed through its `channel_id`, so a message
    /// whose channel is missing from the index fails with `NotFound`.
    pub fn by_channel(&self, index: &Index) -> Result<Vec<ChannelSeries>> {
        let mut grouped: BTreeMap<u64, (String, BTreeMap<String, PeriodStats>)> = BTreeMap::new();

        for message in index.message_range(None, None) {
            let channel = message.channel(index)?;
            let (_, periods) = grouped
                .entry(channel.id)
                .or_insert_with(|| (channel.display_name(), BTreeMap::new()));
            self.bucket(periods, message);
        }

        Ok(grouped
            .into_iter()
            .map(|(channel_id, (label, periods))| ChannelSeries {
                channel_id,
                label,
                periods: periods.into_values().collect(),
            })
            .collect())
    }

    /// Sorted union of every period key across `series`.
    pub fn period_keys(series: &[ChannelSeries]) -> Vec<String> {
        let mut keys: Vec<String> = series
            .iter()
            .flat_map(|s| s.periods.iter().map(|p| p.period_key.clone()))
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Sum every period into one total, keyed `"total"`.
    pub fn calculate_totals(periods: &[PeriodStats]) -> PeriodStats {
        let mut totals = PeriodStats::new("total");
        for period in periods {
            totals.messages += period.messages;
            totals.characters += period.characters;
        }
        totals
    }

    fn bucket(&self, map: &mut BTreeMap<String, PeriodStats>, message: &Message) {
        let key = self.tz.period_key(message.timestamp, self.granularity);
        map.entry(key.clone())
            .or_insert_with(|| PeriodStats::new(key))
            .add_message(message);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
