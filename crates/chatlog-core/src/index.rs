//! The in-memory aggregation root over servers, channels and messages.
//!
//! Every aggregate is recomputed from the channel/message graph on each call;
//! nothing is cached. Maps are ordered by id so every traversal, and
//! therefore every tie in [`Index::message_range`], is deterministic.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{ArchiveError, EntityKind, Result};
use crate::models::{Channel, Message, Server};
use crate::text::WordFrequency;

// ── ChannelStats ──────────────────────────────────────────────────────────────

/// Per-channel message and character totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    pub channel_id: u64,
    /// Channel name, or its id when unnamed.
    pub label: String,
    pub is_direct_message: bool,
    pub message_count: usize,
    pub character_count: usize,
}

impl ChannelStats {
    /// Average characters per message; `0.0` for empty channels.
    pub fn characters_per_message(&self) -> f64 {
        self.character_count as f64 / self.message_count.max(1) as f64
    }
}

// ── Index ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Index {
    servers: BTreeMap<u64, Server>,
    channels: BTreeMap<u64, Channel>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Registration ──────────────────────────────────────────────────────────

    /// Register servers from `(id, name)` pairs.
    ///
    /// Fails with `KeyConflict` if any id is already registered or repeats
    /// within `entries`; in that case nothing is inserted.
    pub fn load_servers<I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (u64, String)>,
    {
        let staged = stage(&self.servers, entries, EntityKind::Server, |id, name: String| {
            Server::new(id, name)
        })?;
        self.servers.extend(staged);
        Ok(())
    }

    /// Register channels from `(id, name)` pairs, with the same conflict
    /// policy as [`Index::load_servers`].
    pub fn load_channels<I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (u64, Option<String>)>,
    {
        let staged = stage(&self.channels, entries, EntityKind::Channel, Channel::new)?;
        self.channels.extend(staged);
        Ok(())
    }

    // ── Lookups ───────────────────────────────────────────────────────────────

    pub fn server(&self, id: u64) -> Result<&Server> {
        self.servers.get(&id).ok_or(ArchiveError::NotFound {
            entity: EntityKind::Server,
            id,
        })
    }

    pub fn channel(&self, id: u64) -> Result<&Channel> {
        self.channels.get(&id).ok_or(ArchiveError::NotFound {
            entity: EntityKind::Channel,
            id,
        })
    }

    /// Mutable access for the load phase.
    pub fn channel_mut(&mut self, id: u64) -> Result<&mut Channel> {
        self.channels.get_mut(&id).ok_or(ArchiveError::NotFound {
            entity: EntityKind::Channel,
            id,
        })
    }

    /// Servers in ascending id order.
    pub fn servers(&self) -> impl Iterator<Item = &Server> {
        self.servers.values()
    }

    /// Channels in ascending id order.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    // ── Message access ────────────────────────────────────────────────────────

    /// Every message, channels in id order, each channel in row order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.channels.values().flat_map(|c| c.messages().iter())
    }

    /// All messages sorted by timestamp, then sliced.
    ///
    /// `start` is resolved like a sequence index: `None` is the beginning,
    /// negative values count back from the end, and out-of-range values are
    /// clamped. Up to `limit` messages are returned from there (`None` means
    /// to the end). The sort is stable, so messages with equal timestamps
    /// keep channel-id then row order.
    pub fn message_range(&self, limit: Option<usize>, start: Option<isize>) -> Vec<&Message> {
        let mut sorted: Vec<&Message> = self.messages().collect();
        sorted.sort_by_key(|m| m.timestamp);

        let len = sorted.len();
        let begin = resolve_start(start.unwrap_or(0), len);
        let end = match limit {
            Some(n) => begin.saturating_add(n).min(len),
            None => len,
        };
        sorted.truncate(end);
        sorted.drain(..begin);
        sorted
    }

    /// The earliest message, if any.
    pub fn first_message(&self) -> Option<&Message> {
        self.message_range(Some(1), None).into_iter().next()
    }

    /// The latest message, if any.
    pub fn last_message(&self) -> Option<&Message> {
        self.message_range(Some(1), Some(-1)).into_iter().next()
    }

    // ── Aggregates ────────────────────────────────────────────────────────────

    pub fn total_messages(&self) -> usize {
        self.channels.values().map(Channel::message_count).sum()
    }

    /// Characters across every message; null contents count as zero.
    pub fn total_characters(&self) -> usize {
        self.channels.values().map(Channel::character_count).sum()
    }

    /// One row per channel, in id order. Callers sort as needed.
    pub fn channel_stats(&self) -> Vec<ChannelStats> {
        self.channels
            .values()
            .map(|c| ChannelStats {
                channel_id: c.id,
                label: c.display_name(),
                is_direct_message: c.is_direct_message(),
                message_count: c.message_count(),
                character_count: c.character_count(),
            })
            .collect()
    }

    pub fn clean_words(&self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for channel in self.channels.values() {
            out.extend(channel.clean_words()?);
        }
        Ok(out)
    }

    pub fn words(&self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for channel in self.channels.values() {
            out.extend(channel.words()?);
        }
        Ok(out)
    }

    pub fn length(&self) -> Result<usize> {
        self.channels.values().map(Channel::length).sum()
    }

    pub fn word_count(&self) -> Result<usize> {
        self.channels.values().map(Channel::word_count).sum()
    }

    /// Clean-word occurrences over messages that have text, most frequent
    /// first. Empty tokens are not counted.
    pub fn word_frequency(&self) -> Vec<(String, usize)> {
        let mut freq = WordFrequency::new();
        for contents in self.messages().filter_map(|m| m.contents.as_deref()) {
            freq.add_text(contents);
        }
        freq.into_sorted()
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Build the records for `entries`, rejecting ids already present in
/// `existing` or repeated within the batch.
fn stage<T, N, I, F>(
    existing: &BTreeMap<u64, T>,
    entries: I,
    entity: EntityKind,
    build: F,
) -> Result<BTreeMap<u64, T>>
where
    I: IntoIterator<Item = (u64, N)>,
    F: Fn(u64, N) -> T,
{
    let mut staged = BTreeMap::new();
    for (id, name) in entries {
        if existing.contains_key(&id) {
            return Err(ArchiveError::KeyConflict { entity, id });
        }
        match staged.entry(id) {
            Entry::Occupied(_) => return Err(ArchiveError::KeyConflict { entity, id }),
            Entry::Vacant(slot) => {
                slot.insert(build(id, name));
            }
        }
    }
    Ok(staged)
}

/// Resolve a possibly negative start offset against `len`, clamped.
fn resolve_start(start: isize, len: usize) -> usize {
    if start >= 0 {
        (start as usize).min(len)
    } else {
        len.saturating_sub(start.unsigned_abs())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
