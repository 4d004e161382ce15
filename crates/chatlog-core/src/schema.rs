//! Typed records for each file kind found in a chat export.
//!
//! Export files carry ids either as JSON strings (`"42"`) or as bare numbers
//! depending on the export generation, so every id field goes through
//! [`IdValue`] and is validated when converted.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::error::{ArchiveError, Result};

// ── IdValue ───────────────────────────────────────────────────────────────────

/// An id as it appears in an export file: a number or a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Int(u64),
    Text(String),
}

impl IdValue {
    /// Convert to the numeric id, failing with `MalformedInput` when the
    /// text form is not a decimal integer.
    pub fn to_u64(&self) -> Result<u64> {
        match self {
            IdValue::Int(n) => Ok(*n),
            IdValue::Text(s) => parse_id(s),
        }
    }

    /// `true` for `0` and `""`, the values the export uses for "unset".
    pub fn is_blank(&self) -> bool {
        match self {
            IdValue::Int(n) => *n == 0,
            IdValue::Text(s) => s.trim().is_empty(),
        }
    }
}

/// Parse a decimal id string.
pub fn parse_id(raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ArchiveError::MalformedInput(format!("invalid id \"{}\"", raw)))
}

/// Parse a channel directory name of the form `c<digits>`.
///
/// The bare `<digits>` form is accepted as well.
pub fn parse_channel_dir(name: &str) -> Result<u64> {
    let digits = name.strip_prefix('c').unwrap_or(name);
    parse_id(digits).map_err(|_| {
        ArchiveError::MalformedInput(format!("invalid channel directory name \"{}\"", name))
    })
}

// ── Index files ───────────────────────────────────────────────────────────────

/// `servers/index.json`: server id → server name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ServerIndexFile(pub BTreeMap<String, String>);

impl ServerIndexFile {
    /// Validate every key and return `(id, name)` pairs.
    pub fn entries(&self) -> Result<Vec<(u64, String)>> {
        self.0
            .iter()
            .map(|(k, v)| Ok((parse_id(k)?, v.clone())))
            .collect()
    }
}

/// `messages/index.json`: channel id → channel name (null for unnamed DMs).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ChannelIndexFile(pub BTreeMap<String, Option<String>>);

impl ChannelIndexFile {
    /// Validate every key and return `(id, name)` pairs.
    pub fn entries(&self) -> Result<Vec<(u64, Option<String>)>> {
        self.0
            .iter()
            .map(|(k, v)| Ok((parse_id(k)?, v.clone())))
            .collect()
    }
}

// ── channel.json ──────────────────────────────────────────────────────────────

/// Reference to the owning guild inside `channel.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuildRef {
    #[serde(default)]
    pub id: Option<IdValue>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Per-channel metadata stored in `messages/c<id>/channel.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMetadata {
    #[serde(default)]
    pub id: Option<IdValue>,
    #[serde(rename = "type")]
    pub channel_type: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub guild: Option<GuildRef>,
    #[serde(default)]
    pub recipients: Option<Vec<IdValue>>,
}

impl ChannelMetadata {
    /// Guild id for this channel, `0` when the channel has no guild.
    pub fn guild_id(&self) -> Result<u64> {
        match self.guild.as_ref().and_then(|g| g.id.as_ref()) {
            Some(id) if !id.is_blank() => id.to_u64(),
            _ => Ok(0),
        }
    }

    /// Recipient ids in file order, `None` when the key is absent.
    pub fn recipient_ids(&self) -> Result<Option<Vec<u64>>> {
        self.recipients
            .as_ref()
            .map(|ids| ids.iter().map(IdValue::to_u64).collect())
            .transpose()
    }
}

// ── messages.csv / messages.json ──────────────────────────────────────────────

/// One row of a channel's message log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRow {
    #[serde(rename = "ID")]
    pub id: IdValue,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Contents", deserialize_with = "required_nullable")]
    pub contents: Option<String>,
    #[serde(rename = "Attachments", deserialize_with = "required_nullable")]
    pub attachments: Option<String>,
}

/// The column must be present; its value may be null.
fn required_nullable<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)
}

impl MessageRow {
    /// Attachment references, split on whitespace. Empty → `None`.
    pub fn attachment_list(&self) -> Option<Vec<String>> {
        let raw = self.attachments.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        Some(raw.split_whitespace().map(str::to_string).collect())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
