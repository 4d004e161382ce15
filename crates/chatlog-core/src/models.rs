use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{ArchiveError, Result};
use crate::index::Index;
use crate::schema::{ChannelMetadata, MessageRow};
use crate::text;
use crate::time_utils::parse_export_timestamp;

/// Prefix the exporter puts in front of DM channel names.
pub const DM_NAME_PREFIX: &str = "Direct Message with ";

// ── Server ────────────────────────────────────────────────────────────────────

/// A guild ("server") listed in `servers/index.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Server {
    pub id: u64,
    pub name: String,
}

impl Server {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

// ── ChannelKind ───────────────────────────────────────────────────────────────

/// Typed view over the numeric channel `type` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChannelKind {
    GuildText,
    DirectMessage,
    GuildVoice,
    GroupDirectMessage,
    GuildCategory,
    GuildNews,
    Thread,
    GuildStageVoice,
    GuildForum,
    Unknown(i64),
}

impl ChannelKind {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => ChannelKind::GuildText,
            1 => ChannelKind::DirectMessage,
            2 => ChannelKind::GuildVoice,
            3 => ChannelKind::GroupDirectMessage,
            4 => ChannelKind::GuildCategory,
            5 => ChannelKind::GuildNews,
            10..=12 => ChannelKind::Thread,
            13 => ChannelKind::GuildStageVoice,
            15 => ChannelKind::GuildForum,
            other => ChannelKind::Unknown(other),
        }
    }

    /// One-to-one or group DM.
    pub fn is_direct(self) -> bool {
        matches!(
            self,
            ChannelKind::DirectMessage | ChannelKind::GroupDirectMessage
        )
    }
}

// ── Channel ───────────────────────────────────────────────────────────────────

/// A message stream: a guild channel or a direct-message thread.
///
/// Created by [`Index::load_channels`] with only an id and a name, then
/// enriched once by [`Channel::update_channel`] and once by
/// [`Channel::load_messages`].
#[derive(Debug, Clone, Serialize)]
pub struct Channel {
    pub id: u64,
    /// Name from `messages/index.json`; unnamed DMs carry `None`.
    pub name: Option<String>,
    /// Raw channel type code; `None` until metadata has been applied.
    pub channel_type: Option<i64>,
    /// Owning guild id, `Some(0)` for "no guild", `None` until updated.
    pub guild_id: Option<u64>,
    pub recipients: Option<Vec<u64>>,
    messages: Vec<Message>,
    #[serde(skip)]
    messages_loaded: bool,
}

impl Channel {
    pub fn new(id: u64, name: Option<String>) -> Self {
        Self {
            id,
            name,
            channel_type: None,
            guild_id: None,
            recipients: None,
            messages: Vec::new(),
            messages_loaded: false,
        }
    }

    /// Apply the per-channel `channel.json` metadata.
    pub fn update_channel(&mut self, metadata: &ChannelMetadata) -> Result<()> {
        let guild_id = metadata.guild_id()?;
        let recipients = metadata.recipient_ids()?;
        self.channel_type = Some(metadata.channel_type);
        self.guild_id = Some(guild_id);
        self.recipients = recipients;
        Ok(())
    }

    /// Attach the channel's message log, keeping row order.
    ///
    /// Every row is validated before anything is attached, and the log can
    /// only be attached once.
    pub fn load_messages(&mut self, rows: Vec<MessageRow>) -> Result<()> {
        if self.messages_loaded {
            return Err(ArchiveError::InvalidState(format!(
                "messages for channel {} are already loaded",
                self.id
            )));
        }
        let messages = rows
            .into_iter()
            .map(|row| Message::from_row(self.id, row))
            .collect::<Result<Vec<_>>>()?;
        self.messages = messages;
        self.messages_loaded = true;
        Ok(())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Whether [`Channel::load_messages`] has run.
    pub fn messages_loaded(&self) -> bool {
        self.messages_loaded
    }

    /// Resolve the owning guild. `Ok(None)` for channels without one.
    pub fn guild<'a>(&self, index: &'a Index) -> Result<Option<&'a Server>> {
        match self.guild_id {
            None | Some(0) => Ok(None),
            Some(id) => index.server(id).map(Some),
        }
    }

    pub fn kind(&self) -> Option<ChannelKind> {
        self.channel_type.map(ChannelKind::from_code)
    }

    /// DM or group DM, judged by type code or, before metadata is applied,
    /// by the exporter's naming convention.
    pub fn is_direct_message(&self) -> bool {
        match self.kind() {
            Some(kind) => kind.is_direct(),
            None => self
                .name
                .as_deref()
                .is_some_and(|n| n.starts_with(DM_NAME_PREFIX)),
        }
    }

    /// Name, or the id when the name is missing or empty.
    pub fn display_name(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.id.to_string(),
        }
    }

    /// Message count.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Characters across all messages, counting null contents as zero.
    pub fn character_count(&self) -> usize {
        self.messages
            .iter()
            .map(|m| m.contents.as_deref().map_or(0, text::char_length))
            .sum()
    }

    pub fn clean_words(&self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for message in &self.messages {
            out.extend(message.clean_words()?);
        }
        Ok(out)
    }

    pub fn words(&self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for message in &self.messages {
            out.extend(message.words()?);
        }
        Ok(out)
    }

    pub fn length(&self) -> Result<usize> {
        self.messages.iter().map(Message::length).sum()
    }

    pub fn word_count(&self) -> Result<usize> {
        self.messages.iter().map(Message::word_count).sum()
    }
}

// ── Message ───────────────────────────────────────────────────────────────────

/// A single message row, tagged with its owning channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: u64,
    pub channel_id: u64,
    pub timestamp: DateTime<Utc>,
    pub contents: Option<String>,
    pub attachments: Option<Vec<String>>,
}

impl Message {
    pub fn new(
        id: u64,
        channel_id: u64,
        timestamp: DateTime<Utc>,
        contents: Option<String>,
    ) -> Self {
        Self {
            id,
            channel_id,
            timestamp,
            contents,
            attachments: None,
        }
    }

    fn from_row(channel_id: u64, row: MessageRow) -> Result<Self> {
        let attachments = row.attachment_list();
        Ok(Self {
            id: row.id.to_u64()?,
            channel_id,
            timestamp: parse_export_timestamp(&row.timestamp)?,
            contents: row.contents,
            attachments,
        })
    }

    pub fn channel<'a>(&self, index: &'a Index) -> Result<&'a Channel> {
        index.channel(self.channel_id)
    }

    pub fn guild<'a>(&self, index: &'a Index) -> Result<Option<&'a Server>> {
        self.channel(index)?.guild(index)
    }

    /// Contents, or `InvalidState` for attachment-only rows with null text.
    fn text(&self) -> Result<&str> {
        self.contents.as_deref().ok_or_else(|| {
            ArchiveError::InvalidState(format!("message {} has no contents", self.id))
        })
    }

    pub fn clean_words(&self) -> Result<Vec<String>> {
        Ok(text::clean_words(self.text()?))
    }

    pub fn words(&self) -> Result<Vec<String>> {
        Ok(text::words(self.text()?))
    }

    pub fn length(&self) -> Result<usize> {
        Ok(text::char_length(self.text()?))
    }

    pub fn word_count(&self) -> Result<usize> {
        Ok(text::word_count(self.text()?))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
