//! Builds an [`Index`] from an export archive.
//!
//! Loading happens in two phases: every server and channel is registered from
//! the two `index.json` files, then each `messages/c<id>/` directory enriches
//! its channel with metadata and attaches its message log. Any failure aborts
//! the whole load; a partially populated index is never returned.

use std::path::Path;
use std::time::Instant;

use chatlog_core::error::{ArchiveError, Result};
use chatlog_core::index::Index;
use chatlog_core::schema::{
    parse_channel_dir, ChannelIndexFile, ChannelMetadata, MessageRow, ServerIndexFile,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::reader::ArchiveReader;

pub const SERVERS_INDEX: &str = "servers/index.json";
pub const MESSAGES_DIR: &str = "messages";
pub const MESSAGES_INDEX: &str = "messages/index.json";
pub const CHANNEL_FILE: &str = "channel.json";
pub const MESSAGES_CSV: &str = "messages.csv";
pub const MESSAGES_JSON: &str = "messages.json";

/// Open the export at `path` (zip or extracted directory) and load it.
pub fn load_package(path: &Path) -> Result<Index> {
    let mut reader = ArchiveReader::open(path)?;
    load_from_reader(&mut reader)
}

/// Load every server, channel and message reachable through `reader`.
pub fn load_from_reader(reader: &mut ArchiveReader) -> Result<Index> {
    let started = Instant::now();
    let mut index = Index::new();

    // ── Phase 1: registration ─────────────────────────────────────────────────
    if reader.contains(SERVERS_INDEX) {
        let servers: ServerIndexFile = read_typed(reader, SERVERS_INDEX)?;
        index.load_servers(servers.entries()?)?;
    } else {
        warn!("{} not found; no servers registered", SERVERS_INDEX);
    }

    let channels: ChannelIndexFile = read_typed(reader, MESSAGES_INDEX)?;
    index.load_channels(channels.entries()?)?;

    debug!(
        "Registered {} servers and {} channels",
        index.server_count(),
        index.channel_count()
    );

    // ── Phase 2: per-channel enrichment ───────────────────────────────────────
    let directories = reader.list_directories(MESSAGES_DIR);
    for dir in &directories {
        let channel_id = parse_channel_dir(dir)?;
        let base = format!("{}/{}", MESSAGES_DIR, dir);

        let metadata: ChannelMetadata = read_typed(reader, &format!("{}/{}", base, CHANNEL_FILE))?;
        let rows = read_message_rows(reader, &base)?;
        let row_count = rows.len();

        let channel = index.channel_mut(channel_id)?;
        channel.update_channel(&metadata)?;
        channel.load_messages(rows)?;

        debug!("Channel {}: {} messages", channel_id, row_count);
    }

    info!(
        "Loaded {} messages across {} channel directories in {:.2}s",
        index.total_messages(),
        directories.len(),
        started.elapsed().as_secs_f64()
    );

    Ok(index)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Message log of one channel directory, from `messages.csv` or, failing
/// that, `messages.json`.
fn read_message_rows(reader: &mut ArchiveReader, base: &str) -> Result<Vec<MessageRow>> {
    let csv_path = format!("{}/{}", base, MESSAGES_CSV);
    if reader.contains(&csv_path) {
        return read_typed(reader, &csv_path);
    }
    let json_path = format!("{}/{}", base, MESSAGES_JSON);
    if reader.contains(&json_path) {
        return read_typed(reader, &json_path);
    }
    Err(ArchiveError::MalformedInput(format!(
        "{} has neither {} nor {}",
        base, MESSAGES_CSV, MESSAGES_JSON
    )))
}

/// Read `path` and deserialize it into its schema record.
fn read_typed<T: DeserializeOwned>(reader: &mut ArchiveReader, path: &str) -> Result<T> {
    let raw = reader.read_file(path)?;
    serde_json::from_value(raw.into_value())
        .map_err(|e| ArchiveError::MalformedInput(format!("{}: {}", path, e)))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chatlog_core::error::EntityKind;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn build_zip(files: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            for (name, contents) in files {
                zip.start_file(*name, zip::write::SimpleFileOptions::default())
                    .unwrap();
                zip.write_all(contents.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    fn load(files: &[(&str, &str)]) -> Result<Index> {
        let mut reader = ArchiveReader::from_zip_bytes(build_zip(files)).unwrap();
        load_from_reader(&mut reader)
    }

    const GENERAL_CSV: &str = "ID,Timestamp,Contents,Attachments\n\
        101,2021-01-03 10:00:00.000000+00:00,hello world,\n\
        102,2021-01-01 09:00:00.000000+00:00,\"first, message\",https://cdn/a.png\n\
        103,2021-01-02 08:00:00.000000+00:00,,https://cdn/b.png\n";

    fn sample_files() -> Vec<(&'static str, &'static str)> {
        vec![
            ("servers/index.json", r#"{"1": "Study Group"}"#),
            ("servers/1/guild.json", r#"{"id": "1", "name": "Study Group"}"#),
            ("servers/1/audit-log.json", "[]"),
            (
                "messages/index.json",
                r#"{"10": "general", "20": "Direct Message with alice#0001", "30": null}"#,
            ),
            (
                "messages/c10/channel.json",
                r#"{"id": "10", "type": 0, "name": "general", "guild": {"id": "1", "name": "Study Group"}}"#,
            ),
            ("messages/c10/messages.csv", GENERAL_CSV),
            (
                "messages/c20/channel.json",
                r#"{"id": "20", "type": 1, "recipients": ["7", "8"]}"#,
            ),
            (
                "messages/c20/messages.csv",
                "ID,Timestamp,Contents,Attachments\n201,2021-01-04 00:00:00+00:00,hey,\n",
            ),
            ("messages/c30/channel.json", r#"{"id": "30", "type": 3}"#),
            (
                "messages/c30/messages.json",
                r#"[{"ID": 301, "Timestamp": "2020-12-31T23:00:00+00:00", "Contents": null, "Attachments": ""}]"#,
            ),
        ]
    }

    // ── load_from_reader ──────────────────────────────────────────────────────

    #[test]
    fn test_load_full_package() {
        let index = load(&sample_files()).unwrap();

        assert_eq!(index.server_count(), 1);
        assert_eq!(index.channel_count(), 3);
        assert_eq!(index.total_messages(), 5);
        // "hello world" + "first, message" + "" + "hey"; null counts as zero.
        assert_eq!(index.total_characters(), 11 + 14 + 3);

        let general = index.channel(10).unwrap();
        assert_eq!(general.channel_type, Some(0));
        assert_eq!(general.guild_id, Some(1));
        assert_eq!(general.guild(&index).unwrap().unwrap().name, "Study Group");
        let ids: Vec<u64> = general.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![101, 102, 103]);
        assert_eq!(general.messages()[2].contents.as_deref(), Some(""));

        let dm = index.channel(20).unwrap();
        assert_eq!(dm.guild_id, Some(0));
        assert_eq!(dm.recipients, Some(vec![7, 8]));
        assert!(dm.is_direct_message());

        let group = index.channel(30).unwrap();
        assert!(group.messages()[0].contents.is_none());
    }

    #[test]
    fn test_loaded_messages_in_time_order() {
        let index = load(&sample_files()).unwrap();
        let ids: Vec<u64> = index
            .message_range(None, None)
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![301, 102, 103, 101, 201]);
        assert_eq!(index.first_message().unwrap().id, 301);
        assert_eq!(index.last_message().unwrap().id, 201);
    }

    #[test]
    fn test_missing_servers_index_is_tolerated() {
        let files: Vec<_> = sample_files()
            .into_iter()
            .filter(|(name, _)| !name.starts_with("servers/"))
            .collect();
        let index = load(&files).unwrap();
        assert_eq!(index.server_count(), 0);
        // The guild reference now dangles and surfaces at access time.
        let general = index.channel(10).unwrap();
        assert!(matches!(
            general.guild(&index),
            Err(ArchiveError::NotFound {
                entity: EntityKind::Server,
                id: 1
            })
        ));
    }

    #[test]
    fn test_missing_messages_index_fails() {
        let files: Vec<_> = sample_files()
            .into_iter()
            .filter(|(name, _)| *name != MESSAGES_INDEX)
            .collect();
        assert!(matches!(load(&files), Err(ArchiveError::Archive(_))));
    }

    #[test]
    fn test_unregistered_channel_directory_fails() {
        let mut files = sample_files();
        files.push(("messages/c99/channel.json", r#"{"type": 0}"#));
        files.push(("messages/c99/messages.csv", "ID,Timestamp,Contents,Attachments\n"));
        let err = load(&files).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::NotFound {
                entity: EntityKind::Channel,
                id: 99
            }
        ));
    }

    #[test]
    fn test_channel_without_message_log_fails() {
        let files: Vec<_> = sample_files()
            .into_iter()
            .filter(|(name, _)| *name != "messages/c20/messages.csv")
            .collect();
        assert!(matches!(load(&files), Err(ArchiveError::MalformedInput(_))));
    }

    #[test]
    fn test_missing_csv_column_fails() {
        let mut files = sample_files();
        for entry in files.iter_mut() {
            if entry.0 == "messages/c20/messages.csv" {
                entry.1 = "ID,Timestamp,Contents\n201,2021-01-04 00:00:00+00:00,hey\n";
            }
        }
        let err = load(&files).unwrap_err();
        assert!(matches!(err, ArchiveError::MalformedInput(msg) if msg.contains("Attachments")));
    }

    #[test]
    fn test_bad_timestamp_fails() {
        let mut files = sample_files();
        for entry in files.iter_mut() {
            if entry.0 == "messages/c20/messages.csv" {
                entry.1 = "ID,Timestamp,Contents,Attachments\n201,someday,hey,\n";
            }
        }
        assert!(matches!(load(&files), Err(ArchiveError::MalformedInput(_))));
    }

    #[test]
    fn test_metadata_missing_type_fails() {
        let mut files = sample_files();
        for entry in files.iter_mut() {
            if entry.0 == "messages/c20/channel.json" {
                entry.1 = r#"{"id": "20"}"#;
            }
        }
        assert!(matches!(load(&files), Err(ArchiveError::MalformedInput(_))));
    }

    #[test]
    fn test_bad_channel_directory_name_fails() {
        let mut files = sample_files();
        files.push(("messages/attachments/readme.json", "{}"));
        assert!(matches!(load(&files), Err(ArchiveError::MalformedInput(_))));
    }

    // ── load_package ──────────────────────────────────────────────────────────

    #[test]
    fn test_load_package_from_zip_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("package.zip");
        std::fs::write(&path, build_zip(&sample_files())).unwrap();

        let index = load_package(&path).unwrap();
        assert_eq!(index.total_messages(), 5);
    }

    #[test]
    fn test_load_package_from_directory() {
        let dir = TempDir::new().unwrap();
        for (name, contents) in sample_files() {
            let path = dir.path().join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, contents).unwrap();
        }

        let index = load_package(dir.path()).unwrap();
        assert_eq!(index.channel_count(), 3);
        assert_eq!(index.total_messages(), 5);
    }
}
