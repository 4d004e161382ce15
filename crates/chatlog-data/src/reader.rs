//! Archive access for chat exports.
//!
//! An export is read either straight from the `package.zip` bundle or from a
//! directory it was extracted into. Either way the whole file is read into
//! memory and handed back as a [`RawFile`]: a JSON value or a list of CSV rows
//! keyed by header.

use std::collections::BTreeSet;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use chatlog_core::error::{ArchiveError, Result};
use serde_json::{Map, Value};
use tracing::{debug, warn};

// ── RawFile ───────────────────────────────────────────────────────────────────

/// The untyped contents of one export file.
#[derive(Debug, Clone, PartialEq)]
pub enum RawFile {
    Json(Value),
    /// One object per data row, header → field.
    Csv(Vec<Map<String, Value>>),
}

impl RawFile {
    /// Parse `bytes` according to the extension of `name`.
    ///
    /// Anything other than `.json` or `.csv` is `MalformedInput`.
    pub fn parse(name: &str, bytes: &[u8]) -> Result<Self> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Ok(RawFile::Json(serde_json::from_slice(bytes)?)),
            Some("csv") => parse_csv(name, bytes).map(RawFile::Csv),
            _ => Err(ArchiveError::MalformedInput(format!(
                "{} is neither a .json nor a .csv file",
                name
            ))),
        }
    }

    /// Collapse into a single JSON value; CSV rows become an array of
    /// objects with string fields.
    pub fn into_value(self) -> Value {
        match self {
            RawFile::Json(v) => v,
            RawFile::Csv(rows) => Value::Array(rows.into_iter().map(Value::Object).collect()),
        }
    }
}

fn parse_csv(name: &str, bytes: &[u8]) -> Result<Vec<Map<String, Value>>> {
    let malformed = |e: csv::Error| ArchiveError::MalformedInput(format!("{}: {}", name, e));

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);
    let headers = reader.headers().map_err(malformed)?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(malformed)?;
        let row: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .map(|(h, field)| (h.to_string(), Value::String(field.to_string())))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

// ── ArchiveReader ─────────────────────────────────────────────────────────────

enum Source {
    Zip(zip::ZipArchive<Cursor<Vec<u8>>>),
    Directory(PathBuf),
}

/// Read access to an export, addressed by `/`-separated archive paths such
/// as `messages/c123/channel.json`.
pub struct ArchiveReader {
    source: Source,
}

impl ArchiveReader {
    /// Open `path` as an extracted directory if it is one, otherwise as a
    /// zip bundle.
    pub fn open(path: &Path) -> Result<Self> {
        if path.is_dir() {
            debug!("Reading extracted export from {}", path.display());
            return Ok(Self {
                source: Source::Directory(path.to_path_buf()),
            });
        }

        let bytes = std::fs::read(path).map_err(|source| ArchiveError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Read {} bytes from {}", bytes.len(), path.display());
        Self::from_zip_bytes(bytes)
    }

    /// Wrap an in-memory zip bundle.
    pub fn from_zip_bytes(bytes: Vec<u8>) -> Result<Self> {
        let archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ArchiveError::Archive(e.to_string()))?;
        Ok(Self {
            source: Source::Zip(archive),
        })
    }

    /// Names of the immediate subdirectories of `dir`, sorted.
    pub fn list_directories(&self, dir: &str) -> Vec<String> {
        let dir = dir.trim_end_matches('/');
        match &self.source {
            Source::Zip(archive) => {
                let prefix = format!("{}/", dir);
                let names: BTreeSet<String> = archive
                    .file_names()
                    .filter_map(|name| name.strip_prefix(prefix.as_str()))
                    .filter_map(|rest| rest.split_once('/'))
                    .map(|(child, _)| child)
                    .filter(|child| !child.is_empty())
                    .map(str::to_string)
                    .collect();
                names.into_iter().collect()
            }
            Source::Directory(root) => {
                let base = root.join(dir);
                if !base.is_dir() {
                    warn!("Directory does not exist: {}", base.display());
                    return Vec::new();
                }
                let mut names: Vec<String> = walkdir::WalkDir::new(&base)
                    .min_depth(1)
                    .max_depth(1)
                    .into_iter()
                    .filter_map(|entry| entry.ok())
                    .filter(|entry| entry.file_type().is_dir())
                    .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
                    .collect();
                names.sort();
                names
            }
        }
    }

    /// Whether a file exists at `path`.
    pub fn contains(&self, path: &str) -> bool {
        match &self.source {
            Source::Zip(archive) => archive.index_for_name(path).is_some(),
            Source::Directory(root) => root.join(path).is_file(),
        }
    }

    /// Raw bytes of the file at `path`.
    pub fn read_bytes(&mut self, path: &str) -> Result<Vec<u8>> {
        match &mut self.source {
            Source::Zip(archive) => {
                let mut entry = archive
                    .by_name(path)
                    .map_err(|e| ArchiveError::Archive(format!("{}: {}", path, e)))?;
                let mut out = Vec::new();
                entry
                    .read_to_end(&mut out)
                    .map_err(|source| ArchiveError::FileRead {
                        path: PathBuf::from(path),
                        source,
                    })?;
                Ok(out)
            }
            Source::Directory(root) => {
                let full = root.join(path);
                std::fs::read(&full).map_err(|source| ArchiveError::FileRead { path: full, source })
            }
        }
    }

    /// Read and parse the file at `path` by its extension.
    pub fn read_file(&mut self, path: &str) -> Result<RawFile> {
        let bytes = self.read_bytes(path)?;
        RawFile::parse(path, &bytes)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
