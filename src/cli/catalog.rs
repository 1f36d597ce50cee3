//! A catalog host backed by a JSON Lines file.

use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    fs,
    path::PathBuf,
};

use tracing::{debug, warn};

use super::CliError;
use crate::host::{EntryKind, Host, HostError, Record, SearchCallback, parse_record};

/// Records keyed by kind and item id, loaded from one record per line.
///
/// Saves update the in-memory copy only. Downloads are written into
/// `download_dir` when one is set.
#[derive(Debug, Default)]
pub struct CatalogHost {
    records: RefCell<BTreeMap<(EntryKind, u64), Record>>,
    download_dir: Option<PathBuf>,
}

impl CatalogHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads records from JSON Lines text. Blank lines are skipped; lines
    /// that match no record shape are skipped with a warning.
    pub fn from_jsonl(text: &str) -> Result<Self, CliError> {
        let host = CatalogHost::new();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record = parse_record(line).map_err(|source| CliError::Catalog {
                line: i + 1,
                source,
            })?;
            if !host.insert(record) {
                warn!("catalog line {}: not an info, user, or meta record", i + 1);
            }
        }
        Ok(host)
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    /// Adds a record under its classified kind. Returns false if the record
    /// has no recognizable shape or id.
    pub fn insert(&self, record: Record) -> bool {
        let Some(kind) = EntryKind::classify(&record) else {
            return false;
        };
        let Some(id) = record.get("ItemId").and_then(|id| id.as_u64()) else {
            return false;
        };
        self.records.borrow_mut().insert((kind, id), record);
        true
    }

    fn info_ids_where(&self, keep: impl Fn(&Record) -> bool) -> Vec<u64> {
        self.records
            .borrow()
            .iter()
            .filter(|(key, record)| key.0 == EntryKind::Info && keep(record))
            .map(|((_, id), _)| *id)
            .collect()
    }

    fn field_id(record: &Record, field: &str) -> Option<u64> {
        record.get(field).and_then(|v| v.as_u64())
    }
}

impl Host for CatalogHost {
    fn lookup(&self, kind: EntryKind, id: u64) -> Option<Record> {
        self.records.borrow().get(&(kind, id)).cloned()
    }

    fn result_ids(&self) -> Vec<u64> {
        self.all_ids()
    }

    fn all_ids(&self) -> Vec<u64> {
        self.info_ids_where(|_| true)
    }

    fn descendants(&self, id: u64) -> Vec<u64> {
        let mut found = BTreeSet::new();
        let mut frontier = vec![id];
        while let Some(parent) = frontier.pop() {
            for child in self.info_ids_where(|r| Self::field_id(r, "ParentId") == Some(parent)) {
                if child != id && found.insert(child) {
                    frontier.push(child);
                }
            }
        }
        found.into_iter().collect()
    }

    fn copies(&self, id: u64) -> Vec<u64> {
        self.info_ids_where(|r| Self::field_id(r, "CopyOf") == Some(id))
    }

    /// Case-insensitive title match, delivered before returning.
    fn search(&self, query: &str, deliver: SearchCallback) {
        let needle = query.to_lowercase();
        let matches: Vec<Record> = self
            .records
            .borrow()
            .iter()
            .filter(|((kind, _), _)| *kind == EntryKind::Info)
            .filter(|(_, record)| {
                ["En_Title", "Native_Title"].iter().any(|field| {
                    record
                        .get(*field)
                        .and_then(|v| v.as_str())
                        .is_some_and(|title| title.to_lowercase().contains(&needle))
                })
            })
            .map(|(_, record)| record.clone())
            .collect();

        debug!("search {:?}: {} match(es)", query, matches.len());
        deliver(matches);
    }

    fn persist(&self, kind: EntryKind, wire: &str) -> Result<(), HostError> {
        let record = parse_record(wire)?;
        let id = Self::field_id(&record, "ItemId").ok_or(HostError::Refused(
            "record has no ItemId".to_string(),
        ))?;
        if !self.records.borrow().contains_key(&(kind, id)) {
            return Err(HostError::NotFound { kind, id });
        }
        self.records.borrow_mut().insert((kind, id), record);
        Ok(())
    }

    fn download(&self, data: &str, name: &str, _mime: &str) -> Result<(), HostError> {
        let dir = self
            .download_dir
            .as_ref()
            .ok_or(HostError::Unsupported("download without a download directory"))?;

        // Only the final path component of `name` is honored.
        let file_name = std::path::Path::new(name)
            .file_name()
            .ok_or_else(|| HostError::Refused(format!("invalid file name {:?}", name)))?;
        fs::write(dir.join(file_name), data)?;
        Ok(())
    }
}

/// Reads a catalog file.
pub fn load(path: &std::path::Path) -> Result<CatalogHost, CliError> {
    CatalogHost::from_jsonl(&fs::read_to_string(path)?)
}
