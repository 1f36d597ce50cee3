//! The boundary between the language and the application embedding it.
//!
//! The interpreter never reaches outside its [`Environment`]. Everything it
//! knows about the catalog, the page, or the network arrives as built-in
//! functions registered from a [`Host`] through [`HostConfig`].
//!
//! [`Environment`]: crate::environment::Environment

mod bridge;
mod element;
mod entry;

use std::{rc::Rc, sync::LazyLock};

use regex::Regex;
use thiserror::Error;

pub use bridge::{RANDOM_ENTRY, RANDOM_RESULT, register_host};
pub use element::{ElementRef, HostElement, VirtualElement};
pub use entry::{Entry, EntryKind};

/// A catalog record as the host stores it.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Fields holding 64-bit identifiers. These travel as quoted strings so that
/// no JSON reader rounds them through a double.
pub const ID_FIELDS: [&str; 5] = ["ItemId", "ParentId", "CopyOf", "Library", "Requires"];

/// Fields scripts may read but never write.
pub const PROTECTED_FIELDS: [&str; 2] = ["ItemId", "Uid"];

/// Receives the records found by [`Host::search`].
pub type SearchCallback = Box<dyn FnOnce(Vec<Record>)>;

/// Errors raised by host operations.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("no {kind} record with id {id}")]
    NotFound { kind: EntryKind, id: u64 },

    #[error("invalid record: {0}")]
    InvalidRecord(#[from] serde_json::Error),

    #[error("{0} is not supported by this host")]
    Unsupported(&'static str),

    #[error("persistence refused: {0}")]
    Refused(String),

    #[error("invalid pattern: {0}")]
    Pattern(regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Services an embedding application offers to scripts.
///
/// Only lookups are required; page and persistence operations default to
/// "unsupported" so that a read-only host stays small.
pub trait Host {
    /// The record of `kind` for item `id`.
    fn lookup(&self, kind: EntryKind, id: u64) -> Option<Record>;

    /// Ids of the items the user is currently looking at.
    fn result_ids(&self) -> Vec<u64>;

    /// Ids of every item in the catalog.
    fn all_ids(&self) -> Vec<u64>;

    /// Ids of every item below `id` in the parent hierarchy.
    fn descendants(&self, _id: u64) -> Vec<u64> {
        Vec::new()
    }

    /// Ids of the items recorded as copies of `id`.
    fn copies(&self, _id: u64) -> Vec<u64> {
        Vec::new()
    }

    /// Starts a search. Results may be delivered after this returns.
    fn search(&self, _query: &str, deliver: SearchCallback) {
        deliver(Vec::new());
    }

    /// Stores an edited record, given in wire form.
    fn persist(&self, _kind: EntryKind, _wire: &str) -> Result<(), HostError> {
        Err(HostError::Unsupported("persistence"))
    }

    fn create_element(&self, tag: &str) -> Option<ElementRef> {
        Some(Rc::new(VirtualElement::new(tag)))
    }

    fn query_element(&self, _selector: &str) -> Option<ElementRef> {
        None
    }

    /// Offers `data` to the user as a file.
    fn download(&self, _data: &str, _name: &str, _mime: &str) -> Result<(), HostError> {
        Err(HostError::Unsupported("download"))
    }
}

/// What a host hands the language when building an environment.
#[derive(Clone)]
pub struct HostConfig {
    pub host: Rc<dyn Host>,

    /// Prefix for thumbnails given as `/`-relative URLs.
    pub thumbnail_base: Option<String>,
}

impl HostConfig {
    pub fn new(host: Rc<dyn Host>) -> Self {
        HostConfig {
            host,
            thumbnail_base: None,
        }
    }

    pub fn with_thumbnail_base(mut self, base: impl Into<String>) -> Self {
        self.thumbnail_base = Some(base.into());
        self
    }
}

static QUOTE_IDS: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r#""(ItemId|ParentId|CopyOf|Library|Requires)"\s*:\s*(\d+)"#));

static UNQUOTE_IDS: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r#""(ItemId|ParentId|CopyOf|Library|Requires)"\s*:\s*"(\d+)""#));

fn pattern(lock: &LazyLock<Result<Regex, regex::Error>>) -> Result<&Regex, HostError> {
    lock.as_ref().map_err(|e| HostError::Pattern(e.clone()))
}

/// Parses one record from its wire form.
///
/// Identifier fields are quoted before parsing so their digits reach us
/// untouched, then stored as exact unsigned integers. Digits too large for
/// `u64` stay strings.
pub fn parse_record(wire: &str) -> Result<Record, HostError> {
    let quoted = pattern(&QUOTE_IDS)?.replace_all(wire, r#""$1":"$2""#);
    let mut record: Record = serde_json::from_str(&quoted)?;

    for field in ID_FIELDS {
        if let Some(serde_json::Value::String(digits)) = record.get(field)
            && let Ok(id) = digits.parse::<u64>()
        {
            record.insert(field.to_string(), serde_json::Value::from(id));
        }
    }
    Ok(record)
}

/// Renders a record in wire form: compact JSON with bare integer identifiers.
pub fn serialize_record(record: &Record) -> Result<String, HostError> {
    let json = serde_json::to_string(record)?;
    Ok(pattern(&UNQUOTE_IDS)?.replace_all(&json, r#""$1":$2"#).into_owned())
}
