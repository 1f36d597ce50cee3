use std::{cell::RefCell, fmt, rc::Rc};

use tracing::warn;

use super::{ID_FIELDS, PROTECTED_FIELDS, Record};
use crate::{
    convert::{json_to_value, value_to_json},
    value::Value,
};

const INFO_FIELDS: [&str; 10] = [
    "ItemId",
    "Collection",
    "Format",
    "ArtStyle",
    "Location",
    "Native_Title",
    "PurchasePrice",
    "Type",
    "En_Title",
    "Library",
];

const USER_FIELDS: [&str; 7] = [
    "ItemId",
    "Status",
    "ViewCount",
    "UserRating",
    "Notes",
    "CurrentPosition",
    "Extra",
];

const META_FIELDS: [&str; 12] = [
    "ItemId",
    "Rating",
    "RatingMax",
    "Description",
    "ReleaseYear",
    "Thumbnail",
    "MediaDependant",
    "Datapoints",
    "Title",
    "Native_Title",
    "Provider",
    "ProviderID",
];

/// Which of the three catalog tables a record comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntryKind {
    /// Item description: titles, format, location
    Info,
    /// The user's engagement with an item
    User,
    /// Provider metadata: ratings, thumbnail, release year
    Meta,
}

impl EntryKind {
    /// Guesses the kind of a record from the fields it carries.
    pub fn classify(record: &Record) -> Option<EntryKind> {
        let has_all = |fields: &[&str]| fields.iter().all(|f| record.contains_key(*f));

        if has_all(&INFO_FIELDS) {
            Some(EntryKind::Info)
        } else if has_all(&META_FIELDS) {
            Some(EntryKind::Meta)
        } else if has_all(&USER_FIELDS) {
            Some(EntryKind::User)
        } else {
            None
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Info => f.write_str("info"),
            EntryKind::User => f.write_str("user"),
            EntryKind::Meta => f.write_str("meta"),
        }
    }
}

/// A script's private copy of a catalog record.
///
/// The record is copied on construction, so writes through the entry never
/// touch host state until the script hands the entry back with `save`.
/// Clones of one `Entry` share the copy.
#[derive(Debug, Clone)]
pub struct Entry {
    kind: EntryKind,
    record: Rc<RefCell<Record>>,
    thumbnail_base: Option<Rc<str>>,
}

impl Entry {
    pub fn new(kind: EntryKind, record: &Record) -> Self {
        Entry {
            kind,
            record: Rc::new(RefCell::new(record.clone())),
            thumbnail_base: None,
        }
    }

    /// Wraps `record` if its shape matches one of the catalog tables.
    pub fn classify(record: &Record) -> Option<Self> {
        EntryKind::classify(record).map(|kind| Entry::new(kind, record))
    }

    pub fn with_thumbnail_base(mut self, base: Option<&str>) -> Self {
        self.thumbnail_base = base.map(Rc::from);
        self
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn item_id(&self) -> Option<u64> {
        match self.record.borrow().get("ItemId")? {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn field_count(&self) -> usize {
        self.record.borrow().len()
    }

    pub fn field_names(&self) -> Vec<String> {
        self.record.borrow().keys().cloned().collect()
    }

    /// A snapshot of the current record.
    pub fn record(&self) -> Record {
        self.record.borrow().clone()
    }

    /// Reads a field as a script value.
    ///
    /// Identifiers come back as digit strings and `/`-relative thumbnails are
    /// made absolute.
    pub fn get(&self, field: &str) -> Option<Value> {
        let record = self.record.borrow();
        let raw = record.get(field)?;

        if ID_FIELDS.contains(&field) {
            return Some(match raw {
                serde_json::Value::Number(n) => Value::String(n.to_string()),
                other => json_to_value(other.clone()),
            });
        }

        if field == "Thumbnail"
            && let serde_json::Value::String(url) = raw
        {
            return Some(Value::String(self.fix_thumbnail(url)));
        }

        Some(json_to_value(raw.clone()))
    }

    /// Writes a field. Returns false, leaving the record untouched, for
    /// protected fields.
    pub fn set(&self, field: &str, value: &Value) -> bool {
        if PROTECTED_FIELDS.contains(&field) {
            warn!("{} is read-only on {} entries", field, self.kind);
            return false;
        }

        let json = if ID_FIELDS.contains(&field) {
            match value.to_string().parse::<u64>() {
                Ok(id) => serde_json::Value::from(id),
                Err(_) => value_to_json(value),
            }
        } else {
            value_to_json(value)
        };

        self.record.borrow_mut().insert(field.to_string(), json);
        true
    }

    fn fix_thumbnail(&self, url: &str) -> String {
        match &self.thumbnail_base {
            Some(base) if url.starts_with('/') => format!("{}{}", base, url),
            _ => url.to_string(),
        }
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && (Rc::ptr_eq(&self.record, &other.record)
                || *self.record.borrow() == *other.record.borrow())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta() -> Record {
        let value = json!({
            "ItemId": 12, "Rating": 80, "RatingMax": 100, "Description": "",
            "ReleaseYear": 1999, "Thumbnail": "/thumbnail/12", "MediaDependant": "{}",
            "Datapoints": "{}", "Title": "T", "Native_Title": "", "Provider": "anilist",
            "ProviderID": "1",
        });
        match value {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn classifies_by_shape() {
        assert_eq!(EntryKind::classify(&meta()), Some(EntryKind::Meta));
        assert_eq!(EntryKind::classify(&Record::new()), None);
    }

    #[test]
    fn relative_thumbnails_get_the_base() {
        let entry = Entry::new(EntryKind::Meta, &meta()).with_thumbnail_base(Some("http://aio"));
        assert_eq!(
            entry.get("Thumbnail"),
            Some(Value::from("http://aio/thumbnail/12"))
        );
        assert_eq!(entry.get("ItemId"), Some(Value::from("12")));
    }

    #[test]
    fn writes_do_not_reach_the_source_record() {
        let source = meta();
        let entry = Entry::new(EntryKind::Meta, &source);
        assert!(entry.set("Rating", &Value::Number(90.0)));
        assert!(!entry.set("ItemId", &Value::Number(1.0)));
        assert_eq!(source["Rating"], json!(80));
        assert_eq!(entry.get("Rating"), Some(Value::Number(90.0)));
        assert_eq!(entry.item_id(), Some(12));
    }
}
