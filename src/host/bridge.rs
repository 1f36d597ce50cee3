//! Built-ins that reach the host: catalog lookups, search, persistence,
//! elements, and downloads.

use std::rc::Rc;

use rand::seq::SliceRandom;
use tracing::{debug, warn};

use super::{Entry, EntryKind, Host, HostConfig, Record, serialize_record};
use crate::{environment::Environment, value::Value};

/// Lookup key meaning "a random item from the current results".
pub const RANDOM_RESULT: f64 = -1.0;

/// Lookup key meaning "a random item from the whole catalog".
pub const RANDOM_ENTRY: f64 = -2.0;

/// Shared state captured by every bridge function.
struct Bridge {
    host: Rc<dyn Host>,
    thumbnail_base: Option<String>,
}

impl Bridge {
    fn entry(&self, kind: EntryKind, record: &Record) -> Value {
        Value::Entry(Entry::new(kind, record).with_thumbnail_base(self.thumbnail_base.as_deref()))
    }

    /// Turns a script value into an item id, resolving the random sentinels.
    fn resolve_id(&self, key: &Value) -> Option<u64> {
        match key {
            Value::Number(n) if *n == RANDOM_RESULT => {
                self.host.result_ids().choose(&mut rand::thread_rng()).copied()
            }
            Value::Number(n) if *n == RANDOM_ENTRY => {
                self.host.all_ids().choose(&mut rand::thread_rng()).copied()
            }
            Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as u64),
            Value::String(s) => s.trim().parse().ok(),
            Value::Entry(entry) => entry.item_id(),
            _ => None,
        }
    }

    fn lookup(&self, kind: EntryKind, key: &Value) -> Value {
        let Some(id) = self.resolve_id(key) else {
            warn!("{}: {} is not an item id", kind, key);
            return Value::Number(0.0);
        };
        match self.host.lookup(kind, id) {
            Some(record) => self.entry(kind, &record),
            None => {
                warn!("{}: no record for {}", kind, id);
                Value::Number(0.0)
            }
        }
    }

    fn info_entries(&self, ids: Vec<u64>) -> Value {
        Value::array(
            ids.into_iter()
                .filter_map(|id| self.host.lookup(EntryKind::Info, id))
                .map(|record| self.entry(EntryKind::Info, &record))
                .collect(),
        )
    }

    fn related(&self, key: &Value, find: impl Fn(&dyn Host, u64) -> Vec<u64>) -> Value {
        match self.resolve_id(key) {
            Some(id) => self.info_entries(find(self.host.as_ref(), id)),
            None => {
                warn!("{} is not an item id", key);
                Value::array(Vec::new())
            }
        }
    }
}

/// Status values returned by side-effecting bridges.
fn status(ok: bool) -> Value {
    Value::Number(if ok { 0.0 } else { 1.0 })
}

/// Registers the host built-ins.
///
/// | name | result |
/// |------|--------|
/// | `info(id)`, `user(id)`, `meta(id)` | the entry, or `0` |
/// | `results()` | info entries of the current results |
/// | `children(id)`, `copies(id)` | info entries of related items |
/// | `search(query, callback)` | `0`; `callback` later receives the entries |
/// | `save(entry)` | `0` on success, `1` on failure |
/// | `elem(tag)`, `query(selector)` | an element, or `0` |
/// | `download(data, name, mime?)` | `0` on success, `1` on failure |
pub fn register_host(env: &mut Environment, config: HostConfig) {
    let bridge = Rc::new(Bridge {
        host: config.host,
        thumbnail_base: config.thumbnail_base,
    });

    for (name, kind) in [
        ("info", EntryKind::Info),
        ("user", EntryKind::User),
        ("meta", EntryKind::Meta),
    ] {
        let b = Rc::clone(&bridge);
        env.register_builtin(name, move |args| {
            b.lookup(kind, args.first().unwrap_or(&Value::Number(RANDOM_RESULT)))
        });
    }

    let b = Rc::clone(&bridge);
    env.register_builtin("results", move |_| b.info_entries(b.host.result_ids()));

    let b = Rc::clone(&bridge);
    env.register_builtin("children", move |args| {
        b.related(args.first().unwrap_or(&Value::Number(0.0)), |host, id| {
            host.descendants(id)
        })
    });

    let b = Rc::clone(&bridge);
    env.register_builtin("copies", move |args| {
        b.related(args.first().unwrap_or(&Value::Number(0.0)), |host, id| host.copies(id))
    });

    let b = Rc::clone(&bridge);
    env.register_builtin("search", move |args| {
        let query = args.first().map(Value::to_string).unwrap_or_default();
        let callback = args.get(1).cloned();
        let deliver_to = Rc::clone(&b);

        debug!("search: {}", query);
        b.host.search(
            &query,
            Box::new(move |records: Vec<Record>| {
                let entries = Value::array(
                    records
                        .iter()
                        .map(|record| deliver_to.entry(EntryKind::Info, record))
                        .collect(),
                );
                match callback {
                    Some(callback) => {
                        callback.call(vec![entries]);
                    }
                    None => debug!("search finished with no callback"),
                }
            }),
        );
        Value::Number(0.0)
    });

    let b = Rc::clone(&bridge);
    env.register_builtin("save", move |args| {
        let Some(Value::Entry(entry)) = args.first() else {
            warn!("save: expected an entry");
            return status(false);
        };
        let result = serialize_record(&entry.record())
            .and_then(|wire| b.host.persist(entry.kind(), &wire));
        if let Err(e) = &result {
            warn!("save: {}", e);
        }
        status(result.is_ok())
    });

    let b = Rc::clone(&bridge);
    env.register_builtin("elem", move |args| {
        let tag = args.first().map(Value::to_string).unwrap_or_default();
        match b.host.create_element(&tag) {
            Some(element) => Value::Element(element),
            None => {
                warn!("elem: cannot create <{}>", tag);
                Value::Number(0.0)
            }
        }
    });

    let b = Rc::clone(&bridge);
    env.register_builtin("query", move |args| {
        let selector = args.first().map(Value::to_string).unwrap_or_default();
        match b.host.query_element(&selector) {
            Some(element) => Value::Element(element),
            None => {
                warn!("query: nothing matches {}", selector);
                Value::Number(0.0)
            }
        }
    });

    let b = bridge;
    env.register_builtin("download", move |args| {
        let text = |i: usize| args.get(i).map(Value::to_string);
        let data = text(0).unwrap_or_default();
        let name = text(1).unwrap_or_else(|| "download.txt".to_string());
        let mime = text(2).unwrap_or_else(|| "text/plain".to_string());

        let result = b.host.download(&data, &name, &mime);
        if let Err(e) = &result {
            warn!("download: {}", e);
        }
        status(result.is_ok())
    });
}
