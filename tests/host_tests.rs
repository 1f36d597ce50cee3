// tests/host_tests.rs

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use aiol_lang::host::{Record, SearchCallback, serialize_record};
use aiol_lang::{
    Entry, EntryKind, Environment, Host, HostConfig, HostError, HostValue, Value, evaluate,
    from_host_value,
};
use pretty_assertions::assert_eq;
use serde_json::json;

// ============================================================================
// Test host
// ============================================================================

/// In-memory host that records every side effect a script asks for.
#[derive(Default)]
struct RecordingHost {
    records: HashMap<(EntryKind, u64), Record>,
    results: Vec<u64>,
    refuse_saves: bool,
    saved: RefCell<Vec<(EntryKind, String)>>,
    downloads: RefCell<Vec<(String, String, String)>>,
    pending_searches: RefCell<Vec<(String, SearchCallback)>>,
}

impl RecordingHost {
    fn with_catalog() -> Self {
        let mut host = RecordingHost::default();
        host.add(EntryKind::Info, info(1, "Akira", None));
        host.add(EntryKind::Info, info(2, "Akira 2", Some(1)));
        host.add(EntryKind::Info, info(3, "Ghost", None));
        host.add(EntryKind::User, user(1));
        host.add(EntryKind::Meta, meta(1));
        host.results = vec![1, 3];
        host
    }

    fn add(&mut self, kind: EntryKind, record: Record) {
        let id = record["ItemId"].as_u64().unwrap();
        self.records.insert((kind, id), record);
    }

    /// Delivers every search started so far, as a host would once its
    /// request completes.
    fn finish_searches(&self) {
        let pending: Vec<_> = self.pending_searches.borrow_mut().drain(..).collect();
        for (query, deliver) in pending {
            let found: Vec<Record> = self
                .records
                .iter()
                .filter(|((kind, _), record)| {
                    *kind == EntryKind::Info
                        && record["En_Title"]
                            .as_str()
                            .is_some_and(|title| title.to_lowercase().contains(&query))
                })
                .map(|(_, record)| record.clone())
                .collect();
            deliver(found);
        }
    }
}

impl Host for RecordingHost {
    fn lookup(&self, kind: EntryKind, id: u64) -> Option<Record> {
        self.records.get(&(kind, id)).cloned()
    }

    fn result_ids(&self) -> Vec<u64> {
        self.results.clone()
    }

    fn all_ids(&self) -> Vec<u64> {
        self.records
            .keys()
            .filter(|(kind, _)| *kind == EntryKind::Info)
            .map(|(_, id)| *id)
            .collect()
    }

    fn descendants(&self, id: u64) -> Vec<u64> {
        self.records
            .iter()
            .filter(|(_, record)| record.get("ParentId").and_then(|p| p.as_u64()) == Some(id))
            .map(|((_, child), _)| *child)
            .collect()
    }

    fn search(&self, query: &str, deliver: SearchCallback) {
        self.pending_searches
            .borrow_mut()
            .push((query.to_lowercase(), deliver));
    }

    fn persist(&self, kind: EntryKind, wire: &str) -> Result<(), HostError> {
        if self.refuse_saves {
            return Err(HostError::Refused("read-only catalog".to_string()));
        }
        self.saved.borrow_mut().push((kind, wire.to_string()));
        Ok(())
    }

    fn download(&self, data: &str, name: &str, mime: &str) -> Result<(), HostError> {
        self.downloads
            .borrow_mut()
            .push((data.to_string(), name.to_string(), mime.to_string()));
        Ok(())
    }
}

fn record(value: serde_json::Value) -> Record {
    value.as_object().cloned().unwrap()
}

fn info(id: u64, title: &str, parent: Option<u64>) -> Record {
    let mut r = record(json!({
        "ItemId": id, "Collection": "", "Format": 1, "ArtStyle": 0, "Location": "",
        "Native_Title": "", "PurchasePrice": 0, "Type": "Show", "En_Title": title,
        "Library": 0,
    }));
    if let Some(parent) = parent {
        r.insert("ParentId".to_string(), json!(parent));
    }
    r
}

fn user(id: u64) -> Record {
    record(json!({
        "ItemId": id, "Status": "Viewing", "ViewCount": 2, "UserRating": 9,
        "Notes": "", "CurrentPosition": "", "Extra": "{}",
    }))
}

fn meta(id: u64) -> Record {
    record(json!({
        "ItemId": id, "Rating": 80, "RatingMax": 100, "Description": "",
        "ReleaseYear": 1988, "Thumbnail": format!("/thumbnail/{}", id),
        "MediaDependant": "{}", "Datapoints": "{}", "Title": "Akira",
        "Native_Title": "", "Provider": "anilist", "ProviderID": "47",
    }))
}

fn env_for(host: &Rc<RecordingHost>) -> Environment {
    Environment::with_host(HostConfig::new(host.clone()).with_thumbnail_base("http://localhost:8080"))
}

fn strs(ss: &[&str]) -> Value {
    Value::array(ss.iter().map(|s| Value::from(*s)).collect())
}

// ============================================================================
// Lookups
// ============================================================================

#[test]
fn test_lookup_by_id() {
    let host = Rc::new(RecordingHost::with_catalog());
    let mut env = env_for(&host);
    assert_eq!(evaluate("info(1)[\"En_Title\"]", &mut env), Value::from("Akira"));
    assert_eq!(evaluate("info(\"3\")(\"En_Title\")", &mut env), Value::from("Ghost"));
    assert_eq!(evaluate("user(1)[\"UserRating\"]", &mut env), Value::Number(9.0));
}

#[test]
fn test_missing_record_is_zero() {
    let host = Rc::new(RecordingHost::with_catalog());
    let mut env = env_for(&host);
    assert_eq!(evaluate("info(99)", &mut env), Value::Number(0.0));
    assert_eq!(evaluate("meta(3)", &mut env), Value::Number(0.0));
}

#[test]
fn test_identifiers_read_as_strings() {
    let host = Rc::new(RecordingHost::with_catalog());
    let mut env = env_for(&host);
    assert_eq!(evaluate("info(1)[\"ItemId\"]", &mut env), Value::from("1"));
    // An entry can stand in for its id
    assert_eq!(
        evaluate("meta(info(1))[\"Rating\"]", &mut env),
        Value::Number(80.0)
    );
}

#[test]
fn test_random_sentinels() {
    let host = Rc::new(RecordingHost {
        results: vec![3],
        ..RecordingHost::with_catalog()
    });
    let mut env = env_for(&host);
    assert_eq!(evaluate("info()[\"En_Title\"]", &mut env), Value::from("Ghost"));
    assert_eq!(evaluate("info(-1)[\"En_Title\"]", &mut env), Value::from("Ghost"));

    for _ in 0..10 {
        let id = evaluate("info(-2)[\"ItemId\"]", &mut env).to_string();
        assert!(["1", "2", "3"].contains(&id.as_str()), "{}", id);
    }
}

#[test]
fn test_thumbnail_gets_base() {
    let host = Rc::new(RecordingHost::with_catalog());
    let mut env = env_for(&host);
    assert_eq!(
        evaluate("meta(1)[\"Thumbnail\"]", &mut env),
        Value::from("http://localhost:8080/thumbnail/1")
    );
}

#[test]
fn test_results_and_children() {
    let host = Rc::new(RecordingHost::with_catalog());
    let mut env = env_for(&host);
    assert_eq!(
        evaluate("results() => arg0[\"En_Title\"]", &mut env),
        strs(&["Akira", "Ghost"])
    );
    assert_eq!(
        evaluate("children(1) => arg0[\"En_Title\"]", &mut env),
        strs(&["Akira 2"])
    );
    assert_eq!(evaluate("len(copies(1))", &mut env), Value::Number(0.0));
}

#[test]
fn test_quoted_code_reaches_host_lookups() {
    let host = Rc::new(RecordingHost::with_catalog());
    let mut env = env_for(&host);
    assert_eq!(
        evaluate("map(results(), \\(info(arg0)[\"En_Title\"]))", &mut env),
        strs(&["Akira", "Ghost"])
    );
    assert_eq!(
        evaluate("eval(\"user(1)[\\\"UserRating\\\"]\")", &mut env),
        Value::Number(9.0)
    );
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_edits_stay_private_until_saved() {
    let host = Rc::new(RecordingHost::with_catalog());
    let mut env = env_for(&host);

    evaluate("var e = user(1); set(e, \"Status\", \"Finished\")", &mut env);
    assert!(host.saved.borrow().is_empty());
    assert_eq!(evaluate("user(1)[\"Status\"]", &mut env), Value::from("Viewing"));

    assert_eq!(evaluate("save(e)", &mut env), Value::Number(0.0));
    let saved = host.saved.borrow();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].0, EntryKind::User);
    assert!(saved[0].1.contains(r#""Status":"Finished""#), "{}", saved[0].1);
    assert!(saved[0].1.contains(r#""ItemId":1"#), "{}", saved[0].1);
}

#[test]
fn test_protected_fields_refuse_writes() {
    let host = Rc::new(RecordingHost::with_catalog());
    let mut env = env_for(&host);
    assert_eq!(
        evaluate("var e = user(1); set(e, \"ItemId\", 5)", &mut env),
        Value::Number(0.0)
    );
    assert_eq!(evaluate("e[\"ItemId\"]", &mut env), Value::from("1"));
}

#[test]
fn test_failed_saves_report_one() {
    let host = Rc::new(RecordingHost {
        refuse_saves: true,
        ..RecordingHost::with_catalog()
    });
    let mut env = env_for(&host);
    assert_eq!(evaluate("save(user(1))", &mut env), Value::Number(1.0));
    assert_eq!(evaluate("save(5)", &mut env), Value::Number(1.0));
}

#[test]
fn test_wire_form_keeps_large_ids_exact() {
    let mut r = user(1);
    r.insert("ItemId".to_string(), json!(u64::MAX));
    let wire = serialize_record(&r).unwrap();
    assert!(wire.contains(r#""ItemId":18446744073709551615"#), "{}", wire);
}

// ============================================================================
// Search
// ============================================================================

#[test]
fn test_search_delivers_later() {
    let host = Rc::new(RecordingHost::with_catalog());
    let mut env = env_for(&host);

    let started = evaluate(
        "var found = [0]; search(\"akira\", let (xs) set(found, 0, len(xs)) rav)",
        &mut env,
    );
    assert_eq!(started, Value::Number(0.0));
    assert_eq!(evaluate("found[0]", &mut env), Value::Number(0.0));

    host.finish_searches();
    assert_eq!(evaluate("found[0]", &mut env), Value::Number(2.0));
}

#[test]
fn test_search_without_callback() {
    let host = Rc::new(RecordingHost::with_catalog());
    let mut env = env_for(&host);
    assert_eq!(evaluate("search(\"ghost\")", &mut env), Value::Number(0.0));
    host.finish_searches();
}

// ============================================================================
// Elements and downloads
// ============================================================================

#[test]
fn test_elements() {
    let host = Rc::new(RecordingHost::with_catalog());
    let mut env = env_for(&host);
    let rendered = evaluate(
        "var ul = elem(\"ul\"); var li = elem(\"li\"); set(li, \"innerText\", \"x\"); ul + li; str(ul)",
        &mut env,
    );
    assert_eq!(rendered, Value::from("<ul><li>x</li></ul>"));
    assert_eq!(evaluate("query(\"#main\")", &mut env), Value::Number(0.0));
}

#[test]
fn test_download_defaults() {
    let host = Rc::new(RecordingHost::with_catalog());
    let mut env = env_for(&host);
    assert_eq!(
        evaluate("download(\"a,b\", \"out.csv\", \"text/csv\"); download(\"x\")", &mut env),
        Value::Number(0.0)
    );
    let downloads = host.downloads.borrow();
    assert_eq!(
        downloads[0],
        ("a,b".to_string(), "out.csv".to_string(), "text/csv".to_string())
    );
    assert_eq!(downloads[1].1, "download.txt");
    assert_eq!(downloads[1].2, "text/plain");
}

// ============================================================================
// Host values
// ============================================================================

#[test]
fn test_host_records_become_entries() {
    let value = from_host_value(HostValue::List(vec![
        HostValue::Json(serde_json::Value::Object(info(1, "Akira", None))),
        HostValue::Json(json!({"plain": true})),
    ]));
    let items = value.items();
    assert!(matches!(&items[0], Value::Entry(e) if e.kind() == EntryKind::Info));
    assert_eq!(items[1].get_attribute(&Value::from("plain")), Value::Number(1.0));
}

#[test]
fn test_entry_classification_prefers_info() {
    let mut both = info(1, "Akira", None);
    both.extend(meta(1));
    assert_eq!(Entry::classify(&both).map(|e| e.kind()), Some(EntryKind::Info));
}
