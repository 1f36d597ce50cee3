//! Conversions between host data and script values.

use std::rc::Rc;

use crate::{
    host::{ElementRef, Entry},
    value::{Function, Value},
};

/// Native function offered by a host, speaking plain JSON.
pub type HostCallable = Rc<dyn Fn(Vec<serde_json::Value>) -> HostValue>;

/// Anything a host may hand to a script.
#[derive(Clone)]
pub enum HostValue {
    Json(serde_json::Value),
    Element(ElementRef),
    List(Vec<HostValue>),
    Callable { name: String, func: HostCallable },
}

impl From<serde_json::Value> for HostValue {
    fn from(json: serde_json::Value) -> Self {
        HostValue::Json(json)
    }
}

/// Converts a host value, classifying records by shape.
///
/// Callables are wrapped so that script arguments reach them as JSON and
/// their results come back converted.
pub fn from_host_value(value: HostValue) -> Value {
    match value {
        HostValue::Json(json) => json_to_value(json),
        HostValue::Element(element) => Value::Element(element),
        HostValue::List(items) => Value::array(items.into_iter().map(from_host_value).collect()),
        HostValue::Callable { name, func } => Value::Function(Function::native(&name, move |args| {
            let json_args = args.iter().map(value_to_json).collect();
            from_host_value(func(json_args))
        })),
    }
}

/// Convert serde_json::Value to a script Value
///
/// `null` becomes `0` and booleans become `1`/`0`; objects shaped like
/// catalog records become entries.
pub fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Number(0.0),
        serde_json::Value::Bool(b) => Value::Number(if b { 1.0 } else { 0.0 }),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => {
            Value::array(items.into_iter().map(json_to_value).collect())
        }
        serde_json::Value::Object(map) => match Entry::classify(&map) {
            Some(entry) => Value::Entry(entry),
            None => Value::object(
                map.into_iter()
                    .map(|(k, v)| (k, json_to_value(v)))
                    .collect(),
            ),
        },
    }
}

/// Convert a script Value to serde_json::Value
///
/// Integral numbers become JSON integers, NaN and infinities become `null`,
/// and values with no JSON shape become their string form.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Number(n) => number_to_json(*n),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(items) => {
            serde_json::Value::Array(items.borrow().iter().map(value_to_json).collect())
        }
        Value::Object(map) => serde_json::Value::Object(
            map.borrow()
                .iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
        Value::Entry(entry) => serde_json::Value::Object(entry.record()),
        Value::Function(_) | Value::Code(_) | Value::Element(_) => {
            serde_json::Value::String(value.to_string())
        }
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    // 2^63, the first integral double outside i64
    const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

    if n.fract() == 0.0 && n.abs() < I64_LIMIT {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integral_numbers_stay_integers() {
        assert_eq!(value_to_json(&Value::Number(3.0)), json!(3));
        assert_eq!(value_to_json(&Value::Number(0.5)), json!(0.5));
        assert_eq!(value_to_json(&Value::Number(f64::NAN)), json!(null));
    }

    #[test]
    fn host_callables_speak_json() {
        let callable = HostValue::Callable {
            name: "count".to_string(),
            func: Rc::new(|args| HostValue::Json(json!(args.len()))),
        };
        let f = from_host_value(callable);
        assert_eq!(
            f.call(vec![Value::from("a"), Value::from("b")]),
            Value::Number(2.0)
        );
    }
}
