//! JSON rendering of script values for host interchange.
//!
//! Output is deterministic (object keys are sorted) and safe for readers
//! that hold every number in a double:
//!
//! - **Identifier fields** (`ItemId`, `ParentId`, `CopyOf`, `Library`,
//!   `Requires`) are always quoted strings.
//! - **Integers beyond 2^53** anywhere else are quoted too.
//! - **Compact output** via [`to_json()`], **pretty output** via
//!   [`to_json_pretty()`] with 2-space indentation.
//!
//! # Examples
//!
//! ```
//! use aiol_lang::{Environment, evaluate};
//! use aiol_lang::output::to_json;
//!
//! let mut env = Environment::new();
//! let value = evaluate("[1, \"two\", 0.5]", &mut env);
//! assert_eq!(to_json(&value), r#"[1,"two",0.5]"#);
//! ```

use crate::{convert::value_to_json, host::ID_FIELDS, value::Value};

const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0; // 2^53

pub struct JsonPrinter {
    pretty: bool,
}

impl JsonPrinter {
    pub fn new(pretty: bool) -> Self {
        JsonPrinter { pretty }
    }

    pub fn print(&self, value: &Value) -> String {
        self.print_json(&value_to_json(value), false, 0)
    }

    fn print_json(&self, value: &serde_json::Value, quote_number: bool, indent: usize) -> String {
        match value {
            serde_json::Value::Null => "null".to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Number(n) => {
                let lossy = n.as_f64().is_some_and(|f| f.abs() > EXACT_INTEGER_LIMIT)
                    && (n.is_u64() || n.is_i64());
                if quote_number || lossy {
                    format!("\"{}\"", n)
                } else {
                    n.to_string()
                }
            }
            serde_json::Value::String(s) => format!("\"{}\"", self.escape_string(s)),
            serde_json::Value::Array(arr) => self.print_array(arr, indent),
            serde_json::Value::Object(obj) => self.print_object(obj, indent),
        }
    }

    fn print_array(&self, arr: &[serde_json::Value], indent: usize) -> String {
        if arr.is_empty() {
            return "[]".to_string();
        }

        if self.pretty {
            let items: Vec<String> = arr
                .iter()
                .map(|v| {
                    format!(
                        "{}{}",
                        self.indent(indent + 1),
                        self.print_json(v, false, indent + 1)
                    )
                })
                .collect();
            format!("[\n{}\n{}]", items.join(",\n"), self.indent(indent))
        } else {
            let items: Vec<String> = arr
                .iter()
                .map(|v| self.print_json(v, false, indent))
                .collect();
            format!("[{}]", items.join(","))
        }
    }

    fn print_object(
        &self,
        obj: &serde_json::Map<String, serde_json::Value>,
        indent: usize,
    ) -> String {
        if obj.is_empty() {
            return "{}".to_string();
        }

        // Sort keys for deterministic output
        let mut fields: Vec<_> = obj.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));

        let items = fields.iter().map(|(k, v)| {
            let is_id = ID_FIELDS.contains(&k.as_str());
            if self.pretty {
                format!(
                    "{}\"{}\": {}",
                    self.indent(indent + 1),
                    self.escape_string(k),
                    self.print_json(v, is_id, indent + 1)
                )
            } else {
                format!(
                    "\"{}\":{}",
                    self.escape_string(k),
                    self.print_json(v, is_id, indent)
                )
            }
        });

        if self.pretty {
            format!(
                "{{\n{}\n{}}}",
                items.collect::<Vec<_>>().join(",\n"),
                self.indent(indent)
            )
        } else {
            format!("{{{}}}", items.collect::<Vec<_>>().join(","))
        }
    }

    fn indent(&self, level: usize) -> String {
        "  ".repeat(level)
    }

    fn escape_string(&self, s: &str) -> String {
        s.chars()
            .flat_map(|c| match c {
                '"' => vec!['\\', '"'],
                '\\' => vec!['\\', '\\'],
                '\n' => vec!['\\', 'n'],
                '\r' => vec!['\\', 'r'],
                '\t' => vec!['\\', 't'],
                c if c.is_control() => format!("\\u{:04x}", c as u32).chars().collect(),
                c => vec![c],
            })
            .collect()
    }
}

/// Converts a Value to compact JSON.
pub fn to_json(value: &Value) -> String {
    JsonPrinter::new(false).print(value)
}

/// Converts a Value to JSON with 2-space indentation and one element or
/// property per line.
pub fn to_json_pretty(value: &Value) -> String {
    JsonPrinter::new(true).print(value)
}
