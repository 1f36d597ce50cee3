//! Runtime values and their operators.
//!
//! Every variant answers the same operator surface: arithmetic, comparison,
//! call, and attribute get/set. An operator a variant does not support never
//! aborts the script. It logs a diagnostic through `tracing` and returns a
//! fixed fallback:
//!
//! | operation                         | fallback                 |
//! |-----------------------------------|--------------------------|
//! | `add`, `sub`, `mul`, `div`        | the right operand        |
//! | `less_than`, `greater_than`, `equals` | `0`                  |
//! | `call`                            | the receiver             |
//! | `get_attribute`, `set_attribute`  | `0`                      |
//!
//! Comparisons produce numbers: `1` for true, `0` for false.

use std::{cell::RefCell, collections::HashMap, fmt, rc::Rc};

use tracing::warn;

use crate::{
    ast::Program,
    environment::Environment,
    evaluator::{Evaluator, evaluate_program},
    host::{ElementRef, Entry},
    output::to_json,
};

/// Longest string `*` will build, in bytes.
pub const MAX_STRING_LEN: usize = 1 << 24;

/// Most zero elements a single `set` may pad an array with.
pub const MAX_ARRAY_PADDING: usize = 1 << 16;

pub type Array = Rc<RefCell<Vec<Value>>>;
pub type Object = Rc<RefCell<HashMap<String, Value>>>;

/// Signature of built-in functions.
pub type NativeFn = dyn Fn(Vec<Value>) -> Value;

/// A value of the calculator language.
///
/// Arrays and objects are shared handles: copies of a value see each other's
/// writes, which is what `set(...)` relies on.
#[derive(Debug, Clone)]
pub enum Value {
    /// Double-precision number
    Number(f64),

    /// UTF-8 string
    String(String),

    /// Ordered, mutable sequence
    Array(Array),

    /// String-keyed map
    Object(Object),

    /// Built-in or user-defined function
    Function(Function),

    /// Quoted program, evaluated only on call or `eval`
    Code(Code),

    /// Handle to a host UI node
    Element(ElementRef),

    /// Copy of a host catalog record
    Entry(Entry),
}

/// Callable value: a native routine or a closure over a snapshot environment.
#[derive(Clone)]
pub enum Function {
    Native { name: Rc<str>, func: Rc<NativeFn> },
    Closure(Rc<Closure>),
}

/// A user-defined function.
///
/// `env` is a copy of the defining environment taken when the definition was
/// evaluated; later changes to the defining scope are not visible here.
#[derive(Debug)]
pub struct Closure {
    pub name: String,
    pub anonymous: bool,
    pub params: Vec<String>,
    pub body: Rc<Program>,
    pub env: Environment,
}

/// A quoted program together with the built-ins it was quoted under.
///
/// Running code starts from an environment holding only those built-ins:
/// script variables of the quoting scope are not visible, host functions are.
#[derive(Clone)]
pub struct Code {
    program: Rc<Program>,
    scope: Environment,
}

impl Code {
    pub fn new(program: Rc<Program>, scope: &Environment) -> Self {
        Code {
            program,
            scope: scope.fresh(),
        }
    }

    pub fn program(&self) -> &Rc<Program> {
        &self.program
    }

    /// Runs the program with `arg0`, `arg1`, ... bound to `args`.
    pub fn run(&self, args: Vec<Value>) -> Value {
        let mut env = self.scope.fresh();
        for (i, arg) in args.into_iter().enumerate() {
            env.set(format!("arg{}", i), arg);
        }
        evaluate_program(&self.program, &mut env)
    }
}

impl fmt::Debug for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Code({})", self.program)
    }
}

impl PartialEq for Code {
    fn eq(&self, other: &Code) -> bool {
        self.program == other.program
    }
}

impl Function {
    pub fn native(name: &str, func: impl Fn(Vec<Value>) -> Value + 'static) -> Self {
        Function::Native {
            name: Rc::from(name),
            func: Rc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Function::Native { name, .. } => name,
            Function::Closure(closure) => &closure.name,
        }
    }

    pub fn call(&self, args: Vec<Value>) -> Value {
        match self {
            Function::Native { func, .. } => func(args),
            Function::Closure(closure) => {
                let mut env = closure.env.copy();
                if !closure.anonymous {
                    env.set(closure.name.clone(), Value::Function(self.clone()));
                }
                for (i, arg) in args.into_iter().enumerate() {
                    if let Some(param) = closure.params.get(i) {
                        env.set(param.clone(), arg.clone());
                    }
                    env.set(format!("arg{}", i), arg);
                }
                Evaluator::new(&mut env).eval_program(&closure.body)
            }
        }
    }

    fn ptr_eq(&self, other: &Function) -> bool {
        match (self, other) {
            (Function::Native { func: a, .. }, Function::Native { func: b, .. }) => {
                Rc::ptr_eq(a, b)
            }
            (Function::Closure(a), Function::Closure(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Native { name, .. } => write!(f, "Native({})", name),
            Function::Closure(closure) => write!(f, "Closure({})", closure.name),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Native { name, .. } => write!(f, "[builtin {}]", name),
            Function::Closure(closure) => {
                f.write_str("fun ")?;
                if !closure.anonymous {
                    f.write_str(&closure.name)?;
                }
                write!(f, "({}) = {} rav", closure.params.join(", "), closure.body)
            }
        }
    }
}

/// Formats a number the way scripts expect to see it: no trailing `.0`,
/// `NaN`, `Infinity`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

/// Reads a number out of text: surrounding whitespace is ignored, empty text
/// is zero, and anything else unparsable is NaN.
pub fn parse_number(text: &str) -> f64 {
    let t = text.trim();
    match t {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if t
            .chars()
            .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') =>
        {
            f64::NAN
        }
        _ => t.parse().unwrap_or(f64::NAN),
    }
}

fn bool_value(b: bool) -> Value {
    Value::Number(if b { 1.0 } else { 0.0 })
}

/// Non-negative integral key, for indexing.
fn index_of(key: &Value) -> Option<usize> {
    let n = match key {
        Value::Number(n) => *n,
        Value::String(s) => parse_number(s),
        _ => return None,
    };
    (n >= 0.0 && n.fract() == 0.0 && n.is_finite()).then_some(n as usize)
}

impl Value {
    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(map: HashMap<String, Value>) -> Value {
        Value::Object(Rc::new(RefCell::new(map)))
    }

    pub fn string(s: impl Into<String>) -> Value {
        Value::String(s.into())
    }

    pub fn native(name: &str, func: impl Fn(Vec<Value>) -> Value + 'static) -> Value {
        Value::Function(Function::native(name, func))
    }

    /// Quoted code running against the standard library.
    pub fn code(program: Program) -> Value {
        Value::Code(Code::new(Rc::new(program), &Environment::new()))
    }

    /// Human-readable type name for diagnostics and `type(...)`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
            Value::Code(_) => "code",
            Value::Element(_) => "element",
            Value::Entry(_) => "entry",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Value::String(s) => s.chars().count(),
            Value::Array(items) => items.borrow().len(),
            Value::Object(map) => map.borrow().len(),
            Value::Code(code) => code.program().len(),
            Value::Entry(entry) => entry.field_count(),
            Value::Number(_) | Value::Function(_) | Value::Element(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Truthiness for conditions and filters.
    ///
    /// Code is truthy if running it with no arguments yields a truthy value,
    /// so testing code runs it.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.borrow().is_empty(),
            Value::Object(map) => !map.borrow().is_empty(),
            Value::Code(code) => code.run(Vec::new()).is_truthy(),
            Value::Function(_) | Value::Element(_) | Value::Entry(_) => true,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::String(s) => parse_number(s),
            Value::Array(items) => items.borrow().iter().map(Value::to_number).sum(),
            _ => f64::NAN,
        }
    }

    /// The elements of an array-like value, read through `len` and indexing.
    pub fn items(&self) -> Vec<Value> {
        match self {
            Value::Array(items) => items.borrow().clone(),
            Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
            other => (0..other.len())
                .map(|i| other.get_attribute(&Value::Number(i as f64)))
                .collect(),
        }
    }

    pub fn add(&self, right: &Value) -> Value {
        match (self, right) {
            (Value::Number(a), r) => Value::Number(a + r.to_number()),
            (Value::String(a), r) => Value::String(format!("{}{}", a, r)),
            (Value::Array(a), Value::Array(b)) => {
                let mut items = a.borrow().clone();
                items.extend(b.borrow().iter().cloned());
                Value::array(items)
            }
            (Value::Array(a), r) => {
                let mut items = a.borrow().clone();
                items.push(r.clone());
                Value::array(items)
            }
            (Value::Code(a), Value::Code(b)) => {
                let statements = a
                    .program()
                    .statements
                    .iter()
                    .chain(&b.program().statements)
                    .cloned()
                    .collect();
                Value::Code(Code::new(Rc::new(Program::new(statements)), &a.scope))
            }
            (Value::Element(parent), Value::Element(child)) => {
                parent.append_child(child.clone());
                self.clone()
            }
            _ => unsupported("add", self, right),
        }
    }

    pub fn sub(&self, right: &Value) -> Value {
        match (self, right) {
            (Value::Number(a), r) => Value::Number(a - r.to_number()),
            (Value::String(a), r) => {
                let needle = r.to_string();
                if needle.is_empty() {
                    self.clone()
                } else {
                    Value::String(a.replace(&needle, ""))
                }
            }
            _ => unsupported("subtract", self, right),
        }
    }

    pub fn mul(&self, right: &Value) -> Value {
        match (self, right) {
            (Value::Number(a), r) => Value::Number(a * r.to_number()),
            (Value::String(a), r) => {
                let n = r.to_number();
                if !(n.is_finite() && n > 0.0) {
                    return Value::String(String::new());
                }
                let times = n as usize;
                match a.len().checked_mul(times) {
                    Some(total) if total <= MAX_STRING_LEN => Value::String(a.repeat(times)),
                    _ => {
                        warn!(
                            "refusing to repeat a string of {} bytes {} times",
                            a.len(),
                            format_number(n)
                        );
                        right.clone()
                    }
                }
            }
            _ => unsupported("multiply", self, right),
        }
    }

    pub fn div(&self, right: &Value) -> Value {
        match (self, right) {
            (Value::Number(a), r) => Value::Number(a / r.to_number()),
            _ => unsupported("divide", self, right),
        }
    }

    pub fn less_than(&self, right: &Value) -> Value {
        match (self, right) {
            (Value::Number(a), r) => bool_value(*a < r.to_number()),
            (Value::String(a), Value::String(b)) => bool_value(a < b),
            (Value::String(_), r) => bool_value(self.to_number() < r.to_number()),
            _ => unsupported_comparison("<", self, right),
        }
    }

    pub fn greater_than(&self, right: &Value) -> Value {
        match (self, right) {
            (Value::Number(a), r) => bool_value(*a > r.to_number()),
            (Value::String(a), Value::String(b)) => bool_value(a > b),
            (Value::String(_), r) => bool_value(self.to_number() > r.to_number()),
            _ => unsupported_comparison(">", self, right),
        }
    }

    pub fn equals(&self, right: &Value) -> Value {
        match (self, right) {
            (Value::Number(a), r) => bool_value(*a == r.to_number()),
            (Value::String(a), r) => bool_value(*a == r.to_string()),
            (Value::Array(_), Value::Array(_))
            | (Value::Object(_), Value::Object(_))
            | (Value::Entry(_), Value::Entry(_))
            | (Value::Function(_), Value::Function(_))
            | (Value::Code(_), Value::Code(_))
            | (Value::Element(_), Value::Element(_)) => bool_value(self == right),
            (Value::Array(_) | Value::Object(_) | Value::Entry(_), _) => bool_value(false),
            _ => unsupported_comparison("==", self, right),
        }
    }

    /// Calls the value.
    ///
    /// - Numbers scale: `3(4)` is `12`.
    /// - Code runs over its built-ins with `arg0`, `arg1`, ... bound.
    /// - Objects and entries walk nested keys: `o("a", "b")` reads `o["a"]["b"]`.
    pub fn call(&self, args: Vec<Value>) -> Value {
        match self {
            Value::Number(n) if args.len() == 1 => Value::Number(n * args[0].to_number()),
            Value::Function(func) => func.call(args),
            Value::Code(code) => code.run(args),
            Value::Object(_) | Value::Entry(_) => args
                .iter()
                .fold(self.clone(), |current, key| current.get_attribute(key)),
            _ => {
                warn!(
                    "cannot call {} with {} argument(s)",
                    self.type_name(),
                    args.len()
                );
                self.clone()
            }
        }
    }

    pub fn get_attribute(&self, key: &Value) -> Value {
        let found = match self {
            Value::String(s) => index_of(key)
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::String(c.to_string())),
            Value::Array(items) => index_of(key).and_then(|i| items.borrow().get(i).cloned()),
            Value::Object(map) => map.borrow().get(&key.to_string()).cloned(),
            Value::Entry(entry) => entry.get(&key.to_string()),
            Value::Element(element) => element.get_attribute(&key.to_string()).map(Value::String),
            Value::Number(_) | Value::Function(_) | Value::Code(_) => None,
        };

        found.unwrap_or_else(|| {
            warn!("{} has no attribute {}", self.type_name(), key);
            Value::Number(0.0)
        })
    }

    /// Writes an attribute, returning the written value.
    ///
    /// Writing past the end of an array pads it with zeros, at most
    /// [`MAX_ARRAY_PADDING`] of them.
    pub fn set_attribute(&self, key: &Value, value: Value) -> Value {
        match self {
            Value::Array(items) => {
                let Some(i) = index_of(key) else {
                    warn!("cannot index array with {}", key);
                    return Value::Number(0.0);
                };
                let mut items = items.borrow_mut();
                if i >= items.len() {
                    if i - items.len() > MAX_ARRAY_PADDING {
                        warn!(
                            "index {} is too far past the end of an array of {}",
                            key,
                            items.len()
                        );
                        return Value::Number(0.0);
                    }
                    items.resize(i + 1, Value::Number(0.0));
                }
                items[i] = value.clone();
                value
            }
            Value::Object(map) => {
                map.borrow_mut().insert(key.to_string(), value.clone());
                value
            }
            Value::Entry(entry) => {
                if entry.set(&key.to_string(), &value) {
                    value
                } else {
                    Value::Number(0.0)
                }
            }
            Value::Element(element) => {
                element.set_attribute(&key.to_string(), &value.to_string());
                value
            }
            _ => {
                warn!("cannot set attribute {} on {}", key, self.type_name());
                Value::Number(0.0)
            }
        }
    }
}

fn unsupported(op: &str, left: &Value, right: &Value) -> Value {
    warn!(
        "unable to {} {} and {}",
        op,
        left.type_name(),
        right.type_name()
    );
    right.clone()
}

fn unsupported_comparison(op: &str, left: &Value, right: &Value) -> Value {
    warn!(
        "unable to compare {} {} {}",
        left.type_name(),
        op,
        right.type_name()
    );
    Value::Number(0.0)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                for item in items.borrow().iter() {
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Value::Object(_) | Value::Entry(_) => f.write_str(&to_json(self)),
            Value::Function(func) => write!(f, "{}", func),
            Value::Code(code) => write!(f, "{}", code.program),
            Value::Element(element) => f.write_str(&element.render()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Code(a), Value::Code(b)) => a == b,
            (Value::Element(a), Value::Element(b)) => Rc::ptr_eq(a, b),
            (Value::Entry(a), Value::Entry(b)) => a == b,
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}
