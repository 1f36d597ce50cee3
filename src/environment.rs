use std::{
    cell::RefCell,
    collections::HashMap,
    rc::{Rc, Weak},
};

use crate::{
    builtins,
    convert::json_to_value,
    host::{self, HostConfig},
    value::{Function, Value},
};

/// Name bound to the most recently evaluated value.
pub const LAST_VALUE: &str = "_1";

/// Name bound to the running value of a `->` pipeline.
pub const PIPE_VALUE: &str = "_";

type BuiltinTable = Rc<RefCell<HashMap<String, Value>>>;

/// Name-to-value bindings for one evaluation.
///
/// Script bindings and built-ins are kept apart. Copying an environment
/// copies the script bindings, not the values: arrays and objects stay
/// shared, but a later `var` in one copy is invisible in the other. Closures
/// rely on this. The built-in table is shared by every copy and every
/// [`fresh`](Environment::fresh) scope, so functions a host registers are
/// reachable from closures and quoted code alike.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    bindings: HashMap<String, Value>,
    builtins: BuiltinTable,
}

impl Environment {
    /// An environment with the standard library registered.
    pub fn new() -> Self {
        let mut env = Environment::empty();
        builtins::register_stdlib(&mut env);
        env
    }

    /// An environment with no bindings at all.
    pub fn empty() -> Self {
        Environment::default()
    }

    /// The standard library plus the bridges to `config.host`.
    pub fn with_host(config: HostConfig) -> Self {
        let mut env = Environment::new();
        host::register_host(&mut env, config);
        env
    }

    /// Binds every field of `object` on top of the standard library.
    ///
    /// A field named like an existing binding is bound with a `2` suffix
    /// instead, so `len` arrives as `len2` and `len()` keeps working.
    pub fn from_json_object(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut env = Environment::new();
        env.bind_json_object(object);
        env
    }

    pub fn bind_json_object(&mut self, object: &serde_json::Map<String, serde_json::Value>) {
        for (name, value) in object {
            let name = if self.contains(name) {
                format!("{}2", name)
            } else {
                name.clone()
            };
            self.set(name, json_to_value(value.clone()));
        }
    }

    /// Looks up `name`, preferring script bindings over built-ins.
    pub fn get(&self, name: &str) -> Option<Value> {
        match self.bindings.get(name) {
            Some(value) => Some(value.clone()),
            None => self.builtins.borrow().get(name).cloned(),
        }
    }

    /// Binds `name` in this environment, shadowing any built-in.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    /// Removes a script binding. Built-ins are only ever shadowed, so a
    /// deleted shadow uncovers the built-in again.
    pub fn delete(&mut self, name: &str) -> Option<Value> {
        self.bindings.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name) || self.builtins.borrow().contains_key(name)
    }

    /// Shallow snapshot of every script binding.
    pub fn copy(&self) -> Environment {
        self.clone()
    }

    /// An environment with the same built-ins and no script bindings.
    pub fn fresh(&self) -> Environment {
        Environment {
            bindings: HashMap::new(),
            builtins: Rc::clone(&self.builtins),
        }
    }

    /// Binds a native function under `name`.
    pub fn register_builtin(&mut self, name: &str, func: impl Fn(Vec<Value>) -> Value + 'static) {
        self.bindings.remove(name);
        self.builtins
            .borrow_mut()
            .insert(name.to_string(), Value::Function(Function::native(name, func)));
    }

    pub(crate) fn builtins_ref(&self) -> BuiltinsRef {
        BuiltinsRef(Rc::downgrade(&self.builtins))
    }

    /// Bound names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .bindings
            .keys()
            .chain(self.builtins.borrow().keys())
            .cloned()
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// A handle to an environment's built-ins that does not keep them alive.
///
/// Natives stored in the table hold one of these rather than the table
/// itself, so the table never owns a reference to itself.
#[derive(Debug, Clone)]
pub(crate) struct BuiltinsRef(Weak<RefCell<HashMap<String, Value>>>);

impl BuiltinsRef {
    /// A fresh scope over the referenced built-ins, or over the standard
    /// library alone once they are gone.
    pub(crate) fn fresh(&self) -> Environment {
        match self.0.upgrade() {
            Some(builtins) => Environment {
                bindings: HashMap::new(),
                builtins,
            },
            None => Environment::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Environment;
    use crate::value::Value;
    use serde_json::json;

    #[test]
    fn test_get_set_delete() {
        let mut env = Environment::empty();
        assert!(env.get("hi").is_none());

        env.set("hi", Value::Number(1.0));
        assert_eq!(env.get("hi"), Some(Value::Number(1.0)));

        assert_eq!(env.delete("hi"), Some(Value::Number(1.0)));
        assert!(env.get("hi").is_none());
    }

    #[test]
    fn test_copy_is_a_snapshot() {
        let mut env = Environment::empty();
        env.set("x", Value::Number(1.0));
        let snapshot = env.copy();
        env.set("x", Value::Number(2.0));
        assert_eq!(snapshot.get("x"), Some(Value::Number(1.0)));
    }

    #[test]
    fn test_colliding_fields_are_suffixed() {
        let fields = json!({"len": 3, "title": "x"});
        let env = Environment::from_json_object(fields.as_object().unwrap());
        assert_eq!(env.get("len2"), Some(Value::Number(3.0)));
        assert_eq!(env.get("title"), Some(Value::from("x")));
        assert!(matches!(env.get("len"), Some(Value::Function(_))));
    }

    #[test]
    fn test_builtins_survive_in_fresh_scopes() {
        let mut env = Environment::new();
        env.set("x", Value::Number(1.0));
        env.register_builtin("seven", |_| Value::Number(7.0));

        let fresh = env.fresh();
        assert!(fresh.get("x").is_none());
        assert!(matches!(fresh.get("seven"), Some(Value::Function(_))));
        assert!(matches!(fresh.get("len"), Some(Value::Function(_))));
    }

    #[test]
    fn test_shadowed_builtin_returns_after_delete() {
        let mut env = Environment::new();
        env.set("len", Value::Number(2.0));
        assert_eq!(env.get("len"), Some(Value::Number(2.0)));
        env.delete("len");
        assert!(matches!(env.get("len"), Some(Value::Function(_))));
    }
}
