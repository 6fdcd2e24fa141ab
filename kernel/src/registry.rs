//! Tool Registry (thin adapter, §6). Name -> handler mapping used by C5
//! during `EXECUTING`. Lookup order never feeds a hash, so an ordinary
//! `HashMap` is fine here — unlike everything in `physics`, registry
//! membership is not part of the kernel's determinism surface.

use std::collections::HashMap;

use crate::compat::BTreeMap;
use crate::physics::canonical::Value;

/// A tool handler. Must be deterministic given its inputs (§6); the kernel
/// has no way to enforce that beyond this contract — non-determinism here
/// is a spec violation, not a kernel bug.
pub trait Handler: Send + Sync {
    fn call(&self, params: &BTreeMap<String, Value>) -> Result<Value, String>;
}

impl<F> Handler for F
where
    F: Fn(&BTreeMap<String, Value>) -> Result<Value, String> + Send + Sync,
{
    fn call(&self, params: &BTreeMap<String, Value>) -> Result<Value, String> {
        self(params)
    }
}

#[derive(Default)]
pub struct ToolRegistry {
    handlers: HashMap<String, Box<dyn Handler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        ToolRegistry {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, handler: impl Handler + 'static) {
        self.handlers.insert(name.into(), Box::new(handler));
    }

    pub fn lookup(&self, name: &str) -> Option<&dyn Handler> {
        self.handlers.get(name).map(|b| b.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_of_unregistered_name_is_none() {
        let r = ToolRegistry::new();
        assert!(r.lookup("nope").is_none());
    }

    #[test]
    fn registered_handler_is_invoked() {
        let mut r = ToolRegistry::new();
        r.register("echo", |params: &BTreeMap<String, Value>| {
            Ok(params
                .get("message")
                .cloned()
                .unwrap_or(Value::Null))
        });
        let mut params = BTreeMap::new();
        params.insert("message".to_string(), Value::str("hi"));
        let result = r.lookup("echo").unwrap().call(&params).unwrap();
        assert_eq!(result, Value::str("hi"));
    }

    #[test]
    fn handler_error_is_surfaced_as_recoverable_string() {
        let mut r = ToolRegistry::new();
        r.register("boom", |_: &BTreeMap<String, Value>| {
            Err("kaboom".to_string())
        });
        let err = r.lookup("boom").unwrap().call(&BTreeMap::new()).unwrap_err();
        assert_eq!(err, "kaboom");
    }
}
