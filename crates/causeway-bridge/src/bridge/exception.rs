//! Exception constructor registry
//!
//! Runtime exception objects are built by name through an explicit registry
//! of constructor closures, seeded at startup with the standard types. An
//! unknown type name falls back to the generic constructor; only a registry
//! with no generic constructor at all is treated as broken.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::value::{Value, ValueObject};

/// The generic exception type every registry must be able to construct.
pub const GENERIC_EXCEPTION: &str = "Error";

/// Constructor closure: message in, exception object out.
pub type ExceptionCtor = Arc<dyn Fn(&str) -> Value + Send + Sync>;

/// Name → constructor registry.
pub struct ExceptionRegistry {
    ctors: Mutex<HashMap<String, ExceptionCtor>>,
}

fn standard_ctor(type_name: &'static str) -> ExceptionCtor {
    Arc::new(move |message: &str| {
        let mut exc = ValueObject::new();
        exc.insert("name", Value::string(type_name));
        exc.insert("message", Value::string(message));
        Value::Object(exc)
    })
}

impl ExceptionRegistry {
    /// An empty registry. Useful only for embedders that supply every
    /// constructor themselves, including the generic one.
    pub fn new() -> Self {
        ExceptionRegistry {
            ctors: Mutex::new(HashMap::new()),
        }
    }

    /// A registry seeded with the standard constructors.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        for type_name in [
            "Error",
            "TypeError",
            "RangeError",
            "ReferenceError",
            "SyntaxError",
        ] {
            registry.register(type_name, standard_ctor(type_name));
        }
        registry
    }

    /// Register (or replace) a constructor for a type name.
    pub fn register(&self, type_name: impl Into<String>, ctor: ExceptionCtor) {
        self.ctors
            .lock()
            .expect("exception registry lock poisoned")
            .insert(type_name.into(), ctor);
    }

    /// Construct an exception of the named type, or None if no constructor
    /// is registered under that name.
    pub fn construct(&self, type_name: &str, message: &str) -> Option<Value> {
        let ctors = self.ctors.lock().expect("exception registry lock poisoned");
        let ctor = ctors.get(type_name)?.clone();
        drop(ctors);
        Some(ctor(message))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.ctors
            .lock()
            .expect("exception registry lock poisoned")
            .contains_key(type_name)
    }
}

impl Default for ExceptionRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for ExceptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ctors = self.ctors.lock().expect("exception registry lock poisoned");
        let mut names: Vec<&String> = ctors.keys().collect();
        names.sort();
        f.debug_struct("ExceptionRegistry")
            .field("types", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_the_standard_types() {
        let registry = ExceptionRegistry::with_defaults();
        for type_name in ["Error", "TypeError", "RangeError", "ReferenceError", "SyntaxError"] {
            assert!(registry.contains(type_name), "{type_name} missing");
        }
    }

    #[test]
    fn test_construct_carries_name_and_message() {
        let registry = ExceptionRegistry::with_defaults();
        let exc = registry.construct("TypeError", "wrong kind").unwrap();
        let Value::Object(obj) = exc else {
            panic!("expected object exception");
        };
        assert_eq!(obj.get("name"), Some(&Value::string("TypeError")));
        assert_eq!(obj.get("message"), Some(&Value::string("wrong kind")));
    }

    #[test]
    fn test_unknown_type_yields_none() {
        let registry = ExceptionRegistry::with_defaults();
        assert!(registry.construct("FancyError", "m").is_none());
    }

    #[test]
    fn test_custom_constructor_registration() {
        let registry = ExceptionRegistry::with_defaults();
        registry.register(
            "LockError",
            Arc::new(|message: &str| {
                let mut exc = ValueObject::new();
                exc.insert("name", Value::string("LockError"));
                exc.insert("message", Value::string(message));
                exc.insert("retryable", Value::Bool(true));
                Value::Object(exc)
            }),
        );
        let exc = registry.construct("LockError", "contended").unwrap();
        let Value::Object(obj) = exc else {
            panic!("expected object exception");
        };
        assert_eq!(obj.get("retryable"), Some(&Value::Bool(true)));
    }
}
