//! Causeway — value marshalling between an embedding script runtime and
//! native code
//!
//! This library provides the complete boundary layer:
//! - A portable tagged attribute-list representation of runtime values
//! - Bidirectional encoding and decoding, including nested aggregates
//! - A reference-counted callback handle table for script functions that
//!   outlive a single call
//! - Cookie-based method dispatch on wrapped native objects
//! - Exception construction by registered type name
//! - An event-loop liveness refcount balanced against every hold

/// Bridge library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Public API modules
pub mod attr;
pub mod bridge;
pub mod config;
pub mod error;
pub mod eventloop;
pub mod value;

// Re-export commonly used types
pub use attr::{AttrList, AttrValue, TypeTag};
pub use bridge::callbacks::{CallbackTable, Token};
pub use bridge::exception::{ExceptionCtor, ExceptionRegistry, GENERIC_EXCEPTION};
pub use bridge::objects::{NativeObject, ObjectCookie, ObjectRegistry};
pub use bridge::Bridge;
pub use config::{BridgeConfig, ConfigError};
pub use error::{BridgeError, EncodeError, ErrorCode, Fault};
pub use eventloop::LoopHandle;
pub use value::{ScriptFunction, Shared, Value, ValueArray, ValueObject};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoke() {
        // Smoke test to verify the crate builds and tests run
        assert_eq!(VERSION, "0.1.0");
    }
}
