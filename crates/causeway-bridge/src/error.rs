//! Bridge error model
//!
//! Two tiers, two types:
//! - `EncodeError`: classification failures while encoding a runtime value —
//!   recoverable, attributed to the offending attribute name. The caller
//!   decides whether to abort the encode or substitute a default.
//! - `Fault`: internal invariant violations (unknown token, malformed token
//!   array, corrupted tag/shape combinations, off-thread calls). These are
//!   never caused by bad external input. Under `BridgeConfig::strict_faults`
//!   they panic at the violation site; otherwise they propagate as
//!   `BridgeError::Fault`.
//!
//! Script exceptions thrown during a call are neither: they are captured and
//! re-encoded as the "err" outcome.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::attr::TypeTag;

/// Recoverable classification errors during encode
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The value kind has no representation in the attribute format
    #[error("attribute `{name}`: {kind} values cannot cross the bridge")]
    Unrepresentable { name: String, kind: &'static str },
    /// Aggregate nesting exceeded the configured depth bound
    #[error("attribute `{name}`: aggregate nesting deeper than {max}")]
    DepthExceeded { name: String, max: usize },
    /// The aggregate graph references itself
    #[error("attribute `{name}`: reference cycle in aggregate")]
    CycleDetected { name: String },
}

impl EncodeError {
    /// The attribute name the failure is attributed to.
    pub fn attribute(&self) -> &str {
        match self {
            EncodeError::Unrepresentable { name, .. } => name,
            EncodeError::DepthExceeded { name, .. } => name,
            EncodeError::CycleDetected { name } => name,
        }
    }
}

/// Internal invariant violations.
///
/// Every variant marks state this subsystem can only reach through its own
/// bugs or memory corruption, not through bad input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("unknown callback token {0}")]
    UnknownToken(u64),
    #[error("release of callback token {0} with no outstanding holds")]
    OverRelease(u64),
    #[error("function token array has {0} elements, expected exactly 1")]
    BadTokenArity(usize),
    #[error("function reference for token {0} expired before promotion")]
    ExpiredFunction(u64),
    #[error("null attribute carries non-zero byte {0:#04x}")]
    BadNullByte(u8),
    #[error("unknown aggregate shape `{0}`")]
    UnknownShape(String),
    #[error("shape member carries {0} payload, expected a string")]
    BadShapeTag(TypeTag),
    #[error("array-shaped list has non-positional member `{0}`")]
    StrayArrayMember(String),
    #[error("runtime call entered from a foreign thread")]
    WrongThread,
    #[error("event loop hold count underflow")]
    LoopUnderflow,
    #[error("unknown object cookie {0}")]
    UnknownCookie(u64),
    #[error("release of object cookie {0} with no outstanding holds")]
    ObjectOverRelease(u64),
    #[error("no generic exception constructor registered")]
    MissingGenericCtor,
}

/// Unified error type for bridge operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("internal invariant violated: {0}")]
    Fault(#[from] Fault),
}

impl BridgeError {
    pub fn is_fault(&self) -> bool {
        matches!(self, BridgeError::Fault(_))
    }
}

/// Bridge error codes, recorded by native operations so a later exception
/// construction can derive its type without being told one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Allocation failure
    NoMemory,
    /// An argument had the wrong type or value
    BadArgument,
    /// A numeric value fell outside the representable range
    OutOfRange,
    /// A required member was absent
    MissingMember,
    /// Malformed textual input
    BadSyntax,
    /// Anything else
    Unknown,
}

impl ErrorCode {
    /// The exception type name an error code maps to.
    pub fn exception_type(self) -> &'static str {
        match self {
            ErrorCode::NoMemory => "Error",
            ErrorCode::BadArgument => "TypeError",
            ErrorCode::OutOfRange => "RangeError",
            ErrorCode::MissingMember => "ReferenceError",
            ErrorCode::BadSyntax => "SyntaxError",
            ErrorCode::Unknown => "Error",
        }
    }
}
