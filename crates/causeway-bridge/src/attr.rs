//! Attribute list adapter — the portable representation crossing the boundary
//!
//! An `AttrList` is an ordered mapping from unique string names to tagged
//! payloads (`AttrValue`). It is the only shape in which runtime values leave
//! the runtime: primitives map to scalar tags, aggregates nest, and function
//! values travel as callback tokens inside single-element uint64 arrays.
//!
//! Lifecycle policy: a list that embeds function tokens carries the
//! function-container marker and a handle to the callback table that issued
//! them. Dropping such a list releases one hold per embedded token; cloning
//! it takes one. Lists built by outside code (no marker, no table handle)
//! pass through untouched.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::bridge::callbacks::{CallbackTable, Token};

/// Reserved member name: present (valueless) iff the list embeds one or more
/// function tokens.
pub const FUNCTION_MARKER: &str = ".__causeway_functions";

/// Reserved member name: names the aggregate shape of a nested list when it
/// is not the plain-object default.
pub const SHAPE_MEMBER: &str = ".__causeway_shape";

/// Shape member value for ordered sequences.
pub const SHAPE_ARRAY: &str = "Array";

/// Outcome member name for a successful call.
pub const RESULT_MEMBER: &str = "res";

/// Outcome member name for a call that threw.
pub const ERROR_MEMBER: &str = "err";

/// Returns true for member names the bridge reserves for itself.
pub fn is_reserved(name: &str) -> bool {
    name == FUNCTION_MARKER || name == SHAPE_MEMBER
}

/// The closed set of value kinds the attribute format can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    /// Valueless boolean — encodes the "undefined" sentinel
    AbsentBool,
    /// Single byte — encodes "null"; the payload must be zero
    Byte,
    /// Boolean value
    Bool,
    /// IEEE 754 double
    Double,
    /// UTF-8 string
    String,
    /// Nested attribute list
    List,
    /// Array of u64 — carries a callback token, length exactly 1
    Uint64Array,
}

impl TypeTag {
    /// Get a display name for this tag
    pub fn display_name(&self) -> &'static str {
        match self {
            TypeTag::AbsentBool => "absent-boolean",
            TypeTag::Byte => "byte",
            TypeTag::Bool => "boolean",
            TypeTag::Double => "double",
            TypeTag::String => "string",
            TypeTag::List => "nested-list",
            TypeTag::Uint64Array => "uint64-array",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A tagged attribute payload
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Valueless boolean ("undefined")
    Absent,
    /// Byte payload ("null" when zero; anything else is corrupt)
    Byte(u8),
    /// Boolean payload
    Bool(bool),
    /// Double payload
    Double(f64),
    /// UTF-8 string payload
    String(String),
    /// Nested list payload
    List(AttrList),
    /// u64 array payload (callback token carrier)
    Uint64Array(Vec<u64>),
}

impl AttrValue {
    /// The tag this payload carries.
    pub fn tag(&self) -> TypeTag {
        match self {
            AttrValue::Absent => TypeTag::AbsentBool,
            AttrValue::Byte(_) => TypeTag::Byte,
            AttrValue::Bool(_) => TypeTag::Bool,
            AttrValue::Double(_) => TypeTag::Double,
            AttrValue::String(_) => TypeTag::String,
            AttrValue::List(_) => TypeTag::List,
            AttrValue::Uint64Array(_) => TypeTag::Uint64Array,
        }
    }

    /// Extract a function token, if this payload is a well-formed carrier
    /// (a uint64 array of length exactly 1).
    pub fn function_token(&self) -> Option<Token> {
        match self {
            AttrValue::Uint64Array(toks) if toks.len() == 1 => Some(toks[0]),
            _ => None,
        }
    }
}

/// Ordered, uniquely-keyed tagged container.
///
/// Inserting an existing name replaces the previous payload. Member order is
/// insertion order and is preserved across the boundary.
#[derive(Default)]
pub struct AttrList {
    entries: IndexMap<String, AttrValue>,
    /// Set when the encoder embeds a function token; drop/clone consult it.
    table: Option<CallbackTable>,
}

impl AttrList {
    pub fn new() -> Self {
        AttrList {
            entries: IndexMap::new(),
            table: None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Insert a member, replacing any previous payload under the same name.
    ///
    /// If the replaced payload was a token carrier in a list this bridge
    /// marked, the replaced token's hold is released immediately so the table
    /// invariant survives the replacement.
    pub fn insert(&mut self, name: impl Into<String>, value: AttrValue) {
        if let Some(old) = self.entries.insert(name.into(), value) {
            self.release_member(&old);
        }
    }

    /// Remove a member. Token carriers release their hold on removal.
    pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
        let old = self.entries.shift_remove(name)?;
        self.release_member(&old);
        Some(old)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, AttrValue> {
        self.entries.iter()
    }

    /// True iff the list carries the function-container marker.
    pub fn contains_functions(&self) -> bool {
        self.entries.contains_key(FUNCTION_MARKER)
    }

    /// The shape member payload, if any.
    pub fn shape(&self) -> Option<&AttrValue> {
        self.entries.get(SHAPE_MEMBER)
    }

    /// Extract a function token from the named member (a uint64 array of
    /// length exactly 1). Returns None for absent or differently-shaped
    /// members.
    pub fn function_token(&self, name: &str) -> Option<Token> {
        self.entries.get(name).and_then(AttrValue::function_token)
    }

    /// All function tokens embedded at this level, in member order.
    pub fn function_tokens(&self) -> Vec<Token> {
        if !self.contains_functions() {
            return Vec::new();
        }
        self.entries
            .values()
            .filter_map(AttrValue::function_token)
            .collect()
    }

    /// Attach the callback table that issued this list's tokens.
    pub(crate) fn attach_table(&mut self, table: &CallbackTable) {
        if self.table.is_none() {
            self.table = Some(table.clone());
        }
    }

    fn release_member(&self, old: &AttrValue) {
        let Some(table) = &self.table else { return };
        if let AttrValue::Uint64Array(toks) = old {
            if toks.len() == 1 {
                table.release_from_list(toks[0]);
            } else {
                tracing::error!(
                    len = toks.len(),
                    "malformed function token carrier replaced; holds not released"
                );
            }
        }
    }
}

impl PartialEq for AttrList {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl fmt::Debug for AttrList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl Clone for AttrList {
    /// Cloning a token-carrying list takes one additional hold per embedded
    /// token so that both copies can drop independently.
    fn clone(&self) -> Self {
        if let Some(table) = &self.table {
            if self.contains_functions() {
                for (_, value) in self.entries.iter() {
                    if let Some(token) = value.function_token() {
                        table.hold_from_list(token);
                    }
                }
            }
        }
        AttrList {
            entries: self.entries.clone(),
            table: self.table.clone(),
        }
    }
}

impl Drop for AttrList {
    /// A list that embeds function tokens cannot be discarded without also
    /// relinquishing each token's lifetime contribution: one release per
    /// uint64-array member. Nested lists release their own tokens when their
    /// own drop runs.
    fn drop(&mut self) {
        let Some(table) = &self.table else { return };
        if !self.contains_functions() {
            return;
        }
        for (name, value) in self.entries.iter() {
            if let AttrValue::Uint64Array(toks) = value {
                if toks.len() == 1 {
                    table.release_from_list(toks[0]);
                } else {
                    // Cannot panic here: a panic in drop during unwind aborts.
                    tracing::error!(
                        member = %name,
                        len = toks.len(),
                        "malformed function token carrier dropped; holds not released"
                    );
                }
            }
        }
    }
}

impl FromIterator<(String, AttrValue)> for AttrList {
    fn from_iter<I: IntoIterator<Item = (String, AttrValue)>>(iter: I) -> Self {
        AttrList {
            entries: iter.into_iter().collect(),
            table: None,
        }
    }
}
