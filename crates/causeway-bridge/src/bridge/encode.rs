//! Value encoder — runtime values into attribute lists
//!
//! Classification is ordered and first-match-wins. Primitives map to scalar
//! tags; undefined and null get their dedicated tags and are never
//! conflated; functions register in the callback table and travel as token
//! carriers; aggregates recurse into nested lists. Anything else (opaque
//! engine values) is a recoverable classification error attributed to the
//! offending attribute name.
//!
//! All numeric width collapses to IEEE 754 double: integers beyond 2^53 in
//! magnitude are not guaranteed to round-trip.

use crate::attr::{AttrList, AttrValue, FUNCTION_MARKER, SHAPE_ARRAY, SHAPE_MEMBER};
use crate::error::EncodeError;
use crate::value::{Value, ValueArray, ValueObject};

use super::Bridge;

impl Bridge {
    /// Encode `value` into `list` under `name`.
    ///
    /// Encoding a function allocates a callback-table entry and an
    /// event-loop hold; the resulting list owns that hold and releases it on
    /// drop.
    pub fn encode(&self, list: &mut AttrList, name: &str, value: &Value) -> Result<(), EncodeError> {
        let mut path = Vec::new();
        self.encode_member(list, name, value, &mut path)
    }

    /// Encode a call-argument slice positionally ("0", "1", ...).
    ///
    /// On failure the error names the offending positional attribute.
    pub fn encode_args(&self, args: &[Value]) -> Result<AttrList, EncodeError> {
        let mut list = AttrList::new();
        for (index, value) in args.iter().enumerate() {
            self.encode(&mut list, &index.to_string(), value)?;
        }
        Ok(list)
    }

    fn encode_member(
        &self,
        list: &mut AttrList,
        name: &str,
        value: &Value,
        path: &mut Vec<*const ()>,
    ) -> Result<(), EncodeError> {
        match value {
            Value::Bool(b) => list.insert(name, AttrValue::Bool(*b)),
            Value::Number(n) => list.insert(name, AttrValue::Double(*n)),
            Value::String(s) => list.insert(name, AttrValue::String(s.as_ref().clone())),
            Value::Undefined => list.insert(name, AttrValue::Absent),
            Value::Null => list.insert(name, AttrValue::Byte(0)),
            Value::Function(func) => {
                let token = self.callbacks().register(func);
                list.insert(FUNCTION_MARKER, AttrValue::Absent);
                list.attach_table(self.callbacks());
                list.insert(name, AttrValue::Uint64Array(vec![token]));
                tracing::trace!(name, token, "function encoded as token carrier");
            }
            Value::Array(array) => {
                self.enter_aggregate(array.identity(), name, path)?;
                let mut nested = AttrList::new();
                nested.insert(SHAPE_MEMBER, AttrValue::String(SHAPE_ARRAY.to_string()));
                let outcome = self.encode_array_members(&mut nested, array, path);
                path.pop();
                outcome?;
                list.insert(name, AttrValue::List(nested));
            }
            Value::Object(object) => {
                self.enter_aggregate(object.identity(), name, path)?;
                let mut nested = AttrList::new();
                let outcome = self.encode_object_members(&mut nested, object, path);
                path.pop();
                outcome?;
                list.insert(name, AttrValue::List(nested));
            }
            Value::SharedValue(shared) => {
                // Shared wrappers marshal as the value they currently hold,
                // the same collapse boxed primitives get. The wrapper itself
                // joins the cycle-guard path: a shared cell is the one way a
                // graph can reach back into itself.
                self.enter_aggregate(shared.identity(), name, path)?;
                let inner = shared.with(|value| value.clone());
                let outcome = self.encode_member(list, name, &inner, path);
                path.pop();
                outcome?;
            }
            Value::Symbol(_) => {
                return Err(EncodeError::Unrepresentable {
                    name: name.to_string(),
                    kind: value.type_name(),
                });
            }
        }
        Ok(())
    }

    fn encode_array_members(
        &self,
        nested: &mut AttrList,
        array: &ValueArray,
        path: &mut Vec<*const ()>,
    ) -> Result<(), EncodeError> {
        for (index, element) in array.iter().enumerate() {
            self.encode_member(nested, &index.to_string(), element, path)?;
        }
        Ok(())
    }

    fn encode_object_members(
        &self,
        nested: &mut AttrList,
        object: &ValueObject,
        path: &mut Vec<*const ()>,
    ) -> Result<(), EncodeError> {
        for (key, member) in object.iter() {
            self.encode_member(nested, key, member, path)?;
        }
        Ok(())
    }

    /// Cycle and depth guard for aggregate recursion. `path` holds the
    /// allocation identities of every aggregate on the current recursion
    /// path; revisiting one means the graph references itself.
    fn enter_aggregate(
        &self,
        identity: *const (),
        name: &str,
        path: &mut Vec<*const ()>,
    ) -> Result<(), EncodeError> {
        if path.contains(&identity) {
            return Err(EncodeError::CycleDetected {
                name: name.to_string(),
            });
        }
        let max = self.config().max_encode_depth;
        if path.len() >= max {
            return Err(EncodeError::DepthExceeded {
                name: name.to_string(),
                max,
            });
        }
        path.push(identity);
        Ok(())
    }
}
