//! Value decoder — attribute lists back into runtime values
//!
//! Total over the tag set: every tag maps to exactly one runtime shape.
//! There is no partial decode — the first structurally invalid element
//! (non-zero null byte, malformed token carrier, unknown token or shape) is
//! an internal fault, because only this subsystem ever produces the input.

use crate::attr::{is_reserved, AttrList, AttrValue, SHAPE_ARRAY};
use crate::error::{BridgeError, Fault};
use crate::value::{Value, ValueArray, ValueObject};

use super::Bridge;

impl Bridge {
    /// Decode a single attribute payload.
    pub fn decode(&self, attr: &AttrValue) -> Result<Value, BridgeError> {
        match attr {
            AttrValue::Absent => Ok(Value::Undefined),
            AttrValue::Byte(0) => Ok(Value::Null),
            AttrValue::Byte(b) => Err(self.fault(Fault::BadNullByte(*b))),
            AttrValue::Bool(b) => Ok(Value::Bool(*b)),
            AttrValue::Double(n) => Ok(Value::Number(*n)),
            AttrValue::String(s) => Ok(Value::string(s.clone())),
            AttrValue::Uint64Array(tokens) => {
                if tokens.len() != 1 {
                    return Err(self.fault(Fault::BadTokenArity(tokens.len())));
                }
                let func = self
                    .callbacks()
                    .live(tokens[0])
                    .map_err(|fault| self.fault(fault))?;
                Ok(Value::Function(func))
            }
            AttrValue::List(list) => self.decode_list(list),
        }
    }

    /// Decode a whole list as an aggregate value, honoring its shape member.
    pub fn decode_list(&self, list: &AttrList) -> Result<Value, BridgeError> {
        match list.shape() {
            None => self.decode_object(list),
            Some(AttrValue::String(shape)) if shape == SHAPE_ARRAY => self.decode_array(list),
            Some(AttrValue::String(shape)) => {
                Err(self.fault(Fault::UnknownShape(shape.clone())))
            }
            Some(other) => Err(self.fault(Fault::BadShapeTag(other.tag()))),
        }
    }

    /// Decode a call-argument list positionally, stopping at the first
    /// missing positional key.
    pub fn decode_args(&self, list: &AttrList) -> Result<Vec<Value>, BridgeError> {
        let mut args = Vec::new();
        for index in 0..list.len() {
            match list.get(&index.to_string()) {
                Some(attr) => args.push(self.decode(attr)?),
                None => break,
            }
        }
        Ok(args)
    }

    fn decode_object(&self, list: &AttrList) -> Result<Value, BridgeError> {
        let mut object = ValueObject::new();
        for (name, attr) in list.iter() {
            if is_reserved(name) {
                continue;
            }
            object.insert(name.clone(), self.decode(attr)?);
        }
        Ok(Value::Object(object))
    }

    fn decode_array(&self, list: &AttrList) -> Result<Value, BridgeError> {
        let expected = list.iter().filter(|(name, _)| !is_reserved(name)).count();
        let mut elements = Vec::with_capacity(expected);
        for index in 0..expected {
            match list.get(&index.to_string()) {
                Some(attr) => elements.push(self.decode(attr)?),
                None => {
                    // Positional coverage broke, so some member is not an
                    // index the encoder could have produced.
                    let stray = list
                        .iter()
                        .map(|(name, _)| name)
                        .find(|name| {
                            !is_reserved(name)
                                && name.parse::<usize>().map_or(true, |i| i >= expected)
                        })
                        .cloned()
                        .unwrap_or_else(|| index.to_string());
                    return Err(self.fault(Fault::StrayArrayMember(stray)));
                }
            }
        }
        Ok(Value::Array(ValueArray::from_vec(elements)))
    }
}
