//! The bridge context
//!
//! `Bridge` owns everything the marshalling layer needs: the callback handle
//! table, the object registry, the exception constructor registry, the
//! event-loop liveness counter, the configuration, and the identity of the
//! runtime's execution thread. There is no process-global state; embedders
//! create one `Bridge` per runtime and pass it to whoever crosses the
//! boundary.
//!
//! The call paths (`call_function`, `call_method`) are the only points where
//! native code and script values legally meet, and both insist on running on
//! the thread that created the bridge: runtime values are not thread-safe,
//! and there is no queuing or hand-off built in here.

pub mod callbacks;
pub mod decode;
pub mod encode;
pub mod exception;
pub mod objects;

use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use crate::attr::{is_reserved, AttrList, ERROR_MEMBER, RESULT_MEMBER};
use crate::bridge::callbacks::{CallbackTable, Token};
use crate::bridge::exception::{ExceptionCtor, ExceptionRegistry, GENERIC_EXCEPTION};
use crate::bridge::objects::{NativeObject, ObjectCookie, ObjectRegistry};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, ErrorCode, Fault};
use crate::eventloop::LoopHandle;
use crate::value::Value;

struct LastError {
    code: ErrorCode,
    message: String,
}

/// The marshalling context for one embedded runtime.
pub struct Bridge {
    config: BridgeConfig,
    callbacks: CallbackTable,
    objects: ObjectRegistry,
    exceptions: ExceptionRegistry,
    eventloop: LoopHandle,
    owner: ThreadId,
    last_error: Mutex<Option<LastError>>,
}

impl Bridge {
    /// Create a bridge with the default configuration, owned by the calling
    /// thread.
    pub fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    /// Create a bridge with an explicit configuration.
    pub fn with_config(config: BridgeConfig) -> Self {
        Self::with_exceptions(config, ExceptionRegistry::with_defaults())
    }

    /// Create a bridge with an explicit exception registry, for embedders
    /// that supply every constructor themselves.
    pub fn with_exceptions(config: BridgeConfig, exceptions: ExceptionRegistry) -> Self {
        let eventloop = LoopHandle::new();
        Bridge {
            config,
            callbacks: CallbackTable::new(eventloop.clone()),
            objects: ObjectRegistry::new(eventloop.clone()),
            exceptions,
            eventloop,
            owner: thread::current().id(),
            last_error: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn callbacks(&self) -> &CallbackTable {
        &self.callbacks
    }

    pub fn objects(&self) -> &ObjectRegistry {
        &self.objects
    }

    pub fn exceptions(&self) -> &ExceptionRegistry {
        &self.exceptions
    }

    pub fn eventloop(&self) -> &LoopHandle {
        &self.eventloop
    }

    /// Invoke a registered callback with an encoded argument list.
    ///
    /// Returns a list carrying either the call's result under "res" or the
    /// thrown exception under "err"; a script throw is data, never an error.
    pub fn call_function(&self, token: Token, args: &AttrList) -> Result<AttrList, BridgeError> {
        self.check_thread()?;
        let func = self
            .callbacks
            .live(token)
            .map_err(|fault| self.fault(fault))?;
        let argv = self.decode_args(args)?;
        tracing::debug!(token, argc = argv.len(), "invoking callback");
        self.encode_outcome(func.call(&argv))
    }

    /// Dispatch a method call on a registered object.
    pub fn call_method(
        &self,
        cookie: ObjectCookie,
        method: &str,
        args: &AttrList,
    ) -> Result<AttrList, BridgeError> {
        self.check_thread()?;
        let object = self
            .objects
            .lookup(cookie)
            .map_err(|fault| self.fault(fault))?;
        let argv = self.decode_args(args)?;
        tracing::debug!(cookie, method, argc = argv.len(), "dispatching method call");
        self.encode_outcome(object.call(method, &argv))
    }

    /// Take an additional hold on a callback token.
    pub fn hold_function(&self, token: Token) -> Result<(), BridgeError> {
        self.callbacks.hold(token).map_err(|fault| self.fault(fault))
    }

    /// Drop one hold on a callback token.
    pub fn release_function(&self, token: Token) -> Result<(), BridgeError> {
        self.callbacks
            .release(token)
            .map_err(|fault| self.fault(fault))
    }

    /// Insert an object into the bridge's lookup.
    pub fn register_object(&self, object: Arc<dyn NativeObject>) -> ObjectCookie {
        self.objects.register(object)
    }

    /// Remove an object from the bridge's lookup.
    pub fn unregister_object(&self, cookie: ObjectCookie) -> Result<(), BridgeError> {
        self.objects
            .unregister(cookie)
            .map_err(|fault| self.fault(fault))
    }

    /// Take one hold on an object cookie.
    pub fn hold_object(&self, cookie: ObjectCookie) -> Result<(), BridgeError> {
        self.objects.hold(cookie).map_err(|fault| self.fault(fault))
    }

    /// Drop one hold on an object cookie.
    pub fn release_object(&self, cookie: ObjectCookie) -> Result<(), BridgeError> {
        self.objects
            .release(cookie)
            .map_err(|fault| self.fault(fault))
    }

    /// Register an exception constructor under a type name.
    pub fn register_exception(&self, type_name: impl Into<String>, ctor: ExceptionCtor) {
        self.exceptions.register(type_name, ctor);
    }

    /// Record an error code and message for later exception derivation.
    pub fn set_last_error(&self, code: ErrorCode, message: impl Into<String>) {
        let mut slot = self.last_error.lock().expect("last error lock poisoned");
        *slot = Some(LastError {
            code,
            message: message.into(),
        });
    }

    /// The most recently recorded error, if any.
    pub fn last_error(&self) -> Option<(ErrorCode, String)> {
        let slot = self.last_error.lock().expect("last error lock poisoned");
        slot.as_ref().map(|e| (e.code, e.message.clone()))
    }

    /// Construct a runtime exception value.
    ///
    /// An omitted `type_name` derives the type from the last recorded error
    /// code; an unknown name falls back to the generic type while keeping
    /// the supplied message. An empty message falls back to the recorded
    /// one. `extra`, if given, decorates the constructed exception with each
    /// decoded member as an own property.
    pub fn exception(
        &self,
        type_name: Option<&str>,
        extra: Option<&AttrList>,
        message: &str,
    ) -> Result<Value, BridgeError> {
        let recorded = self.last_error();
        let type_name = match type_name {
            Some(name) => name,
            None => recorded
                .as_ref()
                .map(|(code, _)| code.exception_type())
                .unwrap_or(GENERIC_EXCEPTION),
        };
        let message = if message.is_empty() {
            recorded
                .as_ref()
                .map(|(_, recorded_message)| recorded_message.as_str())
                .unwrap_or("")
        } else {
            message
        };

        let mut exc = match self.exceptions.construct(type_name, message) {
            Some(value) => value,
            None => {
                tracing::debug!(type_name, "no constructor; falling back to generic");
                self.exceptions
                    .construct(GENERIC_EXCEPTION, message)
                    .ok_or_else(|| self.fault(Fault::MissingGenericCtor))?
            }
        };

        if let Some(extra) = extra {
            self.decorate(&mut exc, extra)?;
        }
        Ok(exc)
    }

    /// Set each non-reserved member of `extra` as an own property of `value`.
    fn decorate(&self, value: &mut Value, extra: &AttrList) -> Result<(), BridgeError> {
        let Value::Object(object) = value else {
            tracing::warn!(
                kind = value.type_name(),
                "cannot decorate a non-object exception; skipping"
            );
            return Ok(());
        };
        for (name, attr) in extra.iter() {
            if is_reserved(name) {
                continue;
            }
            object.insert(name.clone(), self.decode(attr)?);
        }
        Ok(())
    }

    fn encode_outcome(&self, outcome: Result<Value, Value>) -> Result<AttrList, BridgeError> {
        let mut out = AttrList::new();
        match outcome {
            Ok(result) => self.encode(&mut out, RESULT_MEMBER, &result)?,
            Err(thrown) => self.encode(&mut out, ERROR_MEMBER, &thrown)?,
        }
        Ok(out)
    }

    fn check_thread(&self) -> Result<(), BridgeError> {
        if thread::current().id() != self.owner {
            return Err(self.fault(Fault::WrongThread));
        }
        Ok(())
    }

    /// Apply the fault policy: strict bridges stop at the violation site,
    /// lenient ones hand the embedder a typed internal error.
    pub(crate) fn fault(&self, fault: Fault) -> BridgeError {
        tracing::error!(%fault, "bridge invariant violated");
        if self.config.strict_faults {
            panic!("causeway: internal invariant violated: {fault}");
        }
        BridgeError::Fault(fault)
    }
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("config", &self.config)
            .field("callbacks", &self.callbacks)
            .field("objects", &self.objects)
            .field("loop_holds", &self.eventloop.holds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ScriptFunction;

    #[test]
    fn test_outcome_res_member() {
        let bridge = Bridge::new();
        let func = ScriptFunction::new(|args| Ok(args[0].clone()));
        let token = bridge.callbacks().register(&func);
        let args = bridge.encode_args(&[Value::Number(7.0)]).unwrap();
        let out = bridge.call_function(token, &args).unwrap();
        assert_eq!(out.get(RESULT_MEMBER), Some(&crate::attr::AttrValue::Double(7.0)));
        assert!(!out.contains(ERROR_MEMBER));
    }

    #[test]
    fn test_outcome_err_member() {
        let bridge = Bridge::new();
        let func = ScriptFunction::new(|_| Err(Value::string("thrown")));
        let token = bridge.callbacks().register(&func);
        let out = bridge.call_function(token, &AttrList::new()).unwrap();
        assert_eq!(
            out.get(ERROR_MEMBER),
            Some(&crate::attr::AttrValue::String("thrown".to_string()))
        );
        assert!(!out.contains(RESULT_MEMBER));
    }

    #[test]
    fn test_last_error_round_trip() {
        let bridge = Bridge::new();
        assert!(bridge.last_error().is_none());
        bridge.set_last_error(ErrorCode::OutOfRange, "way out");
        let (code, message) = bridge.last_error().unwrap();
        assert_eq!(code, ErrorCode::OutOfRange);
        assert_eq!(message, "way out");
    }
}
