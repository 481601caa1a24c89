//! Object bridge — cookie lookup and method dispatch
//!
//! Native callers refer to wrapped objects by opaque cookie. The registry
//! owns only the lookup and the per-cookie hold counts; the objects
//! themselves belong to whoever registered them. Holds mirror the callback
//! table's contract: one event-loop hold per object hold, released exactly
//! once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::Fault;
use crate::eventloop::LoopHandle;
use crate::value::Value;

/// Opaque native object cookie.
pub type ObjectCookie = u64;

/// A wrapped object the bridge can dispatch method calls to.
///
/// `call` is the instance's method table: it receives decoded argument
/// values and either returns a result or throws — the `Err` side carries the
/// thrown exception value, which crosses the boundary as ordinary data.
pub trait NativeObject: Send + Sync + std::fmt::Debug {
    fn call(&self, method: &str, args: &[Value]) -> Result<Value, Value>;
}

struct ObjEntry {
    object: Arc<dyn NativeObject>,
    refs: u32,
}

#[derive(Default)]
struct RegistryState {
    entries: HashMap<ObjectCookie, ObjEntry>,
    next: ObjectCookie,
}

/// Cheap-clone handle on the object registry.
#[derive(Clone)]
pub struct ObjectRegistry {
    state: Arc<Mutex<RegistryState>>,
    eventloop: LoopHandle,
}

impl ObjectRegistry {
    pub(crate) fn new(eventloop: LoopHandle) -> Self {
        ObjectRegistry {
            state: Arc::new(Mutex::new(RegistryState::default())),
            eventloop,
        }
    }

    /// Insert an object and return its cookie. Registration itself takes no
    /// hold; holds are the caller's explicit business.
    pub fn register(&self, object: Arc<dyn NativeObject>) -> ObjectCookie {
        let mut state = self.state.lock().expect("object registry lock poisoned");
        let mut cookie = state.next;
        while state.entries.contains_key(&cookie) {
            cookie = cookie.wrapping_add(1);
        }
        state.next = cookie.wrapping_add(1);
        state.entries.insert(cookie, ObjEntry { object, refs: 0 });
        tracing::trace!(cookie, "object registered");
        cookie
    }

    /// Remove an object from the lookup. Outstanding holds keep their
    /// event-loop contribution; releasing them afterwards is a fault.
    pub fn unregister(&self, cookie: ObjectCookie) -> Result<(), Fault> {
        let mut state = self.state.lock().expect("object registry lock poisoned");
        let entry = state
            .entries
            .remove(&cookie)
            .ok_or(Fault::UnknownCookie(cookie))?;
        if entry.refs > 0 {
            tracing::warn!(cookie, refs = entry.refs, "object unregistered with live holds");
        }
        Ok(())
    }

    /// Resolve a cookie to its object.
    pub(crate) fn lookup(&self, cookie: ObjectCookie) -> Result<Arc<dyn NativeObject>, Fault> {
        let state = self.state.lock().expect("object registry lock poisoned");
        state
            .entries
            .get(&cookie)
            .map(|entry| entry.object.clone())
            .ok_or(Fault::UnknownCookie(cookie))
    }

    /// Take one hold on an object, and one event-loop hold with it.
    pub fn hold(&self, cookie: ObjectCookie) -> Result<(), Fault> {
        let mut state = self.state.lock().expect("object registry lock poisoned");
        let entry = state
            .entries
            .get_mut(&cookie)
            .ok_or(Fault::UnknownCookie(cookie))?;
        entry.refs += 1;
        let refs = entry.refs;
        drop(state);
        self.eventloop.hold();
        tracing::trace!(cookie, refs, "object held");
        Ok(())
    }

    /// Drop one hold on an object, and one event-loop hold with it.
    pub fn release(&self, cookie: ObjectCookie) -> Result<(), Fault> {
        let mut state = self.state.lock().expect("object registry lock poisoned");
        let entry = state
            .entries
            .get_mut(&cookie)
            .ok_or(Fault::UnknownCookie(cookie))?;
        if entry.refs == 0 {
            return Err(Fault::ObjectOverRelease(cookie));
        }
        entry.refs -= 1;
        let refs = entry.refs;
        drop(state);
        tracing::trace!(cookie, refs, "object released");
        self.eventloop.release()
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .expect("object registry lock poisoned")
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ObjectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectRegistry")
            .field("entries", &self.len())
            .finish()
    }
}
