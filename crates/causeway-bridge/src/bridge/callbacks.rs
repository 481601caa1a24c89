//! Callback handle table
//!
//! Registry of script-side function references that native code holds by
//! opaque token. Per-token state machine:
//!
//! ```text
//! unregistered -> held(count=1, transient) -> held(count=N, durable) -> released
//! ```
//!
//! A token is created in the held state (count 1) with a *transient*
//! reference: a `Weak` that stays valid only while the originating call's
//! values are alive. The first hold past the implicit one promotes the
//! reference to *durable* — a strong `Arc` that survives script-side
//! collection eligibility. Every hold takes one event-loop hold; every
//! release drops one; the entry is erased when the count reaches zero.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use crate::error::Fault;
use crate::eventloop::LoopHandle;
use crate::value::{ScriptFnInner, ScriptFunction};

/// Opaque callback token, unique within the table for the entry's lifetime.
pub type Token = u64;

/// The reference half of a slot. `Transient` is the pre-promotion state.
enum FuncRef {
    Transient(Weak<ScriptFnInner>),
    Durable(Arc<ScriptFnInner>),
}

struct Slot {
    func: FuncRef,
    refs: u32,
}

#[derive(Default)]
struct TableState {
    slots: HashMap<Token, Slot>,
    next: Token,
}

/// Cheap-clone handle on the callback table. All clones share one table.
#[derive(Clone)]
pub struct CallbackTable {
    state: Arc<Mutex<TableState>>,
    eventloop: LoopHandle,
}

impl CallbackTable {
    pub(crate) fn new(eventloop: LoopHandle) -> Self {
        CallbackTable {
            state: Arc::new(Mutex::new(TableState::default())),
            eventloop,
        }
    }

    /// Register a function reference. The entry starts in the held state
    /// (count 1, transient), so the hold implicit in registration takes one
    /// event-loop hold; each release will drop one.
    pub fn register(&self, func: &ScriptFunction) -> Token {
        let mut state = self.state.lock().expect("callback table lock poisoned");
        // Never reuse a live token.
        let mut token = state.next;
        while state.slots.contains_key(&token) {
            token = token.wrapping_add(1);
        }
        state.next = token.wrapping_add(1);
        state.slots.insert(
            token,
            Slot {
                func: FuncRef::Transient(func.downgrade()),
                refs: 1,
            },
        );
        drop(state);
        self.eventloop.hold();
        tracing::trace!(token, "callback registered");
        token
    }

    /// Take an additional hold. The first hold past the implicit one
    /// promotes the reference from transient to durable.
    pub fn hold(&self, token: Token) -> Result<(), Fault> {
        let mut state = self.state.lock().expect("callback table lock poisoned");
        let slot = state
            .slots
            .get_mut(&token)
            .ok_or(Fault::UnknownToken(token))?;
        if let FuncRef::Transient(weak) = &slot.func {
            let strong = weak.upgrade().ok_or(Fault::ExpiredFunction(token))?;
            slot.func = FuncRef::Durable(strong);
        }
        slot.refs += 1;
        let refs = slot.refs;
        drop(state);
        self.eventloop.hold();
        tracing::trace!(token, refs, "callback held");
        Ok(())
    }

    /// Drop one hold. Erases the entry (and its durable reference, if
    /// promoted) when the count reaches zero. Releases one event-loop hold
    /// in every case.
    pub fn release(&self, token: Token) -> Result<(), Fault> {
        let mut state = self.state.lock().expect("callback table lock poisoned");
        let slot = state
            .slots
            .get_mut(&token)
            .ok_or(Fault::UnknownToken(token))?;
        if slot.refs == 0 {
            return Err(Fault::OverRelease(token));
        }
        slot.refs -= 1;
        let refs = slot.refs;
        if refs == 0 {
            state.slots.remove(&token);
        }
        drop(state);
        tracing::trace!(token, refs, "callback released");
        self.eventloop.release()
    }

    /// Look up the live function reference for a token.
    pub(crate) fn live(&self, token: Token) -> Result<ScriptFunction, Fault> {
        let state = self.state.lock().expect("callback table lock poisoned");
        let slot = state.slots.get(&token).ok_or(Fault::UnknownToken(token))?;
        match &slot.func {
            FuncRef::Durable(strong) => Ok(ScriptFunction::from_arc(strong.clone())),
            FuncRef::Transient(weak) => weak
                .upgrade()
                .map(ScriptFunction::from_arc)
                .ok_or(Fault::ExpiredFunction(token)),
        }
    }

    /// Number of live entries. Non-zero at shutdown means leaked holds.
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .expect("callback table lock poisoned")
            .slots
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, token: Token) -> bool {
        self.state
            .lock()
            .expect("callback table lock poisoned")
            .slots
            .contains_key(&token)
    }

    /// Outstanding hold count for a token.
    pub fn refs(&self, token: Token) -> Result<u32, Fault> {
        let state = self.state.lock().expect("callback table lock poisoned");
        state
            .slots
            .get(&token)
            .map(|slot| slot.refs)
            .ok_or(Fault::UnknownToken(token))
    }

    /// Whether a token's reference has been promoted to durable.
    pub fn is_durable(&self, token: Token) -> Result<bool, Fault> {
        let state = self.state.lock().expect("callback table lock poisoned");
        state
            .slots
            .get(&token)
            .map(|slot| matches!(slot.func, FuncRef::Durable(_)))
            .ok_or(Fault::UnknownToken(token))
    }

    /// Release entry point for the list drop path. Never panics: drop runs
    /// during unwind, so faults are logged and swallowed.
    pub(crate) fn release_from_list(&self, token: Token) {
        if let Err(fault) = self.release(token) {
            tracing::error!(%fault, token, "token release during list teardown failed");
        }
    }

    /// Hold entry point for the list clone path. Mirrors `release_from_list`.
    pub(crate) fn hold_from_list(&self, token: Token) {
        if let Err(fault) = self.hold(token) {
            tracing::error!(%fault, token, "token hold during list clone failed");
        }
    }
}

impl std::fmt::Debug for CallbackTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackTable")
            .field("entries", &self.len())
            .field("loop_holds", &self.eventloop.holds())
            .finish()
    }
}
