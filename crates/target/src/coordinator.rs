// Per-operation busy flags and the observer event stream.
//
// Each operation kind may have one request in flight. Acquiring a flag
// yields a guard that releases it on drop, so every exit path (success,
// error, `?`) clears the flag. Callers drop the guard before emitting the
// completion event.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tracing::{debug, trace};

use wikiedit_common::types::{OperationKind, RevisionId};

use crate::error::{ErrorKind, TargetError};

const EVENT_CAPACITY: usize = 64;

/// Something observers may want to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetEvent {
    Loaded,
    LoadError(ErrorKind),
    Saved { content: String, categories_html: Option<String>, new_revid: Option<RevisionId> },
    EditConflict,
    SaveAsyncBegin,
    SaveAsyncComplete,
    SaveError(ErrorKind),
    ShowChanges(String),
    NoChanges,
    ShowChangesError(ErrorKind),
    Serialized(String),
    SerializeError(ErrorKind),
    Submitted,
    SubmitError(ErrorKind),
    SanityCheckComplete { verified: bool },
}

#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<TargetEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TargetEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: TargetEvent) {
        trace!(?event, "emit");
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Busy flags keyed by operation. Each acquisition gets a generation number
/// so a guard outliving `clear_all` cannot release a newer holder's flag.
#[derive(Debug, Default)]
pub struct BusyFlags {
    held: Mutex<Held>,
}

#[derive(Debug, Default)]
struct Held {
    flags: HashMap<OperationKind, u64>,
    next_generation: u64,
}

impl BusyFlags {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn try_acquire(self: &Arc<Self>, kind: OperationKind) -> Result<BusyGuard, TargetError> {
        let mut held = lock(&self.held);
        if held.flags.contains_key(&kind) {
            debug!(operation = %kind, "rejecting duplicate request");
            return Err(TargetError::Busy(kind));
        }
        held.next_generation += 1;
        let generation = held.next_generation;
        held.flags.insert(kind, generation);
        Ok(BusyGuard { flags: Arc::clone(self), kind, generation })
    }

    pub fn is_busy(&self, kind: OperationKind) -> bool {
        lock(&self.held).flags.contains_key(&kind)
    }

    pub fn clear_all(&self) {
        lock(&self.held).flags.clear();
    }

    fn release(&self, kind: OperationKind, generation: u64) {
        let mut held = lock(&self.held);
        if held.flags.get(&kind) == Some(&generation) {
            held.flags.remove(&kind);
        }
    }
}

/// Holds one busy flag until dropped.
#[derive(Debug)]
pub struct BusyGuard {
    flags: Arc<BusyFlags>,
    kind: OperationKind,
    generation: u64,
}

impl BusyGuard {
    pub fn kind(&self) -> OperationKind {
        self.kind
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flags.release(self.kind, self.generation);
    }
}

/// Lock a mutex, recovering the data if a panicking holder poisoned it.
/// State guarded here is always left consistent between statements.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
