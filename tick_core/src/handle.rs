use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::phase::TickPhase;
use crate::record::CallbackId;
use crate::tickable::EntityId;

/// What a handle stands for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Subject {
    /// A tickable registered through the service, possibly in several phases.
    Entity(EntityId),
    /// A bare callback registered for a single phase.
    Callback(TickPhase, CallbackId),
}

type DisposeObserver = Box<dyn FnOnce(Subject) + Send>;

/// Disposable token for one registration.
///
/// Disposal notifies the observers exactly once; after that the handle is
/// inert and further `dispose`/`on_disposed` calls are ignored. Clones share
/// state, so disposing any clone disposes them all.
#[derive(Clone)]
pub struct TickHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    subject: Subject,
    inert: bool,
    disposed: AtomicBool,
    observers: Mutex<Vec<DisposeObserver>>,
}

impl TickHandle {
    pub fn new(subject: Subject) -> Self {
        Self::build(subject, false)
    }

    /// Handle for a registration that did not land anywhere.
    pub fn inert(subject: Subject) -> Self {
        Self::build(subject, true)
    }

    fn build(subject: Subject, inert: bool) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                subject,
                inert,
                disposed: AtomicBool::new(false),
                observers: Mutex::new(Vec::new()),
            }),
        }
    }

    #[inline]
    pub fn subject(&self) -> Subject {
        self.inner.subject
    }

    /// `true` if disposing this handle can never have an effect.
    #[inline]
    pub fn is_inert(&self) -> bool {
        self.inner.inert
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Subscribes `f` to disposal. Returns `false` (and drops `f`) if the
    /// handle is already disposed.
    pub fn on_disposed<F>(&self, f: F) -> bool
    where
        F: FnOnce(Subject) + Send + 'static,
    {
        let mut observers = self.inner.observers.lock();
        if self.is_disposed() {
            return false;
        }
        observers.push(Box::new(f));
        true
    }

    /// Disposes the registration. Returns `true` only for the call that
    /// actually disposed it.
    pub fn dispose(&self) -> bool {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return false;
        }

        let observers = std::mem::take(&mut *self.inner.observers.lock());
        for notify in observers {
            notify(self.inner.subject);
        }
        true
    }

    /// Wraps the handle so that dropping the guard disposes it.
    pub fn into_guard(self) -> TickGuard {
        TickGuard(self)
    }
}

impl PartialEq for TickHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for TickHandle {}

impl fmt::Debug for TickHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickHandle")
            .field("subject", &self.inner.subject)
            .field("inert", &self.inner.inert)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Disposes its handle on drop.
#[must_use = "dropping the guard unregisters immediately"]
#[derive(Debug)]
pub struct TickGuard(TickHandle);

impl TickGuard {
    #[inline]
    pub fn handle(&self) -> &TickHandle {
        &self.0
    }
}

impl Drop for TickGuard {
    fn drop(&mut self) {
        self.0.dispose();
    }
}
