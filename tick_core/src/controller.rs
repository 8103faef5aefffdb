use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};

use crate::error::{TickError, TickResult};
use crate::phase::TickPhase;
use crate::record::{CallbackId, TickRecord};
use crate::telemetry::TickProfiler;

/// Ordered callback list for one phase.
///
/// `add`/`remove` never touch the active list: they queue. Queues are drained
/// at the start of every [`invoke`](TickController::invoke), adds first, then
/// removes, so anything queued from inside a callback takes effect on the next
/// occurrence of the phase.
///
/// Cloning yields another handle to the same controller.
#[derive(Clone)]
pub struct TickController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    phase: TickPhase,

    /// Written only by the drain pass of `invoke`.
    active: RwLock<Vec<TickRecord>>,
    pending: Mutex<PendingQueues>,

    invoking: AtomicBool,
    disposed: AtomicBool,

    profiler: Option<Arc<dyn TickProfiler>>,
}

#[derive(Default)]
struct PendingQueues {
    add: VecDeque<TickRecord>,
    remove: VecDeque<TickRecord>,
}

/// Ends an invocation, also when a callback unwinds: clears `invoking`, then
/// performs the clear `dispose` skipped while the list was held.
///
/// `dispose` sets `disposed` before reading `invoking` and we reset `invoking`
/// before reading `disposed`, so at least one side sees the other and clears.
struct InvokeScope<'a>(&'a ControllerInner);

impl Drop for InvokeScope<'_> {
    fn drop(&mut self) {
        self.0.invoking.store(false, Ordering::SeqCst);
        if self.0.disposed.load(Ordering::SeqCst) {
            self.0.active.write().clear();
        }
    }
}

impl TickController {
    pub fn new(phase: TickPhase) -> Self {
        Self::build(phase, None)
    }

    pub fn with_profiler(phase: TickPhase, profiler: Arc<dyn TickProfiler>) -> Self {
        Self::build(phase, Some(profiler))
    }

    fn build(phase: TickPhase, profiler: Option<Arc<dyn TickProfiler>>) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                phase,
                active: RwLock::new(Vec::new()),
                pending: Mutex::new(PendingQueues::default()),
                invoking: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
                profiler,
            }),
        }
    }

    #[inline]
    pub fn phase(&self) -> TickPhase {
        self.inner.phase
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Queues `record` for the next invocation.
    ///
    /// Returns `false` if a record with the same callback identity is already
    /// active or already queued for addition, or if the controller is disposed.
    pub fn add(&self, record: TickRecord) -> bool {
        if self.is_disposed() {
            log::debug!("{}: add of '{}' ignored, controller disposed", self.phase(), record.owner());
            return false;
        }

        let id = record.id();
        let mut pending = self.inner.pending.lock();
        if pending.add.iter().any(|r| r.id() == id) || self.is_active(id) {
            log::debug!("{}: '{}' already registered", self.phase(), record.owner());
            return false;
        }

        pending.add.push_back(record);
        true
    }

    /// Queues removal of the record with callback identity `id`.
    ///
    /// A record still waiting in the add queue is matched too; since adds drain
    /// before removes, it never becomes visible. Returns `false` when nothing
    /// matches.
    pub fn remove(&self, id: CallbackId) -> bool {
        if self.is_disposed() {
            return false;
        }

        let mut pending = self.inner.pending.lock();
        if pending.remove.iter().any(|r| r.id() == id) {
            return true;
        }

        let found = {
            let active = self.inner.active.read_recursive();
            active.iter().find(|r| r.id() == id).cloned()
        }
        .or_else(|| pending.add.iter().find(|r| r.id() == id).cloned());

        match found {
            Some(record) => {
                pending.remove.push_back(record);
                true
            }
            None => {
                log::debug!("{}: remove of unknown callback ignored", self.phase());
                false
            }
        }
    }

    /// `true` if the callback is active or queued for addition and not queued
    /// for removal.
    pub fn contains(&self, id: CallbackId) -> bool {
        let pending = self.inner.pending.lock();
        if pending.remove.iter().any(|r| r.id() == id) {
            return false;
        }
        pending.add.iter().any(|r| r.id() == id) || self.is_active(id)
    }

    /// Number of records in the active list (pending mutations excluded).
    pub fn len(&self) -> usize {
        self.inner.active.read_recursive().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the active list in invocation order.
    pub fn active(&self) -> Vec<TickRecord> {
        self.inner.active.read_recursive().clone()
    }

    /// Runs one occurrence of the phase.
    ///
    /// The first callback error aborts the rest of this occurrence and is
    /// returned as [`TickError::Callback`]; the next call starts over from the
    /// front of the list.
    pub fn invoke(&self, dt: f32) -> TickResult<()> {
        let inner = &*self.inner;

        if inner.invoking.swap(true, Ordering::SeqCst) {
            return Err(TickError::Reentrant(inner.phase.as_str()));
        }
        let _scope = InvokeScope(inner);

        if self.is_disposed() {
            log::warn!("{}: invoke on disposed controller", inner.phase);
            return Err(TickError::Disposed);
        }

        self.drain();
        self.run(dt)
    }

    /// Drops every record and queued mutation. Idempotent.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        {
            let mut pending = self.inner.pending.lock();
            pending.add.clear();
            pending.remove.clear();
        }

        // While an invocation holds the list, its `InvokeScope` clears it.
        if !self.inner.invoking.load(Ordering::SeqCst) {
            self.inner.active.write().clear();
        }

        log::debug!("{}: controller disposed", self.phase());
    }

    #[inline]
    fn is_active(&self, id: CallbackId) -> bool {
        self.inner.active.read_recursive().iter().any(|r| r.id() == id)
    }

    fn drain(&self) {
        let (adds, removes) = {
            let mut pending = self.inner.pending.lock();
            (
                std::mem::take(&mut pending.add),
                std::mem::take(&mut pending.remove),
            )
        };
        if adds.is_empty() && removes.is_empty() {
            return;
        }

        let mut active = self.inner.active.write();
        let mut dirty = false;

        for record in adds {
            if !active.contains(&record) {
                active.push(record);
                dirty = true;
            }
        }

        for record in removes {
            if let Some(i) = active.iter().position(|r| *r == record) {
                active.remove(i);
                dirty = true;
            }
        }

        if dirty {
            // Stable: equal orders keep registration order.
            active.sort_by_key(TickRecord::order);
            log::trace!("{}: {} active callbacks", self.phase(), active.len());
        }
    }

    fn run(&self, dt: f32) -> TickResult<()> {
        let phase = self.inner.phase;
        let active = self.inner.active.read_recursive();

        for record in active.iter() {
            let r = match self.inner.profiler.as_deref() {
                Some(profiler) => {
                    let label = format!("{}.{}()", record.owner(), phase.method_name());
                    profiler.begin_scope(&label);
                    let t0 = Instant::now();
                    let r = record.callback().call(dt);
                    profiler.end_scope(&label, t0.elapsed());
                    r
                }
                None => record.callback().call(dt),
            };

            r.map_err(|e| TickError::in_callback(phase, record.owner(), e))?;
        }

        Ok(())
    }
}

impl std::fmt::Debug for TickController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickController")
            .field("phase", &self.inner.phase)
            .field("active", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
