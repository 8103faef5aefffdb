use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::controller::TickController;
use crate::error::{TickError, TickResult};
use crate::handle::{Subject, TickHandle};
use crate::phase::{PhaseSet, TickPhase};
use crate::record::{TickCallback, TickRecord};
use crate::telemetry::TickProfiler;
use crate::tickable::{default_order, dispatch, EntityId, Shared, Tickable};

/// Registration facade over the three phase controllers.
///
/// A tickable is fanned out to the controller of every phase it declares and
/// gets back one [`TickHandle`] that undoes all of them. The service is an
/// explicitly owned value; clones share the same controllers, which lets
/// tick callbacks register other tickables.
///
/// Callbacks that capture a clone form a reference cycle through the
/// controllers; [`dispose`](TickService::dispose) breaks it.
#[derive(Clone)]
pub struct TickService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    controllers: [TickController; 3],
    state: Mutex<ServiceState>,
    disposed: AtomicBool,
}

/// Invariant: an entity is in `handles` iff it is in `controllers` with a
/// non-empty list.
#[derive(Default)]
struct ServiceState {
    controllers: HashMap<EntityId, Vec<(TickPhase, TickCallback)>>,
    handles: HashMap<EntityId, TickHandle>,
}

impl TickService {
    pub fn new() -> Self {
        Self::from_controllers(TickPhase::ALL.map(TickController::new))
    }

    /// Service whose controllers report every callback to `profiler`.
    pub fn with_profiler(profiler: Arc<dyn TickProfiler>) -> Self {
        Self::from_controllers(
            TickPhase::ALL.map(|phase| TickController::with_profiler(phase, Arc::clone(&profiler))),
        )
    }

    fn from_controllers(controllers: [TickController; 3]) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                controllers,
                state: Mutex::new(ServiceState::default()),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    #[inline]
    pub fn controller(&self, phase: TickPhase) -> &TickController {
        self.inner.controller(phase)
    }

    /// Runs one occurrence of `phase`.
    #[inline]
    pub fn invoke(&self, phase: TickPhase, dt: f32) -> TickResult<()> {
        if self.is_disposed() {
            return Err(TickError::Disposed);
        }
        self.controller(phase).invoke(dt)
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Registers `entity` using its type-level default order.
    pub fn register<T: Tickable>(&self, entity: &Shared<T>) -> TickHandle {
        self.register_with_order(entity, default_order::<T>())
    }

    /// Registers `entity` in every phase `T` declares.
    ///
    /// Registering an entity that is already registered returns its existing
    /// handle. If no phase accepts it (no declared phase, or every controller
    /// already holds the callback) the returned handle is inert.
    pub fn register_with_order<T: Tickable>(&self, entity: &Shared<T>, order: i32) -> TickHandle {
        let id = EntityId::of(entity);
        let subject = Subject::Entity(id);

        if self.is_disposed() {
            log::debug!("register of '{}' ignored, service disposed", T::label());
            return TickHandle::inert(subject);
        }

        let mut state = self.inner.state.lock();
        if let Some(handle) = state.handles.get(&id) {
            log::debug!("'{}' already registered", T::label());
            return handle.clone();
        }

        let mut accepted = Vec::with_capacity(T::PHASES.len());
        for phase in T::PHASES.iter() {
            let callback = entity_callback(entity, phase);
            let record = TickRecord::new(order, T::label(), callback.clone());
            if self.controller(phase).add(record) {
                accepted.push((phase, callback));
            }
        }

        if accepted.is_empty() {
            log::debug!("'{}' registered nowhere (phases: {:?})", T::label(), T::PHASES);
            return TickHandle::inert(subject);
        }

        let handle = TickHandle::new(subject);
        let weak = Arc::downgrade(&self.inner);
        handle.on_disposed(move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.unregister(id);
            }
        });

        log::debug!(
            "'{}' registered in {:?} with order {}",
            T::label(),
            accepted.iter().map(|(p, _)| *p).collect::<PhaseSet>(),
            order
        );

        state.controllers.insert(id, accepted);
        state.handles.insert(id, handle.clone());
        handle
    }

    /// Registers a bare callback for a single phase.
    ///
    /// Returns `None` when the controller rejects it.
    pub fn add_fn<F>(&self, phase: TickPhase, order: i32, owner: &str, f: F) -> Option<TickHandle>
    where
        F: FnMut(f32) -> TickResult<()> + Send + 'static,
    {
        self.add_callback(phase, order, owner, TickCallback::new(f))
    }

    /// Registers an existing callback for a single phase.
    ///
    /// Returns `None` when the controller already holds it.
    pub fn add_callback(
        &self,
        phase: TickPhase,
        order: i32,
        owner: &str,
        callback: TickCallback,
    ) -> Option<TickHandle> {
        if self.is_disposed() {
            return None;
        }

        if !self.controller(phase).add(TickRecord::new(order, owner, callback.clone())) {
            return None;
        }

        let handle = TickHandle::new(Subject::Callback(phase, callback.id()));
        let weak: Weak<ServiceInner> = Arc::downgrade(&self.inner);
        handle.on_disposed(move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.controller(phase).remove(callback.id());
            }
        });
        Some(handle)
    }

    pub fn is_registered<T: Tickable>(&self, entity: &Shared<T>) -> bool {
        self.inner.state.lock().handles.contains_key(&EntityId::of(entity))
    }

    /// Phases the entity was accepted into; empty when unregistered.
    pub fn registered_phases<T: Tickable>(&self, entity: &Shared<T>) -> PhaseSet {
        self.inner
            .state
            .lock()
            .controllers
            .get(&EntityId::of(entity))
            .map(|list| list.iter().map(|(p, _)| *p).collect())
            .unwrap_or_default()
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.inner.state.lock().handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tears everything down: controllers are disposed, every outstanding
    /// handle is marked disposed and both maps are cleared. Idempotent.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        for controller in self.inner.controllers.iter() {
            controller.dispose();
        }

        let handles = {
            let mut state = self.inner.state.lock();
            state.controllers.clear();
            std::mem::take(&mut state.handles)
        };

        log::info!("tick service disposed ({} registrations released)", handles.len());

        for handle in handles.into_values() {
            handle.dispose();
        }
    }
}

impl Default for TickService {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TickService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickService")
            .field("controllers", &self.inner.controllers)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl ServiceInner {
    #[inline]
    fn controller(&self, phase: TickPhase) -> &TickController {
        &self.controllers[phase as usize]
    }

    /// Handle disposal: removes the entity from every controller it landed in.
    fn unregister(&self, id: EntityId) {
        let entry = {
            let mut state = self.state.lock();
            state.handles.remove(&id);
            state.controllers.remove(&id)
        };

        let Some(list) = entry else { return };
        for (phase, callback) in list {
            self.controller(phase).remove(callback.id());
        }
    }
}

fn entity_callback<T: Tickable>(entity: &Shared<T>, phase: TickPhase) -> TickCallback {
    let entity = Arc::clone(entity);
    TickCallback::new(move |dt| dispatch(&mut *entity.lock(), phase, dt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tickable::shared;

    #[derive(Default)]
    struct Counter {
        fixed: u32,
        update: u32,
        late: u32,
    }

    impl Tickable for Counter {
        const PHASES: PhaseSet = PhaseSet::ALL;

        fn fixed_tick(&mut self, _dt: f32) -> TickResult<()> {
            self.fixed += 1;
            Ok(())
        }

        fn tick(&mut self, _dt: f32) -> TickResult<()> {
            self.update += 1;
            Ok(())
        }

        fn late_tick(&mut self, _dt: f32) -> TickResult<()> {
            self.late += 1;
            Ok(())
        }
    }

    struct Idle;

    impl Tickable for Idle {
        const PHASES: PhaseSet = PhaseSet::EMPTY;
    }

    fn frame(service: &TickService) {
        for phase in TickPhase::ALL {
            service.invoke(phase, 0.016).unwrap();
        }
    }

    #[test]
    fn fan_out_and_fan_in_touch_the_same_controllers() {
        let service = TickService::new();
        let e = shared(Counter::default());

        let h = service.register(&e);
        assert!(!h.is_inert());
        assert_eq!(service.registered_phases(&e), PhaseSet::ALL);

        frame(&service);
        for phase in TickPhase::ALL {
            assert_eq!(service.controller(phase).len(), 1);
        }

        h.dispose();
        assert!(!service.is_registered(&e));
        frame(&service);
        for phase in TickPhase::ALL {
            assert!(service.controller(phase).is_empty());
        }

        let c = e.lock();
        assert_eq!((c.fixed, c.update, c.late), (1, 1, 1));
    }

    #[test]
    fn second_register_returns_same_handle() {
        let service = TickService::new();
        let e = shared(Counter::default());

        let a = service.register(&e);
        let b = service.register_with_order(&e, -1);
        assert_eq!(a, b);
        assert_eq!(service.len(), 1);

        frame(&service);
        assert_eq!(e.lock().update, 1);
    }

    #[test]
    fn no_phases_gives_inert_handle() {
        let service = TickService::new();
        let e = shared(Idle);

        let h = service.register(&e);
        assert!(h.is_inert());
        assert!(!service.is_registered(&e));
        assert!(h.dispose());
        assert!(!h.dispose());
    }

    #[test]
    fn dispose_before_first_invoke_never_ticks() {
        let service = TickService::new();
        let e = shared(Counter::default());

        service.register(&e).dispose();
        frame(&service);

        let c = e.lock();
        assert_eq!((c.fixed, c.update, c.late), (0, 0, 0));
    }

    #[test]
    fn add_fn_rejects_duplicate_callbacks() {
        let service = TickService::new();
        let cb = TickCallback::new(|_| Ok(()));

        let h = service.add_callback(TickPhase::Update, 0, "cb", cb.clone());
        assert!(h.is_some());
        assert!(service.add_callback(TickPhase::Update, 5, "cb", cb.clone()).is_none());
        assert!(service.add_callback(TickPhase::LateUpdate, 5, "cb", cb.clone()).is_some());

        service.invoke(TickPhase::Update, 0.0).unwrap();
        assert!(service.controller(TickPhase::Update).contains(cb.id()));

        h.unwrap().dispose();
        service.invoke(TickPhase::Update, 0.0).unwrap();
        assert!(!service.controller(TickPhase::Update).contains(cb.id()));
        assert!(service.controller(TickPhase::LateUpdate).contains(cb.id()));
    }

    #[test]
    fn service_dispose_releases_everything() {
        let service = TickService::new();
        let e = shared(Counter::default());
        let h = service.register(&e);
        frame(&service);

        service.dispose();
        service.dispose();

        assert!(h.is_disposed());
        assert!(service.is_empty());
        assert!(service.register(&e).is_inert());
        assert!(matches!(service.invoke(TickPhase::Update, 0.0), Err(TickError::Disposed)));
        assert_eq!(Arc::strong_count(&e), 1);
    }
}
