use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::TickResult;
use crate::phase::{PhaseSet, TickPhase};

/// Order used when neither the caller nor the type supplies one.
/// Such tickables run after every ordered one, in registration order.
pub const DEFAULT_TICK_ORDER: i32 = i32::MAX;

/// An object with periodic work in one or more phases.
///
/// Participation is declared at the type level through [`Tickable::PHASES`];
/// the service only calls the tick methods listed there.
pub trait Tickable: Send + 'static {
    /// Phases this type takes part in.
    const PHASES: PhaseSet;

    /// Type-level default order, consulted only when the caller gives none.
    fn tick_order() -> Option<i32> {
        None
    }

    /// Owner name used in profiling labels and logs.
    fn label() -> &'static str {
        short_type_name::<Self>()
    }

    fn fixed_tick(&mut self, _dt: f32) -> TickResult<()> {
        Ok(())
    }

    fn tick(&mut self, _dt: f32) -> TickResult<()> {
        Ok(())
    }

    fn late_tick(&mut self, _dt: f32) -> TickResult<()> {
        Ok(())
    }
}

/// Shared, lockable tickable as accepted by the service.
pub type Shared<T> = Arc<Mutex<T>>;

/// Wraps a tickable for registration.
#[inline]
pub fn shared<T: Tickable>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// Order for `T` when no explicit order is given.
#[inline]
pub fn default_order<T: Tickable>() -> i32 {
    T::tick_order().unwrap_or(DEFAULT_TICK_ORDER)
}

/// Runs the tick method matching `phase`.
pub(crate) fn dispatch<T: Tickable>(entity: &mut T, phase: TickPhase, dt: f32) -> TickResult<()> {
    match phase {
        TickPhase::FixedUpdate => entity.fixed_tick(dt),
        TickPhase::Update => entity.tick(dt),
        TickPhase::LateUpdate => entity.late_tick(dt),
    }
}

/// Identity of a registered tickable (address of its shared cell).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntityId(usize);

impl EntityId {
    #[inline]
    pub fn of<T: ?Sized>(entity: &Arc<T>) -> Self {
        EntityId(Arc::as_ptr(entity) as *const () as usize)
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: usize) -> Self {
        EntityId(raw)
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
