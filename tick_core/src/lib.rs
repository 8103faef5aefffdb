//! Tick scheduling engine.
//!
//! Objects register periodic work for the fixed-step, per-frame and late
//! per-frame phases. Each phase has a [`TickController`] holding an ordered
//! callback list whose mutations are deferred to the start of the next
//! invocation, so callbacks may register or unregister anything (themselves
//! included) while the list is being walked. [`TickService`] fans a
//! [`Tickable`] out to the controllers it declares and hands back one
//! [`TickHandle`] that undoes all of them. [`FrameDriver`] is the host side
//! that calls the controllers once per phase occurrence.
//!
//! Callback failures are not swallowed: the first `Err` aborts the remainder
//! of that phase occurrence and is returned from `invoke`.

pub mod config;
pub mod controller;
pub mod error;
pub mod frame;
pub mod handle;
pub mod host;
pub mod phase;
pub mod record;
pub mod service;
pub mod signals;
pub mod telemetry;
pub mod tickable;

pub use config::TickConfig;
pub use controller::TickController;
pub use error::{TickError, TickResult};
pub use handle::{Subject, TickGuard, TickHandle};
pub use host::{FrameDriver, FrameReport, Time};
pub use phase::{PhaseSet, TickPhase};
pub use record::{CallbackId, TickCallback, TickRecord};
pub use service::TickService;
pub use tickable::{default_order, shared, EntityId, Shared, Tickable, DEFAULT_TICK_ORDER};
