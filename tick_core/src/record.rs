use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::TickResult;

type TickFn = dyn FnMut(f32) -> TickResult<()> + Send;

/// Identity of a tick callback.
///
/// Two records built from clones of the same [`TickCallback`] share one id,
/// whatever their order or owner.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CallbackId(usize);

/// Shared tick callable. Cloning keeps the identity.
#[derive(Clone)]
pub struct TickCallback(Arc<Mutex<TickFn>>);

impl TickCallback {
    pub fn new<F>(f: F) -> Self
    where
        F: FnMut(f32) -> TickResult<()> + Send + 'static,
    {
        let f: Arc<Mutex<TickFn>> = Arc::new(Mutex::new(f));
        Self(f)
    }

    #[inline]
    pub fn id(&self) -> CallbackId {
        CallbackId(Arc::as_ptr(&self.0) as *const () as usize)
    }

    #[inline]
    pub(crate) fn call(&self, dt: f32) -> TickResult<()> {
        let mut tick = self.0.lock();
        (*tick)(dt)
    }
}

impl fmt::Debug for TickCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TickCallback").field(&self.id()).finish()
    }
}

/// One scheduled callback: order key, owner label and the callable.
///
/// Immutable once built. Equality is callback identity only.
#[derive(Clone)]
pub struct TickRecord {
    order: i32,
    owner: Arc<str>,
    callback: TickCallback,
}

impl TickRecord {
    pub fn new(order: i32, owner: impl Into<Arc<str>>, callback: TickCallback) -> Self {
        Self {
            order,
            owner: owner.into(),
            callback,
        }
    }

    #[inline]
    pub fn order(&self) -> i32 {
        self.order
    }

    #[inline]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[inline]
    pub fn callback(&self) -> &TickCallback {
        &self.callback
    }

    #[inline]
    pub fn id(&self) -> CallbackId {
        self.callback.id()
    }
}

impl PartialEq for TickRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for TickRecord {}

impl fmt::Debug for TickRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickRecord")
            .field("order", &self.order)
            .field("owner", &self.owner)
            .field("callback", &self.id())
            .finish()
    }
}
