use thiserror::Error;

use crate::phase::TickPhase;

/// Tick-engine error.
///
/// Registration outcomes are never reported through this type: duplicate adds,
/// absent removals and repeated disposal are plain `bool`/`Option` results.
/// Only failures raised by tick callbacks and misuse of a torn-down scheduler
/// end up here.
#[derive(Debug, Error)]
pub enum TickError {
    /// The controller (or the whole service) was disposed before this call.
    #[error("tick controller disposed")]
    Disposed,

    /// `invoke` was called from inside one of the controller's own callbacks.
    #[error("tick controller '{0}' invoked re-entrantly")]
    Reentrant(&'static str),

    /// A tick callback failed; the rest of the phase occurrence was skipped.
    #[error("{owner}.{}() failed: {cause}", .phase.method_name())]
    Callback {
        phase: TickPhase,
        owner: String,
        #[source]
        cause: Box<TickError>,
    },

    /// Generic error (fallback). Callbacks usually produce this one.
    #[error("{0}")]
    Other(String),
}

impl TickError {
    #[inline]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Attributes a callback failure to the record that produced it.
    pub fn in_callback(phase: TickPhase, owner: &str, err: TickError) -> Self {
        TickError::Callback {
            phase,
            owner: owner.to_string(),
            cause: Box::new(err),
        }
    }
}

impl From<&str> for TickError {
    #[inline]
    fn from(value: &str) -> Self {
        TickError::Other(value.to_string())
    }
}

impl From<String> for TickError {
    #[inline]
    fn from(value: String) -> Self {
        TickError::Other(value)
    }
}

pub type TickResult<T> = Result<T, TickError>;
