//! The process-wide hardmount retry interval and its sentinel values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Seconds a hardmount retry waits before giving up.
///
/// The interval is shared by every cell. Two values carry meaning beyond a
/// duration: [`RetryInterval::DEFERRED`] and
/// [`RetryInterval::FORCE_IMMEDIATE`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetryInterval(u32);

impl RetryInterval {
    /// Global retry toggle changes are only applied lazily, on the next
    /// forced apply, while the interval is zero.
    pub const DEFERRED: Self = Self(0);

    /// Interval the client adopts when a per-cell hardmount is switched on
    /// while the interval is [`DEFERRED`](Self::DEFERRED). A remote per-cell
    /// write at this interval resets the shared retry toggle.
    pub const FORCE_IMMEDIATE: Self = Self(60);

    /// Interval set before the final read-back so forcing state does not
    /// change it.
    pub const VERIFICATION: Self = Self(1);

    /// Largest interval the operation planner draws.
    pub const PLANNED_MAX: Self = Self(3);

    /// Wrap a raw number of seconds.
    #[must_use]
    pub const fn from_secs(secs: u32) -> Self { Self(secs) }

    /// Raw number of seconds.
    #[must_use]
    pub const fn secs(self) -> u32 { self.0 }

    /// Returns `true` for the [`DEFERRED`](Self::DEFERRED) sentinel.
    #[must_use]
    pub const fn is_deferred(self) -> bool { self.0 == Self::DEFERRED.0 }

    /// Returns `true` for the [`FORCE_IMMEDIATE`](Self::FORCE_IMMEDIATE)
    /// sentinel.
    #[must_use]
    pub const fn is_force_immediate(self) -> bool { self.0 == Self::FORCE_IMMEDIATE.0 }
}

impl fmt::Display for RetryInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}
