#![forbid(unsafe_code)]

//! Container identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of one navigation container (e.g. a native screen hosting its
/// own page stack).
///
/// Ids come from a process-wide counter: every id is unique and compares
/// greater than every id generated before it, regardless of which
/// [`RouteStack`](crate::RouteStack) asked for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContainerId(u64);

impl ContainerId {
    /// Generate the next container id.
    #[must_use]
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a container id from a raw value.
    ///
    /// Raw ids do not take part in the ordering guarantee of [`Self::next`];
    /// use them to refer to ids previously obtained from [`Self::raw`].
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Container({})", self.0)
    }
}
