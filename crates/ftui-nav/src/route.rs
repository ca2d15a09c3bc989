#![forbid(unsafe_code)]

//! Route records and their keys.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Finalization hook invoked exactly once when a record leaves the stack.
pub type RemovalHook = Box<dyn FnOnce()>;

/// Identity of one pushed record.
///
/// Ids come from a process-wide counter, so a record from one
/// [`RouteStack`](crate::RouteStack) never matches a record of another.
/// Two records are "the same record" only when their ids match; equal
/// `(url, index)` keys are not enough once a page has been popped and
/// pushed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteId(u64);

impl RouteId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a route id from a raw value.
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

/// The `(url, index)` pair identifying an open page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub url: String,
    pub index: u32,
}

impl RouteKey {
    #[must_use]
    pub fn new(url: impl Into<String>, index: u32) -> Self {
        Self {
            url: url.into(),
            index,
        }
    }

    fn matches(&self, url: &str, index: u32) -> bool {
        self.index == index && self.url == url
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Route({})", self.0)
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.url, self.index)
    }
}

/// One open page.
///
/// `token` is the host's controller descriptor; the stack never looks at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRecord<T> {
    id: RouteId,
    url: String,
    index: u32,
    token: T,
}

impl<T> RouteRecord<T> {
    pub(crate) fn new(id: RouteId, url: String, index: u32, token: T) -> Self {
        Self {
            id,
            url,
            index,
            token,
        }
    }

    /// Stack-unique identity of this record.
    #[inline]
    #[must_use]
    pub fn id(&self) -> RouteId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sequence index of this page among open pages with the same URL.
    #[inline]
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    #[must_use]
    pub fn token(&self) -> &T {
        &self.token
    }

    /// Owned `(url, index)` key of this record.
    #[must_use]
    pub fn key(&self) -> RouteKey {
        RouteKey::new(self.url.clone(), self.index)
    }

    /// Whether this record carries the given key.
    #[must_use]
    pub fn has_key(&self, key: &RouteKey) -> bool {
        key.matches(&self.url, self.index)
    }

    /// Consume the record, returning the host token.
    pub fn into_token(self) -> T {
        self.token
    }
}
