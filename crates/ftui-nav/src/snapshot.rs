#![forbid(unsafe_code)]

//! Plain-data view of a route stack for diagnostics and test assertions.
//!
//! Snapshots carry keys only; host tokens and removal hooks stay behind.
//! With the `serde` feature they serialize, which is handy for dumping the
//! navigation state into a log line or a golden file.

use crate::container::ContainerId;
use crate::route::RouteKey;

/// One container in a [`StackSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContainerSnapshot {
    /// Raw container id.
    pub id: u64,
    /// Routes bottom to top.
    pub routes: Vec<(String, u32)>,
}

/// Containers in creation order plus the ledger sorted by URL.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StackSnapshot {
    pub containers: Vec<ContainerSnapshot>,
    pub ledger: Vec<(String, u32)>,
}

impl ContainerSnapshot {
    pub(crate) fn new(id: ContainerId, keys: impl IntoIterator<Item = RouteKey>) -> Self {
        Self {
            id: id.raw(),
            routes: keys.into_iter().map(|k| (k.url, k.index)).collect(),
        }
    }
}

impl StackSnapshot {
    /// Total routes across every container.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.containers.iter().map(|c| c.routes.len()).sum()
    }

    /// Whether no container is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}
