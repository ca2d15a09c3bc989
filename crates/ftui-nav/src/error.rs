#![forbid(unsafe_code)]

//! Errors from route stack operations.
//!
//! Every variant is a precondition violation. Nothing is retried and
//! nothing is recovered internally; the host decides whether to ignore,
//! log, or surface the failure.

use crate::container::ContainerId;
use crate::route::{RouteId, RouteKey};

/// Result alias for route stack operations.
pub type Result<T> = std::result::Result<T, RouteStackError>;

/// Errors from route stack operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteStackError {
    /// The container registry holds no containers.
    EmptyRegistry,
    /// A push targeted a container other than the last one.
    PushNotLast {
        requested: ContainerId,
        last: ContainerId,
    },
    /// A close targeted a container other than the last one.
    CloseNotLast {
        requested: ContainerId,
        last: ContainerId,
    },
    /// The container exists but holds no routes.
    EmptyContainer(ContainerId),
    /// A pop targeted something other than the top route of the last
    /// container.
    NotTopRoute(RouteKey),
    /// `pop_to` found no container whose routes include the target.
    RecordNotFound(RouteKey),
    /// A route id that is not on this stack.
    UnknownRoute(RouteId),
    /// No container holds a route with this key.
    NoMatchingKey(RouteKey),
    /// Every container is empty, or none exist.
    EmptyStack,
    /// No container holds a route with this url at or below this index.
    NoRouteAtOrBelow { url: String, index: u32 },
    /// The container is not in the registry.
    UnknownContainer(ContainerId),
    /// The ledger has no entry for this url.
    IndexNotFound(String),
    /// Creating another container would exceed the configured limit.
    ContainerLimit(usize),
}

impl std::fmt::Display for RouteStackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyRegistry => write!(f, "container registry must not be empty"),
            Self::PushNotLast { requested, last } => write!(
                f,
                "only the last container accepts pushes ({requested} is not {last})"
            ),
            Self::CloseNotLast { requested, last } => write!(
                f,
                "only the last container may be closed ({requested} is not {last})"
            ),
            Self::EmptyContainer(id) => write!(f, "{id} has no routes"),
            Self::NotTopRoute(key) => write!(
                f,
                "only the topmost route of the topmost container may be popped (got {key})"
            ),
            Self::RecordNotFound(key) => write!(f, "no matching record found for {key}"),
            Self::UnknownRoute(id) => write!(f, "{id} is not on this stack"),
            Self::NoMatchingKey(key) => write!(f, "no container holds {key}"),
            Self::EmptyStack => write!(f, "stack is empty"),
            Self::NoRouteAtOrBelow { url, index } => {
                write!(f, "no route for '{url}' at or below index {index}")
            }
            Self::UnknownContainer(id) => write!(f, "{id} is not in the registry"),
            Self::IndexNotFound(url) => write!(f, "url '{url}' index not found"),
            Self::ContainerLimit(max) => write!(f, "container limit of {max} reached"),
        }
    }
}

impl std::error::Error for RouteStackError {}
