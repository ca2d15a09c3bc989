#![forbid(unsafe_code)]

//! Configuration for [`RouteStack`](crate::RouteStack).

/// How [`RouteStack::pop_to`](crate::RouteStack::pop_to) behaves when the
/// target record is not on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PopToMode {
    /// Locate the target first; fail without touching the stack.
    #[default]
    Atomic,
    /// Pop while scanning. A missing target leaves every container drained
    /// up to the point of failure.
    Incremental,
}

/// Configuration for a route stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteStackConfig {
    /// Emit `tracing` events for pushes, pops and container changes.
    pub trace_transitions: bool,
    /// Failure behavior of `pop_to`.
    pub pop_to_mode: PopToMode,
    /// Maximum number of live containers accepted by
    /// `try_create_container` (0 = unlimited).
    pub max_containers: usize,
}

impl Default for RouteStackConfig {
    fn default() -> Self {
        Self {
            trace_transitions: true,
            pop_to_mode: PopToMode::Atomic,
            max_containers: 0,
        }
    }
}

impl RouteStackConfig {
    /// Create a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable transition tracing.
    #[must_use]
    pub fn with_trace_transitions(mut self, enabled: bool) -> Self {
        self.trace_transitions = enabled;
        self
    }

    /// Set the `pop_to` failure behavior.
    #[must_use]
    pub fn with_pop_to_mode(mut self, mode: PopToMode) -> Self {
        self.pop_to_mode = mode;
        self
    }

    /// Cap the number of live containers (0 = unlimited).
    #[must_use]
    pub fn with_max_containers(mut self, max: usize) -> Self {
        self.max_containers = max;
        self
    }

    /// Quiet configuration (no tracing), handy in tests and benchmarks.
    #[must_use]
    pub fn quiet() -> Self {
        Self::default().with_trace_transitions(false)
    }
}
