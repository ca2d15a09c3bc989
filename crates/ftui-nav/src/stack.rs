#![forbid(unsafe_code)]

//! Segmented route stack: a stack of page stacks with a shared index ledger.
//!
//! [`RouteStack`] keeps one ordered page sequence per navigation container
//! and a ledger mapping each URL to its highest active sequence index.
//!
//! # Invariants
//!
//! 1. Containers are ordered by creation; since [`ContainerId`]s are
//!    monotonic, the registry is also sorted by id.
//! 2. Only the last container accepts `push`, `close_container` and `pop`.
//! 3. A container is removed as soon as a pop drains it. Freshly created
//!    containers stay empty until their first push.
//! 4. For URLs pushed and popped in global LIFO order, the ledger value
//!    equals the number of open routes with that URL.
//! 5. Every removal hook runs exactly once: when its record is popped,
//!    drained by `pop_to`/`close_container`/`clear`, or when the stack drops.
//!
//! ```text
//! push(c2, "/a")
//! ┌──────────────────────────────────────────┐
//! │ Container(1): [/a#1, /b#1]               │
//! │ Container(2): [/c#1, /a#2]   <- last     │
//! │ Ledger:       /a → 2, /b → 1, /c → 1     │
//! └──────────────────────────────────────────┘
//!
//! pop_to(/b#1)
//! ┌──────────────────────────────────────────┐
//! │ Container(1): [/a#1, /b#1]   <- last     │
//! │ Ledger:       /a → 1, /b → 1             │
//! └──────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, trace, warn};

use crate::config::{PopToMode, RouteStackConfig};
use crate::container::ContainerId;
use crate::error::{Result, RouteStackError};
use crate::ledger::IndexLedger;
use crate::route::{RemovalHook, RouteId, RouteKey, RouteRecord};
use crate::snapshot::{ContainerSnapshot, StackSnapshot};

const TRACE_TARGET: &str = "ftui_nav::stack";

/// One navigation container and its pages, bottom to top.
struct Container<T> {
    id: ContainerId,
    routes: Vec<RouteRecord<T>>,
}

/// Registry of navigation containers plus the per-URL index ledger.
///
/// `T` is the host's controller token; it is stored and handed back but
/// never inspected.
pub struct RouteStack<T> {
    /// Containers in creation order (last = topmost).
    containers: Vec<Container<T>>,
    /// Highest active index per URL, shared by every container.
    ledger: IndexLedger,
    /// Pending removal hooks keyed by record identity.
    hooks: HashMap<RouteId, RemovalHook>,
    config: RouteStackConfig,
}

impl<T> fmt::Debug for RouteStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteStack")
            .field("containers", &self.containers.len())
            .field("routes", &self.route_count())
            .field("ledger", &self.ledger)
            .field("pending_hooks", &self.hooks.len())
            .field("config", &self.config)
            .finish()
    }
}

impl<T> Default for RouteStack<T> {
    fn default() -> Self {
        Self::new(RouteStackConfig::default())
    }
}

impl<T> Drop for RouteStack<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T> RouteStack<T> {
    /// Create an empty stack with the given configuration.
    #[must_use]
    pub fn new(config: RouteStackConfig) -> Self {
        Self {
            containers: Vec::new(),
            ledger: IndexLedger::new(),
            hooks: HashMap::new(),
            config,
        }
    }

    // ========================================================================
    // Containers
    // ========================================================================

    /// Open a new, empty container on top of the registry.
    pub fn create_container(&mut self) -> ContainerId {
        let id = ContainerId::next();
        self.containers.push(Container {
            id,
            routes: Vec::new(),
        });
        if self.config.trace_transitions {
            trace!(target: TRACE_TARGET, container = %id, "container created");
        }
        id
    }

    /// Like [`Self::create_container`], honoring `max_containers`.
    pub fn try_create_container(&mut self) -> Result<ContainerId> {
        let max = self.config.max_containers;
        if max > 0 && self.containers.len() >= max {
            return self.reject(RouteStackError::ContainerLimit(max));
        }
        Ok(self.create_container())
    }

    /// Close the last container, popping its routes top to bottom.
    ///
    /// Returns the removed records in pop order.
    pub fn close_container(&mut self, id: ContainerId) -> Result<Vec<RouteRecord<T>>> {
        let last = self.last_id()?;
        if id != last {
            return self.reject(RouteStackError::CloseNotLast { requested: id, last });
        }
        let Some(mut container) = self.containers.pop() else {
            return self.reject(RouteStackError::EmptyRegistry);
        };
        let mut removed = Vec::with_capacity(container.routes.len());
        while let Some(record) = container.routes.pop() {
            self.finalize(id, &record);
            removed.push(record);
        }
        if self.config.trace_transitions {
            trace!(target: TRACE_TARGET, container = %id, popped = removed.len(), "container closed");
        }
        Ok(removed)
    }

    // ========================================================================
    // Pops
    // ========================================================================

    /// Pop `record`, which must be the top route of the last container.
    ///
    /// An emptied container is removed from the registry.
    pub fn pop(&mut self, record: &RouteRecord<T>) -> Result<RouteRecord<T>> {
        self.pop_target(record.id(), Some(record))
    }

    /// Pop the route with id `route`, which must be the top route of the
    /// last container.
    pub fn pop_route(&mut self, route: RouteId) -> Result<RouteRecord<T>> {
        self.pop_target(route, None)
    }

    /// Pop whatever route is on top of the last container.
    pub fn pop_top(&mut self) -> Result<RouteRecord<T>> {
        let Some(container) = self.containers.last() else {
            return self.reject(RouteStackError::EmptyRegistry);
        };
        if container.routes.is_empty() {
            let id = container.id;
            return self.reject(RouteStackError::EmptyContainer(id));
        }
        self.pop_last()
    }

    /// Pop routes until `record` is on top, crossing container boundaries.
    ///
    /// `record` itself stays. Containers emptied on the way are removed.
    /// Returns the removed records in pop order.
    ///
    /// With [`PopToMode::Atomic`] a missing target fails before anything is
    /// popped, and containers above the target that never received a push
    /// are discarded. With [`PopToMode::Incremental`] the unwind fails at
    /// the first such container, or when the registry runs out, leaving the
    /// stack drained up to that point.
    pub fn pop_to(&mut self, record: &RouteRecord<T>) -> Result<Vec<RouteRecord<T>>> {
        self.pop_to_target(record.id(), Some(record))
    }

    /// Like [`Self::pop_to`], naming the target by id.
    pub fn pop_to_route(&mut self, route: RouteId) -> Result<Vec<RouteRecord<T>>> {
        self.pop_to_target(route, None)
    }

    fn pop_to_target(
        &mut self,
        target: RouteId,
        record: Option<&RouteRecord<T>>,
    ) -> Result<Vec<RouteRecord<T>>> {
        let missing = || match record {
            Some(record) => RouteStackError::RecordNotFound(record.key()),
            None => RouteStackError::UnknownRoute(target),
        };
        if self.containers.is_empty() {
            return self.reject(RouteStackError::EmptyRegistry);
        }
        let incremental = self.config.pop_to_mode == PopToMode::Incremental;
        if !incremental && !self.holds(target) {
            return self.reject(missing());
        }

        let mut removed = Vec::new();
        loop {
            let top = self
                .containers
                .last()
                .map(|c| (c.id, c.routes.last().map(RouteRecord::id)));
            match top {
                None => break,
                Some((_, Some(id))) if id == target => return Ok(removed),
                Some((_, Some(_))) => removed.push(self.pop_last()?),
                // A container that never received a push stops an
                // incremental unwind, as the drain-as-you-go navigator
                // always did. Atomic mode already knows the target lies
                // below, so the empty container is discarded instead.
                Some((_, None)) if incremental => break,
                Some((id, None)) => {
                    self.containers.pop();
                    if self.config.trace_transitions {
                        trace!(target: TRACE_TARGET, container = %id, "empty container dropped");
                    }
                }
            }
        }
        self.reject(missing())
    }

    /// Remove every container, popping routes last container first and top
    /// to bottom. Removal hooks fire in that order.
    pub fn clear(&mut self) {
        while let Some(mut container) = self.containers.pop() {
            while let Some(record) = container.routes.pop() {
                self.finalize(container.id, &record);
            }
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Id of the most recent container holding a route with the same
    /// `(url, index)` as `record`.
    pub fn find_container(&self, record: &RouteRecord<T>) -> Result<ContainerId> {
        self.find_by(record.url(), record.index())
            .ok_or_else(|| RouteStackError::NoMatchingKey(record.key()))
    }

    /// Like [`Self::find_container`], matching a bare key.
    pub fn find_container_by_key(&self, key: &RouteKey) -> Result<ContainerId> {
        self.find_by(&key.url, key.index)
            .ok_or_else(|| RouteStackError::NoMatchingKey(key.clone()))
    }

    /// Whether any container is open.
    #[must_use]
    pub fn route_exists(&self) -> bool {
        !self.containers.is_empty()
    }

    /// Whether container `id` exists and holds at least one route.
    #[must_use]
    pub fn route_exists_in(&self, id: ContainerId) -> bool {
        self.container(id).is_ok_and(|c| !c.routes.is_empty())
    }

    /// Whether at least one page of `url` is open.
    #[must_use]
    pub fn url_exists(&self, url: &str) -> bool {
        self.ledger.contains(url)
    }

    /// Whether at least `index` pages of `url` are open.
    #[must_use]
    pub fn route_exists_at(&self, url: &str, index: u32) -> bool {
        self.ledger.covers(url, index)
    }

    /// Top route of the most recent non-empty container.
    pub fn top_route(&self) -> Result<&RouteRecord<T>> {
        self.containers
            .iter()
            .rev()
            .find_map(|c| c.routes.last())
            .ok_or(RouteStackError::EmptyStack)
    }

    /// Top route of container `id`.
    pub fn top_route_in(&self, id: ContainerId) -> Result<&RouteRecord<T>> {
        self.non_empty(id)?
            .last()
            .ok_or(RouteStackError::EmptyContainer(id))
    }

    /// Topmost route of `url` with an index no greater than `index`,
    /// searching the most recent container first.
    pub fn top_route_at_or_below(&self, url: &str, index: u32) -> Result<&RouteRecord<T>> {
        self.containers
            .iter()
            .rev()
            .find_map(|c| {
                c.routes
                    .iter()
                    .rev()
                    .find(|r| r.url() == url && r.index() <= index)
            })
            .ok_or_else(|| RouteStackError::NoRouteAtOrBelow {
                url: url.to_owned(),
                index,
            })
    }

    /// Bottom (oldest) route of container `id`.
    pub fn first_route_in(&self, id: ContainerId) -> Result<&RouteRecord<T>> {
        self.non_empty(id)?
            .first()
            .ok_or(RouteStackError::EmptyContainer(id))
    }

    /// Routes of container `id`, bottom to top.
    pub fn all_routes_in(&self, id: ContainerId) -> Result<&[RouteRecord<T>]> {
        self.non_empty(id)
    }

    /// Highest active index for `url`.
    pub fn last_index_of(&self, url: &str) -> Result<u32> {
        self.ledger
            .last_index(url)
            .ok_or_else(|| RouteStackError::IndexNotFound(url.to_owned()))
    }

    // ========================================================================
    // Info
    // ========================================================================

    /// Number of open containers.
    #[must_use]
    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    /// Number of open routes across every container.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.containers.iter().map(|c| c.routes.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// The container that currently accepts pushes.
    #[must_use]
    pub fn last_container(&self) -> Option<ContainerId> {
        self.containers.last().map(|c| c.id)
    }

    /// Open containers in creation order.
    pub fn container_ids(&self) -> impl DoubleEndedIterator<Item = ContainerId> + '_ {
        self.containers.iter().map(|c| c.id)
    }

    #[must_use]
    pub fn config(&self) -> &RouteStackConfig {
        &self.config
    }

    /// Key-only view of the registry and ledger.
    #[must_use]
    pub fn snapshot(&self) -> StackSnapshot {
        StackSnapshot {
            containers: self
                .containers
                .iter()
                .map(|c| ContainerSnapshot::new(c.id, c.routes.iter().map(RouteRecord::key)))
                .collect(),
            ledger: self.ledger.sorted_entries(),
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn last_id(&self) -> Result<ContainerId> {
        match self.containers.last() {
            Some(c) => Ok(c.id),
            None => self.reject(RouteStackError::EmptyRegistry),
        }
    }

    fn container(&self, id: ContainerId) -> Result<&Container<T>> {
        self.containers
            .binary_search_by_key(&id, |c| c.id)
            .map(|pos| &self.containers[pos])
            .map_err(|_| RouteStackError::UnknownContainer(id))
    }

    fn non_empty(&self, id: ContainerId) -> Result<&[RouteRecord<T>]> {
        let container = self.container(id)?;
        if container.routes.is_empty() {
            return Err(RouteStackError::EmptyContainer(id));
        }
        Ok(&container.routes)
    }

    fn find_by(&self, url: &str, index: u32) -> Option<ContainerId> {
        self.containers
            .iter()
            .rev()
            .find(|c| {
                c.routes
                    .iter()
                    .rev()
                    .any(|r| r.index() == index && r.url() == url)
            })
            .map(|c| c.id)
    }

    fn locate(&self, target: RouteId) -> Option<&RouteRecord<T>> {
        self.containers
            .iter()
            .flat_map(|c| c.routes.iter())
            .find(|r| r.id() == target)
    }

    fn pop_target(
        &mut self,
        target: RouteId,
        record: Option<&RouteRecord<T>>,
    ) -> Result<RouteRecord<T>> {
        let Some(container) = self.containers.last() else {
            return self.reject(RouteStackError::EmptyRegistry);
        };
        let (id, top) = (container.id, container.routes.last().map(RouteRecord::id));
        match top {
            None => self.reject(RouteStackError::EmptyContainer(id)),
            Some(top) if top != target => {
                let err = match record.or_else(|| self.locate(target)) {
                    Some(record) => RouteStackError::NotTopRoute(record.key()),
                    None => RouteStackError::UnknownRoute(target),
                };
                self.reject(err)
            }
            Some(_) => self.pop_last(),
        }
    }

    fn holds(&self, target: RouteId) -> bool {
        self.containers
            .iter()
            .any(|c| c.routes.iter().any(|r| r.id() == target))
    }

    /// Pop the top of the last container, dropping the container if it
    /// becomes empty.
    fn pop_last(&mut self) -> Result<RouteRecord<T>> {
        let Some(container) = self.containers.last_mut() else {
            return Err(RouteStackError::EmptyRegistry);
        };
        let id = container.id;
        let record = container
            .routes
            .pop()
            .ok_or(RouteStackError::EmptyContainer(id))?;
        let drained = container.routes.is_empty();
        self.finalize(id, &record);
        if drained {
            self.containers.pop();
            if self.config.trace_transitions {
                trace!(target: TRACE_TARGET, container = %id, "container drained");
            }
        }
        Ok(record)
    }

    /// Release the ledger slot and fire the removal hook of a record that
    /// has just left its container.
    fn finalize(&mut self, container: ContainerId, record: &RouteRecord<T>) {
        self.ledger.record_pop(record.url(), record.index());
        if let Some(hook) = self.hooks.remove(&record.id()) {
            hook();
        }
        if self.config.trace_transitions {
            debug!(
                target: TRACE_TARGET,
                url = record.url(),
                index = record.index(),
                container = %container,
                "route popped"
            );
        }
    }

    fn reject<R>(&self, err: RouteStackError) -> Result<R> {
        if self.config.trace_transitions {
            warn!(target: TRACE_TARGET, error = %err, "route stack precondition violated");
        }
        Err(err)
    }
}

impl<T> RouteStack<T> {
    /// Push a page of `url` onto container `id`, which must be the last one,
    /// returning a reference to the stored record.
    ///
    /// The record's index is one past the ledger's current value for `url`
    /// (or 1 for the first open page of that URL). Tokens need not be
    /// `Clone`; keep the record's [`RouteId`] to pop it later through
    /// [`Self::pop_route`] or [`Self::pop_to_route`].
    pub fn push_record(
        &mut self,
        id: ContainerId,
        url: impl Into<String>,
        token: T,
    ) -> Result<&RouteRecord<T>> {
        self.push_inner(id, url.into(), token, None)
    }

    /// Like [`Self::push_record`], registering a hook that runs once when
    /// the record leaves the stack.
    pub fn push_record_with_hook(
        &mut self,
        id: ContainerId,
        url: impl Into<String>,
        token: T,
        on_removed: impl FnOnce() + 'static,
    ) -> Result<&RouteRecord<T>> {
        self.push_inner(id, url.into(), token, Some(Box::new(on_removed)))
    }

    fn push_inner(
        &mut self,
        id: ContainerId,
        url: String,
        token: T,
        on_removed: Option<RemovalHook>,
    ) -> Result<&RouteRecord<T>> {
        let last = self.last_id()?;
        if id != last {
            return self.reject(RouteStackError::PushNotLast {
                requested: id,
                last,
            });
        }

        let index = self.ledger.next_index(&url);
        let route_id = RouteId::next();
        self.ledger.record_push(&url, index);
        if let Some(hook) = on_removed {
            self.hooks.insert(route_id, hook);
        }
        if self.config.trace_transitions {
            debug!(
                target: TRACE_TARGET,
                url = url.as_str(),
                index,
                container = %id,
                "route pushed"
            );
        }

        let Some(container) = self.containers.last_mut() else {
            return Err(RouteStackError::EmptyRegistry);
        };
        container
            .routes
            .push(RouteRecord::new(route_id, url, index, token));
        container
            .routes
            .last()
            .ok_or(RouteStackError::EmptyContainer(id))
    }
}

impl<T: Clone> RouteStack<T> {
    /// Push a page of `url` onto container `id`, which must be the last one.
    ///
    /// Returns an owned copy of the stored record; see
    /// [`Self::push_record`] for tokens that are not `Clone`.
    pub fn push(
        &mut self,
        id: ContainerId,
        url: impl Into<String>,
        token: T,
    ) -> Result<RouteRecord<T>> {
        self.push_record(id, url, token).cloned()
    }

    /// Like [`Self::push`], registering a hook that runs once when the
    /// record leaves the stack.
    pub fn push_with_hook(
        &mut self,
        id: ContainerId,
        url: impl Into<String>,
        token: T,
        on_removed: impl FnOnce() + 'static,
    ) -> Result<RouteRecord<T>> {
        self.push_record_with_hook(id, url, token, on_removed)
            .cloned()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn quiet() -> RouteStack<&'static str> {
        RouteStack::new(RouteStackConfig::quiet())
    }

    /// Hook that appends `label` to a shared log.
    fn log_hook(log: &Rc<RefCell<Vec<String>>>, label: &str) -> impl FnOnce() + 'static {
        let log = Rc::clone(log);
        let label = label.to_owned();
        move || log.borrow_mut().push(label)
    }

    #[test]
    fn new_stack_is_empty() {
        let stack = quiet();
        assert!(stack.is_empty());
        assert!(!stack.route_exists());
        assert_eq!(stack.container_count(), 0);
        assert_eq!(stack.route_count(), 0);
        assert_eq!(stack.top_route(), Err(RouteStackError::EmptyStack));
    }

    #[test]
    fn push_assigns_sequential_indexes() {
        let mut stack = quiet();
        let c1 = stack.create_container();
        let r1 = stack.push(c1, "/a", "A").unwrap();
        let r2 = stack.push(c1, "/a", "A").unwrap();
        let r3 = stack.push(c1, "/b", "B").unwrap();
        assert_eq!((r1.index(), r2.index(), r3.index()), (1, 2, 1));
        assert_ne!(r1.id(), r2.id());
        assert_eq!(stack.last_index_of("/a"), Ok(2));
        assert_eq!(stack.last_index_of("/b"), Ok(1));
    }

    #[test]
    fn push_on_empty_registry_fails() {
        let mut stack = quiet();
        let err = stack.push(ContainerId::from_raw(1), "/a", "A").unwrap_err();
        assert_eq!(err, RouteStackError::EmptyRegistry);
    }

    #[test]
    fn push_to_non_last_container_fails() {
        let mut stack = quiet();
        let c1 = stack.create_container();
        let c2 = stack.create_container();
        let err = stack.push(c1, "/a", "A").unwrap_err();
        assert_eq!(
            err,
            RouteStackError::PushNotLast {
                requested: c1,
                last: c2
            }
        );
        assert!(!stack.url_exists("/a"));
    }

    #[test]
    fn pop_updates_ledger_and_drops_drained_container() {
        let mut stack = quiet();
        let c1 = stack.create_container();
        let r1 = stack.push(c1, "/a", "A").unwrap();
        let r2 = stack.push(c1, "/a", "A").unwrap();

        stack.pop(&r2).unwrap();
        assert_eq!(stack.last_index_of("/a"), Ok(1));
        assert!(stack.route_exists_in(c1));

        stack.pop(&r1).unwrap();
        assert!(!stack.url_exists("/a"));
        assert!(!stack.route_exists());
        assert_eq!(
            stack.last_index_of("/a"),
            Err(RouteStackError::IndexNotFound("/a".into()))
        );
    }

    #[test]
    fn pop_non_top_fails() {
        let mut stack = quiet();
        let c1 = stack.create_container();
        let r1 = stack.push(c1, "/a", "A").unwrap();
        let _r2 = stack.push(c1, "/b", "B").unwrap();
        let err = stack.pop(&r1).unwrap_err();
        assert_eq!(err, RouteStackError::NotTopRoute(RouteKey::new("/a", 1)));
        assert_eq!(stack.route_count(), 2);
    }

    #[test]
    fn pop_from_lower_container_fails() {
        let mut stack = quiet();
        let c1 = stack.create_container();
        let r1 = stack.push(c1, "/a", "A").unwrap();
        let c2 = stack.create_container();
        stack.push(c2, "/b", "B").unwrap();
        assert!(matches!(
            stack.pop(&r1),
            Err(RouteStackError::NotTopRoute(_))
        ));
    }

    #[test]
    fn pop_on_fresh_container_fails() {
        let mut stack = quiet();
        let c1 = stack.create_container();
        let r1 = stack.push(c1, "/a", "A").unwrap();
        let c2 = stack.create_container();
        assert_eq!(stack.pop(&r1), Err(RouteStackError::EmptyContainer(c2)));
        assert_eq!(stack.pop_top(), Err(RouteStackError::EmptyContainer(c2)));
    }

    #[test]
    fn pop_is_identity_based() {
        let mut stack = quiet();
        let c1 = stack.create_container();
        let first = stack.push(c1, "/a", "A").unwrap();
        stack.pop(&first).unwrap();

        let c2 = stack.create_container();
        let second = stack.push(c2, "/a", "A").unwrap();
        assert_eq!(first.key(), second.key());
        // Same key, different record.
        assert!(matches!(
            stack.pop(&first),
            Err(RouteStackError::NotTopRoute(_))
        ));
        stack.pop(&second).unwrap();
    }

    #[test]
    fn pop_top() {
        let mut stack = quiet();
        assert_eq!(stack.pop_top(), Err(RouteStackError::EmptyRegistry));
        let c1 = stack.create_container();
        stack.push(c1, "/a", "A").unwrap();
        let popped = stack.pop_top().unwrap();
        assert_eq!(popped.url(), "/a");
        assert!(stack.is_empty());
    }

    #[test]
    fn hooks_fire_once_on_pop() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut stack = quiet();
        let c1 = stack.create_container();
        let r1 = stack
            .push_with_hook(c1, "/a", "A", log_hook(&log, "a"))
            .unwrap();
        assert!(log.borrow().is_empty());
        stack.pop(&r1).unwrap();
        assert_eq!(*log.borrow(), vec!["a"]);
        stack.clear();
        assert_eq!(*log.borrow(), vec!["a"]);
    }

    #[test]
    fn close_container_drains_top_to_bottom() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut stack = quiet();
        let c1 = stack.create_container();
        stack
            .push_with_hook(c1, "/a", "A", log_hook(&log, "a"))
            .unwrap();
        stack
            .push_with_hook(c1, "/b", "B", log_hook(&log, "b"))
            .unwrap();

        let removed = stack.close_container(c1).unwrap();
        let urls: Vec<&str> = removed.iter().map(RouteRecord::url).collect();
        assert_eq!(urls, vec!["/b", "/a"]);
        assert_eq!(*log.borrow(), vec!["b", "a"]);
        assert!(stack.is_empty());
        assert!(stack.snapshot().ledger.is_empty());
    }

    #[test]
    fn close_container_preconditions() {
        let mut stack = quiet();
        assert_eq!(
            stack.close_container(ContainerId::from_raw(1)),
            Err(RouteStackError::EmptyRegistry)
        );
        let c1 = stack.create_container();
        let c2 = stack.create_container();
        assert_eq!(
            stack.close_container(c1),
            Err(RouteStackError::CloseNotLast {
                requested: c1,
                last: c2
            })
        );
        assert_eq!(stack.close_container(c2), Ok(Vec::new()));
        assert_eq!(stack.last_container(), Some(c1));
    }

    #[test]
    fn pop_to_crosses_containers() {
        let mut stack = quiet();
        let c1 = stack.create_container();
        let r1 = stack.push(c1, "/a", "A").unwrap();
        let r2 = stack.push(c1, "/b", "B").unwrap();
        let c2 = stack.create_container();
        let r3 = stack.push(c2, "/c", "C").unwrap();

        let removed = stack.pop_to(&r1).unwrap();
        let ids: Vec<RouteId> = removed.iter().map(RouteRecord::id).collect();
        assert_eq!(ids, vec![r3.id(), r2.id()]);
        assert_eq!(stack.container_ids().collect::<Vec<_>>(), vec![c1]);
        assert_eq!(stack.all_routes_in(c1).unwrap(), &[r1.clone()][..]);
        assert!(!stack.url_exists("/b"));
        assert!(!stack.url_exists("/c"));
    }

    #[test]
    fn pop_to_top_is_noop() {
        let mut stack = quiet();
        let c1 = stack.create_container();
        let r1 = stack.push(c1, "/a", "A").unwrap();
        assert_eq!(stack.pop_to(&r1), Ok(Vec::new()));
        assert_eq!(stack.route_count(), 1);
    }

    #[test]
    fn pop_to_skips_empty_containers_above_target() {
        let mut stack = quiet();
        let c1 = stack.create_container();
        let r1 = stack.push(c1, "/a", "A").unwrap();
        stack.create_container();
        stack.create_container();
        assert_eq!(stack.pop_to(&r1), Ok(Vec::new()));
        assert_eq!(stack.last_container(), Some(c1));
    }

    #[test]
    fn pop_to_missing_atomic_leaves_stack_untouched() {
        let mut stack = quiet();
        let c1 = stack.create_container();
        let r1 = stack.push(c1, "/a", "A").unwrap();
        stack.push(c1, "/b", "B").unwrap();
        stack.pop_to(&r1).unwrap();
        stack.pop(&r1).unwrap();

        let c2 = stack.create_container();
        stack.push(c2, "/x", "X").unwrap();
        let before = stack.snapshot();
        assert_eq!(
            stack.pop_to(&r1),
            Err(RouteStackError::RecordNotFound(RouteKey::new("/a", 1)))
        );
        assert_eq!(stack.snapshot(), before);
    }

    #[test]
    fn pop_to_missing_incremental_drains() {
        let mut stack: RouteStack<&str> = RouteStack::new(
            RouteStackConfig::quiet().with_pop_to_mode(PopToMode::Incremental),
        );
        let c1 = stack.create_container();
        let gone = stack.push(c1, "/gone", "G").unwrap();
        stack.pop(&gone).unwrap();

        let c2 = stack.create_container();
        stack.push(c2, "/a", "A").unwrap();
        stack.push(c2, "/b", "B").unwrap();
        assert!(matches!(
            stack.pop_to(&gone),
            Err(RouteStackError::RecordNotFound(_))
        ));
        assert!(stack.is_empty());
        assert!(stack.snapshot().ledger.is_empty());
    }

    #[test]
    fn pop_to_incremental_stops_at_unpushed_container() {
        let mut stack: RouteStack<&str> = RouteStack::new(
            RouteStackConfig::quiet().with_pop_to_mode(PopToMode::Incremental),
        );
        let c1 = stack.create_container();
        let r1 = stack.push(c1, "/a", "A").unwrap();
        let c2 = stack.create_container();
        let c3 = stack.create_container();
        stack.push(c3, "/b", "B").unwrap();

        assert_eq!(
            stack.pop_to(&r1),
            Err(RouteStackError::RecordNotFound(RouteKey::new("/a", 1)))
        );
        // "/b" was popped and c3 dropped; the empty c2 blocked the unwind.
        assert_eq!(stack.container_ids().collect::<Vec<_>>(), vec![c1, c2]);
        assert!(!stack.url_exists("/b"));
        assert!(stack.url_exists("/a"));
    }

    #[test]
    fn pop_to_on_empty_registry_fails() {
        let mut stack = quiet();
        let c1 = stack.create_container();
        let r1 = stack.push(c1, "/a", "A").unwrap();
        stack.pop(&r1).unwrap();
        assert_eq!(stack.pop_to(&r1), Err(RouteStackError::EmptyRegistry));
    }

    #[test]
    fn find_container_prefers_most_recent() {
        let mut stack = quiet();
        let c1 = stack.create_container();
        let r1 = stack.push(c1, "/a", "A").unwrap();
        let c2 = stack.create_container();
        let r2 = stack.push(c2, "/a", "A").unwrap();

        assert_eq!(stack.find_container(&r1), Ok(c1));
        assert_eq!(stack.find_container(&r2), Ok(c2));
        assert_eq!(
            stack.find_container_by_key(&RouteKey::new("/a", 3)),
            Err(RouteStackError::NoMatchingKey(RouteKey::new("/a", 3)))
        );
    }

    #[test]
    fn find_container_by_key_matches_record_lookup() {
        let mut stack = quiet();
        let c1 = stack.create_container();
        let r1 = stack.push(c1, "/a", "A").unwrap();
        assert_eq!(stack.find_container_by_key(&r1.key()), Ok(c1));
        assert_eq!(stack.find_container(&r1), Ok(c1));
    }

    #[test]
    fn records_from_another_stack_are_rejected() {
        let mut a = quiet();
        let mut b = quiet();
        let ca = a.create_container();
        let foreign = a.push(ca, "/x", "X").unwrap();

        let cb = b.create_container();
        b.push(cb, "/y", "Y").unwrap();
        b.push(cb, "/z", "Z").unwrap();

        assert_eq!(
            b.pop(&foreign),
            Err(RouteStackError::NotTopRoute(RouteKey::new("/x", 1)))
        );
        assert_eq!(
            b.pop_to(&foreign),
            Err(RouteStackError::RecordNotFound(RouteKey::new("/x", 1)))
        );
        assert_eq!(b.route_count(), 2);
        assert_eq!(b.top_route().unwrap().url(), "/z");
        assert!(b.url_exists("/y"));
        assert_eq!(a.top_route().unwrap().id(), foreign.id());
    }

    #[test]
    fn pop_by_route_id() {
        let mut stack = quiet();
        let c1 = stack.create_container();
        let r1 = stack.push(c1, "/a", "A").unwrap();
        let r2 = stack.push(c1, "/b", "B").unwrap();
        let r3 = stack.push(c1, "/c", "C").unwrap();

        assert_eq!(
            stack.pop_route(r1.id()),
            Err(RouteStackError::NotTopRoute(RouteKey::new("/a", 1)))
        );
        let stray = RouteId::from_raw(u64::MAX);
        assert_eq!(stack.pop_route(stray), Err(RouteStackError::UnknownRoute(stray)));
        assert_eq!(stack.pop_to_route(stray), Err(RouteStackError::UnknownRoute(stray)));

        assert_eq!(stack.pop_route(r3.id()).unwrap().id(), r3.id());
        let removed = stack.pop_to_route(r1.id()).unwrap();
        assert_eq!(removed, vec![r2]);
        assert_eq!(stack.route_count(), 1);
    }

    #[test]
    fn push_record_accepts_tokens_without_clone() {
        struct Opaque(#[allow(dead_code)] Box<dyn std::any::Any>);

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut stack: RouteStack<Opaque> = RouteStack::new(RouteStackConfig::quiet());
        let c1 = stack.create_container();
        let first = stack
            .push_record(c1, "/a", Opaque(Box::new(1_u8)))
            .unwrap()
            .id();
        let (second, index) = {
            let record = stack
                .push_record_with_hook(c1, "/a", Opaque(Box::new("page")), log_hook(&log, "a2"))
                .unwrap();
            (record.id(), record.index())
        };
        assert_eq!(index, 2);

        let popped = stack.pop_route(second).unwrap();
        assert_eq!(popped.index(), 2);
        assert_eq!(*log.borrow(), vec!["a2"]);
        assert_eq!(stack.top_route().unwrap().id(), first);
    }

    #[test]
    fn route_exists_variants() {
        let mut stack = quiet();
        let c1 = stack.create_container();
        assert!(stack.route_exists());
        assert!(!stack.route_exists_in(c1));
        stack.push(c1, "/a", "A").unwrap();
        stack.push(c1, "/a", "A").unwrap();
        assert!(stack.route_exists_in(c1));
        assert!(!stack.route_exists_in(ContainerId::from_raw(0)));
        assert!(stack.url_exists("/a"));
        assert!(!stack.url_exists("/b"));
        assert!(stack.route_exists_at("/a", 2));
        assert!(!stack.route_exists_at("/a", 3));
    }

    #[test]
    fn top_route_skips_empty_containers() {
        let mut stack = quiet();
        let c1 = stack.create_container();
        let r1 = stack.push(c1, "/a", "A").unwrap();
        let c2 = stack.create_container();
        assert_eq!(stack.top_route().unwrap().id(), r1.id());
        assert_eq!(
            stack.top_route_in(c2),
            Err(RouteStackError::EmptyContainer(c2))
        );
        assert_eq!(stack.top_route_in(c1).unwrap().id(), r1.id());
    }

    #[test]
    fn top_route_at_or_below() {
        let mut stack = quiet();
        let c1 = stack.create_container();
        let a1 = stack.push(c1, "/a", "A").unwrap();
        stack.push(c1, "/b", "B").unwrap();
        let c2 = stack.create_container();
        let a2 = stack.push(c2, "/a", "A").unwrap();
        stack.push(c2, "/c", "C").unwrap();

        assert_eq!(stack.top_route_at_or_below("/a", 5).unwrap().id(), a2.id());
        assert_eq!(stack.top_route_at_or_below("/a", 2).unwrap().id(), a2.id());
        assert_eq!(stack.top_route_at_or_below("/a", 1).unwrap().id(), a1.id());
        assert_eq!(
            stack.top_route_at_or_below("/a", 0),
            Err(RouteStackError::NoRouteAtOrBelow {
                url: "/a".into(),
                index: 0
            })
        );
    }

    #[test]
    fn first_and_all_routes() {
        let mut stack = quiet();
        let c1 = stack.create_container();
        let r1 = stack.push(c1, "/a", "A").unwrap();
        let r2 = stack.push(c1, "/b", "B").unwrap();
        assert_eq!(stack.first_route_in(c1).unwrap().id(), r1.id());
        assert_eq!(stack.all_routes_in(c1).unwrap(), &[r1, r2][..]);

        let unknown = ContainerId::from_raw(0);
        assert_eq!(
            stack.first_route_in(unknown),
            Err(RouteStackError::UnknownContainer(unknown))
        );
        let c2 = stack.create_container();
        assert_eq!(
            stack.all_routes_in(c2),
            Err(RouteStackError::EmptyContainer(c2))
        );
    }

    #[test]
    fn try_create_container_honors_limit() {
        let mut stack: RouteStack<()> =
            RouteStack::new(RouteStackConfig::quiet().with_max_containers(2));
        stack.try_create_container().unwrap();
        let c2 = stack.try_create_container().unwrap();
        assert_eq!(
            stack.try_create_container(),
            Err(RouteStackError::ContainerLimit(2))
        );
        stack.close_container(c2).unwrap();
        assert!(stack.try_create_container().is_ok());
    }

    #[test]
    fn drop_fires_pending_hooks() {
        let log = Rc::new(RefCell::new(Vec::new()));
        {
            let mut stack = quiet();
            let c1 = stack.create_container();
            stack
                .push_with_hook(c1, "/a", "A", log_hook(&log, "a"))
                .unwrap();
            let c2 = stack.create_container();
            stack
                .push_with_hook(c2, "/b", "B", log_hook(&log, "b"))
                .unwrap();
        }
        assert_eq!(*log.borrow(), vec!["b", "a"]);
    }

    #[test]
    fn snapshot_reflects_registry() {
        let mut stack = quiet();
        let c1 = stack.create_container();
        stack.push(c1, "/a", "A").unwrap();
        let c2 = stack.create_container();
        stack.push(c2, "/a", "A").unwrap();

        let snapshot = stack.snapshot();
        assert_eq!(snapshot.containers.len(), 2);
        assert_eq!(snapshot.containers[0].id, c1.raw());
        assert_eq!(snapshot.containers[1].routes, vec![("/a".to_string(), 2)]);
        assert_eq!(snapshot.ledger, vec![("/a".to_string(), 2)]);
        assert_eq!(snapshot.route_count(), 2);
    }

    #[test]
    fn debug_omits_tokens() {
        let mut stack = quiet();
        let c1 = stack.create_container();
        stack.push(c1, "/a", "SecretToken").unwrap();
        let dbg = format!("{stack:?}");
        assert!(dbg.contains("RouteStack"));
        assert!(!dbg.contains("SecretToken"));
    }
}
