#![forbid(unsafe_code)]

//! Navigation history for hosts with nested navigation containers.
//!
//! # Role in FrankenTUI
//! `ftui-nav` tracks which page routes are open when an application nests
//! independent page stacks inside screens (a "stack of stacks"). Each route
//! gets a per-URL sequence index that is unique across every container, so
//! `("/detail", 2)` names the second open detail page no matter which screen
//! hosts it.
//!
//! # Primary responsibilities
//! - **RouteStack**: the container registry plus the shared index ledger.
//! - **ContainerId**: monotonic, process-unique container identifiers.
//! - **RouteRecord / RouteKey**: open pages and their `(url, index)` keys.
//! - **RouteStackError**: one variant per violated precondition.
//!
//! # Example
//!
//! ```
//! use ftui_nav::RouteStack;
//!
//! let mut stack: RouteStack<&str> = RouteStack::default();
//! let screen = stack.create_container();
//! let home = stack.push(screen, "/home", "HomePage").unwrap();
//! let detail = stack.push(screen, "/detail", "DetailPage").unwrap();
//!
//! assert_eq!(stack.top_route().unwrap().key(), detail.key());
//! stack.pop_to(&home).unwrap();
//! assert_eq!(stack.all_routes_in(screen).unwrap().len(), 1);
//! ```

pub mod config;
pub mod container;
pub mod error;
pub mod ledger;
#[cfg(feature = "tracing-json")]
pub mod logging;
pub mod route;
pub mod snapshot;
pub mod stack;

pub use config::{PopToMode, RouteStackConfig};
pub use container::ContainerId;
pub use error::{Result, RouteStackError};
pub use route::{RemovalHook, RouteId, RouteKey, RouteRecord};
pub use snapshot::{ContainerSnapshot, StackSnapshot};
pub use stack::RouteStack;
