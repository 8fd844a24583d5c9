//! Event system for membership actions.
//!
//! Events are fired from every action that changes a membership. If no
//! listeners are registered, they are silently ignored.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use trellis::register_event_listeners;
//! use trellis::ScopeKind;
//! use trellis::events::LoggingListener;
//!
//! fn main() {
//!     register_event_listeners(|registry| {
//!         registry
//!             .listen(LoggingListener::new())
//!             .listen_to(&[ScopeKind::Workspace], WorkspaceAudit);
//!     });
//! }
//! ```
//!
//! # Custom Listeners
//!
//! ```rust,ignore
//! use trellis::events::{Listener, MembershipEvent};
//! use async_trait::async_trait;
//!
//! struct AuditListener;
//!
//! #[async_trait]
//! impl Listener for AuditListener {
//!     async fn handle(&self, event: &MembershipEvent) {
//!         if let MembershipEvent::OwnershipTransferred { scope, scope_id, .. } = event {
//!             // write an audit row
//!         }
//!     }
//! }
//! ```

mod event;
mod log_listener;
mod registry;
#[cfg(feature = "tracing")]
mod trace_listener;

pub use event::MembershipEvent;
pub use log_listener::LoggingListener;
pub use registry::{EventRegistry, Listener, dispatch, register_event_listeners};
#[cfg(feature = "tracing")]
pub use trace_listener::TracingListener;
