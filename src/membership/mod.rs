//! Roles, the membership abstraction shared by the three scopes, and the
//! successor policy used whenever an owner has to hand over.

mod roles;
mod successor;
mod traits;

pub use roles::{ProjectRole, TeamRole, WorkspaceRole};
pub use successor::select_successor;
pub use traits::{Membership, Role, ScopeKind};
