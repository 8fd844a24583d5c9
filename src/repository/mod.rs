//! Repository traits and data types.
//!
//! This module defines the storage abstractions the actions run against.
//! Implement these traits on top of your own database. Every write is
//! expected to be atomic on its own; multi-step sequences are composed by
//! the actions.
//!
//! # Traits
//!
//! | Trait | Description |
//! |-------|-------------|
//! | [`UserRepository`] | User lookup and deletion |
//! | [`ScopeRepository`] | Workspace, project and team lookup and (cascading) deletion |
//! | [`MemberRepository`] | Memberships of one scope kind, including ownership transfer |
//! | [`ProjectTeamRepository`] | Team ↔ project assignments |
//!
//! [`WorkspaceRepository`], [`ProjectRepository`], [`TeamRepository`],
//! [`WorkspaceMemberRepository`], [`ProjectMemberRepository`] and
//! [`TeamMemberRepository`] are shorthands for the generic traits bound to
//! one record type. They are implemented automatically.
//!
//! # Mock Implementations
//!
//! Enable the `mocks` feature for in-memory implementations sharing one
//! [`MockStore`].

mod member;
mod scope;
mod user;

#[cfg(any(test, feature = "mocks"))]
mod mock_store;
#[cfg(any(test, feature = "mocks"))]
mod mocks;

pub use member::{
    MemberRepository, ProjectMember, ProjectMemberRepository, TeamMember, TeamMemberRepository,
    WorkspaceMember, WorkspaceMemberRepository,
};
pub use scope::{
    Project, ProjectRepository, ProjectTeamRepository, ScopeRecord, ScopeRepository, Team,
    TeamRepository, Workspace, WorkspaceRepository,
};
pub use user::{User, UserRepository};

#[cfg(any(test, feature = "mocks"))]
pub use mock_store::MockStore;
#[cfg(any(test, feature = "mocks"))]
pub use mocks::{
    MockProjectMemberRepository, MockProjectRepository, MockProjectTeamRepository,
    MockTeamMemberRepository, MockTeamRepository, MockUserRepository,
    MockWorkspaceMemberRepository, MockWorkspaceRepository,
};
