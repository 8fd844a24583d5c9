//! Membership removal and ownership transfer for workspace/project/team backends.
//!
//! Workspaces contain projects and teams; each of the three scopes keeps its
//! own memberships with exactly one `owner`. The actions in [`actions`] remove
//! members, let members leave, hand ownership over to a successor and unwind a
//! whole account, keeping the owner invariant intact along the way.
//!
//! Storage is reached through the traits in [`repository`]. Enable the `mocks`
//! feature for in-memory implementations.

pub mod actions;
pub mod config;
pub mod events;
pub mod membership;
pub mod repository;

use std::fmt;

pub use actions::{
    ChangeMemberRoleAction, DeleteAccountAction, DeleteTeamAction, DeleteTeamMemberAction,
    DeleteTeamMemberOutput, DeleteTeamOutput, FailedTransfer, RemoveMemberInput,
    RemoveProjectMemberAction, RemoveWorkspaceMemberAction, RemoveWorkspaceMemberOutput,
    RemovalPlan, TransferOwnershipAction, TransferProjectOwnershipAction,
    TransferTeamOwnershipAction, TransferWorkspaceOwnershipAction, UnassignProjectAction,
    UnassignProjectOutput, plan_removal,
};
pub use config::{MembershipConfig, NestedTransferPolicy};
pub use events::{MembershipEvent, dispatch, register_event_listeners};
pub use membership::{
    Membership, ProjectRole, Role, ScopeKind, TeamRole, WorkspaceRole, select_successor,
};
pub use repository::{
    MemberRepository, Project, ProjectMember, ProjectMemberRepository, ProjectRepository,
    ProjectTeamRepository, ScopeRecord, ScopeRepository, Team, TeamMember, TeamMemberRepository,
    TeamRepository, User, UserRepository, Workspace, WorkspaceMember, WorkspaceMemberRepository,
    WorkspaceRepository,
};

#[cfg(any(test, feature = "mocks"))]
pub use repository::{
    MockProjectMemberRepository, MockProjectRepository, MockProjectTeamRepository, MockStore,
    MockTeamMemberRepository, MockTeamRepository, MockUserRepository,
    MockWorkspaceMemberRepository, MockWorkspaceRepository,
};

/// Errors returned by repositories and actions.
///
/// Each variant maps onto an HTTP status via [`MembershipError::status_code`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipError {
    /// Missing or malformed argument. Never reaches storage.
    Validation(String),
    /// Role-based business rule violation.
    Forbidden(String),
    /// Entity absent, or zero rows affected by a write.
    NotFound(String),
    /// Role already set, self-transfer and similar.
    Conflict(String),
    /// Storage answered with something unexpected.
    Internal(String),
    DatabaseError(String),
}

impl MembershipError {
    /// HTTP status hint for the transport layer.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Internal(_) | Self::DatabaseError(_) => 500,
        }
    }

    /// The human-readable message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::Internal(msg)
            | Self::DatabaseError(msg) => msg,
        }
    }
}

impl std::error::Error for MembershipError {}

impl fmt::Display for MembershipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "Bad request: {msg}"),
            Self::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::Conflict(msg) => write!(f, "Conflict: {msg}"),
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
            Self::DatabaseError(msg) => write!(f, "Database error: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(MembershipError::Validation("x".into()).status_code(), 400);
        assert_eq!(MembershipError::Forbidden("x".into()).status_code(), 403);
        assert_eq!(MembershipError::NotFound("x".into()).status_code(), 404);
        assert_eq!(MembershipError::Conflict("x".into()).status_code(), 409);
        assert_eq!(MembershipError::Internal("x".into()).status_code(), 500);
        assert_eq!(MembershipError::DatabaseError("x".into()).status_code(), 500);
    }

    #[test]
    fn test_display_and_message() {
        let err = MembershipError::Forbidden("You cannot remove the owner".to_owned());
        assert_eq!(err.to_string(), "Forbidden: You cannot remove the owner");
        assert_eq!(err.message(), "You cannot remove the owner");
    }
}
