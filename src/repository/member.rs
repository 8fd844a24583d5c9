//! Membership records for the three scopes and their storage trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::MembershipError;
use crate::membership::{Membership, ProjectRole, ScopeKind, TeamRole, WorkspaceRole};

/// Links a user to a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceMember {
    pub id: i64,
    pub workspace_id: i64,
    pub user_id: i64,
    pub role: WorkspaceRole,
    pub added_at: DateTime<Utc>,
}

/// Links a workspace member to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMember {
    pub id: i64,
    pub project_id: i64,
    pub workspace_member_id: i64,
    pub role: ProjectRole,
    pub added_at: DateTime<Utc>,
}

/// Links a workspace member to a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: i64,
    pub team_id: i64,
    pub workspace_member_id: i64,
    pub role: TeamRole,
    pub added_at: DateTime<Utc>,
}

impl Membership for WorkspaceMember {
    type Role = WorkspaceRole;
    const SCOPE: ScopeKind = ScopeKind::Workspace;

    fn id(&self) -> i64 {
        self.id
    }

    fn scope_id(&self) -> i64 {
        self.workspace_id
    }

    fn identity_id(&self) -> i64 {
        self.user_id
    }

    fn role(&self) -> WorkspaceRole {
        self.role
    }
}

impl Membership for ProjectMember {
    type Role = ProjectRole;
    const SCOPE: ScopeKind = ScopeKind::Project;

    fn id(&self) -> i64 {
        self.id
    }

    fn scope_id(&self) -> i64 {
        self.project_id
    }

    fn identity_id(&self) -> i64 {
        self.workspace_member_id
    }

    fn role(&self) -> ProjectRole {
        self.role
    }
}

impl Membership for TeamMember {
    type Role = TeamRole;
    const SCOPE: ScopeKind = ScopeKind::Team;

    fn id(&self) -> i64 {
        self.id
    }

    fn scope_id(&self) -> i64 {
        self.team_id
    }

    fn identity_id(&self) -> i64 {
        self.workspace_member_id
    }

    fn role(&self) -> TeamRole {
        self.role
    }
}

/// Storage for the memberships of one scope kind.
///
/// Writes are atomic per call. Deletes return affected rows, `0` meaning
/// nothing matched.
#[async_trait]
pub trait MemberRepository: Send + Sync {
    type Member: Membership;

    async fn create(
        &self,
        scope_id: i64,
        identity_id: i64,
        role: <Self::Member as Membership>::Role,
    ) -> Result<Self::Member, MembershipError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Self::Member>, MembershipError>;

    /// All members of a scope, oldest first.
    async fn find_by_scope(&self, scope_id: i64) -> Result<Vec<Self::Member>, MembershipError>;

    /// Every membership held by one identity (user or workspace member).
    async fn find_by_identity(
        &self,
        identity_id: i64,
    ) -> Result<Vec<Self::Member>, MembershipError>;

    async fn update_role(
        &self,
        id: i64,
        role: <Self::Member as Membership>::Role,
    ) -> Result<Option<Self::Member>, MembershipError>;

    async fn delete(&self, id: i64) -> Result<u64, MembershipError>;

    async fn bulk_delete(&self, ids: &[i64]) -> Result<u64, MembershipError>;

    /// Demotes `current_owner_id` to `demoted_role` and promotes
    /// `new_owner_id` to owner in a single conditional update.
    ///
    /// Nothing changes, and `0` is returned, unless `current_owner_id` still
    /// holds the owner role in `scope_id` and `new_owner_id` belongs to it.
    async fn transfer_ownership(
        &self,
        scope_id: i64,
        current_owner_id: i64,
        new_owner_id: i64,
        demoted_role: <Self::Member as Membership>::Role,
    ) -> Result<u64, MembershipError>;
}

pub trait WorkspaceMemberRepository: MemberRepository<Member = WorkspaceMember> {}
impl<T: MemberRepository<Member = WorkspaceMember>> WorkspaceMemberRepository for T {}

pub trait ProjectMemberRepository: MemberRepository<Member = ProjectMember> {}
impl<T: MemberRepository<Member = ProjectMember>> ProjectMemberRepository for T {}

pub trait TeamMemberRepository: MemberRepository<Member = TeamMember> {}
impl<T: MemberRepository<Member = TeamMember>> TeamMemberRepository for T {}
