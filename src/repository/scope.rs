//! Workspaces, projects and teams: the containers memberships live in.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::MembershipError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub workspace_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub workspace_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Common accessors of workspaces, projects and teams.
pub trait ScopeRecord: Clone + Send + Sync + 'static {
    fn id(&self) -> i64;
    fn name(&self) -> &str;
}

macro_rules! scope_record {
    ($($scope:ty),+) => {
        $(
            impl ScopeRecord for $scope {
                fn id(&self) -> i64 {
                    self.id
                }

                fn name(&self) -> &str {
                    &self.name
                }
            }
        )+
    };
}

scope_record!(Workspace, Project, Team);

/// Storage for one kind of scope.
///
/// Deleting a scope cascades to its memberships (and, for a workspace, to its
/// projects and teams). Deletes report the number of scope rows removed.
#[async_trait]
pub trait ScopeRepository: Send + Sync {
    type Scope: ScopeRecord;

    async fn find_by_id(&self, id: i64) -> Result<Option<Self::Scope>, MembershipError>;
    async fn delete(&self, id: i64) -> Result<u64, MembershipError>;
    async fn bulk_delete(&self, ids: &[i64]) -> Result<u64, MembershipError>;
}

pub trait WorkspaceRepository: ScopeRepository<Scope = Workspace> {}
impl<T: ScopeRepository<Scope = Workspace>> WorkspaceRepository for T {}

pub trait ProjectRepository: ScopeRepository<Scope = Project> {}
impl<T: ScopeRepository<Scope = Project>> ProjectRepository for T {}

pub trait TeamRepository: ScopeRepository<Scope = Team> {}
impl<T: ScopeRepository<Scope = Team>> TeamRepository for T {}

/// Which teams are assigned to which projects.
#[async_trait]
pub trait ProjectTeamRepository: Send + Sync {
    async fn find_teams_by_project(&self, project_id: i64) -> Result<Vec<i64>, MembershipError>;
    async fn find_projects_by_team(&self, team_id: i64) -> Result<Vec<i64>, MembershipError>;
    async fn assign(&self, project_id: i64, team_id: i64) -> Result<u64, MembershipError>;
    async fn unassign(&self, project_id: i64, team_id: i64) -> Result<u64, MembershipError>;
}
