use async_trait::async_trait;
use chrono::Utc;

use super::member::{MemberRepository, ProjectMember, TeamMember, WorkspaceMember};
use super::mock_store::MockStore;
use super::scope::{Project, ProjectTeamRepository, ScopeRepository, Team, Workspace};
use super::user::{User, UserRepository};
use crate::MembershipError;
use crate::membership::{ProjectRole, Role, TeamRole, WorkspaceRole};

fn join_ids(ids: &[i64]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

#[derive(Clone)]
pub struct MockUserRepository {
    store: MockStore,
}

impl MockUserRepository {
    pub fn new(store: MockStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, MembershipError> {
        self.store.check("users.find_by_id")?;
        Ok(self.store.read()?.users.get(&id).cloned())
    }

    async fn delete(&self, id: i64) -> Result<u64, MembershipError> {
        self.store.record("users.delete", id.to_string())?;
        Ok(u64::from(self.store.write()?.remove_user(id)))
    }
}

macro_rules! mock_scope_repository {
    ($name:ident, $scope:ty, $table:ident, $remove:ident) => {
        #[derive(Clone)]
        pub struct $name {
            store: MockStore,
        }

        impl $name {
            pub fn new(store: MockStore) -> Self {
                Self { store }
            }
        }

        #[async_trait]
        impl ScopeRepository for $name {
            type Scope = $scope;

            async fn find_by_id(&self, id: i64) -> Result<Option<$scope>, MembershipError> {
                self.store
                    .check(concat!(stringify!($table), ".find_by_id"))?;
                Ok(self.store.read()?.$table.get(&id).cloned())
            }

            async fn delete(&self, id: i64) -> Result<u64, MembershipError> {
                self.store
                    .record(concat!(stringify!($table), ".delete"), id.to_string())?;
                Ok(u64::from(self.store.write()?.$remove(id)))
            }

            async fn bulk_delete(&self, ids: &[i64]) -> Result<u64, MembershipError> {
                self.store.record(
                    concat!(stringify!($table), ".bulk_delete"),
                    format!("[{}]", join_ids(ids)),
                )?;
                let mut tables = self.store.write()?;
                Ok(ids.iter().filter(|id| tables.$remove(**id)).count() as u64)
            }
        }
    };
}

mock_scope_repository!(MockWorkspaceRepository, Workspace, workspaces, remove_workspace);
mock_scope_repository!(MockProjectRepository, Project, projects, remove_project);
mock_scope_repository!(MockTeamRepository, Team, teams, remove_team);

macro_rules! mock_member_repository {
    (
        $name:ident,
        $member:ident,
        $role:ty,
        $table:ident,
        $scope_field:ident,
        $identity_field:ident,
        $remove:ident
    ) => {
        #[derive(Clone)]
        pub struct $name {
            store: MockStore,
        }

        impl $name {
            pub fn new(store: MockStore) -> Self {
                Self { store }
            }
        }

        #[async_trait]
        impl MemberRepository for $name {
            type Member = $member;

            async fn create(
                &self,
                scope_id: i64,
                identity_id: i64,
                role: $role,
            ) -> Result<$member, MembershipError> {
                self.store.record(
                    concat!(stringify!($table), ".create"),
                    format!("{scope_id}, {identity_id}, {}", role.as_str()),
                )?;
                let member = $member {
                    id: self.store.next_id(),
                    $scope_field: scope_id,
                    $identity_field: identity_id,
                    role,
                    added_at: Utc::now(),
                };
                self.store
                    .write()?
                    .$table
                    .insert(member.id, member.clone());
                Ok(member)
            }

            async fn find_by_id(&self, id: i64) -> Result<Option<$member>, MembershipError> {
                self.store
                    .check(concat!(stringify!($table), ".find_by_id"))?;
                Ok(self.store.read()?.$table.get(&id).cloned())
            }

            async fn find_by_scope(&self, scope_id: i64) -> Result<Vec<$member>, MembershipError> {
                self.store
                    .check(concat!(stringify!($table), ".find_by_scope"))?;
                Ok(self
                    .store
                    .read()?
                    .$table
                    .values()
                    .filter(|m| m.$scope_field == scope_id)
                    .cloned()
                    .collect())
            }

            async fn find_by_identity(
                &self,
                identity_id: i64,
            ) -> Result<Vec<$member>, MembershipError> {
                self.store
                    .check(concat!(stringify!($table), ".find_by_identity"))?;
                Ok(self
                    .store
                    .read()?
                    .$table
                    .values()
                    .filter(|m| m.$identity_field == identity_id)
                    .cloned()
                    .collect())
            }

            async fn update_role(
                &self,
                id: i64,
                role: $role,
            ) -> Result<Option<$member>, MembershipError> {
                self.store.record(
                    concat!(stringify!($table), ".update_role"),
                    format!("{id}, {}", role.as_str()),
                )?;
                let mut tables = self.store.write()?;
                Ok(tables.$table.get_mut(&id).map(|member| {
                    member.role = role;
                    member.clone()
                }))
            }

            async fn delete(&self, id: i64) -> Result<u64, MembershipError> {
                self.store
                    .record(concat!(stringify!($table), ".delete"), id.to_string())?;
                Ok(u64::from(self.store.write()?.$remove(id)))
            }

            async fn bulk_delete(&self, ids: &[i64]) -> Result<u64, MembershipError> {
                self.store.record(
                    concat!(stringify!($table), ".bulk_delete"),
                    format!("[{}]", join_ids(ids)),
                )?;
                let mut tables = self.store.write()?;
                Ok(ids.iter().filter(|id| tables.$remove(**id)).count() as u64)
            }

            async fn transfer_ownership(
                &self,
                scope_id: i64,
                current_owner_id: i64,
                new_owner_id: i64,
                demoted_role: $role,
            ) -> Result<u64, MembershipError> {
                self.store.record(
                    concat!(stringify!($table), ".transfer_ownership"),
                    format!("{scope_id}, {current_owner_id} -> {new_owner_id}"),
                )?;
                let mut tables = self.store.write()?;

                let current_holds = tables.$table.get(&current_owner_id).is_some_and(|m| {
                    m.$scope_field == scope_id && m.role.is_owner()
                });
                let new_belongs = tables
                    .$table
                    .get(&new_owner_id)
                    .is_some_and(|m| m.$scope_field == scope_id);
                if !current_holds
                    || !new_belongs
                    || current_owner_id == new_owner_id
                    || demoted_role.is_owner()
                {
                    return Ok(0);
                }

                if let Some(current) = tables.$table.get_mut(&current_owner_id) {
                    current.role = demoted_role;
                }
                if let Some(new_owner) = tables.$table.get_mut(&new_owner_id) {
                    new_owner.role = <$role as Role>::owner();
                }
                Ok(2)
            }
        }
    };
}

mock_member_repository!(
    MockWorkspaceMemberRepository,
    WorkspaceMember,
    WorkspaceRole,
    workspace_members,
    workspace_id,
    user_id,
    remove_workspace_member
);
mock_member_repository!(
    MockProjectMemberRepository,
    ProjectMember,
    ProjectRole,
    project_members,
    project_id,
    workspace_member_id,
    remove_project_member
);
mock_member_repository!(
    MockTeamMemberRepository,
    TeamMember,
    TeamRole,
    team_members,
    team_id,
    workspace_member_id,
    remove_team_member
);

#[derive(Clone)]
pub struct MockProjectTeamRepository {
    store: MockStore,
}

impl MockProjectTeamRepository {
    pub fn new(store: MockStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ProjectTeamRepository for MockProjectTeamRepository {
    async fn find_teams_by_project(&self, project_id: i64) -> Result<Vec<i64>, MembershipError> {
        self.store.check("project_teams.find_teams_by_project")?;
        Ok(self
            .store
            .read()?
            .project_teams
            .iter()
            .filter(|(p, _)| *p == project_id)
            .map(|(_, t)| *t)
            .collect())
    }

    async fn find_projects_by_team(&self, team_id: i64) -> Result<Vec<i64>, MembershipError> {
        self.store.check("project_teams.find_projects_by_team")?;
        Ok(self
            .store
            .read()?
            .project_teams
            .iter()
            .filter(|(_, t)| *t == team_id)
            .map(|(p, _)| *p)
            .collect())
    }

    async fn assign(&self, project_id: i64, team_id: i64) -> Result<u64, MembershipError> {
        self.store
            .record("project_teams.assign", format!("{project_id}, {team_id}"))?;
        Ok(u64::from(
            self.store.write()?.project_teams.insert((project_id, team_id)),
        ))
    }

    async fn unassign(&self, project_id: i64, team_id: i64) -> Result<u64, MembershipError> {
        self.store
            .record("project_teams.unassign", format!("{project_id}, {team_id}"))?;
        Ok(u64::from(
            self.store
                .write()?
                .project_teams
                .remove(&(project_id, team_id)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transfer_is_conditional() {
        let store = MockStore::new();
        let team = store.add_team(1, "Core");
        let owner = store.add_team_member(team.id, 10, TeamRole::Owner);
        let admin = store.add_team_member(team.id, 11, TeamRole::Admin);
        let repo = store.team_members();

        let flipped = repo
            .transfer_ownership(team.id, owner.id, admin.id, TeamRole::Admin)
            .await
            .unwrap();
        assert_eq!(flipped, 2);
        assert_eq!(store.team_member(owner.id).unwrap().role, TeamRole::Admin);
        assert_eq!(store.team_member(admin.id).unwrap().role, TeamRole::Owner);

        // the old owner no longer holds the role, so a replay changes nothing
        let replay = repo
            .transfer_ownership(team.id, owner.id, admin.id, TeamRole::Admin)
            .await
            .unwrap();
        assert_eq!(replay, 0);
        assert_eq!(store.team_member(admin.id).unwrap().role, TeamRole::Owner);
    }

    #[tokio::test]
    async fn test_delete_reports_affected_rows() {
        let store = MockStore::new();
        let project = store.add_project(1, "Roadmap");
        let a = store.add_project_member(project.id, 10, ProjectRole::Owner);
        let b = store.add_project_member(project.id, 11, ProjectRole::Member);
        let repo = store.project_members();

        assert_eq!(repo.delete(a.id).await.unwrap(), 1);
        assert_eq!(repo.delete(a.id).await.unwrap(), 0);
        assert_eq!(repo.bulk_delete(&[a.id, b.id]).await.unwrap(), 1);
        assert_eq!(
            store.calls(),
            vec![
                format!("project_members.delete({})", a.id),
                format!("project_members.delete({})", a.id),
                format!("project_members.bulk_delete([{}, {}])", a.id, b.id),
            ]
        );
    }

    #[tokio::test]
    async fn test_find_by_scope_is_ordered() {
        let store = MockStore::new();
        let workspace = store.add_workspace("Acme");
        let first = store.add_workspace_member(workspace.id, 1, WorkspaceRole::Owner);
        let second = store.add_workspace_member(workspace.id, 2, WorkspaceRole::Member);
        store.add_workspace_member(workspace.id + 100, 3, WorkspaceRole::Owner);

        let members = store
            .workspace_members()
            .find_by_scope(workspace.id)
            .await
            .unwrap();

        let ids: Vec<i64> = members.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn test_unassign_missing_pair_is_zero() {
        let store = MockStore::new();
        let repo = store.project_teams();

        assert_eq!(repo.assign(1, 2).await.unwrap(), 1);
        assert_eq!(repo.unassign(1, 2).await.unwrap(), 1);
        assert_eq!(repo.unassign(1, 2).await.unwrap(), 0);
    }
}
