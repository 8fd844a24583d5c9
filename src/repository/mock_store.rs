#![allow(clippy::significant_drop_tightening)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use super::member::{ProjectMember, TeamMember, WorkspaceMember};
use super::mocks::{
    MockProjectMemberRepository, MockProjectRepository, MockProjectTeamRepository,
    MockTeamMemberRepository, MockTeamRepository, MockUserRepository,
    MockWorkspaceMemberRepository, MockWorkspaceRepository,
};
use super::scope::{Project, Team, Workspace};
use super::user::User;
use crate::MembershipError;
use crate::membership::{ProjectRole, TeamRole, WorkspaceRole};

/// In-memory database shared by all mock repositories.
///
/// Deleting a row cascades the way foreign keys would: a workspace takes its
/// projects, teams and members with it, a project or team takes its members
/// and assignments, a workspace member takes its project and team rows.
///
/// Every write issued through a repository is recorded (see [`MockStore::calls`])
/// and any repository operation can be made to fail with [`MockStore::fail_on`].
/// Seeding helpers (`add_*`) write directly and are not recorded.
#[derive(Clone, Default)]
pub struct MockStore {
    inner: Arc<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    tables: RwLock<Tables>,
    next_id: AtomicI64,
    calls: Mutex<Vec<String>>,
    failing: Mutex<BTreeSet<String>>,
}

#[derive(Default)]
pub(super) struct Tables {
    pub(super) users: BTreeMap<i64, User>,
    pub(super) workspaces: BTreeMap<i64, Workspace>,
    pub(super) projects: BTreeMap<i64, Project>,
    pub(super) teams: BTreeMap<i64, Team>,
    pub(super) workspace_members: BTreeMap<i64, WorkspaceMember>,
    pub(super) project_members: BTreeMap<i64, ProjectMember>,
    pub(super) team_members: BTreeMap<i64, TeamMember>,
    /// `(project_id, team_id)` pairs.
    pub(super) project_teams: BTreeSet<(i64, i64)>,
}

impl Tables {
    pub(super) fn remove_user(&mut self, id: i64) -> bool {
        if self.users.remove(&id).is_none() {
            return false;
        }
        let member_ids: Vec<i64> = self
            .workspace_members
            .values()
            .filter(|m| m.user_id == id)
            .map(|m| m.id)
            .collect();
        for member_id in member_ids {
            self.remove_workspace_member(member_id);
        }
        true
    }

    pub(super) fn remove_workspace(&mut self, id: i64) -> bool {
        if self.workspaces.remove(&id).is_none() {
            return false;
        }
        let project_ids: Vec<i64> = self
            .projects
            .values()
            .filter(|p| p.workspace_id == id)
            .map(|p| p.id)
            .collect();
        for project_id in project_ids {
            self.remove_project(project_id);
        }
        let team_ids: Vec<i64> = self
            .teams
            .values()
            .filter(|t| t.workspace_id == id)
            .map(|t| t.id)
            .collect();
        for team_id in team_ids {
            self.remove_team(team_id);
        }
        let member_ids: Vec<i64> = self
            .workspace_members
            .values()
            .filter(|m| m.workspace_id == id)
            .map(|m| m.id)
            .collect();
        for member_id in member_ids {
            self.remove_workspace_member(member_id);
        }
        true
    }

    pub(super) fn remove_project(&mut self, id: i64) -> bool {
        if self.projects.remove(&id).is_none() {
            return false;
        }
        self.project_members.retain(|_, m| m.project_id != id);
        self.project_teams.retain(|(project_id, _)| *project_id != id);
        true
    }

    pub(super) fn remove_team(&mut self, id: i64) -> bool {
        if self.teams.remove(&id).is_none() {
            return false;
        }
        self.team_members.retain(|_, m| m.team_id != id);
        self.project_teams.retain(|(_, team_id)| *team_id != id);
        true
    }

    pub(super) fn remove_workspace_member(&mut self, id: i64) -> bool {
        if self.workspace_members.remove(&id).is_none() {
            return false;
        }
        self.project_members.retain(|_, m| m.workspace_member_id != id);
        self.team_members.retain(|_, m| m.workspace_member_id != id);
        true
    }

    pub(super) fn remove_project_member(&mut self, id: i64) -> bool {
        self.project_members.remove(&id).is_some()
    }

    pub(super) fn remove_team_member(&mut self, id: i64) -> bool {
        self.team_members.remove(&id).is_some()
    }
}

fn poisoned(operation: &str) -> MembershipError {
    log::error!(target: "trellis", "msg=\"mock store lock poisoned\", operation=\"{operation}\"");
    MembershipError::Internal("lock poisoned".to_owned())
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> MockUserRepository {
        MockUserRepository::new(self.clone())
    }

    pub fn workspaces(&self) -> MockWorkspaceRepository {
        MockWorkspaceRepository::new(self.clone())
    }

    pub fn projects(&self) -> MockProjectRepository {
        MockProjectRepository::new(self.clone())
    }

    pub fn teams(&self) -> MockTeamRepository {
        MockTeamRepository::new(self.clone())
    }

    pub fn workspace_members(&self) -> MockWorkspaceMemberRepository {
        MockWorkspaceMemberRepository::new(self.clone())
    }

    pub fn project_members(&self) -> MockProjectMemberRepository {
        MockProjectMemberRepository::new(self.clone())
    }

    pub fn team_members(&self) -> MockTeamMemberRepository {
        MockTeamMemberRepository::new(self.clone())
    }

    pub fn project_teams(&self) -> MockProjectTeamRepository {
        MockProjectTeamRepository::new(self.clone())
    }

    /// Writes recorded so far, e.g. `"team_members.delete(4)"`.
    pub fn calls(&self) -> Vec<String> {
        self.inner
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_calls(&self) {
        self.inner
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Makes `operation` (e.g. `"project_members.transfer_ownership"`) fail
    /// with a database error from now on.
    pub fn fail_on(&self, operation: &str) {
        self.inner
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation.to_owned());
    }

    /// Records a write and returns an error if the operation was set to fail.
    pub(super) fn record(&self, operation: &str, args: String) -> Result<(), MembershipError> {
        self.inner
            .calls
            .lock()
            .map_err(|_| poisoned(operation))?
            .push(format!("{operation}({args})"));
        self.check(operation)
    }

    /// Returns an error if the operation was set to fail.
    pub(super) fn check(&self, operation: &str) -> Result<(), MembershipError> {
        let failing = self
            .inner
            .failing
            .lock()
            .map_err(|_| poisoned(operation))?;
        if failing.contains(operation) {
            log::error!(target: "trellis", "msg=\"database error\", operation=\"{operation}\", error=\"injected failure\"");
            return Err(MembershipError::DatabaseError(format!(
                "injected failure: {operation}"
            )));
        }
        Ok(())
    }

    pub(super) fn next_id(&self) -> i64 {
        self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(super) fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, MembershipError> {
        self.inner
            .tables
            .read()
            .map_err(|_| poisoned("read"))
    }

    pub(super) fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, MembershipError> {
        self.inner
            .tables
            .write()
            .map_err(|_| poisoned("write"))
    }

    fn seed(&self) -> RwLockWriteGuard<'_, Tables> {
        self.inner
            .tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn peek(&self) -> RwLockReadGuard<'_, Tables> {
        self.inner
            .tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // seeding

    pub fn add_user(&self, name: &str) -> User {
        let user = User {
            id: self.next_id(),
            name: name.to_owned(),
            email: format!("{}@example.com", name.to_lowercase()),
            created_at: Utc::now(),
        };
        self.seed().users.insert(user.id, user.clone());
        user
    }

    pub fn add_workspace(&self, name: &str) -> Workspace {
        let workspace = Workspace {
            id: self.next_id(),
            name: name.to_owned(),
            created_at: Utc::now(),
        };
        self.seed().workspaces.insert(workspace.id, workspace.clone());
        workspace
    }

    pub fn add_project(&self, workspace_id: i64, name: &str) -> Project {
        let project = Project {
            id: self.next_id(),
            workspace_id,
            name: name.to_owned(),
            created_at: Utc::now(),
        };
        self.seed().projects.insert(project.id, project.clone());
        project
    }

    pub fn add_team(&self, workspace_id: i64, name: &str) -> Team {
        let team = Team {
            id: self.next_id(),
            workspace_id,
            name: name.to_owned(),
            created_at: Utc::now(),
        };
        self.seed().teams.insert(team.id, team.clone());
        team
    }

    pub fn add_workspace_member(
        &self,
        workspace_id: i64,
        user_id: i64,
        role: WorkspaceRole,
    ) -> WorkspaceMember {
        let member = WorkspaceMember {
            id: self.next_id(),
            workspace_id,
            user_id,
            role,
            added_at: Utc::now(),
        };
        self.seed().workspace_members.insert(member.id, member.clone());
        member
    }

    pub fn add_project_member(
        &self,
        project_id: i64,
        workspace_member_id: i64,
        role: ProjectRole,
    ) -> ProjectMember {
        let member = ProjectMember {
            id: self.next_id(),
            project_id,
            workspace_member_id,
            role,
            added_at: Utc::now(),
        };
        self.seed().project_members.insert(member.id, member.clone());
        member
    }

    pub fn add_team_member(
        &self,
        team_id: i64,
        workspace_member_id: i64,
        role: TeamRole,
    ) -> TeamMember {
        let member = TeamMember {
            id: self.next_id(),
            team_id,
            workspace_member_id,
            role,
            added_at: Utc::now(),
        };
        self.seed().team_members.insert(member.id, member.clone());
        member
    }

    pub fn assign_team(&self, project_id: i64, team_id: i64) {
        self.seed().project_teams.insert((project_id, team_id));
    }

    // inspection

    pub fn has_user(&self, id: i64) -> bool {
        self.peek().users.contains_key(&id)
    }

    pub fn has_workspace(&self, id: i64) -> bool {
        self.peek().workspaces.contains_key(&id)
    }

    pub fn has_project(&self, id: i64) -> bool {
        self.peek().projects.contains_key(&id)
    }

    pub fn has_team(&self, id: i64) -> bool {
        self.peek().teams.contains_key(&id)
    }

    pub fn is_assigned(&self, project_id: i64, team_id: i64) -> bool {
        self.peek().project_teams.contains(&(project_id, team_id))
    }

    pub fn workspace_member(&self, id: i64) -> Option<WorkspaceMember> {
        self.peek().workspace_members.get(&id).cloned()
    }

    pub fn project_member(&self, id: i64) -> Option<ProjectMember> {
        self.peek().project_members.get(&id).cloned()
    }

    pub fn team_member(&self, id: i64) -> Option<TeamMember> {
        self.peek().team_members.get(&id).cloned()
    }

    pub fn workspace_members_of(&self, workspace_id: i64) -> Vec<WorkspaceMember> {
        self.peek()
            .workspace_members
            .values()
            .filter(|m| m.workspace_id == workspace_id)
            .cloned()
            .collect()
    }

    pub fn project_members_of(&self, project_id: i64) -> Vec<ProjectMember> {
        self.peek()
            .project_members
            .values()
            .filter(|m| m.project_id == project_id)
            .cloned()
            .collect()
    }

    pub fn team_members_of(&self, team_id: i64) -> Vec<TeamMember> {
        self.peek()
            .team_members
            .values()
            .filter(|m| m.team_id == team_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_delete_cascades() {
        let store = MockStore::new();
        let user = store.add_user("Ada");
        let workspace = store.add_workspace("Acme");
        let project = store.add_project(workspace.id, "Roadmap");
        let team = store.add_team(workspace.id, "Platform");
        let member = store.add_workspace_member(workspace.id, user.id, WorkspaceRole::Owner);
        store.add_project_member(project.id, member.id, ProjectRole::Owner);
        store.add_team_member(team.id, member.id, TeamRole::Owner);
        store.assign_team(project.id, team.id);

        assert!(store.seed().remove_workspace(workspace.id));

        assert!(!store.has_project(project.id));
        assert!(!store.has_team(team.id));
        assert!(store.workspace_members_of(workspace.id).is_empty());
        assert!(store.project_members_of(project.id).is_empty());
        assert!(!store.is_assigned(project.id, team.id));
        assert!(store.has_user(user.id));
    }

    #[test]
    fn test_fail_on_is_recorded_and_reported() {
        let store = MockStore::new();
        store.fail_on("teams.delete");

        let result = store.record("teams.delete", "7".to_owned());

        assert!(matches!(result, Err(MembershipError::DatabaseError(_))));
        assert_eq!(store.calls(), vec!["teams.delete(7)".to_owned()]);
    }
}
