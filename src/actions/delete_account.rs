use chrono::Utc;
use futures::future::try_join_all;

use super::support::{NestedPlan, classify_nested, ensure_affected, ensure_provided, scope_names};
use super::transfer_ownership::transfer;
use crate::MembershipError;
use crate::events::{MembershipEvent, dispatch};
use crate::membership::{Membership, ProjectRole, Role, TeamRole, WorkspaceRole, select_successor};
use crate::repository::{
    ProjectMember, ProjectMemberRepository, ProjectRepository, TeamMember, TeamMemberRepository,
    TeamRepository, UserRepository, WorkspaceMember, WorkspaceMemberRepository,
    WorkspaceRepository,
};

/// What deleting an account does to each workspace the user belongs to.
struct WorkspaceUnwind {
    /// Workspaces the user alone belongs to, deleted outright.
    sole: Vec<i64>,
    /// `(current owner, successor)` for shared workspaces the user owns.
    transfers: Vec<(WorkspaceMember, WorkspaceMember)>,
    /// Shared workspaces the user owns where nobody may inherit.
    blocked: Vec<i64>,
    /// The user's memberships in shared workspaces.
    shared: Vec<WorkspaceMember>,
}

/// Action to delete a user account with everything it holds.
///
/// Deleting an account unwinds the user's memberships bottom-up: ownership
/// of projects, teams and workspaces moves to a successor, project and team
/// memberships go, then workspace memberships, then workspaces the user
/// alone belongs to, and finally the user.
///
/// Every reason the account cannot be deleted is collected before anything
/// is changed. A failure after that aborts the remaining steps; the steps
/// already applied stay applied.
#[allow(clippy::struct_field_names)]
pub struct DeleteAccountAction<U, W, WM, P, PM, T, TM>
where
    U: UserRepository,
    W: WorkspaceRepository,
    WM: WorkspaceMemberRepository,
    P: ProjectRepository,
    PM: ProjectMemberRepository,
    T: TeamRepository,
    TM: TeamMemberRepository,
{
    user_repo: U,
    workspace_repo: W,
    workspace_member_repo: WM,
    project_repo: P,
    project_member_repo: PM,
    team_repo: T,
    team_member_repo: TM,
}

impl<U, W, WM, P, PM, T, TM> DeleteAccountAction<U, W, WM, P, PM, T, TM>
where
    U: UserRepository,
    W: WorkspaceRepository,
    WM: WorkspaceMemberRepository,
    P: ProjectRepository,
    PM: ProjectMemberRepository,
    T: TeamRepository,
    TM: TeamMemberRepository,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_repo: U,
        workspace_repo: W,
        workspace_member_repo: WM,
        project_repo: P,
        project_member_repo: PM,
        team_repo: T,
        team_member_repo: TM,
    ) -> Self {
        Self {
            user_repo,
            workspace_repo,
            workspace_member_repo,
            project_repo,
            project_member_repo,
            team_repo,
            team_member_repo,
        }
    }

    /// Deletes the account of `user_id`.
    ///
    /// # Returns
    ///
    /// - `Ok(rows)` - User rows deleted
    /// - `Err(MembershipError::Validation)` - Missing id
    /// - `Err(MembershipError::NotFound)` - User not found, or a row vanished mid-way
    /// - `Err(MembershipError::Forbidden)` - The user is the only member of a
    ///   project or team, or owns something nobody can inherit
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "delete_account", skip_all, err)
    )]
    pub async fn execute(&self, user_id: i64) -> Result<u64, MembershipError> {
        ensure_provided(user_id, "User id")?;

        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| MembershipError::NotFound("User not found".to_owned()))?;

        let memberships = self.workspace_member_repo.find_by_identity(user_id).await?;
        if memberships.is_empty() {
            return self.delete_user(user_id).await;
        }

        let workspaces = self.classify_workspaces(&memberships).await?;
        let shared_ids: Vec<i64> = workspaces.shared.iter().map(|m| m.id).collect();

        let (projects, teams) = self.classify_shared(&shared_ids).await?;
        self.ensure_deletable(&workspaces, &projects, &teams).await?;

        futures::try_join!(
            try_join_all(projects.transfers.iter().map(|(current, successor)| {
                transfer(
                    &self.project_member_repo,
                    current.project_id,
                    current,
                    successor,
                    ProjectRole::admin(),
                )
            })),
            try_join_all(teams.transfers.iter().map(|(current, successor)| {
                transfer(
                    &self.team_member_repo,
                    current.team_id,
                    current,
                    successor,
                    TeamRole::admin(),
                )
            })),
        )?;

        if !projects.rows.is_empty() {
            ensure_affected(
                self.project_member_repo.bulk_delete(&projects.rows).await?,
                "Project members",
            )?;
        }
        if !teams.rows.is_empty() {
            ensure_affected(
                self.team_member_repo.bulk_delete(&teams.rows).await?,
                "Team members",
            )?;
        }

        try_join_all(workspaces.transfers.iter().map(|(current, successor)| {
            transfer(
                &self.workspace_member_repo,
                current.workspace_id,
                current,
                successor,
                WorkspaceRole::admin(),
            )
        }))
        .await?;

        if !shared_ids.is_empty() {
            ensure_affected(
                self.workspace_member_repo.bulk_delete(&shared_ids).await?,
                "Workspace members",
            )?;
        }
        if !workspaces.sole.is_empty() {
            ensure_affected(
                self.workspace_repo.bulk_delete(&workspaces.sole).await?,
                "Workspaces",
            )?;
        }

        self.delete_user(user_id).await
    }

    async fn classify_workspaces(
        &self,
        memberships: &[WorkspaceMember],
    ) -> Result<WorkspaceUnwind, MembershipError> {
        let rosters = try_join_all(
            memberships
                .iter()
                .map(|m| self.workspace_member_repo.find_by_scope(m.workspace_id)),
        )
        .await?;

        let mut unwind = WorkspaceUnwind {
            sole: Vec::new(),
            transfers: Vec::new(),
            blocked: Vec::new(),
            shared: Vec::new(),
        };

        for (membership, roster) in memberships.iter().zip(&rosters) {
            if roster.iter().all(|peer| peer.id == membership.id) {
                unwind.sole.push(membership.workspace_id);
                continue;
            }

            if membership.role.is_owner() {
                match select_successor(roster, membership.id) {
                    Some(successor) => unwind
                        .transfers
                        .push((membership.clone(), successor.clone())),
                    None => unwind.blocked.push(membership.workspace_id),
                }
            }
            unwind.shared.push(membership.clone());
        }

        Ok(unwind)
    }

    /// Classifies the project and team memberships held through the given
    /// workspace memberships.
    async fn classify_shared(
        &self,
        workspace_member_ids: &[i64],
    ) -> Result<(NestedPlan<ProjectMember>, NestedPlan<TeamMember>), MembershipError> {
        let (projects, teams) = futures::try_join!(
            try_join_all(
                workspace_member_ids
                    .iter()
                    .map(|id| self.project_member_repo.find_by_identity(*id))
            ),
            try_join_all(
                workspace_member_ids
                    .iter()
                    .map(|id| self.team_member_repo.find_by_identity(*id))
            ),
        )?;
        let projects: Vec<ProjectMember> = projects.into_iter().flatten().collect();
        let teams: Vec<TeamMember> = teams.into_iter().flatten().collect();

        let (project_rosters, team_rosters) = futures::try_join!(
            try_join_all(
                projects
                    .iter()
                    .map(|m| self.project_member_repo.find_by_scope(m.scope_id()))
            ),
            try_join_all(
                teams
                    .iter()
                    .map(|m| self.team_member_repo.find_by_scope(m.scope_id()))
            ),
        )?;

        Ok((
            classify_nested(&projects, &project_rosters),
            classify_nested(&teams, &team_rosters),
        ))
    }

    async fn ensure_deletable(
        &self,
        workspaces: &WorkspaceUnwind,
        projects: &NestedPlan<ProjectMember>,
        teams: &NestedPlan<TeamMember>,
    ) -> Result<(), MembershipError> {
        let mut reasons = Vec::new();

        if !projects.sole.is_empty() {
            let names = scope_names(&self.project_repo, &projects.sole).await?;
            reasons.push(format!(
                "You are the only member of the following projects: {names}"
            ));
        }
        if !teams.sole.is_empty() {
            let names = scope_names(&self.team_repo, &teams.sole).await?;
            reasons.push(format!(
                "You are the only member of the following teams: {names}"
            ));
        }
        if !projects.blocked.is_empty() {
            let names = scope_names(&self.project_repo, &projects.blocked).await?;
            reasons.push(format!(
                "No eligible member can take ownership of the following projects: {names}"
            ));
        }
        if !teams.blocked.is_empty() {
            let names = scope_names(&self.team_repo, &teams.blocked).await?;
            reasons.push(format!(
                "No eligible member can take ownership of the following teams: {names}"
            ));
        }
        if !workspaces.blocked.is_empty() {
            let names = scope_names(&self.workspace_repo, &workspaces.blocked).await?;
            reasons.push(format!(
                "No eligible member can take ownership of the following workspaces: {names}"
            ));
        }

        if reasons.is_empty() {
            Ok(())
        } else {
            Err(MembershipError::Forbidden(reasons.join("; ")))
        }
    }

    async fn delete_user(&self, user_id: i64) -> Result<u64, MembershipError> {
        let rows = ensure_affected(self.user_repo.delete(user_id).await?, "User")?;

        log::info!(target: "trellis", "msg=\"account deleted\", user_id={user_id}");
        dispatch(MembershipEvent::AccountDeleted {
            user_id,
            at: Utc::now(),
        })
        .await;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{
        MockProjectMemberRepository, MockProjectRepository, MockStore, MockTeamMemberRepository,
        MockTeamRepository, MockUserRepository, MockWorkspaceMemberRepository,
        MockWorkspaceRepository,
    };

    type Action = DeleteAccountAction<
        MockUserRepository,
        MockWorkspaceRepository,
        MockWorkspaceMemberRepository,
        MockProjectRepository,
        MockProjectMemberRepository,
        MockTeamRepository,
        MockTeamMemberRepository,
    >;

    fn action(store: &MockStore) -> Action {
        DeleteAccountAction::new(
            store.users(),
            store.workspaces(),
            store.workspace_members(),
            store.projects(),
            store.project_members(),
            store.teams(),
            store.team_members(),
        )
    }

    fn deletes(store: &MockStore) -> Vec<String> {
        store
            .calls()
            .into_iter()
            .filter(|call| call.contains("delete"))
            .collect()
    }

    #[tokio::test]
    async fn test_user_without_workspaces() {
        let store = MockStore::new();
        let user = store.add_user("Ada");

        let rows = action(&store).execute(user.id).await.unwrap();

        assert_eq!(rows, 1);
        assert!(!store.has_user(user.id));
    }

    #[tokio::test]
    async fn test_missing_user() {
        let store = MockStore::new();

        let err = action(&store).execute(42).await.unwrap_err();

        assert_eq!(err, MembershipError::NotFound("User not found".into()));
    }

    #[tokio::test]
    async fn test_full_unwind() {
        let store = MockStore::new();
        let ada = store.add_user("Ada");
        let bob = store.add_user("Bob");

        let solo = store.add_workspace("Solo");
        store.add_workspace_member(solo.id, ada.id, WorkspaceRole::Owner);

        let shared = store.add_workspace("Shared");
        let ada_ws = store.add_workspace_member(shared.id, ada.id, WorkspaceRole::Owner);
        let bob_ws = store.add_workspace_member(shared.id, bob.id, WorkspaceRole::Member);

        let project = store.add_project(shared.id, "Roadmap");
        store.add_project_member(project.id, ada_ws.id, ProjectRole::Owner);
        let bob_project = store.add_project_member(project.id, bob_ws.id, ProjectRole::Admin);

        let team = store.add_team(shared.id, "Core");
        store.add_team_member(team.id, bob_ws.id, TeamRole::Owner);
        let ada_team = store.add_team_member(team.id, ada_ws.id, TeamRole::Member);

        let rows = action(&store).execute(ada.id).await.unwrap();

        assert_eq!(rows, 1);
        assert!(!store.has_user(ada.id));
        assert!(!store.has_workspace(solo.id));
        assert!(store.has_workspace(shared.id));
        assert_eq!(
            store.workspace_member(bob_ws.id).unwrap().role,
            WorkspaceRole::Owner
        );
        assert_eq!(
            store.project_member(bob_project.id).unwrap().role,
            ProjectRole::Owner
        );
        assert!(store.team_member(ada_team.id).is_none());

        // bottom-up
        let order: Vec<String> = deletes(&store)
            .iter()
            .map(|call| call.split('(').next().unwrap_or_default().to_owned())
            .collect();
        assert_eq!(
            order,
            vec![
                "project_members.bulk_delete",
                "team_members.bulk_delete",
                "workspace_members.bulk_delete",
                "workspaces.bulk_delete",
                "users.delete",
            ]
        );
    }

    #[tokio::test]
    async fn test_owned_team_goes_to_its_admin() {
        let store = MockStore::new();
        let ada = store.add_user("Ada");
        let bob = store.add_user("Bob");
        let cy = store.add_user("Cy");
        let shared = store.add_workspace("Shared");
        let ada_ws = store.add_workspace_member(shared.id, ada.id, WorkspaceRole::Member);
        let bob_ws = store.add_workspace_member(shared.id, bob.id, WorkspaceRole::Owner);
        let cy_ws = store.add_workspace_member(shared.id, cy.id, WorkspaceRole::Member);

        let team = store.add_team(shared.id, "Core");
        let ada_team = store.add_team_member(team.id, ada_ws.id, TeamRole::Owner);
        store.add_team_member(team.id, bob_ws.id, TeamRole::Member);
        let cy_team = store.add_team_member(team.id, cy_ws.id, TeamRole::Admin);

        action(&store).execute(ada.id).await.unwrap();

        assert!(store.team_member(ada_team.id).is_none());
        let owners: Vec<_> = store
            .team_members_of(team.id)
            .into_iter()
            .filter(|m| m.role == TeamRole::Owner)
            .collect();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].id, cy_team.id);
        assert_eq!(
            store.workspace_member(bob_ws.id).unwrap().role,
            WorkspaceRole::Owner
        );
    }

    #[tokio::test]
    async fn test_only_member_of_project_blocks() {
        let store = MockStore::new();
        let ada = store.add_user("Ada");
        let bob = store.add_user("Bob");
        let shared = store.add_workspace("Shared");
        let ada_ws = store.add_workspace_member(shared.id, ada.id, WorkspaceRole::Owner);
        store.add_workspace_member(shared.id, bob.id, WorkspaceRole::Admin);
        let alpha = store.add_project(shared.id, "Alpha");
        let beta = store.add_project(shared.id, "Beta");
        store.add_project_member(alpha.id, ada_ws.id, ProjectRole::Owner);
        store.add_project_member(beta.id, ada_ws.id, ProjectRole::Owner);

        let err = action(&store).execute(ada.id).await.unwrap_err();

        assert_eq!(
            err,
            MembershipError::Forbidden(
                "You are the only member of the following projects: Alpha, Beta".into()
            )
        );
        assert!(deletes(&store).is_empty());
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_every_blocker_is_reported() {
        let store = MockStore::new();
        let ada = store.add_user("Ada");
        let bob = store.add_user("Bob");
        let shared = store.add_workspace("Shared");
        let ada_ws = store.add_workspace_member(shared.id, ada.id, WorkspaceRole::Owner);
        let bob_ws = store.add_workspace_member(shared.id, bob.id, WorkspaceRole::Member);

        let team = store.add_team(shared.id, "Core");
        store.add_team_member(team.id, ada_ws.id, TeamRole::Owner);

        let docs = store.add_project(shared.id, "Docs");
        store.add_project_member(docs.id, ada_ws.id, ProjectRole::Owner);
        store.add_project_member(docs.id, bob_ws.id, ProjectRole::Viewer);

        let err = action(&store).execute(ada.id).await.unwrap_err();

        assert_eq!(
            err,
            MembershipError::Forbidden(
                "You are the only member of the following teams: Core; \
                 No eligible member can take ownership of the following projects: Docs"
                    .into()
            )
        );
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_transfer_aborts_before_deletes() {
        let store = MockStore::new();
        let ada = store.add_user("Ada");
        let bob = store.add_user("Bob");
        let shared = store.add_workspace("Shared");
        let ada_ws = store.add_workspace_member(shared.id, ada.id, WorkspaceRole::Member);
        let bob_ws = store.add_workspace_member(shared.id, bob.id, WorkspaceRole::Owner);
        let project = store.add_project(shared.id, "Roadmap");
        store.add_project_member(project.id, ada_ws.id, ProjectRole::Owner);
        store.add_project_member(project.id, bob_ws.id, ProjectRole::Member);
        store.fail_on("project_members.transfer_ownership");

        let err = action(&store).execute(ada.id).await.unwrap_err();

        assert!(matches!(err, MembershipError::DatabaseError(_)));
        assert!(deletes(&store).is_empty());
        assert!(store.has_user(ada.id));
    }
}
