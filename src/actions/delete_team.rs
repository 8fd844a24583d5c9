use chrono::Utc;
use futures::future::try_join_all;

use super::detach::{Detachment, hand_over, plan_detachment, remove_rows};
use super::support::{ensure_affected, ensure_provided, scope_names};
use crate::MembershipError;
use crate::events::{MembershipEvent, dispatch};
use crate::membership::{Role, ScopeKind};
use crate::repository::{
    ProjectMemberRepository, ProjectRepository, ProjectTeamRepository, TeamMember,
    TeamMemberRepository, TeamRepository,
};

/// Output of [`DeleteTeamAction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteTeamOutput {
    pub team_deleted: bool,
    /// Project memberships removed because they came with the team.
    pub team_members_deleted_from_projects: u64,
}

/// Action to delete a team.
///
/// This action:
/// 1. Checks the requester owns the team
/// 2. Works out, per assigned project, which members leave with the team
/// 3. Refuses if any project would be left empty or without an eligible owner
/// 4. Hands those projects over and removes the leaving members
/// 5. Deletes the team, its memberships and assignments
#[allow(clippy::struct_field_names)]
pub struct DeleteTeamAction<T, TM, P, PM, PT>
where
    T: TeamRepository,
    TM: TeamMemberRepository,
    P: ProjectRepository,
    PM: ProjectMemberRepository,
    PT: ProjectTeamRepository,
{
    team_repo: T,
    team_member_repo: TM,
    project_repo: P,
    project_member_repo: PM,
    project_team_repo: PT,
}

impl<T, TM, P, PM, PT> DeleteTeamAction<T, TM, P, PM, PT>
where
    T: TeamRepository,
    TM: TeamMemberRepository,
    P: ProjectRepository,
    PM: ProjectMemberRepository,
    PT: ProjectTeamRepository,
{
    pub fn new(
        team_repo: T,
        team_member_repo: TM,
        project_repo: P,
        project_member_repo: PM,
        project_team_repo: PT,
    ) -> Self {
        Self {
            team_repo,
            team_member_repo,
            project_repo,
            project_member_repo,
            project_team_repo,
        }
    }

    /// Deletes `team_id` on behalf of `requester`.
    ///
    /// # Returns
    ///
    /// - `Ok(output)` - Team deleted
    /// - `Err(MembershipError::Validation)` - Missing ids
    /// - `Err(MembershipError::Forbidden)` - Requester is not the owner, or projects would be stranded
    /// - `Err(MembershipError::NotFound)` - Team or rows already gone
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "delete_team", skip_all, err)
    )]
    pub async fn execute(
        &self,
        team_id: i64,
        requester: &TeamMember,
    ) -> Result<DeleteTeamOutput, MembershipError> {
        ensure_provided(team_id, "Team id")?;
        ensure_provided(requester.id, "Requesting member")?;
        if requester.team_id != team_id {
            return Err(MembershipError::Forbidden(
                "The member does not belong to this team".to_owned(),
            ));
        }
        if !requester.role.is_owner() {
            return Err(MembershipError::Forbidden(
                "Only the team owner can delete the team".to_owned(),
            ));
        }

        let project_ids = self
            .project_team_repo
            .find_projects_by_team(team_id)
            .await?;
        let detachments = try_join_all(project_ids.iter().map(|project_id| {
            plan_detachment(
                &self.project_member_repo,
                &self.project_team_repo,
                &self.team_member_repo,
                *project_id,
                team_id,
            )
        }))
        .await?;

        self.ensure_not_stranded(&detachments).await?;

        let mut handovers = Vec::new();
        let mut rows = Vec::new();
        for detachment in &detachments {
            if let Detachment::Clear {
                handover,
                rows: leaving,
                ..
            } = detachment
            {
                handovers.extend(handover.as_ref());
                rows.extend_from_slice(leaving);
            }
        }

        try_join_all(
            handovers
                .into_iter()
                .map(|handover| hand_over(&self.project_member_repo, Some(handover))),
        )
        .await?;
        let team_members_deleted_from_projects =
            remove_rows(&self.project_member_repo, &rows).await?;

        ensure_affected(self.team_repo.delete(team_id).await?, "Team")?;

        log::info!(
            target: "trellis",
            "msg=\"team deleted\", team_id={team_id}, deleted_by={}, removed_from_projects={team_members_deleted_from_projects}",
            requester.id
        );
        dispatch(MembershipEvent::ScopeDeleted {
            scope: ScopeKind::Team,
            scope_id: team_id,
            at: Utc::now(),
        })
        .await;

        Ok(DeleteTeamOutput {
            team_deleted: true,
            team_members_deleted_from_projects,
        })
    }

    async fn ensure_not_stranded(&self, detachments: &[Detachment]) -> Result<(), MembershipError> {
        let emptied: Vec<i64> = detachments
            .iter()
            .filter(|d| matches!(d, Detachment::Emptied { .. }))
            .map(Detachment::project_id)
            .collect();
        let ownerless: Vec<i64> = detachments
            .iter()
            .filter(|d| matches!(d, Detachment::NoSuccessor { .. }))
            .map(Detachment::project_id)
            .collect();

        let mut reasons = Vec::new();
        if !emptied.is_empty() {
            let names = scope_names(&self.project_repo, &emptied).await?;
            reasons.push(format!(
                "All members of the following projects belong to the team: {names}"
            ));
        }
        if !ownerless.is_empty() {
            let names = scope_names(&self.project_repo, &ownerless).await?;
            reasons.push(format!(
                "No eligible member can take ownership of the following projects: {names}"
            ));
        }

        if reasons.is_empty() {
            Ok(())
        } else {
            Err(MembershipError::Forbidden(reasons.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::{ProjectRole, TeamRole};
    use crate::repository::{
        MockProjectMemberRepository, MockProjectRepository, MockProjectTeamRepository, MockStore,
        MockTeamMemberRepository, MockTeamRepository,
    };

    type Action = DeleteTeamAction<
        MockTeamRepository,
        MockTeamMemberRepository,
        MockProjectRepository,
        MockProjectMemberRepository,
        MockProjectTeamRepository,
    >;

    fn action(store: &MockStore) -> Action {
        DeleteTeamAction::new(
            store.teams(),
            store.team_members(),
            store.projects(),
            store.project_members(),
            store.project_teams(),
        )
    }

    #[tokio::test]
    async fn test_delete_team_detaches_projects() {
        let store = MockStore::new();
        let team = store.add_team(1, "Core");
        let roadmap = store.add_project(1, "Roadmap");
        store.assign_team(roadmap.id, team.id);

        let owner = store.add_team_member(team.id, 10, TeamRole::Owner);
        store.add_team_member(team.id, 11, TeamRole::Member);
        let project_owner = store.add_project_member(roadmap.id, 10, ProjectRole::Owner);
        let via_team = store.add_project_member(roadmap.id, 11, ProjectRole::Member);
        let direct = store.add_project_member(roadmap.id, 20, ProjectRole::Admin);

        let output = action(&store).execute(team.id, &owner).await.unwrap();

        assert_eq!(
            output,
            DeleteTeamOutput {
                team_deleted: true,
                team_members_deleted_from_projects: 2,
            }
        );
        assert!(!store.has_team(team.id));
        assert!(store.project_member(project_owner.id).is_none());
        assert!(store.project_member(via_team.id).is_none());
        assert_eq!(store.project_member(direct.id).unwrap().role, ProjectRole::Owner);
        assert!(!store.is_assigned(roadmap.id, team.id));
    }

    #[tokio::test]
    async fn test_only_owner_may_delete() {
        let store = MockStore::new();
        let team = store.add_team(1, "Core");
        store.add_team_member(team.id, 10, TeamRole::Owner);
        let admin = store.add_team_member(team.id, 11, TeamRole::Admin);

        let err = action(&store).execute(team.id, &admin).await.unwrap_err();

        assert_eq!(
            err,
            MembershipError::Forbidden("Only the team owner can delete the team".into())
        );
        assert!(store.has_team(team.id));
    }

    #[tokio::test]
    async fn test_all_blockers_named_together() {
        let store = MockStore::new();
        let team = store.add_team(1, "Core");
        let emptied = store.add_project(1, "Emptied");
        let ownerless = store.add_project(1, "Ownerless");
        store.assign_team(emptied.id, team.id);
        store.assign_team(ownerless.id, team.id);

        let owner = store.add_team_member(team.id, 10, TeamRole::Owner);
        store.add_project_member(emptied.id, 10, ProjectRole::Owner);
        store.add_project_member(ownerless.id, 10, ProjectRole::Owner);
        store.add_project_member(ownerless.id, 20, ProjectRole::Viewer);

        let err = action(&store).execute(team.id, &owner).await.unwrap_err();

        assert_eq!(
            err,
            MembershipError::Forbidden(
                "All members of the following projects belong to the team: Emptied; \
                 No eligible member can take ownership of the following projects: Ownerless"
                    .into()
            )
        );
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_team_without_projects() {
        let store = MockStore::new();
        let team = store.add_team(1, "Core");
        let owner = store.add_team_member(team.id, 10, TeamRole::Owner);

        let output = action(&store).execute(team.id, &owner).await.unwrap();

        assert_eq!(output.team_members_deleted_from_projects, 0);
        assert_eq!(store.calls(), vec![format!("teams.delete({})", team.id)]);
    }
}
