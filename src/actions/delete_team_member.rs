use futures::future::try_join_all;

use super::removal::{RemoveMemberInput, execute_plan, plan_removal};
use super::support::{classify_nested, ensure_affected, scope_names};
use super::transfer_ownership::transfer;
use crate::MembershipError;
use crate::membership::{ProjectRole, Role};
use crate::repository::{
    ProjectMember, ProjectMemberRepository, ProjectRepository, ProjectTeamRepository, TeamMember,
    TeamMemberRepository, TeamRepository,
};

/// Output of [`DeleteTeamMemberAction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteTeamMemberOutput {
    /// Rows deleted at team level (membership, or the team itself).
    pub removed: u64,
    /// Project memberships deleted alongside.
    pub removed_from_projects: u64,
}

/// Action to remove a member from a team, or to leave it.
///
/// Optionally also removes the member from every project the team is
/// assigned to, handing over the projects they own first.
#[allow(clippy::struct_field_names)]
pub struct DeleteTeamMemberAction<T, TM, P, PM, PT>
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

impl<T, TM, P, PM, PT> DeleteTeamMemberAction<T, TM, P, PM, PT>
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

    /// Removes `input.target` from its team.
    ///
    /// With `remove_from_projects` set, the target's memberships in the
    /// team's projects go too. Every project the target would leave without
    /// an eligible successor is reported before anything is changed.
    ///
    /// # Returns
    ///
    /// - `Ok(output)` - Rows removed at team and project level
    /// - `Err(MembershipError::Validation)` - Malformed input
    /// - `Err(MembershipError::Forbidden)` - Not allowed, or projects nobody can take over
    /// - `Err(MembershipError::NotFound)` - A row was already gone
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "delete_team_member", skip_all, err)
    )]
    pub async fn execute(
        &self,
        input: RemoveMemberInput<TeamMember>,
        remove_from_projects: bool,
    ) -> Result<DeleteTeamMemberOutput, MembershipError> {
        let plan = plan_removal(&input)?;

        let removed_from_projects = if remove_from_projects {
            self.remove_from_team_projects(&input.target).await?
        } else {
            0
        };

        let outcome =
            execute_plan(&self.team_repo, &self.team_member_repo, &input, plan).await?;

        Ok(DeleteTeamMemberOutput {
            removed: outcome.removed,
            removed_from_projects,
        })
    }

    async fn remove_from_team_projects(&self, target: &TeamMember) -> Result<u64, MembershipError> {
        let project_ids = self
            .project_team_repo
            .find_projects_by_team(target.team_id)
            .await?;
        if project_ids.is_empty() {
            return Ok(0);
        }

        let memberships: Vec<ProjectMember> = self
            .project_member_repo
            .find_by_identity(target.workspace_member_id)
            .await?
            .into_iter()
            .filter(|m| project_ids.contains(&m.project_id))
            .collect();
        if memberships.is_empty() {
            return Ok(0);
        }

        let rosters = try_join_all(
            memberships
                .iter()
                .map(|m| self.project_member_repo.find_by_scope(m.project_id)),
        )
        .await?;
        let nested = classify_nested(&memberships, &rosters);

        // a project this member alone belongs to has nobody to inherit it either
        let stranded: Vec<i64> = nested.sole.iter().chain(&nested.blocked).copied().collect();
        if !stranded.is_empty() {
            let names = scope_names(&self.project_repo, &stranded).await?;
            return Err(MembershipError::Forbidden(format!(
                "No eligible member can take ownership of the following projects: {names}"
            )));
        }

        try_join_all(nested.transfers.iter().map(|(current, successor)| {
            transfer(
                &self.project_member_repo,
                current.project_id,
                current,
                successor,
                ProjectRole::admin(),
            )
        }))
        .await?;

        let removed = ensure_affected(
            self.project_member_repo.bulk_delete(&nested.rows).await?,
            "Project members",
        )?;

        log::info!(
            target: "trellis",
            "msg=\"team member removed from projects\", team_id={}, member_id={}, removed={removed}",
            target.team_id,
            target.id
        );

        Ok(removed)
    }
}
