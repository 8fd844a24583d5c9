use chrono::Utc;

use super::detach::{Detachment, hand_over, plan_detachment, remove_rows};
use super::support::{ensure_affected, ensure_provided};
use crate::MembershipError;
use crate::events::{MembershipEvent, dispatch};
use crate::repository::{
    ProjectMemberRepository, ProjectRepository, ProjectTeamRepository, ScopeRecord,
    TeamMemberRepository,
};

/// Output of [`UnassignProjectAction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnassignProjectOutput {
    pub unassigned: u64,
    /// Project memberships removed along with the team.
    pub members_removed: u64,
}

/// Action to take a team off a project.
///
/// Project members who got there through this team, and through no other
/// team still assigned, leave the project. If the project owner is one of
/// them ownership moves to the first remaining admin, else member.
#[allow(clippy::struct_field_names)]
pub struct UnassignProjectAction<P, PM, PT, TM>
where
    P: ProjectRepository,
    PM: ProjectMemberRepository,
    PT: ProjectTeamRepository,
    TM: TeamMemberRepository,
{
    project_repo: P,
    project_member_repo: PM,
    project_team_repo: PT,
    team_member_repo: TM,
}

impl<P, PM, PT, TM> UnassignProjectAction<P, PM, PT, TM>
where
    P: ProjectRepository,
    PM: ProjectMemberRepository,
    PT: ProjectTeamRepository,
    TM: TeamMemberRepository,
{
    pub fn new(
        project_repo: P,
        project_member_repo: PM,
        project_team_repo: PT,
        team_member_repo: TM,
    ) -> Self {
        Self {
            project_repo,
            project_member_repo,
            project_team_repo,
            team_member_repo,
        }
    }

    /// Removes the assignment of `team_id` to `project_id`.
    ///
    /// # Returns
    ///
    /// - `Ok(output)` - Assignment removed and how many members left with it
    /// - `Err(MembershipError::Validation)` - Missing ids
    /// - `Err(MembershipError::NotFound)` - The team is not assigned to the project
    /// - `Err(MembershipError::Forbidden)` - The project would be left empty or ownerless
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "unassign_project", skip_all, err)
    )]
    pub async fn execute(
        &self,
        project_id: i64,
        team_id: i64,
    ) -> Result<UnassignProjectOutput, MembershipError> {
        ensure_provided(project_id, "Project id")?;
        ensure_provided(team_id, "Team id")?;

        let assigned = self
            .project_team_repo
            .find_teams_by_project(project_id)
            .await?;
        if !assigned.contains(&team_id) {
            return Err(MembershipError::NotFound(
                "The team is not assigned to this project".to_owned(),
            ));
        }

        let detachment = plan_detachment(
            &self.project_member_repo,
            &self.project_team_repo,
            &self.team_member_repo,
            project_id,
            team_id,
        )
        .await?;

        let (handover, rows) = match detachment {
            Detachment::Clear { handover, rows, .. } => (handover, rows),
            Detachment::Emptied { .. } => {
                let name = self.project_name(project_id).await?;
                return Err(MembershipError::Forbidden(format!(
                    "All members of project \"{name}\" belong to the team, add another member before unassigning it"
                )));
            }
            Detachment::NoSuccessor { .. } => {
                let name = self.project_name(project_id).await?;
                return Err(MembershipError::Forbidden(format!(
                    "No eligible member can take ownership of project \"{name}\""
                )));
            }
        };

        hand_over(&self.project_member_repo, handover.as_ref()).await?;
        let unassigned = ensure_affected(
            self.project_team_repo.unassign(project_id, team_id).await?,
            "Team assignment",
        )?;
        let members_removed = remove_rows(&self.project_member_repo, &rows).await?;

        log::info!(
            target: "trellis",
            "msg=\"team unassigned from project\", project_id={project_id}, team_id={team_id}, members_removed={members_removed}"
        );
        dispatch(MembershipEvent::TeamUnassigned {
            project_id,
            team_id,
            members_removed,
            at: Utc::now(),
        })
        .await;

        Ok(UnassignProjectOutput {
            unassigned,
            members_removed,
        })
    }

    async fn project_name(&self, project_id: i64) -> Result<String, MembershipError> {
        Ok(self
            .project_repo
            .find_by_id(project_id)
            .await?
            .map_or_else(|| format!("#{project_id}"), |p| p.name().to_owned()))
    }
}
