//! Taking a team's members out of a project the team is assigned to.

use std::collections::HashSet;

use futures::future::try_join_all;

use super::support::ensure_affected;
use super::transfer_ownership::transfer;
use crate::MembershipError;
use crate::membership::{ProjectRole, Role, select_successor};
use crate::repository::{ProjectMember, ProjectMemberRepository, ProjectTeamRepository, TeamMemberRepository};

/// How a project is affected by losing one of its teams.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Detachment {
    /// The project keeps members; `rows` leave, after `handover` if the
    /// owner is among them.
    Clear {
        project_id: i64,
        handover: Option<(ProjectMember, ProjectMember)>,
        rows: Vec<i64>,
    },
    /// Every project member came with the team.
    Emptied { project_id: i64 },
    /// The owner came with the team and nobody left may inherit.
    NoSuccessor { project_id: i64 },
}

impl Detachment {
    pub(crate) fn project_id(&self) -> i64 {
        match self {
            Self::Clear { project_id, .. }
            | Self::Emptied { project_id }
            | Self::NoSuccessor { project_id } => *project_id,
        }
    }
}

/// Works out which members of `project_id` leave along with `team_id`.
///
/// A project member leaves when they belong to the team and to no other team
/// still assigned to the project.
pub(crate) async fn plan_detachment<PM, PT, TM>(
    project_member_repo: &PM,
    project_team_repo: &PT,
    team_member_repo: &TM,
    project_id: i64,
    team_id: i64,
) -> Result<Detachment, MembershipError>
where
    PM: ProjectMemberRepository,
    PT: ProjectTeamRepository,
    TM: TeamMemberRepository,
{
    let (project_members, team_ids) = futures::try_join!(
        project_member_repo.find_by_scope(project_id),
        project_team_repo.find_teams_by_project(project_id),
    )?;

    let rosters = try_join_all(
        team_ids
            .iter()
            .map(|id| team_member_repo.find_by_scope(*id)),
    )
    .await?;

    let mut leaving_team = HashSet::new();
    let mut staying_teams = HashSet::new();
    for (id, roster) in team_ids.iter().zip(rosters) {
        let set = if *id == team_id {
            &mut leaving_team
        } else {
            &mut staying_teams
        };
        set.extend(roster.into_iter().map(|m| m.workspace_member_id));
    }

    let (leaving, remaining): (Vec<ProjectMember>, Vec<ProjectMember>) =
        project_members.into_iter().partition(|m| {
            leaving_team.contains(&m.workspace_member_id)
                && !staying_teams.contains(&m.workspace_member_id)
        });

    if leaving.is_empty() {
        return Ok(Detachment::Clear {
            project_id,
            handover: None,
            rows: Vec::new(),
        });
    }
    if remaining.is_empty() {
        return Ok(Detachment::Emptied { project_id });
    }

    let handover = match leaving.iter().find(|m| m.role.is_owner()) {
        Some(owner) => match select_successor(&remaining, owner.id) {
            Some(successor) => Some((owner.clone(), successor.clone())),
            None => return Ok(Detachment::NoSuccessor { project_id }),
        },
        None => None,
    };

    Ok(Detachment::Clear {
        project_id,
        handover,
        rows: leaving.iter().map(|m| m.id).collect(),
    })
}

/// Hands the project over if its owner is leaving.
pub(crate) async fn hand_over<PM: ProjectMemberRepository>(
    project_member_repo: &PM,
    handover: Option<&(ProjectMember, ProjectMember)>,
) -> Result<(), MembershipError> {
    if let Some((owner, successor)) = handover {
        transfer(
            project_member_repo,
            owner.project_id,
            owner,
            successor,
            ProjectRole::admin(),
        )
        .await?;
    }
    Ok(())
}

/// Deletes the leaving project memberships.
pub(crate) async fn remove_rows<PM: ProjectMemberRepository>(
    project_member_repo: &PM,
    rows: &[i64],
) -> Result<u64, MembershipError> {
    if rows.is_empty() {
        return Ok(0);
    }
    ensure_affected(project_member_repo.bulk_delete(rows).await?, "Project members")
}
