use chrono::Utc;
use futures::future::{join_all, try_join_all};

use super::removal::{RemovalPlan, RemoveMemberInput, execute_plan, plan_removal};
use super::support::{NestedPlan, classify_nested, ensure_affected, scope_names};
use super::transfer_ownership::transfer;
use crate::MembershipError;
use crate::config::MembershipConfig;
use crate::events::{MembershipEvent, dispatch};
use crate::membership::{Membership, ProjectRole, Role, ScopeKind, TeamRole};
use crate::repository::{
    ProjectMember, ProjectMemberRepository, ProjectRepository, TeamMember, TeamMemberRepository,
    TeamRepository, WorkspaceMember, WorkspaceMemberRepository, WorkspaceRepository,
};

/// A nested ownership transfer that failed while the removal went ahead.
///
/// The outgoing owner's row in that project or team is still deleted, so
/// the scope is left without an owner until someone is promoted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedTransfer {
    pub scope: ScopeKind,
    pub scope_id: i64,
    pub error: MembershipError,
}

/// Output of [`RemoveWorkspaceMemberAction`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveWorkspaceMemberOutput {
    /// Rows deleted at workspace level (membership, or the workspace itself).
    pub removed: u64,
    pub workspace_deleted: bool,
    /// Projects and teams successfully handed to a successor.
    pub transferred: usize,
    /// Projects and teams whose handover failed. Empty on full success.
    pub failed_transfers: Vec<FailedTransfer>,
    /// Projects deleted because the member was their only member.
    pub deleted_projects: u64,
    /// Teams deleted because the member was their only member.
    pub deleted_teams: u64,
}

/// Action to remove a member from a workspace, or to leave it.
///
/// Before the workspace membership goes, the member's project and team
/// memberships in that workspace are unwound:
/// - projects and teams they alone belong to are deleted
/// - projects and teams they own are handed to a successor
/// - their remaining rows are deleted
///
/// If any owned project or team has members but none that may inherit it,
/// nothing is changed and the call fails naming them.
///
/// A failed nested handover does not stop the removal by default; it is
/// logged, dispatched as [`MembershipEvent::NestedTransferFailed`] and
/// reported in [`RemoveWorkspaceMemberOutput::failed_transfers`]. Use
/// [`MembershipConfig::strict`] to make it fatal.
#[allow(clippy::struct_field_names)]
pub struct RemoveWorkspaceMemberAction<W, WM, P, PM, T, TM>
where
    W: WorkspaceRepository,
    WM: WorkspaceMemberRepository,
    P: ProjectRepository,
    PM: ProjectMemberRepository,
    T: TeamRepository,
    TM: TeamMemberRepository,
{
    workspace_repo: W,
    workspace_member_repo: WM,
    project_repo: P,
    project_member_repo: PM,
    team_repo: T,
    team_member_repo: TM,
    config: MembershipConfig,
}

impl<W, WM, P, PM, T, TM> RemoveWorkspaceMemberAction<W, WM, P, PM, T, TM>
where
    W: WorkspaceRepository,
    WM: WorkspaceMemberRepository,
    P: ProjectRepository,
    PM: ProjectMemberRepository,
    T: TeamRepository,
    TM: TeamMemberRepository,
{
    pub fn new(
        workspace_repo: W,
        workspace_member_repo: WM,
        project_repo: P,
        project_member_repo: PM,
        team_repo: T,
        team_member_repo: TM,
    ) -> Self {
        Self {
            workspace_repo,
            workspace_member_repo,
            project_repo,
            project_member_repo,
            team_repo,
            team_member_repo,
            config: MembershipConfig::default(),
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: MembershipConfig) -> Self {
        self.config = config;
        self
    }

    /// Removes `input.target` from its workspace.
    ///
    /// # Returns
    ///
    /// - `Ok(output)` - What was removed, transferred and deleted
    /// - `Err(MembershipError::Validation)` - Malformed input
    /// - `Err(MembershipError::Forbidden)` - Not allowed, or scopes nobody can take over
    /// - `Err(MembershipError::NotFound)` - A row was already gone
    /// - `Err(_)` - A nested transfer failed under [`MembershipConfig::strict`]
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "remove_workspace_member", skip_all, err)
    )]
    pub async fn execute(
        &self,
        input: RemoveMemberInput<WorkspaceMember>,
    ) -> Result<RemoveWorkspaceMemberOutput, MembershipError> {
        let plan = plan_removal(&input)?;
        let mut output = RemoveWorkspaceMemberOutput::default();

        // deleting the workspace takes every nested scope with it
        if plan != RemovalPlan::DeleteScope {
            self.unwind_nested(&input.target, &mut output).await?;
        }

        let outcome = execute_plan(
            &self.workspace_repo,
            &self.workspace_member_repo,
            &input,
            plan,
        )
        .await?;

        output.removed = outcome.removed;
        output.workspace_deleted = outcome.scope_deleted;
        Ok(output)
    }

    async fn unwind_nested(
        &self,
        target: &WorkspaceMember,
        output: &mut RemoveWorkspaceMemberOutput,
    ) -> Result<(), MembershipError> {
        let (projects, teams) = futures::try_join!(
            self.project_member_repo.find_by_identity(target.id),
            self.team_member_repo.find_by_identity(target.id),
        )?;
        let (project_rosters, team_rosters) = futures::try_join!(
            try_join_all(
                projects
                    .iter()
                    .map(|m| self.project_member_repo.find_by_scope(m.project_id))
            ),
            try_join_all(
                teams
                    .iter()
                    .map(|m| self.team_member_repo.find_by_scope(m.team_id))
            ),
        )?;

        let projects = classify_nested(&projects, &project_rosters);
        let teams = classify_nested(&teams, &team_rosters);

        self.ensure_not_blocked(&projects, &teams).await?;

        let (project_results, team_results) = futures::join!(
            join_all(projects.transfers.iter().map(|(current, successor)| {
                transfer(
                    &self.project_member_repo,
                    current.project_id,
                    current,
                    successor,
                    ProjectRole::admin(),
                )
            })),
            join_all(teams.transfers.iter().map(|(current, successor)| {
                transfer(
                    &self.team_member_repo,
                    current.team_id,
                    current,
                    successor,
                    TeamRole::admin(),
                )
            })),
        );

        let settled = settled(&projects.transfers, project_results)
            .into_iter()
            .chain(settled(&teams.transfers, team_results));
        for (scope, scope_id, result) in settled {
            match result {
                Ok(_) => output.transferred += 1,
                Err(error) => {
                    self.nested_transfer_failed(target, scope, scope_id, &error)
                        .await;
                    if self.config.aborts_on_nested_failure() {
                        return Err(error);
                    }
                    output.failed_transfers.push(FailedTransfer {
                        scope,
                        scope_id,
                        error,
                    });
                }
            }
        }

        if !projects.sole.is_empty() {
            output.deleted_projects = ensure_affected(
                self.project_repo.bulk_delete(&projects.sole).await?,
                "Projects",
            )?;
        }
        if !teams.sole.is_empty() {
            output.deleted_teams =
                ensure_affected(self.team_repo.bulk_delete(&teams.sole).await?, "Teams")?;
        }
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

        Ok(())
    }

    async fn ensure_not_blocked(
        &self,
        projects: &NestedPlan<ProjectMember>,
        teams: &NestedPlan<TeamMember>,
    ) -> Result<(), MembershipError> {
        if projects.blocked.is_empty() && teams.blocked.is_empty() {
            return Ok(());
        }

        let mut blocked = Vec::new();
        if !projects.blocked.is_empty() {
            let names = scope_names(&self.project_repo, &projects.blocked).await?;
            blocked.push(format!("projects: {names}"));
        }
        if !teams.blocked.is_empty() {
            let names = scope_names(&self.team_repo, &teams.blocked).await?;
            blocked.push(format!("teams: {names}"));
        }

        Err(MembershipError::Forbidden(format!(
            "No eligible member can take ownership of the following {}",
            blocked.join(" and ")
        )))
    }

    async fn nested_transfer_failed(
        &self,
        target: &WorkspaceMember,
        scope: ScopeKind,
        scope_id: i64,
        error: &MembershipError,
    ) {
        log::warn!(
            target: "trellis",
            "msg=\"nested ownership transfer failed, continuing removal\", workspace_id={}, member_id={}, scope=\"{scope}\", scope_id={scope_id}, error=\"{error}\"",
            target.workspace_id,
            target.id
        );
        dispatch(MembershipEvent::NestedTransferFailed {
            scope,
            scope_id,
            reason: error.to_string(),
            at: Utc::now(),
        })
        .await;
    }
}

fn settled<M: Membership>(
    transfers: &[(M, M)],
    results: Vec<Result<u64, MembershipError>>,
) -> Vec<(ScopeKind, i64, Result<u64, MembershipError>)> {
    transfers
        .iter()
        .zip(results)
        .map(|((current, _), result)| (M::SCOPE, current.scope_id(), result))
        .collect()
}
