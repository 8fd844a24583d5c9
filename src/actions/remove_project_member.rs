use super::removal::{RemoveMemberInput, execute_plan, plan_removal};
use crate::MembershipError;
use crate::repository::{ProjectMember, ProjectMemberRepository, ProjectRepository};

/// Action to remove a member from a project, or to leave it.
///
/// This action:
/// 1. Checks the requester may remove the target
/// 2. Deletes the project when its last member (the owner) leaves
/// 3. Hands ownership to the first admin, else the first member, when the
///    owner leaves a shared project
/// 4. Deletes the membership
///
/// Viewers never inherit a project.
pub struct RemoveProjectMemberAction<P, M>
where
    P: ProjectRepository,
    M: ProjectMemberRepository,
{
    project_repo: P,
    member_repo: M,
}

impl<P, M> RemoveProjectMemberAction<P, M>
where
    P: ProjectRepository,
    M: ProjectMemberRepository,
{
    pub fn new(project_repo: P, member_repo: M) -> Self {
        Self {
            project_repo,
            member_repo,
        }
    }

    /// Removes `input.target` from its project.
    ///
    /// # Returns
    ///
    /// - `Ok(rows)` - Rows deleted (membership, or the project itself)
    /// - `Err(MembershipError::Validation)` - Malformed input
    /// - `Err(MembershipError::Forbidden)` - Not allowed, or no one can take over
    /// - `Err(MembershipError::NotFound)` - The row was already gone
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "remove_project_member", skip_all, err)
    )]
    pub async fn execute(
        &self,
        input: RemoveMemberInput<ProjectMember>,
    ) -> Result<u64, MembershipError> {
        let plan = plan_removal(&input)?;
        let outcome = execute_plan(&self.project_repo, &self.member_repo, &input, plan).await?;

        Ok(outcome.removed)
    }
}
