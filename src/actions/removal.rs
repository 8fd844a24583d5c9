//! The removal state machine shared by the workspace, project and team
//! orchestrators.

use chrono::Utc;

use super::support::{ensure_affected, ensure_provided};
use super::transfer_ownership::transfer;
use crate::MembershipError;
use crate::events::{MembershipEvent, dispatch};
use crate::membership::{Membership, Role, ScopeKind, select_successor};
use crate::repository::{MemberRepository, ScopeRepository};

/// A request to remove `target` from the scope, issued by `requester`.
///
/// `peers` is the full member list of the scope, both parties included.
#[derive(Debug, Clone)]
pub struct RemoveMemberInput<M> {
    pub requester: M,
    pub target: M,
    pub peers: Vec<M>,
}

/// What a removal request turns into.
#[derive(Debug, Clone, PartialEq)]
pub enum RemovalPlan<M> {
    /// Delete someone else's membership.
    RemoveOther,
    /// A non-owner leaves.
    Leave,
    /// The owner leaves and nobody else is left: the scope goes away.
    DeleteScope,
    /// The owner leaves after handing the scope to `successor`.
    TransferAndLeave { successor: M },
}

/// Validates a removal request and decides how it is carried out.
///
/// Pure: nothing is read from or written to storage, so an invalid request
/// never causes a mutation and always fails the same way.
pub fn plan_removal<M: Membership>(
    input: &RemoveMemberInput<M>,
) -> Result<RemovalPlan<M>, MembershipError> {
    let scope = M::SCOPE;
    let RemoveMemberInput {
        requester,
        target,
        peers,
    } = input;

    if peers.is_empty() {
        return Err(MembershipError::Validation(format!(
            "The {scope} members were not provided"
        )));
    }
    ensure_provided(requester.id(), "Requesting member")?;
    ensure_provided(target.id(), "Member to remove")?;
    if peers
        .iter()
        .any(|peer| peer.scope_id() != requester.scope_id())
    {
        return Err(MembershipError::Validation(format!(
            "The {scope} members must all belong to the same {scope}"
        )));
    }

    if target.scope_id() != requester.scope_id() {
        return Err(MembershipError::Forbidden(format!(
            "The member does not belong to this {scope}"
        )));
    }
    let listed = |member: &M| peers.iter().any(|peer| peer.id() == member.id());
    if !listed(requester) || !listed(target) {
        return Err(MembershipError::Validation(format!(
            "The {scope} members must include both the requester and the member to remove"
        )));
    }
    if requester.role().is_admin() && target.role().is_owner() {
        return Err(MembershipError::Forbidden(
            "You cannot remove the owner".to_owned(),
        ));
    }
    if !requester.role().can_manage_members() && requester.id() != target.id() {
        return Err(MembershipError::Forbidden(format!(
            "You can only remove yourself from the {scope}"
        )));
    }

    if requester.id() != target.id() {
        return Ok(RemovalPlan::RemoveOther);
    }
    if !target.role().is_owner() {
        return Ok(RemovalPlan::Leave);
    }
    if peers.iter().all(|peer| peer.id() == target.id()) {
        return Ok(RemovalPlan::DeleteScope);
    }

    select_successor(peers, target.id())
        .map(|successor| RemovalPlan::TransferAndLeave {
            successor: successor.clone(),
        })
        .ok_or_else(|| {
            MembershipError::Forbidden(format!(
                "There is no eligible member to take over ownership of the {scope}"
            ))
        })
}

/// Result of carrying out a [`RemovalPlan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RemovalOutcome {
    pub removed: u64,
    pub scope_deleted: bool,
}

/// Carries out `plan` against the scope and membership storage.
pub(crate) async fn execute_plan<S, R>(
    scope_repo: &S,
    member_repo: &R,
    input: &RemoveMemberInput<R::Member>,
    plan: RemovalPlan<R::Member>,
) -> Result<RemovalOutcome, MembershipError>
where
    S: ScopeRepository,
    R: MemberRepository,
{
    let scope = <R::Member as Membership>::SCOPE;
    let target = &input.target;
    let scope_id = target.scope_id();
    let member_label = format!("{} member", scope.title());

    match plan {
        RemovalPlan::RemoveOther => {
            let removed = ensure_affected(member_repo.delete(target.id()).await?, &member_label)?;

            log::info!(
                target: "trellis",
                "msg=\"member removed\", scope=\"{scope}\", scope_id={scope_id}, member_id={}, removed_by={}",
                target.id(),
                input.requester.id()
            );
            dispatch(MembershipEvent::MemberRemoved {
                scope,
                scope_id,
                member_id: target.id(),
                removed_by: input.requester.id(),
                at: Utc::now(),
            })
            .await;

            Ok(RemovalOutcome {
                removed,
                scope_deleted: false,
            })
        }
        RemovalPlan::Leave => {
            let removed = ensure_affected(member_repo.delete(target.id()).await?, &member_label)?;
            member_left(scope, scope_id, target.id()).await;

            Ok(RemovalOutcome {
                removed,
                scope_deleted: false,
            })
        }
        RemovalPlan::DeleteScope => {
            // the membership row goes with the scope
            let removed = ensure_affected(scope_repo.delete(scope_id).await?, scope.title())?;

            log::info!(
                target: "trellis",
                "msg=\"last member left, scope deleted\", scope=\"{scope}\", scope_id={scope_id}, member_id={}",
                target.id()
            );
            dispatch(MembershipEvent::ScopeDeleted {
                scope,
                scope_id,
                at: Utc::now(),
            })
            .await;

            Ok(RemovalOutcome {
                removed,
                scope_deleted: true,
            })
        }
        RemovalPlan::TransferAndLeave { successor } => {
            let demoted = <<R::Member as Membership>::Role as Role>::admin();
            transfer(member_repo, scope_id, target, &successor, demoted).await?;

            let removed = ensure_affected(member_repo.delete(target.id()).await?, &member_label)?;
            member_left(scope, scope_id, target.id()).await;

            Ok(RemovalOutcome {
                removed,
                scope_deleted: false,
            })
        }
    }
}

async fn member_left(scope: ScopeKind, scope_id: i64, member_id: i64) {
    log::info!(
        target: "trellis",
        "msg=\"member left\", scope=\"{scope}\", scope_id={scope_id}, member_id={member_id}"
    );
    dispatch(MembershipEvent::MemberLeft {
        scope,
        scope_id,
        member_id,
        at: Utc::now(),
    })
    .await;
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::membership::TeamRole;
    use crate::repository::TeamMember;

    fn member(id: i64, role: TeamRole) -> TeamMember {
        TeamMember {
            id,
            team_id: 5,
            workspace_member_id: id + 100,
            role,
            added_at: Utc::now(),
        }
    }

    fn input(
        requester: &TeamMember,
        target: &TeamMember,
        peers: &[TeamMember],
    ) -> RemoveMemberInput<TeamMember> {
        RemoveMemberInput {
            requester: requester.clone(),
            target: target.clone(),
            peers: peers.to_vec(),
        }
    }

    #[test]
    fn test_plan_branches() {
        let owner = member(1, TeamRole::Owner);
        let admin = member(2, TeamRole::Admin);
        let plain = member(3, TeamRole::Member);
        let everyone = [owner.clone(), admin.clone(), plain.clone()];

        assert_eq!(
            plan_removal(&input(&owner, &plain, &everyone)),
            Ok(RemovalPlan::RemoveOther)
        );
        assert_eq!(
            plan_removal(&input(&plain, &plain, &everyone)),
            Ok(RemovalPlan::Leave)
        );
        assert_eq!(
            plan_removal(&input(&owner, &owner, &[owner.clone()])),
            Ok(RemovalPlan::DeleteScope)
        );
        assert_eq!(
            plan_removal(&input(&owner, &owner, &everyone)),
            Ok(RemovalPlan::TransferAndLeave { successor: admin })
        );
    }

    #[test]
    fn test_plan_rejections() {
        let owner = member(1, TeamRole::Owner);
        let admin = member(2, TeamRole::Admin);
        let plain = member(3, TeamRole::Member);
        let other = member(4, TeamRole::Member);
        let everyone = [owner.clone(), admin.clone(), plain.clone(), other.clone()];

        assert_eq!(
            plan_removal(&input(&admin, &owner, &everyone)),
            Err(MembershipError::Forbidden("You cannot remove the owner".into()))
        );
        assert_eq!(
            plan_removal(&input(&plain, &other, &everyone)),
            Err(MembershipError::Forbidden(
                "You can only remove yourself from the team".into()
            ))
        );
        assert_eq!(
            plan_removal(&input(&owner, &plain, &[])),
            Err(MembershipError::Validation("The team members were not provided".into()))
        );

        let stranger = TeamMember {
            team_id: 6,
            ..member(9, TeamRole::Member)
        };
        assert_eq!(
            plan_removal(&input(&owner, &stranger, &everyone)),
            Err(MembershipError::Forbidden(
                "The member does not belong to this team".into()
            ))
        );
        assert!(matches!(
            plan_removal(&input(&owner, &plain, &[owner.clone(), stranger])),
            Err(MembershipError::Validation(_))
        ));
    }

    #[test]
    fn test_parties_missing_from_members_are_rejected() {
        let owner = member(1, TeamRole::Owner);
        let admin = member(2, TeamRole::Admin);
        let plain = member(3, TeamRole::Member);
        let expected = Err(MembershipError::Validation(
            "The team members must include both the requester and the member to remove".into(),
        ));

        // an owner left out of the list must not read as the last member
        assert_eq!(plan_removal(&input(&owner, &owner, &[admin.clone()])), expected);
        assert_eq!(
            plan_removal(&input(&owner, &plain, &[owner.clone(), admin.clone()])),
            expected
        );
        assert_eq!(
            plan_removal(&input(&plain, &plain, &[owner.clone(), admin])),
            expected
        );
    }

    #[test]
    fn test_admin_may_remove_admin_and_leave() {
        let admin = member(2, TeamRole::Admin);
        let other_admin = member(3, TeamRole::Admin);
        let peers = [member(1, TeamRole::Owner), admin.clone(), other_admin.clone()];

        assert_eq!(
            plan_removal(&input(&admin, &other_admin, &peers)),
            Ok(RemovalPlan::RemoveOther)
        );
        assert_eq!(
            plan_removal(&input(&admin, &admin, &peers)),
            Ok(RemovalPlan::Leave)
        );
    }
}
