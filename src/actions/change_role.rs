use chrono::Utc;

use crate::MembershipError;
use crate::events::{MembershipEvent, dispatch};
use crate::membership::{Membership, Role};
use crate::repository::MemberRepository;

/// Action to change a member's role within a scope.
///
/// The owner role never moves through here; use a
/// [`TransferOwnershipAction`](super::TransferOwnershipAction).
pub struct ChangeMemberRoleAction<R: MemberRepository> {
    member_repo: R,
}

impl<R: MemberRepository> ChangeMemberRoleAction<R> {
    pub fn new(member_repo: R) -> Self {
        Self { member_repo }
    }

    /// Gives `target` the role `role` on behalf of `requester`.
    ///
    /// # Returns
    ///
    /// - `Ok(member)` - The updated membership
    /// - `Err(MembershipError::Validation)` - Missing ids
    /// - `Err(MembershipError::Forbidden)` - Requester may not change this member
    /// - `Err(MembershipError::Conflict)` - Owner role requested, or role unchanged
    /// - `Err(MembershipError::NotFound)` - Membership no longer exists
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "change_member_role", skip_all, err)
    )]
    pub async fn execute(
        &self,
        requester: &R::Member,
        target: &R::Member,
        role: <R::Member as Membership>::Role,
    ) -> Result<R::Member, MembershipError> {
        let scope = <R::Member as Membership>::SCOPE;

        if requester.id() <= 0 || target.id() <= 0 {
            return Err(MembershipError::Validation(
                "Member ids not provided".to_owned(),
            ));
        }
        if requester.scope_id() != target.scope_id() {
            return Err(MembershipError::Forbidden(format!(
                "The member does not belong to this {scope}"
            )));
        }
        if role.is_owner() {
            return Err(MembershipError::Conflict(
                "The owner role can only be given through an ownership transfer".to_owned(),
            ));
        }
        if target.role().is_owner() {
            return Err(MembershipError::Forbidden(
                "The role of the owner cannot be changed".to_owned(),
            ));
        }
        if !requester.role().can_manage_members() {
            return Err(MembershipError::Forbidden(
                "Only the owner or an admin can change roles".to_owned(),
            ));
        }
        if requester.role().is_admin() && target.role().is_admin() && requester.id() != target.id()
        {
            return Err(MembershipError::Forbidden(
                "An admin cannot change the role of another admin".to_owned(),
            ));
        }
        if target.role() == role {
            return Err(MembershipError::Conflict(format!(
                "The member already has the {} role",
                role.as_str()
            )));
        }

        let updated = self
            .member_repo
            .update_role(target.id(), role)
            .await?
            .ok_or_else(|| MembershipError::NotFound(format!("{} member not found", scope.title())))?;

        log::info!(
            target: "trellis",
            "msg=\"member role changed\", scope=\"{scope}\", scope_id={}, member_id={}, role=\"{}\"",
            target.scope_id(),
            target.id(),
            role.as_str()
        );
        dispatch(MembershipEvent::RoleChanged {
            scope,
            scope_id: target.scope_id(),
            member_id: target.id(),
            role: role.as_str(),
            at: Utc::now(),
        })
        .await;

        Ok(updated)
    }
}
