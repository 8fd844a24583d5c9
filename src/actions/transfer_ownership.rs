use chrono::Utc;

use super::support::ensure_provided;
use crate::MembershipError;
use crate::events::{MembershipEvent, dispatch};
use crate::membership::{Membership, Role};
use crate::repository::MemberRepository;

/// Action to hand the owner role of a scope to another member.
///
/// The outgoing owner is demoted to admin unless configured otherwise with
/// [`TransferOwnershipAction::with_demoted_role`]. The repository applies
/// both role changes in one conditional update.
pub struct TransferOwnershipAction<R: MemberRepository> {
    member_repo: R,
    demoted_role: <R::Member as Membership>::Role,
}

/// Transfers workspace ownership. Use with a [`WorkspaceMemberRepository`](crate::WorkspaceMemberRepository).
pub type TransferWorkspaceOwnershipAction<R> = TransferOwnershipAction<R>;
/// Transfers project ownership. Use with a [`ProjectMemberRepository`](crate::ProjectMemberRepository).
pub type TransferProjectOwnershipAction<R> = TransferOwnershipAction<R>;
/// Transfers team ownership. Use with a [`TeamMemberRepository`](crate::TeamMemberRepository).
pub type TransferTeamOwnershipAction<R> = TransferOwnershipAction<R>;

impl<R: MemberRepository> TransferOwnershipAction<R> {
    pub fn new(member_repo: R) -> Self {
        Self {
            member_repo,
            demoted_role: <<R::Member as Membership>::Role as Role>::admin(),
        }
    }

    /// Sets the role the outgoing owner ends up with.
    #[must_use]
    pub fn with_demoted_role(mut self, role: <R::Member as Membership>::Role) -> Self {
        self.demoted_role = role;
        self
    }

    /// Makes `new_owner` the owner of `scope_id` in place of `current_owner`.
    ///
    /// # Returns
    ///
    /// - `Ok(rows)` - Number of membership rows updated
    /// - `Err(MembershipError::Validation)` - Missing ids, a member outside the scope,
    ///   or an owner demoted role
    /// - `Err(MembershipError::Conflict)` - Current member is not the owner, self-transfer,
    ///   or the new owner already owns the scope
    /// - `Err(MembershipError::Internal)` - Storage changed nothing
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "transfer_ownership", skip_all, err)
    )]
    pub async fn execute(
        &self,
        scope_id: i64,
        current_owner: &R::Member,
        new_owner: &R::Member,
    ) -> Result<u64, MembershipError> {
        transfer(
            &self.member_repo,
            scope_id,
            current_owner,
            new_owner,
            self.demoted_role,
        )
        .await
    }
}

/// Checks a transfer request. The first failing rule wins.
pub(crate) fn validate_transfer<M: Membership>(
    scope_id: i64,
    current_owner: &M,
    new_owner: &M,
    demoted_role: M::Role,
) -> Result<(), MembershipError> {
    let scope = M::SCOPE;

    ensure_provided(scope_id, &format!("{} id", scope.title()))?;
    if current_owner.id() <= 0 || new_owner.id() <= 0 {
        return Err(MembershipError::Validation(
            "Member ids not provided".to_owned(),
        ));
    }
    if !current_owner.role().is_owner() {
        return Err(MembershipError::Conflict(format!(
            "The current member is not the owner of the {scope}"
        )));
    }
    if current_owner.scope_id() != scope_id {
        return Err(MembershipError::Validation(format!(
            "The current owner does not belong to the {scope}"
        )));
    }
    if new_owner.scope_id() != current_owner.scope_id() {
        return Err(MembershipError::Validation(format!(
            "The new owner does not belong to the {scope}"
        )));
    }
    if current_owner.id() == new_owner.id() {
        return Err(MembershipError::Conflict(
            "You cannot transfer ownership to yourself".to_owned(),
        ));
    }
    if new_owner.role().is_owner() {
        return Err(MembershipError::Conflict(
            "The new owner already has the owner role".to_owned(),
        ));
    }
    if demoted_role.is_owner() {
        return Err(MembershipError::Validation(format!(
            "The outgoing owner cannot keep the owner role of the {scope}"
        )));
    }

    Ok(())
}

/// Validates and applies an ownership transfer through `repo`.
pub(crate) async fn transfer<R: MemberRepository>(
    repo: &R,
    scope_id: i64,
    current_owner: &R::Member,
    new_owner: &R::Member,
    demoted_role: <R::Member as Membership>::Role,
) -> Result<u64, MembershipError> {
    validate_transfer(scope_id, current_owner, new_owner, demoted_role)?;

    let scope = <R::Member as Membership>::SCOPE;
    let rows = repo
        .transfer_ownership(scope_id, current_owner.id(), new_owner.id(), demoted_role)
        .await?;

    if rows == 0 {
        return Err(MembershipError::Internal(
            "Something went wrong, ownership was not transferred".to_owned(),
        ));
    }

    log::info!(
        target: "trellis",
        "msg=\"ownership transferred\", scope=\"{scope}\", scope_id={scope_id}, from_member_id={}, to_member_id={}",
        current_owner.id(),
        new_owner.id()
    );

    dispatch(MembershipEvent::OwnershipTransferred {
        scope,
        scope_id,
        from_member_id: current_owner.id(),
        to_member_id: new_owner.id(),
        at: Utc::now(),
    })
    .await;

    Ok(rows)
}
