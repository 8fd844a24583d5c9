//! Helpers shared by the membership actions.

use futures::future::try_join_all;

use crate::MembershipError;
use crate::membership::{Membership, Role, select_successor};
use crate::repository::{ScopeRecord, ScopeRepository};

/// Promotes a zero-row write to a not-found error.
pub(crate) fn ensure_affected(rows: u64, what: &str) -> Result<u64, MembershipError> {
    if rows == 0 {
        return Err(MembershipError::NotFound(format!(
            "{what} not found, no rows affected"
        )));
    }
    Ok(rows)
}

pub(crate) fn ensure_provided(id: i64, what: &str) -> Result<(), MembershipError> {
    if id <= 0 {
        return Err(MembershipError::Validation(format!("{what} not provided")));
    }
    Ok(())
}

/// Comma separated names of the given scopes, `#id` for ones that vanished.
pub(crate) async fn scope_names<S: ScopeRepository>(
    repo: &S,
    ids: &[i64],
) -> Result<String, MembershipError> {
    let scopes = try_join_all(ids.iter().map(|id| repo.find_by_id(*id))).await?;

    Ok(ids
        .iter()
        .zip(scopes)
        .map(|(id, scope)| scope.map_or_else(|| format!("#{id}"), |s| s.name().to_owned()))
        .collect::<Vec<_>>()
        .join(", "))
}

/// How one identity's memberships in a set of nested scopes unwind.
#[derive(Debug)]
pub(crate) struct NestedPlan<M> {
    /// Scopes where the identity is the only member.
    pub sole: Vec<i64>,
    /// Scopes the identity owns where no peer may inherit.
    pub blocked: Vec<i64>,
    /// `(current owner, successor)` pairs.
    pub transfers: Vec<(M, M)>,
    /// Membership rows to delete once ownership has moved.
    pub rows: Vec<i64>,
}

/// Classifies `memberships` against the full member list of each scope.
///
/// `rosters[i]` must hold the members of `memberships[i]`'s scope.
pub(crate) fn classify_nested<M: Membership>(memberships: &[M], rosters: &[Vec<M>]) -> NestedPlan<M> {
    let mut plan = NestedPlan {
        sole: Vec::new(),
        blocked: Vec::new(),
        transfers: Vec::new(),
        rows: Vec::new(),
    };

    for (membership, roster) in memberships.iter().zip(rosters) {
        if roster.iter().all(|peer| peer.id() == membership.id()) {
            plan.sole.push(membership.scope_id());
            continue;
        }

        if membership.role().is_owner() {
            match select_successor(roster, membership.id()) {
                Some(successor) => plan.transfers.push((membership.clone(), successor.clone())),
                None => {
                    plan.blocked.push(membership.scope_id());
                    continue;
                }
            }
        }

        plan.rows.push(membership.id());
    }

    plan
}
