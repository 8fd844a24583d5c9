use super::{Membership, Role};

/// Picks who inherits ownership when `exclude_id` goes away.
///
/// The first admin wins, otherwise the first member. Roles without a
/// successor rank (owner, viewer) are skipped. Returns `None` when nobody is
/// eligible, in which case the caller must refuse the operation.
pub fn select_successor<M: Membership>(peers: &[M], exclude_id: i64) -> Option<&M> {
    peers
        .iter()
        .filter(|peer| peer.id() != exclude_id)
        .filter_map(|peer| peer.role().successor_rank().map(|rank| (rank, peer)))
        .min_by_key(|(rank, _)| *rank)
        .map(|(_, peer)| peer)
}
