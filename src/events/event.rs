use chrono::{DateTime, Utc};

use crate::membership::ScopeKind;

/// Membership events emitted by the actions.
///
/// Events are always fired from actions. If no listeners are registered,
/// they are silently ignored (no-op). Register listeners via
/// [`register_event_listeners`](crate::register_event_listeners) to handle events.
#[derive(Debug, Clone)]
pub enum MembershipEvent {
    // removal
    MemberRemoved {
        scope: ScopeKind,
        scope_id: i64,
        member_id: i64,
        removed_by: i64,
        at: DateTime<Utc>,
    },
    MemberLeft {
        scope: ScopeKind,
        scope_id: i64,
        member_id: i64,
        at: DateTime<Utc>,
    },
    ScopeDeleted {
        scope: ScopeKind,
        scope_id: i64,
        at: DateTime<Utc>,
    },

    // ownership
    OwnershipTransferred {
        scope: ScopeKind,
        scope_id: i64,
        from_member_id: i64,
        to_member_id: i64,
        at: DateTime<Utc>,
    },
    NestedTransferFailed {
        scope: ScopeKind,
        scope_id: i64,
        reason: String,
        at: DateTime<Utc>,
    },
    RoleChanged {
        scope: ScopeKind,
        scope_id: i64,
        member_id: i64,
        role: &'static str,
        at: DateTime<Utc>,
    },

    // teams on projects
    TeamUnassigned {
        project_id: i64,
        team_id: i64,
        members_removed: u64,
        at: DateTime<Utc>,
    },

    // account
    AccountDeleted {
        user_id: i64,
        at: DateTime<Utc>,
    },
}

impl MembershipEvent {
    /// Returns a dot-separated event name for logging/tracing.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MemberRemoved { .. } => "member.removed",
            Self::MemberLeft { .. } => "member.left",
            Self::ScopeDeleted { .. } => "scope.deleted",
            Self::OwnershipTransferred { .. } => "ownership.transferred",
            Self::NestedTransferFailed { .. } => "ownership.nested_transfer_failed",
            Self::RoleChanged { .. } => "member.role_changed",
            Self::TeamUnassigned { .. } => "team.unassigned",
            Self::AccountDeleted { .. } => "account.deleted",
        }
    }

    /// The kind of scope the event is about. Team unassignment changes a
    /// project's roster, so it counts as a project event.
    pub fn scope(&self) -> Option<ScopeKind> {
        match self {
            Self::MemberRemoved { scope, .. }
            | Self::MemberLeft { scope, .. }
            | Self::ScopeDeleted { scope, .. }
            | Self::OwnershipTransferred { scope, .. }
            | Self::NestedTransferFailed { scope, .. }
            | Self::RoleChanged { scope, .. } => Some(*scope),
            Self::TeamUnassigned { .. } => Some(ScopeKind::Project),
            Self::AccountDeleted { .. } => None,
        }
    }

    /// Returns the timestamp when this event occurred.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::MemberRemoved { at, .. }
            | Self::MemberLeft { at, .. }
            | Self::ScopeDeleted { at, .. }
            | Self::OwnershipTransferred { at, .. }
            | Self::NestedTransferFailed { at, .. }
            | Self::RoleChanged { at, .. }
            | Self::TeamUnassigned { at, .. }
            | Self::AccountDeleted { at, .. } => *at,
        }
    }
}
