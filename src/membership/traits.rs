//! Traits for roles and scope memberships.
//!
//! Every scope (workspace, project, team) has its own role enum and its own
//! member record. The actions are written once against these traits.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of scope a membership belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Workspace,
    Project,
    Team,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Workspace => "workspace",
            Self::Project => "project",
            Self::Team => "team",
        }
    }

    /// Capitalized form for the start of a message.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Workspace => "Workspace",
            Self::Project => "Project",
            Self::Team => "Team",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role that can be held inside one scope.
///
/// # Example
///
/// ```rust
/// use trellis::{ProjectRole, Role};
///
/// assert!(ProjectRole::owner().is_owner());
/// assert_eq!(ProjectRole::from_str("viewer"), Some(ProjectRole::Viewer));
/// assert_eq!(ProjectRole::Viewer.successor_rank(), None);
/// ```
pub trait Role: Copy + PartialEq + Eq + fmt::Debug + Send + Sync + 'static {
    /// Convert to string for storage.
    fn as_str(&self) -> &'static str;

    /// Parse from a stored string.
    fn from_str(s: &str) -> Option<Self>;

    /// The single role that owns the scope.
    fn owner() -> Self;

    /// The role an outgoing owner is demoted to by default.
    fn admin() -> Self;

    /// Preference when picking a successor, lower wins.
    ///
    /// `None` means the role can never inherit ownership.
    fn successor_rank(&self) -> Option<u8>;

    fn is_owner(&self) -> bool {
        *self == Self::owner()
    }

    fn is_admin(&self) -> bool {
        *self == Self::admin()
    }

    /// Owners and admins may remove other members and change their roles.
    fn can_manage_members(&self) -> bool {
        self.is_owner() || self.is_admin()
    }
}

/// A member record of a single scope.
pub trait Membership: Clone + fmt::Debug + Send + Sync + 'static {
    type Role: Role;

    /// Which scope this membership lives in.
    const SCOPE: ScopeKind;

    fn id(&self) -> i64;

    /// The workspace, project or team id.
    fn scope_id(&self) -> i64;

    /// User id for workspace members, workspace-member id for the nested scopes.
    fn identity_id(&self) -> i64;

    fn role(&self) -> Self::Role;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_kind_strings() {
        assert_eq!(ScopeKind::Workspace.as_str(), "workspace");
        assert_eq!(ScopeKind::Team.title(), "Team");
        assert_eq!(ScopeKind::Project.to_string(), "project");
    }

    #[test]
    fn test_scope_kind_serializes_lowercase() {
        let json = serde_json::to_string(&ScopeKind::Project).unwrap();
        assert_eq!(json, "\"project\"");
    }
}
