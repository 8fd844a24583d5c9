use serde::{Deserialize, Serialize};

use super::Role;

/// Roles inside a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceRole {
    Owner,
    Admin,
    Member,
}

impl Role for WorkspaceRole {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(Self::Owner),
            "admin" => Some(Self::Admin),
            "member" => Some(Self::Member),
            _ => None,
        }
    }

    fn owner() -> Self {
        Self::Owner
    }

    fn admin() -> Self {
        Self::Admin
    }

    fn successor_rank(&self) -> Option<u8> {
        match self {
            Self::Owner => None,
            Self::Admin => Some(0),
            Self::Member => Some(1),
        }
    }
}

/// Roles inside a project. Viewers can read but never inherit ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    Owner,
    Admin,
    Member,
    Viewer,
}

impl Role for ProjectRole {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Viewer => "viewer",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(Self::Owner),
            "admin" => Some(Self::Admin),
            "member" => Some(Self::Member),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }

    fn owner() -> Self {
        Self::Owner
    }

    fn admin() -> Self {
        Self::Admin
    }

    fn successor_rank(&self) -> Option<u8> {
        match self {
            Self::Owner | Self::Viewer => None,
            Self::Admin => Some(0),
            Self::Member => Some(1),
        }
    }
}

/// Roles inside a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    Owner,
    Admin,
    Member,
}

impl Role for TeamRole {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(Self::Owner),
            "admin" => Some(Self::Admin),
            "member" => Some(Self::Member),
            _ => None,
        }
    }

    fn owner() -> Self {
        Self::Owner
    }

    fn admin() -> Self {
        Self::Admin
    }

    fn successor_rank(&self) -> Option<u8> {
        match self {
            Self::Owner => None,
            Self::Admin => Some(0),
            Self::Member => Some(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip() {
        for role in [
            ProjectRole::Owner,
            ProjectRole::Admin,
            ProjectRole::Member,
            ProjectRole::Viewer,
        ] {
            assert_eq!(ProjectRole::from_str(role.as_str()), Some(role));
        }
        assert_eq!(WorkspaceRole::from_str("viewer"), None);
        assert_eq!(TeamRole::from_str("OWNER"), None);
    }

    #[test]
    fn test_manage_rights() {
        assert!(TeamRole::Owner.can_manage_members());
        assert!(TeamRole::Admin.can_manage_members());
        assert!(!TeamRole::Member.can_manage_members());
        assert!(!ProjectRole::Viewer.can_manage_members());
    }

    #[test]
    fn test_viewer_never_inherits() {
        assert_eq!(ProjectRole::Viewer.successor_rank(), None);
        assert_eq!(ProjectRole::Owner.successor_rank(), None);
        assert!(ProjectRole::Admin.successor_rank() < ProjectRole::Member.successor_rank());
    }

    #[test]
    fn test_serde_matches_as_str() {
        let json = serde_json::to_string(&WorkspaceRole::Admin).unwrap();
        assert_eq!(json, format!("\"{}\"", WorkspaceRole::Admin.as_str()));
    }
}
