//! Membership actions.
//!
//! Each action owns the repositories it needs and exposes one async
//! `execute` method. Validation and permission checks run before storage is
//! touched.

mod change_role;
mod delete_account;
mod delete_team;
mod delete_team_member;
mod detach;
mod removal;
mod remove_project_member;
mod remove_workspace_member;
mod support;
mod transfer_ownership;
mod unassign_project;

pub use change_role::ChangeMemberRoleAction;
pub use delete_account::DeleteAccountAction;
pub use delete_team::{DeleteTeamAction, DeleteTeamOutput};
pub use delete_team_member::{DeleteTeamMemberAction, DeleteTeamMemberOutput};
pub use removal::{RemovalPlan, RemoveMemberInput, plan_removal};
pub use remove_project_member::RemoveProjectMemberAction;
pub use remove_workspace_member::{
    FailedTransfer, RemoveWorkspaceMemberAction, RemoveWorkspaceMemberOutput,
};
pub use transfer_ownership::{
    TransferOwnershipAction, TransferProjectOwnershipAction, TransferTeamOwnershipAction,
    TransferWorkspaceOwnershipAction,
};
pub use unassign_project::{UnassignProjectAction, UnassignProjectOutput};
