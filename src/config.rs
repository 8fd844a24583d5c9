//! Configuration for the membership actions.
//!
//! # Example
//!
//! ```rust
//! use trellis::config::{MembershipConfig, NestedTransferPolicy};
//!
//! // Use defaults: nested transfer failures are logged and reported
//! let config = MembershipConfig::default();
//! assert_eq!(config.nested_transfer_failure, NestedTransferPolicy::LogAndContinue);
//!
//! // Or refuse to remove a workspace member when any nested transfer fails
//! let config = MembershipConfig::strict();
//! assert_eq!(config.nested_transfer_failure, NestedTransferPolicy::Abort);
//! ```

/// What to do when handing over a nested project or team fails while a
/// workspace member is being removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestedTransferPolicy {
    /// Log the failure, report it in the result and keep removing.
    LogAndContinue,
    /// Stop at the first failure and return it.
    Abort,
}

/// Main configuration struct for the membership actions.
#[derive(Debug, Clone)]
pub struct MembershipConfig {
    /// Handling of failed nested ownership transfers during workspace
    /// member removal.
    ///
    /// Default: [`NestedTransferPolicy::LogAndContinue`]
    pub nested_transfer_failure: NestedTransferPolicy,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            nested_transfer_failure: NestedTransferPolicy::LogAndContinue,
        }
    }
}

impl MembershipConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration where every nested failure is fatal.
    pub fn strict() -> Self {
        Self {
            nested_transfer_failure: NestedTransferPolicy::Abort,
        }
    }

    pub fn aborts_on_nested_failure(&self) -> bool {
        self.nested_transfer_failure == NestedTransferPolicy::Abort
    }
}
