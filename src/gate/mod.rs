//! The two-phase private beta workflow.
//!
//! [`on_execute`] runs on every login and either lets the user through or sends
//! them to the invitation form. [`on_continue`] runs once the form is submitted,
//! marks the user as verified and retires the code from the registry.
//!
//! Nothing is held between the two phases; the host may keep the user on the
//! form for as long as it likes.

pub mod control;
pub mod decision;
pub mod error;
pub mod event;
pub mod policy;
pub mod secrets;
pub mod verification;

pub use control::{Command, CommandLog, ControlApi, Outcome};
pub use decision::on_execute;
pub use error::Error;
pub use event::{LoginEvent, PRIVATE_BETA_FLAG};
pub use policy::CodePolicy;
pub use secrets::{GateConfig, REQUIRED_SECRETS, Secrets};
pub use verification::{Verification, on_continue};

use crate::registry::RetryPolicy;

/// Deployment-wide knobs shared by both phases.
#[derive(Debug, Clone, Default)]
pub struct GateOptions {
    /// Only gate logins to the application with this name.
    pub scoped_client: Option<String>,
    pub code_policy: CodePolicy,
    pub retry: RetryPolicy,
}
