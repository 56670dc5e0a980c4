use crate::registry::InvitationRecord;
use serde::{Deserialize, Serialize};

/// How a submitted invitation code is judged before the user is marked verified.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CodePolicy {
    /// Any non-empty code is accepted; the form is trusted to have checked it.
    #[default]
    PresenceOnly,
    /// The code must still be in the registry.
    RegisteredOnly,
}

impl CodePolicy {
    /// Whether the registry has to be read before the flag can be set.
    #[must_use]
    pub const fn requires_registry(self) -> bool {
        matches!(self, Self::RegisteredOnly)
    }

    /// `record` is only consulted by [`CodePolicy::RegisteredOnly`].
    #[must_use]
    pub fn accepts(self, code: &str, record: Option<&InvitationRecord>) -> bool {
        match self {
            Self::PresenceOnly => !code.is_empty(),
            Self::RegisteredOnly => !code.is_empty() && record.is_some_and(|r| r.contains(code)),
        }
    }
}
