use crate::registry::RegistryError;
use thiserror::Error;

/// Reasons a login attempt is stopped or degraded.
///
/// `MissingSecret`, `MissingInvitationCode`, `UnknownInvitationCode` and
/// `RegistryUnavailable` are terminal and surface to the user through
/// [`ControlApi::deny`](super::ControlApi::deny). `Registry` is only ever
/// logged once the user has been marked as verified.
#[derive(Debug, Error)]
pub enum Error {
    #[error("The {0} secret variable is not defined!")]
    MissingSecret(&'static str),
    #[error("The INVITATION_CODE wasn't returned from the form!")]
    MissingInvitationCode,
    #[error("The invitation code is not valid!")]
    UnknownInvitationCode,
    #[error("The invitation registry is unavailable!")]
    RegistryUnavailable(#[source] RegistryError),
    #[error("invitation registry failure: {0}")]
    Registry(#[from] RegistryError),
}

impl Error {
    /// Whether this error ends the login attempt with a denial.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Registry(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_secret_names_the_key() {
        let err = Error::MissingSecret("FORM_ID");
        assert_eq!(err.to_string(), "The FORM_ID secret variable is not defined!");
        assert!(err.is_terminal());
    }

    #[test]
    fn registry_failure_is_not_terminal() {
        let err = Error::from(RegistryError::MalformedRecord("no app_metadata".to_string()));
        assert!(!err.is_terminal());
        assert!(Error::RegistryUnavailable(RegistryError::MalformedRecord(String::new())).is_terminal());
    }
}
