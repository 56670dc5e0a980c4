//! Required secrets and the precondition check that runs before any gating logic.

use super::Error;
use secrecy::SecretString;
use serde_json::{Map, Value};

pub const FORM_ID: &str = "FORM_ID";
pub const DOMAIN: &str = "DOMAIN";
pub const M2M_CLIENT_ID: &str = "M2M_CLIENT_ID";
pub const M2M_CLIENT_SECRET: &str = "M2M_CLIENT_SECRET";
pub const MOCKDATABASE_USER_ID: &str = "MOCKDATABASE_USER_ID";

/// Checked in this order; the first missing key is reported.
pub const REQUIRED_SECRETS: [&str; 5] = [
    FORM_ID,
    DOMAIN,
    M2M_CLIENT_ID,
    M2M_CLIENT_SECRET,
    MOCKDATABASE_USER_ID,
];

/// Secret values supplied by the host with every login event.
pub type Secrets = Map<String, Value>;

/// Configuration extracted from a complete set of secrets.
#[derive(Clone)]
pub struct GateConfig {
    pub form_id: String,
    pub domain: String,
    pub m2m_client_id: String,
    pub m2m_client_secret: SecretString,
    pub registry_record_id: String,
}

impl GateConfig {
    /// # Errors
    /// Returns [`Error::MissingSecret`] naming the first required key that is absent or `null`.
    pub fn from_secrets(secrets: &Secrets) -> Result<Self, Error> {
        if let Some(missing) = first_missing(secrets) {
            return Err(Error::MissingSecret(missing));
        }

        Ok(Self {
            form_id: secret_str(secrets, FORM_ID),
            domain: secret_str(secrets, DOMAIN),
            m2m_client_id: secret_str(secrets, M2M_CLIENT_ID),
            m2m_client_secret: SecretString::from(secret_str(secrets, M2M_CLIENT_SECRET)),
            registry_record_id: secret_str(secrets, MOCKDATABASE_USER_ID),
        })
    }
}

impl std::fmt::Debug for GateConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateConfig")
            .field("form_id", &self.form_id)
            .field("domain", &self.domain)
            .field("m2m_client_id", &self.m2m_client_id)
            .field("m2m_client_secret", &"***")
            .field("registry_record_id", &self.registry_record_id)
            .finish()
    }
}

fn first_missing(secrets: &Secrets) -> Option<&'static str> {
    REQUIRED_SECRETS
        .into_iter()
        .find(|key| secrets.get(*key).map_or(true, Value::is_null))
}

// Secrets are strings, but the host may hand over numbers for ids.
fn secret_str(secrets: &Secrets, key: &str) -> String {
    match secrets.get(key) {
        Some(Value::String(value)) => value.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serde_json::json;

    fn complete() -> Secrets {
        let value = json!({
            "FORM_ID": "ap_form",
            "DOMAIN": "tenant.example.com",
            "M2M_CLIENT_ID": "m2m-id",
            "M2M_CLIENT_SECRET": "m2m-secret",
            "MOCKDATABASE_USER_ID": "auth0|mockdb",
        });
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn complete_secrets_pass() {
        let config = GateConfig::from_secrets(&complete()).unwrap();
        assert_eq!(config.form_id, "ap_form");
        assert_eq!(config.domain, "tenant.example.com");
        assert_eq!(config.m2m_client_id, "m2m-id");
        assert_eq!(config.m2m_client_secret.expose_secret(), "m2m-secret");
        assert_eq!(config.registry_record_id, "auth0|mockdb");
    }

    #[test]
    fn each_missing_key_is_named() {
        for key in REQUIRED_SECRETS {
            let mut secrets = complete();
            secrets.remove(key);
            let err = GateConfig::from_secrets(&secrets).unwrap_err();
            assert!(matches!(err, Error::MissingSecret(name) if name == key));
        }
    }

    #[test]
    fn null_counts_as_missing() {
        let mut secrets = complete();
        secrets.insert(DOMAIN.to_string(), Value::Null);
        let err = GateConfig::from_secrets(&secrets).unwrap_err();
        assert_eq!(err.to_string(), "The DOMAIN secret variable is not defined!");
    }

    #[test]
    fn first_missing_key_wins() {
        let mut secrets = complete();
        secrets.remove(M2M_CLIENT_SECRET);
        secrets.remove(FORM_ID);
        let err = GateConfig::from_secrets(&secrets).unwrap_err();
        assert!(matches!(err, Error::MissingSecret(FORM_ID)));
    }

    #[test]
    fn empty_string_is_present() {
        let mut secrets = complete();
        secrets.insert(FORM_ID.to_string(), json!(""));
        let config = GateConfig::from_secrets(&secrets).unwrap();
        assert_eq!(config.form_id, "");
    }

    #[test]
    fn debug_hides_client_secret() {
        let config = GateConfig::from_secrets(&complete()).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("m2m-secret"));
        assert!(debug.contains("***"));
    }
}
