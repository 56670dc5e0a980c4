use super::secrets::Secrets;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use utoipa::ToSchema;

/// Profile key marking a user who already redeemed an invitation code.
pub const PRIVATE_BETA_FLAG: &str = "isPrivateBetaUser";

/// Form field carrying the submitted invitation code.
pub const INVITATION_CODE_FIELD: &str = "INVITATION_CODE";

/// Snapshot of one authentication attempt as handed over by the host.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Default)]
pub struct LoginEvent {
    pub user: User,
    #[serde(default)]
    pub client: Option<Client>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub secrets: Secrets,
    #[serde(default)]
    pub prompt: Option<Prompt>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Default)]
pub struct User {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub app_metadata: Map<String, Value>,
}

impl User {
    #[must_use]
    pub fn is_private_beta_user(&self) -> bool {
        self.app_metadata.get(PRIVATE_BETA_FLAG).is_some_and(truthy)
    }
}

/// The application the user is signing in to.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Default)]
pub struct Client {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub name: String,
}

/// Values the user submitted through the form, present only on continue.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Default)]
pub struct Prompt {
    #[serde(default)]
    #[schema(value_type = Object)]
    pub fields: Map<String, Value>,
}

impl LoginEvent {
    /// The submitted invitation code, if the form returned a truthy value.
    ///
    /// Non-string values are rendered as text so they can be matched against
    /// the registry (`123456` becomes `"123456"`).
    #[must_use]
    pub fn invitation_code(&self) -> Option<Cow<'_, str>> {
        let field = self
            .prompt
            .as_ref()
            .and_then(|prompt| prompt.fields.get(INVITATION_CODE_FIELD))
            .filter(|field| truthy(field))?;

        Some(match field {
            Value::String(code) => Cow::Borrowed(code.as_str()),
            other => Cow::Owned(other.to_string()),
        })
    }

    #[must_use]
    pub fn client_name(&self) -> Option<&str> {
        self.client.as_ref().map(|client| client.name.as_str())
    }
}

// Profile values are loosely typed; mirror the host's notion of a set flag.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_with(flag: Option<Value>) -> User {
        let mut user = User::default();
        if let Some(flag) = flag {
            user.app_metadata.insert(PRIVATE_BETA_FLAG.to_string(), flag);
        }
        user
    }

    #[test]
    fn flag_truthiness() {
        assert!(!user_with(None).is_private_beta_user());
        assert!(!user_with(Some(Value::Null)).is_private_beta_user());
        assert!(!user_with(Some(json!(false))).is_private_beta_user());
        assert!(!user_with(Some(json!(0))).is_private_beta_user());
        assert!(!user_with(Some(json!(""))).is_private_beta_user());
        assert!(user_with(Some(json!(true))).is_private_beta_user());
        assert!(user_with(Some(json!(1))).is_private_beta_user());
        assert!(user_with(Some(json!("yes"))).is_private_beta_user());
    }

    #[test]
    fn deserialize_host_event() {
        let event: LoginEvent = serde_json::from_value(json!({
            "user": {
                "user_id": "auth0|123",
                "app_metadata": { "isPrivateBetaUser": true }
            },
            "client": { "client_id": "abc", "name": "PRIVATE BETA" },
            "secrets": { "FORM_ID": "ap_form" },
            "prompt": { "fields": { "INVITATION_CODE": "A1" } }
        }))
        .unwrap();

        assert_eq!(event.user.user_id, "auth0|123");
        assert!(event.user.is_private_beta_user());
        assert_eq!(event.client_name(), Some("PRIVATE BETA"));
        assert_eq!(event.invitation_code().as_deref(), Some("A1"));
        assert_eq!(event.secrets.get("FORM_ID"), Some(&json!("ap_form")));
    }

    #[test]
    fn minimal_event_defaults() {
        let event: LoginEvent = serde_json::from_value(json!({ "user": {} })).unwrap();
        assert!(!event.user.is_private_beta_user());
        assert!(event.client.is_none());
        assert!(event.secrets.is_empty());
        assert_eq!(event.invitation_code(), None);
    }

    #[test]
    fn invitation_code_follows_truthiness() {
        let mut event = LoginEvent::default();
        for (field, expected) in [
            (json!(""), None),
            (json!(null), None),
            (json!(false), None),
            (json!(0), None),
            (json!(42), Some("42")),
            (json!(true), Some("true")),
            (json!("Z0"), Some("Z0")),
        ] {
            let mut prompt = Prompt::default();
            prompt.fields.insert(INVITATION_CODE_FIELD.to_string(), field);
            event.prompt = Some(prompt);
            assert_eq!(event.invitation_code().as_deref(), expected);
        }
    }
}
