//! Invitation registry backed by the identity provider's management API.
//!
//! The record is a user profile whose `app_metadata.invitation_codes` holds the
//! pool. Requests authenticate with a machine-to-machine client credentials
//! grant; the access token is fetched once per client and reused.

use super::{InvitationRecord, InvitationRegistry, RegistryError};
use crate::gate::GateConfig;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{Instrument, debug, info_span, instrument};
use url::Url;

pub struct ManagementClient {
    client: Client,
    base_url: Url,
    client_id: String,
    client_secret: SecretString,
    token: Mutex<Option<SecretString>>,
}

impl ManagementClient {
    /// # Errors
    /// Returns an error if `domain` is not a valid host or URL, or the HTTP client cannot be built.
    pub fn new(
        domain: &str,
        client_id: String,
        client_secret: SecretString,
    ) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url(domain)?,
            client_id,
            client_secret,
            token: Mutex::new(None),
        })
    }

    /// # Errors
    /// Returns an error if the configured domain is invalid.
    pub fn from_config(config: &GateConfig) -> Result<Self, RegistryError> {
        Self::new(
            &config.domain,
            config.m2m_client_id.clone(),
            config.m2m_client_secret.clone(),
        )
    }

    fn audience(&self) -> Result<String, RegistryError> {
        Ok(self.base_url.join("api/v2/")?.to_string())
    }

    fn user_url(&self, id: &str) -> Result<Url, RegistryError> {
        let mut url = self.base_url.join("api/v2/users")?;
        url.path_segments_mut()
            .map_err(|()| RegistryError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .push(id);
        Ok(url)
    }

    async fn access_token(&self) -> Result<SecretString, RegistryError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        let token_url = self.base_url.join("oauth/token")?;
        let payload = json!({
            "grant_type": "client_credentials",
            "client_id": self.client_id,
            "client_secret": self.client_secret.expose_secret(),
            "audience": self.audience()?,
        });

        let span = info_span!("registry.token", http.method = "POST", url = %token_url);
        let response = self
            .client
            .post(token_url.as_str())
            .json(&payload)
            .send()
            .instrument(span)
            .await?;

        let json_response = checked_json(token_url.as_str(), response).await?;
        let token = json_response
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| RegistryError::Token("no access_token in token response".to_string()))?;

        debug!("obtained management API token");

        let token = SecretString::from(token.to_string());
        *cached = Some(token.clone());
        Ok(token)
    }
}

#[async_trait]
impl InvitationRegistry for ManagementClient {
    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> Result<InvitationRecord, RegistryError> {
        let token = self.access_token().await?;
        let url = self.user_url(id)?;

        let span = info_span!("registry.get", http.method = "GET", url = %url);
        let response = self
            .client
            .get(url.as_str())
            .bearer_auth(token.expose_secret())
            .send()
            .instrument(span)
            .await?;

        let json_response = checked_json(url.as_str(), response).await?;
        parse_record(&json_response)
    }

    #[instrument(skip(self, codes), fields(codes = codes.len()))]
    async fn update(&self, id: &str, codes: &[String]) -> Result<(), RegistryError> {
        let token = self.access_token().await?;
        let url = self.user_url(id)?;

        let payload = json!({
            "app_metadata": { "invitation_codes": codes }
        });

        let span = info_span!("registry.update", http.method = "PATCH", url = %url);
        let response = self
            .client
            .patch(url.as_str())
            .bearer_auth(token.expose_secret())
            .json(&payload)
            .send()
            .instrument(span)
            .await?;

        checked_json(url.as_str(), response).await?;

        Ok(())
    }
}

/// Resolve the tenant domain into the API base URL, defaulting to https.
fn base_url(domain: &str) -> Result<Url, RegistryError> {
    let domain = domain.trim().trim_end_matches('/');
    let url = if domain.starts_with("http://") || domain.starts_with("https://") {
        Url::parse(&format!("{domain}/"))?
    } else {
        Url::parse(&format!("https://{domain}/"))?
    };

    if url.host().is_none() {
        return Err(RegistryError::Url(url::ParseError::EmptyHost));
    }

    Ok(url)
}

async fn checked_json(url: &str, response: reqwest::Response) -> Result<Value, RegistryError> {
    let status = response.status();

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(RegistryError::NotFound(url.to_string()));
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RegistryError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&text)
        .map_err(|e| RegistryError::MalformedRecord(format!("invalid JSON from {url}: {e}")))
}

// The management API reports failures as {"error": ..., "message": ...}.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            json.get("message")
                .or_else(|| json.get("error_description"))
                .or_else(|| json.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

fn parse_record(json_response: &Value) -> Result<InvitationRecord, RegistryError> {
    let codes = json_response
        .get("app_metadata")
        .and_then(|metadata| metadata.get("invitation_codes"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            RegistryError::MalformedRecord("app_metadata.invitation_codes missing".to_string())
        })?;

    let codes = codes
        .iter()
        .map(|code| {
            code.as_str().map(str::to_string).ok_or_else(|| {
                RegistryError::MalformedRecord(format!("invitation code is not a string: {code}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(InvitationRecord {
        invitation_codes: codes,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn client(server: &MockServer) -> ManagementClient {
        ManagementClient::new(
            &server.uri(),
            "m2m-id".to_string(),
            SecretString::from("m2m-secret".to_string()),
        )
        .unwrap()
    }

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_json(json!({
                "grant_type": "client_credentials",
                "client_id": "m2m-id",
                "client_secret": "m2m-secret",
                "audience": format!("{}/api/v2/", server.uri()),
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "mgmt-token",
                "token_type": "Bearer",
                "expires_in": 86400
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[test]
    fn base_url_defaults_to_https() {
        assert_eq!(
            base_url("tenant.example.com").unwrap().as_str(),
            "https://tenant.example.com/"
        );
        assert_eq!(
            base_url("http://127.0.0.1:8080/").unwrap().as_str(),
            "http://127.0.0.1:8080/"
        );
        assert!(base_url("").is_err());
    }

    #[test]
    fn user_url_encodes_id() {
        let client = ManagementClient::new(
            "tenant.example.com",
            String::new(),
            SecretString::from(String::new()),
        )
        .unwrap();
        assert_eq!(
            client.user_url("mock db/1").unwrap().as_str(),
            "https://tenant.example.com/api/v2/users/mock%20db%2F1"
        );
    }

    #[test]
    fn parse_record_requires_codes() {
        assert!(matches!(
            parse_record(&json!({"app_metadata": {}})),
            Err(RegistryError::MalformedRecord(_))
        ));
        assert!(matches!(
            parse_record(&json!({"app_metadata": {"invitation_codes": ["A1", 7]}})),
            Err(RegistryError::MalformedRecord(_))
        ));
        assert_eq!(
            parse_record(&json!({"app_metadata": {"invitation_codes": []}})).unwrap(),
            InvitationRecord::default()
        );
    }

    #[test]
    fn error_message_prefers_message_field() {
        assert_eq!(
            error_message(r#"{"statusCode":403,"error":"Forbidden","message":"Insufficient scope"}"#),
            "Insufficient scope"
        );
        assert_eq!(error_message("plain text"), "plain text");
    }

    #[tokio::test]
    async fn get_and_update_share_one_token() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("GET"))
            .and(path("/api/v2/users/mockdb"))
            .and(header("Authorization", "Bearer mgmt-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user_id": "mockdb",
                "app_metadata": {"invitation_codes": ["A1", "B2", "A1", "C3"]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("PATCH"))
            .and(path("/api/v2/users/mockdb"))
            .and(header("Authorization", "Bearer mgmt-token"))
            .and(body_json(json!({
                "app_metadata": {"invitation_codes": ["B2", "C3"]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user_id": "mockdb"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let record = client.get("mockdb").await.unwrap();
        assert_eq!(record, InvitationRecord::new(["A1", "B2", "A1", "C3"]));

        client.update("mockdb", &record.without("A1")).await.unwrap();
    }

    #[tokio::test]
    async fn get_reports_status_errors() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("GET"))
            .and(path("/api/v2/users/mockdb"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "statusCode": 429,
                "error": "Too Many Requests",
                "message": "Global limit has been reached"
            })))
            .mount(&server)
            .await;

        let err = client(&server).get("mockdb").await.unwrap_err();
        match err {
            RegistryError::Status {
                status, message, ..
            } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Global limit has been reached");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn get_missing_record() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("GET"))
            .and(path("/api/v2/users/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server).get("missing").await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[tokio::test]
    async fn token_failure_is_reported() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "access_denied",
                "error_description": "Unauthorized"
            })))
            .mount(&server)
            .await;

        let err = client(&server).get("mockdb").await.unwrap_err();
        assert!(matches!(err, RegistryError::Status { status: 401, .. }));
    }

    #[test]
    fn user_url_rejects_opaque_base() {
        let client = ManagementClient {
            client: Client::new(),
            base_url: Url::parse("mailto:ops@example.com").unwrap(),
            client_id: String::new(),
            client_secret: SecretString::from(String::new()),
            token: Mutex::new(None),
        };
        assert!(matches!(
            client.user_url("mockdb"),
            Err(RegistryError::Url(_))
        ));
    }

    #[tokio::test]
    async fn token_response_without_access_token() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }

        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        let err = client(&server).get("mockdb").await.unwrap_err();
        assert!(matches!(err, RegistryError::Token(_)));
        assert_eq!(
            err.to_string(),
            "management API token unavailable: no access_token in token response"
        );
    }
}
