//! Hook endpoints the identity provider calls during a login.
//!
//! Both phases take the raw login event and answer with the outcome plus the
//! commands the host must apply (deny, render a form, set profile metadata).

use crate::gate::{self, Command, CommandLog, GateOptions, LoginEvent, Outcome};
use crate::registry::ManagementClient;
use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct HookResponse {
    pub outcome: Outcome,
    pub commands: Vec<Command>,
}

impl HookResponse {
    fn new(outcome: Outcome, api: CommandLog) -> Self {
        Self {
            outcome,
            commands: api.into_commands(),
        }
    }
}

fn bad_request(rejection: &JsonRejection) -> Response {
    error!("Invalid login event: {}", rejection.body_text());

    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": rejection.body_text() })),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/v1/post-login/execute",
    request_body = LoginEvent,
    responses (
        (status = 200, description = "Gate decision for a freshly authenticated user", body = HookResponse),
        (status = 400, description = "Malformed login event"),
    ),
    tag = "post-login"
)]
// axum handler for the first phase
pub async fn execute(
    options: Extension<Arc<GateOptions>>,
    payload: Result<Json<LoginEvent>, JsonRejection>,
) -> Response {
    let event = match payload {
        Ok(Json(event)) => event,
        Err(rejection) => return bad_request(&rejection),
    };

    let mut api = CommandLog::new();
    let outcome = gate::on_execute(&event, &mut api, &options);

    debug!(?outcome, "execute finished");

    Json(HookResponse::new(outcome, api)).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/post-login/continue",
    request_body = LoginEvent,
    responses (
        (status = 200, description = "Result of the submitted invitation form", body = HookResponse),
        (status = 400, description = "Malformed login event"),
    ),
    tag = "post-login"
)]
// axum handler for the second phase; the registry write is left running
pub async fn resume(
    options: Extension<Arc<GateOptions>>,
    payload: Result<Json<LoginEvent>, JsonRejection>,
) -> Response {
    let event = match payload {
        Ok(Json(event)) => event,
        Err(rejection) => return bad_request(&rejection),
    };

    let mut api = CommandLog::new();
    let verification = gate::on_continue(
        &event,
        &mut api,
        |config| ManagementClient::from_config(config).map(Arc::new),
        &options,
    )
    .await;

    debug!(
        outcome = ?verification.outcome,
        cleanup = verification.cleanup.is_some(),
        "continue finished"
    );

    Json(HookResponse::new(verification.outcome, api)).into_response()
}
