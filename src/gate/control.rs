use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use utoipa::ToSchema;

/// Capabilities the host exposes for a single login attempt.
///
/// Every call is a request to the host, not a local mutation.
pub trait ControlApi {
    /// Terminate the attempt with a human-readable reason.
    fn deny(&mut self, reason: &str);

    /// Suspend the attempt and send the user to the named form.
    fn render(&mut self, form_id: &str);

    /// Persist a value in the user's `app_metadata`.
    fn set_app_metadata(&mut self, key: &str, value: Value);
}

/// A request issued through [`ControlApi`], returned to the host verbatim.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    Deny {
        reason: String,
    },
    Render {
        form_id: String,
    },
    SetAppMetadata {
        key: String,
        #[schema(value_type = Object)]
        value: Value,
    },
}

/// How a single workflow run ended.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Allow,
    Redirect,
    Deny,
}

/// [`ControlApi`] that records commands in issue order.
#[derive(Debug, Default)]
pub struct CommandLog {
    commands: Vec<Command>,
}

impl CommandLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    #[must_use]
    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }

    #[must_use]
    pub fn is_denied(&self) -> bool {
        self.commands
            .iter()
            .any(|command| matches!(command, Command::Deny { .. }))
    }

    fn push(&mut self, command: Command) {
        if self.is_denied() {
            warn!("dropping command after deny: {:?}", command);
            return;
        }
        self.commands.push(command);
    }
}

impl ControlApi for CommandLog {
    fn deny(&mut self, reason: &str) {
        self.push(Command::Deny {
            reason: reason.to_string(),
        });
    }

    fn render(&mut self, form_id: &str) {
        self.push(Command::Render {
            form_id: form_id.to_string(),
        });
    }

    fn set_app_metadata(&mut self, key: &str, value: Value) {
        self.push(Command::SetAppMetadata {
            key: key.to_string(),
            value,
        });
    }
}
