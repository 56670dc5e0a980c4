use super::{ControlApi, GateConfig, GateOptions, LoginEvent, Outcome};
use tracing::{debug, error, info, instrument};
use ulid::Ulid;

/// Decide whether a freshly authenticated user may continue.
///
/// Denies when a required secret is missing, redirects unverified users to the
/// invitation form and leaves verified users alone. At most one command is
/// issued per call.
#[instrument(skip_all, fields(attempt = %Ulid::new(), user_id = %event.user.user_id))]
pub fn on_execute<A>(event: &LoginEvent, api: &mut A, options: &GateOptions) -> Outcome
where
    A: ControlApi + ?Sized,
{
    let config = match GateConfig::from_secrets(&event.secrets) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            api.deny(&e.to_string());
            return Outcome::Deny;
        }
    };

    if let Some(scope) = options.scoped_client.as_deref() {
        if event.client_name() != Some(scope) {
            debug!(client = ?event.client_name(), "login is outside the gated application");
            return Outcome::Allow;
        }
    }

    if event.user.is_private_beta_user() {
        info!("This user is already a verified private beta user");
        return Outcome::Allow;
    }

    info!(form_id = %config.form_id, "Redirecting the user to the invitation form");
    api.render(&config.form_id);

    Outcome::Redirect
}
