use super::{ControlApi, Error, GateConfig, GateOptions, LoginEvent, Outcome, PRIVATE_BETA_FLAG};
use crate::registry::{InvitationRecord, InvitationRegistry, RegistryError, spawn_update};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};
use ulid::Ulid;

/// Result of processing a submitted invitation form.
#[derive(Debug)]
pub struct Verification {
    pub outcome: Outcome,
    /// Detached write retiring the code, if one was scheduled.
    pub cleanup: Option<JoinHandle<()>>,
}

impl Verification {
    const fn done(outcome: Outcome) -> Self {
        Self {
            outcome,
            cleanup: None,
        }
    }
}

/// The registry client plus the id of the record holding the pool.
struct Pool<R: ?Sized> {
    registry: Arc<R>,
    record_id: String,
}

impl<R: InvitationRegistry + ?Sized> Pool<R> {
    async fn fetch(&self) -> Result<InvitationRecord, RegistryError> {
        self.registry.get(&self.record_id).await
    }
}

fn open<R, F>(event: &LoginEvent, connect: F) -> Result<Pool<R>, Error>
where
    R: InvitationRegistry + ?Sized,
    F: FnOnce(&GateConfig) -> Result<Arc<R>, RegistryError>,
{
    let config = GateConfig::from_secrets(&event.secrets)?;
    let registry = connect(&config).map_err(Error::RegistryUnavailable)?;

    Ok(Pool {
        registry,
        record_id: config.registry_record_id,
    })
}

/// Handle the user's return from the invitation form.
///
/// A missing code denies the attempt. Otherwise the user is marked as verified
/// and the code is removed from the registry on a best-effort basis: registry
/// failures are logged and never take access away again.
///
/// `connect` builds the registry client from the event's secrets.
#[instrument(skip_all, fields(attempt = %Ulid::new(), user_id = %event.user.user_id))]
pub async fn on_continue<A, R, F>(
    event: &LoginEvent,
    api: &mut A,
    connect: F,
    options: &GateOptions,
) -> Verification
where
    A: ControlApi + ?Sized,
    R: InvitationRegistry + ?Sized + 'static,
    F: FnOnce(&GateConfig) -> Result<Arc<R>, RegistryError>,
{
    let Some(submitted) = event.invitation_code() else {
        let e = Error::MissingInvitationCode;
        error!("{}", e);
        api.deny(&e.to_string());
        return Verification::done(Outcome::Deny);
    };

    let code: &str = &submitted;

    info!("A user submitted an invitation code");
    debug!(code, "submitted invitation code");

    let pool = open(event, connect);
    let policy = options.code_policy;
    let mut record = None;

    if policy.requires_registry() {
        let fetched = match &pool {
            Ok(pool) => pool.fetch().await.map_err(Error::RegistryUnavailable),
            Err(e) => {
                error!(error = ?e, "Cannot reach the invitation registry");
                api.deny(&e.to_string());
                return Verification::done(Outcome::Deny);
            }
        };

        match fetched {
            Ok(fetched) => record = Some(fetched),
            Err(e) => {
                error!(error = ?e, "{}", e);
                api.deny(&e.to_string());
                return Verification::done(Outcome::Deny);
            }
        }
    }

    if !policy.accepts(code, record.as_ref()) {
        let e = Error::UnknownInvitationCode;
        info!("{}", e);
        api.deny(&e.to_string());
        return Verification::done(Outcome::Deny);
    }

    // From here on the user keeps access whatever happens to the registry.
    api.set_app_metadata(PRIVATE_BETA_FLAG, Value::Bool(true));

    let pool = match pool {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = ?e, "Cannot reach the invitation registry");
            return Verification::done(Outcome::Allow);
        }
    };

    let record = match record {
        Some(record) => record,
        None => match pool.fetch().await {
            Ok(record) => record,
            Err(e) => {
                error!("{}", Error::from(e));
                return Verification::done(Outcome::Allow);
            }
        },
    };

    let updated = record.without(code);
    info!(
        removed = record.invitation_codes.len() - updated.len(),
        remaining = updated.len(),
        "Removing the used code from the invitation list"
    );
    debug!(?updated, "updated invitation list");

    let cleanup = spawn_update(pool.registry, pool.record_id, updated, options.retry);

    Verification {
        outcome: Outcome::Allow,
        cleanup: Some(cleanup),
    }
}
