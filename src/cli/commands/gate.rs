use crate::gate::{CodePolicy, GateOptions};
use crate::registry::RetryPolicy;
use anyhow::{Result, anyhow};
use clap::{Arg, ArgAction, Command, builder::BoolishValueParser};
use std::time::Duration;

pub const ARG_SCOPED_CLIENT: &str = "scoped-client";
pub const ARG_REQUIRE_REGISTERED_CODE: &str = "require-registered-code";
pub const ARG_REGISTRY_WRITE_ATTEMPTS: &str = "registry-write-attempts";
pub const ARG_REGISTRY_BACKOFF_MS: &str = "registry-backoff-ms";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SCOPED_CLIENT)
                .long(ARG_SCOPED_CLIENT)
                .help("Only gate logins to the application with this name (default: every application)")
                .env("INVITEGATE_SCOPED_CLIENT"),
        )
        .arg(
            Arg::new(ARG_REQUIRE_REGISTERED_CODE)
                .long(ARG_REQUIRE_REGISTERED_CODE)
                .help("Reject invitation codes that are not in the registry")
                .env("INVITEGATE_REQUIRE_REGISTERED_CODE")
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        )
        .arg(
            Arg::new(ARG_REGISTRY_WRITE_ATTEMPTS)
                .long(ARG_REGISTRY_WRITE_ATTEMPTS)
                .help("Attempts to retire a used code from the registry")
                .env("INVITEGATE_REGISTRY_WRITE_ATTEMPTS")
                .default_value("3")
                .value_parser(clap::value_parser!(u32).range(1..=10)),
        )
        .arg(
            Arg::new(ARG_REGISTRY_BACKOFF_MS)
                .long(ARG_REGISTRY_BACKOFF_MS)
                .help("Base backoff between registry write attempts in milliseconds")
                .env("INVITEGATE_REGISTRY_BACKOFF_MS")
                .default_value("1000")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub scoped_client: Option<String>,
    pub require_registered_code: bool,
    pub registry_write_attempts: u32,
    pub registry_backoff_ms: u64,
}

impl Options {
    /// # Errors
    /// Returns an error if a defaulted argument is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        Ok(Self {
            scoped_client: matches
                .get_one::<String>(ARG_SCOPED_CLIENT)
                .filter(|name| !name.is_empty())
                .cloned(),
            require_registered_code: matches.get_flag(ARG_REQUIRE_REGISTERED_CODE),
            registry_write_attempts: matches
                .get_one::<u32>(ARG_REGISTRY_WRITE_ATTEMPTS)
                .copied()
                .ok_or_else(|| anyhow!("missing required argument: --{ARG_REGISTRY_WRITE_ATTEMPTS}"))?,
            registry_backoff_ms: matches
                .get_one::<u64>(ARG_REGISTRY_BACKOFF_MS)
                .copied()
                .ok_or_else(|| anyhow!("missing required argument: --{ARG_REGISTRY_BACKOFF_MS}"))?,
        })
    }

    #[must_use]
    pub fn into_gate_options(self) -> GateOptions {
        GateOptions {
            scoped_client: self.scoped_client,
            code_policy: if self.require_registered_code {
                CodePolicy::RegisteredOnly
            } else {
                CodePolicy::PresenceOnly
            },
            retry: RetryPolicy {
                max_attempts: self.registry_write_attempts,
                base_backoff: Duration::from_millis(self.registry_backoff_ms),
            },
        }
    }
}
