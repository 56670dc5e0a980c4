use clap::{Arg, ArgAction, ArgMatches, Command, builder::ValueParser};
use tracing::Level;

pub const ARG_VERBOSITY: &str = "verbosity";

/// Env var accepted in place of repeated `-v` flags.
pub const ENV_LOG_LEVEL: &str = "INVITEGATE_LOG_LEVEL";

// Position in this list is the `-v` count that selects the level.
const LEVELS: [Level; 5] = [
    Level::ERROR,
    Level::WARN,
    Level::INFO,
    Level::DEBUG,
    Level::TRACE,
];

/// Accept either a `-v` count or a level name such as `info`.
#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(|level: &str| -> Result<u8, String> {
        if let Ok(count) = level.parse::<u8>() {
            return Ok(count);
        }

        level
            .parse::<Level>()
            .ok()
            .and_then(|parsed| LEVELS.iter().position(|known| *known == parsed))
            .and_then(|index| u8::try_from(index).ok())
            .ok_or_else(|| format!("invalid log level: {level}"))
    })
}

/// Map a verbosity count to a level; zero keeps the subscriber default.
#[must_use]
pub fn level_for(count: u8) -> Option<Level> {
    match count {
        0 => None,
        n => Some(LEVELS[usize::from(n).min(LEVELS.len() - 1)]),
    }
}

/// Level requested on the command line or through the environment.
#[must_use]
pub fn verbosity(matches: &ArgMatches) -> Option<Level> {
    level_for(matches.get_one::<u8>(ARG_VERBOSITY).copied().unwrap_or(0))
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Log level: -v WARN, -vv INFO, -vvv DEBUG, -vvvv TRACE (default: ERROR)")
            .env(ENV_LOG_LEVEL)
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn level_names_map_to_counts() {
        let command = with_args(Command::new("invitegate"));
        for (value, expected) in [
            ("info", Some(Level::INFO)),
            ("DEBUG", Some(Level::DEBUG)),
            ("error", None),
            ("1", Some(Level::WARN)),
        ] {
            temp_env::with_var(ENV_LOG_LEVEL, Some(value), || {
                let matches = command.clone().try_get_matches_from(["invitegate"]).unwrap();
                assert_eq!(verbosity(&matches), expected, "{value}");
            });
        }
    }

    #[test]
    fn unknown_level_is_rejected() {
        temp_env::with_var(ENV_LOG_LEVEL, Some("loud"), || {
            let result = with_args(Command::new("invitegate")).try_get_matches_from(["invitegate"]);
            assert!(result.is_err());
        });
    }

    #[test]
    fn counts_saturate_at_trace() {
        assert_eq!(level_for(0), None);
        assert_eq!(level_for(2), Some(Level::INFO));
        assert_eq!(level_for(4), Some(Level::TRACE));
        assert_eq!(level_for(40), Some(Level::TRACE));
    }
}
