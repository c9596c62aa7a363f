use crate::token::{DEFAULT_ACCESS_TTL_SECONDS, DEFAULT_REFRESH_TTL_SECONDS};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const COMMAND: &str = "auth";

const ARG_PORT: &str = "port";
const ARG_ACCESS_SECRET: &str = "access-secret";
const ARG_REFRESH_SECRET: &str = "refresh-secret";
const ARG_ACCESS_TTL_SECONDS: &str = "access-ttl-seconds";
const ARG_REFRESH_TTL_SECONDS: &str = "refresh-ttl-seconds";

#[derive(Debug)]
pub struct Options {
    pub port: u16,
    pub access_secret: SecretString,
    pub refresh_secret: SecretString,
    pub access_ttl_seconds: i64,
    pub refresh_ttl_seconds: i64,
}

impl Options {
    /// Parse auth service arguments from matches.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read_secret = |id: &str| -> anyhow::Result<SecretString> {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from)
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };

        Ok(Self {
            port: matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080),
            access_secret: read_secret(ARG_ACCESS_SECRET)?,
            refresh_secret: read_secret(ARG_REFRESH_SECRET)?,
            access_ttl_seconds: matches
                .get_one::<i64>(ARG_ACCESS_TTL_SECONDS)
                .copied()
                .unwrap_or(DEFAULT_ACCESS_TTL_SECONDS),
            refresh_ttl_seconds: matches
                .get_one::<i64>(ARG_REFRESH_TTL_SECONDS)
                .copied()
                .unwrap_or(DEFAULT_REFRESH_TTL_SECONDS),
        })
    }
}

#[must_use]
pub fn subcommand() -> Command {
    with_args(Command::new(COMMAND).about("User-service token endpoint"))
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("FOILCTF_AUTH_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_ACCESS_SECRET)
                .long(ARG_ACCESS_SECRET)
                .help("HMAC secret for access tokens")
                .env("FOILCTF_ACCESS_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_REFRESH_SECRET)
                .long(ARG_REFRESH_SECRET)
                .help("HMAC secret for refresh tokens")
                .env("FOILCTF_REFRESH_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_ACCESS_TTL_SECONDS)
                .long(ARG_ACCESS_TTL_SECONDS)
                .help("Access token TTL in seconds")
                .env("FOILCTF_ACCESS_TTL_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_REFRESH_TTL_SECONDS)
                .long(ARG_REFRESH_TTL_SECONDS)
                .help("Refresh token TTL in seconds")
                .env("FOILCTF_REFRESH_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64)),
        )
}
