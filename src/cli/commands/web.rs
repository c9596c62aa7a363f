use crate::{
    api::DEFAULT_FRONTEND_BASE_URL,
    refresh::{DEFAULT_ACCESS_EXPIRY_THRESHOLD_SECONDS, DEFAULT_REFRESH_TIMEOUT_SECONDS},
    session::DEFAULT_SESSION_TTL_SECONDS,
};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const COMMAND: &str = "web";

const ARG_PORT: &str = "port";
const ARG_ACCESS_SECRET: &str = "access-secret";
const ARG_SESSION_SECRET: &str = "session-secret";
const ARG_USER_ORIGIN: &str = "user-origin";
const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
const ARG_ACCESS_EXPIRY_THRESHOLD: &str = "access-expiry-threshold";
const ARG_REFRESH_TIMEOUT_SECONDS: &str = "refresh-timeout-seconds";
const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";

#[derive(Debug)]
pub struct Options {
    pub port: u16,
    pub access_secret: SecretString,
    pub session_secret: SecretString,
    pub user_origin: String,
    pub frontend_base_url: String,
    pub access_expiry_threshold: u64,
    pub refresh_timeout_seconds: u64,
    pub session_ttl_seconds: i64,
}

impl Options {
    /// Parse web gateway arguments from matches.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read_required = |id: &str| -> anyhow::Result<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };

        Ok(Self {
            port: matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(3000),
            access_secret: SecretString::from(read_required(ARG_ACCESS_SECRET)?),
            session_secret: SecretString::from(read_required(ARG_SESSION_SECRET)?),
            user_origin: read_required(ARG_USER_ORIGIN)?,
            frontend_base_url: matches
                .get_one::<String>(ARG_FRONTEND_BASE_URL)
                .cloned()
                .unwrap_or_else(|| DEFAULT_FRONTEND_BASE_URL.to_string()),
            access_expiry_threshold: matches
                .get_one::<u64>(ARG_ACCESS_EXPIRY_THRESHOLD)
                .copied()
                .unwrap_or(DEFAULT_ACCESS_EXPIRY_THRESHOLD_SECONDS),
            refresh_timeout_seconds: matches
                .get_one::<u64>(ARG_REFRESH_TIMEOUT_SECONDS)
                .copied()
                .unwrap_or(DEFAULT_REFRESH_TIMEOUT_SECONDS),
            session_ttl_seconds: matches
                .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(DEFAULT_SESSION_TTL_SECONDS),
        })
    }
}

#[must_use]
pub fn subcommand() -> Command {
    with_args(Command::new(COMMAND).about("Browser-facing session gateway"))
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("3000")
                .env("FOILCTF_WEB_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_ACCESS_SECRET)
                .long(ARG_ACCESS_SECRET)
                .help("HMAC secret access tokens are signed with")
                .env("FOILCTF_ACCESS_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_SESSION_SECRET)
                .long(ARG_SESSION_SECRET)
                .help("Secret the session cookie signing key is derived from (at least 32 bytes)")
                .env("FOILCTF_SESSION_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_USER_ORIGIN)
                .long(ARG_USER_ORIGIN)
                .help("Origin of the user service, example: http://user:8080")
                .env("FOILCTF_USER_ORIGIN")
                .required(true),
        )
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Public base URL of the frontend, https enables Secure cookies")
                .env("FOILCTF_FRONTEND_BASE_URL")
                .default_value(DEFAULT_FRONTEND_BASE_URL),
        )
        .arg(
            Arg::new(ARG_ACCESS_EXPIRY_THRESHOLD)
                .long(ARG_ACCESS_EXPIRY_THRESHOLD)
                .help("Renew access tokens expiring within this many seconds")
                .env("FOILCTF_ACCESS_EXPIRY_THRESHOLD")
                .default_value("20")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_REFRESH_TIMEOUT_SECONDS)
                .long(ARG_REFRESH_TIMEOUT_SECONDS)
                .help("Timeout for the upstream token refresh call")
                .env("FOILCTF_REFRESH_TIMEOUT_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session cookie TTL in seconds")
                .env("FOILCTF_SESSION_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
}
