//! Map validated CLI arguments to the action the binary runs.

use crate::cli::actions::{auth, web, Action};
use crate::cli::commands;
use anyhow::{bail, Result};

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or no subcommand was given.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some((commands::web::COMMAND, sub)) => {
            let options = commands::web::Options::parse(sub)?;
            Ok(Action::Web(web::Args {
                port: options.port,
                access_secret: options.access_secret,
                session_secret: options.session_secret,
                user_origin: options.user_origin,
                frontend_base_url: options.frontend_base_url,
                access_expiry_threshold: options.access_expiry_threshold,
                refresh_timeout_seconds: options.refresh_timeout_seconds,
                session_ttl_seconds: options.session_ttl_seconds,
            }))
        }
        Some((commands::auth::COMMAND, sub)) => {
            let options = commands::auth::Options::parse(sub)?;
            Ok(Action::Auth(auth::Args {
                port: options.port,
                access_secret: options.access_secret,
                refresh_secret: options.refresh_secret,
                access_ttl_seconds: options.access_ttl_seconds,
                refresh_ttl_seconds: options.refresh_ttl_seconds,
            }))
        }
        other => bail!(
            "unknown subcommand: {}",
            other.map_or("<none>", |(name, _)| name)
        ),
    }
}
