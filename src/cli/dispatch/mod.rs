//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the appropriate
//! action, such as starting the API server with its full configuration state.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::auth;
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        frontend_base_url: auth_opts.frontend_base_url,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        verification_code_ttl_seconds: auth_opts.verification_code_ttl_seconds,
        reset_token_ttl_seconds: auth_opts.reset_token_ttl_seconds,
        email_outbox_poll_seconds: auth_opts.outbox.poll_seconds,
        email_outbox_batch_size: auth_opts.outbox.batch_size,
        email_outbox_max_attempts: auth_opts.outbox.max_attempts,
        email_outbox_backoff_base_seconds: auth_opts.outbox.backoff_base_seconds,
        email_outbox_backoff_max_seconds: auth_opts.outbox.backoff_max_seconds,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::actions::Action;

    #[test]
    fn builds_server_action_from_matches() {
        temp_env::with_vars([("ACCESSO_PORT", None::<&str>)], || {
            let matches = crate::cli::commands::new().get_matches_from(vec![
                "accesso",
                "--dsn",
                "postgres://user@localhost:5432/accesso",
                "--session-ttl-seconds",
                "604800",
            ]);
            let action = handler(&matches).expect("handler should build an action");
            let Action::Server(args) = action;
            assert_eq!(args.port, 8080);
            assert_eq!(args.dsn, "postgres://user@localhost:5432/accesso");
            assert_eq!(args.session_ttl_seconds, 604_800);
            assert_eq!(args.email_outbox_max_attempts, 5);
        });
    }
}
