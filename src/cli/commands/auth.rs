use anyhow::{Context, Result};
use clap::{Arg, Command};

pub fn with_args(command: Command) -> Command {
    let command = with_auth_args(command);
    with_outbox_args(command)
}

fn with_auth_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("frontend-base-url")
                .long("frontend-base-url")
                .help("Frontend base URL used for reset links and the CORS origin")
                .env("ACCESSO_FRONTEND_BASE_URL")
                .default_value("https://accesso.dev"),
        )
        .arg(
            Arg::new("session-ttl-seconds")
                .long("session-ttl-seconds")
                .help("Session cookie TTL in seconds")
                .env("ACCESSO_SESSION_TTL_SECONDS")
                .default_value("2592000")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("verification-code-ttl-seconds")
                .long("verification-code-ttl-seconds")
                .help("Email verification code TTL in seconds")
                .env("ACCESSO_VERIFICATION_CODE_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("reset-token-ttl-seconds")
                .long("reset-token-ttl-seconds")
                .help("Password reset token TTL in seconds")
                .env("ACCESSO_RESET_TOKEN_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(i64)),
        )
}

fn with_outbox_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("email-outbox-poll-seconds")
                .long("email-outbox-poll-seconds")
                .help("Email outbox poll interval in seconds")
                .env("ACCESSO_EMAIL_OUTBOX_POLL_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("email-outbox-batch-size")
                .long("email-outbox-batch-size")
                .help("Email outbox batch size per poll")
                .env("ACCESSO_EMAIL_OUTBOX_BATCH_SIZE")
                .default_value("10")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("email-outbox-max-attempts")
                .long("email-outbox-max-attempts")
                .help("Max attempts before marking an email as failed")
                .env("ACCESSO_EMAIL_OUTBOX_MAX_ATTEMPTS")
                .default_value("5")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("email-outbox-backoff-base-seconds")
                .long("email-outbox-backoff-base-seconds")
                .help("Base delay for email outbox retry backoff")
                .env("ACCESSO_EMAIL_OUTBOX_BACKOFF_BASE_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("email-outbox-backoff-max-seconds")
                .long("email-outbox-backoff-max-seconds")
                .help("Max delay for email outbox retry backoff")
                .env("ACCESSO_EMAIL_OUTBOX_BACKOFF_MAX_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[derive(Debug)]
pub struct OutboxOptions {
    pub poll_seconds: u64,
    pub batch_size: usize,
    pub max_attempts: u32,
    pub backoff_base_seconds: u64,
    pub backoff_max_seconds: u64,
}

#[derive(Debug)]
pub struct Options {
    pub frontend_base_url: String,
    pub session_ttl_seconds: i64,
    pub verification_code_ttl_seconds: i64,
    pub reset_token_ttl_seconds: i64,
    pub outbox: OutboxOptions,
}

impl Options {
    /// Read auth options from parsed CLI matches.
    ///
    /// # Errors
    /// Returns an error if an argument with a default is somehow absent.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let frontend_base_url = matches
            .get_one::<String>("frontend-base-url")
            .cloned()
            .context("missing required argument: --frontend-base-url")?;
        let session_ttl_seconds = matches
            .get_one::<i64>("session-ttl-seconds")
            .copied()
            .context("missing required argument: --session-ttl-seconds")?;
        let verification_code_ttl_seconds = matches
            .get_one::<i64>("verification-code-ttl-seconds")
            .copied()
            .context("missing required argument: --verification-code-ttl-seconds")?;
        let reset_token_ttl_seconds = matches
            .get_one::<i64>("reset-token-ttl-seconds")
            .copied()
            .context("missing required argument: --reset-token-ttl-seconds")?;

        let outbox = OutboxOptions {
            poll_seconds: matches
                .get_one::<u64>("email-outbox-poll-seconds")
                .copied()
                .context("missing required argument: --email-outbox-poll-seconds")?,
            batch_size: matches
                .get_one::<usize>("email-outbox-batch-size")
                .copied()
                .context("missing required argument: --email-outbox-batch-size")?,
            max_attempts: matches
                .get_one::<u32>("email-outbox-max-attempts")
                .copied()
                .context("missing required argument: --email-outbox-max-attempts")?,
            backoff_base_seconds: matches
                .get_one::<u64>("email-outbox-backoff-base-seconds")
                .copied()
                .context("missing required argument: --email-outbox-backoff-base-seconds")?,
            backoff_max_seconds: matches
                .get_one::<u64>("email-outbox-backoff-max-seconds")
                .copied()
                .context("missing required argument: --email-outbox-backoff-max-seconds")?,
        };

        Ok(Self {
            frontend_base_url,
            session_ttl_seconds,
            verification_code_ttl_seconds,
            reset_token_ttl_seconds,
            outbox,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Options;
    use crate::cli::commands;

    #[test]
    fn parse_defaults() {
        temp_env::with_vars(
            [
                ("ACCESSO_FRONTEND_BASE_URL", None::<&str>),
                ("ACCESSO_SESSION_TTL_SECONDS", None),
                ("ACCESSO_VERIFICATION_CODE_TTL_SECONDS", None),
                ("ACCESSO_RESET_TOKEN_TTL_SECONDS", None),
            ],
            || {
                let matches = commands::new()
                    .get_matches_from(vec!["accesso", "--dsn", "postgres://localhost/accesso"]);
                let options = Options::parse(&matches).expect("defaults should parse");

                assert_eq!(options.frontend_base_url, "https://accesso.dev");
                assert_eq!(options.session_ttl_seconds, 2_592_000);
                assert_eq!(options.verification_code_ttl_seconds, 86_400);
                assert_eq!(options.reset_token_ttl_seconds, 3_600);
                assert_eq!(options.outbox.poll_seconds, 5);
                assert_eq!(options.outbox.batch_size, 10);
                assert_eq!(options.outbox.max_attempts, 5);
                assert_eq!(options.outbox.backoff_base_seconds, 5);
                assert_eq!(options.outbox.backoff_max_seconds, 300);
            },
        );
    }

    #[test]
    fn parse_overrides() {
        let matches = commands::new().get_matches_from(vec![
            "accesso",
            "--dsn",
            "postgres://localhost/accesso",
            "--frontend-base-url",
            "http://localhost:3000",
            "--session-ttl-seconds",
            "604800",
            "--verification-code-ttl-seconds",
            "600",
            "--reset-token-ttl-seconds",
            "120",
            "--email-outbox-batch-size",
            "3",
        ]);
        let options = Options::parse(&matches).expect("overrides should parse");

        assert_eq!(options.frontend_base_url, "http://localhost:3000");
        assert_eq!(options.session_ttl_seconds, 604_800);
        assert_eq!(options.verification_code_ttl_seconds, 600);
        assert_eq!(options.reset_token_ttl_seconds, 120);
        assert_eq!(options.outbox.batch_size, 3);
    }
}
