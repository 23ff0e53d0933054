use clap::{Arg, Command, builder::PossibleValuesParser};

pub const ARG_NOTIFIER: &str = "notifier";
pub const ARG_SMTP_HOST: &str = "smtp-host";
pub const ARG_SMTP_PORT: &str = "smtp-port";
pub const ARG_SMTP_USERNAME: &str = "smtp-username";
pub const ARG_SMTP_PASSWORD: &str = "smtp-password";
pub const ARG_SMTP_FROM: &str = "smtp-from";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_NOTIFIER)
                .long(ARG_NOTIFIER)
                .help("Notification sink: 'log' prints messages, 'smtp' delivers them")
                .default_value("log")
                .env("POLYLAB_NOTIFIER")
                .value_parser(PossibleValuesParser::new(["log", "smtp"])),
        )
        .arg(
            Arg::new(ARG_SMTP_HOST)
                .long(ARG_SMTP_HOST)
                .help("SMTP relay host (STARTTLS)")
                .env("POLYLAB_SMTP_HOST")
                .required_if_eq(ARG_NOTIFIER, "smtp"),
        )
        .arg(
            Arg::new(ARG_SMTP_PORT)
                .long(ARG_SMTP_PORT)
                .help("SMTP relay port")
                .default_value("587")
                .env("POLYLAB_SMTP_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_SMTP_USERNAME)
                .long(ARG_SMTP_USERNAME)
                .help("SMTP username")
                .env("POLYLAB_SMTP_USERNAME"),
        )
        .arg(
            Arg::new(ARG_SMTP_PASSWORD)
                .long(ARG_SMTP_PASSWORD)
                .help("SMTP password (prefer the environment variable)")
                .env("POLYLAB_SMTP_PASSWORD")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_SMTP_FROM)
                .long(ARG_SMTP_FROM)
                .help("From address for outbound mail, e.g. 'PolyLab <no-reply@polylab.dev>'")
                .env("POLYLAB_SMTP_FROM")
                .required_if_eq(ARG_NOTIFIER, "smtp"),
        )
}
