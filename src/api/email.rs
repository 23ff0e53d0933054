//! Notification delivery sinks.
//!
//! Auth flows hand fully rendered messages to a [`Notifier`]. Delivery
//! failures are logged and swallowed by [`dispatch`], so signup, reset, and
//! verification never fail because of notification transport. The sink is
//! chosen explicitly by configuration: the log sink for development, SMTP
//! for production.

use anyhow::{Context, Result};
use lettre::{
    Message, SmtpTransport, Transport, message::Mailbox,
    transport::smtp::authentication::Credentials,
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Outbound notification capability.
pub trait Notifier: Send + Sync {
    /// Deliver one message. May block; always call through [`dispatch`]
    /// from request handlers.
    ///
    /// # Errors
    /// Returns an error when delivery fails; the dispatcher logs it.
    fn notify(&self, recipient: &str, subject: &str, body: &str) -> Result<()>;
}

/// Development sink: logs the message (including any embedded link) instead
/// of sending real email.
#[derive(Clone, Debug)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        info!(%recipient, %subject, %body, "notification sink stub");
        Ok(())
    }
}

#[derive(Clone)]
pub struct SmtpConfig {
    host: String,
    port: u16,
    username: String,
    password: SecretString,
    from: String,
}

impl SmtpConfig {
    #[must_use]
    pub fn new(host: String, from: String) -> Self {
        Self {
            host,
            port: 587,
            username: String::new(),
            password: SecretString::from(String::new()),
            from,
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, username: String, password: SecretString) -> Self {
        self.username = username;
        self.password = password;
        self
    }
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from", &self.from)
            .finish()
    }
}

/// Production sink: STARTTLS SMTP relay via lettre's blocking transport.
pub struct SmtpNotifier {
    config: SmtpConfig,
}

impl SmtpNotifier {
    #[must_use]
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn build_transport(&self) -> Result<SmtpTransport> {
        let credentials = Credentials::new(
            self.config.username.clone(),
            self.config.password.expose_secret().to_string(),
        );
        let transport = SmtpTransport::starttls_relay(&self.config.host)
            .context("failed to create SMTP transport")?
            .port(self.config.port)
            .credentials(credentials)
            .timeout(Some(SMTP_TIMEOUT))
            .build();
        Ok(transport)
    }
}

impl Notifier for SmtpNotifier {
    fn notify(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let from: Mailbox = self
            .config
            .from
            .parse()
            .context("invalid SMTP from address")?;
        let to: Mailbox = recipient.parse().context("invalid recipient address")?;
        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .body(body.to_string())
            .context("failed to build message")?;

        let transport = self.build_transport()?;
        transport.send(&message).context("failed to send email")?;
        Ok(())
    }
}

/// Fire-and-forget delivery off the async workers. Errors are logged, never
/// surfaced: auth flows must not fail on notification transport.
pub fn dispatch(notifier: Arc<dyn Notifier>, recipient: String, subject: String, body: String) {
    tokio::task::spawn_blocking(move || {
        if let Err(err) = notifier.notify(&recipient, &subject, &body) {
            error!(%recipient, "Failed to deliver notification: {err:#}");
        }
    });
}
