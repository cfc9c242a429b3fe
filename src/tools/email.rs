//! `send_email`: deliver a plain-text email over SMTP.
//!
//! The SMTP client is synchronous, so each send runs on tokio's blocking
//! pool. [`Mailer`] is shared with the standalone email relay.

use std::sync::Arc;

use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::response::{Category, Code, Detail, Severity};
use lettre::{Message, SmtpTransport, Transport};
use tracing::{info, warn};

use crate::config::SmtpConfig;
use crate::tools::registry::{ParamSpec, ToolArgs, ToolFuture, ToolHandler, arg_string};

pub const DEFAULT_SUBJECT: &str = "Message from your Chatbot Assistant";
pub const DEFAULT_BODY: &str = "This is a quick message sent via your chatbot assistant.";

/// `535 Authentication credentials invalid`
const AUTH_REJECTED: Code = Code {
    severity: Severity::PermanentNegativeCompletion,
    category: Category::Unspecified3,
    detail: Detail::Five,
};

/// Errors raised while sending mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailError {
    /// `SENDER_EMAIL` or `SENDER_PASSWORD` is not configured.
    MissingCredentials,
    /// A sender or recipient address could not be parsed.
    InvalidAddress(String),
    /// The SMTP server refused the login.
    Authentication,
    /// Any other failure building or delivering the message.
    Transport(String),
}

impl std::fmt::Display for MailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MailError::MissingCredentials => write!(
                f,
                "Email credentials not found. Check SENDER_EMAIL/SENDER_PASSWORD."
            ),
            MailError::InvalidAddress(msg) => write!(f, "Invalid email address: {}", msg),
            MailError::Authentication => write!(
                f,
                "Failed to login. Check your SENDER_EMAIL and SENDER_PASSWORD (App Password required for Gmail)."
            ),
            MailError::Transport(msg) => write!(f, "Failed to send email. Error: {}", msg),
        }
    }
}

impl std::error::Error for MailError {}

fn classify_send_error(status: Option<Code>, message: String) -> MailError {
    if status == Some(AUTH_REJECTED) {
        MailError::Authentication
    } else {
        MailError::Transport(message)
    }
}

/// Apply the fallback subject and body to blank input.
pub fn compose(subject: Option<&str>, body: Option<&str>) -> (String, String) {
    let pick = |value: Option<&str>, fallback: &str| {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(fallback)
            .to_string()
    };
    (pick(subject, DEFAULT_SUBJECT), pick(body, DEFAULT_BODY))
}

/// Sends mail with the configured sender account.
#[derive(Debug, Clone)]
pub struct Mailer {
    config: Arc<SmtpConfig>,
}

impl Mailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    fn build_message(sender: &str, recipient: &str, subject: &str, body: &str) -> Result<Message, MailError> {
        let from: Mailbox = sender
            .parse()
            .map_err(|e| MailError::InvalidAddress(format!("{}: {}", sender, e)))?;
        let to: Mailbox = recipient
            .trim()
            .parse()
            .map_err(|e| MailError::InvalidAddress(format!("{}: {}", recipient, e)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| MailError::Transport(e.to_string()))
    }

    /// Send `subject`/`body` to `recipient` without blocking the runtime.
    pub async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let (Some(sender), Some(password)) =
            (self.config.sender_email.clone(), self.config.sender_password.clone())
        else {
            return Err(MailError::MissingCredentials);
        };

        let message = Self::build_message(&sender, recipient, subject, body)?;
        let config = self.config.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            let transport = SmtpTransport::relay(&config.host)
                .map_err(|e| MailError::Transport(e.to_string()))?
                .port(config.port)
                .credentials(Credentials::new(sender, password))
                .build();

            transport
                .send(&message)
                .map(|_| ())
                .map_err(|e| classify_send_error(e.status(), e.to_string()))
        })
        .await
        .map_err(|e| MailError::Transport(e.to_string()))?;

        match &outcome {
            Ok(()) => info!(recipient = %recipient, "Email sent"),
            Err(e) => warn!(recipient = %recipient, error = %e, "Email delivery failed"),
        }
        outcome
    }
}

pub struct SendEmailHandler {
    mailer: Mailer,
}

impl SendEmailHandler {
    pub fn new(mailer: Mailer) -> Self {
        Self { mailer }
    }
}

impl ToolHandler for SendEmailHandler {
    fn name(&self) -> &str {
        "send_email"
    }

    fn doc(&self) -> &str {
        "Sends an email to a specified recipient with a subject and body.
        Args:
            recipient: The email address of the person to receive the email.
            subject: The subject line of the email.
            body: The main content of the email."
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("recipient"),
            ParamSpec::required("subject"),
            ParamSpec::required("body"),
        ]
    }

    fn call(&self, args: ToolArgs) -> ToolFuture<'_> {
        let recipient = arg_string(&args, "recipient").unwrap_or_default();
        let (subject, body) = compose(
            arg_string(&args, "subject").as_deref(),
            arg_string(&args, "body").as_deref(),
        );

        Box::pin(async move {
            self.mailer.send(&recipient, &subject, &body).await?;
            Ok(format!("✅ Email successfully sent to {}.", recipient))
        })
    }
}
