//! Transactional email over SMTP.
//!
//! [`Mailer`] wraps the `lettre` async SMTP transport and renders templates
//! stored in `email_templates`. Configuration is loaded from environment
//! variables; if `SMTP_HOST` is not set, [`EmailConfig::from_env`] returns
//! `None` and no mailer is constructed.

use std::collections::HashMap;

use intake_core::template::{render_html, render_text};
use intake_db::models::email_template::EmailTemplate;
use intake_db::repositories::EmailTemplateRepo;
use intake_db::DbPool;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    #[error("Email template '{0}' does not exist")]
    TemplateNotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@intake.local";

/// Configuration for the SMTP mailer.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable        | Required | Default                 |
    /// |-----------------|----------|-------------------------|
    /// | `SMTP_HOST`     | yes      | --                      |
    /// | `SMTP_PORT`     | no       | `587`                   |
    /// | `SMTP_FROM`     | no       | `noreply@intake.local`  |
    /// | `SMTP_USER`     | no       | --                      |
    /// | `SMTP_PASSWORD` | no       | --                      |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Subject and HTML body of a template filled with `context`.
///
/// The subject is plain text; values in the body are HTML-escaped.
pub fn compose(template: &EmailTemplate, context: &HashMap<&str, String>) -> (String, String) {
    (
        render_text(&template.subject, context),
        render_html(&template.html_body, context),
    )
}

// ---------------------------------------------------------------------------
// Mailer
// ---------------------------------------------------------------------------

/// Sends HTML emails built from stored templates.
pub struct Mailer {
    from_address: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl Mailer {
    /// Build the STARTTLS transport. No connection is opened until the first
    /// send.
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            from_address: config.from_address.clone(),
            transport: builder.build(),
        })
    }

    pub async fn send_html(
        &self,
        to_email: &str,
        subject: String,
        html_body: String,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(self.from_address.parse()?)
            .to(to_email.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body)
            .map_err(|e| EmailError::Build(e.to_string()))?;

        self.transport.send(email).await?;
        Ok(())
    }

    /// Render the named template and send it to `to_email`.
    pub async fn send_template(
        &self,
        pool: &DbPool,
        to_email: &str,
        template_name: &str,
        context: &HashMap<&str, String>,
    ) -> Result<(), EmailError> {
        let template = EmailTemplateRepo::find_by_name(pool, template_name)
            .await?
            .ok_or_else(|| EmailError::TemplateNotFound(template_name.to_string()))?;

        let (subject, body) = compose(&template, context);
        self.send_html(to_email, subject, body).await?;

        tracing::info!(to = to_email, template = template_name, "Email sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
