use std::fmt;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use engine_logging::{engine_info, mask_address};
use lettre::message::header::{ContentType, Header, HeaderName, HeaderValue};
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use crate::config::MailSettings;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error(
        "missing mail settings: {} (set emailFrom, emailFromPass and emailTo in the service environment)",
        .missing.join(", ")
    )]
    Configuration { missing: Vec<&'static str> },
    #[error("invalid mail address {value:?}: {reason}")]
    Address { value: String, reason: String },
    #[error("cannot read attachment {path:?}: {source}")]
    Attachment {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot build message: {0}")]
    Message(String),
    #[error("mail transport failed: {0}")]
    Transport(String),
    #[error("message task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Sends a converted package to the destination mailbox.
#[async_trait::async_trait]
pub trait Deliverer: Send + Sync {
    async fn deliver(&self, file: &Path) -> Result<(), DeliveryError>;
}

/// The three settings every delivery needs.
#[derive(Clone, Copy)]
pub struct MailCredentials<'a> {
    pub from: &'a str,
    pub password: &'a str,
    pub to: &'a str,
}

impl MailSettings {
    /// Sender, password and recipient, or every missing setting name.
    pub fn credentials(&self) -> Result<MailCredentials<'_>, DeliveryError> {
        let mut missing = Vec::new();
        if self.from.is_none() {
            missing.push("emailFrom");
        }
        if self.password.is_none() {
            missing.push("emailFromPass");
        }
        if self.to.is_none() {
            missing.push("emailTo");
        }
        match (&self.from, &self.password, &self.to) {
            (Some(from), Some(password), Some(to)) => Ok(MailCredentials { from, password, to }),
            _ => Err(DeliveryError::Configuration { missing }),
        }
    }
}

/// Delivers over SMTP submission with STARTTLS and password auth.
#[derive(Debug, Clone)]
pub struct SmtpDeliverer {
    settings: MailSettings,
}

impl SmtpDeliverer {
    pub fn new(settings: MailSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl Deliverer for SmtpDeliverer {
    async fn deliver(&self, file: &Path) -> Result<(), DeliveryError> {
        let credentials = self.settings.credentials()?;
        let settings = self.settings.clone();
        let attachment = file.to_path_buf();
        let message =
            tokio::task::spawn_blocking(move || build_message(&settings, &attachment)).await??;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.settings.smtp_host)
            .map_err(|err| DeliveryError::Transport(err.to_string()))?
            .port(self.settings.smtp_port)
            .credentials(Credentials::new(
                credentials.from.to_string(),
                credentials.password.to_string(),
            ))
            .build();

        transport
            .send(message)
            .await
            .map_err(|err| DeliveryError::Transport(err.to_string()))?;

        engine_info!(
            "Delivered {:?} to {} via {}:{}",
            file.file_name().unwrap_or_default(),
            mask_address(credentials.to),
            self.settings.smtp_host,
            self.settings.smtp_port
        );
        Ok(())
    }
}

/// Builds the delivery message: fixed subject and body, one binary attachment.
pub fn build_message(settings: &MailSettings, file: &Path) -> Result<Message, DeliveryError> {
    let credentials = settings.credentials()?;
    let from = parse_mailbox(credentials.from)?;
    let to = parse_mailbox(credentials.to)?;

    let attachment_error = |source: io::Error| DeliveryError::Attachment {
        path: file.to_path_buf(),
        source,
    };
    let metadata = fs::metadata(file).map_err(attachment_error)?;
    let content = fs::read(file).map_err(attachment_error)?;

    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "package".to_string());
    let disposition = AttachmentDisposition::from_metadata(file_name, &metadata);
    let content_type = ContentType::parse("application/octet-stream")
        .map_err(|err| DeliveryError::Message(err.to_string()))?;

    let attachment = SinglePart::builder()
        .header(content_type)
        .header(disposition)
        .body(content);

    Message::builder()
        .from(from)
        .to(to)
        .subject(settings.subject.clone())
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(settings.body.clone()))
                .singlepart(attachment),
        )
        .map_err(|err| DeliveryError::Message(err.to_string()))
}

fn parse_mailbox(value: &str) -> Result<Mailbox, DeliveryError> {
    value.parse().map_err(|err: lettre::address::AddressError| DeliveryError::Address {
        value: value.to_string(),
        reason: err.to_string(),
    })
}

/// `Content-Disposition` carrying the RFC 2183 date parameters of the attached file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AttachmentDisposition {
    file_name: String,
    created: DateTime<Local>,
    modified: DateTime<Local>,
    read: DateTime<Local>,
}

impl AttachmentDisposition {
    fn from_metadata(file_name: String, metadata: &Metadata) -> Self {
        let modified = metadata.modified().unwrap_or_else(|_| SystemTime::now());
        // Not every filesystem records creation time.
        let created = metadata.created().unwrap_or(modified);
        let read = metadata.accessed().unwrap_or(modified);
        Self {
            file_name,
            created: created.into(),
            modified: modified.into(),
            read: read.into(),
        }
    }
}

impl fmt::Display for AttachmentDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.file_name.replace(&['\\', '"'][..], "-");
        write!(
            f,
            "attachment; filename=\"{name}\"; creation-date=\"{}\"; modification-date=\"{}\"; read-date=\"{}\"",
            self.created.to_rfc2822(),
            self.modified.to_rfc2822(),
            self.read.to_rfc2822()
        )
    }
}

impl Header for AttachmentDisposition {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("Content-Disposition")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Err(format!("parsing attachment disposition {s:?} is not supported").into())
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.to_string())
    }
}
