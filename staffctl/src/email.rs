//! E-mail delivery of password reset links.
//!
//! [`EmailService`] is the production [`Notifier`]. It sends through SMTP, or writes `.eml` files
//! into a directory when `email.transport.type` is `file`, which is what local setups and tests use.

use lettre::{
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::{path::Path, time::Duration};
use tracing::{debug, warn};

use crate::{
    config::{Config, EmailTransportConfig},
    errors::Error,
    notifications::{Notifier, PasswordResetRequested},
};

pub struct EmailService {
    transport: EmailTransport,
    from: Mailbox,
    reply_to: Option<Mailbox>,
    token_duration: Duration,
}

enum EmailTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

fn mailbox(name: Option<&str>, address: &str, what: &str) -> Result<Mailbox, Error> {
    let raw = match name {
        Some(name) => format!("{name} <{address}>"),
        None => address.to_string(),
    };
    raw.parse::<Mailbox>().map_err(|e| Error::Internal {
        operation: format!("parse {what} address: {e}"),
    })
}

impl EmailService {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let email = &config.email;

        let transport = match &email.transport {
            EmailTransportConfig::Smtp {
                host,
                port,
                username,
                password,
                use_tls,
            } => {
                let builder = if *use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).map_err(|e| Error::Internal {
                        operation: format!("create SMTP transport: {e}"),
                    })?
                } else {
                    warn!(host = %host, "SMTP without TLS; reset links travel in clear text");
                    AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
                };

                EmailTransport::Smtp(
                    builder
                        .port(*port)
                        .credentials(Credentials::new(username.clone(), password.clone()))
                        .build(),
                )
            }
            EmailTransportConfig::File { path } => {
                let dir = Path::new(path);
                std::fs::create_dir_all(dir).map_err(|e| Error::Internal {
                    operation: format!("create emails directory {path}: {e}"),
                })?;
                debug!(path = %path, "Writing e-mails to files");
                EmailTransport::File(AsyncFileTransport::<Tokio1Executor>::new(dir))
            }
        };

        let reply_to = email.reply_to.as_deref().map(|r| mailbox(None, r, "reply-to")).transpose()?;

        Ok(Self {
            transport,
            from: mailbox(Some(&email.from_name), &email.from_email, "sender")?,
            reply_to,
            token_duration: config.auth.password_reset.token_duration,
        })
    }

    fn reset_message(&self, event: &PasswordResetRequested) -> Result<Message, Error> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(mailbox(Some(&event.name), &event.email, "recipient")?)
            .subject(&event.subject)
            .header(ContentType::TEXT_HTML);
        if let Some(reply_to) = &self.reply_to {
            builder = builder.reply_to(reply_to.clone());
        }

        builder
            .body(self.create_password_reset_body(Some(&event.name), &event.reset_url))
            .map_err(|e| Error::Internal {
                operation: format!("build reset e-mail: {e}"),
            })
    }

    async fn deliver(&self, message: Message) -> Result<(), Error> {
        let result = match &self.transport {
            EmailTransport::Smtp(smtp) => smtp.send(message).await.map(drop).map_err(|e| e.to_string()),
            EmailTransport::File(file) => file.send(message).await.map(drop).map_err(|e| e.to_string()),
        };

        result.map_err(|e| Error::Internal {
            operation: format!("send e-mail: {e}"),
        })
    }

    fn create_password_reset_body(&self, to_name: Option<&str>, reset_link: &str) -> String {
        let greeting = match to_name {
            Some(name) => format!("Hello {name},"),
            None => "Hello,".to_string(),
        };
        let expiry = describe_duration(self.token_duration);

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Set your password</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <p>{greeting}</p>
        <p>An account has been set up for you. Choose a password to start using it. If you weren't expecting this e-mail, you can ignore it.</p>
        <p><a href="{reset_link}">Reset your password</a></p>
        <p>If the link does not open, paste this address into your browser:<br>{reset_link}</p>
        <p style="font-size: 12px; color: #666;">The link works once and expires in {expiry}. This message was sent automatically, replies are not read.</p>
    </div>
</body>
</html>"#
        )
    }
}

#[async_trait::async_trait]
impl Notifier for EmailService {
    async fn password_reset_requested(&self, event: &PasswordResetRequested) -> Result<(), Error> {
        let message = self.reset_message(event)?;
        self.deliver(message).await
    }
}

/// Whole hours when the duration is a multiple of an hour, minutes otherwise
fn describe_duration(duration: Duration) -> String {
    let minutes = duration.as_secs() / 60;
    match minutes {
        m if m >= 60 && m % 60 == 0 => match m / 60 {
            1 => "1 hour".to_string(),
            hours => format!("{hours} hours"),
        },
        1 => "1 minute".to_string(),
        m => format!("{m} minutes"),
    }
}
