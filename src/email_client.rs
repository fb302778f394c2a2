use lettre::address::AddressError;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::{ExposeSecret, Secret};
use std::time;

use crate::domain::subscriber_email::SubscriberEmail;
use crate::error_chain_fmt;
use crate::render::RenderedContent;

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);
// Port where the relay speaks TLS from the first byte.
const SMTPS_PORT: u16 = 465;
// Status reported when the relay never answered with a reply code.
const TRANSPORT_FAILURE_STATUS: u16 = 500;

pub struct EmailClient {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    timeout: time::Duration,
}

/// Result of a send. Failures are values, not errors: the dispatcher records them on the
/// issue and moves on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    Rejected { status: u16, body: String },
}

#[derive(thiserror::Error)]
pub enum EmailClientError {
    #[error("Sender address is not a valid mailbox.")]
    InvalidSender(#[from] AddressError),
    #[error("Failed to set up TLS for the SMTP relay.")]
    Tls(#[from] lettre::transport::smtp::Error),
}

impl std::fmt::Debug for EmailClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(thiserror::Error, Debug)]
enum MessageError {
    #[error("Recipient address is not a valid mailbox.")]
    Recipient(#[from] AddressError),
    #[error("Failed to assemble the message.")]
    Build(#[from] lettre::error::Error),
}

impl EmailClient {
    pub fn new(
        host: &str,
        port: u16,
        username: String,
        password: Secret<String>,
        sender: SubscriberEmail,
        sender_name: String,
        timeout: Option<time::Duration>,
    ) -> Result<EmailClient, EmailClientError> {
        let tls_parameters = TlsParameters::new(host.to_string())?;
        // Any other port upgrades with STARTTLS when the relay offers it.
        let tls = if port == SMTPS_PORT {
            Tls::Wrapper(tls_parameters)
        } else {
            Tls::Opportunistic(tls_parameters)
        };
        let timeout = timeout.unwrap_or(REQUEST_TIMEOUT);

        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .tls(tls)
            .credentials(Credentials::new(
                username,
                password.expose_secret().to_string(),
            ))
            .timeout(Some(timeout))
            .build();

        Ok(EmailClient {
            transport,
            sender: Mailbox::new(Some(sender_name), sender.as_ref().parse()?),
            timeout,
        })
    }

    #[tracing::instrument(
        name = "Sending an email",
        skip(self, content),
        fields(recipient = %recipient, subject = %content.subject)
    )]
    pub async fn send_email(
        &self,
        recipient: &SubscriberEmail,
        content: &RenderedContent,
    ) -> SendOutcome {
        let message = match self.message(recipient, content) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!("Failed to build the email: {:?}", err);
                return SendOutcome::Rejected {
                    status: TRANSPORT_FAILURE_STATUS,
                    body: err.to_string(),
                };
            }
        };

        // The relay can accept the connection and then never greet us.
        match tokio::time::timeout(self.timeout, self.transport.send(message)).await {
            Ok(Ok(_)) => SendOutcome::Delivered,
            Ok(Err(err)) => {
                tracing::error!("The SMTP relay refused the email: {:?}", err);
                SendOutcome::Rejected {
                    status: err
                        .status()
                        .and_then(|code| code.to_string().parse().ok())
                        .unwrap_or(TRANSPORT_FAILURE_STATUS),
                    body: err.to_string(),
                }
            }
            Err(_) => {
                tracing::error!("The SMTP relay did not answer in time");
                SendOutcome::Rejected {
                    status: TRANSPORT_FAILURE_STATUS,
                    body: String::from("SMTP relay timed out"),
                }
            }
        }
    }

    fn message(
        &self,
        recipient: &SubscriberEmail,
        content: &RenderedContent,
    ) -> Result<Message, MessageError> {
        let message = Message::builder()
            .from(self.sender.clone())
            .to(Mailbox::new(None, recipient.as_ref().parse()?))
            .subject(content.subject.clone())
            // text/plain before text/html
            .multipart(MultiPart::alternative_plain_html(
                content.text.clone(),
                content.html.clone(),
            ))?;

        Ok(message)
    }
}
