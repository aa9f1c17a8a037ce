// src/services/notifications.rs
//
// Transactional email, best-effort. A failed send is logged and forgotten;
// it never rolls back or fails the mutation that triggered it.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;

use crate::models::lead::Lead;

#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from: String,
    /// Internal inbox notified about every new lead.
    pub internal_recipient: Option<String>,
}

/// Optional notifier; `None` when SMTP is not configured.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: String,
    internal_recipient: Option<String>,
}

impl Notifier {
    pub fn from_config(config: &SmtpConfig) -> Option<Self> {
        let builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host).ok()?;
        let builder = builder.port(config.port);
        let builder = if let (Some(user), Some(password)) = (&config.user, &config.password) {
            builder.credentials(Credentials::new(user.clone(), password.clone()))
        } else {
            builder
        };

        tracing::info!(host = %config.host, port = config.port, "SMTP notifier initialized");

        Some(Self {
            mailer: Arc::new(builder.build()),
            from: config.from.clone(),
            internal_recipient: config.internal_recipient.clone(),
        })
    }

    /// Confirmation to the requester + internal heads-up. Spawned by the
    /// caller; both sends swallow their own errors.
    pub async fn notify_lead_submitted(&self, lead: &Lead) {
        let confirmation_body = format!(
            "Bonjour {},\n\n\
             Nous avons bien reçu votre demande de raccordement pour le site :\n\
             {}, {} {}.\n\n\
             Un conseiller vous recontactera sous 48h ouvrées.\n\n\
             L'équipe raccordement",
            lead.full_name, lead.address, lead.postal_code, lead.city
        );
        self.send(&lead.email, "Votre demande de raccordement", &confirmation_body)
            .await;

        if let Some(internal) = &self.internal_recipient {
            let internal_body = format!(
                "New lead {}\n{} / {} / {}\nSite: {} {} ({:?})",
                lead.id,
                lead.full_name,
                lead.email,
                lead.phone,
                lead.postal_code,
                lead.city,
                lead.connection_type
            );
            self.send(internal, "New connection lead", &internal_body).await;
        }
    }

    async fn send(&self, to: &str, subject: &str, body: &str) {
        let Ok(to_addr) = to.parse::<Mailbox>() else {
            tracing::warn!(to = %to, "skipping email: invalid recipient address");
            return;
        };
        let Ok(from_addr) = self.from.parse::<Mailbox>() else {
            tracing::error!(from = %self.from, "skipping email: invalid sender address");
            return;
        };

        let message = Message::builder()
            .from(from_addr)
            .to(to_addr)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string());

        let message = match message {
            Ok(m) => m,
            Err(e) => {
                tracing::error!(error = %e, "failed to build email message");
                return;
            }
        };

        if let Err(e) = self.mailer.send(message).await {
            tracing::error!(to = %to, error = %e, "email send failed; ignoring");
        }
    }
}
