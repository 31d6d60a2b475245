use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use offerbox_core::{
    config::{Config, MailConfig},
    lead::Offer,
    notify::{offer_html, offer_subject, OfferNotifier},
};

/// Sends offer notifications through an authenticated SMTP relay.
pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Address,
    to: Mailbox,
}

impl SmtpNotifier {
    /// Port 465 uses implicit TLS; any other port upgrades with STARTTLS.
    pub fn new(cfg: &MailConfig, timeout: Duration) -> anyhow::Result<Self> {
        let from: Address = cfg
            .username
            .parse()
            .with_context(|| format!("invalid mail account {:?}", cfg.username))?;
        let to: Mailbox = cfg
            .notify_to
            .parse()
            .with_context(|| format!("invalid notification recipient {:?}", cfg.notify_to))?;

        let builder = if cfg.smtp_port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.smtp_host)?
        };
        let mailer = builder
            .port(cfg.smtp_port)
            .credentials(Credentials::new(
                cfg.username.clone(),
                cfg.password.clone(),
            ))
            .timeout(Some(timeout))
            .build();

        Ok(Self { mailer, from, to })
    }

    /// Build the notification without sending it.
    pub fn build_message(&self, offer: &Offer) -> anyhow::Result<Message> {
        // Shown as coming from the person who made the offer, sent from our account.
        let display_name = offer
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        let mut builder = Message::builder()
            .from(Mailbox::new(display_name, self.from.clone()))
            .to(self.to.clone())
            .subject(offer_subject(offer));
        if let Some(reply_to) = offer
            .email
            .as_deref()
            .and_then(|e| e.trim().parse::<Mailbox>().ok())
        {
            builder = builder.reply_to(reply_to);
        }
        let message = builder
            .header(ContentType::TEXT_HTML)
            .body(offer_html(offer))?;
        Ok(message)
    }
}

#[async_trait]
impl OfferNotifier for SmtpNotifier {
    async fn notify_offer(&self, offer: &Offer) -> anyhow::Result<()> {
        let message = self.build_message(offer)?;
        self.mailer
            .send(message)
            .await
            .context("smtp send failed")?;
        info!(
            offer_id = offer.id,
            visitor_number = offer.visitor_number,
            "Offer notification sent"
        );
        Ok(())
    }
}

/// Logs notifications instead of sending them (`OFFERBOX_SMTP_NOOP=true`).
pub struct NoopNotifier;

#[async_trait]
impl OfferNotifier for NoopNotifier {
    async fn notify_offer(&self, offer: &Offer) -> anyhow::Result<()> {
        info!(
            offer_id = offer.id,
            subject = %offer_subject(offer),
            "SMTP noop transport enabled; notification not dispatched"
        );
        Ok(())
    }
}

/// Pick the mail gateway for this configuration. `Ok(None)` means mail is
/// not configured and the offer route answers "configuration incomplete".
pub fn notifier_from_config(cfg: &Config) -> anyhow::Result<Option<Arc<dyn OfferNotifier>>> {
    if cfg.smtp_noop {
        return Ok(Some(Arc::new(NoopNotifier)));
    }
    match &cfg.mail {
        Some(mail) => Ok(Some(Arc::new(SmtpNotifier::new(
            mail,
            cfg.outbound_timeout(),
        )?))),
        None => Ok(None),
    }
}
