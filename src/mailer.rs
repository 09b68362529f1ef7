//! Feedback notification dispatch over SMTP.

use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::error::NotificationError;
use crate::feedback::FeedbackDraft;

pub trait NotificationGateway: Send + Sync {
    fn send(&self, draft: &FeedbackDraft) -> Result<(), NotificationError>;
}

/// Mail configuration. The recipient and subject are fixed per deployment,
/// not per request.
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub credentials: Option<(String, String)>,
    pub from: String,
    pub to: String,
    pub subject: String,
}

impl MailSettings {
    pub fn from_env() -> Self {
        let var =
            |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.to_string());
        let credentials = match (std::env::var("SCA_SMTP_USER"), std::env::var("SCA_SMTP_PASS")) {
            (Ok(user), Ok(pass)) => Some((user, pass)),
            _ => None,
        };
        MailSettings {
            smtp_host: var("SCA_SMTP_HOST", "localhost"),
            smtp_port: var("SCA_SMTP_PORT", "25").parse().unwrap_or(25),
            credentials,
            from: var("SCA_MAIL_FROM", "sca-dashboard@localhost"),
            to: var("SCA_MAIL_TO", "sca-dashboard@localhost"),
            subject: var("SCA_MAIL_SUBJECT", "SCA Feedback System"),
        }
    }
}

pub struct SmtpNotifier {
    smtp: SmtpTransport,
    settings: MailSettings,
}

impl SmtpNotifier {
    pub fn new(settings: MailSettings) -> Self {
        // Internal relays typically speak plain SMTP; credentials switch the
        // transport to authenticated mode.
        let mut builder = SmtpTransport::builder_dangerous(settings.smtp_host.as_str())
            .port(settings.smtp_port)
            .timeout(Some(Duration::from_secs(10)));
        if let Some((user, pass)) = &settings.credentials {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        SmtpNotifier {
            smtp: builder.build(),
            settings,
        }
    }
}

impl NotificationGateway for SmtpNotifier {
    fn send(&self, draft: &FeedbackDraft) -> Result<(), NotificationError> {
        let fail = NotificationError;
        let addr_fail = |e: lettre::address::AddressError| NotificationError(e.to_string());

        let body = format!(
            "<hr>\n\
             <strong>WWID: {}</strong>\n<br>\n\
             <strong>Issue: {}</strong>\n<br>\n\
             <strong>Comment:</strong> {}\n<br>\n\
             <em>{}</em>\n\
             <hr>",
            draft.wwid,
            draft.reason,
            draft.comment,
            chrono::Local::now().to_rfc2822(),
        );

        let email = Message::builder()
            .from(self.settings.from.parse().map_err(addr_fail)?)
            .to(self.settings.to.parse().map_err(addr_fail)?)
            .subject(self.settings.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(body)
            .map_err(|e| fail(e.to_string()))?;

        self.smtp.send(&email).map_err(|e| fail(e.to_string()))?;
        Ok(())
    }
}
