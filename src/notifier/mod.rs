use std::sync::Arc;

use chrono::DateTime;
use chrono_tz::Tz;

use crate::config::MailConfig;
use crate::error::AppError;

mod logging;
mod smtp;
pub mod templates;

pub use logging::LogNotifier;
pub use smtp::SmtpNotifier;

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body_html: String,
    pub body_text: String,
}

/// Résumé d'une session tel qu'affiché dans les emails (heures locales)
#[derive(Debug, Clone)]
pub struct SessionDetails {
    pub title: String,
    pub classroom_name: String,
    pub starts_at: DateTime<Tz>,
    pub ends_at: DateTime<Tz>,
}

#[derive(Debug, Clone)]
pub struct SignatureEmail {
    pub organization_id: i32,
    pub recipient_email: String,
    pub recipient_name: String,
    pub signature_url: String,
    pub session: SessionDetails,
}

#[derive(Debug, Clone)]
pub struct TeacherSignatureEmail {
    pub organization_id: i32,
    pub recipient_email: String,
    pub recipient_name: String,
    pub signature_url: String,
    pub session: SessionDetails,
    pub pending_sessions: Vec<SessionDetails>, // autres sessions du formateur encore à signer
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send_signature_email(&self, email: SignatureEmail) -> Result<(), AppError>;

    async fn send_teacher_signature_request_email(
        &self,
        email: TeacherSignatureEmail,
    ) -> Result<(), AppError>;
}

pub type DynNotifier = Arc<dyn Notifier>;

/// SMTP si configuré, sinon les emails sont seulement logués
pub fn create_notifier(config: &MailConfig) -> Result<DynNotifier, AppError> {
    match &config.smtp {
        Some(smtp) => {
            let notifier = SmtpNotifier::new(config, smtp)?;
            tracing::info!(host = %smtp.host, "SMTP notifier initialized");
            Ok(Arc::new(notifier))
        }
        None => {
            tracing::warn!("SMTP_HOST not set, signature emails will only be logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}
