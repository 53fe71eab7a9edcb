use crate::error::AppError;

use super::{templates, Notifier, SignatureEmail, TeacherSignatureEmail};

/// Notifier de développement: rien n'est envoyé, tout est logué
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send_signature_email(&self, email: SignatureEmail) -> Result<(), AppError> {
        let message = templates::signature_request(&email);
        tracing::info!(
            org_id = email.organization_id,
            to = %message.to,
            url = %email.signature_url,
            "signature email (not sent): {}",
            message.subject
        );
        Ok(())
    }

    async fn send_teacher_signature_request_email(
        &self,
        email: TeacherSignatureEmail,
    ) -> Result<(), AppError> {
        let message = templates::teacher_signature_request(&email);
        tracing::info!(
            org_id = email.organization_id,
            to = %message.to,
            url = %email.signature_url,
            pending = email.pending_sessions.len(),
            "teacher signature email (not sent): {}",
            message.subject
        );
        Ok(())
    }
}
