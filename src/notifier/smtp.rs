use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use crate::config::{MailConfig, SmtpConfig};
use crate::error::AppError;

use super::{templates, EmailMessage, Notifier, SignatureEmail, TeacherSignatureEmail};

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_email: String,
    from_name: String,
}

impl SmtpNotifier {
    pub fn new(config: &MailConfig, smtp: &SmtpConfig) -> Result<Self, AppError> {
        let creds = Credentials::new(smtp.username.clone(), smtp.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
            .map_err(|e| AppError::Config(format!("Failed to create SMTP transport: {}", e)))?
            .port(smtp.port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport,
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
        })
    }

    async fn send(&self, message: EmailMessage) -> Result<(), AppError> {
        let from_address = format!("{} <{}>", self.from_name, self.from_email);

        let email = Message::builder()
            .from(
                from_address
                    .parse()
                    .map_err(|e| AppError::Notifier(format!("Invalid from address: {}", e)))?,
            )
            .to(message
                .to
                .parse()
                .map_err(|e| AppError::Notifier(format!("Invalid to address: {}", e)))?)
            .subject(&message.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(message.body_text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(message.body_html),
                    ),
            )
            .map_err(|e| AppError::Notifier(format!("Failed to build email: {}", e)))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| AppError::Notifier(format!("Failed to send email via SMTP: {}", e)))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl Notifier for SmtpNotifier {
    async fn send_signature_email(&self, email: SignatureEmail) -> Result<(), AppError> {
        self.send(templates::signature_request(&email)).await
    }

    async fn send_teacher_signature_request_email(
        &self,
        email: TeacherSignatureEmail,
    ) -> Result<(), AppError> {
        self.send(templates::teacher_signature_request(&email)).await
    }
}
