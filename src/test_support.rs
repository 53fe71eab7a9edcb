// Outils partagés par les tests: base SQLite en mémoire, fixtures, doubles
// pour le notifier et le limiteur de quotas.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

use crate::config::AppConfig;
use crate::db;
use crate::error::AppError;
use crate::models::session::{Recurrence, SessionType};
use crate::models::{classroom, session, student, users};
use crate::notifier::{Notifier, SignatureEmail, TeacherSignatureEmail};
use crate::services::quota::{QuotaLimiter, QuotaStatus, ResourceKind};

pub const JWT_SECRET: &str = "test-secret";

pub fn test_config() -> AppConfig {
    AppConfig::from_lookup(|key| match key {
        "DATABASE_URL" => Some("sqlite::memory:".to_string()),
        "JWT_SECRET" => Some(JWT_SECRET.to_string()),
        "APP_BASE_URL" => Some("https://app.test".to_string()),
        "APP_TIMEZONE" => Some("UTC".to_string()),
        _ => None,
    })
    .unwrap()
}

pub async fn setup_db() -> DatabaseConnection {
    let db = db::establish_connection("sqlite::memory:").await.unwrap();
    db::create_schema(&db).await.unwrap();
    db
}

pub async fn insert_classroom(db: &DatabaseConnection, organization_id: i32, name: &str) -> classroom::Model {
    classroom::ActiveModel {
        organization_id: Set(organization_id),
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_student(
    db: &DatabaseConnection,
    organization_id: i32,
    first_name: &str,
    email: Option<&str>,
) -> student::Model {
    student::ActiveModel {
        organization_id: Set(organization_id),
        first_name: Set(first_name.to_string()),
        last_name: Set("Martin".to_string()),
        email: Set(email.map(str::to_string)),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_teacher(db: &DatabaseConnection, organization_id: i32, name: &str, email: &str) -> users::Model {
    users::ActiveModel {
        organization_id: Set(organization_id),
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_session(db: &DatabaseConnection, classroom_id: i32, start: DateTime<Utc>) -> session::Model {
    session::ActiveModel {
        classroom_id: Set(classroom_id),
        title: Set("Algèbre".to_string()),
        session_type: Set(SessionType::Onsite),
        start_time: Set(start),
        end_time: Set(start + Duration::hours(2)),
        recurrence: Set(Recurrence::None),
        recurrence_count: Set(1),
        reminder_enabled: Set(false),
        video_conference_enabled: Set(false),
        teacher_id: Set(None),
        teacher_signature: Set(None),
        teacher_signed_at: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn assign_teacher(db: &DatabaseConnection, session: &session::Model, teacher_id: i32) -> session::Model {
    let mut active: session::ActiveModel = session.clone().into();
    active.teacher_id = Set(Some(teacher_id));
    active.update(db).await.unwrap()
}

#[derive(Debug, Clone)]
pub enum SentEmail {
    Student(SignatureEmail),
    Teacher(TeacherSignatureEmail),
}

impl SentEmail {
    pub fn recipient(&self) -> &str {
        match self {
            SentEmail::Student(email) => &email.recipient_email,
            SentEmail::Teacher(email) => &email.recipient_email,
        }
    }
}

/// Enregistre les emails envoyés; échoue pour les adresses de `failing`
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<SentEmail>>,
    pub failing: HashSet<String>,
}

impl RecordingNotifier {
    pub fn failing_for(addresses: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: addresses.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    fn record(&self, email: SentEmail) -> Result<(), AppError> {
        if self.failing.contains(email.recipient()) {
            return Err(AppError::Notifier(format!("mailbox unavailable: {}", email.recipient())));
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send_signature_email(&self, email: SignatureEmail) -> Result<(), AppError> {
        self.record(SentEmail::Student(email))
    }

    async fn send_teacher_signature_request_email(
        &self,
        email: TeacherSignatureEmail,
    ) -> Result<(), AppError> {
        self.record(SentEmail::Teacher(email))
    }
}

pub fn recording_notifier() -> Arc<RecordingNotifier> {
    Arc::new(RecordingNotifier::default())
}

/// Limiteur à valeurs fixes
pub struct FixedLimiter {
    pub current: u64,
    pub limit: Option<u64>,
}

#[async_trait::async_trait]
impl QuotaLimiter for FixedLimiter {
    async fn check_limit(&self, _organization_id: i32, _kind: ResourceKind) -> Result<QuotaStatus, AppError> {
        Ok(QuotaStatus::new(self.current, self.limit))
    }
}

pub const SIGNATURE_PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";
