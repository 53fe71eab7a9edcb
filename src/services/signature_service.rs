use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use futures::future::join_all;
use sea_orm::*;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::dto::RecipientInfo;
use crate::models::signature_token::RecipientKind;
use crate::models::{attendance, classroom, session, signature_token, student, users};
use crate::notifier::{DynNotifier, SessionDetails, SignatureEmail, TeacherSignatureEmail};

const MAX_PENDING_SESSIONS: u64 = 20;

pub struct SignatureService {
    db: DatabaseConnection,
    notifier: DynNotifier,
    base_url: String,
    timezone: Tz,
    token_ttl: Duration,
}

/// Résultat d'un envoi groupé: seuls les compteurs remontent à l'appelant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssueOutcome {
    pub issued: usize,
    pub sent_count: usize,
    pub failed_count: usize,
}

impl IssueOutcome {
    pub fn ensure_all_sent(&self) -> Result<(), AppError> {
        if self.failed_count > 0 {
            return Err(AppError::PartialSendFailure {
                sent: self.sent_count,
                failed: self.failed_count,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct TeacherIssueOutcome {
    pub token: signature_token::Model,
    pub reused: bool,
}

/// Token valide et ce qu'il autorise à signer
#[derive(Debug, Clone)]
pub struct ValidatedToken {
    pub token: signature_token::Model,
    pub session: session::Model,
    pub classroom: classroom::Model,
    pub recipient: RecipientInfo,
}

impl SignatureService {
    pub fn new(db: DatabaseConnection, notifier: DynNotifier, config: &AppConfig) -> Self {
        Self {
            db,
            notifier,
            base_url: config.base_url.clone(),
            timezone: config.timezone,
            token_ttl: config.token_ttl(),
        }
    }

    /// Envoie une demande d'émargement à chaque étudiant.
    /// Les anciens tokens du couple (session, étudiant) sont remplacés.
    pub async fn issue_for_recipients(
        &self,
        session_id: i32,
        student_ids: &[i32],
    ) -> Result<IssueOutcome, AppError> {
        let (session, classroom) = load_session(&self.db, session_id).await?;

        let mut ids = student_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        // 1. Vérifier que tous les étudiants appartiennent à l'organisation
        let students = student::Entity::find()
            .filter(student::Column::Id.is_in(ids.clone()))
            .filter(student::Column::OrganizationId.eq(classroom.organization_id))
            .order_by_asc(student::Column::Id)
            .all(&self.db)
            .await?;

        if students.len() != ids.len() {
            let missing: Vec<i32> = ids
                .iter()
                .copied()
                .filter(|id| !students.iter().any(|s| s.id == *id))
                .collect();
            return Err(AppError::NotFound(format!("Students {:?}", missing)));
        }

        // 2. Remplacer les tokens, un couple à la fois
        let now = Utc::now();
        let mut issued = Vec::with_capacity(students.len());
        for student in students {
            let token = self
                .reissue(session.id, RecipientKind::Student, student.id, now)
                .await?;
            issued.push((student, token));
        }

        // 3. Envois en parallèle, attendus ensemble
        let details = session_details(&session, &classroom, self.timezone);
        let sends = issued.iter().map(|(student, token)| {
            self.send_student_email(classroom.organization_id, student, token, &details)
        });
        let results = join_all(sends).await;

        let sent_count = results.iter().filter(|sent| **sent).count();
        let outcome = IssueOutcome {
            issued: issued.len(),
            sent_count,
            failed_count: issued.len() - sent_count,
        };

        tracing::info!(
            session_id,
            issued = outcome.issued,
            sent = outcome.sent_count,
            failed = outcome.failed_count,
            "signature requests issued"
        );

        Ok(outcome)
    }

    /// Variante formateur: réutilise un token encore utilisable s'il existe
    pub async fn issue_for_single_recipient(
        &self,
        session_id: i32,
        teacher_id: i32,
    ) -> Result<TeacherIssueOutcome, AppError> {
        let (session, classroom) = load_session(&self.db, session_id).await?;

        let teacher = users::Entity::find_by_id(teacher_id)
            .filter(users::Column::OrganizationId.eq(classroom.organization_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Teacher {}", teacher_id)))?;

        let now = Utc::now();
        let existing = signature_token::Entity::find()
            .filter(pair_condition(session.id, RecipientKind::Teacher, teacher.id))
            .filter(signature_token::Column::UsedAt.is_null())
            .order_by_desc(signature_token::Column::ExpiresAt)
            .all(&self.db)
            .await?
            .into_iter()
            .find(|token| token.is_usable(now));

        let (token, reused) = match existing {
            Some(token) => (token, true),
            None => {
                let token = new_token(session.id, RecipientKind::Teacher, teacher.id, now, self.token_ttl)
                    .insert(&self.db)
                    .await?;
                (token, false)
            }
        };

        // Autres sessions du formateur qui attendent encore sa signature
        let pending = session::Entity::find()
            .find_also_related(classroom::Entity)
            .filter(session::Column::TeacherId.eq(teacher.id))
            .filter(session::Column::TeacherSignature.is_null())
            .filter(session::Column::Id.ne(session.id))
            .order_by_asc(session::Column::StartTime)
            .limit(MAX_PENDING_SESSIONS)
            .all(&self.db)
            .await?;

        let pending_sessions = pending
            .iter()
            .filter_map(|(s, c)| c.as_ref().map(|c| session_details(s, c, self.timezone)))
            .collect();

        let email = TeacherSignatureEmail {
            organization_id: classroom.organization_id,
            recipient_email: teacher.email.clone(),
            recipient_name: teacher.name.clone(),
            signature_url: self.signature_url(RecipientKind::Teacher, &token.token),
            session: session_details(&session, &classroom, self.timezone),
            pending_sessions,
        };

        self.notifier.send_teacher_signature_request_email(email).await?;
        let token = self.mark_email_sent(token).await?;

        tracing::info!(session_id, teacher_id, reused, "teacher signature requested");

        Ok(TeacherIssueOutcome { token, reused })
    }

    pub async fn validate(&self, token: &str) -> Result<ValidatedToken, AppError> {
        validate_with(&self.db, token, Utc::now()).await
    }

    /// Consomme le token: exactement une fois, signature et used_at dans la même transaction
    pub async fn consume(&self, token: &str, payload: &str) -> Result<ValidatedToken, AppError> {
        validate_signature_payload(payload)?;

        let now = Utc::now();
        let txn = self.db.begin().await?;

        let validated = validate_with(&txn, token, now).await?;

        let claimed = signature_token::Entity::update_many()
            .set(signature_token::ActiveModel {
                used_at: Set(Some(now)),
                ..Default::default()
            })
            .filter(signature_token::Column::Id.eq(validated.token.id))
            .filter(signature_token::Column::UsedAt.is_null())
            .exec(&txn)
            .await?;

        if claimed.rows_affected != 1 {
            txn.rollback().await?;
            return Err(AppError::AlreadyUsed);
        }

        match validated.recipient.kind {
            RecipientKind::Student => {
                store_attendance_signature(&txn, validated.session.id, validated.recipient.id, payload, now).await?;
            }
            RecipientKind::Teacher => {
                let mut active: session::ActiveModel = validated.session.clone().into();
                active.teacher_signature = Set(Some(payload.to_string()));
                active.teacher_signed_at = Set(Some(now));
                active.teacher_id = Set(Some(validated.recipient.id));
                active.update(&txn).await?;
            }
        }

        txn.commit().await?;

        tracing::info!(
            session_id = validated.session.id,
            recipient_id = validated.recipient.id,
            kind = ?validated.recipient.kind,
            "signature recorded"
        );

        Ok(validated)
    }

    /// Après suppression d'un émargement: le destinataire peut re-signer sans nouvel email
    pub async fn invalidate_for_removal(
        &self,
        session_id: i32,
        kind: RecipientKind,
        recipient_id: i32,
    ) -> Result<u64, AppError> {
        reset_tokens(&self.db, session_id, kind, recipient_id, Utc::now() + self.token_ttl).await
    }

    async fn reissue(
        &self,
        session_id: i32,
        kind: RecipientKind,
        recipient_id: i32,
        now: DateTime<Utc>,
    ) -> Result<signature_token::Model, AppError> {
        let txn = self.db.begin().await?;

        // Sérialise les émissions concurrentes pour la même session
        lock_session(&txn, session_id).await?;

        signature_token::Entity::delete_many()
            .filter(pair_condition(session_id, kind, recipient_id))
            .exec(&txn)
            .await?;

        let token = new_token(session_id, kind, recipient_id, now, self.token_ttl)
            .insert(&txn)
            .await?;

        txn.commit().await?;
        Ok(token)
    }

    async fn send_student_email(
        &self,
        organization_id: i32,
        student: &student::Model,
        token: &signature_token::Model,
        details: &SessionDetails,
    ) -> bool {
        let Some(recipient_email) = student.email.clone() else {
            tracing::warn!(student_id = student.id, "student has no email, signature request not sent");
            return false;
        };

        let email = SignatureEmail {
            organization_id,
            recipient_email,
            recipient_name: student.full_name(),
            signature_url: self.signature_url(RecipientKind::Student, &token.token),
            session: details.clone(),
        };

        if let Err(e) = self.notifier.send_signature_email(email).await {
            tracing::warn!(student_id = student.id, session_id = token.session_id, "signature email failed: {}", e);
            return false;
        }

        if let Err(e) = self.mark_email_sent(token.clone()).await {
            tracing::error!(token_id = token.id, "failed to record email send: {}", e);
        }

        true
    }

    async fn mark_email_sent(&self, token: signature_token::Model) -> Result<signature_token::Model, AppError> {
        let mut active: signature_token::ActiveModel = token.into();
        active.email_sent_at = Set(Some(Utc::now()));
        Ok(active.update(&self.db).await?)
    }

    fn signature_url(&self, kind: RecipientKind, token: &str) -> String {
        match kind {
            RecipientKind::Student => format!("{}/sign/{}", self.base_url, token),
            RecipientKind::Teacher => format!("{}/teacher-sign/{}", self.base_url, token),
        }
    }
}

/// Remet used_at à NULL et repousse l'expiration de tous les tokens du couple
pub async fn reset_tokens<C: ConnectionTrait>(
    conn: &C,
    session_id: i32,
    kind: RecipientKind,
    recipient_id: i32,
    expires_at: DateTime<Utc>,
) -> Result<u64, AppError> {
    let result = signature_token::Entity::update_many()
        .set(signature_token::ActiveModel {
            used_at: Set(None),
            expires_at: Set(expires_at),
            ..Default::default()
        })
        .filter(pair_condition(session_id, kind, recipient_id))
        .exec(conn)
        .await?;

    tracing::debug!(session_id, recipient_id, reset = result.rows_affected, "signature tokens reset");
    Ok(result.rows_affected)
}

/// Attend une data URL d'image: "data:image/png;base64,...."
pub fn validate_signature_payload(payload: &str) -> Result<(), AppError> {
    let (header, data) = payload
        .split_once(',')
        .ok_or_else(|| AppError::InvalidPayload("expected a data URL".to_string()))?;

    if !header.starts_with("data:image/") || !header.ends_with(";base64") {
        return Err(AppError::InvalidPayload("expected a base64 image data URL".to_string()));
    }

    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|e| AppError::InvalidPayload(format!("invalid base64: {}", e)))?;

    if bytes.is_empty() {
        return Err(AppError::InvalidPayload("empty signature".to_string()));
    }

    Ok(())
}

pub fn session_details(session: &session::Model, classroom: &classroom::Model, tz: Tz) -> SessionDetails {
    SessionDetails {
        title: session.title.clone(),
        classroom_name: classroom.name.clone(),
        starts_at: session.start_time.with_timezone(&tz),
        ends_at: session.end_time.with_timezone(&tz),
    }
}

fn pair_condition(session_id: i32, kind: RecipientKind, recipient_id: i32) -> Condition {
    Condition::all()
        .add(signature_token::Column::SessionId.eq(session_id))
        .add(signature_token::Column::RecipientKind.eq(kind))
        .add(signature_token::Column::RecipientId.eq(recipient_id))
}

fn new_token(
    session_id: i32,
    kind: RecipientKind,
    recipient_id: i32,
    now: DateTime<Utc>,
    ttl: Duration,
) -> signature_token::ActiveModel {
    signature_token::ActiveModel {
        token: Set(Uuid::new_v4().simple().to_string()),
        session_id: Set(session_id),
        recipient_kind: Set(kind),
        recipient_id: Set(recipient_id),
        expires_at: Set(now + ttl),
        used_at: Set(None),
        email_sent_at: Set(None),
        created_at: Set(now),
        ..Default::default()
    }
}

async fn load_session<C: ConnectionTrait>(
    conn: &C,
    session_id: i32,
) -> Result<(session::Model, classroom::Model), AppError> {
    session::Entity::find_by_id(session_id)
        .find_also_related(classroom::Entity)
        .one(conn)
        .await?
        .and_then(|(s, c)| c.map(|c| (s, c)))
        .ok_or_else(|| AppError::NotFound(format!("Session {}", session_id)))
}

async fn lock_session<C: ConnectionTrait>(conn: &C, session_id: i32) -> Result<session::Model, AppError> {
    let mut query = session::Entity::find_by_id(session_id);
    if conn.get_database_backend() == DbBackend::Postgres {
        query = query.lock_exclusive();
    }

    query
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Session {}", session_id)))
}

async fn validate_with<C: ConnectionTrait>(
    conn: &C,
    token: &str,
    now: DateTime<Utc>,
) -> Result<ValidatedToken, AppError> {
    let record = signature_token::Entity::find()
        .filter(signature_token::Column::Token.eq(token))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Signature token".to_string()))?;

    // L'expiration prime sur l'usage
    if record.is_expired(now) {
        return Err(AppError::Expired);
    }
    if record.used_at.is_some() {
        return Err(AppError::AlreadyUsed);
    }

    let (session, classroom) = load_session(conn, record.session_id).await?;

    let name = match record.recipient_kind {
        RecipientKind::Student => student::Entity::find_by_id(record.recipient_id)
            .one(conn)
            .await?
            .map(|s| s.full_name()),
        RecipientKind::Teacher => users::Entity::find_by_id(record.recipient_id)
            .one(conn)
            .await?
            .map(|u| u.name),
    }
    .ok_or_else(|| AppError::NotFound("Signature recipient".to_string()))?;

    Ok(ValidatedToken {
        recipient: RecipientInfo {
            kind: record.recipient_kind,
            id: record.recipient_id,
            name,
        },
        token: record,
        session,
        classroom,
    })
}

async fn store_attendance_signature<C: ConnectionTrait>(
    conn: &C,
    session_id: i32,
    student_id: i32,
    payload: &str,
    now: DateTime<Utc>,
) -> Result<attendance::Model, AppError> {
    let existing = attendance::Entity::find()
        .filter(attendance::Column::SessionId.eq(session_id))
        .filter(attendance::Column::StudentId.eq(student_id))
        .one(conn)
        .await?;

    let record = match existing {
        Some(record) => {
            let mut active: attendance::ActiveModel = record.into();
            active.signature = Set(Some(payload.to_string()));
            active.signed_at = Set(Some(now));
            active.update(conn).await?
        }
        None => {
            attendance::ActiveModel {
                session_id: Set(session_id),
                student_id: Set(student_id),
                signature: Set(Some(payload.to_string())),
                signed_at: Set(Some(now)),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(conn)
            .await?
        }
    };

    Ok(record)
}
