use chrono::{Duration, Utc};
use sea_orm::*;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::attendance;
use crate::models::signature_token::RecipientKind;
use crate::services::signature_service;

pub struct AttendanceService {
    db: DatabaseConnection,
    token_ttl: Duration,
}

impl AttendanceService {
    pub fn new(db: DatabaseConnection, config: &AppConfig) -> Self {
        Self {
            db,
            token_ttl: config.token_ttl(),
        }
    }

    pub async fn list_attendances(&self, session_id: i32) -> Result<Vec<attendance::Model>, AppError> {
        Ok(attendance::Entity::find()
            .filter(attendance::Column::SessionId.eq(session_id))
            .order_by_asc(attendance::Column::StudentId)
            .all(&self.db)
            .await?)
    }

    /// Supprime l'émargement et rouvre le token de l'étudiant (même lien, re-signable)
    pub async fn remove_attendance(&self, session_id: i32, student_id: i32) -> Result<u64, AppError> {
        let txn = self.db.begin().await?;

        let record = attendance::Entity::find()
            .filter(attendance::Column::SessionId.eq(session_id))
            .filter(attendance::Column::StudentId.eq(student_id))
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attendance of student {} for session {}", student_id, session_id)))?;

        attendance::Entity::delete_by_id(record.id).exec(&txn).await?;

        let reset = signature_service::reset_tokens(
            &txn,
            session_id,
            RecipientKind::Student,
            student_id,
            Utc::now() + self.token_ttl,
        )
        .await?;

        txn.commit().await?;

        tracing::info!(session_id, student_id, tokens_reset = reset, "attendance removed");
        Ok(reset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::signature_token;
    use crate::services::signature_service::SignatureService;
    use crate::test_support::{self, SIGNATURE_PNG};

    #[tokio::test]
    async fn test_remove_attendance_reopens_token() {
        let db = test_support::setup_db().await;
        let config = test_support::test_config();
        let classroom = test_support::insert_classroom(&db, 1, "3B").await;
        let session = test_support::insert_session(&db, classroom.id, Utc::now()).await;
        let alice = test_support::insert_student(&db, 1, "Alice", Some("alice@example.com")).await;

        let signatures = SignatureService::new(db.clone(), test_support::recording_notifier(), &config);
        let attendances = AttendanceService::new(db.clone(), &config);

        signatures.issue_for_recipients(session.id, &[alice.id]).await.unwrap();
        let token = signature_token::Entity::find()
            .filter(signature_token::Column::SessionId.eq(session.id))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        signatures.consume(&token.token, SIGNATURE_PNG).await.unwrap();
        assert_eq!(attendances.list_attendances(session.id).await.unwrap().len(), 1);

        let reset = attendances.remove_attendance(session.id, alice.id).await.unwrap();
        assert_eq!(reset, 1);
        assert!(attendances.list_attendances(session.id).await.unwrap().is_empty());

        let reopened = signature_token::Entity::find_by_id(token.id).one(&db).await.unwrap().unwrap();
        assert!(reopened.used_at.is_none());
        let drift = Utc::now() + Duration::days(7) - reopened.expires_at;
        assert!(drift.num_seconds().abs() < 60);

        // Le même lien permet de signer à nouveau
        signatures.consume(&token.token, SIGNATURE_PNG).await.unwrap();
        assert_eq!(attendances.list_attendances(session.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_missing_attendance() {
        let db = test_support::setup_db().await;
        let config = test_support::test_config();
        let classroom = test_support::insert_classroom(&db, 1, "3B").await;
        let session = test_support::insert_session(&db, classroom.id, Utc::now()).await;

        let result = AttendanceService::new(db.clone(), &config)
            .remove_attendance(session.id, 42)
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
