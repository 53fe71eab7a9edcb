use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use sea_orm::*;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::session::{Recurrence, SessionType};
use crate::models::{classroom, session};
use crate::services::quota::{QuotaLimiter, ResourceKind};
use crate::utils::calendar;

/// Modèle de session à répéter
#[derive(Debug, Clone)]
pub struct SessionTemplate {
    pub classroom_id: i32,
    pub title: String,
    pub session_type: SessionType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub reminder_enabled: bool,
    pub video_conference_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct RecurrenceOutcome {
    pub first: session::Model, // seule la première session est renvoyée en entier
    pub session_ids: Vec<i32>,
}

pub struct SessionService {
    db: DatabaseConnection,
    limiter: Arc<dyn QuotaLimiter>,
    timezone: Tz,
    max_recurrence: u32,
}

impl SessionService {
    pub fn new(db: DatabaseConnection, limiter: Arc<dyn QuotaLimiter>, config: &AppConfig) -> Self {
        Self {
            db,
            limiter,
            timezone: config.timezone,
            max_recurrence: config.max_recurrence,
        }
    }

    /// Crée `count` sessions espacées d'un jour ou d'une semaine calendaire.
    /// Le quota est vérifié AVANT toute écriture; la série est créée en une transaction.
    pub async fn create_recurring_sessions(
        &self,
        template: SessionTemplate,
        recurrence: Recurrence,
        count: Option<u32>,
    ) -> Result<RecurrenceOutcome, AppError> {
        // NONE = une seule session, quel que soit le nombre demandé
        let count = match recurrence {
            Recurrence::None => 1,
            Recurrence::Daily | Recurrence::Weekly => count.unwrap_or(1),
        };

        self.validate(&template, count)?;

        let classroom = classroom::Entity::find_by_id(template.classroom_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Classroom {}", template.classroom_id)))?;

        let quota = self
            .limiter
            .check_limit(classroom.organization_id, ResourceKind::SessionsPerMonth)
            .await?;
        if let Err(e) = quota.ensure_room_for(u64::from(count)) {
            tracing::warn!(org_id = classroom.organization_id, count, "session quota exceeded");
            return Err(e);
        }

        // Calcul de toutes les dates avant la première écriture
        let slots = (0..count)
            .map(|i| {
                let start = calendar::shift(template.start_time, recurrence, i, self.timezone)?;
                let end = calendar::shift(template.end_time, recurrence, i, self.timezone)?;
                Some((start, end))
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| AppError::Validation("Recurrence goes beyond the supported calendar range".to_string()))?;

        let now = Utc::now();
        let txn = self.db.begin().await?;
        let mut created: Vec<session::Model> = Vec::with_capacity(slots.len());

        for (start_time, end_time) in slots {
            let model = session::ActiveModel {
                classroom_id: Set(classroom.id),
                title: Set(template.title.trim().to_string()),
                session_type: Set(template.session_type),
                start_time: Set(start_time),
                end_time: Set(end_time),
                recurrence: Set(recurrence),
                recurrence_count: Set(count as i32),
                reminder_enabled: Set(template.reminder_enabled),
                video_conference_enabled: Set(template.video_conference_enabled),
                teacher_id: Set(None),
                teacher_signature: Set(None),
                teacher_signed_at: Set(None),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            created.push(model);
        }

        txn.commit().await?;

        let session_ids: Vec<i32> = created.iter().map(|s| s.id).collect();
        let first = created
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Validation("No session created".to_string()))?;

        tracing::info!(
            classroom_id = classroom.id,
            org_id = classroom.organization_id,
            ?recurrence,
            count = session_ids.len(),
            "sessions created"
        );

        Ok(RecurrenceOutcome { first, session_ids })
    }

    pub async fn find_classroom_in_organization(
        &self,
        classroom_id: i32,
        organization_id: i32,
    ) -> Result<classroom::Model, AppError> {
        classroom::Entity::find_by_id(classroom_id)
            .filter(classroom::Column::OrganizationId.eq(organization_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Classroom {}", classroom_id)))
    }

    /// Une session d'une autre organisation est traitée comme inexistante
    pub async fn find_in_organization(
        &self,
        session_id: i32,
        organization_id: i32,
    ) -> Result<session::Model, AppError> {
        session::Entity::find_by_id(session_id)
            .inner_join(classroom::Entity)
            .filter(classroom::Column::OrganizationId.eq(organization_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session {}", session_id)))
    }

    fn validate(&self, template: &SessionTemplate, count: u32) -> Result<(), AppError> {
        if template.title.trim().is_empty() {
            return Err(AppError::Validation("Title must not be empty".to_string()));
        }
        if template.end_time <= template.start_time {
            return Err(AppError::Validation("end_time must be after start_time".to_string()));
        }
        if count == 0 || count > self.max_recurrence {
            return Err(AppError::Validation(format!(
                "repeat_count must be between 1 and {}",
                self.max_recurrence
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, FixedLimiter};
    use chrono::Duration;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn template(classroom_id: i32, start: &str) -> SessionTemplate {
        let start_time = utc(start);
        SessionTemplate {
            classroom_id,
            title: "Algèbre".to_string(),
            session_type: SessionType::Onsite,
            start_time,
            end_time: start_time + Duration::hours(2),
            reminder_enabled: true,
            video_conference_enabled: false,
        }
    }

    fn service(db: &DatabaseConnection, current: u64, limit: Option<u64>) -> SessionService {
        SessionService::new(
            db.clone(),
            Arc::new(FixedLimiter { current, limit }),
            &test_support::test_config(),
        )
    }

    async fn session_count(db: &DatabaseConnection) -> u64 {
        session::Entity::find().count(db).await.unwrap()
    }

    #[tokio::test]
    async fn test_weekly_recurrence_crosses_month() {
        let db = test_support::setup_db().await;
        let classroom = test_support::insert_classroom(&db, 1, "3B").await;

        let outcome = service(&db, 0, None)
            .create_recurring_sessions(template(classroom.id, "2024-01-31T09:00:00Z"), Recurrence::Weekly, Some(2))
            .await
            .unwrap();

        assert_eq!(outcome.session_ids.len(), 2);
        assert_eq!(outcome.first.id, outcome.session_ids[0]);
        assert_eq!(outcome.first.start_time, utc("2024-01-31T09:00:00Z"));
        assert_eq!(outcome.first.recurrence, Recurrence::Weekly);
        assert_eq!(outcome.first.recurrence_count, 2);

        let second = session::Entity::find_by_id(outcome.session_ids[1])
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.start_time, utc("2024-02-07T09:00:00Z"));
        assert_eq!(second.end_time, utc("2024-02-07T11:00:00Z"));
        assert!(second.reminder_enabled);
    }

    #[tokio::test]
    async fn test_daily_recurrence_follows_local_time() {
        let db = test_support::setup_db().await;
        let classroom = test_support::insert_classroom(&db, 1, "3B").await;

        let mut config = test_support::test_config();
        config.timezone = chrono_tz::Europe::Paris;
        let service = SessionService::new(db.clone(), Arc::new(FixedLimiter { current: 0, limit: None }), &config);

        // 09:00 à Paris la veille et le jour du passage à l'heure d'été
        let outcome = service
            .create_recurring_sessions(template(classroom.id, "2024-03-30T08:00:00Z"), Recurrence::Daily, Some(2))
            .await
            .unwrap();

        let second = session::Entity::find_by_id(outcome.session_ids[1])
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.start_time, utc("2024-03-31T07:00:00Z"));
    }

    #[tokio::test]
    async fn test_session_inside_dst_gap_keeps_its_length() {
        let db = test_support::setup_db().await;
        let classroom = test_support::insert_classroom(&db, 1, "3B").await;

        let mut config = test_support::test_config();
        config.timezone = chrono_tz::Europe::Paris;
        let service = SessionService::new(db.clone(), Arc::new(FixedLimiter { current: 0, limit: None }), &config);

        // 02:00-02:30 à Paris; le 31 mars cette plage n'existe pas
        let mut short = template(classroom.id, "2024-03-30T01:00:00Z");
        short.end_time = short.start_time + Duration::minutes(30);

        let outcome = service
            .create_recurring_sessions(short, Recurrence::Daily, Some(2))
            .await
            .unwrap();

        let second = session::Entity::find_by_id(outcome.session_ids[1])
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.start_time, utc("2024-03-31T01:00:00Z"));
        assert_eq!(second.end_time - second.start_time, Duration::minutes(30));
    }

    #[tokio::test]
    async fn test_quota_exceeded_creates_nothing() {
        let db = test_support::setup_db().await;
        let classroom = test_support::insert_classroom(&db, 1, "3B").await;

        let result = service(&db, 8, Some(10))
            .create_recurring_sessions(template(classroom.id, "2024-01-31T09:00:00Z"), Recurrence::Daily, Some(3))
            .await;

        assert!(matches!(
            result,
            Err(AppError::QuotaExceeded { current: 8, requested: 3, limit: 10 })
        ));
        assert_eq!(session_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_quota_exactly_reached() {
        let db = test_support::setup_db().await;
        let classroom = test_support::insert_classroom(&db, 1, "3B").await;

        let outcome = service(&db, 8, Some(10))
            .create_recurring_sessions(template(classroom.id, "2024-01-31T09:00:00Z"), Recurrence::Daily, Some(2))
            .await
            .unwrap();

        assert_eq!(outcome.session_ids.len(), 2);
        assert_eq!(session_count(&db).await, 2);
    }

    #[tokio::test]
    async fn test_none_creates_single_session() {
        let db = test_support::setup_db().await;
        let classroom = test_support::insert_classroom(&db, 1, "3B").await;

        let outcome = service(&db, 0, None)
            .create_recurring_sessions(template(classroom.id, "2024-01-31T09:00:00Z"), Recurrence::None, Some(5))
            .await
            .unwrap();

        assert_eq!(outcome.session_ids, vec![outcome.first.id]);
        assert_eq!(outcome.first.recurrence_count, 1);
    }

    #[tokio::test]
    async fn test_invalid_requests() {
        let db = test_support::setup_db().await;
        let classroom = test_support::insert_classroom(&db, 1, "3B").await;
        let service = service(&db, 0, None);

        let mut reversed = template(classroom.id, "2024-01-31T09:00:00Z");
        reversed.end_time = reversed.start_time;
        assert!(matches!(
            service.create_recurring_sessions(reversed, Recurrence::None, None).await,
            Err(AppError::Validation(_))
        ));

        let mut untitled = template(classroom.id, "2024-01-31T09:00:00Z");
        untitled.title = "   ".to_string();
        assert!(matches!(
            service.create_recurring_sessions(untitled, Recurrence::None, None).await,
            Err(AppError::Validation(_))
        ));

        assert!(matches!(
            service
                .create_recurring_sessions(template(classroom.id, "2024-01-31T09:00:00Z"), Recurrence::Weekly, Some(0))
                .await,
            Err(AppError::Validation(_))
        ));

        assert!(matches!(
            service
                .create_recurring_sessions(template(classroom.id, "2024-01-31T09:00:00Z"), Recurrence::Daily, Some(366))
                .await,
            Err(AppError::Validation(_))
        ));

        assert!(matches!(
            service
                .create_recurring_sessions(template(9999, "2024-01-31T09:00:00Z"), Recurrence::None, None)
                .await,
            Err(AppError::NotFound(_))
        ));

        assert_eq!(session_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_find_in_organization() {
        let db = test_support::setup_db().await;
        let classroom = test_support::insert_classroom(&db, 1, "3B").await;
        let session = test_support::insert_session(&db, classroom.id, utc("2024-01-31T09:00:00Z")).await;
        let service = service(&db, 0, None);

        assert_eq!(service.find_in_organization(session.id, 1).await.unwrap().id, session.id);
        assert!(matches!(
            service.find_in_organization(session.id, 2).await,
            Err(AppError::NotFound(_))
        ));
        assert!(service.find_classroom_in_organization(classroom.id, 1).await.is_ok());
        assert!(service.find_classroom_in_organization(classroom.id, 2).await.is_err());
    }
}
