// Limites par organisation (classes, sessions par mois, étudiants).
// Les plafonds viennent de QuotaConfig, injecté à la construction.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use sea_orm::*;

use crate::config::QuotaConfig;
use crate::error::AppError;
use crate::models::{classroom, session, student};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Classrooms,
    SessionsPerMonth,
    Students,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaStatus {
    pub allowed: bool,
    pub current: u64,
    pub limit: Option<u64>, // None = illimité
}

impl QuotaStatus {
    pub fn new(current: u64, limit: Option<u64>) -> Self {
        Self {
            allowed: limit.is_none_or(|l| current < l),
            current,
            limit,
        }
    }

    /// Vérifie qu'on peut encore créer `requested` ressources
    pub fn ensure_room_for(&self, requested: u64) -> Result<(), AppError> {
        match self.limit {
            Some(limit) if self.current + requested > limit => Err(AppError::QuotaExceeded {
                current: self.current,
                requested,
                limit,
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait::async_trait]
pub trait QuotaLimiter: Send + Sync {
    async fn check_limit(&self, organization_id: i32, kind: ResourceKind) -> Result<QuotaStatus, AppError>;
}

pub struct DbQuotaLimiter {
    db: DatabaseConnection,
    config: QuotaConfig,
}

impl DbQuotaLimiter {
    pub fn new(db: DatabaseConnection, config: QuotaConfig) -> Self {
        Self { db, config }
    }

    fn limit_for(&self, kind: ResourceKind) -> Option<u64> {
        match kind {
            ResourceKind::Classrooms => self.config.max_classrooms,
            ResourceKind::SessionsPerMonth => self.config.max_sessions_per_month,
            ResourceKind::Students => self.config.max_students,
        }
    }

    async fn count(&self, organization_id: i32, kind: ResourceKind, now: DateTime<Utc>) -> Result<u64, AppError> {
        let count = match kind {
            ResourceKind::Classrooms => {
                classroom::Entity::find()
                    .filter(classroom::Column::OrganizationId.eq(organization_id))
                    .count(&self.db)
                    .await?
            }
            ResourceKind::Students => {
                student::Entity::find()
                    .filter(student::Column::OrganizationId.eq(organization_id))
                    .count(&self.db)
                    .await?
            }
            ResourceKind::SessionsPerMonth => {
                let (month_start, next_month) = month_bounds(now)
                    .ok_or_else(|| AppError::Validation("Invalid calendar month".to_string()))?;

                session::Entity::find()
                    .inner_join(classroom::Entity)
                    .filter(classroom::Column::OrganizationId.eq(organization_id))
                    .filter(session::Column::StartTime.gte(month_start))
                    .filter(session::Column::StartTime.lt(next_month))
                    .count(&self.db)
                    .await?
            }
        };

        Ok(count)
    }
}

#[async_trait::async_trait]
impl QuotaLimiter for DbQuotaLimiter {
    async fn check_limit(&self, organization_id: i32, kind: ResourceKind) -> Result<QuotaStatus, AppError> {
        let current = self.count(organization_id, kind, Utc::now()).await?;
        let status = QuotaStatus::new(current, self.limit_for(kind));

        tracing::debug!(
            org_id = organization_id,
            ?kind,
            current = status.current,
            limit = ?status.limit,
            "quota checked"
        );

        Ok(status)
    }
}

/// Début du mois calendaire UTC contenant `now`, et début du mois suivant
pub fn month_bounds(now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let first = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)?;
    let next = if now.month() == 12 {
        NaiveDate::from_ymd_opt(now.year() + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(now.year(), now.month() + 1, 1)?
    };

    Some((
        Utc.from_utc_datetime(&first.and_hms_opt(0, 0, 0)?),
        Utc.from_utc_datetime(&next.and_hms_opt(0, 0, 0)?),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use chrono::Duration;

    #[test]
    fn test_quota_status() {
        let status = QuotaStatus::new(8, Some(10));
        assert!(status.allowed);
        assert!(status.ensure_room_for(2).is_ok());
        assert!(matches!(
            status.ensure_room_for(3),
            Err(AppError::QuotaExceeded { current: 8, requested: 3, limit: 10 })
        ));

        let full = QuotaStatus::new(10, Some(10));
        assert!(!full.allowed);

        let unlimited = QuotaStatus::new(10_000, None);
        assert!(unlimited.allowed);
        assert!(unlimited.ensure_room_for(500).is_ok());
    }

    #[test]
    fn test_month_bounds_december() {
        let now = Utc.with_ymd_and_hms(2024, 12, 15, 10, 0, 0).unwrap();
        let (start, end) = month_bounds(now).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_db_limiter_counts_current_month_sessions() {
        let db = test_support::setup_db().await;
        let classroom = test_support::insert_classroom(&db, 1, "3B").await;
        let other_org = test_support::insert_classroom(&db, 2, "Autre").await;

        let (month_start, _) = month_bounds(Utc::now()).unwrap();
        let inside = month_start + Duration::hours(10);
        let before = month_start - Duration::days(3);

        test_support::insert_session(&db, classroom.id, inside).await;
        test_support::insert_session(&db, classroom.id, inside + Duration::hours(3)).await;
        test_support::insert_session(&db, classroom.id, before).await;
        test_support::insert_session(&db, other_org.id, inside).await;

        let limiter = DbQuotaLimiter::new(
            db.clone(),
            QuotaConfig {
                max_sessions_per_month: Some(10),
                max_classrooms: Some(1),
                ..Default::default()
            },
        );

        let sessions = limiter.check_limit(1, ResourceKind::SessionsPerMonth).await.unwrap();
        assert_eq!(sessions, QuotaStatus { allowed: true, current: 2, limit: Some(10) });

        let classrooms = limiter.check_limit(1, ResourceKind::Classrooms).await.unwrap();
        assert_eq!(classrooms.current, 1);
        assert!(!classrooms.allowed);

        let students = limiter.check_limit(1, ResourceKind::Students).await.unwrap();
        assert_eq!(students, QuotaStatus { allowed: true, current: 0, limit: None });
    }
}
