use actix_web::{delete, get, post, web, HttpResponse, ResponseError};
use validator::Validate;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::{CreateSessionRequest, CreateSessionResponse, SignatureRequestBody, TeacherSignatureRequestBody};
use crate::services::attendance_service::AttendanceService;
use crate::services::session_service::{SessionService, SessionTemplate};
use crate::services::signature_service::SignatureService;

/// POST /api/sessions - Créer une session, éventuellement récurrente (PROTÉGÉE)
#[post("")]
pub async fn create_session(
    auth_user: AuthUser,
    body: web::Json<CreateSessionRequest>,
    sessions: web::Data<SessionService>,
) -> HttpResponse {
    let request = body.into_inner();
    if let Err(errors) = request.validate() {
        return AppError::from(errors).error_response();
    }

    // 1. La classe doit appartenir à l'organisation du membre
    if let Err(e) = sessions
        .find_classroom_in_organization(request.classroom_id, auth_user.organization_id)
        .await
    {
        return e.error_response();
    }

    // 2. Créer la série
    let template = SessionTemplate {
        classroom_id: request.classroom_id,
        title: request.title,
        session_type: request.session_type,
        start_time: request.start_time,
        end_time: request.end_time,
        reminder_enabled: request.reminder_enabled,
        video_conference_enabled: request.video_conference_enabled,
    };

    match sessions
        .create_recurring_sessions(template, request.recurrence, request.repeat_count)
        .await
    {
        Ok(outcome) => HttpResponse::Created().json(CreateSessionResponse {
            session: outcome.first,
            session_ids: outcome.session_ids,
        }),
        Err(e) => e.error_response(),
    }
}

/// GET /api/sessions/{id}/attendances - Émargements d'une session (PROTÉGÉE)
#[get("/{id}/attendances")]
pub async fn list_attendances(
    auth_user: AuthUser,
    path: web::Path<i32>,
    sessions: web::Data<SessionService>,
    attendances: web::Data<AttendanceService>,
) -> HttpResponse {
    let session_id = path.into_inner();
    if let Err(e) = sessions.find_in_organization(session_id, auth_user.organization_id).await {
        return e.error_response();
    }

    match attendances.list_attendances(session_id).await {
        Ok(records) => HttpResponse::Ok().json(records),
        Err(e) => e.error_response(),
    }
}

/// POST /api/sessions/{id}/signature-requests - Demander l'émargement des étudiants (PROTÉGÉE)
#[post("/{id}/signature-requests")]
pub async fn request_signatures(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<SignatureRequestBody>,
    sessions: web::Data<SessionService>,
    signatures: web::Data<SignatureService>,
) -> HttpResponse {
    if let Err(errors) = body.validate() {
        return AppError::from(errors).error_response();
    }

    let session_id = path.into_inner();
    if let Err(e) = sessions.find_in_organization(session_id, auth_user.organization_id).await {
        return e.error_response();
    }

    match signatures.issue_for_recipients(session_id, &body.student_ids).await {
        Ok(outcome) => match outcome.ensure_all_sent() {
            Ok(()) => HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "sent_count": outcome.sent_count
            })),
            Err(e) => e.error_response(),
        },
        Err(e) => e.error_response(),
    }
}

/// POST /api/sessions/{id}/teacher-signature-request - Demander la signature du formateur (PROTÉGÉE)
#[post("/{id}/teacher-signature-request")]
pub async fn request_teacher_signature(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<TeacherSignatureRequestBody>,
    sessions: web::Data<SessionService>,
    signatures: web::Data<SignatureService>,
) -> HttpResponse {
    let session_id = path.into_inner();
    if let Err(e) = sessions.find_in_organization(session_id, auth_user.organization_id).await {
        return e.error_response();
    }

    match signatures.issue_for_single_recipient(session_id, body.teacher_id).await {
        Ok(outcome) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "reused": outcome.reused,
            "expires_at": outcome.token.expires_at
        })),
        Err(e) => e.error_response(),
    }
}

/// DELETE /api/sessions/{id}/attendances/{student_id} - Supprimer un émargement (PROTÉGÉE)
#[delete("/{id}/attendances/{student_id}")]
pub async fn remove_attendance(
    auth_user: AuthUser,
    path: web::Path<(i32, i32)>,
    sessions: web::Data<SessionService>,
    attendances: web::Data<AttendanceService>,
) -> HttpResponse {
    let (session_id, student_id) = path.into_inner();
    if let Err(e) = sessions.find_in_organization(session_id, auth_user.organization_id).await {
        return e.error_response();
    }

    match attendances.remove_attendance(session_id, student_id).await {
        Ok(tokens_reset) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "tokens_reset": tokens_reset
        })),
        Err(e) => e.error_response(),
    }
}

pub fn session_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/sessions")
            .service(create_session)
            .service(list_attendances)
            .service(request_signatures)
            .service(request_teacher_signature)
            .service(remove_attendance)
    );
}
