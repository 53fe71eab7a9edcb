use actix_web::{get, post, web, HttpResponse, ResponseError};
use validator::Validate;

use crate::error::AppError;
use crate::models::dto::{SessionSummary, SignBody, SignatureInfoResponse};
use crate::services::signature_service::{SignatureService, ValidatedToken};

fn session_summary(validated: &ValidatedToken) -> SessionSummary {
    SessionSummary {
        id: validated.session.id,
        title: validated.session.title.clone(),
        session_type: validated.session.session_type,
        start_time: validated.session.start_time,
        end_time: validated.session.end_time,
        classroom_name: validated.classroom.name.clone(),
    }
}

/// GET /api/signatures/{token} - Infos de la session à signer (PUBLIC, le token fait foi)
#[get("/{token}")]
pub async fn get_signature(
    path: web::Path<String>,
    signatures: web::Data<SignatureService>,
) -> HttpResponse {
    match signatures.validate(&path.into_inner()).await {
        Ok(validated) => HttpResponse::Ok().json(SignatureInfoResponse {
            session: session_summary(&validated),
            recipient: validated.recipient.clone(),
            expires_at: validated.token.expires_at,
        }),
        Err(e) => e.error_response(),
    }
}

/// POST /api/signatures/{token} - Signer (PUBLIC, usage unique)
#[post("/{token}")]
pub async fn submit_signature(
    path: web::Path<String>,
    body: web::Json<SignBody>,
    signatures: web::Data<SignatureService>,
) -> HttpResponse {
    if let Err(errors) = body.validate() {
        return AppError::from(errors).error_response();
    }

    match signatures.consume(&path.into_inner(), &body.signature).await {
        Ok(validated) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "session_id": validated.session.id,
            "recipient": validated.recipient
        })),
        Err(e) => e.error_response(),
    }
}

pub fn signature_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/signatures")
            .service(get_signature)
            .service(submit_signature)
    );
}
