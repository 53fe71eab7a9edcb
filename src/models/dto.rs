//pour les requêtes et réponses structurées
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::session::{self, Recurrence, SessionType};
use super::signature_token::RecipientKind;

// DTO pour créer une session (éventuellement récurrente)
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessionRequest {
    pub classroom_id: i32,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub session_type: SessionType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default = "default_recurrence")]
    pub recurrence: Recurrence,
    #[validate(range(min = 1))]
    pub repeat_count: Option<u32>, // Ignoré si recurrence = NONE
    #[serde(default)]
    pub reminder_enabled: bool,
    #[serde(default)]
    pub video_conference_enabled: bool,
}

fn default_recurrence() -> Recurrence {
    Recurrence::None
}

// Réponse après création: la première session + les ids de toute la série
#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session: session::Model,
    pub session_ids: Vec<i32>,
}

// DTO pour demander la signature des étudiants
#[derive(Debug, Deserialize, Validate)]
pub struct SignatureRequestBody {
    #[validate(length(min = 1))]
    pub student_ids: Vec<i32>,
}

#[derive(Debug, Deserialize)]
pub struct TeacherSignatureRequestBody {
    pub teacher_id: i32,
}

// DTO pour soumettre une signature (data URL base64)
#[derive(Debug, Deserialize, Validate)]
pub struct SignBody {
    #[validate(length(min = 1))]
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub id: i32,
    pub title: String,
    pub session_type: SessionType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub classroom_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipientInfo {
    pub kind: RecipientKind,
    pub id: i32,
    pub name: String,
}

// Réponse pour GET /signatures/{token}
#[derive(Debug, Serialize)]
pub struct SignatureInfoResponse {
    pub session: SessionSummary,
    pub recipient: RecipientInfo,
    pub expires_at: DateTime<Utc>,
}
