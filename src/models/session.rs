// ============================================================================
// MODÈLE : SESSIONS
// ============================================================================
//
// Description:
//   Une session de cours rattachée à une classe (présentiel, distanciel ou
//   travail à la maison). Une demande récurrente produit plusieurs lignes
//   "sœurs" qui partagent le même titre et la même directive de récurrence.
//
// Colonnes de la table sessions:
//   - id (INTEGER, PRIMARY KEY, SERIAL)
//   - classroom_id (INTEGER, NOT NULL, FK vers classrooms)
//   - title (VARCHAR, NOT NULL)
//   - session_type (VARCHAR) - 'onsite' | 'online' | 'homework'
//   - start_time / end_time (TIMESTAMPTZ, NOT NULL)
//   - recurrence (VARCHAR) - 'NONE' | 'DAILY' | 'WEEKLY'
//   - recurrence_count (INTEGER) - nombre de sessions de la série
//   - reminder_enabled / video_conference_enabled (BOOLEAN)
//   - teacher_id (INTEGER, NULL, FK vers users)
//   - teacher_signature (TEXT, NULL) - data URL base64 de la signature
//   - teacher_signed_at (TIMESTAMPTZ, NULL)
//   - created_at (TIMESTAMPTZ)
//
// Points d'attention:
//   - Poser teacher_signature lie aussi teacher_id au signataire
//
// ============================================================================

use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    #[sea_orm(string_value = "onsite")]
    Onsite,
    #[sea_orm(string_value = "online")]
    Online,
    #[sea_orm(string_value = "homework")]
    Homework,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "UPPERCASE")]
pub enum Recurrence {
    #[sea_orm(string_value = "NONE")]
    None,
    #[sea_orm(string_value = "DAILY")]
    Daily,
    #[sea_orm(string_value = "WEEKLY")]
    Weekly,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub classroom_id: i32,
    pub title: String,
    pub session_type: SessionType,
    pub start_time: DateTimeUtc,
    pub end_time: DateTimeUtc,
    pub recurrence: Recurrence,
    pub recurrence_count: i32,
    pub reminder_enabled: bool,
    pub video_conference_enabled: bool,
    pub teacher_id: Option<i32>,
    #[serde(skip_serializing)] // Le blob de signature n'est jamais renvoyé tel quel
    #[sea_orm(column_type = "Text", nullable)]
    pub teacher_signature: Option<String>,
    pub teacher_signed_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::classroom::Entity",
        from = "Column::ClassroomId",
        to = "super::classroom::Column::Id"
    )]
    Classroom,

    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::TeacherId",
        to = "super::users::Column::Id"
    )]
    Teacher,

    #[sea_orm(has_many = "super::signature_token::Entity")]
    SignatureToken,

    #[sea_orm(has_many = "super::attendance::Entity")]
    Attendance,
}

impl Related<super::classroom::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Classroom.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Teacher.def()
    }
}

impl Related<super::signature_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SignatureToken.def()
    }
}

impl Related<super::attendance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendance.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
