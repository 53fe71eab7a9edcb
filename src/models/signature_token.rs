// ============================================================================
// MODÈLE : SIGNATURE TOKENS
// ============================================================================
//
// Description:
//   Jeton opaque autorisant UNE signature : émargement d'un étudiant ou
//   contre-signature d'une session par le formateur.
//
// Colonnes de la table signature_tokens:
//   - id (INTEGER, PRIMARY KEY, SERIAL)
//   - token (VARCHAR, UNIQUE, NOT NULL) - UUID v4 (forme simple, sans tirets)
//   - session_id (INTEGER, NOT NULL, FK vers sessions)
//   - recipient_kind (VARCHAR) - 'student' | 'teacher'
//   - recipient_id (INTEGER, NOT NULL) - students.id ou users.id selon le kind
//   - expires_at (TIMESTAMPTZ, NOT NULL) - created_at + 7 jours par défaut
//   - used_at (TIMESTAMPTZ, NULL) - posé une seule fois, à la signature
//   - email_sent_at (TIMESTAMPTZ, NULL)
//   - created_at (TIMESTAMPTZ)
//
// Workflow:
//   1. Le formateur demande les signatures d'une session
//   2. Backend supprime les anciens tokens du couple (session, destinataire)
//   3. Backend insère un nouveau token et envoie l'email avec le lien
//   4. Le destinataire ouvre le lien : GET /api/signatures/{token}
//   5. Il signe : POST /api/signatures/{token}
//   6. Backend vérifie: token existe, not expired, not used, puis pose used_at
//
// Points d'attention:
//   - Valide pour signer ssi now < expires_at ET used_at IS NULL
//   - La suppression d'un émargement remet used_at à NULL et repousse
//     expires_at, pour permettre de re-signer sans nouvel email
//
// ============================================================================

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum RecipientKind {
    #[sea_orm(string_value = "student")]
    Student,
    #[sea_orm(string_value = "teacher")]
    Teacher,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "signature_tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub token: String,

    pub session_id: i32,

    pub recipient_kind: RecipientKind,

    pub recipient_id: i32,

    pub expires_at: DateTimeUtc,

    pub used_at: Option<DateTimeUtc>,

    pub email_sent_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
}

impl Model {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Utilisable pour signer: non expiré et jamais consommé
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired(now) && self.used_at.is_none()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::session::Entity",
        from = "Column::SessionId",
        to = "super::session::Column::Id"
    )]
    Session,
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
