// ============================================================================
// MODELS - MODULE PRINCIPAL
// ============================================================================
//
// Description:
//   Point d'entrée pour tous les modèles de données.
//   Chaque modèle correspond à une table PostgreSQL avec SeaORM.
//
// Liste des modules:
//   - health : Health check API
//   - classroom : Classes d'une organisation
//   - student : Étudiants inscrits (destinataires des demandes d'émargement)
//   - users : Formateurs / personnel (signataires côté enseignant)
//   - session : Sessions de cours (présentiel, distanciel, devoirs)
//   - signature_token : Tokens de signature (expire 7 jours, usage unique)
//   - attendance : Émargements signés
//   - dto : Data Transfer Objects pour les requêtes/réponses API
//
// Points d'attention:
//   - Tous les modèles utilisent SeaORM (pas de SQL brut)
//   - Les dates sont stockées en UTC (DateTimeUtc)
//
// ============================================================================

pub mod health;
pub mod classroom;
pub mod student;
pub mod users;
pub mod session;
pub mod signature_token;
pub mod attendance;
pub mod dto;
