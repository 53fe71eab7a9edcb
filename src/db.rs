// connexion BD

use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Schema};

use crate::models::{attendance, classroom, session, signature_token, student, users};

pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Crée les tables manquantes à partir des entités SeaORM.
/// L'ordre respecte les clés étrangères.
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut tables = vec![
        schema.create_table_from_entity(classroom::Entity),
        schema.create_table_from_entity(users::Entity),
        schema.create_table_from_entity(student::Entity),
        schema.create_table_from_entity(session::Entity),
        schema.create_table_from_entity(signature_token::Entity),
        schema.create_table_from_entity(attendance::Entity),
    ];

    for table in tables.iter_mut() {
        table.if_not_exists();
        db.execute(backend.build(&*table)).await?;
    }

    let indexes = vec![
        Index::create()
            .if_not_exists()
            .name("idx_signature_tokens_pair")
            .table(signature_token::Entity)
            .col(signature_token::Column::SessionId)
            .col(signature_token::Column::RecipientKind)
            .col(signature_token::Column::RecipientId)
            .to_owned(),
        Index::create()
            .if_not_exists()
            .name("idx_attendances_session_student")
            .table(attendance::Entity)
            .col(attendance::Column::SessionId)
            .col(attendance::Column::StudentId)
            .unique()
            .to_owned(),
    ];

    for index in indexes.iter() {
        db.execute(backend.build(index)).await?;
    }

    Ok(())
}
