mod config;
mod db;
mod error;
mod middleware;
mod models;
mod notifier;
mod routes;
mod services;
mod utils;
#[cfg(test)]
mod test_support;

use std::io;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::services::attendance_service::AttendanceService;
use crate::services::quota::DbQuotaLimiter;
use crate::services::session_service::SessionService;
use crate::services::signature_service::SignatureService;

fn startup_error(e: impl std::fmt::Display) -> io::Error {
    io::Error::other(e.to_string())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env().map_err(startup_error)?;

    tracing::info!("connecting to database");
    let db = db::establish_connection(&config.database_url)
        .await
        .map_err(startup_error)?;

    if config.auto_schema {
        db::create_schema(&db).await.map_err(startup_error)?;
        tracing::info!("schema ready");
    }

    let notifier = notifier::create_notifier(&config.mail).map_err(startup_error)?;
    let limiter = Arc::new(DbQuotaLimiter::new(db.clone(), config.quotas.clone()));

    let sessions = web::Data::new(SessionService::new(db.clone(), limiter, &config));
    let signatures = web::Data::new(SignatureService::new(db.clone(), notifier, &config));
    let attendances = web::Data::new(AttendanceService::new(db.clone(), &config));

    let bind_addr = config.bind_addr.clone();
    let config = web::Data::new(config);
    let db = web::Data::new(db);

    tracing::info!(%bind_addr, "starting server");

    HttpServer::new(move || {
        App::new()
            .app_data(db.clone())
            .app_data(config.clone())
            .app_data(sessions.clone())
            .app_data(signatures.clone())
            .app_data(attendances.clone())
            .configure(routes::configure_routes)
    })
        .bind(bind_addr)?
        .run()
        .await
}
