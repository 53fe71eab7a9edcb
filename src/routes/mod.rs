pub mod health;
pub mod sessions;
pub mod signatures;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(health::health_check)
            .configure(sessions::session_routes)
            .configure(signatures::signature_routes)
    );
}
