pub mod bot;
pub mod callback;
mod health;

pub use bot::{send_message, start_timer, status, stop_timer};
pub use callback::{index, receive_message, verify_url};
pub use health::health;

use actix_web::web;

use crate::middleware::AdminAuth;

/// Register every route. Control routes sit behind `AdminAuth`.
pub fn configure(cfg: &mut web::ServiceConfig, admin_token: Option<&str>) {
    cfg.route("/", web::get().to(index))
        .route("/health", web::get().to(health))
        .route("/status", web::get().to(status))
        // Platform callback (signature + encryption, no bearer token)
        .service(
            web::resource("/webhook")
                .route(web::get().to(verify_url))
                .route(web::post().to(receive_message)),
        )
        .service(
            web::resource("/send")
                .wrap(AdminAuth::new(admin_token))
                .route(web::post().to(send_message)),
        )
        .service(
            web::scope("/timer")
                .wrap(AdminAuth::new(admin_token))
                .route("/start", web::post().to(start_timer))
                .route("/stop", web::post().to(stop_timer)),
        );
}
