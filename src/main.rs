// Import from library crate
use wecom_callback::{config::AppConfig, handlers, security::CallbackCodec, services};

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use services::{MessageDispatcher, SchedulerHandle, WeComClient};
use std::io;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("❌ Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let codec = web::Data::new(CallbackCodec::new(config.callback.clone(), config.frame_mode));

    let client = Arc::new(WeComClient::new(config.wecom.clone()).map_err(|e| {
        log::error!("❌ Failed to build WeCom client: {}", e);
        io::Error::new(io::ErrorKind::Other, e.to_string())
    })?);

    let dispatcher = web::Data::new(MessageDispatcher::with_defaults());
    log::info!("📨 Message routes: {:?}", dispatcher.route_names());

    let scheduler = web::Data::new(SchedulerHandle::spawn(
        client.clone(),
        config.timer.interval,
        config.timer.message.clone(),
    ));
    if config.timer.autostart {
        scheduler.start().await;
    }

    if config.admin_token.is_none() {
        log::warn!("⚠️  ADMIN_TOKEN is not set, control routes are unauthenticated");
    }

    let host = config.host.clone();
    let port = config.port;
    log::info!("🚀 Starting server at {}:{}", host, port);
    log::info!("🔐 Callback frame mode: {}", config.frame_mode);
    log::info!("🔒 CORS allowed origins: {:?}", config.cors_origins);

    let client = web::Data::from(client);
    let config = web::Data::new(config);

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        for origin in &config.cors_origins {
            cors = cors.allowed_origin(origin);
        }

        let admin_token = config.admin_token.clone();

        App::new()
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .app_data(codec.clone())
            .app_data(client.clone())
            .app_data(dispatcher.clone())
            .app_data(scheduler.clone())
            .app_data(config.clone())
            .configure(|cfg| handlers::configure(cfg, admin_token.as_deref()))
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
