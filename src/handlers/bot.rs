/// Control endpoints: status, manual send, timer
use actix_web::{web, HttpResponse};
use serde_json::json;
use validator::Validate;

use crate::config::AppConfig;
use crate::models::{Recipients, SendMessageRequest};
use crate::services::{MessageDispatcher, SchedulerHandle, WeComClient};

pub(crate) fn status_response(
    dispatcher: &MessageDispatcher,
    scheduler: &SchedulerHandle,
    config: &AppConfig,
) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "running": scheduler.is_running(),
        "config_valid": config.wecom.is_valid(),
        "handlers_count": dispatcher.len(),
        "frame_mode": config.frame_mode.to_string(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// GET /status
pub async fn status(
    dispatcher: web::Data<MessageDispatcher>,
    scheduler: web::Data<SchedulerHandle>,
    config: web::Data<AppConfig>,
) -> HttpResponse {
    status_response(&dispatcher, &scheduler, &config)
}

/// POST /send
pub async fn send_message(
    client: web::Data<WeComClient>,
    req: web::Json<SendMessageRequest>,
) -> HttpResponse {
    if let Err(e) = req.validate() {
        return HttpResponse::BadRequest().json(json!({ "error": e.to_string() }));
    }

    let req = req.into_inner();
    let recipients = match req.user_ids {
        Some(user_ids) if !user_ids.is_empty() => Recipients {
            user_ids,
            ..Default::default()
        },
        _ => client.default_recipients(),
    };

    match client.send(req.msgtype, &req.content, &recipients).await {
        Ok(()) => HttpResponse::Ok().json(json!({ "success": true })),
        Err(e) => HttpResponse::BadGateway().json(json!({
            "success": false,
            "error": e.to_string()
        })),
    }
}

/// POST /timer/start
pub async fn start_timer(scheduler: web::Data<SchedulerHandle>) -> HttpResponse {
    let started = scheduler.start().await;
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": if started { "timer started" } else { "timer already running" }
    }))
}

/// POST /timer/stop
pub async fn stop_timer(scheduler: web::Data<SchedulerHandle>) -> HttpResponse {
    let stopped = scheduler.stop().await;
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": if stopped { "timer stopped" } else { "timer was not running" }
    }))
}
