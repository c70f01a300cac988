use actix_web::{web, HttpResponse, Result};
use serde_json::json;

use crate::services::SchedulerHandle;

/// Health check endpoint
pub async fn health(scheduler: web::Data<SchedulerHandle>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "wecom-callback-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "timer_running": scheduler.is_running()
    })))
}
