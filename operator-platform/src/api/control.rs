use actix_web::{post, put, web, HttpResponse};
use sentinel_common::AlertSettings;
use serde_json::json;
use tracing::info;
use validator::Validate;

use crate::{error::Result, AppState};

#[post("/alarm/acknowledge")]
async fn acknowledge_alarm(state: web::Data<AppState>) -> Result<HttpResponse> {
    state.monitor.acknowledge().await?;
    Ok(HttpResponse::Accepted().json(json!({"message": "Acknowledge requested"})))
}

#[post("/monitoring/start")]
async fn start_monitoring(state: web::Data<AppState>) -> Result<HttpResponse> {
    info!("Operator requested monitoring start");
    state.monitor.start().await?;
    Ok(HttpResponse::Accepted().json(json!({"message": "Monitoring start requested"})))
}

#[post("/monitoring/stop")]
async fn stop_monitoring(state: web::Data<AppState>) -> Result<HttpResponse> {
    info!("Operator requested monitoring stop");
    state.monitor.stop().await?;
    Ok(HttpResponse::Accepted().json(json!({"message": "Monitoring stop requested"})))
}

#[put("/settings")]
async fn update_settings(
    state: web::Data<AppState>,
    settings: web::Json<AlertSettings>,
) -> Result<HttpResponse> {
    let settings = settings.into_inner();
    settings.validate()?;
    state.monitor.update_settings(settings.clone()).await?;
    Ok(HttpResponse::Ok().json(settings))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(acknowledge_alarm)
        .service(start_monitoring)
        .service(stop_monitoring)
        .service(update_settings);
}
