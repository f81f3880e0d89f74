use actix_web::{get, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{error::Result, AppState};

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    camera: Option<String>,
    limit: Option<usize>,
}

#[get("/status")]
async fn get_status(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.monitor.snapshot()))
}

/// Completed analyses, newest first.
#[get("/history")]
async fn get_history(state: web::Data<AppState>, query: web::Query<HistoryQuery>) -> Result<HttpResponse> {
    let snapshot = state.monitor.snapshot();
    let limit = query.limit.unwrap_or(usize::MAX);

    let records: Vec<_> = snapshot
        .history
        .into_iter()
        .rev()
        .filter(|r| query.camera.as_deref().map_or(true, |id| r.camera_id == id))
        .take(limit)
        .collect();

    Ok(HttpResponse::Ok().json(records))
}

#[get("/predictions")]
async fn get_predictions(state: web::Data<AppState>) -> Result<HttpResponse> {
    let snapshot = state.monitor.snapshot();
    Ok(HttpResponse::Ok().json(json!({
        "predictions": snapshot.predictions,
        "history_len": snapshot.history.len(),
    })))
}

#[get("/metrics")]
async fn get_metrics(state: web::Data<AppState>) -> Result<HttpResponse> {
    let body = state.monitor.metrics().render()?;
    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(body))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_status)
        .service(get_history)
        .service(get_predictions)
        .service(get_metrics);
}
