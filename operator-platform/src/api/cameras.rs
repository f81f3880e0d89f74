use actix_web::{get, post, put, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{error::Result, AppState};

#[derive(Debug, Deserialize, Validate)]
struct LabelRequest {
    #[validate(length(min = 1, max = 64))]
    label: String,
}

#[get("/cameras")]
async fn get_cameras(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.monitor.snapshot().cameras))
}

#[post("/cameras/{id}/activate")]
async fn activate_camera(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse> {
    let camera_id = path.into_inner();
    state.monitor.set_camera_active(&camera_id, true).await?;
    Ok(HttpResponse::Ok().json(json!({"id": camera_id, "active": true})))
}

#[post("/cameras/{id}/deactivate")]
async fn deactivate_camera(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse> {
    let camera_id = path.into_inner();
    state.monitor.set_camera_active(&camera_id, false).await?;
    Ok(HttpResponse::Ok().json(json!({"id": camera_id, "active": false})))
}

#[put("/cameras/{id}/label")]
async fn rename_camera(
    state: web::Data<AppState>,
    path: web::Path<String>,
    request: web::Json<LabelRequest>,
) -> Result<HttpResponse> {
    let camera_id = path.into_inner();
    let mut request = request.into_inner();
    request.label = request.label.trim().to_string();
    request.validate()?;

    state.monitor.rename_camera(&camera_id, &request.label).await?;
    Ok(HttpResponse::Ok().json(json!({"id": camera_id, "label": request.label})))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_cameras)
        .service(activate_camera)
        .service(deactivate_camera)
        .service(rename_camera);
}
