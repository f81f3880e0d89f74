mod cameras;
mod control;
mod status;

use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(status::configure)
            .configure(control::configure)
            .configure(cameras::configure),
    );
}
