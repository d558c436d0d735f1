use actix_web::web::ServiceConfig;

mod checks;
mod health;

pub fn routes(cfg: &mut ServiceConfig) {
    cfg.service(health::health_route).service(checks::run_checks_route);
}
