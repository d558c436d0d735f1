use actix_web::{HttpRequest, HttpResponse, get, http::header::AUTHORIZATION, web};
use tracing::{error, warn};

use crate::{error::ApiError, state::AppState};

const RUN_RATE_LIMIT_KEY: &str = "cron:run";

/// Run one check cycle on behalf of a scheduler
///
/// Requires `Authorization: Bearer <CRON_SECRET>` and admits one run per
/// cooldown window.
#[get("/api/checks/run")]
pub async fn run_checks_route(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let header = req.headers().get(AUTHORIZATION).and_then(|value| value.to_str().ok());
    if !state.is_authorized(header) {
        warn!("Rejected check run with missing or invalid credentials");
        return Err(ApiError::Unauthorized);
    }

    if !state.limiter.check(RUN_RATE_LIMIT_KEY, 1, state.cron_cooldown) {
        return Err(ApiError::TooManyRequests);
    }

    match state.coordinator.run_cycle().await {
        Ok(summary) => Ok(HttpResponse::Ok().json(summary)),
        Err(e) => {
            error!(error = %e, "Check run failed");
            Err(ApiError::Internal)
        }
    }
}
