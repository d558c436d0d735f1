use std::{sync::Arc, time::Duration};

use upwatch_service::{monitoring::RunCoordinator, rate_limit::RateLimiter};

/// Shared by every worker for the lifetime of the server
pub struct AppState {
    pub coordinator: Arc<RunCoordinator>,
    /// Bearer token required by the trigger route; `None` refuses every call
    pub cron_secret: Option<String>,
    pub limiter: Arc<RateLimiter>,
    pub cron_cooldown: Duration,
}

impl AppState {
    pub fn is_authorized(&self, header: Option<&str>) -> bool {
        match (self.cron_secret.as_deref(), header) {
            (Some(secret), Some(header)) if !secret.is_empty() => {
                header.strip_prefix("Bearer ").is_some_and(|token| token == secret)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use upwatch_service::database::MemoryStore;

    use crate::routes::tests::StaticProber;

    fn state(secret: Option<&str>) -> AppState {
        AppState {
            coordinator: Arc::new(RunCoordinator::new(
                Arc::new(MemoryStore::new()),
                Arc::new(StaticProber::up()),
                10,
            )),
            cron_secret: secret.map(str::to_string),
            limiter: Arc::new(RateLimiter::new()),
            cron_cooldown: Duration::from_secs(30),
        }
    }

    #[test]
    fn test_authorization_header() {
        let state = state(Some("s3cret"));
        assert!(state.is_authorized(Some("Bearer s3cret")));
        assert!(!state.is_authorized(Some("Bearer wrong")));
        assert!(!state.is_authorized(Some("s3cret")));
        assert!(!state.is_authorized(None));
    }

    #[test]
    fn test_missing_secret_refuses_everything() {
        assert!(!state(None).is_authorized(Some("Bearer ")));
        assert!(!state(Some("")).is_authorized(Some("Bearer ")));
    }
}
