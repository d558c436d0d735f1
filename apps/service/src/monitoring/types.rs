use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::{Monitor, MonitorStatus, NewCheck};

/// Result of probing one monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// HTTP status code, absent when no response arrived
    pub status_code: Option<u16>,

    /// Wall-clock time until the response or the failure
    pub response_time_ms: u64,

    /// True iff a response arrived with a 2xx or 3xx status
    pub success: bool,

    /// Transport error description (timeouts, DNS, TLS, refused connections)
    pub message: Option<String>,
}

impl ProbeResult {
    /// A response was received; success depends on the status code only
    pub fn response(status_code: u16, response_time_ms: u64) -> Self {
        Self {
            status_code: Some(status_code),
            response_time_ms,
            success: is_success_status(status_code),
            message: None,
        }
    }

    /// No response was received
    pub fn failure(message: impl Into<String>, response_time_ms: u64) -> Self {
        Self { status_code: None, response_time_ms, success: false, message: Some(message.into()) }
    }

    pub fn to_new_check(&self, monitor_id: Uuid, created_at: DateTime<Utc>) -> NewCheck {
        NewCheck {
            monitor_id,
            status_code: self.status_code,
            response_time_ms: self.response_time_ms,
            success: self.success,
            message: self.message.clone(),
            created_at,
        }
    }
}

/// 2xx and 3xx count as up
pub fn is_success_status(status_code: u16) -> bool {
    (200..400).contains(&status_code)
}

/// A monitor paired with its probe result for the current cycle
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub monitor: Monitor,
    pub result: ProbeResult,
}

/// Per-monitor line of a run summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorRunResult {
    pub monitor_id: Uuid,
    pub name: String,
    pub status: MonitorStatus,
    pub response_time_ms: u64,
    pub check_id: i64,
}

/// Aggregate counts for one cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_monitors: usize,

    /// Outcomes whose batch committed
    pub checked: usize,

    /// Outcomes whose batch failed to persist
    pub failed: usize,

    /// Probe tasks that died before settling; never persisted
    #[serde(default, skip_serializing_if = "is_zero")]
    pub dropped: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<MonitorRunResult>>,
}

impl RunSummary {
    /// Strip the per-monitor list, leaving only the counts
    pub fn without_results(mut self) -> Self {
        self.results = None;
        self
    }
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        assert!(!is_success_status(199));
        assert!(is_success_status(200));
        assert!(is_success_status(302));
        assert!(is_success_status(399));
        assert!(!is_success_status(400));
        assert!(!is_success_status(503));
    }

    #[test]
    fn test_error_status_keeps_code_without_message() {
        let result = ProbeResult::response(404, 12);
        assert_eq!(result.status_code, Some(404));
        assert!(!result.success);
        assert!(result.message.is_none());
    }

    #[test]
    fn test_failure_has_no_status_code() {
        let result = ProbeResult::failure("connection refused", 3);
        assert_eq!(result.status_code, None);
        assert!(!result.success);
        assert_eq!(result.message.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_summary_json_shape() {
        let id = Uuid::new_v4();
        let summary = RunSummary {
            total_monitors: 1,
            checked: 1,
            failed: 0,
            dropped: 0,
            results: Some(vec![MonitorRunResult {
                monitor_id: id,
                name: "Site".into(),
                status: MonitorStatus::Up,
                response_time_ms: 87,
                check_id: 7,
            }]),
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["totalMonitors"], 1);
        assert_eq!(json["checked"], 1);
        assert_eq!(json["failed"], 0);
        assert!(json.get("dropped").is_none());
        assert_eq!(json["results"][0]["monitorId"], id.to_string());
        assert_eq!(json["results"][0]["status"], "up");
        assert_eq!(json["results"][0]["responseTimeMs"], 87);

        let counts_only = serde_json::to_value(summary.without_results()).unwrap();
        assert!(counts_only.get("results").is_none());
    }
}
