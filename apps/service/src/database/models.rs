use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Current status of a monitor, derived from its latest persisted check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    Pending,
    Up,
    Down,
}

impl MonitorStatus {
    pub fn from_success(success: bool) -> Self {
        if success { MonitorStatus::Up } else { MonitorStatus::Down }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorStatus::Pending => "pending",
            MonitorStatus::Up => "up",
            MonitorStatus::Down => "down",
        }
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for MonitorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MonitorStatus::Pending),
            "up" => Ok(MonitorStatus::Up),
            "down" => Ok(MonitorStatus::Down),
            other => Err(format!("unknown monitor status '{other}'")),
        }
    }
}

/// Monitor model - an HTTP(S) endpoint under observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    /// Advisory only; cycles are triggered externally
    pub interval_seconds: u32,
    pub status: MonitorStatus,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Monitor {
    /// Create a new monitor that has never been checked
    pub fn new(name: impl Into<String>, url: impl Into<String>, interval_seconds: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            url: url.into(),
            interval_seconds,
            status: MonitorStatus::Pending,
            last_checked_at: None,
            created_at: Utc::now(),
        }
    }
}

/// Editable monitor fields; `None` leaves a field as it is
///
/// Status and last-checked time are absent on purpose: only checks move them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorUpdate {
    pub name: Option<String>,
    pub url: Option<String>,
    pub interval_seconds: Option<u32>,
}

impl MonitorUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.url.is_none() && self.interval_seconds.is_none()
    }
}

/// Insert payload for one check record
#[derive(Debug, Clone, PartialEq)]
pub struct NewCheck {
    pub monitor_id: Uuid,
    pub status_code: Option<u16>,
    pub response_time_ms: u64,
    pub success: bool,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Check model - an immutable record of one probe attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    pub id: i64,
    pub monitor_id: Uuid,
    pub status_code: Option<u16>,
    pub response_time_ms: u64,
    pub success: bool,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Check {
    pub fn from_new(id: i64, new: &NewCheck) -> Self {
        Self {
            id,
            monitor_id: new.monitor_id,
            status_code: new.status_code,
            response_time_ms: new.response_time_ms,
            success: new.success,
            message: new.message.clone(),
            created_at: new.created_at,
        }
    }
}

/// Convert a timestamp to unix milliseconds for storage
pub fn timestamp_to_i64(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

/// Convert stored unix milliseconds back to a timestamp, `None` when out of range
pub fn i64_to_timestamp(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_success_flag() {
        assert_eq!(MonitorStatus::from_success(true), MonitorStatus::Up);
        assert_eq!(MonitorStatus::from_success(false), MonitorStatus::Down);
    }

    #[test]
    fn status_text_round_trips() {
        for status in [MonitorStatus::Pending, MonitorStatus::Up, MonitorStatus::Down] {
            assert_eq!(status.to_string().parse::<MonitorStatus>(), Ok(status));
        }
        assert!("degraded".parse::<MonitorStatus>().is_err());
    }

    #[test]
    fn new_monitor_starts_pending() {
        let monitor = Monitor::new("Example", "https://example.com", 300);
        assert_eq!(monitor.status, MonitorStatus::Pending);
        assert!(monitor.last_checked_at.is_none());
    }

    #[test]
    fn timestamps_keep_millisecond_precision() {
        let now = i64_to_timestamp(1_700_000_000_123).unwrap();
        assert_eq!(timestamp_to_i64(now), 1_700_000_000_123);
    }

    #[test]
    fn out_of_range_timestamp_is_rejected() {
        assert!(i64_to_timestamp(i64::MAX).is_none());
        assert!(i64_to_timestamp(i64::MIN).is_none());
    }
}
