use std::net::{Ipv4Addr, Ipv6Addr};

use thiserror::Error;
use url::{Host, Url};

pub const MIN_INTERVAL_SECONDS: u32 = 30;
pub const MAX_INTERVAL_SECONDS: u32 = 3600;
pub const DEFAULT_INTERVAL_SECONDS: u32 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Validation results with specific error messages
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self { is_valid: true, error: None }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self { is_valid: false, error: Some(msg.into()) }
    }

    pub fn to_result(&self) -> Result<(), ValidationError> {
        if self.is_valid {
            Ok(())
        } else {
            Err(ValidationError(self.error.clone().unwrap_or_else(|| "Validation failed".to_string())))
        }
    }
}

/// Validate everything a user supplies when registering a monitor
pub fn validate_new_monitor(name: &str, url: &str, interval: u32) -> Result<(), ValidationError> {
    validate_monitor_name(name).to_result()?;
    validate_http_endpoint(url).to_result()?;
    validate_interval(interval).to_result()
}

/// Validate the fields an edit sets; absent fields are left alone
pub fn validate_monitor_update(
    name: Option<&str>,
    url: Option<&str>,
    interval: Option<u32>,
) -> Result<(), ValidationError> {
    if let Some(name) = name {
        validate_monitor_name(name).to_result()?;
    }
    if let Some(url) = url {
        validate_http_endpoint(url).to_result()?;
    }
    if let Some(interval) = interval {
        validate_interval(interval).to_result()?;
    }
    Ok(())
}

/// Validate HTTP/HTTPS URL endpoint
///
/// Private and local hosts are refused so monitors cannot be used to probe
/// the network the checker runs in.
pub fn validate_http_endpoint(target: &str) -> ValidationResult {
    if target.trim().is_empty() {
        return ValidationResult::err("URL cannot be empty");
    }

    match Url::parse(target) {
        Ok(url) => {
            let scheme = url.scheme();
            if scheme != "http" && scheme != "https" {
                return ValidationResult::err("URL must use http or https");
            }

            let Some(host) = url.host() else {
                return ValidationResult::err("URL must have a valid host");
            };

            if is_private_host(&host) {
                return ValidationResult::err("URL must not point to a private or local address");
            }

            ValidationResult::ok()
        }
        Err(e) => {
            if !target.contains("://") {
                ValidationResult::err("URL must include scheme (http:// or https://)")
            } else {
                ValidationResult::err(format!("Invalid URL: {e}"))
            }
        }
    }
}

fn is_private_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => {
            let domain = domain.to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        Host::Ipv4(ip) => is_private_ipv4(ip),
        Host::Ipv6(ip) => is_private_ipv6(ip),
    }
}

fn is_private_ipv4(ip: &Ipv4Addr) -> bool {
    let [a, _, _, _] = ip.octets();
    ip.is_private() || ip.is_loopback() || ip.is_link_local() || a == 0
}

fn is_private_ipv6(ip: &Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (first & 0xffc0) == 0xfe80
        || ip.to_ipv4_mapped().is_some_and(|v4| is_private_ipv4(&v4))
}

/// Validate monitor name
pub fn validate_monitor_name(name: &str) -> ValidationResult {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return ValidationResult::err("Name is required");
    }

    ValidationResult::ok()
}

/// Validate monitor interval
pub fn validate_interval(interval: u32) -> ValidationResult {
    if !(MIN_INTERVAL_SECONDS..=MAX_INTERVAL_SECONDS).contains(&interval) {
        return ValidationResult::err(format!(
            "Interval must be between {MIN_INTERVAL_SECONDS} and {MAX_INTERVAL_SECONDS} seconds"
        ));
    }

    ValidationResult::ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_validation() {
        assert!(validate_http_endpoint("http://example.com").is_valid);
        assert!(validate_http_endpoint("https://example.com").is_valid);
        assert!(validate_http_endpoint("http://example.com:8080/path").is_valid);
        assert!(validate_http_endpoint("https://8.8.8.8").is_valid);

        assert!(!validate_http_endpoint("").is_valid);
        assert!(!validate_http_endpoint("example.com").is_valid);
        assert!(!validate_http_endpoint("ftp://example.com").is_valid);
    }

    #[test]
    fn test_private_hosts_rejected() {
        for url in [
            "http://localhost",
            "http://api.localhost:3000",
            "http://127.0.0.1",
            "http://10.0.0.1",
            "http://172.16.0.1",
            "http://172.31.255.255",
            "http://192.168.1.1",
            "http://169.254.169.254/latest/meta-data",
            "http://0.0.0.0",
            "http://[::1]",
            "http://[::]",
            "http://[fd00::1]",
            "http://[fe80::1]",
            "http://[::ffff:10.0.0.1]",
        ] {
            let result = validate_http_endpoint(url);
            assert!(!result.is_valid, "{url} should be rejected");
            assert_eq!(
                result.error.as_deref(),
                Some("URL must not point to a private or local address"),
                "{url}"
            );
        }

        assert!(validate_http_endpoint("http://172.32.0.1").is_valid);
        assert!(validate_http_endpoint("http://[2606:4700::1111]").is_valid);
    }

    #[test]
    fn test_name_validation() {
        assert!(validate_monitor_name("My Monitor").is_valid);
        assert!(!validate_monitor_name("").is_valid);
        assert!(!validate_monitor_name("   ").is_valid);
    }

    #[test]
    fn test_long_and_multibyte_names_accepted() {
        assert!(validate_monitor_name(&"日".repeat(40)).is_valid);
        assert!(validate_monitor_name(&"x".repeat(500)).is_valid);
    }

    #[test]
    fn test_update_validates_only_present_fields() {
        assert!(validate_monitor_update(None, None, None).is_ok());
        assert!(validate_monitor_update(Some("Renamed"), None, Some(600)).is_ok());
        assert_eq!(
            validate_monitor_update(Some(" "), None, None),
            Err(ValidationError("Name is required".into()))
        );
        assert_eq!(
            validate_monitor_update(None, Some("http://192.168.0.10"), None),
            Err(ValidationError("URL must not point to a private or local address".into()))
        );
        assert!(validate_monitor_update(None, None, Some(10)).is_err());
    }

    #[test]
    fn test_interval_validation() {
        assert!(validate_interval(MIN_INTERVAL_SECONDS).is_valid);
        assert!(validate_interval(DEFAULT_INTERVAL_SECONDS).is_valid);
        assert!(validate_interval(MAX_INTERVAL_SECONDS).is_valid);
        assert!(!validate_interval(29).is_valid);
        assert!(!validate_interval(3601).is_valid);
    }

    #[test]
    fn test_validate_new_monitor_reports_first_problem() {
        assert!(validate_new_monitor("Site", "https://example.com", 300).is_ok());
        assert_eq!(
            validate_new_monitor("", "http://localhost", 5),
            Err(ValidationError("Name is required".into()))
        );
        assert_eq!(
            validate_new_monitor("Site", "https://example.com", 5).unwrap_err().to_string(),
            "Interval must be between 30 and 3600 seconds"
        );
    }
}
