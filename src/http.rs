//! Shared HTTP plumbing for source and AI clients.

use std::time::Duration;

use crate::retry::RemoteError;

/// User agent string sent to every service
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Build an HTTP client with gzip, our user agent and a request timeout.
pub fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .gzip(true)
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .expect("Failed to build HTTP client")
}

/// Turn a non-success response into a classified [`RemoteError`].
///
/// Honors `Retry-After` on 429 so the retry loop can wait long enough.
pub async fn error_for_response(response: reqwest::Response) -> RemoteError {
    let status = response.status().as_u16();

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    let body = response.text().await.unwrap_or_default();
    classify_error(status, retry_after, &body)
}

/// Classify an error status plus body.
///
/// Some services answer an exhausted account with 429, the same status as a
/// burst limit. Only the body tells them apart, and retrying the former is
/// pointless.
pub fn classify_error(status: u16, retry_after: Option<u64>, body: &str) -> RemoteError {
    match RemoteError::from_status(status, body) {
        RemoteError::RateLimited { .. } if body.contains("insufficient_quota") => {
            RemoteError::QuotaExhausted(body.chars().take(200).collect())
        }
        RemoteError::RateLimited { .. } => RemoteError::RateLimited {
            retry_after_secs: retry_after,
        },
        other => other,
    }
}

/// Trim a string field and drop it when blank.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_format() {
        assert!(USER_AGENT.starts_with("barcode-resolver/"));
    }

    #[test]
    fn test_quota_429_is_permanent() {
        let body = r#"{"error": {"type": "insufficient_quota", "message": "You exceeded your quota"}}"#;
        assert!(matches!(
            classify_error(429, None, body),
            RemoteError::QuotaExhausted(_)
        ));
        assert_eq!(
            classify_error(429, Some(3), "slow down"),
            RemoteError::RateLimited {
                retry_after_secs: Some(3)
            }
        );
        assert!(matches!(
            classify_error(402, None, "Insufficient Balance"),
            RemoteError::QuotaExhausted(_)
        ));
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  Exo ".to_string())), Some("Exo".to_string()));
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(None), None);
    }
}
