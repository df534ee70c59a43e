//! Response DTOs for the command protocol
//!
//! Every command produces exactly one [`Reply`], written as a single JSON line:
//! `{"ok": ...}` on success or `{"error": {...}}` on failure.

use serde::Serialize;
use serde_json::Value;

use crate::cache::{CacheStats, EvictionStrategy};
use crate::error::{CacheError, ErrorCode};

/// One protocol response line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reply {
    Ok(Value),
    Error(ErrorResponse),
}

impl Reply {
    /// Serializes the reply as one JSON line (no trailing newline).
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            format!(
                r#"{{"error":{{"message":"Failed to encode reply: {}","code":"internal"}}}}"#,
                err
            )
        })
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Reply::Ok(_))
    }
}

impl From<CacheError> for Reply {
    fn from(err: CacheError) -> Self {
        Reply::Error(ErrorResponse::from(err))
    }
}

/// Response body for `get`
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub value: Value,
    /// Idle time left before the entry expires, None when it cannot expire
    pub ttl_remaining_ms: Option<u64>,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: Value, ttl_remaining_ms: Option<u64>) -> Self {
        Self {
            key: key.into(),
            value,
            ttl_remaining_ms,
        }
    }
}

/// Response body for `size`
#[derive(Debug, Clone, Serialize)]
pub struct SizeResponse {
    pub size: usize,
    pub capacity: Option<usize>,
}

/// Response body for `stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub session: String,
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    pub capacity: Option<usize>,
    pub strategy: EvictionStrategy,
    /// Snapshot time in RFC 3339 format
    pub timestamp: String,
}

impl StatsResponse {
    /// Creates a new StatsResponse stamped with the current time
    pub fn new(
        session: impl Into<String>,
        stats: CacheStats,
        capacity: Option<usize>,
        strategy: EvictionStrategy,
    ) -> Self {
        Self {
            session: session.into(),
            hit_rate: stats.hit_rate(),
            stats,
            capacity,
            strategy,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub message: String,
    pub code: ErrorCode,
}

impl From<CacheError> for ErrorResponse {
    fn from(err: CacheError) -> Self {
        Self {
            message: err.to_string(),
            code: err.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_reply_line() {
        let reply = Reply::Ok(json!(true));
        assert_eq!(reply.to_line(), r#"{"ok":true}"#);
        assert!(reply.is_ok());
    }

    #[test]
    fn test_error_reply_line() {
        let reply = Reply::from(CacheError::UnknownSession("world".to_string()));
        let json: Value = serde_json::from_str(&reply.to_line()).unwrap();

        assert_eq!(json["error"]["code"], "unknown_session");
        assert!(json["error"]["message"].as_str().unwrap().contains("world"));
        assert!(!reply.is_ok());
    }

    #[test]
    fn test_get_response_serialize() {
        let resp = GetResponse::new("test_key", json!({"hp": 10}), None);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["key"], "test_key");
        assert_eq!(json["value"]["hp"], 10);
        assert!(json["ttl_remaining_ms"].is_null());
    }

    #[test]
    fn test_stats_response_flattens_counters() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_miss();
        let resp = StatsResponse::new("s", stats, Some(10), EvictionStrategy::Both);
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["hits"], 1);
        assert_eq!(json["misses"], 1);
        assert_eq!(json["hit_rate"], 0.5);
        assert_eq!(json["strategy"], "both");
        assert!(json["timestamp"].is_string());
    }
}
