// Opaque pagination cursors.
//
// A cursor encodes the exact position after the last record returned:
// `(timestamp, record id)` under the collection's total order. The wire
// format is URL-safe base64 over a small JSON record, so tokens survive
// query strings untouched.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid cursor: {0}")]
pub struct InvalidCursor(pub String);

#[derive(Debug, Deserialize)]
struct CursorPayload {
    timestamp: String,
    id: String,
}

pub fn encode(timestamp: DateTime<Utc>, id: &str) -> String {
    let payload = serde_json::json!({
        "timestamp": timestamp.to_rfc3339(),
        "id": id,
    });
    URL_SAFE.encode(payload.to_string())
}

/// Inverse of [`encode`]. Timestamps carrying a non-UTC offset are
/// normalized to UTC so `decode(encode(t, id)) == (t, id)` holds exactly.
pub fn decode(token: &str) -> Result<(DateTime<Utc>, String), InvalidCursor> {
    let raw = URL_SAFE
        .decode(token)
        .map_err(|e| InvalidCursor(format!("not valid base64: {}", e)))?;

    let payload: CursorPayload = serde_json::from_slice(&raw)
        .map_err(|e| InvalidCursor(format!("malformed payload: {}", e)))?;

    let timestamp = DateTime::parse_from_rfc3339(&payload.timestamp)
        .map_err(|e| InvalidCursor(format!("bad timestamp '{}': {}", payload.timestamp, e)))?
        .with_timezone(&Utc);

    Ok((timestamp, payload.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn round_trip_is_exact() {
        let t = Utc.with_ymd_and_hms(2026, 1, 8, 8, 30, 0).unwrap()
            + chrono::Duration::microseconds(123_456);
        let token = encode(t, "abc123");
        let (decoded_t, decoded_id) = decode(&token).unwrap();
        assert_eq!(decoded_t, t);
        assert_eq!(decoded_id, "abc123");
    }

    #[test]
    fn tokens_are_url_safe() {
        let t = Utc.with_ymd_and_hms(2026, 3, 15, 23, 59, 59).unwrap();
        let token = encode(t, "some-id-with-dashes");
        assert!(!token.contains('+'));
        assert!(!token.contains('/'));
    }

    #[test]
    fn offset_timestamps_normalize_to_utc() {
        // Hand-built token with a +05:30 offset
        let raw = r#"{"timestamp":"2026-01-08T14:00:00+05:30","id":"x"}"#;
        let token = URL_SAFE.encode(raw);
        let (t, id) = decode(&token).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2026, 1, 8, 8, 30, 0).unwrap());
        assert_eq!(id, "x");
    }

    #[test]
    fn rejects_non_base64_input() {
        assert!(decode("!!! not base64 !!!").is_err());
    }

    #[test]
    fn rejects_malformed_json() {
        let token = URL_SAFE.encode("not json at all");
        assert!(decode(&token).is_err());
    }

    #[test]
    fn rejects_missing_fields() {
        let token = URL_SAFE.encode(r#"{"timestamp":"2026-01-08T08:30:00Z"}"#);
        assert!(decode(&token).is_err());
    }

    #[test]
    fn rejects_unparseable_timestamp() {
        let token = URL_SAFE.encode(r#"{"timestamp":"yesterday","id":"x"}"#);
        assert!(decode(&token).is_err());
    }
}
