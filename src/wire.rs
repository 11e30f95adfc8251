use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use crate::RiskRadarError;

/// Body of `GET /api/v1/auth/status`; only the flag is interpreted.
#[derive(Debug, Deserialize)]
pub struct AuthStatusBody {
    #[serde(default)]
    pub authenticated: Option<bool>,
}

/// Decodes an error response body, falling back to the reason phrase when
/// the body is not JSON.
pub fn parse_error_payload(status: StatusCode, body: &str) -> JsonValue {
    match serde_json::from_str::<JsonValue>(body) {
        Ok(value) if !value.is_null() => value,
        _ => {
            let message = status
                .canonical_reason()
                .map(str::to_owned)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            json!({ "error": message })
        }
    }
}

/// `null`, `false`, `""` and `0` carry no information and count as missing.
fn is_blank(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::Bool(flag) => !flag,
        JsonValue::String(text) => text.is_empty(),
        JsonValue::Number(number) => number.as_f64() == Some(0.0),
        JsonValue::Array(_) | JsonValue::Object(_) => false,
    }
}

/// Message reported by the service: `error`, then DRF-style `detail`.
fn payload_message(payload: &JsonValue) -> Option<String> {
    ["error", "detail"]
        .iter()
        .filter_map(|key| payload.get(key))
        .find(|value| !is_blank(value))
        .map(|value| match value {
            JsonValue::String(text) => text.clone(),
            other => other.to_string(),
        })
}

fn message_or(payload: &JsonValue, default: &str) -> String {
    payload_message(payload).unwrap_or_else(|| default.to_owned())
}

/// Maps a non-success status and its payload to a classified error.
///
/// Retry decisions are taken by the caller; this only names the condition.
pub fn classify_response(status: StatusCode, payload: JsonValue) -> RiskRadarError {
    let code = status.as_u16();

    match code {
        401 => RiskRadarError::Authentication {
            message: message_or(&payload, "Authentication required or token expired"),
            details: payload,
        },
        403 => RiskRadarError::Permission {
            message: message_or(&payload, "Insufficient permissions for this endpoint"),
            details: payload,
        },
        409 => match payload.get("duplicate_info").cloned() {
            Some(duplicate_info) if !is_blank(&duplicate_info) => RiskRadarError::DuplicateFile {
                message: message_or(&payload, "Duplicate file detected"),
                duplicate_info,
                details: payload,
            },
            _ => RiskRadarError::Api {
                message: message_or(&payload, "Conflict - possibly duplicate resource"),
                status: Some(code),
                details: payload,
            },
        },
        429 => RiskRadarError::RateLimited {
            message: message_or(&payload, "Rate limit exceeded"),
            details: payload,
        },
        500..=599 => RiskRadarError::Server {
            message: message_or(&payload, &format!("HTTP {code}")),
            status: code,
            details: payload,
        },
        _ => RiskRadarError::Api {
            message: message_or(&payload, &format!("HTTP {code}")),
            status: Some(code),
            details: payload,
        },
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::json;

    use super::{classify_response, parse_error_payload};
    use crate::RiskRadarError;

    #[test]
    fn non_json_body_falls_back_to_reason_phrase() {
        let payload = parse_error_payload(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(payload, json!({"error": "Bad Gateway"}));
    }

    #[test]
    fn unknown_status_without_reason_uses_code() {
        let status = StatusCode::from_u16(599).expect("valid status");
        let payload = parse_error_payload(status, "");
        assert_eq!(payload, json!({"error": "HTTP 599"}));
    }

    #[test]
    fn classifies_each_status_family() {
        let cases = [
            (401, "authentication", Some(401)),
            (403, "permission", Some(403)),
            (409, "api", Some(409)),
            (429, "rate_limited", Some(429)),
            (503, "server", Some(503)),
            (404, "api", Some(404)),
            (422, "api", Some(422)),
        ];
        for (code, kind, expected) in cases {
            let status = StatusCode::from_u16(code).expect("valid status");
            let err = classify_response(status, json!({"error": "nope"}));
            assert_eq!(err.kind(), kind, "status {code}");
            assert_eq!(err.status_code(), expected, "status {code}");
            assert_eq!(err.message(), "nope");
        }
    }

    #[test]
    fn duplicate_info_is_copied_verbatim() {
        let info = json!({"existing_id": 12, "uploaded_at": "2024-01-01T00:00:00Z"});
        let err = classify_response(
            StatusCode::CONFLICT,
            json!({"error": "already imported", "duplicate_info": info.clone()}),
        );
        match err {
            RiskRadarError::DuplicateFile {
                message,
                duplicate_info,
                ..
            } => {
                assert_eq!(message, "already imported");
                assert_eq!(duplicate_info, info);
            }
            other => panic!("expected duplicate error, got {other:?}"),
        }
    }

    #[test]
    fn default_messages_when_payload_has_none() {
        let err = classify_response(StatusCode::UNAUTHORIZED, json!({}));
        assert_eq!(err.message(), "Authentication required or token expired");
        let err = classify_response(StatusCode::CONFLICT, json!({}));
        assert_eq!(err.message(), "Conflict - possibly duplicate resource");
        let err = classify_response(StatusCode::IM_A_TEAPOT, json!({}));
        assert_eq!(err.message(), "HTTP 418");
    }

    #[test]
    fn drf_detail_is_used_when_error_is_missing() {
        let err = classify_response(
            StatusCode::FORBIDDEN,
            json!({"detail": "You do not have permission to perform this action."}),
        );
        assert_eq!(
            err.message(),
            "You do not have permission to perform this action."
        );
    }

    #[test]
    fn blank_message_fields_fall_through() {
        let err = classify_response(StatusCode::UNAUTHORIZED, json!({"error": ""}));
        assert_eq!(err.message(), "Authentication required or token expired");

        let err = classify_response(
            StatusCode::FORBIDDEN,
            json!({"error": false, "detail": "staff only"}),
        );
        assert_eq!(err.message(), "staff only");

        let err = classify_response(StatusCode::BAD_GATEWAY, json!({"error": 0, "detail": ""}));
        assert_eq!(err.message(), "HTTP 502");
    }

    #[test]
    fn blank_duplicate_info_is_a_plain_conflict() {
        for info in [json!(null), json!(false), json!(""), json!(0)] {
            let err = classify_response(
                StatusCode::CONFLICT,
                json!({"error": "conflict", "duplicate_info": info.clone()}),
            );
            assert_eq!(err.kind(), "api", "duplicate_info {info}");
            assert_eq!(err.status_code(), Some(409));
            assert!(err.duplicate_info().is_none());
        }
    }
}
