//! Uniform result of an outbound call.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Uniform success/failure result returned for every call.
///
/// Exactly one of payload and error is present. The status is always
/// present, and the 2xx flag is fixed when the envelope is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(with = "status_code")]
    status: StatusCode,
    is_success_2xx: bool,
}

impl<T> ResponseEnvelope<T> {
    /// Create an envelope for a decoded response.
    ///
    /// The 2xx flag is derived from `status`.
    pub fn success(payload: T, status: StatusCode) -> Self {
        Self {
            payload: Some(payload),
            error: None,
            status,
            is_success_2xx: status.is_success(),
        }
    }

    /// Create an envelope for a failed call. Never flagged as 2xx.
    pub fn failure(error: impl Into<String>, status: StatusCode) -> Self {
        Self {
            payload: None,
            error: Some(error.into()),
            status,
            is_success_2xx: false,
        }
    }

    /// Get the payload.
    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    /// Take the payload.
    pub fn into_payload(self) -> Option<T> {
        self.payload
    }

    /// Get the error text.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Whether the call produced a 2xx response.
    pub fn is_success_2xx(&self) -> bool {
        self.is_success_2xx
    }

    /// Convert into a `Result`, keeping the status on both sides.
    pub fn into_result(self) -> Result<(T, StatusCode), (String, StatusCode)> {
        match (self.payload, self.error) {
            (Some(payload), _) => Ok((payload, self.status)),
            (None, error) => Err((error.unwrap_or_default(), self.status)),
        }
    }

    /// Map the payload, keeping status and flag.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResponseEnvelope<U> {
        ResponseEnvelope {
            payload: self.payload.map(f),
            error: self.error,
            status: self.status,
            is_success_2xx: self.is_success_2xx,
        }
    }
}

mod status_code {
    use reqwest::StatusCode;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(status: &StatusCode, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(status.as_u16())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<StatusCode, D::Error> {
        let raw = u16::deserialize(deserializer)?;
        StatusCode::from_u16(raw).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(200, true)]
    #[case(204, true)]
    #[case(299, true)]
    #[case(199, false)]
    #[case(302, false)]
    #[case(404, false)]
    #[case(500, false)]
    fn test_success_flag_derived_from_status(#[case] code: u16, #[case] expected: bool) {
        let status = StatusCode::from_u16(code).unwrap();
        let envelope = ResponseEnvelope::success("X".to_string(), status);
        assert_eq!(envelope.is_success_2xx(), expected);
        assert_eq!(envelope.payload().map(String::as_str), Some("X"));
        assert_eq!(envelope.status(), status);
        assert!(envelope.error().is_none());
    }

    #[test]
    fn test_failure_never_success() {
        let envelope = ResponseEnvelope::<String>::failure("Not Found", StatusCode::NOT_FOUND);
        assert!(!envelope.is_success_2xx());
        assert!(envelope.payload().is_none());
        assert_eq!(envelope.error(), Some("Not Found"));
        assert_eq!(envelope.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_into_result() {
        let ok = ResponseEnvelope::success(7, StatusCode::OK);
        assert_eq!(ok.into_result(), Ok((7, StatusCode::OK)));

        let err = ResponseEnvelope::<i32>::failure("boom", StatusCode::BAD_GATEWAY);
        assert_eq!(
            err.into_result(),
            Err(("boom".to_string(), StatusCode::BAD_GATEWAY))
        );
    }

    #[test]
    fn test_map_keeps_status() {
        let envelope = ResponseEnvelope::success(2, StatusCode::CREATED).map(|n| n * 10);
        assert_eq!(envelope.payload(), Some(&20));
        assert_eq!(envelope.status(), StatusCode::CREATED);
        assert!(envelope.is_success_2xx());
    }

    #[test]
    fn test_serde_status_as_number() {
        let envelope = ResponseEnvelope::<String>::failure("nope", StatusCode::FORBIDDEN);
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"error": "nope", "status": 403, "is_success_2xx": false})
        );

        let back: ResponseEnvelope<String> = serde_json::from_value(json).unwrap();
        assert_eq!(back, envelope);
    }
}
