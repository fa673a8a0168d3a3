//! Request and response body codecs.
//!
//! The expected response type of a call is a type implementing
//! [`DecodeBody`]. Decoding failures surface as
//! [`ClientError::UnknownContentType`](crate::ClientError::UnknownContentType).

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Error decoding a response body.
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct DecodeError {
    /// Why decoding failed.
    pub reason: String,
}

impl DecodeError {
    /// Create a new decode error.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A type a response body can be decoded into.
pub trait DecodeBody: Sized + Send + 'static {
    /// Decode `body`, given the response's content type.
    fn decode(content_type: Option<&str>, body: Bytes) -> Result<Self, DecodeError>;
}

impl DecodeBody for String {
    fn decode(_content_type: Option<&str>, body: Bytes) -> Result<Self, DecodeError> {
        String::from_utf8(body.to_vec())
            .map_err(|e| DecodeError::new(format!("Response body is not valid UTF-8: {e}")))
    }
}

impl DecodeBody for Bytes {
    fn decode(_content_type: Option<&str>, body: Bytes) -> Result<Self, DecodeError> {
        Ok(body)
    }
}

impl DecodeBody for Vec<u8> {
    fn decode(_content_type: Option<&str>, body: Bytes) -> Result<Self, DecodeError> {
        Ok(body.to_vec())
    }
}

impl DecodeBody for () {
    fn decode(_content_type: Option<&str>, _body: Bytes) -> Result<Self, DecodeError> {
        Ok(())
    }
}

impl DecodeBody for serde_json::Value {
    fn decode(content_type: Option<&str>, body: Bytes) -> Result<Self, DecodeError> {
        decode_json(content_type, &body)
    }
}

/// JSON response wrapper.
///
/// Rejects responses whose content type is set and is not JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    /// Unwrap the inner value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: DeserializeOwned + Send + 'static> DecodeBody for Json<T> {
    fn decode(content_type: Option<&str>, body: Bytes) -> Result<Self, DecodeError> {
        decode_json(content_type, &body).map(Json)
    }
}

fn decode_json<T: DeserializeOwned>(content_type: Option<&str>, body: &[u8]) -> Result<T, DecodeError> {
    if let Some(ct) = content_type {
        if !is_json(ct) {
            return Err(DecodeError::new(format!(
                "Content type '{ct}' is not supported for JSON decoding"
            )));
        }
    }
    serde_json::from_slice(body).map_err(|e| DecodeError::new(format!("Invalid JSON body: {e}")))
}

/// Whether `content_type` is a JSON media type (`application/json`, `*/*+json`).
pub fn is_json(content_type: &str) -> bool {
    match content_type.parse::<mime::Mime>() {
        Ok(m) => {
            m.subtype() == mime::JSON || m.suffix().map(|s| s == mime::JSON).unwrap_or(false)
        }
        Err(_) => false,
    }
}

/// Serialize a request body as JSON.
pub fn encode_json<T: Serialize + ?Sized>(body: &T) -> Result<Bytes, serde_json::Error> {
    serde_json::to_vec(body).map(Bytes::from)
}
