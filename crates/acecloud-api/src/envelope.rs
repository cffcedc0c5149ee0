//! Decoding of the `{error, message, data}` wrapper every response uses.

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::types::null_as_default;
use crate::{Error, Result};

/// The error half of the envelope. Decoded before the payload so failures
/// are classified even when `data` has an unexpected shape.
#[derive(Debug, Default, Deserialize)]
struct Status {
    #[serde(default, deserialize_with = "null_as_default")]
    error: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    message: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

/// Classify a raw response body and decode its `data` payload.
///
/// Returns `Ok(None)` for a successful envelope without `data` (or an
/// empty body). HTTP status >= 400 and `error: true` both become
/// [`Error::Api`]; a successful status with a body that is not JSON is an
/// [`Error::Decode`].
pub fn decode_envelope<T: DeserializeOwned>(
    endpoint: &'static str,
    status: StatusCode,
    body: &[u8],
) -> Result<Option<T>> {
    let blank = body.iter().all(u8::is_ascii_whitespace);

    if status.as_u16() >= 400 {
        let head: Status = if blank {
            Status::default()
        } else {
            serde_json::from_slice(body).unwrap_or_default()
        };
        let message = if head.message.is_empty() {
            fallback_message(status, body)
        } else {
            head.message
        };
        return Err(Error::Api {
            endpoint,
            status,
            message,
        });
    }

    if blank {
        return Ok(None);
    }

    let head: Status =
        serde_json::from_slice(body).map_err(|source| Error::Decode { endpoint, source })?;
    if head.error {
        return Err(Error::Api {
            endpoint,
            status,
            message: head.message,
        });
    }

    let envelope: Envelope<T> =
        serde_json::from_slice(body).map_err(|source| Error::Decode { endpoint, source })?;
    Ok(envelope.data)
}

fn fallback_message(status: StatusCode, body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        text.to_string()
    }
}
