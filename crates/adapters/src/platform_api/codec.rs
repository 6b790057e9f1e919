//! JSON request/response codec.

use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::error;

const JSON: &str = "application/json";

/// Request bodies that could not be turned into an operation's input
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to read request body: {reason}")]
    Body { reason: String },

    #[error("Invalid request body: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

/// Encode `value` as the JSON response body.
///
/// Values that serialize to `null` (`()`, `None`) are sent as `{}`, so every
/// response carries a JSON object.
pub fn encode<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Response {
    let value = match serde_json::to_value(value) {
        Ok(Value::Null) => Value::Object(Default::default()),
        Ok(value) => value,
        Err(err) => {
            error!(error = %err, "failed to encode response body");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(CONTENT_TYPE, JSON)],
                "{}",
            )
                .into_response();
        }
    };

    (status, [(CONTENT_TYPE, JSON)], value.to_string()).into_response()
}

/// Decode a JSON request body.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, DecodeError> {
    Ok(serde_json::from_slice(body)?)
}

/// 204 with no body.
pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde::Deserialize;

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_absent_values_encode_as_empty_object() {
        let response = encode(StatusCode::OK, &());
        assert_eq!(response.headers()[CONTENT_TYPE], JSON);
        assert_eq!(body_string(response).await, "{}");

        let response = encode(StatusCode::OK, &Option::<Vec<String>>::None);
        assert_eq!(body_string(response).await, "{}");
    }

    #[tokio::test]
    async fn test_encode_keeps_status_and_payload() {
        let response = encode(StatusCode::CREATED, &serde_json::json!({"name": "acme-inc"}));
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_string(response).await, r#"{"name":"acme-inc"}"#);

        let response = encode(StatusCode::OK, &Vec::<String>::new());
        assert_eq!(body_string(response).await, "[]");
    }

    #[derive(Debug, Deserialize)]
    struct Form {
        name: String,
    }

    #[test]
    fn test_decode() {
        let form: Form = decode(br#"{"name":"acme-inc"}"#).unwrap();
        assert_eq!(form.name, "acme-inc");

        assert!(matches!(decode::<Form>(b"{"), Err(DecodeError::Json { .. })));
        assert!(decode::<Form>(b"").is_err());
        assert!(decode::<Form>(br#"{"other":1}"#).is_err());
    }

    #[tokio::test]
    async fn test_no_content() {
        let response = no_content();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(body_string(response).await.is_empty());
    }
}
