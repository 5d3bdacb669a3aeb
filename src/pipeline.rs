//! The response-handling pipeline.
//!
//! Every response goes through three stages:
//!
//! 1. an [`ErrorClassifier`] decides whether the response is a failure,
//! 2. failures go to an [`ErrorParser`], which turns them into an [`Error`],
//! 3. everything else goes to a [`SuccessParser`], which fills the caller's
//!    output slot.
//!
//! Each stage can be replaced on its own through the client's `set_*` and
//! `with_*` methods. Closures with the matching signature work as stages.
//!
//! Stages see the body after it has been read in full. The enclosing client
//! method owns the connection and releases it before returning.

use crate::{ApiError, Error, Result};
use http::{HeaderMap, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use std::borrow::Cow;
use std::sync::Arc;
use url::Url;

/// A response whose body has been read to the end.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
    /// The final URL of the response.
    pub url: Url,
    /// The complete response body.
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Reads `response` to completion, releasing the connection.
    ///
    /// A body that stops arriving before the transport's own timeout fires
    /// yields [`Error::Timeout`], the same as a timed-out request.
    pub async fn read(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response.bytes().await.map_err(Error::from_reqwest)?.to_vec();

        Ok(Self {
            status,
            headers,
            url,
            body,
        })
    }

    /// Returns the body as text, replacing invalid UTF-8.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    fn decode_failure(&self, error: serde_json::Error) -> Error {
        Error::DeserializationFailed {
            raw_response: self.text().into_owned(),
            serde_error: error.to_string(),
            status: self.status,
        }
    }
}

/// A caller-owned slot that a [`SuccessParser`] decodes into.
///
/// Implemented for every type that can be deserialized from JSON, so any
/// `&mut T` works as a slot.
pub trait JsonTarget {
    /// Replaces the slot's contents with the JSON document in `body`.
    fn fill_from_slice(&mut self, body: &[u8]) -> serde_json::Result<()>;
}

impl<T: DeserializeOwned> JsonTarget for T {
    fn fill_from_slice(&mut self, body: &[u8]) -> serde_json::Result<()> {
        *self = serde_json::from_slice(body)?;
        Ok(())
    }
}

/// Decides whether a response is an API failure.
pub trait ErrorClassifier: Send + Sync {
    /// Returns `true` if `response` should go to the error parser.
    fn is_error(&self, response: &RawResponse) -> bool;
}

/// Turns a failed response into an [`Error`].
pub trait ErrorParser: Send + Sync {
    /// Builds the error returned to the caller for `response`.
    fn parse_error(&self, response: &RawResponse) -> Error;
}

/// Decodes a successful response into the caller's output slot.
pub trait SuccessParser: Send + Sync {
    /// Fills `output` from `response`. A `None` slot means the body is ignored.
    fn parse_success(&self, response: &RawResponse, output: Option<&mut dyn JsonTarget>)
        -> Result<()>;
}

impl<F> ErrorClassifier for F
where
    F: Fn(&RawResponse) -> bool + Send + Sync,
{
    fn is_error(&self, response: &RawResponse) -> bool {
        self(response)
    }
}

impl<F> ErrorParser for F
where
    F: Fn(&RawResponse) -> Error + Send + Sync,
{
    fn parse_error(&self, response: &RawResponse) -> Error {
        self(response)
    }
}

impl<F> SuccessParser for F
where
    F: Fn(&RawResponse, Option<&mut dyn JsonTarget>) -> Result<()> + Send + Sync,
{
    fn parse_success(
        &self,
        response: &RawResponse,
        output: Option<&mut dyn JsonTarget>,
    ) -> Result<()> {
        self(response, output)
    }
}

/// Treats every status of 400 and above as a failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusClassifier;

impl ErrorClassifier for StatusClassifier {
    fn is_error(&self, response: &RawResponse) -> bool {
        response.status.as_u16() >= 400
    }
}

/// Decodes the body as JSON straight into the output slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSuccessParser;

impl SuccessParser for JsonSuccessParser {
    fn parse_success(
        &self,
        response: &RawResponse,
        output: Option<&mut dyn JsonTarget>,
    ) -> Result<()> {
        let Some(output) = output else {
            return Ok(());
        };

        output.fill_from_slice(&response.body).map_err(|e| {
            tracing::error!(
                error = %e,
                status = response.status.as_u16(),
                raw_response = %response.text(),
                "Failed to deserialize response"
            );
            response.decode_failure(e)
        })
    }
}

/// Decodes the CircleCI error body into [`Error::Api`].
///
/// Accepts the documented flat shape `{"message": "..."}` as well as the
/// nested `{"errors": {"message": "..."}}` shape. A body that is neither
/// becomes [`Error::DeserializationFailed`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonErrorParser;

#[derive(Deserialize)]
struct ErrorMessage {
    message: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Nested { errors: ErrorMessage },
    Flat(ErrorMessage),
}

impl ErrorParser for JsonErrorParser {
    fn parse_error(&self, response: &RawResponse) -> Error {
        let raw_response = response.text().into_owned();

        let message = match serde_json::from_slice::<ErrorBody>(&response.body) {
            Ok(ErrorBody::Nested { errors }) => errors.message,
            Ok(ErrorBody::Flat(error)) => error.message,
            Err(e) => return response.decode_failure(e),
        };
        let source = ApiError::new(message);

        if response.status.is_server_error() {
            tracing::warn!(status = response.status.as_u16(), message = %source, "Server error (5xx)");
        } else {
            tracing::error!(status = response.status.as_u16(), message = %source, "API error");
        }

        Error::Api {
            status: response.status,
            source,
            raw_response,
        }
    }
}

pub(crate) fn default_classifier() -> Arc<dyn ErrorClassifier> {
    Arc::new(StatusClassifier)
}

pub(crate) fn default_success_parser() -> Arc<dyn SuccessParser> {
    Arc::new(JsonSuccessParser)
}

pub(crate) fn default_error_parser() -> Arc<dyn ErrorParser> {
    Arc::new(JsonErrorParser)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            url: Url::parse("https://circleci.com/api/v2/insights").unwrap(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Item {
        id: String,
    }

    #[test]
    fn classifier_splits_at_400() {
        assert!(!StatusClassifier.is_error(&raw(200, "")));
        assert!(!StatusClassifier.is_error(&raw(399, "")));
        assert!(StatusClassifier.is_error(&raw(400, "")));
        assert!(StatusClassifier.is_error(&raw(503, "")));
    }

    #[test]
    fn success_parser_fills_slot() {
        let mut item = Item::default();
        JsonSuccessParser
            .parse_success(&raw(200, r#"{"id":"abc","extra":1}"#), Some(&mut item as &mut dyn JsonTarget))
            .unwrap();
        assert_eq!(item, Item { id: "abc".to_string() });
    }

    #[test]
    fn success_parser_without_slot_ignores_body() {
        JsonSuccessParser
            .parse_success(&raw(204, "not json at all"), None)
            .unwrap();
    }

    #[test]
    fn success_parser_reports_malformed_body() {
        let mut item = Item::default();
        let err = JsonSuccessParser
            .parse_success(&raw(200, "oops"), Some(&mut item as &mut dyn JsonTarget))
            .unwrap_err();

        match err {
            Error::DeserializationFailed { raw_response, status, .. } => {
                assert_eq!(raw_response, "oops");
                assert_eq!(status, StatusCode::OK);
            }
            other => panic!("Expected DeserializationFailed, got {:?}", other),
        }
    }

    #[test]
    fn error_parser_accepts_flat_body() {
        let err = JsonErrorParser.parse_error(&raw(404, r#"{"message":"Project not found"}"#));
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.api_error().unwrap().message, "Project not found");
    }

    #[test]
    fn error_parser_accepts_nested_body() {
        let err = JsonErrorParser.parse_error(&raw(400, r#"{"errors":{"message":"bad branch"}}"#));
        assert_eq!(err.api_error().unwrap().message, "bad branch");
        assert_eq!(err.to_string(), "API error 400 Bad Request: bad branch");
    }

    #[test]
    fn error_parser_rejects_bodies_without_a_message() {
        for body in [r#"{"errors":[{"message":"a"}]}"#, r#"{"error":"x"}"#, "{}"] {
            let err = JsonErrorParser.parse_error(&raw(400, body));
            match err {
                Error::DeserializationFailed { raw_response, status, .. } => {
                    assert_eq!(raw_response, body);
                    assert_eq!(status, StatusCode::BAD_REQUEST);
                }
                other => panic!("Expected DeserializationFailed for {}, got {:?}", body, other),
            }
        }
    }

    #[test]
    fn error_parser_keeps_flat_message_next_to_other_fields() {
        let err = JsonErrorParser.parse_error(&raw(422, r#"{"message":"bad","errors":[1]}"#));
        assert_eq!(err.api_error().unwrap().message, "bad");
    }

    #[test]
    fn error_parser_reports_undecodable_body() {
        let err = JsonErrorParser.parse_error(&raw(502, "<html>Bad Gateway</html>"));
        assert!(matches!(err, Error::DeserializationFailed { .. }));
        assert_eq!(err.raw_response(), Some("<html>Bad Gateway</html>"));
    }

    #[test]
    fn closures_act_as_stages() {
        let classifier = |response: &RawResponse| response.status == StatusCode::NOT_FOUND;
        assert!(classifier.is_error(&raw(404, "")));
        assert!(!classifier.is_error(&raw(500, "")));

        let parser = |response: &RawResponse| Error::ConfigurationError(response.text().into_owned());
        assert!(matches!(parser.parse_error(&raw(500, "x")), Error::ConfigurationError(m) if m == "x"));
    }
}
