//! Error types for CircleCI API calls.
//!
//! Every failure is returned to the caller as an [`Error`]. Typed calls that
//! fail after a response arrived return [`Error::Response`], which keeps the
//! status, headers and raw body next to the error the response stages produced.

use crate::pipeline::RawResponse;
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};

/// The error body returned by the CircleCI v2 API.
///
/// # Examples
///
/// ```
/// use circleci_v2::ApiError;
///
/// let err = ApiError::new("Project not found");
/// assert_eq!(err.to_string(), "Project not found");
/// ```
#[derive(thiserror::Error, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct ApiError {
    /// The human-readable message sent by the API.
    pub message: String,
}

impl ApiError {
    /// Creates an `ApiError` with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The main error type for CircleCI API calls.
///
/// # Examples
///
/// ```no_run
/// use circleci_v2::{Client, Context, Error};
///
/// # async fn example() {
/// let client = Client::new("my-token");
/// let ctx = Context::background();
///
/// match client.workflow_runs(&ctx, "gh/org/repo", "build", None).await {
///     Ok(response) => println!("{} runs", response.items.len()),
///     Err(e) => {
///         // Status and headers survive whatever the response stages returned.
///         if let Some(response) = e.response() {
///             eprintln!("status {} retry-after {:?}", response.status, response.headers.get("retry-after"));
///         }
///         match e.inner() {
///             Error::Api { source, .. } => eprintln!("CircleCI rejected the call: {}", source),
///             Error::DeserializationFailed { serde_error, .. } => {
///                 eprintln!("Unexpected body: {}", serde_error);
///             }
///             other => eprintln!("Other error: {}", other),
///         }
///     }
/// }
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level error occurred (connection refused, DNS lookup failed, etc.).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The call did not finish before the deadline carried by its [`Context`](crate::Context).
    #[error("Request timed out")]
    Timeout,

    /// A custom [`Transport`](crate::Transport) failed for a reason of its own.
    #[error("Transport error: {0}")]
    Transport(Box<dyn std::error::Error + Send + Sync>),

    /// A response body could not be decoded as JSON into the expected type.
    ///
    /// Both success and error bodies end up here when they are malformed,
    /// which keeps decode failures distinct from [`Error::Api`].
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// The response was classified as a failure and its error body was decoded.
    #[error("API error {status}: {source}")]
    Api {
        /// The HTTP status code
        status: StatusCode,
        /// The decoded error body
        source: ApiError,
        /// The raw response body
        raw_response: String,
    },

    /// A required parameter was empty. Nothing was sent.
    #[error("{0} is required")]
    MissingParameter(&'static str),

    /// A response arrived but a response stage rejected it.
    ///
    /// Typed calls wrap every stage error in this variant so the status,
    /// headers and body stay readable, whichever error a custom stage returns.
    /// [`Error::inner`] gives the stage error.
    #[error("{source}")]
    Response {
        /// The response the stages were given
        response: Box<RawResponse>,
        /// The error returned by the stage
        source: Box<Error>,
    },

    /// Invalid configuration or input rejected by caller code.
    ///
    /// The client itself does not produce this variant. It is meant for
    /// custom response stages and [`Transport`](crate::Transport)
    /// implementations that need to report a failure of their own.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Failed to serialize the request body. Nothing was sent.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// The base endpoint is not a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Maps a `reqwest` failure, keeping timeouts distinct from other network errors.
    pub(crate) fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Error::Timeout
        } else {
            Error::Network(error)
        }
    }

    /// Returns the error a response stage produced, looking through [`Error::Response`].
    pub fn inner(&self) -> &Error {
        match self {
            Error::Response { source, .. } => source.inner(),
            other => other,
        }
    }

    /// Returns the response a failed typed call received, if any.
    pub fn response(&self) -> Option<&RawResponse> {
        match self {
            Error::Response { response, .. } => Some(&**response),
            _ => None,
        }
    }

    /// Returns the response headers if a typed call received a response.
    pub fn headers(&self) -> Option<&HeaderMap> {
        self.response().map(|response| &response.headers)
    }

    /// Returns the HTTP status code if a response was received.
    ///
    /// # Examples
    ///
    /// ```
    /// use circleci_v2::{ApiError, Error};
    /// use http::StatusCode;
    ///
    /// let err = Error::Api {
    ///     status: StatusCode::NOT_FOUND,
    ///     source: ApiError::new("Not found"),
    ///     raw_response: r#"{"message":"Not found"}"#.to_string(),
    /// };
    /// assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    /// assert_eq!(Error::Timeout.status(), None);
    /// ```
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Response { response, .. } => Some(response.status),
            Error::Api { status, .. } => Some(*status),
            Error::DeserializationFailed { status, .. } => Some(*status),
            Error::Network(e) => e.status(),
            _ => None,
        }
    }

    /// Returns the raw response body if a response was received.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::Response { response, .. } => std::str::from_utf8(&response.body).ok(),
            Error::Api { raw_response, .. } => Some(raw_response),
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }

    /// Returns the decoded API error body, if this is an [`Error::Api`].
    pub fn api_error(&self) -> Option<&ApiError> {
        match self.inner() {
            Error::Api { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A specialized `Result` type for CircleCI API calls.
pub type Result<T> = std::result::Result<T, Error>;
