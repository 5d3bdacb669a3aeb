//! Typed response wrapper.
//!
//! The [`Response`] type carries the decoded body of a successful call along
//! with the status, headers and raw body it was decoded from.

use crate::pipeline::RawResponse;
use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// A decoded API response.
///
/// Dereferences to the decoded body, so endpoint fields can be read directly.
///
/// # Examples
///
/// ```no_run
/// use circleci_v2::{Client, Context};
///
/// # async fn example() -> Result<(), circleci_v2::Error> {
/// let client = Client::new("my-token");
/// let runs = client
///     .workflow_runs(&Context::background(), "gh/org/repo", "build", Some("main"))
///     .await?;
///
/// println!("Status: {}", runs.status);
/// println!("Request took {:?}", runs.latency);
/// for run in &runs.items {
///     println!("{} {} {}s", run.id, run.status, run.duration);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The decoded response body.
    pub data: T,

    /// The raw response body as a string.
    pub raw_body: String,

    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// Time from sending the request until the body was read.
    pub latency: Duration,
}

impl<T> Response<T> {
    /// Creates a new `Response`.
    pub fn new(
        data: T,
        raw_body: String,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
    ) -> Self {
        Self {
            data,
            raw_body,
            status,
            headers,
            latency,
        }
    }

    pub(crate) fn from_raw(data: T, raw: RawResponse, latency: Duration) -> Self {
        let raw_body = match String::from_utf8(raw.body) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        };
        Self::new(data, raw_body, raw.status, raw.headers, latency)
    }

    /// Maps the response data to a different type using the provided function.
    ///
    /// # Examples
    ///
    /// ```
    /// # use circleci_v2::Response;
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let response = Response::new(
    ///     vec![1, 2, 3],
    ///     "[1,2,3]".to_string(),
    ///     StatusCode::OK,
    ///     HeaderMap::new(),
    ///     Duration::from_millis(100),
    /// );
    ///
    /// let count = response.map(|items| items.len());
    /// assert_eq!(count.data, 3);
    /// ```
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            raw_body: self.raw_body,
            status: self.status,
            headers: self.headers,
            latency: self.latency,
        }
    }

    /// Returns a reference to a header value by name.
    ///
    /// # Examples
    ///
    /// ```
    /// # use circleci_v2::Response;
    /// # use http::{HeaderMap, StatusCode, HeaderValue};
    /// # use std::time::Duration;
    /// let mut headers = HeaderMap::new();
    /// headers.insert("content-type", HeaderValue::from_static("application/json"));
    ///
    /// let response = Response::new((), String::new(), StatusCode::OK, headers, Duration::ZERO);
    ///
    /// assert_eq!(response.header("content-type").unwrap(), "application/json");
    /// ```
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Consumes the response, returning the decoded body.
    pub fn into_data(self) -> T {
        self.data
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
