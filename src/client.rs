//! CircleCI v2 API client.
//!
//! The [`Client`] type is the main entry point for making API calls.
//! Use [`Client::new`] for the defaults or [`ClientBuilder`] to configure one.

use crate::{
    context::Context,
    metadata::{join_path, RequestMetadata},
    pipeline::{
        default_classifier, default_error_parser, default_success_parser, ErrorClassifier,
        ErrorParser, JsonTarget, RawResponse, SuccessParser,
    },
    transport::{default_transport, Transport},
    Error, Response, Result,
};
use http::header::{HeaderValue, CONTENT_TYPE};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// The production CircleCI v2 API root.
pub const DEFAULT_ENDPOINT: &str = "https://circleci.com/api/v2";

/// The query parameter carrying the API token.
pub const TOKEN_QUERY_KEY: &str = "circle-token";

/// A CircleCI v2 API client.
///
/// Cloning is cheap: the transport and the three response stages are shared
/// by reference, the endpoint and token are copied. The `with_*` methods build
/// on this to derive per-call-site variants from a shared template without
/// touching it, while the `set_*` methods reconfigure a client in place.
///
/// # Examples
///
/// ```no_run
/// use circleci_v2::{Client, Context};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), circleci_v2::Error> {
/// let client = Client::new("my-token");
/// let ctx = Context::with_timeout(Duration::from_secs(30));
///
/// let summaries = client
///     .workflow_summaries(&ctx, "gh/org/repo", Some("main"))
///     .await?;
/// for summary in &summaries.items {
///     println!("{}: {:.0}% success", summary.name, summary.metrics.success_rate * 100.0);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    pub(crate) endpoint: String,
    pub(crate) token: String,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) classifier: Arc<dyn ErrorClassifier>,
    pub(crate) success_parser: Arc<dyn SuccessParser>,
    pub(crate) error_parser: Arc<dyn ErrorParser>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client for the production API with the default transport
    /// and response stages.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token: token.into(),
            transport: default_transport(),
            classifier: default_classifier(),
            success_parser: default_success_parser(),
            error_parser: default_error_parser(),
        }
    }

    /// Creates a new `ClientBuilder` for configuring a client.
    ///
    /// # Examples
    ///
    /// ```
    /// use circleci_v2::Client;
    ///
    /// let client = Client::builder("my-token")
    ///     .endpoint("https://circleci.example.com/api/v2")
    ///     .build();
    /// assert_eq!(client.endpoint(), "https://circleci.example.com/api/v2");
    /// ```
    pub fn builder(token: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(token)
    }

    /// Sends a request and returns the response with its body unread.
    ///
    /// The path is joined onto the endpoint's own path with filesystem-join
    /// rules. The token is added as `circle-token` unless the query already
    /// has that key. A body is sent as JSON.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidUrl`] for a malformed endpoint and
    /// [`Error::SerializationFailed`] when the body cannot be encoded, both
    /// before anything is sent. Transport failures are passed through.
    pub async fn send_raw<B>(
        &self,
        ctx: &Context,
        metadata: RequestMetadata,
        body: Option<&B>,
    ) -> Result<reqwest::Response>
    where
        B: Serialize + ?Sized,
    {
        let mut url = Url::parse(&self.endpoint)?;
        let path = join_path(url.path(), &metadata.path);
        url.set_path(&path);

        let mut query = metadata.query_params;
        query
            .entry(TOKEN_QUERY_KEY.to_string())
            .or_insert_with(|| self.token.clone());
        url.set_query(None);
        url.query_pairs_mut().extend_pairs(query.iter());

        tracing::debug!(
            method = %metadata.method,
            url = %redact_token(&url),
            "Executing HTTP request"
        );

        let mut request = reqwest::Request::new(metadata.method, url);

        if let Some(body) = body {
            let json =
                serde_json::to_vec(body).map_err(|e| Error::SerializationFailed(e.to_string()))?;
            request
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            *request.body_mut() = Some(json.into());
        }

        ctx.run(self.transport.execute(request)).await
    }

    /// Runs a response through the classifier and then the error or success parser.
    ///
    /// The success parser is never invoked for a response the classifier
    /// marks as a failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use circleci_v2::{Client, RawResponse};
    /// use http::{HeaderMap, StatusCode};
    ///
    /// let client = Client::new("token");
    /// let raw = RawResponse {
    ///     status: StatusCode::NOT_FOUND,
    ///     headers: HeaderMap::new(),
    ///     url: "https://circleci.com/api/v2/insights".parse().unwrap(),
    ///     body: br#"{"message":"Project not found"}"#.to_vec(),
    /// };
    ///
    /// let err = client.resolve_response(&raw, None).unwrap_err();
    /// assert_eq!(err.api_error().unwrap().message, "Project not found");
    /// ```
    pub fn resolve_response(
        &self,
        response: &RawResponse,
        output: Option<&mut dyn JsonTarget>,
    ) -> Result<()> {
        if self.classifier.is_error(response) {
            return Err(self.error_parser.parse_error(response));
        }
        self.success_parser.parse_success(response, output)
    }

    /// Makes a typed API call.
    ///
    /// The response body is read in full and released before this returns,
    /// whether the call succeeds or fails. When a response stage rejects the
    /// response, the error is wrapped in [`Error::Response`] together with
    /// that response.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use circleci_v2::{metadata::RequestMetadata, Client, Context};
    /// use http::Method;
    /// use serde::Deserialize;
    ///
    /// #[derive(Debug, Default, Deserialize)]
    /// struct Me {
    ///     name: String,
    /// }
    ///
    /// # async fn example() -> Result<(), circleci_v2::Error> {
    /// let client = Client::new("my-token");
    /// let me = client
    ///     .send::<(), Me>(&Context::background(), RequestMetadata::new(Method::GET, "/me"), None)
    ///     .await?;
    /// println!("Hello {}", me.name);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn send<B, T>(
        &self,
        ctx: &Context,
        metadata: RequestMetadata,
        body: Option<&B>,
    ) -> Result<Response<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + Default,
    {
        let start_time = Instant::now();
        let response = self.send_raw(ctx, metadata, body).await?;
        self.decode(ctx, response, start_time).await
    }

    /// Reads `response` and decodes it into `T` through the pipeline.
    pub(crate) async fn decode<T>(
        &self,
        ctx: &Context,
        response: reqwest::Response,
        start_time: Instant,
    ) -> Result<Response<T>>
    where
        T: DeserializeOwned + Default,
    {
        let raw = ctx.run(RawResponse::read(response)).await?;
        let latency = start_time.elapsed();

        tracing::info!(
            status = raw.status.as_u16(),
            latency_ms = latency.as_millis(),
            "Received HTTP response"
        );

        let mut data = T::default();
        let target: &mut dyn JsonTarget = &mut data;
        if let Err(source) = self.resolve_response(&raw, Some(target)) {
            return Err(Error::Response {
                response: Box::new(raw),
                source: Box::new(source),
            });
        }

        Ok(Response::from_raw(data, raw, latency))
    }
}

fn redact_token(url: &Url) -> Url {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if key == TOKEN_QUERY_KEY {
                "REDACTED".to_string()
            } else {
                value.into_owned()
            };
            (key.into_owned(), value)
        })
        .collect();
    redacted.set_query(None);
    redacted.query_pairs_mut().extend_pairs(pairs);
    redacted
}

/// Builder for configuring and creating a [`Client`].
///
/// Every setter follows the same rule as the client's `set_*` methods:
/// `None` (or an empty endpoint) keeps the built-in default.
///
/// # Examples
///
/// ```
/// use circleci_v2::{Client, RawResponse};
/// use std::sync::Arc;
///
/// let client = Client::builder("my-token")
///     .transport(Some(Arc::new(reqwest::Client::new())))
///     .error_classifier(Some(Arc::new(|raw: &RawResponse| !raw.status.is_success())))
///     .build();
/// # let _ = client;
/// ```
pub struct ClientBuilder {
    client: Client,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: Client::new(token),
        }
    }

    /// Sets the base endpoint all paths are joined onto.
    pub fn endpoint(mut self, endpoint: impl AsRef<str>) -> Self {
        self.client.set_endpoint(endpoint);
        self
    }

    /// Sets the transport used to send requests.
    pub fn transport(mut self, transport: Option<Arc<dyn Transport>>) -> Self {
        self.client.set_transport(transport);
        self
    }

    /// Sets the stage deciding whether a response is a failure.
    pub fn error_classifier(mut self, classifier: Option<Arc<dyn ErrorClassifier>>) -> Self {
        self.client.set_error_classifier(classifier);
        self
    }

    /// Sets the stage decoding successful responses.
    pub fn success_parser(mut self, parser: Option<Arc<dyn SuccessParser>>) -> Self {
        self.client.set_success_parser(parser);
        self
    }

    /// Sets the stage decoding failed responses.
    pub fn error_parser(mut self, parser: Option<Arc<dyn ErrorParser>>) -> Self {
        self.client.set_error_parser(parser);
        self
    }

    /// Builds the configured `Client`.
    pub fn build(self) -> Client {
        self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_client_uses_defaults() {
        let client = Client::new("xxx");
        assert_eq!(client.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(client.token(), "xxx");
    }

    #[test]
    fn debug_output_hides_token() {
        let client = Client::new("super-secret");
        let debug = format!("{:?}", client);
        assert!(debug.contains(DEFAULT_ENDPOINT));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn redacts_token_in_logged_url() {
        let url = Url::parse("https://circleci.com/api/v2/x?branch=main&circle-token=abc").unwrap();
        let redacted = redact_token(&url);
        assert_eq!(
            redacted.as_str(),
            "https://circleci.com/api/v2/x?branch=main&circle-token=REDACTED"
        );
    }

    #[test]
    fn builder_with_empty_endpoint_keeps_default() {
        let client = Client::builder("t").endpoint("").build();
        assert_eq!(client.endpoint(), DEFAULT_ENDPOINT);
    }
}
