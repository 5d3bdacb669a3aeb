//! Reconfiguring a [`Client`], in place or copy-on-write.
//!
//! Each configurable field has a `set_*` method that mutates the client and a
//! `with_*` method that returns a reconfigured copy. Passing `None` (or an
//! empty endpoint) restores the built-in default in both forms.
//!
//! `set_*` needs `&mut self` and therefore cannot race with calls in flight on
//! the same client. To vary a client shared between tasks, derive copies with
//! `with_*`; copies share the transport and the response stages by reference.

use crate::{
    client::{Client, DEFAULT_ENDPOINT},
    pipeline::{
        default_classifier, default_error_parser, default_success_parser, ErrorClassifier,
        ErrorParser, SuccessParser,
    },
    transport::{default_transport, Transport},
};
use std::sync::Arc;

impl Client {
    /// Returns the base endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the API token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the shared transport handle.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Sets the base endpoint. An empty string restores [`DEFAULT_ENDPOINT`].
    ///
    /// The endpoint is not validated here; a malformed one fails the next call
    /// with [`Error::InvalidUrl`](crate::Error::InvalidUrl).
    pub fn set_endpoint(&mut self, endpoint: impl AsRef<str>) {
        let endpoint = endpoint.as_ref();
        self.endpoint = if endpoint.is_empty() {
            DEFAULT_ENDPOINT.to_string()
        } else {
            endpoint.to_string()
        };
    }

    /// Sets the transport. `None` restores the process-wide default.
    pub fn set_transport(&mut self, transport: Option<Arc<dyn Transport>>) {
        self.transport = transport.unwrap_or_else(default_transport);
    }

    /// Sets the stage deciding whether a response is a failure.
    /// `None` restores [`StatusClassifier`](crate::StatusClassifier).
    pub fn set_error_classifier(&mut self, classifier: Option<Arc<dyn ErrorClassifier>>) {
        self.classifier = classifier.unwrap_or_else(default_classifier);
    }

    /// Sets the stage decoding successful responses.
    /// `None` restores [`JsonSuccessParser`](crate::JsonSuccessParser).
    ///
    /// The parser must not take ownership of the connection; the client
    /// releases it after the parser returns.
    pub fn set_success_parser(&mut self, parser: Option<Arc<dyn SuccessParser>>) {
        self.success_parser = parser.unwrap_or_else(default_success_parser);
    }

    /// Sets the stage decoding failed responses.
    /// `None` restores [`JsonErrorParser`](crate::JsonErrorParser).
    pub fn set_error_parser(&mut self, parser: Option<Arc<dyn ErrorParser>>) {
        self.error_parser = parser.unwrap_or_else(default_error_parser);
    }

    /// Returns a copy with its endpoint replaced. An empty string restores
    /// [`DEFAULT_ENDPOINT`].
    ///
    /// # Examples
    ///
    /// ```
    /// use circleci_v2::{Client, DEFAULT_ENDPOINT};
    ///
    /// let base = Client::new("token");
    /// let staging = base.with_endpoint("https://staging.example.com/api/v2");
    ///
    /// assert_eq!(base.endpoint(), DEFAULT_ENDPOINT);
    /// assert_eq!(staging.endpoint(), "https://staging.example.com/api/v2");
    /// assert_eq!(staging.with_endpoint("").endpoint(), DEFAULT_ENDPOINT);
    /// ```
    pub fn with_endpoint(&self, endpoint: impl AsRef<str>) -> Client {
        let mut client = self.clone();
        client.set_endpoint(endpoint);
        client
    }

    /// Returns a copy with its transport replaced. `None` restores the default.
    pub fn with_transport(&self, transport: Option<Arc<dyn Transport>>) -> Client {
        let mut client = self.clone();
        client.set_transport(transport);
        client
    }

    /// Returns a copy with its error classifier replaced. `None` restores the default.
    pub fn with_error_classifier(&self, classifier: Option<Arc<dyn ErrorClassifier>>) -> Client {
        let mut client = self.clone();
        client.set_error_classifier(classifier);
        client
    }

    /// Returns a copy with its success parser replaced. `None` restores the default.
    pub fn with_success_parser(&self, parser: Option<Arc<dyn SuccessParser>>) -> Client {
        let mut client = self.clone();
        client.set_success_parser(parser);
        client
    }

    /// Returns a copy with its error parser replaced. `None` restores the default.
    pub fn with_error_parser(&self, parser: Option<Arc<dyn ErrorParser>>) -> Client {
        let mut client = self.clone();
        client.set_error_parser(parser);
        client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RawResponse;
    use http::{HeaderMap, StatusCode};

    fn same<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
        std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
    }

    fn raw(status: StatusCode) -> RawResponse {
        RawResponse {
            status,
            headers: HeaderMap::new(),
            url: "https://circleci.com/api/v2".parse().unwrap(),
            body: Vec::new(),
        }
    }

    #[test]
    fn set_endpoint_replaces_and_resets() {
        let mut client = Client::new("t");
        client.set_endpoint("http://localhost:8080/api/v2");
        assert_eq!(client.endpoint(), "http://localhost:8080/api/v2");

        client.set_endpoint("");
        assert_eq!(client.endpoint(), DEFAULT_ENDPOINT);
    }

    #[test]
    fn with_endpoint_leaves_original_untouched() {
        let original = Client::new("t");
        let copy = original.with_endpoint("http://localhost:1");

        assert_eq!(original.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(copy.endpoint(), "http://localhost:1");
        assert_eq!(copy.token(), "t");
    }

    #[test]
    fn copies_share_the_transport() {
        let transport: Arc<dyn Transport> = Arc::new(reqwest::Client::new());
        let original = Client::new("t").with_transport(Some(transport.clone()));
        let copy = original.with_endpoint("http://localhost:1");

        assert!(same(original.transport(), &transport));
        assert!(same(copy.transport(), &transport));
    }

    #[test]
    fn none_restores_default_transport() {
        let mut client = Client::new("t").with_transport(Some(Arc::new(reqwest::Client::new())));
        assert!(!same(client.transport(), &default_transport()));

        client.set_transport(None);
        assert!(same(client.transport(), &default_transport()));
    }

    #[test]
    fn with_error_classifier_only_changes_the_copy() {
        let original = Client::new("t");
        let lenient = original
            .with_error_classifier(Some(Arc::new(|raw: &RawResponse| raw.status.is_server_error())));

        let not_found = raw(StatusCode::NOT_FOUND);
        assert!(original.classifier.is_error(&not_found));
        assert!(!lenient.classifier.is_error(&not_found));
        assert!(same(&original.success_parser, &lenient.success_parser));
        assert!(same(&original.error_parser, &lenient.error_parser));
    }

    #[test]
    fn none_restores_default_stages() {
        let mut client = Client::new("t");
        client.set_error_classifier(Some(Arc::new(|_: &RawResponse| true)));
        assert!(client.classifier.is_error(&raw(StatusCode::OK)));

        client.set_error_classifier(None);
        assert!(!client.classifier.is_error(&raw(StatusCode::OK)));

        let reset = client
            .with_success_parser(None)
            .with_error_parser(None)
            .with_error_classifier(None);
        assert!(reset.classifier.is_error(&raw(StatusCode::BAD_REQUEST)));
    }
}
