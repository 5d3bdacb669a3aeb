//! The HTTP-issuing mechanism behind a [`Client`](crate::Client).
//!
//! A transport takes a fully built [`reqwest::Request`] and returns the
//! response with its body still unread. The stock implementation is
//! [`reqwest::Client`]; tests and callers with special needs can plug in their
//! own.

use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, OnceLock};

/// Executes prepared HTTP requests.
///
/// Transports are shared by reference between a client and every copy made
/// from it with the `with_*` methods, so implementations must be safe to use
/// from several calls at once.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use circleci_v2::{Client, Result, Transport};
/// use std::sync::Arc;
///
/// struct Offline;
///
/// #[async_trait]
/// impl Transport for Offline {
///     async fn execute(&self, _request: reqwest::Request) -> Result<reqwest::Response> {
///         let response = http::Response::builder()
///             .status(503)
///             .body(r#"{"message":"offline"}"#)
///             .unwrap();
///         Ok(response.into())
///     }
/// }
///
/// let client = Client::new("token").with_transport(Some(Arc::new(Offline)));
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the response without reading its body.
    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response>;
}

#[async_trait]
impl Transport for reqwest::Client {
    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        reqwest::Client::execute(self, request)
            .await
            .map_err(Error::from_reqwest)
    }
}

/// Returns the process-wide transport used when none is configured.
///
/// Every call returns a handle to the same [`reqwest::Client`], so clients
/// created with defaults share one connection pool.
pub fn default_transport() -> Arc<dyn Transport> {
    static DEFAULT: OnceLock<Arc<dyn Transport>> = OnceLock::new();
    DEFAULT
        .get_or_init(|| Arc::new(reqwest::Client::new()))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_transport_is_shared() {
        let a = default_transport();
        let b = default_transport();
        assert!(std::ptr::eq(
            Arc::as_ptr(&a) as *const (),
            Arc::as_ptr(&b) as *const ()
        ));
    }
}
