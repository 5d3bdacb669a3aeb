//! Request metadata and path handling.

use http::Method;
use std::collections::BTreeMap;

/// Metadata for an individual API request.
///
/// The path is relative to the client's base endpoint. Query parameters are
/// kept sorted by key, which is also the order they appear on the wire.
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    /// The HTTP method (GET, POST, etc.).
    pub method: Method,

    /// The request path (relative to the base endpoint).
    pub path: String,

    /// Query parameters for this request.
    pub query_params: BTreeMap<String, String>,
}

impl RequestMetadata {
    /// Creates a new `RequestMetadata` with the given method and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query_params: BTreeMap::new(),
        }
    }

    /// Adds a query parameter to the request.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    /// Adds a query parameter only when `value` is present and non-empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use circleci_v2::metadata::RequestMetadata;
    /// use http::Method;
    ///
    /// let meta = RequestMetadata::new(Method::GET, "/insights")
    ///     .with_optional_query_param("branch", Some("main"))
    ///     .with_optional_query_param("reporting-window", Some(""))
    ///     .with_optional_query_param("page-token", None);
    ///
    /// assert_eq!(meta.query_params.len(), 1);
    /// assert_eq!(meta.query_params["branch"], "main");
    /// ```
    pub fn with_optional_query_param(self, key: impl Into<String>, value: Option<&str>) -> Self {
        match value {
            Some(value) if !value.is_empty() => self.with_query_param(key, value),
            _ => self,
        }
    }

    /// Adds multiple query parameters to the request.
    pub fn with_query_params(
        mut self,
        params: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        self.query_params.extend(params);
        self
    }
}

impl Default for RequestMetadata {
    fn default() -> Self {
        Self::new(Method::GET, "")
    }
}

/// Joins `path` onto `base` the way a filesystem path join would.
///
/// Duplicate separators collapse, `.` segments vanish, `..` removes the
/// segment before it, and the trailing separator is dropped. Nothing is
/// percent-encoded or decoded here.
///
/// # Examples
///
/// ```
/// use circleci_v2::metadata::join_path;
///
/// assert_eq!(join_path("/api/v2", "/insights/gh/org/repo"), "/api/v2/insights/gh/org/repo");
/// assert_eq!(join_path("/api/v2/", "//insights/"), "/api/v2/insights");
/// assert_eq!(join_path("/", "/insights"), "/insights");
/// ```
pub fn join_path(base: &str, path: &str) -> String {
    let joined = [base, path]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        return String::new();
    }
    clean_path(&joined)
}

fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                // A rooted path cannot climb above the root.
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let cleaned = segments.join("/");
    match (rooted, cleaned.is_empty()) {
        (true, _) => format!("/{}", cleaned),
        (false, true) => ".".to_string(),
        (false, false) => cleaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_collapses_redundant_separators() {
        assert_eq!(
            join_path("/api/v2", "/insights/gh/org/repo/workflows/test"),
            "/api/v2/insights/gh/org/repo/workflows/test"
        );
        assert_eq!(join_path("/api//v2/", "insights//x/"), "/api/v2/insights/x");
    }

    #[test]
    fn join_resolves_dot_segments() {
        assert_eq!(join_path("/api/v2", "./insights/../projects"), "/api/v2/projects");
        assert_eq!(join_path("/", "../../insights"), "/insights");
        assert_eq!(join_path("api", "../.."), "..");
        assert_eq!(join_path("api", ".."), ".");
    }

    #[test]
    fn join_with_empty_parts() {
        assert_eq!(join_path("", "/insights"), "/insights");
        assert_eq!(join_path("/api/v2", ""), "/api/v2");
        assert_eq!(join_path("", ""), "");
    }

    #[test]
    fn query_params_are_sorted() {
        let meta = RequestMetadata::new(Method::GET, "/x")
            .with_query_param("circle-token", "t")
            .with_query_param("branch", "main");

        let keys: Vec<_> = meta.query_params.keys().cloned().collect();
        assert_eq!(keys, vec!["branch", "circle-token"]);
    }

    #[test]
    fn default_metadata_is_get() {
        let meta = RequestMetadata::default();
        assert_eq!(meta.method, Method::GET);
        assert!(meta.path.is_empty());
    }
}
