//! Route lookup.
//!
//! # Responsibilities
//! - Store a listener's routes in configured order
//! - Look up the route for a request path
//! - Build backend URLs for the HTTP and WebSocket paths
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan, first match in configured order wins. This is not
//!   longest-prefix: `/a` listed before `/ab` captures `/ab/x`.
//! - Explicit `None` rather than silent default

use std::borrow::Cow;

use url::Url;

use crate::config::RouteEntry;
use crate::routing::matcher::PathPrefixMatcher;

/// A compiled route: prefix matcher plus resolved backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    matcher: PathPrefixMatcher,
    host: String,
    port: u16,
    strip_prefix: bool,
}

impl Route {
    pub fn from_entry(entry: &RouteEntry) -> Self {
        Self {
            matcher: PathPrefixMatcher::new(entry.path_prefix.clone()),
            host: entry.resolved_host().to_string(),
            port: entry.target_port,
            strip_prefix: entry.strip_prefix,
        }
    }

    pub fn prefix(&self) -> &str {
        self.matcher.prefix()
    }

    /// Backend host, `localhost` when the entry left it empty.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn strips_prefix(&self) -> bool {
        self.strip_prefix
    }

    /// Path sent to the backend for an inbound `path`.
    pub fn upstream_path<'a>(&self, path: &'a str) -> Cow<'a, str> {
        if self.strip_prefix {
            if let Some(rest) = self.matcher.strip(path) {
                return rest;
            }
        }
        if path.is_empty() {
            Cow::Borrowed("/")
        } else {
            Cow::Borrowed(path)
        }
    }

    /// `http://host:port` origin of the backend.
    pub fn http_origin(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("http://{}:{}", self.host, self.port))
    }

    /// Full HTTP target for an inbound path and query.
    ///
    /// The path is appended verbatim; the parsed origin only validates the
    /// host and port.
    pub fn http_target(&self, path: &str, query: Option<&str>) -> Result<String, url::ParseError> {
        let origin = self.http_origin()?;
        Ok(self.join(&origin, path, query))
    }

    /// Full `ws://` target for an inbound path and query.
    pub fn websocket_target(&self, path: &str, query: Option<&str>) -> Result<String, url::ParseError> {
        let origin = Url::parse(&format!("ws://{}:{}", self.host, self.port))?;
        Ok(self.join(&origin, path, query))
    }

    fn join(&self, origin: &Url, path: &str, query: Option<&str>) -> String {
        let mut target = origin.origin().ascii_serialization();
        target.push_str(&self.upstream_path(path));
        if let Some(query) = query {
            target.push('?');
            target.push_str(query);
        }
        target
    }
}

/// A listener's ordered route table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Compile routes, keeping configuration order.
    pub fn from_config(entries: &[RouteEntry]) -> Self {
        Self {
            routes: entries.iter().map(Route::from_entry).collect(),
        }
    }

    /// First route whose prefix matches `path`, in configured order.
    pub fn match_path(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.matcher.matches(path))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
