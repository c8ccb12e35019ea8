//! Route specifications.
//!
//! A route maps a `(host, path)` pair onto an endpoint. Specifications look
//! like `VALUE`, `PATH=VALUE` or `HOST[/PATH]=VALUE`. A value with an `http`
//! or `https` scheme forwards to that URL; a value without a scheme serves
//! files from that location. Only filesystem routes can be watched.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use url::{Position, Url};

use crate::error::{ReloadError, Result};

/// Domain that subdomain routes are placed under.
pub const DEFAULT_DOMAIN: &str = "devd.io";

/// Where requests for a route end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Serve files from a directory.
    Filesystem(PathBuf),

    /// Forward requests to an upstream URL.
    Forward(Url),
}

impl Endpoint {
    /// Decide what kind of endpoint a route value names.
    pub fn parse(value: &str) -> Result<Self> {
        match Url::parse(value) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Ok(Self::Forward(url)),
                scheme => Err(ReloadError::UnsupportedScheme {
                    scheme: scheme.to_string(),
                    value: value.to_string(),
                }),
            },
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Ok(Self::Filesystem(PathBuf::from(value)))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// The directory to watch for this endpoint, if it has one.
    pub fn watch_root(&self) -> Option<&Path> {
        match self {
            Self::Filesystem(root) => Some(root),
            Self::Forward(_) => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filesystem(root) => write!(f, "reads files from {}", root.display()),
            Self::Forward(url) => write!(
                f,
                "forward to {}://{}",
                url.scheme(),
                &url[Position::BeforeHost..Position::AfterPath]
            ),
        }
    }
}

/// The syntactic parts of a route specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    /// Fully qualified host, empty when the route matches any host.
    pub host: String,

    /// URL path, always starting with `/`.
    pub path: String,

    /// Endpoint value, not yet interpreted.
    pub value: String,
}

impl RouteSpec {
    /// Split a specification into host, path and value.
    pub fn parse(spec: &str) -> Result<Self> {
        let (anchor, value) = spec.split_once('=').unwrap_or(("/", spec));
        if anchor.is_empty() || value.is_empty() {
            return Err(ReloadError::InvalidRoute(spec.to_string()));
        }

        let (host, path) = if anchor.starts_with('/') {
            (String::new(), anchor.to_string())
        } else {
            match anchor.split_once('/') {
                Some((sub, rest)) => (format!("{sub}.{DEFAULT_DOMAIN}"), format!("/{rest}")),
                None => (format!("{anchor}.{DEFAULT_DOMAIN}"), "/".to_string()),
            }
        };

        Ok(Self {
            host,
            path,
            value: value.to_string(),
        })
    }
}

/// A resolved route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Fully qualified host, empty when the route matches any host.
    pub host: String,

    /// URL path, always starting with `/`.
    pub path: String,

    /// Where matching requests go.
    pub endpoint: Endpoint,
}

impl Route {
    /// Parse a route specification.
    pub fn parse(spec: &str) -> Result<Self> {
        let RouteSpec { host, path, value } = RouteSpec::parse(spec)?;
        Ok(Self {
            host,
            path,
            endpoint: Endpoint::parse(&value)?,
        })
    }

    /// The key a request multiplexer matches this route by.
    pub fn mux_match(&self) -> String {
        format!("{}{}", self.host, self.path)
    }
}

impl FromStr for Route {
    type Err = ReloadError;

    fn from_str(spec: &str) -> Result<Self> {
        Self::parse(spec)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.mux_match(), self.endpoint)
    }
}

/// Routes keyed by their mux match.
#[derive(Debug, Clone, Default)]
pub struct RouteCollection {
    routes: BTreeMap<String, Route>,
}

impl RouteCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and add a route, refusing one that is already present.
    pub fn add(&mut self, spec: &str) -> Result<()> {
        let route = Route::parse(spec)?;
        let key = route.mux_match();
        if self.routes.contains_key(&key) {
            return Err(ReloadError::DuplicateRoute(key));
        }
        self.routes.insert(key, route);
        Ok(())
    }

    /// Look up a route by its mux match.
    pub fn get(&self, mux_match: &str) -> Option<&Route> {
        self.routes.get(mux_match)
    }

    /// Iterate over routes in mux match order.
    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// True if there are no routes.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
