//! Error types for routes and live reload.

use devd_directory_watcher::WatchError;
use thiserror::Error;

/// Result type alias for live reload operations.
pub type Result<T> = std::result::Result<T, ReloadError>;

/// Errors that can occur while parsing routes or watching them.
#[derive(Error, Debug)]
pub enum ReloadError {
    /// A route specification is missing its path or its value.
    #[error("invalid route specification: {0:?}")]
    InvalidRoute(String),

    /// A route value has a scheme that cannot be served.
    #[error("{}", describe_scheme(.scheme, .value))]
    UnsupportedScheme {
        /// The scheme that was found.
        scheme: String,
        /// The full route value.
        value: String,
    },

    /// Two routes claim the same host and path.
    #[error("route already exists: {0}")]
    DuplicateRoute(String),

    /// The route value looked like a URL but could not be parsed.
    #[error("could not parse route URL: {0}")]
    Url(#[from] url::ParseError),

    /// Starting a watch failed.
    #[error(transparent)]
    Watch(#[from] WatchError),
}

fn describe_scheme(scheme: &str, value: &str) -> String {
    if scheme == "ws" {
        format!("websocket protocol not supported: {value}")
    } else {
        format!("unknown scheme '{scheme}': did you mean http or https?: {value}")
    }
}
