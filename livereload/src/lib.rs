//! # Live Reload
//!
//! Routes and reload signalling for devd. Filesystem routes are watched with
//! `devd-directory-watcher`; every changeset becomes a `page` or `css`
//! signal that is broadcast to connected clients.
//!
//! ```text
//! RouteCollection ──► watch_routes ──► Watcher ──► Reloader ──► clients
//! ```

pub mod error;
pub mod reload;
pub mod route;

pub use error::{ReloadError, Result};
pub use reload::{LiveReload, ReloadKind, Reloader, watch_routes};
pub use route::{DEFAULT_DOMAIN, Endpoint, Route, RouteCollection, RouteSpec};
