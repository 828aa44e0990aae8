// src/serve/mod.rs

//! Static file server with live reload.
//!
//! - [`ReloadServer`] is the narrow seam the site tasks talk to.
//! - [`server::DevServer`] is the axum implementation.
//! - [`inject`] splices the reload client into HTML pages.

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::pin::Pin;

pub mod inject;
pub mod server;

pub use server::DevServer;

/// Boxed future returned by [`ReloadServer::start`].
pub type StartFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<SocketAddr>> + Send + 'a>>;

/// Serves a directory and tells connected browsers to reload.
pub trait ReloadServer: Send + Sync {
    /// Start serving `root`. Calling it again while running returns the
    /// address already bound.
    fn start<'a>(&'a self, root: &'a Path) -> StartFuture<'a>;

    /// Ask every connected client to reload. A no-op before `start`.
    fn reload(&self);

    /// Stop serving. A no-op when not running.
    fn stop(&self) {}
}
