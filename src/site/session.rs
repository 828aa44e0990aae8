// src/site/session.rs

use std::net::SocketAddr;

use tokio::task::JoinHandle;
use tracing::info;

use crate::watch::WatcherHandle;

/// What `browser-sync` leaves running: the server address, the file
/// watcher and the trigger dispatcher.
#[derive(Debug, Default)]
pub struct DevSession {
    addr: Option<SocketAddr>,
    watcher: Option<WatcherHandle>,
    dispatcher: Option<JoinHandle<()>>,
}

impl DevSession {
    /// True once the server has been started.
    pub fn is_active(&self) -> bool {
        self.addr.is_some()
    }

    pub fn addr(&self) -> Option<SocketAddr> {
        self.addr
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    pub(crate) fn set_addr(&mut self, addr: SocketAddr) {
        self.addr = Some(addr);
    }

    pub(crate) fn attach_watch(&mut self, watcher: WatcherHandle, dispatcher: JoinHandle<()>) {
        self.watcher = Some(watcher);
        self.dispatcher = Some(dispatcher);
    }

    /// Stop watching and forget the server address. Runs already started by
    /// the watcher are left to finish.
    pub fn shutdown(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            info!(path = ?watcher.watched(), "stopping file watcher");
        }
        if let Some(dispatcher) = self.dispatcher.take() {
            dispatcher.abort();
        }
        self.addr = None;
    }
}
