use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use sitedag::serve::{ReloadServer, StartFuture};

/// In-process stand-in for the dev server that only counts calls.
#[derive(Debug, Default)]
pub struct FakeReloadServer {
    starts: AtomicUsize,
    reloads: AtomicUsize,
    root: Mutex<Option<PathBuf>>,
}

impl FakeReloadServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub const ADDR: SocketAddr = SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::LOCALHOST), 3999);

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    pub fn root(&self) -> Option<PathBuf> {
        self.root.lock().unwrap().clone()
    }
}

impl ReloadServer for FakeReloadServer {
    fn start<'a>(&'a self, root: &'a Path) -> StartFuture<'a> {
        Box::pin(async move {
            self.starts.fetch_add(1, Ordering::SeqCst);
            *self.root.lock().unwrap() = Some(root.to_path_buf());
            Ok(Self::ADDR)
        })
    }

    fn reload(&self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
    }
}
