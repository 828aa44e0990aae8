#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use sitedag::config::ConfigFile;
use sitedag::engine::Runner;
use sitedag::site::SiteContext;
use sitedag_test_utils::builders::ConfigFileBuilder;
use sitedag_test_utils::fake_server::FakeReloadServer;

/// A throwaway project on disk wired to a fake reload server.
pub struct SiteFixture {
    pub dir: TempDir,
    pub server: Arc<FakeReloadServer>,
    pub site: Arc<SiteContext>,
    pub runner: Runner,
}

impl SiteFixture {
    /// Project with the default layout and the given files
    /// (paths relative to the project root).
    pub fn new(files: &[(&str, &str)]) -> Self {
        Self::with_config(ConfigFileBuilder::new().build(), files)
    }

    pub fn with_config(cfg: ConfigFile, files: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        for (rel, contents) in files {
            write_file(dir.path(), rel, contents);
        }

        let server = Arc::new(FakeReloadServer::new());
        let site = Arc::new(
            SiteContext::new(dir.path(), cfg)
                .with_reload_server(server.clone())
                .without_watcher(),
        );
        let registry = sitedag::build_registry(Arc::clone(&site)).expect("valid registry");

        Self {
            dir,
            server,
            site,
            runner: Runner::new(registry),
        }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn write(&self, rel: &str, contents: &str) {
        write_file(self.dir.path(), rel, contents);
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).unwrap_or_else(|e| panic!("reading {rel}: {e}"))
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }
}

pub fn write_file(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(&path, contents).expect("write fixture file");
}
