// tests/site_tasks.rs

mod common;
use crate::common::SiteFixture;

use sitedag::errors::SitedagError;
use sitedag::types::StyleOutput;
use sitedag_test_utils::builders::ConfigFileBuilder;
use sitedag_test_utils::fake_server::FakeReloadServer;
use sitedag_test_utils::{init_tracing, with_timeout};

#[tokio::test]
async fn sass_watch_with_failing_stylesheet_does_not_reload() {
    init_tracing();
    let fx = SiteFixture::new(&[("src/main.scss", ".broken { color: ")]);
    with_timeout(fx.runner.run("browser-sync")).await.unwrap();

    let err = with_timeout(fx.runner.run("sass:watch")).await.unwrap_err();

    assert!(
        matches!(&err, SitedagError::ActionFailure { task, .. } if task == "sass"),
        "{err:?}"
    );
    assert_eq!(fx.server.reloads(), 0);
    assert!(!fx.exists("build/main.css"));
}

#[tokio::test]
async fn sass_watch_with_valid_stylesheet_reloads_once() {
    init_tracing();
    let fx = SiteFixture::new(&[
        ("src/_palette.scss", "$ink: #333;"),
        ("src/main.scss", "@import 'palette';\nbody { color: $ink; }"),
    ]);
    with_timeout(fx.runner.run("browser-sync")).await.unwrap();

    let report = with_timeout(fx.runner.run("sass:watch")).await.unwrap();

    assert_eq!(report.executed(), vec!["sass", "sass:watch"]);
    assert_eq!(fx.server.reloads(), 1);
    assert!(fx.read("build/main.css").contains("color: #333"));
}

#[tokio::test]
async fn jade_watch_renders_with_locals_then_reloads() {
    init_tracing();
    let cfg = ConfigFileBuilder::new().local("title", "Field notes").build();
    let fx = SiteFixture::with_config(
        cfg,
        &[
            ("src/index.jade", "<title>{{ title }}</title>"),
            ("src/bio/grace.jade", "<h1>{{ title }}: Grace</h1>"),
        ],
    );

    with_timeout(fx.runner.run("jade:watch")).await.unwrap();

    assert_eq!(fx.read("build/index.html"), "<title>Field notes</title>");
    assert_eq!(fx.read("build/bio/grace.html"), "<h1>Field notes: Grace</h1>");
    assert_eq!(fx.server.reloads(), 1);
}

#[tokio::test]
async fn build_produces_the_whole_site() {
    init_tracing();
    let fx = SiteFixture::new(&[
        ("src/app.scss", ".a { margin: 0; }"),
        ("src/index.jade", "<p>hi</p>"),
        ("src/assets/fonts/a.woff", "font"),
        ("src/views/card.html", "<div></div>"),
        ("src/bio/ada.jade", "<p>ada</p>"),
    ]);

    let report = with_timeout(fx.runner.run("build")).await.unwrap();

    assert_eq!(report.executed().iter().filter(|t| **t == "assets").count(), 1);
    assert!(fx.exists("build/app.css"));
    assert!(fx.exists("build/index.html"));
    assert!(fx.exists("build/assets/fonts/a.woff"));
    assert!(fx.exists("build/views/card.html"));
    assert!(fx.exists("build/bio/ada.html"));
    // Reloads only come from the watch tasks.
    assert_eq!(fx.server.reloads(), 0);
    assert_eq!(fx.server.starts(), 0);
}

#[tokio::test]
async fn compressed_output_style_is_honoured() {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .output_style(StyleOutput::Compressed)
        .build();
    let fx = SiteFixture::with_config(cfg, &[("src/app.scss", ".a {\n  margin: 0;\n}\n")]);

    with_timeout(fx.runner.run("sass")).await.unwrap();

    assert_eq!(fx.read("build/app.css").trim(), ".a{margin:0}");
}

#[tokio::test]
async fn dev_starts_the_server_over_the_build_root() {
    init_tracing();
    let fx = SiteFixture::new(&[("src/index.jade", "<p>dev</p>")]);

    let report = with_timeout(fx.runner.run("dev")).await.unwrap();

    assert_eq!(report.executed().last(), Some(&"dev"));
    assert_eq!(fx.server.starts(), 1);
    assert_eq!(fx.server.root(), Some(fx.path("build")));
    let session = fx.site.session();
    assert!(session.is_active());
    assert_eq!(session.addr(), Some(FakeReloadServer::ADDR));
    assert!(!session.is_watching());
}

#[tokio::test]
async fn concurrent_sass_and_jade_runs_both_succeed() {
    init_tracing();
    let fx = SiteFixture::new(&[
        ("src/a.scss", ".a { b: c; }"),
        ("src/b.scss", ".b { c: d; }"),
        ("src/index.jade", "<p>i</p>"),
        ("src/about.jade", "<p>a</p>"),
    ]);

    let (styles, pages) =
        with_timeout(async { tokio::join!(fx.runner.run("sass"), fx.runner.run("jade")) }).await;

    styles.unwrap();
    pages.unwrap();
    for out in ["build/a.css", "build/b.css", "build/index.html", "build/about.html"] {
        assert!(fx.exists(out), "{out} missing");
    }
}

#[cfg(unix)]
#[tokio::test]
async fn assets_with_directory_symlink_loop_terminates() {
    init_tracing();
    let fx = SiteFixture::new(&[("src/assets/img/logo.svg", "<svg/>")]);
    std::os::unix::fs::symlink(fx.path("src/assets"), fx.path("src/assets/img/loop")).unwrap();

    let report = with_timeout(fx.runner.run("assets")).await.unwrap();

    assert_eq!(report.executed(), vec!["assets"]);
    assert!(fx.exists("build/assets/img/logo.svg"));
    assert!(!fx.exists("build/assets/img/loop"));
}
