// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod serve;
pub mod site;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_or_default, validate_bindings_against};
use crate::dag::{RunPlan, TaskRegistry};
use crate::engine::Runner;
use crate::errors::SitedagError;
use crate::site::{SiteContext, register_site_tasks};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (plus the `--port` override)
/// - the site context and the task registry
/// - `--list` / `--dry-run`
/// - running the requested task
/// - Ctrl-C handling while the dev server is up
pub async fn run(args: CliArgs) -> Result<()> {
    let site = load_site(&args)?;
    let registry = build_registry(Arc::clone(&site))?;

    if args.list {
        print_task_list(&registry);
        return Ok(());
    }

    if args.dry_run {
        print_dry_run(&registry, site.config(), &args.task)?;
        return Ok(());
    }

    let runner = Runner::new(registry);
    match runner.run(&args.task).await {
        Ok(report) => info!(
            task = %report.target,
            run_id = report.run_id,
            executed = ?report.executed(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "task finished"
        ),
        // A compile error must not take down a dev server that is already up.
        Err(err @ SitedagError::ActionFailure { .. }) if site.session().is_active() => {
            error!(task = %args.task, error = %err, "task failed; still serving");
        }
        Err(err) => return Err(err.into()),
    }

    let session_active = site.session().is_active();
    if session_active {
        println!(
            "[sitedag] Watching {} (Ctrl-C to stop)",
            site.source_root().display()
        );
        tokio::signal::ctrl_c()
            .await
            .context("listening for Ctrl-C")?;
        info!("shutdown requested");
        site.shutdown();
    }

    Ok(())
}

/// Load the config named by `args` (applying `--port`) and build the site
/// context rooted at the config file's directory.
pub fn load_site(args: &CliArgs) -> Result<Arc<SiteContext>> {
    let explicit = args.config.as_deref().map(Path::new);
    let (config_path, mut cfg) = load_or_default(explicit)?;
    if let Some(port) = args.port {
        cfg.set_port(port);
    }

    let project_root = config_root_dir(&config_path);
    debug!(?config_path, ?project_root, "configuration loaded");

    Ok(Arc::new(SiteContext::new(project_root, cfg)))
}

/// Register the site tasks and check the whole graph plus the watch bindings.
pub fn build_registry(site: Arc<SiteContext>) -> Result<TaskRegistry> {
    let mut registry = TaskRegistry::new();
    register_site_tasks(&mut registry, Arc::clone(&site));
    registry.validate()?;
    validate_bindings_against(site.config(), &registry)?;
    Ok(registry)
}

/// Figure out the project root all configured paths are relative to.
///
/// - If the config path has a non-empty parent (e.g. "site/Sitedag.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Sitedag.toml" (parent = ""),
///   we fall back to the current working directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::path::absolute(parent).unwrap_or_else(|_| parent.to_path_buf())
        }
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn print_task_list(registry: &TaskRegistry) {
    println!("tasks ({}):", registry.len());
    for def in registry.iter() {
        let after = if def.prerequisites().is_empty() {
            String::new()
        } else {
            format!(" [after: {}]", def.prerequisites().join(", "))
        };
        println!(
            "  {:<14} {}{after}",
            def.name(),
            def.description().unwrap_or("")
        );
    }
}

/// Dry-run output: tasks, prerequisites, bindings and the execution order
/// of the requested task.
fn print_dry_run(registry: &TaskRegistry, cfg: &ConfigFile, task: &str) -> Result<()> {
    let plan = RunPlan::resolve(registry, task)?;

    println!("sitedag dry-run");
    println!("  source = {}", cfg.paths().source.display());
    println!("  build = {}", cfg.paths().build.display());
    println!("  server = {}:{}", cfg.server().host, cfg.server().port);
    println!();

    print_task_list(registry);
    println!();

    println!("watch bindings ({}):", cfg.watch_bindings().len());
    for binding in cfg.watch_bindings() {
        println!("  - {} -> {:?}", binding.glob, binding.tasks);
        if !binding.exclude.is_empty() {
            println!("      exclude: {:?}", binding.exclude);
        }
        if binding.use_hash {
            println!("      use_hash: true");
        }
    }
    println!();

    println!("plan for '{task}': {}", plan.order().join(" -> "));
    debug!("dry-run complete (no execution)");
    Ok(())
}
