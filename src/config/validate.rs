// src/config/validate.rs

use std::path::{Component, Path, PathBuf};

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile, WatchBindingConfig};
use crate::dag::TaskRegistry;
use crate::errors::{Result, SitedagError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::SitedagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_paths(cfg)?;
    validate_extensions(cfg)?;
    if let Some(bindings) = &cfg.watch {
        validate_watch_bindings(bindings)?;
    }
    Ok(())
}

fn validate_paths(cfg: &RawConfigFile) -> Result<()> {
    let paths = &cfg.paths;

    if paths.source.as_os_str().is_empty() {
        return Err(config_error("[paths].source must not be empty"));
    }
    if paths.build.as_os_str().is_empty() {
        return Err(config_error("[paths].build must not be empty"));
    }
    let source = without_cur_dir(&paths.source);
    let build = without_cur_dir(&paths.build);
    if source == build {
        return Err(SitedagError::ConfigError(format!(
            "[paths].source and [paths].build must differ (both are {:?})",
            paths.source
        )));
    }
    // The watcher covers the whole source root, so build output inside it
    // would re-trigger the tasks that wrote it.
    if build.starts_with(&source) || source.starts_with(&build) {
        return Err(SitedagError::ConfigError(format!(
            "[paths].build ({:?}) and [paths].source ({:?}) must not contain each other",
            paths.build, paths.source
        )));
    }

    for dir in paths.asset_dirs.iter().chain(paths.template_dirs.iter()) {
        if !is_plain_relative(Path::new(dir)) {
            return Err(SitedagError::ConfigError(format!(
                "subtree '{dir}' must be a relative path inside the source root"
            )));
        }
    }

    Ok(())
}

fn validate_extensions(cfg: &RawConfigFile) -> Result<()> {
    let exts = [
        ("[styles].extension", &cfg.styles.extension),
        ("[templates].extension", &cfg.templates.extension),
        ("[templates].output_extension", &cfg.templates.output_extension),
    ];

    for (key, ext) in exts {
        if ext.is_empty() {
            return Err(SitedagError::ConfigError(format!("{key} must not be empty")));
        }
        if ext.starts_with('.') {
            return Err(SitedagError::ConfigError(format!(
                "{key} must not start with a dot (got \"{ext}\")"
            )));
        }
    }

    if cfg.styles.extension == cfg.templates.extension {
        return Err(config_error(
            "[styles].extension and [templates].extension must differ",
        ));
    }

    Ok(())
}

fn validate_watch_bindings(bindings: &[WatchBindingConfig]) -> Result<()> {
    for binding in bindings {
        if binding.tasks.is_empty() {
            return Err(SitedagError::ConfigError(format!(
                "watch binding '{}' must name at least one task",
                binding.glob
            )));
        }

        for pattern in std::iter::once(&binding.glob).chain(binding.exclude.iter()) {
            Glob::new(pattern).map_err(|e| {
                SitedagError::ConfigError(format!("invalid glob pattern '{pattern}': {e}"))
            })?;
        }
    }
    Ok(())
}

/// Check that every task named by a watch binding is registered.
///
/// Tasks are registered in code rather than in the config file, so this runs
/// once the registry has been built.
pub fn validate_bindings_against(cfg: &ConfigFile, registry: &TaskRegistry) -> Result<()> {
    for binding in cfg.watch_bindings() {
        for task in &binding.tasks {
            if !registry.contains(task) {
                return Err(SitedagError::UnknownTask(format!(
                    "{task} (referenced by watch binding '{}')",
                    binding.glob
                )));
            }
        }
    }
    Ok(())
}

fn is_plain_relative(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn without_cur_dir(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn config_error(msg: &str) -> SitedagError {
    SitedagError::ConfigError(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::PathsSection;

    #[test]
    fn rejects_identical_source_and_build() {
        let raw = RawConfigFile {
            paths: PathsSection {
                source: "site".into(),
                build: "site".into(),
                ..PathsSection::default()
            },
            ..RawConfigFile::default()
        };

        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(matches!(err, SitedagError::ConfigError(msg) if msg.contains("must differ")));
    }

    fn with_roots(source: &str, build: &str) -> RawConfigFile {
        RawConfigFile {
            paths: PathsSection {
                source: source.into(),
                build: build.into(),
                ..PathsSection::default()
            },
            ..RawConfigFile::default()
        }
    }

    #[test]
    fn rejects_build_root_inside_source_root() {
        let err = ConfigFile::try_from(with_roots("src", "src/build")).unwrap_err();
        assert!(matches!(err, SitedagError::ConfigError(msg) if msg.contains("must not contain")));

        assert!(ConfigFile::try_from(with_roots("./src", "src/./out")).is_err());
    }

    #[test]
    fn rejects_build_root_containing_source_root() {
        assert!(ConfigFile::try_from(with_roots("site/src", "site")).is_err());
        assert!(ConfigFile::try_from(with_roots("src", ".")).is_err());
    }

    #[test]
    fn same_root_spelled_differently_is_rejected() {
        let err = ConfigFile::try_from(with_roots("./src/", "src")).unwrap_err();
        assert!(matches!(err, SitedagError::ConfigError(msg) if msg.contains("must differ")));
    }

    #[test]
    fn sibling_roots_with_shared_prefix_are_accepted() {
        assert!(ConfigFile::try_from(with_roots("site", "site-out")).is_ok());
        assert!(ConfigFile::try_from(with_roots("src", "build")).is_ok());
    }

    #[test]
    fn rejects_parent_dir_subtrees() {
        let mut raw = RawConfigFile::default();
        raw.paths.asset_dirs.push("../outside".to_string());

        assert!(ConfigFile::try_from(raw).is_err());
    }

    #[test]
    fn rejects_binding_without_tasks() {
        let raw = RawConfigFile {
            watch: Some(vec![WatchBindingConfig::new("src/**/*.scss", &[])]),
            ..RawConfigFile::default()
        };

        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(matches!(err, SitedagError::ConfigError(msg) if msg.contains("at least one task")));
    }

    #[test]
    fn rejects_malformed_glob() {
        let raw = RawConfigFile {
            watch: Some(vec![WatchBindingConfig::new("src/[*.scss", &["sass"])]),
            ..RawConfigFile::default()
        };

        assert!(matches!(
            ConfigFile::try_from(raw),
            Err(SitedagError::ConfigError(_))
        ));
    }

    #[test]
    fn rejects_dotted_extension() {
        let mut raw = RawConfigFile::default();
        raw.styles.extension = ".scss".to_string();

        assert!(ConfigFile::try_from(raw).is_err());
    }
}
