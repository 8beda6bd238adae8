//! Locating the project and loading its configuration.

use std::path::{Path, PathBuf};

use tether_config::{ProjectConfig, ResolvedPaths, CONFIG_FILE};

use crate::GlobalArgs;

/// Walks up from `start` looking for a directory containing `tether.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut dir = start.to_path_buf();
    loop {
        if dir.join(CONFIG_FILE).is_file() {
            return Ok(dir);
        }
        if !dir.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// A loaded project: its configuration and resolved paths.
pub struct Project {
    /// Parsed configuration.
    pub config: ProjectConfig,
    /// Paths resolved against the project directory.
    pub paths: ResolvedPaths,
}

/// Loads the project selected by `--config`, or the nearest one above the
/// current directory.
///
/// `--config` may name either a `tether.toml` file or a project directory.
pub fn load_project(global: &GlobalArgs) -> Result<Project, Box<dyn std::error::Error>> {
    let (project_dir, config_file) = match &global.config {
        Some(config_path) => {
            let p = PathBuf::from(config_path);
            if p.is_file() {
                let dir = p
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                (dir, p)
            } else {
                let file = p.join(CONFIG_FILE);
                (p, file)
            }
        }
        None => {
            let dir = find_project_root(&std::env::current_dir()?)?;
            let file = dir.join(CONFIG_FILE);
            (dir, file)
        }
    };

    let config = tether_config::load_config_file(&config_file)?;
    let paths = tether_config::resolve_paths(&config, &project_dir);
    Ok(Project { config, paths })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global(config: Option<&Path>) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            config: config.map(|p| p.display().to_string()),
        }
    }

    #[test]
    fn finds_root_from_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[project]\nname = \"app\"\n").unwrap();
        let nested = dir.path().join("src/ui");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_project_root(&nested).unwrap(), dir.path());
    }

    #[test]
    fn missing_root_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_project_root(dir.path()).unwrap_err();
        assert!(err.to_string().contains(CONFIG_FILE));
    }

    #[test]
    fn config_flag_accepts_file_or_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(CONFIG_FILE);
        std::fs::write(&file, "[project]\nname = \"app\"\n").unwrap();

        let from_file = load_project(&global(Some(&file))).unwrap();
        assert_eq!(from_file.paths.project_dir, dir.path());
        let from_dir = load_project(&global(Some(dir.path()))).unwrap();
        assert_eq!(from_dir.config.project.name, "app");
        assert_eq!(from_dir.paths.output_dir, dir.path().join("wrappers"));
    }
}
