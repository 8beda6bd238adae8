//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::{ProjectConfig, MAX_CONCURRENCY};
use std::path::Path;

/// Name of the configuration file inside a project directory.
pub const CONFIG_FILE: &str = "tether.toml";

/// Loads and validates a `tether.toml` configuration from a project directory.
///
/// Reads `<project_dir>/tether.toml`, parses it, and validates required fields.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    load_config_file(&project_dir.join(CONFIG_FILE))
}

/// Loads and validates a configuration from an explicit file path.
pub fn load_config_file(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    load_config_from_str(&content)
}

/// Parses and validates a `tether.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.trim().is_empty() {
        return Err(ConfigError::MissingField("project.name"));
    }

    let paths = &config.paths;
    if paths.cache_dir.is_empty() {
        return Err(ConfigError::MissingField("paths.cache_dir"));
    }
    if paths.output_dir.is_empty() {
        return Err(ConfigError::MissingField("paths.output_dir"));
    }
    if Path::new(&paths.cache_dir) == Path::new(&paths.output_dir) {
        return Err(ConfigError::Invalid {
            field: "paths.output_dir",
            reason: "must differ from paths.cache_dir".to_string(),
        });
    }

    let generate = &config.generate;
    if !(1..=MAX_CONCURRENCY).contains(&generate.concurrency) {
        return Err(ConfigError::Invalid {
            field: "generate.concurrency",
            reason: format!(
                "must be between 1 and {MAX_CONCURRENCY}, got {}",
                generate.concurrency
            ),
        });
    }
    if !is_plain_name(&generate.extension) || generate.extension.contains('.') {
        return Err(ConfigError::Invalid {
            field: "generate.extension",
            reason: format!("'{}' is not a bare extension", generate.extension),
        });
    }
    if !is_plain_name(&generate.index_file) {
        return Err(ConfigError::Invalid {
            field: "generate.index_file",
            reason: format!("'{}' is not a plain file name", generate.index_file),
        });
    }
    Ok(())
}

fn is_plain_name(s: &str) -> bool {
    !s.is_empty() && !s.contains(['/', '\\']) && s != "." && s != ".."
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DEFAULT_CACHE_DIR, DEFAULT_CONCURRENCY};

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
[project]
name = "app"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.name, "app");
        assert_eq!(config.paths.cache_dir, DEFAULT_CACHE_DIR);
        assert_eq!(config.generate.concurrency, DEFAULT_CONCURRENCY);
        assert!(config.paths.metabase.is_none());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[project]
name = "app"
description = "Native bindings for the app"

[paths]
cache_dir = "build/tether"
output_dir = "build/wrappers"
metabase = "build/metabase.json.gz"
references = "build/references.json"
sources = ["Resources", "lib"]
copy_to = "dist/hyperloop"

[generate]
concurrency = 8
extension = "mjs"
index_file = "index.json"
binding_module = "hyperloop/binding"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.description, "Native bindings for the app");
        assert_eq!(config.paths.output_dir, "build/wrappers");
        assert_eq!(config.paths.metabase.as_deref(), Some("build/metabase.json.gz"));
        assert_eq!(config.paths.sources, vec!["Resources", "lib"]);
        assert_eq!(config.paths.copy_to.as_deref(), Some("dist/hyperloop"));
        assert_eq!(config.generate.concurrency, 8);
        assert_eq!(config.generate.extension, "mjs");
        assert_eq!(config.generate.index_file, "index.json");
        assert_eq!(
            config.generate.binding_module.as_deref(),
            Some("hyperloop/binding")
        );
    }

    #[test]
    fn missing_name_errors() {
        let toml = r#"
[project]
name = ""
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField("project.name")));
    }

    #[test]
    fn missing_project_table_is_parse_error() {
        let err = load_config_from_str("[paths]\ncache_dir = \"c\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn unknown_field_is_parse_error() {
        let toml = r#"
[project]
name = "app"
colour = "blue"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let toml = "this is not valid toml {{{}}}";
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn concurrency_out_of_range() {
        for value in [0, 65] {
            let toml = format!("[project]\nname = \"app\"\n[generate]\nconcurrency = {value}\n");
            let err = load_config_from_str(&toml).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { .. }), "{value}");
        }
    }

    #[test]
    fn dotted_extension_rejected() {
        let toml = "[project]\nname = \"app\"\n[generate]\nextension = \".js\"\n";
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn index_file_with_directory_rejected() {
        let toml = "[project]\nname = \"app\"\n[generate]\nindex_file = \"sub/index.json\"\n";
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn same_cache_and_output_dir_rejected() {
        let toml = r#"
[project]
name = "app"

[paths]
cache_dir = "out"
output_dir = "out"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn load_from_project_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[project]\nname = \"disk\"\n").unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.project.name, "disk");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
