//! Configuration types deserialized from `tether.toml`.

use serde::Deserialize;

/// Default cache directory, relative to the project directory.
pub const DEFAULT_CACHE_DIR: &str = ".tether-cache";

/// Default wrapper output directory, relative to the project directory.
pub const DEFAULT_OUTPUT_DIR: &str = "wrappers";

/// Default number of concurrent artifact writes.
pub const DEFAULT_CONCURRENCY: usize = 25;

/// Largest accepted `generate.concurrency`.
pub const MAX_CONCURRENCY: usize = 64;

/// The top-level project configuration parsed from `tether.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Core project metadata.
    pub project: ProjectMeta,
    /// Input and output locations.
    #[serde(default)]
    pub paths: PathsConfig,
    /// Wrapper generation settings.
    #[serde(default)]
    pub generate: GenerateConfig,
}

/// Core project metadata required in every `tether.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// A brief description of the project.
    #[serde(default)]
    pub description: String,
}

/// Project-relative paths. Absolute paths are used as given.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    /// Directory holding per-task incremental state.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
    /// Directory receiving generated wrappers.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Metabase file (`.json` or `.json.gz`).
    #[serde(default)]
    pub metabase: Option<String>,
    /// Pre-computed reference set. Ignored when `sources` is set.
    #[serde(default)]
    pub references: Option<String>,
    /// Script sources to scan for type references.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Directory the generated wrappers are copied into after generation.
    #[serde(default)]
    pub copy_to: Option<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            output_dir: default_output_dir(),
            metabase: None,
            references: None,
            sources: Vec::new(),
            copy_to: None,
        }
    }
}

fn default_cache_dir() -> String {
    DEFAULT_CACHE_DIR.to_string()
}

fn default_output_dir() -> String {
    DEFAULT_OUTPUT_DIR.to_string()
}

/// Wrapper generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateConfig {
    /// Maximum number of concurrent artifact writes.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Artifact file extension, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Alias index file name inside the output directory.
    #[serde(default = "default_index_file")]
    pub index_file: String,
    /// Module the generated wrappers require their binding from.
    #[serde(default)]
    pub binding_module: Option<String>,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            extension: default_extension(),
            index_file: default_index_file(),
            binding_module: None,
        }
    }
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_extension() -> String {
    "js".to_string()
}

fn default_index_file() -> String {
    "tether.index.json".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_defaults() {
        let paths = PathsConfig::default();
        assert_eq!(paths.cache_dir, ".tether-cache");
        assert_eq!(paths.output_dir, "wrappers");
        assert!(paths.metabase.is_none());
        assert!(paths.sources.is_empty());
    }

    #[test]
    fn generate_defaults() {
        let generate = GenerateConfig::default();
        assert_eq!(generate.concurrency, 25);
        assert_eq!(generate.extension, "js");
        assert_eq!(generate.index_file, "tether.index.json");
    }

    #[test]
    fn partial_generate_table_keeps_defaults() {
        let generate: GenerateConfig = toml::from_str("extension = \"mjs\"").unwrap();
        assert_eq!(generate.extension, "mjs");
        assert_eq!(generate.concurrency, DEFAULT_CONCURRENCY);
    }
}
