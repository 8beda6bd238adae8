//! Wrapper source generation as an incremental task.
//!
//! A full run regenerates the closure of every referenced type. An
//! incremental run recomputes the closure from the complete reference set,
//! diffs it against the registry of the previous run and only writes or
//! deletes the artifacts that differ.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tether_cache::ChangeSet;
use tether_metabase::{resolve, Closure, Metabase, ReferenceSet};
use tracing::{debug, info, trace, warn};

use crate::error::TaskError;
use crate::index::{artifact_file_name, write_index, DEFAULT_INDEX_FILE};
use crate::pool::{WorkerPool, DEFAULT_CONCURRENCY};
use crate::registry::{GeneratedRegistry, RegistryDiff, REGISTRY_FILE};
use crate::task::IncrementalTask;
use crate::template::WrapperTemplate;

/// Tunables for artifact generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Extension of generated artifacts, without the dot.
    pub extension: String,
    /// Maximum number of concurrent artifact writes or deletes.
    pub concurrency: usize,
    /// Name of the alias index inside the output directory; `None` disables it.
    pub index_file: Option<String>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            extension: "js".to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            index_file: Some(DEFAULT_INDEX_FILE.to_string()),
        }
    }
}

/// Result of one generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    /// Names with artifacts after this run.
    pub registry: GeneratedRegistry,
    /// Names whose artifacts were written in this run.
    pub generated: BTreeSet<String>,
    /// Names whose artifacts were deleted in this run.
    pub removed: BTreeSet<String>,
    /// Requested names without a metabase entry.
    pub unresolved: BTreeSet<String>,
}

/// Generates one wrapper artifact per type in the dependency closure of the
/// referenced types.
pub struct GenerateSourcesTask<'a> {
    incremental_dir: PathBuf,
    output_dir: PathBuf,
    inputs: Vec<PathBuf>,
    metabase_input: Option<PathBuf>,
    metabase: &'a Metabase,
    references: &'a ReferenceSet,
    template: &'a dyn WrapperTemplate,
    options: GenerateOptions,
}

impl<'a> GenerateSourcesTask<'a> {
    /// Task name used in logs and errors.
    pub const NAME: &'static str = "generate-sources";

    /// Creates a task writing artifacts into `output_dir` and keeping its
    /// state in `incremental_dir`.
    pub fn new(
        incremental_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        metabase: &'a Metabase,
        references: &'a ReferenceSet,
        template: &'a dyn WrapperTemplate,
    ) -> Self {
        Self {
            incremental_dir: incremental_dir.into(),
            output_dir: output_dir.into(),
            inputs: Vec::new(),
            metabase_input: None,
            metabase,
            references,
            template,
            options: GenerateOptions::default(),
        }
    }

    /// Adds monitored inputs, typically the persisted reference set.
    pub fn with_inputs<I, P>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.inputs.extend(inputs.into_iter().map(Into::into));
        self
    }

    /// Monitors the metabase file. A change to it makes an incremental run
    /// regenerate everything, since existing artifacts may be stale.
    pub fn with_metabase_input(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.inputs.push(path.clone());
        self.metabase_input = Some(path);
        self
    }

    /// Replaces the generation options.
    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    /// Where the registry of generated names is persisted.
    pub fn registry_path(&self) -> PathBuf {
        self.incremental_dir.join(REGISTRY_FILE)
    }

    /// Where the artifact for `name` is written.
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.output_dir
            .join(artifact_file_name(name, &self.options.extension))
    }

    fn index_path(&self) -> Option<PathBuf> {
        self.options
            .index_file
            .as_ref()
            .map(|file| self.output_dir.join(file))
    }

    fn compute_closure(&self) -> Closure {
        let closure = resolve(self.metabase, self.references.referenced_types());
        for name in &closure.unresolved {
            warn!(name = %name, "referenced type has no metabase entry, no wrapper generated");
        }
        debug!(
            types = closure.names.len(),
            unresolved = closure.unresolved.len(),
            "computed dependency closure"
        );
        closure
    }

    /// Writes artifacts for every name that has a metabase entry and
    /// returns those names.
    fn generate(
        &self,
        pool: &WorkerPool,
        names: &BTreeSet<String>,
    ) -> Result<BTreeSet<String>, TaskError> {
        let entries: Vec<_> = names
            .iter()
            .filter_map(|name| self.metabase.get(name))
            .collect();

        pool.try_for_each(&entries, |entry| {
            let text = self
                .template
                .render(entry)
                .map_err(|e| TaskError::Template {
                    name: entry.name.clone(),
                    reason: e.to_string(),
                })?;
            let path = self.artifact_path(&entry.name);
            std::fs::write(&path, text).map_err(|e| TaskError::ArtifactWrite {
                path: path.clone(),
                source: e,
            })?;
            trace!(name = %entry.name, "wrapper created");
            Ok(())
        })?;

        Ok(entries.iter().map(|entry| entry.name.clone()).collect())
    }

    /// Deletes the artifacts of dropped names and returns the names whose
    /// artifacts were deleted.
    ///
    /// Only names with a metabase entry ever had an artifact written, so
    /// unresolved names are forgotten without touching the filesystem.
    fn remove(
        &self,
        pool: &WorkerPool,
        names: &BTreeSet<String>,
    ) -> Result<BTreeSet<String>, TaskError> {
        let names: Vec<&String> = names
            .iter()
            .filter(|name| self.metabase.contains(name))
            .collect();
        pool.try_for_each(&names, |name| {
            let path = self.artifact_path(name);
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    trace!(name = %name, "wrapper removed");
                    Ok(())
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(TaskError::ArtifactRemove { path, source: e }),
            }
        })?;
        Ok(names.into_iter().cloned().collect())
    }

    fn commit(&self, registry: &GeneratedRegistry) -> Result<(), TaskError> {
        if let Some(index) = self.index_path() {
            let with_artifacts = registry.iter().filter(|name| self.metabase.contains(name));
            write_index(&index, with_artifacts, &self.options.extension)?;
        }
        registry.save(&self.registry_path())
    }

    fn empty_output_dir(&self) -> Result<(), TaskError> {
        match std::fs::remove_dir_all(&self.output_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(TaskError::io(&self.output_dir, e)),
        }
        std::fs::create_dir_all(&self.output_dir).map_err(|e| TaskError::io(&self.output_dir, e))
    }

    fn pool(&self) -> Result<WorkerPool, TaskError> {
        WorkerPool::new(self.options.concurrency)
    }
}

impl IncrementalTask for GenerateSourcesTask<'_> {
    type Output = GenerationReport;

    fn name(&self) -> &str {
        Self::NAME
    }

    fn incremental_dir(&self) -> &Path {
        &self.incremental_dir
    }

    fn input_paths(&self) -> Vec<PathBuf> {
        self.inputs.clone()
    }

    fn output_paths(&self) -> Vec<PathBuf> {
        vec![self.output_dir.clone(), self.registry_path()]
    }

    fn run_full(&mut self) -> Result<GenerationReport, TaskError> {
        self.empty_output_dir()?;

        if self.references.is_empty() {
            info!("skipping wrapper generation, no references found");
            let registry = GeneratedRegistry::new();
            self.commit(&registry)?;
            return Ok(GenerationReport {
                registry,
                ..GenerationReport::default()
            });
        }

        let closure = self.compute_closure();
        let generated = self.generate(&self.pool()?, &closure.names)?;
        let registry = GeneratedRegistry::from(closure.names);
        self.commit(&registry)?;

        Ok(GenerationReport {
            registry,
            generated,
            removed: BTreeSet::new(),
            unresolved: closure.unresolved,
        })
    }

    fn run_incremental(&mut self, changes: &ChangeSet) -> Result<GenerationReport, TaskError> {
        if let Some(metabase) = &self.metabase_input {
            if changes.get(metabase).is_some() {
                debug!("metabase changed, regenerating all wrappers");
                return self.run_full();
            }
        }
        let Some(previous) = GeneratedRegistry::load(&self.registry_path()) else {
            debug!("no usable registry, regenerating all wrappers");
            return self.run_full();
        };

        let closure = self.compute_closure();
        let diff = RegistryDiff::between(&previous, &closure.names);
        debug!(
            changed_inputs = changes.len(),
            generate = diff.to_generate.len(),
            remove = diff.to_remove.len(),
            "incremental wrapper update"
        );

        let pool = self.pool()?;
        let removed = self.remove(&pool, &diff.to_remove)?;
        let generated = self.generate(&pool, &diff.to_generate)?;
        let registry = GeneratedRegistry::from(closure.names);
        self.commit(&registry)?;

        Ok(GenerationReport {
            registry,
            generated,
            removed,
            unresolved: closure.unresolved,
        })
    }

    fn load_result_and_skip(&mut self) -> Result<GenerationReport, TaskError> {
        match GeneratedRegistry::load(&self.registry_path()) {
            Some(registry) => Ok(GenerationReport {
                registry,
                ..GenerationReport::default()
            }),
            None => self.run_full(),
        }
    }
}
