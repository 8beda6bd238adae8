//! `tether generate`: bring the wrapper directory up to date.
//!
//! 1. Load the project configuration
//! 2. Load the metabase
//! 3. Obtain the reference set, scanning sources when configured
//! 4. Run the generate task
//! 5. Copy the wrappers to `paths.copy_to`, if set

use std::path::{Path, PathBuf};

use tether_metabase::{Metabase, ReferenceSet};
use tether_tasks::{
    run_task, CopySourcesTask, GenerateOptions, GenerateSourcesTask, RequireScanner, RunKind,
    ScanReferencesTask, StubTemplate,
};
use tracing::info;

use crate::project::{load_project, Project};
use crate::{GenerateArgs, GlobalArgs};

/// Runs the `tether generate` command. Returns exit code 0 on success.
pub fn run(args: &GenerateArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let outcome = generate(&project, args)?;

    if !global.quiet {
        eprintln!(
            "   Generated {} ({}) in {}",
            summary(outcome.generated, outcome.removed, outcome.total),
            kind_label(outcome.kind),
            project.paths.output_dir.display()
        );
    }
    Ok(0)
}

/// What one `generate` invocation did.
#[derive(Debug)]
pub struct GenerateSummary {
    /// How the generate task ran.
    pub kind: RunKind,
    /// Wrappers written.
    pub generated: usize,
    /// Wrappers deleted.
    pub removed: usize,
    /// Types in the registry after the run.
    pub total: usize,
}

/// Runs the scan, generate and copy tasks for `project`.
pub fn generate(
    project: &Project,
    args: &GenerateArgs,
) -> Result<GenerateSummary, Box<dyn std::error::Error>> {
    let paths = &project.paths;

    let metabase_path = args
        .metabase
        .as_ref()
        .map(|p| paths.project_dir.join(p))
        .or_else(|| paths.metabase.clone())
        .ok_or("no metabase configured; set paths.metabase or pass --metabase")?;
    let metabase = Metabase::load(&metabase_path)?;
    info!(types = metabase.len(), path = %metabase_path.display(), "loaded metabase");

    let (references, references_path) = load_references(project, args)?;

    let generate_config = &project.config.generate;
    let template = StubTemplate {
        binding_module: generate_config.binding_module.clone(),
    };
    let options = GenerateOptions {
        extension: generate_config.extension.clone(),
        concurrency: generate_config.concurrency,
        index_file: Some(generate_config.index_file.clone()),
    };
    let mut task = GenerateSourcesTask::new(
        paths.task_state_dir(GenerateSourcesTask::NAME),
        &paths.output_dir,
        &metabase,
        &references,
        &template,
    )
    .with_inputs([references_path])
    .with_metabase_input(&metabase_path)
    .with_options(options);
    let outcome = run_task(&mut task)?;

    if let Some(copy_to) = &paths.copy_to {
        let mut copy = CopySourcesTask::new(
            paths.task_state_dir(CopySourcesTask::NAME),
            &paths.output_dir,
            copy_to,
        )
        .with_concurrency(generate_config.concurrency);
        let copied = run_task(&mut copy)?;
        info!(
            copied = copied.value.copied,
            removed = copied.value.removed,
            "synced wrappers to {}",
            copy_to.display()
        );
    }

    Ok(GenerateSummary {
        kind: outcome.kind,
        generated: outcome.value.generated.len(),
        removed: outcome.value.removed.len(),
        total: outcome.value.registry.len(),
    })
}

/// Returns the reference set and the file it is persisted in.
///
/// `--references` wins over configured sources, which win over
/// `paths.references`.
fn load_references(
    project: &Project,
    args: &GenerateArgs,
) -> Result<(ReferenceSet, PathBuf), Box<dyn std::error::Error>> {
    let paths = &project.paths;

    if args.references.is_none() && !paths.sources.is_empty() {
        let scanner = RequireScanner;
        let mut scan = ScanReferencesTask::new(
            paths.task_state_dir(ScanReferencesTask::NAME),
            paths.task_state_dir("references"),
            paths.sources.iter().cloned(),
            &scanner,
        );
        let references_path = scan.references_path();
        let outcome = run_task(&mut scan)?;
        return Ok((outcome.value, references_path));
    }

    let path = args
        .references
        .as_ref()
        .map(|p| paths.project_dir.join(p))
        .or_else(|| paths.references.clone())
        .ok_or(
            "no references configured; set paths.sources, paths.references or pass --references",
        )?;
    Ok((read_references(&path)?, path))
}

fn read_references(path: &Path) -> Result<ReferenceSet, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read references {}: {e}", path.display()))?;
    Ok(ReferenceSet::from_json_str(&content)?)
}

fn kind_label(kind: RunKind) -> &'static str {
    match kind {
        RunKind::Full => "full",
        RunKind::Incremental => "incremental",
        RunKind::Skipped => "up to date",
    }
}

fn summary(generated: usize, removed: usize, total: usize) -> String {
    let plural = |n: usize| if n == 1 { "wrapper" } else { "wrappers" };
    if removed == 0 {
        format!("{generated} {}, {total} total", plural(generated))
    } else {
        format!(
            "{generated} {}, removed {removed}, {total} total",
            plural(generated)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_config::CONFIG_FILE;

    const METABASE: &str = r#"{
      "types": {
        "java.lang.Object": { "kind": "class" },
        "java.io.File": { "kind": "class", "superType": "java.lang.Object" }
      }
    }"#;

    fn project(extra: &str) -> (tempfile::TempDir, Project) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("metabase.json"), METABASE).unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            format!("[project]\nname = \"app\"\n[paths]\nmetabase = \"metabase.json\"\n{extra}"),
        )
        .unwrap();
        let config = tether_config::load_config(dir.path()).unwrap();
        let paths = tether_config::resolve_paths(&config, dir.path());
        (dir, Project { config, paths })
    }

    fn no_overrides() -> GenerateArgs {
        GenerateArgs {
            metabase: None,
            references: None,
        }
    }

    #[test]
    fn generates_from_scanned_sources() {
        let (dir, project) = project("sources = [\"src\"]\n");
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(
            dir.path().join("src/app.js"),
            "const File = require('java.io.File');",
        )
        .unwrap();

        let first = generate(&project, &no_overrides()).unwrap();
        assert_eq!(first.kind, RunKind::Full);
        assert_eq!(first.generated, 2);
        assert!(dir.path().join("wrappers/java.io.File.js").is_file());
        assert!(dir.path().join("wrappers/java.lang.Object.js").is_file());

        let second = generate(&project, &no_overrides()).unwrap();
        assert_eq!(second.kind, RunKind::Skipped);
        assert_eq!(second.total, 2);
    }

    #[test]
    fn generates_from_reference_file_and_copies() {
        let (dir, project) =
            project("references = \"references.json\"\ncopy_to = \"dist\"\n");
        std::fs::write(
            dir.path().join("references.json"),
            r#"{ "app.js": ["java.lang.Object"] }"#,
        )
        .unwrap();

        let summary = generate(&project, &no_overrides()).unwrap();
        assert_eq!(summary.generated, 1);
        assert!(dir.path().join("dist/java.lang.Object.js").is_file());
    }

    #[test]
    fn missing_references_is_an_error() {
        let (_dir, project) = project("");
        let err = generate(&project, &no_overrides()).unwrap_err();
        assert!(err.to_string().contains("no references configured"));
    }

    #[test]
    fn summary_text() {
        assert_eq!(summary(1, 0, 3), "1 wrapper, 3 total");
        assert_eq!(summary(2, 1, 4), "2 wrappers, removed 1, 4 total");
    }
}
