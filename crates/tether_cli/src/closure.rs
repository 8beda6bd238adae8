//! `tether closure`: print the dependency closure of the given types.

use std::path::PathBuf;

use tether_metabase::{resolve, Metabase};
use tracing::warn;

use crate::project::load_project;
use crate::{ClosureArgs, GlobalArgs};

/// Runs the `tether closure` command.
///
/// Prints one name per line, sorted. Returns exit code 2 if a requested
/// name is unknown to the metabase.
pub fn run(args: &ClosureArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let metabase_path = match &args.metabase {
        Some(path) => PathBuf::from(path),
        None => load_project(global)?
            .paths
            .metabase
            .ok_or("no metabase configured; set paths.metabase or pass --metabase")?,
    };
    let metabase = Metabase::load(&metabase_path)?;

    let closure = resolve(&metabase, &args.names);
    for name in &closure.names {
        println!("{name}");
    }
    for name in &closure.unresolved {
        warn!(name = %name, "type not found in metabase");
    }
    Ok(if closure.unresolved.is_empty() { 0 } else { 2 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_name_exits_with_two() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metabase.json");
        std::fs::write(&path, r#"{ "types": { "A": { "kind": "class" } } }"#).unwrap();

        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            config: None,
        };
        let known = ClosureArgs {
            names: vec!["A".to_string()],
            metabase: Some(path.display().to_string()),
        };
        assert_eq!(run(&known, &global).unwrap(), 0);

        let unknown = ClosureArgs {
            names: vec!["A".to_string(), "Nope".to_string()],
            metabase: Some(path.display().to_string()),
        };
        assert_eq!(run(&unknown, &global).unwrap(), 2);
    }
}
