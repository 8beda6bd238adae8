//! `tether clean`: discard all incremental state.

use crate::project::load_project;
use crate::GlobalArgs;

/// Runs the `tether clean` command.
///
/// Removes the cache directory. Generated wrappers are left in place; the
/// next `generate` sees no prior state and rewrites them from scratch.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let cache_dir = &project.paths.cache_dir;

    match std::fs::remove_dir_all(cache_dir) {
        Ok(()) => {
            if !global.quiet {
                eprintln!("     Removed {}", cache_dir.display());
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(format!("failed to remove {}: {e}", cache_dir.display()).into()),
    }
    Ok(0)
}
