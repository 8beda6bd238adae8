//! Dependency closure over the metabase type graph.
//!
//! Starting from the names scripts reference directly, the resolver follows
//! super types, method signatures, property types and the inner/outer
//! relation until no new names appear. The type graph is cyclic in general,
//! so traversal uses an explicit frontier and a visited set rather than
//! recursion.

use std::collections::{BTreeSet, HashSet};

use crate::metabase::Metabase;
use crate::types::enclosing_type;

/// Result of a closure computation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Closure {
    /// Every name that needs a wrapper, sorted and deduplicated.
    pub names: BTreeSet<String>,
    /// Requested names that have no metabase entry. These are also present
    /// in `names` but contributed no further types.
    pub unresolved: BTreeSet<String>,
}

/// Incremental closure computation over one metabase.
///
/// Owns the traversal state for a single build run; feed it requested names
/// with [`request`](Self::request) and collect the result with
/// [`finish`](Self::finish).
pub struct ClosureResolver<'m> {
    metabase: &'m Metabase,
    visited: HashSet<&'m str>,
    frontier: Vec<&'m str>,
    unresolved: BTreeSet<String>,
}

impl<'m> ClosureResolver<'m> {
    /// Creates a resolver with empty traversal state.
    pub fn new(metabase: &'m Metabase) -> Self {
        Self {
            metabase,
            visited: HashSet::new(),
            frontier: Vec::new(),
            unresolved: BTreeSet::new(),
        }
    }

    /// Adds a requested name and expands everything reachable from it.
    ///
    /// Returns `false` if the name has no metabase entry; such a name is kept
    /// in the result but not expanded.
    pub fn request(&mut self, name: &str) -> bool {
        match self.metabase.get_key_value(name) {
            Some((key, _)) => {
                self.frontier.push(key);
                self.drain();
                true
            }
            None => {
                self.unresolved.insert(name.to_string());
                false
            }
        }
    }

    fn drain(&mut self) {
        while let Some(name) = self.frontier.pop() {
            // Names reached through signatures may be primitives or unknown.
            let Some((name, entry)) = self.metabase.get_key_value(name) else {
                continue;
            };
            if !self.visited.insert(name) {
                continue;
            }

            entry.for_each_reference(|referenced| {
                if !self.visited.contains(referenced) {
                    self.frontier.push(referenced);
                }
            });

            match enclosing_type(name) {
                Some(outer) => self.frontier.push(outer),
                None => self.frontier.extend(self.metabase.nested_types_of(name)),
            }
        }
    }

    /// Consumes the resolver and returns the sorted closure.
    pub fn finish(self) -> Closure {
        let mut names: BTreeSet<String> = self.visited.into_iter().map(str::to_string).collect();
        names.extend(self.unresolved.iter().cloned());
        Closure {
            names,
            unresolved: self.unresolved,
        }
    }
}

/// Computes the closure of `requested`, reporting unresolved names.
pub fn resolve<I, S>(metabase: &Metabase, requested: I) -> Closure
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut resolver = ClosureResolver::new(metabase);
    for name in requested {
        resolver.request(name.as_ref());
    }
    resolver.finish()
}

/// Computes the sorted, deduplicated set of names that must be bound
/// together with `requested`.
pub fn closure<I, S>(metabase: &Metabase, requested: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    resolve(metabase, requested).names
}
