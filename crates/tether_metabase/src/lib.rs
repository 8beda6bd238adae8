//! The native type catalog ("metabase") and dependency closure resolution.
//!
//! A [`Metabase`] maps qualified type names to [`TypeEntry`] descriptors
//! produced by an external introspection step. [`closure`] expands a set of
//! referenced names into the complete, sorted set of types that need
//! wrappers so generated code has no dangling references.

#![warn(missing_docs)]

pub mod closure;
pub mod error;
pub mod metabase;
pub mod references;
pub mod types;

pub use closure::{closure, resolve, Closure, ClosureResolver};
pub use error::MetabaseError;
pub use metabase::{validate_name, Metabase};
pub use references::ReferenceSet;
pub use types::{
    dotted_alias, enclosing_type, ClassShape, EnumShape, MethodSignature, ModuleShape,
    StructShape, TypeEntry, TypeKind, NESTING_SEPARATOR,
};
