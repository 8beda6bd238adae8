//! The seam between the orchestrator and whatever renders wrapper source.
//!
//! The orchestrator only hands a qualified name and its descriptor to a
//! [`WrapperTemplate`] and writes whatever text comes back.

use std::fmt::Write as _;

use tether_metabase::{dotted_alias, MethodSignature, TypeEntry, TypeKind};

use crate::error::BoxError;

/// Renders the source text of one wrapper.
///
/// Implementations are called from worker threads and must be `Sync`.
pub trait WrapperTemplate: Sync {
    /// Produces the artifact contents for `entry`.
    fn render(&self, entry: &TypeEntry) -> Result<String, BoxError>;
}

/// Built-in template emitting a small CommonJS module per type.
///
/// The module registers the type's members with a host-provided `binding`
/// object; it does not inspect the native API beyond names and types.
///
/// ```text
/// // Generated by tether. Do not edit.
/// 'use strict';
/// const binding = require('./binding');
///
/// module.exports = binding.class('java.io.File', {
///   superType: 'java.lang.Object',
///   methods: { exists: [['boolean']] },
///   properties: { path: 'java.lang.String' },
/// });
/// ```
#[derive(Debug, Clone, Default)]
pub struct StubTemplate {
    /// Module path the generated file requires the binding from.
    pub binding_module: Option<String>,
}

impl StubTemplate {
    /// Creates a template requiring the binding from `./binding`.
    pub fn new() -> Self {
        Self::default()
    }

    fn binding_module(&self) -> &str {
        self.binding_module.as_deref().unwrap_or("./binding")
    }
}

impl WrapperTemplate for StubTemplate {
    fn render(&self, entry: &TypeEntry) -> Result<String, BoxError> {
        let mut out = String::new();
        writeln!(out, "// Generated by tether. Do not edit.")?;
        writeln!(out, "// {} {}", entry.kind.label(), dotted_alias(&entry.name))?;
        writeln!(out, "'use strict';")?;
        writeln!(out, "const binding = require({});", quote(self.binding_module()))?;
        writeln!(out)?;
        writeln!(
            out,
            "module.exports = binding.{}({}, {{",
            entry.kind.label(),
            quote(&entry.name)
        )?;

        match &entry.kind {
            TypeKind::Class(shape) | TypeKind::Interface(shape) => {
                if let Some(sup) = &shape.super_type {
                    writeln!(out, "  superType: {},", quote(sup))?;
                }
                write_overloads(&mut out, "methods", &shape.methods)?;
                write_map(&mut out, "properties", &shape.properties)?;
            }
            TypeKind::Struct(shape) => write_map(&mut out, "fields", &shape.fields)?,
            TypeKind::Enum(shape) => {
                let values: Vec<String> = shape.values.iter().map(|v| quote(v)).collect();
                writeln!(out, "  values: [{}],", values.join(", "))?;
            }
            TypeKind::Module(shape) => write_overloads(&mut out, "functions", &shape.functions)?,
        }

        writeln!(out, "}});")?;
        Ok(out)
    }
}

fn write_map(
    out: &mut String,
    key: &str,
    map: &std::collections::BTreeMap<String, String>,
) -> std::fmt::Result {
    if map.is_empty() {
        return Ok(());
    }
    let body: Vec<String> = map
        .iter()
        .map(|(name, ty)| format!("{}: {}", quote(name), quote(ty)))
        .collect();
    writeln!(out, "  {key}: {{ {} }},", body.join(", "))
}

fn write_overloads(
    out: &mut String,
    key: &str,
    map: &std::collections::BTreeMap<String, Vec<MethodSignature>>,
) -> std::fmt::Result {
    if map.is_empty() {
        return Ok(());
    }
    let body: Vec<String> = map
        .iter()
        .map(|(name, overloads)| {
            let sigs: Vec<String> = overloads.iter().map(signature).collect();
            format!("{}: [{}]", quote(name), sigs.join(", "))
        })
        .collect();
    writeln!(out, "  {key}: {{ {} }},", body.join(", "))
}

/// `[returnType, ...args]`, with `null` for a missing return type.
fn signature(sig: &MethodSignature) -> String {
    let mut parts = vec![sig
        .return_type
        .as_deref()
        .map(quote)
        .unwrap_or_else(|| "null".to_string())];
    parts.extend(sig.args.iter().map(|a| quote(a)));
    format!("[{}]", parts.join(", "))
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
