//! Type descriptors stored in the metabase.
//!
//! Each native type is a closed tagged variant: only the fields meaningful
//! for its kind exist. Loosely-shaped JSON records are validated into these
//! types at ingestion time (see [`RawTypeEntry`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::MetabaseError;

/// Separator between an enclosing type and a nested type (`Outer$Inner`).
pub const NESTING_SEPARATOR: char = '$';

/// Returns the enclosing type of a nested type name, if it is one.
///
/// The enclosing name is everything before the first separator, so
/// `Map$Entry$Key` belongs to `Map`.
pub fn enclosing_type(name: &str) -> Option<&str> {
    name.split_once(NESTING_SEPARATOR).map(|(outer, _)| outer)
}

/// Returns the dotted spelling scripts use to import a type (`Map$Entry` → `Map.Entry`).
pub fn dotted_alias(name: &str) -> String {
    name.replace(NESTING_SEPARATOR, ".")
}

/// One overload of a method or module function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MethodSignature {
    /// Return type name; `None` for procedures without a result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    /// Argument type names in declaration order.
    #[serde(default)]
    pub args: Vec<String>,
}

impl MethodSignature {
    /// Creates a signature from a return type and argument types.
    pub fn new<I, S>(return_type: Option<&str>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            return_type: return_type.map(str::to_string),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    fn for_each_type<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        if let Some(ret) = &self.return_type {
            f(ret);
        }
        for arg in &self.args {
            f(arg);
        }
    }
}

/// Shape shared by classes and interfaces (protocols).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassShape {
    /// Name of the super type; a lookup key, not an owned reference.
    pub super_type: Option<String>,
    /// Method name to its overloads.
    pub methods: BTreeMap<String, Vec<MethodSignature>>,
    /// Property name to its type name.
    pub properties: BTreeMap<String, String>,
}

/// Shape of a plain struct: named, typed fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructShape {
    /// Field name to its type name.
    pub fields: BTreeMap<String, String>,
}

/// Shape of an enum: its constant names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumShape {
    /// Declared constants.
    pub values: Vec<String>,
}

/// Shape of a module: free functions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleShape {
    /// Function name to its overloads.
    pub functions: BTreeMap<String, Vec<MethodSignature>>,
}

/// The kind-specific part of a type descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// A concrete or abstract class.
    Class(ClassShape),
    /// An interface or protocol.
    Interface(ClassShape),
    /// A value struct.
    Struct(StructShape),
    /// An enumeration.
    Enum(EnumShape),
    /// A module of free functions.
    Module(ModuleShape),
}

impl TypeKind {
    /// Lowercase kind name as used in metabase JSON.
    pub fn label(&self) -> &'static str {
        match self {
            TypeKind::Class(_) => "class",
            TypeKind::Interface(_) => "interface",
            TypeKind::Struct(_) => "struct",
            TypeKind::Enum(_) => "enum",
            TypeKind::Module(_) => "module",
        }
    }
}

/// One native type known to the metabase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeEntry {
    /// Unique qualified name.
    pub name: String,
    /// Kind-specific descriptor.
    pub kind: TypeKind,
}

impl TypeEntry {
    /// Creates a class entry with no members.
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Class(ClassShape::default()),
        }
    }

    /// Creates an interface entry with no members.
    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Interface(ClassShape::default()),
        }
    }

    /// Sets the super type. Ignored for kinds without inheritance.
    pub fn with_super(mut self, super_type: impl Into<String>) -> Self {
        if let TypeKind::Class(shape) | TypeKind::Interface(shape) = &mut self.kind {
            shape.super_type = Some(super_type.into());
        }
        self
    }

    /// Adds a property (or struct field) of the given type.
    pub fn with_property(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        match &mut self.kind {
            TypeKind::Class(shape) | TypeKind::Interface(shape) => {
                shape.properties.insert(name.into(), ty.into());
            }
            TypeKind::Struct(shape) => {
                shape.fields.insert(name.into(), ty.into());
            }
            TypeKind::Enum(_) | TypeKind::Module(_) => {}
        }
        self
    }

    /// Adds a method (or module function) overload.
    pub fn with_method(mut self, name: impl Into<String>, signature: MethodSignature) -> Self {
        let overloads = match &mut self.kind {
            TypeKind::Class(shape) | TypeKind::Interface(shape) => &mut shape.methods,
            TypeKind::Module(shape) => &mut shape.functions,
            TypeKind::Struct(_) | TypeKind::Enum(_) => return self,
        };
        overloads.entry(name.into()).or_default().push(signature);
        self
    }

    /// Returns the super type name for classes and interfaces.
    pub fn super_type(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Class(shape) | TypeKind::Interface(shape) => shape.super_type.as_deref(),
            _ => None,
        }
    }

    /// Returns `true` if this is a nested type (`Outer$Inner`).
    pub fn is_nested(&self) -> bool {
        self.name.contains(NESTING_SEPARATOR)
    }

    /// Calls `f` with every type name this descriptor refers to: super type,
    /// method return and argument types, property and field types.
    ///
    /// Names may repeat and may not exist in the metabase (primitives).
    pub fn for_each_reference<'a>(&'a self, mut f: impl FnMut(&'a str)) {
        match &self.kind {
            TypeKind::Class(shape) | TypeKind::Interface(shape) => {
                if let Some(sup) = &shape.super_type {
                    f(sup);
                }
                for sig in shape.methods.values().flatten() {
                    sig.for_each_type(&mut f);
                }
                for ty in shape.properties.values() {
                    f(ty);
                }
            }
            TypeKind::Struct(shape) => {
                for ty in shape.fields.values() {
                    f(ty);
                }
            }
            TypeKind::Module(shape) => {
                for sig in shape.functions.values().flatten() {
                    sig.for_each_type(&mut f);
                }
            }
            TypeKind::Enum(_) => {}
        }
    }
}

/// Kind discriminant as it appears in metabase JSON.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RawKind {
    Class,
    #[serde(alias = "protocol")]
    Interface,
    Struct,
    Enum,
    Module,
}

impl RawKind {
    fn label(self) -> &'static str {
        match self {
            RawKind::Class => "class",
            RawKind::Interface => "interface",
            RawKind::Struct => "struct",
            RawKind::Enum => "enum",
            RawKind::Module => "module",
        }
    }
}

/// Loosely-shaped descriptor as written by the introspection step.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct RawTypeEntry {
    kind: RawKind,
    super_type: Option<String>,
    methods: Option<BTreeMap<String, Vec<MethodSignature>>>,
    properties: Option<BTreeMap<String, String>>,
    values: Option<Vec<String>>,
    functions: Option<BTreeMap<String, Vec<MethodSignature>>>,
}

impl RawTypeEntry {
    /// Validates the record against its kind and builds the closed variant.
    pub(crate) fn into_entry(self, name: String) -> Result<TypeEntry, MetabaseError> {
        let kind = self.kind;
        let reject = |present: bool, field: &'static str| -> Result<(), MetabaseError> {
            if present {
                Err(MetabaseError::KindMismatch {
                    name: name.clone(),
                    kind: kind.label(),
                    field,
                })
            } else {
                Ok(())
            }
        };

        let kind = match kind {
            RawKind::Class | RawKind::Interface => {
                reject(self.values.is_some(), "values")?;
                reject(self.functions.is_some(), "functions")?;
                let shape = ClassShape {
                    super_type: self.super_type,
                    methods: self.methods.unwrap_or_default(),
                    properties: self.properties.unwrap_or_default(),
                };
                if matches!(kind, RawKind::Class) {
                    TypeKind::Class(shape)
                } else {
                    TypeKind::Interface(shape)
                }
            }
            RawKind::Struct => {
                reject(self.super_type.is_some(), "superType")?;
                reject(self.methods.is_some(), "methods")?;
                reject(self.values.is_some(), "values")?;
                reject(self.functions.is_some(), "functions")?;
                TypeKind::Struct(StructShape {
                    fields: self.properties.unwrap_or_default(),
                })
            }
            RawKind::Enum => {
                reject(self.super_type.is_some(), "superType")?;
                reject(self.methods.is_some(), "methods")?;
                reject(self.properties.is_some(), "properties")?;
                reject(self.functions.is_some(), "functions")?;
                TypeKind::Enum(EnumShape {
                    values: self.values.unwrap_or_default(),
                })
            }
            RawKind::Module => {
                reject(self.super_type.is_some(), "superType")?;
                reject(self.methods.is_some(), "methods")?;
                reject(self.properties.is_some(), "properties")?;
                reject(self.values.is_some(), "values")?;
                TypeKind::Module(ModuleShape {
                    functions: self.functions.unwrap_or_default(),
                })
            }
        };

        Ok(TypeEntry { name, kind })
    }
}
