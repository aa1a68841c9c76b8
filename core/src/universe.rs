//! The type universe: one flat namespace of declared type names.
//!
//! Typedefs, enums, bitflags, callbacks, structs and objects share a single
//! namespace because references cross kinds by bare name. Each name maps to
//! a [`DeclRef`], the kind plus an index into that kind's arena in the
//! resolved model.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::primitive::Primitive;
use crate::report::{ValidationError, ValidationReport};

/// Kinds of declarations a `Type` string may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// Alias of a primitive.
    Typedef,
    /// Named integer values.
    Enum,
    /// Named bit masks.
    Bitflag,
    /// Function-pointer type.
    Callback,
    /// Aggregate data type.
    Struct,
    /// Opaque handle with methods.
    Object,
}

impl TypeKind {
    /// Returns the lowercase kind name, also used as the `kind.` reference prefix.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Typedef => "typedef",
            Self::Enum => "enum",
            Self::Bitflag => "bitflag",
            Self::Callback => "callback",
            Self::Struct => "struct",
            Self::Object => "object",
        }
    }

    /// Parses a `kind.` reference prefix.
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "typedef" => Some(Self::Typedef),
            "enum" => Some(Self::Enum),
            "bitflag" => Some(Self::Bitflag),
            "callback" => Some(Self::Callback),
            "struct" => Some(Self::Struct),
            "object" => Some(Self::Object),
            _ => None,
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scopes in which names must be unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NameKind {
    Constant,
    Typedef,
    Enum,
    Bitflag,
    Callback,
    Struct,
    Function,
    Object,
    EnumEntry,
    BitflagEntry,
    Member,
    Argument,
    Method,
    Extends,
}

impl NameKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Constant => "constant",
            Self::Typedef => "typedef",
            Self::Enum => "enum",
            Self::Bitflag => "bitflag",
            Self::Callback => "callback",
            Self::Struct => "struct",
            Self::Function => "function",
            Self::Object => "object",
            Self::EnumEntry => "enum entry",
            Self::BitflagEntry => "bitflag entry",
            Self::Member => "struct member",
            Self::Argument => "argument",
            Self::Method => "method",
            Self::Extends => "extends entry",
        }
    }
}

impl From<TypeKind> for NameKind {
    fn from(kind: TypeKind) -> Self {
        match kind {
            TypeKind::Typedef => Self::Typedef,
            TypeKind::Enum => Self::Enum,
            TypeKind::Bitflag => Self::Bitflag,
            TypeKind::Callback => Self::Callback,
            TypeKind::Struct => Self::Struct,
            TypeKind::Object => Self::Object,
        }
    }
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind plus arena index of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DeclRef {
    pub kind: TypeKind,
    pub index: usize,
}

/// Name → declaration table for every referencable type.
///
/// # Examples
///
/// ```
/// use idl_schema_core::*;
///
/// let mut schema = Schema::new("demo");
/// schema.structs.push(Struct::new("Limits", StructType::Standalone));
/// schema.objects.push(Object::new("Device"));
///
/// let model = resolve_schema(&schema).unwrap();
/// let universe = model.universe();
/// assert_eq!(universe.len(), 2);
/// assert_eq!(universe.get("Device").map(|d| d.kind), Some(TypeKind::Object));
/// assert!(universe.get("uint32").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeUniverse {
    names: BTreeMap<String, DeclRef>,
}

impl TypeUniverse {
    /// Registers a declaration, keeping the first on conflict.
    ///
    /// Returns `false` (after recording the conflict) when the name is
    /// already taken or shadows a primitive.
    pub(crate) fn register(
        &mut self,
        name: &str,
        decl: DeclRef,
        report: &mut ValidationReport,
    ) -> bool {
        if Primitive::parse(name).is_some() {
            report.error(ValidationError::ShadowsPrimitive {
                kind: decl.kind.into(),
                name: name.to_string(),
            });
            return false;
        }

        if let Some(existing) = self.names.get(name) {
            let error = if existing.kind == decl.kind {
                ValidationError::DuplicateName {
                    kind: decl.kind.into(),
                    name: name.to_string(),
                }
            } else {
                ValidationError::NameCollision {
                    name: name.to_string(),
                    first: existing.kind,
                    second: decl.kind,
                }
            };
            report.error(error);
            return false;
        }

        self.names.insert(name.to_string(), decl);
        true
    }

    /// Looks up a bare declared name.
    pub fn get(&self, name: &str) -> Option<DeclRef> {
        self.names.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterates names in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, DeclRef)> {
        self.names.iter().map(|(name, decl)| (name.as_str(), *decl))
    }
}

/// Records a [`ValidationError::DuplicateName`] for every repeated name.
///
/// Names are reported as `scope.name` when a scope is given.
pub(crate) fn check_unique<'a>(
    kind: NameKind,
    scope: Option<&str>,
    names: impl IntoIterator<Item = &'a str>,
    report: &mut ValidationReport,
) {
    let mut seen: HashSet<&str> = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            let name = match scope {
                Some(scope) => format!("{scope}.{name}"),
                None => name.to_string(),
            };
            report.error(ValidationError::DuplicateName { kind, name });
        }
    }
}
