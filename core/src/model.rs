//! The resolved model handed to code generators.
//!
//! Produced once by [`Resolver`](crate::Resolver) and read-only afterwards.
//! Declarations live in per-kind arenas; the [`TypeUniverse`] maps names to
//! arena indices, and the chain graph stores struct indices.
//!
//! # Example
//!
//! ```
//! use idl_schema_core::*;
//!
//! let mut schema = Schema::new("demo");
//! schema.constants.push(Constant::with_value("whole_size", Value64::Symbol(ValueSymbol::Uint64Max)));
//! schema.structs.push(Struct::new("Limits", StructType::BaseOut)
//!     .with_member(ParameterType::new("max_size", "uint32")));
//! schema.structs.push(Struct::new("NativeLimits", StructType::ExtensionOut)
//!     .with_extends("Limits"));
//!
//! let model = resolve_schema(&schema).unwrap();
//! assert!(matches!(model.lookup("Limits"), Some(Declaration::Struct(_))));
//! assert_eq!(model.resolved_members("Limits").unwrap().len(), 1);
//! assert_eq!(model.chainable_extensions("Limits"), vec!["NativeLimits"]);
//! assert_eq!(model.constant_value("whole_size"), Some(u64::MAX));
//! ```

use serde::Serialize;

use crate::bitflag::{ResolvedBitflag, ResolvedBitflagEntry};
use crate::chain::ChainGraph;
use crate::enums::{ResolvedEnum, ResolvedEnumEntry};
use crate::primitive::Primitive;
use crate::reference::{ClassifiedReference, TypeRef, classify};
use crate::types::{Callback, Function, Object, ParameterType, Struct, Typedef, Value64};
use crate::universe::{DeclRef, TypeKind, TypeUniverse};

/// A constant with its value resolved for the target pointer width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConstant {
    pub name: String,
    pub doc: String,
    /// The value as written.
    pub value: Value64,
    /// `None` when the written value is invalid.
    pub resolved: Option<u64>,
}

/// What a name resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declaration<'a> {
    Primitive(Primitive),
    Typedef(&'a Typedef),
    Enum(&'a ResolvedEnum),
    Bitflag(&'a ResolvedBitflag),
    Callback(&'a Callback),
    Struct(&'a Struct),
    Object(&'a Object),
}

impl Declaration<'_> {
    /// Declared kind, `None` for primitives.
    pub const fn kind(&self) -> Option<TypeKind> {
        match self {
            Self::Primitive(_) => None,
            Self::Typedef(_) => Some(TypeKind::Typedef),
            Self::Enum(_) => Some(TypeKind::Enum),
            Self::Bitflag(_) => Some(TypeKind::Bitflag),
            Self::Callback(_) => Some(TypeKind::Callback),
            Self::Struct(_) => Some(TypeKind::Struct),
            Self::Object(_) => Some(TypeKind::Object),
        }
    }
}

/// Merged contents of an enum, bitflag or object, in merge order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergedEntries<'a> {
    /// Enum slots, gaps included.
    Enum(&'a [ResolvedEnumEntry]),
    Bitflag(&'a [ResolvedBitflagEntry]),
    /// Object methods.
    Object(&'a [Function]),
}

impl<'a> MergedEntries<'a> {
    /// Names in merge order; enum gaps are skipped.
    pub fn names(&self) -> Vec<&'a str> {
        match *self {
            Self::Enum(entries) => entries.iter().filter_map(|e| e.name.as_deref()).collect(),
            Self::Bitflag(entries) => entries.iter().map(|e| e.name.as_str()).collect(),
            Self::Object(methods) => methods.iter().map(|m| m.name.as_str()).collect(),
        }
    }

    /// Number of slots, enum gaps included.
    pub fn len(&self) -> usize {
        match self {
            Self::Enum(entries) => entries.len(),
            Self::Bitflag(entries) => entries.len(),
            Self::Object(methods) => methods.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The resolved schema: universe, merged records, references and chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedModel {
    pub(crate) name: String,
    pub(crate) copyright: String,
    pub(crate) universe: TypeUniverse,
    pub(crate) constants: Vec<ResolvedConstant>,
    pub(crate) typedefs: Vec<Typedef>,
    pub(crate) enums: Vec<ResolvedEnum>,
    pub(crate) bitflags: Vec<ResolvedBitflag>,
    pub(crate) callbacks: Vec<Callback>,
    pub(crate) structs: Vec<Struct>,
    pub(crate) functions: Vec<Function>,
    pub(crate) objects: Vec<Object>,
    pub(crate) references: Vec<ClassifiedReference>,
    pub(crate) chains: ChainGraph,
    #[serde(skip)]
    pub(crate) allow_qualified_references: bool,
}

impl ResolvedModel {
    /// Name of the first fragment.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn copyright(&self) -> &str {
        &self.copyright
    }

    pub fn universe(&self) -> &TypeUniverse {
        &self.universe
    }

    /// Resolves a bare type name (or primitive literal) to its declaration.
    pub fn lookup(&self, name: &str) -> Option<Declaration<'_>> {
        if let Some(primitive) = Primitive::parse(name) {
            return Some(Declaration::Primitive(primitive));
        }
        self.universe.get(name).and_then(|decl| self.declaration(decl))
    }

    /// Resolves a [`DeclRef`] into its arena record.
    pub fn declaration(&self, decl: DeclRef) -> Option<Declaration<'_>> {
        let index = decl.index;
        match decl.kind {
            TypeKind::Typedef => self.typedefs.get(index).map(Declaration::Typedef),
            TypeKind::Enum => self.enums.get(index).map(Declaration::Enum),
            TypeKind::Bitflag => self.bitflags.get(index).map(Declaration::Bitflag),
            TypeKind::Callback => self.callbacks.get(index).map(Declaration::Callback),
            TypeKind::Struct => self.structs.get(index).map(Declaration::Struct),
            TypeKind::Object => self.objects.get(index).map(Declaration::Object),
        }
    }

    /// Classifies a type string the way member and argument types were.
    pub fn classify(&self, ty: &str) -> Option<TypeRef> {
        classify(&self.universe, ty, self.allow_qualified_references)
    }

    /// Members of a struct in declaration order.
    ///
    /// Chains are never flattened: an extension's members are its own.
    pub fn resolved_members(&self, struct_name: &str) -> Option<&[ParameterType]> {
        self.struct_index(struct_name)
            .map(|index| self.structs[index].members.as_slice())
    }

    /// Resolved mask of a bitflag entry.
    pub fn resolved_value(&self, bitflag: &str, entry: &str) -> Option<u64> {
        self.bitflag(bitflag).and_then(|b| b.value_of(entry))
    }

    /// Merged entries or methods of an enum, bitflag or object.
    pub fn merged_entries(&self, name: &str) -> Option<MergedEntries<'_>> {
        match self.lookup(name)? {
            Declaration::Enum(record) => Some(MergedEntries::Enum(&record.entries)),
            Declaration::Bitflag(record) => Some(MergedEntries::Bitflag(&record.entries)),
            Declaration::Object(record) => Some(MergedEntries::Object(&record.methods)),
            _ => None,
        }
    }

    /// Resolved value of a constant.
    pub fn constant_value(&self, name: &str) -> Option<u64> {
        self.constants
            .iter()
            .find(|c| c.name == name)
            .and_then(|c| c.resolved)
    }

    /// Value of an enum entry within its prefix block.
    pub fn resolved_enum_value(&self, enum_name: &str, entry: &str) -> Option<u16> {
        self.enum_entry(enum_name, entry).and_then(|e| e.value)
    }

    /// `(prefix << 16) | value` of an enum entry.
    pub fn qualified_enum_value(&self, enum_name: &str, entry: &str) -> Option<u32> {
        self.enum_entry(enum_name, entry)
            .and_then(|e| e.qualified_value)
    }

    /// Bases an extension struct may attach to.
    pub fn legal_bases(&self, extension: &str) -> Vec<&str> {
        self.struct_index(extension)
            .map(|index| self.struct_names(self.chains.bases_of(index)))
            .unwrap_or_default()
    }

    /// Extensions that may attach to a base struct.
    pub fn chainable_extensions(&self, base: &str) -> Vec<&str> {
        self.struct_index(base)
            .map(|index| self.struct_names(self.chains.extensions_of(index)))
            .unwrap_or_default()
    }

    /// Every classified reference, in document order.
    pub fn references(&self) -> &[ClassifiedReference] {
        &self.references
    }

    pub fn chains(&self) -> &ChainGraph {
        &self.chains
    }

    pub fn constants(&self) -> impl Iterator<Item = &ResolvedConstant> {
        self.constants.iter()
    }

    pub fn typedefs(&self) -> impl Iterator<Item = &Typedef> {
        self.typedefs.iter()
    }

    pub fn enums(&self) -> impl Iterator<Item = &ResolvedEnum> {
        self.enums.iter()
    }

    pub fn bitflags(&self) -> impl Iterator<Item = &ResolvedBitflag> {
        self.bitflags.iter()
    }

    pub fn callbacks(&self) -> impl Iterator<Item = &Callback> {
        self.callbacks.iter()
    }

    pub fn structs(&self) -> impl Iterator<Item = &Struct> {
        self.structs.iter()
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter()
    }

    /// Objects with extension methods merged in.
    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.iter()
    }

    /// Serializes the model as pretty-printed JSON.
    ///
    /// The output is stable for a given input, which makes it usable for
    /// snapshotting generator input.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; the model itself always serializes.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    fn bitflag(&self, name: &str) -> Option<&ResolvedBitflag> {
        match self.lookup(name)? {
            Declaration::Bitflag(record) => Some(record),
            _ => None,
        }
    }

    fn enum_entry(&self, enum_name: &str, entry: &str) -> Option<&ResolvedEnumEntry> {
        match self.lookup(enum_name)? {
            Declaration::Enum(record) => record.entry(entry),
            _ => None,
        }
    }

    fn struct_index(&self, name: &str) -> Option<usize> {
        self.universe
            .get(name)
            .filter(|decl| decl.kind == TypeKind::Struct)
            .map(|decl| decl.index)
    }

    fn struct_names(&self, indices: &[usize]) -> Vec<&str> {
        indices
            .iter()
            .map(|&index| self.structs[index].name.as_str())
            .collect()
    }
}
