//! Resolution and validation of native API interface-definition schemas.
//!
//! A schema describes a C-style API surface: constants, typedefs, enums,
//! bitflags, callbacks, structs, free functions and objects. Before a code
//! generator can emit bindings from it, every name has to resolve and the
//! document has to be internally consistent. This crate does that work:
//!
//! - [`Schema`]: the raw document as a loader produces it (any serde
//!   format).
//! - [`TypeUniverse`]: the flat namespace of declared type names.
//! - [`Resolver`]: runs all checks over one or more schema fragments and
//!   produces a [`Resolution`].
//! - [`ResolvedModel`]: merged declarations, classified references,
//!   the struct attachment graph and resolved enum and bitflag values.
//! - [`ValidationReport`]: every problem found, never just the first.
//!
//! Merging of `extended` declarations, bitflag combination values and
//! struct chain compatibility are handled as part of resolution.
//!
//! # Example
//!
//! ```
//! use idl_schema_core::*;
//!
//! let mut schema = Schema::new("gpu");
//! schema.bitflags.push(
//!     Bitflag::new("BufferUsage")
//!         .with_value("map_read", 0x1)
//!         .with_value("map_write", 0x2)
//!         .with_combination("map_read_write", &["map_read", "map_write"]),
//! );
//! schema.structs.push(
//!     Struct::new("BufferDescriptor", StructType::BaseIn)
//!         .with_member(ParameterType::new("usage", "BufferUsage"))
//!         .with_member(ParameterType::new("size", "uint64")),
//! );
//! schema.objects.push(
//!     Object::new("Device").with_method(
//!         Function::new("create_buffer")
//!             .with_arg(ParameterType::new("descriptor", "BufferDescriptor")
//!                 .with_pointer(Pointer::Immutable))
//!             .returning("Buffer"),
//!     ),
//! );
//! schema.objects.push(Object::new("Buffer"));
//!
//! let model = resolve_schema(&schema).unwrap();
//! assert_eq!(model.resolved_value("BufferUsage", "map_read_write"), Some(0x3));
//! assert_eq!(model.merged_entries("Device").unwrap().names(), vec!["create_buffer"]);
//! assert!(matches!(model.lookup("Buffer"), Some(Declaration::Object(_))));
//! ```

mod bitflag;
mod chain;
mod config;
mod enums;
mod error;
mod merge;
mod model;
mod primitive;
mod reference;
mod report;
mod types;
mod universe;
mod validate;

pub use bitflag::{ResolvedBitflag, ResolvedBitflagEntry};
pub use chain::{ChainGraph, ChainRole, Direction};
pub use config::{AliasPolicy, ResolverConfig};
pub use enums::{ResolvedEnum, ResolvedEnumEntry, parse_enum_prefix};
pub use error::ConfigError;
pub use model::{Declaration, MergedEntries, ResolvedConstant, ResolvedModel};
pub use primitive::Primitive;
pub use reference::{ClassifiedReference, TypeRef};
pub use report::{
    Diagnostic, ErrorKind, ErrorRecord, MergeProblem, Severity, ValidationError, ValidationReport,
};
pub use types::*;
pub use universe::{DeclRef, NameKind, TypeKind, TypeUniverse};
pub use validate::{Resolution, Resolver, resolve_schema, validate_schema};
