//! Validation diagnostics and the aggregated report.
//!
//! Every resolver stage records problems here instead of returning early,
//! so one run surfaces the full set of inconsistencies in a document.
//!
//! # Examples
//!
//! ```
//! use idl_schema_core::*;
//!
//! let mut schema = Schema::new("demo");
//! schema.structs.push(
//!     Struct::new("Desc", StructType::Standalone)
//!         .with_member(ParameterType::new("device", "Device")),
//! );
//!
//! let report = validate_schema(&schema);
//! assert_eq!(report.error_count(), 1);
//! let record = &report.records()[0];
//! assert_eq!(record.kind, ErrorKind::UnknownTypeReference);
//! assert_eq!(record.names, vec!["Device", "struct Desc member device"]);
//! ```

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::types::StructType;
use crate::universe::{NameKind, TypeKind};

/// Taxonomy of validation problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ErrorKind {
    /// A name is declared twice, across kinds, or shadows a primitive.
    DuplicateName,
    /// A `Type` string resolves to nothing.
    UnknownTypeReference,
    /// A reference resolves to a declaration of the wrong kind.
    TypeKindMismatch,
    /// A qualifier is set on a plain scalar.
    MisplacedQualifier,
    /// A typedef aliases something other than a primitive.
    InvalidTypedef,
    /// An extension attaches to an incompatible base.
    IncompatibleChainDirection,
    /// `extends` names something that is not a struct.
    UnknownBaseStruct,
    /// `extends` is missing on an extension or present on anything else.
    MisplacedExtends,
    /// Bitflag combinations form a cycle.
    CyclicBitflagCombination,
    /// Two bitflag entries resolve to the same mask.
    DuplicateBitflagValue,
    /// A combination names a non-sibling.
    UnknownCombinationEntry,
    /// A bitflag entry without exactly one usable value source.
    MalformedBitflagEntry,
    /// Two enum slots resolve to the same value.
    DuplicateEnumValue,
    /// A numeric value is negative or out of range.
    InvalidValue,
    /// A fragment's `enum_prefix` is unparsable.
    InvalidEnumPrefix,
    /// Extended declarations out of order or without a base.
    MergeOrder,
}

/// Why an extended declaration could not be merged cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeProblem {
    /// No base declaration of the name exists at all.
    MissingBase,
    /// The base exists but is declared after this extension.
    ExtendedBeforeBase,
    /// A second non-extended declaration of the name.
    DuplicateBase,
}

impl fmt::Display for MergeProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MissingBase => "is extended but never declared as a base",
            Self::ExtendedBeforeBase => "is extended before its base declaration",
            Self::DuplicateBase => "has more than one base declaration",
        })
    }
}

/// A single schema-consistency violation.
///
/// The `Display` impl is the human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum ValidationError {
    /// Two declarations of the same kind share a name.
    #[error("duplicate {kind} name: {name}")]
    DuplicateName { kind: NameKind, name: String },
    /// One name is declared in two different type kinds.
    #[error("name '{name}' is declared both as {first} and as {second}")]
    NameCollision {
        name: String,
        first: TypeKind,
        second: TypeKind,
    },
    /// A declaration reuses a primitive literal as its name.
    #[error("{kind} '{name}' shadows the primitive type of the same name")]
    ShadowsPrimitive { kind: NameKind, name: String },
    /// A `Type` string resolves to nothing.
    #[error("unknown type '{name}' referenced from {referenced_from}")]
    UnknownTypeReference {
        name: String,
        referenced_from: String,
    },
    /// A reference resolved to a declaration of the wrong kind.
    #[error("'{name}' referenced from {referenced_from} is {found}, expected {expected}")]
    TypeKindMismatch {
        name: String,
        referenced_from: String,
        expected: TypeKind,
        found: TypeKind,
    },
    /// `ownership`/`pointer` set on a plain scalar.
    #[error("{qualifier} is not meaningful on scalar type '{type_name}' at {referenced_from}")]
    MisplacedQualifier {
        referenced_from: String,
        type_name: String,
        qualifier: String,
    },
    /// A typedef aliases something other than a primitive.
    #[error("typedef '{name}' must alias a primitive type, found '{target}'")]
    InvalidTypedef { name: String, target: String },
    /// An extension attaches to a base of an incompatible direction.
    #[error(
        "struct '{extension}' ({extension_type}) cannot extend '{base}' ({base_type})"
    )]
    IncompatibleChainDirection {
        extension: String,
        extension_type: StructType,
        base: String,
        base_type: StructType,
    },
    /// `extends` names something that is not a declared struct.
    #[error("struct '{extension}' extends unknown struct '{base}'")]
    UnknownBaseStruct { extension: String, base: String },
    /// An extension struct without any base.
    #[error("extension struct '{name}' ({struct_type}) must name at least one base in `extends`")]
    MissingExtends { name: String, struct_type: StructType },
    /// A non-extension struct with a non-empty `extends`.
    #[error("struct '{name}' ({struct_type}) cannot declare `extends`")]
    UnexpectedExtends { name: String, struct_type: StructType },
    /// Bitflag combinations form a cycle.
    #[error("bitflag '{bitflag}' has a cyclic value_combination: {}", .cycle_path.join(" -> "))]
    CyclicBitflagCombination {
        bitflag: String,
        cycle_path: Vec<String>,
    },
    /// Two bitflag entries resolve to the same mask.
    #[error("bitflag '{bitflag}' entries '{first}' and '{second}' both resolve to {value:#x}")]
    DuplicateBitflagValue {
        bitflag: String,
        first: String,
        second: String,
        value: u64,
    },
    /// A combination names something that is not a sibling entry.
    #[error("bitflag '{bitflag}' entry '{entry}' combines unknown entry '{missing}'")]
    UnknownCombinationEntry {
        bitflag: String,
        entry: String,
        missing: String,
    },
    /// A bitflag entry with neither or both of `value` and `value_combination`,
    /// or with an empty combination.
    #[error("bitflag '{bitflag}' entry '{entry}' must set exactly one of value or value_combination")]
    MalformedBitflagEntry { bitflag: String, entry: String },
    /// Two slots of one enum resolve to the same value.
    #[error("enum '{name}' entries '{first}' and '{second}' both resolve to {value:#010x}")]
    DuplicateEnumValue {
        name: String,
        first: String,
        second: String,
        value: u32,
    },
    /// A numeric value is negative or out of range.
    #[error("invalid value {value} for {owner}: {reason}")]
    InvalidValue {
        owner: String,
        value: String,
        reason: String,
    },
    /// A fragment's `enum_prefix` is not a 16-bit hexadecimal number.
    #[error("schema '{schema}' has invalid enum_prefix '{prefix}'")]
    InvalidEnumPrefix { schema: String, prefix: String },
    /// Extended declarations out of order or without a base.
    #[error("{kind} '{name}' {problem}")]
    MergeOrder {
        kind: TypeKind,
        name: String,
        problem: MergeProblem,
    },
}

impl ValidationError {
    /// Returns the taxonomy kind of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateName { .. }
            | Self::NameCollision { .. }
            | Self::ShadowsPrimitive { .. } => ErrorKind::DuplicateName,
            Self::UnknownTypeReference { .. } => ErrorKind::UnknownTypeReference,
            Self::TypeKindMismatch { .. } => ErrorKind::TypeKindMismatch,
            Self::MisplacedQualifier { .. } => ErrorKind::MisplacedQualifier,
            Self::InvalidTypedef { .. } => ErrorKind::InvalidTypedef,
            Self::IncompatibleChainDirection { .. } => ErrorKind::IncompatibleChainDirection,
            Self::UnknownBaseStruct { .. } => ErrorKind::UnknownBaseStruct,
            Self::MissingExtends { .. } | Self::UnexpectedExtends { .. } => {
                ErrorKind::MisplacedExtends
            }
            Self::CyclicBitflagCombination { .. } => ErrorKind::CyclicBitflagCombination,
            Self::DuplicateBitflagValue { .. } => ErrorKind::DuplicateBitflagValue,
            Self::UnknownCombinationEntry { .. } => ErrorKind::UnknownCombinationEntry,
            Self::MalformedBitflagEntry { .. } => ErrorKind::MalformedBitflagEntry,
            Self::DuplicateEnumValue { .. } => ErrorKind::DuplicateEnumValue,
            Self::InvalidValue { .. } => ErrorKind::InvalidValue,
            Self::InvalidEnumPrefix { .. } => ErrorKind::InvalidEnumPrefix,
            Self::MergeOrder { .. } => ErrorKind::MergeOrder,
        }
    }

    /// Returns the offending names, most specific first.
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::DuplicateName { name, .. }
            | Self::NameCollision { name, .. }
            | Self::ShadowsPrimitive { name, .. }
            | Self::MissingExtends { name, .. }
            | Self::UnexpectedExtends { name, .. }
            | Self::MergeOrder { name, .. } => vec![name],
            Self::UnknownTypeReference {
                name,
                referenced_from,
            }
            | Self::TypeKindMismatch {
                name,
                referenced_from,
                ..
            } => vec![name, referenced_from],
            Self::MisplacedQualifier {
                referenced_from,
                type_name,
                ..
            } => vec![referenced_from, type_name],
            Self::InvalidTypedef { name, target } => vec![name, target],
            Self::IncompatibleChainDirection {
                extension, base, ..
            }
            | Self::UnknownBaseStruct { extension, base } => vec![extension, base],
            Self::CyclicBitflagCombination {
                bitflag,
                cycle_path,
            } => std::iter::once(bitflag.as_str())
                .chain(cycle_path.iter().map(String::as_str))
                .collect(),
            Self::DuplicateBitflagValue {
                bitflag,
                first,
                second,
                ..
            } => vec![bitflag, first, second],
            Self::UnknownCombinationEntry {
                bitflag,
                entry,
                missing,
            } => vec![bitflag, entry, missing],
            Self::MalformedBitflagEntry { bitflag, entry } => vec![bitflag, entry],
            Self::DuplicateEnumValue {
                name,
                first,
                second,
                ..
            } => vec![name, first, second],
            Self::InvalidValue { owner, .. } => vec![owner],
            Self::InvalidEnumPrefix { schema, .. } => vec![schema],
        }
    }
}

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// A [`ValidationError`] with its severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub error: ValidationError,
}

/// Flat record form of a diagnostic: kind, offending names, message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub names: Vec<String>,
    pub message: String,
}

/// Ordered collection of diagnostics from one resolution run.
///
/// Order is deterministic: stage order, then document order within a stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Error)]
#[error("schema validation failed with {} error(s)", count_errors(.diagnostics))]
pub struct ValidationReport {
    diagnostics: Vec<Diagnostic>,
}

fn count_errors(diagnostics: &[Diagnostic]) -> usize {
    diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count()
}

impl ValidationReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error.
    pub fn error(&mut self, error: ValidationError) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            error,
        });
    }

    /// Records a warning.
    pub fn warning(&mut self, error: ValidationError) {
        tracing::warn!(kind = ?error.kind(), message = %error, "Schema warning");
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            error,
        });
    }

    /// Returns `true` when nothing at all was recorded.
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Returns `true` when at least one error-severity diagnostic exists.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn error_count(&self) -> usize {
        count_errors(&self.diagnostics)
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.len() - self.error_count()
    }

    /// Iterates over all diagnostics in report order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Iterates over error-severity problems.
    pub fn errors(&self) -> impl Iterator<Item = &ValidationError> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| &d.error)
    }

    /// Iterates over warning-severity problems.
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationError> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .map(|d| &d.error)
    }

    /// Kinds of all diagnostics, in report order.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        self.diagnostics.iter().map(|d| d.error.kind()).collect()
    }

    /// Flattens diagnostics into records.
    pub fn records(&self) -> Vec<ErrorRecord> {
        self.diagnostics
            .iter()
            .map(|d| ErrorRecord {
                kind: d.error.kind(),
                severity: d.severity,
                names: d.error.names().into_iter().map(String::from).collect(),
                message: d.error.to_string(),
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a ValidationReport {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.iter()
    }
}
