//! Schema type definitions for native API surfaces.
//!
//! This module defines the raw data model of a schema document as the
//! external loader materialises it: constants, typedefs, enums, bitflags,
//! callbacks, structs, free functions and objects. Every `Type` field is a
//! loosely-typed string at this stage; the resolver classifies them later.
//!
//! The types derive [`serde`] traits using the document's own field
//! spelling, so any serde format can produce a [`Schema`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel symbols accepted wherever a 64-bit value is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSymbol {
    /// Largest value of the target's `usize`.
    UsizeMax,
    /// `u32::MAX`.
    Uint32Max,
    /// `u64::MAX`.
    Uint64Max,
}

impl ValueSymbol {
    /// Returns the symbol as spelled in schema documents.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UsizeMax => "usize_max",
            Self::Uint32Max => "uint32_max",
            Self::Uint64Max => "uint64_max",
        }
    }
}

/// A 64-bit value: an integer literal or a [`ValueSymbol`].
///
/// Negative literals deserialize into [`Value64::Signed`] so the validator
/// can report them instead of the loader rejecting the whole document.
///
/// # Examples
///
/// ```
/// use idl_schema_core::{Value64, ValueSymbol};
///
/// let v: Value64 = serde_json::from_str("\"uint32_max\"").unwrap();
/// assert_eq!(v, Value64::Symbol(ValueSymbol::Uint32Max));
/// assert_eq!(v.resolve(64), Ok(u64::from(u32::MAX)));
///
/// let negative: Value64 = serde_json::from_str("-4").unwrap();
/// assert_eq!(negative.resolve(64), Err(-4));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value64 {
    /// Non-negative integer literal.
    Unsigned(u64),
    /// Negative integer literal (always invalid once resolved).
    Signed(i64),
    /// Symbolic maximum.
    Symbol(ValueSymbol),
}

impl Value64 {
    /// Resolves the value for a target with the given pointer width.
    ///
    /// Returns the offending literal when it is negative.
    pub fn resolve(self, pointer_width: u32) -> Result<u64, i64> {
        match self {
            Self::Unsigned(value) => Ok(value),
            Self::Signed(value) => u64::try_from(value).map_err(|_| value),
            Self::Symbol(ValueSymbol::Uint32Max) => Ok(u64::from(u32::MAX)),
            Self::Symbol(ValueSymbol::Uint64Max) => Ok(u64::MAX),
            Self::Symbol(ValueSymbol::UsizeMax) => Ok(if pointer_width >= 64 {
                u64::MAX
            } else {
                (1u64 << pointer_width) - 1
            }),
        }
    }
}

impl From<u64> for Value64 {
    fn from(value: u64) -> Self {
        Self::Unsigned(value)
    }
}

impl fmt::Display for Value64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsigned(value) => write!(f, "{value}"),
            Self::Signed(value) => write!(f, "{value}"),
            Self::Symbol(symbol) => f.write_str(symbol.as_str()),
        }
    }
}

/// How a callback is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CallbackStyle {
    /// Invoked asynchronously through a registered handle.
    #[default]
    CallbackMode,
    /// Invoked synchronously within the triggering call.
    Immediate,
}

/// Ownership transfer of a reference-typed parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ownership {
    /// The receiver takes ownership of the referenced resource.
    With,
    /// Borrowed; the caller keeps ownership.
    Without,
}

/// Pointer mutability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pointer {
    /// Read-only pointee (`const T*`).
    Immutable,
    /// Writable pointee (`T*`).
    Mutable,
}

/// Chaining role of a struct.
///
/// `base_*` structs root a chain, `extension_*` structs attach to a
/// compatible base, `standalone` structs never chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StructType {
    /// Chain root passed into the API.
    BaseIn,
    /// Chain root filled in by the API.
    BaseOut,
    /// Chain root used in both directions.
    BaseInOrOut,
    /// Attaches to `base_in` or `base_in_or_out` roots.
    ExtensionIn,
    /// Attaches to `base_out` or `base_in_or_out` roots.
    ExtensionOut,
    /// Attaches to any base.
    ExtensionInOrOut,
    /// Never part of a chain.
    #[default]
    Standalone,
}

impl StructType {
    /// Returns the tag as spelled in schema documents.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BaseIn => "base_in",
            Self::BaseOut => "base_out",
            Self::BaseInOrOut => "base_in_or_out",
            Self::ExtensionIn => "extension_in",
            Self::ExtensionOut => "extension_out",
            Self::ExtensionInOrOut => "extension_in_or_out",
            Self::Standalone => "standalone",
        }
    }
}

impl fmt::Display for StructType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named scalar value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constant {
    pub name: String,
    pub value: Value64,
    #[serde(default)]
    pub doc: String,
}

impl Constant {
    /// Creates a constant with a literal value.
    pub fn new(name: &str, value: u64) -> Self {
        Self::with_value(name, Value64::Unsigned(value))
    }

    /// Creates a constant from any [`Value64`].
    pub fn with_value(name: &str, value: Value64) -> Self {
        Self {
            name: name.to_string(),
            value,
            doc: String::new(),
        }
    }
}

/// An alias for a primitive type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Typedef {
    pub name: String,
    #[serde(default)]
    pub doc: String,
    /// Aliased type; must be a primitive literal.
    #[serde(rename = "type")]
    pub ty: String,
}

impl Typedef {
    /// Creates a typedef aliasing `ty`.
    pub fn new(name: &str, ty: &str) -> Self {
        Self {
            name: name.to_string(),
            doc: String::new(),
            ty: ty.to_string(),
        }
    }
}

/// One named enum value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumEntry {
    pub name: String,
    #[serde(default)]
    pub doc: String,
    /// Explicit 16-bit value; sequentially assigned when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
}

/// A set of named integer values.
///
/// `null` entries reserve a numeric slot without naming it.
///
/// # Examples
///
/// ```
/// use idl_schema_core::Enum;
///
/// let status = Enum::new("Status").with_entry("ok").with_gap().with_entry("retry");
/// assert_eq!(status.entries.len(), 3);
/// assert!(status.entries[1].is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enum {
    pub name: String,
    #[serde(default)]
    pub doc: String,
    /// Appends to a previously declared base of the same name.
    #[serde(default)]
    pub extended: bool,
    #[serde(default)]
    pub entries: Vec<Option<EnumEntry>>,
}

impl Enum {
    /// Creates an empty base enum.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            doc: String::new(),
            extended: false,
            entries: Vec::new(),
        }
    }

    /// Marks this declaration as extending a base of the same name.
    pub fn extended(mut self) -> Self {
        self.extended = true;
        self
    }

    /// Appends an auto-numbered entry.
    pub fn with_entry(mut self, name: &str) -> Self {
        self.entries.push(Some(EnumEntry {
            name: name.to_string(),
            doc: String::new(),
            value: None,
        }));
        self
    }

    /// Appends an entry with an explicit value.
    pub fn with_valued_entry(mut self, name: &str, value: i64) -> Self {
        self.entries.push(Some(EnumEntry {
            name: name.to_string(),
            doc: String::new(),
            value: Some(value),
        }));
        self
    }

    /// Appends a reserved gap.
    pub fn with_gap(mut self) -> Self {
        self.entries.push(None);
        self
    }
}

/// One bit or composite mask of a [`Bitflag`].
///
/// Exactly one of `value` and `value_combination` must be set, and a
/// combination must name at least one sibling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitflagEntry {
    pub name: String,
    #[serde(default)]
    pub doc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value64>,
    /// Sibling entries whose masks are OR-ed together.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_combination: Option<Vec<String>>,
}

/// A named set of bit masks.
///
/// # Examples
///
/// ```
/// use idl_schema_core::Bitflag;
///
/// let usage = Bitflag::new("Usage")
///     .with_value("read", 1)
///     .with_value("write", 2)
///     .with_combination("read_write", &["read", "write"]);
/// assert_eq!(usage.entries.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bitflag {
    pub name: String,
    #[serde(default)]
    pub doc: String,
    #[serde(default)]
    pub extended: bool,
    #[serde(default)]
    pub entries: Vec<BitflagEntry>,
}

impl Bitflag {
    /// Creates an empty base bitflag.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            doc: String::new(),
            extended: false,
            entries: Vec::new(),
        }
    }

    /// Marks this declaration as extending a base of the same name.
    pub fn extended(mut self) -> Self {
        self.extended = true;
        self
    }

    /// Appends an entry with a literal mask.
    pub fn with_value(self, name: &str, value: u64) -> Self {
        self.with_value64(name, Value64::Unsigned(value))
    }

    /// Appends an entry with any [`Value64`], including sentinels.
    pub fn with_value64(mut self, name: &str, value: Value64) -> Self {
        self.entries.push(BitflagEntry {
            name: name.to_string(),
            doc: String::new(),
            value: Some(value),
            value_combination: None,
        });
        self
    }

    /// Appends an entry combining sibling entries.
    pub fn with_combination(mut self, name: &str, parts: &[&str]) -> Self {
        self.entries.push(BitflagEntry {
            name: name.to_string(),
            doc: String::new(),
            value: None,
            value_combination: Some(parts.iter().map(|p| (*p).to_string()).collect()),
        });
        self
    }
}

/// One field or argument.
///
/// # Examples
///
/// ```
/// use idl_schema_core::{Ownership, ParameterType, Pointer};
///
/// let param = ParameterType::new("label", "nullable_string");
/// assert!(param.ownership.is_none());
///
/// let buffer = ParameterType::new("buffer", "Buffer")
///     .with_pointer(Pointer::Immutable)
///     .with_ownership(Ownership::Without);
/// assert_eq!(buffer.pointer, Some(Pointer::Immutable));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterType {
    pub name: String,
    #[serde(default)]
    pub doc: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ownership: Option<Ownership>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer: Option<Pointer>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ParameterType {
    /// Creates a parameter of type `ty`.
    pub fn new(name: &str, ty: &str) -> Self {
        Self {
            name: name.to_string(),
            doc: String::new(),
            ty: ty.to_string(),
            ownership: None,
            pointer: None,
            optional: false,
            namespace: None,
        }
    }

    /// Sets the ownership qualifier.
    pub fn with_ownership(mut self, ownership: Ownership) -> Self {
        self.ownership = Some(ownership);
        self
    }

    /// Sets the pointer qualifier.
    pub fn with_pointer(mut self, pointer: Pointer) -> Self {
        self.pointer = Some(pointer);
        self
    }

    /// Marks the parameter optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// A function-pointer type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Callback {
    pub name: String,
    #[serde(default)]
    pub doc: String,
    #[serde(default)]
    pub style: CallbackStyle,
    #[serde(default)]
    pub args: Vec<ParameterType>,
}

impl Callback {
    /// Creates a callback without arguments.
    pub fn new(name: &str, style: CallbackStyle) -> Self {
        Self {
            name: name.to_string(),
            doc: String::new(),
            style,
            args: Vec::new(),
        }
    }

    /// Adds an argument.
    pub fn with_arg(mut self, arg: ParameterType) -> Self {
        self.args.push(arg);
        self
    }
}

/// An aggregate data type, possibly chainable.
///
/// # Examples
///
/// ```
/// use idl_schema_core::{ParameterType, Struct, StructType};
///
/// let limits = Struct::new("Limits", StructType::BaseOut)
///     .with_member(ParameterType::new("max_size", "uint32"));
/// let native = Struct::new("NativeLimits", StructType::ExtensionOut)
///     .with_extends("Limits");
/// assert_eq!(native.extends, vec!["Limits"]);
/// assert_eq!(limits.members.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Struct {
    pub name: String,
    #[serde(default)]
    pub doc: String,
    #[serde(rename = "type")]
    pub ty: StructType,
    #[serde(default)]
    pub extends: Vec<String>,
    /// Caller must release member resources independently.
    #[serde(default)]
    pub free_members: bool,
    #[serde(default)]
    pub members: Vec<ParameterType>,
}

impl Struct {
    /// Creates a struct with no members.
    pub fn new(name: &str, ty: StructType) -> Self {
        Self {
            name: name.to_string(),
            doc: String::new(),
            ty,
            extends: Vec::new(),
            free_members: false,
            members: Vec::new(),
        }
    }

    /// Names a base this struct extends.
    pub fn with_extends(mut self, base: &str) -> Self {
        self.extends.push(base.to_string());
        self
    }

    /// Adds a member.
    pub fn with_member(mut self, member: ParameterType) -> Self {
        self.members.push(member);
        self
    }
}

/// Return value of a [`Function`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionReturn {
    #[serde(default)]
    pub doc: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed_with_ownership: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer: Option<Pointer>,
}

/// A free function or object method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    #[serde(default)]
    pub doc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<FunctionReturn>,
    /// Name of the callback this function completes through.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<String>,
    #[serde(default)]
    pub args: Vec<ParameterType>,
}

impl Function {
    /// Creates a function with no arguments and no return value.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            doc: String::new(),
            returns: None,
            callback: None,
            args: Vec::new(),
        }
    }

    /// Adds an argument.
    pub fn with_arg(mut self, arg: ParameterType) -> Self {
        self.args.push(arg);
        self
    }

    /// Sets the return type.
    pub fn returning(mut self, ty: &str) -> Self {
        self.returns = Some(FunctionReturn {
            doc: String::new(),
            ty: ty.to_string(),
            passed_with_ownership: None,
            pointer: None,
        });
        self
    }

    /// Sets the completion callback.
    pub fn with_callback(mut self, callback: &str) -> Self {
        self.callback = Some(callback.to_string());
        self
    }
}

/// An opaque handle type exposing methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    pub name: String,
    #[serde(default)]
    pub doc: String,
    #[serde(default)]
    pub extended: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub methods: Vec<Function>,
}

impl Object {
    /// Creates a base object with no methods.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            doc: String::new(),
            extended: false,
            namespace: None,
            methods: Vec::new(),
        }
    }

    /// Marks this declaration as extending a base of the same name.
    pub fn extended(mut self) -> Self {
        self.extended = true;
        self
    }

    /// Adds a method.
    pub fn with_method(mut self, method: Function) -> Self {
        self.methods.push(method);
        self
    }
}

/// A complete schema document (or one fragment of a multi-document set).
///
/// # Examples
///
/// ```
/// use idl_schema_core::*;
///
/// let mut schema = Schema::new("webgpu");
/// schema.enums.push(Enum::new("Status").with_entry("ok"));
/// schema.objects.push(Object::new("Device").with_method(Function::new("destroy")));
///
/// assert_eq!(schema.enum_prefix, "0x0000");
/// assert_eq!(schema.declaration_count(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub copyright: String,
    pub name: String,
    /// Hexadecimal 16-bit block qualifying this document's enum values.
    pub enum_prefix: String,
    #[serde(default)]
    pub constants: Vec<Constant>,
    #[serde(default)]
    pub typedefs: Vec<Typedef>,
    #[serde(default)]
    pub enums: Vec<Enum>,
    #[serde(default)]
    pub bitflags: Vec<Bitflag>,
    #[serde(default)]
    pub callbacks: Vec<Callback>,
    #[serde(default)]
    pub structs: Vec<Struct>,
    #[serde(default)]
    pub functions: Vec<Function>,
    #[serde(default)]
    pub objects: Vec<Object>,
}

impl Schema {
    /// Creates an empty schema with the `0x0000` enum prefix.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enum_prefix: "0x0000".to_string(),
            ..Default::default()
        }
    }

    /// Sets the enum prefix.
    pub fn with_enum_prefix(mut self, prefix: &str) -> Self {
        self.enum_prefix = prefix.to_string();
        self
    }

    /// Total number of top-level declarations across all collections.
    pub fn declaration_count(&self) -> usize {
        self.constants.len()
            + self.typedefs.len()
            + self.enums.len()
            + self.bitflags.len()
            + self.callbacks.len()
            + self.structs.len()
            + self.functions.len()
            + self.objects.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value64_sentinels_follow_pointer_width() {
        let usize_max = Value64::Symbol(ValueSymbol::UsizeMax);
        assert_eq!(usize_max.resolve(64), Ok(u64::MAX));
        assert_eq!(usize_max.resolve(32), Ok(u64::from(u32::MAX)));
        assert_eq!(
            Value64::Symbol(ValueSymbol::Uint64Max).resolve(32),
            Ok(u64::MAX)
        );
    }

    #[test]
    fn test_value64_deserializes_numbers_and_symbols() {
        let values: Vec<Value64> =
            serde_json::from_str(r#"[7, -1, "usize_max", 18446744073709551615]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Value64::Unsigned(7),
                Value64::Signed(-1),
                Value64::Symbol(ValueSymbol::UsizeMax),
                Value64::Unsigned(u64::MAX),
            ]
        );
    }

    #[test]
    fn test_struct_deserializes_document_spelling() {
        let parsed: Struct = serde_json::from_str(
            r#"{
                "name": "NativeLimits",
                "doc": "",
                "type": "extension_out",
                "extends": ["Limits"],
                "members": [{ "name": "max_push", "doc": "", "type": "uint32" }]
            }"#,
        )
        .unwrap();

        assert_eq!(parsed.ty, StructType::ExtensionOut);
        assert_eq!(parsed.extends, vec!["Limits".to_string()]);
        assert!(!parsed.free_members);
        assert_eq!(parsed.members[0].ty, "uint32");
    }

    #[test]
    fn test_enum_entries_accept_null_gaps() {
        let parsed: Enum = serde_json::from_str(
            r#"{ "name": "Mode", "entries": [null, { "name": "fast" }] }"#,
        )
        .unwrap();

        assert!(parsed.entries[0].is_none());
        assert_eq!(parsed.entries[1].as_ref().unwrap().name, "fast");
        assert!(!parsed.extended);
    }
}
