//! Primitive type literals.
//!
//! A `Type` string that matches one of these literals exactly is a
//! primitive and never consults the type universe.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the fixed primitive type literals a schema may reference.
///
/// # Examples
///
/// ```
/// use idl_schema_core::Primitive;
///
/// assert_eq!(Primitive::parse("uint32"), Some(Primitive::Uint32));
/// assert_eq!(Primitive::parse("array<float32>"), Some(Primitive::ArrayFloat32));
/// assert_eq!(Primitive::parse("Limits"), None);
/// assert!(Primitive::ArrayBool.is_array());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Primitive {
    #[serde(rename = "c_void")]
    CVoid,
    #[serde(rename = "bool")]
    Bool,
    #[serde(rename = "nullable_string")]
    NullableString,
    #[serde(rename = "string_with_default_empty")]
    StringWithDefaultEmpty,
    #[serde(rename = "out_string")]
    OutString,
    #[serde(rename = "uint16")]
    Uint16,
    #[serde(rename = "uint32")]
    Uint32,
    #[serde(rename = "uint64")]
    Uint64,
    #[serde(rename = "usize")]
    Usize,
    #[serde(rename = "int16")]
    Int16,
    #[serde(rename = "int32")]
    Int32,
    #[serde(rename = "float32")]
    Float32,
    #[serde(rename = "float64")]
    Float64,
    #[serde(rename = "array<bool>")]
    ArrayBool,
    #[serde(rename = "array<string>")]
    ArrayString,
    #[serde(rename = "array<uint16>")]
    ArrayUint16,
    #[serde(rename = "array<uint32>")]
    ArrayUint32,
    #[serde(rename = "array<uint64>")]
    ArrayUint64,
    #[serde(rename = "array<usize>")]
    ArrayUsize,
    #[serde(rename = "array<int16>")]
    ArrayInt16,
    #[serde(rename = "array<int32>")]
    ArrayInt32,
    #[serde(rename = "array<float32>")]
    ArrayFloat32,
    #[serde(rename = "array<float64>")]
    ArrayFloat64,
}

impl Primitive {
    /// Every primitive literal, in declaration order.
    pub const ALL: [Self; 23] = [
        Self::CVoid,
        Self::Bool,
        Self::NullableString,
        Self::StringWithDefaultEmpty,
        Self::OutString,
        Self::Uint16,
        Self::Uint32,
        Self::Uint64,
        Self::Usize,
        Self::Int16,
        Self::Int32,
        Self::Float32,
        Self::Float64,
        Self::ArrayBool,
        Self::ArrayString,
        Self::ArrayUint16,
        Self::ArrayUint32,
        Self::ArrayUint64,
        Self::ArrayUsize,
        Self::ArrayInt16,
        Self::ArrayInt32,
        Self::ArrayFloat32,
        Self::ArrayFloat64,
    ];

    /// Returns the literal spelling used in schema documents.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CVoid => "c_void",
            Self::Bool => "bool",
            Self::NullableString => "nullable_string",
            Self::StringWithDefaultEmpty => "string_with_default_empty",
            Self::OutString => "out_string",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Usize => "usize",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::ArrayBool => "array<bool>",
            Self::ArrayString => "array<string>",
            Self::ArrayUint16 => "array<uint16>",
            Self::ArrayUint32 => "array<uint32>",
            Self::ArrayUint64 => "array<uint64>",
            Self::ArrayUsize => "array<usize>",
            Self::ArrayInt16 => "array<int16>",
            Self::ArrayInt32 => "array<int32>",
            Self::ArrayFloat32 => "array<float32>",
            Self::ArrayFloat64 => "array<float64>",
        }
    }

    /// Parses an exact primitive literal.
    pub fn parse(literal: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == literal)
    }

    /// Returns `true` for the `array<...>` literals.
    pub const fn is_array(self) -> bool {
        matches!(
            self,
            Self::ArrayBool
                | Self::ArrayString
                | Self::ArrayUint16
                | Self::ArrayUint32
                | Self::ArrayUint64
                | Self::ArrayUsize
                | Self::ArrayInt16
                | Self::ArrayInt32
                | Self::ArrayFloat32
                | Self::ArrayFloat64
        )
    }

    /// Whether `ownership` / `pointer` qualifiers may be attached.
    ///
    /// Arrays and the opaque `c_void` pointee accept them; every other
    /// primitive is a plain scalar.
    pub const fn accepts_qualifiers(self) -> bool {
        matches!(self, Self::CVoid) || self.is_array()
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
