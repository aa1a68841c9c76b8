//! Enum entry numbering.
//!
//! Each fragment owns a 16-bit block named by its `enum_prefix`. Entries
//! without an explicit value are numbered sequentially per enum and per
//! prefix; every slot, including a `null` gap, consumes one number, and an
//! explicit value moves the counter past itself. The qualified value of an
//! entry is `(prefix << 16) | value`.
//!
//! # Example
//!
//! ```
//! use idl_schema_core::*;
//!
//! let mut core = Schema::new("core");
//! core.enums.push(Enum::new("Status").with_entry("ok").with_gap().with_entry("retry"));
//! let mut ext = Schema::new("ext").with_enum_prefix("0x0001");
//! ext.enums.push(Enum::new("Status").extended().with_entry("lost"));
//!
//! let model = Resolver::default().resolve(&[core, ext]).into_result().unwrap();
//! assert_eq!(model.resolved_enum_value("Status", "retry"), Some(2));
//! assert_eq!(model.qualified_enum_value("Status", "lost"), Some(0x0001_0000));
//! ```

use std::collections::HashMap;

use serde::Serialize;

use crate::merge::MergeGroup;
use crate::report::{ValidationError, ValidationReport};
use crate::types::Enum;
use crate::universe::{NameKind, check_unique};

/// One numbered slot of a merged enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEnumEntry {
    /// `None` for a reserved gap.
    pub name: Option<String>,
    pub doc: String,
    /// Value within the prefix block; `None` when out of range.
    pub value: Option<u16>,
    /// `(prefix << 16) | value`; `None` when the value or prefix is invalid.
    pub qualified_value: Option<u32>,
}

impl ResolvedEnumEntry {
    pub fn is_gap(&self) -> bool {
        self.name.is_none()
    }
}

/// A merged enum with every slot numbered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEnum {
    pub name: String,
    pub doc: String,
    pub entries: Vec<ResolvedEnumEntry>,
}

impl ResolvedEnum {
    /// Finds a named entry.
    pub fn entry(&self, name: &str) -> Option<&ResolvedEnumEntry> {
        self.entries
            .iter()
            .find(|entry| entry.name.as_deref() == Some(name))
    }

    /// Named entries only, in merged order.
    pub fn named_entries(&self) -> impl Iterator<Item = &ResolvedEnumEntry> {
        self.entries.iter().filter(|entry| !entry.is_gap())
    }
}

/// Numbers every slot of one merged enum.
///
/// `prefixes` holds the parsed `enum_prefix` of each fragment, `None` when
/// it was invalid (already reported).
pub(crate) fn resolve_enum(
    group: &MergeGroup<'_, Enum>,
    prefixes: &[Option<u16>],
    report: &mut ValidationReport,
) -> ResolvedEnum {
    let head = group.head();
    check_unique(
        NameKind::EnumEntry,
        Some(&head.name),
        group
            .parts
            .iter()
            .flat_map(|part| part.decl.entries.iter().flatten())
            .map(|entry| entry.name.as_str()),
        report,
    );

    let mut counters: HashMap<Option<u16>, i64> = HashMap::new();
    let mut taken: HashMap<u32, String> = HashMap::new();
    let mut entries = Vec::new();

    for part in &group.parts {
        let prefix = prefixes.get(part.fragment).copied().flatten();
        let counter = counters.entry(prefix).or_insert(0);

        for slot in &part.decl.entries {
            let raw = match slot.as_ref().and_then(|entry| entry.value) {
                Some(explicit) => explicit,
                None => *counter,
            };
            *counter = raw.saturating_add(1);

            let value = match u16::try_from(raw) {
                Ok(value) => Some(value),
                Err(_) => {
                    let owner = match slot {
                        Some(entry) => format!("enum {} entry {}", head.name, entry.name),
                        None => format!("enum {} reserved slot", head.name),
                    };
                    report.error(ValidationError::InvalidValue {
                        owner,
                        value: raw.to_string(),
                        reason: "enum values must lie in 0..=0xffff".to_string(),
                    });
                    None
                }
            };

            let qualified_value = match (prefix, value) {
                (Some(prefix), Some(value)) => Some((u32::from(prefix) << 16) | u32::from(value)),
                _ => None,
            };

            let label = slot
                .as_ref()
                .map_or_else(|| "<reserved>".to_string(), |entry| entry.name.clone());
            if let Some(qualified) = qualified_value {
                match taken.get(&qualified) {
                    Some(first) => report.error(ValidationError::DuplicateEnumValue {
                        name: head.name.clone(),
                        first: first.clone(),
                        second: label,
                        value: qualified,
                    }),
                    None => {
                        taken.insert(qualified, label);
                    }
                }
            }

            entries.push(ResolvedEnumEntry {
                name: slot.as_ref().map(|entry| entry.name.clone()),
                doc: slot
                    .as_ref()
                    .map(|entry| entry.doc.clone())
                    .unwrap_or_default(),
                value,
                qualified_value,
            });
        }
    }

    ResolvedEnum {
        name: head.name.clone(),
        doc: head.doc.clone(),
        entries,
    }
}

/// Parses an `enum_prefix` such as `"0x0001"`.
///
/// # Examples
///
/// ```
/// use idl_schema_core::parse_enum_prefix;
///
/// assert_eq!(parse_enum_prefix("0x0000"), Some(0));
/// assert_eq!(parse_enum_prefix("0X7FFF"), Some(0x7FFF));
/// assert_eq!(parse_enum_prefix("0x10000"), None);
/// assert_eq!(parse_enum_prefix("12"), None);
/// ```
pub fn parse_enum_prefix(prefix: &str) -> Option<u16> {
    let digits = prefix
        .strip_prefix("0x")
        .or_else(|| prefix.strip_prefix("0X"))?;
    if digits.is_empty() {
        return None;
    }
    u16::from_str_radix(digits, 16).ok()
}
