//! Merging of `extended` enum, bitflag and object declarations.
//!
//! Declarations sharing a name are merged in two phases: first every
//! declaration is collected into a group per name (in first-encounter
//! order), then each group is checked and flattened. The base declaration
//! contributes first; each `extended` declaration appends its entries or
//! methods after it, in encounter order. Nothing is replaced or reordered.
//!
//! # Example
//!
//! ```
//! use idl_schema_core::*;
//!
//! let mut core = Schema::new("core");
//! core.enums.push(Enum::new("Status").with_entry("ok"));
//! let mut ext = Schema::new("ext").with_enum_prefix("0x0001");
//! ext.enums.push(Enum::new("Status").extended().with_entry("retry"));
//!
//! let model = Resolver::default().resolve(&[core, ext]).into_result().unwrap();
//! let merged = model.merged_entries("Status").unwrap();
//! assert_eq!(merged.names(), vec!["ok", "retry"]);
//! ```

use std::collections::HashMap;

use crate::report::{MergeProblem, ValidationError, ValidationReport};
use crate::types::{Bitflag, Enum, Object};
use crate::universe::TypeKind;

/// A declaration kind that supports `extended` merging.
pub(crate) trait Extensible {
    const KIND: TypeKind;

    fn name(&self) -> &str;

    fn is_extended(&self) -> bool;
}

impl Extensible for Enum {
    const KIND: TypeKind = TypeKind::Enum;

    fn name(&self) -> &str {
        &self.name
    }

    fn is_extended(&self) -> bool {
        self.extended
    }
}

impl Extensible for Bitflag {
    const KIND: TypeKind = TypeKind::Bitflag;

    fn name(&self) -> &str {
        &self.name
    }

    fn is_extended(&self) -> bool {
        self.extended
    }
}

impl Extensible for Object {
    const KIND: TypeKind = TypeKind::Object;

    fn name(&self) -> &str {
        &self.name
    }

    fn is_extended(&self) -> bool {
        self.extended
    }
}

/// A declaration and the index of the fragment it came from.
#[derive(Debug)]
pub(crate) struct Located<'a, T> {
    pub fragment: usize,
    pub decl: &'a T,
}

impl<T> Clone for Located<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Located<'_, T> {}

/// All declarations of one name, base first when the order is valid.
#[derive(Debug)]
pub(crate) struct MergeGroup<'a, T> {
    pub name: &'a str,
    pub parts: Vec<Located<'a, T>>,
}

impl<'a, T> MergeGroup<'a, T> {
    /// The first contributing declaration (the base in a valid document).
    pub fn head(&self) -> &'a T {
        self.parts[0].decl
    }
}

/// Groups declarations by name and validates base/extension ordering.
///
/// Every declaration lands in a group even when its ordering is invalid,
/// so later stages still see the name and don't report it as unknown.
pub(crate) fn merge_declarations<'a, T: Extensible>(
    decls: impl IntoIterator<Item = Located<'a, T>>,
    report: &mut ValidationReport,
) -> Vec<MergeGroup<'a, T>> {
    // Phase 1: collect per name, in first-encounter order.
    let mut groups: Vec<MergeGroup<'a, T>> = Vec::new();
    let mut by_name: HashMap<&'a str, usize> = HashMap::new();
    for located in decls {
        let name = located.decl.name();
        match by_name.get(name) {
            Some(&index) => groups[index].parts.push(located),
            None => {
                by_name.insert(name, groups.len());
                groups.push(MergeGroup {
                    name,
                    parts: vec![located],
                });
            }
        }
    }

    // Phase 2: check ordering per group.
    for group in &groups {
        let mut seen_base = false;
        let mut reported_early_extension = false;
        for (position, part) in group.parts.iter().enumerate() {
            if !part.decl.is_extended() {
                if seen_base {
                    report.error(merge_error::<T>(group.name, MergeProblem::DuplicateBase));
                }
                seen_base = true;
                continue;
            }
            if seen_base || reported_early_extension {
                continue;
            }
            let base_later = group.parts[position..]
                .iter()
                .any(|later| !later.decl.is_extended());
            let problem = if base_later {
                MergeProblem::ExtendedBeforeBase
            } else {
                MergeProblem::MissingBase
            };
            report.error(merge_error::<T>(group.name, problem));
            reported_early_extension = true;
        }
    }

    let kind = T::KIND;
    tracing::debug!(%kind, groups = groups.len(), "Merged extended declarations");
    groups
}

fn merge_error<T: Extensible>(name: &str, problem: MergeProblem) -> ValidationError {
    ValidationError::MergeOrder {
        kind: T::KIND,
        name: name.to_string(),
        problem,
    }
}

/// Flattens an object group into one record with appended methods.
pub(crate) fn merge_object(group: &MergeGroup<'_, Object>) -> Object {
    let head = group.head();
    Object {
        name: head.name.clone(),
        doc: head.doc.clone(),
        extended: false,
        namespace: head.namespace.clone(),
        methods: group
            .parts
            .iter()
            .flat_map(|part| part.decl.methods.iter().cloned())
            .collect(),
    }
}
