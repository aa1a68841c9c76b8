//! Struct chaining: which extension structs may attach to which bases.
//!
//! Members are never flattened across a chain; each struct keeps its own
//! declared member list. This stage only validates `extends` and records the
//! legal attachment graph, stored as arena indices in both directions.

use serde::Serialize;

use crate::report::{ValidationError, ValidationReport};
use crate::types::{Struct, StructType};
use crate::universe::{NameKind, TypeKind, TypeUniverse, check_unique};

/// Data-flow direction of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    In,
    Out,
    InOrOut,
}

impl Direction {
    /// Whether a base of direction `self` accepts an extension of direction `other`.
    ///
    /// # Examples
    ///
    /// ```
    /// use idl_schema_core::Direction;
    ///
    /// assert!(Direction::In.accepts(Direction::In));
    /// assert!(Direction::InOrOut.accepts(Direction::Out));
    /// assert!(Direction::Out.accepts(Direction::InOrOut));
    /// assert!(!Direction::In.accepts(Direction::Out));
    /// ```
    pub const fn accepts(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::InOrOut, _) | (_, Self::InOrOut) | (Self::In, Self::In) | (Self::Out, Self::Out)
        )
    }
}

/// Role a struct plays in chaining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainRole {
    Base(Direction),
    Extension(Direction),
    Standalone,
}

impl StructType {
    pub const fn role(self) -> ChainRole {
        match self {
            Self::BaseIn => ChainRole::Base(Direction::In),
            Self::BaseOut => ChainRole::Base(Direction::Out),
            Self::BaseInOrOut => ChainRole::Base(Direction::InOrOut),
            Self::ExtensionIn => ChainRole::Extension(Direction::In),
            Self::ExtensionOut => ChainRole::Extension(Direction::Out),
            Self::ExtensionInOrOut => ChainRole::Extension(Direction::InOrOut),
            Self::Standalone => ChainRole::Standalone,
        }
    }

    pub const fn is_extension(self) -> bool {
        matches!(self.role(), ChainRole::Extension(_))
    }
}

/// Legal attachments between structs, by struct arena index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChainGraph {
    bases: Vec<Vec<usize>>,
    extensions: Vec<Vec<usize>>,
}

impl ChainGraph {
    /// Bases the struct at `index` may extend, in `extends` order.
    pub fn bases_of(&self, index: usize) -> &[usize] {
        self.bases.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Extensions that may attach to the struct at `index`, in declaration order.
    pub fn extensions_of(&self, index: usize) -> &[usize] {
        self.extensions.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of legal (extension, base) pairs.
    pub fn edge_count(&self) -> usize {
        self.bases.iter().map(Vec::len).sum()
    }
}

/// Validates every struct's `extends` list and builds the attachment graph.
pub(crate) fn link_chains(
    structs: &[Struct],
    universe: &TypeUniverse,
    report: &mut ValidationReport,
) -> ChainGraph {
    let mut graph = ChainGraph {
        bases: vec![Vec::new(); structs.len()],
        extensions: vec![Vec::new(); structs.len()],
    };

    for (index, record) in structs.iter().enumerate() {
        check_unique(
            NameKind::Extends,
            Some(&record.name),
            record.extends.iter().map(String::as_str),
            report,
        );

        let direction = match record.ty.role() {
            ChainRole::Extension(direction) => direction,
            ChainRole::Base(_) | ChainRole::Standalone => {
                if !record.extends.is_empty() {
                    report.error(ValidationError::UnexpectedExtends {
                        name: record.name.clone(),
                        struct_type: record.ty,
                    });
                }
                continue;
            }
        };

        if record.extends.is_empty() {
            report.error(ValidationError::MissingExtends {
                name: record.name.clone(),
                struct_type: record.ty,
            });
            continue;
        }

        for base_name in &record.extends {
            let base_index = match universe.get(base_name) {
                Some(decl) if decl.kind == TypeKind::Struct => decl.index,
                // a declared struct that lost a name collision, already reported
                _ if structs.iter().any(|s| &s.name == base_name) => continue,
                _ => {
                    report.error(ValidationError::UnknownBaseStruct {
                        extension: record.name.clone(),
                        base: base_name.clone(),
                    });
                    continue;
                }
            };
            if graph.bases[index].contains(&base_index) {
                continue;
            }

            let base = &structs[base_index];
            match base.ty.role() {
                ChainRole::Base(base_direction) if base_direction.accepts(direction) => {
                    graph.bases[index].push(base_index);
                    graph.extensions[base_index].push(index);
                }
                _ => report.error(ValidationError::IncompatibleChainDirection {
                    extension: record.name.clone(),
                    extension_type: record.ty,
                    base: base.name.clone(),
                    base_type: base.ty,
                }),
            }
        }
    }

    tracing::debug!(
        structs = structs.len(),
        attachments = graph.edge_count(),
        "Linked struct chains"
    );
    graph
}
