//! Schema resolution and validation.
//!
//! [`Resolver`] runs every stage over an ordered list of schema fragments
//! and collects all problems into one [`ValidationReport`]. Stages never
//! stop early; each works with whatever earlier stages could resolve.
//!
//! Stage order:
//!
//! 1. enum prefixes of every fragment
//! 2. merge grouping of enums, bitflags and objects
//! 3. the type universe
//! 4. local name uniqueness
//! 5. type references
//! 6. struct chains
//! 7. bitflag values
//! 8. enum values
//! 9. constants
//!
//! # Examples
//!
//! ```
//! use idl_schema_core::*;
//!
//! let mut schema = Schema::new("demo");
//! schema.structs.push(
//!     Struct::new("Limits", StructType::Standalone)
//!         .with_member(ParameterType::new("max_size", "uint32")),
//! );
//! assert!(validate_schema(&schema).is_empty());
//!
//! // Invalid: the member type is never declared
//! schema.structs[0].members.push(ParameterType::new("owner", "Device"));
//! let report = validate_schema(&schema);
//! assert_eq!(report.kinds(), vec![ErrorKind::UnknownTypeReference]);
//! ```

use tracing::{debug, info};

use crate::bitflag::resolve_bitflag;
use crate::chain::link_chains;
use crate::config::ResolverConfig;
use crate::enums::{parse_enum_prefix, resolve_enum};
use crate::merge::{Located, merge_declarations, merge_object};
use crate::model::{ResolvedConstant, ResolvedModel};
use crate::reference::ReferenceResolver;
use crate::report::{ValidationError, ValidationReport};
use crate::types::{Callback, Function, Object, Schema, Struct};
use crate::universe::{DeclRef, NameKind, TypeKind, TypeUniverse, check_unique};

/// Resolves schema fragments into a [`ResolvedModel`].
///
/// # Examples
///
/// ```
/// use idl_schema_core::*;
///
/// let config = ResolverConfig::default().with_bitflag_aliases(AliasPolicy::Deny);
/// let mut schema = Schema::new("demo");
/// schema.bitflags.push(Bitflag::new("Usage").with_value("copy", 4).with_value("copy_alias", 4));
///
/// let resolution = Resolver::new(config).resolve_one(&schema);
/// assert!(resolution.model().is_none());
/// assert_eq!(resolution.report().kinds(), vec![ErrorKind::DuplicateBitflagValue]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    config: ResolverConfig,
}

impl Resolver {
    /// Creates a resolver. The configuration is used as given; call
    /// [`ResolverConfig::validate`] first when it comes from user input.
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves a single schema document.
    pub fn resolve_one(&self, schema: &Schema) -> Resolution {
        self.resolve(std::slice::from_ref(schema))
    }

    /// Resolves an ordered list of fragments as one universe.
    ///
    /// Declarations are processed in fragment order, then document order,
    /// so `extended` declarations must come after their base.
    pub fn resolve(&self, fragments: &[Schema]) -> Resolution {
        let mut report = ValidationReport::new();

        let prefixes: Vec<Option<u16>> = fragments
            .iter()
            .map(|fragment| {
                let prefix = parse_enum_prefix(&fragment.enum_prefix);
                if prefix.is_none() {
                    report.error(ValidationError::InvalidEnumPrefix {
                        schema: fragment.name.clone(),
                        prefix: fragment.enum_prefix.clone(),
                    });
                }
                prefix
            })
            .collect();

        let enum_groups = merge_declarations(locate(fragments, |s| s.enums.as_slice()), &mut report);
        let bitflag_groups =
            merge_declarations(locate(fragments, |s| s.bitflags.as_slice()), &mut report);
        let object_groups =
            merge_declarations(locate(fragments, |s| s.objects.as_slice()), &mut report);

        let typedefs = collect(fragments, |s| s.typedefs.as_slice());
        let callbacks = collect(fragments, |s| s.callbacks.as_slice());
        let structs = collect(fragments, |s| s.structs.as_slice());
        let functions = collect(fragments, |s| s.functions.as_slice());
        let objects: Vec<Object> = object_groups.iter().map(merge_object).collect();

        let mut universe = TypeUniverse::default();
        let names = [
            (TypeKind::Typedef, typedefs.iter().map(|t| t.name.as_str()).collect::<Vec<_>>()),
            (TypeKind::Enum, enum_groups.iter().map(|g| g.name).collect()),
            (TypeKind::Bitflag, bitflag_groups.iter().map(|g| g.name).collect()),
            (TypeKind::Callback, callbacks.iter().map(|c| c.name.as_str()).collect()),
            (TypeKind::Struct, structs.iter().map(|s| s.name.as_str()).collect()),
            (TypeKind::Object, objects.iter().map(|o| o.name.as_str()).collect()),
        ];
        for (kind, declared) in names {
            for (index, name) in declared.into_iter().enumerate() {
                universe.register(name, DeclRef { kind, index }, &mut report);
            }
        }
        debug!(declarations = universe.len(), "Built type universe");

        let constant_names = fragments
            .iter()
            .flat_map(|s| s.constants.iter().map(|c| c.name.as_str()));
        check_unique(NameKind::Constant, None, constant_names, &mut report);
        check_unique(
            NameKind::Function,
            None,
            functions.iter().map(|f| f.name.as_str()),
            &mut report,
        );
        check_local_names(&callbacks, &structs, &functions, &objects, &mut report);

        let references = ReferenceResolver::new(
            &universe,
            &typedefs,
            self.config.allow_qualified_references,
        )
        .resolve_all(&callbacks, &structs, &functions, &objects, &mut report);

        let chains = link_chains(&structs, &universe, &mut report);

        let bitflags = bitflag_groups
            .iter()
            .map(|group| {
                resolve_bitflag(
                    group,
                    self.config.pointer_width,
                    self.config.bitflag_aliases,
                    &mut report,
                )
            })
            .collect();

        let enums = enum_groups
            .iter()
            .map(|group| resolve_enum(group, &prefixes, &mut report))
            .collect();

        let constants = fragments
            .iter()
            .flat_map(|s| s.constants.iter())
            .map(|constant| {
                let resolved = match constant.value.resolve(self.config.pointer_width) {
                    Ok(value) => Some(value),
                    Err(negative) => {
                        report.error(ValidationError::InvalidValue {
                            owner: format!("constant {}", constant.name),
                            value: negative.to_string(),
                            reason: "constants must be non-negative".to_string(),
                        });
                        None
                    }
                };
                ResolvedConstant {
                    name: constant.name.clone(),
                    doc: constant.doc.clone(),
                    value: constant.value,
                    resolved,
                }
            })
            .collect();

        let first = fragments.first();
        let model = ResolvedModel {
            name: first.map(|s| s.name.clone()).unwrap_or_default(),
            copyright: first.map(|s| s.copyright.clone()).unwrap_or_default(),
            universe,
            constants,
            typedefs,
            enums,
            bitflags,
            callbacks,
            structs,
            functions,
            objects,
            references,
            chains,
            allow_qualified_references: self.config.allow_qualified_references,
        };

        info!(
            fragments = fragments.len(),
            declarations = model.universe.len(),
            references = model.references.len(),
            errors = report.error_count(),
            warnings = report.warning_count(),
            "Resolved schema"
        );
        Resolution { model, report }
    }
}

/// Outcome of one resolution run.
#[derive(Debug, Clone)]
pub struct Resolution {
    model: ResolvedModel,
    report: ValidationReport,
}

impl Resolution {
    /// All diagnostics, errors and warnings.
    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    /// The model, when no error was recorded. Warnings don't block it.
    pub fn model(&self) -> Option<&ResolvedModel> {
        (!self.report.has_errors()).then_some(&self.model)
    }

    /// The model as far as it could be resolved, errors or not.
    ///
    /// This bypasses the validation gate of [`model`](Self::model) and
    /// [`into_result`](Self::into_result): the model may contain dangling
    /// references and unresolved values (`None`). Use it for diagnostics
    /// only, never as generator input.
    pub fn partial_model(&self) -> &ResolvedModel {
        &self.model
    }

    /// Returns `true` when nothing at all was recorded.
    pub fn is_clean(&self) -> bool {
        self.report.is_empty()
    }

    pub fn into_report(self) -> ValidationReport {
        self.report
    }

    /// Converts into the model, or the report when it holds errors.
    ///
    /// # Errors
    ///
    /// Returns the full [`ValidationReport`] if any error was recorded.
    pub fn into_result(self) -> Result<ResolvedModel, ValidationReport> {
        if self.report.has_errors() {
            Err(self.report)
        } else {
            Ok(self.model)
        }
    }
}

/// Validates a single schema with the default configuration.
///
/// Returns every diagnostic; an empty report means the schema is clean.
pub fn validate_schema(schema: &Schema) -> ValidationReport {
    Resolver::default().resolve_one(schema).into_report()
}

/// Resolves a single schema with the default configuration.
///
/// # Errors
///
/// Returns the [`ValidationReport`] if the schema has any error.
pub fn resolve_schema(schema: &Schema) -> Result<ResolvedModel, ValidationReport> {
    Resolver::default().resolve_one(schema).into_result()
}

fn locate<'a, T: 'a>(
    fragments: &'a [Schema],
    select: impl Fn(&'a Schema) -> &'a [T],
) -> impl Iterator<Item = Located<'a, T>> {
    fragments
        .iter()
        .enumerate()
        .flat_map(move |(fragment, schema)| {
            select(schema)
                .iter()
                .map(move |decl| Located { fragment, decl })
        })
}

fn collect<T: Clone>(fragments: &[Schema], select: impl Fn(&Schema) -> &[T]) -> Vec<T> {
    fragments
        .iter()
        .flat_map(|schema| select(schema).iter().cloned())
        .collect()
}

/// Uniqueness of members, arguments and methods within their owner.
fn check_local_names(
    callbacks: &[Callback],
    structs: &[Struct],
    functions: &[Function],
    objects: &[Object],
    report: &mut ValidationReport,
) {
    for callback in callbacks {
        check_unique(
            NameKind::Argument,
            Some(&callback.name),
            callback.args.iter().map(|a| a.name.as_str()),
            report,
        );
    }
    for record in structs {
        check_unique(
            NameKind::Member,
            Some(&record.name),
            record.members.iter().map(|m| m.name.as_str()),
            report,
        );
    }
    for function in functions {
        check_function_args(&function.name, function, report);
    }
    for object in objects {
        check_unique(
            NameKind::Method,
            Some(&object.name),
            object.methods.iter().map(|m| m.name.as_str()),
            report,
        );
        for method in &object.methods {
            check_function_args(&format!("{}.{}", object.name, method.name), method, report);
        }
    }
}

fn check_function_args(scope: &str, function: &Function, report: &mut ValidationReport) {
    check_unique(
        NameKind::Argument,
        Some(scope),
        function.args.iter().map(|a| a.name.as_str()),
        report,
    );
}
