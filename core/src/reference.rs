//! Classification of `Type` strings against the type universe.
//!
//! Every type-bearing field of the document (typedef targets, callback
//! arguments, struct members, function and method arguments, return values
//! and completion callbacks) is walked in document order. Each reference is
//! classified as a primitive or a declared type; unresolvable names are
//! recorded and the walk continues, so one pass reports every dangling name.

use serde::Serialize;

use crate::primitive::Primitive;
use crate::report::{ValidationError, ValidationReport};
use crate::types::{Callback, Function, Object, ParameterType, Struct, Typedef};
use crate::universe::{DeclRef, TypeKind, TypeUniverse};

/// Classified target of a `Type` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    /// One of the fixed primitive literals.
    Primitive(Primitive),
    /// A declared typedef, enum, bitflag, callback, struct or object.
    Declared(DeclRef),
    /// `array<T>` of a declared type.
    ArrayOf(DeclRef),
}

impl TypeRef {
    /// Kind of the referenced declaration, `None` for primitives.
    pub const fn kind(self) -> Option<TypeKind> {
        match self {
            Self::Primitive(_) => None,
            Self::Declared(decl) | Self::ArrayOf(decl) => Some(decl.kind),
        }
    }

    pub const fn is_primitive(self) -> bool {
        matches!(self, Self::Primitive(_))
    }
}

/// One resolved reference and where it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedReference {
    /// Human-readable location, e.g. `struct Limits member max_size`.
    pub site: String,
    /// The type string as written.
    pub type_name: String,
    pub target: TypeRef,
}

enum Classification {
    Resolved(TypeRef),
    Unknown,
    KindMismatch {
        name: String,
        expected: TypeKind,
        found: TypeKind,
    },
}

/// Classifies a type string without recording anything.
///
/// Bare names are looked up directly. With `allow_qualified`, the
/// `kind.name` and `array<T>` forms are accepted as well.
pub(crate) fn classify(universe: &TypeUniverse, ty: &str, allow_qualified: bool) -> Option<TypeRef> {
    match classify_inner(universe, ty, allow_qualified) {
        Classification::Resolved(target) => Some(target),
        Classification::Unknown | Classification::KindMismatch { .. } => None,
    }
}

fn classify_inner(universe: &TypeUniverse, ty: &str, allow_qualified: bool) -> Classification {
    if let Some(primitive) = Primitive::parse(ty) {
        return Classification::Resolved(TypeRef::Primitive(primitive));
    }

    if allow_qualified {
        if let Some(inner) = ty.strip_prefix("array<").and_then(|s| s.strip_suffix('>')) {
            return match classify_named(universe, inner, true) {
                Classification::Resolved(TypeRef::Declared(decl)) => {
                    Classification::Resolved(TypeRef::ArrayOf(decl))
                }
                Classification::Resolved(_) | Classification::Unknown => Classification::Unknown,
                mismatch @ Classification::KindMismatch { .. } => mismatch,
            };
        }
    }

    classify_named(universe, ty, allow_qualified)
}

fn classify_named(universe: &TypeUniverse, name: &str, allow_qualified: bool) -> Classification {
    if allow_qualified {
        if let Some((prefix, bare)) = name.split_once('.') {
            if let Some(expected) = TypeKind::from_prefix(prefix) {
                return match universe.get(bare) {
                    Some(decl) if decl.kind == expected => {
                        Classification::Resolved(TypeRef::Declared(decl))
                    }
                    Some(decl) => Classification::KindMismatch {
                        name: bare.to_string(),
                        expected,
                        found: decl.kind,
                    },
                    None => Classification::Unknown,
                };
            }
        }
    }

    match universe.get(name) {
        Some(decl) => Classification::Resolved(TypeRef::Declared(decl)),
        None => Classification::Unknown,
    }
}

/// Walks the document and builds the classified reference table.
pub(crate) struct ReferenceResolver<'a> {
    universe: &'a TypeUniverse,
    typedefs: &'a [Typedef],
    allow_qualified: bool,
    references: Vec<ClassifiedReference>,
}

impl<'a> ReferenceResolver<'a> {
    pub(crate) fn new(
        universe: &'a TypeUniverse,
        typedefs: &'a [Typedef],
        allow_qualified: bool,
    ) -> Self {
        Self {
            universe,
            typedefs,
            allow_qualified,
            references: Vec::new(),
        }
    }

    /// Resolves all references of the given declarations, in this order:
    /// typedefs, callbacks, structs, free functions, objects.
    pub(crate) fn resolve_all(
        mut self,
        callbacks: &[Callback],
        structs: &[Struct],
        functions: &[Function],
        objects: &[Object],
        report: &mut ValidationReport,
    ) -> Vec<ClassifiedReference> {
        for typedef in self.typedefs {
            self.resolve_typedef(typedef, report);
        }
        for callback in callbacks {
            for arg in &callback.args {
                let site = format!("callback {} arg {}", callback.name, arg.name);
                self.resolve_param(site, arg, report);
            }
        }
        for record in structs {
            for member in &record.members {
                let site = format!("struct {} member {}", record.name, member.name);
                self.resolve_param(site, member, report);
            }
        }
        for function in functions {
            self.resolve_function(&format!("function {}", function.name), function, report);
        }
        for object in objects {
            for method in &object.methods {
                let owner = format!("object {} method {}", object.name, method.name);
                self.resolve_function(&owner, method, report);
            }
        }

        tracing::debug!(references = self.references.len(), "Resolved type references");
        self.references
    }

    fn resolve_typedef(&mut self, typedef: &Typedef, report: &mut ValidationReport) {
        match Primitive::parse(&typedef.ty) {
            Some(primitive) => self.references.push(ClassifiedReference {
                site: format!("typedef {}", typedef.name),
                type_name: typedef.ty.clone(),
                target: TypeRef::Primitive(primitive),
            }),
            None => report.error(ValidationError::InvalidTypedef {
                name: typedef.name.clone(),
                target: typedef.ty.clone(),
            }),
        }
    }

    fn resolve_function(&mut self, owner: &str, function: &Function, report: &mut ValidationReport) {
        for arg in &function.args {
            self.resolve_param(format!("{owner} arg {}", arg.name), arg, report);
        }

        if let Some(returns) = &function.returns {
            let site = format!("{owner} returns");
            if let Some(target) = self.resolve_type(&site, &returns.ty, report) {
                let mut qualifiers = Vec::new();
                if returns.pointer.is_some() {
                    qualifiers.push("pointer");
                }
                if returns.passed_with_ownership.is_some() {
                    qualifiers.push("passed_with_ownership");
                }
                self.check_qualifiers(&site, &returns.ty, target, &qualifiers, report);
            }
        }

        if let Some(callback) = &function.callback {
            let site = format!("{owner} callback");
            if let Some(target) = self.resolve_type(&site, callback, report) {
                match target.kind() {
                    Some(TypeKind::Callback) => {}
                    Some(found) => report.error(ValidationError::TypeKindMismatch {
                        name: callback.clone(),
                        referenced_from: site,
                        expected: TypeKind::Callback,
                        found,
                    }),
                    None => report.error(ValidationError::UnknownTypeReference {
                        name: callback.clone(),
                        referenced_from: site,
                    }),
                }
            }
        }
    }

    fn resolve_param(&mut self, site: String, param: &ParameterType, report: &mut ValidationReport) {
        if let Some(target) = self.resolve_type(&site, &param.ty, report) {
            let mut qualifiers = Vec::new();
            if param.ownership.is_some() {
                qualifiers.push("ownership");
            }
            if param.pointer.is_some() {
                qualifiers.push("pointer");
            }
            self.check_qualifiers(&site, &param.ty, target, &qualifiers, report);
        }
    }

    /// Classifies one type string, recording it or the failure.
    fn resolve_type(
        &mut self,
        site: &str,
        ty: &str,
        report: &mut ValidationReport,
    ) -> Option<TypeRef> {
        match classify_inner(self.universe, ty, self.allow_qualified) {
            Classification::Resolved(target) => {
                self.references.push(ClassifiedReference {
                    site: site.to_string(),
                    type_name: ty.to_string(),
                    target,
                });
                Some(target)
            }
            Classification::Unknown => {
                report.error(ValidationError::UnknownTypeReference {
                    name: ty.to_string(),
                    referenced_from: site.to_string(),
                });
                None
            }
            Classification::KindMismatch {
                name,
                expected,
                found,
            } => {
                report.error(ValidationError::TypeKindMismatch {
                    name,
                    referenced_from: site.to_string(),
                    expected,
                    found,
                });
                None
            }
        }
    }

    fn check_qualifiers(
        &self,
        site: &str,
        ty: &str,
        target: TypeRef,
        qualifiers: &[&str],
        report: &mut ValidationReport,
    ) {
        if qualifiers.is_empty() || self.accepts_qualifiers(target) {
            return;
        }
        report.error(ValidationError::MisplacedQualifier {
            referenced_from: site.to_string(),
            type_name: ty.to_string(),
            qualifier: qualifiers.join(" and "),
        });
    }

    fn accepts_qualifiers(&self, target: TypeRef) -> bool {
        match target {
            TypeRef::Primitive(primitive) => primitive.accepts_qualifiers(),
            TypeRef::Declared(DeclRef {
                kind: TypeKind::Typedef,
                index,
            }) => self
                .typedefs
                .get(index)
                .and_then(|typedef| Primitive::parse(&typedef.ty))
                // invalid typedef targets are reported by resolve_typedef
                .is_none_or(Primitive::accepts_qualifiers),
            TypeRef::Declared(_) | TypeRef::ArrayOf(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::report::ErrorKind;
    use crate::types::{Ownership, Pointer, StructType};

    use super::*;

    fn universe_with(entries: &[(&str, TypeKind)]) -> TypeUniverse {
        let mut universe = TypeUniverse::default();
        let mut report = ValidationReport::new();
        for (index, (name, kind)) in entries.iter().enumerate() {
            universe.register(name, DeclRef { kind: *kind, index }, &mut report);
        }
        assert!(report.is_empty());
        universe
    }

    #[test]
    fn test_classify_bare_and_qualified_names() {
        let universe = universe_with(&[("Limits", TypeKind::Struct), ("Device", TypeKind::Object)]);

        assert_eq!(
            classify(&universe, "uint32", true),
            Some(TypeRef::Primitive(Primitive::Uint32))
        );
        assert_eq!(
            classify(&universe, "Limits", true).and_then(TypeRef::kind),
            Some(TypeKind::Struct)
        );
        assert_eq!(
            classify(&universe, "object.Device", true).and_then(TypeRef::kind),
            Some(TypeKind::Object)
        );
        assert!(matches!(
            classify(&universe, "array<struct.Limits>", true),
            Some(TypeRef::ArrayOf(_))
        ));
        assert_eq!(classify(&universe, "struct.Device", true), None);
        assert_eq!(classify(&universe, "array<Limits>", false), None);
    }

    #[test]
    fn test_unknown_references_are_all_collected() {
        let universe = universe_with(&[("Limits", TypeKind::Struct)]);
        let structs = vec![
            Struct::new("A", StructType::Standalone)
                .with_member(ParameterType::new("x", "Missing"))
                .with_member(ParameterType::new("y", "Limits")),
            Struct::new("B", StructType::Standalone)
                .with_member(ParameterType::new("z", "AlsoMissing")),
        ];
        let mut report = ValidationReport::new();

        let references =
            ReferenceResolver::new(&universe, &[], true).resolve_all(&[], &structs, &[], &[], &mut report);

        assert_eq!(references.len(), 1);
        assert_eq!(references[0].site, "struct A member y");
        assert_eq!(
            report.errors().cloned().collect::<Vec<_>>(),
            vec![
                ValidationError::UnknownTypeReference {
                    name: "Missing".to_string(),
                    referenced_from: "struct A member x".to_string(),
                },
                ValidationError::UnknownTypeReference {
                    name: "AlsoMissing".to_string(),
                    referenced_from: "struct B member z".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_qualifiers_rejected_on_scalars() {
        let typedefs = vec![Typedef::new("Flags", "uint64")];
        let universe = universe_with(&[("Flags", TypeKind::Typedef)]);
        let function = Function::new("write")
            .with_arg(ParameterType::new("size", "uint32").with_pointer(Pointer::Mutable))
            .with_arg(ParameterType::new("flags", "Flags").with_ownership(Ownership::With))
            .with_arg(ParameterType::new("data", "c_void").with_pointer(Pointer::Immutable))
            .with_arg(ParameterType::new("values", "array<uint32>").with_pointer(Pointer::Immutable));
        let mut report = ValidationReport::new();

        ReferenceResolver::new(&universe, &typedefs, true).resolve_all(
            &[],
            &[],
            std::slice::from_ref(&function),
            &[],
            &mut report,
        );

        assert_eq!(
            report.kinds(),
            vec![ErrorKind::MisplacedQualifier, ErrorKind::MisplacedQualifier]
        );
        let sites: Vec<_> = report.errors().map(|e| e.names()[0].to_string()).collect();
        assert_eq!(sites, vec!["function write arg size", "function write arg flags"]);
    }

    #[test]
    fn test_qualifiers_rejected_on_scalar_returns() {
        let universe = TypeUniverse::default();
        let mut pointer_return = Function::new("count").returning("uint32");
        if let Some(returns) = pointer_return.returns.as_mut() {
            returns.pointer = Some(Pointer::Mutable);
        }
        let mut owned_return = Function::new("ready").returning("bool");
        if let Some(returns) = owned_return.returns.as_mut() {
            returns.passed_with_ownership = Some(true);
        }
        let mut opaque_return = Function::new("map").returning("c_void");
        if let Some(returns) = opaque_return.returns.as_mut() {
            returns.pointer = Some(Pointer::Immutable);
        }
        let mut report = ValidationReport::new();

        ReferenceResolver::new(&universe, &[], true).resolve_all(
            &[],
            &[],
            &[pointer_return, owned_return, opaque_return],
            &[],
            &mut report,
        );

        assert_eq!(
            report.errors().cloned().collect::<Vec<_>>(),
            vec![
                ValidationError::MisplacedQualifier {
                    referenced_from: "function count returns".to_string(),
                    type_name: "uint32".to_string(),
                    qualifier: "pointer".to_string(),
                },
                ValidationError::MisplacedQualifier {
                    referenced_from: "function ready returns".to_string(),
                    type_name: "bool".to_string(),
                    qualifier: "passed_with_ownership".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_function_callback_must_name_a_callback() {
        let universe = universe_with(&[("Done", TypeKind::Callback), ("Limits", TypeKind::Struct)]);
        let functions = vec![
            Function::new("ok").with_callback("Done"),
            Function::new("bad").with_callback("Limits"),
        ];
        let mut report = ValidationReport::new();

        ReferenceResolver::new(&universe, &[], true).resolve_all(&[], &[], &functions, &[], &mut report);

        assert_eq!(
            report.errors().cloned().collect::<Vec<_>>(),
            vec![ValidationError::TypeKindMismatch {
                name: "Limits".to_string(),
                referenced_from: "function bad callback".to_string(),
                expected: TypeKind::Callback,
                found: TypeKind::Struct,
            }]
        );
    }

    #[test]
    fn test_typedef_must_alias_primitive() {
        let universe = TypeUniverse::default();
        let typedefs = vec![Typedef::new("Good", "uint32"), Typedef::new("Bad", "Limits")];
        let mut report = ValidationReport::new();

        let references =
            ReferenceResolver::new(&universe, &typedefs, true).resolve_all(&[], &[], &[], &[], &mut report);

        assert_eq!(references.len(), 1);
        assert_eq!(report.kinds(), vec![ErrorKind::InvalidTypedef]);
    }
}
