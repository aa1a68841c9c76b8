use idl_schema_core::{
    AliasPolicy, Declaration, ErrorKind, ResolvedModel, Resolver, ResolverConfig, Schema,
    Severity, TypeKind, TypeRef, ValidationError, resolve_schema, validate_schema,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn schema(document: serde_json::Value) -> Schema {
    serde_json::from_value(document).unwrap()
}

fn gpu_core() -> Schema {
    schema(json!({
        "copyright": "Copyright 2024 The Authors",
        "name": "gpu",
        "enum_prefix": "0x0000",
        "constants": [
            { "name": "whole_size", "value": "uint64_max" },
            { "name": "array_layer_count_undefined", "value": "uint32_max" }
        ],
        "typedefs": [
            { "name": "Bool", "type": "uint32" }
        ],
        "enums": [
            {
                "name": "Status",
                "entries": [
                    { "name": "success" },
                    null,
                    { "name": "error" }
                ]
            }
        ],
        "bitflags": [
            {
                "name": "BufferUsage",
                "entries": [
                    { "name": "none", "value": 0 },
                    { "name": "map_read", "value": 1 },
                    { "name": "map_write", "value": 2 },
                    { "name": "map_read_write", "value_combination": ["map_read", "map_write"] }
                ]
            }
        ],
        "callbacks": [
            {
                "name": "BufferMapCallback",
                "style": "callback_mode",
                "args": [
                    { "name": "status", "type": "Status" }
                ]
            }
        ],
        "structs": [
            {
                "name": "Limits",
                "type": "base_out",
                "members": [
                    { "name": "max_buffer_size", "type": "uint64" }
                ]
            },
            {
                "name": "BufferDescriptor",
                "type": "base_in",
                "members": [
                    { "name": "label", "type": "nullable_string" },
                    { "name": "usage", "type": "BufferUsage" },
                    { "name": "size", "type": "uint64" },
                    { "name": "mapped_at_creation", "type": "Bool" }
                ]
            },
            {
                "name": "NativeLimits",
                "type": "extension_out",
                "extends": ["Limits"],
                "members": [
                    { "name": "max_push_constant_size", "type": "uint32" }
                ]
            }
        ],
        "functions": [
            {
                "name": "create_instance",
                "returns": { "type": "Instance" }
            }
        ],
        "objects": [
            { "name": "Instance" },
            {
                "name": "Device",
                "methods": [
                    {
                        "name": "create_buffer",
                        "returns": { "type": "Buffer" },
                        "args": [
                            { "name": "descriptor", "type": "BufferDescriptor", "pointer": "immutable" }
                        ]
                    },
                    {
                        "name": "get_limits",
                        "args": [
                            { "name": "limits", "type": "struct.Limits", "pointer": "mutable" }
                        ]
                    }
                ]
            },
            {
                "name": "Buffer",
                "methods": [
                    {
                        "name": "map_async",
                        "callback": "BufferMapCallback",
                        "args": [
                            { "name": "mode", "type": "BufferUsage" }
                        ]
                    }
                ]
            }
        ]
    }))
}

fn gpu_extension() -> Schema {
    schema(json!({
        "name": "gpu_native",
        "enum_prefix": "0x0001",
        "enums": [
            { "name": "Status", "extended": true, "entries": [ { "name": "device_lost" } ] }
        ],
        "bitflags": [
            {
                "name": "BufferUsage",
                "extended": true,
                "entries": [ { "name": "storage", "value": 128 } ]
            }
        ],
        "objects": [
            {
                "name": "Device",
                "extended": true,
                "methods": [ { "name": "poll" } ]
            }
        ]
    }))
}

fn resolve_gpu() -> ResolvedModel {
    Resolver::default()
        .resolve(&[gpu_core(), gpu_extension()])
        .into_result()
        .unwrap()
}

// ---------------------------------------------------------------------------
// Clean documents
// ---------------------------------------------------------------------------

#[test]
fn test_clean_document_has_empty_report() {
    let resolution = Resolver::default().resolve(&[gpu_core(), gpu_extension()]);
    assert!(resolution.is_clean(), "{:?}", resolution.report().records());
    assert!(resolution.model().is_some());
}

#[test]
fn test_every_reference_is_classified() {
    let model = resolve_gpu();

    for reference in model.references() {
        match reference.target {
            TypeRef::Primitive(_) => {}
            TypeRef::Declared(decl) | TypeRef::ArrayOf(decl) => {
                assert!(model.declaration(decl).is_some(), "{}", reference.site);
            }
        }
    }

    let descriptor = model
        .references()
        .iter()
        .find(|r| r.site == "object Device method create_buffer arg descriptor")
        .unwrap();
    assert_eq!(descriptor.target.kind(), Some(TypeKind::Struct));
    assert!(matches!(model.lookup("Bool"), Some(Declaration::Typedef(_))));
}

#[test]
fn test_constants_resolve_sentinels() {
    let model = resolve_gpu();
    assert_eq!(model.constant_value("whole_size"), Some(u64::MAX));
    assert_eq!(
        model.constant_value("array_layer_count_undefined"),
        Some(u64::from(u32::MAX))
    );
}

// ---------------------------------------------------------------------------
// Merging across fragments
// ---------------------------------------------------------------------------

#[test]
fn test_extended_declarations_append_in_order() {
    let model = resolve_gpu();

    assert_eq!(
        model.merged_entries("Status").unwrap().names(),
        vec!["success", "error", "device_lost"]
    );
    assert_eq!(
        model.merged_entries("Device").unwrap().names(),
        vec!["create_buffer", "get_limits", "poll"]
    );
    assert_eq!(model.resolved_value("BufferUsage", "storage"), Some(128));
    assert_eq!(model.resolved_value("BufferUsage", "map_read_write"), Some(3));
}

#[test]
fn test_enum_values_are_numbered_per_prefix() {
    let model = resolve_gpu();

    assert_eq!(model.resolved_enum_value("Status", "success"), Some(0));
    assert_eq!(model.resolved_enum_value("Status", "error"), Some(2));
    assert_eq!(model.qualified_enum_value("Status", "device_lost"), Some(0x0001_0000));
}

#[test]
fn test_fragments_with_same_prefix_continue_numbering() {
    let core = schema(json!({
        "name": "core",
        "enum_prefix": "0x0000",
        "enums": [ { "name": "Status", "entries": [ { "name": "ok" } ] } ]
    }));
    let ext = schema(json!({
        "name": "ext",
        "enum_prefix": "0x0000",
        "enums": [ { "name": "Status", "extended": true, "entries": [ { "name": "retry" } ] } ]
    }));

    let resolution = Resolver::default().resolve(&[core, ext]);
    assert!(resolution.is_clean(), "{:?}", resolution.report().records());
    let model = resolution.into_result().unwrap();
    assert_eq!(model.merged_entries("Status").unwrap().names(), vec!["ok", "retry"]);
    assert_eq!(model.resolved_enum_value("Status", "retry"), Some(1));
}

#[test]
fn test_struct_name_collision_is_reported_once() {
    let report = validate_schema(&schema(json!({
        "name": "collision",
        "enum_prefix": "0x0000",
        "enums": [ { "name": "Limits", "entries": [] } ],
        "structs": [
            { "name": "Limits", "type": "base_out" },
            { "name": "Native", "type": "extension_out", "extends": ["Limits"] }
        ]
    })));

    assert_eq!(report.kinds(), vec![ErrorKind::DuplicateName]);
}

#[test]
fn test_extension_before_base_is_rejected() {
    let report = Resolver::default()
        .resolve(&[gpu_extension(), gpu_core()])
        .into_result()
        .unwrap_err();

    let merge_names: Vec<_> = report
        .errors()
        .filter_map(|e| match e {
            ValidationError::MergeOrder { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(merge_names, vec!["Status", "BufferUsage", "Device"]);
}

// ---------------------------------------------------------------------------
// Struct chains
// ---------------------------------------------------------------------------

#[test]
fn test_chain_queries() {
    let model = resolve_gpu();
    assert_eq!(model.legal_bases("NativeLimits"), vec!["Limits"]);
    assert_eq!(model.chainable_extensions("Limits"), vec!["NativeLimits"]);
    assert!(model.chainable_extensions("BufferDescriptor").is_empty());
    assert_eq!(
        model.resolved_members("NativeLimits").unwrap()[0].name,
        "max_push_constant_size"
    );
}

#[test]
fn test_out_extension_on_in_base_is_rejected() {
    let report = validate_schema(&schema(json!({
        "name": "chains",
        "enum_prefix": "0x0000",
        "structs": [
            { "name": "SomeBaseIn", "type": "base_in" },
            { "name": "Ext", "type": "extension_out", "extends": ["SomeBaseIn"] }
        ]
    })));

    assert_eq!(report.kinds(), vec![ErrorKind::IncompatibleChainDirection]);
    assert_eq!(report.records()[0].names, vec!["Ext", "SomeBaseIn"]);
}

// ---------------------------------------------------------------------------
// Bitflags
// ---------------------------------------------------------------------------

#[test]
fn test_bitflag_combination() {
    let model = resolve_schema(&schema(json!({
        "name": "flags",
        "enum_prefix": "0x0000",
        "bitflags": [
            {
                "name": "Flags",
                "entries": [
                    { "name": "a", "value": 1 },
                    { "name": "b", "value": 2 },
                    { "name": "c", "value_combination": ["a", "b"] }
                ]
            }
        ]
    })))
    .unwrap();

    assert_eq!(model.resolved_value("Flags", "c"), Some(3));
}

#[test]
fn test_bitflag_cycle_is_reported_with_path() {
    let report = validate_schema(&schema(json!({
        "name": "flags",
        "enum_prefix": "0x0000",
        "bitflags": [
            {
                "name": "Flags",
                "entries": [
                    { "name": "x", "value_combination": ["y"] },
                    { "name": "y", "value_combination": ["x"] }
                ]
            }
        ]
    })));

    assert_eq!(report.kinds(), vec![ErrorKind::CyclicBitflagCombination]);
    assert_eq!(
        report.records()[0].message,
        "bitflag 'Flags' has a cyclic value_combination: x -> y -> x"
    );
}

#[test]
fn test_bitflag_alias_severity_is_configurable() {
    let document = schema(json!({
        "name": "flags",
        "enum_prefix": "0x0000",
        "bitflags": [
            {
                "name": "Usage",
                "entries": [
                    { "name": "copy_src", "value": 4 },
                    { "name": "transfer_src", "value": 4 }
                ]
            }
        ]
    }));

    let warned = Resolver::default().resolve_one(&document);
    assert_eq!(warned.report().records()[0].severity, Severity::Warning);
    assert!(warned.model().is_some());

    let config = ResolverConfig::from_yaml_str("bitflag_aliases: deny").unwrap();
    assert_eq!(config.bitflag_aliases, AliasPolicy::Deny);
    let denied = Resolver::new(config).resolve_one(&document);
    assert_eq!(denied.report().records()[0].severity, Severity::Error);
    assert!(denied.model().is_none());
}

// ---------------------------------------------------------------------------
// Error collection
// ---------------------------------------------------------------------------

#[test]
fn test_all_unknown_references_are_reported() {
    let report = validate_schema(&schema(json!({
        "name": "dangling",
        "enum_prefix": "0x0000",
        "structs": [
            {
                "name": "Desc",
                "type": "standalone",
                "members": [
                    { "name": "a", "type": "Missing1" },
                    { "name": "b", "type": "Missing2" }
                ]
            }
        ],
        "functions": [
            { "name": "f", "args": [ { "name": "c", "type": "Missing3" } ] }
        ],
        "objects": [
            {
                "name": "Device",
                "methods": [
                    { "name": "g", "returns": { "type": "Missing4" } },
                    { "name": "h", "callback": "Missing5" }
                ]
            }
        ]
    })));

    assert_eq!(report.error_count(), 5);
    let missing: Vec<_> = report.records().into_iter().map(|r| r.names[0].clone()).collect();
    assert_eq!(
        missing,
        vec!["Missing1", "Missing2", "Missing3", "Missing4", "Missing5"]
    );
    assert!(report
        .iter()
        .all(|d| d.error.kind() == ErrorKind::UnknownTypeReference));
}

#[test]
fn test_one_error_of_each_kind_is_reported() {
    let document = schema(json!({
        "name": "everything_wrong",
        "enum_prefix": "0x0000",
        "enums": [
            { "name": "Status", "extended": true, "entries": [ { "name": "retry" } ] }
        ],
        "bitflags": [
            {
                "name": "Flags",
                "entries": [
                    { "name": "a", "value": 1 },
                    { "name": "b", "value": 1 },
                    { "name": "x", "value_combination": ["y"] },
                    { "name": "y", "value_combination": ["x"] }
                ]
            }
        ],
        "structs": [
            {
                "name": "A",
                "type": "standalone",
                "members": [ { "name": "ghost", "type": "Ghost" } ]
            },
            { "name": "Dup", "type": "standalone" },
            { "name": "Dup", "type": "standalone" },
            { "name": "In", "type": "base_in" },
            { "name": "Out", "type": "extension_out", "extends": ["In"] },
            { "name": "Lost", "type": "extension_in", "extends": ["Nowhere"] },
            { "name": "Orphan", "type": "extension_in" }
        ]
    }));

    let config = ResolverConfig::default().with_bitflag_aliases(AliasPolicy::Deny);
    let report = Resolver::new(config).resolve_one(&document).into_report();

    assert_eq!(
        report.kinds(),
        vec![
            ErrorKind::MergeOrder,
            ErrorKind::DuplicateName,
            ErrorKind::UnknownTypeReference,
            ErrorKind::IncompatibleChainDirection,
            ErrorKind::UnknownBaseStruct,
            ErrorKind::MisplacedExtends,
            ErrorKind::CyclicBitflagCombination,
            ErrorKind::DuplicateBitflagValue,
        ]
    );
    assert_eq!(report.error_count(), 8);
}

#[test]
fn test_mixed_errors_are_all_collected() {
    let report = validate_schema(&schema(json!({
        "name": "mixed",
        "enum_prefix": "0xZZZZ",
        "typedefs": [
            { "name": "Alias", "type": "Device" },
            { "name": "uint32", "type": "uint32" }
        ],
        "enums": [
            { "name": "Mode", "entries": [ { "name": "a", "value": 70000 } ] },
            { "name": "Device", "entries": [] }
        ],
        "structs": [
            {
                "name": "Desc",
                "type": "standalone",
                "members": [
                    { "name": "count", "type": "uint32", "ownership": "with" },
                    { "name": "count", "type": "enum.Desc" }
                ]
            }
        ],
        "objects": [
            { "name": "Device" }
        ]
    })));

    assert_eq!(
        report.kinds(),
        vec![
            ErrorKind::InvalidEnumPrefix,
            ErrorKind::DuplicateName,
            ErrorKind::DuplicateName,
            ErrorKind::DuplicateName,
            ErrorKind::InvalidTypedef,
            ErrorKind::MisplacedQualifier,
            ErrorKind::TypeKindMismatch,
            ErrorKind::InvalidValue,
        ]
    );
}

#[test]
fn test_negative_values_are_reported() {
    let report = validate_schema(&schema(json!({
        "name": "values",
        "enum_prefix": "0x0000",
        "constants": [ { "name": "bad", "value": -1 } ],
        "bitflags": [
            { "name": "Flags", "entries": [ { "name": "neg", "value": -8 } ] }
        ]
    })));

    assert_eq!(
        report.kinds(),
        vec![ErrorKind::InvalidValue, ErrorKind::InvalidValue]
    );
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

#[test]
fn test_resolution_is_deterministic() {
    let resolver = Resolver::default();
    let first = resolver.resolve(&[gpu_core(), gpu_extension()]);
    let second = resolver.resolve(&[gpu_core(), gpu_extension()]);

    assert_eq!(first.report(), second.report());
    assert_eq!(
        first.partial_model().to_json_pretty().unwrap(),
        second.partial_model().to_json_pretty().unwrap()
    );

    let broken = schema(json!({
        "name": "broken",
        "enum_prefix": "0x0000",
        "structs": [
            { "name": "A", "type": "extension_in", "extends": ["B", "C"] },
            { "name": "B", "type": "base_out" }
        ]
    }));
    assert_eq!(
        serde_json::to_string(&validate_schema(&broken)).unwrap(),
        serde_json::to_string(&validate_schema(&broken)).unwrap()
    );
}
