//! Bitflag value resolution.
//!
//! Entries of one (merged) bitflag form a dependency graph: a
//! `value_combination` entry depends on the siblings it names. Values are
//! computed in topological order (Kahn's algorithm); whatever cannot be
//! ordered lies on or behind a cycle, and each cycle is reported once with
//! its full path.
//!
//! # Example
//!
//! ```
//! use idl_schema_core::*;
//!
//! let mut schema = Schema::new("demo");
//! schema.bitflags.push(
//!     Bitflag::new("Flags")
//!         .with_value("a", 1)
//!         .with_value("b", 2)
//!         .with_combination("c", &["a", "b"]),
//! );
//!
//! let model = resolve_schema(&schema).unwrap();
//! assert_eq!(model.resolved_value("Flags", "c"), Some(3));
//! ```

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::config::AliasPolicy;
use crate::merge::MergeGroup;
use crate::report::{ValidationError, ValidationReport};
use crate::types::{Bitflag, BitflagEntry};
use crate::universe::{NameKind, check_unique};

/// A bitflag entry with its resolved mask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedBitflagEntry {
    pub name: String,
    pub doc: String,
    /// `None` only when resolution failed (and was reported).
    pub value: Option<u64>,
    /// Sibling names this entry was combined from; empty for literals.
    pub combination: Vec<String>,
}

/// A merged bitflag with resolved entry values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedBitflag {
    pub name: String,
    pub doc: String,
    pub entries: Vec<ResolvedBitflagEntry>,
}

impl ResolvedBitflag {
    /// Finds an entry by name.
    pub fn entry(&self, name: &str) -> Option<&ResolvedBitflagEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Resolved mask of an entry.
    pub fn value_of(&self, name: &str) -> Option<u64> {
        self.entry(name).and_then(|e| e.value)
    }
}

enum Node {
    Literal(Option<u64>),
    Combination(Vec<usize>),
    Unresolvable,
}

/// Resolves every entry value of one merged bitflag.
pub(crate) fn resolve_bitflag(
    group: &MergeGroup<'_, Bitflag>,
    pointer_width: u32,
    aliases: AliasPolicy,
    report: &mut ValidationReport,
) -> ResolvedBitflag {
    let head = group.head();
    let entries: Vec<&BitflagEntry> = group
        .parts
        .iter()
        .flat_map(|part| part.decl.entries.iter())
        .collect();

    check_unique(
        NameKind::BitflagEntry,
        Some(&head.name),
        entries.iter().map(|e| e.name.as_str()),
        report,
    );

    let mut index_of: HashMap<&str, usize> = HashMap::new();
    for (index, entry) in entries.iter().enumerate() {
        index_of.entry(entry.name.as_str()).or_insert(index);
    }

    let nodes: Vec<Node> = entries
        .iter()
        .map(|entry| build_node(&head.name, entry, &index_of, pointer_width, report))
        .collect();

    let values = evaluate(&head.name, &entries, &nodes, report);

    if aliases != AliasPolicy::Allow {
        report_duplicates(&head.name, &entries, &values, aliases, report);
    }

    ResolvedBitflag {
        name: head.name.clone(),
        doc: head.doc.clone(),
        entries: entries
            .iter()
            .zip(values)
            .map(|(entry, value)| ResolvedBitflagEntry {
                name: entry.name.clone(),
                doc: entry.doc.clone(),
                value,
                combination: entry.value_combination.clone().unwrap_or_default(),
            })
            .collect(),
    }
}

fn build_node(
    bitflag: &str,
    entry: &BitflagEntry,
    index_of: &HashMap<&str, usize>,
    pointer_width: u32,
    report: &mut ValidationReport,
) -> Node {
    match (&entry.value, &entry.value_combination) {
        (Some(value), None) => match value.resolve(pointer_width) {
            Ok(value) => Node::Literal(Some(value)),
            Err(negative) => {
                report.error(ValidationError::InvalidValue {
                    owner: format!("bitflag {bitflag} entry {}", entry.name),
                    value: negative.to_string(),
                    reason: "bitflag values must be non-negative".to_string(),
                });
                Node::Literal(None)
            }
        },
        (None, Some(parts)) if !parts.is_empty() => {
            let mut deps = Vec::with_capacity(parts.len());
            let mut complete = true;
            for part in parts {
                match index_of.get(part.as_str()) {
                    Some(&dep) => deps.push(dep),
                    None => {
                        report.error(ValidationError::UnknownCombinationEntry {
                            bitflag: bitflag.to_string(),
                            entry: entry.name.clone(),
                            missing: part.clone(),
                        });
                        complete = false;
                    }
                }
            }
            if complete {
                Node::Combination(deps)
            } else {
                Node::Unresolvable
            }
        }
        _ => {
            report.error(ValidationError::MalformedBitflagEntry {
                bitflag: bitflag.to_string(),
                entry: entry.name.clone(),
            });
            Node::Unresolvable
        }
    }
}

/// Computes values in dependency order and reports cycles.
///
/// Entries depending on an unresolved entry stay unresolved without a
/// further diagnostic.
fn evaluate(
    bitflag: &str,
    entries: &[&BitflagEntry],
    nodes: &[Node],
    report: &mut ValidationReport,
) -> Vec<Option<u64>> {
    let count = nodes.len();
    let mut indegree = vec![0usize; count];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (index, node) in nodes.iter().enumerate() {
        if let Node::Combination(deps) = node {
            indegree[index] = deps.len();
            for &dep in deps {
                dependents[dep].push(index);
            }
        }
    }

    let mut values: Vec<Option<u64>> = vec![None; count];
    let mut done = vec![false; count];
    let mut queue: VecDeque<usize> = (0..count).filter(|&i| indegree[i] == 0).collect();
    while let Some(index) = queue.pop_front() {
        let value = match &nodes[index] {
            Node::Literal(value) => *value,
            Node::Unresolvable => None,
            Node::Combination(deps) => deps
                .iter()
                .try_fold(0u64, |mask, &dep| values[dep].map(|value| mask | value)),
        };
        values[index] = value;
        done[index] = true;
        for &dependent in &dependents[index] {
            indegree[dependent] -= 1;
            if indegree[dependent] == 0 {
                queue.push_back(dependent);
            }
        }
    }

    report_cycles(bitflag, entries, nodes, &done, report);
    values
}

// Every entry left undone is a combination with at least one undone
// dependency, so following undone dependencies always ends on a repeat.
fn report_cycles(
    bitflag: &str,
    entries: &[&BitflagEntry],
    nodes: &[Node],
    done: &[bool],
    report: &mut ValidationReport,
) {
    let mut visited = vec![false; nodes.len()];
    for start in 0..nodes.len() {
        if done[start] || visited[start] {
            continue;
        }

        let mut path: Vec<usize> = Vec::new();
        let mut position: HashMap<usize, usize> = HashMap::new();
        let mut current = start;
        loop {
            if let Some(&at) = position.get(&current) {
                let cycle_path = path[at..]
                    .iter()
                    .chain(std::iter::once(&current))
                    .map(|&i| entries[i].name.clone())
                    .collect();
                report.error(ValidationError::CyclicBitflagCombination {
                    bitflag: bitflag.to_string(),
                    cycle_path,
                });
                break;
            }
            if visited[current] {
                break;
            }
            visited[current] = true;
            position.insert(current, path.len());
            path.push(current);

            let Node::Combination(deps) = &nodes[current] else {
                break;
            };
            match deps.iter().copied().find(|&dep| !done[dep]) {
                Some(next) => current = next,
                None => break,
            }
        }
    }
}

fn report_duplicates(
    bitflag: &str,
    entries: &[&BitflagEntry],
    values: &[Option<u64>],
    aliases: AliasPolicy,
    report: &mut ValidationReport,
) {
    let mut first_with: HashMap<u64, usize> = HashMap::new();
    for (index, value) in values.iter().enumerate() {
        let Some(value) = *value else {
            continue;
        };
        let Some(&first) = first_with.get(&value) else {
            first_with.insert(value, index);
            continue;
        };
        let error = ValidationError::DuplicateBitflagValue {
            bitflag: bitflag.to_string(),
            first: entries[first].name.clone(),
            second: entries[index].name.clone(),
            value,
        };
        if aliases == AliasPolicy::Deny {
            report.error(error);
        } else {
            report.warning(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::merge::Located;
    use crate::report::{ErrorKind, Severity};
    use crate::types::{Value64, ValueSymbol};

    use super::*;

    fn resolve(bitflag: &Bitflag, aliases: AliasPolicy) -> (ResolvedBitflag, ValidationReport) {
        let group = MergeGroup {
            name: bitflag.name.as_str(),
            parts: vec![Located {
                fragment: 0,
                decl: bitflag,
            }],
        };
        let mut report = ValidationReport::new();
        let resolved = resolve_bitflag(&group, 64, aliases, &mut report);
        (resolved, report)
    }

    #[test]
    fn test_combination_ors_dependencies() {
        let flags = Bitflag::new("Flags")
            .with_combination("c", &["a", "b"])
            .with_value("a", 1)
            .with_value("b", 2)
            .with_combination("all", &["c", "d"])
            .with_value("d", 8);

        let (resolved, report) = resolve(&flags, AliasPolicy::Warn);
        assert!(report.is_empty());
        assert_eq!(resolved.value_of("c"), Some(3));
        assert_eq!(resolved.value_of("all"), Some(11));
        assert_eq!(resolved.entry("all").unwrap().combination, vec!["c", "d"]);
    }

    #[test]
    fn test_two_node_cycle_reports_path() {
        let flags = Bitflag::new("Flags")
            .with_combination("x", &["y"])
            .with_combination("y", &["x"]);

        let (resolved, report) = resolve(&flags, AliasPolicy::Warn);
        assert_eq!(resolved.value_of("x"), None);
        assert_eq!(
            report.errors().cloned().collect::<Vec<_>>(),
            vec![ValidationError::CyclicBitflagCombination {
                bitflag: "Flags".to_string(),
                cycle_path: vec!["x".to_string(), "y".to_string(), "x".to_string()],
            }]
        );
    }

    #[test]
    fn test_self_reference_and_downstream_entries() {
        let flags = Bitflag::new("Flags")
            .with_value("a", 1)
            .with_combination("loop", &["loop"])
            .with_combination("after", &["a", "loop"]);

        let (resolved, report) = resolve(&flags, AliasPolicy::Warn);
        assert_eq!(resolved.value_of("a"), Some(1));
        assert_eq!(resolved.value_of("after"), None);
        assert_eq!(report.kinds(), vec![ErrorKind::CyclicBitflagCombination]);
        assert_eq!(
            report.errors().next().unwrap().names(),
            vec!["Flags", "loop", "loop"]
        );
    }

    #[test]
    fn test_unknown_and_malformed_entries() {
        let mut flags = Bitflag::new("Flags")
            .with_value("a", 1)
            .with_combination("b", &["a", "ghost"]);
        flags.entries.push(BitflagEntry {
            name: "neither".to_string(),
            doc: String::new(),
            value: None,
            value_combination: None,
        });
        flags.entries.push(BitflagEntry {
            name: "negative".to_string(),
            doc: String::new(),
            value: Some(Value64::Signed(-2)),
            value_combination: None,
        });

        let (resolved, report) = resolve(&flags, AliasPolicy::Warn);
        assert_eq!(resolved.value_of("b"), None);
        assert_eq!(
            report.kinds(),
            vec![
                ErrorKind::UnknownCombinationEntry,
                ErrorKind::MalformedBitflagEntry,
                ErrorKind::InvalidValue,
            ]
        );
    }

    #[test]
    fn test_empty_combination_is_malformed() {
        let flags = Bitflag::new("Flags")
            .with_value("a", 1)
            .with_combination("nothing", &[]);

        let (resolved, report) = resolve(&flags, AliasPolicy::Warn);
        assert_eq!(resolved.value_of("nothing"), None);
        assert_eq!(
            report.errors().cloned().collect::<Vec<_>>(),
            vec![ValidationError::MalformedBitflagEntry {
                bitflag: "Flags".to_string(),
                entry: "nothing".to_string(),
            }]
        );
    }

    #[test]
    fn test_duplicate_values_follow_alias_policy() {
        let flags = Bitflag::new("Usage")
            .with_value("copy", 4)
            .with_value("copy_legacy", 4);

        let (_, warned) = resolve(&flags, AliasPolicy::Warn);
        assert_eq!(warned.warning_count(), 1);
        assert!(!warned.has_errors());

        let (_, denied) = resolve(&flags, AliasPolicy::Deny);
        assert_eq!(denied.iter().next().unwrap().severity, Severity::Error);

        let (_, allowed) = resolve(&flags, AliasPolicy::Allow);
        assert!(allowed.is_empty());
    }

    #[test]
    fn test_sentinel_values_resolve() {
        let flags =
            Bitflag::new("Flags").with_value64("all", Value64::Symbol(ValueSymbol::Uint32Max));

        let (resolved, report) = resolve(&flags, AliasPolicy::Warn);
        assert!(report.is_empty());
        assert_eq!(resolved.value_of("all"), Some(u64::from(u32::MAX)));
    }
}
