//! Per-module name resolution: the table that lets the loader answer
//! "what is the fully-qualified name of this type, as written here?".

use std::collections::{BTreeMap, BTreeSet};

use syn::{Item, UseTree};

/// Types that resolve to themselves without any import.
const PRELUDE: &[&str] = &[
    "bool", "char", "str", "u8", "u16", "u32", "u64", "u128", "usize", "i8", "i16", "i32",
    "i64", "i128", "isize", "f32", "f64", "String", "Vec", "Option", "Result", "Box",
];

pub fn is_prelude(name: &str) -> bool {
    PRELUDE.contains(&name)
}

/// Names visible at the top level of one module.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Scope {
    /// Name brought in by `use`, mapped to its canonical path.
    pub imports: BTreeMap<String, Vec<String>>,
    /// Canonical targets of `use path::*`.
    pub globs: Vec<Vec<String>>,
    /// Types, traits and child modules declared directly in the module.
    pub declared: BTreeSet<String>,
}

impl Scope {
    /// Build the scope of the module at `module_path` (crate name first).
    pub fn collect(module_path: &[String], items: &[Item]) -> Self {
        let mut scope = Scope::default();
        for item in items {
            let name = match item {
                Item::Struct(i) => Some(&i.ident),
                Item::Enum(i) => Some(&i.ident),
                Item::Union(i) => Some(&i.ident),
                Item::Type(i) => Some(&i.ident),
                Item::Trait(i) => Some(&i.ident),
                Item::Mod(i) => Some(&i.ident),
                _ => None,
            };
            if let Some(ident) = name {
                scope.declared.insert(ident.to_string());
            }
        }

        let mut raw = Vec::new();
        for item in items {
            if let Item::Use(item_use) = item {
                let absolute = item_use.leading_colon.is_some();
                collect_use_tree(&item_use.tree, &mut Vec::new(), absolute, &mut raw);
            }
        }

        for entry in &raw {
            let target = if entry.absolute {
                entry.path.clone()
            } else {
                root_path(&entry.path, module_path, &scope.declared)
            };
            match &entry.alias {
                Some(alias) => {
                    scope.imports.insert(alias.clone(), target);
                }
                None => scope.globs.push(target),
            }
        }

        // `use a::b; use b::C;`: the second import is relative to the first.
        let snapshot = scope.imports.clone();
        for (alias, target) in scope.imports.iter_mut() {
            if let Some(first) = target.first() {
                if first != alias {
                    if let Some(base) = snapshot.get(first) {
                        let mut expanded = base.clone();
                        expanded.extend(target.iter().skip(1).cloned());
                        *target = expanded;
                    }
                }
            }
        }
        scope
    }
}

struct RawUse {
    /// `None` for a glob.
    alias: Option<String>,
    path: Vec<String>,
    absolute: bool,
}

fn collect_use_tree(tree: &UseTree, prefix: &mut Vec<String>, absolute: bool, out: &mut Vec<RawUse>) {
    match tree {
        UseTree::Path(p) => {
            prefix.push(p.ident.to_string());
            collect_use_tree(&p.tree, prefix, absolute, out);
            prefix.pop();
        }
        UseTree::Name(n) => {
            let name = n.ident.to_string();
            if name == "self" {
                if let Some(last) = prefix.last() {
                    out.push(RawUse { alias: Some(last.clone()), path: prefix.clone(), absolute });
                }
            } else {
                let mut path = prefix.clone();
                path.push(name.clone());
                out.push(RawUse { alias: Some(name), path, absolute });
            }
        }
        UseTree::Rename(r) => {
            let alias = r.rename.to_string();
            if alias == "_" {
                return;
            }
            let mut path = prefix.clone();
            if r.ident != "self" {
                path.push(r.ident.to_string());
            }
            out.push(RawUse { alias: Some(alias), path, absolute });
        }
        UseTree::Glob(_) => {
            out.push(RawUse { alias: None, path: prefix.clone(), absolute });
        }
        UseTree::Group(g) => {
            for tree in &g.items {
                collect_use_tree(tree, prefix, absolute, out);
            }
        }
    }
}

/// Anchor a relative path at its crate: `crate`, `self` and `super` are
/// expanded, names declared in the current module are prefixed with it, and
/// anything else is taken as already rooted at an external crate.
pub fn root_path(segments: &[String], module_path: &[String], declared: &BTreeSet<String>) -> Vec<String> {
    let Some(first) = segments.first() else {
        return Vec::new();
    };
    match first.as_str() {
        "crate" => {
            let mut out: Vec<String> = module_path.iter().take(1).cloned().collect();
            out.extend(segments[1..].iter().cloned());
            out
        }
        "self" => {
            let mut out = module_path.to_vec();
            out.extend(segments[1..].iter().cloned());
            out
        }
        "super" => {
            let mut base = module_path.to_vec();
            let mut rest = segments;
            while rest.first().is_some_and(|s| s == "super") {
                if base.len() > 1 {
                    base.pop();
                }
                rest = &rest[1..];
            }
            base.extend(rest.iter().cloned());
            base
        }
        name if declared.contains(name) => {
            let mut out = module_path.to_vec();
            out.extend(segments.iter().cloned());
            out
        }
        _ => segments.to_vec(),
    }
}
