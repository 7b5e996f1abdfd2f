//! Import resolution: split fully-qualified type strings into the path the
//! generated file must import and the name it can then use locally.
//!
//! `&app::models::User` decomposes to import `app::models` and local type
//! `&models::User`; the last `::` is the type qualifier, earlier ones are
//! path separators.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::diagnostics::GenError;

const SEP: &str = "::";

/// Shape of a type string, judged on its head (the text before any `<`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypePath {
    /// `String`, `u64`, `Vec<T>`: nothing to import.
    Unqualified,
    /// `serde_json::Value`: a crate name and a type.
    SingleSegmentQualified,
    /// `app::models::User`: a module path and a type.
    PathQualified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decomposed {
    pub import_path: String,
    pub local_type_name: String,
}

impl TypePath {
    pub fn classify(ty: &str) -> TypePath {
        let (_, bare) = split_sigil(ty);
        match head(bare).matches(SEP).count() {
            0 => TypePath::Unqualified,
            1 => TypePath::SingleSegmentQualified,
            _ => TypePath::PathQualified,
        }
    }

    pub fn decompose(self, ty: &str) -> Decomposed {
        match self {
            TypePath::Unqualified => unqualified(ty),
            TypePath::SingleSegmentQualified => single_segment(ty),
            TypePath::PathQualified => path_qualified(ty),
        }
    }
}

/// Total over all inputs. Decomposing a local type name yields it unchanged.
pub fn decompose(ty: &str) -> Decomposed {
    TypePath::classify(ty).decompose(ty)
}

fn unqualified(ty: &str) -> Decomposed {
    Decomposed { import_path: String::new(), local_type_name: ty.to_string() }
}

fn single_segment(ty: &str) -> Decomposed {
    let (_, bare) = split_sigil(ty);
    let crate_name = head(bare).split(SEP).next().unwrap_or_default();
    Decomposed { import_path: crate_name.to_string(), local_type_name: ty.to_string() }
}

fn path_qualified(ty: &str) -> Decomposed {
    let (sigil, bare) = split_sigil(ty);
    let head = head(bare);
    let Some(qualifier) = head.rfind(SEP) else {
        return unqualified(ty);
    };
    let module_path = &head[..qualifier];
    let module_start = module_path.rfind(SEP).map(|i| i + SEP.len()).unwrap_or(0);
    Decomposed {
        import_path: module_path.to_string(),
        local_type_name: format!("{sigil}{}", &bare[module_start..]),
    }
}

/// Split a leading `&` or `&mut ` off a type string.
pub fn split_sigil(ty: &str) -> (&str, &str) {
    if let Some(rest) = ty.strip_prefix("&mut ") {
        ("&mut ", rest)
    } else if let Some(rest) = ty.strip_prefix('&') {
        ("&", rest)
    } else {
        ("", ty)
    }
}

fn head(ty: &str) -> &str {
    match ty.find('<') {
        Some(i) => &ty[..i],
        None => ty,
    }
}

fn is_path_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == ':'
}

/// Decompose every path embedded in a composite type string.
///
/// `Vec<app::models::User>` becomes `Vec<models::User>` with import
/// `app::models`. Returns the localized text and the import paths found,
/// in order of appearance.
pub fn localize(ty: &str) -> (String, Vec<String>) {
    let mut out = String::with_capacity(ty.len());
    let mut imports = Vec::new();
    let mut rest = ty;
    while let Some(start) = rest.find(is_path_char) {
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        let end = rest.find(|c: char| !is_path_char(c)).unwrap_or(rest.len());
        let token = &rest[..end];
        let decomposed = decompose(token);
        if !decomposed.import_path.is_empty() {
            imports.push(decomposed.import_path);
        }
        out.push_str(&decomposed.local_type_name);
        rest = &rest[end..];
    }
    out.push_str(rest);
    (out, imports)
}

/// Deduplicated import paths of the generated file, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ImportSet(BTreeSet<String>);

impl ImportSet {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Turns oracle type strings into text usable from the generated module,
/// accumulating the imports that text needs.
#[derive(Debug)]
pub struct ImportResolver {
    crate_name: String,
    same_crate: bool,
    /// Import path of the context type, declared by the template.
    context_import: String,
    excluded: BTreeSet<String>,
    imports: ImportSet,
}

impl ImportResolver {
    /// `context_type` is imported by the template itself and `genmod` is the
    /// output module, so neither ends up in the set.
    pub fn new(crate_name: &str, same_crate: bool, context_type: &str, genmod: &str) -> Self {
        let mut resolver = Self {
            crate_name: crate_name.to_string(),
            same_crate,
            context_import: String::new(),
            excluded: BTreeSet::new(),
            imports: ImportSet::default(),
        };
        resolver.context_import = resolver.context(context_type).import_path;
        resolver.excluded.extend([
            String::new(),
            "crate".to_string(),
            resolver.context_import.clone(),
            format!("crate::{genmod}"),
            format!("{crate_name}::{genmod}"),
        ]);
        resolver
    }

    /// Decomposed context type, rerooted like every other crate-local path.
    pub fn context(&self, context_type: &str) -> Decomposed {
        decompose(&self.reroot(context_type))
    }

    /// Reroot crate-local paths at `crate` when generating into the same crate.
    pub fn reroot(&self, ty: &str) -> String {
        if !self.same_crate {
            return ty.to_string();
        }
        let mut out = String::with_capacity(ty.len());
        let mut rest = ty;
        while let Some(start) = rest.find(is_path_char) {
            out.push_str(&rest[..start]);
            rest = &rest[start..];
            let end = rest.find(|c: char| !is_path_char(c)).unwrap_or(rest.len());
            let token = &rest[..end];
            match token.strip_prefix(self.crate_name.as_str()) {
                Some(tail) if tail.starts_with(SEP) => {
                    out.push_str("crate");
                    out.push_str(tail);
                }
                _ => out.push_str(token),
            }
            rest = &rest[end..];
        }
        out.push_str(rest);
        out
    }

    /// Local form of `ty`, recording its imports. The returned import path is
    /// that of the first qualified path in `ty`.
    pub fn resolve(&mut self, ty: &str) -> Decomposed {
        let rerooted = self.reroot(ty);
        let (local, found) = localize(&rerooted);
        let import_path = found.first().cloned().unwrap_or_default();
        for path in found {
            if !self.excluded.contains(&path) {
                self.imports.0.insert(path);
            }
        }
        Decomposed { import_path, local_type_name: local }
    }

    /// The collected imports. Two `use` declarations binding the same local
    /// name (`a::models`, `b::models`) cannot both be emitted.
    pub fn finish(self) -> Result<ImportSet, GenError> {
        let declared = std::iter::once(self.context_import.as_str())
            .chain(self.imports.iter())
            .filter(|path| path.contains(SEP));
        let mut bound: BTreeMap<&str, &str> = BTreeMap::new();
        for path in declared {
            let name = path.rsplit(SEP).next().unwrap_or(path);
            if let Some(previous) = bound.insert(name, path) {
                return Err(GenError::signature(format!(
                    "imports `{previous}` and `{path}` both bind `{name}` in the generated module"
                )));
            }
        }
        Ok(self.imports)
    }
}
