//! Package loader: reads a crate's manifest, walks its module tree, parses
//! every file with `syn`, and exposes a type oracle that maps any type
//! written in the crate to its fully-qualified textual form.

pub mod scope;

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use quote::ToTokens;
use syn::{GenericArgument, Item, PathArguments, Type};
use tracing::debug;

use crate::diagnostics::{GenError, LoadError};
use crate::manifest::{self, CrateManifest};
use scope::{is_prelude, Scope};

/// One module of the crate, inline or file-backed.
#[derive(Debug)]
pub struct SourceModule {
    /// Canonical path, crate name first.
    pub path: Vec<String>,
    /// File the module's items were read from.
    pub file: PathBuf,
    /// Top-level items. Inline child modules have had their bodies moved out.
    pub items: Vec<Item>,
    pub scope: Scope,
}

impl SourceModule {
    pub fn display_path(&self) -> String {
        self.path.join("::")
    }
}

/// A fully parsed crate. Read-only once loaded.
#[derive(Debug)]
pub struct CompilationUnit {
    pub crate_name: String,
    pub package_name: String,
    pub manifest_dir: PathBuf,
    /// Modules in pre-order: parents before children, siblings in declaration order.
    pub modules: Vec<SourceModule>,
}

/// Load a crate from a directory or Cargo.toml path. All-or-nothing.
///
/// A module whose file would be `output_file` is the generator's own output
/// and is left out, whether or not the file exists yet.
pub fn load_package(locator: &Path, output_file: Option<&Path>) -> Result<CompilationUnit, LoadError> {
    let manifest = manifest::read_crate_manifest(locator)?;
    let CrateManifest { package_name, crate_name, manifest_dir, root_file, .. } = manifest;

    let file = parse_file(&root_file)?;
    let root_dir = root_file.parent().unwrap_or(Path::new(".")).to_path_buf();

    let mut walker = ModuleWalker { modules: Vec::new(), skip: output_file.map(normalize) };
    walker.walk(vec![crate_name.clone()], root_file, root_dir.clone(), root_dir, file.items)?;
    debug!(crate_name = %crate_name, modules = walker.modules.len(), "loaded package");

    Ok(CompilationUnit {
        crate_name,
        package_name,
        manifest_dir,
        modules: walker.modules,
    })
}

impl CompilationUnit {
    /// Build a unit from a single in-memory root file. `mod foo;` declarations
    /// are resolved against `dir`.
    pub fn from_source(crate_name: &str, source: &str, dir: &Path) -> Result<Self, LoadError> {
        let virtual_root = dir.join("lib.rs");
        let file = syn::parse_file(source).map_err(|e| LoadError::parse(&virtual_root, &e))?;
        let mut walker = ModuleWalker { modules: Vec::new(), skip: None };
        walker.walk(
            vec![crate_name.to_string()],
            virtual_root,
            dir.to_path_buf(),
            dir.to_path_buf(),
            file.items,
        )?;
        Ok(CompilationUnit {
            crate_name: crate_name.to_string(),
            package_name: crate_name.to_string(),
            manifest_dir: dir.to_path_buf(),
            modules: walker.modules,
        })
    }

    pub fn module(&self, path: &[String]) -> Option<&SourceModule> {
        self.modules.iter().find(|m| m.path == path)
    }

    /// Every module's imports, keyed by module path.
    pub fn import_graph(&self) -> BTreeMap<String, Vec<String>> {
        self.modules
            .iter()
            .map(|m| {
                let targets = m.scope.imports.values().map(|p| p.join("::")).collect();
                (m.display_path(), targets)
            })
            .collect()
    }

    /// Resolve a path as written in `module` to its canonical segments.
    /// `self_path` is the expansion of `Self`, when inside an impl block.
    pub fn resolve_path(
        &self,
        module: &SourceModule,
        segments: &[String],
        self_path: Option<&[String]>,
    ) -> Option<Vec<String>> {
        let first = segments.first()?;
        let rest = &segments[1..];
        let joined = |base: &[String]| {
            let mut out = base.to_vec();
            out.extend(rest.iter().cloned());
            out
        };

        if first == "Self" {
            return self_path.map(joined);
        }
        if matches!(first.as_str(), "crate" | "self" | "super") {
            return Some(scope::root_path(segments, &module.path, &module.scope.declared));
        }
        if let Some(target) = module.scope.imports.get(first) {
            return Some(joined(target));
        }
        if module.scope.declared.contains(first) {
            let mut out = module.path.clone();
            out.extend(segments.iter().cloned());
            return Some(out);
        }
        if segments.len() == 1 && is_prelude(first) {
            return Some(segments.to_vec());
        }
        for glob in &module.scope.globs {
            if let Some(target) = self.module(glob) {
                if target.scope.declared.contains(first) {
                    let mut out = glob.clone();
                    out.extend(segments.iter().cloned());
                    return Some(out);
                }
                if let Some(reexport) = target.scope.imports.get(first) {
                    return Some(joined(reexport));
                }
            }
        }
        if is_prelude(first) || segments.len() > 1 {
            return Some(segments.to_vec());
        }
        None
    }

    /// The type oracle: fully-qualified text of `ty` as written in `module`,
    /// e.g. `&example::models::User` or `Vec<example::models::User>`.
    pub fn type_of(
        &self,
        module: &SourceModule,
        ty: &Type,
        self_path: Option<&[String]>,
    ) -> Result<String, GenError> {
        match ty {
            Type::Path(type_path) if type_path.qself.is_none() => {
                let written: Vec<String> = type_path
                    .path
                    .segments
                    .iter()
                    .map(|s| s.ident.to_string())
                    .collect();
                let resolved = if type_path.path.leading_colon.is_some() {
                    written.clone()
                } else {
                    self.resolve_path(module, &written, self_path).ok_or_else(|| {
                        LoadError::unresolved(written.join("::"), module.display_path())
                    })?
                };

                // Generic arguments stay attached to the segment they were
                // written on, counted from the end of the path.
                let mut args: Vec<Option<String>> = vec![None; resolved.len()];
                for (i, segment) in type_path.path.segments.iter().enumerate() {
                    let rendered = self.generic_args(module, &segment.arguments, self_path)?;
                    let from_end = written.len() - i;
                    if let Some(slot) = resolved.len().checked_sub(from_end).and_then(|idx| args.get_mut(idx)) {
                        *slot = rendered;
                    }
                }

                Ok(resolved
                    .iter()
                    .zip(args)
                    .map(|(name, args)| match args {
                        Some(args) => format!("{name}<{args}>"),
                        None => name.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join("::"))
            }
            Type::Reference(r) => {
                let inner = self.type_of(module, &r.elem, self_path)?;
                Ok(if r.mutability.is_some() { format!("&mut {inner}") } else { format!("&{inner}") })
            }
            Type::Slice(s) => Ok(format!("[{}]", self.type_of(module, &s.elem, self_path)?)),
            Type::Array(a) => Ok(format!(
                "[{}; {}]",
                self.type_of(module, &a.elem, self_path)?,
                a.len.to_token_stream()
            )),
            Type::Tuple(t) => {
                let elems = t
                    .elems
                    .iter()
                    .map(|e| self.type_of(module, e, self_path))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(match elems.len() {
                    1 => format!("({},)", elems[0]),
                    _ => format!("({})", elems.join(", ")),
                })
            }
            Type::Paren(p) => self.type_of(module, &p.elem, self_path),
            Type::Group(g) => self.type_of(module, &g.elem, self_path),
            other => Err(GenError::signature(format!(
                "unsupported type `{}` in module '{}'",
                other.to_token_stream(),
                module.display_path()
            ))),
        }
    }

    fn generic_args(
        &self,
        module: &SourceModule,
        arguments: &PathArguments,
        self_path: Option<&[String]>,
    ) -> Result<Option<String>, GenError> {
        let PathArguments::AngleBracketed(bracketed) = arguments else {
            return match arguments {
                PathArguments::None => Ok(None),
                other => Err(GenError::signature(format!(
                    "unsupported type arguments `{}` in module '{}'",
                    other.to_token_stream(),
                    module.display_path()
                ))),
            };
        };
        let mut rendered = Vec::new();
        for arg in &bracketed.args {
            match arg {
                GenericArgument::Lifetime(_) => {}
                GenericArgument::Type(ty) => rendered.push(self.type_of(module, ty, self_path)?),
                GenericArgument::Const(expr) => rendered.push(expr.to_token_stream().to_string()),
                GenericArgument::AssocType(assoc) => rendered.push(format!(
                    "{} = {}",
                    assoc.ident,
                    self.type_of(module, &assoc.ty, self_path)?
                )),
                other => {
                    return Err(GenError::signature(format!(
                        "unsupported generic argument `{}` in module '{}'",
                        other.to_token_stream(),
                        module.display_path()
                    )));
                }
            }
        }
        Ok((!rendered.is_empty()).then(|| rendered.join(", ")))
    }
}

fn parse_file(path: &Path) -> Result<syn::File, LoadError> {
    let source = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
    syn::parse_file(&source).map_err(|e| LoadError::parse(path, &e))
}

fn is_cfg_test(attrs: &[syn::Attribute]) -> bool {
    attrs.iter().any(|attr| {
        attr.path().is_ident("cfg")
            && attr.parse_args::<syn::Ident>().is_ok_and(|ident| ident == "test")
    })
}

fn path_attr(attrs: &[syn::Attribute]) -> Option<String> {
    attrs.iter().find_map(|attr| {
        if !attr.path().is_ident("path") {
            return None;
        }
        let syn::Meta::NameValue(nv) = &attr.meta else {
            return None;
        };
        match &nv.value {
            syn::Expr::Lit(syn::ExprLit { lit: syn::Lit::Str(s), .. }) => Some(s.value()),
            _ => None,
        }
    })
}

/// Absolute, lexically cleaned form of `path`. The file need not exist.
fn normalize(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

struct ModuleWalker {
    modules: Vec<SourceModule>,
    /// Normalized output file; the module declared at it is not loaded.
    skip: Option<PathBuf>,
}

impl ModuleWalker {
    fn is_output(&self, candidate: &Path) -> bool {
        self.skip.as_deref().is_some_and(|skip| normalize(candidate) == skip)
    }

    /// Record a module, then its children in declaration order.
    ///
    /// `file_dir` anchors `#[path]` attributes, `child_dir` is where
    /// `mod foo;` looks for `foo.rs` / `foo/mod.rs`.
    fn walk(
        &mut self,
        path: Vec<String>,
        file: PathBuf,
        file_dir: PathBuf,
        child_dir: PathBuf,
        mut items: Vec<Item>,
    ) -> Result<(), LoadError> {
        let mut children = Vec::new();
        for item in items.iter_mut() {
            let Item::Mod(item_mod) = item else { continue };
            if is_cfg_test(&item_mod.attrs) {
                continue;
            }
            let name = item_mod.ident.to_string();
            let mut child_path = path.clone();
            child_path.push(name.clone());

            if let Some((_, content)) = item_mod.content.take() {
                let dir = child_dir.join(&name);
                children.push((child_path, file.clone(), dir.clone(), dir, content));
                continue;
            }

            let (child_file, grandchild_dir) = match path_attr(&item_mod.attrs) {
                Some(rel) => {
                    let target = file_dir.join(rel);
                    if self.is_output(&target) {
                        debug!(module = %child_path.join("::"), "skipping generated module");
                        continue;
                    }
                    let dir = target.parent().unwrap_or(Path::new(".")).to_path_buf();
                    (target, dir)
                }
                None => {
                    let flat = child_dir.join(format!("{name}.rs"));
                    let nested = child_dir.join(&name).join("mod.rs");
                    if self.is_output(&flat) || self.is_output(&nested) {
                        debug!(module = %child_path.join("::"), "skipping generated module");
                        continue;
                    }
                    if flat.is_file() {
                        (flat, child_dir.join(&name))
                    } else if nested.is_file() {
                        (nested, child_dir.join(&name))
                    } else {
                        return Err(LoadError::MissingModule {
                            module: child_path.join("::"),
                            candidates: (flat, nested),
                        });
                    }
                }
            };
            let parsed = parse_file(&child_file)?;
            let file_dir = child_file.parent().unwrap_or(Path::new(".")).to_path_buf();
            children.push((child_path, child_file, file_dir, grandchild_dir, parsed.items));
        }

        let scope = Scope::collect(&path, &items);
        self.modules.push(SourceModule { path, file, items, scope });

        for (child_path, child_file, file_dir, child_dir, child_items) in children {
            self.walk(child_path, child_file, file_dir, child_dir, child_items)?;
        }
        Ok(())
    }
}
