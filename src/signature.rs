//! Signature resolution for handler-eligible methods: find the context token,
//! the single decoded parameter, and check the `Result` return shape.

use quote::ToTokens;
use serde::Serialize;
use syn::ext::IdentExt;
use syn::{FnArg, ImplItemFn, Pat, ReturnType, Type};

use crate::diagnostics::GenError;
use crate::imports::split_sigil;
use crate::loader::{CompilationUnit, SourceModule};

/// The one non-context parameter of a handler method.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterDescriptor {
    pub name: String,
    /// Canonical type as written, e.g. `&app::models::User`.
    pub fully_qualified_type: String,
    /// Taken by shared reference.
    pub is_pointer: bool,
    /// Index among the method's non-receiver arguments.
    pub position: usize,
    /// Filled in by import resolution.
    pub import_path: String,
    /// Filled in by import resolution.
    pub local_type_name: String,
    /// Owned type of the decoded input field. Canonical until import
    /// resolution rewrites it to its local form.
    pub field_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContextArg {
    pub position: usize,
    pub by_ref: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub context: Option<ContextArg>,
    pub parameter: Option<ParameterDescriptor>,
    pub is_async: bool,
}

pub struct SignatureResolver<'a> {
    unit: &'a CompilationUnit,
    context_type: &'a str,
}

impl<'a> SignatureResolver<'a> {
    pub fn new(unit: &'a CompilationUnit, context_type: &'a str) -> Self {
        Self { unit, context_type }
    }

    pub fn resolve(
        &self,
        module: &SourceModule,
        self_path: &[String],
        method: &ImplItemFn,
    ) -> Result<Signature, GenError> {
        let method_name = method.sig.ident.unraw().to_string();
        let mut context: Option<ContextArg> = None;
        let mut parameter: Option<ParameterDescriptor> = None;

        let typed = method.sig.inputs.iter().filter_map(|arg| match arg {
            FnArg::Typed(pat_type) => Some(pat_type),
            FnArg::Receiver(_) => None,
        });
        for (position, arg) in typed.enumerate() {
            let names = binding_names(&arg.pat);
            let [name] = names.as_slice() else {
                return Err(GenError::signature(format!(
                    "method `{method_name}`: parameter `{}` binds {} names; exactly one is required",
                    arg.pat.to_token_stream(),
                    names.len()
                )));
            };

            let fq = self.unit.type_of(module, &arg.ty, Some(self_path))?;
            let (sigil, bare) = split_sigil(&fq);

            if bare == self.context_type {
                if sigil == "&mut " {
                    return Err(GenError::signature(format!(
                        "method `{method_name}`: context parameter `{name}` must not be taken by mutable reference"
                    )));
                }
                if context.is_some() {
                    return Err(GenError::signature(format!(
                        "method `{method_name}` takes more than one context parameter"
                    )));
                }
                context = Some(ContextArg { position, by_ref: sigil == "&" });
                continue;
            }

            if sigil == "&mut " {
                return Err(GenError::signature(format!(
                    "method `{method_name}`: parameter `{name}: {fq}` is a mutable reference"
                )));
            }
            if let Some(first) = &parameter {
                return Err(GenError::signature(format!(
                    "method `{method_name}` has more than one non-context parameter (`{}` and `{name}`)",
                    first.name
                )));
            }
            let field_type = owned_type(&fq);
            if field_type.contains('&') {
                return Err(GenError::signature(format!(
                    "method `{method_name}`: parameter `{name}: {fq}` borrows inside its type; \
                     only a top-level `&` can be decoded into an owned value"
                )));
            }
            parameter = Some(ParameterDescriptor {
                name: name.clone(),
                field_type,
                is_pointer: sigil == "&",
                fully_qualified_type: fq,
                position,
                import_path: String::new(),
                local_type_name: String::new(),
            });
        }

        if !returns_result(&method.sig.output) {
            return Err(GenError::signature(format!(
                "method `{method_name}` must return `Result<T, E>`"
            )));
        }

        Ok(Signature {
            context,
            parameter,
            is_async: method.sig.asyncness.is_some(),
        })
    }
}

/// Identifiers bound by a parameter pattern.
fn binding_names(pat: &Pat) -> Vec<String> {
    let mut names = Vec::new();
    collect_bindings(pat, &mut names);
    names
}

fn collect_bindings(pat: &Pat, out: &mut Vec<String>) {
    match pat {
        Pat::Ident(p) => {
            out.push(p.ident.unraw().to_string());
            if let Some((_, sub)) = &p.subpat {
                collect_bindings(sub, out);
            }
        }
        Pat::Tuple(p) => p.elems.iter().for_each(|e| collect_bindings(e, out)),
        Pat::TupleStruct(p) => p.elems.iter().for_each(|e| collect_bindings(e, out)),
        Pat::Struct(p) => p.fields.iter().for_each(|f| collect_bindings(&f.pat, out)),
        Pat::Slice(p) => p.elems.iter().for_each(|e| collect_bindings(e, out)),
        Pat::Reference(p) => collect_bindings(&p.pat, out),
        Pat::Paren(p) => collect_bindings(&p.pat, out),
        Pat::Type(p) => collect_bindings(&p.pat, out),
        Pat::Or(p) => {
            if let Some(first) = p.cases.first() {
                collect_bindings(first, out);
            }
        }
        _ => {}
    }
}

fn returns_result(output: &ReturnType) -> bool {
    let ReturnType::Type(_, ty) = output else {
        return false;
    };
    match ty.as_ref() {
        Type::Path(p) => p.path.segments.last().is_some_and(|s| s.ident == "Result"),
        _ => false,
    }
}

/// Owned form of a parameter type, used for the decoded input field.
fn owned_type(fq: &str) -> String {
    let (_, bare) = split_sigil(fq);
    if bare == "str" {
        return "String".to_string();
    }
    if let Some(elem) = bare.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        if !has_top_level_semicolon(elem) {
            return format!("Vec<{elem}>");
        }
    }
    bare.to_string()
}

fn has_top_level_semicolon(s: &str) -> bool {
    let mut depth = 0i32;
    for c in s.chars() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            ';' if depth == 0 => return true,
            _ => {}
        }
    }
    false
}
