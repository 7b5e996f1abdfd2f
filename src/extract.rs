//! Method extraction: find the receiver's inherent `impl` blocks and turn its
//! `&self` methods into handler descriptors or override hooks.

use serde::Serialize;
use syn::ext::IdentExt;
use syn::{FnArg, GenericParam, ImplItem, Item, Type, Visibility};
use tracing::{debug, warn};

use crate::config::HookConfig;
use crate::diagnostics::{GenError, LoadError};
use crate::loader::CompilationUnit;
use crate::naming::{to_pascal_case, to_snake_case};
use crate::signature::{ContextArg, ParameterDescriptor, SignatureResolver};

/// Classification of a receiver method by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideHook {
    None,
    Encode,
    Decode,
}

impl OverrideHook {
    pub fn classify(name: &str, hooks: &HookConfig) -> OverrideHook {
        if !hooks.enabled {
            OverrideHook::None
        } else if name == hooks.encode {
            OverrideHook::Encode
        } else if name == hooks.decode {
            OverrideHook::Decode
        } else {
            OverrideHook::None
        }
    }
}

/// A custom codec method found on the receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookDescriptor {
    pub kind: OverrideHook,
    pub name: String,
    pub is_async: bool,
}

/// One handler-eligible method.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodDescriptor {
    /// Method name as declared; also the route path.
    pub name: String,
    /// Name of the generated handler function.
    pub handler_name: String,
    /// Name of the generated input struct.
    pub input_name: String,
    pub parameter: Option<ParameterDescriptor>,
    pub takes_context_token: bool,
    pub context: Option<ContextArg>,
    pub is_async: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Canonical path of the receiver type.
    pub receiver_path: Vec<String>,
    /// Handler methods in declaration order.
    pub methods: Vec<MethodDescriptor>,
    pub encode_hook: Option<HookDescriptor>,
    pub decode_hook: Option<HookDescriptor>,
}

pub struct ExtractConfig<'a> {
    pub receiver: &'a str,
    pub context_type: &'a str,
    pub hooks: &'a HookConfig,
    /// `pub(crate)` methods are reachable from the generated module.
    pub same_crate: bool,
}

pub fn extract(unit: &CompilationUnit, config: &ExtractConfig<'_>) -> Result<Extraction, GenError> {
    let resolver = SignatureResolver::new(unit, config.context_type);
    let mut receiver_path: Option<Vec<String>> = None;
    let mut methods: Vec<MethodDescriptor> = Vec::new();
    let mut encode_hook = None;
    let mut decode_hook = None;

    for module in &unit.modules {
        for item in &module.items {
            let Item::Impl(imp) = item else { continue };
            if imp.trait_.is_some() {
                continue;
            }
            let Type::Path(self_ty) = imp.self_ty.as_ref() else { continue };
            let Some(last) = self_ty.path.segments.last() else { continue };
            if last.ident != config.receiver {
                continue;
            }
            if !imp.generics.params.is_empty() || !last.arguments.is_none() {
                return Err(GenError::signature(format!(
                    "receiver `{}` in module '{}' is generic; generic receivers are not supported",
                    config.receiver,
                    module.display_path()
                )));
            }

            let written: Vec<String> =
                self_ty.path.segments.iter().map(|s| s.ident.to_string()).collect();
            let path = unit
                .resolve_path(module, &written, None)
                .ok_or_else(|| LoadError::unresolved(written.join("::"), module.display_path()))?;
            match &receiver_path {
                Some(existing) if *existing != path => {
                    return Err(GenError::signature(format!(
                        "receiver name `{}` is ambiguous: both `{}` and `{}` have methods",
                        config.receiver,
                        existing.join("::"),
                        path.join("::")
                    )));
                }
                Some(_) => {}
                None => receiver_path = Some(path.clone()),
            }

            for impl_item in &imp.items {
                let ImplItem::Fn(method) = impl_item else { continue };
                let name = method.sig.ident.unraw().to_string();

                let borrows_self = matches!(
                    method.sig.inputs.first(),
                    Some(FnArg::Receiver(r)) if r.reference.is_some() && r.mutability.is_none()
                );
                if !borrows_self {
                    debug!(method = %name, "skipping method without `&self` receiver");
                    continue;
                }
                if !is_exported(&method.vis, config.same_crate) {
                    debug!(method = %name, "skipping non-exported method");
                    continue;
                }

                match OverrideHook::classify(&name, config.hooks) {
                    OverrideHook::None => {}
                    kind => {
                        debug!(method = %name, ?kind, "found override hook");
                        let hook = HookDescriptor {
                            kind,
                            name,
                            is_async: method.sig.asyncness.is_some(),
                        };
                        if kind == OverrideHook::Encode {
                            encode_hook = Some(hook);
                        } else {
                            decode_hook = Some(hook);
                        }
                        continue;
                    }
                }

                let generic = method
                    .sig
                    .generics
                    .params
                    .iter()
                    .any(|p| !matches!(p, GenericParam::Lifetime(_)));
                if generic {
                    warn!(method = %name, "skipping generic method; handlers need concrete types");
                    continue;
                }

                if methods.iter().any(|m| m.name == name) {
                    return Err(GenError::signature(format!(
                        "method `{name}` is defined more than once on `{}`",
                        config.receiver
                    )));
                }

                let signature = resolver.resolve(module, &path, method)?;
                debug!(
                    method = %name,
                    context = signature.context.is_some(),
                    parameter = signature.parameter.as_ref().map(|p| p.name.as_str()),
                    "extracted method"
                );
                methods.push(MethodDescriptor {
                    handler_name: format!("{}_handler", to_snake_case(&name)),
                    input_name: format!("{}Input", to_pascal_case(&name)),
                    takes_context_token: signature.context.is_some(),
                    context: signature.context,
                    parameter: signature.parameter,
                    is_async: signature.is_async,
                    name,
                });
            }
        }
    }

    let receiver_path = receiver_path.ok_or_else(|| {
        GenError::signature(format!(
            "receiver `{}` not found: no inherent impl block in crate '{}'",
            config.receiver, unit.crate_name
        ))
    })?;

    Ok(Extraction { receiver_path, methods, encode_hook, decode_hook })
}

fn is_exported(vis: &Visibility, same_crate: bool) -> bool {
    match vis {
        Visibility::Public(_) => true,
        Visibility::Restricted(r) => same_crate && r.path.is_ident("crate"),
        Visibility::Inherited => false,
    }
}
