use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use crate::config::GenerateOptions;
use crate::diagnostics::GenError;
use crate::extract::{Extraction, HookDescriptor, MethodDescriptor};
use crate::imports::{ImportResolver, ImportSet};

/// Everything the renderer needs for one output file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationJob {
    pub output_file: PathBuf,
    /// Crate the handlers wrap.
    pub package_name: String,
    /// Name of the generated module.
    pub genmod: String,
    pub receiver: String,
    /// Receiver path as usable from the generated module.
    pub receiver_type: String,
    /// Context token type as usable from the generated module.
    pub context_type: String,
    /// Always imported by the template; never part of `imports`.
    pub context_import: String,
    pub methods: Vec<MethodDescriptor>,
    pub imports: ImportSet,
    pub has_custom_encode: bool,
    pub has_custom_decode: bool,
    pub encode_hook: Option<HookDescriptor>,
    pub decode_hook: Option<HookDescriptor>,
}

impl GenerationJob {
    /// Resolve every parameter type to its local form and collect the
    /// imports the generated file has to declare.
    pub fn resolve(
        options: &GenerateOptions,
        crate_name: &str,
        extraction: Extraction,
    ) -> Result<Self, GenError> {
        let mut resolver =
            ImportResolver::new(crate_name, options.same_crate, &options.context_type, &options.genmod);

        let Extraction { receiver_path, mut methods, encode_hook, decode_hook } = extraction;
        for method in &mut methods {
            if let Some(param) = method.parameter.as_mut() {
                let decomposed = resolver.resolve(&param.fully_qualified_type);
                param.import_path = decomposed.import_path;
                param.local_type_name = decomposed.local_type_name;
                param.field_type = resolver.resolve(&param.field_type).local_type_name;
            }
        }

        let receiver_type = resolver.reroot(&receiver_path.join("::"));
        let context = resolver.context(&options.context_type);
        let imports = resolver.finish()?;
        debug!(imports = imports.len(), "resolved imports");

        Ok(GenerationJob {
            output_file: options.output_file(),
            package_name: crate_name.to_string(),
            genmod: options.genmod.clone(),
            receiver: options.receiver.clone(),
            receiver_type,
            context_type: context.local_type_name,
            context_import: context.import_path,
            methods,
            imports,
            has_custom_encode: encode_hook.is_some(),
            has_custom_decode: decode_hook.is_some(),
            encode_hook,
            decode_hook,
        })
    }
}
