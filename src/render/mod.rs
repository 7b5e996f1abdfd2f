//! Renderer: expands a [`GenerationJob`] through the fixed handler template,
//! normalizes the result with `prettyplease`, and writes the output file.

mod method;

use std::path::Path;

use proc_macro2::{Ident, Span, TokenStream};
use quote::quote;

use crate::diagnostics::GenError;
use crate::job::GenerationJob;

pub struct TemplateConfig {
    /// Tool named in the generated-file header.
    pub generator: String,
    /// Content type of responses encoded with the default codec.
    pub content_type: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            generator: "jrpc".to_string(),
            content_type: "application/json".to_string(),
        }
    }
}

/// The handler template. Built once per process and shared by reference.
#[derive(Debug, Clone)]
pub struct Template {
    header: String,
    content_type: String,
}

impl Template {
    pub fn new(config: &TemplateConfig) -> Self {
        Self {
            header: format!("// Code generated by {}. DO NOT EDIT.", config.generator),
            content_type: config.content_type.clone(),
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Expand the template into unformatted tokens.
    pub fn expand(&self, job: &GenerationJob) -> Result<TokenStream, GenError> {
        let doc = vec![
            format!(
                " Module `{}` is an auto-generated module providing HTTP handler functions",
                job.genmod
            ),
            format!(" that wrap methods of `{}` in the `{}` crate.", job.receiver_type, job.package_name),
        ];

        let mut uses = Vec::new();
        if job.context_import.contains("::") {
            let path = parse_path(&job.context_import)?;
            uses.push(quote! { #[allow(unused_imports)] use #path; });
        }
        // Single-segment paths name crates, which are already in scope.
        for import in job.imports.iter().filter(|i| i.contains("::")) {
            let path = parse_path(import)?;
            uses.push(quote! { use #path; });
        }

        let units = job
            .methods
            .iter()
            .map(|m| method::expand_method(self, job, m))
            .collect::<Result<Vec<_>, _>>()?;

        let receiver = parse_type(&job.receiver_type)?;
        let routes = job.methods.iter().map(|m| {
            let path = format!("/{}", m.name);
            let handler = ident(&m.handler_name);
            quote! { .route(#path, ::axum::routing::post(#handler)) }
        });

        Ok(quote! {
            #(#![doc = #doc])*

            use ::axum::response::IntoResponse as _;
            #(#uses)*

            #(#units)*

            /// Router serving every handler method of the receiver under `POST /<method>`.
            pub fn handler(recv: ::std::sync::Arc<#receiver>) -> ::axum::Router {
                ::axum::Router::new()
                    #(#routes)*
                    .with_state(recv)
            }
        })
    }
}

/// Expand and normalize. On a normalization failure the raw token text is
/// kept in the error for diagnosis.
pub fn render(template: &Template, job: &GenerationJob) -> Result<String, GenError> {
    let tokens = template.expand(job)?;
    normalize(template, tokens)
}

fn normalize(template: &Template, tokens: TokenStream) -> Result<String, GenError> {
    let raw = tokens.to_string();
    let file = syn::parse2::<syn::File>(tokens)
        .map_err(|e| GenError::render(format!("generated code does not parse: {e}"), raw))?;
    Ok(format!("{}\n\n{}", template.header(), prettyplease::unparse(&file)))
}

/// Overwrite `path` with `contents`, creating its directory first.
pub fn write_output(path: &Path, contents: &str) -> Result<(), GenError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| GenError::write(dir, e))?;
    }
    std::fs::write(path, contents).map_err(|e| GenError::write(path, e))
}

/// Identifier for a name, raw when it is a keyword.
fn ident(name: &str) -> Ident {
    syn::parse_str::<Ident>(name).unwrap_or_else(|_| Ident::new_raw(name, Span::call_site()))
}

fn parse_type(text: &str) -> Result<syn::Type, GenError> {
    syn::parse_str(text).map_err(|e| GenError::render(format!("invalid type `{text}`: {e}"), text))
}

fn parse_path(text: &str) -> Result<syn::Path, GenError> {
    syn::parse_str(text).map_err(|e| GenError::render(format!("invalid import path `{text}`: {e}"), text))
}
