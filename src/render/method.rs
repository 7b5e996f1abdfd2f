use proc_macro2::TokenStream;
use quote::quote;

use super::{ident, parse_type, Template};
use crate::diagnostics::GenError;
use crate::extract::{HookDescriptor, MethodDescriptor};
use crate::job::GenerationJob;

/// Input struct (when the method takes a parameter) plus handler function.
pub(super) fn expand_method(
    template: &Template,
    job: &GenerationJob,
    method: &MethodDescriptor,
) -> Result<TokenStream, GenError> {
    let handler = ident(&method.handler_name);
    let input = ident(&method.input_name);
    let call = ident(&method.name);
    let receiver = parse_type(&job.receiver_type)?;
    let context_ty = parse_type(&job.context_type)?;

    let mut extractors = vec![quote! {
        ::axum::extract::State(recv): ::axum::extract::State<::std::sync::Arc<#receiver>>
    }];
    if method.takes_context_token {
        extractors.push(quote! { ctx: #context_ty });
    }

    let mut input_struct = TokenStream::new();
    let mut decode = TokenStream::new();
    let mut args: Vec<(usize, TokenStream)> = Vec::new();

    if let Some(param) = &method.parameter {
        let field = ident(&param.name);
        let field_ty = parse_type(&param.field_type)?;
        input_struct = quote! {
            #[derive(::serde::Deserialize)]
            struct #input {
                #field: #field_ty,
            }
        };
        extractors.push(quote! { body: ::axum::body::Bytes });

        let decoded = match &job.decode_hook {
            Some(hook) => hook_invocation(hook, quote! { ::<#input> }, quote! { &body }),
            None => quote! { ::serde_json::from_slice::<#input>(&body) },
        };
        decode = quote! {
            let input: #input = match #decoded {
                Ok(input) => input,
                Err(err) => {
                    return (::axum::http::StatusCode::BAD_REQUEST, err.to_string()).into_response();
                }
            };
        };
        let arg = if param.is_pointer { quote! { &input.#field } } else { quote! { input.#field } };
        args.push((param.position, arg));
    }

    if let Some(context) = &method.context {
        let arg = if context.by_ref { quote! { &ctx } } else { quote! { ctx } };
        args.push((context.position, arg));
    }
    args.sort_by_key(|(position, _)| *position);
    let args = args.into_iter().map(|(_, arg)| arg);

    let awaited = if method.is_async { quote! { .await } } else { TokenStream::new() };

    let encode = match &job.encode_hook {
        Some(hook) => {
            let hook_call = hook_invocation(hook, TokenStream::new(), quote! { &res });
            quote! {
                match #hook_call {
                    Ok(bytes) => (::axum::http::StatusCode::OK, bytes).into_response(),
                    Err(err) => {
                        (::axum::http::StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
                    }
                }
            }
        }
        None => {
            let content_type = template.content_type();
            quote! {
                match ::serde_json::to_vec(&res) {
                    Ok(bytes) => (
                        ::axum::http::StatusCode::OK,
                        [(::axum::http::header::CONTENT_TYPE, #content_type)],
                        bytes,
                    )
                        .into_response(),
                    Err(err) => {
                        (::axum::http::StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
                    }
                }
            }
        }
    };

    Ok(quote! {
        #input_struct

        async fn #handler(#(#extractors),*) -> ::axum::response::Response {
            #decode
            let res = match recv.#call(#(#args),*)#awaited {
                Ok(res) => res,
                Err(err) => {
                    return (::axum::http::StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
                }
            };
            #encode
        }
    })
}

fn hook_invocation(hook: &HookDescriptor, turbofish: TokenStream, arg: TokenStream) -> TokenStream {
    let name = ident(&hook.name);
    if hook.is_async {
        quote! { recv.#name #turbofish (#arg).await }
    } else {
        quote! { recv.#name #turbofish (#arg) }
    }
}
