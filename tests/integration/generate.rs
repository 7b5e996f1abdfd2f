mod common;

use std::path::Path;

use quote::ToTokens;

use common::{fixture, write_crate, HOOKED_SERVICE, TWO_PARAM_SERVICE};
use jrpc::Stage;
use jrpc::config::{GenerateOptions, Overrides};
use jrpc::diagnostics::{GenError, LoadError};
use jrpc::render::{Template, TemplateConfig};

fn options(package: &Path, genpath: &Path) -> GenerateOptions {
    let overrides = Overrides {
        genpath: Some(genpath.to_path_buf()),
        ..Overrides::default()
    };
    GenerateOptions::resolve(package, &overrides).unwrap()
}

fn template() -> Template {
    Template::new(&TemplateConfig::default())
}

// ============================================================
// user_service fixture
// ============================================================

#[test]
fn inspect_lists_methods_in_declaration_order() {
    let out = tempfile::tempdir().unwrap();
    let job = jrpc::inspect(&options(&fixture("user_service"), out.path())).unwrap();

    let names: Vec<&str> = job.methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["create_user", "get_user", "list_users", "rename_user"]);
    assert_eq!(job.package_name, "user_service");
    assert_eq!(job.receiver, "Service");
    assert_eq!(job.receiver_type, "user_service::Service");
    assert_eq!(job.imports.iter().collect::<Vec<_>>(), vec!["user_service::models"]);
    assert!(!job.has_custom_encode);
    assert!(!job.has_custom_decode);

    let create = &job.methods[0];
    assert!(create.takes_context_token);
    let param = create.parameter.as_ref().unwrap();
    assert_eq!(param.name, "username");
    assert_eq!(param.fully_qualified_type, "String");
    assert!(!param.is_pointer);

    let rename = &job.methods[3];
    let param = rename.parameter.as_ref().unwrap();
    assert_eq!(param.fully_qualified_type, "&user_service::models::RenameRequest");
    assert_eq!(param.import_path, "user_service::models");
    assert_eq!(param.local_type_name, "&models::RenameRequest");
    assert!(param.is_pointer);

    assert!(job.methods[2].parameter.is_none());
    assert!(!job.methods[2].takes_context_token);
}

#[test]
fn create_user_handler_is_generated() {
    let out = tempfile::tempdir().unwrap();
    let report = jrpc::generate(&options(&fixture("user_service"), out.path()), &template()).unwrap();

    assert_eq!(report.stage, Stage::Written);
    assert_eq!(report.output_file, out.path().join("handler.rs"));
    assert_eq!(report.methods.len(), 4);

    let generated = std::fs::read_to_string(&report.output_file).unwrap();
    assert!(generated.starts_with("// Code generated by jrpc. DO NOT EDIT."));
    assert!(generated.contains("struct CreateUserInput"));
    assert!(generated.contains("username: String,"));
    assert!(generated.contains("\"/create_user\""));
    assert!(generated.contains("::axum::routing::post(create_user_handler)"));
    assert!(generated.contains("recv.create_user(ctx, input.username).await"));
    assert!(generated.contains("recv.get_user(&input.id)"));
    assert!(generated.contains("recv.rename_user(&ctx, &input.request)"));
    assert!(generated.contains("use user_service::models;"));
    assert_eq!(report.bytes, generated.len());

    // The output must itself be a well-formed Rust file.
    syn::parse_file(&generated).unwrap();
}

#[test]
fn generation_is_deterministic() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let template = template();
    let a = jrpc::generate(&options(&fixture("user_service"), first.path()), &template).unwrap();
    let b = jrpc::generate(&options(&fixture("user_service"), second.path()), &template).unwrap();
    assert_eq!(
        std::fs::read(&a.output_file).unwrap(),
        std::fs::read(&b.output_file).unwrap()
    );
}

#[test]
fn existing_output_is_overwritten() {
    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("handler.rs");
    std::fs::write(&target, "stale contents").unwrap();

    jrpc::generate(&options(&fixture("user_service"), out.path()), &template()).unwrap();
    let generated = std::fs::read_to_string(&target).unwrap();
    assert!(!generated.contains("stale contents"));
}

#[test]
fn output_directory_is_created() {
    let out = tempfile::tempdir().unwrap();
    let genpath = out.path().join("src/handlers");
    let report = jrpc::generate(&options(&fixture("user_service"), &genpath), &template()).unwrap();
    assert!(report.output_file.starts_with(&genpath));
    assert!(report.output_file.is_file());
}

#[test]
fn same_crate_generation_uses_crate_paths() {
    let out = tempfile::tempdir().unwrap();
    let overrides = Overrides {
        genpath: Some(out.path().to_path_buf()),
        same_crate: true,
        ..Overrides::default()
    };
    let options = GenerateOptions::resolve(fixture("user_service"), &overrides).unwrap();
    let job = jrpc::inspect(&options).unwrap();
    assert_eq!(job.receiver_type, "crate::Service");
    assert_eq!(job.imports.iter().collect::<Vec<_>>(), vec!["crate::models"]);
}

#[test]
fn same_crate_output_module_may_be_declared_before_it_exists() {
    let lib = "pub mod ctx { pub struct Ctx; }\n\
        pub mod server;\n\
        pub struct Service;\n\
        impl Service { pub fn whoami(&self, ctx: &ctx::Ctx) -> Result<String, String> { todo!() } }\n";
    let krate = write_crate("svc", &[("src/lib.rs", lib), ("src/server/mod.rs", "pub mod handler;\n")]);
    let overrides = Overrides {
        genpath: Some(krate.path().join("src/server")),
        context_type: Some("svc::ctx::Ctx".to_string()),
        same_crate: true,
        ..Overrides::default()
    };
    let options = GenerateOptions::resolve(krate.path(), &overrides).unwrap();
    let template = template();

    let report = jrpc::generate(&options, &template).unwrap();
    let generated = std::fs::read_to_string(&report.output_file).unwrap();
    assert!(generated.contains("use crate::ctx;"));
    assert!(!generated.contains("use svc::"));
    assert!(generated.contains("recv.whoami(&ctx)"));

    // A broken previous output does not block regeneration.
    std::fs::write(&report.output_file, "pub fn broken(").unwrap();
    let again = jrpc::generate(&options, &template).unwrap();
    assert_eq!(std::fs::read_to_string(&again.output_file).unwrap(), generated);
}

// ============================================================
// Parameter shapes
// ============================================================

/// Every parameter shape either fails with a signature error or decodes into
/// an input struct whose fields own their data.
#[test]
fn parameter_shapes_decode_into_owned_fields() {
    let shapes = [
        ("String", true),
        ("&models::User", true),
        ("&str", true),
        ("&[models::User]", true),
        ("Option<models::User>", true),
        ("Vec<String>", true),
        ("Option<&str>", false),
        ("Vec<&str>", false),
        ("(&str, u8)", false),
        ("&Option<&models::User>", false),
    ];
    let template = template();
    for (ty, accepted) in shapes {
        let source = format!(
            "pub mod models {{ pub struct User; }}\n\
             pub struct Service;\n\
             impl Service {{ pub fn call(&self, value: {ty}) -> Result<(), String> {{ Ok(()) }} }}\n"
        );
        let krate = write_crate("shapes", &[("src/lib.rs", source.as_str())]);
        let out = tempfile::tempdir().unwrap();
        let result = jrpc::generate(&options(krate.path(), out.path()), &template);

        if !accepted {
            let err = result.unwrap_err();
            assert!(matches!(err, GenError::Signature { .. }), "{ty}: {err}");
            assert!(!out.path().join("handler.rs").exists(), "{ty}");
            continue;
        }

        let report = result.unwrap_or_else(|e| panic!("{ty}: {e}"));
        let file = syn::parse_file(&std::fs::read_to_string(&report.output_file).unwrap()).unwrap();
        let input = file
            .items
            .iter()
            .find_map(|item| match item {
                syn::Item::Struct(s) if s.ident == "CallInput" => Some(s),
                _ => None,
            })
            .unwrap_or_else(|| panic!("{ty}: no input struct"));
        for field in &input.fields {
            let field_ty = field.ty.to_token_stream().to_string();
            assert!(!field_ty.contains('&'), "{ty}: field type `{field_ty}` borrows");
        }
    }
}

// ============================================================
// Hooks
// ============================================================

#[test]
fn hooks_replace_default_codec() {
    let krate = write_crate("hooked", &[("src/lib.rs", HOOKED_SERVICE)]);
    let out = tempfile::tempdir().unwrap();
    let options = options(krate.path(), out.path());

    let job = jrpc::inspect(&options).unwrap();
    assert!(job.has_custom_encode);
    assert!(job.has_custom_decode);
    let names: Vec<&str> = job.methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["create_user"]);

    let report = jrpc::generate(&options, &template()).unwrap();
    let generated = std::fs::read_to_string(report.output_file).unwrap();
    assert!(generated.contains("recv.unmarshal::<CreateUserInput>(&body)"));
    assert!(generated.contains("recv.marshal(&res)"));
    assert!(!generated.contains("serde_json"));
}

#[test]
fn hooks_can_be_disabled_from_config_file() {
    let krate = write_crate(
        "hooked",
        &[("src/lib.rs", HOOKED_SERVICE), ("jrpc.toml", "[hooks]\nenabled = false\n")],
    );
    let out = tempfile::tempdir().unwrap();
    let job = jrpc::inspect(&options(krate.path(), out.path())).unwrap();
    assert!(!job.has_custom_encode);
    assert!(!job.has_custom_decode);
    // The generic hook methods are not handler-eligible either.
    assert_eq!(job.methods.len(), 1);
}

// ============================================================
// Failures abort before anything is written
// ============================================================

#[test]
fn two_parameters_abort_without_writing() {
    let krate = write_crate("broken", &[("src/lib.rs", TWO_PARAM_SERVICE)]);
    let out = tempfile::tempdir().unwrap();
    let err = jrpc::generate(&options(krate.path(), out.path()), &template()).unwrap_err();

    assert!(matches!(err, GenError::Signature { .. }));
    insta::assert_snapshot!(err.to_string(), @"signature error: method `transfer` has more than one non-context parameter (`from` and `to`)");
    assert!(!out.path().join("handler.rs").exists());
}

#[test]
fn parse_errors_are_load_errors() {
    let krate = write_crate(
        "broken",
        &[("src/lib.rs", "pub mod models;\n"), ("src/models.rs", "pub struct User {\n")],
    );
    let out = tempfile::tempdir().unwrap();
    let err = jrpc::generate(&options(krate.path(), out.path()), &template()).unwrap_err();
    assert!(matches!(err, GenError::Load(LoadError::Parse { .. })));
    assert!(!out.path().join("handler.rs").exists());
}

#[test]
fn unresolved_parameter_type_is_a_load_error() {
    let source = "pub struct Service;\n\
        impl Service { pub fn save(&self, user: Ghost) -> Result<(), String> { Ok(()) } }\n";
    let krate = write_crate("ghostly", &[("src/lib.rs", source)]);
    let out = tempfile::tempdir().unwrap();
    let err = jrpc::inspect(&options(krate.path(), out.path())).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"load error: cannot resolve type 'Ghost' in module 'ghostly'");
}

#[test]
fn missing_receiver_aborts() {
    let krate = write_crate("empty", &[("src/lib.rs", "pub struct Other;\n")]);
    let out = tempfile::tempdir().unwrap();
    let err = jrpc::generate(&options(krate.path(), out.path()), &template()).unwrap_err();
    assert!(matches!(err, GenError::Signature { .. }));
    assert!(!out.path().join("handler.rs").exists());
}

#[test]
fn receiver_can_be_renamed() {
    let source = "pub struct Api;\n\
        impl Api { pub fn ping(&self) -> Result<(), String> { Ok(()) } }\n";
    let krate = write_crate("api", &[("src/lib.rs", source)]);
    let out = tempfile::tempdir().unwrap();
    let overrides = Overrides {
        genpath: Some(out.path().to_path_buf()),
        receiver: Some("Api".to_string()),
        ..Overrides::default()
    };
    let options = GenerateOptions::resolve(krate.path(), &overrides).unwrap();
    let job = jrpc::inspect(&options).unwrap();
    assert_eq!(job.receiver_type, "api::Api");
    assert_eq!(job.methods[0].handler_name, "ping_handler");
}
