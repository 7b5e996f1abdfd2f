mod common;

use common::{fixture, jrpc, write_crate, TWO_PARAM_SERVICE};

#[test]
fn generate_writes_handler_file() {
    let out = tempfile::tempdir().unwrap();
    let output = jrpc()
        .arg("generate")
        .arg(fixture("user_service"))
        .arg("--genpath")
        .arg(out.path())
        .arg("--genmod")
        .arg("handlers")
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "generate failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("generated"), "stderr: {stderr}");

    let generated = std::fs::read_to_string(out.path().join("handler.rs")).unwrap();
    assert!(generated.contains("Module `handlers`"));
    assert!(generated.contains("pub fn handler("));
}

#[test]
fn inspect_prints_job_as_json() {
    let output = jrpc().arg("inspect").arg(fixture("user_service")).output().unwrap();
    assert!(output.status.success(), "inspect failed: {}", String::from_utf8_lossy(&output.stderr));

    let job: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(job["receiver"], "Service");
    assert_eq!(job["package_name"], "user_service");
    assert_eq!(job["methods"][0]["name"], "create_user");
    assert_eq!(job["methods"][0]["takes_context_token"], true);
    assert_eq!(job["imports"], serde_json::json!(["user_service::models"]));
    assert_eq!(job["has_custom_encode"], false);
}

#[test]
fn missing_package_exits_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = jrpc()
        .arg("generate")
        .arg(dir.path().join("nowhere"))
        .arg("--genpath")
        .arg(dir.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: load error: manifest error"), "stderr: {stderr}");
}

#[test]
fn signature_violation_exits_before_writing() {
    let krate = write_crate("broken", &[("src/lib.rs", TWO_PARAM_SERVICE)]);
    let out = tempfile::tempdir().unwrap();
    let output = jrpc()
        .arg("generate")
        .arg(krate.path())
        .arg("--genpath")
        .arg(out.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("signature error"), "stderr: {stderr}");
    assert!(!out.path().join("handler.rs").exists());
}

#[test]
fn invalid_receiver_flag_is_a_config_error() {
    let output = jrpc()
        .arg("inspect")
        .arg(fixture("user_service"))
        .arg("--receiver")
        .arg("not-an-ident")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("config error: receiver 'not-an-ident' is not a valid identifier"));
}
