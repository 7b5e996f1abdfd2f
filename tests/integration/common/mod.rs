#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

pub fn jrpc() -> Command {
    Command::new(env!("CARGO_BIN_EXE_jrpc"))
}

/// Path of a fixture crate under tests/fixtures.
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

/// Lay out a throwaway crate named `name` with the given files
/// (relative to the crate root) and return its directory.
pub fn write_crate(name: &str, files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("Cargo.toml"),
        format!("[package]\nname = \"{name}\"\nversion = \"0.1.0\"\nedition = \"2021\"\n"),
    )
    .unwrap();
    for (rel, content) in files {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
    }
    dir
}

/// A receiver with custom encode/decode hooks.
pub const HOOKED_SERVICE: &str = r#"
use axum::http::Extensions;
use serde::{de::DeserializeOwned, Serialize};

pub struct User;
pub struct Service;

#[derive(Debug)]
pub struct CodecError;

impl Service {
    pub fn create_user(&self, ctx: Extensions, username: String) -> Result<User, CodecError> {
        todo!()
    }

    pub fn marshal<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        todo!()
    }

    pub fn unmarshal<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError> {
        todo!()
    }
}
"#;

/// A receiver violating the one-parameter convention.
pub const TWO_PARAM_SERVICE: &str = r#"
pub struct Service;

impl Service {
    pub fn ok(&self) -> Result<(), String> {
        Ok(())
    }

    pub fn transfer(&self, from: String, to: String) -> Result<(), String> {
        Ok(())
    }
}
"#;
