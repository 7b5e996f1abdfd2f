use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::diagnostics::LoadError;

/// Identity of the crate being introspected, read from its Cargo.toml.
#[derive(Debug, Clone, PartialEq)]
pub struct CrateManifest {
    /// `[package] name` as written.
    pub package_name: String,
    /// Name the crate is referred to by in paths (`[lib] name`, `-` → `_`).
    pub crate_name: String,
    pub manifest_path: PathBuf,
    pub manifest_dir: PathBuf,
    /// Root source file of the lib target (or the bin target as fallback).
    pub root_file: PathBuf,
}

// ---- TOML deserialization types ----

#[derive(Deserialize)]
struct TomlManifest {
    package: Option<TomlPackage>,
    lib: Option<TomlLib>,
}

#[derive(Deserialize)]
struct TomlPackage {
    name: Option<String>,
}

#[derive(Deserialize)]
struct TomlLib {
    name: Option<String>,
    path: Option<String>,
}

/// Accept either a crate directory or the path of its Cargo.toml.
pub fn locate_manifest(locator: &Path) -> Result<PathBuf, LoadError> {
    let candidate = if locator.is_dir() {
        locator.join("Cargo.toml")
    } else {
        locator.to_path_buf()
    };
    if candidate.file_name().is_some_and(|n| n == "Cargo.toml") && candidate.is_file() {
        return Ok(candidate);
    }
    Err(LoadError::manifest(
        "no Cargo.toml found for package locator",
        &candidate,
    ))
}

pub fn read_crate_manifest(locator: &Path) -> Result<CrateManifest, LoadError> {
    let manifest_path = locate_manifest(locator)?;
    let content = std::fs::read_to_string(&manifest_path)
        .map_err(|e| LoadError::io(&manifest_path, e))?;

    let manifest: TomlManifest = toml::from_str(&content).map_err(|e| {
        LoadError::manifest(format!("Cargo.toml: invalid syntax: {e}"), &manifest_path)
    })?;

    let package = manifest.package.as_ref().ok_or_else(|| {
        LoadError::manifest(
            "Cargo.toml: missing [package] section (workspace manifests are not supported)",
            &manifest_path,
        )
    })?;

    let package_name = match package.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            return Err(LoadError::manifest(
                "Cargo.toml: missing 'name' in [package]",
                &manifest_path,
            ));
        }
    };

    let lib = manifest.lib.as_ref();
    let crate_name = lib
        .and_then(|l| l.name.clone())
        .unwrap_or_else(|| package_name.clone())
        .replace('-', "_");

    let manifest_dir = manifest_path
        .parent()
        .unwrap_or(Path::new("."))
        .to_path_buf();

    let root_file = match lib.and_then(|l| l.path.as_deref()) {
        Some(path) => manifest_dir.join(path),
        None => ["src/lib.rs", "src/main.rs"]
            .iter()
            .map(|rel| manifest_dir.join(rel))
            .find(|p| p.is_file())
            .ok_or_else(|| {
                LoadError::manifest(
                    "crate has neither src/lib.rs nor src/main.rs",
                    &manifest_path,
                )
            })?,
    };

    if !root_file.is_file() {
        return Err(LoadError::manifest(
            format!("lib target '{}' does not exist", root_file.display()),
            &manifest_path,
        ));
    }

    Ok(CrateManifest {
        package_name,
        crate_name,
        manifest_path,
        manifest_dir,
        root_file,
    })
}
