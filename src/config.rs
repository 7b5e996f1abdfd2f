//! Generator configuration: built-in defaults, an optional `jrpc.toml` next to
//! the introspected crate's manifest, and command-line overrides, applied in
//! that order.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::diagnostics::GenError;

pub const CONFIG_FILE_NAME: &str = "jrpc.toml";
pub const DEFAULT_GENPATH: &str = "server";
pub const DEFAULT_GENMOD: &str = "server";
pub const DEFAULT_RECEIVER: &str = "Service";
pub const DEFAULT_CONTEXT_TYPE: &str = "axum::http::Extensions";
pub const DEFAULT_ENCODE_HOOK: &str = "marshal";
pub const DEFAULT_DECODE_HOOK: &str = "unmarshal";

/// Name of the file written inside `genpath`.
pub const OUTPUT_FILE_NAME: &str = "handler.rs";

/// Override-hook detection. When disabled, methods carrying the hook names
/// are treated like any other method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookConfig {
    pub enabled: bool,
    pub encode: String,
    pub decode: String,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            encode: DEFAULT_ENCODE_HOOK.to_string(),
            decode: DEFAULT_DECODE_HOOK.to_string(),
        }
    }
}

/// Fully resolved options for one generation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateOptions {
    /// Crate directory or Cargo.toml of the crate to introspect.
    pub package: PathBuf,
    /// Directory the handler file is written into.
    pub genpath: PathBuf,
    /// Name of the generated module.
    pub genmod: String,
    /// Receiver type whose methods become handlers.
    pub receiver: String,
    /// Type path recognised as the per-request context token.
    pub context_type: String,
    /// Generated module lives inside the introspected crate.
    pub same_crate: bool,
    pub hooks: HookConfig,
}

impl GenerateOptions {
    pub fn new(package: impl Into<PathBuf>) -> Self {
        Self {
            package: package.into(),
            genpath: PathBuf::from(DEFAULT_GENPATH),
            genmod: DEFAULT_GENMOD.to_string(),
            receiver: DEFAULT_RECEIVER.to_string(),
            context_type: DEFAULT_CONTEXT_TYPE.to_string(),
            same_crate: false,
            hooks: HookConfig::default(),
        }
    }

    pub fn output_file(&self) -> PathBuf {
        self.genpath.join(OUTPUT_FILE_NAME)
    }

    /// Merge defaults, the config file (explicit or discovered) and overrides.
    pub fn resolve(package: impl Into<PathBuf>, overrides: &Overrides) -> Result<Self, GenError> {
        let mut options = Self::new(package);

        let config_path = match &overrides.config {
            Some(path) => Some(path.clone()),
            None => discover_config(&options.package),
        };
        if let Some(path) = &config_path {
            let file = read_config_file(path)?;
            let base = path.parent().unwrap_or(Path::new(""));
            file.apply(&mut options, base);
        }
        overrides.apply(&mut options);

        options.validate(config_path.as_deref())?;
        Ok(options)
    }

    pub fn validate(&self, config_path: Option<&Path>) -> Result<(), GenError> {
        let ident = |what: &str, value: &str| -> Result<(), GenError> {
            syn::parse_str::<syn::Ident>(value).map(|_| ()).map_err(|_| {
                GenError::config(format!("{what} '{value}' is not a valid identifier"), config_path)
            })
        };
        ident("genmod", &self.genmod)?;
        ident("receiver", &self.receiver)?;
        ident("encode hook", &self.hooks.encode)?;
        ident("decode hook", &self.hooks.decode)?;

        if self.hooks.encode == self.hooks.decode {
            return Err(GenError::config(
                format!("encode and decode hooks must differ (both are '{}')", self.hooks.encode),
                config_path,
            ));
        }
        let context = syn::parse_str::<syn::Path>(&self.context_type).map_err(|_| {
            GenError::config(
                format!("context_type '{}' is not a valid type path", self.context_type),
                config_path,
            )
        })?;
        if context.segments.len() < 2 || context.leading_colon.is_some() {
            return Err(GenError::config(
                format!("context_type '{}' must be a crate-rooted path such as 'axum::http::Extensions'", self.context_type),
                config_path,
            ));
        }
        if context.segments.iter().any(|s| !s.arguments.is_none()) {
            return Err(GenError::config(
                format!("context_type '{}' must not carry generic arguments", self.context_type),
                config_path,
            ));
        }
        Ok(())
    }
}

/// Values given on the command line; `None`/`false` defer to lower layers.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub genpath: Option<PathBuf>,
    pub genmod: Option<String>,
    pub receiver: Option<String>,
    pub context_type: Option<String>,
    pub no_hooks: bool,
    pub same_crate: bool,
}

impl Overrides {
    fn apply(&self, options: &mut GenerateOptions) {
        if let Some(genpath) = &self.genpath {
            options.genpath = genpath.clone();
        }
        if let Some(genmod) = &self.genmod {
            options.genmod = genmod.clone();
        }
        if let Some(receiver) = &self.receiver {
            options.receiver = receiver.clone();
        }
        if let Some(context_type) = &self.context_type {
            options.context_type = context_type.clone();
        }
        if self.no_hooks {
            options.hooks.enabled = false;
        }
        if self.same_crate {
            options.same_crate = true;
        }
    }
}

// ---- TOML deserialization types ----

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    #[serde(default)]
    generate: TomlGenerate,
    #[serde(default)]
    hooks: TomlHooks,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlGenerate {
    genpath: Option<PathBuf>,
    genmod: Option<String>,
    receiver: Option<String>,
    context_type: Option<String>,
    same_crate: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlHooks {
    enabled: Option<bool>,
    encode: Option<String>,
    decode: Option<String>,
}

impl TomlConfig {
    /// A relative `genpath` is relative to `base`, the config file's directory.
    fn apply(self, options: &mut GenerateOptions, base: &Path) {
        let TomlConfig { generate, hooks } = self;
        if let Some(genpath) = generate.genpath {
            options.genpath = base.join(genpath);
        }
        if let Some(genmod) = generate.genmod {
            options.genmod = genmod;
        }
        if let Some(receiver) = generate.receiver {
            options.receiver = receiver;
        }
        if let Some(context_type) = generate.context_type {
            options.context_type = context_type;
        }
        if let Some(same_crate) = generate.same_crate {
            options.same_crate = same_crate;
        }
        if let Some(enabled) = hooks.enabled {
            options.hooks.enabled = enabled;
        }
        if let Some(encode) = hooks.encode {
            options.hooks.encode = encode;
        }
        if let Some(decode) = hooks.decode {
            options.hooks.decode = decode;
        }
    }
}

/// `jrpc.toml` beside the package's Cargo.toml, if present.
fn discover_config(package: &Path) -> Option<PathBuf> {
    let dir = if package.is_dir() {
        package.to_path_buf()
    } else {
        package.parent()?.to_path_buf()
    };
    let candidate = dir.join(CONFIG_FILE_NAME);
    candidate.is_file().then_some(candidate)
}

fn read_config_file(path: &Path) -> Result<TomlConfig, GenError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        GenError::config(format!("{CONFIG_FILE_NAME}: could not read file: {e}"), Some(path))
    })?;
    toml::from_str(&content).map_err(|e| {
        GenError::config(format!("{CONFIG_FILE_NAME}: invalid syntax: {e}"), Some(path))
    })
}
