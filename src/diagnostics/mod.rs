use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure to locate, parse or name-resolve the introspected crate.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("manifest error: {msg} ({})", .path.display())]
    Manifest { msg: String, path: PathBuf },

    #[error("could not read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("syntax error in '{}' at {line}:{column}: {msg}", .path.display())]
    Parse {
        msg: String,
        path: PathBuf,
        line: usize,
        column: usize,
    },

    #[error("module '{module}' not found: expected '{}' or '{}'", .candidates.0.display(), .candidates.1.display())]
    MissingModule {
        module: String,
        candidates: (PathBuf, PathBuf),
    },

    #[error("cannot resolve type '{name}' in module '{module}'")]
    UnresolvedType { name: String, module: String },
}

impl LoadError {
    pub fn manifest(msg: impl Into<String>, path: &Path) -> Self {
        Self::Manifest { msg: msg.into(), path: path.to_path_buf() }
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), source }
    }

    /// Convert a `syn` parse failure into a located error.
    pub fn parse(path: &Path, err: &syn::Error) -> Self {
        let start = err.span().start();
        Self::Parse {
            msg: err.to_string(),
            path: path.to_path_buf(),
            line: start.line,
            column: start.column,
        }
    }

    pub fn unresolved(name: impl Into<String>, module: impl Into<String>) -> Self {
        Self::UnresolvedType { name: name.into(), module: module.into() }
    }
}

/// Every way a generation run can fail. All of them abort the run.
#[derive(Debug, Error)]
pub enum GenError {
    #[error("config error: {msg}")]
    Config { msg: String, path: Option<PathBuf> },

    #[error("load error: {0}")]
    Load(#[from] LoadError),

    #[error("signature error: {msg}")]
    Signature { msg: String },

    #[error("render error: {msg}")]
    Render { msg: String, raw: String },

    #[error("write error: could not write '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GenError {
    pub fn config(msg: impl Into<String>, path: Option<&Path>) -> Self {
        Self::Config { msg: msg.into(), path: path.map(Path::to_path_buf) }
    }

    pub fn signature(msg: impl Into<String>) -> Self {
        Self::Signature { msg: msg.into() }
    }

    pub fn render(msg: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::Render { msg: msg.into(), raw: raw.into() }
    }

    pub fn write(path: &Path, source: std::io::Error) -> Self {
        Self::Write { path: path.to_path_buf(), source }
    }

    /// Unformatted generator output kept for diagnosis, if any.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            GenError::Render { raw, .. } if !raw.is_empty() => Some(raw),
            _ => None,
        }
    }
}

/// Render a GenError with ariadne when it points into a source file,
/// falling back to a plain `error:` line otherwise.
pub fn render_error(err: &GenError) {
    use ariadne::{Label, Report, ReportKind, Source};

    if let GenError::Load(LoadError::Parse { msg, path, line, column }) = err {
        if let Ok(source) = std::fs::read_to_string(path) {
            let offset = char_offset(&source, *line, *column);
            let _ = Report::build(ReportKind::Error, (), offset)
                .with_message(format!("syntax error in {}", path.display()))
                .with_label(Label::new(offset..offset + 1).with_message(msg))
                .finish()
                .eprint(Source::from(source.as_str()));
            return;
        }
    }
    match err {
        GenError::Config { msg, path: Some(path) } => {
            eprintln!("error[config]: {msg}");
            eprintln!("  --> {}", path.display());
        }
        _ => eprintln!("error: {err}"),
    }
}

/// Char offset of a 1-based line and 0-based column, clamped to the source.
fn char_offset(source: &str, line: usize, column: usize) -> usize {
    let mut offset = 0;
    for (idx, text) in source.split('\n').enumerate() {
        if idx + 1 == line {
            return offset + column.min(text.chars().count());
        }
        offset += text.chars().count() + 1;
    }
    source.chars().count().saturating_sub(1)
}
