pub mod config;
pub mod diagnostics;
pub mod extract;
pub mod imports;
pub mod job;
pub mod loader;
pub mod manifest;
pub mod naming;
pub mod render;
pub mod signature;

use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use config::GenerateOptions;
use diagnostics::GenError;
use extract::ExtractConfig;
use job::GenerationJob;
use render::Template;

/// Progress of one run. Stages advance strictly in declaration order; a
/// failure at any stage ends the run where it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Stage {
    Idle,
    Loaded,
    Extracted,
    Resolved,
    Rendered,
    Written,
}

impl Stage {
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Idle => Some(Stage::Loaded),
            Stage::Loaded => Some(Stage::Extracted),
            Stage::Extracted => Some(Stage::Resolved),
            Stage::Resolved => Some(Stage::Rendered),
            Stage::Rendered => Some(Stage::Written),
            Stage::Written => None,
        }
    }
}

/// Summary of a completed `generate` run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationReport {
    pub output_file: PathBuf,
    pub methods: Vec<String>,
    pub imports: usize,
    pub bytes: usize,
    pub stage: Stage,
}

struct Pipeline<'a> {
    options: &'a GenerateOptions,
    stage: Stage,
}

impl<'a> Pipeline<'a> {
    fn new(options: &'a GenerateOptions) -> Self {
        Self { options, stage: Stage::Idle }
    }

    fn advance(&mut self, to: Stage) {
        debug_assert_eq!(self.stage.next(), Some(to), "stages must advance in order");
        self.stage = to;
        info!(stage = ?to, package = %self.options.package.display(), "stage complete");
    }

    /// Idle → Loaded → Extracted → Resolved.
    fn resolve(&mut self) -> Result<GenerationJob, GenError> {
        let options = self.options;
        let unit = loader::load_package(&options.package, Some(&options.output_file()))?;
        self.advance(Stage::Loaded);

        let extraction = extract::extract(
            &unit,
            &ExtractConfig {
                receiver: &options.receiver,
                context_type: &options.context_type,
                hooks: &options.hooks,
                same_crate: options.same_crate,
            },
        )?;
        self.advance(Stage::Extracted);

        let job = GenerationJob::resolve(options, &unit.crate_name, extraction)?;
        self.advance(Stage::Resolved);
        Ok(job)
    }
}

/// Load, extract and resolve without rendering or writing anything.
pub fn inspect(options: &GenerateOptions) -> Result<GenerationJob, GenError> {
    Pipeline::new(options).resolve()
}

/// Run the whole pipeline and overwrite the output file. Nothing is written
/// unless every earlier stage succeeded.
pub fn generate(options: &GenerateOptions, template: &Template) -> Result<GenerationReport, GenError> {
    let mut pipeline = Pipeline::new(options);
    let job = pipeline.resolve()?;

    let output = render::render(template, &job)?;
    pipeline.advance(Stage::Rendered);

    render::write_output(&job.output_file, &output)?;
    pipeline.advance(Stage::Written);

    Ok(GenerationReport {
        output_file: job.output_file,
        methods: job.methods.into_iter().map(|m| m.name).collect(),
        imports: job.imports.len(),
        bytes: output.len(),
        stage: pipeline.stage,
    })
}
