use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use jrpc::config::{GenerateOptions, Overrides};
use jrpc::diagnostics::{render_error, GenError};
use jrpc::render::{Template, TemplateConfig};

#[derive(Parser)]
#[command(name = "jrpc", version, about = "Generate axum JSON handlers from a receiver type's methods")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate <genpath>/handler.rs for the receiver in a crate
    Generate(GenerateArgs),
    /// Print the resolved generation job as JSON without writing anything
    Inspect(GenerateArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Crate directory or path to its Cargo.toml
    package: PathBuf,
    /// Directory to write the generated handler file into
    #[arg(long)]
    genpath: Option<PathBuf>,
    /// Name of the generated module
    #[arg(long)]
    genmod: Option<String>,
    /// Receiver type whose methods become handlers
    #[arg(long)]
    receiver: Option<String>,
    /// Fully-qualified type treated as the per-request context token
    #[arg(long)]
    context_type: Option<String>,
    /// Treat encode/decode hook methods as ordinary methods
    #[arg(long)]
    no_hooks: bool,
    /// The generated module lives inside the introspected crate
    #[arg(long)]
    same_crate: bool,
    /// Config file to use instead of <package>/jrpc.toml
    #[arg(long)]
    config: Option<PathBuf>,
}

impl GenerateArgs {
    fn resolve(self) -> Result<GenerateOptions, GenError> {
        let overrides = Overrides {
            config: self.config,
            genpath: self.genpath,
            genmod: self.genmod,
            receiver: self.receiver,
            context_type: self.context_type,
            no_hooks: self.no_hooks,
            same_crate: self.same_crate,
        };
        GenerateOptions::resolve(self.package, &overrides)
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_max_level(level)
        .init();
}

fn fail(err: GenError) -> ! {
    if let Some(raw) = err.raw_output() {
        println!("{raw}");
    }
    render_error(&err);
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Generate(args) => {
            let options = args.resolve().unwrap_or_else(|err| fail(err));
            let template = Template::new(&TemplateConfig::default());
            match jrpc::generate(&options, &template) {
                Ok(report) => {
                    eprintln!(
                        "  generated {} \u{2192} {} handler(s)",
                        report.output_file.display(),
                        report.methods.len()
                    );
                }
                Err(err) => fail(err),
            }
        }
        Commands::Inspect(args) => {
            let options = args.resolve().unwrap_or_else(|err| fail(err));
            let job = jrpc::inspect(&options).unwrap_or_else(|err| fail(err));
            match serde_json::to_string_pretty(&job) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("error: could not serialize job: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
