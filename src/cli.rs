//! CLI wiring for the drillbox binary.

use crate::config::types::PipelineConfig;
use crate::service::ExecutionService;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Sandboxed execution and test verification for code submissions", long_about = None)]
struct Cli {
    /// Pipeline configuration file (JSON); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a submission in the sandbox and print the outcome
    Run {
        /// Source file to execute; stdin when omitted
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Compile a submission with a test suite and run the tests
    Test {
        /// Submission source file
        submission: PathBuf,
        /// Test-suite source file
        tests: PathBuf,
    },
    /// Print the computed admission capacity for this host
    Capacity,
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn read_source(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading source {}", path.display())),
        None => {
            let mut source = String::new();
            std::io::stdin()
                .read_to_string(&mut source)
                .context("reading source from stdin")?;
            Ok(source)
        }
    }
}

pub fn run() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Run { file } => {
            let source = read_source(file.as_ref())?;
            let service = ExecutionService::new(config);
            print!("{}", service.run_submission(&source).render());
        }
        Commands::Test { submission, tests } => {
            let submission = std::fs::read_to_string(&submission)
                .with_context(|| format!("reading submission {}", submission.display()))?;
            let tests = std::fs::read_to_string(&tests)
                .with_context(|| format!("reading tests {}", tests.display()))?;
            let service = ExecutionService::new(config);
            let report = service.run_test_suite(&submission, &tests);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Capacity => {
            let per_sandbox = crate::admission::parse_memory_limit(&config.sandbox.memory_limit);
            let plan =
                crate::admission::plan_capacity(per_sandbox, config.admission.max_concurrency);
            println!(
                "cores: {}\nby-cpu cap: {}\nby-memory cap: {}\nceiling: {}\npermits: {}",
                plan.cores, plan.by_cpu, plan.by_memory, plan.ceiling, plan.permits
            );
        }
    }

    Ok(())
}
