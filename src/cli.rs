//! Command-line interface for docsmith.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::analysis::FileAnalyzer;
use crate::cache::AnalysisCache;
use crate::config::Settings;
use crate::generate::OpenAiGenerator;
use crate::provider::LocalProvider;
use crate::publish::{ChangePublisher, LocalPublisher};
use crate::report;
use crate::walker::{ScanOptions, Scanner};
use crate::workflow::{DocumentationWorkflow, Trigger, WorkflowStatus};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Find undocumented functions and classes and fill them with generated
/// documentation.
///
/// Python, JavaScript and TypeScript files are analyzed. Results are cached
/// by content, so unchanged files are not re-analyzed on the next run.
#[derive(Parser)]
#[command(name = "docsmith")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Report undocumented functions and classes
    Scan(ScanArgs),
    /// Generate documentation and write the documented files
    Document(DocumentArgs),
}

/// Options shared by every command.
#[derive(Args)]
pub struct CommonArgs {
    /// Repository directory
    pub path: PathBuf,

    /// Path to settings YAML file (default: auto-discover in PATH)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Repository name used in cache keys (default: directory name)
    #[arg(long)]
    pub repo: Option<String>,

    /// Do not use the persistent analysis cache
    #[arg(long)]
    pub no_cache: bool,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

#[derive(Args)]
pub struct ScanArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args)]
pub struct DocumentArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Write documented files under DIR/<branch> instead of in place
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,
}

/// Everything a command needs after argument validation.
struct Prepared {
    root: PathBuf,
    repository: String,
    settings: Settings,
    json: bool,
}

fn prepare(args: &CommonArgs) -> Result<Prepared, i32> {
    if args.format != "pretty" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            args.format
        );
        return Err(EXIT_ERROR);
    }

    let root = match args.path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Err(EXIT_ERROR);
        }
    };
    if !root.is_dir() {
        eprintln!("Error: {} is not a directory", root.display());
        return Err(EXIT_ERROR);
    }

    let mut settings = match Settings::load(args.config.as_deref(), &root) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: invalid settings: {:#}", e);
            return Err(EXIT_ERROR);
        }
    };
    if args.no_cache {
        settings.cache.enabled = false;
    }

    let repository = args
        .repo
        .clone()
        .unwrap_or_else(|| repository_name(&root));

    Ok(Prepared {
        root,
        repository,
        settings,
        json: args.format == "json",
    })
}

fn repository_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "repository".to_string())
}

fn build_scanner(prepared: &Prepared, cache: Arc<AnalysisCache>) -> anyhow::Result<Scanner> {
    Ok(Scanner::new(
        Arc::new(LocalProvider::new(&prepared.root)),
        Arc::new(FileAnalyzer::new(cache)),
        ScanOptions::from_config(&prepared.settings.scan)?,
    ))
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

/// Run the scan command.
pub fn run_scan(args: &ScanArgs) -> anyhow::Result<i32> {
    let prepared = match prepare(&args.common) {
        Ok(p) => p,
        Err(code) => return Ok(code),
    };

    let (report, stats) = runtime()?.block_on(async {
        let cache = Arc::new(AnalysisCache::connect(&prepared.settings.cache).await);
        let scanner = build_scanner(&prepared, cache.clone())?;
        let report = scanner.scan(&prepared.repository).await;
        let stats = cache.stats();
        cache.close().await;
        anyhow::Ok((report?, stats))
    })?;

    if prepared.json {
        report::write_scan_json(&report, stats)?;
    } else {
        report::write_scan_pretty(&report, stats);
    }

    if report.needs_docs() {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the document command.
pub fn run_document(args: &DocumentArgs) -> anyhow::Result<i32> {
    let prepared = match prepare(&args.common) {
        Ok(p) => p,
        Err(code) => return Ok(code),
    };

    let generator = match OpenAiGenerator::new(&prepared.settings.generation) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!(
                "Set {} or generation.api_key in the settings file",
                prepared.settings.generation.api_key_env
            );
            return Ok(EXIT_ERROR);
        }
    };

    let publisher: Arc<dyn ChangePublisher> = match &args.output {
        Some(output) => Arc::new(LocalPublisher::to_output(&prepared.root, output)),
        None => Arc::new(LocalPublisher::in_place(&prepared.root)),
    };

    let outcome = runtime()?.block_on(async {
        let cache = Arc::new(AnalysisCache::connect(&prepared.settings.cache).await);
        let workflow = DocumentationWorkflow::new(
            build_scanner(&prepared, cache.clone())?,
            Arc::new(generator),
            publisher,
            prepared.settings.publish.branch_prefix.clone(),
        );
        let outcome = workflow.run(&prepared.repository, Trigger::Manual).await;
        cache.close().await;
        anyhow::Ok(outcome?)
    })?;

    if prepared.json {
        report::write_outcome_json(&outcome)?;
    } else {
        report::write_outcome_pretty(&outcome);
    }

    match outcome.status() {
        WorkflowStatus::NoDocumentationNeeded | WorkflowStatus::Documented => Ok(EXIT_SUCCESS),
        WorkflowStatus::DocumentedWithErrors(_) | WorkflowStatus::Failed(_) => Ok(EXIT_FAILED),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_document_args() {
        let cli = Cli::parse_from([
            "docsmith", "-v", "document", "repo", "--output", "out", "--no-cache",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Document(args) => {
                assert_eq!(args.common.path, PathBuf::from("repo"));
                assert_eq!(args.output, Some(PathBuf::from("out")));
                assert!(args.common.no_cache);
                assert_eq!(args.common.format, "pretty");
            }
            Commands::Scan(_) => panic!("expected document"),
        }
    }

    #[test]
    fn test_repository_name() {
        assert_eq!(repository_name(Path::new("/work/widgets")), "widgets");
    }

    fn scan_args(path: &Path, format: &str) -> ScanArgs {
        ScanArgs {
            common: CommonArgs {
                path: path.to_path_buf(),
                config: None,
                repo: Some("test".to_string()),
                no_cache: true,
                format: format.to_string(),
            },
        }
    }

    #[test]
    fn test_scan_exit_codes() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("ok.py"),
            "def ok():\n    \"\"\"Already documented well.\"\"\"\n",
        )
        .unwrap();
        assert_eq!(run_scan(&scan_args(dir.path(), "json")).unwrap(), EXIT_SUCCESS);

        fs::write(dir.path().join("todo.py"), "def todo():\n    pass\n").unwrap();
        assert_eq!(run_scan(&scan_args(dir.path(), "json")).unwrap(), EXIT_FAILED);

        assert_eq!(run_scan(&scan_args(dir.path(), "xml")).unwrap(), EXIT_ERROR);
        assert_eq!(
            run_scan(&scan_args(&dir.path().join("missing"), "pretty")).unwrap(),
            EXIT_ERROR
        );
    }
}
