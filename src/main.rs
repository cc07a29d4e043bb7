use clap::{Parser, Subcommand};
use codeintel_extract::indexing::WorkspaceWalker;
use codeintel_extract::{parsing, Settings};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "codeintel-extract")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-language code-intelligence extraction engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Extract symbols, relationships, and inferred types from one file
    Extract {
        /// Path to the file to extract
        path: PathBuf,

        /// Emit the full extraction as JSON instead of a human-readable summary
        #[arg(long)]
        json: bool,
    },

    /// Walk a directory and extract every supported source file
    Scan {
        /// Path to the directory to scan
        path: PathBuf,

        /// Number of threads to use (overrides config)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Show progress while scanning
        #[arg(short, long)]
        progress: bool,

        /// List files that would be scanned without extracting them
        #[arg(long)]
        dry_run: bool,

        /// Write each file's extraction as a JSON line to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show current configuration
    Config,
}

fn main() {
    let cli = Cli::parse();

    let mut config = Settings::load().unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        Settings::default()
    });
    codeintel_extract::logging::init_with_config(&config.logging);

    match cli.command {
        Commands::Init { force } => run_init(force),
        Commands::Config => run_config(&config),
        Commands::Extract { path, json } => run_extract(&path, json),
        Commands::Scan {
            path,
            threads,
            progress,
            dry_run,
            output,
        } => {
            if let Some(t) = threads {
                config.indexing.parallel_threads = t;
            }
            run_scan(&config, &path, progress, dry_run, output.as_deref())
        }
    }
}

fn run_init(force: bool) {
    match Settings::init_config_file(force) {
        Ok(path) => {
            println!("Created configuration file at: {}", path.display());
            println!("Edit this file to customize your settings.");
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn run_config(config: &Settings) {
    println!("Current Configuration:");
    println!("{}", "=".repeat(50));
    match toml::to_string_pretty(config) {
        Ok(toml_str) => println!("{toml_str}"),
        Err(e) => eprintln!("Error displaying config: {e}"),
    }
}

fn run_extract(path: &PathBuf, json: bool) {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading {}: {e}", path.display());
            std::process::exit(1);
        }
    };

    match parsing::extract_source(path, &source, None, None) {
        Ok(extraction) => {
            if json {
                match serde_json::to_string_pretty(&ExtractionView::from(&extraction)) {
                    Ok(s) => println!("{s}"),
                    Err(e) => {
                        eprintln!("Error serializing extraction: {e}");
                        std::process::exit(1);
                    }
                }
                return;
            }

            let language = parsing::Language::from_path(path)
                .map(|l| l.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            println!("{} [{}]", path.display(), language);
            println!(
                "{} symbol(s), {} relationship(s), {} inferred type(s){}",
                extraction.symbols.len(),
                extraction.relationships.len(),
                extraction.types.len(),
                if extraction.truncated { " (truncated)" } else { "" }
            );
            println!();

            for symbol in &extraction.symbols {
                let parent = symbol
                    .parent_id
                    .map(|_| " (nested)")
                    .unwrap_or_default();
                println!(
                    "  {:?} {} @ {}:{}{}",
                    symbol.kind,
                    symbol.name,
                    symbol.range.start_line,
                    symbol.range.start_column,
                    parent
                );
                if let Some(sig) = &symbol.signature {
                    println!("      {sig}");
                }
            }

            if !extraction.relationships.is_empty() {
                println!();
                println!("Relationships:");
                for relationship in &extraction.relationships {
                    println!(
                        "  {:?} -> {:?} (confidence {:.2})",
                        relationship.kind, relationship.to, relationship.confidence
                    );
                }
            }
        }
        Err(e) => {
            eprintln!("Error extracting {}: {e}", path.display());
            std::process::exit(1);
        }
    }
}

fn run_scan(config: &Settings, path: &PathBuf, progress: bool, dry_run: bool, output: Option<&std::path::Path>) {
    let walker = WorkspaceWalker::new(Arc::new(config.clone()));

    if dry_run {
        let files = walker.discover(path);
        println!("Would scan {} file(s):", files.len());
        for file in &files {
            println!("  {}", file.display());
        }
        return;
    }

    println!("Scanning: {}", path.display());
    let (results, stats) = walker.extract_workspace(path);

    if let Some(output_path) = output {
        if let Err(e) = write_results(output_path, &results) {
            eprintln!("Error writing output: {e}");
            std::process::exit(1);
        }
        println!("Wrote extraction for {} file(s) to {}", results.len(), output_path.display());
    }

    for result in &results {
        if let Err(e) = &result.outcome {
            eprintln!("Error extracting {}: {e}", result.path.display());
        } else if progress {
            println!("  {}", result.path.display());
        }
    }

    println!();
    stats.display();
}

fn write_results(
    output_path: &std::path::Path,
    results: &[codeintel_extract::indexing::FileResult],
) -> std::io::Result<()> {
    use std::io::Write;
    let mut file = std::fs::File::create(output_path)?;
    for result in results {
        let Ok(extraction) = &result.outcome else {
            continue;
        };
        let line = FileResultView {
            path: &result.path,
            extraction: ExtractionView::from(extraction),
        };
        let json = serde_json::to_string(&line).unwrap_or_else(|_| "{}".to_string());
        writeln!(file, "{json}")?;
    }
    Ok(())
}

/// The §6 "Exposed to the index" shape for one file, serialized for
/// downstream consumption. The index itself (persistence, query planner) is
/// out of scope; this is as far as the core's responsibility runs.
#[derive(serde::Serialize)]
struct ExtractionView<'a> {
    symbols: &'a [codeintel_extract::Symbol],
    relationships: &'a [codeintel_extract::Relationship],
    types: &'a [codeintel_extract::TypeInfo],
    truncated: bool,
}

impl<'a> From<&'a parsing::FileExtraction> for ExtractionView<'a> {
    fn from(extraction: &'a parsing::FileExtraction) -> Self {
        Self {
            symbols: &extraction.symbols,
            relationships: &extraction.relationships,
            types: &extraction.types,
            truncated: extraction.truncated,
        }
    }
}

#[derive(serde::Serialize)]
struct FileResultView<'a> {
    path: &'a PathBuf,
    #[serde(flatten)]
    extraction: ExtractionView<'a>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }
}
