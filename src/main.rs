//! stack-import - Import multi-dimensional image files as plane stacks.
//!
//! `import` runs the import pipeline non-interactively and exports the
//! resulting stacks; `info` describes a file without decoding planes.

use clap::Parser;
use serde_json::json;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stack_importer::{
    config::{Cli, Command, ImportConfig, InfoConfig},
    describe_series,
    frontend::{PrintMetadata, StackExporter, StderrReporter, TracingStatus},
    Collaborators, FileSource, FormatReader, ImportOutcome, Importer, JsonPreferences,
    MetadataTable, SourceOpener,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Import(config) => run_import(config),
        Command::Info(config) => run_info(config),
    }
}

// =============================================================================
// Import Command
// =============================================================================

fn run_import(config: ImportConfig) -> ExitCode {
    init_logging(config.read.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let mut prompt = match config.prompt() {
        Ok(prompt) => prompt,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut preferences = match JsonPreferences::load(&config.prefs) {
        Ok(preferences) => preferences,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut exporter = StackExporter::new(config.output.clone());
    let mut metadata = PrintMetadata::stdout();
    let mut status = TracingStatus;
    let mut errors = StderrReporter;

    let importer = Importer::new(FileSource::new(config.read.block_size, config.read.cache_blocks))
        .quiet(config.quiet);

    let mut io = Collaborators {
        prompt: &mut prompt,
        display: &mut exporter,
        metadata: &mut metadata,
        preferences: &mut preferences,
        status: &mut status,
        errors: &mut errors,
    };

    match importer.run(&config.path, &mut io) {
        Ok(ImportOutcome::Completed { products, series }) => {
            info!(
                products,
                series,
                files = exporter.written(),
                "Import complete"
            );
            if let Some(dir) = &config.output {
                info!("Slices written to {}", dir.display());
            }
            if exporter.failures() > 0 {
                error!("{} image(s) could not be exported", exporter.failures());
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Ok(ImportOutcome::Canceled) => {
            info!("Import canceled");
            ExitCode::SUCCESS
        }
        // Already logged and reported by the importer.
        Err(_) => ExitCode::FAILURE,
    }
}

// =============================================================================
// Info Command
// =============================================================================

fn run_info(config: InfoConfig) -> ExitCode {
    init_logging(config.read.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let source = FileSource::new(config.read.block_size, config.read.cache_blocks);
    if !source.exists(&config.path) {
        error!("File not found: {}", config.path.display());
        return ExitCode::FAILURE;
    }

    let mut reader = match source.open(&config.path) {
        Ok(reader) => reader,
        Err(e) => {
            error!("Cannot open {}: {}", config.path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let described = describe_series(&mut reader).map(|series| {
        let table = MetadataTable::from_reader(&reader);
        (series, table)
    });
    let format = reader.format_name();
    if let Err(e) = reader.close() {
        error!("Failed to close {}: {}", config.path.display(), e);
    }

    let (series, table) = match described {
        Ok(described) => described,
        Err(e) => {
            error!("Cannot describe {}: {}", config.path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if config.json {
        let value = json!({
            "path": config.path.display().to_string(),
            "format": format,
            "series": series,
            "metadata": table,
        });
        match serde_json::to_string_pretty(&value) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                error!("Failed to serialize description: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{} ({})", config.path.display(), format);
        for descriptor in &series {
            println!("  {}", descriptor.label());
        }
        println!();
        for (key, value) in table.entries() {
            println!("{}\t{}", key, value);
        }
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Utilities
// =============================================================================

/// Initialize the tracing subscriber for logging.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        "stack_importer=debug"
    } else {
        "stack_importer=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
