use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pathway_sbml::batch::{convert_species, BatchOptions};
use pathway_sbml::builder::{ConvertOptions, ModelBuilder};
use pathway_sbml::preview::render_preview;
use pathway_sbml::source::SnapshotSource;
use pathway_sbml::writer::write_sbml_file;

#[derive(Parser)]
#[command(author, version, about = "Convert pathway database records to SBML", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert one reaction or pathway.
    Convert {
        /// JSON database snapshot.
        #[arg(long)]
        db: PathBuf,
        /// Database id or stable id of the target.
        #[arg(long)]
        target: String,
        #[arg(long, default_value = "model.sbml")]
        output: PathBuf,
        /// Attach the stored diagram as an SBML layout.
        #[arg(long)]
        layout: bool,
        /// Also render the layout to this PNG (and an SVG beside it).
        #[arg(long, requires = "layout")]
        preview: Option<PathBuf>,
    },
    /// Convert every top-level pathway of one species.
    ConvertSpecies {
        #[arg(long)]
        db: PathBuf,
        #[arg(long)]
        species: String,
        #[arg(long)]
        output_dir: PathBuf,
        #[arg(long)]
        layout: bool,
        /// Worker threads; 0 uses one per core.
        #[arg(long, default_value_t = 0)]
        threads: usize,
        #[arg(long, default_value_t = BatchOptions::default().cache_clear_interval)]
        cache_clear_interval: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Convert {
            db,
            target,
            output,
            layout,
            preview,
        } => {
            let source = SnapshotSource::load(&db)
                .with_context(|| format!("Failed to load database snapshot {:?}", db))?;
            let doc = ModelBuilder::new(&source, ConvertOptions { layout })
                .convert(&target)
                .with_context(|| format!("Failed to convert {target}"))?;
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {:?}", parent))?;
            }
            write_sbml_file(&doc, &output)?;
            if let Some(preview) = preview {
                render_preview(&doc, &preview).context("Failed to render preview")?;
            }
            Ok(())
        }
        Command::ConvertSpecies {
            db,
            species,
            output_dir,
            layout,
            threads,
            cache_clear_interval,
        } => {
            let source = SnapshotSource::load(&db)
                .with_context(|| format!("Failed to load database snapshot {:?}", db))?;
            let options = BatchOptions {
                threads,
                cache_clear_interval,
                layout,
            };
            let report = convert_species(&source, &species, &output_dir, &options)?;
            if !report.is_success() {
                bail!(
                    "{} of {} pathways failed",
                    report.failed.len(),
                    report.failed.len() + report.converted.len()
                );
            }
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
