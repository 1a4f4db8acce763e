//! Bulk conversion of every top-level pathway of one species.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::builder::{ConvertOptions, ModelBuilder};
use crate::error::{ConvertError, Result};
use crate::model::TargetRecord;
use crate::source::PathwaySource;
use crate::writer::write_sbml_file;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchOptions {
    /// Worker threads; 0 lets rayon pick.
    pub threads: usize,
    /// Targets converted between source cache flushes.
    pub cache_clear_interval: usize,
    pub layout: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            threads: 0,
            cache_clear_interval: 50,
            layout: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub converted: Vec<PathBuf>,
    /// Target identifier and error message for every failed conversion.
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Convert each top-level pathway of `species` into `<stable id>.sbml` under
/// `out_dir`. A failing target is logged and recorded; the rest still run.
pub fn convert_species<S: PathwaySource + ?Sized>(
    source: &S,
    species: &str,
    out_dir: &Path,
    options: &BatchOptions,
) -> Result<BatchReport> {
    fs::create_dir_all(out_dir).map_err(|source| ConvertError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;
    let targets = source.pathways_for_species(species)?;
    tracing::info!(species, pathways = targets.len(), "batch conversion started");

    let pool = ThreadPoolBuilder::new().num_threads(options.threads).build()?;
    let convert_options = ConvertOptions {
        layout: options.layout,
    };

    let mut report = BatchReport::default();
    for chunk in targets.chunks(options.cache_clear_interval.max(1)) {
        let results: Vec<(&TargetRecord, Result<PathBuf>)> = pool.install(|| {
            chunk
                .par_iter()
                .map(|target| (target, convert_one(source, target, out_dir, convert_options)))
                .collect()
        });
        for (target, result) in results {
            match result {
                Ok(path) => report.converted.push(path),
                Err(err) => {
                    tracing::error!(target = %target.file_stem(), error = %err, "conversion failed");
                    report.failed.push((target.file_stem(), err.to_string()));
                }
            }
        }
        source.clear_cache();
    }

    tracing::info!(
        converted = report.converted.len(),
        failed = report.failed.len(),
        "batch conversion finished"
    );
    Ok(report)
}

fn convert_one<S: PathwaySource + ?Sized>(
    source: &S,
    target: &TargetRecord,
    out_dir: &Path,
    options: ConvertOptions,
) -> Result<PathBuf> {
    let doc = ModelBuilder::new(source, options).convert_target(target)?;
    let path = out_dir.join(format!("{}.sbml", target.file_stem()));
    write_sbml_file(&doc, &path)?;
    Ok(path)
}
