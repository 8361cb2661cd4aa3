//! Turns a directory of logs or an archive into `.mset` files.
use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{
    archive::{ArchiveOptions, Batch},
    config::{IngestJob, SourceKind},
    error::{Error, Result},
    molecule::MoleculeSet,
    parse::{qchem, ParseOutcome, QchemOptions},
};

/// What happened to every input of a job.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub written: Vec<PathBuf>,
    /// written, but parsed with warnings
    pub partial: Vec<PathBuf>,
    /// output already existed
    pub skipped: Vec<PathBuf>,
    /// archive groups without a single finite frame
    pub dropped: Vec<String>,
    pub failures: Vec<Failure>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub source: String,
    pub reason: String,
}

impl IngestReport {
    fn fail(&mut self, source: impl Into<String>, reason: impl ToString) {
        let source = source.into();
        let reason = reason.to_string();
        log::warn!("{source}: {reason}");
        self.failures.push(Failure { source, reason });
    }

    pub fn n_outputs(&self) -> usize {
        self.written.len() + self.partial.len()
    }
}

/// Run a whole job. Only errors that concern the job itself (unreadable input
/// directory, unopenable archive) are returned; a bad input file ends up in
/// [`IngestReport::failures`].
pub fn run(job: &IngestJob) -> Result<IngestReport> {
    let report = match &job.source {
        SourceKind::QchemLogs { extension, options } => ingest_logs(job, extension, options)?,
        SourceKind::Archive { options } => ingest_archive(job, options)?,
    };

    log::info!(
        "{}: {} written, {} partial, {} skipped, {} dropped, {} failed",
        job.input.display(),
        report.written.len(),
        report.partial.len(),
        report.skipped.len(),
        report.dropped.len(),
        report.failures.len()
    );
    Ok(report)
}

/// Every file below `root` with the given extension, sorted.
pub fn find_inputs(root: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == extension) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// `input/a/b/mol.out` → `output_root/a/b/mol.mset`
fn output_path(input_root: &Path, output_root: &Path, input: &Path) -> PathBuf {
    let relative = input.strip_prefix(input_root).unwrap_or(input);
    output_root.join(relative).with_extension("mset")
}

fn save(mset: &mut MoleculeSet, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    mset.set_filename(path);
    mset.save(None)
}

pub fn ingest_logs(
    job: &IngestJob,
    extension: &str,
    options: &QchemOptions,
) -> Result<IngestReport> {
    let inputs = if job.input.is_dir() {
        find_inputs(&job.input, extension)?
    } else {
        vec![job.input.clone()]
    };
    let input_root = if job.input.is_dir() {
        job.input.as_path()
    } else {
        job.input.parent().unwrap_or(Path::new(""))
    };
    log::info!("{} log files in {}", inputs.len(), job.input.display());

    let mut report = IngestReport::default();
    for input in inputs {
        let output = output_path(input_root, &job.output_root, &input);
        let source = input.display().to_string();
        if output.exists() && !job.overwrite {
            log::debug!("{} exists, skipping {source}", output.display());
            report.skipped.push(output);
            continue;
        }

        match qchem::parse_file(&input, options) {
            ParseOutcome::Complete(mut mset) => match save(&mut mset, &output) {
                Ok(()) => report.written.push(output),
                Err(err) => report.fail(source, err),
            },
            ParseOutcome::Partial { mut mset, warnings } if job.accept_partial => {
                for warning in warnings {
                    log::debug!("{source}: {warning}");
                }
                match save(&mut mset, &output) {
                    Ok(()) => report.partial.push(output),
                    Err(err) => report.fail(source, err),
                }
            }
            ParseOutcome::Partial { warnings, .. } => report.fail(source, warnings.join("; ")),
            ParseOutcome::Failed(err) => report.fail(source, err),
        }
    }
    Ok(report)
}

/// Write one `.mset` per batch that keeps at least one finite frame. The
/// `n`th such batch is written to `{file_prefix}{n}.mset`.
pub fn ingest_batches(
    batches: impl IntoIterator<Item = Result<Batch>>,
    job: &IngestJob,
    options: &ArchiveOptions,
) -> IngestReport {
    let mut report = IngestReport::default();
    let mut index = 0;
    for batch in batches {
        let batch = match batch {
            Ok(batch) => batch,
            Err(err) => {
                let source = match &err {
                    Error::Archive { group, .. } => group.clone(),
                    _ => job.input.display().to_string(),
                };
                report.fail(source, err);
                continue;
            }
        };

        let name = batch.name.clone();
        let Some(batch) = batch.retain_finite() else {
            log::debug!("group {name} has no finite frame");
            report.dropped.push(name);
            continue;
        };

        let output = job
            .output_root
            .join(format!("{}{index}.mset", options.file_prefix));
        index += 1;
        if output.exists() && !job.overwrite {
            report.skipped.push(output);
            continue;
        }

        let written = batch
            .into_molecule_set(options)
            .and_then(|mut mset| save(&mut mset, &output));
        match written {
            Ok(()) => report.written.push(output),
            Err(err) => report.fail(name, err),
        }
    }
    report
}

#[cfg(feature = "hdf5")]
pub fn ingest_archive(job: &IngestJob, options: &ArchiveOptions) -> Result<IngestReport> {
    let batches = crate::archive::h5::open(&job.input, &options.properties)?;
    Ok(ingest_batches(batches, job, options))
}

#[cfg(not(feature = "hdf5"))]
pub fn ingest_archive(job: &IngestJob, _options: &ArchiveOptions) -> Result<IngestReport> {
    Err(Error::archive(
        job.input.display().to_string(),
        "archive support requires the `hdf5` feature",
    ))
}
