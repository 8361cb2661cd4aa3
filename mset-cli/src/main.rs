use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use mset_core::{
    archive::{ArchiveOptions, FrameSelection},
    compare,
    config::{IngestJob, SourceKind},
    ingest::{self, IngestReport},
    parse::{qchem, ParseOutcome, QchemOptions, TrajectoryMode},
    MinEnergy, MoleculeSet,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: MsetCommand,
}

#[derive(Subcommand, Debug)]
enum MsetCommand {
    /// Run an ingestion job described by a JSON file
    #[command(name = "ingest")]
    Ingest {
        /// The job file
        #[arg(long, short)]
        config: PathBuf,
        /// Replace molecule sets that already exist
        #[arg(long, action = ArgAction::SetTrue)]
        overwrite: bool,
        /// Also write molecule sets of partially parsed inputs
        #[arg(long, action = ArgAction::SetTrue)]
        accept_partial: bool,
        /// Where to write the JSON report, stdout if omitted
        #[arg(long, short)]
        report: Option<PathBuf>,
    },
    /// Convert one Q-Chem log into a molecule set
    #[command(name = "qchem")]
    Qchem {
        /// The log file
        #[arg(long, short)]
        log: PathBuf,
        /// The molecule set to write, next to the log if omitted
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Keep every optimization step instead of the converged geometries
        #[arg(long, action = ArgAction::SetTrue)]
        all_frames: bool,
    },
    /// Convert every group of an ANI-style HDF5 archive into a molecule set
    #[command(name = "archive")]
    Archive {
        /// The archive file
        #[arg(long, short)]
        input: PathBuf,
        /// Directory the molecule sets are written to
        #[arg(long, short)]
        output_root: PathBuf,
        /// Property keys to read from every group
        #[arg(long = "property", short)]
        properties: Vec<String>,
        /// Only keep the last frame of every group
        #[arg(long, action = ArgAction::SetTrue)]
        last_frame: bool,
        #[arg(long, default_value = "ani1x-mol")]
        file_prefix: String,
        #[arg(long, action = ArgAction::SetTrue)]
        overwrite: bool,
    },
    /// Write all geometries of a molecule set as an xyz trajectory
    #[command(name = "xyz")]
    Xyz {
        mset: PathBuf,
        /// defaults to the molecule set path with an `xyz` extension
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Print formula, trajectories and lowest energy of molecule sets
    #[command(name = "summary")]
    Summary {
        /// Molecule set files or directories containing them
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Match molecule sets of two collections by an identifier
    #[command(name = "compare")]
    Compare {
        #[arg(long, short)]
        left: Vec<PathBuf>,
        #[arg(long, short)]
        right: Vec<PathBuf>,
        #[arg(long, short, default_value = "smiles")]
        identifier: String,
        /// Where to write the matches, stdout if omitted
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Group molecule sets by chemical formula
    #[command(name = "isomers")]
    Isomers {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

/// Every `.mset` file named directly or found below one of the directories.
fn collect_msets(paths: &[PathBuf]) -> Result<Vec<MoleculeSet>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(
                ingest::find_inputs(path, "mset")
                    .with_context(|| format!("listing {}", path.display()))?,
            );
        } else {
            files.push(path.clone());
        }
    }

    files
        .iter()
        .map(|file| {
            MoleculeSet::open(file).with_context(|| format!("loading {}", file.display()))
        })
        .collect()
}

fn write_json(value: &impl Serialize, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run_job(job: &IngestJob, report_path: Option<&Path>) -> Result<IngestReport> {
    let report = ingest::run(job).with_context(|| format!("ingesting {}", job.input.display()))?;
    write_json(&report, report_path)?;
    Ok(report)
}

fn summarize(mset: &MoleculeSet) -> Result<()> {
    let name = mset
        .filename()
        .map(|path| path.display().to_string())
        .unwrap_or_default();
    println!("{name}");
    println!("  formula:      {}", mset.formula_string()?);
    println!("  atoms:        {}", mset.n_atoms());
    for (key, value) in mset.identifiers() {
        println!("  {key}: {value}");
    }
    for (trajectory, geometries) in mset.trajectories() {
        println!("  {trajectory}: {} geometries", geometries.len());
    }
    match mset.min_energy_geometry() {
        MinEnergy::Found { label, energy, .. } => println!("  lowest {label}: {energy:.10}"),
        MinEnergy::NoEnergyLabel => println!("  no energy label"),
    }
    Ok(())
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let args: Args = Args::parse();

    match args.command {
        MsetCommand::Ingest {
            config,
            overwrite,
            accept_partial,
            report,
        } => {
            let mut job = IngestJob::load(&config)
                .with_context(|| format!("reading job {}", config.display()))?;
            job.overwrite |= overwrite;
            job.accept_partial |= accept_partial;

            let report = run_job(&job, report.as_deref())?;
            if report.n_outputs() == 0 && !report.failures.is_empty() {
                bail!("no molecule set written, {} inputs failed", report.failures.len());
            }
        }
        MsetCommand::Qchem {
            log: log_file,
            output,
            all_frames,
        } => {
            let options = QchemOptions {
                mode: if all_frames {
                    TrajectoryMode::AllFrames
                } else {
                    TrajectoryMode::Converged
                },
                ..QchemOptions::default()
            };
            let output = output.unwrap_or_else(|| log_file.with_extension("mset"));

            let mset = match qchem::parse_file(&log_file, &options) {
                ParseOutcome::Complete(mset) | ParseOutcome::Partial { mset, .. } => mset,
                ParseOutcome::Failed(err) => {
                    return Err(err).with_context(|| format!("parsing {}", log_file.display()))
                }
            };
            mset.save(Some(output.as_path()))
                .with_context(|| format!("writing {}", output.display()))?;
            println!("{}", output.display());
        }
        MsetCommand::Archive {
            input,
            output_root,
            properties,
            last_frame,
            file_prefix,
            overwrite,
        } => {
            let options = ArchiveOptions {
                properties,
                frames: if last_frame {
                    FrameSelection::Last
                } else {
                    FrameSelection::All
                },
                file_prefix,
                ..ArchiveOptions::default()
            };
            let job = IngestJob {
                input,
                output_root,
                source: SourceKind::Archive { options },
                overwrite,
                accept_partial: false,
            };
            fs::create_dir_all(&job.output_root)
                .with_context(|| format!("creating {}", job.output_root.display()))?;
            run_job(&job, None)?;
        }
        MsetCommand::Xyz { mset, output } => {
            let loaded = MoleculeSet::open(&mset)
                .with_context(|| format!("loading {}", mset.display()))?;
            let written = match output {
                Some(output) => {
                    loaded.write_xyz_trajectory_to(&output)?;
                    output
                }
                None => loaded.write_xyz_trajectory()?,
            };
            println!("{}", written.display());
        }
        MsetCommand::Summary { paths } => {
            for mset in collect_msets(&paths)? {
                summarize(&mset)?;
            }
        }
        MsetCommand::Compare {
            left,
            right,
            identifier,
            output,
        } => {
            let left = collect_msets(&left)?;
            let right = collect_msets(&right)?;
            log::info!("comparing {} with {} molecule sets", left.len(), right.len());

            let matches = compare::match_identifier(&left, &right, &identifier);
            write_json(&matches, output.as_deref())?;
        }
        MsetCommand::Isomers { paths } => {
            let msets = collect_msets(&paths)?;
            for (formula, group) in compare::isomer_groups(&msets) {
                let names = group
                    .iter()
                    .filter_map(|mset| mset.filename())
                    .map(|path| path.display().to_string())
                    .collect::<Vec<_>>();
                println!("{formula}: {}", names.join(" "));
            }
        }
    }

    Ok(())
}
