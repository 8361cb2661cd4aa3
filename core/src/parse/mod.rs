pub mod qchem;

pub use qchem::{QchemLog, QchemOptions, TrajectoryMode};

use crate::{error::Error, molecule::MoleculeSet};

/// The result of turning one input file into a molecule set.
#[derive(Debug)]
pub enum ParseOutcome {
    Complete(MoleculeSet),
    /// a molecule set could be built, but part of the input was unusable
    Partial {
        mset: MoleculeSet,
        warnings: Vec<String>,
    },
    Failed(Error),
}

impl ParseOutcome {
    pub fn molecule_set(&self) -> Option<&MoleculeSet> {
        match self {
            Self::Complete(mset) | Self::Partial { mset, .. } => Some(mset),
            Self::Failed(_) => None,
        }
    }

    pub fn molecule_set_mut(&mut self) -> Option<&mut MoleculeSet> {
        match self {
            Self::Complete(mset) | Self::Partial { mset, .. } => Some(mset),
            Self::Failed(_) => None,
        }
    }

    pub fn into_molecule_set(self) -> Option<MoleculeSet> {
        match self {
            Self::Complete(mset) | Self::Partial { mset, .. } => Some(mset),
            Self::Failed(_) => None,
        }
    }

    pub fn warnings(&self) -> &[String] {
        match self {
            Self::Partial { warnings, .. } => warnings,
            _ => &[],
        }
    }
}
