use std::{fmt::Write as _, fs, path::Path};

use nalgebra::Vector3;

use crate::{
    atom::Atom,
    error::{Error, Result},
    label::{LabelValue, Labels},
};

/// A single conformation: positioned atoms plus molecule-level labels.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    pub(crate) atoms: Vec<Atom>,
    pub(crate) labels: Labels,
}

impl Geometry {
    pub(crate) fn new(atoms: Vec<Atom>, labels: Labels) -> Self {
        Self { atoms, labels }
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn n_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn atomic_numbers(&self) -> Vec<u32> {
        self.atoms.iter().map(Atom::atomic_num).collect()
    }

    pub fn symbols(&self) -> Result<Vec<&'static str>> {
        self.atoms.iter().map(Atom::symbol).collect()
    }

    pub fn positions(&self) -> Vec<Option<Vector3<f64>>> {
        self.atoms.iter().map(|atom| atom.position).collect()
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn label(&self, name: &str) -> Option<&LabelValue> {
        self.labels.get(name)
    }

    /// Describes the first position or label holding a NaN or infinite value.
    pub fn non_finite(&self) -> Option<String> {
        if let Some((name, _)) = self.labels.iter().find(|(_, value)| !value.is_finite()) {
            return Some(format!("label '{name}'"));
        }
        self.atoms.iter().enumerate().find_map(|(index, atom)| {
            if atom
                .position
                .is_some_and(|position| position.iter().any(|c| !c.is_finite()))
            {
                return Some(format!("position of atom {index}"));
            }
            atom.labels
                .iter()
                .find(|(_, value)| !value.is_finite())
                .map(|(name, _)| format!("label '{name}' of atom {index}"))
        })
    }

    /// The xyz block of this geometry: atom count, a blank comment line, then
    /// one `symbol x y z` line per atom. Coordinates keep full precision.
    pub fn to_xyz(&self) -> Result<String> {
        let mut xyz = format!("{}\n\n", self.n_atoms());
        for (index, atom) in self.atoms.iter().enumerate() {
            let symbol = atom.symbol()?;
            let position = atom.position.ok_or(Error::MissingPosition(index))?;
            writeln!(
                xyz,
                "{symbol}     {:?}     {:?}     {:?}",
                position.x, position.y, position.z
            )
            .ok();
        }
        Ok(xyz)
    }

    pub fn write_xyz(&self, path: impl AsRef<Path>) -> Result<()> {
        let xyz = self.to_xyz()?;
        fs::write(path, xyz)?;
        Ok(())
    }
}
