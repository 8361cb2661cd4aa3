use std::{
    cell::OnceCell,
    collections::{hash_map::DefaultHasher, BTreeMap},
    fs::{self, File},
    hash::{Hash, Hasher},
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use itertools::Itertools;
use nalgebra::Vector3;
use serde_json::Value;

use crate::{
    atom::Atom,
    config::{same_composition, MsetDocument},
    error::{Error, Result},
    geometry::Geometry,
    label::{AtomLabels, Labels},
    periodic_table,
};

/// Energy labels tried, in order, by [`MoleculeSet::min_energy_geometry`] before
/// falling back to any `*.energy` / `*.potential` label.
pub const DEFAULT_ENERGY_LABELS: [&str; 3] = [
    "wb97x-d.6-311gss.energy",
    "wB97X-D.6-311g**.potential",
    "wb97x_tz.energy",
];

/// A fixed chemical composition and every geometry recorded for it, grouped
/// into named trajectories.
#[derive(Clone, Debug, Default)]
pub struct MoleculeSet {
    pub(crate) atoms: Vec<Atom>,
    pub(crate) trajectories: IndexMap<String, Vec<Geometry>>,
    pub(crate) identifiers: IndexMap<String, Value>,
    pub(crate) min_geom: OnceCell<Option<LowestEnergy>>,
    pub(crate) filename: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct LowestEnergy {
    index: usize,
    label: String,
    energy: f64,
}

/// The result of a minimum energy lookup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MinEnergy<'a> {
    /// `geometry` has the lowest value of `label` among all geometries of the set
    Found {
        geometry: &'a Geometry,
        label: &'a str,
        energy: f64,
    },
    /// No energy label is carried by every geometry (or the set has no geometries)
    NoEnergyLabel,
}

impl<'a> MinEnergy<'a> {
    pub fn geometry(&self) -> Option<&'a Geometry> {
        match self {
            Self::Found { geometry, .. } => Some(*geometry),
            Self::NoEnergyLabel => None,
        }
    }

    pub fn energy(&self) -> Option<f64> {
        match self {
            Self::Found { energy, .. } => Some(*energy),
            Self::NoEnergyLabel => None,
        }
    }
}

impl MoleculeSet {
    /// Create a molecule set for a composition. Positions and labels of the given
    /// atoms are dropped, only their atomic numbers are kept.
    pub fn new(atoms: impl IntoIterator<Item = Atom>) -> Self {
        Self {
            atoms: atoms.into_iter().map(|atom| atom.bare()).collect(),
            ..Self::default()
        }
    }

    pub fn from_atomic_numbers(atomic_numbers: &[u32]) -> Self {
        Self::new(atomic_numbers.iter().map(|&n| Atom::new(n, None)))
    }

    /// Load a molecule set document, remembering `path` as its filename.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut mset = Self::default();
        mset.load(Some(path.as_ref()))?;
        Ok(mset)
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

    /// The distinct element symbols, in order of first appearance.
    pub fn elements(&self) -> Result<Vec<&'static str>> {
        Ok(self.symbols()?.into_iter().unique().collect())
    }

    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    pub fn set_filename(&mut self, filename: impl Into<PathBuf>) {
        self.filename = Some(filename.into());
    }

    pub fn identifiers(&self) -> &IndexMap<String, Value> {
        &self.identifiers
    }

    pub fn identifier(&self, name: &str) -> Option<&Value> {
        self.identifiers.get(name)
    }

    pub fn set_identifier(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.identifiers.insert(name.into(), value.into());
    }

    /// Build a geometry of this composition. `positions` and every array in
    /// `atom_labels` need exactly one entry per atom.
    ///
    /// The geometry is not added to any trajectory.
    pub fn build_geom(
        &self,
        positions: &[Vector3<f64>],
        molecule_labels: Labels,
        atom_labels: AtomLabels,
    ) -> Result<Geometry> {
        let n_atoms = self.n_atoms();
        if positions.len() != n_atoms {
            return Err(Error::structural("positions", n_atoms, positions.len()));
        }
        if let Some((name, values)) = atom_labels.iter().find(|(_, v)| v.len() != n_atoms) {
            return Err(Error::structural(
                format!("atom label '{name}'"),
                n_atoms,
                values.len(),
            ));
        }

        let mut atoms = self
            .atoms
            .iter()
            .zip(positions)
            .map(|(atom, &position)| Atom::new(atom.atomic_num, Some(position)))
            .collect::<Vec<_>>();

        for (name, values) in atom_labels {
            for (atom, value) in atoms.iter_mut().zip(values) {
                atom.labels.insert(name.clone(), value);
            }
        }

        Ok(Geometry::new(atoms, molecule_labels))
    }

    /// Replace (or create) a trajectory. Returns the geometries it replaced.
    pub fn insert_trajectory(
        &mut self,
        name: impl Into<String>,
        geometries: Vec<Geometry>,
    ) -> Result<Option<Vec<Geometry>>> {
        let name = name.into();
        if let Some(index) = geometries
            .iter()
            .position(|geometry| !same_composition(&self.atoms, geometry))
        {
            return Err(Error::CompositionMismatch {
                trajectory: name,
                index,
            });
        }

        self.min_geom.take();
        Ok(self.trajectories.insert(name, geometries))
    }

    /// Append a geometry to a trajectory, creating the trajectory if needed.
    pub fn push_geometry(&mut self, name: &str, geometry: Geometry) -> Result<()> {
        let trajectory = self.trajectories.get(name);
        if !same_composition(&self.atoms, &geometry) {
            return Err(Error::CompositionMismatch {
                trajectory: name.to_owned(),
                index: trajectory.map_or(0, Vec::len),
            });
        }

        self.min_geom.take();
        self.trajectories
            .entry(name.to_owned())
            .or_default()
            .push(geometry);
        Ok(())
    }

    pub fn trajectory(&self, name: &str) -> Option<&[Geometry]> {
        self.trajectories.get(name).map(Vec::as_slice)
    }

    pub fn trajectories(&self) -> impl Iterator<Item = (&str, &[Geometry])> {
        self.trajectories
            .iter()
            .map(|(name, geometries)| (name.as_str(), geometries.as_slice()))
    }

    pub fn trajectory_names(&self) -> impl Iterator<Item = &str> {
        self.trajectories.keys().map(String::as_str)
    }

    /// All geometries of all trajectories, trajectory by trajectory.
    pub fn geometries(&self) -> impl Iterator<Item = &Geometry> {
        self.trajectories.values().flatten()
    }

    /// Number of geometries across all trajectories.
    pub fn len(&self) -> usize {
        self.trajectories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `index`-th geometry in [`Self::geometries`] order.
    pub fn get(&self, index: usize) -> Option<&Geometry> {
        self.geometries().nth(index)
    }

    /// Atomic number -> number of atoms of that element.
    pub fn chem_formula(&self) -> BTreeMap<u32, usize> {
        let mut formula = BTreeMap::new();
        for atom in &self.atoms {
            *formula.entry(atom.atomic_num).or_insert(0) += 1;
        }
        formula
    }

    /// The formula in Hill order (`C`, `H`, then alphabetical), e.g. `C2H6O`.
    pub fn formula_string(&self) -> Result<String> {
        let mut counts = self
            .chem_formula()
            .into_iter()
            .map(|(atomic_num, count)| Ok((periodic_table::symbol(atomic_num)?, count)))
            .collect::<Result<Vec<_>>>()?;

        let has_carbon = counts.iter().any(|&(symbol, _)| symbol == "C");
        counts.sort_by_key(|&(symbol, _)| match symbol {
            "C" if has_carbon => (0, symbol),
            "H" if has_carbon => (1, symbol),
            _ => (2, symbol),
        });

        Ok(counts
            .into_iter()
            .map(|(symbol, count)| match count {
                1 => symbol.to_owned(),
                n => format!("{symbol}{n}"),
            })
            .collect())
    }

    /// Hash of the ordered atomic numbers. Equal hashes mean the same elements in
    /// the same order. The value may change between Rust releases, so it is only
    /// comparable within one process and is never written to disk.
    pub fn composition_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    pub fn compare_hash(&self, other: &MoleculeSet) -> bool {
        self.composition_hash() == other.composition_hash()
    }

    /// Two sets are isomers when their chemical formulas match, regardless of
    /// atom order.
    pub fn is_isomer(&self, other: &MoleculeSet) -> bool {
        self.chem_formula() == other.chem_formula()
    }

    /// The geometry with the lowest energy. Labels in [`DEFAULT_ENERGY_LABELS`]
    /// are preferred, then any `*.energy` / `*.potential` label of the first
    /// geometry. A label is only used if every geometry carries it.
    pub fn min_energy_geometry(&self) -> MinEnergy<'_> {
        let lowest = self.min_geom.get_or_init(|| {
            let mut candidates: Vec<&str> = DEFAULT_ENERGY_LABELS.to_vec();
            if let Some(first) = self.geometries().next() {
                candidates.extend(
                    first
                        .labels
                        .keys()
                        .map(String::as_str)
                        .filter(|name| matches!(name.rsplit('.').next(), Some("energy" | "potential"))),
                );
            }

            let lowest = self.lowest_energy(candidates.into_iter());
            if lowest.is_none() {
                log::warn!(
                    "no energy label shared by all {} geometries of {}",
                    self.len(),
                    self.display_name()
                );
            }
            lowest
        });

        self.resolve(lowest.as_ref())
    }

    /// Like [`Self::min_energy_geometry`] with an explicit label preference and
    /// no fallback.
    pub fn min_energy_geometry_by<'a>(&'a self, labels: &[&'a str]) -> MinEnergy<'a> {
        let Some(lowest) = self.lowest_energy(labels.iter().copied()) else {
            return MinEnergy::NoEnergyLabel;
        };

        match (
            self.get(lowest.index),
            labels.iter().copied().find(|&label| label == lowest.label),
        ) {
            (Some(geometry), Some(label)) => MinEnergy::Found {
                geometry,
                label,
                energy: lowest.energy,
            },
            _ => MinEnergy::NoEnergyLabel,
        }
    }

    fn resolve<'a>(&'a self, lowest: Option<&'a LowestEnergy>) -> MinEnergy<'a> {
        lowest
            .and_then(|lowest| {
                Some(MinEnergy::Found {
                    geometry: self.get(lowest.index)?,
                    label: &lowest.label,
                    energy: lowest.energy,
                })
            })
            .unwrap_or(MinEnergy::NoEnergyLabel)
    }

    fn labelled_by(&self, label: &str) -> bool {
        !self.is_empty()
            && self
                .geometries()
                .all(|geometry| geometry.label(label).and_then(|v| v.as_scalar()).is_some())
    }

    /// Lowest finite value of the first label in `candidates` carried by every
    /// geometry. A label whose values are all NaN or infinite is passed over.
    fn lowest_energy<'l>(&self, candidates: impl Iterator<Item = &'l str>) -> Option<LowestEnergy> {
        candidates
            .filter(|label| self.labelled_by(label))
            .find_map(|label| {
                let (index, energy) = self
                    .geometries()
                    .filter_map(|geometry| geometry.label(label)?.as_scalar())
                    .enumerate()
                    .filter(|(_, energy)| energy.is_finite())
                    .fold(None, |best: Option<(usize, f64)>, (index, energy)| match best {
                        Some((_, lowest)) if lowest <= energy => best,
                        _ => Some((index, energy)),
                    })?;
                Some(LowestEnergy {
                    index,
                    label: label.to_owned(),
                    energy,
                })
            })
    }

    fn check_finite(&self) -> Result<()> {
        for (trajectory, geometries) in &self.trajectories {
            for (index, geometry) in geometries.iter().enumerate() {
                if let Some(what) = geometry.non_finite() {
                    return Err(Error::NonFinite(format!(
                        "{what} of geometry {index} in trajectory '{trajectory}'"
                    )));
                }
            }
        }
        Ok(())
    }

    fn display_name(&self) -> String {
        self.filename
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| format!("<{} atoms>", self.n_atoms()))
    }

    /// Write this set as a JSON document to `path`, or to its filename. Fails
    /// without touching the file if any value is NaN or infinite.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let path = path
            .or(self.filename.as_deref())
            .ok_or(Error::MissingFilename("saving"))?;
        self.check_finite()?;

        // serialize fully before touching the file
        let json = serde_json::to_vec(&MsetDocument::from(self))?;
        fs::write(path, json)?;

        log::debug!(
            "saved {} geometries in {} trajectories to {}",
            self.len(),
            self.trajectories.len(),
            path.display()
        );
        Ok(())
    }

    /// Replace the contents of this set with the document at `path`, or at its
    /// filename. The path becomes the filename if none was set.
    pub fn load(&mut self, path: Option<&Path>) -> Result<()> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| self.filename.clone())
            .ok_or(Error::MissingFilename("loading"))?;

        let document: MsetDocument = serde_json::from_reader(BufReader::new(File::open(&path)?))?;
        let MoleculeSet {
            atoms,
            trajectories,
            identifiers,
            ..
        } = MoleculeSet::try_from(document)?;

        self.atoms = atoms;
        self.trajectories = trajectories;
        self.identifiers = identifiers;
        self.min_geom.take();
        if self.filename.is_none() {
            self.filename = Some(path);
        }

        log::debug!(
            "loaded {} geometries of {} atoms from {}",
            self.len(),
            self.n_atoms(),
            self.display_name()
        );
        Ok(())
    }

    /// Write every geometry as an xyz block next to the set's file, with the
    /// extension replaced by `xyz`. Returns the written path.
    pub fn write_xyz_trajectory(&self) -> Result<PathBuf> {
        let path = self
            .filename
            .as_ref()
            .ok_or(Error::MissingFilename("the xyz trajectory"))?
            .with_extension("xyz");
        self.write_xyz_trajectory_to(&path)?;
        Ok(path)
    }

    pub fn write_xyz_trajectory_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut xyz = String::new();
        for geometry in self.geometries() {
            xyz.push_str(&geometry.to_xyz()?);
        }

        let mut file = File::create(path)?;
        file.write_all(xyz.as_bytes())?;
        Ok(())
    }
}

impl Hash for MoleculeSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for atom in &self.atoms {
            atom.atomic_num.hash(state);
        }
    }
}
