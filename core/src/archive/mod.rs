//! Batches of an ANI-style archive: one group per composition with a
//! `coordinates` array (frames × atoms × 3), `atomic_numbers` (atoms) and any
//! number of property arrays whose first axis is the frame.
#[cfg(feature = "hdf5")]
pub mod h5;

use indexmap::IndexMap;
use nalgebra::Vector3;
use ndarray::{Array3, ArrayD, Axis};
use serde::{Deserialize, Serialize};

use crate::{
    atom::Atom,
    error::{Error, Result},
    label::{AtomLabels, LabelValue, Labels},
    molecule::MoleculeSet,
};

/// Key fragments of per-atom properties. Everything else is a molecule label.
const ATOM_PROPERTY_MARKERS: [&str; 4] = ["force", "charge", "mbis_", "volume"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameSelection {
    #[default]
    All,
    /// only the last frame of every group
    Last,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveOptions {
    /// property keys to read from every group
    pub properties: Vec<String>,
    pub frames: FrameSelection,
    pub trajectory: String,
    /// output files are named `{file_prefix}{group index}.mset`
    pub file_prefix: String,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            properties: Vec::new(),
            frames: FrameSelection::default(),
            trajectory: "ani.data".to_owned(),
            file_prefix: "ani1x-mol".to_owned(),
        }
    }
}

/// One group of the archive.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    pub name: String,
    pub atomic_numbers: Vec<u32>,
    pub coordinates: Array3<f64>,
    pub properties: IndexMap<String, ArrayD<f64>>,
}

pub fn is_atom_property(key: &str) -> bool {
    ATOM_PROPERTY_MARKERS
        .iter()
        .any(|marker| key.contains(marker))
}

impl Batch {
    /// Checks that every array agrees on the number of frames and atoms.
    pub fn new(
        name: impl Into<String>,
        atomic_numbers: Vec<u32>,
        coordinates: Array3<f64>,
        properties: IndexMap<String, ArrayD<f64>>,
    ) -> Result<Self> {
        let name = name.into();
        let (n_frames, n_atoms, n_dims) = coordinates.dim();
        if n_atoms != atomic_numbers.len() || n_dims != 3 {
            return Err(Error::archive(
                name,
                format!(
                    "coordinates of shape {:?} don't fit {} atoms",
                    coordinates.shape(),
                    atomic_numbers.len()
                ),
            ));
        }
        if let Some((key, property)) = properties
            .iter()
            .find(|(_, property)| property.shape().first() != Some(&n_frames))
        {
            return Err(Error::archive(
                name,
                format!(
                    "property '{key}' of shape {:?} doesn't have {n_frames} frames",
                    property.shape()
                ),
            ));
        }

        Ok(Self {
            name,
            atomic_numbers,
            coordinates,
            properties,
        })
    }

    pub fn n_frames(&self) -> usize {
        self.coordinates.len_of(Axis(0))
    }

    /// Drop every frame in which a coordinate or any property is NaN or
    /// infinite. Returns `None` if no frame is left.
    pub fn retain_finite(self) -> Option<Self> {
        let n_frames = self.n_frames();
        let keep = (0..n_frames)
            .filter(|&frame| {
                let coordinates = self.coordinates.index_axis(Axis(0), frame);
                coordinates.iter().all(|value| value.is_finite())
                    && self.properties.values().all(|property| {
                        property
                            .index_axis(Axis(0), frame)
                            .iter()
                            .all(|value| value.is_finite())
                    })
            })
            .collect::<Vec<_>>();

        if keep.len() < n_frames {
            log::debug!(
                "group {}: dropping {} of {n_frames} frames with non-finite values",
                self.name,
                n_frames - keep.len()
            );
        }
        if keep.is_empty() {
            return None;
        }
        if keep.len() == n_frames {
            return Some(self);
        }

        Some(Self {
            coordinates: self.coordinates.select(Axis(0), &keep),
            properties: self
                .properties
                .iter()
                .map(|(key, property)| (key.clone(), property.select(Axis(0), &keep)))
                .collect(),
            name: self.name,
            atomic_numbers: self.atomic_numbers,
        })
    }

    /// One geometry per selected frame, in a single trajectory.
    pub fn into_molecule_set(self, options: &ArchiveOptions) -> Result<MoleculeSet> {
        let mut mset = MoleculeSet::new(self.atomic_numbers.iter().map(|&n| Atom::new(n, None)));
        mset.set_identifier("archive_group", self.name.as_str());

        let frames = match options.frames {
            FrameSelection::All => 0..self.n_frames(),
            FrameSelection::Last => self.n_frames().saturating_sub(1)..self.n_frames(),
        };

        let mut geometries = Vec::with_capacity(frames.len());
        for frame in frames {
            let positions = self
                .coordinates
                .index_axis(Axis(0), frame)
                .rows()
                .into_iter()
                .map(|row| Vector3::new(row[0], row[1], row[2]))
                .collect::<Vec<_>>();

            let mut molecule_labels = Labels::new();
            let mut atom_labels = AtomLabels::new();
            for (key, property) in &self.properties {
                let value = property.index_axis(Axis(0), frame);
                if is_atom_property(key) {
                    if value.ndim() == 0 {
                        return Err(Error::archive(
                            &self.name,
                            format!("per-atom property '{key}' has no atom axis"),
                        ));
                    }
                    atom_labels.insert(
                        key.clone(),
                        value
                            .axis_iter(Axis(0))
                            .map(LabelValue::from_array)
                            .collect(),
                    );
                } else {
                    molecule_labels.insert(key.clone(), LabelValue::from_array(value));
                }
            }

            geometries.push(mset.build_geom(&positions, molecule_labels, atom_labels)?);
        }

        mset.insert_trajectory(options.trajectory.clone(), geometries)?;
        Ok(mset)
    }
}
