use std::cell::OnceCell;

use indexmap::IndexMap;
use nalgebra::Vector3;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{
    atom::Atom,
    error::{Error, Result},
    geometry::Geometry,
    label::Labels,
    molecule::MoleculeSet,
};

/// Represents a full molecule set as it is stored on disk.
#[derive(Debug, Serialize, Deserialize)]
pub struct MsetDocument {
    pub atoms: Vec<AtomRecord>,
    pub trajectories: IndexMap<String, Vec<GeometryRecord>>,
    pub identifiers: IndexMap<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AtomRecord {
    pub atomic_num: u32,
    #[serde(default, deserialize_with = "deserialize_position")]
    pub xyz: Option<[f64; 3]>,
    #[serde(default)]
    pub labels: Labels,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeometryRecord {
    pub atoms: Vec<AtomRecord>,
    #[serde(default)]
    pub labels: Labels,
}

/// Older documents store an unknown position as `[null, null, null]`.
fn deserialize_position<'de, D>(deserializer: D) -> std::result::Result<Option<[f64; 3]>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<[Option<f64>; 3]>::deserialize(deserializer)?;
    Ok(raw.and_then(|[x, y, z]| Some([x?, y?, z?])))
}

impl From<&Atom> for AtomRecord {
    fn from(atom: &Atom) -> Self {
        Self {
            atomic_num: atom.atomic_num,
            xyz: atom.position.map(|p| [p.x, p.y, p.z]),
            labels: atom.labels.clone(),
        }
    }
}

impl From<AtomRecord> for Atom {
    fn from(record: AtomRecord) -> Self {
        Self {
            atomic_num: record.atomic_num,
            position: record.xyz.map(|[x, y, z]| Vector3::new(x, y, z)),
            labels: record.labels,
        }
    }
}

impl From<&Geometry> for GeometryRecord {
    fn from(geometry: &Geometry) -> Self {
        Self {
            atoms: geometry.atoms.iter().map(AtomRecord::from).collect(),
            labels: geometry.labels.clone(),
        }
    }
}

impl From<GeometryRecord> for Geometry {
    fn from(record: GeometryRecord) -> Self {
        Geometry::new(
            record.atoms.into_iter().map(Atom::from).collect(),
            record.labels,
        )
    }
}

impl From<&MoleculeSet> for MsetDocument {
    fn from(mset: &MoleculeSet) -> Self {
        Self {
            atoms: mset.atoms.iter().map(AtomRecord::from).collect(),
            trajectories: mset
                .trajectories
                .iter()
                .map(|(name, geometries)| {
                    (
                        name.clone(),
                        geometries.iter().map(GeometryRecord::from).collect(),
                    )
                })
                .collect(),
            identifiers: mset.identifiers.clone(),
        }
    }
}

impl TryFrom<MsetDocument> for MoleculeSet {
    type Error = Error;

    /// Every stored geometry is checked against the stored composition.
    fn try_from(document: MsetDocument) -> Result<Self> {
        let atoms = document
            .atoms
            .into_iter()
            .map(Atom::from)
            .collect::<Vec<_>>();

        let mut trajectories = IndexMap::with_capacity(document.trajectories.len());
        for (name, records) in document.trajectories {
            let geometries = records.into_iter().map(Geometry::from).collect::<Vec<_>>();
            for (index, geometry) in geometries.iter().enumerate() {
                if !same_composition(&atoms, geometry) {
                    return Err(Error::CompositionMismatch {
                        trajectory: name,
                        index,
                    });
                }
            }
            trajectories.insert(name, geometries);
        }

        Ok(MoleculeSet {
            atoms,
            trajectories,
            identifiers: document.identifiers,
            min_geom: OnceCell::new(),
            filename: None,
        })
    }
}

pub(crate) fn same_composition(atoms: &[Atom], geometry: &Geometry) -> bool {
    atoms.len() == geometry.atoms.len()
        && atoms
            .iter()
            .zip(&geometry.atoms)
            .all(|(a, b)| a.atomic_num == b.atomic_num)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atom_record_positions() {
        let known: AtomRecord =
            serde_json::from_str(r#"{"atomic_num": 6, "xyz": [0.0, 1.0, 2.0], "labels": {}}"#)
                .unwrap();
        assert_eq!(known.xyz, Some([0.0, 1.0, 2.0]));

        let null: AtomRecord =
            serde_json::from_str(r#"{"atomic_num": 6, "xyz": null, "labels": {}}"#).unwrap();
        assert_eq!(null.xyz, None);

        let legacy: AtomRecord =
            serde_json::from_str(r#"{"atomic_num": 6, "xyz": [null, null, null], "labels": {}}"#)
                .unwrap();
        assert_eq!(legacy.xyz, None);

        let missing: AtomRecord = serde_json::from_str(r#"{"atomic_num": 6}"#).unwrap();
        assert_eq!(missing.xyz, None);
        assert!(missing.labels.is_empty());
    }

    #[test]
    fn unknown_position_is_written_as_null() {
        let record = AtomRecord::from(&Atom::new(1, None));
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"atomic_num":1,"xyz":null,"labels":{}}"#
        );
    }

    #[test]
    fn mismatched_geometry_is_rejected() {
        let document: MsetDocument = serde_json::from_str(
            r#"{
                "atoms": [{"atomic_num": 8, "xyz": null, "labels": {}},
                          {"atomic_num": 1, "xyz": null, "labels": {}}],
                "trajectories": {"scan": [
                    {"atoms": [{"atomic_num": 8, "xyz": [0.0, 0.0, 0.0], "labels": {}},
                               {"atomic_num": 1, "xyz": [0.0, 0.0, 1.0], "labels": {}}],
                     "labels": {"energy": -75.0}},
                    {"atoms": [{"atomic_num": 1, "xyz": [0.0, 0.0, 0.0], "labels": {}},
                               {"atomic_num": 8, "xyz": [0.0, 0.0, 1.0], "labels": {}}],
                     "labels": {"energy": -74.0}}
                ]},
                "identifiers": {}
            }"#,
        )
        .unwrap();

        match MoleculeSet::try_from(document) {
            Err(Error::CompositionMismatch { trajectory, index }) => {
                assert_eq!(trajectory, "scan");
                assert_eq!(index, 1);
            }
            other => panic!("expected a composition mismatch, got {other:?}"),
        }
    }
}
