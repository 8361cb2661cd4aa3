//! HDF5 reader for ANI-style archives.
use std::path::Path;

use indexmap::IndexMap;
use ndarray::Ix3;

use super::Batch;
use crate::error::{Error, Result};

const COORDINATES: &str = "coordinates";
const ATOMIC_NUMBERS: &str = "atomic_numbers";

/// Lazily reads one group at a time. A group that lacks a requested key
/// yields an error for that group only.
pub struct H5Batches {
    file: hdf5::File,
    groups: std::vec::IntoIter<String>,
    keys: Vec<String>,
}

pub fn open(path: impl AsRef<Path>, keys: &[String]) -> Result<H5Batches> {
    let path = path.as_ref();
    let file = hdf5::File::open(path)?;
    let groups = file.member_names()?;
    log::info!("{}: {} groups", path.display(), groups.len());

    Ok(H5Batches {
        file,
        groups: groups.into_iter(),
        keys: keys
            .iter()
            .filter(|key| *key != COORDINATES && *key != ATOMIC_NUMBERS)
            .cloned()
            .collect(),
    })
}

impl H5Batches {
    fn read_group(&self, name: &str) -> Result<Batch> {
        let group = self.file.group(name)?;
        let members = group.member_names()?;
        let require = |key: &str| {
            if members.iter().any(|member| member == key) {
                Ok(())
            } else {
                Err(Error::archive(name, format!("missing dataset '{key}'")))
            }
        };

        require(ATOMIC_NUMBERS)?;
        let atomic_numbers = group
            .dataset(ATOMIC_NUMBERS)?
            .read_1d::<i64>()?
            .iter()
            .map(|&n| {
                u32::try_from(n)
                    .map_err(|_| Error::archive(name, format!("invalid atomic number {n}")))
            })
            .collect::<Result<Vec<_>>>()?;

        require(COORDINATES)?;
        let coordinates = group.dataset(COORDINATES)?.read::<f64, Ix3>()?;

        let mut properties = IndexMap::with_capacity(self.keys.len());
        for key in &self.keys {
            require(key)?;
            properties.insert(key.clone(), group.dataset(key)?.read_dyn::<f64>()?);
        }

        Batch::new(name, atomic_numbers, coordinates, properties)
    }
}

impl Iterator for H5Batches {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        let name = self.groups.next()?;
        Some(self.read_group(&name))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.groups.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{arr1, Array3};

    use super::*;
    use crate::{
        archive::ArchiveOptions,
        config::{IngestJob, SourceKind},
        ingest,
        molecule::MoleculeSet,
    };

    const ENERGY: &str = "wb97x_dz.energy";

    /// An H2 group; without `energies` the energy dataset is left out.
    fn write_group(file: &hdf5::File, name: &str, energies: Option<&[f64]>) -> hdf5::Result<()> {
        let group = file.create_group(name)?;
        let n_frames = energies.map_or(1, <[f64]>::len);
        let coordinates = Array3::from_shape_fn((n_frames, 2, 3), |(frame, atom, axis)| {
            0.1 * frame as f64 + 0.74 * (atom * (axis == 2) as usize) as f64
        });

        group
            .new_dataset_builder()
            .with_data(&arr1(&[1_i64, 1]))
            .create(ATOMIC_NUMBERS)?;
        group
            .new_dataset_builder()
            .with_data(&coordinates)
            .create(COORDINATES)?;
        if let Some(energies) = energies {
            group
                .new_dataset_builder()
                .with_data(&arr1(energies))
                .create(ENERGY)?;
        }
        Ok(())
    }

    fn write_archive(path: &Path) {
        let file = hdf5::File::create(path).unwrap();
        write_group(&file, "a-good", Some(&[-1.17, f64::NAN, -1.16])).unwrap();
        write_group(&file, "b-missing", None).unwrap();
        write_group(&file, "c-nan", Some(&[f64::NAN, f64::NAN])).unwrap();
    }

    #[test]
    fn groups_are_read_one_at_a_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ani1x-release.h5");
        write_archive(&path);

        let keys = [ENERGY, COORDINATES, ATOMIC_NUMBERS].map(str::to_owned);
        let mut batches = open(&path, &keys).unwrap();
        assert_eq!(batches.keys, [ENERGY]);
        assert_eq!(batches.size_hint(), (3, Some(3)));

        let good = batches.next().unwrap().unwrap();
        assert_eq!(good.name, "a-good");
        assert_eq!(good.atomic_numbers, [1, 1]);
        assert_eq!(good.n_frames(), 3);
        assert_eq!(good.properties.keys().collect::<Vec<_>>(), [ENERGY]);
        assert_eq!(batches.size_hint(), (2, Some(2)));

        match batches.next() {
            Some(Err(Error::Archive { group, details })) => {
                assert_eq!(group, "b-missing");
                assert!(details.contains(ENERGY));
            }
            other => panic!("expected a missing dataset, got {other:?}"),
        }

        let nan = batches.next().unwrap().unwrap();
        assert_eq!(nan.name, "c-nan");
        assert!(nan.retain_finite().is_none());
        assert!(batches.next().is_none());
    }

    #[test]
    fn archive_ingestion() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("ani1x-release.h5");
        write_archive(&input);

        let job = IngestJob {
            input,
            output_root: dir.path().join("ani1x-msets"),
            source: SourceKind::Archive {
                options: ArchiveOptions {
                    properties: vec![ENERGY.to_owned()],
                    ..ArchiveOptions::default()
                },
            },
            overwrite: false,
            accept_partial: false,
        };

        let report = ingest::run(&job).unwrap();
        assert_eq!(report.written, [job.output_root.join("ani1x-mol0.mset")]);
        assert_eq!(report.dropped, ["c-nan"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].source, "b-missing");

        let mset = MoleculeSet::open(&report.written[0]).unwrap();
        assert_eq!(mset.identifier("archive_group"), Some(&"a-good".into()));
        let trajectory = mset.trajectory("ani.data").unwrap();
        assert_eq!(trajectory.len(), 2);
        assert_eq!(trajectory[1].label(ENERGY).unwrap().as_scalar(), Some(-1.16));
        assert_eq!(mset.min_energy_geometry().energy(), Some(-1.17));
    }
}
