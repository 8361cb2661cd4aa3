//! Grouping and matching of molecule sets loaded from many files.
use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;

use crate::molecule::{MinEnergy, MoleculeSet};

pub fn group_by_atom_count(msets: &[MoleculeSet]) -> BTreeMap<usize, Vec<&MoleculeSet>> {
    let mut groups: BTreeMap<usize, Vec<&MoleculeSet>> = BTreeMap::new();
    for mset in msets {
        groups.entry(mset.n_atoms()).or_default().push(mset);
    }
    groups
}

/// Exact composition matches, keyed by composition hash in order of first
/// appearance.
pub fn group_by_composition(msets: &[MoleculeSet]) -> IndexMap<u64, Vec<&MoleculeSet>> {
    let mut groups: IndexMap<u64, Vec<&MoleculeSet>> = IndexMap::new();
    for mset in msets {
        groups.entry(mset.composition_hash()).or_default().push(mset);
    }
    groups
}

/// Isomer groups, keyed by Hill formula. Sets with unknown atomic numbers
/// are skipped.
pub fn isomer_groups(msets: &[MoleculeSet]) -> IndexMap<String, Vec<&MoleculeSet>> {
    let mut groups: IndexMap<String, Vec<&MoleculeSet>> = IndexMap::new();
    for mset in msets {
        match mset.formula_string() {
            Ok(formula) => groups.entry(formula).or_default().push(mset),
            Err(e) => log::warn!("{}: {e}", display_name(mset)),
        }
    }
    groups
}

/// Matches of every molecule set of one collection in the other collection.
/// Keys and values are the file names (or `#index` for sets without one).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IdentifierMatches {
    pub left: IndexMap<String, Vec<String>>,
    pub right: IndexMap<String, Vec<String>>,
}

/// Pairs up molecule sets of two collections that carry an equal
/// `identifier` value. Only sets with the same atom count are compared;
/// sets without the identifier never match.
pub fn match_identifier(
    left: &[MoleculeSet],
    right: &[MoleculeSet],
    identifier: &str,
) -> IdentifierMatches {
    let mut right_by_count: BTreeMap<usize, Vec<(String, &MoleculeSet)>> = BTreeMap::new();
    for (index, mset) in right.iter().enumerate() {
        right_by_count
            .entry(mset.n_atoms())
            .or_default()
            .push((name_or_index(mset, index), mset));
    }

    let mut matches = IdentifierMatches::default();
    for (index, mset) in left.iter().enumerate() {
        let name = name_or_index(mset, index);
        let Some(value) = mset.identifier(identifier) else {
            log::warn!("{name} has no '{identifier}' identifier");
            matches.left.insert(name, Vec::new());
            continue;
        };

        let found = right_by_count
            .get(&mset.n_atoms())
            .into_iter()
            .flatten()
            .filter(|(_, other)| other.identifier(identifier) == Some(value))
            .map(|(other_name, _)| other_name.clone())
            .collect::<Vec<_>>();

        for other_name in &found {
            matches
                .right
                .entry(other_name.clone())
                .or_default()
                .push(name.clone());
        }
        matches.left.insert(name, found);
    }

    for (other_name, _) in right_by_count.into_values().flatten() {
        matches.right.entry(other_name).or_default();
    }
    matches
}

/// The member whose lowest-energy geometry is the lowest overall.
pub fn lowest_energy_member<'a>(
    msets: impl IntoIterator<Item = &'a MoleculeSet>,
) -> Option<(&'a MoleculeSet, MinEnergy<'a>)> {
    msets
        .into_iter()
        .filter_map(|mset| {
            let lowest = mset.min_energy_geometry();
            lowest.energy().map(|energy| (mset, lowest, energy))
        })
        .min_by(|a, b| a.2.total_cmp(&b.2))
        .map(|(mset, lowest, _)| (mset, lowest))
}

fn display_name(mset: &MoleculeSet) -> String {
    mset.filename()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<unnamed>".to_owned())
}

fn name_or_index(mset: &MoleculeSet, index: usize) -> String {
    mset.filename()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| format!("#{index}"))
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector3;

    use super::*;
    use crate::label::{AtomLabels, LabelValue, Labels};

    fn named(atomic_numbers: &[u32], filename: &str, smiles: Option<&str>) -> MoleculeSet {
        let mut mset = MoleculeSet::from_atomic_numbers(atomic_numbers);
        mset.set_filename(filename);
        if let Some(smiles) = smiles {
            mset.set_identifier("smiles", smiles);
        }
        mset
    }

    fn with_energy(mut mset: MoleculeSet, energy: f64) -> MoleculeSet {
        let positions = vec![Vector3::zeros(); mset.n_atoms()];
        let labels = Labels::from([("wb97x_tz.energy".to_owned(), LabelValue::from(energy))]);
        let geometry = mset
            .build_geom(&positions, labels, AtomLabels::new())
            .unwrap();
        mset.push_geometry("ani.data", geometry).unwrap();
        mset
    }

    #[test]
    fn groups() {
        let msets = [
            named(&[6, 6, 1, 1, 1, 1], "ethene.mset", None),
            named(&[8, 1, 1], "water.mset", None),
            named(&[6, 1, 1, 6, 1, 1], "ethene-permuted.mset", None),
            named(&[1, 8, 1], "water-permuted.mset", None),
            named(&[8, 1, 1], "water-2.mset", None),
        ];

        let by_count = group_by_atom_count(&msets);
        assert_eq!(by_count.keys().copied().collect::<Vec<_>>(), [3, 6]);
        assert_eq!(by_count[&3].len(), 3);

        let by_composition = group_by_composition(&msets);
        assert_eq!(by_composition.len(), 4);
        assert_eq!(by_composition[&msets[1].composition_hash()].len(), 2);

        let isomers = isomer_groups(&msets);
        assert_eq!(isomers.keys().collect::<Vec<_>>(), ["C2H4", "H2O"]);
        assert_eq!(isomers["H2O"].len(), 3);
        assert_eq!(isomers["C2H4"].len(), 2);
    }

    #[test]
    fn identifier_matching() {
        let opt = [
            named(&[8, 1, 1], "opt/water.mset", Some("O")),
            named(&[6, 1, 1, 1, 1], "opt/methane.mset", Some("C")),
            named(&[6, 8, 1, 1, 1, 1], "opt/methanol.mset", Some("CO")),
        ];
        let meta = [
            named(&[8, 1, 1], "meta/water-a.mset", Some("O")),
            named(&[8, 1, 1], "meta/water-b.mset", Some("O")),
            // same identifier but a different atom count is never compared
            named(&[6, 1, 1, 1, 1, 1], "meta/methyl.mset", Some("C")),
            named(&[6, 8, 1, 1, 1, 1], "meta/unknown.mset", None),
        ];

        let matches = match_identifier(&opt, &meta, "smiles");
        assert_eq!(
            matches.left["opt/water.mset"],
            ["meta/water-a.mset", "meta/water-b.mset"]
        );
        assert!(matches.left["opt/methane.mset"].is_empty());
        assert!(matches.left["opt/methanol.mset"].is_empty());

        assert_eq!(matches.right["meta/water-b.mset"], ["opt/water.mset"]);
        assert!(matches.right["meta/methyl.mset"].is_empty());
        assert!(matches.right["meta/unknown.mset"].is_empty());
        assert_eq!(matches.right.len(), 4);

        // swapping the collections swaps the result
        let swapped = match_identifier(&meta, &opt, "smiles");
        assert_eq!(swapped.left["meta/water-a.mset"], ["opt/water.mset"]);
        assert_eq!(swapped.right["opt/water.mset"].len(), 2);
    }

    #[test]
    fn unnamed_sets_use_their_index() {
        let mut hydrogen = MoleculeSet::from_atomic_numbers(&[1, 1]);
        hydrogen.set_identifier("smiles", "[HH]");
        let left = [hydrogen.clone()];
        let right = [hydrogen];

        let matches = match_identifier(&left, &right, "smiles");
        assert_eq!(matches.left["#0"], ["#0"]);
    }

    #[test]
    fn lowest_energy() {
        let msets = [
            with_energy(named(&[6, 8, 1, 1, 1, 1], "a.mset", None), -115.2),
            named(&[6, 8, 1, 1, 1, 1], "no-energy.mset", None),
            with_energy(named(&[6, 1, 1, 8, 1, 1], "b.mset", None), -115.7),
            with_energy(named(&[6, 1, 1, 1, 8, 1], "c.mset", None), -115.7),
        ];

        let (mset, lowest) = lowest_energy_member(&msets).unwrap();
        assert_eq!(mset.filename().unwrap().to_str(), Some("b.mset"));
        assert_eq!(lowest.energy(), Some(-115.7));

        assert!(lowest_energy_member(&msets[1..2]).is_none());
    }
}
