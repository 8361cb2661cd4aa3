use nalgebra::Vector3;

use crate::{error::Result, label::Labels, periodic_table};

/// Represents an atom in a molecule set or one of its geometries.
#[derive(Clone, Debug, PartialEq)]
pub struct Atom {
    pub(crate) atomic_num: u32,
    pub(crate) position: Option<Vector3<f64>>,
    pub(crate) labels: Labels,
}

impl Atom {
    /// Atomic numbers are not validated here, an unknown one only fails once
    /// it is resolved against the periodic table.
    pub fn new(atomic_num: u32, position: Option<Vector3<f64>>) -> Self {
        Self {
            atomic_num,
            position,
            labels: Labels::new(),
        }
    }

    pub fn atomic_num(&self) -> u32 {
        self.atomic_num
    }

    pub fn symbol(&self) -> Result<&'static str> {
        periodic_table::symbol(self.atomic_num)
    }

    pub fn position(&self) -> Option<&Vector3<f64>> {
        self.position.as_ref()
    }

    pub fn set_position(&mut self, position: Option<Vector3<f64>>) {
        self.position = position;
    }

    pub fn x(&self) -> Option<f64> {
        self.position.map(|p| p.x)
    }

    pub fn y(&self) -> Option<f64> {
        self.position.map(|p| p.y)
    }

    pub fn z(&self) -> Option<f64> {
        self.position.map(|p| p.z)
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn labels_mut(&mut self) -> &mut Labels {
        &mut self.labels
    }

    /// A copy of this atom without position or labels.
    pub(crate) fn bare(&self) -> Self {
        Self::new(self.atomic_num, None)
    }
}

#[cfg(test)]
mod tests {
    use crate::{error::Error, label::LabelValue};

    use super::*;

    #[test]
    fn accessors() {
        let mut atom = Atom::new(8, Some(Vector3::new(0.0, 0.757, 0.586)));
        assert_eq!(atom.symbol().unwrap(), "O");
        assert_eq!(atom.y(), Some(0.757));
        assert_eq!(atom.z(), Some(0.586));

        atom.labels_mut()
            .insert("charge".to_owned(), LabelValue::Scalar(-0.8));
        assert_eq!(atom.labels()["charge"].as_scalar(), Some(-0.8));

        let bare = atom.bare();
        assert_eq!(bare.atomic_num(), 8);
        assert!(bare.position().is_none());
        assert!(bare.labels().is_empty());
    }

    #[test]
    fn unknown_atomic_number_fails_on_lookup() {
        let atom = Atom::new(250, None);
        assert_eq!(atom.x(), None);
        assert!(matches!(atom.symbol(), Err(Error::UnknownAtomicNumber(250))));
    }
}
