use indexmap::IndexMap;
use ndarray::{ArrayViewD, Axis};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Named properties of an atom or a geometry, in insertion order.
pub type Labels = IndexMap<String, LabelValue>;

/// Per-atom label arrays handed to [`crate::molecule::MoleculeSet::build_geom`],
/// one entry per atom of the composition.
pub type AtomLabels = IndexMap<String, Vec<LabelValue>>;

/// A physical property value: an energy, a force vector, a quadrupole tensor...
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelValue {
    Scalar(f64),
    Vector(SmallVec<[f64; 3]>),
    Tensor(Vec<LabelValue>),
}

impl LabelValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_slice(&self) -> Option<&[f64]> {
        match self {
            Self::Vector(values) => Some(values),
            _ => None,
        }
    }

    /// Builds a value from an array of any rank. Rank 0 gives a scalar, rank 1
    /// a vector and everything above nests along the outermost axis.
    pub fn from_array(array: ArrayViewD<f64>) -> Self {
        match array.ndim() {
            0 => Self::Scalar(array.iter().copied().next().unwrap_or(f64::NAN)),
            1 => Self::Vector(array.iter().copied().collect()),
            _ => Self::Tensor(
                array
                    .axis_iter(Axis(0))
                    .map(Self::from_array)
                    .collect(),
            ),
        }
    }

    /// JSON has no NaN or infinity, so only finite values survive a save.
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Scalar(value) => value.is_finite(),
            Self::Vector(values) => values.iter().all(|value| value.is_finite()),
            Self::Tensor(values) => values.iter().all(Self::is_finite),
        }
    }
}

impl From<f64> for LabelValue {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<[f64; 3]> for LabelValue {
    fn from(value: [f64; 3]) -> Self {
        Self::Vector(SmallVec::from_buf(value))
    }
}

impl From<Vec<f64>> for LabelValue {
    fn from(value: Vec<f64>) -> Self {
        Self::Vector(SmallVec::from_vec(value))
    }
}

impl From<Vec<Vec<f64>>> for LabelValue {
    fn from(value: Vec<Vec<f64>>) -> Self {
        Self::Tensor(value.into_iter().map(Self::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{arr0, arr1, arr2};

    use super::*;

    #[test]
    fn json_shapes() {
        let scalar: LabelValue = serde_json::from_str("-76.4").unwrap();
        assert_eq!(scalar, LabelValue::Scalar(-76.4));

        let integer: LabelValue = serde_json::from_str("3").unwrap();
        assert_eq!(integer.as_scalar(), Some(3.0));

        let vector: LabelValue = serde_json::from_str("[0.1, 0.2, 0.3]").unwrap();
        assert_eq!(vector.as_slice(), Some(&[0.1, 0.2, 0.3][..]));

        let tensor: LabelValue = serde_json::from_str("[[1.0, 2.0], [3.0, 4.0]]").unwrap();
        assert_eq!(tensor, LabelValue::from(vec![vec![1.0, 2.0], vec![3.0, 4.0]]));
        assert_eq!(
            serde_json::to_string(&tensor).unwrap(),
            "[[1.0,2.0],[3.0,4.0]]"
        );
    }

    #[test]
    fn arrays_of_any_rank() {
        assert_eq!(
            LabelValue::from_array(arr0(1.5).into_dyn().view()),
            LabelValue::Scalar(1.5)
        );
        assert_eq!(
            LabelValue::from_array(arr1(&[1.0, 2.0, 3.0]).into_dyn().view()),
            LabelValue::from([1.0, 2.0, 3.0])
        );
        let matrix = arr2(&[[1.0, 2.0], [3.0, f64::NAN]]).into_dyn();
        let value = LabelValue::from_array(matrix.view());
        assert!(matches!(&value, LabelValue::Tensor(rows) if rows.len() == 2));
        assert!(!value.is_finite());
    }

    #[test]
    fn finiteness() {
        assert!(LabelValue::from(-76.4).is_finite());
        assert!(!LabelValue::from(f64::INFINITY).is_finite());
        assert!(!LabelValue::from([0.0, f64::NEG_INFINITY, 0.0]).is_finite());
        assert!(LabelValue::from(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).is_finite());
    }
}
