pub mod archive;
pub mod atom;
pub mod compare;
pub mod config;
pub mod error;
pub mod geometry;
pub mod ingest;
pub mod label;
pub mod molecule;
pub mod parse;
pub mod periodic_table;
pub mod testing;

pub use atom::Atom;
pub use error::{Error, Result};
pub use geometry::Geometry;
pub use label::{AtomLabels, LabelValue, Labels};
pub use molecule::{MinEnergy, MoleculeSet};
