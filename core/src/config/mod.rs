pub use job::{IngestJob, SourceKind};
pub use molecule::{AtomRecord, GeometryRecord, MsetDocument};

pub(crate) use molecule::same_composition;

mod job;
mod molecule;
