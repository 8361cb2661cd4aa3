use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O operation failed: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("malformed molecule set document: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("expected {expected} entries for {what}, got {found}")]
    Structural {
        what: String,
        expected: usize,
        found: usize,
    },

    #[error("no filename given for {0}")]
    MissingFilename(&'static str),

    #[error("no element with atomic number {0}")]
    UnknownAtomicNumber(u32),

    #[error("unknown element symbol '{0}'")]
    UnknownSymbol(String),

    #[error("geometry {index} of trajectory '{trajectory}' does not match the set composition")]
    CompositionMismatch { trajectory: String, index: usize },

    #[error("atom {0} has no position")]
    MissingPosition(usize),

    #[error("{0} is not a finite number")]
    NonFinite(String),

    #[error("failed to parse log: {details} (at line ~{line})")]
    Parse { line: usize, details: String },

    #[error("log ended inside the '{marker}' block")]
    Truncated { marker: &'static str },

    #[error("frame {frame} reports a different composition than the first frame")]
    InconsistentFrames { frame: usize },

    #[error("archive group '{group}': {details}")]
    Archive { group: String, details: String },

    #[cfg(feature = "hdf5")]
    #[error("HDF5 operation failed: {0}")]
    Hdf5(#[from] hdf5::Error),
}

impl Error {
    pub fn parse(line: usize, details: impl Into<String>) -> Self {
        Self::Parse {
            line,
            details: details.into(),
        }
    }

    pub fn structural(what: impl Into<String>, expected: usize, found: usize) -> Self {
        Self::Structural {
            what: what.into(),
            expected,
            found,
        }
    }

    pub fn archive(group: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Archive {
            group: group.into(),
            details: details.into(),
        }
    }
}
