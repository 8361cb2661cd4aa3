use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{archive::ArchiveOptions, error::Result, parse::QchemOptions};

/// An ingestion run as described by a JSON job file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IngestJob {
    /// a directory of logs, or an archive file
    pub input: PathBuf,
    pub output_root: PathBuf,
    pub source: SourceKind,
    /// replace `.mset` files that already exist
    #[serde(default)]
    pub overwrite: bool,
    /// also write molecule sets of partially parsed inputs
    #[serde(default)]
    pub accept_partial: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    QchemLogs {
        #[serde(default = "default_extension")]
        extension: String,
        #[serde(default)]
        options: QchemOptions,
    },
    Archive {
        #[serde(default)]
        options: ArchiveOptions,
    },
}

fn default_extension() -> String {
    "out".to_owned()
}

impl IngestJob {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}
