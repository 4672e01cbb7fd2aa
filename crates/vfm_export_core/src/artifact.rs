use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Shp,
    Shx,
    Dbf,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [Self::Shp, Self::Shx, Self::Dbf];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Shp => "shp",
            Self::Shx => "shx",
            Self::Dbf => "dbf",
        }
    }
}

/// The three correlated files written by the encoder for one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapefileArtifacts {
    base_path: PathBuf,
    record_count: usize,
}

impl ShapefileArtifacts {
    pub fn new(base_path: impl Into<PathBuf>, record_count: usize) -> Self {
        Self {
            base_path: base_path.into(),
            record_count,
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn path(&self, kind: ArtifactKind) -> PathBuf {
        self.base_path.with_extension(kind.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveArtifact {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub entries: Vec<String>,
}
