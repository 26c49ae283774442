use crate::error::PipelineError;
use std::fmt;
use std::path::{Path, PathBuf};

/// Opaque locator for one container file. Immutable once built;
/// replacing the source supersedes any pipeline derived from the old
/// value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageSource {
    Path(PathBuf),
}

impl ImageSource {
    /// Accepts a plain filesystem path or a `file://` URI. Anything
    /// else is kept as a path and will surface as a fetch failure,
    /// matching the "no validation before decode" contract.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let path = trimmed.strip_prefix("file://").unwrap_or(trimmed);
        Self::Path(PathBuf::from(path))
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Path(p) => p,
        }
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path().display())
    }
}

/// Reads the container bytes. IO failures map to `Fetch`, the only
/// stage allowed to produce that variant.
pub async fn fetch(source: &ImageSource) -> Result<Vec<u8>, PipelineError> {
    let bytes = tokio::fs::read(source.path()).await?;
    Ok(bytes)
}
