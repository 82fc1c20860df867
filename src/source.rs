use std::{
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Source file {path:?} does not exist")]
    NotFound { path: PathBuf },
    #[error("Could not read source file {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("Source file {path:?} is not UTF-8")]
    NotUtf8 { path: PathBuf },
}

#[allow(missing_docs)]
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Read a source file as text
pub async fn read_source(path: &Path) -> SourceResult<String> {
    let bytes = tokio::fs::read(path).await.map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            SourceError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            SourceError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    String::from_utf8(bytes).map_err(|_| SourceError::NotUtf8 {
        path: path.to_path_buf(),
    })
}

/// Resolve `path` against `root` unless it is already absolute
pub fn rooted(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
