use std::{io, path::PathBuf};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed input '{}': {reason}", path.display())]
    MalformedInput { path: PathBuf, reason: String },

    #[error("I/O error on '{}': {error}", path.display())]
    Io { path: PathBuf, error: io::Error },

    #[error("unsupported mode: {0}")]
    UnsupportedMode(String),

    #[error("unable to build the worker pool")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    pub fn malformed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::MalformedInput {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, error: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            error,
        }
    }
}

/// Attaches the offending path to an [io::Error].
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::io(path, error))
    }
}
