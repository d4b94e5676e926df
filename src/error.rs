use thiserror::Error;

/// Failure reported by a host collaborator (symbol, reference, definition,
/// document or file services). Always recovered locally by the caller.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse error in {path}: {message}")]
    Parse { path: String, message: String },
}

impl ProviderError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            return ProviderError::NotFound(path.into());
        }
        ProviderError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
